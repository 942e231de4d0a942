//! In-process doubles shared by the workflow test trees.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{Duration, Utc};
use serde_json::Value;

use crate::adapters::{
    EmailMessage, EmailTemplate, IdentityError, IdentityProvider, InMemoryPropertyStore, Mailer,
    NewAccount, NotificationError, ProofFile, ProofStorage, PropertyStore, Session, StorageError,
};
use crate::config::PortalConfig;
use crate::domain::{Apartment, Building, NewApartment, NewBuilding, UserId};

pub(crate) const ADMIN_EMAIL: &str = "admin@example.com";

pub(crate) fn portal_config() -> PortalConfig {
    PortalConfig {
        portal_url: "https://portal.example.com".to_string(),
        admin_emails: vec![ADMIN_EMAIL.to_string()],
        ..PortalConfig::default()
    }
}

pub(crate) fn seeded_store() -> (Arc<InMemoryPropertyStore>, Building, Apartment) {
    let store = Arc::new(InMemoryPropertyStore::new());
    let building = store
        .insert_building(NewBuilding {
            name: "Maple Court".to_string(),
            address: "12 Maple St".to_string(),
            city: "Des Moines".to_string(),
            total_units: 12,
        })
        .expect("building");
    let apartment = store
        .insert_apartment(NewApartment {
            building_id: building.id.clone(),
            unit_number: "A101".to_string(),
            floor: 1,
            monthly_rent: 1000,
        })
        .expect("apartment");
    (store, building, apartment)
}

#[derive(Debug, Clone)]
struct Account {
    user_id: UserId,
    credential: String,
}

#[derive(Debug, Default)]
struct IdentityState {
    accounts: HashMap<String, Account>,
    created: Vec<NewAccount>,
    resets: Vec<String>,
}

/// Identity provider double with per-call failure knobs.
#[derive(Debug)]
pub(crate) struct FakeIdentity {
    state: Mutex<IdentityState>,
    service_key: bool,
    create_failure: Mutex<Option<IdentityError>>,
    sign_in_failure: Mutex<Option<IdentityError>>,
    reset_failure: Mutex<Option<IdentityError>>,
}

impl Default for FakeIdentity {
    fn default() -> Self {
        Self {
            state: Mutex::new(IdentityState::default()),
            service_key: true,
            create_failure: Mutex::new(None),
            sign_in_failure: Mutex::new(None),
            reset_failure: Mutex::new(None),
        }
    }
}

impl FakeIdentity {
    /// Rejects every auto-confirmed account, like a deployment missing its service key.
    pub(crate) fn without_service_key() -> Self {
        Self {
            service_key: false,
            ..Self::default()
        }
    }

    pub(crate) fn fail_create(&self, error: Option<IdentityError>) {
        *self.create_failure.lock().expect("identity mutex poisoned") = error;
    }

    pub(crate) fn fail_sign_in(&self, error: Option<IdentityError>) {
        *self.sign_in_failure.lock().expect("identity mutex poisoned") = error;
    }

    pub(crate) fn fail_reset(&self, error: Option<IdentityError>) {
        *self.reset_failure.lock().expect("identity mutex poisoned") = error;
    }

    pub(crate) fn created(&self) -> Vec<NewAccount> {
        self.state
            .lock()
            .expect("identity mutex poisoned")
            .created
            .clone()
    }

    pub(crate) fn resets(&self) -> Vec<String> {
        self.state
            .lock()
            .expect("identity mutex poisoned")
            .resets
            .clone()
    }

    pub(crate) fn credential_for(&self, email: &str) -> Option<String> {
        self.state
            .lock()
            .expect("identity mutex poisoned")
            .accounts
            .get(email)
            .map(|account| account.credential.clone())
    }

    /// Registers an account directly, bypassing the workflows.
    pub(crate) fn register(&self, email: &str, credential: &str) -> UserId {
        let mut state = self.state.lock().expect("identity mutex poisoned");
        let user_id = UserId(format!("usr-{}", state.accounts.len() + 1));
        state.accounts.insert(
            email.to_string(),
            Account {
                user_id: user_id.clone(),
                credential: credential.to_string(),
            },
        );
        user_id
    }
}

impl IdentityProvider for FakeIdentity {
    fn create_account(&self, account: NewAccount) -> Result<UserId, IdentityError> {
        if let Some(error) = self.create_failure.lock().expect("identity mutex poisoned").clone()
        {
            return Err(error);
        }
        if account.auto_confirm && !self.service_key {
            return Err(IdentityError::MissingServiceCredential);
        }
        let mut state = self.state.lock().expect("identity mutex poisoned");
        if state.accounts.contains_key(&account.email) {
            return Err(IdentityError::EmailTaken);
        }
        let user_id = UserId(format!("usr-{}", state.accounts.len() + 1));
        state.accounts.insert(
            account.email.clone(),
            Account {
                user_id: user_id.clone(),
                credential: account.credential.clone(),
            },
        );
        state.created.push(account);
        Ok(user_id)
    }

    fn sign_in(&self, email: &str, credential: &str) -> Result<Session, IdentityError> {
        if let Some(error) = self.sign_in_failure.lock().expect("identity mutex poisoned").clone()
        {
            return Err(error);
        }
        let state = self.state.lock().expect("identity mutex poisoned");
        match state.accounts.get(email) {
            Some(account) if account.credential == credential => Ok(Session {
                user_id: account.user_id.clone(),
                email: email.to_string(),
                access_token: format!("token-{}", account.user_id),
                expires_at: Utc::now() + Duration::hours(1),
            }),
            _ => Err(IdentityError::InvalidCredentials),
        }
    }

    fn send_password_reset(&self, email: &str) -> Result<(), IdentityError> {
        if let Some(error) = self.reset_failure.lock().expect("identity mutex poisoned").clone() {
            return Err(error);
        }
        self.state
            .lock()
            .expect("identity mutex poisoned")
            .resets
            .push(email.to_string());
        Ok(())
    }
}

/// Captures outbound mail; can be switched to fail every send or a single template.
#[derive(Debug, Default)]
pub(crate) struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
    failing: AtomicBool,
    failing_template: Mutex<Option<EmailTemplate>>,
}

impl RecordingMailer {
    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn fail_template(&self, template: EmailTemplate) {
        *self.failing_template.lock().expect("mailer mutex poisoned") = Some(template);
    }

    pub(crate) fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().expect("mailer mutex poisoned").clone()
    }

    pub(crate) fn sent_with(&self, template: EmailTemplate) -> Vec<EmailMessage> {
        self.sent()
            .into_iter()
            .filter(|message| message.template == template)
            .collect()
    }
}

impl Mailer for RecordingMailer {
    fn send(&self, message: EmailMessage) -> Result<(), NotificationError> {
        let template_fails = *self.failing_template.lock().expect("mailer mutex poisoned")
            == Some(message.template);
        if self.failing.load(Ordering::SeqCst) || template_fails {
            return Err(NotificationError::Transport("smtp offline".to_string()));
        }
        self.sent.lock().expect("mailer mutex poisoned").push(message);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub(crate) struct MemoryProofStorage {
    uploads: Mutex<Vec<String>>,
    content_types: Mutex<Vec<String>>,
    failing: AtomicBool,
}

impl MemoryProofStorage {
    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn uploads(&self) -> Vec<String> {
        self.uploads.lock().expect("storage mutex poisoned").clone()
    }

    pub(crate) fn content_types(&self) -> Vec<String> {
        self.content_types
            .lock()
            .expect("storage mutex poisoned")
            .clone()
    }
}

impl ProofStorage for MemoryProofStorage {
    fn upload(&self, path: &str, file: &ProofFile) -> Result<String, StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("bucket unavailable".to_string()));
        }
        self.content_types
            .lock()
            .expect("storage mutex poisoned")
            .push(file.content_type.clone());
        self.uploads
            .lock()
            .expect("storage mutex poisoned")
            .push(path.to_string());
        Ok(format!("https://files.example.com/payment-proofs/{path}"))
    }
}

pub(crate) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

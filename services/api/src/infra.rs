use chrono::{Duration, NaiveDate, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tenant_portal::adapters::{
    EmailMessage, IdentityError, IdentityProvider, InMemoryPropertyStore, Mailer, NewAccount,
    NotificationError, ProofFile, ProofStorage, Session, StorageError,
};
use tenant_portal::config::PortalConfig;
use tenant_portal::domain::{
    Apartment, Building, NewBuilding, NewVendor, UserId, VendorCategory,
};
use tenant_portal::workflows::invitations::InvitationWorkflow;
use tenant_portal::workflows::payments::PaymentWorkflow;
use tenant_portal::workflows::property::{ApartmentRequest, PropertyDirectory};
use tenant_portal::workflows::{AccessService, WorkflowError};
use tracing::info;
use uuid::Uuid;

pub(crate) type Store = InMemoryPropertyStore;
pub(crate) type Invitations = InvitationWorkflow<Store, InMemoryIdentityProvider, LogMailer>;
pub(crate) type Payments = PaymentWorkflow<Store, LocalProofStorage, LogMailer>;
pub(crate) type Access = AccessService<Store, InMemoryIdentityProvider>;
pub(crate) type Directory = PropertyDirectory<Store>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Workflows wired to the local adapters, sharing one store and outbox.
pub(crate) struct PortalServices {
    pub(crate) mailer: Arc<LogMailer>,
    pub(crate) invitations: Arc<Invitations>,
    pub(crate) payments: Arc<Payments>,
    pub(crate) access: Arc<Access>,
    pub(crate) directory: Arc<Directory>,
}

impl PortalServices {
    pub(crate) fn in_memory(config: &PortalConfig) -> Self {
        let store = Arc::new(InMemoryPropertyStore::new());
        let identity = Arc::new(InMemoryIdentityProvider::new(
            config.identity_service_key.is_some(),
        ));
        let mailer = Arc::new(LogMailer::default());
        let storage = Arc::new(LocalProofStorage::new(&config.proof_storage_dir));

        Self {
            invitations: Arc::new(InvitationWorkflow::new(
                store.clone(),
                identity.clone(),
                mailer.clone(),
                config.clone(),
            )),
            payments: Arc::new(PaymentWorkflow::new(
                store.clone(),
                storage,
                mailer.clone(),
                config.clone(),
            )),
            access: Arc::new(AccessService::new(store.clone(), identity)),
            directory: Arc::new(PropertyDirectory::new(store)),
            mailer,
        }
    }
}

#[derive(Debug, Clone)]
struct LocalAccount {
    user_id: UserId,
    credential: String,
}

/// Process-local stand-in for the hosted identity service.
#[derive(Debug, Default)]
pub(crate) struct InMemoryIdentityProvider {
    accounts: Mutex<HashMap<String, LocalAccount>>,
    service_key: bool,
}

impl InMemoryIdentityProvider {
    pub(crate) fn new(service_key: bool) -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            service_key,
        }
    }
}

impl IdentityProvider for InMemoryIdentityProvider {
    fn create_account(&self, account: NewAccount) -> Result<UserId, IdentityError> {
        if account.auto_confirm && !self.service_key {
            return Err(IdentityError::MissingServiceCredential);
        }
        let mut guard = self.accounts.lock().expect("identity mutex poisoned");
        if guard.contains_key(&account.email) {
            return Err(IdentityError::EmailTaken);
        }
        let user_id = UserId(Uuid::new_v4().to_string());
        guard.insert(
            account.email,
            LocalAccount {
                user_id: user_id.clone(),
                credential: account.credential,
            },
        );
        Ok(user_id)
    }

    fn sign_in(&self, email: &str, credential: &str) -> Result<Session, IdentityError> {
        let guard = self.accounts.lock().expect("identity mutex poisoned");
        match guard.get(email) {
            Some(account) if account.credential == credential => Ok(Session {
                user_id: account.user_id.clone(),
                email: email.to_string(),
                access_token: Uuid::new_v4().simple().to_string(),
                expires_at: Utc::now() + Duration::hours(1),
            }),
            _ => Err(IdentityError::InvalidCredentials),
        }
    }

    fn send_password_reset(&self, email: &str) -> Result<(), IdentityError> {
        info!(%email, "password reset link issued");
        Ok(())
    }
}

/// Renders each message into the log and keeps it for inspection.
#[derive(Debug, Default)]
pub(crate) struct LogMailer {
    outbox: Mutex<Vec<EmailMessage>>,
}

impl LogMailer {
    pub(crate) fn outbox(&self) -> Vec<EmailMessage> {
        self.outbox.lock().expect("outbox mutex poisoned").clone()
    }
}

impl Mailer for LogMailer {
    fn send(&self, message: EmailMessage) -> Result<(), NotificationError> {
        let rendered = message.render();
        info!(
            to = %message.to,
            template = message.template.label(),
            subject = %rendered.subject,
            "email sent"
        );
        self.outbox
            .lock()
            .expect("outbox mutex poisoned")
            .push(message);
        Ok(())
    }
}

/// Writes proofs below a local directory and returns `file://` URLs.
#[derive(Debug, Clone)]
pub(crate) struct LocalProofStorage {
    root: PathBuf,
}

impl LocalProofStorage {
    pub(crate) fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ProofStorage for LocalProofStorage {
    fn upload(&self, path: &str, file: &ProofFile) -> Result<String, StorageError> {
        let target = self.root.join(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|err| StorageError::Backend(err.to_string()))?;
        }
        fs::write(&target, &file.bytes).map_err(|err| StorageError::Backend(err.to_string()))?;
        let absolute = fs::canonicalize(&target).unwrap_or(target);
        Ok(format!("file://{}", absolute.display()))
    }
}

/// Proof file read from disk, typed by its extension.
pub(crate) fn proof_from_path(path: &std::path::Path) -> Result<ProofFile, std::io::Error> {
    let bytes = fs::read(path)?;
    let content_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string();
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "proof".to_string());
    Ok(ProofFile {
        file_name,
        content_type,
        bytes,
    })
}

pub(crate) struct SeededPortfolio {
    pub(crate) building: Building,
    pub(crate) apartments: Vec<Apartment>,
}

/// Sample building, units and vendors for local runs.
pub(crate) fn seed_portfolio(directory: &Directory) -> Result<SeededPortfolio, WorkflowError> {
    let building = directory.create_building(NewBuilding {
        name: "Maple Court".to_string(),
        address: "12 Maple St".to_string(),
        city: "Des Moines".to_string(),
        total_units: 4,
    })?;

    let mut apartments = Vec::new();
    for (unit_number, floor, monthly_rent) in
        [("A101", 1, 1000), ("A102", 1, 1050), ("B201", 2, 1200)]
    {
        apartments.push(directory.add_apartment(
            &building.id,
            ApartmentRequest {
                unit_number: unit_number.to_string(),
                floor,
                monthly_rent,
            },
        )?);
    }

    for (name, category) in [
        ("Rapid Rooter", VendorCategory::Plumbing),
        ("Volt Brothers", VendorCategory::Electrical),
    ] {
        directory.register_vendor(NewVendor {
            name: name.to_string(),
            category,
            email: None,
            phone: None,
            notes: None,
        })?;
    }

    Ok(SeededPortfolio {
        building,
        apartments,
    })
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

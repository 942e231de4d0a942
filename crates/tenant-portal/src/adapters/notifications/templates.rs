use std::fmt::Write as _;

use serde::Serialize;

use super::{EmailMessage, EmailTemplate};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedEmail {
    pub subject: String,
    pub text_body: String,
}

pub(super) fn render(message: &EmailMessage) -> RenderedEmail {
    let param = |key: &str| message.param(key).unwrap_or_default();

    match message.template {
        EmailTemplate::TenantInvitation => {
            let mut body = String::new();
            let _ = writeln!(body, "Hello {},", param("first_name"));
            let _ = writeln!(
                body,
                "\nYou have been invited to join {} as the tenant of unit {}.",
                param("building_name"),
                param("unit_number")
            );
            if let Some(note) = message.param("message").filter(|note| !note.is_empty()) {
                let _ = writeln!(body, "\nA note from your property manager:\n{note}");
            }
            let reset_requested = message.param("password_reset_requested").is_some();
            match message.param("temporary_password") {
                Some(password) => {
                    let _ = writeln!(
                        body,
                        "\nSign in at {} with your email and the temporary password {password}. \
                         You will be asked to choose a new password.",
                        param("login_url")
                    );
                }
                None if reset_requested => {
                    let _ = writeln!(
                        body,
                        "\nYour account is ready. Use the password reset link we sent separately, \
                         then sign in at {}.",
                        param("login_url")
                    );
                }
                None => {
                    let _ = writeln!(
                        body,
                        "\nCreate your account at {}.",
                        param("accept_url")
                    );
                }
            }
            let _ = writeln!(body, "\nThis invitation expires on {}.", param("expires_at"));
            RenderedEmail {
                subject: format!("You're invited to {}", param("building_name")),
                text_body: body,
            }
        }
        EmailTemplate::PaymentSubmitted => RenderedEmail {
            subject: "We received your payment".to_string(),
            text_body: format!(
                "Your payment of {} {} (reference {}) was received and is awaiting review.\n",
                param("amount"),
                param("currency"),
                param("reference_number")
            ),
        },
        EmailTemplate::PaymentReviewRequested => RenderedEmail {
            subject: format!("Payment {} needs review", param("payment_id")),
            text_body: format!(
                "{} submitted a payment of {} {} with proof {}.\n",
                param("submitted_by"),
                param("amount"),
                param("currency"),
                param("proof_url")
            ),
        },
        EmailTemplate::PaymentApproved => RenderedEmail {
            subject: "Your payment was approved".to_string(),
            text_body: format!(
                "Your payment of {} {} was approved on {}.\n",
                param("amount"),
                param("currency"),
                param("paid_date")
            ),
        },
        EmailTemplate::PaymentRejected => {
            let mut body = format!(
                "Your payment of {} {} could not be verified.\n",
                param("amount"),
                param("currency")
            );
            if let Some(notes) = message.param("review_notes").filter(|notes| !notes.is_empty()) {
                let _ = writeln!(body, "Reviewer notes: {notes}");
            }
            body.push_str("Please upload a new proof of payment.\n");
            RenderedEmail {
                subject: "Your payment needs attention".to_string(),
                text_body: body,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invitation_with_credential_points_to_login() {
        let message = EmailMessage::new("tenant@example.com", EmailTemplate::TenantInvitation)
            .with_param("first_name", "Dana")
            .with_param("building_name", "Maple Court")
            .with_param("unit_number", "A101")
            .with_param("login_url", "https://portal.example.com/login")
            .with_param("temporary_password", "Tmp-123")
            .with_param("expires_at", "2026-10-26");

        let rendered = message.render();

        assert_eq!(rendered.subject, "You're invited to Maple Court");
        assert!(rendered.text_body.contains("Tmp-123"));
        assert!(rendered.text_body.contains("https://portal.example.com/login"));
        assert!(!rendered.text_body.contains("Create your account"));
    }

    #[test]
    fn invitation_without_credential_points_to_signup() {
        let message = EmailMessage::new("tenant@example.com", EmailTemplate::TenantInvitation)
            .with_param("accept_url", "https://portal.example.com/accept/inv-1");

        let rendered = message.render();

        assert!(rendered
            .text_body
            .contains("Create your account at https://portal.example.com/accept/inv-1"));
    }

    #[test]
    fn rejection_includes_reviewer_notes() {
        let message = EmailMessage::new("tenant@example.com", EmailTemplate::PaymentRejected)
            .with_param("amount", "500")
            .with_param("currency", "USD")
            .with_param("review_notes", "Receipt is illegible");

        let rendered = message.render();

        assert!(rendered.text_body.contains("Receipt is illegible"));
        assert!(rendered.text_body.contains("500 USD"));
    }
}

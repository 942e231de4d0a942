use crate::infra::{proof_from_path, seed_portfolio, PortalServices};
use chrono::{Local, NaiveDate};
use clap::Args;
use std::path::PathBuf;
use tenant_portal::adapters::{EmailTemplate, ProofFile};
use tenant_portal::config::PortalConfig;
use tenant_portal::domain::{PaymentMethod, PaymentType, ReviewDecision, UserId};
use tenant_portal::error::AppError;
use tenant_portal::workflows::invitations::InvitationRequest;
use tenant_portal::workflows::payments::{PaymentSubmission, ReviewRequest};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Invitee email address.
    #[arg(long, default_value = "dana@example.com")]
    pub(crate) tenant_email: String,
    /// Amount to submit. Defaults to the unit's monthly rent.
    #[arg(long)]
    pub(crate) amount: Option<u32>,
    /// Payment date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) payment_date: Option<NaiveDate>,
    /// Proof of payment to upload (jpg, png, gif or pdf). A small PDF is used otherwise.
    #[arg(long)]
    pub(crate) proof: Option<PathBuf>,
    /// Reject the first submission and resubmit before approving.
    #[arg(long)]
    pub(crate) reject_first: bool,
    /// Directory for uploaded proofs.
    #[arg(long, default_value = "./proofs")]
    pub(crate) proof_dir: String,
}

const MANAGER_ID: &str = "demo-manager";

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        tenant_email,
        amount,
        payment_date,
        proof,
        reject_first,
        proof_dir,
    } = args;

    let config = PortalConfig {
        identity_service_key: Some("demo-service-key".to_string()),
        admin_emails: vec!["manager@example.com".to_string()],
        proof_storage_dir: proof_dir,
        ..PortalConfig::default()
    };
    let services = PortalServices::in_memory(&config);

    println!("Tenant portal demo");
    let seeded = seed_portfolio(&services.directory)?;
    println!(
        "- Seeded {} with {} vacant units",
        seeded.building.name,
        seeded.apartments.len()
    );
    let Some(apartment) = seeded.apartments.first() else {
        println!("  No apartments available to invite into");
        return Ok(());
    };

    let receipt = services.invitations.send_invitation(InvitationRequest {
        email: tenant_email.clone(),
        first_name: "Dana".to_string(),
        last_name: "Reyes".to_string(),
        building_id: seeded.building.id.clone(),
        apartment_id: apartment.id.clone(),
        message: Some("Welcome to Maple Court".to_string()),
    })?;
    println!(
        "\nInvited {} to unit {} (invitation {})",
        receipt.invitation.email, apartment.unit_number, receipt.invitation.id
    );
    println!(
        "- Placeholder tenant {} | deposit {} | lease {} to {}",
        receipt.tenant.id,
        receipt.tenant.deposit_amount,
        receipt.tenant.lease_start_date,
        receipt.tenant.lease_end_date
    );
    for degradation in &receipt.degradations {
        println!("  ! {} ({})", degradation.step, degradation.detail);
    }

    let Some(credential) = services
        .mailer
        .outbox()
        .iter()
        .rev()
        .find(|message| message.template == EmailTemplate::TenantInvitation)
        .and_then(|message| message.param("temporary_password").map(str::to_string))
    else {
        println!("  No temporary credential was issued; the tenant must sign up themselves");
        return Ok(());
    };

    let accepted = services
        .invitations
        .complete_first_sign_in(&tenant_email, &credential)?;
    let Some(user_id) = accepted.tenant.user_id.clone() else {
        println!("  Tenancy was not linked to an account");
        return Ok(());
    };
    println!(
        "- First sign-in accepted invitation; tenant {} active={}",
        accepted.tenant.id, accepted.tenant.is_active
    );

    let proof_file = match proof {
        Some(path) => proof_from_path(&path)?,
        None => sample_proof(),
    };
    let submission = PaymentSubmission {
        amount: amount.unwrap_or(apartment.monthly_rent),
        currency: None,
        payment_method: PaymentMethod::BankTransfer,
        payment_type: PaymentType::Rent,
        payment_date: payment_date.unwrap_or_else(|| Local::now().date_naive()),
        reference_number: Some("DEMO-0001".to_string()),
        proof: Some(proof_file.clone()),
    };
    let submitted = services.payments.submit_payment(&user_id, submission)?;
    print_payment("Submitted", &submitted.payment.view());
    println!(
        "  Notifications: {} delivered, {} failed",
        submitted.notifications.delivered, submitted.notifications.failed
    );

    let mut payment = submitted.payment;
    if reject_first {
        let rejected = services.payments.review_payment(ReviewRequest {
            payment_id: payment.id.clone(),
            reviewer_id: UserId::from(MANAGER_ID),
            decision: ReviewDecision::Rejected,
            notes: Some("Reference number is not visible".to_string()),
        })?;
        print_payment("Rejected", &rejected.view());

        let resubmitted = services.payments.resubmit_payment(
            &rejected.id,
            &user_id,
            Some(proof_file),
            Some("DEMO-0001-B".to_string()),
        )?;
        print_payment("Resubmitted", &resubmitted.payment.view());
        payment = resubmitted.payment;
    }

    let approved = services.payments.review_payment(ReviewRequest {
        payment_id: payment.id.clone(),
        reviewer_id: UserId::from(MANAGER_ID),
        decision: ReviewDecision::Approved,
        notes: None,
    })?;
    print_payment("Approved", &approved.view());

    let history = services.payments.payments_for_tenant(&user_id)?;
    match serde_json::to_string_pretty(&history.iter().map(|payment| payment.view()).collect::<Vec<_>>()) {
        Ok(json) => println!("\nPayment history payload:\n{json}"),
        Err(err) => println!("\nPayment history payload unavailable: {err}"),
    }

    println!("\nEmails sent:");
    for message in services.mailer.outbox() {
        println!("  - {} -> {}", message.template.label(), message.to);
    }

    Ok(())
}

fn print_payment(label: &str, view: &tenant_portal::domain::PaymentView) {
    println!(
        "- {label} payment {} | {} {} | status {} | submission {}",
        view.payment_id,
        view.amount,
        view.currency,
        view.status,
        view.submission_status.unwrap_or("-")
    );
    if let Some(url) = &view.proof_url {
        println!("  Proof stored at {url}");
    }
}

fn sample_proof() -> ProofFile {
    ProofFile {
        file_name: "receipt.pdf".to_string(),
        content_type: "application/pdf".to_string(),
        bytes: b"%PDF-1.4\n% demo receipt\n".to_vec(),
    }
}

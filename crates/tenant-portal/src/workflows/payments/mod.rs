//! Rent payment submission, review and settlement.

mod proof;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use router::payment_router;
pub use service::{
    ManualPayment, PaymentSubmission, PaymentWorkflow, ReviewRequest, SubmissionReceipt,
    DEFAULT_CURRENCY,
};

//! Tenant invitation lifecycle: invite, accept, first sign-in, resume, decline, expire.

pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use router::invitation_router;
pub use service::{
    AcceptInvitationRequest, AcceptanceReceipt, InvitationReceipt, InvitationRequest,
    InvitationWorkflow,
};

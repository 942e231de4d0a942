//! Boundaries to the hosted services the workflows call.
//!
//! Each collaborator is a `Send + Sync` trait so workflows can be shared across request
//! handlers and exercised with in-memory doubles.

pub mod identity;
pub mod notifications;
pub mod storage;
pub mod store;

pub use identity::{AccountMetadata, IdentityError, IdentityProvider, NewAccount, Session};
pub use notifications::{EmailMessage, EmailTemplate, Mailer, NotificationError, RenderedEmail};
pub use storage::{ProofFile, ProofStorage, StorageError};
pub use store::{InMemoryPropertyStore, PropertyStore, RepositoryError, StoreOperation};

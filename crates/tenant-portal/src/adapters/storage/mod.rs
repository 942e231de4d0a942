use serde::{Deserialize, Serialize};

mod drive;

pub use drive::GoogleDriveProofStorage;

/// Proof-of-payment document as received from the tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ProofFile {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Lower-cased extension of the original file name, if any.
    pub fn extension(&self) -> Option<String> {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.trim().to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
    }
}

/// Object storage for uploaded proofs. Returns a durable URL for the stored object.
pub trait ProofStorage: Send + Sync {
    fn upload(&self, path: &str, file: &ProofFile) -> Result<String, StorageError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("storage backend failed: {0}")]
    Backend(String),
    #[error("storage runtime unavailable: {0}")]
    Runtime(String),
}

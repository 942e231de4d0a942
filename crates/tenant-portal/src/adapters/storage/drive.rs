use std::future::Future;
use std::io::Cursor;

use google_drive3::{api::File, api::Scope, DriveHub};
use mime::Mime;
use tokio::runtime::{Handle, RuntimeFlavor};

use super::{ProofFile, ProofStorage, StorageError};

/// Stores proofs in a shared Google Drive folder, one sub-path per tenant.
///
/// The generated client is async. Uploads are driven on the runtime behind `handle`, so the
/// synchronous workflows can call it from plain threads and from multi-threaded runtime workers.
pub struct GoogleDriveProofStorage<C>
where
    C: google_drive3::common::Connector + Send + Sync + 'static,
{
    hub: DriveHub<C>,
    handle: Handle,
    folder_id: String,
}

impl<C> GoogleDriveProofStorage<C>
where
    C: google_drive3::common::Connector + Send + Sync + 'static,
{
    pub fn new(hub: DriveHub<C>, handle: Handle, folder_id: impl Into<String>) -> Self {
        Self {
            hub,
            handle,
            folder_id: folder_id.into(),
        }
    }

    /// Binds to the runtime the caller is running on.
    pub fn on_current_runtime(
        hub: DriveHub<C>,
        folder_id: impl Into<String>,
    ) -> Result<Self, StorageError> {
        let handle =
            Handle::try_current().map_err(|err| StorageError::Runtime(err.to_string()))?;
        Ok(Self::new(hub, handle, folder_id))
    }

    fn map_error<E: std::fmt::Display>(err: E) -> StorageError {
        StorageError::Backend(err.to_string())
    }
}

impl<C> std::fmt::Debug for GoogleDriveProofStorage<C>
where
    C: google_drive3::common::Connector + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleDriveProofStorage")
            .field("folder_id", &self.folder_id)
            .finish_non_exhaustive()
    }
}

impl<C> ProofStorage for GoogleDriveProofStorage<C>
where
    C: google_drive3::common::Connector + Send + Sync + 'static,
{
    fn upload(&self, path: &str, file: &ProofFile) -> Result<String, StorageError> {
        let (metadata, content_type) = upload_metadata(&self.folder_id, path, file)?;
        let cursor = Cursor::new(file.bytes.clone());

        let result = run_blocking(&self.handle, async {
            self.hub
                .files()
                .create(metadata)
                .param("fields", "id,webViewLink")
                .supports_all_drives(true)
                .add_scope(Scope::File)
                .upload(cursor, content_type)
                .await
        })?;

        let (_, created) = result.map_err(GoogleDriveProofStorage::<C>::map_error)?;
        match (created.web_view_link, created.id) {
            (Some(link), _) => Ok(link),
            (None, Some(id)) => Ok(format!("https://drive.google.com/file/d/{id}/view")),
            (None, None) => Err(StorageError::Backend(
                "drive returned no file id for the upload".to_string(),
            )),
        }
    }
}

/// Drive metadata and media type for one proof. The workflows hand over validated types.
fn upload_metadata(
    folder_id: &str,
    path: &str,
    file: &ProofFile,
) -> Result<(File, Mime), StorageError> {
    let content_type: Mime = file.content_type.trim().parse().map_err(|_| {
        StorageError::Backend(format!(
            "proof has no usable content type: '{}'",
            file.content_type
        ))
    })?;
    let metadata = File {
        name: Some(path.replace('/', "_")),
        mime_type: Some(content_type.essence_str().to_string()),
        parents: Some(vec![folder_id.to_string()]),
        description: Some(format!("proof of payment: {}", file.file_name)),
        ..File::default()
    };
    Ok((metadata, content_type))
}

/// Drives `future` to completion from synchronous code.
///
/// Plain threads block on the handle directly. Workers of a multi-threaded runtime hand their
/// other tasks off with `block_in_place` first. A current-thread runtime cannot be blocked
/// without stalling itself, so that case is refused.
fn run_blocking<F: Future>(handle: &Handle, future: F) -> Result<F::Output, StorageError> {
    match Handle::try_current() {
        Err(_) => Ok(handle.block_on(future)),
        Ok(current) => match current.runtime_flavor() {
            RuntimeFlavor::MultiThread => {
                Ok(tokio::task::block_in_place(|| handle.block_on(future)))
            }
            _ => Err(StorageError::Runtime(
                "drive uploads need a multi-threaded runtime".to_string(),
            )),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::runtime::Runtime;

    fn proof(content_type: &str) -> ProofFile {
        ProofFile {
            file_name: "receipt.pdf".to_string(),
            content_type: content_type.to_string(),
            bytes: b"%PDF-1.7".to_vec(),
        }
    }

    #[test]
    fn metadata_uses_the_folder_and_flattened_path() {
        let (metadata, content_type) =
            upload_metadata("folder-1", "usr-9/1700000000000.pdf", &proof("application/pdf"))
                .expect("metadata");

        assert_eq!(content_type, mime::APPLICATION_PDF);
        assert_eq!(metadata.name.as_deref(), Some("usr-9_1700000000000.pdf"));
        assert_eq!(metadata.mime_type.as_deref(), Some("application/pdf"));
        assert_eq!(metadata.parents, Some(vec!["folder-1".to_string()]));
    }

    #[test]
    fn untyped_proofs_are_refused_before_any_request() {
        assert!(matches!(
            upload_metadata("folder-1", "usr-9/1.pdf", &proof("")),
            Err(StorageError::Backend(_))
        ));
    }

    #[test]
    fn blocks_on_the_handle_from_a_plain_thread() {
        let runtime = Runtime::new().expect("runtime");
        let value = run_blocking(runtime.handle(), async { 7 }).expect("completed");
        assert_eq!(value, 7);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn blocks_in_place_inside_a_multi_threaded_runtime() {
        let handle = Handle::current();
        let value = run_blocking(&handle, async {
            tokio::task::yield_now().await;
            7
        })
        .expect("completed");
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn refuses_to_stall_a_current_thread_runtime() {
        let handle = Handle::current();
        assert!(matches!(
            run_blocking(&handle, async { 7 }),
            Err(StorageError::Runtime(_))
        ));
    }
}

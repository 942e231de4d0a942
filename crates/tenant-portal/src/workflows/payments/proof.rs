use chrono::{DateTime, Utc};
use mime::Mime;

use crate::adapters::ProofFile;
use crate::domain::UserId;
use crate::workflows::error::ValidationError;

fn accepted_types() -> [Mime; 4] {
    [
        mime::IMAGE_JPEG,
        mime::IMAGE_PNG,
        mime::IMAGE_GIF,
        mime::APPLICATION_PDF,
    ]
}

/// Checks presence, type and size of a proof upload and returns its parsed media type.
pub(crate) fn validate_proof(
    proof: Option<&ProofFile>,
    max_bytes: usize,
) -> Result<Mime, ValidationError> {
    let proof = proof
        .filter(|file| !file.bytes.is_empty())
        .ok_or(ValidationError::MissingProof)?;

    let declared = proof.content_type.trim();
    let media_type: Mime = match declared {
        "" | "application/octet-stream" => type_from_extension(proof)
            .ok_or_else(|| ValidationError::UnsupportedProofType(declared.to_string()))?,
        _ => declared
            .parse()
            .map_err(|_| ValidationError::UnsupportedProofType(declared.to_string()))?,
    };
    let accepted = accepted_types()
        .iter()
        .any(|candidate| candidate.essence_str() == media_type.essence_str());
    if !accepted {
        return Err(ValidationError::UnsupportedProofType(
            media_type.essence_str().to_string(),
        ));
    }

    if proof.size() > max_bytes {
        return Err(ValidationError::ProofTooLarge {
            size: proof.size(),
            limit: max_bytes,
        });
    }
    Ok(media_type)
}

/// Clients that send no usable content type are typed by file extension.
fn type_from_extension(proof: &ProofFile) -> Option<Mime> {
    match proof.extension()?.as_str() {
        "jpg" | "jpeg" => Some(mime::IMAGE_JPEG),
        "png" => Some(mime::IMAGE_PNG),
        "gif" => Some(mime::IMAGE_GIF),
        "pdf" => Some(mime::APPLICATION_PDF),
        _ => None,
    }
}

/// Replaces the declared content type with the validated one, so storage never sees an
/// empty or generic type.
pub(crate) fn with_media_type(proof: ProofFile, media_type: &Mime) -> ProofFile {
    ProofFile {
        content_type: media_type.essence_str().to_string(),
        ..proof
    }
}

/// Object key for an upload: `{user_id}/{millis}.{ext}`.
pub(crate) fn proof_path(user_id: &UserId, media_type: &Mime, at: DateTime<Utc>) -> String {
    let extension = match media_type.subtype().as_str() {
        "jpeg" => "jpg",
        "png" => "png",
        "gif" => "gif",
        _ => "pdf",
    };
    format!("{user_id}/{}.{extension}", at.timestamp_millis())
}

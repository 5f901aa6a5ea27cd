//! Content fingerprint of a documents directory.
//!
//! Used by [`IndexFreshness::Fingerprint`](crate::IndexFreshness::Fingerprint)
//! to tell whether a persisted index still matches the PDFs on disk.

use std::path::PathBuf;

use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::loader::document_id;

/// Hash the names and contents of `files` into a hex digest.
///
/// The digest does not depend on the order of `files`; adding, removing,
/// renaming, or editing any file changes it.
pub async fn corpus_fingerprint(files: &[PathBuf]) -> Result<String> {
    let mut sorted: Vec<&PathBuf> = files.iter().collect();
    sorted.sort_by_key(|path| document_id(path));

    let mut hasher = Sha256::new();
    for path in sorted {
        let content = tokio::fs::read(path).await?;
        let content_hash = Sha256::digest(&content);

        hasher.update(document_id(path).as_bytes());
        hasher.update([0u8]);
        hasher.update((content.len() as u64).to_le_bytes());
        hasher.update(content_hash);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use ts_rs::TS;

/// Identity of an open book in a given file format.
///
/// Per-page state (dimensions, load states, measurements) is only valid for
/// one key and is discarded when the key changes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BookKey {
    pub book_id: String,
    pub format: String,
}

impl BookKey {
    pub fn new(book_id: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            book_id: book_id.into().trim().to_string(),
            format: format.into().trim().to_ascii_lowercase(),
        }
    }

    /// Stable hex digest used to name per-book cache directories.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.book_id.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.format.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

impl std::fmt::Display for BookKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.book_id, self.format)
    }
}

//! ReceiptExtractor trait — the capability "given an image, return
//! structured receipt data".
//!
//! Extraction is delegated entirely to an external multimodal model; this
//! crate only owns the contract. Implementations: Anthropic Messages API,
//! OpenAI-compatible chat completions.

use async_trait::async_trait;

use crate::error::ExtractionError;
use crate::receipt::ReceiptData;

/// A receipt photo as uploaded: raw bytes plus the declared mime type.
#[derive(Clone)]
pub struct ReceiptImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ReceiptImage {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }
}

// Manual Debug: log the byte count, not the bytes.
impl std::fmt::Debug for ReceiptImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiptImage")
            .field("bytes", &format!("{} bytes", self.bytes.len()))
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

/// The extraction capability.
///
/// One call per upload; any error or empty/unparseable response is a single
/// terminal [`ExtractionError`] — there is no partial-parse recovery.
#[async_trait]
pub trait ReceiptExtractor: Send + Sync {
    /// A human-readable name for this backend (e.g., "anthropic").
    fn name(&self) -> &str;

    /// Parse the image into receipt data.
    async fn extract(&self, image: &ReceiptImage)
    -> std::result::Result<ReceiptData, ExtractionError>;
}

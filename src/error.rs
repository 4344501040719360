use thiserror::Error;

/// Errors raised by the signing engine.
///
/// `Scan` never reaches the host: scanning degrades to an empty candidate list.
/// `DocumentLoad` aborts a load, `ImageDecode` and `PageOutOfRange` abort an export.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SignError {
    #[error("text extraction failed: {message}")]
    Scan { message: String },

    #[error("failed to load document: {message}")]
    DocumentLoad { message: String },

    #[error("failed to decode signature image: {message}")]
    ImageDecode { message: String },

    #[error("page {page} is out of range (document has {page_count} pages)")]
    PageOutOfRange { page: u32, page_count: u32 },

    #[error("no document loaded")]
    NoDocument,

    #[error("no signature placed")]
    NoPlacement,

    #[error("create a signature first")]
    SignatureMissing,

    #[error("signature drawing is empty")]
    SignatureEmpty,

    #[error("failed to write signed document: {message}")]
    Serialize { message: String },

    #[error("configuration error: {message}")]
    Config { message: String },
}

impl SignError {
    pub fn scan(message: impl Into<String>) -> Self {
        Self::Scan {
            message: message.into(),
        }
    }

    pub fn document_load(message: impl Into<String>) -> Self {
        Self::DocumentLoad {
            message: message.into(),
        }
    }

    pub fn image_decode(message: impl Into<String>) -> Self {
        Self::ImageDecode {
            message: message.into(),
        }
    }

    /// Stable snake_case code handed to the host and used as the i18n key suffix.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Scan { .. } => "scan_failed",
            Self::DocumentLoad { .. } => "document_load_failed",
            Self::ImageDecode { .. } => "image_decode_failed",
            Self::PageOutOfRange { .. } => "page_out_of_range",
            Self::NoDocument => "no_document",
            Self::NoPlacement => "no_placement",
            Self::SignatureMissing => "signature_missing",
            Self::SignatureEmpty => "signature_empty",
            Self::Serialize { .. } => "serialize_failed",
            Self::Config { .. } => "config_failed",
        }
    }
}

pub type SignResult<T> = Result<T, SignError>;

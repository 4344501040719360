//! Signature placement engine: finds the signature area of a PDF, resolves
//! one placement for the signature image and stamps it into the document.
//!
//! Hosts drive the engine through [`dispatch`], which takes one JSON command
//! and returns either a UI tree or an export payload. Native hosts reach the same
//! entry point through the C ABI in [`ffi`]. The building blocks in
//! [`features`] are usable on their own.

rust_i18n::i18n!("locales", fallback = "en");

pub mod config;
pub mod error;
pub mod features;
pub mod ffi;
mod i18n;
mod router;
pub mod state;
#[cfg(test)]
mod test_support;
mod ui;

pub use config::{load_session_config, SessionConfig};
pub use error::{SignError, SignResult};
pub use features::export::{compose, ExportResult};
pub use features::placement::{PlacementResolver, SignaturePosition};
pub use features::scanner::{scan_document, PlaceholderCandidate, ScanMode, ScanOutcome};
pub use features::signature_pad::SignatureImage;
pub use router::dispatch;
pub use state::AppState;

/// Install a compact fmt subscriber filtered by `RUST_LOG`, defaulting to
/// `indusign_core=info`. Safe to call more than once.
pub fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let format = fmt::format()
        .with_target(true)
        .with_thread_ids(true)
        .compact();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("indusign_core=info"));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().event_format(format))
        .with(filter)
        .try_init();
}

//! Session configuration loaded once from an optional file and environment variables.

use std::path::Path;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::{SignError, SignResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Hi,
}

impl Language {
    pub fn as_locale(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Hi => "hi",
        }
    }
}

/// Export stamp size in PDF points.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    pub signature_width: f64,
    pub signature_height: f64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            signature_width: 150.0,
            signature_height: 60.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewerConfig {
    /// Upper bound for the fit-to-width/height/page zoom.
    pub max_fit_scale: f64,
    /// Vertical distance (points) under which two runs share a line.
    pub line_tolerance: f64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            max_fit_scale: 3.0,
            line_tolerance: 3.0,
        }
    }
}

/// Canvas used to rasterise drawn signatures.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PadConfig {
    pub width: u32,
    pub height: u32,
    pub pen_radius: i32,
}

impl Default for PadConfig {
    fn default() -> Self {
        Self {
            width: 500,
            height: 200,
            pen_radius: 2,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    pub language: Language,
    pub export: ExportConfig,
    pub viewer: ViewerConfig,
    pub pad: PadConfig,
}

/// Load from `indusign.{toml,...}` in the working directory (optional) and `INDUSIGN__*` env vars.
pub fn load_session_config() -> SignResult<SessionConfig> {
    build(File::with_name("indusign").required(false))
}

/// Same as [`load_session_config`] but reading an explicit file.
pub fn load_session_config_from(path: &Path) -> SignResult<SessionConfig> {
    build(File::from(path).required(true))
}

fn build<S>(file: S) -> SignResult<SessionConfig>
where
    S: config::Source + Send + Sync + 'static,
{
    let config = Config::builder()
        .add_source(file)
        .add_source(
            Environment::with_prefix("INDUSIGN")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| SignError::Config {
            message: format!("failed to build config: {e}"),
        })?
        .try_deserialize::<SessionConfig>()
        .map_err(|e| SignError::Config {
            message: format!("failed to deserialize session config: {e}"),
        })?;
    validate(config)
}

fn validate(config: SessionConfig) -> SignResult<SessionConfig> {
    if config.export.signature_width <= 0.0 || config.export.signature_height <= 0.0 {
        return Err(SignError::Config {
            message: "export signature size must be positive".into(),
        });
    }
    if config.pad.width == 0 || config.pad.height == 0 {
        return Err(SignError::Config {
            message: "signature pad size must be positive".into(),
        });
    }
    Ok(config)
}

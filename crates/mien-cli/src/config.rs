use mien_core::{PipelineConfig, DEFAULT_FACE_SIDE, DEFAULT_MATCH_THRESHOLD};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {var}")]
    Invalid { var: &'static str, value: String },
}

/// CLI configuration, loaded from `MIEN_*` environment variables.
///
/// The database and detector model locations are mandatory — there are no
/// built-in fallback paths. Tunables default to the library constants.
#[derive(Debug)]
pub struct Config {
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
    /// Path to the SeetaFace cascade model file.
    pub detect_model: PathBuf,
    /// Maximum L2 distance for a positive match.
    pub match_threshold: f32,
    /// Canonical face template side length.
    pub face_side: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path = get("MIEN_DB_PATH")
            .map(PathBuf::from)
            .ok_or(ConfigError::Missing("MIEN_DB_PATH"))?;
        let detect_model = get("MIEN_DETECT_MODEL")
            .map(PathBuf::from)
            .ok_or(ConfigError::Missing("MIEN_DETECT_MODEL"))?;

        Ok(Self {
            db_path,
            detect_model,
            match_threshold: parsed(&get, "MIEN_MATCH_THRESHOLD", DEFAULT_MATCH_THRESHOLD)?,
            face_side: parsed(&get, "MIEN_FACE_SIDE", DEFAULT_FACE_SIDE)?,
        })
    }

    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            face_side: self.face_side,
            match_threshold: self.match_threshold,
        }
    }
}

/// Parse an optional tunable. An absent variable takes the default; a
/// present-but-unparsable one is a startup error, never silently defaulted.
fn parsed<F, T>(get: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match get(var) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid { var, value: raw }),
    }
}

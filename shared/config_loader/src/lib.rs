//! # Config Loader
//!
//! Locates JSON configuration files and deserializes them with serde.
//!
//! ```no_run
//! use config_loader::{find_config_file, load_json_file};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize, Default)]
//! #[serde(default)]
//! struct Settings {
//!     max_chunk_size: usize,
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let path = find_config_file("peerlink.json")?;
//!     let settings: Settings = load_json_file(&path)?;
//!     println!("chunk size: {}", settings.max_chunk_size);
//!     Ok(())
//! }
//! ```

pub mod error;

pub use error::{ConfigError, Result};

use serde::de::DeserializeOwned;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable that may point directly at a configuration file.
pub const CONFIG_PATH_ENV: &str = "CONFIG_PATH";

/// Carga el contenido de un archivo de configuración.
///
/// Reads the file as UTF-8 text without interpreting it.
pub fn load_config_file<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))
}

/// Reads `path` and deserializes its JSON content into `T`.
pub fn load_json_file<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let path = path.as_ref();
    let content = load_config_file(path)?;
    parse_json(&content, &path.display().to_string())
}

/// Deserializes JSON text; `source_name` only feeds the error message.
pub fn parse_json<T: DeserializeOwned>(content: &str, source_name: &str) -> Result<T> {
    serde_json::from_str(content).map_err(|e| ConfigError::ParseError {
        source_name: source_name.to_string(),
        message: e.to_string(),
    })
}

/// Busca un archivo de configuración en ubicaciones comunes.
///
/// Search order:
/// 1. `CONFIG_PATH` environment variable (if it points at an existing file)
/// 2. `./config/{filename}`
/// 3. `./{filename}`
pub fn find_config_file(filename: &str) -> Result<PathBuf> {
    if let Ok(path) = env::var(CONFIG_PATH_ENV) {
        let path_buf = PathBuf::from(&path);
        if path_buf.is_file() {
            return Ok(path_buf);
        }
    }

    find_config_file_in(Path::new("."), filename)
}

/// Same as [`find_config_file`] without the environment lookup, rooted at `base`.
pub fn find_config_file_in(base: &Path, filename: &str) -> Result<PathBuf> {
    let candidates = [base.join("config").join(filename), base.join(filename)];

    candidates
        .into_iter()
        .find(|path| path.is_file())
        .ok_or_else(|| {
            ConfigError::FileNotFound(format!(
                "'{}' not found in {}, {}/config or {}",
                filename,
                CONFIG_PATH_ENV,
                base.display(),
                base.display()
            ))
        })
}

/// Busca y carga un archivo de configuración automáticamente.
pub fn find_and_load_json<T: DeserializeOwned>(filename: &str) -> Result<T> {
    let path = find_config_file(filename)?;
    load_json_file(path)
}

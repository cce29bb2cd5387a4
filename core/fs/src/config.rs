//! Settings document and its location.
//!
//! The document is the `appsettings.json` shape with PascalCase keys:
//!
//! ```json
//! {
//!   "Repositories": [
//!     { "Name": "docs", "Class": "localfs", "DataStore": "/var/ionfs/docs", "Usage": "Data" }
//!   ],
//!   "DefaultRepository": "docs",
//!   "DefaultClassification": "Restricted",
//!   "MaxSize": 50000000,
//!   "Particles": { "Class": "http", "Uri": "https://particles.example.com", "Token": "..." }
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use ionfs_common::{Error, Result};
use ionfs_particle::{
    HttpParticleStore, LocalParticleStore, MemoryParticleStore, ParticleStore,
    DEFAULT_CONCURRENCY, HARD_MAX_SIZE,
};

/// Environment variable naming the settings file.
pub const CONFIG_ENV: &str = "IONFS_CONFIG";

const CONFIG_DIRNAME: &str = ".ionfs";
const CONFIG_FILENAME: &str = "appsettings.json";

/// One configured repository.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RepositorySettings {
    pub name: String,
    /// Metadata backend class, resolved through the store registry.
    pub class: String,
    /// Backend locator (directory, database file, bucket).
    pub data_store: String,
    /// "Data" or "Secrets"; empty means "Data".
    pub usage: String,
    /// Backend-specific options.
    #[serde(skip_serializing_if = "Value::is_null")]
    pub options: Value,
    /// Marks this repository as the default.
    pub default: bool,
}

/// Particle service connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ParticleSettings {
    /// "http", "local" or "memory".
    pub class: String,
    pub uri: Option<String>,
    pub token: Option<String>,
    /// Root directory for the "local" class.
    pub data_dir: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout: u64,
}

impl Default for ParticleSettings {
    fn default() -> Self {
        Self {
            class: "http".to_string(),
            uri: None,
            token: None,
            data_dir: None,
            timeout: 300,
        }
    }
}

impl ParticleSettings {
    /// Build the particle store client these settings describe.
    ///
    /// # Errors
    /// - Unknown class
    /// - `Uri` missing for "http", `DataDir` missing for "local"
    pub fn build(&self) -> Result<Arc<dyn ParticleStore>> {
        match self.class.to_ascii_lowercase().as_str() {
            "http" | "ionburst" => {
                let uri = self.uri.as_deref().ok_or_else(|| {
                    Error::InvalidInput("Particles.Uri is required for the http class".to_string())
                })?;
                Ok(Arc::new(HttpParticleStore::new(
                    uri,
                    self.token.clone(),
                    Duration::from_secs(self.timeout.max(1)),
                )?))
            }
            "local" => {
                let dir = self.data_dir.as_deref().ok_or_else(|| {
                    Error::InvalidInput(
                        "Particles.DataDir is required for the local class".to_string(),
                    )
                })?;
                Ok(Arc::new(LocalParticleStore::new(dir)?))
            }
            "memory" => Ok(Arc::new(MemoryParticleStore::new())),
            other => Err(Error::InvalidInput(format!(
                "Unknown particle store class '{}'",
                other
            ))),
        }
    }
}

/// IonFS settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Settings {
    pub repositories: Vec<RepositorySettings>,
    pub default_repository: Option<String>,
    pub default_classification: Option<String>,
    /// Particle size ceiling in bytes.
    pub max_size: usize,
    pub use_manifest: bool,
    /// Encrypt every upload; a key becomes mandatory for `put`.
    pub encrypt: bool,
    /// Particle calls in flight per batch.
    pub concurrency: usize,
    pub verbose: bool,
    pub particles: ParticleSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            repositories: Vec::new(),
            default_repository: None,
            default_classification: None,
            max_size: HARD_MAX_SIZE,
            use_manifest: false,
            encrypt: false,
            concurrency: DEFAULT_CONCURRENCY,
            verbose: false,
            particles: ParticleSettings::default(),
        }
    }
}

impl Settings {
    /// Find the settings file.
    ///
    /// An explicit path wins, then `$IONFS_CONFIG`, then
    /// `~/.ionfs/appsettings.json`.
    ///
    /// # Errors
    /// - No explicit path, no environment variable and no home directory
    pub fn locate(explicit: Option<&Path>) -> Result<PathBuf> {
        Self::locate_with(
            explicit,
            std::env::var_os(CONFIG_ENV).map(PathBuf::from),
            dirs::home_dir(),
        )
    }

    fn locate_with(
        explicit: Option<&Path>,
        from_env: Option<PathBuf>,
        home: Option<PathBuf>,
    ) -> Result<PathBuf> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }
        if let Some(path) = from_env.filter(|p| !p.as_os_str().is_empty()) {
            return Ok(path);
        }
        home.map(|h| h.join(CONFIG_DIRNAME).join(CONFIG_FILENAME))
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "no home directory; set {} to the settings file",
                    CONFIG_ENV
                ))
            })
    }

    /// Load and validate settings from a file.
    ///
    /// # Errors
    /// - File missing or unreadable
    /// - Invalid JSON
    /// - No repositories configured
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound(format!("settings file {}", path.display()))
            } else {
                Error::Io(e)
            }
        })?;
        let settings = Self::from_json(&text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Check the settings describe at least one usable repository.
    pub fn validate(&self) -> Result<()> {
        if self.repositories.is_empty() {
            return Err(Error::InvalidInput(
                "at least one repository must be configured".to_string(),
            ));
        }
        for repo in &self.repositories {
            if repo.name.is_empty() || repo.class.is_empty() {
                return Err(Error::InvalidInput(
                    "every repository needs a Name and a Class".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Configured particle size, clamped to the hard ceiling.
    pub fn max_size(&self) -> usize {
        self.max_size.clamp(1, HARD_MAX_SIZE)
    }
}

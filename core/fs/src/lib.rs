//! IonFS filesystem layer.
//!
//! Ties the address resolver, repository registry, crypto module and
//! chunking engine together into the filesystem verbs (`put`, `get`, `del`,
//! `move`, `copy`, `list`, `mkdir`, `rmdir`, `search`, ...).
//!
//! # Example
//! ```ignore
//! let settings = Settings::load(&Settings::locate(None)?)?;
//! let fs = IonFs::from_settings(&settings)?;
//! let target = fs.resolver().resolve_folder("ion://docs/reports/", true)?;
//! fs.put(&fs.resolver().resolve_local("report.pdf"), &target, &PutOptions::default()).await?;
//! ```

pub mod address;
pub mod config;
pub mod operations;
pub mod repository;

pub use address::AddressResolver;
pub use config::{ParticleSettings, RepositorySettings, Settings, CONFIG_ENV};
pub use operations::{FsOptions, IonFs, PutOptions, Transfer};
pub use repository::{Repository, RepositoryRegistry};

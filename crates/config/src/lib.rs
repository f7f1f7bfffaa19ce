//! Configuration loading and validation.
//!
//! Values are layered, later layers winning:
//!
//! 1. built-in defaults,
//! 2. a TOML file (an explicit path, else `rpmorder.toml` in the platform
//!    configuration directory if present),
//! 3. `RPMORDER_`-prefixed environment variables, with `__` separating nested
//!    keys (`RPMORDER_REPOSITORY__VERSION=40000`),
//! 4. command-line [`Overrides`].
//!
//! ```toml
//! [repository]
//! uri = "https://cdn.download.clearlinux.org/releases"
//! version = 40000
//! cache_dir = "/var/cache/rpmorder"
//!
//! [fetch]
//! max_concurrent = 5
//! ```

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_URI: &str = "https://cdn.download.clearlinux.org/releases";
pub const DEFAULT_MAX_CONCURRENT: usize = 5;
const ENV_PREFIX: &str = "RPMORDER_";
const FILE_NAME: &str = "rpmorder.toml";

/// Validated configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub repository: RepositoryConfig,
    pub fetch: FetchConfig,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepositoryConfig {
    /// Base URI releases are published under (`http(s)://`, `file://` or a
    /// local directory).
    pub uri: String,
    /// Release to resolve against; `mash` is the floating snapshot.
    pub version: String,
    /// Root of the local metadata cache.
    pub cache_dir: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Upper bound on simultaneous downloads.
    pub max_concurrent: usize,
}
impl Default for FetchConfig {
    fn default() -> Self {
        Self { max_concurrent: DEFAULT_MAX_CONCURRENT }
    }
}

/// Shape of the merged layers before validation.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct RawConfig {
    repository: RawRepository,
    fetch: FetchConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct RawRepository {
    uri: String,
    version: Option<RawVersion>,
    cache_dir: Option<PathBuf>,
}
impl Default for RawRepository {
    fn default() -> Self {
        Self { uri: DEFAULT_URI.to_string(), version: None, cache_dir: None }
    }
}

/// Release versions are numbers (`40000`) or names (`mash`). Unquoted TOML
/// values and environment variables that look numeric arrive as integers.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum RawVersion {
    Number(u64),
    Name(String),
}
impl From<RawVersion> for String {
    fn from(version: RawVersion) -> Self {
        match version {
            RawVersion::Number(n) => n.to_string(),
            RawVersion::Name(name) => name.trim().to_string(),
        }
    }
}

/// Values given on the command line; `None` leaves the configured value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Overrides {
    pub uri: Option<String>,
    pub version: Option<String>,
    pub cache_dir: Option<PathBuf>,
    pub max_concurrent: Option<usize>,
}
impl Overrides {
    fn apply(&self, mut figment: Figment) -> Figment {
        if let Some(uri) = &self.uri {
            figment = figment.merge(Serialized::default("repository.uri", uri));
        }
        if let Some(version) = &self.version {
            figment = figment.merge(Serialized::default("repository.version", version));
        }
        if let Some(cache_dir) = &self.cache_dir {
            figment = figment.merge(Serialized::default("repository.cache_dir", cache_dir));
        }
        if let Some(max_concurrent) = self.max_concurrent {
            figment = figment.merge(Serialized::default("fetch.max_concurrent", max_concurrent));
        }
        figment
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "rpmorder")
}

impl Config {
    /// `rpmorder.toml` in the platform configuration directory.
    pub fn default_file() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(FILE_NAME))
    }

    /// Defaults, file and environment layers. An explicit `file` must exist;
    /// the default file is optional.
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(RawConfig::default()));
        match file {
            Some(path) => {
                if !path.is_file() {
                    exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
                }
                figment = figment.merge(Toml::file(path));
            },
            None => {
                if let Some(path) = Self::default_file() {
                    tracing::debug!(path = %path.display(), "using default configuration file if present");
                    figment = figment.merge(Toml::file(path));
                }
            },
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Load every layer, apply `overrides`, and validate.
    pub fn load(file: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        Self::from_figment(&overrides.apply(Self::figment(file)?))
    }

    /// Extract and validate a configuration from an assembled figment.
    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let raw: RawConfig = figment.extract().or_raise(|| ErrorKind::Load)?;

        let uri = raw.repository.uri.trim().trim_end_matches('/').to_string();
        if uri.is_empty() {
            exn::bail!(ErrorKind::Invalid("repository.uri".to_string()));
        }
        // The version becomes a cache path component.
        let version = raw
            .repository
            .version
            .map(String::from)
            .filter(|v| !v.is_empty() && !v.contains(['/', '\\']) && v != "." && v != "..")
            .ok_or_raise(|| ErrorKind::Invalid("repository.version".to_string()))?;
        let cache_dir = match raw.repository.cache_dir {
            Some(dir) => dir,
            None => project_dirs()
                .map(|dirs| dirs.cache_dir().to_path_buf())
                .ok_or_raise(|| ErrorKind::Invalid("repository.cache_dir".to_string()))?,
        };
        if raw.fetch.max_concurrent == 0 {
            exn::bail!(ErrorKind::Invalid("fetch.max_concurrent".to_string()));
        }

        Ok(Self { repository: RepositoryConfig { uri, version, cache_dir }, fetch: raw.fetch })
    }
}

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://api.radiant.earth/mlhub/v1";
pub const DEFAULT_PROFILE: &str = "default";
pub const API_KEY_ENV: &str = "MLHUB_API_KEY";
pub const BASE_URL_ENV: &str = "MLHUB_ROOT_URL";

/// Everything the client needs to talk to the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub api_key: String,
    pub base_url: Url,
}

impl ClientConfig {
    pub fn new(api_key: &str, base_url: &str) -> Result<Self> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(Error::MissingApiKey);
        }
        Ok(Self {
            api_key: api_key.to_owned(),
            base_url: Url::parse(base_url)?,
        })
    }

    pub fn with_default_url(api_key: &str) -> Result<Self> {
        Self::new(api_key, DEFAULT_BASE_URL)
    }

    /// Resolve the configuration for `profile`. Environment variables win over the profiles file,
    /// a missing profiles file is not an error.
    pub fn load(profiles_path: Option<&Path>, profile: &str) -> Result<Self> {
        Self::load_with_overrides(profiles_path, profile, None, None)
    }

    /// Like [ClientConfig::load], with explicit values that win over both the environment and the
    /// profile. Each override only replaces its own field.
    pub fn load_with_overrides(
        profiles_path: Option<&Path>,
        profile: &str,
        api_key: Option<String>,
        base_url: Option<String>,
    ) -> Result<Self> {
        let profile = match profiles_path.map(Path::to_path_buf).or_else(default_profiles_path) {
            Some(path) if path.exists() => ProfilesFile::read(path)?.profiles.remove(profile),
            _ => None,
        };
        let api_key = api_key.or_else(|| std::env::var(API_KEY_ENV).ok());
        let base_url = base_url.or_else(|| std::env::var(BASE_URL_ENV).ok());
        Self::merge(profile, api_key, base_url)
    }

    fn merge(
        profile: Option<Profile>,
        api_key: Option<String>,
        base_url: Option<String>,
    ) -> Result<Self> {
        let profile = profile.unwrap_or_default();
        let api_key = api_key
            .or(profile.api_key)
            .ok_or(Error::MissingApiKey)?;
        let base_url = base_url
            .or(profile.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self::new(&api_key, &base_url)
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct Profile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct ProfilesFile {
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl ProfilesFile {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// `~/.mlhub/config.toml`
pub fn default_profiles_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".mlhub").join("config.toml"))
}

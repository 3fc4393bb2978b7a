//! Process configuration read from the environment (and `.env`).

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use crate::storage::SupabaseConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid value '{value}' for {name}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Which blob store the deployment persists templates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackendKind {
    Supabase,
    Local,
}

impl FromStr for StorageBackendKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "supabase" | "remote" => Ok(Self::Supabase),
            "local" | "filesystem" | "fs" => Ok(Self::Local),
            other => Err(format!("expected 'supabase' or 'local', got '{}'", other)),
        }
    }
}

/// School identity printed on every report masthead.
#[derive(Debug, Clone)]
pub struct SchoolProfile {
    pub name: String,
    pub address: String,
    pub city: String,
    /// Storage keys or URLs of the left/right masthead logos.
    pub logo_left: Option<String>,
    pub logo_right: Option<String>,
}

impl Default for SchoolProfile {
    fn default() -> Self {
        Self {
            name: "Rumah Tahfidz".to_string(),
            address: String::new(),
            city: "Jakarta".to_string(),
            logo_left: None,
            logo_right: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub port: u16,
    pub storage_backend: StorageBackendKind,
    pub assets_root: PathBuf,
    pub supabase: Option<SupabaseConfig>,
    pub school: SchoolProfile,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = match env::var("PORT") {
            Ok(value) => value.parse::<u16>().map_err(|e| ConfigError::Invalid {
                name: "PORT",
                value: value.clone(),
                reason: e.to_string(),
            })?,
            Err(_) => 8080,
        };

        let storage_backend = match env::var("STORAGE_BACKEND") {
            Ok(value) => value
                .parse::<StorageBackendKind>()
                .map_err(|reason| ConfigError::Invalid {
                    name: "STORAGE_BACKEND",
                    value: value.clone(),
                    reason,
                })?,
            Err(_) => StorageBackendKind::Local,
        };

        let assets_root = env::var("ASSETS_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./public"));

        let supabase = SupabaseConfig::from_env()
            .map_err(|_| ConfigError::Missing("SUPABASE_SERVICE_KEY"))?;
        if storage_backend == StorageBackendKind::Supabase && supabase.is_none() {
            return Err(ConfigError::Missing("SUPABASE_URL"));
        }

        let defaults = SchoolProfile::default();
        let school = SchoolProfile {
            name: env::var("SCHOOL_NAME").unwrap_or(defaults.name),
            address: env::var("SCHOOL_ADDRESS").unwrap_or(defaults.address),
            city: env::var("SCHOOL_CITY").unwrap_or(defaults.city),
            logo_left: env::var("SCHOOL_LOGO_LEFT").ok().filter(|v| !v.is_empty()),
            logo_right: env::var("SCHOOL_LOGO_RIGHT").ok().filter(|v| !v.is_empty()),
        };

        Ok(Self {
            database_url,
            bind_addr,
            port,
            storage_backend,
            assets_root,
            supabase,
            school,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_backend_parsing() {
        assert_eq!(
            "supabase".parse::<StorageBackendKind>(),
            Ok(StorageBackendKind::Supabase)
        );
        assert_eq!(
            " Local ".parse::<StorageBackendKind>(),
            Ok(StorageBackendKind::Local)
        );
        assert_eq!(
            "fs".parse::<StorageBackendKind>(),
            Ok(StorageBackendKind::Local)
        );
        assert!("s3".parse::<StorageBackendKind>().is_err());
    }

    #[test]
    fn test_default_school_profile() {
        let profile = SchoolProfile::default();
        assert!(!profile.name.is_empty());
        assert!(profile.logo_left.is_none());
        assert!(profile.logo_right.is_none());
    }
}

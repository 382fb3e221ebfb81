//! Configuration loading, profile selection and root folder resolution

use crate::{Error, Result};
use std::path::PathBuf;

/// Fallback secret for development when SECRET_KEY is unset
const DEV_SECRET_KEY: &str = "the hardest string to guess 3v4r";

/// Named configuration profile, selected by the RAGTIME_CONFIG environment
/// variable (`development`, `testing`, `production`; default `development`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Development,
    Testing,
    Production,
}

impl Profile {
    /// Parse a profile name; unknown names fall back to Development
    pub fn from_name(name: &str) -> Self {
        match name {
            "production" => Profile::Production,
            "testing" => Profile::Testing,
            _ => Profile::Development,
        }
    }

    /// Read the profile from RAGTIME_CONFIG, defaulting to development
    pub fn from_env() -> Self {
        match std::env::var("RAGTIME_CONFIG") {
            Ok(name) => Profile::from_name(&name),
            Err(_) => Profile::Development,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Profile::Development => "development",
            Profile::Testing => "testing",
            Profile::Production => "production",
        }
    }
}

/// Application configuration assembled at process start
#[derive(Debug, Clone)]
pub struct Config {
    pub profile: Profile,
    /// Cookie/token signing secret (SECRET_KEY env var)
    pub secret_key: String,
    /// Admin contact; when set, registration triggers a new-user notice (RAGTIME_ADMIN)
    pub admin_email: Option<String>,
    /// Optional webhook receiving admin notices as JSON (RAGTIME_NOTIFY_URL)
    pub notify_url: Option<String>,
    /// Data directory holding the SQLite database
    pub root_folder: PathBuf,
    /// Production-only flag: expect HTTPS termination in front of the app
    pub ssl_redirect: bool,
}

impl Config {
    /// Load configuration for the profile in RAGTIME_CONFIG
    ///
    /// `cli_root` takes priority over the RAGTIME_ROOT_FOLDER environment
    /// variable, the TOML config file, and the OS default data directory.
    pub fn load(cli_root: Option<&str>) -> Result<Self> {
        Self::load_profile(Profile::from_env(), cli_root)
    }

    /// Load configuration for an explicit profile
    pub fn load_profile(profile: Profile, cli_root: Option<&str>) -> Result<Self> {
        let secret_key = match std::env::var("SECRET_KEY") {
            Ok(key) if !key.is_empty() => key,
            _ if profile == Profile::Production => {
                return Err(Error::Config(
                    "SECRET_KEY must be set for the production profile".to_string(),
                ));
            }
            _ => DEV_SECRET_KEY.to_string(),
        };

        let admin_email = std::env::var("RAGTIME_ADMIN").ok().filter(|v| !v.is_empty());
        let notify_url = std::env::var("RAGTIME_NOTIFY_URL").ok().filter(|v| !v.is_empty());

        let ssl_redirect = profile == Profile::Production
            && std::env::var("RAGTIME_SSL_REDIRECT")
                .map(|v| v == "1" || v == "true")
                .unwrap_or(false);

        Ok(Config {
            profile,
            secret_key,
            admin_email,
            notify_url,
            root_folder: resolve_root_folder(cli_root, "RAGTIME_ROOT_FOLDER")?,
            ssl_redirect,
        })
    }

    /// Database file path for this profile; None means in-memory (testing)
    pub fn database_path(&self) -> Option<PathBuf> {
        match self.profile {
            Profile::Development => Some(self.root_folder.join("data-dev.sqlite")),
            Profile::Testing => None,
            Profile::Production => Some(self.root_folder.join("data.sqlite")),
        }
    }
}

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(cli_arg: Option<&str>, env_var_name: &str) -> Result<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Ok(PathBuf::from(path));
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    // Priority 3: TOML config file
    if let Ok(config_path) = load_config_file() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(root_folder) = config.get("root_folder").and_then(|v| v.as_str()) {
                    return Ok(PathBuf::from(root_folder));
                }
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    Ok(get_default_root_folder())
}

/// Get default configuration file path for the platform
fn load_config_file() -> Result<PathBuf> {
    if cfg!(target_os = "linux") {
        // Try ~/.config/ragtime/config.toml first, then /etc/ragtime/config.toml
        let user_config = dirs::config_dir().map(|d| d.join("ragtime").join("config.toml"));
        let system_config = PathBuf::from("/etc/ragtime/config.toml");

        if let Some(path) = user_config {
            if path.exists() {
                return Ok(path);
            }
        }
        if system_config.exists() {
            return Ok(system_config);
        }
        return Err(Error::Config("No config file found".to_string()));
    }

    let config_path = dirs::config_dir()
        .map(|d| d.join("ragtime").join("config.toml"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;

    if config_path.exists() {
        Ok(config_path)
    } else {
        Err(Error::Config(format!("Config file not found: {:?}", config_path)))
    }
}

/// Get OS-dependent default root folder path
fn get_default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        dirs::data_local_dir()
            .map(|d| d.join("ragtime"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/ragtime"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("ragtime"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/ragtime"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("ragtime"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\ragtime"))
    } else {
        PathBuf::from("./ragtime_data")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_names() {
        assert_eq!(Profile::from_name("production"), Profile::Production);
        assert_eq!(Profile::from_name("testing"), Profile::Testing);
        assert_eq!(Profile::from_name("development"), Profile::Development);
        // Unknown names fall back to development
        assert_eq!(Profile::from_name("staging"), Profile::Development);
        assert_eq!(Profile::from_name(""), Profile::Development);
    }

    #[test]
    fn test_cli_arg_wins_root_folder() {
        let root = resolve_root_folder(Some("/tmp/ragtime-cli"), "RAGTIME_TEST_UNSET_VAR").unwrap();
        assert_eq!(root, PathBuf::from("/tmp/ragtime-cli"));
    }

    #[test]
    fn test_database_path_per_profile() {
        let config = Config {
            profile: Profile::Development,
            secret_key: "x".to_string(),
            admin_email: None,
            notify_url: None,
            root_folder: PathBuf::from("/data"),
            ssl_redirect: false,
        };
        assert_eq!(config.database_path(), Some(PathBuf::from("/data/data-dev.sqlite")));

        let config = Config { profile: Profile::Testing, ..config };
        assert_eq!(config.database_path(), None);

        let config = Config { profile: Profile::Production, ..config };
        assert_eq!(config.database_path(), Some(PathBuf::from("/data/data.sqlite")));
    }
}

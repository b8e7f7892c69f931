use crate::utils::error::{LibraryError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "library.toml";
pub const IN_MEMORY_URL: &str = "sqlite::memory:";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LibraryConfig {
    #[serde(default)]
    pub library: LibrarySection,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibrarySection {
    pub name: String,
}

impl Default for LibrarySection {
    fn default() -> Self {
        Self {
            name: "Library".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
    pub create_if_missing: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://library.db".to_string(),
            max_connections: 5,
            acquire_timeout_seconds: 3,
            create_if_missing: true,
        }
    }
}

impl DatabaseConfig {
    pub fn in_memory() -> Self {
        Self {
            url: IN_MEMORY_URL.to_string(),
            ..Self::default()
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub json: Option<bool>,
}

impl LibraryConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 檔案不存在時退回預設值
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            tracing::debug!(
                "Config file {} not found, using defaults",
                path.as_ref().display()
            );
            Ok(Self::default())
        }
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| LibraryError::ConfigError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${DATABASE_URL})；未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| LibraryError::ConfigError {
            field: "environment".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn json_logs(&self) -> bool {
        self.logging.json.unwrap_or(false)
    }
}

impl Validate for LibraryConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("database.url", &self.database.url)?;
        if !self.database.url.starts_with("sqlite:") {
            return Err(LibraryError::ConfigError {
                field: "database.url".to_string(),
                message: format!("Unsupported database URL: {}", self.database.url),
            });
        }
        validation::validate_range(
            "database.max_connections",
            self.database.max_connections,
            1,
            u32::MAX,
        )?;
        validation::validate_range(
            "database.acquire_timeout_seconds",
            self.database.acquire_timeout_seconds,
            1,
            300,
        )?;

        if let Some(level) = &self.logging.level {
            let valid_levels = ["trace", "debug", "info", "warn", "error"];
            if !valid_levels.contains(&level.as_str()) {
                return Err(LibraryError::ConfigError {
                    field: "logging.level".to_string(),
                    message: format!(
                        "Unsupported level '{}'. Valid levels: {}",
                        level,
                        valid_levels.join(", ")
                    ),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[library]
name = "Main Branch"

[database]
url = "sqlite://main.db"
max_connections = 2
acquire_timeout_seconds = 10
create_if_missing = false

[logging]
level = "debug"
json = true
"#;

        let config = LibraryConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.library.name, "Main Branch");
        assert_eq!(config.database.url, "sqlite://main.db");
        assert_eq!(config.database.max_connections, 2);
        assert!(!config.database.create_if_missing);
        assert!(config.json_logs());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = LibraryConfig::from_toml_str("[database]\nurl = \"sqlite::memory:\"\n").unwrap();

        assert!(config.database.is_in_memory());
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.database.acquire_timeout_seconds, 3);
        assert!(!config.json_logs());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("SHELFKEEPER_TEST_DB_URL", "sqlite://from-env.db");

        let toml_content = r#"
[database]
url = "${SHELFKEEPER_TEST_DB_URL}"
"#;

        let config = LibraryConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.database.url, "sqlite://from-env.db");

        std::env::remove_var("SHELFKEEPER_TEST_DB_URL");
    }

    #[test]
    fn test_unknown_env_var_left_in_place() {
        let config =
            LibraryConfig::from_toml_str("[library]\nname = \"${SHELFKEEPER_UNSET_VAR}\"\n")
                .unwrap();
        assert_eq!(config.library.name, "${SHELFKEEPER_UNSET_VAR}");
    }

    #[test]
    fn test_config_validation() {
        let mut config = LibraryConfig::default();
        assert!(config.validate().is_ok());

        config.database.url = "postgres://localhost/library".to_string();
        assert!(config.validate().is_err());

        config.database.url = "sqlite://library.db".to_string();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());

        config.database.max_connections = 5;
        config.logging.level = Some("loud".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_toml() {
        let err = LibraryConfig::from_toml_str("[database\nurl = 1").unwrap_err();
        assert!(err.to_string().contains("TOML parsing error"));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[library]\nname = \"File Branch\"\n")
            .unwrap();

        let config = LibraryConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.library.name, "File Branch");

        let fallback = LibraryConfig::load_or_default("/nonexistent/library.toml").unwrap();
        assert_eq!(fallback.library.name, "Library");
    }
}

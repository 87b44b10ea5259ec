//! Configuration management for Gradebook using the prefer crate.
//!
//! Settings are resolved from built-in defaults, then an optional config
//! file (auto-discovered by prefer or passed with `--config`), then the
//! environment (`.env` is loaded by `main` before this runs).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::repository::DbContext;

/// Default database filename inside the data directory.
const DEFAULT_DATABASE_FILENAME: &str = "gradebook.db";

/// Default uploads subdirectory name.
const UPLOADS_SUBDIR: &str = "uploads";

/// Default generateContent endpoint.
pub const DEFAULT_GEMINI_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent";

/// Email that is granted the admin flag at signup.
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@example.com";

/// Maximum accepted request body (80 MB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 80 * 1024 * 1024;

/// Settings for the external generative-language API.
#[derive(Debug, Clone)]
pub struct GeminiSettings {
    /// API key sent as the `key` query parameter. `None` disables all calls.
    pub api_key: Option<String>,
    /// Full generateContent URL (without the key).
    pub endpoint: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Pause between consecutive OCR batches.
    pub chunk_delay: Duration,
    /// Pause before the evaluation request.
    pub evaluation_delay: Duration,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: DEFAULT_GEMINI_ENDPOINT.to_string(),
            timeout: Duration::from_secs(60),
            chunk_delay: Duration::from_secs(2),
            evaluation_delay: Duration::from_secs(2),
        }
    }
}

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory.
    pub data_dir: PathBuf,
    /// Database filename.
    pub database_filename: String,
    /// Database URL (overrides data_dir/database_filename if set).
    pub database_url: Option<String>,
    /// Root directory for uploaded files; each upload gets its own subdirectory.
    pub upload_dir: PathBuf,
    /// Signups with this email become admins.
    pub admin_email: String,
    /// Request body limit for the upload endpoint.
    pub max_upload_bytes: usize,
    /// External API settings.
    pub gemini: GeminiSettings,
}

impl Default for Settings {
    fn default() -> Self {
        // Default to ~/Documents/gradebook/ for user data
        // Falls back gracefully: Documents dir -> Home dir -> Current dir
        let data_dir = dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gradebook");

        Self::with_data_dir(data_dir)
    }
}

impl Settings {
    /// Create settings with a custom data directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            upload_dir: data_dir.join(UPLOADS_SUBDIR),
            data_dir,
            database_filename: DEFAULT_DATABASE_FILENAME.to_string(),
            database_url: None,
            admin_email: DEFAULT_ADMIN_EMAIL.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            gemini: GeminiSettings::default(),
        }
    }

    /// Get the database URL, constructing from path if not explicitly set.
    pub fn database_url(&self) -> String {
        if let Some(ref url) = self.database_url {
            url.clone()
        } else {
            format!("sqlite:{}", self.database_path().display())
        }
    }

    /// Get the full path to the SQLite database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_filename)
    }

    /// Ensure the data and upload directories exist.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(&self.upload_dir)?;
        Ok(())
    }

    /// Create a database context for these settings.
    pub fn create_db_context(&self) -> DbContext {
        DbContext::from_url(&self.database_url())
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup("GRADEBOOK_DATA_DIR") {
            let data_dir = expand_path(&dir, Path::new("."));
            // Keep the upload dir under the data dir unless it was moved explicitly.
            if self.upload_dir == self.data_dir.join(UPLOADS_SUBDIR) {
                self.upload_dir = data_dir.join(UPLOADS_SUBDIR);
            }
            self.data_dir = data_dir;
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.database_url = Some(url);
        }
        if let Some(email) = lookup("ADMIN_EMAIL") {
            self.admin_email = email.trim().to_lowercase();
        }
        if let Some(key) = lookup("GEMINI_API_KEY").filter(|k| !k.is_empty()) {
            self.gemini.api_key = Some(key);
        }
        if let Some(endpoint) = lookup("GEMINI_ENDPOINT").filter(|e| !e.is_empty()) {
            self.gemini.endpoint = endpoint;
        }
    }
}

/// `[gemini]` table of the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation_delay_ms: Option<u64>,
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Data directory path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    /// Database filename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// Upload root directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_dir: Option<String>,
    /// Email granted admin rights at signup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_email: Option<String>,
    /// Request body limit in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_upload_bytes: Option<usize>,
    /// External API configuration.
    #[serde(default)]
    pub gemini: GeminiConfig,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Automatically discovers gradebook config files in standard locations.
    pub async fn load() -> Self {
        match prefer::load("gradebook").await {
            Ok(pref_config) => {
                if let Some(path) = pref_config.source_path() {
                    match Self::load_from_path(path).await {
                        Ok(config) => config,
                        Err(e) => {
                            tracing::warn!("Ignoring config file {}: {}", path.display(), e);
                            Self::default()
                        }
                    }
                } else {
                    Self::default()
                }
            }
            // No config file found
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file path.
    /// Supports TOML and JSON based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

        let mut config: Config = match ext {
            "json" => serde_json::from_str(&contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e))?,
            _ => toml::from_str(&contents)
                .map_err(|e| format!("Failed to parse TOML config: {}", e))?,
        };

        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Get the base directory for resolving relative paths.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Apply configuration to settings.
    /// `base_dir` is used to resolve relative paths (config file dir or CWD).
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref data_dir) = self.data_dir {
            settings.data_dir = expand_path(data_dir, base_dir);
            settings.upload_dir = settings.data_dir.join(UPLOADS_SUBDIR);
        }
        if let Some(ref database) = self.database {
            settings.database_filename = database.clone();
        }
        if let Some(ref upload_dir) = self.upload_dir {
            settings.upload_dir = expand_path(upload_dir, base_dir);
        }
        if let Some(ref email) = self.admin_email {
            settings.admin_email = email.trim().to_lowercase();
        }
        if let Some(limit) = self.max_upload_bytes {
            settings.max_upload_bytes = limit;
        }

        let gemini = &mut settings.gemini;
        if let Some(ref key) = self.gemini.api_key {
            gemini.api_key = Some(key.clone());
        }
        if let Some(ref endpoint) = self.gemini.endpoint {
            gemini.endpoint = endpoint.clone();
        }
        if let Some(secs) = self.gemini.timeout_secs {
            gemini.timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = self.gemini.chunk_delay_ms {
            gemini.chunk_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = self.gemini.evaluation_delay_ms {
            gemini.evaluation_delay = Duration::from_millis(ms);
        }
    }
}

/// Resolve a path that may be relative or start with `~`.
fn expand_path(path_str: &str, base_dir: &Path) -> PathBuf {
    let expanded = shellexpand::tilde(path_str);
    let path = Path::new(expanded.as_ref());

    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// Options for loading settings.
#[derive(Debug, Default, Clone)]
pub struct LoadOptions {
    /// Explicit config file (skips discovery).
    pub config_path: Option<PathBuf>,
    /// Data directory override from the command line.
    pub data_dir: Option<PathBuf>,
}

/// Load settings: defaults, then config file, then environment, then CLI overrides.
pub async fn load_settings(options: LoadOptions) -> Result<Settings, String> {
    let config = match options.config_path {
        Some(ref path) => Config::load_from_path(path).await?,
        None => Config::load().await,
    };

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let base_dir = config.base_dir().unwrap_or_else(|| cwd.clone());

    let mut settings = Settings::default();
    config.apply_to_settings(&mut settings, &base_dir);
    settings.apply_env();

    if let Some(data_dir) = options.data_dir {
        let data_dir = expand_path(&data_dir.display().to_string(), &cwd);
        settings.upload_dir = data_dir.join(UPLOADS_SUBDIR);
        settings.data_dir = data_dir;
    }

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        let settings = Settings::with_data_dir(PathBuf::from("/srv/grading"));
        assert_eq!(settings.upload_dir, PathBuf::from("/srv/grading/uploads"));
        assert_eq!(
            settings.database_url(),
            "sqlite:/srv/grading/gradebook.db"
        );
        assert_eq!(settings.max_upload_bytes, 80 * 1024 * 1024);
        assert_eq!(settings.gemini.endpoint, DEFAULT_GEMINI_ENDPOINT);
        assert!(settings.gemini.api_key.is_none());
    }

    #[test]
    fn test_config_file_overrides() {
        let config: Config = toml::from_str(
            r#"
            data_dir = "data"
            admin_email = " Boss@Example.com "

            [gemini]
            endpoint = "http://localhost:9999/generate"
            chunk_delay_ms = 0
            "#,
        )
        .unwrap();

        let mut settings = Settings::with_data_dir(PathBuf::from("/tmp/unused"));
        config.apply_to_settings(&mut settings, Path::new("/etc/gradebook"));

        assert_eq!(settings.data_dir, PathBuf::from("/etc/gradebook/data"));
        assert_eq!(
            settings.upload_dir,
            PathBuf::from("/etc/gradebook/data/uploads")
        );
        assert_eq!(settings.admin_email, "boss@example.com");
        assert_eq!(settings.gemini.endpoint, "http://localhost:9999/generate");
        assert_eq!(settings.gemini.chunk_delay, Duration::ZERO);
        assert_eq!(settings.gemini.evaluation_delay, Duration::from_secs(2));
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = Settings::with_data_dir(PathBuf::from("/data"));
        settings.apply_env_from(|key| match key {
            "GEMINI_API_KEY" => Some("secret".to_string()),
            "GEMINI_ENDPOINT" => Some(String::new()),
            "DATABASE_URL" => Some("sqlite:/var/db/grades.db".to_string()),
            _ => None,
        });

        assert_eq!(settings.gemini.api_key.as_deref(), Some("secret"));
        // Empty values are ignored.
        assert_eq!(settings.gemini.endpoint, DEFAULT_GEMINI_ENDPOINT);
        assert_eq!(settings.database_url(), "sqlite:/var/db/grades.db");
    }
}

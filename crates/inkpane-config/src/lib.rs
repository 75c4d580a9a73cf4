//! Inkpane configuration system
//!
//! This crate provides centralized configuration for the editor host,
//! loading settings from `inkpane.toml` with environment variable overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for Inkpane
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct InkpaneConfig {
    /// Loopback resource server settings
    pub server: ServerConfig,
    /// Editor defaults applied by the bridge
    pub editor: EditorConfig,
    /// Rendering surface settings
    pub surface: SurfaceConfig,
}

/// Loopback resource server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host the server binds to. Only loopback addresses make sense here.
    pub bind_host: String,
    /// Serve the editor bundle from this directory instead of the embedded tree
    pub asset_dir: Option<PathBuf>,
    /// Seconds an idle worker thread is kept around before it exits
    pub worker_keep_alive_secs: u64,
}

/// Editor defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Language used when a load request leaves it blank
    pub default_language: String,
    /// Theme used when a load request leaves it blank
    pub default_theme: String,
    /// Whether the gutter starts with line numbers
    pub show_line_numbers: bool,
}

/// Rendering surface configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    /// Divert every navigation to the system browser instead of rendering inline
    pub redirect: bool,
    /// Initial window width in logical pixels
    pub width: u32,
    /// Initial window height in logical pixels
    pub height: u32,
    /// Enable the web inspector where the backend supports it
    pub devtools: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_host: "127.0.0.1".to_string(),
            asset_dir: None,
            worker_keep_alive_secs: 60,
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            default_language: "plaintext".to_string(),
            default_theme: "vs".to_string(),
            show_line_numbers: true,
        }
    }
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            redirect: false,
            width: 1000,
            height: 700,
            devtools: false,
        }
    }
}

fn parse_flag(val: &str) -> bool {
    val == "1" || val.eq_ignore_ascii_case("true")
}

impl InkpaneConfig {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the inkpane.toml configuration file
    ///
    /// # Returns
    /// * `Ok(InkpaneConfig)` - Successfully loaded configuration
    /// * `Err(String)` - Error message if loading failed
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("Failed to parse config file: {}", e))
    }

    /// Load configuration from the default location (inkpane.toml in the current directory)
    /// or return default configuration if file doesn't exist
    pub fn load_or_default() -> Self {
        Self::load_from_file("inkpane.toml").unwrap_or_default()
    }

    /// Merge configuration with environment variables
    ///
    /// Environment variables take precedence over configuration file values.
    pub fn merge_with_env(&mut self) {
        if let Ok(val) = std::env::var("INKPANE_REDIRECT") {
            self.surface.redirect = parse_flag(&val);
        }
        if let Ok(dir) = std::env::var("INKPANE_ASSET_DIR") {
            self.server.asset_dir = Some(PathBuf::from(dir));
        }
        if let Ok(host) = std::env::var("INKPANE_BIND_HOST") {
            self.server.bind_host = host;
        }
        if let Ok(language) = std::env::var("INKPANE_LANGUAGE") {
            if !language.trim().is_empty() {
                self.editor.default_language = language;
            }
        }
        if let Ok(theme) = std::env::var("INKPANE_THEME") {
            if !theme.trim().is_empty() {
                self.editor.default_theme = theme;
            }
        }
    }

    /// Load configuration with environment variable overrides
    ///
    /// 1. Load from inkpane.toml (or use defaults if not found)
    /// 2. Override with environment variables if present
    pub fn load() -> Self {
        let mut config = Self::load_or_default();
        config.merge_with_env();
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = InkpaneConfig::default();
        assert_eq!(config.server.bind_host, "127.0.0.1");
        assert_eq!(config.editor.default_language, "plaintext");
        assert_eq!(config.editor.default_theme, "vs");
        assert!(config.editor.show_line_numbers);
        assert!(!config.surface.redirect);
    }

    #[test]
    fn test_toml_serialization() {
        let config = InkpaneConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = InkpaneConfig::from_toml_str(&toml_str).unwrap();
        assert_eq!(parsed.server.worker_keep_alive_secs, 60);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let parsed = InkpaneConfig::from_toml_str(
            r#"
            [surface]
            redirect = true

            [editor]
            default_theme = "vs-dark"
            "#,
        )
        .unwrap();
        assert!(parsed.surface.redirect);
        assert_eq!(parsed.editor.default_theme, "vs-dark");
        assert_eq!(parsed.editor.default_language, "plaintext");
        assert_eq!(parsed.surface.width, 1000);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let err = InkpaneConfig::from_toml_str("[surface\nredirect = ").unwrap_err();
        assert!(err.starts_with("Failed to parse config file"));
    }

    #[test]
    fn test_load_or_default() {
        // Should not panic even if inkpane.toml doesn't exist
        let config = InkpaneConfig::load_or_default();
        assert!(!config.server.bind_host.is_empty());
    }

    #[test]
    fn test_merge_with_env() {
        unsafe {
            std::env::set_var("INKPANE_REDIRECT", "true");
            std::env::set_var("INKPANE_THEME", "hc-black");
            std::env::set_var("INKPANE_LANGUAGE", "  ");
        }

        let mut config = InkpaneConfig::default();
        config.merge_with_env();

        assert!(config.surface.redirect);
        assert_eq!(config.editor.default_theme, "hc-black");
        assert_eq!(config.editor.default_language, "plaintext");

        unsafe {
            std::env::remove_var("INKPANE_REDIRECT");
            std::env::remove_var("INKPANE_THEME");
            std::env::remove_var("INKPANE_LANGUAGE");
        }
    }
}

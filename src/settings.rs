//! User-configurable settings for vboxweb.
//!
//! Settings can be configured in multiple ways (in order of precedence):
//! 1. Environment variables (highest priority)
//! 2. Project-level `vboxweb.toml` or `vboxweb.local.toml`
//! 3. User-level `~/.config/vboxweb/config.toml`
//! 4. System-level `/etc/vboxweb/config.toml`
//! 5. Built-in defaults (lowest priority)
//!
//! Example vboxweb.toml:
//! ```toml
//! [websrv]
//! exec_path = "/opt/VirtualBox/vboxwebsrv"
//! port = 0
//! start_timeout = "10s"
//!
//! [xpcom]
//! home = "/opt/VirtualBox"
//! ```

use std::sync::OnceLock;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SettingsWebsrv {
    /// Path to vboxwebsrv; replaces the platform search list when set
    pub exec_path: String,
    /// Address the web service binds to
    pub host: String,
    /// Port the web service listens on, 0 picks a free one
    pub port: u16,
    /// Authentication library passed with -A
    pub auth_method: String,
    /// Serve over TLS
    pub ssl: bool,
    /// TLS private key file
    pub ssl_keyfile: String,
    /// TLS CA certificate file
    pub ssl_cacert: String,
    /// How long to wait for the daemon to report readiness
    pub start_timeout: String,
    /// How many times stop() polls for exit after asking the daemon to terminate
    pub stop_attempts: u32,
    /// Delay between stop() polls
    pub stop_poll_interval: String,
    /// Bind attempts when allocating a free port
    pub port_attempts: u32,
    /// Append daemon output to this file
    pub log_file: String,
}

impl Default for SettingsWebsrv {
    fn default() -> Self {
        Self {
            exec_path: String::new(),
            host: "localhost".to_string(),
            port: 18083,
            auth_method: "null".to_string(),
            ssl: false,
            ssl_keyfile: String::new(),
            ssl_cacert: String::new(),
            start_timeout: "5s".to_string(),
            stop_attempts: 5,
            stop_poll_interval: "200ms".to_string(),
            port_attempts: 100,
            log_file: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SettingsXpcom {
    /// VirtualBox install directory holding VBoxManage
    pub home: String,
}

impl Default for SettingsXpcom {
    fn default() -> Self {
        Self {
            home: crate::xpcom::DEFAULT_HOME.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Settings {
    pub websrv: SettingsWebsrv,
    pub xpcom: SettingsXpcom,
}

macro_rules! env_override {
    ($field:expr, $var:literal, string) => {
        if let Ok(val) = std::env::var($var) {
            $field = val;
        }
    };
    ($field:expr, $var:literal, parse) => {
        if let Ok(val) = std::env::var($var) {
            match val.parse() {
                Ok(v) => $field = v,
                Err(_) => warn!("ignoring invalid value for {}: {val}", $var),
            }
        }
    };
    ($field:expr, $var:literal, bool) => {
        if let Ok(val) = std::env::var($var) {
            if let Ok(b) = val.parse::<bool>() {
                $field = b;
            } else if val == "1" {
                $field = true;
            } else if val == "0" {
                $field = false;
            }
        }
    };
}

macro_rules! merge_fields {
    ($self:ident, $other:ident, $defaults:ident, $section:ident: $($field:ident),+) => {
        $(
            if $other.$section.$field != $defaults.$section.$field {
                $self.$section.$field = $other.$section.$field.clone();
            }
        )+
    };
}

static SETTINGS: OnceLock<Settings> = OnceLock::new();

/// Get the global settings instance
pub fn settings() -> &'static Settings {
    SETTINGS.get_or_init(Settings::load)
}

impl Settings {
    /// Load settings from config files, then overlay environment variables.
    pub fn load() -> Self {
        let mut settings = Self::default();

        for path in Self::config_paths() {
            if !path.exists() {
                continue;
            }
            match Self::read_file(&path) {
                Ok(Some(file_settings)) => settings.merge_from(&file_settings),
                Ok(None) => {}
                Err(e) => warn!("ignoring settings in {}: {e}", path.display()),
            }
        }

        settings.load_from_env();
        settings
    }

    fn read_file(path: &std::path::Path) -> Result<Option<Self>, String> {
        let content = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
        let table = content.parse::<toml::Table>().map_err(|e| e.to_string())?;
        if table.is_empty() {
            return Ok(None);
        }
        toml::Value::Table(table)
            .try_into::<Settings>()
            .map(Some)
            .map_err(|e| e.to_string())
    }

    /// Get all config file paths in precedence order (lowest to highest)
    fn config_paths() -> Vec<std::path::PathBuf> {
        let mut paths = vec![
            crate::env::VBOXWEB_GLOBAL_CONFIG_SYSTEM.clone(),
            crate::env::VBOXWEB_GLOBAL_CONFIG_USER.clone(),
        ];
        let mut project_paths =
            xx::file::find_up_all(&*crate::env::CWD, &["vboxweb.local.toml", "vboxweb.toml"]);
        project_paths.reverse();
        paths.extend(project_paths);
        paths
    }

    /// Override settings from environment variables
    pub fn load_from_env(&mut self) {
        env_override!(self.websrv.exec_path, "VBOXWEB_EXEC_PATH", string);
        env_override!(self.websrv.host, "VBOXWEB_HOST", string);
        env_override!(self.websrv.port, "VBOXWEB_PORT", parse);
        env_override!(self.websrv.auth_method, "VBOXWEB_AUTH_METHOD", string);
        env_override!(self.websrv.ssl, "VBOXWEB_SSL", bool);
        env_override!(self.websrv.ssl_keyfile, "VBOXWEB_SSL_KEYFILE", string);
        env_override!(self.websrv.ssl_cacert, "VBOXWEB_SSL_CACERT", string);
        env_override!(self.websrv.start_timeout, "VBOXWEB_START_TIMEOUT", string);
        env_override!(self.websrv.stop_attempts, "VBOXWEB_STOP_ATTEMPTS", parse);
        env_override!(
            self.websrv.stop_poll_interval,
            "VBOXWEB_STOP_POLL_INTERVAL",
            string
        );
        env_override!(self.websrv.port_attempts, "VBOXWEB_PORT_ATTEMPTS", parse);
        env_override!(self.websrv.log_file, "VBOXWEB_LOG_FILE_OUTPUT", string);
        env_override!(self.xpcom.home, "VBOXWEB_XPCOM_HOME", string);
    }

    /// Merge settings from another Settings instance.
    /// Only non-default values from `other` will override `self`.
    pub fn merge_from(&mut self, other: &Self) {
        let defaults = Self::default();
        merge_fields!(self, other, defaults, websrv:
            exec_path, host, port, auth_method, ssl, ssl_keyfile, ssl_cacert,
            start_timeout, stop_attempts, stop_poll_interval, port_attempts, log_file);
        merge_fields!(self, other, defaults, xpcom: home);
    }

    /// Parse a duration string (humantime format) to Duration
    pub fn parse_duration(s: &str) -> Option<Duration> {
        humantime::parse_duration(s).ok()
    }

    pub fn websrv_start_timeout(&self) -> Duration {
        Self::parse_duration(&self.websrv.start_timeout).unwrap_or(Duration::from_secs(5))
    }

    pub fn websrv_stop_poll_interval(&self) -> Duration {
        Self::parse_duration(&self.websrv.stop_poll_interval)
            .unwrap_or(Duration::from_millis(200))
    }
}

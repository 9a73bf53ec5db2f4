//! Supervisor module - VirtualBox web service process supervisor
//!
//! This module is split into focused submodules:
//! - `state`: the mutex-guarded run state and the signals that mutate it
//! - `lifecycle`: start/stop/kill operations
//! - `monitor`: per-child task that reads output and reaps the process

mod lifecycle;
mod monitor;
mod state;

use crate::env;
use crate::error::WebSrvError;
use crate::settings::Settings;
use crate::shutdown::Shutdown;
use crate::state::LifecycleState;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use state::Shared;

/// TLS material passed to the daemon with `--ssl`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsFiles {
    pub key_file: PathBuf,
    pub ca_cert: PathBuf,
}

impl TlsFiles {
    fn validate(&self) -> Result<(), WebSrvError> {
        if self.key_file.as_os_str().is_empty() {
            return Err(WebSrvError::TlsIncomplete {
                missing: "key file",
            });
        }
        if self.ca_cert.as_os_str().is_empty() {
            return Err(WebSrvError::TlsIncomplete {
                missing: "CA certificate",
            });
        }
        Ok(())
    }
}

/// Immutable description of how to launch and supervise the web service.
#[derive(Debug, Clone)]
pub struct WebSrvConfig {
    pub host: String,
    /// 0 asks for a free port at start time
    pub port: u16,
    pub auth_method: String,
    pub tls: Option<TlsFiles>,
    /// Searched in order, first valid executable wins
    pub exec_candidates: Vec<PathBuf>,
    pub start_timeout: Duration,
    pub stop_attempts: u32,
    pub stop_poll_interval: Duration,
    pub port_attempts: u32,
    /// Daemon stdout/stderr is appended here when set
    pub output_log: Option<PathBuf>,
}

impl Default for WebSrvConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl WebSrvConfig {
    pub fn new(host: impl Into<String>, port: u16, auth_method: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            auth_method: auth_method.into(),
            ..Default::default()
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let websrv = &settings.websrv;
        let tls = websrv.ssl.then(|| TlsFiles {
            key_file: PathBuf::from(&websrv.ssl_keyfile),
            ca_cert: PathBuf::from(&websrv.ssl_cacert),
        });
        Self {
            host: websrv.host.clone(),
            port: websrv.port,
            auth_method: websrv.auth_method.clone(),
            tls,
            exec_candidates: env::exec_candidates(Some(&websrv.exec_path)),
            start_timeout: settings.websrv_start_timeout(),
            stop_attempts: websrv.stop_attempts,
            stop_poll_interval: settings.websrv_stop_poll_interval(),
            port_attempts: websrv.port_attempts,
            output_log: (!websrv.log_file.trim().is_empty())
                .then(|| PathBuf::from(&websrv.log_file)),
        }
    }

    pub fn with_tls(mut self, tls: TlsFiles) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Use only this executable instead of the platform search list.
    pub fn with_exec_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.exec_candidates = vec![path.into()];
        self
    }

    pub fn with_exec_candidates(mut self, candidates: Vec<PathBuf>) -> Self {
        self.exec_candidates = candidates;
        self
    }

    pub fn with_start_timeout(mut self, timeout: Duration) -> Self {
        self.start_timeout = timeout;
        self
    }

    pub fn with_stop_budget(mut self, attempts: u32, poll_interval: Duration) -> Self {
        self.stop_attempts = attempts;
        self.stop_poll_interval = poll_interval;
        self
    }

    pub fn with_output_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_log = Some(path.into());
        self
    }

    pub fn scheme(&self) -> &'static str {
        if self.tls.is_some() { "https" } else { "http" }
    }
}

/// Supervises one `vboxwebsrv` process.
///
/// Dropping the supervisor kills any process it still owns, including one
/// that ignored a graceful stop.
pub struct WebSrv {
    config: WebSrvConfig,
    shared: Arc<Shared>,
}

impl WebSrv {
    pub fn new(config: WebSrvConfig) -> Self {
        Self {
            config,
            shared: Arc::new(Shared::new()),
        }
    }

    pub fn config(&self) -> &WebSrvConfig {
        &self.config
    }

    pub fn state(&self) -> LifecycleState {
        self.shared.lock().state
    }

    /// True while a child exists and has not exited. Never changes state.
    pub fn is_running(&self) -> bool {
        self.shared.lock().live_child().is_some()
    }

    pub fn pid(&self) -> Option<u32> {
        self.shared.lock().live_child().and_then(|c| c.pid())
    }

    /// The resolved listening port of the running web service.
    pub fn port(&self) -> Result<u16, WebSrvError> {
        let inner = self.shared.lock();
        match (inner.live_child(), inner.port) {
            (Some(_), Some(port)) => Ok(port),
            _ => Err(WebSrvError::NotRunning),
        }
    }

    /// Exit code of the last run; fails if never started or still running.
    pub fn exit_code(&self) -> Result<i32, WebSrvError> {
        let inner = self.shared.lock();
        if inner.live_child().is_some() {
            return Err(WebSrvError::NotRunning);
        }
        inner.exit_code.ok_or(WebSrvError::NotRunning)
    }

    /// Fault reported by the daemon during the last start attempt.
    pub fn last_error(&self) -> Option<String> {
        self.shared.lock().last_error.clone()
    }

    /// `protocol://host:port` of the running web service.
    pub fn server_url(&self) -> Result<String, WebSrvError> {
        let port = self.port()?;
        Ok(format!("{}://{}:{port}", self.config.scheme(), self.config.host))
    }
}

impl Shutdown for WebSrv {
    fn name(&self) -> String {
        format!("vboxwebsrv@{}", self.config.host)
    }

    fn shutdown(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(self.stop())
    }
}

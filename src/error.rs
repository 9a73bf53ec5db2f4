//! Diagnostic error types for the web service supervisor.
//!
//! Every failure a caller can act on has its own variant so retry policies can
//! tell contention (pick another port) from timing (wait longer) from
//! configuration (fix the install).

// False positive: fields are used in #[error] format strings and miette derive macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by the web service supervisor.
#[derive(Debug, Error, Diagnostic)]
pub enum WebSrvError {
    #[error(
        "could not locate a valid VirtualBox web service executable (tried {})",
        display_paths(candidates)
    )]
    #[diagnostic(
        code(vboxweb::websrv::executable_not_found),
        help("install VirtualBox or point VBOXWEB_EXEC_PATH at vboxwebsrv")
    )]
    ExecutableNotFound { candidates: Vec<PathBuf> },

    #[error("a process is already listening on {host}:{port}")]
    #[diagnostic(
        code(vboxweb::websrv::port_in_use),
        help("choose another port, or use port 0 to pick a free one")
    )]
    PortInUse { host: String, port: u16 },

    #[error("no free port found on {host} after {attempts} attempts")]
    #[diagnostic(code(vboxweb::websrv::no_free_port))]
    NoFreePort { host: String, attempts: u32 },

    #[error("TLS is enabled but the {missing} path is empty")]
    #[diagnostic(
        code(vboxweb::websrv::tls_incomplete),
        help("set both the key file and the CA certificate when enabling --ssl")
    )]
    TlsIncomplete { missing: &'static str },

    #[error("web service failed to start: {message}")]
    #[diagnostic(
        code(vboxweb::websrv::startup_conflict),
        help("another web service instance may already be bound to this port")
    )]
    StartupConflict { message: String },

    #[error("unexpected exit of the VirtualBox web service: {code}")]
    #[diagnostic(
        code(vboxweb::websrv::unexpected_exit),
        help("run vboxwebsrv by hand with the same arguments to see why it exits")
    )]
    UnexpectedExit { code: i32 },

    #[error("VirtualBox web service did not start within {}", humantime::format_duration(*timeout))]
    #[diagnostic(
        code(vboxweb::websrv::start_timeout),
        help("the daemon may be slow to start; try a longer start timeout")
    )]
    StartTimeout { timeout: Duration },

    #[error("web service start was interrupted by a stop request")]
    #[diagnostic(code(vboxweb::websrv::start_aborted))]
    StartAborted,

    #[error("cannot start the web service process {}", path.display())]
    #[diagnostic(code(vboxweb::websrv::launch))]
    Launch {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("VirtualBox web service is still stopping")]
    #[diagnostic(
        code(vboxweb::websrv::still_stopping),
        help("the previous process has not settled yet; try again once it has stopped")
    )]
    StillStopping,

    #[error("VirtualBox web service is not running")]
    #[diagnostic(code(vboxweb::websrv::not_running))]
    NotRunning,
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors from parsing web service connection options.
#[derive(Debug, Error, Diagnostic)]
pub enum OptionsError {
    #[error("invalid connection options '{options}'")]
    #[diagnostic(
        code(vboxweb::options::invalid),
        help("expected [protocol://][user[:password]@]host[:port]")
    )]
    Invalid {
        options: String,
        #[source]
        source: url::ParseError,
    },

    #[error("connection options '{options}' do not name a host")]
    #[diagnostic(code(vboxweb::options::missing_host))]
    MissingHost { options: String },
}

/// Errors from the XPCOM helpers.
#[derive(Debug, Error, Diagnostic)]
pub enum XpcomError {
    #[error("VBoxManage was not found at {}", path.display())]
    #[diagnostic(
        code(vboxweb::xpcom::vboxmanage_not_found),
        help("set xpcom.home (or VBOXWEB_XPCOM_HOME) to the VirtualBox install directory")
    )]
    VBoxManageNotFound { path: PathBuf },

    #[error("{reason}")]
    #[diagnostic(
        code(vboxweb::xpcom::unsupported),
        url("https://www.virtualbox.org/ticket/11232")
    )]
    Unsupported { reason: String },

    #[error("failed to run {}", program.display())]
    #[diagnostic(code(vboxweb::xpcom::trigger_failed))]
    TriggerFailed {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
}

use crate::error::WebSrvError;
use crate::settings::settings;
use crate::shutdown::ShutdownHooks;
use crate::supervisor::{TlsFiles, WebSrv, WebSrvConfig};
use crate::{Result, args, locator, ports};
use miette::IntoDiagnostic;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::{select, signal};

/// Starts the VirtualBox web service and supervises it until interrupted
#[derive(Debug, clap::Args)]
#[clap(
    visible_alias = "r",
    verbatim_doc_comment,
    long_about = "\
Starts the VirtualBox web service and supervises it until interrupted

Launches vboxwebsrv, waits until it reports that its listener is up and
prints the server URL. Ctrl-C or SIGTERM stops the daemon gracefully.
Options not given on the command line come from vboxweb.toml settings.

Examples:
  vboxweb run                          Listen on localhost:18083
  vboxweb run -H 0.0.0.0 -p 0          Listen on all interfaces, any free port
  vboxweb run --ssl --keyfile key.pem --cacert ca.pem
  vboxweb run --dry-run                Print the command line and exit"
)]
pub struct Run {
    /// Address to bind
    #[clap(short = 'H', long)]
    host: Option<String>,
    /// Port to listen on, 0 picks a free port
    #[clap(short, long)]
    port: Option<u16>,
    /// Authentication library (e.g. null, VBoxAuth)
    #[clap(short = 'A', long = "auth")]
    auth_method: Option<String>,
    /// Serve over TLS
    #[clap(long)]
    ssl: bool,
    /// TLS private key file
    #[clap(long)]
    keyfile: Option<PathBuf>,
    /// TLS CA certificate file
    #[clap(long)]
    cacert: Option<PathBuf>,
    /// Path to vboxwebsrv
    #[clap(long)]
    exec_path: Option<PathBuf>,
    /// How long to wait for the daemon to become ready (e.g. 5s, 1500ms)
    #[clap(long, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,
    /// Print the command that would be run and exit
    #[clap(long)]
    dry_run: bool,
}

impl Run {
    pub async fn run(&self) -> Result<()> {
        let config = self.config();
        if self.dry_run {
            return dry_run(&config);
        }

        let signal = shutdown_signal()?;
        tokio::pin!(signal);

        let srv = Arc::new(WebSrv::new(config));
        let hooks = ShutdownHooks::new();
        hooks.register(srv.clone());

        select! {
            res = srv.start() => res?,
            _ = &mut signal => {
                info!("received signal during startup, stopping");
                hooks.run().await;
                return Ok(());
            }
        }
        println!(
            "VirtualBox web service listening on {}",
            srv.server_url()?
        );
        debug!("web service is {}", srv.state().style());

        let result: Result<()> = select! {
            _ = &mut signal => {
                info!("received signal, stopping");
                Ok(())
            }
            exit = srv.wait_exit() => match exit {
                Ok(code) => Err(WebSrvError::UnexpectedExit { code }.into()),
                Err(e) => Err(e.into()),
            },
        };
        hooks.run().await;
        result
    }

    fn config(&self) -> WebSrvConfig {
        let websrv = &settings().websrv;
        let mut config = WebSrvConfig::from_settings(settings());
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(auth_method) = &self.auth_method {
            config.auth_method = auth_method.clone();
        }
        if self.ssl || config.tls.is_some() {
            config = config.with_tls(TlsFiles {
                key_file: self
                    .keyfile
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(&websrv.ssl_keyfile)),
                ca_cert: self
                    .cacert
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(&websrv.ssl_cacert)),
            });
        }
        if let Some(exec_path) = &self.exec_path {
            config = config.with_exec_path(exec_path);
        }
        if let Some(timeout) = self.timeout {
            config = config.with_start_timeout(timeout);
        }
        config
    }
}

fn dry_run(config: &WebSrvConfig) -> Result<()> {
    let path = locator::locate(&config.exec_candidates)?;
    let port = ports::resolve(&config.host, config.port, config.port_attempts)?;
    println!("{} {}", path.display(), args::build(config, port).join(" "));
    Ok(())
}

#[cfg(unix)]
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    use tokio::signal::unix::SignalKind;

    let mut terminate = signal::unix::signal(SignalKind::terminate()).into_diagnostic()?;
    let mut interrupt = signal::unix::signal(SignalKind::interrupt()).into_diagnostic()?;
    Ok(async move {
        select! {
            _ = terminate.recv() => {}
            _ = interrupt.recv() => {}
        }
    })
}

#[cfg(windows)]
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    Ok(async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to wait for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    })
}

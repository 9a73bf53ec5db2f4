#[macro_use]
extern crate log;

#[cfg(unix)]
use tokio::signal;
#[cfg(unix)]
use tokio::signal::unix::SignalKind;
use vboxweb::{Result, cli, logger};

#[tokio::main]
async fn main() -> Result<()> {
    logger::init();
    #[cfg(unix)]
    handle_epipe();
    cli::run().await
}

#[cfg(unix)]
fn handle_epipe() {
    match signal::unix::signal(SignalKind::pipe()) {
        Ok(mut pipe_stream) => {
            tokio::spawn(async move {
                pipe_stream.recv().await;
                debug!("received SIGPIPE");
            });
        }
        Err(e) => {
            warn!("could not set up SIGPIPE handler: {e}");
        }
    }
}

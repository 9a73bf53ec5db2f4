use crate::Result;
use clap::Parser;

mod endpoint;
mod locate;
mod run;
mod settings;
mod svc;

/// Supervisor for the VirtualBox web service (vboxwebsrv)
#[derive(Debug, clap::Parser)]
#[clap(name = "vboxweb", version, about, long_about = None)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    Endpoint(endpoint::Endpoint),
    Locate(locate::Locate),
    Run(run::Run),
    Settings(settings::Settings),
    Svc(svc::Svc),
}

pub async fn run() -> Result<()> {
    let args = Cli::parse();
    match args.command {
        Commands::Endpoint(endpoint) => endpoint.run().await,
        Commands::Locate(locate) => locate.run().await,
        Commands::Run(run) => run.run().await,
        Commands::Settings(settings) => settings.run().await,
        Commands::Svc(svc) => svc.run().await,
    }
}

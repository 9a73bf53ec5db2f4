use crate::Result;
use crate::settings::settings;
use crate::supervisor::WebSrvConfig;
use crate::ws_options::WsOptions;

/// Parses web service connection options and prints the server URL
///
/// Options look like `[protocol://][user[:password]@]host[:port]`.
/// Without options the locally supervised web service's URL is printed.
#[derive(Debug, clap::Args)]
#[clap(verbatim_doc_comment)]
pub struct Endpoint {
    /// Connection options, e.g. https://admin@vbox-host:18083
    #[clap(default_value = "")]
    options: String,
    /// Override the port
    #[clap(short, long)]
    port: Option<u16>,
}

impl Endpoint {
    pub async fn run(&self) -> Result<()> {
        let mut opts = WsOptions::parse(&self.options)?;
        if !opts.has_options() {
            let config = WebSrvConfig::from_settings(settings());
            let port = self.port.unwrap_or(config.port);
            println!("{}://{}:{port}", config.scheme(), config.host);
            return Ok(());
        }
        if let Some(port) = self.port {
            opts.set_port(port);
        }
        debug!("{opts:?}");
        println!("{}", opts.server_url());
        if !opts.username().is_empty() {
            println!("user: {}", opts.username());
        }
        Ok(())
    }
}

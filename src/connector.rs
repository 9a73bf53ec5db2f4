//! Where the web service lives: a supervised local daemon or a remote endpoint.

use crate::error::WebSrvError;
use crate::supervisor::{WebSrv, WebSrvConfig};
use crate::ws_options::WsOptions;
use std::sync::Arc;

/// Anything that can tell a SOAP client where to connect.
pub trait ServiceLocation {
    fn server_url(&self) -> Result<String, WebSrvError>;
}

impl ServiceLocation for WebSrv {
    fn server_url(&self) -> Result<String, WebSrvError> {
        WebSrv::server_url(self)
    }
}

impl ServiceLocation for WsOptions {
    fn server_url(&self) -> Result<String, WebSrvError> {
        Ok(WsOptions::server_url(self))
    }
}

pub enum Connector {
    Local(Arc<WebSrv>),
    Remote(WsOptions),
}

impl Connector {
    /// Remote when `options` names an endpoint, otherwise a local supervisor built from `config`.
    pub fn from_options(options: WsOptions, config: WebSrvConfig) -> Self {
        if options.has_options() {
            Connector::Remote(options)
        } else {
            Connector::Local(Arc::new(WebSrv::new(config)))
        }
    }

    /// Makes the endpoint usable. For a local connector this starts the daemon.
    pub async fn connect(&self) -> Result<String, WebSrvError> {
        match self {
            Connector::Local(srv) => {
                srv.start().await?;
                srv.server_url()
            }
            Connector::Remote(opts) => {
                debug!("using remote web service at {}", opts.server_url());
                Ok(opts.server_url())
            }
        }
    }

    pub async fn disconnect(&self) {
        if let Connector::Local(srv) = self {
            srv.stop().await;
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Connector::Local(_))
    }
}

impl ServiceLocation for Connector {
    fn server_url(&self) -> Result<String, WebSrvError> {
        match self {
            Connector::Local(srv) => srv.server_url(),
            Connector::Remote(opts) => Ok(opts.server_url()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_remote_connector() {
        let opts = WsOptions::parse("https://vbox-host:18084").unwrap();
        let connector = Connector::from_options(opts, WebSrvConfig::default());
        assert!(!connector.is_local());
        assert_eq!(connector.connect().await.unwrap(), "https://vbox-host:18084");
        assert_eq!(
            ServiceLocation::server_url(&connector).unwrap(),
            "https://vbox-host:18084"
        );
        connector.disconnect().await;
    }

    #[test]
    fn test_local_connector_is_not_running_yet() {
        let connector =
            Connector::from_options(WsOptions::default(), WebSrvConfig::default());
        assert!(connector.is_local());
        assert!(matches!(
            ServiceLocation::server_url(&connector),
            Err(WebSrvError::NotRunning)
        ));
    }
}

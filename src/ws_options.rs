//! Connection options for a remote web service.
//!
//! Options look like `[protocol://][user[:password]@]host[:port]`. A blank
//! string means "no options", in which case a local supervisor is used.

use crate::error::OptionsError;
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use url::Url;

pub const DEFAULT_PROTOCOL: &str = "http";
pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 18083;

#[derive(Clone, PartialEq, Eq)]
pub struct WsOptions {
    has_options: bool,
    protocol: String,
    host: String,
    port: u16,
    username: String,
    password: String,
}

impl Default for WsOptions {
    fn default() -> Self {
        Self {
            has_options: false,
            protocol: DEFAULT_PROTOCOL.to_string(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            username: String::new(),
            password: String::new(),
        }
    }
}

/// Whether `options` carries anything to parse.
pub fn has_options(options: &str) -> bool {
    !options.trim().is_empty()
}

impl WsOptions {
    pub fn parse(options: &str) -> Result<Self, OptionsError> {
        if !has_options(options) {
            return Ok(Self::default());
        }
        let options = options.trim();
        debug!("given connect options: {options}");
        let raw: Cow<'_, str> = if options.contains("://") {
            options.into()
        } else {
            format!("{DEFAULT_PROTOCOL}://{options}").into()
        };
        trace!("adapted connect options: {raw}");

        let url = Url::parse(&raw).map_err(|source| OptionsError::Invalid {
            options: options.to_string(),
            source,
        })?;
        let host = match url.host_str() {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => {
                return Err(OptionsError::MissingHost {
                    options: options.to_string(),
                });
            }
        };
        Ok(Self {
            has_options: true,
            protocol: url.scheme().to_string(),
            host,
            port: url.port().unwrap_or(DEFAULT_PORT),
            username: decode(url.username()),
            password: url.password().map(decode).unwrap_or_default(),
        })
    }

    pub fn has_options(&self) -> bool {
        self.has_options
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn set_port(&mut self, port: u16) {
        self.port = port;
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// `protocol://host:port`, without credentials.
    pub fn server_url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }
}

fn decode(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| raw.to_string())
}

impl FromStr for WsOptions {
    type Err = OptionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for WsOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WsOptions")
            .field("has_options", &self.has_options)
            .field("protocol", &self.protocol)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

//! Port checks for the web service listener.
//!
//! These probes bind and immediately release the port, so a free answer is
//! only a hint: anything else on the machine may take the port before the
//! daemon binds it.

use crate::error::WebSrvError;
use std::net::TcpListener;

/// Whether `host:port` can currently be bound.
pub fn is_port_available(host: &str, port: u16) -> bool {
    TcpListener::bind((host, port)).is_ok()
}

/// Asks the OS for a free port on `host`, retrying up to `attempts` times.
pub fn random_available_port(host: &str, attempts: u32) -> Result<u16, WebSrvError> {
    for attempt in 1..=attempts {
        match TcpListener::bind((host, 0)).and_then(|l| l.local_addr()) {
            Ok(addr) if addr.port() != 0 => return Ok(addr.port()),
            Ok(_) => trace!("bind on {host} returned port 0 (attempt {attempt}/{attempts})"),
            Err(e) => trace!("could not bind on {host} (attempt {attempt}/{attempts}): {e}"),
        }
    }
    Err(WebSrvError::NoFreePort {
        host: host.to_string(),
        attempts,
    })
}

/// Resolves a requested port, replacing 0 with a free one.
pub fn resolve(host: &str, requested: u16, attempts: u32) -> Result<u16, WebSrvError> {
    if requested != 0 {
        return Ok(requested);
    }
    let port = random_available_port(host, attempts)?;
    info!("using autodetected port {port}");
    Ok(port)
}

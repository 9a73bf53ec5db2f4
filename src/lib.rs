#[macro_use]
extern crate log;

pub mod args;
pub mod cli;
pub mod connector;
pub mod env;
pub mod error;
pub mod locator;
pub mod logger;
pub mod ports;
pub mod readiness;
pub mod settings;
pub mod shutdown;
pub mod state;
pub mod supervisor;
pub mod ws_options;
pub mod xpcom;

pub use miette::Result;

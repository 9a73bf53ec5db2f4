use crate::Result;
use miette::IntoDiagnostic;

/// Prints the effective settings as TOML
///
/// Shows the result of merging built-in defaults, config files and
/// VBOXWEB_* environment variables.
#[derive(Debug, clap::Args)]
#[clap(verbatim_doc_comment)]
pub struct Settings {}

impl Settings {
    pub async fn run(&self) -> Result<()> {
        let out = toml::to_string_pretty(crate::settings::settings()).into_diagnostic()?;
        print!("{out}");
        Ok(())
    }
}

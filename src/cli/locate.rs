use crate::settings::settings;
use crate::{Result, env, locator};
use std::path::PathBuf;

/// Prints the vboxwebsrv executable that `run` would launch
#[derive(Debug, clap::Args)]
#[clap(verbatim_doc_comment)]
pub struct Locate {
    /// Check this path instead of the configured search list
    #[clap(long)]
    exec_path: Option<PathBuf>,
}

impl Locate {
    pub async fn run(&self) -> Result<()> {
        let candidates = match &self.exec_path {
            Some(path) => vec![path.clone()],
            None => env::exec_candidates(Some(&settings().websrv.exec_path)),
        };
        let path = locator::locate(&candidates)?;
        println!("{}", path.display());
        Ok(())
    }
}

use crate::settings::settings;
use crate::{Result, xpcom};
use std::path::PathBuf;

/// Starts VBoxSVC by running VBoxManage once
///
/// XPCOM clients need VBoxSVC to be running. Optionally checks first that
/// the installed VirtualBox build supports XPCOM.
#[derive(Debug, clap::Args)]
#[clap(verbatim_doc_comment)]
pub struct Svc {
    /// VirtualBox install directory holding VBoxManage
    #[clap(long)]
    home: Option<PathBuf>,
    /// VirtualBox version to validate before triggering (e.g. 7.0.14)
    #[clap(long, requires = "revision")]
    vbox_version: Option<String>,
    /// VirtualBox revision to validate before triggering
    #[clap(long, requires = "vbox_version")]
    revision: Option<u64>,
}

impl Svc {
    pub async fn run(&self) -> Result<()> {
        if let (Some(version), Some(revision)) = (&self.vbox_version, self.revision) {
            xpcom::validate(version, revision)?;
        }
        let home = self
            .home
            .clone()
            .unwrap_or_else(|| PathBuf::from(&settings().xpcom.home));
        xpcom::trigger_vboxsvc(&home)?;
        info!("triggered VBoxSVC from {}", home.display());
        Ok(())
    }
}

//! XPCOM helpers for the native VirtualBox service (`VBoxSVC`).
//!
//! XPCOM bindings do not bring `VBoxSVC` up on their own. Running any
//! `VBoxManage` command once is enough to have it spawned.

use crate::error::XpcomError;
use duct::cmd;
use std::path::Path;

/// Default VirtualBox install directory on Linux.
pub const DEFAULT_HOME: &str = "/usr/lib/virtualbox";

const OSE_MIN_REVISION: u64 = 50393;
const MIN_REVISION: u64 = 92456;

/// Runs `VBoxManage modifyvm ""` from `home` and waits for it. Its exit
/// status is irrelevant; only the side effect of starting `VBoxSVC` matters.
pub fn trigger_vboxsvc(home: impl AsRef<Path>) -> Result<(), XpcomError> {
    let home = home.as_ref();
    let libxpcom = home.join("libvboxjxpcom.so");
    debug!(
        "XPCOM library {} exists: {}",
        libxpcom.display(),
        libxpcom.is_file()
    );

    let vboxmanage = std::path::absolute(home.join("VBoxManage"))
        .unwrap_or_else(|_| home.join("VBoxManage"));
    if !vboxmanage.exists() {
        return Err(XpcomError::VBoxManageNotFound { path: vboxmanage });
    }
    debug!(
        "VBoxSVC trigger {} is file: {}",
        vboxmanage.display(),
        vboxmanage.is_file()
    );

    cmd!(&vboxmanage, "modifyvm", "\"\"")
        .stdin_null()
        .stdout_null()
        .stderr_null()
        .unchecked()
        .run()
        .map_err(|source| XpcomError::TriggerFailed {
            program: vboxmanage.clone(),
            source,
        })?;
    Ok(())
}

/// Checks that XPCOM can be used with this VirtualBox build.
pub fn validate(version: &str, revision: u64) -> Result<(), XpcomError> {
    if cfg!(windows) {
        return Err(XpcomError::Unsupported {
            reason: "XPCOM is not available on Windows, use the web service connector".to_string(),
        });
    }
    check_revision(version, revision)
}

fn check_revision(version: &str, revision: u64) -> Result<(), XpcomError> {
    let (min, edition) = if version.contains("OSE") {
        (OSE_MIN_REVISION, "on OSE ")
    } else {
        (MIN_REVISION, "")
    };
    if revision < min {
        return Err(XpcomError::Unsupported {
            reason: format!(
                "XPCOM is only available {edition}from revision {min} or greater, found {version} r{revision}"
            ),
        });
    }
    Ok(())
}

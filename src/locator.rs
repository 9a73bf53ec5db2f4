//! Finds a runnable `vboxwebsrv` among ordered candidate paths.

use crate::error::WebSrvError;
use std::fs;
use std::path::{Path, PathBuf};

/// Why a candidate was passed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Rejection {
    #[strum(serialize = "does not exist")]
    Missing,
    #[strum(serialize = "is not a file")]
    NotAFile,
    #[strum(serialize = "is not executable")]
    NotExecutable,
}

/// Returns the first candidate that exists, is a regular file and is executable.
pub fn locate<P: AsRef<Path>>(candidates: &[P]) -> Result<PathBuf, WebSrvError> {
    for candidate in candidates {
        let path = candidate.as_ref();
        match check(path) {
            Ok(()) => {
                debug!("{} is a valid VirtualBox web service executable", path.display());
                return Ok(path.to_path_buf());
            }
            Err(reason) => {
                debug!("not a valid web service executable [{}]: {reason}", path.display());
            }
        }
    }

    Err(WebSrvError::ExecutableNotFound {
        candidates: candidates
            .iter()
            .map(|c| c.as_ref().to_path_buf())
            .collect(),
    })
}

pub fn check(path: &Path) -> Result<(), Rejection> {
    let meta = fs::metadata(path).map_err(|_| Rejection::Missing)?;
    if !meta.is_file() {
        return Err(Rejection::NotAFile);
    }
    if !is_executable(path, &meta) {
        return Err(Rejection::NotExecutable);
    }
    Ok(())
}

#[cfg(unix)]
fn is_executable(_path: &Path, meta: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o111 != 0
}

#[cfg(windows)]
fn is_executable(path: &Path, _meta: &fs::Metadata) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ["exe", "bat", "cmd"].contains(&ext.to_ascii_lowercase().as_str()))
}

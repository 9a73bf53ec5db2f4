use once_cell::sync::Lazy;
pub use std::env::*;
use std::path::PathBuf;

pub static CWD: Lazy<PathBuf> = Lazy::new(|| current_dir().unwrap_or_else(|_| PathBuf::from(".")));

pub static HOME_DIR: Lazy<PathBuf> = Lazy::new(|| {
    dirs::home_dir().unwrap_or_else(|| {
        eprintln!("Warning: Could not determine home directory");
        PathBuf::from("/tmp")
    })
});
pub static VBOXWEB_CONFIG_DIR: Lazy<PathBuf> = Lazy::new(|| {
    var_path("VBOXWEB_CONFIG_DIR").unwrap_or(HOME_DIR.join(".config").join("vboxweb"))
});
pub static VBOXWEB_GLOBAL_CONFIG_USER: Lazy<PathBuf> =
    Lazy::new(|| VBOXWEB_CONFIG_DIR.join("config.toml"));
pub static VBOXWEB_GLOBAL_CONFIG_SYSTEM: Lazy<PathBuf> =
    Lazy::new(|| PathBuf::from("/etc/vboxweb/config.toml"));
pub static VBOXWEB_LOG: Lazy<log::LevelFilter> =
    Lazy::new(|| var_log_level("VBOXWEB_LOG").unwrap_or(log::LevelFilter::Info));
pub static VBOXWEB_LOG_FILE_LEVEL: Lazy<log::LevelFilter> =
    Lazy::new(|| var_log_level("VBOXWEB_LOG_FILE_LEVEL").unwrap_or(*VBOXWEB_LOG));
pub static VBOXWEB_LOG_FILE: Lazy<Option<PathBuf>> = Lazy::new(|| var_path("VBOXWEB_LOG_FILE"));

// Set by the VirtualBox installer on Windows
pub static VBOX_INSTALL_DIR: Lazy<PathBuf> = Lazy::new(|| {
    var_path("VBOX_MSI_INSTALL_PATH")
        .or_else(|| var_path("VBOX_INSTALL_PATH"))
        .unwrap_or_else(|| PathBuf::from(r"C:\Program Files\Oracle\VirtualBox"))
});

/// Where `vboxwebsrv` is usually installed, in search order.
pub fn default_exec_candidates() -> Vec<PathBuf> {
    vec![
        PathBuf::from("/usr/bin/vboxwebsrv"),
        PathBuf::from("/usr/lib/virtualbox/vboxwebsrv"),
        PathBuf::from("/usr/local/bin/vboxwebsrv"),
        PathBuf::from("/Applications/VirtualBox.app/Contents/MacOS/vboxwebsrv"),
        VBOX_INSTALL_DIR.join("VBoxWebSrv.exe"),
    ]
}

/// The override replaces the platform defaults entirely when it is set.
pub fn exec_candidates(exec_override: Option<&str>) -> Vec<PathBuf> {
    match exec_override.map(str::trim) {
        Some(path) if !path.is_empty() => vec![PathBuf::from(path)],
        _ => default_exec_candidates(),
    }
}

fn var_path(name: &str) -> Option<PathBuf> {
    var(name)
        .ok()
        .filter(|val| !val.trim().is_empty())
        .map(PathBuf::from)
}

fn var_log_level(name: &str) -> Option<log::LevelFilter> {
    var(name).ok().and_then(|level| level.parse().ok())
}

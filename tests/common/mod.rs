#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::process::{Child, Command, Output, Stdio};
use tempfile::TempDir;

/// Readiness line printed by a fake daemon; `$2` is the host and `$4` the port.
pub const READY_LINE: &str =
    r#"echo "00:00:00.418 main     Socket connection successful: host = $2, port = $4, master socket = 8""#;
pub const CONFLICT_LINE: &str =
    r#"echo "00:00:00.201 main     #### SOAP FAULT: Address already in use [detected]""#;

/// Isolated directories plus helpers to write fake `vboxwebsrv` scripts.
pub struct TestEnv {
    temp_dir: TempDir,
    home_dir: PathBuf,
    vboxweb_bin: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let home_dir = temp_dir.path().join("home");
        fs::create_dir_all(&home_dir).unwrap();
        fs::create_dir_all(temp_dir.path().join("project")).unwrap();
        Self {
            temp_dir,
            home_dir,
            vboxweb_bin: PathBuf::from(env!("CARGO_BIN_EXE_vboxweb")),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.temp_dir.path().to_path_buf()
    }

    pub fn project_dir(&self) -> PathBuf {
        self.temp_dir.path().join("project")
    }

    /// Writes an executable `sh` script and returns its path.
    #[cfg(unix)]
    pub fn script(&self, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = self.temp_dir.path().join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// A daemon that reports readiness and then idles until signalled.
    #[cfg(unix)]
    pub fn ready_script(&self) -> PathBuf {
        self.script("vboxwebsrv", &format!("{READY_LINE}\nexec sleep 30"))
    }

    /// A daemon that never prints anything recognizable.
    #[cfg(unix)]
    pub fn silent_script(&self) -> PathBuf {
        self.script("vboxwebsrv-silent", "exec sleep 30")
    }

    pub fn create_toml(&self, content: &str) -> PathBuf {
        let path = self.project_dir().join("vboxweb.toml");
        fs::write(&path, content).unwrap();
        path
    }

    fn command(&self, args: &[&str], extra_env: &[(&str, &str)]) -> Command {
        let mut cmd = Command::new(&self.vboxweb_bin);
        cmd.args(args)
            .current_dir(self.project_dir())
            .env("HOME", &self.home_dir)
            .env("VBOXWEB_CONFIG_DIR", self.home_dir.join(".config").join("vboxweb"))
            .env("VBOXWEB_LOG", "debug")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (key, val) in extra_env {
            cmd.env(key, val);
        }
        cmd
    }

    /// Runs a vboxweb command to completion.
    pub fn run_command(&self, args: &[&str]) -> Output {
        self.run_command_with_env(args, &[])
    }

    pub fn run_command_with_env(&self, args: &[&str], extra_env: &[(&str, &str)]) -> Output {
        self.command(args, extra_env)
            .output()
            .expect("Failed to execute vboxweb command")
    }

    /// Runs a vboxweb command in the background.
    pub fn run_background(&self, args: &[&str], extra_env: &[(&str, &str)]) -> Child {
        self.command(args, extra_env)
            .spawn()
            .expect("Failed to spawn vboxweb command")
    }
}

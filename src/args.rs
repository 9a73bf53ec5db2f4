use crate::supervisor::WebSrvConfig;

/// Command-line arguments for `vboxwebsrv`, without the program itself.
///
/// `port` is the resolved port; a requested port of 0 must already have been
/// replaced by a concrete one.
pub fn build(config: &WebSrvConfig, port: u16) -> Vec<String> {
    let mut args = vec![
        "-H".to_string(),
        config.host.clone(),
        "-p".to_string(),
        port.to_string(),
        "-A".to_string(),
        config.auth_method.clone(),
    ];
    if let Some(tls) = &config.tls {
        args.extend([
            "--ssl".to_string(),
            "--keyfile".to_string(),
            tls.key_file.display().to_string(),
            "--cacert".to_string(),
            tls.ca_cert.display().to_string(),
        ]);
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supervisor::TlsFiles;

    #[test]
    fn test_plain_args() {
        let config = WebSrvConfig::new("127.0.0.1", 0, "VBoxAuth");
        assert_eq!(
            build(&config, 18085),
            ["-H", "127.0.0.1", "-p", "18085", "-A", "VBoxAuth"]
        );
    }

    #[test]
    fn test_tls_args() {
        let config = WebSrvConfig::default().with_tls(TlsFiles {
            key_file: "/etc/vbox/key.pem".into(),
            ca_cert: "/etc/vbox/ca.pem".into(),
        });
        assert_eq!(
            build(&config, 18083),
            [
                "-H",
                "localhost",
                "-p",
                "18083",
                "-A",
                "null",
                "--ssl",
                "--keyfile",
                "/etc/vbox/key.pem",
                "--cacert",
                "/etc/vbox/ca.pem",
            ]
        );
    }
}

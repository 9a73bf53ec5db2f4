use crate::env;
use log::{LevelFilter, Metadata, Record};
use once_cell::sync::Lazy;
use std::fs::File;
use std::io::Write;
use std::sync::Mutex;

struct Logger {
    level: LevelFilter,
    file_level: LevelFilter,
    log_file: Option<Mutex<File>>,
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
            || (self.log_file.is_some() && metadata.level() <= self.file_level)
    }

    fn log(&self, record: &Record) {
        if record.level() <= self.file_level
            && let Some(log_file) = &self.log_file
        {
            let mut log_file = log_file.lock().unwrap_or_else(|e| e.into_inner());
            let out = format!(
                "{} {} {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                self.styled_level(record.level(), false),
                record.args()
            );
            let _ = writeln!(log_file, "{}", console::strip_ansi_codes(&out));
        }
        if record.level() <= self.level {
            let out = format!(
                "{} {}",
                self.styled_level(record.level(), true),
                record.args()
            );
            eprintln!("{out}");
        }
    }

    fn flush(&self) {
        if let Some(log_file) = &self.log_file {
            let _ = log_file.lock().unwrap_or_else(|e| e.into_inner()).flush();
        }
    }
}

static LOGGER: Lazy<Logger> = Lazy::new(Logger::new);

pub fn init() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        if let Err(err) = log::set_logger(&*LOGGER).map(|()| {
            let max = if LOGGER.log_file.is_some() {
                LOGGER.level.max(LOGGER.file_level)
            } else {
                LOGGER.level
            };
            log::set_max_level(max)
        }) {
            eprintln!("vboxweb: could not initialize logger: {err}");
        }
    });
}

impl Logger {
    fn new() -> Self {
        let log_file = env::VBOXWEB_LOG_FILE.as_ref().and_then(|path| {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            match File::options().append(true).create(true).open(path) {
                Ok(f) => Some(Mutex::new(f)),
                Err(e) => {
                    eprintln!("vboxweb: could not open log file {}: {e}", path.display());
                    None
                }
            }
        });
        Self {
            level: *env::VBOXWEB_LOG,
            file_level: *env::VBOXWEB_LOG_FILE_LEVEL,
            log_file,
        }
    }

    fn styled_level(&self, level: log::Level, color: bool) -> String {
        let tag = format!("{:5}", level.to_string().to_uppercase());
        if !color {
            return tag;
        }
        let styled = console::style(tag);
        match level {
            log::Level::Error => styled.red().bold(),
            log::Level::Warn => styled.yellow(),
            log::Level::Info => styled.cyan(),
            log::Level::Debug => styled.magenta(),
            log::Level::Trace => styled.dim(),
        }
        .for_stderr()
        .to_string()
    }
}

use std::ffi::{OsStr, OsString};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;

/// Environment variable holding the log path prefix.
pub const LOG_ENV: &str = "PRINTFDEBUG_LOG";

/// `<prefix>.<pid>.log`
pub fn log_path(prefix: &OsStr, pid: u32) -> PathBuf {
    let mut path = prefix.to_os_string();
    path.push(format!(".{pid}.log"));
    PathBuf::from(path)
}

enum Target {
    Env,
    Prefix(OsString),
}

/// Lazily opened output. Lives behind the tracer's mutex.
pub(crate) struct Sink {
    target: Target,
    out: Option<Box<dyn Write + Send>>,
}

impl Sink {
    pub(crate) fn from_env() -> Self {
        Self {
            target: Target::Env,
            out: None,
        }
    }

    pub(crate) fn with_prefix(prefix: OsString) -> Self {
        Self {
            target: Target::Prefix(prefix),
            out: None,
        }
    }

    pub(crate) fn with_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            target: Target::Env,
            out: Some(writer),
        }
    }

    pub(crate) fn is_open(&self) -> bool {
        self.out.is_some()
    }

    /// Write one complete line. Opens the output on first use; if that
    /// fails, the line goes to stderr and the open is retried next time.
    pub(crate) fn write_line(&mut self, line: &[u8]) {
        if self.out.is_none() {
            match self.open() {
                Ok(out) => self.out = Some(out),
                Err(_) => {
                    let _ = io::stderr().write_all(line);
                    return;
                }
            }
        }
        if let Some(out) = self.out.as_mut() {
            let _ = out.write_all(line);
        }
    }

    fn open(&self) -> io::Result<Box<dyn Write + Send>> {
        let prefix = match &self.target {
            Target::Env => std::env::var_os(LOG_ENV),
            Target::Prefix(prefix) => Some(prefix.clone()),
        };
        match prefix.filter(|p| !p.is_empty()) {
            None => Ok(Box::new(io::stderr())),
            Some(prefix) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(log_path(&prefix, std::process::id()))?;
                Ok(Box::new(file))
            }
        }
    }
}

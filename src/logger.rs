//! Engine session log.
//!
//! One file per session, truncated when the log is opened.  Engine code
//! reports structural events (layer add/remove/move/merge, fills, rejected
//! edits) through `log_info!` / `log_warn!` / `log_err!`; per-pixel work is
//! never logged.  Before [`init`] the macros return without formatting
//! anything, so embedding the engine without a log costs one atomic load per
//! event.
//!
//! [`default_log_path`] resolves to `TexPaint/texpaint.log` under the
//! platform data directory.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

static SESSION: OnceLock<Session> = OnceLock::new();

struct Session {
    path: PathBuf,
    file: Mutex<File>,
}

/// Severity tag written in front of every event line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

/// Path of the open session log, if any.
pub fn log_path() -> Option<&'static PathBuf> {
    SESSION.get().map(|s| &s.path)
}

pub fn is_initialized() -> bool {
    SESSION.get().is_some()
}

/// Append one event line.  I/O errors are swallowed: a full disk must not
/// fail a paint operation.
pub fn write(level: Level, args: fmt::Arguments<'_>) {
    if let Some(session) = SESSION.get() {
        session.append(&format!("[{}] [{}] {}", clock(), level.as_str(), args));
    }
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Info, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Warn, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_err {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Error, format_args!($($arg)*))
    };
}

/// Open the session log at [`default_log_path`].
pub fn init_default() -> std::io::Result<()> {
    init(&default_log_path())
}

/// Open (truncating) the session log at `path`, write the session header and
/// mirror panics into the log.  The first successful call wins; later calls
/// return `Ok(())` without touching the filesystem.
pub fn init(path: &Path) -> std::io::Result<()> {
    if is_initialized() {
        return Ok(());
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;

    let session = Session {
        path: path.to_path_buf(),
        file: Mutex::new(file),
    };
    if SESSION.set(session).is_err() {
        // another thread opened the log first
        return Ok(());
    }

    if let Some(session) = SESSION.get() {
        session.append(&format!(
            "=== TexPaint session started (engine {}, unix {}) ===",
            env!("CARGO_PKG_VERSION"),
            unix_seconds().unwrap_or(0)
        ));
        session.append(&format!("Log file: {}", path.display()));
        session.append("");
    }

    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        if let Some(session) = SESSION.get() {
            session.append(&format!("[{}] [PANIC] {}", clock(), info));
        }
        previous(info);
    }));
    Ok(())
}

pub fn default_log_path() -> PathBuf {
    data_dir().join("TexPaint").join("texpaint.log")
}

impl Session {
    fn append(&self, line: &str) {
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{}", line);
        }
    }
}

/// Per-user data directory, falling back to the working directory.
fn data_dir() -> PathBuf {
    let var = |name: &str| std::env::var_os(name).map(PathBuf::from);

    if cfg!(target_os = "windows")
        && let Some(appdata) = var("APPDATA")
    {
        return appdata;
    }
    if cfg!(target_os = "macos")
        && let Some(home) = var("HOME")
    {
        return home.join("Library").join("Application Support");
    }
    var("XDG_DATA_HOME")
        .or_else(|| var("HOME").map(|h| h.join(".local").join("share")))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn unix_seconds() -> Option<u64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .map(|d| d.as_secs())
}

/// UTC wall clock as `HH:MM:SS.mmm`.
fn clock() -> String {
    let Ok(now) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return "??:??:??.???".to_string();
    };
    let day = now.as_secs() % 86_400;
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        day / 3600,
        day % 3600 / 60,
        day % 60,
        now.subsec_millis()
    )
}

//! Leveled stderr logging for the `Strata` runtime core.
//!
//! One process-wide [`Logger`] holds the minimum [`Level`] in an atomic.
//! The macros check it before formatting anything, so a disabled message
//! costs one relaxed load. Records are written to stderr as
//!
//! ```text
//! [DEBUG] strata_mem::arena: arena grew to 2 blocks
//! ```
//!
//! with the level tag colored when stderr is a terminal and `NO_COLOR` is
//! unset.
//!
//! # Example
//!
//! ```
//! use strata_log::{Level, debug, error, info};
//!
//! strata_log::set_level(Level::Debug);
//!
//! let blocks = 3;
//! info!("arena holds {blocks} blocks");
//! debug!("slot layout: {:?}", [1, 2, 3]);
//! error!("allocation of {} bytes failed", 1usize << 40);
//! ```
//!
//! # Configuration
//!
//! The default level is [`Level::Warn`]. Hosts that want their users to
//! choose call [`init_from_env`] once at startup:
//!
//! ```
//! // STRATA_LOG=debug ./host-program
//! strata_log::init_from_env();
//! ```

use std::fmt;
use std::io::{IsTerminal, Write};
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};

/// Environment variable read by [`init_from_env`].
pub const ENV_VAR: &str = "STRATA_LOG";

/// Severity of a record. Lower values are more severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Failures the host cannot continue past.
    Error = 0,
    /// Something looks wrong but work continues.
    Warn = 1,
    Info = 2,
    /// Growth events and other diagnostics.
    Debug = 3,
    /// Per-operation tracing.
    Trace = 4,
}

impl Level {
    /// Every level, most severe first.
    pub const ALL: [Level; 5] = [
        Level::Error,
        Level::Warn,
        Level::Info,
        Level::Debug,
        Level::Trace,
    ];

    /// Upper-case name used in output.
    pub const fn as_str(self) -> &'static str {
        match self {
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        }
    }

    const fn ansi(self) -> &'static str {
        match self {
            Level::Error => "\x1b[31m",
            Level::Warn => "\x1b[33m",
            Level::Info => "\x1b[32m",
            Level::Debug => "\x1b[36m",
            Level::Trace => "\x1b[35m",
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Level::Error,
            1 => Level::Warn,
            2 => Level::Info,
            3 => Level::Debug,
            _ => Level::Trace,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Error returned when a level name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLevelError {
    input: String,
}

impl fmt::Display for ParseLevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid log level '{}' (expected error, warn, info, debug or trace)",
            self.input
        )
    }
}

impl std::error::Error for ParseLevelError {}

/// Case-insensitive; surrounding whitespace is ignored and `warning` is
/// accepted for [`Level::Warn`].
///
/// ```
/// use strata_log::Level;
///
/// assert_eq!("error".parse(), Ok(Level::Error));
/// assert_eq!(" Debug ".parse(), Ok(Level::Debug));
/// assert!("loud".parse::<Level>().is_err());
/// ```
impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Level::ALL
            .into_iter()
            .find(|level| name.eq_ignore_ascii_case(level.as_str()))
            .or_else(|| name.eq_ignore_ascii_case("warning").then_some(Level::Warn))
            .ok_or_else(|| ParseLevelError {
                input: s.to_string(),
            })
    }
}

/// Minimum-level filter shared by every record.
pub struct Logger {
    level: AtomicU8,
}

impl Logger {
    /// Creates a logger that lets `level` and everything more severe through.
    pub const fn new(level: Level) -> Self {
        Logger {
            level: AtomicU8::new(level as u8),
        }
    }

    pub fn set_level(&self, level: Level) {
        self.level.store(level as u8, Ordering::Relaxed);
    }

    pub fn level(&self) -> Level {
        Level::from_u8(self.level.load(Ordering::Relaxed))
    }

    /// Returns true if a record at `level` would be written.
    #[inline]
    pub fn enabled(&self, level: Level) -> bool {
        level as u8 <= self.level.load(Ordering::Relaxed)
    }
}

static LOGGER: Logger = Logger::new(Level::Warn);

/// The process-wide logger.
#[inline]
pub fn logger() -> &'static Logger {
    &LOGGER
}

/// Sets the process-wide minimum level.
pub fn set_level(level: Level) {
    LOGGER.set_level(level);
}

/// Parses `s` and sets the process-wide minimum level. On error the level
/// is left unchanged.
///
/// ```
/// strata_log::set_level_from_str("debug").unwrap();
/// assert_eq!(strata_log::logger().level(), strata_log::Level::Debug);
/// ```
pub fn set_level_from_str(s: &str) -> Result<(), ParseLevelError> {
    set_level(s.parse()?);
    Ok(())
}

/// Applies the level named by `STRATA_LOG`, if set, and returns the level
/// now in effect. An unparseable value is reported at `Warn` and ignored.
pub fn init_from_env() -> Level {
    if let Ok(value) = std::env::var(ENV_VAR)
        && let Err(err) = set_level_from_str(&value)
    {
        crate::warn!("ignoring {ENV_VAR}: {err}");
    }
    LOGGER.level()
}

fn use_color(stderr: &std::io::Stderr) -> bool {
    stderr.is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

/// Writes one record. Called by the macros once the level has passed the
/// filter.
#[doc(hidden)]
pub fn __emit(level: Level, target: &str, args: fmt::Arguments<'_>) {
    let stderr = std::io::stderr();
    let color = use_color(&stderr);
    let mut out = stderr.lock();

    // Write errors are dropped; logging must never fail the caller.
    let _ = if color {
        writeln!(out, "{}[{}]\x1b[0m {target}: {args}", level.ansi(), level)
    } else {
        writeln!(out, "[{level}] {target}: {args}")
    };
}

/// Logs at an explicit level, tagging the record with the caller's module
/// path.
///
/// ```
/// use strata_log::{Level, log};
///
/// log!(Level::Warn, "{} slots in use", 12);
/// ```
#[macro_export]
macro_rules! log {
    ($level:expr, $($arg:tt)+) => {{
        let level: $crate::Level = $level;
        if $crate::logger().enabled(level) {
            $crate::__emit(level, module_path!(), format_args!($($arg)+));
        }
    }};
}

/// Logs at [`Level::Error`].
#[macro_export]
macro_rules! error {
    ($($arg:tt)+) => { $crate::log!($crate::Level::Error, $($arg)+) };
}

/// Logs at [`Level::Warn`].
#[macro_export]
macro_rules! warn {
    ($($arg:tt)+) => { $crate::log!($crate::Level::Warn, $($arg)+) };
}

/// Logs at [`Level::Info`].
#[macro_export]
macro_rules! info {
    ($($arg:tt)+) => { $crate::log!($crate::Level::Info, $($arg)+) };
}

/// Logs at [`Level::Debug`].
#[macro_export]
macro_rules! debug {
    ($($arg:tt)+) => { $crate::log!($crate::Level::Debug, $($arg)+) };
}

/// Logs at [`Level::Trace`].
#[macro_export]
macro_rules! trace {
    ($($arg:tt)+) => { $crate::log!($crate::Level::Trace, $($arg)+) };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_are_ordered_by_severity() {
        assert!(Level::ALL.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(Level::ALL.first(), Some(&Level::Error));
    }

    #[test]
    fn test_parse_level_names() {
        for level in Level::ALL {
            assert_eq!(level.as_str().parse(), Ok(level));
            assert_eq!(level.as_str().to_lowercase().parse(), Ok(level));
        }
        assert_eq!("Warning".parse(), Ok(Level::Warn));
        assert_eq!("\tinfo\n".parse(), Ok(Level::Info));
    }

    #[test]
    fn test_parse_level_error_names_input() {
        let err = "verbose".parse::<Level>().unwrap_err();
        assert!(err.to_string().contains("'verbose'"));
        assert!("".parse::<Level>().is_err());
    }

    #[test]
    fn test_level_display_pads() {
        assert_eq!(Level::Warn.to_string(), "WARN");
        assert_eq!(format!("{:<5}|", Level::Info), "INFO |");
    }

    #[test]
    fn test_level_from_u8_inverts_discriminant() {
        for level in Level::ALL {
            assert_eq!(Level::from_u8(level as u8), level);
        }
        assert_eq!(Level::from_u8(200), Level::Trace);
    }

    #[test]
    fn test_logger_filters_below_level() {
        let logger = Logger::new(Level::Info);
        let enabled: Vec<_> = Level::ALL.into_iter().filter(|&l| logger.enabled(l)).collect();
        assert_eq!(enabled, [Level::Error, Level::Warn, Level::Info]);

        logger.set_level(Level::Error);
        assert!(logger.enabled(Level::Error));
        assert!(!logger.enabled(Level::Warn));
        assert_eq!(logger.level(), Level::Error);
    }

    // Every test in this binary shares the global level, so the checks
    // that mutate it live in one test.
    #[test]
    fn test_global_level() {
        assert!(set_level_from_str("trace").is_ok());
        assert_eq!(logger().level(), Level::Trace);

        assert!(set_level_from_str("nonsense").is_err());
        assert_eq!(logger().level(), Level::Trace);

        set_level(Level::Error);
        assert!(!logger().enabled(Level::Warn));
        warn!("filtered out");
        error!("written to stderr");

        set_level(Level::Warn);
    }
}

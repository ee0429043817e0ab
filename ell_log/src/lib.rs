//! Levelled logging for the Ell toolchain.
//!
//! Messages go to stderr with a coloured level tag. A process-wide filter
//! decides which levels are printed; it defaults to [`Level::Warning`], so
//! `info!` and everything chattier stay silent unless a frontend turns them on.

use std::{
    fmt,
    sync::atomic::{AtomicU8, Ordering},
};

pub use colored::Colorize;

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(u8)]
pub enum Level {
    Error = 0,
    Warning = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl Level {
    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Level::Error,
            1 => Level::Warning,
            2 => Level::Info,
            3 => Level::Debug,
            _ => Level::Trace,
        }
    }

    const fn tag(self) -> &'static str {
        match self {
            Level::Error => "[error]",
            Level::Warning => "[warning]",
            Level::Info => "[info]",
            Level::Debug => "[debug]",
            Level::Trace => "[trace]",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

static MAX_LEVEL: AtomicU8 = AtomicU8::new(Level::Warning as u8);

/// Sets the most verbose level that will be printed.
pub fn set_max_level(level: Level) {
    MAX_LEVEL.store(level as u8, Ordering::Relaxed);
}

pub fn max_level() -> Level {
    Level::from_u8(MAX_LEVEL.load(Ordering::Relaxed))
}

/// Returns `true` if a message at `level` would be printed.
pub fn enabled(level: Level) -> bool {
    level <= max_level()
}

/// Implementation detail of the logging macros.
#[doc(hidden)]
pub fn __emit(level: Level, location: &str, args: fmt::Arguments<'_>) {
    let tag = match level {
        Level::Error => level.tag().bright_red(),
        Level::Warning => level.tag().bright_yellow(),
        Level::Info => level.tag().blue(),
        Level::Debug => level.tag().cyan(),
        Level::Trace => level.tag().purple(),
    };

    // Source locations only help people working on the compiler itself
    if cfg!(debug_assertions) {
        eprintln!("{} {} {}", tag, location.yellow(), args);
    } else {
        eprintln!("{} {}", tag, args);
    }
}

/// Internal macro used to deduplicate logic.
/// Prefer the level-specific macros below.
#[macro_export]
macro_rules! log {
    ($level:expr, $($arg:tt)+) => {{
        let level = $level;

        if $crate::enabled(level) {
            $crate::__emit(level, concat!(file!(), ":", line!(), ":"), format_args!($($arg)+));
        }
    }};
}

/// For verbose output tracking the execution of the program.
#[macro_export]
macro_rules! trace {
    ($($arg:tt)+) => {
        $crate::log!($crate::Level::Trace, $($arg)+)
    };
}

/// For additional information that might be helpful for debugging.
#[macro_export]
macro_rules! debug {
    ($($arg:tt)+) => {
        $crate::log!($crate::Level::Debug, $($arg)+)
    };
}

/// Information that may be useful to the user.
#[macro_export]
macro_rules! info {
    ($($arg:tt)+) => {
        $crate::log!($crate::Level::Info, $($arg)+)
    };
}

/// An alert that something may have gone wrong.
#[macro_export]
macro_rules! warning {
    ($($arg:tt)+) => {
        $crate::log!($crate::Level::Warning, $($arg)+)
    };
}

/// An alert that something has gone horribly wrong.
#[macro_export]
macro_rules! error {
    ($($arg:tt)+) => {
        $crate::log!($crate::Level::Error, $($arg)+)
    };
}

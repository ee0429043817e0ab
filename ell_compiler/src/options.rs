//! Options for a compilation. These settings affect how the compiler
//! works, not the language itself.

use std::convert::TryFrom;
use thiserror::Error;

#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum OptionsError {
    #[error("unknown compiler option `{0}`")]
    UnknownOption(String),
    #[error("option `{0}` needs a value, as in `{0}=N`")]
    MissingValue(String),
    #[error("invalid value `{value}` for option `{option}`")]
    InvalidValue { option: String, value: String },
}

/// Controls a compilation. The [`Default`] implementation checks
/// everything.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CompileOptions {
    /// Run pass 2 over function bodies and top-level code.
    pub check_bodies: bool,
    /// How deeply imports may nest before the compiler gives up.
    pub max_import_depth: usize,
}

impl CompileOptions {
    pub const fn new(check_bodies: bool, max_import_depth: usize) -> Self {
        Self {
            check_bodies,
            max_import_depth,
        }
    }
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self::new(true, 64)
    }
}

/// Goes from a list of `-Z` flags to a `CompileOptions`.
impl TryFrom<Vec<String>> for CompileOptions {
    type Error = OptionsError;

    fn try_from(options: Vec<String>) -> Result<Self, Self::Error> {
        let mut res = CompileOptions::default();

        for option in options {
            let (name, value) = match option.split_once('=') {
                Some((name, value)) => (name, Some(value)),
                None => (option.as_str(), None),
            };

            match (name, value) {
                ("no-body-check", None) => res.check_bodies = false,

                ("import-depth", Some(value)) => {
                    res.max_import_depth = value.parse().map_err(|_| OptionsError::InvalidValue {
                        option: name.to_owned(),
                        value: value.to_owned(),
                    })?;
                },

                ("import-depth", None) => return Err(OptionsError::MissingValue(name.to_owned())),
                _ => return Err(OptionsError::UnknownOption(option)),
            }
        }

        Ok(res)
    }
}

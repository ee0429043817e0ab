#![allow(clippy::comparison_chain)]
#![warn(unused_imports)]
#![warn(unused_must_use)]

pub mod errors;
pub mod lexer;
pub mod options;
pub mod parser;
pub mod resolver;

use ell_log::debug;

pub use errors::{CompileError, ErrorKind, SourceBuffer, Span};
pub use options::{CompileOptions, OptionsError};
pub use resolver::{
    module::{FileProvider, MemoryProvider},
    Compilation,
};

/// Compiles the module at `path`, whose source is `code`. Imports are
/// read through `provider`.
///
/// The first error ends the compilation. Its `origin` names the module
/// it was found in.
pub fn compile(
    code: &str,
    path: &str,
    provider: &dyn FileProvider,
    options: CompileOptions,
) -> Result<Compilation, CompileError> {
    debug!("compiling `{}` with {:?}", path, options);
    resolver::Resolver::new(provider, options).compile(code, path)
}

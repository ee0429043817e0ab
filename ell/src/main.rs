use anyhow::Context;
use ell_compiler::{
    compile,
    lexer::tokenize,
    parser::parse,
    CompileError,
    CompileOptions,
    FileProvider,
    SourceBuffer,
};
use ell_log::*;
use pico_args::Arguments;
use rustc_version_runtime::version_meta;
use std::{
    convert::TryFrom,
    env::current_exe,
    fs,
    io::{self, IsTerminal},
    path::PathBuf,
    process::exit,
};

const PACKAGE_NAME: &str = env!("CARGO_PKG_NAME");
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug)]
struct Args {
    ast: bool,
    help: bool,
    tokens: bool,
    trace: bool,
    options: CompileOptions,
    verbose: bool,
    version: bool,
    source_file: Option<String>,
}

fn process_args() -> Result<Args, pico_args::Error> {
    let mut args = Arguments::from_env();
    let option_strings = args.values_from_str("-Z")?;
    let options = match CompileOptions::try_from(option_strings) {
        Ok(res) => res,

        Err(err) => {
            error!("{}", err);
            exit(1);
        },
    };

    Ok(Args {
        ast: args.contains("--ast"),
        help: args.contains(["-h", "--help"]),
        tokens: args.contains("--tokens"),
        trace: args.contains(["-t", "--trace"]),
        verbose: args.contains(["-v", "--verbose"]),
        version: args.contains(["-V", "--version"]),
        options,
        source_file: args.free_from_str()?,
    })
}

fn usage() -> String {
    let current_exe = current_exe().unwrap_or_else(|_| PathBuf::from("ell"));
    let filename = current_exe
        .file_name()
        .map_or_else(|| "ell".into(), |name| name.to_string_lossy());

    format!(
        concat!(
            "Usage: {} [options] file\n",
            "Options:\n",
            "   --ast - print the parsed syntax tree\n",
            "   -h, --help - view help\n",
            "   -t, --trace - print everything the compiler does\n",
            "   --tokens - print the token stream\n",
            "   -v, --verbose - enable verbose output\n",
            "   -V, --version - show version\n",
            "   -Z option - set a compiler option (no-body-check, import-depth=N)\n",
        ),
        filename
    )
}

/// Reads imported modules from the filesystem.
struct FsProvider;

impl FileProvider for FsProvider {
    fn read(&self, path: &str) -> anyhow::Result<String> {
        fs::read_to_string(path).with_context(|| format!("couldn't read `{}`", path))
    }
}

/// Prints a full report of `err`. The module it came from is read again
/// for the code frame.
fn report(err: &CompileError, fallback: &SourceBuffer) {
    let source = err
        .origin
        .as_deref()
        .filter(|origin| Some(*origin) != fallback.origin())
        .and_then(|origin| fs::read_to_string(origin).ok().map(|code| (origin, code)))
        .map(|(origin, code)| SourceBuffer::new(code, Some(origin.to_owned())));

    let source = source.as_ref().unwrap_or(fallback);
    let color = io::stderr().is_terminal();

    if err.emit(source, &mut io::stderr(), color).is_err() {
        // Fall back to the plain frame
        eprintln!("{}", err.code_frame(source));
    }
}

fn main() {
    let args = match process_args() {
        Ok(args) => args,

        Err(pico_args::Error::UnusedArgsLeft(args)) => {
            let s_if_plural = if args.len() == 1 { "" } else { "s" };

            error!("unknown argument{}: {}", s_if_plural, args.join(", "));

            eprintln!("{}", usage());
            exit(1);
        },

        Err(err) => {
            error!("{}", err);
            eprintln!("{}", usage());
            exit(1);
        },
    };

    if args.help {
        println!("{}", usage());
        return;
    } else if args.version || args.verbose {
        println!("{} {}", PACKAGE_NAME, VERSION);

        if args.verbose {
            println!("Compiled with {}", version_meta().short_version_string);
        }

        if args.version {
            return;
        }
    }

    if args.trace {
        set_max_level(Level::Trace);
    } else if args.verbose {
        set_max_level(Level::Info);
    }

    let source_file = args.source_file.unwrap_or_else(|| {
        error!("no source file provided");
        eprintln!("{}", usage());
        exit(1);
    });

    let code = match fs::read_to_string(&source_file) {
        Ok(res) => res,

        Err(err) => {
            error!("couldn't open {} for reading: {}", source_file, err);
            exit(2);
        },
    };

    let source = SourceBuffer::new(code.as_str(), Some(source_file.clone()));

    if args.tokens {
        match tokenize(&source) {
            Ok(tokens) => {
                for token in tokens {
                    println!("{:>5}..{:<5} {}", token.span.start, token.span.end, token.kind);
                }
            },

            Err(err) => {
                report(&err, &source);
                exit(2);
            },
        }
    }

    if args.ast {
        match parse(&source) {
            Ok(script) => print!("{}", script),

            Err(err) => {
                report(&err, &source);
                exit(2);
            },
        }
    }

    info!("compiling {}...", source_file);

    match compile(&code, &source_file, &FsProvider, args.options) {
        Ok(compilation) => {
            info!(
                "compiled {} module{} ({} types, {} values)",
                compilation.modules.len(),
                if compilation.modules.len() == 1 { "" } else { "s" },
                compilation.kinds.len(),
                compilation.values.len()
            );
        },

        Err(err) => {
            report(&err, &source);
            exit(2);
        },
    }
}

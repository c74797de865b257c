use std::fs;
use std::path::PathBuf;
use std::process;
use std::rc::Rc;

use clap::{Parser, Subcommand};

use ezlang::eval::host::StdHost;
use ezlang::eval::Runtime;

#[derive(Parser)]
#[command(name = "ezlang", version, about = "Run and check EzLang scripts")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Execute a script
    Run {
        /// Path of source file
        path: PathBuf,
        /// Launch arguments read by `get_argument`, as KEY=VALUE
        args: Vec<String>,
    },
    /// Lex and parse a script and everything it imports without running it
    Check {
        /// Path of source file
        path: PathBuf,
    },
    /// Start the interactive shell
    Repl,
}

fn main() {
    ezlang::init_tracing();

    let code = match Cli::parse().command {
        Some(Command::Run { path, args }) => run(path, args),
        Some(Command::Check { path }) => check(path),
        Some(Command::Repl) | None => match ezlang::repl::run_repl() {
            Ok(()) => 0,
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        },
    };
    process::exit(code);
}

fn read_source(path: &PathBuf) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(source) => Some(source),
        Err(e) => {
            eprintln!("Error reading {}: {}", path.display(), e);
            None
        }
    }
}

fn run(path: PathBuf, args: Vec<String>) -> i32 {
    let Some(source) = read_source(&path) else {
        return 1;
    };
    let filename = path.display().to_string();

    let parsed = match ezlang::parse_source(&source) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("{}", e.render(&source, &filename));
            return 1;
        }
    };
    if !parsed.is_clean() {
        for e in &parsed.errors {
            eprintln!("{}", e.render(&source, &filename));
        }
        return 1;
    }

    let host = Rc::new(StdHost::with_args(&args));
    let mut runtime = Runtime::from_file(parsed.program, &path).with_host(host);
    match runtime.execute() {
        Ok(()) => 0,
        Err(e) => {
            match runtime.error_file() {
                Some(file) => {
                    let imported = fs::read_to_string(file).unwrap_or_default();
                    eprintln!("{}", e.render(&imported, &file.display().to_string()));
                }
                None => eprintln!("{}", e.render(&source, &filename)),
            }
            1
        }
    }
}

fn check(path: PathBuf) -> i32 {
    match ezlang::check_file(&path) {
        Ok(diagnostics) if diagnostics.is_empty() => {
            println!("{}: ok", path.display());
            0
        }
        Ok(diagnostics) => {
            for d in &diagnostics {
                eprintln!("{}", d.error.render(&d.source, &d.path.display().to_string()));
            }
            1
        }
        Err(e) => {
            eprintln!("{}: {}", path.display(), e.summary());
            1
        }
    }
}

pub mod ast;
pub mod error;
pub mod eval;
pub mod imports;
pub mod lexer;
pub mod parser;
pub mod repl;
pub mod span;
pub mod stack;
pub mod stdlib;

use std::fs;
use std::path::Path;
use std::rc::Rc;
use std::sync::Once;

use error::EzError;
use eval::host::Host;
use eval::Runtime;
use imports::{Diagnostic, ModuleLoader};
use parser::Parsed;

static TRACING_INIT: Once = Once::new();

/// Install a stderr `tracing` subscriber filtered by `RUST_LOG`. Does nothing
/// when `RUST_LOG` is unset or a subscriber is already installed.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            let _ = tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_level(true),
                )
                .with(filter)
                .try_init();
        }
    });
}

/// Tokenize and parse `source`. Lexical errors are fatal; parse errors are
/// collected in the returned [`Parsed`].
pub fn parse_source(source: &str) -> Result<Parsed, EzError> {
    let tokens = lexer::tokenize(source)?;
    Ok(parser::parse(tokens))
}

/// Parse and execute `source` with `host`. `path` is the file the source was
/// read from, if any; relative imports resolve against it. Any parse error
/// aborts before execution.
pub fn run_source(
    source: &str,
    path: Option<&Path>,
    host: Rc<dyn Host>,
) -> Result<Runtime, EzError> {
    let program = parse_source(source)?.into_result()?;
    let runtime = match path {
        Some(path) => Runtime::from_file(program, path),
        None => Runtime::new(program),
    };
    let mut runtime = runtime.with_host(host);
    runtime.execute()?;
    Ok(runtime)
}

/// Lex and parse `path` together with everything it imports, without running
/// it. Returns the parse diagnostics of every file in the graph.
pub fn check_file(path: &Path) -> Result<Vec<Diagnostic>, EzError> {
    let source = fs::read_to_string(path).map_err(|e| EzError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let parsed = parse_source(&source)?;

    let mut diagnostics: Vec<Diagnostic> = parsed
        .errors
        .into_iter()
        .map(|error| Diagnostic {
            path: path.to_path_buf(),
            source: source.clone(),
            error,
        })
        .collect();

    let mut loader = ModuleLoader::new();
    let expansion = loader.expand(parsed.program, path)?;
    tracing::debug!(
        files = loader.loaded_count(),
        statements = expansion.program.body.len(),
        "checked import graph"
    );
    diagnostics.extend(expansion.diagnostics);
    Ok(diagnostics)
}

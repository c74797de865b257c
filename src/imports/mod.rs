use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::ast::{Program, SpannedStmt, Stmt};
use crate::error::EzError;
use crate::lexer;
use crate::parser;
use crate::span::Position;

/// Source file extension appended to extensionless import paths.
pub const EXTENSION: &str = "ez";

/// A file read and parsed on behalf of an `import` statement.
#[derive(Debug)]
pub struct LoadedModule {
    pub path: PathBuf,
    pub source: String,
    pub program: Program,
    /// Statements the parser had to skip. A runtime refuses to execute a
    /// module that has any.
    pub errors: Vec<EzError>,
}

/// A parse error reported for one file of an import graph.
#[derive(Debug)]
pub struct Diagnostic {
    pub path: PathBuf,
    pub source: String,
    pub error: EzError,
}

/// Result of [`ModuleLoader::expand`].
#[derive(Debug)]
pub struct Expansion {
    pub program: Program,
    pub diagnostics: Vec<Diagnostic>,
}

/// Tracks which canonical paths have been loaded so every file is read at
/// most once per runtime, which also cuts import cycles short.
#[derive(Debug, Default)]
pub struct ModuleLoader {
    loaded: HashSet<PathBuf>,
}

impl ModuleLoader {
    pub fn new() -> Self {
        ModuleLoader::default()
    }

    /// Resolve `request` against the directory of `importer` (or the working
    /// directory when there is none) and canonicalize it.
    pub fn resolve(
        &self,
        request: &str,
        importer: Option<&Path>,
        pos: Position,
    ) -> Result<PathBuf, EzError> {
        let base = importer
            .and_then(Path::parent)
            .unwrap_or_else(|| Path::new("."));
        let mut candidate = base.join(request);
        if candidate.extension().is_none() {
            candidate.set_extension(EXTENSION);
        }
        if !candidate.is_file() {
            return Err(EzError::FileNotFound {
                path: candidate.display().to_string(),
                pos,
            });
        }
        candidate.canonicalize().map_err(|e| EzError::Io {
            path: candidate.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Record `path` as loaded. Returns `false` if it already was.
    pub fn mark_loaded(&mut self, path: impl Into<PathBuf>) -> bool {
        self.loaded.insert(path.into())
    }

    pub fn is_loaded(&self, path: &Path) -> bool {
        self.loaded.contains(path)
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded.len()
    }

    /// Resolve, read, tokenize and parse an import. Returns `Ok(None)` when
    /// the file was already loaded by this loader.
    pub fn load(
        &mut self,
        request: &str,
        importer: Option<&Path>,
        pos: Position,
    ) -> Result<Option<LoadedModule>, EzError> {
        let path = self.resolve(request, importer, pos)?;
        self.load_path(path)
    }

    /// Read, tokenize and parse an already resolved path.
    pub fn load_path(&mut self, path: PathBuf) -> Result<Option<LoadedModule>, EzError> {
        if !self.mark_loaded(path.clone()) {
            tracing::debug!(path = %path.display(), "module already loaded, skipping");
            return Ok(None);
        }

        let source = fs::read_to_string(&path).map_err(|e| EzError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let tokens = lexer::tokenize(&source)?;
        let parsed = parser::parse(tokens);

        tracing::debug!(
            path = %path.display(),
            statements = parsed.program.body.len(),
            "loaded module"
        );
        Ok(Some(LoadedModule {
            path,
            source,
            program: parsed.program,
            errors: parsed.errors,
        }))
    }

    /// Inline every top-level import of `program` (recursively) without
    /// executing anything. `origin` is the file `program` was parsed from.
    pub fn expand(&mut self, program: Program, origin: &Path) -> Result<Expansion, EzError> {
        if let Ok(canonical) = origin.canonicalize() {
            self.mark_loaded(canonical);
        }
        let mut body = Vec::with_capacity(program.body.len());
        let mut diagnostics = Vec::new();
        self.expand_into(program.body, origin, &mut body, &mut diagnostics)?;
        Ok(Expansion {
            program: Program::new(body),
            diagnostics,
        })
    }

    fn expand_into(
        &mut self,
        stmts: Vec<SpannedStmt>,
        current: &Path,
        out: &mut Vec<SpannedStmt>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<(), EzError> {
        for stmt in stmts {
            let request = match &stmt.node {
                Stmt::Import { path } => path.clone(),
                _ => {
                    out.push(stmt);
                    continue;
                }
            };
            let module = match self.load(&request, Some(current), stmt.pos)? {
                Some(module) => module,
                None => continue,
            };
            for error in module.errors {
                diagnostics.push(Diagnostic {
                    path: module.path.clone(),
                    source: module.source.clone(),
                    error,
                });
            }
            self.expand_into(module.program.body, &module.path, out, diagnostics)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn appends_extension_and_resolves_from_importer_dir() {
        let dir = tempfile::tempdir().unwrap();
        let main = write(dir.path(), "main.ez", "");
        let lib = write(dir.path(), "lib/util.ez", "");
        let loader = ModuleLoader::new();
        let resolved = loader
            .resolve("lib/util", Some(&main), Position::default())
            .unwrap();
        assert_eq!(resolved, lib.canonicalize().unwrap());
    }

    #[test]
    fn missing_file_is_reported_with_position() {
        let dir = tempfile::tempdir().unwrap();
        let main = write(dir.path(), "main.ez", "");
        let loader = ModuleLoader::new();
        let err = loader
            .resolve("nope", Some(&main), Position::new(3, 1))
            .unwrap_err();
        match err {
            EzError::FileNotFound { path, pos } => {
                assert!(path.ends_with("nope.ez"));
                assert_eq!(pos, Position::new(3, 1));
            }
            other => panic!("expected FileNotFound, got {:?}", other),
        }
    }

    #[test]
    fn second_load_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let main = write(dir.path(), "main.ez", "");
        write(dir.path(), "a.ez", "var a = 1");
        let mut loader = ModuleLoader::new();
        assert!(loader.load("a", Some(&main), Position::default()).unwrap().is_some());
        assert!(loader.load("./a.ez", Some(&main), Position::default()).unwrap().is_none());
        assert_eq!(loader.loaded_count(), 1);
        assert!(loader.is_loaded(&dir.path().join("a.ez").canonicalize().unwrap()));
    }

    #[test]
    fn expand_inlines_imports_once_and_survives_cycles() {
        let dir = tempfile::tempdir().unwrap();
        let main = write(dir.path(), "main.ez", "");
        write(dir.path(), "a.ez", "import \"b\"\nvar a = 1");
        write(dir.path(), "b.ez", "import \"a\"\nimport \"main\"\nvar b = 2");

        let program = parser::parse(lexer::tokenize("import \"a\"\nimport \"b\"\nvar c = 3").unwrap())
            .into_result()
            .unwrap();
        let mut loader = ModuleLoader::new();
        let expansion = loader.expand(program, &main).unwrap();

        let names: Vec<&str> = expansion
            .program
            .body
            .iter()
            .map(|s| match &s.node {
                Stmt::VarDecl { name, .. } => name.as_str(),
                other => panic!("unexpected statement {:?}", other),
            })
            .collect();
        assert_eq!(names, vec!["b", "a", "c"]);
        assert!(expansion.diagnostics.is_empty());
    }
}

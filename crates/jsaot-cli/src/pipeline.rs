//! Source -> module: parse, instrument (debug builds), analyze, generate.

use std::fs;
use std::path::{Path, PathBuf};

use jsaot_codegen_wasm::{CodegenError, CompileOptions, CompiledModule, WasmCodegen};
use jsaot_lexer::LexError;
use jsaot_parser::{ParseError, SourceError, parse_source};
use jsaot_passes::{AnalyzeError, analyze, instrument};

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Analyze(#[from] AnalyzeError),
    #[error(transparent)]
    Codegen(#[from] CodegenError),
}

impl From<SourceError> for CompileError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Lex(e) => CompileError::Lex(e),
            SourceError::Parse(e) => CompileError::Parse(e),
        }
    }
}

pub fn read_source(path: &Path) -> Result<String, CompileError> {
    fs::read_to_string(path).map_err(|source| CompileError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn compile(source: &str, options: CompileOptions) -> Result<CompiledModule, CompileError> {
    let mut program = parse_source(source)?;
    tracing::debug!(statements = program.body.len(), "parsed");

    let debug_info = options.debug.then(|| instrument(&mut program));
    let analysis = analyze(&program)?;
    tracing::debug!(functions = analysis.functions().len(), "analyzed captures");

    let module = WasmCodegen::new(options).compile(&program, &analysis, debug_info.as_ref())?;
    tracing::debug!(bytes = module.wasm.len(), debug = options.debug, "generated module");
    Ok(module)
}

/// The capture analyzer's report for `source`.
pub fn capture_report(source: &str) -> Result<String, CompileError> {
    let program = parse_source(source)?;
    Ok(analyze(&program)?.report())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_errors_keep_their_stage() {
        assert!(matches!(compile("let = 1;", CompileOptions::default()), Err(CompileError::Parse(_))));
        assert!(matches!(compile("console.log(y);", CompileOptions::default()), Err(CompileError::Analyze(_))));
        assert!(matches!(compile("let s = 'a';", CompileOptions::default()), Err(CompileError::Codegen(_))));
    }

    #[test]
    fn debug_builds_carry_debug_info() {
        let module = compile("let a = 1;\nconsole.log(a);", CompileOptions { debug: true }).unwrap();
        assert_eq!(module.debug_info.unwrap().lines.len(), 2);
    }

    #[test]
    fn missing_file_is_reported_with_path() {
        let err = read_source(Path::new("/nonexistent/input.js")).unwrap_err();
        assert!(err.to_string().starts_with("Failed to read /nonexistent/input.js"));
    }
}

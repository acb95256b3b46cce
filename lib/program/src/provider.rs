//! The seam between the engine and the concrete language frontend.
//!
//! Everything above this crate talks to the program under repair through
//! [`AstProvider`]; the bundled [`CSubsetProvider`] parses the C subset
//! defined in [`crate::ast`].

use std::{fs, path::Path};

use crate::{
    ast::{parse, print, Expr, FileAst, Statement},
    store::SymbolTable,
    Error, Result,
};

pub trait AstProvider {
    /// Parse a source file, interning its variables into `symbols`.
    fn parse(&self, path: &Path, symbols: &mut SymbolTable) -> Result<FileAst>;

    /// Run the frontend's preprocessor over `src`, writing to `dst`.
    /// Returns whether the output differs from the input.
    fn preprocess(&self, src: &Path, dst: &Path) -> Result<bool>;

    /// Render a file back to compilable source.
    fn pretty_print(&self, file: &FileAst, symbols: &SymbolTable) -> String;

    /// The expression subatoms of a statement, left to right.
    fn subatoms_of<'a>(&self, stmt: &'a Statement) -> Vec<&'a Expr>;
}

/// Frontend for the bundled C subset.
#[derive(Debug, Clone, Copy, Default)]
pub struct CSubsetProvider;

impl AstProvider for CSubsetProvider {
    fn parse(&self, path: &Path, symbols: &mut SymbolTable) -> Result<FileAst> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("c") => {}
            _ => return Err(Error::UnknownExtension(path.to_path_buf())),
        }
        let source = fs::read_to_string(path)?;
        let name = path.to_string_lossy().into_owned();
        parse::parse_source(&name, &source, symbols)
    }

    fn preprocess(&self, src: &Path, dst: &Path) -> Result<bool> {
        // The subset needs no preprocessing; the copy keeps the pipeline
        // shape for frontends that do.
        fs::copy(src, dst)?;
        Ok(false)
    }

    fn pretty_print(&self, file: &FileAst, symbols: &SymbolTable) -> String {
        print::pretty_print_file(file, symbols)
    }

    fn subatoms_of<'a>(&self, stmt: &'a Statement) -> Vec<&'a Expr> {
        stmt.kind.subatoms()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_extension_is_rejected() {
        let provider = CSubsetProvider;
        let mut symbols = SymbolTable::new();
        let err = provider
            .parse(Path::new("program.ml"), &mut symbols)
            .unwrap_err();
        assert!(matches!(err, Error::UnknownExtension(_)));
    }
}

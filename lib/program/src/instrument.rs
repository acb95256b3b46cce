//! Coverage instrumentation.
//!
//! The instrumented rendering of a file reports every executed numbered
//! statement to a trace file, one id per line. The `uniq` mode caps each id
//! at one emission per run through a byte array sized `max_atom + 1`; the
//! `multithread` mode opens and flushes the trace file on every emission
//! instead of holding one handle per process.

use crate::{
    ast::{print::CWriter, FileAst, StatementId},
    store::SymbolTable,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstrumentOptions {
    pub uniq: bool,
    pub multithread: bool,
}

/// Render `file` with a trace call in front of every numbered statement.
pub fn instrumented_file(
    file: &FileAst,
    symbols: &SymbolTable,
    max_atom: u32,
    trace_path: &str,
    options: &InstrumentOptions,
) -> String {
    let mut out = String::new();
    out.push_str("#include <stdio.h>\n\n");
    if !options.multithread {
        out.push_str("static FILE *_mend_trace_fp;\n");
    }
    if options.uniq {
        out.push_str(&format!(
            "static unsigned char _mend_trace_seen[{}];\n",
            max_atom + 1
        ));
    }
    out.push_str("static void _mend_trace(int atom) {\n");
    if options.uniq {
        out.push_str("    if (_mend_trace_seen[atom]) {\n        return;\n    }\n");
        out.push_str("    _mend_trace_seen[atom] = 1;\n");
    }
    if options.multithread {
        out.push_str(&format!("    FILE *fp = fopen(\"{trace_path}\", \"a\");\n"));
        out.push_str("    if (fp == 0) {\n        return;\n    }\n");
        out.push_str("    fprintf(fp, \"%d\\n\", atom);\n");
        out.push_str("    fflush(fp);\n");
        out.push_str("    fclose(fp);\n");
    } else {
        out.push_str("    if (_mend_trace_fp == 0) {\n");
        out.push_str(&format!(
            "        _mend_trace_fp = fopen(\"{trace_path}\", \"a\");\n"
        ));
        out.push_str("    }\n");
        out.push_str("    if (_mend_trace_fp == 0) {\n        return;\n    }\n");
        out.push_str("    fprintf(_mend_trace_fp, \"%d\\n\", atom);\n");
        out.push_str("    fflush(_mend_trace_fp);\n");
    }
    out.push_str("}\n\n");

    let prelude = |id: StatementId| Some(format!("_mend_trace({});", id.as_u32()));
    let mut writer = CWriter::with_prelude(symbols, &prelude);
    writer.write_file(file);
    out.push_str(&writer.finish());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::AtomStore;

    const SOURCE: &str = r#"
        int f(int a) {
            a = a + 1;
            return a;
        }
    "#;

    fn store() -> AtomStore {
        AtomStore::from_sources(&[("f.c", SOURCE)]).unwrap()
    }

    #[test]
    fn every_numbered_statement_gets_a_trace_call() {
        let store = store();
        let file = store.file("f.c").unwrap();
        let rendered = instrumented_file(
            file,
            store.symbols(),
            store.max_atom(),
            "/tmp/trace.txt",
            &InstrumentOptions::default(),
        );
        for id in store.numbered_ids() {
            assert!(rendered.contains(&format!("_mend_trace({id});")));
        }
        assert!(rendered.contains("#include <stdio.h>"));
        assert!(!rendered.contains("_mend_trace_seen"));
    }

    #[test]
    fn uniq_mode_sizes_the_seen_array_after_the_highest_id() {
        let store = store();
        let file = store.file("f.c").unwrap();
        let rendered = instrumented_file(
            file,
            store.symbols(),
            store.max_atom(),
            "/tmp/trace.txt",
            &InstrumentOptions {
                uniq: true,
                multithread: false,
            },
        );
        assert!(rendered.contains(&format!(
            "unsigned char _mend_trace_seen[{}]",
            store.max_atom() + 1
        )));
    }

    #[test]
    fn multithread_mode_reopens_the_trace_file_per_emission() {
        let store = store();
        let file = store.file("f.c").unwrap();
        let rendered = instrumented_file(
            file,
            store.symbols(),
            store.max_atom(),
            "/tmp/trace.txt",
            &InstrumentOptions {
                uniq: false,
                multithread: true,
            },
        );
        assert!(rendered.contains("fclose(fp);"));
        assert!(!rendered.contains("_mend_trace_fp"));
    }
}

//! Wire format for edit histories.
//!
//! ```text
//! hist     := edit (' ' edit)*
//! edit     := 'd(' id ')' | 'a(' id ',' id ')' | 's(' id ',' id ')' | 'r(' id ',' id ')'
//! variants := hist ('.' hist)*
//! ```
//!
//! Edits travel newest-first, so a receiver replays a decoded history in
//! the reverse of message order. Records with an unrecognized leading
//! character are dropped with a warning and the rest of the message is
//! kept; the vestigial `x` crossover marker is handled the same way.
//! Subatom and template edits have no wire form and are skipped when
//! encoding.

use std::{fs, path::Path};

use program::ast::StatementId;

use crate::{edit::Edit, Error, Result};

/// Header line of on-disk history files; bumped whenever the record
/// grammar changes.
const HISTORY_FILE_VERSION: &str = "mend-history-v1";

/// Persist a history, newest edit first, under a version header.
pub fn write_history_file<P: AsRef<Path>>(path: P, history: &[Edit]) -> Result<()> {
    let contents = format!("{HISTORY_FILE_VERSION}\n{}\n", encode_history(history));
    fs::write(path.as_ref(), contents).map_err(program::Error::Io)?;
    Ok(())
}

/// Read a history back. A missing or unexpected version header is fatal;
/// unrecognized records within a known version are dropped as on the
/// wire.
pub fn read_history_file<P: AsRef<Path>>(path: P) -> Result<Vec<Edit>> {
    let contents = fs::read_to_string(path.as_ref()).map_err(program::Error::Io)?;
    let mut lines = contents.lines();
    match lines.next() {
        Some(HISTORY_FILE_VERSION) => {}
        Some(other) => {
            return Err(Error::Unique(format!(
                "History file version mismatch: expected `{HISTORY_FILE_VERSION}`, found `{other}`"
            )));
        }
        None => {
            return Err(Error::Unique("History file is empty".to_string()));
        }
    }
    let body = lines.collect::<Vec<_>>().join(" ");
    Ok(decode_history(&body))
}

/// Render a history for the wire, newest edit first.
pub fn encode_history(history: &[Edit]) -> String {
    history
        .iter()
        .rev()
        .filter_map(|edit| match edit {
            Edit::Delete(_) | Edit::Append(..) | Edit::Swap(..) | Edit::Replace(..) => {
                Some(edit.to_string())
            }
            other => {
                tracing::warn!("Edit `{other}` has no wire form, skipping it");
                None
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse a history from the wire back into application order.
pub fn decode_history(text: &str) -> Vec<Edit> {
    let mut edits = text
        .split_whitespace()
        .filter_map(decode_edit)
        .collect::<Vec<_>>();
    edits.reverse();
    edits
}

/// Render several histories joined by `.`.
pub fn encode_variants(histories: &[Vec<Edit>]) -> String {
    histories
        .iter()
        .map(|history| encode_history(history))
        .collect::<Vec<_>>()
        .join(".")
}

/// Parse a `.`-joined message back into one history per variant.
pub fn decode_variants(text: &str) -> Vec<Vec<Edit>> {
    text.split('.').map(decode_history).collect()
}

fn decode_edit(token: &str) -> Option<Edit> {
    let mut chars = token.chars();
    let kind = chars.next()?;
    let ids = decode_ids(chars.as_str());
    match (kind, ids.as_slice()) {
        ('d', [dest]) => Some(Edit::Delete(*dest)),
        ('a', [dest, src]) => Some(Edit::Append(*dest, *src)),
        ('s', [dest, src]) => Some(Edit::Swap(*dest, *src)),
        ('r', [dest, src]) => Some(Edit::Replace(*dest, *src)),
        ('x', _) => {
            tracing::warn!("Dropping crossover marker `{token}` from incoming history");
            None
        }
        _ => {
            tracing::warn!("Dropping unrecognized edit record `{token}`");
            None
        }
    }
}

fn decode_ids(text: &str) -> Vec<StatementId> {
    let inner = text.strip_prefix('(').and_then(|text| text.strip_suffix(')'));
    let Some(inner) = inner else {
        return Vec::new();
    };
    let mut ids = Vec::new();
    for part in inner.split(',') {
        match part.trim().parse::<u32>() {
            Ok(id) => ids.push(StatementId::new(id)),
            Err(_) => return Vec::new(),
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid(id: u32) -> StatementId {
        StatementId::new(id)
    }

    #[test]
    fn roundtrip_preserves_application_order() {
        let history = vec![
            Edit::Delete(sid(3)),
            Edit::Append(sid(1), sid(4)),
            Edit::Swap(sid(2), sid(5)),
            Edit::Replace(sid(6), sid(7)),
        ];
        let encoded = encode_history(&history);
        assert_eq!(encoded, "r(6,7) s(2,5) a(1,4) d(3)");
        assert_eq!(decode_history(&encoded), history);
    }

    #[test]
    fn crossover_marker_is_dropped_and_the_rest_kept() {
        let decoded = decode_history("a(1,4) x(0,0) d(3)");
        assert_eq!(decoded, vec![Edit::Delete(sid(3)), Edit::Append(sid(1), sid(4))]);
    }

    #[test]
    fn unknown_records_are_dropped_and_the_rest_kept() {
        let decoded = decode_history("q(9) d(3) nonsense");
        assert_eq!(decoded, vec![Edit::Delete(sid(3))]);
    }

    #[test]
    fn history_files_are_version_checked() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("mend-history-{}.txt", std::process::id()));
        let history = vec![Edit::Delete(sid(3)), Edit::Swap(sid(1), sid(2))];
        write_history_file(&path, &history).unwrap();
        assert_eq!(read_history_file(&path).unwrap(), history);

        std::fs::write(&path, "mend-history-v0\nd(3)\n").unwrap();
        assert!(read_history_file(&path).is_err());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn variants_are_dot_separated() {
        let histories = vec![
            vec![Edit::Delete(sid(1))],
            vec![Edit::Append(sid(2), sid(3)), Edit::Swap(sid(4), sid(5))],
        ];
        let message = encode_variants(&histories);
        assert_eq!(message, "d(1).s(4,5) a(2,3)");
        assert_eq!(decode_variants(&message), histories);
    }
}

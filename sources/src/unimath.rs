//! Reader for the caret-separated `unimathsymbols.txt` table.
//!
//! The format is line based. Lines starting with `#` are comments; the last
//! comment before the data names the columns:
//!
//! ```text
//! # no.^chr^LaTeX^unicode-math^cls^category^requirements^comments
//! 000B1^±^\pm^^v^mathbin^^PLUS-MINUS SIGN
//! ```
//!
//! Every data line becomes a math-mode [`RawMapping`] spelled by its `LaTeX`
//! column, or its `unicode-math` column when `LaTeX` is empty. Lines with
//! neither are skipped.

use std::io::{BufRead, BufReader};
use std::path::Path;

use texmap_core::{Mode, RawMapping, validate_charcode};
use tracing::debug;

use crate::error::{Result, SourceError};

const CODEPOINT_COLUMN: &str = "no.";
const LATEX_COLUMN: &str = "LaTeX";
const UNICODE_MATH_COLUMN: &str = "unicode-math";
const COMMENTS_COLUMN: &str = "comments";

struct Header {
    columns: Vec<String>,
    codepoint: Option<usize>,
}

impl Header {
    fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }
}

fn malformed(line: usize, reason: impl Into<String>) -> SourceError {
    SourceError::MalformedExternalLine {
        line,
        reason: reason.into(),
    }
}

/// Reads a table from any buffered reader.
///
/// # Errors
///
/// Returns [`SourceError::MalformedExternalLine`] for data before a header,
/// a header without a `no.` column, a line with more fields than the header,
/// or a code point that is not a valid hexadecimal scalar value.
pub fn read<R: BufRead>(reader: R) -> Result<Vec<RawMapping>> {
    let mut header: Option<Header> = None;
    let mut records = Vec::new();
    let mut skipped = 0usize;

    for (index, line) in reader.lines().enumerate() {
        let number = index + 1;
        let line = line?;
        let line = line.trim_end_matches(['\r', '\n']);

        if let Some(comment) = line.strip_prefix('#') {
            let columns: Vec<String> = comment.trim().split('^').map(str::to_string).collect();
            header = Some(Header {
                codepoint: columns.iter().position(|column| column == CODEPOINT_COLUMN),
                columns,
            });
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }

        let header = header
            .as_ref()
            .ok_or_else(|| malformed(number, "data line before the column header"))?;
        let codepoint_column = header
            .codepoint
            .ok_or_else(|| malformed(number, "column header has no `no.` column"))?;

        let fields: Vec<Option<&str>> = line
            .split('^')
            .map(|field| if field.is_empty() { None } else { Some(field) })
            .collect();
        if fields.len() > header.columns.len() {
            return Err(malformed(
                number,
                format!(
                    "{} fields for {} columns",
                    fields.len(),
                    header.columns.len()
                ),
            ));
        }
        let field = |name: &str| {
            header
                .column(name)
                .and_then(|position| fields.get(position).copied().flatten())
        };

        let codepoint = fields
            .get(codepoint_column)
            .copied()
            .flatten()
            .ok_or_else(|| malformed(number, "missing code point"))?;
        let charcode = u32::from_str_radix(codepoint.trim(), 16)
            .map_err(|_| malformed(number, format!("invalid code point {codepoint:?}")))?;
        validate_charcode(charcode).map_err(|err| malformed(number, err.to_string()))?;

        let Some(representation) = field(LATEX_COLUMN).or_else(|| field(UNICODE_MATH_COLUMN)) else {
            skipped += 1;
            continue;
        };

        let mut record = RawMapping::new(charcode, representation, Mode::Math);
        if let Some(comments) = field(COMMENTS_COLUMN) {
            record = record.with_description(comments);
        }
        records.push(record);
    }

    debug!(records = records.len(), skipped, "Read unimath table");
    Ok(records)
}

/// Reads a table from a string.
pub fn parse(input: &str) -> Result<Vec<RawMapping>> {
    read(input.as_bytes())
}

/// Reads a table from a file.
pub fn read_file(path: impl AsRef<Path>) -> Result<Vec<RawMapping>> {
    let file = std::fs::File::open(path)?;
    read(BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "# no.^chr^LaTeX^unicode-math^cls^category^requirements^comments\n";

    fn table(lines: &str) -> String {
        format!("# -*- coding: utf-8 -*-\n# Unicode math symbols\n{HEADER}{lines}")
    }

    #[test]
    fn test_reads_latex_column() {
        let records = parse(&table("000B1^±^\\pm^^v^mathbin^^PLUS-MINUS SIGN\n")).unwrap();
        assert_eq!(
            records,
            vec![RawMapping::new(0xB1, "\\pm", Mode::Math).with_description("PLUS-MINUS SIGN")]
        );
    }

    #[test]
    fn test_falls_back_to_unicode_math() {
        let records = parse(&table("021A4^↤^^\\mapsfrom^r^mathrel^^\n")).unwrap();
        assert_eq!(records[0].representation, "\\mapsfrom");
        assert_eq!(records[0].description, None);
    }

    #[test]
    fn test_skips_lines_without_representation() {
        let records = parse(&table("02A0B^⨋^^^L^mathop^^SUMMATION WITH INTEGRAL\n\n")).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_data_before_header_is_malformed() {
        let err = parse("000B1^±^\\pm\n").unwrap_err();
        assert!(matches!(err, SourceError::MalformedExternalLine { line: 1, .. }));
    }

    #[test]
    fn test_header_without_codepoint_column() {
        let err = parse("# chr^LaTeX\n±^\\pm\n").unwrap_err();
        assert!(matches!(err, SourceError::MalformedExternalLine { line: 2, .. }));
    }

    #[test]
    fn test_extra_fields_are_malformed() {
        let err = parse(&table("000B1^±^\\pm^^v^mathbin^^SIGN^extra\n")).unwrap_err();
        assert!(matches!(err, SourceError::MalformedExternalLine { line: 4, .. }));
    }

    #[test]
    fn test_bad_codepoints_are_malformed() {
        for line in ["zz^?^\\x\n", "110000^?^\\x\n", "0D800^?^\\x\n"] {
            let err = parse(&table(line)).unwrap_err();
            assert!(
                matches!(err, SourceError::MalformedExternalLine { line: 4, .. }),
                "{line:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unimathsymbols.txt");
        std::fs::write(&path, table("003B1^α^\\alpha^^A^mathalpha^^GREEK SMALL LETTER ALPHA\r\n")).unwrap();
        let records = read_file(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].charcode, 0x3B1);
        assert_eq!(records[0].description.as_deref(), Some("GREEK SMALL LETTER ALPHA"));
    }
}

//! Source snippets for parse failures
//!
//! Parse errors are the one failure kind where the message alone is rarely enough, so the
//! captured detail carries the offending line rendered with miette.

use miette::{Diagnostic, GraphicalReportHandler, GraphicalTheme, NamedSource, SourceSpan};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(testr::parse))]
struct ParseSnippet {
    message: String,
    #[source_code]
    src: NamedSource<String>,
    #[label("here")]
    at: SourceSpan,
}

/// Render `message` against `source` at a 1-based line/column, without colors.
///
/// Falls back to the bare message if rendering fails.
pub(super) fn render_parse_snippet(name: &str, source: &str, message: &str, line: usize, column: usize) -> String {
    let offset = byte_offset(source, line, column);
    let len = usize::from(offset < source.len());
    let snippet = ParseSnippet {
        message: message.to_string(),
        src: NamedSource::new(name, source.to_string()),
        at: (offset, len).into(),
    };

    let mut out = String::new();
    let handler = GraphicalReportHandler::new_themed(GraphicalTheme::unicode_nocolor());
    match handler.render_report(&mut out, &snippet) {
        Ok(()) => out,
        Err(_) => message.to_string(),
    }
}

fn byte_offset(source: &str, line: usize, column: usize) -> usize {
    let line_start: usize = source
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();
    let line_text = source[line_start..].lines().next().unwrap_or("");
    let in_line = line_text
        .char_indices()
        .nth(column.saturating_sub(1))
        .map(|(i, _)| i)
        .unwrap_or(line_text.len());
    (line_start + in_line).min(source.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_offset_first_line() {
        assert_eq!(byte_offset("let x = ;", 1, 9), 8);
    }

    #[test]
    fn test_byte_offset_later_line() {
        let source = "let a = 1;\nlet b = ;\n";
        assert_eq!(byte_offset(source, 2, 9), 19);
    }

    #[test]
    fn test_byte_offset_out_of_range_clamps() {
        let source = "x";
        assert_eq!(byte_offset(source, 5, 40), 1);
    }

    #[test]
    fn test_snippet_contains_source_line() {
        let rendered = render_parse_snippet("broken.rhai", "let a = 1;\nlet b = ;\n", "expecting an expression", 2, 9);
        assert!(rendered.contains("expecting an expression"));
        assert!(rendered.contains("let b = ;"));
        assert!(rendered.contains("broken.rhai"));
    }
}

//! Error reporting with source context.
//!
//! Uses ariadne to print lex and parse errors against the journal text.

use ariadne::{ColorGenerator, Config, IndexType, Label, Report, ReportKind, Source};
use std::io::{self, Write};

use crate::error::{LexError, ParseError};

fn config(color: bool) -> Config {
    Config::default()
        .with_color(color)
        .with_index_type(IndexType::Byte)
        .with_compact(false)
}

/// Report lex errors to the given writer. Returns the number reported.
pub fn report_lex_errors<W: Write>(
    errors: &[LexError],
    source_name: &str,
    source: &str,
    color: bool,
    writer: &mut W,
) -> io::Result<usize> {
    let mut colors = ColorGenerator::new();

    for error in errors {
        let range = error.offset..error.offset + error.len;
        Report::build(ReportKind::Error, (source_name, range.clone()))
            .with_config(config(color))
            .with_code("L0001")
            .with_message(&error.message)
            .with_label(
                Label::new((source_name, range))
                    .with_message("not recognised here")
                    .with_color(colors.next()),
            )
            .finish()
            .write((source_name, Source::from(source)), &mut *writer)?;
    }

    Ok(errors.len())
}

/// Report parse errors to the given writer. Returns the number reported.
pub fn report_parse_errors<W: Write>(
    errors: &[ParseError],
    source_name: &str,
    source: &str,
    color: bool,
    writer: &mut W,
) -> io::Result<usize> {
    let mut colors = ColorGenerator::new();

    for error in errors {
        let (start, end) = error.span();
        let mut report = Report::build(ReportKind::Error, (source_name, start..end))
            .with_config(config(color))
            .with_code(format!("P{:04}", error.kind_code()))
            .with_message(error.message())
            .with_label(
                Label::new((source_name, start..end))
                    .with_message(error.label())
                    .with_color(colors.next()),
            );
        if let Some(context) = &error.context {
            report = report.with_note(format!("while parsing {context}"));
        }
        if let Some(hint) = &error.hint {
            report = report.with_help(hint);
        }
        report
            .finish()
            .write((source_name, Source::from(source)), &mut *writer)?;
    }

    Ok(errors.len())
}

/// Report all lex errors, then all parse errors, without color.
pub fn render_diagnostics<W: Write>(
    lex_errors: &[LexError],
    parse_errors: &[ParseError],
    source_name: &str,
    source: &str,
    writer: &mut W,
) -> io::Result<usize> {
    let lexed = report_lex_errors(lex_errors, source_name, source, false, writer)?;
    let parsed = report_parse_errors(parse_errors, source_name, source, false, writer)?;
    Ok(lexed + parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseErrorKind;
    use crate::parse_to_cst;
    use crate::Span;

    fn render(source: &str) -> (usize, String) {
        let result = parse_to_cst(source);
        let mut out = Vec::new();
        let count = render_diagnostics(
            &result.lex_errors,
            &result.parse_errors,
            "main.journal",
            source,
            &mut out,
        )
        .unwrap();
        (count, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_render_lex_error() {
        let (count, output) = render("hello world\n2020/01/01 ok\n");
        assert_eq!(count, 1);
        assert!(output.contains("L0001"));
        assert!(output.contains("unrecognised line start 'hello world'"));
        assert!(output.contains("main.journal"));
    }

    #[test]
    fn test_render_parse_error_with_hint() {
        let source = "account (Assets:Virtual)\n";
        let error = ParseError::new(
            ParseErrorKind::VirtualAccountDeclaration("(Assets:Virtual)".to_string()),
            Span::new(8, 24),
        )
        .with_context("account directive")
        .with_hint("only real accounts can be declared");
        let mut out = Vec::new();
        let count = report_parse_errors(&[error], "main.journal", source, false, &mut out).unwrap();
        let output = String::from_utf8(out).unwrap();
        assert_eq!(count, 1);
        assert!(output.contains("P0004"));
        assert!(output.contains("cannot declare virtual account '(Assets:Virtual)'"));
        assert!(output.contains("only real accounts can be declared"));
    }

    #[test]
    fn test_render_clean_source() {
        let (count, output) = render("2020/01/01 ok\n  A  $1\n");
        assert_eq!(count, 0);
        assert!(output.is_empty());
    }
}

//! Ledger journal front end.
//!
//! Four stages turn ledger source text into the cooked model of
//! [`ledgerkit_core`]:
//!
//! 1. [`tokenize`]: a mode-stack tokenizer producing [`Token`]s and
//!    [`LexError`]s.
//! 2. [`parse_to_cst`]: a chumsky grammar over the token slice producing a
//!    [`cst::Journal`] and [`ParseError`]s.
//! 3. [`lower_to_raw`]: CST → [`raw::Journal`], which still holds surface text.
//! 4. [`lower_to_cooked`]: raw → [`ledgerkit_core::Journal`], resolving dates,
//!    aggregating tags and cross-checking commodity directives.
//!
//! Lex and parse errors are collected and returned next to partial trees.
//! Lowering errors are fatal and returned as [`LowerError`].
//!
//! # Example
//!
//! ```
//! use ledgerkit_parser::parse_to_cooked;
//!
//! let source = "2024/01/15 * Coffee Shop\n    Expenses:Coffee  $4.50\n    Assets:Cash\n";
//!
//! let result = parse_to_cooked(source).unwrap();
//! assert!(result.lex_errors.is_empty());
//! assert!(result.parse_errors.is_empty());
//! assert_eq!(result.journal.transactions.len(), 1);
//! assert_eq!(result.journal.transactions[0].postings.len(), 2);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod cst;
pub mod error;
pub mod grammar;
pub mod lexer;
pub mod lower;
pub mod raw;
pub mod report;
mod span;

pub use config::CookConfig;
pub use error::{LexError, LowerError, ParseError, ParseErrorKind};
pub use grammar::Grammar;
pub use lexer::{tokenize, LexResult, LexSession, Lexer, Token, TokenKind};
pub use report::render_diagnostics;
pub use span::{Span, Spanned};

use tracing::debug;

/// Result of [`parse_to_cst`].
#[derive(Debug, Clone)]
pub struct CstResult<'src> {
    /// The concrete syntax tree, partial when errors were reported.
    pub journal: cst::Journal<'src>,
    /// Every token the tokenizer produced.
    pub tokens: Vec<Token<'src>>,
    /// Unrecognised input.
    pub lex_errors: Vec<LexError>,
    /// Items the grammar could not build.
    pub parse_errors: Vec<ParseError>,
}

impl CstResult<'_> {
    /// No lex or parse errors were reported.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.lex_errors.is_empty() && self.parse_errors.is_empty()
    }
}

/// Result of [`parse_to_raw`].
#[derive(Debug, Clone)]
pub struct RawResult {
    /// The raw journal.
    pub journal: raw::Journal,
    /// Unrecognised input.
    pub lex_errors: Vec<LexError>,
    /// Items the grammar could not build.
    pub parse_errors: Vec<ParseError>,
}

/// Result of [`parse_to_cooked`].
#[derive(Debug, Clone)]
pub struct CookedResult {
    /// The cooked journal.
    pub journal: ledgerkit_core::Journal,
    /// Unrecognised input.
    pub lex_errors: Vec<LexError>,
    /// Items the grammar could not build.
    pub parse_errors: Vec<ParseError>,
}

/// Tokenize and parse source text into a CST.
pub fn parse_to_cst(source: &str) -> CstResult<'_> {
    let LexResult { tokens, errors } = tokenize(source);
    let (journal, parse_errors) = Grammar::new().parse(&tokens);
    debug!(
        items = journal.items.len(),
        lex_errors = errors.len(),
        parse_errors = parse_errors.len(),
        "built concrete syntax tree"
    );
    CstResult {
        journal,
        tokens,
        lex_errors: errors,
        parse_errors,
    }
}

/// Lower a CST to the raw model.
///
/// # Errors
///
/// Returns [`LowerError::MissingCommodity`] when a commodity or `D`
/// directive amount has no commodity.
pub fn lower_to_raw(journal: &cst::Journal<'_>) -> Result<raw::Journal, LowerError> {
    lower::cst_to_raw::lower_journal(journal)
}

/// Lower a raw journal to the cooked model, defaulting years to the current
/// one.
///
/// # Errors
///
/// See [`lower_to_cooked_with`].
pub fn lower_to_cooked(journal: &raw::Journal) -> Result<ledgerkit_core::Journal, LowerError> {
    lower_to_cooked_with(journal, &CookConfig::default())
}

/// Lower a raw journal to the cooked model with explicit settings.
///
/// # Errors
///
/// Fails on an invalid date, an unrepresentable number, or an inconsistent
/// commodity directive.
pub fn lower_to_cooked_with(
    journal: &raw::Journal,
    config: &CookConfig,
) -> Result<ledgerkit_core::Journal, LowerError> {
    lower::raw_to_cooked::lower_journal(journal, config)
}

/// Parse source text into the raw model.
///
/// # Errors
///
/// Lex and parse errors are returned in the result; only lowering errors
/// fail the call.
pub fn parse_to_raw(source: &str) -> Result<RawResult, LowerError> {
    let cst = parse_to_cst(source);
    let journal = lower_to_raw(&cst.journal)?;
    Ok(RawResult {
        journal,
        lex_errors: cst.lex_errors,
        parse_errors: cst.parse_errors,
    })
}

/// Parse source text into the cooked model, defaulting years to the current
/// one.
///
/// # Errors
///
/// See [`parse_to_cooked_with`].
pub fn parse_to_cooked(source: &str) -> Result<CookedResult, LowerError> {
    parse_to_cooked_with(source, &CookConfig::default())
}

/// Parse source text into the cooked model with explicit settings.
///
/// # Errors
///
/// Lex and parse errors are returned in the result; only lowering errors
/// fail the call.
pub fn parse_to_cooked_with(source: &str, config: &CookConfig) -> Result<CookedResult, LowerError> {
    let RawResult {
        journal,
        lex_errors,
        parse_errors,
    } = parse_to_raw(source)?;
    let journal = lower_to_cooked_with(&journal, config)?;
    Ok(CookedResult {
        journal,
        lex_errors,
        parse_errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_to_cst_collects_both_error_lists() {
        let result = parse_to_cst("hello world\naccount (Assets:Virtual)\n2020/01/01 ok\n");
        assert_eq!(result.lex_errors.len(), 1);
        assert_eq!(result.parse_errors.len(), 1);
        assert!(!result.is_clean());
        assert_eq!(result.journal.items.len(), 1);
    }

    #[test]
    fn test_parse_to_raw_fails_on_missing_commodity() {
        let err = parse_to_raw("D 1000.00\n").unwrap_err();
        assert_eq!(err, LowerError::MissingCommodity);
    }

    #[test]
    fn test_parse_to_cooked_with_default_year() {
        let config = CookConfig::new(2031);
        let result = parse_to_cooked_with("01/02 transaction\n", &config).unwrap();
        let date = result.journal.transactions[0].date;
        assert_eq!(date, chrono::NaiveDate::from_ymd_opt(2031, 1, 2).unwrap());
    }

    #[test]
    fn test_stages_compose() {
        let source = "P 2020/01/01 EUR $1.10\n";
        let cst = parse_to_cst(source);
        assert!(cst.is_clean());
        let raw = lower_to_raw(&cst.journal).unwrap();
        let cooked = lower_to_cooked(&raw).unwrap();
        assert_eq!(cooked.prices.len(), 1);
        assert_eq!(cooked.prices[0].commodity, "EUR");
    }
}

//! Error types for the three failure tiers of the pipeline.
//!
//! - [`LexError`]: collected, non-fatal; an unrecognised stretch of input.
//! - [`ParseError`]: collected, non-fatal; a required token or rule missing.
//! - [`LowerError`]: fatal; returned from the lowering passes and aborts
//!   the whole journal.

use crate::Span;
use std::fmt;
use thiserror::Error;

/// Input the tokenizer could not match in its current mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    /// Byte offset of the first unmatched character.
    pub offset: usize,
    /// Length in bytes of the skipped input.
    pub len: usize,
    /// 1-based line.
    pub line: usize,
    /// 1-based column (in characters).
    pub column: usize,
    /// Human readable description.
    pub message: String,
}

impl LexError {
    /// The skipped input as a span.
    #[must_use]
    pub const fn span(&self) -> Span {
        Span::new(self.offset, self.offset + self.len)
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}

impl std::error::Error for LexError {}

/// A parse error with location information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// The kind of error.
    pub kind: ParseErrorKind,
    /// The span where the error occurred.
    pub span: Span,
    /// Optional context message.
    pub context: Option<String>,
    /// Optional hint for fixing the error.
    pub hint: Option<String>,
}

impl ParseError {
    /// Create a new parse error.
    #[must_use]
    pub const fn new(kind: ParseErrorKind, span: Span) -> Self {
        Self {
            kind,
            span,
            context: None,
            hint: None,
        }
    }

    /// Add context to this error.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Add a hint for fixing this error.
    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Get the span of this error.
    #[must_use]
    pub const fn span(&self) -> (usize, usize) {
        (self.span.start, self.span.end)
    }

    /// Get a numeric code for the error kind.
    #[must_use]
    pub const fn kind_code(&self) -> u32 {
        match &self.kind {
            ParseErrorKind::UnexpectedToken(_) => 1,
            ParseErrorKind::UnexpectedEof => 2,
            ParseErrorKind::MissingNewline => 3,
            ParseErrorKind::VirtualAccountDeclaration(_) => 4,
            ParseErrorKind::FormatNotAllowed => 5,
        }
    }

    /// Get the error message.
    #[must_use]
    pub fn message(&self) -> String {
        format!("{}", self.kind)
    }

    /// Get a short label for the error.
    #[must_use]
    pub const fn label(&self) -> &str {
        match &self.kind {
            ParseErrorKind::UnexpectedToken(_) => "unexpected token",
            ParseErrorKind::UnexpectedEof => "unexpected end of file",
            ParseErrorKind::MissingNewline => "expected line break",
            ParseErrorKind::VirtualAccountDeclaration(_) => "virtual account declared",
            ParseErrorKind::FormatNotAllowed => "format not allowed here",
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(ctx) = &self.context {
            write!(f, " ({ctx})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

/// Kinds of parse errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A token the grammar cannot use at this position.
    UnexpectedToken(String),
    /// Input ended in the middle of a journal item.
    UnexpectedEof,
    /// A line that must end with a line break did not.
    MissingNewline,
    /// An `account` directive named a virtual or balanced virtual account.
    VirtualAccountDeclaration(String),
    /// A `format` line under a directive that does not take one.
    FormatNotAllowed,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedToken(found) => write!(f, "syntax error: unexpected {found}"),
            Self::UnexpectedEof => write!(f, "unexpected end of file"),
            Self::MissingNewline => write!(f, "syntax error: missing line break"),
            Self::VirtualAccountDeclaration(name) => {
                write!(f, "cannot declare virtual account '{name}'")
            }
            Self::FormatNotAllowed => write!(f, "format is only allowed under 'commodity'"),
        }
    }
}

/// Errors raised while lowering CST → raw → cooked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LowerError {
    /// A commodity amount was lowered without commodity text.
    #[error("Commodity text must have a value")]
    MissingCommodity,

    /// A date string has the wrong shape or is not a calendar date.
    #[error("invalid date '{date}': {reason}")]
    InvalidDate {
        /// The date text as written.
        date: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A number could not be represented as a decimal.
    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    /// A commodity directive has both an inline format and a `format` line.
    #[error("commodity '{commodity}' has both an inline format and a format subdirective")]
    ConflictingCommodityFormat {
        /// The declared commodity.
        commodity: String,
    },

    /// A `format` line names a different commodity than its directive.
    #[error("commodity directive '{declared}' does not match its format commodity '{format}'")]
    CommodityMismatch {
        /// Commodity on the directive line.
        declared: String,
        /// Commodity in the `format` line.
        format: String,
    },

    /// A commodity directive has more than one `format` line.
    #[error("commodity '{commodity}' has {count} format subdirectives, at most one is allowed")]
    MultipleCommodityFormats {
        /// The declared commodity.
        commodity: String,
        /// Number of format lines found.
        count: usize,
    },
}

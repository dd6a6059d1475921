//! Mode-aware tokenizer for ledger journals.
//!
//! Which tokens are legal depends on where we are in a line: a keyword is only
//! a keyword at column 0, a colon only starts a tag inside an inline comment,
//! an account name only follows indentation. The lexer therefore keeps an
//! explicit [`ModeStack`]. Each mode lists hand-written scanners that get the
//! emitted token history as context; modes that read amounts fall back to a
//! Logos-generated lexicon for the fixed atoms (numbers, commodities,
//! punctuation).
//!
//! ```text
//! "2020/01/01 * Shop ; note: x\n"
//!  Date Asterisk Text Semicolon TagName TagColon TagValue Newline
//! ```
//!
//! A line break always resets the stack to [`Mode::LineStart`].

use logos::Logos;
use std::fmt;
use tracing::{debug, trace};

use crate::error::LexError;
use crate::span::Span;

/// Token kinds produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// `\n` or `\r\n`
    Newline,
    /// `2020/01/31`, `2020-1-31`, `01/31`
    Date,
    /// `P` at column 0
    PriceKeyword,
    /// `account` at column 0
    AccountKeyword,
    /// `commodity` at column 0
    CommodityKeyword,
    /// `D` at column 0
    DefaultCommodityKeyword,
    /// `format` inside a commodity block
    FormatKeyword,
    /// Leading whitespace of a content line
    Indent,
    /// `;`, `#` or `*` at column 0
    LineCommentMarker,
    /// Rest of a full-line comment
    CommentText,
    /// `*`
    Asterisk,
    /// `!`
    Exclamation,
    /// `(123)` after a transaction date
    ChequeNumber,
    /// Description or memo text
    Text,
    /// `|` between payee and memo
    Pipe,
    /// `;` opening an inline comment
    Semicolon,
    /// Free text inside an inline comment
    InlineText,
    /// Tag name inside an inline comment
    TagName,
    /// `:` after a tag name
    TagColon,
    /// Tag value
    TagValue,
    /// `,` ending a tag value
    TagComma,
    /// `Assets:Cash`
    RealAccount,
    /// `(Assets:Cash)`
    VirtualAccount,
    /// `[Assets:Cash]`
    VirtualBalancedAccount,
    /// `-` before a commodity
    Dash,
    /// `1,000.00`, `-5`
    Number,
    /// `$`, `USD`, `"Apple Shares"`
    Commodity,
    /// `@`
    At,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `=`
    Equals,
}

impl TokenKind {
    /// Human readable name used in diagnostics.
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::Newline => "line break",
            Self::Date => "date",
            Self::PriceKeyword => "'P'",
            Self::AccountKeyword => "'account'",
            Self::CommodityKeyword => "'commodity'",
            Self::DefaultCommodityKeyword => "'D'",
            Self::FormatKeyword => "'format'",
            Self::Indent => "indentation",
            Self::LineCommentMarker => "comment marker",
            Self::CommentText => "comment text",
            Self::Asterisk => "'*'",
            Self::Exclamation => "'!'",
            Self::ChequeNumber => "cheque number",
            Self::Text => "description text",
            Self::Pipe => "'|'",
            Self::Semicolon => "';'",
            Self::InlineText => "comment text",
            Self::TagName => "tag name",
            Self::TagColon => "':'",
            Self::TagValue => "tag value",
            Self::TagComma => "','",
            Self::RealAccount => "account name",
            Self::VirtualAccount => "virtual account name",
            Self::VirtualBalancedAccount => "balanced virtual account name",
            Self::Dash => "'-'",
            Self::Number => "number",
            Self::Commodity => "commodity",
            Self::At => "'@'",
            Self::LParen => "'('",
            Self::RParen => "')'",
            Self::Equals => "'='",
        }
    }

    /// Returns true for the kinds that open a journal item at column 0.
    #[must_use]
    pub const fn starts_item(self) -> bool {
        matches!(
            self,
            Self::Date
                | Self::PriceKeyword
                | Self::AccountKeyword
                | Self::CommodityKeyword
                | Self::DefaultCommodityKeyword
                | Self::LineCommentMarker
        )
    }

    /// Returns true for the three account name kinds.
    #[must_use]
    pub const fn is_account(self) -> bool {
        matches!(
            self,
            Self::RealAccount | Self::VirtualAccount | Self::VirtualBalancedAccount
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// A value pre-parsed while matching a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload<'src> {
    /// Account name split on `:` (delimiters of virtual names removed).
    Segments(Vec<&'src str>),
    /// Commodity text without quotes, or a cheque number without parentheses.
    Text(&'src str),
}

/// A token with its source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'src> {
    /// Kind of token.
    pub kind: TokenKind,
    /// Matched source text; always `&source[offset..offset + len]`.
    pub image: &'src str,
    /// Start byte offset.
    pub offset: usize,
    /// Length in bytes.
    pub len: usize,
    /// 1-based line.
    pub line: usize,
    /// 1-based column (in characters).
    pub column: usize,
    /// Pre-parsed value, for accounts, commodities and cheque numbers.
    pub payload: Option<Payload<'src>>,
}

impl<'src> Token<'src> {
    /// Byte span of the token.
    #[must_use]
    pub const fn span(&self) -> Span {
        Span::new(self.offset, self.offset + self.len)
    }

    /// Byte offset just past the token.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.offset + self.len
    }

    /// Account segments, empty for tokens without a segment payload.
    #[must_use]
    pub fn segments(&self) -> &[&'src str] {
        match &self.payload {
            Some(Payload::Segments(segments)) => segments,
            _ => &[],
        }
    }

    /// Text payload if present, else the image.
    #[must_use]
    pub fn text(&self) -> &'src str {
        match self.payload {
            Some(Payload::Text(text)) => text,
            _ => self.image,
        }
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Newline => write!(f, "line break"),
            TokenKind::Indent => write!(f, "indentation"),
            kind => write!(f, "{} '{}'", kind.describe(), self.image),
        }
    }
}

/// A lexer context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Column 0: item keywords, dates, indentation, comment markers.
    LineStart,
    /// Rest of a transaction's first line.
    TxnHeader,
    /// Memo after the first `|` of a description.
    Memo,
    /// Inside `; ...` up to the end of the line.
    InlineComment,
    /// After `tag:` up to `,` or the end of the line.
    TagValue,
    /// Rest of a full-line comment.
    LineComment,
    /// After the indentation of a content line.
    Indented,
    /// Amounts, prices and assertions.
    AmountLine,
    /// After `P`.
    PriceDirective,
    /// After `account`.
    AccountDirective,
}

impl Mode {
    fn rules(self) -> &'static [Rule] {
        match self {
            Self::LineStart => &LINE_START_RULES,
            Self::TxnHeader => &TXN_HEADER_RULES,
            Self::Memo => &MEMO_RULES,
            Self::InlineComment => &INLINE_COMMENT_RULES,
            Self::TagValue => &TAG_VALUE_RULES,
            Self::LineComment => &LINE_COMMENT_RULES,
            Self::Indented => &INDENTED_RULES,
            Self::AmountLine => &AMOUNT_LINE_RULES,
            Self::PriceDirective => &PRICE_DIRECTIVE_RULES,
            Self::AccountDirective => &ACCOUNT_DIRECTIVE_RULES,
        }
    }

    const fn skips_whitespace(self) -> bool {
        !matches!(self, Self::LineStart | Self::LineComment)
    }

    const fn uses_lexicon(self) -> bool {
        matches!(self, Self::AmountLine | Self::PriceDirective)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LineStart => "line start",
            Self::TxnHeader => "transaction header",
            Self::Memo => "memo",
            Self::InlineComment => "inline comment",
            Self::TagValue => "tag value",
            Self::LineComment => "comment",
            Self::Indented => "content line",
            Self::AmountLine => "amount",
            Self::PriceDirective => "price directive",
            Self::AccountDirective => "account directive",
        };
        f.write_str(name)
    }
}

/// The lexer's only state: a stack of modes with [`Mode::LineStart`] at the bottom.
///
/// Operations consume the stack and return the new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeStack {
    frames: Vec<Mode>,
}

impl ModeStack {
    /// A stack holding only [`Mode::LineStart`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            frames: vec![Mode::LineStart],
        }
    }

    /// The active mode.
    #[must_use]
    pub fn top(&self) -> Mode {
        self.frames.last().copied().unwrap_or(Mode::LineStart)
    }

    /// Number of frames, including the outermost one.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Enter `mode`.
    #[must_use]
    pub fn push(mut self, mode: Mode) -> Self {
        self.frames.push(mode);
        self
    }

    /// Leave the active mode. The outermost frame is never removed.
    #[must_use]
    pub fn pop(mut self) -> Self {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
        self
    }

    /// Return to the outermost frame.
    #[must_use]
    pub fn reset(mut self) -> Self {
        self.frames.truncate(1);
        self
    }
}

impl Default for ModeStack {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Lexicon (fixed atoms)
// ============================================================================

/// Atoms of amounts, prices and assertions.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
enum Atom {
    #[token("-")]
    Dash,

    /// Optional sign, `,` group separators, optional `.` fraction.
    #[regex(r"-?([0-9][0-9,]*)?\.?[0-9]+")]
    Number,

    #[regex(r"[\p{L}\p{Sc}]+")]
    Commodity,

    #[regex(r#""[^";\r\n]+""#)]
    QuotedCommodity,

    #[token("@")]
    At,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("=")]
    Equals,

    #[token("*")]
    Asterisk,
}

fn lex_atom(rest: &str) -> Option<(TokenKind, Scan<'_>)> {
    let mut lexer = Atom::lexer(rest);
    let atom = lexer.next()?.ok()?;
    let span = lexer.span();
    if span.start != 0 {
        return None;
    }
    let image = &rest[..span.end];
    let (kind, payload) = match atom {
        Atom::Dash => (TokenKind::Dash, None),
        Atom::Number => (TokenKind::Number, None),
        Atom::Commodity => (TokenKind::Commodity, Some(Payload::Text(image))),
        Atom::QuotedCommodity => (
            TokenKind::Commodity,
            Some(Payload::Text(&image[1..image.len() - 1])),
        ),
        Atom::At => (TokenKind::At, None),
        Atom::LParen => (TokenKind::LParen, None),
        Atom::RParen => (TokenKind::RParen, None),
        Atom::Equals => (TokenKind::Equals, None),
        Atom::Asterisk => (TokenKind::Asterisk, None),
    };
    Some((
        kind,
        Scan {
            len: span.end,
            payload,
        },
    ))
}

// ============================================================================
// Scanners (context-sensitive kinds)
// ============================================================================

/// What a scanner sees: the source, the current offset and everything emitted so far.
struct Cursor<'a, 'src> {
    source: &'src str,
    offset: usize,
    history: &'a [Token<'src>],
}

impl<'src> Cursor<'_, 'src> {
    fn rest(&self) -> &'src str {
        &self.source[self.offset..]
    }

    fn at_line_start(&self) -> bool {
        self.offset == 0 || self.source[..self.offset].ends_with('\n')
    }

    fn prev(&self) -> Option<&Token<'src>> {
        self.history.last()
    }

    fn prev_is(&self, kinds: &[TokenKind]) -> bool {
        self.prev().is_some_and(|t| kinds.contains(&t.kind))
    }

    /// The previous token ends exactly where we are.
    fn touches_prev(&self) -> bool {
        self.prev().is_some_and(|t| t.end() == self.offset)
    }

    /// Kind of the token that opened the current journal item.
    fn item_opener(&self) -> Option<TokenKind> {
        self.history
            .iter()
            .rev()
            .map(|t| t.kind)
            .find(|kind| kind.starts_item())
    }

    /// A tag may start here: after whitespace, `,`, `:` or the comment's `;`.
    fn at_tag_boundary(&self, offset: usize) -> bool {
        self.source[..offset]
            .chars()
            .next_back()
            .map_or(true, |c| c.is_whitespace() || matches!(c, ',' | ':' | ';'))
    }
}

struct Scan<'src> {
    len: usize,
    payload: Option<Payload<'src>>,
}

impl Scan<'_> {
    const fn plain(len: usize) -> Self {
        Self { len, payload: None }
    }
}

type Scanner = for<'a, 'src> fn(&Cursor<'a, 'src>) -> Option<Scan<'src>>;

#[derive(Debug, Clone, Copy)]
enum Transition {
    Stay,
    Push(Mode),
    Pop,
}

struct Rule {
    kind: TokenKind,
    scan: Scanner,
    transition: Transition,
}

const DATE_SEPARATORS: [char; 3] = ['/', '-', '.'];

fn digit_run(s: &str) -> usize {
    s.bytes().take_while(u8::is_ascii_digit).count()
}

/// `yyyy<sep>m<sep>d` or `m<sep>d`, not followed by further date characters.
fn date_len(rest: &str) -> Option<usize> {
    let first = digit_run(rest);
    if first == 0 || first > 4 {
        return None;
    }
    let mut len = first;
    let mut parts = 1;
    while parts < 3 {
        let tail = &rest[len..];
        if !tail.starts_with(DATE_SEPARATORS) {
            break;
        }
        let run = digit_run(&tail[1..]);
        if run == 0 || run > 2 {
            return None;
        }
        len += 1 + run;
        parts += 1;
    }
    let shape_ok = match parts {
        3 => first == 4,
        2 => first <= 2,
        _ => false,
    };
    let tail = &rest[len..];
    let continues = tail.starts_with(|c: char| c.is_ascii_digit()) || tail.starts_with(DATE_SEPARATORS);
    (shape_ok && !continues).then_some(len)
}

fn keyword_len(rest: &str, word: &str) -> Option<usize> {
    let after = rest.strip_prefix(word)?;
    after.starts_with([' ', '\t']).then_some(word.len())
}

/// Length of `rest` up to the first `stop` character or line end, trailing whitespace excluded.
fn trimmed_run(rest: &str, stop: impl Fn(char) -> bool) -> usize {
    let end = rest
        .find(|c: char| c == '\n' || c == '\r' || stop(c))
        .unwrap_or(rest.len());
    rest[..end].trim_end().len()
}

/// An account name ends at a tab, two spaces, `;`, a space before `;`, or the end of the line.
fn at_name_terminator(rest: &str) -> bool {
    if rest.is_empty()
        || rest.starts_with(['\n', '\r', '\t', ';'])
        || rest.starts_with("  ")
        || rest.starts_with(" ;")
    {
        return true;
    }
    let after_spaces = rest.trim_start_matches(' ');
    after_spaces.is_empty() || after_spaces.starts_with(['\n', '\r'])
}

fn real_account_len(rest: &str) -> Option<usize> {
    let len = rest
        .char_indices()
        .find(|&(i, _)| at_name_terminator(&rest[i..]))
        .map_or(rest.len(), |(i, _)| i);
    (len > 0).then_some(len)
}

fn delimited_account_len(rest: &str, open: char, close: char) -> Option<usize> {
    let inner = rest.strip_prefix(open)?;
    let close_at = inner.find(|c: char| c == close || matches!(c, ';' | '\n' | '\r'))?;
    if close_at == 0 || !inner[close_at..].starts_with(close) {
        return None;
    }
    let len = open.len_utf8() + close_at + close.len_utf8();
    at_name_terminator(&rest[len..]).then_some(len)
}

fn segments(name: &str) -> Payload<'_> {
    Payload::Segments(name.split(':').collect())
}

fn tag_name_len(rest: &str) -> Option<usize> {
    let len = rest
        .find(|c: char| c.is_whitespace() || c == ':' || c == ',')
        .unwrap_or(rest.len());
    (len > 0 && rest[len..].starts_with(':')).then_some(len)
}

fn scan_semicolon<'src>(cur: &Cursor<'_, 'src>) -> Option<Scan<'src>> {
    cur.rest().starts_with(';').then(|| Scan::plain(1))
}

fn scan_line_date<'src>(cur: &Cursor<'_, 'src>) -> Option<Scan<'src>> {
    if !cur.at_line_start() {
        return None;
    }
    date_len(cur.rest()).map(Scan::plain)
}

fn scan_price_keyword<'src>(cur: &Cursor<'_, 'src>) -> Option<Scan<'src>> {
    cur.at_line_start()
        .then(|| keyword_len(cur.rest(), "P"))
        .flatten()
        .map(Scan::plain)
}

fn scan_account_keyword<'src>(cur: &Cursor<'_, 'src>) -> Option<Scan<'src>> {
    cur.at_line_start()
        .then(|| keyword_len(cur.rest(), "account"))
        .flatten()
        .map(Scan::plain)
}

fn scan_commodity_keyword<'src>(cur: &Cursor<'_, 'src>) -> Option<Scan<'src>> {
    cur.at_line_start()
        .then(|| keyword_len(cur.rest(), "commodity"))
        .flatten()
        .map(Scan::plain)
}

fn scan_default_commodity_keyword<'src>(cur: &Cursor<'_, 'src>) -> Option<Scan<'src>> {
    cur.at_line_start()
        .then(|| keyword_len(cur.rest(), "D"))
        .flatten()
        .map(Scan::plain)
}

fn scan_indent<'src>(cur: &Cursor<'_, 'src>) -> Option<Scan<'src>> {
    if !cur.at_line_start() {
        return None;
    }
    let rest = cur.rest();
    let len = rest.len() - rest.trim_start_matches([' ', '\t']).len();
    (len > 0).then(|| Scan::plain(len))
}

fn scan_line_comment_marker<'src>(cur: &Cursor<'_, 'src>) -> Option<Scan<'src>> {
    (cur.at_line_start() && cur.rest().starts_with([';', '#', '*'])).then(|| Scan::plain(1))
}

fn scan_comment_text<'src>(cur: &Cursor<'_, 'src>) -> Option<Scan<'src>> {
    let rest = cur.rest();
    let len = rest.find(['\n', '\r']).unwrap_or(rest.len());
    (len > 0).then(|| Scan::plain(len))
}

fn scan_secondary_date_equals<'src>(cur: &Cursor<'_, 'src>) -> Option<Scan<'src>> {
    let after_date = cur.prev_is(&[TokenKind::Date]) && cur.touches_prev();
    let first_date = cur.history.len() < 2 || cur.history[cur.history.len() - 2].kind != TokenKind::Equals;
    (after_date && first_date && cur.rest().starts_with('=')).then(|| Scan::plain(1))
}

fn scan_secondary_date<'src>(cur: &Cursor<'_, 'src>) -> Option<Scan<'src>> {
    if !(cur.prev_is(&[TokenKind::Equals]) && cur.touches_prev()) {
        return None;
    }
    date_len(cur.rest()).map(Scan::plain)
}

fn scan_header_cleared<'src>(cur: &Cursor<'_, 'src>) -> Option<Scan<'src>> {
    (cur.prev_is(&[TokenKind::Date]) && cur.rest().starts_with('*')).then(|| Scan::plain(1))
}

fn scan_header_pending<'src>(cur: &Cursor<'_, 'src>) -> Option<Scan<'src>> {
    (cur.prev_is(&[TokenKind::Date]) && cur.rest().starts_with('!')).then(|| Scan::plain(1))
}

fn scan_cheque_number<'src>(cur: &Cursor<'_, 'src>) -> Option<Scan<'src>> {
    if !cur.prev_is(&[TokenKind::Date, TokenKind::Asterisk, TokenKind::Exclamation]) {
        return None;
    }
    let inner = cur.rest().strip_prefix('(')?;
    let close = inner.find([')', '\n', '\r'])?;
    if !inner[close..].starts_with(')') {
        return None;
    }
    Some(Scan {
        len: close + 2,
        payload: Some(Payload::Text(&inner[..close])),
    })
}

fn scan_pipe<'src>(cur: &Cursor<'_, 'src>) -> Option<Scan<'src>> {
    (cur.prev_is(&[TokenKind::Text]) && cur.rest().starts_with('|')).then(|| Scan::plain(1))
}

fn scan_description<'src>(cur: &Cursor<'_, 'src>) -> Option<Scan<'src>> {
    let len = trimmed_run(cur.rest(), |c| c == ';' || c == '|');
    (len > 0).then(|| Scan::plain(len))
}

fn scan_memo<'src>(cur: &Cursor<'_, 'src>) -> Option<Scan<'src>> {
    let len = trimmed_run(cur.rest(), |c| c == ';');
    (len > 0).then(|| Scan::plain(len))
}

fn scan_tag_name<'src>(cur: &Cursor<'_, 'src>) -> Option<Scan<'src>> {
    if !cur.at_tag_boundary(cur.offset) {
        return None;
    }
    tag_name_len(cur.rest()).map(Scan::plain)
}

fn scan_tag_colon<'src>(cur: &Cursor<'_, 'src>) -> Option<Scan<'src>> {
    let after_name = cur.prev_is(&[TokenKind::TagName]) && cur.touches_prev();
    (after_name && cur.rest().starts_with(':')).then(|| Scan::plain(1))
}

/// Free comment text, up to the next position where a tag could begin.
fn scan_inline_text<'src>(cur: &Cursor<'_, 'src>) -> Option<Scan<'src>> {
    let rest = cur.rest();
    let end = rest
        .char_indices()
        .find(|&(i, c)| {
            c == '\n'
                || c == '\r'
                || (i > 0
                    && cur.at_tag_boundary(cur.offset + i)
                    && tag_name_len(&rest[i..]).is_some())
        })
        .map_or(rest.len(), |(i, _)| i);
    let len = rest[..end].trim_end().len();
    (len > 0).then(|| Scan::plain(len))
}

fn scan_tag_value<'src>(cur: &Cursor<'_, 'src>) -> Option<Scan<'src>> {
    let len = trimmed_run(cur.rest(), |c| c == ',');
    (len > 0).then(|| Scan::plain(len))
}

fn scan_tag_comma<'src>(cur: &Cursor<'_, 'src>) -> Option<Scan<'src>> {
    cur.rest().starts_with(',').then(|| Scan::plain(1))
}

fn scan_format_keyword<'src>(cur: &Cursor<'_, 'src>) -> Option<Scan<'src>> {
    // Only walk the history back to the item opener once the word matches.
    let len = keyword_len(cur.rest(), "format")?;
    matches!(
        cur.item_opener(),
        Some(TokenKind::CommodityKeyword | TokenKind::DefaultCommodityKeyword)
    )
    .then_some(Scan::plain(len))
}

fn scan_posting_status(cur: &Cursor<'_, '_>, marker: char) -> Option<usize> {
    let rest = cur.rest();
    let marked = cur.prev_is(&[TokenKind::Indent])
        && rest.starts_with(marker)
        && rest[1..].starts_with([' ', '\t']);
    marked.then_some(1)
}

fn scan_posting_cleared<'src>(cur: &Cursor<'_, 'src>) -> Option<Scan<'src>> {
    scan_posting_status(cur, '*').map(Scan::plain)
}

fn scan_posting_pending<'src>(cur: &Cursor<'_, 'src>) -> Option<Scan<'src>> {
    scan_posting_status(cur, '!').map(Scan::plain)
}

fn scan_real_account<'src>(cur: &Cursor<'_, 'src>) -> Option<Scan<'src>> {
    let rest = cur.rest();
    let len = real_account_len(rest)?;
    Some(Scan {
        len,
        payload: Some(segments(&rest[..len])),
    })
}

fn scan_delimited_account<'src>(
    cur: &Cursor<'_, 'src>,
    open: char,
    close: char,
) -> Option<Scan<'src>> {
    let rest = cur.rest();
    let len = delimited_account_len(rest, open, close)?;
    let inner = &rest[open.len_utf8()..len - close.len_utf8()];
    Some(Scan {
        len,
        payload: Some(segments(inner)),
    })
}

fn scan_virtual_account<'src>(cur: &Cursor<'_, 'src>) -> Option<Scan<'src>> {
    scan_delimited_account(cur, '(', ')')
}

fn scan_virtual_balanced_account<'src>(cur: &Cursor<'_, 'src>) -> Option<Scan<'src>> {
    scan_delimited_account(cur, '[', ']')
}

fn scan_price_date<'src>(cur: &Cursor<'_, 'src>) -> Option<Scan<'src>> {
    if !cur.prev_is(&[TokenKind::PriceKeyword]) {
        return None;
    }
    date_len(cur.rest()).map(Scan::plain)
}

// ============================================================================
// Mode table
// ============================================================================

const OPEN_INLINE_COMMENT: Rule = Rule {
    kind: TokenKind::Semicolon,
    scan: scan_semicolon,
    transition: Transition::Push(Mode::InlineComment),
};

static LINE_START_RULES: [Rule; 7] = [
    Rule {
        kind: TokenKind::Date,
        scan: scan_line_date,
        transition: Transition::Push(Mode::TxnHeader),
    },
    Rule {
        kind: TokenKind::PriceKeyword,
        scan: scan_price_keyword,
        transition: Transition::Push(Mode::PriceDirective),
    },
    Rule {
        kind: TokenKind::AccountKeyword,
        scan: scan_account_keyword,
        transition: Transition::Push(Mode::AccountDirective),
    },
    Rule {
        kind: TokenKind::CommodityKeyword,
        scan: scan_commodity_keyword,
        transition: Transition::Push(Mode::AmountLine),
    },
    Rule {
        kind: TokenKind::DefaultCommodityKeyword,
        scan: scan_default_commodity_keyword,
        transition: Transition::Push(Mode::AmountLine),
    },
    Rule {
        kind: TokenKind::Indent,
        scan: scan_indent,
        transition: Transition::Push(Mode::Indented),
    },
    Rule {
        kind: TokenKind::LineCommentMarker,
        scan: scan_line_comment_marker,
        transition: Transition::Push(Mode::LineComment),
    },
];

static TXN_HEADER_RULES: [Rule; 8] = [
    Rule {
        kind: TokenKind::Equals,
        scan: scan_secondary_date_equals,
        transition: Transition::Stay,
    },
    Rule {
        kind: TokenKind::Date,
        scan: scan_secondary_date,
        transition: Transition::Stay,
    },
    Rule {
        kind: TokenKind::Asterisk,
        scan: scan_header_cleared,
        transition: Transition::Stay,
    },
    Rule {
        kind: TokenKind::Exclamation,
        scan: scan_header_pending,
        transition: Transition::Stay,
    },
    Rule {
        kind: TokenKind::ChequeNumber,
        scan: scan_cheque_number,
        transition: Transition::Stay,
    },
    OPEN_INLINE_COMMENT,
    Rule {
        kind: TokenKind::Pipe,
        scan: scan_pipe,
        transition: Transition::Push(Mode::Memo),
    },
    Rule {
        kind: TokenKind::Text,
        scan: scan_description,
        transition: Transition::Stay,
    },
];

static MEMO_RULES: [Rule; 2] = [
    OPEN_INLINE_COMMENT,
    Rule {
        kind: TokenKind::Text,
        scan: scan_memo,
        transition: Transition::Stay,
    },
];

static INLINE_COMMENT_RULES: [Rule; 3] = [
    Rule {
        kind: TokenKind::TagName,
        scan: scan_tag_name,
        transition: Transition::Stay,
    },
    Rule {
        kind: TokenKind::TagColon,
        scan: scan_tag_colon,
        transition: Transition::Push(Mode::TagValue),
    },
    Rule {
        kind: TokenKind::InlineText,
        scan: scan_inline_text,
        transition: Transition::Stay,
    },
];

static TAG_VALUE_RULES: [Rule; 2] = [
    Rule {
        kind: TokenKind::TagComma,
        scan: scan_tag_comma,
        transition: Transition::Pop,
    },
    Rule {
        kind: TokenKind::TagValue,
        scan: scan_tag_value,
        transition: Transition::Stay,
    },
];

static LINE_COMMENT_RULES: [Rule; 1] = [Rule {
    kind: TokenKind::CommentText,
    scan: scan_comment_text,
    transition: Transition::Stay,
}];

static INDENTED_RULES: [Rule; 7] = [
    OPEN_INLINE_COMMENT,
    Rule {
        kind: TokenKind::FormatKeyword,
        scan: scan_format_keyword,
        transition: Transition::Push(Mode::AmountLine),
    },
    Rule {
        kind: TokenKind::Asterisk,
        scan: scan_posting_cleared,
        transition: Transition::Stay,
    },
    Rule {
        kind: TokenKind::Exclamation,
        scan: scan_posting_pending,
        transition: Transition::Stay,
    },
    Rule {
        kind: TokenKind::VirtualAccount,
        scan: scan_virtual_account,
        transition: Transition::Push(Mode::AmountLine),
    },
    Rule {
        kind: TokenKind::VirtualBalancedAccount,
        scan: scan_virtual_balanced_account,
        transition: Transition::Push(Mode::AmountLine),
    },
    Rule {
        kind: TokenKind::RealAccount,
        scan: scan_real_account,
        transition: Transition::Push(Mode::AmountLine),
    },
];

static AMOUNT_LINE_RULES: [Rule; 1] = [OPEN_INLINE_COMMENT];

static PRICE_DIRECTIVE_RULES: [Rule; 2] = [
    Rule {
        kind: TokenKind::Date,
        scan: scan_price_date,
        transition: Transition::Stay,
    },
    OPEN_INLINE_COMMENT,
];

static ACCOUNT_DIRECTIVE_RULES: [Rule; 4] = [
    OPEN_INLINE_COMMENT,
    Rule {
        kind: TokenKind::VirtualAccount,
        scan: scan_virtual_account,
        transition: Transition::Stay,
    },
    Rule {
        kind: TokenKind::VirtualBalancedAccount,
        scan: scan_virtual_balanced_account,
        transition: Transition::Stay,
    },
    Rule {
        kind: TokenKind::RealAccount,
        scan: scan_real_account,
        transition: Transition::Stay,
    },
];

// ============================================================================
// Driver
// ============================================================================

/// Tokens and lexing errors for one source text.
#[derive(Debug, Clone, Default)]
pub struct LexResult<'src> {
    /// Tokens in source order.
    pub tokens: Vec<Token<'src>>,
    /// Unrecognised input.
    pub errors: Vec<LexError>,
}

/// Reusable tokenizer handle.
///
/// The mode table is static; every call to [`Lexer::tokenize`] runs a fresh
/// [`LexSession`], so one `Lexer` can be shared freely.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lexer;

impl Lexer {
    /// Create a lexer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Tokenize `source`.
    pub fn tokenize<'src>(&self, source: &'src str) -> LexResult<'src> {
        LexSession::new(source).run()
    }
}

/// Per-call tokenizer state.
#[derive(Debug)]
pub struct LexSession<'src> {
    source: &'src str,
    offset: usize,
    line: usize,
    line_start: usize,
    modes: ModeStack,
    tokens: Vec<Token<'src>>,
    errors: Vec<LexError>,
}

impl<'src> LexSession<'src> {
    /// Start a session at the beginning of `source`.
    #[must_use]
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            offset: 0,
            line: 1,
            line_start: 0,
            modes: ModeStack::new(),
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Consume the whole source.
    pub fn run(mut self) -> LexResult<'src> {
        while self.offset < self.source.len() {
            self.step();
        }
        debug!(
            tokens = self.tokens.len(),
            errors = self.errors.len(),
            "tokenized journal"
        );
        LexResult {
            tokens: self.tokens,
            errors: self.errors,
        }
    }

    fn rest(&self) -> &'src str {
        &self.source[self.offset..]
    }

    fn step(&mut self) {
        let mode = self.modes.top();
        let rest = self.rest();

        let skippable = if mode == Mode::LineStart {
            blank_line_len(rest)
        } else if mode.skips_whitespace() {
            leading_whitespace(rest)
        } else {
            0
        };
        if skippable > 0 {
            self.offset += skippable;
            return;
        }

        if let Some(len) = newline_len(rest) {
            self.emit(TokenKind::Newline, Scan::plain(len));
            self.modes = std::mem::take(&mut self.modes).reset();
            self.start_line();
            return;
        }

        match self.match_rule(mode) {
            Some((kind, scan, transition)) => {
                self.emit(kind, scan);
                self.apply(transition, kind);
            }
            None => self.recover(mode),
        }
    }

    fn match_rule(&self, mode: Mode) -> Option<(TokenKind, Scan<'src>, Transition)> {
        let cursor = Cursor {
            source: self.source,
            offset: self.offset,
            history: &self.tokens,
        };
        for rule in mode.rules() {
            if let Some(scan) = (rule.scan)(&cursor) {
                if scan.len > 0 {
                    return Some((rule.kind, scan, rule.transition));
                }
            }
        }
        if mode.uses_lexicon() {
            return lex_atom(cursor.rest()).map(|(kind, scan)| (kind, scan, Transition::Stay));
        }
        None
    }

    fn emit(&mut self, kind: TokenKind, scan: Scan<'src>) {
        let image = &self.source[self.offset..self.offset + scan.len];
        self.tokens.push(Token {
            kind,
            image,
            offset: self.offset,
            len: scan.len,
            line: self.line,
            column: self.column(),
            payload: scan.payload,
        });
        self.offset += scan.len;
    }

    fn apply(&mut self, transition: Transition, kind: TokenKind) {
        let modes = std::mem::take(&mut self.modes);
        self.modes = match transition {
            Transition::Stay => modes,
            Transition::Push(mode) => {
                trace!(?kind, %mode, "enter mode");
                modes.push(mode)
            }
            Transition::Pop => {
                trace!(?kind, "leave mode");
                modes.pop()
            }
        };
    }

    fn column(&self) -> usize {
        self.source[self.line_start..self.offset].chars().count() + 1
    }

    fn start_line(&mut self) {
        self.line += 1;
        self.line_start = self.offset;
    }

    /// Skip input nothing in `mode` accepts.
    ///
    /// At column 0 the whole line is dropped with one error. Elsewhere one
    /// character is skipped and merged into the previous error when adjacent.
    fn recover(&mut self, mode: Mode) {
        let rest = self.rest();
        if mode == Mode::LineStart {
            let content = rest.find(['\n', '\r']).unwrap_or(rest.len());
            let skipped = newline_len(&rest[content..]).map_or(content, |nl| content + nl);
            let len = content.max(1).min(rest.len());
            self.push_error(
                len,
                format!("unrecognised line start '{}'", &rest[..len]),
            );
            self.offset += skipped.max(len);
            if skipped > content {
                self.start_line();
            }
            return;
        }

        let char_len = rest.chars().next().map_or(1, char::len_utf8);
        let offset = self.offset;
        let line = self.line;
        match self.errors.last_mut() {
            Some(last) if last.offset + last.len == offset && last.line == line => {
                last.len += char_len;
            }
            _ => self.push_error(char_len, format!("unexpected input in {mode}")),
        }
        self.offset += char_len;
    }

    fn push_error(&mut self, len: usize, message: String) {
        trace!(offset = self.offset, len, %message, "lex error");
        self.errors.push(LexError {
            offset: self.offset,
            len,
            line: self.line,
            column: self.column(),
            message,
        });
    }
}

fn newline_len(rest: &str) -> Option<usize> {
    if rest.starts_with("\r\n") {
        Some(2)
    } else if rest.starts_with('\n') {
        Some(1)
    } else {
        None
    }
}

fn leading_whitespace(rest: &str) -> usize {
    rest.len() - rest.trim_start_matches([' ', '\t']).len()
}

/// Whitespace of a line holding nothing else.
fn blank_line_len(rest: &str) -> usize {
    let len = leading_whitespace(rest);
    let after = &rest[len..];
    if len > 0 && (after.is_empty() || newline_len(after).is_some()) {
        len
    } else {
        0
    }
}

/// Tokenize ledger source text.
pub fn tokenize(source: &str) -> LexResult<'_> {
    Lexer::new().tokenize(source)
}

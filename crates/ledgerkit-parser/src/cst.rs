//! Concrete syntax tree.
//!
//! One type per grammar rule. Nodes keep every token they were built from
//! (including line breaks and punctuation), so the tree can be mapped back to
//! the exact source text.

use crate::lexer::Token;
use crate::span::{Span, Spanned};

/// `journal = journalItem*`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Journal<'src> {
    /// Items in source order, each with the byte span it covers.
    pub items: Vec<Spanned<JournalItem<'src>>>,
}

/// One top-level entry of a journal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalItem<'src> {
    /// A dated transaction with its content lines.
    Transaction(Transaction<'src>),
    /// A full-line comment.
    LineComment(LineComment<'src>),
    /// `P date commodity amount`
    PriceDirective(PriceDirective<'src>),
    /// `account name`
    AccountDirective(AccountDirective<'src>),
    /// `commodity ...`
    CommodityDirective(CommodityDirective<'src>),
    /// `D amount`
    DefaultCommodityDirective(DefaultCommodityDirective<'src>),
}

/// `transaction = transactionInitLine transactionContentLine*`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction<'src> {
    /// First line.
    pub init_line: TransactionInitLine<'src>,
    /// Indented postings and comments.
    pub content_lines: Vec<TransactionContentLine<'src>>,
}

/// `transactionDate statusIndicator? chequeNumber? description? inlineComment? NEWLINE`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionInitLine<'src> {
    /// Date and optional posting date.
    pub date: TransactionDate<'src>,
    /// `*` or `!`.
    pub status: Option<Token<'src>>,
    /// `(code)`.
    pub cheque_number: Option<Token<'src>>,
    /// Description or payee/memo.
    pub description: Option<Description<'src>>,
    /// Trailing `; ...`.
    pub inline_comment: Option<InlineComment<'src>>,
    /// Line break.
    pub newline: Token<'src>,
}

/// `DATE (EQUALS DATE)?`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionDate<'src> {
    /// The transaction date.
    pub date: Token<'src>,
    /// `=date` following it without whitespace.
    pub posting_date: Option<PostingDate<'src>>,
}

/// The `=date` part of a transaction date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostingDate<'src> {
    /// `=`
    pub equals: Token<'src>,
    /// Date.
    pub date: Token<'src>,
}

/// `TEXT (PIPE TEXT?)?`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Description<'src> {
    /// Description, or payee when a memo follows.
    pub text: Token<'src>,
    /// `| memo`
    pub memo: Option<Memo<'src>>,
}

/// The memo half of a description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memo<'src> {
    /// `|`
    pub pipe: Token<'src>,
    /// Memo text; may itself contain `|`.
    pub text: Option<Token<'src>>,
}

/// `INDENT (posting | inlineComment) NEWLINE`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionContentLine<'src> {
    /// Leading whitespace.
    pub indent: Token<'src>,
    /// Line content.
    pub body: ContentLineBody<'src>,
    /// Line break.
    pub newline: Token<'src>,
}

/// What a transaction content line holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentLineBody<'src> {
    /// A posting.
    Posting(Posting<'src>),
    /// A standalone comment.
    Comment(InlineComment<'src>),
}

/// `statusIndicator? account amount? lotPrice? assertion? inlineComment?`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting<'src> {
    /// `*` or `!`.
    pub status: Option<Token<'src>>,
    /// Real, virtual or balanced virtual account token.
    pub account: Token<'src>,
    /// Posted amount.
    pub amount: Option<Amount<'src>>,
    /// `@ price`, `(@@) price` and friends.
    pub lot_price: Option<LotPrice<'src>>,
    /// `= balance`, `==* balance` and friends.
    pub assertion: Option<Assertion<'src>>,
    /// Trailing `; ...`.
    pub inline_comment: Option<InlineComment<'src>>,
}

/// `(DASH? commodity number) | (number commodity?)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Amount<'src> {
    /// `-` written before the commodity.
    pub dash: Option<Token<'src>>,
    /// Commodity, before or after the number.
    pub commodity: Option<Token<'src>>,
    /// Number, possibly with its own sign.
    pub number: Token<'src>,
}

impl Amount<'_> {
    /// Span from the first to the last token of the amount.
    #[must_use]
    pub fn span(&self) -> Span {
        let mut span = self.number.span();
        for token in self.dash.iter().chain(&self.commodity) {
            span = span.merge(&token.span());
        }
        span
    }
}

/// `('(' AT AT? ')' | AT AT?) amount`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LotPrice<'src> {
    /// `(` of a virtual price.
    pub lparen: Option<Token<'src>>,
    /// One `@` for a unit price, two for a total price.
    pub ats: Vec<Token<'src>>,
    /// `)` of a virtual price.
    pub rparen: Option<Token<'src>>,
    /// The price.
    pub amount: Amount<'src>,
}

/// `EQUALS EQUALS? ASTERISK? amount`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assertion<'src> {
    /// One `=` for a normal assertion, two for a strong one.
    pub equals: Vec<Token<'src>>,
    /// `*` including subaccounts.
    pub asterisk: Option<Token<'src>>,
    /// The asserted balance.
    pub amount: Amount<'src>,
}

/// `SEMICOLON (INLINE_TEXT | tag)*`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineComment<'src> {
    /// `;`
    pub semicolon: Token<'src>,
    /// Free text and tags in written order.
    pub items: Vec<CommentItem<'src>>,
}

/// Element of an inline comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentItem<'src> {
    /// Free text.
    Text(Token<'src>),
    /// `name:value,`
    Tag(Tag<'src>),
}

/// `TAG_NAME TAG_COLON TAG_VALUE? TAG_COMMA?`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag<'src> {
    /// Name.
    pub name: Token<'src>,
    /// `:`
    pub colon: Token<'src>,
    /// Value.
    pub value: Option<Token<'src>>,
    /// `,`
    pub comma: Option<Token<'src>>,
}

/// `LINE_COMMENT_MARKER COMMENT_TEXT? NEWLINE`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineComment<'src> {
    /// `;`, `#` or `*`.
    pub marker: Token<'src>,
    /// Rest of the line.
    pub text: Option<Token<'src>>,
    /// Line break.
    pub newline: Token<'src>,
}

/// `'P' DATE COMMODITY amount inlineComment? NEWLINE`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceDirective<'src> {
    /// `P`
    pub keyword: Token<'src>,
    /// Date.
    pub date: Token<'src>,
    /// Priced commodity.
    pub commodity: Token<'src>,
    /// Price.
    pub amount: Amount<'src>,
    /// Trailing `; ...`.
    pub inline_comment: Option<InlineComment<'src>>,
    /// Line break.
    pub newline: Token<'src>,
}

/// `'account' REAL_ACCOUNT inlineComment? NEWLINE commentLine*`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountDirective<'src> {
    /// `account`
    pub keyword: Token<'src>,
    /// Declared account; always a real account.
    pub account: Token<'src>,
    /// Trailing `; ...`.
    pub inline_comment: Option<InlineComment<'src>>,
    /// Line break.
    pub newline: Token<'src>,
    /// Indented comment lines.
    pub content_lines: Vec<CommentLine<'src>>,
}

/// `INDENT inlineComment NEWLINE`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentLine<'src> {
    /// Leading whitespace.
    pub indent: Token<'src>,
    /// The comment.
    pub comment: InlineComment<'src>,
    /// Line break.
    pub newline: Token<'src>,
}

/// `'commodity' (amount | COMMODITY) inlineComment? NEWLINE? commodityContentLine*`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommodityDirective<'src> {
    /// `commodity`
    pub keyword: Token<'src>,
    /// Declared commodity, with or without an example amount.
    pub declaration: CommodityDeclaration<'src>,
    /// Trailing `; ...`.
    pub inline_comment: Option<InlineComment<'src>>,
    /// Line break; absent at end of input.
    pub newline: Option<Token<'src>>,
    /// Indented format and comment lines.
    pub content_lines: Vec<CommodityContentLine<'src>>,
}

/// What follows the `commodity` keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommodityDeclaration<'src> {
    /// `commodity $1,000.00`
    Amount(Amount<'src>),
    /// `commodity CAD`
    Text(Token<'src>),
}

/// `INDENT (formatLine | inlineComment) NEWLINE`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommodityContentLine<'src> {
    /// Leading whitespace.
    pub indent: Token<'src>,
    /// Line content.
    pub body: CommodityLineBody<'src>,
    /// Line break.
    pub newline: Token<'src>,
}

/// A commodity sub-directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommodityLineBody<'src> {
    /// `format amount`
    Format(FormatLine<'src>),
    /// `; ...`
    Comment(InlineComment<'src>),
}

/// `'format' amount`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatLine<'src> {
    /// `format`
    pub keyword: Token<'src>,
    /// Example amount.
    pub amount: Amount<'src>,
}

/// `'D' amount inlineComment? NEWLINE commentLine*`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultCommodityDirective<'src> {
    /// `D`
    pub keyword: Token<'src>,
    /// Example amount of the default commodity.
    pub amount: Amount<'src>,
    /// Trailing `; ...`.
    pub inline_comment: Option<InlineComment<'src>>,
    /// Line break.
    pub newline: Token<'src>,
    /// Indented comment lines.
    pub content_lines: Vec<CommentLine<'src>>,
}

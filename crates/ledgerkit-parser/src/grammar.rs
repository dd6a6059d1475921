//! Token grammar producing the concrete syntax tree.
//!
//! # Architecture
//!
//! ```text
//! Source (&str) → lexer::tokenize() → Vec<Token> → Chumsky grammar → cst::Journal
//! ```
//!
//! The tokenizer has already resolved every context-sensitive decision, so
//! each journal item is selected by its first token alone. Items that fail to
//! parse are skipped (together with their indented continuation lines) and
//! reported; parsing resumes at the next item.

use chumsky::error::RichReason;
use chumsky::prelude::*;
use tracing::debug;

use crate::cst;
use crate::error::{ParseError, ParseErrorKind};
use crate::lexer::{Token, TokenKind};
use crate::span::{Span, Spanned};

/// Parser extra with our token type.
type TokExtra<'tok, 'src> = extra::Err<Rich<'tok, Token<'src>>>;

const VIRTUAL_DECLARATION: &str = "only real accounts can be declared";
const FORMAT_NOT_ALLOWED: &str = "format is only allowed under 'commodity'";

/// Reusable grammar handle.
///
/// Holds no per-call state; every [`Grammar::parse`] call is an independent
/// chumsky invocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Grammar;

impl Grammar {
    /// Create a grammar.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Parse a token sequence into a CST plus the errors that were recovered from.
    pub fn parse<'src>(&self, tokens: &[Token<'src>]) -> (cst::Journal<'src>, Vec<ParseError>) {
        let (items, errs) = journal().parse(tokens).into_output_errors();

        let items = items
            .unwrap_or_default()
            .into_iter()
            .map(|(item, start, end)| Spanned::new(item, index_to_byte_span(tokens, start, end)))
            .collect::<Vec<_>>();

        let errors = errs
            .iter()
            .map(|err| to_parse_error(tokens, err))
            .collect::<Vec<_>>();

        debug!(
            items = items.len(),
            errors = errors.len(),
            "parsed journal"
        );
        (cst::Journal { items }, errors)
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Get the byte span from a slice index span, using the token spans.
fn index_to_byte_span(tokens: &[Token<'_>], start_idx: usize, end_idx: usize) -> Span {
    let Some(last) = tokens.last() else {
        return Span::new(0, 0);
    };
    let start = tokens.get(start_idx).map_or(last.end(), |t| t.offset);
    let end = end_idx
        .checked_sub(1)
        .and_then(|i| tokens.get(i))
        .map_or(last.end(), Token::end);
    Span::new(start, end.max(start))
}

fn to_parse_error(tokens: &[Token<'_>], err: &Rich<'_, Token<'_>>) -> ParseError {
    let span = index_to_byte_span(tokens, err.span().start, err.span().end);
    let at = tokens.get(err.span().start);

    if let RichReason::Custom(message) = err.reason() {
        return match at {
            Some(token) if token.kind.is_account() => ParseError::new(
                ParseErrorKind::VirtualAccountDeclaration(token.image.to_string()),
                span,
            )
            .with_context("account directive")
            .with_hint(VIRTUAL_DECLARATION),
            Some(token) if token.kind == TokenKind::FormatKeyword => {
                ParseError::new(ParseErrorKind::FormatNotAllowed, span)
                    .with_context("default commodity directive")
                    .with_hint("move the format line under a 'commodity' directive")
            }
            _ => ParseError::new(ParseErrorKind::UnexpectedToken(message.clone()), span),
        };
    }

    // Filtered matchers report no found token, so fall back to the token at the error.
    match err.found().or(at) {
        Some(token) => ParseError::new(ParseErrorKind::UnexpectedToken(token.to_string()), span),
        None if tokens.last().is_some_and(|t| t.kind != TokenKind::Newline) => {
            ParseError::new(ParseErrorKind::MissingNewline, span)
                .with_hint("end the last line with a line break")
        }
        None => ParseError::new(ParseErrorKind::UnexpectedEof, span),
    }
}

// ============================================================================
// Token Matchers (Primitives)
// ============================================================================

/// Match a token of the given kind.
fn tok<'tok, 'src: 'tok>(
    kind: TokenKind,
) -> impl Parser<'tok, &'tok [Token<'src>], Token<'src>, TokExtra<'tok, 'src>> + Clone {
    any().filter(move |t: &Token<'_>| t.kind == kind)
}

fn newline<'tok, 'src: 'tok>(
) -> impl Parser<'tok, &'tok [Token<'src>], Token<'src>, TokExtra<'tok, 'src>> + Clone {
    tok(TokenKind::Newline)
}

/// `*` or `!`.
fn status<'tok, 'src: 'tok>(
) -> impl Parser<'tok, &'tok [Token<'src>], Token<'src>, TokExtra<'tok, 'src>> + Clone {
    any().filter(|t: &Token<'_>| matches!(t.kind, TokenKind::Asterisk | TokenKind::Exclamation))
}

/// Any of the three account kinds.
fn account<'tok, 'src: 'tok>(
) -> impl Parser<'tok, &'tok [Token<'src>], Token<'src>, TokExtra<'tok, 'src>> + Clone {
    any().filter(|t: &Token<'_>| t.kind.is_account())
}

// ============================================================================
// Compound Parsers
// ============================================================================

fn inline_comment<'tok, 'src: 'tok>(
) -> impl Parser<'tok, &'tok [Token<'src>], cst::InlineComment<'src>, TokExtra<'tok, 'src>> + Clone
{
    let tag = tok(TokenKind::TagName)
        .then(tok(TokenKind::TagColon))
        .then(tok(TokenKind::TagValue).or_not())
        .then(tok(TokenKind::TagComma).or_not())
        .map(|(((name, colon), value), comma)| {
            cst::CommentItem::Tag(cst::Tag {
                name,
                colon,
                value,
                comma,
            })
        });
    let text = tok(TokenKind::InlineText).map(cst::CommentItem::Text);

    tok(TokenKind::Semicolon)
        .then(choice((tag, text)).repeated().collect::<Vec<_>>())
        .map(|(semicolon, items)| cst::InlineComment { semicolon, items })
}

/// `(DASH? commodity number) | (number commodity?)`
fn amount<'tok, 'src: 'tok>(
) -> impl Parser<'tok, &'tok [Token<'src>], cst::Amount<'src>, TokExtra<'tok, 'src>> + Clone {
    let commodity_first = tok(TokenKind::Dash)
        .or_not()
        .then(tok(TokenKind::Commodity))
        .then(tok(TokenKind::Number))
        .map(|((dash, commodity), number)| cst::Amount {
            dash,
            commodity: Some(commodity),
            number,
        });
    let number_first = tok(TokenKind::Number)
        .then(tok(TokenKind::Commodity).or_not())
        .map(|(number, commodity)| cst::Amount {
            dash: None,
            commodity,
            number,
        });

    choice((commodity_first, number_first))
}

fn lot_price<'tok, 'src: 'tok>(
) -> impl Parser<'tok, &'tok [Token<'src>], cst::LotPrice<'src>, TokExtra<'tok, 'src>> + Clone {
    let ats = tok(TokenKind::At)
        .then(tok(TokenKind::At).or_not())
        .map(|(first, second)| std::iter::once(first).chain(second).collect::<Vec<_>>());
    let virtual_price = tok(TokenKind::LParen)
        .then(ats.clone())
        .then(tok(TokenKind::RParen))
        .map(|((lparen, ats), rparen)| (Some(lparen), ats, Some(rparen)));
    let price = ats.map(|ats| (None, ats, None));

    choice((virtual_price, price))
        .then(amount())
        .map(|((lparen, ats, rparen), amount)| cst::LotPrice {
            lparen,
            ats,
            rparen,
            amount,
        })
}

fn assertion<'tok, 'src: 'tok>(
) -> impl Parser<'tok, &'tok [Token<'src>], cst::Assertion<'src>, TokExtra<'tok, 'src>> + Clone {
    tok(TokenKind::Equals)
        .then(tok(TokenKind::Equals).or_not())
        .then(tok(TokenKind::Asterisk).or_not())
        .then(amount())
        .map(|(((first, second), asterisk), amount)| cst::Assertion {
            equals: std::iter::once(first).chain(second).collect(),
            asterisk,
            amount,
        })
}

fn posting<'tok, 'src: 'tok>(
) -> impl Parser<'tok, &'tok [Token<'src>], cst::Posting<'src>, TokExtra<'tok, 'src>> + Clone {
    status()
        .or_not()
        .then(account())
        .then(amount().or_not())
        .then(lot_price().or_not())
        .then(assertion().or_not())
        .then(inline_comment().or_not())
        .map(
            |(((((status, account), amount), lot_price), assertion), inline_comment)| cst::Posting {
                status,
                account,
                amount,
                lot_price,
                assertion,
                inline_comment,
            },
        )
}

fn comment_line<'tok, 'src: 'tok>(
) -> impl Parser<'tok, &'tok [Token<'src>], cst::CommentLine<'src>, TokExtra<'tok, 'src>> + Clone {
    tok(TokenKind::Indent)
        .then(inline_comment())
        .then(newline())
        .map(|((indent, comment), newline)| cst::CommentLine {
            indent,
            comment,
            newline,
        })
}

// ============================================================================
// Journal Items
// ============================================================================

fn transaction<'tok, 'src: 'tok>(
) -> impl Parser<'tok, &'tok [Token<'src>], cst::Transaction<'src>, TokExtra<'tok, 'src>> + Clone {
    let date = tok(TokenKind::Date)
        .then(
            tok(TokenKind::Equals)
                .then(tok(TokenKind::Date))
                .map(|(equals, date)| cst::PostingDate { equals, date })
                .or_not(),
        )
        .map(|(date, posting_date)| cst::TransactionDate { date, posting_date });

    let memo = tok(TokenKind::Pipe)
        .then(tok(TokenKind::Text).or_not())
        .map(|(pipe, text)| cst::Memo { pipe, text });
    let description = tok(TokenKind::Text)
        .then(memo.or_not())
        .map(|(text, memo)| cst::Description { text, memo });

    let init_line = date
        .then(status().or_not())
        .then(tok(TokenKind::ChequeNumber).or_not())
        .then(description.or_not())
        .then(inline_comment().or_not())
        .then(newline())
        .map(
            |(((((date, status), cheque_number), description), inline_comment), newline)| {
                cst::TransactionInitLine {
                    date,
                    status,
                    cheque_number,
                    description,
                    inline_comment,
                    newline,
                }
            },
        );

    let content_line = tok(TokenKind::Indent)
        .then(choice((
            posting().map(cst::ContentLineBody::Posting),
            inline_comment().map(cst::ContentLineBody::Comment),
        )))
        .then(newline())
        .map(|((indent, body), newline)| cst::TransactionContentLine {
            indent,
            body,
            newline,
        });

    init_line
        .then(content_line.repeated().collect::<Vec<_>>())
        .map(|(init_line, content_lines)| cst::Transaction {
            init_line,
            content_lines,
        })
}

fn line_comment<'tok, 'src: 'tok>(
) -> impl Parser<'tok, &'tok [Token<'src>], cst::LineComment<'src>, TokExtra<'tok, 'src>> + Clone {
    tok(TokenKind::LineCommentMarker)
        .then(tok(TokenKind::CommentText).or_not())
        .then(newline())
        .map(|((marker, text), newline)| cst::LineComment {
            marker,
            text,
            newline,
        })
}

fn price_directive<'tok, 'src: 'tok>(
) -> impl Parser<'tok, &'tok [Token<'src>], cst::PriceDirective<'src>, TokExtra<'tok, 'src>> + Clone
{
    tok(TokenKind::PriceKeyword)
        .then(tok(TokenKind::Date))
        .then(tok(TokenKind::Commodity))
        .then(amount())
        .then(inline_comment().or_not())
        .then(newline())
        .map(
            |(((((keyword, date), commodity), amount), inline_comment), newline)| {
                cst::PriceDirective {
                    keyword,
                    date,
                    commodity,
                    amount,
                    inline_comment,
                    newline,
                }
            },
        )
}

fn account_directive<'tok, 'src: 'tok>(
) -> impl Parser<'tok, &'tok [Token<'src>], cst::AccountDirective<'src>, TokExtra<'tok, 'src>> + Clone
{
    let declared = account().try_map(|token: Token<'src>, span| {
        if token.kind == TokenKind::RealAccount {
            Ok(token)
        } else {
            Err(Rich::custom(span, VIRTUAL_DECLARATION))
        }
    });

    tok(TokenKind::AccountKeyword)
        .then(declared)
        .then(inline_comment().or_not())
        .then(newline())
        .then(comment_line().repeated().collect::<Vec<_>>())
        .map(
            |((((keyword, account), inline_comment), newline), content_lines)| {
                cst::AccountDirective {
                    keyword,
                    account,
                    inline_comment,
                    newline,
                    content_lines,
                }
            },
        )
}

fn commodity_directive<'tok, 'src: 'tok>(
) -> impl Parser<'tok, &'tok [Token<'src>], cst::CommodityDirective<'src>, TokExtra<'tok, 'src>>
       + Clone {
    let declaration = choice((
        amount().map(cst::CommodityDeclaration::Amount),
        tok(TokenKind::Commodity).map(cst::CommodityDeclaration::Text),
    ));

    let format_line = tok(TokenKind::FormatKeyword)
        .then(amount())
        .map(|(keyword, amount)| cst::FormatLine { keyword, amount });
    let content_line = tok(TokenKind::Indent)
        .then(choice((
            format_line.map(cst::CommodityLineBody::Format),
            inline_comment().map(cst::CommodityLineBody::Comment),
        )))
        .then(newline())
        .map(|((indent, body), newline)| cst::CommodityContentLine {
            indent,
            body,
            newline,
        });

    tok(TokenKind::CommodityKeyword)
        .then(declaration)
        .then(inline_comment().or_not())
        .then(newline().or_not())
        .then(content_line.repeated().collect::<Vec<_>>())
        .map(
            |((((keyword, declaration), inline_comment), newline), content_lines)| {
                cst::CommodityDirective {
                    keyword,
                    declaration,
                    inline_comment,
                    newline,
                    content_lines,
                }
            },
        )
}

fn default_commodity_directive<'tok, 'src: 'tok>() -> impl Parser<
    'tok,
    &'tok [Token<'src>],
    cst::DefaultCommodityDirective<'src>,
    TokExtra<'tok, 'src>,
> + Clone {
    // A format line is lexed here but never accepted.
    let rejected_format = tok(TokenKind::FormatKeyword)
        .try_map(|_, span| Err::<cst::InlineComment<'src>, _>(Rich::custom(span, FORMAT_NOT_ALLOWED)));
    let content_line = tok(TokenKind::Indent)
        .then(choice((inline_comment(), rejected_format)))
        .then(newline())
        .map(|((indent, comment), newline)| cst::CommentLine {
            indent,
            comment,
            newline,
        });

    tok(TokenKind::DefaultCommodityKeyword)
        .then(amount())
        .then(inline_comment().or_not())
        .then(newline())
        .then(content_line.repeated().collect::<Vec<_>>())
        .map(
            |((((keyword, amount), inline_comment), newline), content_lines)| {
                cst::DefaultCommodityDirective {
                    keyword,
                    amount,
                    inline_comment,
                    newline,
                    content_lines,
                }
            },
        )
}

/// Parse a single journal item, selected by its leading token.
fn journal_item<'tok, 'src: 'tok>(
) -> impl Parser<'tok, &'tok [Token<'src>], cst::JournalItem<'src>, TokExtra<'tok, 'src>> + Clone {
    choice((
        transaction().map(cst::JournalItem::Transaction),
        line_comment().map(cst::JournalItem::LineComment),
        price_directive().map(cst::JournalItem::PriceDirective),
        account_directive().map(cst::JournalItem::AccountDirective),
        commodity_directive().map(cst::JournalItem::CommodityDirective),
        default_commodity_directive().map(cst::JournalItem::DefaultCommodityDirective),
    ))
    .boxed()
}

/// Skip a broken item: the rest of its line and any indented lines after it.
/// Consumes at least one token to make progress.
fn skip_item<'tok, 'src: 'tok>(
) -> impl Parser<'tok, &'tok [Token<'src>], (), TokExtra<'tok, 'src>> + Clone {
    let rest_of_line = any()
        .filter(|t: &Token<'_>| t.kind != TokenKind::Newline)
        .repeated();
    let continuation = tok(TokenKind::Indent)
        .then(rest_of_line.clone())
        .then(newline().or_not());

    any()
        .then(rest_of_line)
        .then(newline().or_not())
        .then(continuation.repeated())
        .ignored()
}

/// Parse a complete journal with error recovery.
fn journal<'tok, 'src: 'tok>() -> impl Parser<
    'tok,
    &'tok [Token<'src>],
    Vec<(cst::JournalItem<'src>, usize, usize)>,
    TokExtra<'tok, 'src>,
> {
    // Blank lines between items
    newline().repeated().ignore_then(
        journal_item()
            .map_with(|item, e| Some((item, e.span().start, e.span().end)))
            .recover_with(via_parser(skip_item().to(None)))
            .then_ignore(newline().repeated())
            .repeated()
            .collect::<Vec<_>>()
            .map(|items| items.into_iter().flatten().collect()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse(source: &str) -> (cst::Journal<'_>, Vec<ParseError>) {
        let lexed = tokenize(source);
        assert!(lexed.errors.is_empty(), "lex errors: {:?}", lexed.errors);
        Grammar::new().parse(&lexed.tokens)
    }

    fn parse_ok(source: &str) -> cst::Journal<'_> {
        let (journal, errors) = parse(source);
        assert!(errors.is_empty(), "parse errors: {errors:?}");
        journal
    }

    #[test]
    fn test_parse_transaction() {
        let source = "2020/01/01 * (42) Grocer | weekly ; trip:\n  Expenses:Food  $10 ; ok\n  Assets:Cash\n";
        let journal = parse_ok(source);
        assert_eq!(journal.items.len(), 1);
        let cst::JournalItem::Transaction(txn) = &journal.items[0].value else {
            panic!("expected transaction");
        };
        let init = &txn.init_line;
        assert_eq!(init.date.date.image, "2020/01/01");
        assert_eq!(init.status.as_ref().map(|t| t.image), Some("*"));
        assert_eq!(init.cheque_number.as_ref().map(|t| t.image), Some("(42)"));
        let description = init.description.as_ref().unwrap();
        assert_eq!(description.text.image, "Grocer");
        assert_eq!(
            description.memo.as_ref().and_then(|m| m.text.as_ref()).map(|t| t.image),
            Some("weekly")
        );
        assert!(init.inline_comment.is_some());
        assert_eq!(txn.content_lines.len(), 2);
        assert_eq!(journal.items[0].span, Span::new(0, source.len()));
    }

    #[test]
    fn test_parse_posting_parts() {
        let journal = parse_ok("2020/01/01 x\n  ! (Assets:Broker)  -10 AAPL (@@) $500 ==* $0\n");
        let cst::JournalItem::Transaction(txn) = &journal.items[0].value else {
            panic!("expected transaction");
        };
        let cst::ContentLineBody::Posting(posting) = &txn.content_lines[0].body else {
            panic!("expected posting");
        };
        assert_eq!(posting.status.as_ref().map(|t| t.image), Some("!"));
        assert_eq!(posting.account.kind, TokenKind::VirtualAccount);
        let amount = posting.amount.as_ref().unwrap();
        assert_eq!(amount.number.image, "-10");
        let lot_price = posting.lot_price.as_ref().unwrap();
        assert!(lot_price.lparen.is_some());
        assert_eq!(lot_price.ats.len(), 2);
        let assertion = posting.assertion.as_ref().unwrap();
        assert_eq!(assertion.equals.len(), 2);
        assert!(assertion.asterisk.is_some());
    }

    #[test]
    fn test_parse_amount_orders() {
        for (source, dash, commodity, number) in [
            ("2020/01/01 x\n  A  -$1\n", true, Some("$"), "1"),
            ("2020/01/01 x\n  A  $-1\n", false, Some("$"), "-1"),
            ("2020/01/01 x\n  A  1 USD\n", false, Some("USD"), "1"),
            ("2020/01/01 x\n  A  7\n", false, None, "7"),
        ] {
            let journal = parse_ok(source);
            let cst::JournalItem::Transaction(txn) = &journal.items[0].value else {
                panic!("expected transaction");
            };
            let cst::ContentLineBody::Posting(posting) = &txn.content_lines[0].body else {
                panic!("expected posting");
            };
            let amount = posting.amount.as_ref().unwrap();
            assert_eq!(amount.dash.is_some(), dash, "{source:?}");
            assert_eq!(amount.commodity.as_ref().map(|t| t.image), commodity);
            assert_eq!(amount.number.image, number);
        }
    }

    #[test]
    fn test_parse_directives() {
        let source = "\
; header
P 2020/01/01 USD 1.30 CAD
account Assets:Chequing ; type: A
    ; note: main

commodity CAD
    format 1,000.00 CAD
D $1,000.00
";
        let journal = parse_ok(source);
        let kinds: Vec<_> = journal
            .items
            .iter()
            .map(|item| match &item.value {
                cst::JournalItem::Transaction(_) => "transaction",
                cst::JournalItem::LineComment(_) => "comment",
                cst::JournalItem::PriceDirective(_) => "price",
                cst::JournalItem::AccountDirective(_) => "account",
                cst::JournalItem::CommodityDirective(_) => "commodity",
                cst::JournalItem::DefaultCommodityDirective(_) => "default",
            })
            .collect();
        assert_eq!(
            kinds,
            ["comment", "price", "account", "commodity", "default"]
        );
    }

    #[test]
    fn test_commodity_text_declaration() {
        let journal = parse_ok("commodity CAD\n");
        let cst::JournalItem::CommodityDirective(directive) = &journal.items[0].value else {
            panic!("expected commodity directive");
        };
        assert!(matches!(
            directive.declaration,
            cst::CommodityDeclaration::Text(ref t) if t.image == "CAD"
        ));
    }

    #[test]
    fn test_commodity_directive_without_newline() {
        let journal = parse_ok("commodity $1000.00");
        let cst::JournalItem::CommodityDirective(directive) = &journal.items[0].value else {
            panic!("expected commodity directive");
        };
        assert!(directive.newline.is_none());
        assert!(matches!(
            directive.declaration,
            cst::CommodityDeclaration::Amount(_)
        ));
    }

    #[test]
    fn test_virtual_account_declaration_rejected() {
        let (journal, errors) = parse("account (Assets:Virtual)\n");
        assert!(journal.items.is_empty());
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_format_under_default_commodity_rejected() {
        let (journal, errors) = parse("D $1.00\n    format $1.00\n");
        assert!(!errors.is_empty());
        let format_accepted = journal.items.iter().any(|item| {
            matches!(&item.value, cst::JournalItem::DefaultCommodityDirective(d) if !d.content_lines.is_empty())
        });
        assert!(!format_accepted);
    }

    #[test]
    fn test_missing_newline_is_reported() {
        let (journal, errors) = parse("account Assets:Cash");
        assert!(journal.items.is_empty());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ParseErrorKind::MissingNewline);
    }

    #[test]
    fn test_mid_file_errors_name_the_token() {
        let source = "P 2020/01/01 USD\n2020/01/02 ok\n";
        let (journal, errors) = parse(source);
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].kind,
            ParseErrorKind::UnexpectedToken("line break".to_string())
        );
        assert_eq!(errors[0].span, Span::new(16, 17));
        assert_eq!(journal.items.len(), 1);
    }

    #[test]
    fn test_recovery_continues_with_next_item() {
        let source = "P 2020/01/01 USD\n  A  1\n2020/01/02 ok\n  B  $1\n";
        let (journal, errors) = parse(source);
        assert_eq!(errors.len(), 1);
        assert_eq!(journal.items.len(), 1);
        assert!(matches!(
            journal.items[0].value,
            cst::JournalItem::Transaction(_)
        ));
    }

    #[test]
    fn test_parse_empty() {
        let journal = parse_ok("");
        assert!(journal.items.is_empty());
        let journal = parse_ok("\n\n");
        assert!(journal.items.is_empty());
    }

    #[test]
    fn test_grammar_is_reusable() {
        let grammar = Grammar::new();
        let first = tokenize("2020/01/01 a\n");
        let second = tokenize("account X\n");
        let (a, _) = grammar.parse(&first.tokens);
        let (b, _) = grammar.parse(&second.tokens);
        assert_eq!(a.items.len(), 1);
        assert_eq!(b.items.len(), 1);
    }
}

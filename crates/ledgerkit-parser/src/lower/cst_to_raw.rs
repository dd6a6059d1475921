//! CST → raw lowering.
//!
//! One function per CST node. Everything is a straight copy of token text into
//! owned values, except that amounts which must name a commodity fail with
//! [`LowerError::MissingCommodity`] when they do not.

use ledgerkit_core::{AssertionKind, Description, LotPriceKind, Status, Tag};
use tracing::debug;

use crate::cst;
use crate::error::LowerError;
use crate::lexer::{Token, TokenKind};
use crate::raw;
use crate::span::Spanned;

/// Lower a whole CST journal.
pub fn lower_journal(journal: &cst::Journal<'_>) -> Result<raw::Journal, LowerError> {
    let items = journal
        .items
        .iter()
        .map(|item| Ok(Spanned::new(lower_item(&item.value)?, item.span)))
        .collect::<Result<Vec<_>, LowerError>>()?;
    debug!(items = items.len(), "lowered CST to raw journal");
    Ok(raw::Journal { items })
}

fn lower_item(item: &cst::JournalItem<'_>) -> Result<raw::JournalItem, LowerError> {
    Ok(match item {
        cst::JournalItem::Transaction(txn) => raw::JournalItem::Transaction(lower_transaction(txn)),
        cst::JournalItem::LineComment(comment) => {
            raw::JournalItem::LineComment(lower_line_comment(comment))
        }
        cst::JournalItem::PriceDirective(price) => {
            raw::JournalItem::PriceDirective(lower_price_directive(price))
        }
        cst::JournalItem::AccountDirective(account) => {
            raw::JournalItem::AccountDirective(lower_account_directive(account))
        }
        cst::JournalItem::CommodityDirective(commodity) => {
            raw::JournalItem::CommodityDirective(lower_commodity_directive(commodity)?)
        }
        cst::JournalItem::DefaultCommodityDirective(default) => {
            raw::JournalItem::DefaultCommodityDirective(lower_default_commodity_directive(default)?)
        }
    })
}

fn lower_transaction(txn: &cst::Transaction<'_>) -> raw::Transaction {
    let init = &txn.init_line;
    raw::Transaction {
        date: init.date.date.image.to_string(),
        posting_date: init
            .date
            .posting_date
            .as_ref()
            .map(|posting| posting.date.image.to_string()),
        status: lower_status(init.status.as_ref()),
        cheque_number: init
            .cheque_number
            .as_ref()
            .map(|token| token.text().to_string()),
        description: init.description.as_ref().map(lower_description),
        comment: init.inline_comment.as_ref().map(lower_inline_comment),
        content_lines: txn.content_lines.iter().map(lower_content_line).collect(),
    }
}

fn lower_status(token: Option<&Token<'_>>) -> Status {
    match token.map(|t| t.kind) {
        Some(TokenKind::Exclamation) => Status::Pending,
        Some(TokenKind::Asterisk) => Status::Cleared,
        _ => Status::Unmarked,
    }
}

/// Only the first `|` splits; the lexer keeps later ones in the memo text.
fn lower_description(description: &cst::Description<'_>) -> Description {
    match &description.memo {
        Some(memo) => Description::PayeeMemo {
            payee: description.text.image.to_string(),
            memo: memo
                .text
                .as_ref()
                .map(|t| t.image.to_string())
                .unwrap_or_default(),
        },
        None => Description::Text(description.text.image.to_string()),
    }
}

fn lower_content_line(line: &cst::TransactionContentLine<'_>) -> raw::ContentLine {
    match &line.body {
        cst::ContentLineBody::Posting(posting) => raw::ContentLine::Posting(lower_posting(posting)),
        cst::ContentLineBody::Comment(comment) => {
            raw::ContentLine::Comment(lower_inline_comment(comment))
        }
    }
}

fn lower_posting(posting: &cst::Posting<'_>) -> raw::Posting {
    raw::Posting {
        status: lower_status(posting.status.as_ref()),
        account: lower_account(&posting.account),
        amount: posting.amount.as_ref().map(lower_amount),
        lot_price: posting.lot_price.as_ref().map(lower_lot_price),
        assertion: posting.assertion.as_ref().map(lower_assertion),
        comment: posting.inline_comment.as_ref().map(lower_inline_comment),
    }
}

fn lower_account(token: &Token<'_>) -> raw::Account {
    let segments = token.segments().iter().map(ToString::to_string).collect();
    match token.kind {
        TokenKind::VirtualAccount => raw::Account::Virtual(segments),
        TokenKind::VirtualBalancedAccount => raw::Account::VirtualBalanced(segments),
        _ => raw::Account::Real(segments),
    }
}

fn lower_amount(amount: &cst::Amount<'_>) -> raw::Amount {
    let image = amount.number.image;
    let (signed_number, digits) = match image.strip_prefix('-') {
        Some(digits) => (true, digits),
        None => (false, image),
    };
    let sign = if amount.dash.is_some() == signed_number {
        raw::Sign::Positive
    } else {
        raw::Sign::Negative
    };

    raw::Amount {
        sign,
        number: digits.to_string(),
        commodity: amount.commodity.as_ref().map(|t| t.text().to_string()),
        text: surface_text(amount),
    }
}

/// Token images in source order; skipped whitespace collapses to one space.
fn surface_text(amount: &cst::Amount<'_>) -> String {
    let mut tokens: Vec<&Token<'_>> = amount
        .dash
        .iter()
        .chain(&amount.commodity)
        .chain(std::iter::once(&amount.number))
        .collect();
    tokens.sort_by_key(|t| t.offset);

    let mut text = String::new();
    let mut previous_end = None;
    for token in tokens {
        if previous_end.is_some_and(|end| end < token.offset) {
            text.push(' ');
        }
        text.push_str(token.image);
        previous_end = Some(token.end());
    }
    text
}

fn lower_commodity_amount(amount: &cst::Amount<'_>) -> Result<raw::CommodityAmount, LowerError> {
    let raw::Amount {
        sign,
        number,
        commodity,
        text,
    } = lower_amount(amount);
    let commodity = commodity.ok_or(LowerError::MissingCommodity)?;
    Ok(raw::CommodityAmount {
        sign,
        number,
        commodity,
        text,
    })
}

fn lower_lot_price(lot_price: &cst::LotPrice<'_>) -> raw::LotPrice {
    raw::LotPrice {
        kind: if lot_price.ats.len() > 1 {
            LotPriceKind::Total
        } else {
            LotPriceKind::Unit
        },
        is_virtual: lot_price.lparen.is_some(),
        amount: lower_amount(&lot_price.amount),
    }
}

fn lower_assertion(assertion: &cst::Assertion<'_>) -> raw::Assertion {
    raw::Assertion {
        kind: if assertion.equals.len() > 1 {
            AssertionKind::Strong
        } else {
            AssertionKind::Normal
        },
        subaccounts: assertion.asterisk.is_some(),
        amount: lower_amount(&assertion.amount),
    }
}

fn lower_inline_comment(comment: &cst::InlineComment<'_>) -> raw::InlineComment {
    let items = comment
        .items
        .iter()
        .map(|item| match item {
            cst::CommentItem::Text(text) => raw::CommentItem::Text(text.image.to_string()),
            cst::CommentItem::Tag(tag) => raw::CommentItem::Tag(Tag {
                name: tag.name.image.to_string(),
                value: tag.value.as_ref().map(|v| v.image.to_string()),
            }),
        })
        .collect();
    raw::InlineComment { items }
}

fn lower_line_comment(comment: &cst::LineComment<'_>) -> raw::LineComment {
    raw::LineComment {
        marker: comment.marker.image.chars().next().unwrap_or(';'),
        text: comment
            .text
            .as_ref()
            .map(|t| t.image.to_string())
            .unwrap_or_default(),
    }
}

fn lower_price_directive(price: &cst::PriceDirective<'_>) -> raw::PriceDirective {
    raw::PriceDirective {
        date: price.date.image.to_string(),
        commodity: price.commodity.text().to_string(),
        amount: lower_amount(&price.amount),
        comment: price.inline_comment.as_ref().map(lower_inline_comment),
    }
}

fn lower_account_directive(directive: &cst::AccountDirective<'_>) -> raw::AccountDirective {
    raw::AccountDirective {
        account: directive
            .account
            .segments()
            .iter()
            .map(ToString::to_string)
            .collect(),
        comment: directive.inline_comment.as_ref().map(lower_inline_comment),
        content_lines: directive
            .content_lines
            .iter()
            .map(|line| lower_inline_comment(&line.comment))
            .collect(),
    }
}

fn lower_commodity_directive(
    directive: &cst::CommodityDirective<'_>,
) -> Result<raw::CommodityDirective, LowerError> {
    let commodity = match &directive.declaration {
        cst::CommodityDeclaration::Amount(amount) => {
            raw::CommodityDeclaration::Amount(lower_commodity_amount(amount)?)
        }
        cst::CommodityDeclaration::Text(token) => {
            raw::CommodityDeclaration::Text(token.text().to_string())
        }
    };
    let content_lines = directive
        .content_lines
        .iter()
        .map(|line| {
            Ok(match &line.body {
                cst::CommodityLineBody::Format(format) => {
                    raw::CommodityContentLine::Format(lower_commodity_amount(&format.amount)?)
                }
                cst::CommodityLineBody::Comment(comment) => {
                    raw::CommodityContentLine::Comment(lower_inline_comment(comment))
                }
            })
        })
        .collect::<Result<Vec<_>, LowerError>>()?;

    Ok(raw::CommodityDirective {
        commodity,
        comment: directive.inline_comment.as_ref().map(lower_inline_comment),
        content_lines,
    })
}

fn lower_default_commodity_directive(
    directive: &cst::DefaultCommodityDirective<'_>,
) -> Result<raw::DefaultCommodityDirective, LowerError> {
    Ok(raw::DefaultCommodityDirective {
        amount: lower_commodity_amount(&directive.amount)?,
        comment: directive.inline_comment.as_ref().map(lower_inline_comment),
        content_lines: directive
            .content_lines
            .iter()
            .map(|line| lower_inline_comment(&line.comment))
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Grammar;
    use crate::lexer::tokenize;

    fn lower(source: &str) -> Result<raw::Journal, LowerError> {
        let lexed = tokenize(source);
        let (journal, errors) = Grammar::new().parse(&lexed.tokens);
        assert!(errors.is_empty(), "parse errors: {errors:?}");
        lower_journal(&journal)
    }

    fn first_transaction(journal: &raw::Journal) -> &raw::Transaction {
        match &journal.items[0].value {
            raw::JournalItem::Transaction(txn) => txn,
            other => panic!("expected transaction, got {other:?}"),
        }
    }

    fn first_posting(txn: &raw::Transaction) -> &raw::Posting {
        match &txn.content_lines[0] {
            raw::ContentLine::Posting(posting) => posting,
            other => panic!("expected posting, got {other:?}"),
        }
    }

    #[test]
    fn test_dash_before_commodity() {
        let journal = lower("1900/01/01\n    Account:Test  -$1\n").unwrap();
        let txn = first_transaction(&journal);
        let amount = first_posting(txn).amount.as_ref().unwrap();
        assert_eq!(amount.commodity.as_deref(), Some("$"));
        assert_eq!(amount.number, "1");
        assert_eq!(amount.sign, raw::Sign::Negative);
        assert_eq!(amount.value(), "-1");
        assert_eq!(amount.text, "-$1");
    }

    #[test]
    fn test_sign_after_commodity() {
        let journal = lower("2020/01/01 x\n  A  $ -2.50\n").unwrap();
        let amount = first_posting(first_transaction(&journal))
            .amount
            .clone()
            .unwrap();
        assert_eq!(amount.sign, raw::Sign::Negative);
        assert_eq!(amount.number, "2.50");
        assert_eq!(amount.text, "$ -2.50");
    }

    #[test]
    fn test_transaction_fields() {
        let journal =
            lower("2020/01/02=2020/01/05 ! (42) Payee | memo | more ; trip:\n  A  1\n").unwrap();
        let txn = first_transaction(&journal);
        assert_eq!(txn.date, "2020/01/02");
        assert_eq!(txn.posting_date.as_deref(), Some("2020/01/05"));
        assert_eq!(txn.status, Status::Pending);
        assert_eq!(txn.cheque_number.as_deref(), Some("42"));
        assert_eq!(
            txn.description,
            Some(Description::PayeeMemo {
                payee: "Payee".to_string(),
                memo: "memo | more".to_string(),
            })
        );
        let tags: Vec<_> = txn.comment.as_ref().unwrap().tags().cloned().collect();
        assert_eq!(tags, [Tag::new("trip")]);
    }

    #[test]
    fn test_posting_extras() {
        let journal = lower("2020/01/01 x\n  * [Budget]  10 AAPL @@ $500 == $0\n").unwrap();
        let posting = first_posting(first_transaction(&journal));
        assert_eq!(posting.status, Status::Cleared);
        assert_eq!(posting.account, raw::Account::VirtualBalanced(vec!["Budget".into()]));
        let lot_price = posting.lot_price.as_ref().unwrap();
        assert_eq!(lot_price.kind, LotPriceKind::Total);
        assert!(!lot_price.is_virtual);
        let assertion = posting.assertion.as_ref().unwrap();
        assert_eq!(assertion.kind, AssertionKind::Strong);
        assert!(!assertion.subaccounts);
    }

    #[test]
    fn test_unit_virtual_price_and_subaccount_assertion() {
        let journal = lower("2020/01/01 x\n  A  1 X (@) 2 Y =* 3 X\n").unwrap();
        let posting = first_posting(first_transaction(&journal));
        let lot_price = posting.lot_price.as_ref().unwrap();
        assert_eq!(lot_price.kind, LotPriceKind::Unit);
        assert!(lot_price.is_virtual);
        let assertion = posting.assertion.as_ref().unwrap();
        assert_eq!(assertion.kind, AssertionKind::Normal);
        assert!(assertion.subaccounts);
    }

    #[test]
    fn test_account_directive_comments() {
        let journal = lower("account Assets:Chequing ;secret:\n    ;type: A\n").unwrap();
        let raw::JournalItem::AccountDirective(directive) = &journal.items[0].value else {
            panic!("expected account directive");
        };
        assert_eq!(directive.account, ["Assets", "Chequing"]);
        assert_eq!(
            directive.comment.as_ref().unwrap().tags().next(),
            Some(&Tag::new("secret"))
        );
        assert_eq!(directive.content_lines.len(), 1);
    }

    #[test]
    fn test_commodity_amount_requires_commodity() {
        assert_eq!(
            lower("commodity 1000.00\n").unwrap_err(),
            LowerError::MissingCommodity
        );
        assert_eq!(
            lower("D 1000.00\n").unwrap_err(),
            LowerError::MissingCommodity
        );
    }

    #[test]
    fn test_commodity_directive_lines() {
        let journal = lower("commodity \"Apple Shares\"\n    format 1.00 \"Apple Shares\"\n    ; note\n").unwrap();
        let raw::JournalItem::CommodityDirective(directive) = &journal.items[0].value else {
            panic!("expected commodity directive");
        };
        assert_eq!(directive.commodity.commodity(), "Apple Shares");
        assert!(matches!(
            &directive.content_lines[0],
            raw::CommodityContentLine::Format(f) if f.commodity == "Apple Shares"
        ));
        assert!(matches!(
            directive.content_lines[1],
            raw::CommodityContentLine::Comment(_)
        ));
    }

    #[test]
    fn test_line_comment() {
        let journal = lower("# hello\n").unwrap();
        assert_eq!(
            journal.items[0].value,
            raw::JournalItem::LineComment(raw::LineComment {
                marker: '#',
                text: " hello".to_string(),
            })
        );
    }
}

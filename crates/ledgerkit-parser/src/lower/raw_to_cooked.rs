//! Raw → cooked lowering.
//!
//! Resolves dates against the call's [`CookConfig`], turns digit text into
//! decimals, gathers tags onto their owners and validates commodity
//! directives. The first violation aborts the whole journal.

use chrono::NaiveDate;
use ledgerkit_core::{
    Account, AccountPath, Amount, Assertion, Commodity, Description, Journal, LotPrice, Posting,
    PostingAccount, Price, Tag, Transaction,
};
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::debug;

use crate::config::CookConfig;
use crate::error::LowerError;
use crate::raw;

/// Cook a raw journal.
pub fn lower_journal(journal: &raw::Journal, config: &CookConfig) -> Result<Journal, LowerError> {
    let mut cooked = Journal::new();
    for item in &journal.items {
        match &item.value {
            raw::JournalItem::Transaction(txn) => {
                cooked.transactions.push(cook_transaction(txn, config)?);
            }
            raw::JournalItem::LineComment(_) => {}
            raw::JournalItem::PriceDirective(price) => {
                cooked.prices.push(cook_price(price, config)?);
            }
            raw::JournalItem::AccountDirective(account) => {
                cooked.accounts.push(cook_account(account));
            }
            raw::JournalItem::CommodityDirective(commodity) => {
                cooked.commodities.push(cook_commodity(commodity)?);
            }
            raw::JournalItem::DefaultCommodityDirective(default) => {
                cooked.default_commodity = Some(cook_amount(&default.amount.to_amount())?);
            }
        }
    }
    debug!(
        transactions = cooked.transactions.len(),
        accounts = cooked.accounts.len(),
        prices = cooked.prices.len(),
        commodities = cooked.commodities.len(),
        "cooked journal"
    );
    Ok(cooked)
}

/// Resolve `yyyy/m/d` or `m/d` (separators `/`, `-`, `.`) to a calendar date.
pub fn resolve_date(text: &str, default_year: i32) -> Result<NaiveDate, LowerError> {
    let invalid = |reason: &str| LowerError::InvalidDate {
        date: text.to_string(),
        reason: reason.to_string(),
    };
    let is_field = |s: &str, max: usize| {
        !s.is_empty() && s.len() <= max && s.bytes().all(|b| b.is_ascii_digit())
    };

    let parts: Vec<&str> = text.split(['/', '-', '.']).collect();
    let (year, month, day) = match parts.as_slice() {
        [year, month, day] if year.len() == 4 && is_field(year, 4) => {
            let year = year.parse::<i32>().map_err(|_| invalid("invalid year"))?;
            (year, *month, *day)
        }
        [month, day] => (default_year, *month, *day),
        _ => return Err(invalid("expected [yyyy/]m/d")),
    };
    if !is_field(month, 2) || !is_field(day, 2) {
        return Err(invalid("expected [yyyy/]m/d"));
    }

    let month = month.parse::<u32>().map_err(|_| invalid("invalid month"))?;
    let day = day.parse::<u32>().map_err(|_| invalid("invalid day"))?;
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| invalid("no such calendar date"))
}

fn cook_quantity(amount: &raw::Amount) -> Result<Decimal, LowerError> {
    let mut digits: String = amount.number.chars().filter(|&c| c != ',').collect();
    if digits.starts_with('.') {
        digits.insert(0, '0');
    }
    let quantity =
        Decimal::from_str(&digits).map_err(|_| LowerError::InvalidNumber(amount.value()))?;
    Ok(match amount.sign {
        raw::Sign::Positive => quantity,
        raw::Sign::Negative => -quantity,
    })
}

fn cook_amount(amount: &raw::Amount) -> Result<Amount, LowerError> {
    Ok(Amount {
        quantity: cook_quantity(amount)?,
        commodity: amount.commodity.clone(),
    })
}

fn comment_tags(comment: Option<&raw::InlineComment>) -> impl Iterator<Item = Tag> + '_ {
    comment.into_iter().flat_map(raw::InlineComment::tags).cloned()
}

fn cook_transaction(txn: &raw::Transaction, config: &CookConfig) -> Result<Transaction, LowerError> {
    let date = resolve_date(&txn.date, config.default_year)?;
    let description = txn
        .description
        .clone()
        .unwrap_or_else(|| Description::Text(String::new()));

    let mut cooked = Transaction::new(date, description);
    cooked.posting_date = txn
        .posting_date
        .as_deref()
        .map(|text| resolve_date(text, config.default_year))
        .transpose()?;
    cooked.status = txn.status;
    cooked.code.clone_from(&txn.cheque_number);
    cooked.tags.extend(comment_tags(txn.comment.as_ref()));

    // A comment line belongs to the posting above it, if there is one.
    for line in &txn.content_lines {
        match line {
            raw::ContentLine::Posting(posting) => cooked.postings.push(cook_posting(posting)?),
            raw::ContentLine::Comment(comment) => {
                let tags = comment_tags(Some(comment));
                match cooked.postings.last_mut() {
                    Some(posting) => posting.tags.extend(tags),
                    None => cooked.tags.extend(tags),
                }
            }
        }
    }
    Ok(cooked)
}

fn cook_posting(posting: &raw::Posting) -> Result<Posting, LowerError> {
    let account = match &posting.account {
        raw::Account::Real(segments) => PostingAccount::Real(AccountPath(segments.clone())),
        raw::Account::Virtual(segments) => PostingAccount::Virtual(AccountPath(segments.clone())),
        raw::Account::VirtualBalanced(segments) => {
            PostingAccount::VirtualBalanced(AccountPath(segments.clone()))
        }
    };

    let mut cooked = Posting::new(account).with_status(posting.status);
    cooked.amount = posting.amount.as_ref().map(cook_amount).transpose()?;
    cooked.lot_price = posting
        .lot_price
        .as_ref()
        .map(|lot_price| {
            Ok::<_, LowerError>(LotPrice {
                kind: lot_price.kind,
                is_virtual: lot_price.is_virtual,
                amount: cook_amount(&lot_price.amount)?,
            })
        })
        .transpose()?;
    cooked.assertion = posting
        .assertion
        .as_ref()
        .map(|assertion| {
            Ok::<_, LowerError>(Assertion {
                kind: assertion.kind,
                subaccounts: assertion.subaccounts,
                amount: cook_amount(&assertion.amount)?,
            })
        })
        .transpose()?;
    cooked.tags.extend(comment_tags(posting.comment.as_ref()));
    Ok(cooked)
}

fn cook_price(price: &raw::PriceDirective, config: &CookConfig) -> Result<Price, LowerError> {
    Ok(Price {
        date: resolve_date(&price.date, config.default_year)?,
        commodity: price.commodity.clone(),
        amount: cook_amount(&price.amount)?,
    })
}

/// Directive-line tags first, then each content line in order.
fn cook_account(directive: &raw::AccountDirective) -> Account {
    let tags = comment_tags(directive.comment.as_ref())
        .chain(directive.content_lines.iter().flat_map(|c| c.tags().cloned()))
        .collect();
    Account {
        path: AccountPath(directive.account.clone()),
        tags,
    }
}

fn cook_commodity(directive: &raw::CommodityDirective) -> Result<Commodity, LowerError> {
    let declared = directive.commodity.commodity();
    let formats: Vec<&raw::CommodityAmount> = directive
        .content_lines
        .iter()
        .filter_map(|line| match line {
            raw::CommodityContentLine::Format(format) => Some(format),
            raw::CommodityContentLine::Comment(_) => None,
        })
        .collect();

    if formats.len() > 1 {
        return Err(LowerError::MultipleCommodityFormats {
            commodity: declared.to_string(),
            count: formats.len(),
        });
    }

    let inline = match &directive.commodity {
        raw::CommodityDeclaration::Amount(amount) => Some(amount),
        raw::CommodityDeclaration::Text(_) => None,
    };
    let format = match (inline, formats.first().copied()) {
        (Some(_), Some(_)) => {
            return Err(LowerError::ConflictingCommodityFormat {
                commodity: declared.to_string(),
            })
        }
        (None, Some(format)) if format.commodity != declared => {
            return Err(LowerError::CommodityMismatch {
                declared: declared.to_string(),
                format: format.commodity.clone(),
            })
        }
        (Some(format), None) | (None, Some(format)) => Some(cook_amount(&format.to_amount())?),
        (None, None) => None,
    };

    let tags = comment_tags(directive.comment.as_ref())
        .chain(directive.content_lines.iter().flat_map(|line| match line {
            raw::CommodityContentLine::Comment(comment) => comment.tags().cloned().collect(),
            raw::CommodityContentLine::Format(_) => Vec::new(),
        }))
        .collect();

    Ok(Commodity {
        commodity: declared.to_string(),
        format,
        tags,
    })
}

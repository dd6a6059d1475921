//! Raw journal model.
//!
//! Mirrors the surface syntax: dates are still strings, numbers are still
//! digit text, tags sit where they were written. Produced by
//! [`crate::lower_to_raw`] and consumed by [`crate::lower_to_cooked`].

use ledgerkit_core::{AssertionKind, Description, LotPriceKind, Status, Tag};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::span::Spanned;

/// An ordered list of journal items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Journal {
    /// Items in source order.
    pub items: Vec<Spanned<JournalItem>>,
}

/// One journal item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum JournalItem {
    /// A transaction.
    Transaction(Transaction),
    /// A full-line comment.
    LineComment(LineComment),
    /// A `P` directive.
    PriceDirective(PriceDirective),
    /// An `account` directive.
    AccountDirective(AccountDirective),
    /// A `commodity` directive.
    CommodityDirective(CommodityDirective),
    /// A `D` directive.
    DefaultCommodityDirective(DefaultCommodityDirective),
}

/// A full-line comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineComment {
    /// `;`, `#` or `*`.
    pub marker: char,
    /// Text after the marker.
    pub text: String,
}

/// A transaction as written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Date text.
    pub date: String,
    /// Text of the `=date` part.
    pub posting_date: Option<String>,
    /// Header status.
    pub status: Status,
    /// Code between parentheses.
    pub cheque_number: Option<String>,
    /// Description, if any.
    pub description: Option<Description>,
    /// Comment on the first line.
    pub comment: Option<InlineComment>,
    /// Postings and comment lines in order.
    pub content_lines: Vec<ContentLine>,
}

/// An indented line of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ContentLine {
    /// A posting.
    Posting(Posting),
    /// A comment on its own line.
    Comment(InlineComment),
}

/// A posting as written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    /// Posting status.
    pub status: Status,
    /// Account.
    pub account: Account,
    /// Amount.
    pub amount: Option<Amount>,
    /// Lot price.
    pub lot_price: Option<LotPrice>,
    /// Balance assertion.
    pub assertion: Option<Assertion>,
    /// Trailing comment.
    pub comment: Option<InlineComment>,
}

/// An account name, by kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "segments", rename_all = "camelCase")]
pub enum Account {
    /// `Assets:Cash`
    Real(Vec<String>),
    /// `(Assets:Cash)`
    Virtual(Vec<String>),
    /// `[Assets:Cash]`
    VirtualBalanced(Vec<String>),
}

impl Account {
    /// Name segments.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        match self {
            Self::Real(segments) | Self::Virtual(segments) | Self::VirtualBalanced(segments) => {
                segments
            }
        }
    }
}

/// Sign of an amount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sign {
    /// No minus sign.
    #[default]
    Positive,
    /// A minus sign before the commodity or the digits.
    Negative,
}

impl Sign {
    /// `"-"` or `""`.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Positive => "",
            Self::Negative => "-",
        }
    }
}

/// An amount as written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    /// Sign, wherever it was written.
    pub sign: Sign,
    /// Unsigned digit text, group separators included.
    pub number: String,
    /// Commodity text without quotes.
    pub commodity: Option<String>,
    /// Surface text of the amount's tokens.
    pub text: String,
}

impl Amount {
    /// Sign-prefixed digit text.
    #[must_use]
    pub fn value(&self) -> String {
        format!("{}{}", self.sign.prefix(), self.number)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// An amount that must name its commodity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommodityAmount {
    /// Sign.
    pub sign: Sign,
    /// Unsigned digit text.
    pub number: String,
    /// Commodity text without quotes.
    pub commodity: String,
    /// Surface text.
    pub text: String,
}

impl CommodityAmount {
    /// The same amount with an optional commodity.
    #[must_use]
    pub fn to_amount(&self) -> Amount {
        Amount {
            sign: self.sign,
            number: self.number.clone(),
            commodity: Some(self.commodity.clone()),
            text: self.text.clone(),
        }
    }
}

/// A lot price as written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotPrice {
    /// `@` is a unit price, `@@` a total price.
    pub kind: LotPriceKind,
    /// Written in parentheses.
    pub is_virtual: bool,
    /// Price.
    pub amount: Amount,
}

/// A balance assertion as written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assertion {
    /// `=` is normal, `==` strong.
    pub kind: AssertionKind,
    /// `*` was present.
    pub subaccounts: bool,
    /// Expected balance.
    pub amount: Amount,
}

/// An inline comment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineComment {
    /// Text and tags in written order.
    pub items: Vec<CommentItem>,
}

impl InlineComment {
    /// Tags in written order.
    pub fn tags(&self) -> impl Iterator<Item = &Tag> + '_ {
        self.items.iter().filter_map(|item| match item {
            CommentItem::Tag(tag) => Some(tag),
            CommentItem::Text(_) => None,
        })
    }
}

/// Element of an inline comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum CommentItem {
    /// Free text.
    Text(String),
    /// A tag.
    Tag(Tag),
}

/// A `P` directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceDirective {
    /// Date text.
    pub date: String,
    /// Priced commodity.
    pub commodity: String,
    /// Price.
    pub amount: Amount,
    /// Trailing comment.
    pub comment: Option<InlineComment>,
}

/// An `account` directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountDirective {
    /// Account segments.
    pub account: Vec<String>,
    /// Comment on the directive line.
    pub comment: Option<InlineComment>,
    /// Comments on the indented lines.
    pub content_lines: Vec<InlineComment>,
}

/// A `commodity` directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommodityDirective {
    /// What follows the keyword.
    pub commodity: CommodityDeclaration,
    /// Comment on the directive line.
    pub comment: Option<InlineComment>,
    /// Format and comment lines.
    pub content_lines: Vec<CommodityContentLine>,
}

/// What follows the `commodity` keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum CommodityDeclaration {
    /// Just the commodity.
    Text(String),
    /// An example amount, which doubles as the format.
    Amount(CommodityAmount),
}

impl CommodityDeclaration {
    /// The declared commodity text.
    #[must_use]
    pub fn commodity(&self) -> &str {
        match self {
            Self::Text(commodity) => commodity,
            Self::Amount(amount) => &amount.commodity,
        }
    }
}

/// An indented line of a commodity directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum CommodityContentLine {
    /// `format amount`
    Format(CommodityAmount),
    /// A comment.
    Comment(InlineComment),
}

/// A `D` directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultCommodityDirective {
    /// Example amount of the default commodity.
    pub amount: CommodityAmount,
    /// Comment on the directive line.
    pub comment: Option<InlineComment>,
    /// Comments on the indented lines.
    pub content_lines: Vec<InlineComment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_value() {
        let amount = Amount {
            sign: Sign::Negative,
            number: "1,000.50".to_string(),
            commodity: Some("$".to_string()),
            text: "-$1,000.50".to_string(),
        };
        assert_eq!(amount.value(), "-1,000.50");
        assert_eq!(amount.to_string(), "-$1,000.50");
    }

    #[test]
    fn test_comment_tags() {
        let comment = InlineComment {
            items: vec![
                CommentItem::Text("groceries".to_string()),
                CommentItem::Tag(Tag::new("trip")),
                CommentItem::Tag(Tag::with_value("who", "me")),
            ],
        };
        let names: Vec<_> = comment.tags().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["trip", "who"]);
    }

    #[test]
    fn test_declaration_commodity() {
        assert_eq!(CommodityDeclaration::Text("CAD".into()).commodity(), "CAD");
        let amount = CommodityAmount {
            sign: Sign::Positive,
            number: "1000.00".into(),
            commodity: "USD".into(),
            text: "USD1000.00".into(),
        };
        assert_eq!(amount.to_amount().commodity.as_deref(), Some("USD"));
        assert_eq!(CommodityDeclaration::Amount(amount).commodity(), "USD");
    }
}

//! The cooked journal: the validated, fully typed result of one parse.
//!
//! A [`Journal`] owns everything it contains; nothing refers back into the
//! source text or the intermediate trees it was built from.
//!
//! - [`Transaction`] - dated movement between accounts, made of [`Posting`]s
//! - [`Account`] - an `account` directive declaring an account path
//! - [`Price`] - a `P` directive recording a commodity price
//! - [`Commodity`] - a `commodity` directive with its optional display format

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Amount, Assertion, LotPrice};

/// A `name[:value]` pair found in a comment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    /// Tag name
    pub name: String,
    /// Tag value, if one was written after the colon
    pub value: Option<String>,
}

impl Tag {
    /// Create a tag without a value.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    /// Create a tag with a value.
    #[must_use]
    pub fn with_value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}: {value}", self.name),
            None => write!(f, "{}:", self.name),
        }
    }
}

/// Clearing status of a transaction or posting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    /// No marker
    #[default]
    Unmarked,
    /// `!`
    Pending,
    /// `*`
    Cleared,
}

impl Status {
    /// The marker character, if any.
    #[must_use]
    pub const fn marker(self) -> Option<char> {
        match self {
            Self::Unmarked => None,
            Self::Pending => Some('!'),
            Self::Cleared => Some('*'),
        }
    }
}

/// Transaction description: free text or a `payee | memo` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Description {
    /// Plain description text
    Text(String),
    /// Description split on the first `|`
    PayeeMemo {
        /// Text before the separator
        payee: String,
        /// Text after the separator (may itself contain `|`)
        memo: String,
    },
}

impl Default for Description {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => write!(f, "{text}"),
            Self::PayeeMemo { payee, memo } => write!(f, "{payee} | {memo}"),
        }
    }
}

/// Colon-separated account name, stored as its segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountPath(pub Vec<String>);

impl AccountPath {
    /// Create a path from its segments.
    #[must_use]
    pub fn new<S: Into<String>>(segments: impl IntoIterator<Item = S>) -> Self {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// The path segments, outermost first.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Depth of the path (number of segments).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for AccountPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(":"))
    }
}

/// The account a posting moves value in or out of.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PostingAccount {
    /// A real account: `Assets:Cash`
    Real(AccountPath),
    /// A virtual account: `(Budget:Food)`
    Virtual(AccountPath),
    /// A balanced virtual account: `[Budget:Food]`
    VirtualBalanced(AccountPath),
}

impl PostingAccount {
    /// The account path regardless of kind.
    #[must_use]
    pub const fn path(&self) -> &AccountPath {
        match self {
            Self::Real(path) | Self::Virtual(path) | Self::VirtualBalanced(path) => path,
        }
    }
}

impl fmt::Display for PostingAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Real(path) => write!(f, "{path}"),
            Self::Virtual(path) => write!(f, "({path})"),
            Self::VirtualBalanced(path) => write!(f, "[{path}]"),
        }
    }
}

/// One line of a transaction moving value in or out of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    /// Posting-level clearing status
    pub status: Status,
    /// Target account
    pub account: PostingAccount,
    /// Amount, absent when it is left for the ledger tool to infer
    pub amount: Option<Amount>,
    /// `@` / `@@` price
    pub lot_price: Option<LotPrice>,
    /// `=` / `==` balance assertion
    pub assertion: Option<Assertion>,
    /// Tags from the posting's own comment and following comment lines
    pub tags: Vec<Tag>,
}

impl Posting {
    /// Create a posting without amount, price, assertion or tags.
    #[must_use]
    pub const fn new(account: PostingAccount) -> Self {
        Self {
            status: Status::Unmarked,
            account,
            amount: None,
            lot_price: None,
            assertion: None,
            tags: Vec::new(),
        }
    }

    /// Set the amount.
    #[must_use]
    pub fn with_amount(mut self, amount: Amount) -> Self {
        self.amount = Some(amount);
        self
    }

    /// Set the status.
    #[must_use]
    pub const fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }
}

/// A dated transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Primary date
    pub date: NaiveDate,
    /// Secondary date written as `date=posting_date`
    pub posting_date: Option<NaiveDate>,
    /// Transaction-level clearing status
    pub status: Status,
    /// Cheque number / code written in parentheses
    pub code: Option<String>,
    /// Description text
    pub description: Description,
    /// Postings in source order
    pub postings: Vec<Posting>,
    /// Tags attached to the transaction itself
    pub tags: Vec<Tag>,
}

impl Transaction {
    /// Create a transaction with the given date and description.
    #[must_use]
    pub fn new(date: NaiveDate, description: Description) -> Self {
        Self {
            date,
            posting_date: None,
            status: Status::Unmarked,
            code: None,
            description,
            postings: Vec::new(),
            tags: Vec::new(),
        }
    }

    /// Add a posting.
    #[must_use]
    pub fn with_posting(mut self, posting: Posting) -> Self {
        self.postings.push(posting);
        self
    }

    /// Find a tag by name on the transaction itself.
    #[must_use]
    pub fn tag(&self, name: &str) -> Option<&Tag> {
        self.tags.iter().find(|t| t.name == name)
    }
}

/// An `account` directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Declared account path
    pub path: AccountPath,
    /// Tags from the directive line, then from its indented comment lines
    pub tags: Vec<Tag>,
}

/// A `P` directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Date of the price
    pub date: NaiveDate,
    /// Commodity being priced
    pub commodity: String,
    /// Price of one unit
    pub amount: Amount,
}

/// A `commodity` directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commodity {
    /// Commodity symbol
    pub commodity: String,
    /// Display format, from the directive line or a `format` line
    pub format: Option<Amount>,
    /// Tags from the directive's comments
    pub tags: Vec<Tag>,
}

/// The cooked journal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Journal {
    /// Transactions in source order
    pub transactions: Vec<Transaction>,
    /// Account directives in source order
    pub accounts: Vec<Account>,
    /// Price directives in source order
    pub prices: Vec<Price>,
    /// Commodity directives in source order
    pub commodities: Vec<Commodity>,
    /// Amount of the last `D` directive
    pub default_commodity: Option<Amount>,
}

impl Journal {
    /// Create an empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the journal holds no entries at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
            && self.accounts.is_empty()
            && self.prices.is_empty()
            && self.commodities.is_empty()
            && self.default_commodity.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_transaction() {
        let txn = Transaction::new(date(2024, 1, 15), Description::Text("Groceries".into()))
            .with_posting(
                Posting::new(PostingAccount::Real(AccountPath::new(["Expenses", "Food"])))
                    .with_amount(Amount::new(dec!(50.00), "$")),
            )
            .with_posting(Posting::new(PostingAccount::Real(AccountPath::new([
                "Assets", "Cash",
            ]))));

        assert_eq!(txn.postings.len(), 2);
        assert_eq!(txn.status, Status::Unmarked);
        assert!(txn.postings[1].amount.is_none());
    }

    #[test]
    fn test_posting_account_display() {
        let path = AccountPath::new(["Budget", "Food"]);
        assert_eq!(PostingAccount::Real(path.clone()).to_string(), "Budget:Food");
        assert_eq!(PostingAccount::Virtual(path.clone()).to_string(), "(Budget:Food)");
        assert_eq!(PostingAccount::VirtualBalanced(path).to_string(), "[Budget:Food]");
    }

    #[test]
    fn test_description_display() {
        let desc = Description::PayeeMemo {
            payee: "Shop".into(),
            memo: "bread | milk".into(),
        };
        assert_eq!(desc.to_string(), "Shop | bread | milk");
        assert_eq!(Description::default().to_string(), "");
    }

    #[test]
    fn test_status_marker() {
        assert_eq!(Status::Cleared.marker(), Some('*'));
        assert_eq!(Status::Pending.marker(), Some('!'));
        assert_eq!(Status::Unmarked.marker(), None);
    }

    #[test]
    fn test_tag_display() {
        assert_eq!(Tag::new("secret").to_string(), "secret:");
        assert_eq!(Tag::with_value("type", "A").to_string(), "type: A");
    }

    #[test]
    fn test_journal_serde_round_trip() {
        let mut journal = Journal::new();
        assert!(journal.is_empty());
        journal.prices.push(Price {
            date: date(2020, 3, 1),
            commodity: "AAPL".into(),
            amount: Amount::new(dec!(120.5), "USD"),
        });
        let json = serde_json::to_string(&journal).unwrap();
        let back: Journal = serde_json::from_str(&json).unwrap();
        assert_eq!(back, journal);
    }
}

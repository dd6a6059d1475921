//! Core types for ledgerkit
//!
//! This crate provides the cooked journal model: the terminal, validated
//! artifact of parsing a ledger journal.
//!
//! - [`Journal`] - transactions, account directives, prices and commodities
//! - [`Transaction`] - a dated entry made of [`Posting`]s
//! - [`Amount`] - a decimal quantity with an optional commodity
//! - [`Tag`] - a `name[:value]` pair collected from comments
//!
//! # Example
//!
//! ```
//! use ledgerkit_core::{AccountPath, Amount, Description, Posting, PostingAccount, Transaction};
//! use rust_decimal_macros::dec;
//! use chrono::NaiveDate;
//!
//! let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
//! let txn = Transaction::new(date, Description::Text("Coffee".into()))
//!     .with_posting(
//!         Posting::new(PostingAccount::Real(AccountPath::new(["Expenses", "Coffee"])))
//!             .with_amount(Amount::new(dec!(4.50), "$")),
//!     );
//!
//! assert_eq!(txn.postings[0].account.to_string(), "Expenses:Coffee");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod amount;
pub mod journal;

pub use amount::{Amount, Assertion, AssertionKind, LotPrice, LotPriceKind};
pub use journal::{
    Account, AccountPath, Commodity, Description, Journal, Posting, PostingAccount, Price, Status,
    Tag, Transaction,
};

// Re-export commonly used external types
pub use chrono::NaiveDate;
pub use rust_decimal::Decimal;

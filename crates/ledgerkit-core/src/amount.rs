//! Amount types attached to postings and directives.
//!
//! An [`Amount`] is a signed decimal quantity with an optional commodity.
//! Postings may additionally carry a [`LotPrice`] (`@` / `@@`) and an
//! [`Assertion`] (`=` / `==`, optionally `=*`).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A quantity paired with an optional commodity.
///
/// # Examples
///
/// ```
/// use ledgerkit_core::Amount;
/// use rust_decimal_macros::dec;
///
/// let amount = Amount::new(dec!(-1), "$");
/// assert!(amount.is_negative());
/// assert_eq!(amount.commodity.as_deref(), Some("$"));
/// assert_eq!(amount.to_string(), "-1 $");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Amount {
    /// The signed decimal quantity
    pub quantity: Decimal,
    /// The commodity (e.g. "$", "USD", "Apple Shares"), if written
    pub commodity: Option<String>,
}

impl Amount {
    /// Create a new amount with a commodity.
    #[must_use]
    pub fn new(quantity: Decimal, commodity: impl Into<String>) -> Self {
        Self {
            quantity,
            commodity: Some(commodity.into()),
        }
    }

    /// Create an amount without a commodity.
    #[must_use]
    pub const fn bare(quantity: Decimal) -> Self {
        Self {
            quantity,
            commodity: None,
        }
    }

    /// Check if the amount is negative.
    #[must_use]
    pub const fn is_negative(&self) -> bool {
        self.quantity.is_sign_negative() && !self.quantity.is_zero()
    }

    /// Number of decimal places written in the source.
    #[must_use]
    pub const fn scale(&self) -> u32 {
        self.quantity.scale()
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.commodity {
            Some(commodity) => write!(f, "{} {commodity}", self.quantity),
            None => write!(f, "{}", self.quantity),
        }
    }
}

/// Whether a lot price is per unit (`@`) or for the whole posting (`@@`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LotPriceKind {
    /// Per-unit price (`@`)
    Unit,
    /// Total price (`@@`)
    Total,
}

/// Acquisition price attached to a posting amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotPrice {
    /// Unit or total
    pub kind: LotPriceKind,
    /// Whether the price was written in parentheses (`(@)`, a virtual price)
    pub is_virtual: bool,
    /// The price amount
    pub amount: Amount,
}

impl fmt::Display for LotPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let at = match self.kind {
            LotPriceKind::Unit => "@",
            LotPriceKind::Total => "@@",
        };
        if self.is_virtual {
            write!(f, "({at}) {}", self.amount)
        } else {
            write!(f, "{at} {}", self.amount)
        }
    }
}

/// Strength of a balance assertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssertionKind {
    /// `=` asserts the balance of the posting's commodity only
    Normal,
    /// `==` asserts there are no other commodities in the account
    Strong,
}

/// A balance assertion on a posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assertion {
    /// Normal or strong
    pub kind: AssertionKind,
    /// `*` was present: the balance includes subaccounts
    pub subaccounts: bool,
    /// The expected balance
    pub amount: Amount,
}

impl fmt::Display for Assertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            AssertionKind::Normal => write!(f, "=")?,
            AssertionKind::Strong => write!(f, "==")?,
        }
        if self.subaccounts {
            write!(f, "*")?;
        }
        write!(f, " {}", self.amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_amount_display() {
        assert_eq!(Amount::new(dec!(10.50), "USD").to_string(), "10.50 USD");
        assert_eq!(Amount::bare(dec!(3)).to_string(), "3");
    }

    #[test]
    fn test_amount_sign() {
        assert!(Amount::new(dec!(-0.01), "$").is_negative());
        assert!(!Amount::new(dec!(0), "$").is_negative());
        assert_eq!(Amount::new(dec!(1000.00), "CAD").scale(), 2);
    }

    #[test]
    fn test_lot_price_display() {
        let price = LotPrice {
            kind: LotPriceKind::Total,
            is_virtual: true,
            amount: Amount::new(dec!(5), "EUR"),
        };
        assert_eq!(price.to_string(), "(@@) 5 EUR");
    }

    #[test]
    fn test_assertion_display() {
        let assertion = Assertion {
            kind: AssertionKind::Strong,
            subaccounts: true,
            amount: Amount::new(dec!(100), "$"),
        };
        assert_eq!(assertion.to_string(), "==* 100 $");
    }
}

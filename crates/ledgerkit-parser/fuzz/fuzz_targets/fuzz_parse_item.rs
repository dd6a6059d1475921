#![no_main]
//! Fuzz target for single journal items.
//!
//! Builds inputs shaped like real items to reach the grammar and lowering
//! paths that random bytes rarely get to.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use ledgerkit_parser::{parse_to_cooked_with, CookConfig};

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    date_year: u16,
    date_month: u8,
    date_day: u8,
    item_type: u8,
    account: String,
    amount: i64,
    commodity: String,
    description: String,
}

impl FuzzInput {
    fn to_journal(&self) -> String {
        // Month and day are deliberately allowed to be out of range.
        let date = format!(
            "{:04}/{:02}/{:02}",
            self.date_year % 3000,
            self.date_month % 14,
            self.date_day % 33
        );

        let account: String = self
            .account
            .chars()
            .filter(|c| !matches!(c, '\n' | '\r' | ';'))
            .take(50)
            .collect();
        let account = if account.trim().is_empty() {
            "Assets:Test".to_string()
        } else {
            account
        };

        let commodity: String = self
            .commodity
            .chars()
            .filter(|c| c.is_alphabetic())
            .take(10)
            .collect();
        let commodity = if commodity.is_empty() {
            "USD".to_string()
        } else {
            commodity
        };

        let description: String = self
            .description
            .chars()
            .filter(|c| *c != '\n' && *c != '\r')
            .take(100)
            .collect();

        match self.item_type % 8 {
            0 => format!(
                "{date} * {description}\n    {account}  {} {commodity}\n    Assets:Other\n",
                self.amount
            ),
            1 => format!("{date}={date} ! (1) {description}\n    ({account})  {commodity}{}\n", self.amount),
            2 => format!("account {account} ; {description}\n    ; {description}\n"),
            3 => format!("P {date} {commodity} {} USD\n", self.amount),
            4 => format!("commodity {commodity}\n    format {} {commodity}\n", self.amount),
            5 => format!("D {}{commodity}\n", self.amount),
            6 => format!("{date} x\n    [{account}]  {} {commodity} @@ $1 == $0\n", self.amount),
            _ => format!("; {description}\n"),
        }
    }
}

fuzz_target!(|input: FuzzInput| {
    let journal = input.to_journal();
    let _ = parse_to_cooked_with(&journal, &CookConfig::new(2024));
});

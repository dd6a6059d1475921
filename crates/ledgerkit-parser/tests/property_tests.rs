//! Property-based tests for the tokenizer and the lowering pipeline.
//!
//! These tests verify invariants that should hold for all inputs:
//! - Token images are exact slices of the source
//! - Tokens are ordered and never overlap
//! - Journal item order survives both lowering passes
//! - Amounts cook to the decimal they spell, whatever the token order

use ledgerkit_core::{Amount, Decimal};
use ledgerkit_parser::{parse_to_cooked_with, tokenize, CookConfig, TokenKind};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

/// Arbitrary text drawn from the characters ledger files are made of.
fn arb_ledgerish_text() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            4 => "[a-zA-Z0-9]",
            2 => Just(" ".to_string()),
            1 => Just("  ".to_string()),
            1 => Just("\n".to_string()),
            1 => Just("\t".to_string()),
            1 => "[;:#*!@=()\\[\\]|,./$\"-]",
            1 => "[€£éü]",
        ],
        0..120,
    )
    .prop_map(|parts| parts.concat())
}

fn arb_segment() -> impl Strategy<Value = String> {
    "[A-Z][a-z]{1,8}"
}

fn arb_account() -> impl Strategy<Value = String> {
    prop::collection::vec(arb_segment(), 1..4).prop_map(|segments| segments.join(":"))
}

fn arb_commodity() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("$".to_string()),
        Just("€".to_string()),
        "[A-Z]{3}",
    ]
}

/// Whole units and cents.
fn arb_quantity() -> impl Strategy<Value = (u32, u32)> {
    (0u32..1_000_000, 0u32..100)
}

fn arb_date() -> impl Strategy<Value = String> {
    (2000i32..2030, 1u32..=12, 1u32..=28).prop_map(|(y, m, d)| format!("{y}/{m:02}/{d:02}"))
}

#[derive(Debug, Clone)]
enum Item {
    Transaction { date: String, payee: String, account: String },
    Account(String),
    Price { date: String, commodity: String, units: u32 },
}

fn arb_item() -> impl Strategy<Value = Item> {
    prop_oneof![
        (arb_date(), "[a-z]{1,10}", arb_account()).prop_map(|(date, payee, account)| {
            Item::Transaction {
                date,
                payee,
                account,
            }
        }),
        arb_account().prop_map(Item::Account),
        (arb_date(), "[A-Z]{3}", 1u32..1000).prop_map(|(date, commodity, units)| Item::Price {
            date,
            commodity,
            units,
        }),
    ]
}

fn render(items: &[Item]) -> String {
    let mut source = String::new();
    for item in items {
        match item {
            Item::Transaction {
                date,
                payee,
                account,
            } => {
                source.push_str(&format!("{date} {payee}\n    {account}  $1\n    Assets:Cash\n"));
            }
            Item::Account(name) => source.push_str(&format!("account {name}\n")),
            Item::Price {
                date,
                commodity,
                units,
            } => source.push_str(&format!("P {date} {commodity} {units} USD\n")),
        }
    }
    source
}

// ============================================================================
// Tokenizer Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Every token's image is exactly the source text at its offset.
    #[test]
    fn prop_token_image_matches_source(source in arb_ledgerish_text()) {
        let result = tokenize(&source);
        for token in &result.tokens {
            prop_assert_eq!(token.image, &source[token.offset..token.offset + token.len]);
            prop_assert_eq!(token.span().text(&source), token.image);
        }
    }

    /// Tokens and lex errors never overlap and appear in source order.
    #[test]
    fn prop_tokens_ordered(source in arb_ledgerish_text()) {
        let result = tokenize(&source);
        let mut spans: Vec<_> = result.tokens.iter().map(|t| (t.offset, t.end())).collect();
        spans.extend(result.errors.iter().map(|e| (e.offset, e.offset + e.len)));
        spans.sort_unstable();
        for pair in spans.windows(2) {
            prop_assert!(pair[0].1 <= pair[1].0, "overlap: {:?}", pair);
        }
        for (start, end) in spans {
            prop_assert!(start < end);
            prop_assert!(end <= source.len());
        }
    }

    /// A line break always returns the tokenizer to line-start mode.
    #[test]
    fn prop_line_break_resets_mode(garbage in "[a-z;:|()@=]{0,20}", account in arb_account()) {
        let source = format!("2024/01/01 {garbage}\naccount {account}\n");
        let result = tokenize(&source);
        let keyword = result
            .tokens
            .iter()
            .find(|t| t.kind == TokenKind::AccountKeyword)
            .map(|t| t.offset);
        prop_assert_eq!(keyword, source.find("\naccount").map(|i| i + 1));
    }
}

// ============================================================================
// Lowering Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Transactions, account directives and prices keep their source order.
    #[test]
    fn prop_item_order_preserved(items in prop::collection::vec(arb_item(), 0..12)) {
        let source = render(&items);
        let result = parse_to_cooked_with(&source, &CookConfig::new(2024)).unwrap();
        prop_assert!(result.lex_errors.is_empty(), "lex errors: {:?}", result.lex_errors);
        prop_assert!(result.parse_errors.is_empty(), "parse errors: {:?}", result.parse_errors);

        let payees: Vec<_> = items.iter().filter_map(|item| match item {
            Item::Transaction { payee, .. } => Some(payee.clone()),
            _ => None,
        }).collect();
        let cooked_payees: Vec<_> = result.journal.transactions.iter()
            .map(|t| t.description.to_string())
            .collect();
        prop_assert_eq!(payees, cooked_payees);

        let accounts: Vec<_> = items.iter().filter_map(|item| match item {
            Item::Account(name) => Some(name.clone()),
            _ => None,
        }).collect();
        let cooked_accounts: Vec<_> = result.journal.accounts.iter()
            .map(|a| a.path.to_string())
            .collect();
        prop_assert_eq!(accounts, cooked_accounts);

        let prices: Vec<_> = items.iter().filter_map(|item| match item {
            Item::Price { commodity, units, .. } => Some((commodity.clone(), Decimal::from(*units))),
            _ => None,
        }).collect();
        let cooked_prices: Vec<_> = result.journal.prices.iter()
            .map(|p| (p.commodity.clone(), p.amount.quantity))
            .collect();
        prop_assert_eq!(prices, cooked_prices);
    }

    /// Sign, commodity and number cook to the same amount in every written order.
    #[test]
    fn prop_amount_orders_agree(
        (units, cents) in arb_quantity(),
        commodity in arb_commodity(),
        negative in any::<bool>(),
        layout in 0usize..5,
    ) {
        let number = format!("{units}.{cents:02}");
        let sign = if negative { "-" } else { "" };
        let written = match layout {
            0 => format!("{sign}{commodity}{number}"),
            1 => format!("{sign}{commodity} {number}"),
            2 => format!("{commodity}{sign}{number}"),
            3 => format!("{commodity} {sign}{number}"),
            _ => format!("{sign}{number} {commodity}"),
        };
        let source = format!("2024/01/01 x\n    Expenses:Misc  {written}\n");
        let result = parse_to_cooked_with(&source, &CookConfig::new(2024)).unwrap();
        prop_assert!(result.lex_errors.is_empty(), "lex errors for {}: {:?}", written, result.lex_errors);
        prop_assert!(result.parse_errors.is_empty(), "parse errors for {}: {:?}", written, result.parse_errors);

        let mut quantity = Decimal::from(units) + Decimal::new(i64::from(cents), 2);
        if negative {
            quantity = -quantity;
        }
        let amount = result.journal.transactions[0].postings[0].amount.clone();
        prop_assert_eq!(amount, Some(Amount::new(quantity, commodity)));
    }
}

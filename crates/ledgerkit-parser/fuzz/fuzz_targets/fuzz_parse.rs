#![no_main]
//! Fuzz target for the whole front end.
//!
//! Arbitrary UTF-8 must never panic any stage: lex and parse problems are
//! collected, lowering problems come back as `LowerError`.

use libfuzzer_sys::fuzz_target;
use ledgerkit_parser::{parse_to_cooked_with, CookConfig};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let _ = parse_to_cooked_with(input, &CookConfig::new(2024));
    }
});

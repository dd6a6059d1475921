//! Front-end performance benchmarks.
//!
//! Run with: cargo bench -p ledgerkit-parser

#![allow(missing_docs)]

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;

use ledgerkit_parser::{parse_to_cooked_with, parse_to_cst, tokenize, CookConfig};

/// Generate a synthetic journal with N transactions.
fn generate_journal(num_transactions: usize) -> String {
    let mut lines = vec![
        "; synthetic journal".to_string(),
        "commodity $1,000.00".to_string(),
        "D $1.00".to_string(),
        "account Assets:Bank:Checking ; type: checking".to_string(),
        "account Expenses:Food".to_string(),
        "account Expenses:Coffee".to_string(),
        "account Expenses:Groceries".to_string(),
        "account Expenses:Transport".to_string(),
        "P 2024/01/01 CAD $0.74".to_string(),
        String::new(),
    ];

    let categories = ["Food", "Coffee", "Groceries", "Transport"];
    let payees = ["Store A", "Store B", "Cafe", "Gas Station", "Supermarket"];
    let mut day = 1;
    let mut month = 1;
    let mut year = 2024;

    for i in 0..num_transactions {
        let category = categories[i % categories.len()];
        let payee = payees[i % payees.len()];
        let amount = format!("{}.{:02}", 10 + i % 100, i % 100);

        lines.push(format!(
            "{year:04}/{month:02}/{day:02} * ({i}) {payee} | Transaction {i} ; batch: {}",
            i / 10
        ));
        lines.push(format!("    Expenses:{category}  ${amount}"));
        lines.push(format!("    Assets:Bank:Checking  -${amount}"));
        lines.push("    ; reviewed:".to_string());
        lines.push(String::new());

        day += 1;
        if day > 28 {
            day = 1;
            month += 1;
            if month > 12 {
                month = 1;
                year += 1;
            }
        }
    }

    lines.join("\n")
}

fn bench_tokenize(c: &mut Criterion) {
    let journal = generate_journal(100);

    let mut group = c.benchmark_group("tokenize");
    group.throughput(Throughput::Bytes(journal.len() as u64));

    group.bench_function("100_transactions", |b| {
        b.iter(|| tokenize(black_box(&journal)));
    });

    group.finish();
}

fn bench_parse_small(c: &mut Criterion) {
    let journal = generate_journal(10);

    let mut group = c.benchmark_group("parse_small");
    group.throughput(Throughput::Bytes(journal.len() as u64));

    group.bench_function("10_transactions", |b| {
        b.iter(|| parse_to_cst(black_box(&journal)));
    });

    group.finish();
}

fn bench_parse_medium(c: &mut Criterion) {
    let journal = generate_journal(100);

    let mut group = c.benchmark_group("parse_medium");
    group.throughput(Throughput::Bytes(journal.len() as u64));

    group.bench_function("100_transactions", |b| {
        b.iter(|| parse_to_cst(black_box(&journal)));
    });

    group.finish();
}

fn bench_cook_scaling(c: &mut Criterion) {
    let config = CookConfig::new(2024);
    let mut group = c.benchmark_group("cook_scaling");

    for size in [10, 100, 1000] {
        let journal = generate_journal(size);
        group.throughput(Throughput::Bytes(journal.len() as u64));

        group.bench_with_input(BenchmarkId::from_parameter(size), &journal, |b, journal| {
            b.iter(|| parse_to_cooked_with(black_box(journal), &config));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_tokenize,
    bench_parse_small,
    bench_parse_medium,
    bench_cook_scaling
);
criterion_main!(benches);

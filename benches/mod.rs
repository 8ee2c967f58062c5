use criterion::{criterion_group, criterion_main};

mod cli;

criterion_group!(
    benches,
    cli::parse::bench_tokenize_and_parse,
    cli::parse::bench_resolve,
    cli::terminal::bench_feed_line,
    cli::terminal::bench_render
);
criterion_main!(benches);

use criterion::{Criterion, Throughput};
use jelcli::cli::terminal::{Event, Terminal};
use std::hint::black_box;

const KEYS: &[u8] = b"hw gpio set 3 1\x1b[D\x1b[D\x1b[3~0\x1b[H\x1b[1;2C\x1b[F\r";

pub fn bench_feed_line(c: &mut Criterion) {
    let mut group = c.benchmark_group("terminal");
    group.throughput(Throughput::Bytes(KEYS.len() as u64));
    group.bench_function("feed_line", |b| {
        let mut term = Terminal::default();
        b.iter(|| {
            let (_, event) = term.feed_all(black_box(KEYS));
            assert!(matches!(event, Event::Submit(_)));
        })
    });
    group.finish();
}

pub fn bench_render(c: &mut Criterion) {
    let mut term = Terminal::default();
    term.feed_all(b"sensors read 4 --average 16\x1b[D\x1b[D\x1b[1;2D\x1b[1;2D");
    let mut out = String::with_capacity(256);
    c.bench_function("render", |b| {
        b.iter(|| {
            out.clear();
            term.render(black_box("> "), &mut out).unwrap();
            black_box(out.len());
        })
    });
}

use criterion::{Criterion, Throughput};
use jelcli::cli::Error;
use jelcli::cli::args::{ParamSpec, parse_with};
use jelcli::cli::io::Io;
use jelcli::cli::pool::StringPool;
use jelcli::cli::registry::{Command, Library, Registry};
use jelcli::cli::tokenizer::tokenize;
use std::hint::black_box;

const LINE: &str = "os reboot 10 -f";

fn nop(_: &mut Io<'_>) -> Result<(), Error> {
    Ok(())
}

static OS: Library = Library::new(
    "os",
    "Operating system",
    &[
        Command::new("memuse", "", "", nop),
        Command::new("uptime", "", "", nop),
        Command::new("reboot", "%?u%?s", "", nop),
    ],
);

pub fn bench_tokenize_and_parse(c: &mut Criterion) {
    let pool = StringPool::new();
    let spec = ParamSpec::parse("%?u%?s").unwrap();
    let mut group = c.benchmark_group("parse");
    group.throughput(Throughput::Bytes(LINE.len() as u64));
    group.bench_function("tokenize_and_parse", |b| {
        b.iter(|| {
            let tokens = tokenize(black_box(LINE));
            let args = parse_with(&spec, &tokens[2..], &pool).unwrap();
            black_box(args.unsigned(0));
        })
    });
    group.finish();
}

pub fn bench_resolve(c: &mut Criterion) {
    let mut registry = Registry::new();
    registry.register_system(&OS).unwrap();
    let tokens = tokenize(LINE);
    c.bench_function("resolve", |b| {
        b.iter(|| black_box(registry.resolve(black_box(&tokens)).unwrap().command.name))
    });
}

use jelcli::cli::Error;
use jelcli::cli::args::{Kind, parse};
use jelcli::cli::config::STRING_POOL_SIZE;
use jelcli::cli::pool::StringPool;
use jelcli::cli::tokenizer::tokenize;
use rand::Rng;
use rand::seq::SliceRandom;

#[test]
fn reboot_line_end_to_end() {
    let pool = StringPool::new();
    let tokens = tokenize("os reboot 10 -f");
    assert_eq!(tokens.as_slice(), &["os", "reboot", "10", "-f"]);

    let args = parse("%?u%?s", &tokens[2..], &pool).unwrap();
    assert_eq!(args.unsigned(0), Some(10));
    assert_eq!(args.get(0).map(|a| a.kind()), Some(Kind::Unsigned));
    assert_eq!(args.string(1), Some("-f"));
}

#[test]
fn optional_slots_are_matched_by_kind() {
    let pool = StringPool::new();

    let args = parse("%?d%?f%?s", &["name"], &pool).unwrap();
    assert_eq!(args.len(), 3);
    assert_eq!(args.present(), 1);
    assert_eq!(args.string(2), Some("name"));

    let args = parse("%u%?d", &["5", "-5"], &pool).unwrap();
    assert_eq!(args.unsigned(0), Some(5));
    assert_eq!(args.signed(1), Some(-5));

    let err = parse("%u%?d", &["5", "x"], &pool).unwrap_err();
    assert_eq!(err.error, Error::TooManyArguments);
    assert_eq!(err.token, Some(1));
}

#[test]
fn failed_parses_return_every_lease() {
    let kinds = ["%s", "%?s", "%u", "%?d", "%f"];
    let words = ["alpha", "12", "-3", "2.5", "beta", "x"];
    let pool = StringPool::with_size(4);
    let mut rng = rand::thread_rng();

    for _ in 0..500 {
        let mut spec = String::new();
        let mut optional = false;
        for _ in 0..rng.gen_range(0..6) {
            let d = *kinds.choose(&mut rng).unwrap();
            // required descriptors may not follow optional ones
            if optional && !d.contains('?') {
                continue;
            }
            optional |= d.contains('?');
            spec.push_str(d);
        }
        let tokens: Vec<&str> = (0..rng.gen_range(0..7))
            .map(|_| *words.choose(&mut rng).unwrap())
            .collect();

        let before = pool.free_count();
        match parse(&spec, &tokens, &pool) {
            Ok(args) => {
                let strings = args.iter().flatten().filter(|a| a.kind() == Kind::String).count();
                assert_eq!(pool.free_count(), before - strings);
            }
            Err(_) => assert_eq!(pool.free_count(), before, "{} {:?}", spec, tokens),
        }
        assert_eq!(pool.free_count(), 4);
    }
}

#[test]
fn exhausted_pool_is_an_error() {
    let pool = StringPool::new();
    let held: Vec<_> = (0..STRING_POOL_SIZE)
        .map(|i| pool.acquire(if i % 2 == 0 { "a" } else { "b" }).unwrap())
        .collect();

    let err = parse("%u%s", &["1", "name"], &pool).unwrap_err();
    assert_eq!(err.error, Error::NoFreeStringsAvailable);
    assert_eq!(err.token, Some(1));

    drop(held);
    assert!(parse("%u%s", &["1", "name"], &pool).is_ok());
}

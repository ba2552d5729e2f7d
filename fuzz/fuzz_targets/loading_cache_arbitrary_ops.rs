#![no_main]

use std::sync::Arc;
use std::time::Duration;

use decisionkit::cache::{LoadingCache, ManualClock};
use decisionkit::cancel::CancelToken;
use libfuzzer_sys::fuzz_target;

// Fuzz arbitrary get/peek/delete/advance sequences on a single-threaded
// LoadingCache with a manual clock, including failing and panicking loaders.
fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let capacity = usize::from(data[0] % 8) + 1;
    let clock = Arc::new(ManualClock::new());
    let cache: LoadingCache<u8> = LoadingCache::with_clock(capacity, clock.clone());
    let token = CancelToken::new();

    for chunk in data[1..].chunks_exact(2) {
        let value = chunk[1] % 32;
        let key = value.to_string();
        let ttl = Duration::from_millis(u64::from(chunk[0] >> 3) * 10);

        match chunk[0] % 6 {
            0 | 1 => {
                let result = cache.get(&token, &key, ttl, |_, _| Ok::<_, ()>(value));
                assert_eq!(result, Ok(value));
            }
            2 => {
                let fresh = cache.peek(&key);
                let result = cache.get(&token, &key, ttl, |_, _| Err::<u8, _>(()));
                assert_eq!(result.ok(), fresh.filter(|_| !ttl.is_zero()));
            }
            3 => {
                if let Some(cached) = cache.peek(&key) {
                    assert_eq!(cached, value);
                }
            }
            4 => {
                cache.delete(&key);
                assert!(!cache.contains(&key));
            }
            _ => clock.advance(Duration::from_millis(u64::from(chunk[1]))),
        }

        assert!(cache.len() <= capacity);
        cache.check_invariants().unwrap();
    }
});

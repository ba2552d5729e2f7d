#![no_main]

use decisionkit::ds::{SlotId, SlotLinks};
use libfuzzer_sys::fuzz_target;

// Fuzz arbitrary operation sequences on SlotLinks
//
// Tests random sequences of pop_free, push_free, push_front, move_to_front
// and unlink, checking list/free-stack invariants after every step.
fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let capacity = usize::from(data[0] % 16) + 1;
    let mut links = SlotLinks::new(capacity);

    for chunk in data[1..].chunks_exact(2) {
        let op = chunk[0] % 5;
        let Some(id) = SlotId::from_index(usize::from(chunk[1]) % capacity + 1) else {
            continue;
        };

        match op {
            0 => {
                if let Some(popped) = links.pop_free() {
                    assert!(!links.is_free(popped));
                    assert!(links.push_front(popped));
                    assert_eq!(links.front(), Some(popped));
                }
            }
            1 => {
                let was_free = links.is_free(id);
                assert_eq!(links.push_free(id), !was_free);
                assert!(links.is_free(id));
            }
            2 => {
                let linked = links.is_linked(id);
                assert_eq!(links.move_to_front(id), linked);
                if linked {
                    assert_eq!(links.front(), Some(id));
                }
            }
            3 => {
                // Detach then reattach at the front.
                if links.unlink(id) {
                    assert!(!links.is_linked(id));
                    assert!(links.push_front(id));
                }
            }
            _ => {
                let forward: Vec<SlotId> = links.iter().collect();
                let mut backward: Vec<SlotId> = links.iter_lru().collect();
                backward.reverse();
                assert_eq!(forward, backward);
                assert_eq!(forward.len(), links.len());
            }
        }

        assert_eq!(links.len() + links.free_len(), capacity);
        links.check_invariants().unwrap();
    }
});

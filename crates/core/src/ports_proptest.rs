//! Property test for the port allocator's core uniqueness invariant: for
//! any interleaving of allocate/release, no two names ever hold the same
//! port at once.

use super::*;
use proptest::prelude::*;
use std::collections::HashMap;

#[derive(Debug, Clone)]
enum Op {
    Allocate(u8),
    Release(u8),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..6).prop_map(Op::Allocate),
        (0u8..6).prop_map(Op::Release),
    ]
}

proptest! {
    #[test]
    fn no_two_names_ever_share_a_port(ops in prop::collection::vec(op_strategy(), 0..200)) {
        let alloc = PortAllocator::new(8000, 8005);
        let mut held_by_name: HashMap<String, u16> = HashMap::new();

        for op in ops {
            match op {
                Op::Allocate(n) => {
                    let name = format!("n{n}");
                    if held_by_name.contains_key(&name) {
                        continue;
                    }
                    if let Ok(port) = alloc.allocate(&name) {
                        for (other_name, other_port) in &held_by_name {
                            prop_assert_ne!(
                                *other_port, port,
                                "port {} held by both {:?} and {:?}", port, other_name, name
                            );
                        }
                        held_by_name.insert(name, port);
                    }
                }
                Op::Release(n) => {
                    let name = format!("n{n}");
                    if let Some(port) = held_by_name.remove(&name) {
                        alloc.release(port).unwrap();
                    }
                }
            }
        }

        // Every port this model thinks is held must still read as allocated,
        // and nothing else in range should.
        for port in 8000u16..=8005 {
            let expected_held = held_by_name.values().any(|p| *p == port);
            prop_assert_eq!(alloc.is_allocated(port), expected_held);
        }
    }
}

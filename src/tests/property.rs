//! Property-based tests for verifying system invariants.

#[cfg(test)]
mod property_tests {
    use crate::arch::DefaultArch;
    use crate::kernel::Kernel;
    use crate::sync::ReentrantLock;
    use crate::tests::helpers::{entry, test_config, SimpleRng, Trace};
    use crate::thread::ThreadId;
    use alloc::vec::Vec;

    #[test]
    fn property_count_tracks_nesting() {
        let mut rng = SimpleRng::new(0x12345678);
        let me = ThreadId::new(0);

        for _ in 0..50 {
            let lock = ReentrantLock::new();
            let acquires = rng.gen_range(1, 20) as u32;
            let releases = rng.gen_range(0, acquires as u64 + 1) as u32;

            for _ in 0..acquires {
                assert!(lock.acquire(me));
            }
            for _ in 0..releases {
                lock.release(me);
            }

            let depth = acquires - releases;
            assert_eq!(lock.count(), depth);
            assert_eq!(lock.is_held(), depth > 0);
            assert_eq!(lock.owner(), if depth > 0 { Some(me) } else { None });
        }
    }

    #[test]
    fn property_two_owners_match_model() {
        let mut rng = SimpleRng::new(0xDEADBEEF);
        let lock = ReentrantLock::new();

        // Model: (owner, depth).
        let mut model: Option<(usize, u32)> = None;

        for _ in 0..2000 {
            let who = rng.gen_range(0, 2) as usize;
            let me = ThreadId::new(who);

            if rng.gen_bool() {
                let expected = match model {
                    None => {
                        model = Some((who, 1));
                        true
                    }
                    Some((owner, depth)) if owner == who => {
                        model = Some((owner, depth + 1));
                        true
                    }
                    Some(_) => false,
                };
                assert_eq!(lock.acquire(me), expected);
            } else if let Some((owner, depth)) = model {
                // Only the owner may release.
                if owner == who {
                    lock.release(me);
                    model = if depth > 1 { Some((owner, depth - 1)) } else { None };
                }
            }

            assert_eq!(lock.owner().map(ThreadId::index), model.map(|(o, _)| o));
            assert_eq!(lock.count(), model.map_or(0, |(_, d)| d));
        }
    }

    /// Replay of the dispatch loop over plain data: which thread records
    /// an event at each dispatch.
    fn simulate(rounds: &[usize]) -> Vec<usize> {
        let mut remaining = rounds.to_vec();
        let mut active = alloc::vec![true; rounds.len()];
        let mut cursor: Option<usize> = None;
        let mut trace = Vec::new();

        loop {
            let mut next = None;
            for _ in 0..rounds.len() {
                let slot = cursor.map_or(0, |c| (c + 1) % rounds.len());
                cursor = Some(slot);
                if active[slot] {
                    next = Some(slot);
                    break;
                }
            }
            let Some(id) = next else { break };

            if remaining[id] > 0 {
                trace.push(id);
                remaining[id] -= 1;
            } else {
                active[id] = false;
            }
        }
        trace
    }

    #[test]
    fn property_dispatch_order_is_round_robin() {
        let mut rng = SimpleRng::new(0xC0FFEE);

        for _ in 0..20 {
            let rounds: [usize; 5] = core::array::from_fn(|_| rng.gen_range(0, 6) as usize);
            let trace = Trace::new();
            let worker = entry(|cx| {
                for _ in 0..rounds[cx.id().index()] {
                    trace.record(cx.id().index());
                    cx.yield_now();
                }
            });

            let kernel: Kernel<'_, DefaultArch, 5> =
                Kernel::new([&worker, &worker, &worker, &worker, &worker], test_config());
            kernel.run().unwrap();

            assert_eq!(trace.events(), simulate(&rounds));

            let total: usize = rounds.iter().sum();
            let stats = kernel.stats();
            assert_eq!(stats.yields, total + 5);
            assert_eq!(stats.dispatches, stats.yields);
            assert_eq!(stats.reclaimed, 5);
        }
    }

    #[test]
    fn property_lock_never_shared_under_random_yields() {
        let mut rng = SimpleRng::new(0x5EED);

        for _ in 0..10 {
            // Per-thread plan: how many times to yield while holding.
            let plans: [Vec<usize>; 3] =
                core::array::from_fn(|_| (0..8).map(|_| rng.gen_range(0, 3) as usize).collect());
            let lock = ReentrantLock::new();
            let inside = Trace::new();
            let worker = entry(|cx| {
                let me = cx.id();
                for &holds in &plans[me.index()] {
                    if lock.acquire(me) {
                        inside.record((me.index(), true));
                        for _ in 0..holds {
                            cx.yield_now();
                        }
                        inside.record((me.index(), false));
                        lock.release(me);
                    }
                    cx.yield_now();
                }
            });

            let kernel: Kernel<'_, DefaultArch, 3> = Kernel::new([&worker, &worker, &worker], test_config());
            kernel.run().unwrap();

            // Enter/leave events must nest: no one enters while another is in.
            let mut holder: Option<usize> = None;
            for (id, entering) in inside.events() {
                if entering {
                    assert_eq!(holder, None);
                    holder = Some(id);
                } else {
                    assert_eq!(holder, Some(id));
                    holder = None;
                }
            }
            assert_eq!(holder, None);
            assert!(!lock.is_held());
        }
    }
}

//! The three scheduler backends must agree on dequeue order for any
//! sequence of operations.

use std::sync::Arc;

use chronon::{
    Event, EventKey, HeapScheduler, ListScheduler, MapScheduler, ScheduledEvent, Scheduler,
    SchedulerKind, Simulator, Time,
};
use parking_lot::Mutex;
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Op {
    Insert(u64),
    RemoveNext,
    /// Remove the n-th (modulo) key inserted so far.
    Remove(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u64..50).prop_map(Op::Insert),
        2 => Just(Op::RemoveNext),
        1 => any::<usize>().prop_map(Op::Remove),
    ]
}

fn entry(key: EventKey) -> ScheduledEvent {
    ScheduledEvent::new(key, Arc::new(Event::new(Box::new(|_| {}))))
}

/// Applies `ops` and returns the observable trace: every key handed back
/// by `remove_next`/`remove`, then the drained remainder.
fn replay(s: &mut dyn Scheduler, ops: &[Op]) -> Vec<Option<EventKey>> {
    let mut next_uid = 1;
    let mut inserted = Vec::new();
    let mut out = Vec::new();

    for op in ops {
        match *op {
            Op::Insert(ts) => {
                let key = EventKey { ts, uid: next_uid };
                next_uid += 1;
                inserted.push(key);
                s.insert(entry(key));
            }
            Op::RemoveNext => {
                out.push(s.peek_next_key());
                out.push(s.remove_next().map(|e| e.key));
            }
            Op::Remove(n) => {
                if !inserted.is_empty() {
                    let key = inserted[n % inserted.len()];
                    out.push(s.remove(key).map(|e| e.key));
                }
            }
        }
        assert_eq!(s.len() == 0, s.is_empty());
    }
    while let Some(e) = s.remove_next() {
        out.push(Some(e.key));
    }
    out
}

proptest! {
    #[test]
    fn backends_agree(ops in prop::collection::vec(op_strategy(), 0..200)) {
        let list = replay(&mut ListScheduler::new(), &ops);
        let heap = replay(&mut HeapScheduler::new(), &ops);
        let map = replay(&mut MapScheduler::new(), &ops);
        prop_assert_eq!(&list, &heap);
        prop_assert_eq!(&list, &map);
    }

    #[test]
    fn drain_is_sorted(stamps in prop::collection::vec(0u64..20, 0..100)) {
        let mut heap = HeapScheduler::new();
        for (i, ts) in stamps.iter().enumerate() {
            heap.insert(entry(EventKey { ts: *ts, uid: i as u64 + 1 }));
        }
        let mut last: Option<EventKey> = None;
        while let Some(e) = heap.remove_next() {
            if let Some(prev) = last {
                prop_assert!(prev < e.key);
            }
            last = Some(e.key);
        }
    }

    #[test]
    fn simulator_order_is_backend_independent(stamps in prop::collection::vec(0i64..30, 1..60)) {
        let run = |kind: SchedulerKind| {
            let mut sim = Simulator::with_scheduler_kind(kind);
            let order = Arc::new(Mutex::new(Vec::new()));
            for (i, ts) in stamps.iter().enumerate() {
                let o = order.clone();
                sim.schedule(Time::from_time_step(*ts), move |sim| {
                    o.lock().push((i, sim.now().get_time_step()));
                })
                .unwrap();
            }
            sim.run().unwrap();
            let result = order.lock().clone();
            result
        };

        let list = run(SchedulerKind::List);
        prop_assert_eq!(list.len(), stamps.len());
        prop_assert_eq!(&list, &run(SchedulerKind::Heap));
        prop_assert_eq!(&list, &run(SchedulerKind::Map));
    }
}

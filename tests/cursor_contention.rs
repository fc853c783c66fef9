use chrono::{TimeZone, Utc};
use std::sync::Arc;
use std::thread;
use streamhub::{ContentPath, CursorTracker, MemoryStore, NoPause, TimedGroup};

const NAMESPACE: &str = "/last/";
const WRITERS: u32 = 8;
const PROPOSALS_PER_WRITER: u32 = 50;

fn minute_number(n: u32) -> ContentPath {
    let start = Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap();
    ContentPath::minute(start + chrono::Duration::minutes(i64::from(n)))
}

/// Leaderless writers racing the same cursor: the stored value must end at
/// the maximum candidate ever proposed, with no lost maximum and no
/// regression.
#[test]
fn concurrent_advances_keep_the_maximum() {
    let tracker = Arc::new(CursorTracker::with_backoff(MemoryStore::new(), NoPause));
    tracker.initialize("chanA", &TimedGroup::Minute.none(), NAMESPACE);

    let mut handles = Vec::new();
    for writer in 0..WRITERS {
        let tracker = Arc::clone(&tracker);
        handles.push(thread::spawn(move || {
            // Writers interleave proposals so no single thread owns the tail.
            for round in 0..PROPOSALS_PER_WRITER {
                let proposal = minute_number(1 + writer + round * WRITERS);
                tracker
                    .update_increase_to(&proposal, "chanA", NAMESPACE)
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let expected_max = minute_number(WRITERS * PROPOSALS_PER_WRITER);
    assert_eq!(
        tracker.get_or_none("chanA", NAMESPACE),
        Some(expected_max)
    );
}

/// Same race without a pre-created cursor: creation itself is contended and
/// the winning record must still converge on the maximum.
#[test]
fn contended_creation_still_converges() {
    let tracker = Arc::new(CursorTracker::with_backoff(MemoryStore::new(), NoPause));

    let mut handles = Vec::new();
    for writer in 0..WRITERS {
        let tracker = Arc::clone(&tracker);
        handles.push(thread::spawn(move || {
            let proposal = minute_number(writer + 1);
            tracker
                .update_increase("chanB", NAMESPACE, |_| Ok(proposal))
                .unwrap();
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(
        tracker.get_or_none("chanB", NAMESPACE),
        Some(minute_number(WRITERS))
    );
}

//! User annotations: happens-before edges, queues, ignores, benign races.

use std::sync::Arc;

use racewatch_core::report::ReportType;
use racewatch_rtl::{Annotation, CollectingHost, Detector, DetectorConfig, Event};

const X: usize = 0x1000;
const Y: usize = 0x1020;
const M: usize = 0x2000;
const A: usize = 0x4000;
const Q: usize = 0x5000;

fn detector() -> (Arc<CollectingHost>, Detector) {
    let host = Arc::new(CollectingHost::new());
    let det = Detector::new(DetectorConfig::default(), host.clone()).unwrap();
    det.on_memory_range_init(0, 0, X, 64);
    (host, det)
}

fn spawn(det: &Detector, parent: u32, child: u32) {
    det.on_thread_create(parent, child);
    det.on_thread_start(parent, child);
}

fn annotate(det: &Detector, tid: u32, annotation: Annotation) {
    det.on_annotation(tid, 0, annotation);
}

#[test]
fn happens_before_after_pair_orders_accesses() {
    let (host, det) = detector();
    spawn(&det, 0, 1);
    spawn(&det, 0, 2);

    det.on_memory_access(1, 0x100, X, 8, true);
    annotate(&det, 1, Annotation::HappensBefore { addr: A });
    annotate(&det, 2, Annotation::HappensAfter { addr: A });
    det.on_memory_access(2, 0x200, X, 8, true);

    assert_eq!(host.count(), 0);
}

#[test]
fn happens_after_without_before_is_harmless() {
    let (host, det) = detector();
    spawn(&det, 0, 1);
    spawn(&det, 0, 2);

    annotate(&det, 2, Annotation::HappensAfter { addr: A });
    det.on_memory_access(1, 0x100, X, 8, true);
    det.on_memory_access(2, 0x200, X, 8, true);

    // No edge was published, so the race is still there.
    assert_eq!(host.count(), 1);
    assert_eq!(host.reports()[0].typ, ReportType::Race);
}

#[test]
fn pcq_put_get_orders_producer_and_consumer() {
    let (host, det) = detector();
    spawn(&det, 0, 1);
    spawn(&det, 0, 2);

    annotate(&det, 0, Annotation::PcqCreate { addr: Q });
    det.on_memory_access(1, 0x100, X, 8, true);
    annotate(&det, 1, Annotation::PcqPut { addr: Q });
    annotate(&det, 2, Annotation::PcqGet { addr: Q });
    det.on_memory_access(2, 0x200, X, 8, false);

    assert_eq!(host.count(), 0);

    annotate(&det, 0, Annotation::PcqDestroy { addr: Q });
    det.finalize();
    assert_eq!(det.outstanding_chunks(), 0);
}

#[test]
fn condvar_signal_wait_pair_orders_accesses() {
    let (host, det) = detector();
    spawn(&det, 0, 1);
    spawn(&det, 0, 2);

    det.on_memory_access(1, 0x100, X, 8, true);
    annotate(&det, 1, Annotation::CondVarSignal { addr: A });
    annotate(&det, 2, Annotation::CondVarWait { addr: A });
    det.on_memory_access(2, 0x200, X, 8, false);

    assert_eq!(host.count(), 0);
}

#[test]
fn benign_race_suppresses_the_report() {
    let (host, det) = detector();
    spawn(&det, 0, 1);
    spawn(&det, 0, 2);

    annotate(&det, 0, Annotation::BenignRace { addr: X, size: 8 });
    det.on_memory_access(1, 0x100, X, 8, true);
    det.on_memory_access(2, 0x200, X, 8, true);

    assert_eq!(host.count(), 0);
    assert!(det.stats().race_benign > 0);
}

#[test]
fn benign_race_is_byte_ranged() {
    let (host, det) = detector();
    spawn(&det, 0, 1);
    spawn(&det, 0, 2);

    annotate(&det, 0, Annotation::BenignRace { addr: X, size: 8 });
    det.on_memory_access(1, 0x100, X + 8, 8, true);
    det.on_memory_access(2, 0x200, X + 8, 8, true);

    // The annotated window ends where the racing bytes begin.
    assert_eq!(host.count(), 1);
}

#[test]
fn ignored_writes_leave_no_shadow_state() {
    let (host, det) = detector();
    spawn(&det, 0, 1);
    spawn(&det, 0, 2);

    annotate(&det, 1, Annotation::IgnoreWritesBegin);
    det.on_memory_access(1, 0x100, X, 8, true);
    annotate(&det, 1, Annotation::IgnoreWritesEnd);
    det.on_memory_access(2, 0x200, X, 8, true);

    assert_eq!(host.count(), 0);
    assert_eq!(det.stats().mop_ignored, 1);
}

#[test]
fn ignore_suppresses_shadow_but_not_clock_transfers() {
    let (host, det) = detector();
    spawn(&det, 0, 1);
    spawn(&det, 0, 2);
    det.on_memory_range_init(0, 0, Y, 8);

    det.on_memory_access(1, 0x100, Y, 8, true);
    annotate(&det, 1, Annotation::IgnoreWritesBegin);
    // The release below must still publish thread 1's clock, ignore flag
    // or not; otherwise thread 2's later write would falsely race.
    det.on_mutex_lock(1, 0x101, M);
    det.on_mutex_unlock(1, 0x102, M);
    annotate(&det, 1, Annotation::IgnoreWritesEnd);

    det.on_mutex_lock(2, 0x201, M);
    det.on_memory_access(2, 0x202, Y, 8, true);
    det.on_mutex_unlock(2, 0x203, M);

    assert_eq!(host.count(), 0);
}

#[test]
fn unbalanced_ignore_end_is_counted() {
    let (_, det) = detector();
    annotate(&det, 0, Annotation::IgnoreReadsEnd);
    assert_eq!(det.stats().bad_event, 1);
}

#[test]
fn new_memory_resets_shadow_state() {
    let (host, det) = detector();
    spawn(&det, 0, 1);
    spawn(&det, 0, 2);

    det.on_memory_access(1, 0x100, X, 8, true);
    annotate(&det, 0, Annotation::NewMemory { addr: X, size: 64 });
    det.on_memory_access(2, 0x200, X, 8, true);

    assert_eq!(host.count(), 0);
}

#[test]
fn annotations_flow_through_dispatch() {
    let (host, det) = detector();
    spawn(&det, 0, 1);
    spawn(&det, 0, 2);

    det.dispatch(Event::MemoryAccess {
        tid: 1,
        pc: 0x100,
        addr: X,
        size: 8,
        is_write: true,
    });
    det.dispatch(Event::Annotation {
        tid: 1,
        pc: 0,
        annotation: Annotation::HappensBefore { addr: A },
    });
    det.dispatch(Event::Annotation {
        tid: 2,
        pc: 0,
        annotation: Annotation::HappensAfter { addr: A },
    });
    det.dispatch(Event::MemoryAccess {
        tid: 2,
        pc: 0x200,
        addr: X,
        size: 8,
        is_write: true,
    });

    assert_eq!(host.count(), 0);
    assert_eq!(det.stats().annotation, 2);
}

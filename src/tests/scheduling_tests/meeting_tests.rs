use crate::db;
use crate::domain::availability::NewBlockPeriod;
use crate::domain::meeting::{ConfirmingParty, Meeting, MeetingOutcome, MeetingStatus};
use crate::errors::{EntityKind, EntityRef, SchedulingError};
use crate::notify::Notification;
use crate::scheduling::{BookingQuery, ConflictReason, Scheduler};
use crate::tests::utils::{date, failing_harness, harness, request, window};
use proptest::prelude::*;
use std::sync::Arc;
use std::thread;

fn active_count(scheduler: &Scheduler, salesperson_id: i64) -> i64 {
    scheduler
        .db()
        .with_conn(|conn| db::meetings::count_active(conn, salesperson_id))
        .unwrap()
}

#[test]
fn overlapping_request_is_rejected_citing_the_existing_meeting() {
    let h = harness("scenario_a");
    let existing = h
        .scheduler
        .schedule_meeting(&request(1, "2025-03-10", "10:00", "11:00"))
        .unwrap();

    let check = h
        .scheduler
        .validate_booking(&BookingQuery::for_window(1, &window("2025-03-10", "10:30", "11:30")))
        .unwrap();
    assert!(!check.valid);
    assert_eq!(check.reason, Some(ConflictReason::MeetingConflict));
    assert_eq!(
        check.conflicting_entity,
        Some(EntityRef::new(EntityKind::Meeting, existing.id))
    );

    let err = h
        .scheduler
        .schedule_meeting(&request(1, "2025-03-10", "10:30", "11:30"))
        .unwrap_err();
    assert!(matches!(
        err,
        SchedulingError::MeetingConflict { meeting_id: Some(id) } if id == existing.id
    ));
    assert_eq!(active_count(&h.scheduler, 1), 1);
}

#[test]
fn other_salespeople_and_back_to_back_slots_do_not_conflict() {
    let h = harness("no_conflict");
    h.scheduler
        .schedule_meeting(&request(1, "2025-03-10", "10:00", "11:00"))
        .unwrap();
    h.scheduler
        .schedule_meeting(&request(2, "2025-03-10", "10:00", "11:00"))
        .unwrap();
    h.scheduler
        .schedule_meeting(&request(1, "2025-03-10", "11:00", "12:00"))
        .unwrap();
    assert_eq!(active_count(&h.scheduler, 1), 2);
}

#[test]
fn rescheduling_into_its_own_slot_succeeds() {
    let h = harness("scenario_d");
    let m = h
        .scheduler
        .schedule_meeting(&request(1, "2025-03-10", "09:00", "10:00"))
        .unwrap();

    let moved = h
        .scheduler
        .reschedule_meeting(m.id, date("2025-03-10"), 570, 630)
        .unwrap();
    assert_eq!(moved.status, MeetingStatus::Rescheduled);
    assert_eq!(moved.window, window("2025-03-10", "09:30", "10:30"));
    assert_eq!(h.scheduler.get_meeting(m.id).unwrap(), moved);
}

#[test]
fn rescheduling_into_a_block_is_rejected_and_nothing_changes() {
    let h = harness("reschedule_block");
    let m = h
        .scheduler
        .schedule_meeting(&request(1, "2025-03-10", "09:00", "10:00"))
        .unwrap();
    let block = h
        .scheduler
        .create_block(&NewBlockPeriod {
            salesperson_id: 1,
            date_start: date("2025-03-11"),
            date_end: date("2025-03-11"),
            time_start: None,
            time_end: None,
            reason: Some("treinamento".into()),
        })
        .unwrap();

    let err = h
        .scheduler
        .reschedule_meeting(m.id, date("2025-03-11"), 540, 600)
        .unwrap_err();
    assert!(matches!(err, SchedulingError::BlockedPeriod { block_id } if block_id == block.id));
    assert_eq!(h.scheduler.get_meeting(m.id).unwrap(), m);
}

#[test]
fn rescheduling_onto_another_meeting_is_rejected() {
    let h = harness("reschedule_conflict");
    let a = h
        .scheduler
        .schedule_meeting(&request(1, "2025-03-10", "09:00", "10:00"))
        .unwrap();
    let b = h
        .scheduler
        .schedule_meeting(&request(1, "2025-03-10", "14:00", "15:00"))
        .unwrap();

    let err = h
        .scheduler
        .reschedule_meeting(b.id, date("2025-03-10"), 570, 630)
        .unwrap_err();
    assert!(matches!(
        err,
        SchedulingError::MeetingConflict { meeting_id: Some(id) } if id == a.id
    ));
}

#[test]
fn malformed_reschedule_is_an_invalid_window() {
    let h = harness("reschedule_invalid");
    let m = h
        .scheduler
        .schedule_meeting(&request(1, "2025-03-10", "09:00", "10:00"))
        .unwrap();
    let err = h
        .scheduler
        .reschedule_meeting(m.id, date("2025-03-10"), 600, 600)
        .unwrap_err();
    assert!(matches!(err, SchedulingError::InvalidWindow(_)));
}

#[test]
fn cancelling_frees_the_slot() {
    let h = harness("cancel_frees");
    let m = h
        .scheduler
        .schedule_meeting(&request(1, "2025-03-10", "10:00", "11:00"))
        .unwrap();
    let cancelled = h.scheduler.cancel_meeting(m.id).unwrap();
    assert_eq!(cancelled.status, MeetingStatus::Cancelled);

    h.scheduler
        .schedule_meeting(&request(1, "2025-03-10", "10:00", "11:00"))
        .unwrap();

    let agenda = h.scheduler.agenda(1, date("2025-03-10")).unwrap();
    assert_eq!(agenda.len(), 2);
    assert_eq!(
        agenda.iter().filter(|m| m.status.is_active()).count(),
        1
    );
}

#[test]
fn lifecycle_confirm_then_complete() {
    let h = harness("lifecycle");
    let m = h
        .scheduler
        .schedule_meeting(&request(1, "2025-03-10", "10:00", "11:00"))
        .unwrap();

    let m = h.scheduler.confirm_meeting(m.id, ConfirmingParty::Client).unwrap();
    assert_eq!(m.status, MeetingStatus::Confirmed);
    let m = h
        .scheduler
        .confirm_meeting(m.id, ConfirmingParty::Salesperson)
        .unwrap();
    assert!(m.is_mutually_confirmed());

    let done = h
        .scheduler
        .complete_meeting(m.id, MeetingOutcome::Converted, Some("contrato assinado".into()))
        .unwrap();
    assert_eq!(done.status, MeetingStatus::Completed);
    assert_eq!(done.outcome, Some(MeetingOutcome::Converted));

    for result in [
        h.scheduler.cancel_meeting(m.id),
        h.scheduler.confirm_meeting(m.id, ConfirmingParty::Client),
        h.scheduler.reschedule_meeting(m.id, date("2025-03-12"), 600, 660),
    ] {
        assert!(matches!(result, Err(SchedulingError::InvalidTransition { .. })));
    }
}

#[test]
fn unknown_meeting_is_not_found() {
    let h = harness("meeting_not_found");
    assert!(matches!(
        h.scheduler.get_meeting(404),
        Err(SchedulingError::NotFound { .. })
    ));
    assert!(matches!(
        h.scheduler.cancel_meeting(404),
        Err(SchedulingError::NotFound { .. })
    ));
}

#[test]
fn notifications_follow_successful_changes_only() {
    let h = harness("meeting_notify");
    let m = h
        .scheduler
        .schedule_meeting(&request(1, "2025-03-10", "10:00", "11:00"))
        .unwrap();
    let _ = h
        .scheduler
        .schedule_meeting(&request(1, "2025-03-10", "10:00", "11:00"));
    h.scheduler
        .reschedule_meeting(m.id, date("2025-03-10"), 660, 720)
        .unwrap();
    h.scheduler.cancel_meeting(m.id).unwrap();

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 3);
    assert!(matches!(sent[0], Notification::MeetingScheduled { meeting_id, .. } if meeting_id == m.id));
    assert!(matches!(
        &sent[1],
        Notification::MeetingRescheduled { previous, window, .. }
            if previous.start_minute == 600 && window.start_minute == 660
    ));
    assert!(matches!(sent[2], Notification::MeetingCancelled { .. }));
}

#[test]
fn failed_delivery_does_not_fail_the_booking() {
    let h = failing_harness("meeting_notify_fails");
    let m = h
        .scheduler
        .schedule_meeting(&request(1, "2025-03-10", "10:00", "11:00"))
        .unwrap();
    assert_eq!(h.notifier.sent().len(), 1);
    assert_eq!(h.scheduler.get_meeting(m.id).unwrap().status, MeetingStatus::Scheduled);
}

#[test]
fn store_trigger_rejects_overlaps_that_skip_validation() {
    let h = harness("trigger_guard");
    let first = h
        .scheduler
        .schedule_meeting(&request(1, "2025-03-10", "10:00", "11:00"))
        .unwrap();

    let err = h
        .scheduler
        .db()
        .with_conn(|conn| {
            db::meetings::insert_meeting(conn, &request(1, "2025-03-10", "10:59", "11:30"), 0)
        })
        .unwrap_err();
    assert!(matches!(
        err,
        SchedulingError::MeetingConflict { meeting_id: Some(id) } if id == first.id
    ));
}

#[test]
fn concurrent_bookings_for_one_slot_admit_exactly_one() {
    let h = harness("concurrent");
    let scheduler = Arc::new(h.scheduler);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let scheduler = Arc::clone(&scheduler);
            thread::spawn(move || {
                scheduler.schedule_meeting(&request(1, "2025-03-10", "10:00", "11:00"))
            })
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|t| t.join().unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, SchedulingError::MeetingConflict { .. })));
    assert_eq!(active_count(&scheduler, 1), 1);
}

#[derive(Debug, Clone)]
enum Op {
    Schedule { day: u32, start: i32, len: i32 },
    Reschedule { pick: usize, day: u32, start: i32, len: i32 },
    Cancel { pick: usize },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (10u32..13, 0i32..40, 1i32..8).prop_map(|(day, start, len)| Op::Schedule { day, start, len }),
        (any::<usize>(), 10u32..13, 0i32..40, 1i32..8)
            .prop_map(|(pick, day, start, len)| Op::Reschedule { pick, day, start, len }),
        any::<usize>().prop_map(|pick| Op::Cancel { pick }),
    ]
}

fn assert_no_overlaps(meetings: &[Meeting]) {
    let active: Vec<&Meeting> = meetings.iter().filter(|m| m.status.is_active()).collect();
    for (i, a) in active.iter().enumerate() {
        for b in &active[i + 1..] {
            assert!(
                !a.window.overlaps(&b.window),
                "meetings {} and {} overlap",
                a.id,
                b.id
            );
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn active_meetings_never_overlap(ops in prop::collection::vec(op(), 1..25)) {
        let h = harness("prop_no_overlap");
        let mut ids: Vec<i64> = Vec::new();

        for op in ops {
            // Starts land on 15-minute marks between 08:00 and 18:00.
            match op {
                Op::Schedule { day, start, len } => {
                    let mut req = request(1, "2025-03-10", "08:00", "09:00");
                    req.window.date = date(&format!("2025-03-{day}"));
                    req.window.start_minute = 480 + start * 15;
                    req.window.end_minute = req.window.start_minute + len * 15;
                    if let Ok(m) = h.scheduler.schedule_meeting(&req) {
                        ids.push(m.id);
                    }
                }
                Op::Reschedule { pick, day, start, len } if !ids.is_empty() => {
                    let id = ids[pick % ids.len()];
                    let start_minute = 480 + start * 15;
                    let _ = h.scheduler.reschedule_meeting(
                        id,
                        date(&format!("2025-03-{day}")),
                        start_minute,
                        start_minute + len * 15,
                    );
                }
                Op::Cancel { pick } if !ids.is_empty() => {
                    let _ = h.scheduler.cancel_meeting(ids[pick % ids.len()]);
                }
                _ => {}
            }

            for day in 10..13 {
                let agenda = h.scheduler.agenda(1, date(&format!("2025-03-{day}"))).unwrap();
                assert_no_overlaps(&agenda);
            }
        }
    }
}

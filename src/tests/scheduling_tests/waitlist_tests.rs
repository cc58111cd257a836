use crate::domain::waitlist::{LeadScoring, WaitlistCandidate};
use crate::errors::SchedulingError;
use crate::tests::utils::{harness, slot, T0};

const R: i64 = 3;

#[test]
fn promotion_picks_the_earliest_of_the_top_scores() {
    let h = harness("waitlist_determinism");
    let s = slot("2025-06-01", "14:00", "16:00");

    let mut ids = Vec::new();
    for (i, score) in [5.0, 9.0, 9.0, 3.0].into_iter().enumerate() {
        h.clock.advance_minutes(1);
        ids.push(h.scheduler.enqueue_waitlist(R, s, 300 + i as i64, score).unwrap().id);
    }

    let positions: Vec<usize> = ids
        .iter()
        .map(|id| h.scheduler.waitlist_position(*id).unwrap())
        .collect();
    assert_eq!(positions, vec![3, 1, 2, 4]);

    let promoted = h.scheduler.promote_next(R, s).unwrap().unwrap();
    assert_eq!(promoted.holder_id, 301);
    assert_eq!(h.scheduler.waitlist_position(ids[2]).unwrap(), 1);
}

#[test]
fn positions_are_per_slot() {
    let h = harness("waitlist_positions");
    let afternoon = slot("2025-06-01", "14:00", "16:00");
    let evening = slot("2025-06-01", "18:00", "20:00");

    h.scheduler.enqueue_waitlist(R, afternoon, 1, 10.0).unwrap();
    let e = h.scheduler.enqueue_waitlist(R, evening, 2, 1.0).unwrap();
    assert_eq!(h.scheduler.waitlist_position(e.id).unwrap(), 1);
}

#[test]
fn withdrawn_entries_leave_the_queue() {
    let h = harness("waitlist_withdraw");
    let s = slot("2025-06-01", "14:00", "16:00");
    let a = h.scheduler.enqueue_waitlist(R, s, 1, 8.0).unwrap();
    let b = h.scheduler.enqueue_waitlist(R, s, 2, 4.0).unwrap();

    h.scheduler.withdraw_waitlist(a.id).unwrap();
    assert_eq!(h.scheduler.waitlist_position(b.id).unwrap(), 1);
    assert!(matches!(
        h.scheduler.waitlist_position(a.id),
        Err(SchedulingError::NotFound { .. })
    ));
    assert!(matches!(
        h.scheduler.withdraw_waitlist(a.id),
        Err(SchedulingError::NotFound { .. })
    ));
}

#[test]
fn non_finite_scores_are_rejected() {
    let h = harness("waitlist_nan");
    let s = slot("2025-06-01", "14:00", "16:00");
    for score in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        assert!(matches!(
            h.scheduler.enqueue_waitlist(R, s, 1, score),
            Err(SchedulingError::InvalidInput(_))
        ));
    }
    assert!(h.scheduler.list_waitlist(R).unwrap().is_empty());
}

#[test]
fn scored_enqueue_uses_the_policy() {
    let h = harness("waitlist_scored");
    let s = slot("2025-06-01", "14:00", "16:00");
    let policy = LeadScoring::default();

    let referral = WaitlistCandidate {
        requester_id: 1,
        customer_tier: Some("silver".into()),
        lead_source: Some("indicacao".into()),
        first_contact_at: Some(T0 - 4 * 3600),
    };
    let walk_in = WaitlistCandidate {
        requester_id: 2,
        customer_tier: Some("gold".into()),
        ..Default::default()
    };

    let a = h.scheduler.enqueue_scored(R, s, &referral, &policy).unwrap();
    let b = h.scheduler.enqueue_scored(R, s, &walk_in, &policy).unwrap();
    assert!((a.score - 37.0).abs() < 1e-9);
    assert!((b.score - 30.0).abs() < 1e-9);

    let ranked = h.scheduler.list_waitlist(R).unwrap();
    assert_eq!(ranked[0].requester_id, 1);
}

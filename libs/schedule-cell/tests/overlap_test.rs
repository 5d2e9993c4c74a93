// libs/schedule-cell/tests/overlap_test.rs
mod common;

use assert_matches::assert_matches;
use chrono::NaiveDate;
use std::sync::Arc;
use uuid::Uuid;

use schedule_cell::models::ScheduleError;
use schedule_cell::services::overlap::OverlapChecker;
use shared_store::{ClinicStore, ScheduleKind};

use common::{day_schedule, next_monday, regular_schedule, t};

fn checker_with(store: &Arc<ClinicStore>) -> OverlapChecker {
    OverlapChecker::new(Arc::clone(store))
}

#[test]
fn overlapping_regular_schedules_conflict() {
    let store = Arc::new(ClinicStore::new());
    let doctor_id = Uuid::new_v4();
    let existing = regular_schedule(doctor_id, 1, t(8, 0), t(12, 0));
    store.put_schedule(existing);

    let candidate = regular_schedule(doctor_id, 1, t(11, 0), t(14, 0));
    let err = checker_with(&store).check(&candidate, None).unwrap_err();
    assert_matches!(err, ScheduleError::Overlap { start, end } => {
        assert_eq!(start, t(8, 0));
        assert_eq!(end, t(12, 0));
    });
}

#[test]
fn back_to_back_regular_schedules_do_not_conflict() {
    let store = Arc::new(ClinicStore::new());
    let doctor_id = Uuid::new_v4();
    store.put_schedule(regular_schedule(doctor_id, 1, t(8, 0), t(12, 0)));

    let candidate = regular_schedule(doctor_id, 1, t(12, 0), t(17, 0));
    checker_with(&store).check(&candidate, None).unwrap();
}

#[test]
fn different_days_never_conflict() {
    let store = Arc::new(ClinicStore::new());
    let doctor_id = Uuid::new_v4();
    store.put_schedule(regular_schedule(doctor_id, 1, t(8, 0), t(12, 0)));

    let candidate = regular_schedule(doctor_id, 2, t(8, 0), t(12, 0));
    checker_with(&store).check(&candidate, None).unwrap();
}

#[test]
fn disjoint_effective_windows_do_not_conflict() {
    let store = Arc::new(ClinicStore::new());
    let doctor_id = Uuid::new_v4();

    let mut winter = regular_schedule(doctor_id, 1, t(8, 0), t(12, 0));
    winter.effective_from = Some(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
    winter.effective_until = Some(NaiveDate::from_ymd_opt(2026, 3, 31).unwrap());
    store.put_schedule(winter);

    let mut summer = regular_schedule(doctor_id, 1, t(8, 0), t(12, 0));
    summer.effective_from = Some(NaiveDate::from_ymd_opt(2026, 6, 1).unwrap());
    summer.effective_until = Some(NaiveDate::from_ymd_opt(2026, 8, 31).unwrap());
    checker_with(&store).check(&summer, None).unwrap();

    // An unbounded candidate reaches into the winter window.
    let unbounded = regular_schedule(doctor_id, 1, t(8, 0), t(12, 0));
    let err = checker_with(&store).check(&unbounded, None).unwrap_err();
    assert_matches!(err, ScheduleError::Overlap { .. });
}

#[test]
fn flexible_conflicts_only_on_the_same_date() {
    let store = Arc::new(ClinicStore::new());
    let doctor_id = Uuid::new_v4();
    let monday = next_monday();
    store.put_schedule(day_schedule(
        doctor_id,
        ScheduleKind::Flexible,
        monday,
        t(9, 0),
        t(13, 0),
    ));

    let same_day = day_schedule(doctor_id, ScheduleKind::Flexible, monday, t(12, 0), t(15, 0));
    assert_matches!(
        checker_with(&store).check(&same_day, None),
        Err(ScheduleError::Overlap { .. })
    );

    let other_day = day_schedule(
        doctor_id,
        ScheduleKind::Flexible,
        monday + chrono::Duration::days(1),
        t(12, 0),
        t(15, 0),
    );
    checker_with(&store).check(&other_day, None).unwrap();
}

#[test]
fn cross_priority_pairs_never_conflict_directly() {
    let store = Arc::new(ClinicStore::new());
    let doctor_id = Uuid::new_v4();
    let monday = next_monday();

    store.put_schedule(regular_schedule(doctor_id, 1, t(8, 0), t(12, 0)));
    store.put_schedule(day_schedule(
        doctor_id,
        ScheduleKind::Flexible,
        monday,
        t(8, 0),
        t(12, 0),
    ));

    // Time off over both layers is resolved by subtraction, not rejected.
    let time_off = day_schedule(doctor_id, ScheduleKind::TimeOff, monday, t(9, 0), t(10, 0));
    checker_with(&store).check(&time_off, None).unwrap();
}

#[test]
fn edits_are_excluded_from_their_own_conflict_check() {
    let store = Arc::new(ClinicStore::new());
    let doctor_id = Uuid::new_v4();
    let existing = regular_schedule(doctor_id, 1, t(8, 0), t(12, 0));
    let existing_id = existing.id;
    store.put_schedule(existing.clone());

    let mut widened = existing;
    widened.end_time = t(13, 0);
    checker_with(&store).check(&widened, Some(existing_id)).unwrap();
}

#[test]
fn field_validation_rejects_bad_input() {
    let store = Arc::new(ClinicStore::new());
    let doctor_id = Uuid::new_v4();
    let checker = checker_with(&store);

    let inverted = regular_schedule(doctor_id, 1, t(12, 0), t(8, 0));
    assert_matches!(checker.check(&inverted, None), Err(ScheduleError::Validation(_)));

    let mut tiny = regular_schedule(doctor_id, 1, t(8, 0), t(12, 0));
    tiny.slot_duration_minutes = 4;
    assert_matches!(checker.check(&tiny, None), Err(ScheduleError::Validation(_)));

    let mut oversized = regular_schedule(doctor_id, 1, t(8, 0), t(9, 0));
    oversized.slot_duration_minutes = 90;
    assert_matches!(checker.check(&oversized, None), Err(ScheduleError::Validation(_)));

    let mut windows = regular_schedule(doctor_id, 1, t(8, 0), t(12, 0));
    windows.minimum_booking_days = 90;
    windows.max_advance_booking_days = 90;
    assert_matches!(checker.check(&windows, None), Err(ScheduleError::Validation(_)));

    let mut dateless = day_schedule(
        doctor_id,
        ScheduleKind::Flexible,
        next_monday(),
        t(8, 0),
        t(12, 0),
    );
    dateless.specific_date = None;
    assert_matches!(checker.check(&dateless, None), Err(ScheduleError::Validation(_)));
}

// libs/schedule-cell/src/services/slots.rs
//
// Winner-takes-all slot expansion. A flexible day override fully replaces the
// recurring base schedule for that day; time-off windows subtract from
// whichever layer won. The generator only ever inserts or flips rows with
// zero bookings; booked slots are off limits.
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use shared_store::{AppointmentType, ClinicStore, Schedule, ScheduleKind, Slot};

use crate::models::{ScheduleError, SlotSyncReport};

pub const MAX_GENERATION_DAYS: i64 = 90;

/// A slot that should exist according to the winning schedule set for a day.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotCandidate {
    pub schedule_id: Uuid,
    pub schedule_version: i64,
    pub capacity: i32,
    pub appointment_type: AppointmentType,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Schedules partitioned for one calendar day: the bookable layer and the
/// blocking time-off windows laid over it.
#[derive(Debug, Default)]
pub struct DaySelection {
    pub working: Vec<Schedule>,
    pub time_off: Vec<Schedule>,
}

/// Partition the active schedules for `date` and apply winner-takes-all: any
/// flexible working schedule excludes every regular schedule for that day.
pub fn select_for_day(schedules: &[Schedule], date: NaiveDate) -> DaySelection {
    let mut selection = DaySelection::default();

    for schedule in schedules {
        if !schedule.is_available || !schedule.applies_on(date) {
            continue;
        }
        if schedule.kind.is_working() {
            selection.working.push(schedule.clone());
        } else {
            selection.time_off.push(schedule.clone());
        }
    }

    let has_flexible = selection
        .working
        .iter()
        .any(|s| s.kind == ScheduleKind::Flexible);
    if has_flexible {
        selection.working.retain(|s| s.kind == ScheduleKind::Flexible);
    }

    selection
}

/// Interval union over `[start, end)` windows.
pub fn merge_windows(mut windows: Vec<(NaiveTime, NaiveTime)>) -> Vec<(NaiveTime, NaiveTime)> {
    if windows.is_empty() {
        return windows;
    }
    windows.sort();

    let mut merged: Vec<(NaiveTime, NaiveTime)> = Vec::with_capacity(windows.len());
    for (start, end) in windows {
        match merged.last_mut() {
            Some(last) if start <= last.1 => {
                if end > last.1 {
                    last.1 = end;
                }
            }
            _ => merged.push((start, end)),
        }
    }
    merged
}

/// Slice a schedule's working window into consecutive slot-duration pieces,
/// dropping a trailing partial slot.
fn slice_windows(schedule: &Schedule) -> Vec<(NaiveTime, NaiveTime)> {
    let step = Duration::minutes(schedule.slot_duration_minutes as i64);
    let mut out = Vec::new();
    let mut cursor = schedule.start_time;

    loop {
        let next = cursor + step;
        // NaiveTime arithmetic wraps at midnight; a wrapped end means the
        // remaining piece is partial and gets dropped.
        if next > schedule.end_time || next <= cursor {
            break;
        }
        out.push((cursor, next));
        cursor = next;
    }
    out
}

/// The full winning candidate set for one day, time-off already subtracted.
pub fn winning_candidates_for_day(schedules: &[Schedule], date: NaiveDate) -> Vec<SlotCandidate> {
    let selection = select_for_day(schedules, date);

    let blocked = merge_windows(
        selection
            .time_off
            .iter()
            .map(|s| (s.start_time, s.end_time))
            .collect(),
    );

    let mut candidates = Vec::new();
    for schedule in &selection.working {
        for (start, end) in slice_windows(schedule) {
            let is_blocked = blocked
                .iter()
                .any(|&(b_start, b_end)| start < b_end && b_start < end);
            if is_blocked {
                continue;
            }
            candidates.push(SlotCandidate {
                schedule_id: schedule.id,
                schedule_version: schedule.version,
                capacity: schedule.slot_capacity,
                appointment_type: schedule.appointment_type,
                start: date.and_time(start).and_utc(),
                end: date.and_time(end).and_utc(),
            });
        }
    }

    candidates.sort_by_key(|c| c.start);
    candidates
}

pub struct SlotGenerator {
    store: Arc<ClinicStore>,
}

impl SlotGenerator {
    pub fn new(store: Arc<ClinicStore>) -> Self {
        Self { store }
    }

    /// Materialise the winning slot set for every day in `[from, to]` and run
    /// the companion pass that disables unbooked slots which fell out of it.
    pub async fn generate(
        &self,
        doctor_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<SlotSyncReport, ScheduleError> {
        if from > to {
            return Err(ScheduleError::Validation(
                "range start must not be after range end".to_string(),
            ));
        }
        if (to - from).num_days() > MAX_GENERATION_DAYS {
            return Err(ScheduleError::Validation(format!(
                "slot generation is limited to {} days",
                MAX_GENERATION_DAYS
            )));
        }

        let schedules = self.store.schedules_for_doctor(doctor_id);
        let mut report = SlotSyncReport::default();

        let mut day = from;
        while day <= to {
            let day_report = self.sync_day(doctor_id, &schedules, day).await;
            report.created += day_report.created;
            report.disabled += day_report.disabled;
            day += Duration::days(1);
        }

        info!(
            "slot sync for doctor {}: {} created, {} disabled ({} - {})",
            doctor_id, report.created, report.disabled, from, to
        );
        Ok(report)
    }

    async fn sync_day(
        &self,
        doctor_id: Uuid,
        schedules: &[Schedule],
        date: NaiveDate,
    ) -> SlotSyncReport {
        let candidates = winning_candidates_for_day(schedules, date);

        let day_start = date.and_time(NaiveTime::MIN).and_utc();
        let day_end = day_start + Duration::days(1);
        let existing = self
            .store
            .slots_for_doctor_between(doctor_id, day_start, day_end);

        let mut report = SlotSyncReport::default();
        let now = Utc::now();

        for candidate in &candidates {
            // An existing row with the exact interval is reused rather than
            // duplicated; when ownership moved to another schedule it gets
            // re-stamped so the day reads from a single layer.
            if let Some(matching) = existing
                .iter()
                .find(|s| s.start_time == candidate.start && s.end_time == candidate.end)
            {
                let stale = matching.schedule_id != candidate.schedule_id
                    || matching.schedule_version != candidate.schedule_version
                    || matching.capacity != candidate.capacity;
                if stale && matching.booked_count == 0 {
                    let _guard = self.store.lock_slot(matching.id).await;
                    if let Some(mut row) = self.store.slot(matching.id) {
                        if row.booked_count == 0 {
                            row.schedule_id = candidate.schedule_id;
                            row.schedule_version = candidate.schedule_version;
                            row.capacity = candidate.capacity;
                            row.appointment_types = vec![candidate.appointment_type];
                            row.updated_at = Utc::now();
                            self.store.put_slot(row);
                        }
                    }
                }
                continue;
            }

            let intersects_existing = existing
                .iter()
                .any(|s| s.overlaps(candidate.start, candidate.end));
            if intersects_existing {
                continue;
            }

            self.store.put_slot(Slot {
                id: Uuid::new_v4(),
                doctor_id,
                schedule_id: candidate.schedule_id,
                schedule_version: candidate.schedule_version,
                start_time: candidate.start,
                end_time: candidate.end,
                capacity: candidate.capacity,
                booked_count: 0,
                appointment_types: vec![candidate.appointment_type],
                is_available: candidate.start > now,
                created_at: now,
                updated_at: now,
            });
            report.created += 1;
        }

        // Companion pass: switch off enabled, unbooked slots that are not in
        // the winning set. Booked slots are never touched here.
        for slot in &existing {
            if !slot.is_available || slot.booked_count > 0 {
                continue;
            }
            let in_winning_set = candidates
                .iter()
                .any(|c| c.start == slot.start_time && c.end == slot.end_time);
            if in_winning_set {
                continue;
            }

            let _guard = self.store.lock_slot(slot.id).await;
            let Some(mut row) = self.store.slot(slot.id) else {
                continue;
            };
            // Re-validate under the lock; a booking may have landed since the
            // snapshot was taken.
            if !row.is_available || row.booked_count > 0 {
                continue;
            }
            row.is_available = false;
            row.updated_at = Utc::now();
            self.store.put_slot(row);
            report.disabled += 1;
            debug!("disabled superseded slot {} on {}", slot.id, date);
        }

        report
    }
}

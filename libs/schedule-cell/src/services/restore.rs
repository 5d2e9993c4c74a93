// libs/schedule-cell/src/services/restore.rs
//
// Recomputes slots that should reappear after a day-specific schedule is
// deleted or shrunk. The source layer is whatever now wins the day: a still
// active flexible schedule if one covers the date, otherwise the recurring
// base. Booked slots are never mutated.
use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use shared_store::{ClinicStore, Slot};

use crate::models::{RestoreReport, ScheduleError};
use crate::services::slots::winning_candidates_for_day;

pub struct SlotRestoreEngine {
    store: Arc<ClinicStore>,
}

impl SlotRestoreEngine {
    pub fn new(store: Arc<ClinicStore>) -> Self {
        Self { store }
    }

    /// Restore coverage inside the vacated `[window_start, window_end)` on
    /// `date`. Returns the number of slots brought back, for messaging only.
    pub async fn restore_window(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        window_start: NaiveTime,
        window_end: NaiveTime,
    ) -> Result<RestoreReport, ScheduleError> {
        if window_start >= window_end {
            return Err(ScheduleError::Validation(
                "restore window start must be before its end".to_string(),
            ));
        }

        let schedules = self.store.schedules_for_doctor(doctor_id);
        let candidates: Vec<_> = winning_candidates_for_day(&schedules, date)
            .into_iter()
            .filter(|c| {
                let vacated_start = date.and_time(window_start).and_utc();
                let vacated_end = date.and_time(window_end).and_utc();
                c.start < vacated_end && vacated_start < c.end
            })
            .collect();

        let day_start = date.and_time(NaiveTime::MIN).and_utc();
        let day_end = day_start + Duration::days(1);
        let existing = self
            .store
            .slots_for_doctor_between(doctor_id, day_start, day_end);

        let mut report = RestoreReport::default();
        let now = Utc::now();

        for candidate in &candidates {
            let matching = existing
                .iter()
                .find(|s| s.start_time == candidate.start && s.end_time == candidate.end);

            match matching {
                Some(slot) if slot.booked_count > 0 => {
                    // Paid bookings survive schedule churn untouched.
                    continue;
                }
                Some(slot) if slot.is_available => continue,
                Some(slot) => {
                    let _guard = self.store.lock_slot(slot.id).await;
                    let Some(mut row) = self.store.slot(slot.id) else {
                        continue;
                    };
                    if row.booked_count > 0 || row.is_available {
                        continue;
                    }
                    // Re-enable in place, retargeting it at the schedule that
                    // now owns the window.
                    row.schedule_id = candidate.schedule_id;
                    row.schedule_version = candidate.schedule_version;
                    row.capacity = candidate.capacity;
                    row.appointment_types = vec![candidate.appointment_type];
                    row.is_available = row.start_time > now;
                    row.updated_at = now;
                    self.store.put_slot(row);
                    report.restored += 1;
                    debug!("re-enabled slot {} on {}", slot.id, date);
                }
                None => {
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
                    report.restored += 1;
                }
            }
        }

        info!(
            "restored {} slots for doctor {} on {} within {} - {}",
            report.restored, doctor_id, date, window_start, window_end
        );
        Ok(report)
    }
}

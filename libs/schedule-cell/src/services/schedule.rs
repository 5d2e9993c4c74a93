// libs/schedule-cell/src/services/schedule.rs
//
// Schedule CRUD orchestration. Every time-affecting edit bumps the schedule
// version and resynchronises the slot table; the two appointment side-effect
// paths are deliberately asymmetric: creating a flexible day override hard
// cancels bookings it uproots, while edits only leave a soft conflict marker.
use chrono::{Duration, NaiveDate, Utc};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_store::{
    AppointmentStatus, CancelledBy, ClinicStore, NotificationDispatcher, Schedule, ScheduleKind,
};

use crate::models::{
    CreateScheduleRequest, ScheduleChangeResult, ScheduleDeleteResult, ScheduleError,
    SlotSyncReport, UpdateScheduleRequest,
};
use crate::services::overlap::OverlapChecker;
use crate::services::restore::SlotRestoreEngine;
use crate::services::slots::{winning_candidates_for_day, SlotGenerator, MAX_GENERATION_DAYS};

const DEFAULT_SLOT_CAPACITY: i32 = 1;
const DEFAULT_MAX_ADVANCE_DAYS: i32 = 90;

pub struct ScheduleService {
    store: Arc<ClinicStore>,
    overlap: OverlapChecker,
    generator: SlotGenerator,
    restore: SlotRestoreEngine,
    notifier: Arc<dyn NotificationDispatcher>,
    horizon_days: i64,
}

impl ScheduleService {
    pub fn new(
        config: &AppConfig,
        store: Arc<ClinicStore>,
        notifier: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            overlap: OverlapChecker::new(Arc::clone(&store)),
            generator: SlotGenerator::new(Arc::clone(&store)),
            restore: SlotRestoreEngine::new(Arc::clone(&store)),
            store,
            notifier,
            horizon_days: config.slot_horizon_days.clamp(1, MAX_GENERATION_DAYS),
        }
    }

    pub fn get_schedule(&self, schedule_id: Uuid) -> Result<Schedule, ScheduleError> {
        self.store.schedule(schedule_id).ok_or(ScheduleError::NotFound)
    }

    pub fn list_for_doctor(&self, doctor_id: Uuid) -> Vec<Schedule> {
        self.store.schedules_for_doctor(doctor_id)
    }

    /// Create a schedule, then materialise its slots. Flexible creation takes
    /// the hard path for bookings it displaces.
    pub async fn create_schedule(
        &self,
        request: CreateScheduleRequest,
    ) -> Result<ScheduleChangeResult, ScheduleError> {
        let doctor = self
            .store
            .doctor(request.doctor_id)
            .ok_or(ScheduleError::DoctorNotFound)?;
        if !doctor.is_active {
            return Err(ScheduleError::DoctorNotFound);
        }

        let now = Utc::now();
        let schedule = Schedule {
            id: Uuid::new_v4(),
            doctor_id: request.doctor_id,
            kind: request.kind,
            day_of_week: request.day_of_week,
            specific_date: request.specific_date,
            start_time: request.start_time,
            end_time: request.end_time,
            slot_duration_minutes: request.slot_duration_minutes,
            slot_capacity: request.slot_capacity.unwrap_or(DEFAULT_SLOT_CAPACITY),
            appointment_type: request.appointment_type,
            consultation_fee: request.consultation_fee,
            discount_percent: request.discount_percent.unwrap_or(0),
            effective_from: request.effective_from,
            effective_until: request.effective_until,
            minimum_booking_days: request.minimum_booking_days.unwrap_or(0),
            max_advance_booking_days: request
                .max_advance_booking_days
                .unwrap_or(DEFAULT_MAX_ADVANCE_DAYS),
            is_available: true,
            version: 1,
            note: request.note,
            created_at: now,
            updated_at: now,
        };

        if schedule.discount_percent < 0 || schedule.discount_percent > 100 {
            return Err(ScheduleError::Validation(
                "discount percent must be between 0 and 100".to_string(),
            ));
        }

        self.overlap.check(&schedule, None)?;
        self.store.put_schedule(schedule.clone());
        info!(
            "schedule {} created for doctor {} ({})",
            schedule.id, schedule.doctor_id, schedule.kind
        );

        let sync = self.resync_for(&schedule).await?;

        let mut cancelled = 0;
        let mut flagged = 0;
        if let Some(date) = schedule.specific_date {
            match schedule.kind {
                ScheduleKind::Flexible => {
                    cancelled = self
                        .cancel_uncovered_appointments(
                            schedule.doctor_id,
                            date,
                            "replaced by a day-specific schedule",
                        )
                        .await;
                }
                ScheduleKind::TimeOff => {
                    flagged = self
                        .flag_uncovered_appointments(
                            schedule.doctor_id,
                            date,
                            "scheduled time off overlaps this booking",
                        )
                        .await;
                }
                ScheduleKind::Regular => {}
            }
        }

        Ok(ScheduleChangeResult {
            schedule,
            sync,
            cancelled_appointments: cancelled,
            flagged_appointments: flagged,
        })
    }

    /// Edit a schedule. Time-affecting changes bump the version, resync slots
    /// and soft-flag displaced bookings; they never cancel them.
    pub async fn update_schedule(
        &self,
        schedule_id: Uuid,
        request: UpdateScheduleRequest,
    ) -> Result<ScheduleChangeResult, ScheduleError> {
        let current = self.store.schedule(schedule_id).ok_or(ScheduleError::NotFound)?;
        let mut updated = current.clone();

        if let Some(day) = request.day_of_week {
            updated.day_of_week = Some(day);
        }
        if let Some(date) = request.specific_date {
            updated.specific_date = Some(date);
        }
        if let Some(start) = request.start_time {
            updated.start_time = start;
        }
        if let Some(end) = request.end_time {
            updated.end_time = end;
        }
        if let Some(duration) = request.slot_duration_minutes {
            updated.slot_duration_minutes = duration;
        }
        if let Some(capacity) = request.slot_capacity {
            updated.slot_capacity = capacity;
        }
        if let Some(fee) = request.consultation_fee {
            updated.consultation_fee = Some(fee);
        }
        if let Some(discount) = request.discount_percent {
            if !(0..=100).contains(&discount) {
                return Err(ScheduleError::Validation(
                    "discount percent must be between 0 and 100".to_string(),
                ));
            }
            updated.discount_percent = discount;
        }
        if let Some(from) = request.effective_from {
            updated.effective_from = Some(from);
        }
        if let Some(until) = request.effective_until {
            updated.effective_until = Some(until);
        }
        if let Some(min_days) = request.minimum_booking_days {
            updated.minimum_booking_days = min_days;
        }
        if let Some(max_days) = request.max_advance_booking_days {
            updated.max_advance_booking_days = max_days;
        }
        if let Some(available) = request.is_available {
            updated.is_available = available;
        }
        if let Some(note) = request.note {
            updated.note = Some(note);
        }

        self.overlap.check(&updated, Some(schedule_id))?;

        let time_affecting = current.day_of_week != updated.day_of_week
            || current.specific_date != updated.specific_date
            || current.start_time != updated.start_time
            || current.end_time != updated.end_time
            || current.slot_duration_minutes != updated.slot_duration_minutes
            || current.slot_capacity != updated.slot_capacity
            || current.effective_from != updated.effective_from
            || current.effective_until != updated.effective_until
            || current.is_available != updated.is_available;

        if time_affecting {
            updated.version += 1;
        }
        updated.updated_at = Utc::now();
        self.store.put_schedule(updated.clone());

        let mut sync = SlotSyncReport::default();
        let mut flagged = 0;

        if time_affecting {
            sync = self.resync_for(&updated).await?;

            // A shrunk or moved day-specific schedule vacates part of its old
            // window; whatever now wins that window comes back.
            if matches!(current.kind, ScheduleKind::Flexible | ScheduleKind::TimeOff) {
                if let Some(old_date) = current.specific_date {
                    if current.specific_date != updated.specific_date {
                        // The rule left this day entirely; retire its stale
                        // slots before handing the day back.
                        self.generator
                            .generate(current.doctor_id, old_date, old_date)
                            .await?;
                    }
                    for (vacated_start, vacated_end) in
                        vacated_windows(&current, &updated, old_date)
                    {
                        self.restore
                            .restore_window(current.doctor_id, old_date, vacated_start, vacated_end)
                            .await?;
                    }
                }
            }

            for date in self.affected_dates(&current, &updated) {
                flagged += self
                    .flag_uncovered_appointments(
                        updated.doctor_id,
                        date,
                        "schedule change removed coverage for this booking",
                    )
                    .await;
            }
        }

        info!(
            "schedule {} updated (version {}, time_affecting: {})",
            schedule_id, updated.version, time_affecting
        );
        Ok(ScheduleChangeResult {
            schedule: updated,
            sync,
            cancelled_appointments: 0,
            flagged_appointments: flagged,
        })
    }

    /// Delete a schedule: unbooked slots go away, booked ones are only
    /// disabled, and day-specific deletions hand the vacated window to the
    /// restore engine.
    pub async fn delete_schedule(
        &self,
        schedule_id: Uuid,
    ) -> Result<ScheduleDeleteResult, ScheduleError> {
        let schedule = self.store.schedule(schedule_id).ok_or(ScheduleError::NotFound)?;
        self.store.remove_schedule(schedule_id);

        let mut removed = 0;
        for slot in self.store.slots_for_schedule(schedule_id) {
            let _guard = self.store.lock_slot(slot.id).await;
            let Some(mut row) = self.store.slot(slot.id) else {
                continue;
            };
            if row.booked_count > 0 {
                row.is_available = false;
                row.updated_at = Utc::now();
                self.store.put_slot(row);
            } else {
                self.store.remove_slot(slot.id);
                removed += 1;
            }
        }

        let mut restore_report = crate::models::RestoreReport::default();
        if let Some(date) = schedule.specific_date {
            // A deleted flexible override vacates the whole day it owned; a
            // deleted time-off block only vacates its own window.
            let vacated = match schedule.kind {
                ScheduleKind::Flexible => Some(full_day_window()),
                ScheduleKind::TimeOff => Some((schedule.start_time, schedule.end_time)),
                ScheduleKind::Regular => None,
            };
            if let Some((vacated_start, vacated_end)) = vacated {
                restore_report = self
                    .restore
                    .restore_window(schedule.doctor_id, date, vacated_start, vacated_end)
                    .await?;
            }
        }

        info!(
            "schedule {} deleted: {} slots removed, {} restored",
            schedule_id, removed, restore_report.restored
        );
        Ok(ScheduleDeleteResult {
            schedule_id,
            removed_slots: removed,
            restore: restore_report,
        })
    }

    /// Regenerate the slot horizon touched by this schedule.
    async fn resync_for(&self, schedule: &Schedule) -> Result<SlotSyncReport, ScheduleError> {
        let today = Utc::now().date_naive();
        match schedule.kind {
            ScheduleKind::Regular => {
                let horizon = self
                    .horizon_days
                    .min(schedule.max_advance_booking_days as i64)
                    .max(1);
                self.generator
                    .generate(schedule.doctor_id, today, today + Duration::days(horizon - 1))
                    .await
            }
            ScheduleKind::Flexible | ScheduleKind::TimeOff => {
                let date = schedule
                    .specific_date
                    .ok_or_else(|| {
                        ScheduleError::Validation(
                            "a day-specific schedule requires a date".to_string(),
                        )
                    })?;
                self.generator.generate(schedule.doctor_id, date, date).await
            }
        }
    }

    fn affected_dates(&self, before: &Schedule, after: &Schedule) -> Vec<NaiveDate> {
        let mut dates = Vec::new();
        for date in [before.specific_date, after.specific_date].into_iter().flatten() {
            if !dates.contains(&date) {
                dates.push(date);
            }
        }
        if dates.is_empty() {
            // Recurring schedules: every upcoming day the rule touches.
            let today = Utc::now().date_naive();
            for offset in 0..self.horizon_days {
                let date = today + Duration::days(offset);
                if before.applies_on(date) || after.applies_on(date) {
                    dates.push(date);
                }
            }
        }
        dates
    }

    /// Soft path: leave a conflict marker on every live booking whose slot is
    /// no longer in the day's winning set.
    async fn flag_uncovered_appointments(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        reason: &str,
    ) -> usize {
        let mut flagged = 0;
        for appointment in self.uncovered_appointments(doctor_id, date) {
            let _guard = self.store.lock_appointment(appointment.id).await;
            let Some(mut row) = self.store.appointment(appointment.id) else {
                continue;
            };
            if row.status.is_terminal() || row.has_conflict {
                continue;
            }
            row.has_conflict = true;
            row.conflict_reason = Some(reason.to_string());
            row.updated_at = Utc::now();
            self.store.put_appointment(row);
            flagged += 1;
        }
        if flagged > 0 {
            warn!(
                "{} appointments flagged with schedule conflicts for doctor {} on {}",
                flagged, doctor_id, date
            );
        }
        flagged
    }

    /// Hard path, flexible creation only: cancel displaced bookings, release
    /// their seats and hand the batch to the notifier.
    async fn cancel_uncovered_appointments(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        reason: &str,
    ) -> usize {
        let mut cancelled = Vec::new();
        for appointment in self.uncovered_appointments(doctor_id, date) {
            let _guard = self.store.lock_appointment(appointment.id).await;
            let Some(mut row) = self.store.appointment(appointment.id) else {
                continue;
            };
            if row.status.is_terminal() {
                continue;
            }
            let now = Utc::now();
            row.status = AppointmentStatus::Cancelled;
            row.cancelled_at = Some(now);
            row.cancellation_reason = Some(reason.to_string());
            row.cancelled_by = Some(CancelledBy::System);
            row.updated_at = now;
            self.store.put_appointment(row.clone());

            let slot_id = row.slot_id;
            drop(_guard);
            let _slot_guard = self.store.lock_slot(slot_id).await;
            if let Some(mut slot) = self.store.slot(slot_id) {
                slot.booked_count = (slot.booked_count - 1).max(0);
                // The slot lost to the new day override; freeing a seat does
                // not make it bookable again.
                slot.is_available = false;
                slot.updated_at = Utc::now();
                self.store.put_slot(slot);
            }
            cancelled.push(row);
        }

        if !cancelled.is_empty() {
            warn!(
                "{} appointments auto-cancelled for doctor {} on {}",
                cancelled.len(),
                doctor_id,
                date
            );
            self.notifier
                .notify_cancelled_appointments(&cancelled, reason)
                .await;
        }
        cancelled.len()
    }

    /// Live bookings on `date` whose slot interval is absent from the winning
    /// set for that day.
    fn uncovered_appointments(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Vec<shared_store::Appointment> {
        let schedules = self.store.schedules_for_doctor(doctor_id);
        let winning = winning_candidates_for_day(&schedules, date);

        self.store
            .appointments_for_doctor(doctor_id)
            .into_iter()
            .filter(|a| a.scheduled_at.date_naive() == date && !a.status.is_terminal())
            .filter(|a| {
                let Some(slot) = self.store.slot(a.slot_id) else {
                    return true;
                };
                !winning
                    .iter()
                    .any(|c| c.start == slot.start_time && c.end == slot.end_time)
            })
            .collect()
    }
}

fn full_day_window() -> (chrono::NaiveTime, chrono::NaiveTime) {
    (
        chrono::NaiveTime::MIN,
        chrono::NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(chrono::NaiveTime::MIN),
    )
}

/// The parts of the old window no longer covered after an edit. Empty when the
/// window grew or stayed put; everything the schedule owned when the date
/// moved or the row was switched off.
fn vacated_windows(
    before: &Schedule,
    after: &Schedule,
    old_date: NaiveDate,
) -> Vec<(chrono::NaiveTime, chrono::NaiveTime)> {
    let mut windows = Vec::new();
    if after.specific_date != Some(old_date) || !after.is_available {
        // A flexible override suppressed the whole day, so the whole day is
        // what comes back.
        if before.kind == ScheduleKind::Flexible {
            windows.push(full_day_window());
        } else {
            windows.push((before.start_time, before.end_time));
        }
        return windows;
    }
    if before.start_time < after.start_time {
        windows.push((before.start_time, after.start_time.min(before.end_time)));
    }
    if after.end_time < before.end_time {
        windows.push((after.end_time.max(before.start_time), before.end_time));
    }
    windows
}

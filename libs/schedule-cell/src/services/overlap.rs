// libs/schedule-cell/src/services/overlap.rs
use chrono::{NaiveDate, NaiveTime};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_store::{ClinicStore, Schedule, ScheduleKind};

use crate::models::ScheduleError;

const MIN_SLOT_DURATION_MINUTES: i64 = 5;
const MAX_SLOT_DURATION_MINUTES: i64 = 480;

/// Validates a candidate schedule against the doctor's existing schedules of
/// the same priority tier. Cross-tier pairs never conflict here; they are
/// resolved later by winner-takes-all selection.
pub struct OverlapChecker {
    store: Arc<ClinicStore>,
}

impl OverlapChecker {
    pub fn new(store: Arc<ClinicStore>) -> Self {
        Self { store }
    }

    /// Field-level validation, rejected before anything is written.
    pub fn validate_fields(candidate: &Schedule) -> Result<(), ScheduleError> {
        if candidate.start_time >= candidate.end_time {
            return Err(ScheduleError::Validation(
                "start time must be before end time".to_string(),
            ));
        }

        let window_minutes = (candidate.end_time - candidate.start_time).num_minutes();
        let duration = candidate.slot_duration_minutes as i64;
        if !(MIN_SLOT_DURATION_MINUTES..=MAX_SLOT_DURATION_MINUTES).contains(&duration) {
            return Err(ScheduleError::Validation(format!(
                "slot duration must be between {} and {} minutes",
                MIN_SLOT_DURATION_MINUTES, MAX_SLOT_DURATION_MINUTES
            )));
        }
        if duration > window_minutes {
            return Err(ScheduleError::Validation(
                "slot duration exceeds the working window".to_string(),
            ));
        }

        if candidate.minimum_booking_days >= candidate.max_advance_booking_days {
            return Err(ScheduleError::Validation(
                "minimum booking days must be below max advance booking days".to_string(),
            ));
        }

        if let (Some(from), Some(until)) = (candidate.effective_from, candidate.effective_until) {
            if from >= until {
                return Err(ScheduleError::Validation(
                    "effective-from must be before effective-until".to_string(),
                ));
            }
        }

        match candidate.kind {
            ScheduleKind::Regular => {
                match candidate.day_of_week {
                    Some(day) if day <= 6 => {}
                    Some(_) => {
                        return Err(ScheduleError::Validation(
                            "day of week must be between 0 (Sunday) and 6 (Saturday)".to_string(),
                        ))
                    }
                    None => {
                        return Err(ScheduleError::Validation(
                            "a recurring schedule requires a day of week".to_string(),
                        ))
                    }
                }
            }
            ScheduleKind::Flexible | ScheduleKind::TimeOff => {
                if candidate.specific_date.is_none() {
                    return Err(ScheduleError::Validation(
                        "a day-specific schedule requires a date".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Conflict check against existing same-tier schedules. `exclude_id` skips
    /// the row being edited.
    pub fn check(&self, candidate: &Schedule, exclude_id: Option<Uuid>) -> Result<(), ScheduleError> {
        Self::validate_fields(candidate)?;

        let existing = self.store.schedules_for_doctor(candidate.doctor_id);
        for other in &existing {
            if Some(other.id) == exclude_id || other.id == candidate.id {
                continue;
            }
            if other.kind.priority() != candidate.kind.priority() {
                continue;
            }

            let collides = match candidate.kind {
                ScheduleKind::Regular => {
                    other.day_of_week == candidate.day_of_week
                        && times_intersect(
                            candidate.start_time,
                            candidate.end_time,
                            other.start_time,
                            other.end_time,
                        )
                        && effective_windows_intersect(
                            candidate.effective_from,
                            candidate.effective_until,
                            other.effective_from,
                            other.effective_until,
                        )
                }
                ScheduleKind::Flexible | ScheduleKind::TimeOff => {
                    other.specific_date == candidate.specific_date
                        && times_intersect(
                            candidate.start_time,
                            candidate.end_time,
                            other.start_time,
                            other.end_time,
                        )
                }
            };

            if collides {
                warn!(
                    "schedule overlap for doctor {}: candidate {}-{} collides with {} ({}-{})",
                    candidate.doctor_id,
                    candidate.start_time,
                    candidate.end_time,
                    other.id,
                    other.start_time,
                    other.end_time
                );
                return Err(ScheduleError::Overlap {
                    start: other.start_time,
                    end: other.end_time,
                });
            }
        }

        debug!(
            "no overlap for doctor {} candidate {}-{}",
            candidate.doctor_id, candidate.start_time, candidate.end_time
        );
        Ok(())
    }
}

/// Half-open `[start, end)` intersection: back-to-back windows do not touch.
pub fn times_intersect(
    a_start: NaiveTime,
    a_end: NaiveTime,
    b_start: NaiveTime,
    b_end: NaiveTime,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// Effective-window intersection with unbounded ends treated as infinite.
pub fn effective_windows_intersect(
    a_from: Option<NaiveDate>,
    a_until: Option<NaiveDate>,
    b_from: Option<NaiveDate>,
    b_until: Option<NaiveDate>,
) -> bool {
    let from_ok = match (a_from, b_until) {
        (Some(from), Some(until)) => from <= until,
        _ => true,
    };
    let until_ok = match (b_from, a_until) {
        (Some(from), Some(until)) => from <= until,
        _ => true,
    };
    from_ok && until_ok
}

// libs/schedule-cell/src/models.rs
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::error::AppError;
use shared_store::{AppointmentType, ScheduleKind};

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateScheduleRequest {
    pub doctor_id: Uuid,
    pub kind: ScheduleKind,
    pub day_of_week: Option<u8>,
    pub specific_date: Option<NaiveDate>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub slot_duration_minutes: i32,
    pub slot_capacity: Option<i32>,
    pub appointment_type: AppointmentType,
    pub consultation_fee: Option<i64>,
    pub discount_percent: Option<i32>,
    pub effective_from: Option<NaiveDate>,
    pub effective_until: Option<NaiveDate>,
    pub minimum_booking_days: Option<i32>,
    pub max_advance_booking_days: Option<i32>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateScheduleRequest {
    pub day_of_week: Option<u8>,
    pub specific_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub slot_duration_minutes: Option<i32>,
    pub slot_capacity: Option<i32>,
    pub consultation_fee: Option<i64>,
    pub discount_percent: Option<i32>,
    pub effective_from: Option<NaiveDate>,
    pub effective_until: Option<NaiveDate>,
    pub minimum_booking_days: Option<i32>,
    pub max_advance_booking_days: Option<i32>,
    pub is_available: Option<bool>,
    pub note: Option<String>,
}

// ==============================================================================
// REPORT MODELS
// ==============================================================================

/// Outcome of a generation run: how many slot rows were inserted and how many
/// existing unbooked rows were switched off because they fell outside the
/// winning set. Counts are for messaging, not correctness.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlotSyncReport {
    pub created: usize,
    pub disabled: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RestoreReport {
    pub restored: usize,
}

/// Returned by schedule mutations that ripple into slots and appointments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleChangeResult {
    pub schedule: shared_store::Schedule,
    pub sync: SlotSyncReport,
    pub cancelled_appointments: usize,
    pub flagged_appointments: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleDeleteResult {
    pub schedule_id: Uuid,
    pub removed_slots: usize,
    pub restore: RestoreReport,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum ScheduleError {
    #[error("Schedule not found")]
    NotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Schedule conflicts with existing window {start} - {end}")]
    Overlap { start: NaiveTime, end: NaiveTime },

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<ScheduleError> for AppError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::NotFound => AppError::NotFound("schedule not found".to_string()),
            ScheduleError::DoctorNotFound => AppError::NotFound("doctor not found".to_string()),
            ScheduleError::Overlap { .. } => AppError::Conflict(err.to_string()),
            ScheduleError::Validation(msg) => AppError::Validation(msg),
        }
    }
}

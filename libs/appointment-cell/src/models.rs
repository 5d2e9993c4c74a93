// libs/appointment-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::error::AppError;
use shared_store::{AppointmentStatus, AppointmentType, CancelledBy};

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub slot_id: Uuid,
    pub patient_id: Uuid,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelAppointmentRequest {
    pub reason: String,
    pub cancelled_by: CancelledBy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub new_slot_id: Uuid,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmPaymentRequest {
    pub payment_id: String,
    pub amount: i64,
}

/// Who is joining a video call. Drives the auto-advance rules and token
/// ownership.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Participant {
    Doctor,
    Patient,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentSearchQuery {
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub appointment_type: Option<AppointmentType>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

// ==============================================================================
// RESPONSE MODELS
// ==============================================================================

/// Join details handed back from the video check-in entry point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoJoinInfo {
    pub appointment: shared_store::Appointment,
    pub room_url: String,
    pub room_name: String,
    pub meeting_token: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentStats {
    pub total_appointments: usize,
    pub completed_appointments: usize,
    pub cancelled_appointments: usize,
    pub average_consultation_minutes: i64,
    pub type_breakdown: Vec<(AppointmentType, usize)>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum BookingError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Slot not found")]
    SlotNotFound,

    #[error("Slot is not available")]
    SlotUnavailable,

    #[error("Slot is fully booked")]
    SlotFull,

    #[error("Slot start time is in the past")]
    SlotInPast,

    #[error("Patient already has a booking on this slot")]
    DuplicateBooking,

    #[error("Slot has no declared appointment type")]
    NoAppointmentType,

    #[error("Slot does not support this appointment type")]
    UnsupportedAppointmentType,

    #[error("Slot belongs to a different doctor")]
    DoctorMismatch,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Check-in window violation: {0}")]
    CheckInWindow(String),

    #[error("Meeting room provisioning failed: {0}")]
    RoomProvisioning(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::NotFound
            | BookingError::SlotNotFound
            | BookingError::PatientNotFound
            | BookingError::DoctorNotFound => AppError::NotFound(err.to_string()),
            BookingError::SlotUnavailable
            | BookingError::SlotFull
            | BookingError::DuplicateBooking
            | BookingError::InvalidTransition { .. } => AppError::Conflict(err.to_string()),
            BookingError::SlotInPast
            | BookingError::NoAppointmentType
            | BookingError::UnsupportedAppointmentType
            | BookingError::DoctorMismatch
            | BookingError::CheckInWindow(_)
            | BookingError::Validation(_) => AppError::Validation(err.to_string()),
            BookingError::RoomProvisioning(_) => AppError::ExternalService(err.to_string()),
        }
    }
}

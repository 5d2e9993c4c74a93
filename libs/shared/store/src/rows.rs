// libs/shared/store/src/rows.rs
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ==============================================================================
// SCHEDULE ROWS
// ==============================================================================

/// The three schedule layers. Priority is derived from the variant, never
/// stored separately, so kind and priority cannot drift apart.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleKind {
    Regular,
    Flexible,
    TimeOff,
}

impl ScheduleKind {
    /// Winner-takes-all ordering: a higher tier supersedes a lower one for
    /// the same doctor and day. Only equal tiers can conflict directly.
    pub fn priority(&self) -> u8 {
        match self {
            ScheduleKind::Regular => 1,
            ScheduleKind::Flexible => 2,
            ScheduleKind::TimeOff => 3,
        }
    }

    /// Whether schedules of this kind produce bookable slots.
    pub fn is_working(&self) -> bool {
        !matches!(self, ScheduleKind::TimeOff)
    }
}

impl fmt::Display for ScheduleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleKind::Regular => write!(f, "regular"),
            ScheduleKind::Flexible => write!(f, "flexible"),
            ScheduleKind::TimeOff => write!(f, "time_off"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub kind: ScheduleKind,
    /// 0 = Sunday .. 6 = Saturday. Read for Regular schedules only.
    pub day_of_week: Option<u8>,
    /// Read for Flexible/TimeOff schedules only.
    pub specific_date: Option<NaiveDate>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub slot_duration_minutes: i32,
    pub slot_capacity: i32,
    pub appointment_type: AppointmentType,
    /// Minor currency units. Falls back to the doctor's default fee when zero
    /// is not intended; `None` means "no schedule-level fee".
    pub consultation_fee: Option<i64>,
    pub discount_percent: i32,
    pub effective_from: Option<NaiveDate>,
    pub effective_until: Option<NaiveDate>,
    pub minimum_booking_days: i32,
    pub max_advance_booking_days: i32,
    pub is_available: bool,
    /// Bumped on every time-affecting edit; stamped onto generated slots.
    pub version: i64,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Schedule {
    /// Whether this schedule contributes to the given calendar day.
    pub fn applies_on(&self, date: NaiveDate) -> bool {
        match self.kind {
            ScheduleKind::Regular => {
                let weekday = chrono::Datelike::weekday(&date).num_days_from_sunday() as u8;
                self.day_of_week == Some(weekday) && self.effective_on(date)
            }
            ScheduleKind::Flexible | ScheduleKind::TimeOff => self.specific_date == Some(date),
        }
    }

    /// Effective-window containment, unbounded ends treated as infinite.
    pub fn effective_on(&self, date: NaiveDate) -> bool {
        if let Some(from) = self.effective_from {
            if date < from {
                return false;
            }
        }
        if let Some(until) = self.effective_until {
            if date > until {
                return false;
            }
        }
        true
    }
}

// ==============================================================================
// SLOT ROWS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Slot {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub schedule_id: Uuid,
    pub schedule_version: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub capacity: i32,
    pub booked_count: i32,
    /// The first entry is the type a booking resolves to.
    pub appointment_types: Vec<AppointmentType>,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Slot {
    pub fn is_full(&self) -> bool {
        self.booked_count >= self.capacity
    }

    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_time < end && start < self.end_time
    }
}

// ==============================================================================
// APPOINTMENT ROWS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    PendingPayment,
    Pending,
    Confirmed,
    CheckedIn,
    InProgress,
    Completed,
    Cancelled,
    Rescheduled,
}

impl AppointmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Completed | AppointmentStatus::Cancelled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::PendingPayment => write!(f, "pending_payment"),
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::CheckedIn => write!(f, "checked_in"),
            AppointmentStatus::InProgress => write!(f, "in_progress"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::Rescheduled => write!(f, "rescheduled"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentType {
    InClinic,
    Video,
}

impl fmt::Display for AppointmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentType::InClinic => write!(f, "in_clinic"),
            AppointmentType::Video => write!(f, "video"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CancelledBy {
    Patient,
    Doctor,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub appointment_number: String,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub slot_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub status: AppointmentStatus,
    pub appointment_type: AppointmentType,
    pub fee_amount: i64,
    pub paid_amount: i64,
    pub payment_id: Option<String>,
    pub check_in_time: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub cancelled_by: Option<CancelledBy>,
    /// Soft marker left when a schedule edit removes coverage without
    /// cancelling the booking.
    pub has_conflict: bool,
    pub conflict_reason: Option<String>,
    /// Per-doctor, per-day check-in ordinal. In-clinic only.
    pub queue_number: Option<i32>,
    pub meeting_room_url: Option<String>,
    pub meeting_room_name: Option<String>,
    pub meeting_room_id: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// A booking still occupying its slot seat.
    pub fn occupies_seat(&self) -> bool {
        self.status != AppointmentStatus::Cancelled
    }
}

// ==============================================================================
// DIRECTORY ROWS (read-only collaborators)
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub display_name: String,
    /// Minor currency units; used when a schedule carries no fee.
    pub default_fee: Option<i64>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub display_name: String,
    pub is_active: bool,
}

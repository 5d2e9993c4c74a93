// libs/appointment-cell/src/services/booking.rs
//
// Transactional booking: the target slot's row lock is held across the whole
// validate-and-mutate sequence so the last seat cannot be sold twice, and the
// appointment row is committed before the lock is released.
use chrono::Utc;
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_store::{
    Appointment, AppointmentStatus, AppointmentType, ClinicStore,
};
use video_room_cell::RoomProvider;

use crate::models::{
    AppointmentSearchQuery, AppointmentStats, BookingError, CreateAppointmentRequest,
};
use crate::services::pricing;

const APPOINTMENT_NUMBER_PREFIX: &str = "APT";
const APPOINTMENT_NUMBER_SUFFIX_LEN: usize = 4;

pub struct BookingService {
    store: Arc<ClinicStore>,
    rooms: Arc<dyn RoomProvider>,
}

impl BookingService {
    pub fn new(store: Arc<ClinicStore>, rooms: Arc<dyn RoomProvider>) -> Self {
        Self { store, rooms }
    }

    /// Reserve a seat on a slot and create the appointment, all under the
    /// slot's write lock. Fail-fast validation order: missing slot,
    /// unavailable, full, past, duplicate patient booking, missing type.
    pub async fn create_appointment(
        &self,
        request: CreateAppointmentRequest,
    ) -> Result<Appointment, BookingError> {
        let patient = self
            .store
            .patient(request.patient_id)
            .ok_or(BookingError::PatientNotFound)?;
        if !patient.is_active {
            return Err(BookingError::PatientNotFound);
        }

        let guard = self.store.lock_slot(request.slot_id).await;

        let mut slot = self
            .store
            .slot(request.slot_id)
            .ok_or(BookingError::SlotNotFound)?;
        if !slot.is_available {
            return Err(BookingError::SlotUnavailable);
        }
        if slot.is_full() {
            return Err(BookingError::SlotFull);
        }
        let now = Utc::now();
        if slot.start_time <= now {
            return Err(BookingError::SlotInPast);
        }

        let already_booked = self
            .store
            .appointments_for_slot(slot.id)
            .iter()
            .any(|a| a.patient_id == request.patient_id && a.occupies_seat());
        if already_booked {
            return Err(BookingError::DuplicateBooking);
        }

        let appointment_type = *slot
            .appointment_types
            .first()
            .ok_or(BookingError::NoAppointmentType)?;

        let schedule = self.store.schedule(slot.schedule_id);
        let doctor = self.store.doctor(slot.doctor_id);
        let fee = pricing::quote(schedule.as_ref(), doctor.as_ref());

        let status = if fee.is_free() {
            AppointmentStatus::Confirmed
        } else {
            AppointmentStatus::PendingPayment
        };

        let appointment = Appointment {
            id: Uuid::new_v4(),
            appointment_number: generate_appointment_number(),
            patient_id: request.patient_id,
            doctor_id: slot.doctor_id,
            slot_id: slot.id,
            scheduled_at: slot.start_time,
            duration_minutes: (slot.end_time - slot.start_time).num_minutes() as i32,
            status,
            appointment_type,
            fee_amount: fee.final_fee,
            paid_amount: 0,
            payment_id: None,
            check_in_time: None,
            started_at: None,
            ended_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            cancelled_by: None,
            has_conflict: false,
            conflict_reason: None,
            queue_number: None,
            meeting_room_url: None,
            meeting_room_name: None,
            meeting_room_id: None,
            note: request.note,
            created_at: now,
            updated_at: now,
        };
        self.store.put_appointment(appointment.clone());

        slot.booked_count += 1;
        if slot.is_full() {
            slot.is_available = false;
        }
        slot.updated_at = now;
        self.store.put_slot(slot);

        drop(guard);

        info!(
            "appointment {} booked on slot {} for patient {} ({})",
            appointment.appointment_number, appointment.slot_id, appointment.patient_id, status
        );

        // Free video consults skip payment entirely, so give them their room
        // right away. Failure is logged, never fatal to the booking.
        if status == AppointmentStatus::Confirmed
            && appointment_type == AppointmentType::Video
        {
            match self.rooms.get_or_create_room(appointment.id).await {
                Ok(room) => {
                    let _guard = self.store.lock_appointment(appointment.id).await;
                    if let Some(mut row) = self.store.appointment(appointment.id) {
                        row.meeting_room_url = Some(room.url);
                        row.meeting_room_name = Some(room.name);
                        row.meeting_room_id = Some(room.id);
                        row.updated_at = Utc::now();
                        self.store.put_appointment(row.clone());
                        return Ok(row);
                    }
                }
                Err(e) => {
                    warn!(
                        "eager room creation failed for appointment {}: {}",
                        appointment.id, e
                    );
                }
            }
        }

        Ok(self.store.appointment(appointment.id).unwrap_or(appointment))
    }

    pub fn get_appointment(&self, appointment_id: Uuid) -> Result<Appointment, BookingError> {
        self.store
            .appointment(appointment_id)
            .ok_or(BookingError::NotFound)
    }

    /// Filtered search over appointments, newest scheduled first.
    pub fn search_appointments(&self, query: &AppointmentSearchQuery) -> Vec<Appointment> {
        debug!("searching appointments with filters: {:?}", query);

        let mut results: Vec<Appointment> = self
            .store
            .all_appointments()
            .into_iter()
            .filter(|a| query.patient_id.map_or(true, |id| a.patient_id == id))
            .filter(|a| query.doctor_id.map_or(true, |id| a.doctor_id == id))
            .filter(|a| query.status.map_or(true, |s| a.status == s))
            .filter(|a| {
                query
                    .appointment_type
                    .map_or(true, |t| a.appointment_type == t)
            })
            .filter(|a| query.from_date.map_or(true, |from| a.scheduled_at >= from))
            .filter(|a| query.to_date.map_or(true, |to| a.scheduled_at <= to))
            .collect();

        results.sort_by(|a, b| b.scheduled_at.cmp(&a.scheduled_at));

        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);
        results.into_iter().skip(offset).take(limit).collect()
    }

    /// Active bookings starting within the next `hours_ahead` hours.
    pub fn upcoming_appointments(
        &self,
        patient_id: Option<Uuid>,
        doctor_id: Option<Uuid>,
        hours_ahead: i64,
    ) -> Vec<Appointment> {
        let now = Utc::now();
        let horizon = now + chrono::Duration::hours(hours_ahead);

        self.search_appointments(&AppointmentSearchQuery {
            patient_id,
            doctor_id,
            from_date: Some(now),
            to_date: Some(horizon),
            ..Default::default()
        })
        .into_iter()
        .filter(|a| {
            matches!(
                a.status,
                AppointmentStatus::PendingPayment
                    | AppointmentStatus::Pending
                    | AppointmentStatus::Confirmed
                    | AppointmentStatus::CheckedIn
                    | AppointmentStatus::InProgress
            )
        })
        .collect()
    }

    pub fn appointment_stats(
        &self,
        patient_id: Option<Uuid>,
        doctor_id: Option<Uuid>,
    ) -> AppointmentStats {
        let appointments = self.search_appointments(&AppointmentSearchQuery {
            patient_id,
            doctor_id,
            ..Default::default()
        });

        let completed: Vec<_> = appointments
            .iter()
            .filter(|a| a.status == AppointmentStatus::Completed)
            .collect();
        let cancelled = appointments
            .iter()
            .filter(|a| a.status == AppointmentStatus::Cancelled)
            .count();

        let average_consultation_minutes = if completed.is_empty() {
            0
        } else {
            completed
                .iter()
                .map(|a| a.duration_minutes as i64)
                .sum::<i64>()
                / completed.len() as i64
        };

        let mut breakdown: Vec<(AppointmentType, usize)> = Vec::new();
        for appointment in &appointments {
            match breakdown
                .iter_mut()
                .find(|(t, _)| *t == appointment.appointment_type)
            {
                Some((_, count)) => *count += 1,
                None => breakdown.push((appointment.appointment_type, 1)),
            }
        }

        AppointmentStats {
            total_appointments: appointments.len(),
            completed_appointments: completed.len(),
            cancelled_appointments: cancelled,
            average_consultation_minutes,
            type_breakdown: breakdown,
        }
    }
}

/// `APT` + base36 millisecond timestamp + random base36 suffix. The random
/// tail leaves a theoretical collision window; uniqueness is not enforced
/// with a retry loop here.
pub fn generate_appointment_number() -> String {
    let millis = Utc::now().timestamp_millis().max(0) as u64;
    let mut rng = rand::thread_rng();
    let suffix: String = (0..APPOINTMENT_NUMBER_SUFFIX_LEN)
        .map(|_| to_base36_digit(rng.gen_range(0..36)))
        .collect();
    format!("{}{}{}", APPOINTMENT_NUMBER_PREFIX, to_base36(millis), suffix)
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(to_base36_digit((value % 36) as u32));
        value /= 36;
    }
    digits.iter().rev().collect()
}

fn to_base36_digit(value: u32) -> char {
    char::from_digit(value, 36)
        .map(|c| c.to_ascii_uppercase())
        .unwrap_or('0')
}

// libs/appointment-cell/src/services/reschedule.rs
//
// Moving and cancelling bookings while keeping slot counters honest. Lock
// order is fixed everywhere: appointment first, then old slot, then new slot,
// so two concurrent swaps cannot wait on each other in a cycle.
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use shared_store::{Appointment, AppointmentStatus, ClinicStore};
use video_room_cell::RoomProvider;

use crate::models::{BookingError, CancelAppointmentRequest, RescheduleAppointmentRequest};

pub struct RescheduleService {
    store: Arc<ClinicStore>,
    rooms: Arc<dyn RoomProvider>,
}

impl RescheduleService {
    pub fn new(store: Arc<ClinicStore>, rooms: Arc<dyn RoomProvider>) -> Self {
        Self { store, rooms }
    }

    /// Cancel a booking and give its seat back.
    pub async fn cancel_appointment(
        &self,
        appointment_id: Uuid,
        request: CancelAppointmentRequest,
    ) -> Result<Appointment, BookingError> {
        let _guard = self.store.lock_appointment(appointment_id).await;
        let mut row = self
            .store
            .appointment(appointment_id)
            .ok_or(BookingError::NotFound)?;

        if row.status.is_terminal() {
            return Err(BookingError::InvalidTransition {
                from: row.status,
                to: AppointmentStatus::Cancelled,
            });
        }

        let now = Utc::now();
        row.status = AppointmentStatus::Cancelled;
        row.cancelled_at = Some(now);
        row.cancellation_reason = Some(request.reason);
        row.cancelled_by = Some(request.cancelled_by);
        row.updated_at = now;
        self.store.put_appointment(row.clone());

        release_slot_seat(&self.store, row.slot_id).await;

        // Teardown is best-effort; the cancellation stands either way.
        if let Some(room_name) = &row.meeting_room_name {
            if let Err(e) = self.rooms.delete_room(room_name).await {
                warn!(
                    "room teardown failed for cancelled appointment {}: {}",
                    row.id, e
                );
            }
        }

        info!(
            "appointment {} cancelled by {:?}",
            row.appointment_number, row.cancelled_by
        );
        Ok(row)
    }

    /// Move a booking to another slot of the same doctor. Every check runs
    /// before the first write, so a rejected reschedule leaves the
    /// appointment and both slots untouched.
    pub async fn reschedule_appointment(
        &self,
        appointment_id: Uuid,
        request: RescheduleAppointmentRequest,
    ) -> Result<Appointment, BookingError> {
        let _appointment_guard = self.store.lock_appointment(appointment_id).await;
        let mut row = self
            .store
            .appointment(appointment_id)
            .ok_or(BookingError::NotFound)?;

        if !matches!(
            row.status,
            AppointmentStatus::Confirmed
                | AppointmentStatus::Pending
                | AppointmentStatus::PendingPayment
        ) {
            return Err(BookingError::InvalidTransition {
                from: row.status,
                to: AppointmentStatus::Rescheduled,
            });
        }

        let old_slot_id = row.slot_id;
        if request.new_slot_id == old_slot_id {
            return Err(BookingError::Validation(
                "the appointment is already on this slot".to_string(),
            ));
        }

        // Old before new: the global lock order for slot pairs.
        let _old_guard = self.store.lock_slot(old_slot_id).await;
        let _new_guard = self.store.lock_slot(request.new_slot_id).await;

        let mut old_slot = self
            .store
            .slot(old_slot_id)
            .ok_or(BookingError::SlotNotFound)?;
        let mut new_slot = self
            .store
            .slot(request.new_slot_id)
            .ok_or(BookingError::SlotNotFound)?;

        let now = Utc::now();
        if new_slot.doctor_id != row.doctor_id {
            return Err(BookingError::DoctorMismatch);
        }
        if new_slot.start_time <= now {
            return Err(BookingError::SlotInPast);
        }
        if !new_slot.appointment_types.contains(&row.appointment_type) {
            return Err(BookingError::UnsupportedAppointmentType);
        }
        let already_booked = self
            .store
            .appointments_for_slot(new_slot.id)
            .iter()
            .any(|a| a.patient_id == row.patient_id && a.occupies_seat());
        if already_booked {
            return Err(BookingError::DuplicateBooking);
        }
        if !new_slot.is_available {
            return Err(BookingError::SlotUnavailable);
        }
        if new_slot.is_full() {
            return Err(BookingError::SlotFull);
        }

        // All checks passed; mutate both slots and the appointment together.
        old_slot.booked_count = (old_slot.booked_count - 1).max(0);
        if !old_slot.is_full() && old_slot.start_time > now {
            old_slot.is_available = true;
        }
        old_slot.updated_at = now;
        self.store.put_slot(old_slot);

        new_slot.booked_count += 1;
        if new_slot.is_full() {
            new_slot.is_available = false;
        }
        new_slot.updated_at = now;
        let new_start = new_slot.start_time;
        let new_duration = (new_slot.end_time - new_slot.start_time).num_minutes() as i32;
        self.store.put_slot(new_slot);

        row.slot_id = request.new_slot_id;
        row.scheduled_at = new_start;
        row.duration_minutes = new_duration;
        if let Some(reason) = request.reason {
            row.note = Some(reason);
        }
        row.updated_at = now;
        self.store.put_appointment(row.clone());

        info!(
            "appointment {} moved from slot {} to slot {}",
            row.appointment_number, old_slot_id, row.slot_id
        );
        Ok(row)
    }
}

/// Give one seat back on a slot and re-open it when capacity and timing
/// allow. Used by both the cancel path and status-driven cancellation.
pub(crate) async fn release_slot_seat(store: &ClinicStore, slot_id: Uuid) {
    let _guard = store.lock_slot(slot_id).await;
    let Some(mut slot) = store.slot(slot_id) else {
        return;
    };
    slot.booked_count = (slot.booked_count - 1).max(0);
    if !slot.is_full() && slot.start_time > Utc::now() {
        slot.is_available = true;
    }
    slot.updated_at = Utc::now();
    store.put_slot(slot);
}

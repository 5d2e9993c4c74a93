// libs/appointment-cell/src/services/lifecycle.rs
//
// The appointment state machine. Transitions are validated against a closed
// matrix; entry side effects (timestamps, room provisioning, teardown) run
// inside the same appointment-row lock as the status write.
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_store::call_state::{CallState, CallStateStore};
use shared_store::{Appointment, AppointmentStatus, AppointmentType, ClinicStore};
use video_room_cell::RoomProvider;

use crate::models::{BookingError, ConfirmPaymentRequest, Participant, VideoJoinInfo};
use crate::services::reschedule::release_slot_seat;

const CLINIC_CHECK_IN_EARLY_MINUTES: i64 = 30;
const CLINIC_CHECK_IN_LATE_MINUTES: i64 = 15;
const VIDEO_CHECK_IN_EARLY_MINUTES: i64 = 60;
const VIDEO_CHECK_IN_LATE_MINUTES: i64 = 30;

pub struct LifecycleService {
    store: Arc<ClinicStore>,
    rooms: Arc<dyn RoomProvider>,
    call_state: Arc<dyn CallStateStore>,
}

impl LifecycleService {
    pub fn new(
        store: Arc<ClinicStore>,
        rooms: Arc<dyn RoomProvider>,
        call_state: Arc<dyn CallStateStore>,
    ) -> Self {
        Self {
            store,
            rooms,
            call_state,
        }
    }

    /// All statuses reachable from `current` in one step.
    pub fn valid_transitions(current: AppointmentStatus) -> &'static [AppointmentStatus] {
        use AppointmentStatus::*;
        match current {
            PendingPayment => &[Confirmed, Cancelled, Pending],
            Pending => &[Confirmed, Cancelled],
            Confirmed => &[CheckedIn, InProgress, Cancelled],
            CheckedIn => &[InProgress, Cancelled],
            InProgress => &[Completed, Cancelled],
            Completed | Cancelled => &[],
            Rescheduled => &[Confirmed, Cancelled],
        }
    }

    pub fn validate_transition(
        from: AppointmentStatus,
        to: AppointmentStatus,
    ) -> Result<(), BookingError> {
        if Self::valid_transitions(from).contains(&to) {
            Ok(())
        } else {
            warn!("invalid status transition attempted: {} -> {}", from, to);
            Err(BookingError::InvalidTransition { from, to })
        }
    }

    /// Apply a caller-initiated status change with its entry side effects.
    pub async fn update_status(
        &self,
        appointment_id: Uuid,
        new_status: AppointmentStatus,
    ) -> Result<Appointment, BookingError> {
        let guard = self.store.lock_appointment(appointment_id).await;
        let mut row = self
            .store
            .appointment(appointment_id)
            .ok_or(BookingError::NotFound)?;

        Self::validate_transition(row.status, new_status)?;
        let now = Utc::now();

        match new_status {
            AppointmentStatus::Confirmed => {
                // A paid video consult must have its room before anyone is
                // told it is confirmed; failure aborts the transition.
                if row.appointment_type == AppointmentType::Video
                    && row.meeting_room_name.is_none()
                {
                    let room = self
                        .rooms
                        .get_or_create_room(row.id)
                        .await
                        .map_err(|e| BookingError::RoomProvisioning(e.to_string()))?;
                    row.meeting_room_url = Some(room.url);
                    row.meeting_room_name = Some(room.name);
                    row.meeting_room_id = Some(room.id);
                }
            }
            AppointmentStatus::CheckedIn => {
                if row.check_in_time.is_none() {
                    row.check_in_time = Some(now);
                }
            }
            AppointmentStatus::InProgress => {
                if row.started_at.is_none() {
                    row.started_at = Some(now);
                }
            }
            AppointmentStatus::Completed => {
                row.ended_at = Some(now);
            }
            AppointmentStatus::Cancelled => {
                row.cancelled_at = Some(now);
            }
            _ => {}
        }

        row.status = new_status;
        row.updated_at = now;
        self.store.put_appointment(row.clone());

        match new_status {
            AppointmentStatus::Completed => {
                if row.appointment_type == AppointmentType::Video {
                    self.teardown_video(&row).await;
                }
            }
            AppointmentStatus::Cancelled => {
                release_slot_seat(&self.store, row.slot_id).await;
                if row.appointment_type == AppointmentType::Video {
                    self.teardown_video(&row).await;
                }
            }
            _ => {}
        }
        drop(guard);

        info!(
            "appointment {} moved to {}",
            row.appointment_number, new_status
        );
        Ok(row)
    }

    /// In-clinic check-in: bounded window around the scheduled start, and the
    /// next per-doctor per-day queue ordinal.
    pub async fn check_in(&self, appointment_id: Uuid) -> Result<Appointment, BookingError> {
        let _guard = self.store.lock_appointment(appointment_id).await;
        let mut row = self
            .store
            .appointment(appointment_id)
            .ok_or(BookingError::NotFound)?;

        if row.appointment_type != AppointmentType::InClinic {
            return Err(BookingError::Validation(
                "video appointments use the video check-in entry point".to_string(),
            ));
        }
        Self::validate_transition(row.status, AppointmentStatus::CheckedIn)?;

        let now = Utc::now();
        let earliest = row.scheduled_at - Duration::minutes(CLINIC_CHECK_IN_EARLY_MINUTES);
        let latest = row.scheduled_at + Duration::minutes(CLINIC_CHECK_IN_LATE_MINUTES);
        if now < earliest || now > latest {
            return Err(BookingError::CheckInWindow(format!(
                "in-clinic check-in is open from {} minutes before to {} minutes after the scheduled time",
                CLINIC_CHECK_IN_EARLY_MINUTES, CLINIC_CHECK_IN_LATE_MINUTES
            )));
        }

        row.queue_number = Some(self.next_queue_number(row.doctor_id, &row));
        row.check_in_time = Some(now);
        row.status = AppointmentStatus::CheckedIn;
        row.updated_at = now;
        self.store.put_appointment(row.clone());

        info!(
            "appointment {} checked in with queue number {:?}",
            row.appointment_number, row.queue_number
        );
        Ok(row)
    }

    /// Video check-in / call join. Ensures the room exists, stamps the call
    /// state, auto-advances the status for the joining participant and mints
    /// their meeting token.
    pub async fn check_in_video(
        &self,
        appointment_id: Uuid,
        participant: Participant,
    ) -> Result<VideoJoinInfo, BookingError> {
        let _guard = self.store.lock_appointment(appointment_id).await;
        let mut row = self
            .store
            .appointment(appointment_id)
            .ok_or(BookingError::NotFound)?;

        if row.appointment_type != AppointmentType::Video {
            return Err(BookingError::Validation(
                "only video appointments can join a call".to_string(),
            ));
        }

        if !matches!(
            row.status,
            AppointmentStatus::Confirmed | AppointmentStatus::CheckedIn | AppointmentStatus::InProgress
        ) {
            return Err(BookingError::InvalidTransition {
                from: row.status,
                to: AppointmentStatus::CheckedIn,
            });
        }

        let now = Utc::now();
        let earliest = row.scheduled_at - Duration::minutes(VIDEO_CHECK_IN_EARLY_MINUTES);
        let latest = row.scheduled_at + Duration::minutes(VIDEO_CHECK_IN_LATE_MINUTES);
        if now < earliest || now > latest {
            return Err(BookingError::CheckInWindow(format!(
                "video join is open from {} minutes before to {} minutes after the scheduled time",
                VIDEO_CHECK_IN_EARLY_MINUTES, VIDEO_CHECK_IN_LATE_MINUTES
            )));
        }

        // Joining needs a live room; provisioning failure here is fatal.
        if row.meeting_room_name.is_none() {
            let room = self
                .rooms
                .get_or_create_room(row.id)
                .await
                .map_err(|e| BookingError::RoomProvisioning(e.to_string()))?;
            row.meeting_room_url = Some(room.url);
            row.meeting_room_name = Some(room.name);
            row.meeting_room_id = Some(room.id);
        }
        let room_name = row.meeting_room_name.clone().unwrap_or_default();
        let room_url = row.meeting_room_url.clone().unwrap_or_default();

        match (participant, row.status) {
            (Participant::Doctor, AppointmentStatus::Confirmed) => {
                // Implicit check-in and start in one step.
                row.check_in_time = Some(now);
                row.started_at = Some(now);
                row.status = AppointmentStatus::InProgress;
            }
            (Participant::Patient, AppointmentStatus::Confirmed) => {
                row.check_in_time = Some(now);
                row.status = AppointmentStatus::CheckedIn;
            }
            (Participant::Doctor, AppointmentStatus::CheckedIn) => {
                row.started_at = Some(now);
                row.status = AppointmentStatus::InProgress;
            }
            _ => {}
        }
        row.updated_at = now;
        self.store.put_appointment(row.clone());

        // Live call state is advisory; a cache hiccup never blocks the join.
        let mut state = match self.call_state.get(row.id).await {
            Ok(Some(state)) => state,
            Ok(None) => CallState::new(row.id, room_name.clone()),
            Err(e) => {
                warn!("call state lookup failed for appointment {}: {}", row.id, e);
                CallState::new(row.id, room_name.clone())
            }
        };
        match participant {
            Participant::Doctor => state.doctor_joined_at = Some(now),
            Participant::Patient => state.patient_joined_at = Some(now),
        }
        if let Err(e) = self.call_state.put(state).await {
            warn!("call state update failed for appointment {}: {}", row.id, e);
        }

        let (user_id, user_name, is_owner) = match participant {
            Participant::Doctor => {
                let doctor = self
                    .store
                    .doctor(row.doctor_id)
                    .ok_or(BookingError::DoctorNotFound)?;
                (doctor.id, doctor.display_name, true)
            }
            Participant::Patient => {
                let patient = self
                    .store
                    .patient(row.patient_id)
                    .ok_or(BookingError::PatientNotFound)?;
                (patient.id, patient.display_name, false)
            }
        };

        let meeting_token = self
            .rooms
            .create_meeting_token(&room_name, user_id, &user_name, is_owner)
            .await
            .map_err(|e| BookingError::RoomProvisioning(e.to_string()))?;

        debug!(
            "{:?} joined call for appointment {} ({})",
            participant, row.appointment_number, row.status
        );
        Ok(VideoJoinInfo {
            appointment: row,
            room_url,
            room_name,
            meeting_token,
        })
    }

    /// Payment confirmation: only valid from PendingPayment. Video rooms are
    /// provisioned eagerly and a failure aborts the confirmation.
    pub async fn confirm_payment(
        &self,
        appointment_id: Uuid,
        request: ConfirmPaymentRequest,
    ) -> Result<Appointment, BookingError> {
        let _guard = self.store.lock_appointment(appointment_id).await;
        let mut row = self
            .store
            .appointment(appointment_id)
            .ok_or(BookingError::NotFound)?;

        if row.status != AppointmentStatus::PendingPayment {
            return Err(BookingError::InvalidTransition {
                from: row.status,
                to: AppointmentStatus::Confirmed,
            });
        }

        if row.appointment_type == AppointmentType::Video && row.meeting_room_name.is_none() {
            let room = self
                .rooms
                .get_or_create_room(row.id)
                .await
                .map_err(|e| BookingError::RoomProvisioning(e.to_string()))?;
            row.meeting_room_url = Some(room.url);
            row.meeting_room_name = Some(room.name);
            row.meeting_room_id = Some(room.id);
        }

        let now = Utc::now();
        row.paid_amount = request.amount;
        row.payment_id = Some(request.payment_id);
        row.status = AppointmentStatus::Confirmed;
        row.updated_at = now;
        self.store.put_appointment(row.clone());

        info!(
            "appointment {} confirmed after payment of {}",
            row.appointment_number, row.paid_amount
        );
        Ok(row)
    }

    fn next_queue_number(&self, doctor_id: Uuid, row: &Appointment) -> i32 {
        let day = row.scheduled_at.date_naive();
        self.store
            .appointments_for_doctor(doctor_id)
            .iter()
            .filter(|a| a.scheduled_at.date_naive() == day)
            .filter_map(|a| a.queue_number)
            .max()
            .unwrap_or(0)
            + 1
    }

    async fn teardown_video(&self, row: &Appointment) {
        if let Some(room_name) = &row.meeting_room_name {
            if let Err(e) = self.rooms.delete_room(room_name).await {
                warn!(
                    "room teardown failed for appointment {}: {}",
                    row.id, e
                );
            }
        }
        if let Err(e) = self.call_state.clear(row.id).await {
            warn!(
                "call state clear failed for appointment {}: {}",
                row.id, e
            );
        }
    }
}

// libs/appointment-cell/src/api.rs
//
// The facade the surrounding API layer calls. Every entry point returns the
// uniform {code, message, data} envelope; routing, authentication and input
// parsing live outside this crate.
use std::sync::Arc;
use uuid::Uuid;

use shared_models::envelope::Envelope;
use shared_models::error::AppError;
use shared_store::call_state::CallStateStore;
use shared_store::{Appointment, AppointmentStatus, ClinicStore};
use video_room_cell::RoomProvider;

use crate::models::{
    AppointmentSearchQuery, CancelAppointmentRequest, ConfirmPaymentRequest,
    CreateAppointmentRequest, Participant, RescheduleAppointmentRequest, VideoJoinInfo,
};
use crate::services::booking::BookingService;
use crate::services::lifecycle::LifecycleService;
use crate::services::reschedule::RescheduleService;

pub struct AppointmentApi {
    booking: BookingService,
    lifecycle: LifecycleService,
    reschedule: RescheduleService,
}

impl AppointmentApi {
    pub fn new(
        store: Arc<ClinicStore>,
        rooms: Arc<dyn RoomProvider>,
        call_state: Arc<dyn CallStateStore>,
    ) -> Self {
        Self {
            booking: BookingService::new(Arc::clone(&store), Arc::clone(&rooms)),
            lifecycle: LifecycleService::new(
                Arc::clone(&store),
                Arc::clone(&rooms),
                call_state,
            ),
            reschedule: RescheduleService::new(store, rooms),
        }
    }

    pub async fn create(&self, request: CreateAppointmentRequest) -> Envelope<Appointment> {
        respond(
            self.booking.create_appointment(request).await,
            "appointment booked",
        )
    }

    pub fn find(&self, appointment_id: Uuid) -> Envelope<Appointment> {
        respond(self.booking.get_appointment(appointment_id), "appointment found")
    }

    pub fn search(&self, query: AppointmentSearchQuery) -> Envelope<Vec<Appointment>> {
        Envelope::ok("appointments found", self.booking.search_appointments(&query))
    }

    pub async fn cancel(
        &self,
        appointment_id: Uuid,
        request: CancelAppointmentRequest,
    ) -> Envelope<Appointment> {
        respond(
            self.reschedule
                .cancel_appointment(appointment_id, request)
                .await,
            "appointment cancelled",
        )
    }

    pub async fn reschedule(
        &self,
        appointment_id: Uuid,
        request: RescheduleAppointmentRequest,
    ) -> Envelope<Appointment> {
        respond(
            self.reschedule
                .reschedule_appointment(appointment_id, request)
                .await,
            "appointment rescheduled",
        )
    }

    pub async fn update_status(
        &self,
        appointment_id: Uuid,
        new_status: AppointmentStatus,
    ) -> Envelope<Appointment> {
        respond(
            self.lifecycle.update_status(appointment_id, new_status).await,
            "status updated",
        )
    }

    pub async fn confirm_payment(
        &self,
        appointment_id: Uuid,
        request: ConfirmPaymentRequest,
    ) -> Envelope<Appointment> {
        respond(
            self.lifecycle.confirm_payment(appointment_id, request).await,
            "payment confirmed",
        )
    }

    pub async fn check_in(&self, appointment_id: Uuid) -> Envelope<Appointment> {
        respond(self.lifecycle.check_in(appointment_id).await, "checked in")
    }

    pub async fn check_in_video(
        &self,
        appointment_id: Uuid,
        participant: Participant,
    ) -> Envelope<VideoJoinInfo> {
        respond(
            self.lifecycle
                .check_in_video(appointment_id, participant)
                .await,
            "joined video call",
        )
    }
}

fn respond<T>(result: Result<T, crate::models::BookingError>, message: &str) -> Envelope<T> {
    match result {
        Ok(data) => Envelope::ok(message, data),
        Err(err) => Envelope::error(&AppError::from(err)),
    }
}

// libs/appointment-cell/tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use shared_store::call_state::InMemoryCallStateStore;
use shared_store::{
    AppointmentType, ClinicStore, Doctor, Patient, Schedule, ScheduleKind, Slot,
};
use video_room_cell::models::{MeetingRoom, VideoRoomError};
use video_room_cell::RoomProvider;

use appointment_cell::services::booking::BookingService;
use appointment_cell::services::lifecycle::LifecycleService;
use appointment_cell::services::reschedule::RescheduleService;

/// In-process stand-in for the managed rooms API.
#[derive(Default)]
pub struct FakeRoomProvider {
    pub fail_create: AtomicBool,
    pub created: AtomicUsize,
    pub deleted: Mutex<Vec<String>>,
}

impl FakeRoomProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn deleted_rooms(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl RoomProvider for FakeRoomProvider {
    async fn get_or_create_room(&self, appointment_id: Uuid) -> Result<MeetingRoom, VideoRoomError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(VideoRoomError::ApiError {
                message: "room service down".to_string(),
            });
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        let name = format!("appt-{}", appointment_id.simple());
        Ok(MeetingRoom {
            id: Uuid::new_v4().to_string(),
            name: name.clone(),
            url: format!("https://rooms.test/{}", name),
        })
    }

    async fn delete_room(&self, room_name: &str) -> Result<(), VideoRoomError> {
        self.deleted.lock().unwrap().push(room_name.to_string());
        Ok(())
    }

    async fn create_meeting_token(
        &self,
        room_name: &str,
        _user_id: Uuid,
        _user_name: &str,
        is_owner: bool,
    ) -> Result<String, VideoRoomError> {
        Ok(format!("token-{}-{}", room_name, is_owner))
    }
}

pub struct TestHarness {
    pub store: Arc<ClinicStore>,
    pub rooms: Arc<FakeRoomProvider>,
    pub booking: BookingService,
    pub lifecycle: LifecycleService,
    pub reschedule: RescheduleService,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
}

pub fn setup() -> TestHarness {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let store = Arc::new(ClinicStore::new());
    let rooms = FakeRoomProvider::new();
    let call_state = Arc::new(InMemoryCallStateStore::new());

    let doctor_id = Uuid::new_v4();
    store.upsert_doctor(Doctor {
        id: doctor_id,
        display_name: "Dr. Test".to_string(),
        default_fee: Some(4000),
        is_active: true,
    });
    let patient_id = Uuid::new_v4();
    store.upsert_patient(Patient {
        id: patient_id,
        display_name: "Pat Test".to_string(),
        is_active: true,
    });

    let rooms_dyn: Arc<dyn RoomProvider> = rooms.clone();
    TestHarness {
        booking: BookingService::new(Arc::clone(&store), Arc::clone(&rooms_dyn)),
        lifecycle: LifecycleService::new(
            Arc::clone(&store),
            Arc::clone(&rooms_dyn),
            call_state,
        ),
        reschedule: RescheduleService::new(Arc::clone(&store), rooms_dyn),
        store,
        rooms,
        doctor_id,
        patient_id,
    }
}

impl TestHarness {
    pub fn add_patient(&self) -> Uuid {
        let patient_id = Uuid::new_v4();
        self.store.upsert_patient(Patient {
            id: patient_id,
            display_name: "Another Patient".to_string(),
            is_active: true,
        });
        patient_id
    }

    /// A bookable slot starting `start_in` from now.
    pub fn add_slot(
        &self,
        start_in: Duration,
        capacity: i32,
        appointment_type: AppointmentType,
    ) -> Slot {
        let now = Utc::now();
        let start = now + start_in;
        let slot = Slot {
            id: Uuid::new_v4(),
            doctor_id: self.doctor_id,
            schedule_id: Uuid::new_v4(),
            schedule_version: 1,
            start_time: start,
            end_time: start + Duration::minutes(30),
            capacity,
            booked_count: 0,
            appointment_types: vec![appointment_type],
            is_available: true,
            created_at: now,
            updated_at: now,
        };
        self.store.put_slot(slot.clone());
        slot
    }

    /// A slot whose backing schedule row exists, for fee resolution.
    pub fn add_slot_with_schedule(
        &self,
        start_in: Duration,
        fee: Option<i64>,
        discount_percent: i32,
    ) -> Slot {
        let mut slot = self.add_slot(start_in, 1, AppointmentType::InClinic);
        let now = Utc::now();
        let schedule = Schedule {
            id: slot.schedule_id,
            doctor_id: self.doctor_id,
            kind: ScheduleKind::Regular,
            day_of_week: Some(1),
            specific_date: None,
            start_time: chrono::NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            end_time: chrono::NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            slot_duration_minutes: 30,
            slot_capacity: 1,
            appointment_type: AppointmentType::InClinic,
            consultation_fee: fee,
            discount_percent,
            effective_from: None,
            effective_until: None,
            minimum_booking_days: 0,
            max_advance_booking_days: 90,
            is_available: true,
            version: 1,
            note: None,
            created_at: now,
            updated_at: now,
        };
        self.store.put_schedule(schedule);
        slot.schedule_version = 1;
        slot
    }

    pub fn slot_snapshot(&self, slot_id: Uuid) -> Slot {
        self.store.slot(slot_id).unwrap()
    }

    pub fn set_scheduled_at(&self, appointment_id: Uuid, at: DateTime<Utc>) {
        let mut row = self.store.appointment(appointment_id).unwrap();
        row.scheduled_at = at;
        self.store.put_appointment(row);
    }
}

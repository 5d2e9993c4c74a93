// libs/schedule-cell/tests/common/mod.rs
#![allow(dead_code)]

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_store::{
    AppointmentType, ClinicStore, Doctor, LogOnlyNotificationDispatcher, Patient, Schedule,
    ScheduleKind,
};

use schedule_cell::services::schedule::ScheduleService;

pub fn test_config() -> AppConfig {
    AppConfig {
        rooms_base_url: "http://localhost:0".to_string(),
        rooms_api_token: "test-token".to_string(),
        redis_url: None,
        slot_horizon_days: 90,
    }
}

pub fn setup() -> (Arc<ClinicStore>, ScheduleService, Uuid) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let store = Arc::new(ClinicStore::new());
    let doctor_id = Uuid::new_v4();
    store.upsert_doctor(Doctor {
        id: doctor_id,
        display_name: "Dr. Test".to_string(),
        default_fee: Some(5000),
        is_active: true,
    });
    let service = ScheduleService::new(
        &test_config(),
        Arc::clone(&store),
        Arc::new(LogOnlyNotificationDispatcher),
    );
    (store, service, doctor_id)
}

pub fn add_patient(store: &ClinicStore) -> Uuid {
    let patient_id = Uuid::new_v4();
    store.upsert_patient(Patient {
        id: patient_id,
        display_name: "Pat Test".to_string(),
        is_active: true,
    });
    patient_id
}

pub fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

/// The next Monday at least a week out, so generated slots are comfortably in
/// the future.
pub fn next_monday() -> NaiveDate {
    let mut date = Utc::now().date_naive() + Duration::days(7);
    while date.weekday().num_days_from_sunday() != 1 {
        date += Duration::days(1);
    }
    date
}

pub fn regular_schedule(
    doctor_id: Uuid,
    day_of_week: u8,
    start: NaiveTime,
    end: NaiveTime,
) -> Schedule {
    let now = Utc::now();
    Schedule {
        id: Uuid::new_v4(),
        doctor_id,
        kind: ScheduleKind::Regular,
        day_of_week: Some(day_of_week),
        specific_date: None,
        start_time: start,
        end_time: end,
        slot_duration_minutes: 30,
        slot_capacity: 1,
        appointment_type: AppointmentType::InClinic,
        consultation_fee: Some(5000),
        discount_percent: 0,
        effective_from: None,
        effective_until: None,
        minimum_booking_days: 0,
        max_advance_booking_days: 90,
        is_available: true,
        version: 1,
        note: None,
        created_at: now,
        updated_at: now,
    }
}

/// Manually seat a patient on a slot, the way the booking engine would.
pub fn book_slot(store: &ClinicStore, slot_id: Uuid, patient_id: Uuid) -> shared_store::Appointment {
    let mut slot = store.slot(slot_id).unwrap();
    slot.booked_count += 1;
    if slot.booked_count >= slot.capacity {
        slot.is_available = false;
    }
    store.put_slot(slot.clone());

    let now = Utc::now();
    let appointment = shared_store::Appointment {
        id: Uuid::new_v4(),
        appointment_number: format!("APT-TEST-{}", slot_id.simple()),
        patient_id,
        doctor_id: slot.doctor_id,
        slot_id,
        scheduled_at: slot.start_time,
        duration_minutes: (slot.end_time - slot.start_time).num_minutes() as i32,
        status: shared_store::AppointmentStatus::Confirmed,
        appointment_type: AppointmentType::InClinic,
        fee_amount: 0,
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
        note: None,
        created_at: now,
        updated_at: now,
    };
    store.put_appointment(appointment.clone());
    appointment
}

pub fn day_schedule(
    doctor_id: Uuid,
    kind: ScheduleKind,
    date: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
) -> Schedule {
    let mut schedule = regular_schedule(doctor_id, 0, start, end);
    schedule.kind = kind;
    schedule.day_of_week = None;
    schedule.specific_date = Some(date);
    schedule
}

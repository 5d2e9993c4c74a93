// libs/shared/store/src/store.rs
//
// Shared relational-style store backing every cell. Rows are committed
// values in concurrent tables; mutating engines serialize on per-row async
// locks (the row-level write locks of the booking transaction model), while
// plain reads return the last committed value without blocking and must
// re-validate under the lock before acting on what they saw.
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;
use uuid::Uuid;

use crate::rows::{Appointment, Doctor, Patient, Schedule, Slot};

/// Holds a row's write lock until dropped. All validation and mutation of the
/// row must happen while the guard is alive.
pub struct RowGuard {
    _guard: OwnedMutexGuard<()>,
}

#[derive(Default)]
pub struct ClinicStore {
    schedules: DashMap<Uuid, Schedule>,
    slots: DashMap<Uuid, Slot>,
    appointments: DashMap<Uuid, Appointment>,
    doctors: DashMap<Uuid, Doctor>,
    patients: DashMap<Uuid, Patient>,
    slot_locks: DashMap<Uuid, Arc<Mutex<()>>>,
    appointment_locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl ClinicStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn acquire(table: &DashMap<Uuid, Arc<Mutex<()>>>, id: Uuid) -> RowGuard {
        // Clone the Arc out before awaiting so the shard lock is not held
        // across the await point.
        let cell = table.entry(id).or_default().value().clone();
        RowGuard {
            _guard: cell.lock_owned().await,
        }
    }

    // ==========================================================================
    // SCHEDULES
    // ==========================================================================

    pub fn put_schedule(&self, schedule: Schedule) {
        self.schedules.insert(schedule.id, schedule);
    }

    pub fn schedule(&self, id: Uuid) -> Option<Schedule> {
        self.schedules.get(&id).map(|s| s.clone())
    }

    pub fn remove_schedule(&self, id: Uuid) -> Option<Schedule> {
        self.schedules.remove(&id).map(|(_, s)| s)
    }

    pub fn schedules_for_doctor(&self, doctor_id: Uuid) -> Vec<Schedule> {
        let mut out: Vec<Schedule> = self
            .schedules
            .iter()
            .filter(|s| s.doctor_id == doctor_id)
            .map(|s| s.clone())
            .collect();
        out.sort_by(|a, b| (a.start_time, a.id).cmp(&(b.start_time, b.id)));
        out
    }

    // ==========================================================================
    // SLOTS
    // ==========================================================================

    /// Acquire the slot row's write lock. Booking-affecting engines hold this
    /// across their whole validate-and-mutate sequence.
    pub async fn lock_slot(&self, id: Uuid) -> RowGuard {
        debug!("acquiring slot lock {}", id);
        Self::acquire(&self.slot_locks, id).await
    }

    pub fn put_slot(&self, slot: Slot) {
        self.slots.insert(slot.id, slot);
    }

    pub fn slot(&self, id: Uuid) -> Option<Slot> {
        self.slots.get(&id).map(|s| s.clone())
    }

    pub fn remove_slot(&self, id: Uuid) -> Option<Slot> {
        self.slot_locks.remove(&id);
        self.slots.remove(&id).map(|(_, s)| s)
    }

    pub fn slots_for_doctor(&self, doctor_id: Uuid) -> Vec<Slot> {
        let mut out: Vec<Slot> = self
            .slots
            .iter()
            .filter(|s| s.doctor_id == doctor_id)
            .map(|s| s.clone())
            .collect();
        out.sort_by(|a, b| (a.start_time, a.id).cmp(&(b.start_time, b.id)));
        out
    }

    pub fn slots_for_doctor_between(
        &self,
        doctor_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Vec<Slot> {
        let mut out: Vec<Slot> = self
            .slots
            .iter()
            .filter(|s| s.doctor_id == doctor_id && s.start_time < to && s.end_time > from)
            .map(|s| s.clone())
            .collect();
        out.sort_by(|a, b| (a.start_time, a.id).cmp(&(b.start_time, b.id)));
        out
    }

    pub fn slots_for_schedule(&self, schedule_id: Uuid) -> Vec<Slot> {
        let mut out: Vec<Slot> = self
            .slots
            .iter()
            .filter(|s| s.schedule_id == schedule_id)
            .map(|s| s.clone())
            .collect();
        out.sort_by(|a, b| (a.start_time, a.id).cmp(&(b.start_time, b.id)));
        out
    }

    // ==========================================================================
    // APPOINTMENTS
    // ==========================================================================

    pub async fn lock_appointment(&self, id: Uuid) -> RowGuard {
        debug!("acquiring appointment lock {}", id);
        Self::acquire(&self.appointment_locks, id).await
    }

    pub fn put_appointment(&self, appointment: Appointment) {
        self.appointments.insert(appointment.id, appointment);
    }

    pub fn appointment(&self, id: Uuid) -> Option<Appointment> {
        self.appointments.get(&id).map(|a| a.clone())
    }

    pub fn appointments_for_slot(&self, slot_id: Uuid) -> Vec<Appointment> {
        self.appointments
            .iter()
            .filter(|a| a.slot_id == slot_id)
            .map(|a| a.clone())
            .collect()
    }

    pub fn appointments_for_patient(&self, patient_id: Uuid) -> Vec<Appointment> {
        let mut out: Vec<Appointment> = self
            .appointments
            .iter()
            .filter(|a| a.patient_id == patient_id)
            .map(|a| a.clone())
            .collect();
        out.sort_by(|a, b| (a.scheduled_at, a.id).cmp(&(b.scheduled_at, b.id)));
        out
    }

    pub fn appointments_for_doctor(&self, doctor_id: Uuid) -> Vec<Appointment> {
        let mut out: Vec<Appointment> = self
            .appointments
            .iter()
            .filter(|a| a.doctor_id == doctor_id)
            .map(|a| a.clone())
            .collect();
        out.sort_by(|a, b| (a.scheduled_at, a.id).cmp(&(b.scheduled_at, b.id)));
        out
    }

    pub fn all_appointments(&self) -> Vec<Appointment> {
        let mut out: Vec<Appointment> = self.appointments.iter().map(|a| a.clone()).collect();
        out.sort_by(|a, b| (a.scheduled_at, a.id).cmp(&(b.scheduled_at, b.id)));
        out
    }

    // ==========================================================================
    // DIRECTORY (read-only collaborators)
    // ==========================================================================

    pub fn upsert_doctor(&self, doctor: Doctor) {
        self.doctors.insert(doctor.id, doctor);
    }

    pub fn doctor(&self, id: Uuid) -> Option<Doctor> {
        self.doctors.get(&id).map(|d| d.clone())
    }

    pub fn upsert_patient(&self, patient: Patient) {
        self.patients.insert(patient.id, patient);
    }

    pub fn patient(&self, id: Uuid) -> Option<Patient> {
        self.patients.get(&id).map(|p| p.clone())
    }
}

pub mod call_state;
pub mod notify;
pub mod rows;
pub mod store;

pub use call_state::{
    CallState, CallStateError, CallStateStore, InMemoryCallStateStore, RedisCallStateStore,
};
pub use notify::{LogOnlyNotificationDispatcher, NotificationDispatcher};
pub use rows::{
    Appointment, AppointmentStatus, AppointmentType, CancelledBy, Doctor, Patient, Schedule,
    ScheduleKind, Slot,
};
pub use store::{ClinicStore, RowGuard};

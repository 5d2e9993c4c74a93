// libs/shared/store/src/notify.rs
use async_trait::async_trait;
use tracing::info;

use crate::rows::Appointment;

/// Outbound notification seam. Delivery is fire-and-forget: implementations
/// swallow and log their own failures, so callers never branch on them.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn notify_cancelled_appointments(&self, appointments: &[Appointment], reason: &str);
}

/// Default dispatcher for single-process deployments and tests.
pub struct LogOnlyNotificationDispatcher;

#[async_trait]
impl NotificationDispatcher for LogOnlyNotificationDispatcher {
    async fn notify_cancelled_appointments(&self, appointments: &[Appointment], reason: &str) {
        for appointment in appointments {
            info!(
                "notify patient {}: appointment {} cancelled ({})",
                appointment.patient_id, appointment.appointment_number, reason
            );
        }
    }
}

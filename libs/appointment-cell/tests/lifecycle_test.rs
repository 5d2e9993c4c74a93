// libs/appointment-cell/tests/lifecycle_test.rs
mod common;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use std::sync::atomic::Ordering;

use appointment_cell::models::{BookingError, ConfirmPaymentRequest, CreateAppointmentRequest, Participant};
use appointment_cell::services::lifecycle::LifecycleService;
use shared_store::{Appointment, AppointmentStatus, AppointmentType};

use common::{setup, TestHarness};

async fn book(harness: &TestHarness, appointment_type: AppointmentType) -> Appointment {
    let slot = harness.add_slot(Duration::hours(24), 1, appointment_type);
    harness
        .booking
        .create_appointment(CreateAppointmentRequest {
            slot_id: slot.id,
            patient_id: harness.patient_id,
            note: None,
        })
        .await
        .unwrap()
}

#[test]
fn transition_matrix_matches_the_design() {
    use AppointmentStatus::*;
    let cases: &[(AppointmentStatus, &[AppointmentStatus])] = &[
        (PendingPayment, &[Confirmed, Cancelled, Pending]),
        (Pending, &[Confirmed, Cancelled]),
        (Confirmed, &[CheckedIn, InProgress, Cancelled]),
        (CheckedIn, &[InProgress, Cancelled]),
        (InProgress, &[Completed, Cancelled]),
        (Completed, &[]),
        (Cancelled, &[]),
        (Rescheduled, &[Confirmed, Cancelled]),
    ];

    let all = [
        PendingPayment, Pending, Confirmed, CheckedIn, InProgress, Completed, Cancelled,
        Rescheduled,
    ];
    for (from, allowed) in cases {
        assert_eq!(LifecycleService::valid_transitions(*from), *allowed);
        for to in all {
            let expected = allowed.contains(&to);
            let actual = LifecycleService::validate_transition(*from, to).is_ok();
            assert_eq!(actual, expected, "{} -> {}", from, to);
        }
    }
}

#[test]
fn rejections_name_both_states() {
    let err = LifecycleService::validate_transition(
        AppointmentStatus::PendingPayment,
        AppointmentStatus::InProgress,
    )
    .unwrap_err();
    assert_matches!(err, BookingError::InvalidTransition { from, to } => {
        assert_eq!(from, AppointmentStatus::PendingPayment);
        assert_eq!(to, AppointmentStatus::InProgress);
    });
    assert!(err.to_string().contains("pending_payment"));
    assert!(err.to_string().contains("in_progress"));
}

#[tokio::test]
async fn full_lifecycle_walk_stamps_every_milestone() {
    let harness = setup();
    let appointment = book(&harness, AppointmentType::InClinic).await;
    assert_eq!(appointment.status, AppointmentStatus::PendingPayment);

    // The shortcut straight to InProgress is rejected.
    assert_matches!(
        harness
            .lifecycle
            .update_status(appointment.id, AppointmentStatus::InProgress)
            .await,
        Err(BookingError::InvalidTransition { .. })
    );

    let confirmed = harness
        .lifecycle
        .confirm_payment(
            appointment.id,
            ConfirmPaymentRequest {
                payment_id: "pay_123".to_string(),
                amount: appointment.fee_amount,
            },
        )
        .await
        .unwrap();
    assert_eq!(confirmed.status, AppointmentStatus::Confirmed);
    assert_eq!(confirmed.paid_amount, appointment.fee_amount);
    assert_eq!(confirmed.payment_id.as_deref(), Some("pay_123"));

    let checked_in = harness
        .lifecycle
        .update_status(appointment.id, AppointmentStatus::CheckedIn)
        .await
        .unwrap();
    assert!(checked_in.check_in_time.is_some());

    let in_progress = harness
        .lifecycle
        .update_status(appointment.id, AppointmentStatus::InProgress)
        .await
        .unwrap();
    assert!(in_progress.started_at.is_some());

    let completed = harness
        .lifecycle
        .update_status(appointment.id, AppointmentStatus::Completed)
        .await
        .unwrap();
    assert!(completed.ended_at.is_some());

    // Completed is terminal.
    for target in [
        AppointmentStatus::Confirmed,
        AppointmentStatus::Cancelled,
        AppointmentStatus::InProgress,
    ] {
        assert_matches!(
            harness.lifecycle.update_status(appointment.id, target).await,
            Err(BookingError::InvalidTransition { .. })
        );
    }
}

#[tokio::test]
async fn payment_confirmation_is_only_valid_from_pending_payment() {
    let harness = setup();
    let appointment = book(&harness, AppointmentType::InClinic).await;

    harness
        .lifecycle
        .confirm_payment(
            appointment.id,
            ConfirmPaymentRequest {
                payment_id: "pay_1".to_string(),
                amount: appointment.fee_amount,
            },
        )
        .await
        .unwrap();

    // Second confirmation hits Confirmed, no longer PendingPayment.
    assert_matches!(
        harness
            .lifecycle
            .confirm_payment(
                appointment.id,
                ConfirmPaymentRequest {
                    payment_id: "pay_2".to_string(),
                    amount: 0,
                },
            )
            .await,
        Err(BookingError::InvalidTransition { .. })
    );
}

#[tokio::test]
async fn confirming_a_video_appointment_provisions_the_room_or_aborts() {
    let harness = setup();
    let appointment = book(&harness, AppointmentType::Video).await;
    assert!(appointment.meeting_room_name.is_none());

    // Provider down: the payment confirmation aborts and nothing moves.
    harness.rooms.fail_create.store(true, Ordering::SeqCst);
    assert_matches!(
        harness
            .lifecycle
            .confirm_payment(
                appointment.id,
                ConfirmPaymentRequest {
                    payment_id: "pay_1".to_string(),
                    amount: appointment.fee_amount,
                },
            )
            .await,
        Err(BookingError::RoomProvisioning(_))
    );
    let unchanged = harness.store.appointment(appointment.id).unwrap();
    assert_eq!(unchanged.status, AppointmentStatus::PendingPayment);
    assert!(unchanged.payment_id.is_none());

    // Provider back: confirmation provisions the room eagerly.
    harness.rooms.fail_create.store(false, Ordering::SeqCst);
    let confirmed = harness
        .lifecycle
        .confirm_payment(
            appointment.id,
            ConfirmPaymentRequest {
                payment_id: "pay_1".to_string(),
                amount: appointment.fee_amount,
            },
        )
        .await
        .unwrap();
    assert_eq!(confirmed.status, AppointmentStatus::Confirmed);
    assert!(confirmed.meeting_room_name.is_some());
}

#[tokio::test]
async fn completing_a_video_call_tears_the_room_down() {
    let harness = setup();
    let appointment = book(&harness, AppointmentType::Video).await;

    harness
        .lifecycle
        .confirm_payment(
            appointment.id,
            ConfirmPaymentRequest {
                payment_id: "pay_1".to_string(),
                amount: appointment.fee_amount,
            },
        )
        .await
        .unwrap();
    harness
        .lifecycle
        .update_status(appointment.id, AppointmentStatus::InProgress)
        .await
        .unwrap();
    harness
        .lifecycle
        .update_status(appointment.id, AppointmentStatus::Completed)
        .await
        .unwrap();

    let room_name = harness
        .store
        .appointment(appointment.id)
        .unwrap()
        .meeting_room_name
        .unwrap();
    assert_eq!(harness.rooms.deleted_rooms(), vec![room_name]);
}

#[tokio::test]
async fn clinic_check_in_respects_its_window_and_queues() {
    let harness = setup();

    // Scheduled two hours out: too early to check in.
    let early = book(&harness, AppointmentType::InClinic).await;
    let early = harness
        .lifecycle
        .confirm_payment(
            early.id,
            ConfirmPaymentRequest {
                payment_id: "p".to_string(),
                amount: early.fee_amount,
            },
        )
        .await
        .unwrap();
    harness.set_scheduled_at(early.id, Utc::now() + Duration::hours(2));
    assert_matches!(
        harness.lifecycle.check_in(early.id).await,
        Err(BookingError::CheckInWindow(_))
    );

    // Inside the window: queue numbers count up per doctor per day.
    harness.set_scheduled_at(early.id, Utc::now() + Duration::minutes(10));
    let first = harness.lifecycle.check_in(early.id).await.unwrap();
    assert_eq!(first.status, AppointmentStatus::CheckedIn);
    assert_eq!(first.queue_number, Some(1));
    assert!(first.check_in_time.is_some());

    let second_patient = harness.add_patient();
    let slot = harness.add_slot(Duration::minutes(20), 1, AppointmentType::InClinic);
    let second = harness
        .booking
        .create_appointment(CreateAppointmentRequest {
            slot_id: slot.id,
            patient_id: second_patient,
            note: None,
        })
        .await
        .unwrap();
    let second = harness
        .lifecycle
        .confirm_payment(
            second.id,
            ConfirmPaymentRequest {
                payment_id: "p".to_string(),
                amount: second.fee_amount,
            },
        )
        .await
        .unwrap();
    // Pin both bookings to the same calendar day for the queue ordinal.
    harness.set_scheduled_at(second.id, first.scheduled_at);
    let second = harness.lifecycle.check_in(second.id).await.unwrap();
    assert_eq!(second.queue_number, Some(2));
}

#[tokio::test]
async fn video_join_auto_advances_by_participant() {
    let harness = setup();
    let appointment = book(&harness, AppointmentType::Video).await;
    let appointment = harness
        .lifecycle
        .confirm_payment(
            appointment.id,
            ConfirmPaymentRequest {
                payment_id: "p".to_string(),
                amount: appointment.fee_amount,
            },
        )
        .await
        .unwrap();
    harness.set_scheduled_at(appointment.id, Utc::now() + Duration::minutes(15));

    // Patient joins first: implicit check-in, no queue number.
    let patient_join = harness
        .lifecycle
        .check_in_video(appointment.id, Participant::Patient)
        .await
        .unwrap();
    assert_eq!(patient_join.appointment.status, AppointmentStatus::CheckedIn);
    assert_eq!(patient_join.appointment.queue_number, None);
    assert!(patient_join.appointment.check_in_time.is_some());
    assert!(!patient_join.meeting_token.is_empty());

    // Doctor joins: the consultation starts.
    let doctor_join = harness
        .lifecycle
        .check_in_video(appointment.id, Participant::Doctor)
        .await
        .unwrap();
    assert_eq!(doctor_join.appointment.status, AppointmentStatus::InProgress);
    assert!(doctor_join.appointment.started_at.is_some());
}

#[tokio::test]
async fn doctor_joining_a_confirmed_call_starts_it_directly() {
    let harness = setup();
    let appointment = book(&harness, AppointmentType::Video).await;
    harness
        .lifecycle
        .confirm_payment(
            appointment.id,
            ConfirmPaymentRequest {
                payment_id: "p".to_string(),
                amount: appointment.fee_amount,
            },
        )
        .await
        .unwrap();
    harness.set_scheduled_at(appointment.id, Utc::now() + Duration::minutes(15));

    let join = harness
        .lifecycle
        .check_in_video(appointment.id, Participant::Doctor)
        .await
        .unwrap();
    assert_eq!(join.appointment.status, AppointmentStatus::InProgress);
    assert!(join.appointment.check_in_time.is_some());
    assert!(join.appointment.started_at.is_some());
}

#[tokio::test]
async fn video_join_window_is_wider_than_the_clinic_one() {
    let harness = setup();
    let appointment = book(&harness, AppointmentType::Video).await;
    harness
        .lifecycle
        .confirm_payment(
            appointment.id,
            ConfirmPaymentRequest {
                payment_id: "p".to_string(),
                amount: appointment.fee_amount,
            },
        )
        .await
        .unwrap();

    // 45 minutes ahead: fine for video, outside the clinic window.
    harness.set_scheduled_at(appointment.id, Utc::now() + Duration::minutes(45));
    harness
        .lifecycle
        .check_in_video(appointment.id, Participant::Patient)
        .await
        .unwrap();

    // Two hours ahead is too early even for video.
    let late = book(&harness, AppointmentType::Video).await;
    harness
        .lifecycle
        .confirm_payment(
            late.id,
            ConfirmPaymentRequest {
                payment_id: "p".to_string(),
                amount: late.fee_amount,
            },
        )
        .await
        .unwrap();
    assert_matches!(
        harness
            .lifecycle
            .check_in_video(late.id, Participant::Patient)
            .await,
        Err(BookingError::CheckInWindow(_))
    );
}

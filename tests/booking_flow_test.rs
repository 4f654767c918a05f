mod common;

use std::sync::atomic::Ordering;

use common::{request, upi, Fixture};
use seat_booking::config::LockScope;
use seat_booking::error::{BookingError, ErrorKind, StoreError};
use seat_booking::models::{BookingStatus, PaymentId, RowConfig, SeatClass, SeatStatus, ShowId, UserId};

#[test]
fn test_create_booking_sums_prices_and_blocks_seats() {
    let fx = Fixture::new();
    let show = fx.schedule_show(
        vec![
            RowConfig::new("A", 1, SeatClass::Regular),
            RowConfig::new("B", 1, SeatClass::Premium),
        ],
        100.0,
    );
    let seats = fx.seat_ids(&show);

    let booking = fx.book("alice", &show, &seats);

    assert_eq!(booking.total_amount(), 250.0);
    assert_eq!(booking.status(), BookingStatus::Pending);
    assert_eq!(booking.seat_ids(), seats.as_slice());
    assert_eq!(booking.expires_at(), booking.created_at() + chrono::Duration::minutes(15));
    assert_eq!(fx.statuses(&show, &seats), vec![SeatStatus::Blocked, SeatStatus::Blocked]);
    assert_eq!(fx.bookings.get_booking(booking.id()).unwrap(), booking);
}

#[test]
fn test_create_booking_rejects_taken_seat_without_mutation() {
    let fx = Fixture::new();
    let show = fx.simple_show(3);
    let seats = fx.seat_ids(&show);

    fx.book("alice", &show, &seats[1..2]);

    let err = fx
        .bookings
        .create_booking(request("bob", &show, &[seats[0], seats[1]]))
        .unwrap_err();
    assert_eq!(err, BookingError::SeatUnavailable(seats[1]));
    assert_eq!(err.kind(), ErrorKind::StateConflict);
    assert_eq!(fx.seat_status(&show, seats[0]), SeatStatus::Available);
    assert!(fx.bookings.bookings_for_user(&UserId::new("bob")).unwrap().is_empty());
}

#[test]
fn test_create_booking_validation_and_lookups() {
    let fx = Fixture::new();
    let show = fx.simple_show(2);
    let seats = fx.seat_ids(&show);

    let empty = fx.bookings.create_booking(request("alice", &show, &[])).unwrap_err();
    assert!(matches!(empty, BookingError::InvalidBookingData(_)));

    let anonymous = fx.bookings.create_booking(request("", &show, &seats)).unwrap_err();
    assert_eq!(anonymous.kind(), ErrorKind::Validation);

    let duplicate = fx
        .bookings
        .create_booking(request("alice", &show, &[seats[0], seats[0]]))
        .unwrap_err();
    assert!(matches!(duplicate, BookingError::InvalidBookingData(_)));

    let mut missing_show = request("alice", &show, &seats);
    missing_show.show_id = ShowId::new();
    assert!(matches!(
        fx.bookings.create_booking(missing_show),
        Err(BookingError::ShowNotFound(_))
    ));

    let unknown_seat = fx
        .bookings
        .create_booking(request("alice", &show, &[seats[0], seat_booking::models::SeatId::new()]))
        .unwrap_err();
    assert_eq!(unknown_seat.kind(), ErrorKind::NotFound);

    assert_eq!(fx.statuses(&show, &seats), vec![SeatStatus::Available, SeatStatus::Available]);

    // пустой пользователь отсекается до hold: занятое место даже не проверяется
    fx.book("carol", &show, &seats[1..]);
    let blank = fx.bookings.create_booking(request("   ", &show, &seats)).unwrap_err();
    assert!(matches!(blank, BookingError::InvalidBookingData(_)));
    assert_eq!(fx.seat_status(&show, seats[0]), SeatStatus::Available);
}

#[test]
fn test_show_not_bookable_after_cutoff() {
    let fx = Fixture::new();
    let show = fx.simple_show(1);
    let seats = fx.seat_ids(&show);

    // сеанс через 2 часа, продажа до +30 минут после начала
    fx.advance(149);
    fx.book("early", &show, &seats);

    let late_show = fx.simple_show(1);
    fx.clock.set(late_show.bookable_until);
    let err = fx
        .bookings
        .create_booking(request("late", &late_show, &fx.seat_ids(&late_show)))
        .unwrap_err();
    assert_eq!(err, BookingError::ShowNotBookable(late_show.id));
}

#[test]
fn test_persist_failure_releases_held_seats() {
    let fx = Fixture::new();
    let show = fx.simple_show(2);
    let seats = fx.seat_ids(&show);
    fx.booking_repo.fail_create.store(true, Ordering::SeqCst);

    let err = fx.bookings.create_booking(request("alice", &show, &seats)).unwrap_err();

    assert!(matches!(err, BookingError::Persistence(StoreError::Unavailable(_))));
    assert_eq!(err.kind(), ErrorKind::Persistence);
    assert_eq!(fx.statuses(&show, &seats), vec![SeatStatus::Available, SeatStatus::Available]);
    assert!(fx.bookings.bookings_for_user(&UserId::new("alice")).unwrap().is_empty());

    // после восстановления хранилища те же места снова можно забронировать
    fx.booking_repo.fail_create.store(false, Ordering::SeqCst);
    fx.book("alice", &show, &seats);
}

#[test]
fn test_inventory_persist_failure_is_not_fatal() {
    let fx = Fixture::new();
    let show = fx.simple_show(1);
    let seats = fx.seat_ids(&show);
    fx.inventories.fail_update.store(true, Ordering::SeqCst);

    let booking = fx.book("alice", &show, &seats);
    let confirmed = fx.bookings.checkout(booking.id(), seat_booking::models::PaymentMethod::Upi, upi()).unwrap();

    assert_eq!(confirmed.status(), BookingStatus::Confirmed);
    assert_eq!(fx.seat_status(&show, seats[0]), SeatStatus::Booked);
}

#[test]
fn test_checkout_confirms_and_books_seats() {
    let fx = Fixture::new();
    let show = fx.simple_show(2);
    let seats = fx.seat_ids(&show);
    let booking = fx.book("alice", &show, &seats);

    fx.advance(5);
    let confirmed = fx.bookings.checkout(booking.id(), seat_booking::models::PaymentMethod::Upi, upi()).unwrap();

    assert_eq!(confirmed.status(), BookingStatus::Confirmed);
    let payment_id = confirmed.payment_id().unwrap();
    assert!(fx.payments.get_payment(payment_id).unwrap().is_successful());
    assert_eq!(fx.statuses(&show, &seats), vec![SeatStatus::Booked, SeatStatus::Booked]);
    assert_eq!(*fx.notifier.sent.lock().unwrap(), vec![booking.id()]);

    let details = fx.bookings.booking_details(booking.id()).unwrap();
    assert_eq!(details.show.id, show.id);
    assert_eq!(details.seats.len(), 2);
    assert!(details.seats.iter().all(|s| s.status == SeatStatus::Booked));
    assert_eq!(details.payment.map(|p| p.id), Some(payment_id));
}

#[test]
fn test_confirm_after_hold_window_expires_booking() {
    let fx = Fixture::new();
    let show = fx.simple_show(2);
    let seats = fx.seat_ids(&show);
    let booking = fx.book("alice", &show, &seats);

    fx.advance(5);
    let payment = fx
        .payments
        .process_payment(booking.id(), seat_booking::models::PaymentMethod::Upi, upi())
        .unwrap();
    assert!(payment.is_successful());

    fx.advance(11);
    let err = fx.bookings.confirm_booking(booking.id(), payment.id).unwrap_err();

    assert_eq!(err, BookingError::BookingExpired(booking.id()));
    assert_eq!(err.kind(), ErrorKind::Expired);
    assert_eq!(fx.bookings.get_booking(booking.id()).unwrap().status(), BookingStatus::Expired);
    // места не перешли в Booked сами по себе
    assert_eq!(fx.statuses(&show, &seats), vec![SeatStatus::Blocked, SeatStatus::Blocked]);
    assert!(fx.notifier.sent.lock().unwrap().is_empty());

    assert_eq!(fx.bookings.release_expired_seats(booking.id()).unwrap(), 2);
    assert_eq!(fx.bookings.release_expired_seats(booking.id()).unwrap(), 0);
    assert_eq!(fx.statuses(&show, &seats), vec![SeatStatus::Available, SeatStatus::Available]);
}

#[test]
fn test_expiry_takes_precedence_over_payment_outcome() {
    let fx = Fixture::new();
    let show = fx.simple_show(1);
    let booking = fx.book("alice", &show, &fx.seat_ids(&show));

    fx.advance(16);
    let err = fx.bookings.confirm_booking(booking.id(), PaymentId::new()).unwrap_err();

    assert_eq!(err, BookingError::BookingExpired(booking.id()));
    assert_eq!(fx.bookings.get_booking(booking.id()).unwrap().status(), BookingStatus::Expired);
}

#[test]
fn test_confirm_requires_successful_payment_of_same_booking() {
    let fx = Fixture::new();
    let show = fx.simple_show(2);
    let seats = fx.seat_ids(&show);
    let first = fx.book("alice", &show, &seats[..1]);
    let second = fx.book("bob", &show, &seats[1..]);

    let missing = fx.bookings.confirm_booking(first.id(), PaymentId::new()).unwrap_err();
    assert!(matches!(missing, BookingError::PaymentNotFound(_)));

    let bobs_payment = fx
        .payments
        .process_payment(second.id(), seat_booking::models::PaymentMethod::Upi, upi())
        .unwrap();
    let foreign = fx.bookings.confirm_booking(first.id(), bobs_payment.id).unwrap_err();
    assert!(matches!(foreign, BookingError::InvalidBookingData(_)));

    let stored = fx.bookings.get_booking(first.id()).unwrap();
    assert_eq!(stored.status(), BookingStatus::Pending);
    assert_eq!(stored.version(), first.version());
    assert_eq!(fx.seat_status(&show, seats[0]), SeatStatus::Blocked);
}

#[test]
fn test_cancel_confirmed_booking_is_rejected() {
    let fx = Fixture::new();
    let show = fx.simple_show(1);
    let seats = fx.seat_ids(&show);
    let booking = fx.book("alice", &show, &seats);
    fx.bookings.checkout(booking.id(), seat_booking::models::PaymentMethod::Upi, upi()).unwrap();

    let err = fx.bookings.cancel_booking(booking.id()).unwrap_err();

    assert_eq!(err, BookingError::AlreadyConfirmed(booking.id()));
    assert_eq!(fx.bookings.get_booking(booking.id()).unwrap().status(), BookingStatus::Confirmed);
    assert_eq!(fx.seat_status(&show, seats[0]), SeatStatus::Booked);
}

#[test]
fn test_cancel_releases_seats_once() {
    let fx = Fixture::new();
    let show = fx.simple_show(2);
    let seats = fx.seat_ids(&show);
    let booking = fx.book("alice", &show, &seats);

    let cancelled = fx.bookings.cancel_booking(booking.id()).unwrap();
    assert_eq!(cancelled.status(), BookingStatus::Cancelled);
    assert_eq!(fx.statuses(&show, &seats), vec![SeatStatus::Available, SeatStatus::Available]);

    // места уже заняты другим - повторная отмена не должна их отпустить
    fx.book("bob", &show, &seats);
    assert_eq!(
        fx.bookings.cancel_booking(booking.id()).unwrap_err(),
        BookingError::AlreadyCancelled(booking.id())
    );
    assert_eq!(fx.statuses(&show, &seats), vec![SeatStatus::Blocked, SeatStatus::Blocked]);
}

#[test]
fn test_expire_booking_from_pending_only() {
    let fx = Fixture::new();
    let show = fx.simple_show(1);
    let seats = fx.seat_ids(&show);
    let booking = fx.book("alice", &show, &seats);

    let (expired, released) = fx.bookings.expire_booking(booking.id()).unwrap();
    assert_eq!(expired.status(), BookingStatus::Expired);
    assert_eq!(released, 1);
    assert_eq!(fx.seat_status(&show, seats[0]), SeatStatus::Available);

    let err = fx.bookings.expire_booking(booking.id()).unwrap_err();
    assert!(matches!(err, BookingError::NotPending { status: BookingStatus::Expired, .. }));
    assert!(matches!(
        fx.bookings.cancel_booking(booking.id()),
        Err(BookingError::BookingExpired(_))
    ));
}

#[test]
fn test_confirm_persist_failure_keeps_booking_pending() {
    let fx = Fixture::new();
    let show = fx.simple_show(1);
    let seats = fx.seat_ids(&show);
    let booking = fx.book("alice", &show, &seats);
    let payment = fx
        .payments
        .process_payment(booking.id(), seat_booking::models::PaymentMethod::Upi, upi())
        .unwrap();

    fx.booking_repo.fail_update.store(true, Ordering::SeqCst);
    let err = fx.bookings.confirm_booking(booking.id(), payment.id).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Persistence);
    assert_eq!(fx.bookings.get_booking(booking.id()).unwrap().status(), BookingStatus::Pending);
    assert_eq!(fx.seat_status(&show, seats[0]), SeatStatus::Blocked);
    assert!(fx.notifier.sent.lock().unwrap().is_empty());

    fx.booking_repo.fail_update.store(false, Ordering::SeqCst);
    let confirmed = fx.bookings.confirm_booking(booking.id(), payment.id).unwrap();
    assert_eq!(confirmed.status(), BookingStatus::Confirmed);
    assert_eq!(fx.seat_status(&show, seats[0]), SeatStatus::Booked);
}

#[test]
fn test_notification_failure_does_not_affect_booking() {
    let fx = Fixture::new();
    let show = fx.simple_show(1);
    let booking = fx.book("alice", &show, &fx.seat_ids(&show));
    fx.notifier.fail.store(true, Ordering::SeqCst);

    let confirmed = fx.bookings.checkout(booking.id(), seat_booking::models::PaymentMethod::Upi, upi()).unwrap();

    assert_eq!(confirmed.status(), BookingStatus::Confirmed);
    assert_eq!(fx.bookings.get_booking(booking.id()).unwrap().status(), BookingStatus::Confirmed);
}

#[test]
fn test_global_lock_scope_behaves_the_same() {
    let fx = Fixture::with_lock_scope(LockScope::Global);
    assert_eq!(fx.bookings.lock_scope(), LockScope::Global);
    let show = fx.simple_show(2);
    let seats = fx.seat_ids(&show);

    let booking = fx.book("alice", &show, &seats);
    assert_eq!(booking.total_amount(), 200.0);
    assert!(matches!(
        fx.bookings.create_booking(request("bob", &show, &seats[..1])),
        Err(BookingError::SeatUnavailable(_))
    ));
}

#[test]
fn test_bookings_for_user_and_available_seats() {
    let fx = Fixture::new();
    let show = fx.simple_show(4);
    let seats = fx.seat_ids(&show);

    fx.book("alice", &show, &seats[..1]);
    fx.book("alice", &show, &seats[1..2]);
    fx.book("bob", &show, &seats[2..3]);

    assert_eq!(fx.bookings.bookings_for_user(&UserId::new("alice")).unwrap().len(), 2);
    let available = fx.bookings.available_seats(show.id).unwrap();
    assert_eq!(available.len(), 1);
    assert_eq!(available[0].id, seats[3]);
    assert_eq!(available[0].label, "A4");
}

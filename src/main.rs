use anyhow::Context;
use chrono::Duration;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use seat_booking::{
    config::Config,
    models::{PaymentMethod, SeatLayout, ScreenId},
    services::{payment::metadata, CreateBookingRequest, ScheduleShow},
    AppState,
};

// Сколько покупателей одновременно пытаются занять одни и те же места
const COMPETING_BUYERS: usize = 8;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::load().context("failed to load configuration")?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.app.rust_log))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting seat booking engine ({})", config.app.environment);

    let cleanup_interval = config.cleanup.interval();
    let state = AppState::new(config);

    // --- Start background tasks ---
    let cleanup_task = state.cleanup.clone().spawn(cleanup_interval);

    let show = state.schedule.schedule_show(ScheduleShow {
        title: "Evening Premiere".to_string(),
        screen_id: ScreenId::new(),
        start_time: state.clock.now() + Duration::hours(3),
        duration_minutes: 150,
        base_price: 200.0,
        layout: SeatLayout::standard(),
    })?;

    // Все покупатели хотят два первых свободных места ряда A
    let wanted: Vec<_> = state
        .bookings
        .available_seats(show.id)?
        .into_iter()
        .take(2)
        .map(|seat| seat.id)
        .collect();

    let mut attempts = Vec::with_capacity(COMPETING_BUYERS);
    for buyer in 0..COMPETING_BUYERS {
        let state = Arc::clone(&state);
        let request = CreateBookingRequest {
            user_id: format!("buyer-{}", buyer),
            show_id: show.id,
            seat_ids: wanted.clone(),
        };
        attempts.push(tokio::task::spawn_blocking(move || state.bookings.create_booking(request)));
    }

    let mut winners = Vec::new();
    for attempt in attempts {
        match attempt.await? {
            Ok(booking) => winners.push(booking),
            Err(e) => warn!("Booking attempt rejected: {} ({:?})", e, e.kind()),
        }
    }
    info!("{} of {} competing buyers got the seats", winners.len(), COMPETING_BUYERS);

    let mut confirmed = Vec::new();
    for booking in winners {
        let bookings = Arc::clone(&state.bookings);
        let booking_id = booking.id();
        let outcome = tokio::task::spawn_blocking(move || {
            bookings.checkout(booking_id, PaymentMethod::Upi, metadata([("upi_id", "buyer@upi")]))
        })
        .await?;

        match outcome {
            Ok(booking) => confirmed.push(state.bookings.booking_details(booking.id())?),
            Err(e) => warn!(booking_id = %booking_id, "Checkout failed: {}", e),
        }
    }

    let summary = serde_json::json!({
        "show": show,
        "confirmed": confirmed,
        "available_seats": state.bookings.available_seats(show.id)?.len(),
        "cleanup": state.cleanup.get_cleanup_stats(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    cleanup_task.abort();
    info!("Shutting down");
    Ok(())
}

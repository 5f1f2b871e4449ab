use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use rest_types::{BookingTO, CreateBookingRequestTO, RescheduleRequestTO, TransitionRequestTO};
use uuid::Uuid;

use crate::{error_handler, Context, RestStateDef};
use service::booking::BookingService;

pub fn generate_route<RestState: RestStateDef>() -> Router<RestState> {
    Router::new()
        .route("/", get(get_all_bookings::<RestState>))
        .route("/", post(create_booking::<RestState>))
        .route("/{id}", get(get_booking::<RestState>))
        .route("/{id}/transition", post(transition_booking::<RestState>))
        .route("/{id}/reschedule", post(reschedule_booking::<RestState>))
}

pub async fn get_all_bookings<RestState: RestStateDef>(
    rest_state: State<RestState>,
    Extension(context): Extension<Context>,
) -> Response {
    error_handler(
        (async {
            let bookings: Arc<[BookingTO]> = rest_state
                .booking_service()
                .get_all(context.into(), None)
                .await?
                .iter()
                .map(BookingTO::from)
                .collect();
            Ok(Response::builder()
                .status(200)
                .body(Body::new(serde_json::to_string(&bookings).unwrap()))
                .unwrap())
        })
        .await,
    )
}

pub async fn get_booking<RestState: RestStateDef>(
    rest_state: State<RestState>,
    Extension(context): Extension<Context>,
    Path(booking_id): Path<Uuid>,
) -> Response {
    error_handler(
        (async {
            let booking = rest_state
                .booking_service()
                .get(booking_id, context.into(), None)
                .await?;
            Ok(Response::builder()
                .status(200)
                .body(Body::new(
                    serde_json::to_string(&BookingTO::from(&booking)).unwrap(),
                ))
                .unwrap())
        })
        .await,
    )
}

pub async fn create_booking<RestState: RestStateDef>(
    rest_state: State<RestState>,
    Extension(context): Extension<Context>,
    Json(request): Json<CreateBookingRequestTO>,
) -> Response {
    error_handler(
        (async {
            let booking = rest_state
                .booking_service()
                .create(&request.to_request(context.clone()), context.into(), None)
                .await?;
            Ok(Response::builder()
                .status(200)
                .body(Body::new(
                    serde_json::to_string(&BookingTO::from(&booking)).unwrap(),
                ))
                .unwrap())
        })
        .await,
    )
}

pub async fn transition_booking<RestState: RestStateDef>(
    rest_state: State<RestState>,
    Extension(context): Extension<Context>,
    Path(booking_id): Path<Uuid>,
    Json(request): Json<TransitionRequestTO>,
) -> Response {
    error_handler(
        (async {
            let booking = rest_state
                .booking_service()
                .transition(
                    booking_id,
                    request.status.into(),
                    request.note.clone(),
                    request.cancellation_reason.clone(),
                    request.actual_cost,
                    context.into(),
                    None,
                )
                .await?;
            Ok(Response::builder()
                .status(200)
                .body(Body::new(
                    serde_json::to_string(&BookingTO::from(&booking)).unwrap(),
                ))
                .unwrap())
        })
        .await,
    )
}

pub async fn reschedule_booking<RestState: RestStateDef>(
    rest_state: State<RestState>,
    Extension(context): Extension<Context>,
    Path(booking_id): Path<Uuid>,
    Json(request): Json<RescheduleRequestTO>,
) -> Response {
    error_handler(
        (async {
            let booking = rest_state
                .booking_service()
                .reschedule(
                    booking_id,
                    request.new_date,
                    request.new_time.clone(),
                    request.reason.clone(),
                    context.into(),
                    None,
                )
                .await?;
            Ok(Response::builder()
                .status(200)
                .body(Body::new(
                    serde_json::to_string(&BookingTO::from(&booking)).unwrap(),
                ))
                .unwrap())
        })
        .await,
    )
}

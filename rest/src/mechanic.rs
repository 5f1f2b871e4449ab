use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::routing::get;
use axum::{Extension, Router};
use rest_types::{BookingTO, CalendarQueryTO, MechanicTO};
use service::calendar::CalendarMonth;
use uuid::Uuid;

use crate::{error_handler, Context, RestError, RestStateDef};
use service::calendar::MechanicCalendarService;
use service::mechanic::MechanicService;

pub fn generate_route<RestState: RestStateDef>() -> Router<RestState> {
    Router::new()
        .route("/", get(get_all_mechanics::<RestState>))
        .route("/{id}", get(get_mechanic::<RestState>))
        .route("/{id}/calendar", get(get_calendar::<RestState>))
}

pub async fn get_all_mechanics<RestState: RestStateDef>(
    rest_state: State<RestState>,
    Extension(context): Extension<Context>,
) -> Response {
    error_handler(
        (async {
            let mechanics: Arc<[MechanicTO]> = rest_state
                .mechanic_service()
                .get_all(context.into(), None)
                .await?
                .iter()
                .map(MechanicTO::from)
                .collect();
            Ok(Response::builder()
                .status(200)
                .body(Body::new(serde_json::to_string(&mechanics).unwrap()))
                .unwrap())
        })
        .await,
    )
}

pub async fn get_mechanic<RestState: RestStateDef>(
    rest_state: State<RestState>,
    Extension(context): Extension<Context>,
    Path(mechanic_id): Path<Uuid>,
) -> Response {
    error_handler(
        (async {
            let mechanic = rest_state
                .mechanic_service()
                .get(mechanic_id, context.into(), None)
                .await?;
            Ok(Response::builder()
                .status(200)
                .body(Body::new(
                    serde_json::to_string(&MechanicTO::from(&mechanic)).unwrap(),
                ))
                .unwrap())
        })
        .await,
    )
}

pub async fn get_calendar<RestState: RestStateDef>(
    rest_state: State<RestState>,
    Extension(context): Extension<Context>,
    Path(mechanic_id): Path<Uuid>,
    Query(query): Query<CalendarQueryTO>,
) -> Response {
    error_handler(
        (async {
            let month = match (query.year, query.month) {
                (Some(year), Some(month)) => Some(CalendarMonth { year, month }),
                (None, None) => None,
                _ => return Err(RestError::IncompleteMonth),
            };
            let bookings: Arc<[BookingTO]> = rest_state
                .mechanic_calendar_service()
                .get_calendar(mechanic_id, month, context.into(), None)
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

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::get;
use axum::{Extension, Router};
use rest_types::VehicleTO;
use uuid::Uuid;

use crate::{error_handler, Context, RestStateDef};
use service::vehicle::VehicleService;

pub fn generate_route<RestState: RestStateDef>() -> Router<RestState> {
    Router::new()
        .route("/my", get(get_my_vehicles::<RestState>))
        .route("/{id}", get(get_vehicle::<RestState>))
}

pub async fn get_my_vehicles<RestState: RestStateDef>(
    rest_state: State<RestState>,
    Extension(context): Extension<Context>,
) -> Response {
    error_handler(
        (async {
            let vehicles: Arc<[VehicleTO]> = rest_state
                .vehicle_service()
                .get_for_current_user(context.into(), None)
                .await?
                .iter()
                .map(VehicleTO::from)
                .collect();
            Ok(Response::builder()
                .status(200)
                .body(Body::new(serde_json::to_string(&vehicles).unwrap()))
                .unwrap())
        })
        .await,
    )
}

pub async fn get_vehicle<RestState: RestStateDef>(
    rest_state: State<RestState>,
    Extension(context): Extension<Context>,
    Path(vehicle_id): Path<Uuid>,
) -> Response {
    error_handler(
        (async {
            let vehicle = rest_state
                .vehicle_service()
                .get(vehicle_id, context.into(), None)
                .await?;
            Ok(Response::builder()
                .status(200)
                .body(Body::new(
                    serde_json::to_string(&VehicleTO::from(&vehicle)).unwrap(),
                ))
                .unwrap())
        })
        .await,
    )
}

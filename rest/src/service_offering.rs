use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::get;
use axum::{Extension, Router};
use rest_types::ServiceOfferingTO;
use uuid::Uuid;

use crate::{error_handler, Context, RestStateDef};
use service::service_offering::ServiceOfferingService;

pub fn generate_route<RestState: RestStateDef>() -> Router<RestState> {
    Router::new()
        .route("/", get(get_all_service_offerings::<RestState>))
        .route("/{id}", get(get_service_offering::<RestState>))
}

pub async fn get_all_service_offerings<RestState: RestStateDef>(
    rest_state: State<RestState>,
    Extension(context): Extension<Context>,
) -> Response {
    error_handler(
        (async {
            let offerings: Arc<[ServiceOfferingTO]> = rest_state
                .service_offering_service()
                .get_all(context.into(), None)
                .await?
                .iter()
                .map(ServiceOfferingTO::from)
                .collect();
            Ok(Response::builder()
                .status(200)
                .body(Body::new(serde_json::to_string(&offerings).unwrap()))
                .unwrap())
        })
        .await,
    )
}

pub async fn get_service_offering<RestState: RestStateDef>(
    rest_state: State<RestState>,
    Extension(context): Extension<Context>,
    Path(offering_id): Path<Uuid>,
) -> Response {
    error_handler(
        (async {
            let offering = rest_state
                .service_offering_service()
                .get(offering_id, context.into(), None)
                .await?;
            Ok(Response::builder()
                .status(200)
                .body(Body::new(
                    serde_json::to_string(&ServiceOfferingTO::from(&offering)).unwrap(),
                ))
                .unwrap())
        })
        .await,
    )
}

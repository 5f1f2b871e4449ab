use std::sync::Arc;

pub mod booking;
pub mod mechanic;
pub mod permission;
pub mod service_offering;
pub mod vehicle;

use axum::{body::Body, response::Response, Router};
use thiserror::Error;

#[cfg(feature = "mock_auth")]
use axum::{extract::Request, middleware::Next};

/// The authenticated username, injected per request by the auth middleware.
pub type Context = Arc<str>;

#[derive(Debug, Error)]
pub enum RestError {
    #[error("Service error")]
    ServiceError(#[from] service::ServiceError),

    #[error("month and year must be provided together")]
    IncompleteMonth,
}

fn error_handler(result: Result<Response, RestError>) -> Response {
    match result {
        Ok(response) => response,
        Err(err @ RestError::IncompleteMonth) => Response::builder()
            .status(400)
            .body(Body::new(err.to_string()))
            .unwrap(),
        Err(RestError::ServiceError(service::ServiceError::Forbidden)) => {
            Response::builder().status(403).body(Body::empty()).unwrap()
        }
        Err(RestError::ServiceError(service::ServiceError::EntityNotFound(id))) => {
            Response::builder()
                .status(404)
                .body(Body::new(id.to_string()))
                .unwrap()
        }
        Err(RestError::ServiceError(err @ service::ServiceError::SlotUnavailable(_))) => {
            Response::builder()
                .status(409)
                .body(Body::new(err.to_string()))
                .unwrap()
        }
        Err(RestError::ServiceError(err @ service::ServiceError::InvalidTransition(_, _))) => {
            Response::builder()
                .status(409)
                .body(Body::new(err.to_string()))
                .unwrap()
        }
        Err(RestError::ServiceError(err @ service::ServiceError::ValidationError(_))) => {
            Response::builder()
                .status(422)
                .body(Body::new(err.to_string()))
                .unwrap()
        }
        Err(RestError::ServiceError(err @ service::ServiceError::InvalidTimeFormat(_))) => {
            Response::builder()
                .status(422)
                .body(Body::new(err.to_string()))
                .unwrap()
        }
        Err(RestError::ServiceError(err @ service::ServiceError::PastDateTime(_))) => {
            Response::builder()
                .status(422)
                .body(Body::new(err.to_string()))
                .unwrap()
        }
        Err(RestError::ServiceError(err @ service::ServiceError::MechanicUnavailable(_))) => {
            Response::builder()
                .status(422)
                .body(Body::new(err.to_string()))
                .unwrap()
        }
        Err(RestError::ServiceError(
            err @ service::ServiceError::ServiceOfferingUnavailable(_),
        )) => Response::builder()
            .status(422)
            .body(Body::new(err.to_string()))
            .unwrap(),
        Err(RestError::ServiceError(service::ServiceError::DatabaseQueryError(err))) => {
            tracing::error!("Database error: {}", err);
            Response::builder().status(500).body(Body::empty()).unwrap()
        }
        Err(RestError::ServiceError(service::ServiceError::InternalError)) => {
            Response::builder().status(500).body(Body::empty()).unwrap()
        }
    }
}

pub trait RestStateDef: Clone + Send + Sync + 'static {
    type Transaction: dao::Transaction + Send + Sync + Clone + std::fmt::Debug + 'static;
    type BookingService: service::booking::BookingService<Context = Context, Transaction = Self::Transaction>
        + Send
        + Sync
        + 'static;
    type MechanicCalendarService: service::calendar::MechanicCalendarService<
            Context = Context,
            Transaction = Self::Transaction,
        > + Send
        + Sync
        + 'static;
    type MechanicService: service::mechanic::MechanicService<Context = Context, Transaction = Self::Transaction>
        + Send
        + Sync
        + 'static;
    type VehicleService: service::vehicle::VehicleService<Context = Context, Transaction = Self::Transaction>
        + Send
        + Sync
        + 'static;
    type ServiceOfferingService: service::service_offering::ServiceOfferingService<
            Context = Context,
            Transaction = Self::Transaction,
        > + Send
        + Sync
        + 'static;
    type PermissionService: service::PermissionService<Context = Context> + Send + Sync + 'static;

    fn booking_service(&self) -> Arc<Self::BookingService>;
    fn mechanic_calendar_service(&self) -> Arc<Self::MechanicCalendarService>;
    fn mechanic_service(&self) -> Arc<Self::MechanicService>;
    fn vehicle_service(&self) -> Arc<Self::VehicleService>;
    fn service_offering_service(&self) -> Arc<Self::ServiceOfferingService>;
    fn permission_service(&self) -> Arc<Self::PermissionService>;
}

/// Development authentication: trust the `x-user` header, fall back to
/// DEVUSER. Real identity handling is the deployment's concern.
#[cfg(feature = "mock_auth")]
pub async fn mock_auth_middleware(mut request: Request, next: Next) -> Response {
    let user: Context = request
        .headers()
        .get("x-user")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("DEVUSER")
        .into();
    request.extensions_mut().insert::<Context>(user);
    next.run(request).await
}

pub fn build_router<RestState: RestStateDef>(rest_state: RestState) -> Router {
    let router = Router::new()
        .nest("/booking", booking::generate_route())
        .nest("/mechanic", mechanic::generate_route())
        .nest("/vehicle", vehicle::generate_route())
        .nest("/service-offering", service_offering::generate_route())
        .nest("/permission", permission::generate_route())
        .with_state(rest_state);
    #[cfg(feature = "mock_auth")]
    let router = router.layer(axum::middleware::from_fn(mock_auth_middleware));
    router
}

pub async fn start_server<RestState: RestStateDef>(rest_state: RestState, bind_address: &str) {
    let app = build_router(rest_state);
    let listener = tokio::net::TcpListener::bind(bind_address)
        .await
        .expect("Could not bind server");
    axum::serve(listener, app)
        .await
        .expect("Could not start server");
}

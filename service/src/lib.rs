use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

pub mod booking;
pub mod calendar;
pub mod clock;
pub mod config;
pub mod mechanic;
pub mod notification;
pub mod permission;
pub mod service_offering;
pub mod user_service;
pub mod uuid_service;
pub mod vehicle;

pub use permission::{MockPermissionService, PermissionService, Privilege, Role, User};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationFailureItem {
    MissingField(Arc<str>),
    InvalidValue(Arc<str>),
    ModificationNotAllowed(Arc<str>),
    TooLong(Arc<str>, usize),
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Database query error: {0}")]
    DatabaseQueryError(#[from] dao::DaoError),

    #[error("Forbidden")]
    Forbidden,

    #[error("Entity {0} not found")]
    EntityNotFound(Uuid),

    #[error("Validation error: {0:?}")]
    ValidationError(Arc<[ValidationFailureItem]>),

    #[error("Invalid time of day: {0}")]
    InvalidTimeFormat(Arc<str>),

    #[error("Booking start {0} lies in the past")]
    PastDateTime(time::PrimitiveDateTime),

    #[error("Mechanic {0} already has a booking in the requested time window")]
    SlotUnavailable(Uuid),

    #[error("Transition from {0} to {1} is not allowed")]
    InvalidTransition(booking::BookingStatus, booking::BookingStatus),

    #[error("Mechanic {0} is not available for bookings")]
    MechanicUnavailable(Uuid),

    #[error("Service offering {0} is not bookable")]
    ServiceOfferingUnavailable(Uuid),

    #[error("Internal error")]
    InternalError,
}

impl From<garage_utils::time_window::TimeWindowError> for ServiceError {
    fn from(err: garage_utils::time_window::TimeWindowError) -> Self {
        match err {
            garage_utils::time_window::TimeWindowError::InvalidTimeFormat(raw) => {
                Self::InvalidTimeFormat(raw)
            }
        }
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;
use time::{Date, PrimitiveDateTime, Time};
use uuid::Uuid;

use crate::DaoError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BookingStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
    Rescheduled,
}
impl BookingStatus {
    pub fn as_db(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::NoShow => "no_show",
            Self::Rescheduled => "rescheduled",
        }
    }
    pub fn from_db(value: &str) -> Result<Self, DaoError> {
        match value {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            "no_show" => Ok(Self::NoShow),
            "rescheduled" => Ok(Self::Rescheduled),
            _ => Err(DaoError::UnexpectedValue(value.into())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceLocation {
    AtGarage,
    Mobile,
    PickupDelivery,
    Roadside,
}
impl ServiceLocation {
    pub fn as_db(self) -> &'static str {
        match self {
            Self::AtGarage => "at_garage",
            Self::Mobile => "mobile",
            Self::PickupDelivery => "pickup_delivery",
            Self::Roadside => "roadside",
        }
    }
    pub fn from_db(value: &str) -> Result<Self, DaoError> {
        match value {
            "at_garage" => Ok(Self::AtGarage),
            "mobile" => Ok(Self::Mobile),
            "pickup_delivery" => Ok(Self::PickupDelivery),
            "roadside" => Ok(Self::Roadside),
            _ => Err(DaoError::UnexpectedValue(value.into())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActorRole {
    Admin,
    Mechanic,
    Customer,
}
impl ActorRole {
    pub fn as_db(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Mechanic => "mechanic",
            Self::Customer => "customer",
        }
    }
    pub fn from_db(value: &str) -> Result<Self, DaoError> {
        match value {
            "admin" => Ok(Self::Admin),
            "mechanic" => Ok(Self::Mechanic),
            "customer" => Ok(Self::Customer),
            _ => Err(DaoError::UnexpectedValue(value.into())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RescheduleEntryEntity {
    pub original_date: Date,
    pub original_time: Time,
    pub new_date: Date,
    pub new_time: Time,
    pub reason: Option<Arc<str>>,
    pub changed_by: Arc<str>,
    pub changed_at: PrimitiveDateTime,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BookingEntity {
    pub id: Uuid,
    pub customer: Arc<str>,
    pub mechanic_id: Uuid,
    pub vehicle_id: Uuid,
    pub service_offering_id: Uuid,
    pub booking_date: Date,
    pub booking_time: Time,
    pub estimated_duration_minutes: u32,
    pub status: BookingStatus,
    pub service_location: ServiceLocation,
    pub estimated_cost: f64,
    pub actual_cost: Option<f64>,
    pub customer_notes: Option<Arc<str>>,
    pub mechanic_notes: Option<Arc<str>>,
    pub admin_notes: Option<Arc<str>>,
    pub cancellation_reason: Option<Arc<str>>,
    pub cancelled_by: Option<ActorRole>,
    pub reschedule_history: Arc<[RescheduleEntryEntity]>,
    pub created: PrimitiveDateTime,
    pub created_by: Option<Arc<str>>,
    pub version: Uuid,
}

#[automock(type Transaction = crate::MockTransaction;)]
#[async_trait]
pub trait BookingDao {
    type Transaction: crate::Transaction + Send;

    async fn all(&self, tx: Self::Transaction) -> Result<Arc<[BookingEntity]>, DaoError>;
    async fn find_by_id(
        &self,
        id: Uuid,
        tx: Self::Transaction,
    ) -> Result<Option<BookingEntity>, DaoError>;
    async fn find_by_customer(
        &self,
        customer: &str,
        tx: Self::Transaction,
    ) -> Result<Arc<[BookingEntity]>, DaoError>;
    async fn find_by_mechanic(
        &self,
        mechanic_id: Uuid,
        tx: Self::Transaction,
    ) -> Result<Arc<[BookingEntity]>, DaoError>;

    async fn create(
        &self,
        entity: &BookingEntity,
        process: &str,
        tx: Self::Transaction,
    ) -> Result<(), DaoError>;
    async fn update(
        &self,
        entity: &BookingEntity,
        process: &str,
        tx: Self::Transaction,
    ) -> Result<(), DaoError>;

    /// Bookings which hold one of the mechanic's slots: `confirmed` and
    /// `in_progress` only.
    async fn find_active_by_mechanic(
        &self,
        mechanic_id: Uuid,
        tx: Self::Transaction,
    ) -> Result<Arc<[BookingEntity]>, DaoError> {
        Ok(self
            .find_by_mechanic(mechanic_id, tx)
            .await?
            .iter()
            .filter(|entity| {
                matches!(
                    entity.status,
                    BookingStatus::Confirmed | BookingStatus::InProgress
                )
            })
            .cloned()
            .collect())
    }
}

use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;
use time::{Date, PrimitiveDateTime, Time};
use uuid::Uuid;

use crate::permission::Authentication;
use crate::ServiceError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
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
    pub fn as_str(self) -> &'static str {
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

    /// Terminal bookings accept no further transition.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::NoShow)
    }

    /// Only accepted work holds a slot on the mechanic's calendar. A merely
    /// requested (`pending`) booking does not reserve anything.
    pub fn occupies_slot(self) -> bool {
        matches!(self, Self::Confirmed | Self::InProgress)
    }
}
impl Display for BookingStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
impl From<dao::booking::BookingStatus> for BookingStatus {
    fn from(status: dao::booking::BookingStatus) -> Self {
        match status {
            dao::booking::BookingStatus::Pending => Self::Pending,
            dao::booking::BookingStatus::Confirmed => Self::Confirmed,
            dao::booking::BookingStatus::InProgress => Self::InProgress,
            dao::booking::BookingStatus::Completed => Self::Completed,
            dao::booking::BookingStatus::Cancelled => Self::Cancelled,
            dao::booking::BookingStatus::NoShow => Self::NoShow,
            dao::booking::BookingStatus::Rescheduled => Self::Rescheduled,
        }
    }
}
impl From<BookingStatus> for dao::booking::BookingStatus {
    fn from(status: BookingStatus) -> Self {
        match status {
            BookingStatus::Pending => Self::Pending,
            BookingStatus::Confirmed => Self::Confirmed,
            BookingStatus::InProgress => Self::InProgress,
            BookingStatus::Completed => Self::Completed,
            BookingStatus::Cancelled => Self::Cancelled,
            BookingStatus::NoShow => Self::NoShow,
            BookingStatus::Rescheduled => Self::Rescheduled,
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
impl From<dao::booking::ServiceLocation> for ServiceLocation {
    fn from(location: dao::booking::ServiceLocation) -> Self {
        match location {
            dao::booking::ServiceLocation::AtGarage => Self::AtGarage,
            dao::booking::ServiceLocation::Mobile => Self::Mobile,
            dao::booking::ServiceLocation::PickupDelivery => Self::PickupDelivery,
            dao::booking::ServiceLocation::Roadside => Self::Roadside,
        }
    }
}
impl From<ServiceLocation> for dao::booking::ServiceLocation {
    fn from(location: ServiceLocation) -> Self {
        match location {
            ServiceLocation::AtGarage => Self::AtGarage,
            ServiceLocation::Mobile => Self::Mobile,
            ServiceLocation::PickupDelivery => Self::PickupDelivery,
            ServiceLocation::Roadside => Self::Roadside,
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
    pub const ALL: [ActorRole; 3] = [ActorRole::Admin, ActorRole::Mechanic, ActorRole::Customer];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Mechanic => "mechanic",
            Self::Customer => "customer",
        }
    }
}
impl Display for ActorRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
impl From<dao::booking::ActorRole> for ActorRole {
    fn from(role: dao::booking::ActorRole) -> Self {
        match role {
            dao::booking::ActorRole::Admin => Self::Admin,
            dao::booking::ActorRole::Mechanic => Self::Mechanic,
            dao::booking::ActorRole::Customer => Self::Customer,
        }
    }
}
impl From<ActorRole> for dao::booking::ActorRole {
    fn from(role: ActorRole) -> Self {
        match role {
            ActorRole::Admin => Self::Admin,
            ActorRole::Mechanic => Self::Mechanic,
            ActorRole::Customer => Self::Customer,
        }
    }
}

/// The transition authorization matrix. Source states without a row are
/// terminal; roles without a row may do nothing from that state. Customers
/// never reach anything but `cancelled`, and `no_show` can only be called by
/// the garage side while the booking still awaited the customer.
pub const TRANSITIONS: &[(BookingStatus, ActorRole, &[BookingStatus])] = &[
    (
        BookingStatus::Pending,
        ActorRole::Admin,
        &[
            BookingStatus::Confirmed,
            BookingStatus::Cancelled,
            BookingStatus::NoShow,
        ],
    ),
    (
        BookingStatus::Pending,
        ActorRole::Mechanic,
        &[
            BookingStatus::Confirmed,
            BookingStatus::Cancelled,
            BookingStatus::NoShow,
        ],
    ),
    (
        BookingStatus::Pending,
        ActorRole::Customer,
        &[BookingStatus::Cancelled],
    ),
    (
        BookingStatus::Confirmed,
        ActorRole::Admin,
        &[
            BookingStatus::InProgress,
            BookingStatus::Completed,
            BookingStatus::Cancelled,
            BookingStatus::NoShow,
        ],
    ),
    (
        BookingStatus::Confirmed,
        ActorRole::Mechanic,
        &[
            BookingStatus::InProgress,
            BookingStatus::Completed,
            BookingStatus::Cancelled,
            BookingStatus::NoShow,
        ],
    ),
    (
        BookingStatus::Confirmed,
        ActorRole::Customer,
        &[BookingStatus::Cancelled],
    ),
    (
        BookingStatus::InProgress,
        ActorRole::Admin,
        &[BookingStatus::Completed, BookingStatus::Cancelled],
    ),
    (
        BookingStatus::InProgress,
        ActorRole::Mechanic,
        &[BookingStatus::Completed, BookingStatus::Cancelled],
    ),
    (
        BookingStatus::Rescheduled,
        ActorRole::Admin,
        &[BookingStatus::Confirmed, BookingStatus::Cancelled],
    ),
    (
        BookingStatus::Rescheduled,
        ActorRole::Mechanic,
        &[BookingStatus::Confirmed, BookingStatus::Cancelled],
    ),
    (
        BookingStatus::Rescheduled,
        ActorRole::Customer,
        &[BookingStatus::Cancelled],
    ),
];

pub fn allowed_targets(from: BookingStatus, role: ActorRole) -> &'static [BookingStatus] {
    TRANSITIONS
        .iter()
        .find(|(source, actor, _)| *source == from && *actor == role)
        .map(|(_, _, targets)| *targets)
        .unwrap_or(&[])
}

pub fn transition_allowed(from: BookingStatus, role: ActorRole, to: BookingStatus) -> bool {
    allowed_targets(from, role).contains(&to)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RescheduleEntry {
    pub original_date: Date,
    pub original_time: Time,
    pub new_date: Date,
    pub new_time: Time,
    pub reason: Option<Arc<str>>,
    pub changed_by: Arc<str>,
    pub changed_at: PrimitiveDateTime,
}
impl From<&dao::booking::RescheduleEntryEntity> for RescheduleEntry {
    fn from(entry: &dao::booking::RescheduleEntryEntity) -> Self {
        Self {
            original_date: entry.original_date,
            original_time: entry.original_time,
            new_date: entry.new_date,
            new_time: entry.new_time,
            reason: entry.reason.clone(),
            changed_by: entry.changed_by.clone(),
            changed_at: entry.changed_at,
        }
    }
}
impl From<&RescheduleEntry> for dao::booking::RescheduleEntryEntity {
    fn from(entry: &RescheduleEntry) -> Self {
        Self {
            original_date: entry.original_date,
            original_time: entry.original_time,
            new_date: entry.new_date,
            new_time: entry.new_time,
            reason: entry.reason.clone(),
            changed_by: entry.changed_by.clone(),
            changed_at: entry.changed_at,
        }
    }
}
garage_utils::derive_from_reference!(dao::booking::RescheduleEntryEntity, RescheduleEntry);

#[derive(Clone, Debug, PartialEq)]
pub struct Booking {
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
    pub reschedule_history: Arc<[RescheduleEntry]>,
    pub created: Option<PrimitiveDateTime>,
    pub created_by: Option<Arc<str>>,
    pub version: Uuid,
}
impl Booking {
    pub fn start_date_time(&self) -> PrimitiveDateTime {
        PrimitiveDateTime::new(self.booking_date, self.booking_time)
    }

    pub fn end_date_time(&self) -> PrimitiveDateTime {
        garage_utils::time_window::window_from_parts(
            self.booking_date,
            self.booking_time,
            self.estimated_duration_minutes,
        )
        .1
    }
}
impl From<&dao::booking::BookingEntity> for Booking {
    fn from(booking: &dao::booking::BookingEntity) -> Self {
        Self {
            id: booking.id,
            customer: booking.customer.clone(),
            mechanic_id: booking.mechanic_id,
            vehicle_id: booking.vehicle_id,
            service_offering_id: booking.service_offering_id,
            booking_date: booking.booking_date,
            booking_time: booking.booking_time,
            estimated_duration_minutes: booking.estimated_duration_minutes,
            status: booking.status.into(),
            service_location: booking.service_location.into(),
            estimated_cost: booking.estimated_cost,
            actual_cost: booking.actual_cost,
            customer_notes: booking.customer_notes.clone(),
            mechanic_notes: booking.mechanic_notes.clone(),
            admin_notes: booking.admin_notes.clone(),
            cancellation_reason: booking.cancellation_reason.clone(),
            cancelled_by: booking.cancelled_by.map(ActorRole::from),
            reschedule_history: booking
                .reschedule_history
                .iter()
                .map(RescheduleEntry::from)
                .collect(),
            created: Some(booking.created),
            created_by: booking.created_by.clone(),
            version: booking.version,
        }
    }
}
garage_utils::derive_from_reference!(dao::booking::BookingEntity, Booking);

impl TryFrom<&Booking> for dao::booking::BookingEntity {
    type Error = ServiceError;
    fn try_from(booking: &Booking) -> Result<Self, Self::Error> {
        Ok(Self {
            id: booking.id,
            customer: booking.customer.clone(),
            mechanic_id: booking.mechanic_id,
            vehicle_id: booking.vehicle_id,
            service_offering_id: booking.service_offering_id,
            booking_date: booking.booking_date,
            booking_time: booking.booking_time,
            estimated_duration_minutes: booking.estimated_duration_minutes,
            status: booking.status.into(),
            service_location: booking.service_location.into(),
            estimated_cost: booking.estimated_cost,
            actual_cost: booking.actual_cost,
            customer_notes: booking.customer_notes.clone(),
            mechanic_notes: booking.mechanic_notes.clone(),
            admin_notes: booking.admin_notes.clone(),
            cancellation_reason: booking.cancellation_reason.clone(),
            cancelled_by: booking.cancelled_by.map(dao::booking::ActorRole::from),
            reschedule_history: booking
                .reschedule_history
                .iter()
                .map(dao::booking::RescheduleEntryEntity::from)
                .collect(),
            created: booking.created.ok_or(ServiceError::InternalError)?,
            created_by: booking.created_by.clone(),
            version: booking.version,
        })
    }
}
garage_utils::derive_try_from_reference!(Booking, dao::booking::BookingEntity, ServiceError);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateBookingRequest {
    pub customer: Arc<str>,
    pub vehicle_id: Uuid,
    pub service_offering_id: Uuid,
    /// Explicit mechanic choice. Falls back to the offering's default
    /// mechanic when absent.
    pub mechanic_id: Option<Uuid>,
    pub booking_date: Date,
    /// Raw `HH:MM` time of day, validated by the time-window resolver.
    pub booking_time: Arc<str>,
    pub service_location: ServiceLocation,
    pub customer_notes: Option<Arc<str>>,
}

#[automock(type Context=(); type Transaction=dao::MockTransaction;)]
#[async_trait]
pub trait BookingService {
    type Context: Clone + Debug + PartialEq + Eq + Send + Sync + 'static;
    type Transaction: dao::Transaction;

    /// Role-scoped listing: admins see everything, mechanics their assigned
    /// bookings, customers their own.
    async fn get_all(
        &self,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Arc<[Booking]>, ServiceError>;

    async fn get(
        &self,
        id: Uuid,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Booking, ServiceError>;

    async fn create(
        &self,
        request: &CreateBookingRequest,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Booking, ServiceError>;

    #[allow(clippy::too_many_arguments)]
    async fn transition(
        &self,
        id: Uuid,
        target: BookingStatus,
        note: Option<Arc<str>>,
        cancellation_reason: Option<Arc<str>>,
        actual_cost: Option<f64>,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Booking, ServiceError>;

    async fn reschedule(
        &self,
        id: Uuid,
        new_date: Date,
        new_time: Arc<str>,
        reason: Option<Arc<str>>,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Booking, ServiceError>;
}

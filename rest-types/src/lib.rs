use std::sync::Arc;

use serde::{Deserialize, Serialize};
use service::booking::{
    ActorRole, Booking, BookingStatus, CreateBookingRequest, RescheduleEntry, ServiceLocation,
};
use service::mechanic::Mechanic;
use service::service_offering::ServiceOffering;
use service::vehicle::Vehicle;
use time::PrimitiveDateTime;
use uuid::Uuid;

fn format_time_of_day(time: time::Time) -> String {
    format!("{:02}:{:02}", time.hour(), time.minute())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserTO {
    pub name: String,
}
impl From<&service::User> for UserTO {
    fn from(user: &service::User) -> Self {
        Self {
            name: user.name.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RoleTO {
    pub name: String,
}
impl From<&service::Role> for RoleTO {
    fn from(role: &service::Role) -> Self {
        Self {
            name: role.name.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PrivilegeTO {
    pub name: String,
}
impl From<&service::Privilege> for PrivilegeTO {
    fn from(privilege: &service::Privilege) -> Self {
        Self {
            name: privilege.name.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserRoleTO {
    pub user: String,
    pub role: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RolePrivilegeTO {
    pub role: String,
    pub privilege: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatusTO {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
    Rescheduled,
}
impl From<BookingStatus> for BookingStatusTO {
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
impl From<BookingStatusTO> for BookingStatus {
    fn from(status: BookingStatusTO) -> Self {
        match status {
            BookingStatusTO::Pending => Self::Pending,
            BookingStatusTO::Confirmed => Self::Confirmed,
            BookingStatusTO::InProgress => Self::InProgress,
            BookingStatusTO::Completed => Self::Completed,
            BookingStatusTO::Cancelled => Self::Cancelled,
            BookingStatusTO::NoShow => Self::NoShow,
            BookingStatusTO::Rescheduled => Self::Rescheduled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceLocationTO {
    AtGarage,
    Mobile,
    PickupDelivery,
    Roadside,
}
impl From<ServiceLocation> for ServiceLocationTO {
    fn from(location: ServiceLocation) -> Self {
        match location {
            ServiceLocation::AtGarage => Self::AtGarage,
            ServiceLocation::Mobile => Self::Mobile,
            ServiceLocation::PickupDelivery => Self::PickupDelivery,
            ServiceLocation::Roadside => Self::Roadside,
        }
    }
}
impl From<ServiceLocationTO> for ServiceLocation {
    fn from(location: ServiceLocationTO) -> Self {
        match location {
            ServiceLocationTO::AtGarage => Self::AtGarage,
            ServiceLocationTO::Mobile => Self::Mobile,
            ServiceLocationTO::PickupDelivery => Self::PickupDelivery,
            ServiceLocationTO::Roadside => Self::Roadside,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRoleTO {
    Admin,
    Mechanic,
    Customer,
}
impl From<ActorRole> for ActorRoleTO {
    fn from(role: ActorRole) -> Self {
        match role {
            ActorRole::Admin => Self::Admin,
            ActorRole::Mechanic => Self::Mechanic,
            ActorRole::Customer => Self::Customer,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleEntryTO {
    pub original_date: time::Date,
    pub original_time: String,
    pub new_date: time::Date,
    pub new_time: String,
    pub reason: Option<Arc<str>>,
    pub changed_by: Arc<str>,
    pub changed_at: PrimitiveDateTime,
}
impl From<&RescheduleEntry> for RescheduleEntryTO {
    fn from(entry: &RescheduleEntry) -> Self {
        Self {
            original_date: entry.original_date,
            original_time: format_time_of_day(entry.original_time),
            new_date: entry.new_date,
            new_time: format_time_of_day(entry.new_time),
            reason: entry.reason.clone(),
            changed_by: entry.changed_by.clone(),
            changed_at: entry.changed_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingTO {
    #[serde(default)]
    pub id: Uuid,
    pub customer: Arc<str>,
    pub mechanic_id: Uuid,
    pub vehicle_id: Uuid,
    pub service_offering_id: Uuid,
    pub booking_date: time::Date,
    pub booking_time: String,
    pub estimated_duration_minutes: u32,
    pub status: BookingStatusTO,
    pub service_location: ServiceLocationTO,
    pub estimated_cost: f64,
    #[serde(default)]
    pub actual_cost: Option<f64>,
    #[serde(default)]
    pub customer_notes: Option<Arc<str>>,
    #[serde(default)]
    pub mechanic_notes: Option<Arc<str>>,
    #[serde(default)]
    pub admin_notes: Option<Arc<str>>,
    #[serde(default)]
    pub cancellation_reason: Option<Arc<str>>,
    #[serde(default)]
    pub cancelled_by: Option<ActorRoleTO>,
    #[serde(default)]
    pub reschedule_history: Vec<RescheduleEntryTO>,
    #[serde(default)]
    pub created: Option<PrimitiveDateTime>,
    #[serde(default)]
    pub created_by: Option<Arc<str>>,
    #[serde(rename = "$version")]
    #[serde(default)]
    pub version: Uuid,
}
impl From<&Booking> for BookingTO {
    fn from(booking: &Booking) -> Self {
        Self {
            id: booking.id,
            customer: booking.customer.clone(),
            mechanic_id: booking.mechanic_id,
            vehicle_id: booking.vehicle_id,
            service_offering_id: booking.service_offering_id,
            booking_date: booking.booking_date,
            booking_time: format_time_of_day(booking.booking_time),
            estimated_duration_minutes: booking.estimated_duration_minutes,
            status: booking.status.into(),
            service_location: booking.service_location.into(),
            estimated_cost: booking.estimated_cost,
            actual_cost: booking.actual_cost,
            customer_notes: booking.customer_notes.clone(),
            mechanic_notes: booking.mechanic_notes.clone(),
            admin_notes: booking.admin_notes.clone(),
            cancellation_reason: booking.cancellation_reason.clone(),
            cancelled_by: booking.cancelled_by.map(ActorRoleTO::from),
            reschedule_history: booking
                .reschedule_history
                .iter()
                .map(RescheduleEntryTO::from)
                .collect(),
            created: booking.created,
            created_by: booking.created_by.clone(),
            version: booking.version,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBookingRequestTO {
    /// Only admins may set this; everyone else books for themselves.
    #[serde(default)]
    pub customer: Option<Arc<str>>,
    pub vehicle_id: Uuid,
    pub service_offering_id: Uuid,
    #[serde(default)]
    pub mechanic_id: Option<Uuid>,
    pub booking_date: time::Date,
    pub booking_time: Arc<str>,
    pub service_location: ServiceLocationTO,
    #[serde(default)]
    pub customer_notes: Option<Arc<str>>,
}
impl CreateBookingRequestTO {
    pub fn to_request(&self, fallback_customer: Arc<str>) -> CreateBookingRequest {
        CreateBookingRequest {
            customer: self.customer.clone().unwrap_or(fallback_customer),
            vehicle_id: self.vehicle_id,
            service_offering_id: self.service_offering_id,
            mechanic_id: self.mechanic_id,
            booking_date: self.booking_date,
            booking_time: self.booking_time.clone(),
            service_location: self.service_location.into(),
            customer_notes: self.customer_notes.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRequestTO {
    pub status: BookingStatusTO,
    #[serde(default)]
    pub note: Option<Arc<str>>,
    #[serde(default)]
    pub cancellation_reason: Option<Arc<str>>,
    #[serde(default)]
    pub actual_cost: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleRequestTO {
    pub new_date: time::Date,
    pub new_time: Arc<str>,
    #[serde(default)]
    pub reason: Option<Arc<str>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CalendarQueryTO {
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub month: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MechanicTO {
    #[serde(default)]
    pub id: Uuid,
    pub name: Arc<str>,
    #[serde(default)]
    pub inactive: bool,
    #[serde(default)]
    pub deleted: Option<PrimitiveDateTime>,
    #[serde(rename = "$version")]
    #[serde(default)]
    pub version: Uuid,
}
impl From<&Mechanic> for MechanicTO {
    fn from(mechanic: &Mechanic) -> Self {
        Self {
            id: mechanic.id,
            name: mechanic.name.clone(),
            inactive: mechanic.inactive,
            deleted: mechanic.deleted,
            version: mechanic.version,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleTO {
    #[serde(default)]
    pub id: Uuid,
    pub owner: Arc<str>,
    pub make: Arc<str>,
    pub model: Arc<str>,
    pub build_year: i32,
    pub license_plate: Arc<str>,
    #[serde(default)]
    pub deleted: Option<PrimitiveDateTime>,
    #[serde(rename = "$version")]
    #[serde(default)]
    pub version: Uuid,
}
impl From<&Vehicle> for VehicleTO {
    fn from(vehicle: &Vehicle) -> Self {
        Self {
            id: vehicle.id,
            owner: vehicle.owner.clone(),
            make: vehicle.make.clone(),
            model: vehicle.model.clone(),
            build_year: vehicle.build_year,
            license_plate: vehicle.license_plate.clone(),
            deleted: vehicle.deleted,
            version: vehicle.version,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceOfferingTO {
    #[serde(default)]
    pub id: Uuid,
    pub name: Arc<str>,
    #[serde(default)]
    pub description: Option<Arc<str>>,
    pub base_cost: f64,
    pub estimated_duration_minutes: u32,
    #[serde(default)]
    pub is_available: bool,
    #[serde(default)]
    pub default_mechanic_id: Option<Uuid>,
    #[serde(default)]
    pub booking_count: u32,
    #[serde(default)]
    pub deleted: Option<PrimitiveDateTime>,
    #[serde(rename = "$version")]
    #[serde(default)]
    pub version: Uuid,
}
impl From<&ServiceOffering> for ServiceOfferingTO {
    fn from(offering: &ServiceOffering) -> Self {
        Self {
            id: offering.id,
            name: offering.name.clone(),
            description: offering.description.clone(),
            base_cost: offering.base_cost,
            estimated_duration_minutes: offering.estimated_duration_minutes,
            is_available: offering.is_available,
            default_mechanic_id: offering.default_mechanic_id,
            booking_count: offering.booking_count,
            deleted: offering.deleted,
            version: offering.version,
        }
    }
}

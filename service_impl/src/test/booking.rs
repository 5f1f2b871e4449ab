use std::sync::Arc;

use dao::booking::{BookingEntity, MockBookingDao, RescheduleEntryEntity};
use dao::{MockTransaction, MockTransactionDao};
use mockall::predicate::{always, eq};
use service::booking::{
    ActorRole, Booking, BookingService, BookingStatus, CreateBookingRequest, ServiceLocation,
};
use service::clock::MockClockService;
use service::mechanic::{Mechanic, MockMechanicService};
use service::notification::{BookingEventKind, MockNotificationService};
use service::permission::{Authentication, ADMIN_PRIVILEGE};
use service::service_offering::{MockServiceOfferingService, ServiceOffering};
use service::uuid_service::MockUuidService;
use service::vehicle::{MockVehicleService, Vehicle};
use service::{MockPermissionService, ServiceError, ValidationFailureItem};
use time::macros::{date, time};
use uuid::{uuid, Uuid};

use crate::booking::{resolve_assigned_mechanic, BookingServiceDeps, BookingServiceImpl};
use crate::test::error_test::*;

pub const OWNER: &str = "customer1";
pub const MECHANIC_USER: &str = "mechanic1";
pub const OTHER_USER: &str = "passer-by";

pub fn default_id() -> Uuid {
    uuid!("1E6DFDCC-2375-47A4-9FB9-6B99F0F30B10")
}
pub fn alternate_id() -> Uuid {
    uuid!("1E6DFDCC-2375-47A4-9FB9-6B99F0F30B11")
}
pub fn default_version() -> Uuid {
    uuid!("2B7557EF-B17C-4DBF-9FA6-9D1D8C4B9E20")
}
pub fn alternate_version() -> Uuid {
    uuid!("2B7557EF-B17C-4DBF-9FA6-9D1D8C4B9E21")
}
pub fn default_mechanic_id() -> Uuid {
    uuid!("71C3844B-52B1-4A09-A35F-311ED1FB3A30")
}
pub fn alternate_mechanic_id() -> Uuid {
    uuid!("71C3844B-52B1-4A09-A35F-311ED1FB3A31")
}
pub fn default_vehicle_id() -> Uuid {
    uuid!("D10D9A87-3A27-4E3E-BA3F-A2AB27D63240")
}
pub fn default_offering_id() -> Uuid {
    uuid!("E7A2BF2B-4E2E-47F1-87B5-C79E2CB60A50")
}

pub fn default_booking_entity() -> BookingEntity {
    BookingEntity {
        id: default_id(),
        customer: OWNER.into(),
        mechanic_id: default_mechanic_id(),
        vehicle_id: default_vehicle_id(),
        service_offering_id: default_offering_id(),
        booking_date: date!(2025 - 03 - 10),
        booking_time: time!(10:00),
        estimated_duration_minutes: 60,
        status: dao::booking::BookingStatus::Pending,
        service_location: dao::booking::ServiceLocation::AtGarage,
        estimated_cost: 120.0,
        actual_cost: None,
        customer_notes: None,
        mechanic_notes: None,
        admin_notes: None,
        cancellation_reason: None,
        cancelled_by: None,
        reschedule_history: Arc::new([]),
        created: generate_default_datetime(),
        created_by: Some(OWNER.into()),
        version: default_version(),
    }
}

pub fn default_booking() -> Booking {
    Booking::from(&default_booking_entity())
}

/// A confirmed booking of the same mechanic occupying 10:00-11:00 on the
/// same day.
pub fn conflicting_booking_entity() -> BookingEntity {
    BookingEntity {
        id: alternate_id(),
        customer: "customer2".into(),
        status: dao::booking::BookingStatus::Confirmed,
        ..default_booking_entity()
    }
}

pub fn default_vehicle() -> Vehicle {
    Vehicle {
        id: default_vehicle_id(),
        owner: OWNER.into(),
        make: "Volvo".into(),
        model: "V60".into(),
        build_year: 2019,
        license_plate: "GB-AB 123".into(),
        deleted: None,
        version: uuid!("D10D9A87-3A27-4E3E-BA3F-A2AB27D63241"),
    }
}

pub fn default_offering() -> ServiceOffering {
    ServiceOffering {
        id: default_offering_id(),
        name: "Oil change".into(),
        description: Some("Oil and filter change".into()),
        base_cost: 120.0,
        estimated_duration_minutes: 60,
        is_available: true,
        default_mechanic_id: None,
        booking_count: 0,
        deleted: None,
        version: uuid!("E7A2BF2B-4E2E-47F1-87B5-C79E2CB60A51"),
    }
}

pub fn default_mechanic() -> Mechanic {
    Mechanic {
        id: default_mechanic_id(),
        name: "Jo Gasket".into(),
        inactive: false,
        deleted: None,
        version: uuid!("71C3844B-52B1-4A09-A35F-311ED1FB3A32"),
    }
}

pub fn default_create_request() -> CreateBookingRequest {
    CreateBookingRequest {
        customer: OWNER.into(),
        vehicle_id: default_vehicle_id(),
        service_offering_id: default_offering_id(),
        mechanic_id: Some(default_mechanic_id()),
        booking_date: date!(2025 - 03 - 10),
        booking_time: "10:00".into(),
        service_location: ServiceLocation::AtGarage,
        customer_notes: None,
    }
}

pub struct BookingServiceDependencies {
    pub booking_dao: MockBookingDao,
    pub permission_service: MockPermissionService,
    pub clock_service: MockClockService,
    pub uuid_service: MockUuidService,
    pub mechanic_service: MockMechanicService,
    pub vehicle_service: MockVehicleService,
    pub service_offering_service: MockServiceOfferingService,
    pub notification_service: MockNotificationService,
    pub transaction_dao: MockTransactionDao,
}
impl BookingServiceDeps for BookingServiceDependencies {
    type Context = ();
    type Transaction = MockTransaction;
    type BookingDao = MockBookingDao;
    type PermissionService = MockPermissionService;
    type ClockService = MockClockService;
    type UuidService = MockUuidService;
    type MechanicService = MockMechanicService;
    type VehicleService = MockVehicleService;
    type ServiceOfferingService = MockServiceOfferingService;
    type NotificationService = MockNotificationService;
    type TransactionDao = MockTransactionDao;
}
impl BookingServiceDependencies {
    pub fn build_service(self) -> BookingServiceImpl<BookingServiceDependencies> {
        BookingServiceImpl {
            booking_dao: self.booking_dao.into(),
            permission_service: self.permission_service.into(),
            clock_service: self.clock_service.into(),
            uuid_service: self.uuid_service.into(),
            mechanic_service: self.mechanic_service.into(),
            vehicle_service: self.vehicle_service.into(),
            service_offering_service: self.service_offering_service.into(),
            notification_service: self.notification_service.into(),
            transaction_dao: self.transaction_dao.into(),
        }
    }
}

pub fn build_dependencies(admin: bool, user: &'static str) -> BookingServiceDependencies {
    let booking_dao = MockBookingDao::new();
    let mut permission_service = MockPermissionService::new();
    permission_service
        .expect_check_permission()
        .returning(move |privilege, context| {
            if context == Authentication::Full || (admin && privilege == ADMIN_PRIVILEGE) {
                Ok(())
            } else {
                Err(ServiceError::Forbidden)
            }
        });
    permission_service
        .expect_check_user()
        .returning(move |name, context| {
            if context == Authentication::Full || name == user {
                Ok(())
            } else {
                Err(ServiceError::Forbidden)
            }
        });
    permission_service
        .expect_current_user_id()
        .returning(move |context| match context {
            Authentication::Full => Ok(None),
            Authentication::Context(_) => Ok(Some(user.into())),
        });

    let mut clock_service = MockClockService::new();
    clock_service
        .expect_date_time_now()
        .returning(generate_default_datetime);

    let uuid_service = MockUuidService::new();

    let mut mechanic_service = MockMechanicService::new();
    mechanic_service
        .expect_verify_user_is_mechanic()
        .returning(|_, _, _| Err(ServiceError::Forbidden));
    mechanic_service
        .expect_get_mechanic_for_user()
        .returning(|_, _, _| Ok(None));

    let vehicle_service = MockVehicleService::new();
    let service_offering_service = MockServiceOfferingService::new();

    let mut notification_service = MockNotificationService::new();
    notification_service
        .expect_booking_event()
        .returning(|_, _| Ok(()));

    let mut transaction_dao = MockTransactionDao::new();
    transaction_dao
        .expect_use_transaction()
        .returning(|_| Ok(MockTransaction));
    transaction_dao.expect_commit().returning(|_| Ok(()));

    BookingServiceDependencies {
        booking_dao,
        permission_service,
        clock_service,
        uuid_service,
        mechanic_service,
        vehicle_service,
        service_offering_service,
        notification_service,
        transaction_dao,
    }
}

fn expect_create_lookups(deps: &mut BookingServiceDependencies) {
    deps.vehicle_service
        .expect_get()
        .with(eq(default_vehicle_id()), eq(Authentication::Full), always())
        .returning(|_, _, _| Ok(default_vehicle()));
    deps.service_offering_service
        .expect_get()
        .with(
            eq(default_offering_id()),
            eq(Authentication::Full),
            always(),
        )
        .returning(|_, _, _| Ok(default_offering()));
    deps.mechanic_service
        .expect_get()
        .with(
            eq(default_mechanic_id()),
            eq(Authentication::Full),
            always(),
        )
        .returning(|_, _, _| Ok(default_mechanic()));
}

fn expect_booking_uuids(deps: &mut BookingServiceDependencies) {
    deps.uuid_service
        .expect_new_uuid()
        .with(eq("booking-id"))
        .returning(|_| default_id());
    deps.uuid_service
        .expect_new_uuid()
        .with(eq("booking-version"))
        .returning(|_| default_version());
}

#[test]
fn test_resolve_assigned_mechanic_explicit_wins() {
    let result =
        resolve_assigned_mechanic(Some(default_mechanic_id()), Some(alternate_mechanic_id()));
    assert_eq!(result.unwrap(), default_mechanic_id());
}

#[test]
fn test_resolve_assigned_mechanic_falls_back_to_default() {
    let result = resolve_assigned_mechanic(None, Some(alternate_mechanic_id()));
    assert_eq!(result.unwrap(), alternate_mechanic_id());
}

#[test]
fn test_resolve_assigned_mechanic_rejects_when_unresolvable() {
    let result = resolve_assigned_mechanic(None, None);
    test_validation_error(
        &result,
        &ValidationFailureItem::MissingField("mechanic_id".into()),
        1,
    );
}

#[tokio::test]
async fn test_create() {
    let mut deps = build_dependencies(false, OWNER);
    expect_create_lookups(&mut deps);
    expect_booking_uuids(&mut deps);
    deps.booking_dao
        .expect_find_active_by_mechanic()
        .with(eq(default_mechanic_id()), always())
        .returning(|_, _| Ok(Arc::new([])));
    deps.booking_dao
        .expect_create()
        .with(eq(default_booking_entity()), eq("booking-service"), always())
        .times(1)
        .returning(|_, _, _| Ok(()));
    deps.service_offering_service
        .expect_record_booking()
        .with(
            eq(default_offering_id()),
            eq(Authentication::Full),
            always(),
        )
        .times(1)
        .returning(|_, _, _| Ok(()));
    let service = deps.build_service();

    let result = service
        .create(&default_create_request(), ().auth(), None)
        .await;

    assert!(result.is_ok());
    assert_eq!(result.unwrap(), default_booking());
}

#[tokio::test]
async fn test_create_emits_created_event() {
    let mut deps = build_dependencies(false, OWNER);
    expect_create_lookups(&mut deps);
    expect_booking_uuids(&mut deps);
    deps.booking_dao
        .expect_find_active_by_mechanic()
        .returning(|_, _| Ok(Arc::new([])));
    deps.booking_dao.expect_create().returning(|_, _, _| Ok(()));
    deps.service_offering_service
        .expect_record_booking()
        .returning(|_, _, _| Ok(()));
    deps.notification_service.checkpoint();
    deps.notification_service
        .expect_booking_event()
        .withf(|kind, booking| {
            *kind == BookingEventKind::Created && booking.id == default_id()
        })
        .times(1)
        .returning(|_, _| Ok(()));
    let service = deps.build_service();

    let result = service
        .create(&default_create_request(), ().auth(), None)
        .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_create_forbidden_for_other_user() {
    let deps = build_dependencies(false, OTHER_USER);
    let service = deps.build_service();

    let result = service
        .create(&default_create_request(), ().auth(), None)
        .await;
    test_forbidden(&result);
}

#[tokio::test]
async fn test_create_rejects_foreign_vehicle() {
    let mut deps = build_dependencies(false, OWNER);
    deps.vehicle_service.expect_get().returning(|_, _, _| {
        Ok(Vehicle {
            owner: "someone-else".into(),
            ..default_vehicle()
        })
    });
    let service = deps.build_service();

    let result = service
        .create(&default_create_request(), ().auth(), None)
        .await;
    test_forbidden(&result);
}

#[tokio::test]
async fn test_create_vehicle_not_found() {
    let mut deps = build_dependencies(false, OWNER);
    deps.vehicle_service
        .expect_get()
        .returning(|_, _, _| Err(ServiceError::EntityNotFound(default_vehicle_id())));
    let service = deps.build_service();

    let result = service
        .create(&default_create_request(), ().auth(), None)
        .await;
    test_not_found(&result, &default_vehicle_id());
}

#[tokio::test]
async fn test_create_offering_unavailable() {
    let mut deps = build_dependencies(false, OWNER);
    deps.vehicle_service
        .expect_get()
        .returning(|_, _, _| Ok(default_vehicle()));
    deps.service_offering_service.expect_get().returning(|_, _, _| {
        Ok(ServiceOffering {
            is_available: false,
            ..default_offering()
        })
    });
    let service = deps.build_service();

    let result = service
        .create(&default_create_request(), ().auth(), None)
        .await;
    if let Err(ServiceError::ServiceOfferingUnavailable(id)) = result {
        assert_eq!(id, default_offering_id());
    } else {
        panic!("Expected service offering unavailable error");
    }
}

#[tokio::test]
async fn test_create_invalid_time_format() {
    let deps = build_dependencies(false, OWNER);
    let service = deps.build_service();

    let result = service
        .create(
            &CreateBookingRequest {
                booking_time: "25:00".into(),
                ..default_create_request()
            },
            ().auth(),
            None,
        )
        .await;
    test_invalid_time_format(&result, "25:00");
}

#[tokio::test]
async fn test_create_past_date_time() {
    let mut deps = build_dependencies(false, OWNER);
    expect_create_lookups(&mut deps);
    let service = deps.build_service();

    let result = service
        .create(
            &CreateBookingRequest {
                booking_date: date!(2024 - 12 - 01),
                ..default_create_request()
            },
            ().auth(),
            None,
        )
        .await;
    test_past_date_time(&result);
}

#[tokio::test]
async fn test_create_slot_unavailable() {
    let mut deps = build_dependencies(false, OWNER);
    expect_create_lookups(&mut deps);
    deps.booking_dao
        .expect_find_active_by_mechanic()
        .returning(|_, _| Ok(Arc::new([conflicting_booking_entity()])));
    let service = deps.build_service();

    let result = service
        .create(&default_create_request(), ().auth(), None)
        .await;
    test_slot_unavailable(&result, &default_mechanic_id());
}

#[tokio::test]
async fn test_create_pending_requests_do_not_block() {
    // A second request for the identical slot goes through while the first
    // one is merely pending: pending bookings never occupy the slot.
    let mut deps = build_dependencies(false, OWNER);
    expect_create_lookups(&mut deps);
    expect_booking_uuids(&mut deps);
    deps.booking_dao
        .expect_find_active_by_mechanic()
        .returning(|_, _| Ok(Arc::new([])));
    deps.booking_dao
        .expect_create()
        .times(1)
        .returning(|_, _, _| Ok(()));
    deps.service_offering_service
        .expect_record_booking()
        .returning(|_, _, _| Ok(()));
    let service = deps.build_service();

    let result = service
        .create(&default_create_request(), ().auth(), None)
        .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_create_falls_back_to_offering_default_mechanic() {
    let mut deps = build_dependencies(false, OWNER);
    deps.vehicle_service
        .expect_get()
        .returning(|_, _, _| Ok(default_vehicle()));
    deps.service_offering_service.expect_get().returning(|_, _, _| {
        Ok(ServiceOffering {
            default_mechanic_id: Some(alternate_mechanic_id()),
            ..default_offering()
        })
    });
    deps.mechanic_service
        .expect_get()
        .with(
            eq(alternate_mechanic_id()),
            eq(Authentication::Full),
            always(),
        )
        .returning(|_, _, _| {
            Ok(Mechanic {
                id: alternate_mechanic_id(),
                ..default_mechanic()
            })
        });
    expect_booking_uuids(&mut deps);
    deps.booking_dao
        .expect_find_active_by_mechanic()
        .with(eq(alternate_mechanic_id()), always())
        .returning(|_, _| Ok(Arc::new([])));
    deps.booking_dao
        .expect_create()
        .with(
            eq(BookingEntity {
                mechanic_id: alternate_mechanic_id(),
                ..default_booking_entity()
            }),
            eq("booking-service"),
            always(),
        )
        .times(1)
        .returning(|_, _, _| Ok(()));
    deps.service_offering_service
        .expect_record_booking()
        .returning(|_, _, _| Ok(()));
    let service = deps.build_service();

    let result = service
        .create(
            &CreateBookingRequest {
                mechanic_id: None,
                ..default_create_request()
            },
            ().auth(),
            None,
        )
        .await;
    assert!(result.is_ok());
    assert_eq!(result.unwrap().mechanic_id, alternate_mechanic_id());
}

#[tokio::test]
async fn test_create_without_any_mechanic() {
    let mut deps = build_dependencies(false, OWNER);
    deps.vehicle_service
        .expect_get()
        .returning(|_, _, _| Ok(default_vehicle()));
    deps.service_offering_service
        .expect_get()
        .returning(|_, _, _| Ok(default_offering()));
    let service = deps.build_service();

    let result = service
        .create(
            &CreateBookingRequest {
                mechanic_id: None,
                ..default_create_request()
            },
            ().auth(),
            None,
        )
        .await;
    test_validation_error(
        &result,
        &ValidationFailureItem::MissingField("mechanic_id".into()),
        1,
    );
}

#[tokio::test]
async fn test_create_inactive_mechanic() {
    let mut deps = build_dependencies(false, OWNER);
    deps.vehicle_service
        .expect_get()
        .returning(|_, _, _| Ok(default_vehicle()));
    deps.service_offering_service
        .expect_get()
        .returning(|_, _, _| Ok(default_offering()));
    deps.mechanic_service.expect_get().returning(|_, _, _| {
        Ok(Mechanic {
            inactive: true,
            ..default_mechanic()
        })
    });
    let service = deps.build_service();

    let result = service
        .create(&default_create_request(), ().auth(), None)
        .await;
    test_mechanic_unavailable(&result, &default_mechanic_id());
}

#[tokio::test]
async fn test_confirm_pending_booking() {
    let mut deps = build_dependencies(true, "admin1");
    deps.booking_dao
        .expect_find_by_id()
        .with(eq(default_id()), always())
        .returning(|_, _| Ok(Some(default_booking_entity())));
    deps.booking_dao
        .expect_find_active_by_mechanic()
        .returning(|_, _| Ok(Arc::new([])));
    deps.uuid_service
        .expect_new_uuid()
        .with(eq("booking-version"))
        .returning(|_| alternate_version());
    deps.booking_dao
        .expect_update()
        .with(
            eq(BookingEntity {
                status: dao::booking::BookingStatus::Confirmed,
                version: alternate_version(),
                ..default_booking_entity()
            }),
            eq("booking-service"),
            always(),
        )
        .times(1)
        .returning(|_, _, _| Ok(()));
    let service = deps.build_service();

    let result = service
        .transition(
            default_id(),
            BookingStatus::Confirmed,
            None,
            None,
            None,
            ().auth(),
            None,
        )
        .await;
    assert!(result.is_ok());
    assert_eq!(result.unwrap().status, BookingStatus::Confirmed);
}

#[tokio::test]
async fn test_confirm_rejected_when_slot_taken() {
    // Two pending requests on the same slot: confirming the second one after
    // the first was accepted must fail.
    let mut deps = build_dependencies(true, "admin1");
    deps.booking_dao
        .expect_find_by_id()
        .returning(|_, _| Ok(Some(default_booking_entity())));
    deps.booking_dao
        .expect_find_active_by_mechanic()
        .returning(|_, _| Ok(Arc::new([conflicting_booking_entity()])));
    let service = deps.build_service();

    let result = service
        .transition(
            default_id(),
            BookingStatus::Confirmed,
            None,
            None,
            None,
            ().auth(),
            None,
        )
        .await;
    test_slot_unavailable(&result, &default_mechanic_id());
}

#[tokio::test]
async fn test_transition_not_found() {
    let mut deps = build_dependencies(true, "admin1");
    deps.booking_dao
        .expect_find_by_id()
        .returning(|_, _| Ok(None));
    let service = deps.build_service();

    let result = service
        .transition(
            default_id(),
            BookingStatus::Confirmed,
            None,
            None,
            None,
            ().auth(),
            None,
        )
        .await;
    test_not_found(&result, &default_id());
}

#[tokio::test]
async fn test_owner_cancels_with_reason() {
    let mut deps = build_dependencies(false, OWNER);
    deps.booking_dao
        .expect_find_by_id()
        .returning(|_, _| Ok(Some(default_booking_entity())));
    deps.uuid_service
        .expect_new_uuid()
        .with(eq("booking-version"))
        .returning(|_| alternate_version());
    deps.booking_dao
        .expect_update()
        .with(
            eq(BookingEntity {
                status: dao::booking::BookingStatus::Cancelled,
                cancellation_reason: Some("Found a closer garage".into()),
                cancelled_by: Some(dao::booking::ActorRole::Customer),
                version: alternate_version(),
                ..default_booking_entity()
            }),
            eq("booking-service"),
            always(),
        )
        .times(1)
        .returning(|_, _, _| Ok(()));
    deps.notification_service.checkpoint();
    deps.notification_service
        .expect_booking_event()
        .withf(|kind, _| {
            matches!(
                kind,
                BookingEventKind::Cancelled {
                    cancelled_by: ActorRole::Customer
                }
            )
        })
        .times(1)
        .returning(|_, _| Ok(()));
    let service = deps.build_service();

    let result = service
        .transition(
            default_id(),
            BookingStatus::Cancelled,
            None,
            Some("Found a closer garage".into()),
            None,
            ().auth(),
            None,
        )
        .await;
    assert!(result.is_ok());
    let booking = result.unwrap();
    assert_eq!(booking.status, BookingStatus::Cancelled);
    assert_eq!(booking.cancelled_by, Some(ActorRole::Customer));
}

#[tokio::test]
async fn test_cancel_requires_reason() {
    let mut deps = build_dependencies(false, OWNER);
    deps.booking_dao
        .expect_find_by_id()
        .returning(|_, _| Ok(Some(default_booking_entity())));
    let service = deps.build_service();

    let result = service
        .transition(
            default_id(),
            BookingStatus::Cancelled,
            None,
            None,
            None,
            ().auth(),
            None,
        )
        .await;
    test_validation_error(
        &result,
        &ValidationFailureItem::MissingField("cancellation_reason".into()),
        1,
    );
}

#[tokio::test]
async fn test_cancel_reason_bounded() {
    let mut deps = build_dependencies(false, OWNER);
    deps.booking_dao
        .expect_find_by_id()
        .returning(|_, _| Ok(Some(default_booking_entity())));
    let service = deps.build_service();

    let result = service
        .transition(
            default_id(),
            BookingStatus::Cancelled,
            None,
            Some("x".repeat(201).into()),
            None,
            ().auth(),
            None,
        )
        .await;
    test_validation_error(
        &result,
        &ValidationFailureItem::TooLong("cancellation_reason".into(), 200),
        1,
    );
}

#[tokio::test]
async fn test_owner_cannot_start_work() {
    let mut deps = build_dependencies(false, OWNER);
    deps.booking_dao.expect_find_by_id().returning(|_, _| {
        Ok(Some(BookingEntity {
            status: dao::booking::BookingStatus::Confirmed,
            ..default_booking_entity()
        }))
    });
    let service = deps.build_service();

    let result = service
        .transition(
            default_id(),
            BookingStatus::InProgress,
            None,
            None,
            None,
            ().auth(),
            None,
        )
        .await;
    test_forbidden(&result);
}

#[tokio::test]
async fn test_unrelated_user_is_rejected() {
    let mut deps = build_dependencies(false, OTHER_USER);
    deps.booking_dao
        .expect_find_by_id()
        .returning(|_, _| Ok(Some(default_booking_entity())));
    let service = deps.build_service();

    let result = service
        .transition(
            default_id(),
            BookingStatus::Cancelled,
            None,
            Some("because".into()),
            None,
            ().auth(),
            None,
        )
        .await;
    test_forbidden(&result);
}

#[tokio::test]
async fn test_terminal_states_reject_transitions() {
    for status in [
        dao::booking::BookingStatus::Completed,
        dao::booking::BookingStatus::Cancelled,
        dao::booking::BookingStatus::NoShow,
    ] {
        let mut deps = build_dependencies(true, "admin1");
        deps.booking_dao.expect_find_by_id().returning(move |_, _| {
            Ok(Some(BookingEntity {
                status,
                ..default_booking_entity()
            }))
        });
        let service = deps.build_service();

        let result = service
            .transition(
                default_id(),
                BookingStatus::Confirmed,
                None,
                None,
                None,
                ().auth(),
                None,
            )
            .await;
        test_invalid_transition(&result, status.into(), BookingStatus::Confirmed);
    }
}

#[tokio::test]
async fn test_nobody_can_move_backwards() {
    let mut deps = build_dependencies(true, "admin1");
    deps.booking_dao.expect_find_by_id().returning(|_, _| {
        Ok(Some(BookingEntity {
            status: dao::booking::BookingStatus::Confirmed,
            ..default_booking_entity()
        }))
    });
    let service = deps.build_service();

    let result = service
        .transition(
            default_id(),
            BookingStatus::Pending,
            None,
            None,
            None,
            ().auth(),
            None,
        )
        .await;
    test_invalid_transition(&result, BookingStatus::Confirmed, BookingStatus::Pending);
}

#[tokio::test]
async fn test_complete_records_actual_cost() {
    let mut deps = build_dependencies(true, "admin1");
    deps.booking_dao.expect_find_by_id().returning(|_, _| {
        Ok(Some(BookingEntity {
            status: dao::booking::BookingStatus::Confirmed,
            ..default_booking_entity()
        }))
    });
    deps.uuid_service
        .expect_new_uuid()
        .with(eq("booking-version"))
        .returning(|_| alternate_version());
    deps.booking_dao
        .expect_update()
        .with(
            eq(BookingEntity {
                status: dao::booking::BookingStatus::Completed,
                actual_cost: Some(150.0),
                version: alternate_version(),
                ..default_booking_entity()
            }),
            eq("booking-service"),
            always(),
        )
        .times(1)
        .returning(|_, _, _| Ok(()));
    let service = deps.build_service();

    let result = service
        .transition(
            default_id(),
            BookingStatus::Completed,
            None,
            None,
            Some(150.0),
            ().auth(),
            None,
        )
        .await;
    assert!(result.is_ok());
    assert_eq!(result.unwrap().actual_cost, Some(150.0));
}

#[tokio::test]
async fn test_actual_cost_only_on_completion() {
    let mut deps = build_dependencies(true, "admin1");
    deps.booking_dao
        .expect_find_by_id()
        .returning(|_, _| Ok(Some(default_booking_entity())));
    deps.booking_dao
        .expect_find_active_by_mechanic()
        .returning(|_, _| Ok(Arc::new([])));
    let service = deps.build_service();

    let result = service
        .transition(
            default_id(),
            BookingStatus::Confirmed,
            None,
            None,
            Some(150.0),
            ().auth(),
            None,
        )
        .await;
    test_validation_error(
        &result,
        &ValidationFailureItem::ModificationNotAllowed("actual_cost".into()),
        1,
    );
}

#[tokio::test]
async fn test_mechanic_note_lands_in_mechanic_field() {
    let mut deps = build_dependencies(false, MECHANIC_USER);
    deps.mechanic_service.checkpoint();
    deps.mechanic_service
        .expect_verify_user_is_mechanic()
        .with(eq(default_mechanic_id()), always(), always())
        .returning(|_, _, _| Ok(()));
    deps.booking_dao.expect_find_by_id().returning(|_, _| {
        Ok(Some(BookingEntity {
            status: dao::booking::BookingStatus::Confirmed,
            ..default_booking_entity()
        }))
    });
    deps.uuid_service
        .expect_new_uuid()
        .with(eq("booking-version"))
        .returning(|_| alternate_version());
    deps.booking_dao
        .expect_update()
        .with(
            eq(BookingEntity {
                status: dao::booking::BookingStatus::InProgress,
                mechanic_notes: Some("Brake pads worn".into()),
                version: alternate_version(),
                ..default_booking_entity()
            }),
            eq("booking-service"),
            always(),
        )
        .times(1)
        .returning(|_, _, _| Ok(()));
    let service = deps.build_service();

    let result = service
        .transition(
            default_id(),
            BookingStatus::InProgress,
            Some("Brake pads worn".into()),
            None,
            None,
            ().auth(),
            None,
        )
        .await;
    assert!(result.is_ok());
    assert_eq!(
        result.unwrap().mechanic_notes,
        Some(Arc::from("Brake pads worn"))
    );
}

#[tokio::test]
async fn test_notification_failure_does_not_fail_transition() {
    let mut deps = build_dependencies(true, "admin1");
    deps.booking_dao
        .expect_find_by_id()
        .returning(|_, _| Ok(Some(default_booking_entity())));
    deps.booking_dao
        .expect_find_active_by_mechanic()
        .returning(|_, _| Ok(Arc::new([])));
    deps.uuid_service
        .expect_new_uuid()
        .returning(|_| alternate_version());
    deps.booking_dao
        .expect_update()
        .times(1)
        .returning(|_, _, _| Ok(()));
    deps.notification_service.checkpoint();
    deps.notification_service
        .expect_booking_event()
        .times(1)
        .returning(|_, _| Err(ServiceError::InternalError));
    let service = deps.build_service();

    let result = service
        .transition(
            default_id(),
            BookingStatus::Confirmed,
            None,
            None,
            None,
            ().auth(),
            None,
        )
        .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_reschedule() {
    let mut deps = build_dependencies(false, OWNER);
    deps.booking_dao
        .expect_find_by_id()
        .returning(|_, _| Ok(Some(default_booking_entity())));
    deps.booking_dao
        .expect_find_active_by_mechanic()
        .returning(|_, _| Ok(Arc::new([])));
    deps.uuid_service
        .expect_new_uuid()
        .with(eq("booking-version"))
        .returning(|_| alternate_version());
    deps.booking_dao
        .expect_update()
        .with(
            eq(BookingEntity {
                booking_date: date!(2025 - 03 - 12),
                booking_time: time!(14:30),
                status: dao::booking::BookingStatus::Rescheduled,
                reschedule_history: Arc::new([RescheduleEntryEntity {
                    original_date: date!(2025 - 03 - 10),
                    original_time: time!(10:00),
                    new_date: date!(2025 - 03 - 12),
                    new_time: time!(14:30),
                    reason: Some("On vacation".into()),
                    changed_by: OWNER.into(),
                    changed_at: generate_default_datetime(),
                }]),
                version: alternate_version(),
                ..default_booking_entity()
            }),
            eq("booking-service"),
            always(),
        )
        .times(1)
        .returning(|_, _, _| Ok(()));
    deps.notification_service.checkpoint();
    deps.notification_service
        .expect_booking_event()
        .withf(|kind, _| *kind == BookingEventKind::Rescheduled)
        .times(1)
        .returning(|_, _| Ok(()));
    let service = deps.build_service();

    let result = service
        .reschedule(
            default_id(),
            date!(2025 - 03 - 12),
            "14:30".into(),
            Some("On vacation".into()),
            ().auth(),
            None,
        )
        .await;
    assert!(result.is_ok());
    let booking = result.unwrap();
    assert_eq!(booking.status, BookingStatus::Rescheduled);
    assert_eq!(booking.booking_date, date!(2025 - 03 - 12));
    assert_eq!(booking.reschedule_history.len(), 1);
}

#[tokio::test]
async fn test_reschedule_does_not_collide_with_itself() {
    let mut deps = build_dependencies(false, OWNER);
    let confirmed = BookingEntity {
        status: dao::booking::BookingStatus::Confirmed,
        ..default_booking_entity()
    };
    deps.booking_dao.expect_find_by_id().returning({
        let confirmed = confirmed.clone();
        move |_, _| Ok(Some(confirmed.clone()))
    });
    deps.booking_dao
        .expect_find_active_by_mechanic()
        .returning(move |_, _| Ok(Arc::new([confirmed.clone()])));
    deps.uuid_service
        .expect_new_uuid()
        .returning(|_| alternate_version());
    deps.booking_dao
        .expect_update()
        .times(1)
        .returning(|_, _, _| Ok(()));
    let service = deps.build_service();

    let result = service
        .reschedule(
            default_id(),
            date!(2025 - 03 - 10),
            "10:00".into(),
            None,
            ().auth(),
            None,
        )
        .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_reschedule_into_taken_slot() {
    let mut deps = build_dependencies(false, OWNER);
    deps.booking_dao
        .expect_find_by_id()
        .returning(|_, _| Ok(Some(default_booking_entity())));
    deps.booking_dao
        .expect_find_active_by_mechanic()
        .returning(|_, _| Ok(Arc::new([conflicting_booking_entity()])));
    let service = deps.build_service();

    let result = service
        .reschedule(
            default_id(),
            date!(2025 - 03 - 10),
            "10:30".into(),
            None,
            ().auth(),
            None,
        )
        .await;
    test_slot_unavailable(&result, &default_mechanic_id());
}

#[tokio::test]
async fn test_reschedule_into_the_past() {
    let mut deps = build_dependencies(false, OWNER);
    deps.booking_dao
        .expect_find_by_id()
        .returning(|_, _| Ok(Some(default_booking_entity())));
    let service = deps.build_service();

    let result = service
        .reschedule(
            default_id(),
            date!(2025 - 02 - 01),
            "10:00".into(),
            None,
            ().auth(),
            None,
        )
        .await;
    test_past_date_time(&result);
}

#[tokio::test]
async fn test_reschedule_invalid_time() {
    let mut deps = build_dependencies(false, OWNER);
    deps.booking_dao
        .expect_find_by_id()
        .returning(|_, _| Ok(Some(default_booking_entity())));
    let service = deps.build_service();

    let result = service
        .reschedule(default_id(), date!(2025 - 03 - 12), "7pm".into(), None, ().auth(), None)
        .await;
    test_invalid_time_format(&result, "7pm");
}

#[tokio::test]
async fn test_reschedule_terminal_booking() {
    let mut deps = build_dependencies(false, OWNER);
    deps.booking_dao.expect_find_by_id().returning(|_, _| {
        Ok(Some(BookingEntity {
            status: dao::booking::BookingStatus::Completed,
            ..default_booking_entity()
        }))
    });
    let service = deps.build_service();

    let result = service
        .reschedule(
            default_id(),
            date!(2025 - 03 - 12),
            "14:30".into(),
            None,
            ().auth(),
            None,
        )
        .await;
    test_invalid_transition(&result, BookingStatus::Completed, BookingStatus::Rescheduled);
}

#[tokio::test]
async fn test_reschedule_forbidden_for_unrelated_user() {
    let mut deps = build_dependencies(false, OTHER_USER);
    deps.booking_dao
        .expect_find_by_id()
        .returning(|_, _| Ok(Some(default_booking_entity())));
    let service = deps.build_service();

    let result = service
        .reschedule(
            default_id(),
            date!(2025 - 03 - 12),
            "14:30".into(),
            None,
            ().auth(),
            None,
        )
        .await;
    test_forbidden(&result);
}

#[tokio::test]
async fn test_reschedule_history_chains() {
    // The previous reschedule's new date/time must become the next entry's
    // original date/time.
    let first_entry = RescheduleEntryEntity {
        original_date: date!(2025 - 03 - 08),
        original_time: time!(9:00),
        new_date: date!(2025 - 03 - 10),
        new_time: time!(10:00),
        reason: None,
        changed_by: OWNER.into(),
        changed_at: generate_default_datetime(),
    };
    let mut deps = build_dependencies(false, OWNER);
    deps.booking_dao.expect_find_by_id().returning({
        let first_entry = first_entry.clone();
        move |_, _| {
            Ok(Some(BookingEntity {
                status: dao::booking::BookingStatus::Rescheduled,
                reschedule_history: Arc::new([first_entry.clone()]),
                ..default_booking_entity()
            }))
        }
    });
    deps.booking_dao
        .expect_find_active_by_mechanic()
        .returning(|_, _| Ok(Arc::new([])));
    deps.uuid_service
        .expect_new_uuid()
        .returning(|_| alternate_version());
    deps.booking_dao
        .expect_update()
        .withf(|entity, _, _| {
            entity.reschedule_history.len() == 2
                && entity.reschedule_history[0].new_date
                    == entity.reschedule_history[1].original_date
                && entity.reschedule_history[0].new_time
                    == entity.reschedule_history[1].original_time
        })
        .times(1)
        .returning(|_, _, _| Ok(()));
    let service = deps.build_service();

    let result = service
        .reschedule(
            default_id(),
            date!(2025 - 03 - 14),
            "08:30".into(),
            None,
            ().auth(),
            None,
        )
        .await;
    assert!(result.is_ok());
    let booking = result.unwrap();
    assert_eq!(booking.reschedule_history.len(), 2);
    assert_eq!(
        booking.reschedule_history[1].original_date,
        booking.reschedule_history[0].new_date
    );
    // The last entry always points at the booking's current slot.
    assert_eq!(booking.reschedule_history[1].new_date, booking.booking_date);
    assert_eq!(booking.reschedule_history[1].new_time, booking.booking_time);
    assert_eq!(booking.booking_date, date!(2025 - 03 - 14));
}

#[tokio::test]
async fn test_get_all_as_admin_sorted() {
    let mut deps = build_dependencies(true, "admin1");
    deps.booking_dao.expect_all().returning(|_| {
        Ok(Arc::new([
            BookingEntity {
                booking_date: date!(2025 - 03 - 11),
                booking_time: time!(9:00),
                ..default_booking_entity()
            },
            BookingEntity {
                id: alternate_id(),
                booking_date: date!(2025 - 03 - 10),
                booking_time: time!(14:00),
                ..default_booking_entity()
            },
        ]))
    });
    let service = deps.build_service();

    let result = service.get_all(().auth(), None).await;
    assert!(result.is_ok());
    let bookings = result.unwrap();
    assert_eq!(bookings.len(), 2);
    assert_eq!(bookings[0].id, alternate_id());
    assert_eq!(bookings[1].id, default_id());
}

#[tokio::test]
async fn test_get_all_scopes_to_customer() {
    let mut deps = build_dependencies(false, OWNER);
    deps.booking_dao
        .expect_find_by_customer()
        .with(eq(OWNER), always())
        .times(1)
        .returning(|_, _| Ok(Arc::new([default_booking_entity()])));
    let service = deps.build_service();

    let result = service.get_all(().auth(), None).await;
    assert!(result.is_ok());
    assert_eq!(result.unwrap().len(), 1);
}

#[tokio::test]
async fn test_get_all_scopes_to_mechanic() {
    let mut deps = build_dependencies(false, MECHANIC_USER);
    deps.mechanic_service.checkpoint();
    deps.mechanic_service
        .expect_get_mechanic_for_user()
        .returning(|_, _, _| Ok(Some(default_mechanic())));
    deps.booking_dao
        .expect_find_by_mechanic()
        .with(eq(default_mechanic_id()), always())
        .times(1)
        .returning(|_, _| Ok(Arc::new([default_booking_entity()])));
    let service = deps.build_service();

    let result = service.get_all(().auth(), None).await;
    assert!(result.is_ok());
    assert_eq!(result.unwrap().len(), 1);
}

#[tokio::test]
async fn test_get_as_owner() {
    let mut deps = build_dependencies(false, OWNER);
    deps.booking_dao
        .expect_find_by_id()
        .with(eq(default_id()), always())
        .returning(|_, _| Ok(Some(default_booking_entity())));
    let service = deps.build_service();

    let result = service.get(default_id(), ().auth(), None).await;
    assert!(result.is_ok());
    assert_eq!(result.unwrap(), default_booking());
}

#[tokio::test]
async fn test_get_forbidden_for_unrelated_user() {
    let mut deps = build_dependencies(false, OTHER_USER);
    deps.booking_dao
        .expect_find_by_id()
        .returning(|_, _| Ok(Some(default_booking_entity())));
    let service = deps.build_service();

    let result = service.get(default_id(), ().auth(), None).await;
    test_forbidden(&result);
}

#[tokio::test]
async fn test_get_not_found() {
    let mut deps = build_dependencies(false, OWNER);
    deps.booking_dao
        .expect_find_by_id()
        .returning(|_, _| Ok(None));
    let service = deps.build_service();

    let result = service.get(default_id(), ().auth(), None).await;
    test_not_found(&result, &default_id());
}

use std::sync::Arc;

use dao::booking::{BookingEntity, MockBookingDao};
use dao::{MockTransaction, MockTransactionDao};
use mockall::predicate::{always, eq};
use service::calendar::{CalendarMonth, MechanicCalendarService};
use service::mechanic::MockMechanicService;
use service::permission::{Authentication, ADMIN_PRIVILEGE};
use service::{MockPermissionService, ServiceError};
use time::macros::{date, time};

use crate::calendar::{MechanicCalendarServiceDeps, MechanicCalendarServiceImpl};
use crate::test::booking::{
    alternate_id, conflicting_booking_entity, default_booking_entity, default_id,
    default_mechanic_id,
};
use crate::test::error_test::*;

pub struct CalendarServiceDependencies {
    pub booking_dao: MockBookingDao,
    pub mechanic_service: MockMechanicService,
    pub permission_service: MockPermissionService,
    pub transaction_dao: MockTransactionDao,
}
impl MechanicCalendarServiceDeps for CalendarServiceDependencies {
    type Context = ();
    type Transaction = MockTransaction;
    type BookingDao = MockBookingDao;
    type MechanicService = MockMechanicService;
    type PermissionService = MockPermissionService;
    type TransactionDao = MockTransactionDao;
}
impl CalendarServiceDependencies {
    pub fn build_service(self) -> MechanicCalendarServiceImpl<CalendarServiceDependencies> {
        MechanicCalendarServiceImpl {
            booking_dao: self.booking_dao.into(),
            mechanic_service: self.mechanic_service.into(),
            permission_service: self.permission_service.into(),
            transaction_dao: self.transaction_dao.into(),
        }
    }
}

pub fn build_dependencies(admin: bool, assigned_mechanic: bool) -> CalendarServiceDependencies {
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
    let mut mechanic_service = MockMechanicService::new();
    mechanic_service
        .expect_verify_user_is_mechanic()
        .returning(move |_, _, _| {
            if assigned_mechanic {
                Ok(())
            } else {
                Err(ServiceError::Forbidden)
            }
        });
    mechanic_service.expect_exists().returning(|_, _, _| Ok(true));
    let mut transaction_dao = MockTransactionDao::new();
    transaction_dao
        .expect_use_transaction()
        .returning(|_| Ok(MockTransaction));
    transaction_dao.expect_commit().returning(|_| Ok(()));

    CalendarServiceDependencies {
        booking_dao,
        mechanic_service,
        permission_service,
        transaction_dao,
    }
}

#[tokio::test]
async fn test_calendar_forbidden_for_strangers() {
    let deps = build_dependencies(false, false);
    let service = deps.build_service();

    let result = service
        .get_calendar(default_mechanic_id(), None, ().auth(), None)
        .await;
    test_forbidden(&result);
}

#[tokio::test]
async fn test_calendar_unknown_mechanic() {
    let mut deps = build_dependencies(true, false);
    deps.mechanic_service.checkpoint();
    deps.mechanic_service
        .expect_verify_user_is_mechanic()
        .returning(|_, _, _| Err(ServiceError::Forbidden));
    deps.mechanic_service
        .expect_exists()
        .returning(|_, _, _| Ok(false));
    let service = deps.build_service();

    let result = service
        .get_calendar(default_mechanic_id(), None, ().auth(), None)
        .await;
    test_not_found(&result, &default_mechanic_id());
}

#[tokio::test]
async fn test_calendar_sorted_for_admin() {
    let mut deps = build_dependencies(true, false);
    deps.booking_dao
        .expect_find_active_by_mechanic()
        .with(eq(default_mechanic_id()), always())
        .returning(|_, _| {
            Ok(Arc::new([
                BookingEntity {
                    booking_date: date!(2025 - 03 - 11),
                    booking_time: time!(9:00),
                    status: dao::booking::BookingStatus::InProgress,
                    ..default_booking_entity()
                },
                BookingEntity {
                    id: alternate_id(),
                    booking_date: date!(2025 - 03 - 10),
                    booking_time: time!(14:00),
                    status: dao::booking::BookingStatus::Confirmed,
                    ..default_booking_entity()
                },
            ]))
        });
    let service = deps.build_service();

    let result = service
        .get_calendar(default_mechanic_id(), None, ().auth(), None)
        .await;
    assert!(result.is_ok());
    let bookings = result.unwrap();
    assert_eq!(bookings.len(), 2);
    assert_eq!(bookings[0].id, alternate_id());
    assert_eq!(bookings[1].id, default_id());
}

#[tokio::test]
async fn test_calendar_for_assigned_mechanic() {
    let mut deps = build_dependencies(false, true);
    deps.booking_dao
        .expect_find_active_by_mechanic()
        .returning(|_, _| Ok(Arc::new([conflicting_booking_entity()])));
    let service = deps.build_service();

    let result = service
        .get_calendar(default_mechanic_id(), None, ().auth(), None)
        .await;
    assert!(result.is_ok());
    assert_eq!(result.unwrap().len(), 1);
}

#[tokio::test]
async fn test_calendar_month_filter() {
    let mut deps = build_dependencies(true, false);
    deps.booking_dao
        .expect_find_active_by_mechanic()
        .returning(|_, _| {
            Ok(Arc::new([
                BookingEntity {
                    status: dao::booking::BookingStatus::Confirmed,
                    ..default_booking_entity()
                },
                BookingEntity {
                    id: alternate_id(),
                    booking_date: date!(2025 - 04 - 02),
                    status: dao::booking::BookingStatus::Confirmed,
                    ..default_booking_entity()
                },
            ]))
        });
    let service = deps.build_service();

    let result = service
        .get_calendar(
            default_mechanic_id(),
            Some(CalendarMonth {
                year: 2025,
                month: 3,
            }),
            ().auth(),
            None,
        )
        .await;
    assert!(result.is_ok());
    let bookings = result.unwrap();
    assert_eq!(bookings.len(), 1);
    assert_eq!(bookings[0].id, default_id());
}

#[tokio::test]
async fn test_calendar_invalid_month() {
    let mut deps = build_dependencies(true, false);
    deps.booking_dao
        .expect_find_active_by_mechanic()
        .returning(|_, _| Ok(Arc::new([])));
    let service = deps.build_service();

    let result = service
        .get_calendar(
            default_mechanic_id(),
            Some(CalendarMonth {
                year: 2025,
                month: 0,
            }),
            ().auth(),
            None,
        )
        .await;
    test_validation_error(
        &result,
        &service::ValidationFailureItem::InvalidValue("month".into()),
        1,
    );
}


use std::sync::Arc;

use dao_impl_sqlite::{
    booking::BookingDaoImpl, mechanic::MechanicDaoImpl,
    notification_outbox::NotificationOutboxDaoImpl, service_offering::ServiceOfferingDaoImpl,
    vehicle::VehicleDaoImpl, PermissionDaoImpl, TransactionDaoImpl, TransactionImpl,
};
use rest::RestStateDef;
use service::config::ConfigService;
use service_impl::UserServiceDev;
use sqlx::SqlitePool;
#[cfg(feature = "json_logging")]
use tracing_subscriber::fmt::format::FmtSpan;

type Context = rest::Context;
type Transaction = TransactionImpl;
type TransactionDao = TransactionDaoImpl;
type PermissionDao = PermissionDaoImpl;
type BookingDao = BookingDaoImpl;
type MechanicDao = MechanicDaoImpl;
type VehicleDao = VehicleDaoImpl;
type ServiceOfferingDao = ServiceOfferingDaoImpl;
type NotificationOutboxDao = NotificationOutboxDaoImpl;

type UserService = UserServiceDev;
type PermissionService = service_impl::PermissionServiceImpl<PermissionDao, UserService>;
type ClockService = service_impl::clock::ClockServiceImpl;
type UuidService = service_impl::uuid_service::UuidServiceImpl;

pub struct MechanicServiceDependencies;
impl service_impl::mechanic::MechanicServiceDeps for MechanicServiceDependencies {
    type Context = Context;
    type Transaction = Transaction;
    type MechanicDao = MechanicDao;
    type PermissionService = PermissionService;
    type TransactionDao = TransactionDao;
}
type MechanicService = service_impl::mechanic::MechanicServiceImpl<MechanicServiceDependencies>;

pub struct VehicleServiceDependencies;
impl service_impl::vehicle::VehicleServiceDeps for VehicleServiceDependencies {
    type Context = Context;
    type Transaction = Transaction;
    type VehicleDao = VehicleDao;
    type PermissionService = PermissionService;
    type TransactionDao = TransactionDao;
}
type VehicleService = service_impl::vehicle::VehicleServiceImpl<VehicleServiceDependencies>;

pub struct ServiceOfferingServiceDependencies;
impl service_impl::service_offering::ServiceOfferingServiceDeps
    for ServiceOfferingServiceDependencies
{
    type Context = Context;
    type Transaction = Transaction;
    type ServiceOfferingDao = ServiceOfferingDao;
    type PermissionService = PermissionService;
    type TransactionDao = TransactionDao;
}
type ServiceOfferingService =
    service_impl::service_offering::ServiceOfferingServiceImpl<ServiceOfferingServiceDependencies>;

pub struct NotificationServiceDependencies;
impl service_impl::notification::NotificationServiceDeps for NotificationServiceDependencies {
    type Context = Context;
    type Transaction = Transaction;
    type NotificationOutboxDao = NotificationOutboxDao;
    type MechanicService = MechanicService;
    type ClockService = ClockService;
    type UuidService = UuidService;
}
type NotificationService =
    service_impl::notification::NotificationServiceImpl<NotificationServiceDependencies>;

pub struct BookingServiceDependencies;
impl service_impl::booking::BookingServiceDeps for BookingServiceDependencies {
    type Context = Context;
    type Transaction = Transaction;
    type BookingDao = BookingDao;
    type PermissionService = PermissionService;
    type ClockService = ClockService;
    type UuidService = UuidService;
    type MechanicService = MechanicService;
    type VehicleService = VehicleService;
    type ServiceOfferingService = ServiceOfferingService;
    type NotificationService = NotificationService;
    type TransactionDao = TransactionDao;
}
type BookingService = service_impl::booking::BookingServiceImpl<BookingServiceDependencies>;

pub struct MechanicCalendarServiceDependencies;
impl service_impl::calendar::MechanicCalendarServiceDeps for MechanicCalendarServiceDependencies {
    type Context = Context;
    type Transaction = Transaction;
    type BookingDao = BookingDao;
    type MechanicService = MechanicService;
    type PermissionService = PermissionService;
    type TransactionDao = TransactionDao;
}
type MechanicCalendarService =
    service_impl::calendar::MechanicCalendarServiceImpl<MechanicCalendarServiceDependencies>;

#[derive(Clone)]
pub struct RestStateImpl {
    booking_service: Arc<BookingService>,
    mechanic_calendar_service: Arc<MechanicCalendarService>,
    mechanic_service: Arc<MechanicService>,
    vehicle_service: Arc<VehicleService>,
    service_offering_service: Arc<ServiceOfferingService>,
    permission_service: Arc<PermissionService>,
}
impl RestStateDef for RestStateImpl {
    type Transaction = Transaction;
    type BookingService = BookingService;
    type MechanicCalendarService = MechanicCalendarService;
    type MechanicService = MechanicService;
    type VehicleService = VehicleService;
    type ServiceOfferingService = ServiceOfferingService;
    type PermissionService = PermissionService;

    fn booking_service(&self) -> Arc<Self::BookingService> {
        self.booking_service.clone()
    }
    fn mechanic_calendar_service(&self) -> Arc<Self::MechanicCalendarService> {
        self.mechanic_calendar_service.clone()
    }
    fn mechanic_service(&self) -> Arc<Self::MechanicService> {
        self.mechanic_service.clone()
    }
    fn vehicle_service(&self) -> Arc<Self::VehicleService> {
        self.vehicle_service.clone()
    }
    fn service_offering_service(&self) -> Arc<Self::ServiceOfferingService> {
        self.service_offering_service.clone()
    }
    fn permission_service(&self) -> Arc<Self::PermissionService> {
        self.permission_service.clone()
    }
}
impl RestStateImpl {
    pub fn new(pool: Arc<sqlx::Pool<sqlx::Sqlite>>) -> Self {
        let transaction_dao = Arc::new(TransactionDaoImpl::new(pool.clone()));
        let permission_dao = Arc::new(PermissionDaoImpl::new(pool.clone()));
        let booking_dao = Arc::new(BookingDaoImpl::new(pool.clone()));
        let mechanic_dao = Arc::new(MechanicDaoImpl::new(pool.clone()));
        let vehicle_dao = Arc::new(VehicleDaoImpl::new(pool.clone()));
        let service_offering_dao = Arc::new(ServiceOfferingDaoImpl::new(pool.clone()));
        let notification_outbox_dao = Arc::new(NotificationOutboxDaoImpl::new(pool.clone()));

        let user_service = Arc::new(UserServiceDev);
        let permission_service = Arc::new(service_impl::PermissionServiceImpl {
            permission_dao,
            user_service,
        });
        let clock_service = Arc::new(service_impl::clock::ClockServiceImpl);
        let uuid_service = Arc::new(service_impl::uuid_service::UuidServiceImpl);

        let mechanic_service = Arc::new(service_impl::mechanic::MechanicServiceImpl {
            mechanic_dao,
            permission_service: permission_service.clone(),
            transaction_dao: transaction_dao.clone(),
        });
        let vehicle_service = Arc::new(service_impl::vehicle::VehicleServiceImpl {
            vehicle_dao,
            permission_service: permission_service.clone(),
            transaction_dao: transaction_dao.clone(),
        });
        let service_offering_service =
            Arc::new(service_impl::service_offering::ServiceOfferingServiceImpl {
                service_offering_dao,
                permission_service: permission_service.clone(),
                transaction_dao: transaction_dao.clone(),
            });
        let notification_service = Arc::new(service_impl::notification::NotificationServiceImpl {
            notification_outbox_dao,
            mechanic_service: mechanic_service.clone(),
            clock_service: clock_service.clone(),
            uuid_service: uuid_service.clone(),
        });
        let booking_service = Arc::new(service_impl::booking::BookingServiceImpl {
            booking_dao: booking_dao.clone(),
            permission_service: permission_service.clone(),
            clock_service: clock_service.clone(),
            uuid_service: uuid_service.clone(),
            mechanic_service: mechanic_service.clone(),
            vehicle_service: vehicle_service.clone(),
            service_offering_service: service_offering_service.clone(),
            notification_service,
            transaction_dao: transaction_dao.clone(),
        });
        let mechanic_calendar_service =
            Arc::new(service_impl::calendar::MechanicCalendarServiceImpl {
                booking_dao,
                mechanic_service: mechanic_service.clone(),
                permission_service: permission_service.clone(),
                transaction_dao,
            });

        Self {
            booking_service,
            mechanic_calendar_service,
            mechanic_service,
            vehicle_service,
            service_offering_service,
            permission_service,
        }
    }
}

async fn create_admin_user(pool: Arc<SqlitePool>, username: &str) {
    use dao::PermissionDao;
    // On development create the given user and make it an admin.
    let permission_dao = PermissionDaoImpl::new(pool.clone());

    let users = permission_dao.all_users().await.expect("Expected users");
    let contains_admin_user = users.iter().any(|user| user.name.as_ref() == username);
    if !contains_admin_user {
        permission_dao
            .create_user(
                &dao::UserEntity {
                    name: username.into(),
                },
                "dev-first-start",
            )
            .await
            .unwrap_or_else(|_| panic!("Expected being able to create the {}", username));
        permission_dao
            .add_user_role(username, "admin", "dev-first-start")
            .await
            .unwrap_or_else(|_| panic!("Expected being able to make {} an admin", username));
    }
}

#[tokio::main]
async fn main() {
    let version = env!("CARGO_PKG_VERSION");

    #[cfg(feature = "local_logging")]
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(tracing::Level::TRACE)
        .pretty()
        .with_file(true)
        .finish();

    #[cfg(feature = "json_logging")]
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(tracing::Level::INFO)
        .json()
        .with_span_events(FmtSpan::CLOSE)
        .with_span_list(true)
        .with_file(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    tracing::info!("Garage booking backend version: {}", version);
    dotenvy::dotenv().ok();
    let config = service_impl::config::ConfigServiceImpl
        .get_config()
        .await
        .expect("Expected a readable configuration");

    let pool = Arc::new(
        SqlitePool::connect(config.database_url.as_ref())
            .await
            .expect("Could not connect to database"),
    );

    sqlx::migrate!("../migrations/sqlite")
        .run(pool.as_ref())
        .await
        .expect("Failed to run migrations");

    let rest_state = RestStateImpl::new(pool.clone());
    create_admin_user(pool.clone(), "DEVUSER").await;
    create_admin_user(pool.clone(), "admin").await;

    rest::start_server(rest_state, config.bind_address.as_ref()).await
}

use std::sync::Arc;

use async_trait::async_trait;
use dao::{booking::BookingDao, TransactionDao};
use garage_utils::time_window::parse_time_of_day;
use service::{
    booking::{
        transition_allowed, ActorRole, Booking, BookingService, BookingStatus,
        CreateBookingRequest, RescheduleEntry,
    },
    clock::ClockService,
    mechanic::MechanicService,
    notification::{BookingEventKind, NotificationService},
    permission::{Authentication, ADMIN_PRIVILEGE},
    service_offering::ServiceOfferingService,
    uuid_service::UuidService,
    vehicle::VehicleService,
    PermissionService, ServiceError, ValidationFailureItem,
};
use time::Date;
use tokio::join;
use uuid::Uuid;

use crate::conflict::{find_conflict, CandidateSlot};
use crate::gen_service_impl;

gen_service_impl! {
    struct BookingServiceImpl: BookingService = BookingServiceDeps {
        BookingDao: BookingDao<Transaction = Self::Transaction> = booking_dao,
        PermissionService: PermissionService<Context = Self::Context> = permission_service,
        ClockService: ClockService = clock_service,
        UuidService: UuidService = uuid_service,
        MechanicService: MechanicService<Context = Self::Context, Transaction = Self::Transaction> = mechanic_service,
        VehicleService: VehicleService<Context = Self::Context, Transaction = Self::Transaction> = vehicle_service,
        ServiceOfferingService: ServiceOfferingService<Context = Self::Context, Transaction = Self::Transaction> = service_offering_service,
        NotificationService: NotificationService = notification_service,
        TransactionDao: TransactionDao<Transaction = Self::Transaction> = transaction_dao,
    }
}

const BOOKING_SERVICE_PROCESS: &str = "booking-service";
const MAX_CANCELLATION_REASON_LEN: usize = 200;
const MIN_BOOKING_DURATION_MINUTES: u32 = 15;

/// Mechanic resolution policy for new bookings: an explicit choice wins,
/// then the offering's default mechanic, otherwise the request is rejected.
pub fn resolve_assigned_mechanic(
    requested: Option<Uuid>,
    offering_default: Option<Uuid>,
) -> Result<Uuid, ServiceError> {
    requested.or(offering_default).ok_or_else(|| {
        ServiceError::ValidationError(
            [ValidationFailureItem::MissingField("mechanic_id".into())].into(),
        )
    })
}

fn append_note(existing: Option<&Arc<str>>, note: &str) -> Arc<str> {
    match existing {
        Some(previous) => format!("{previous}\n{note}").into(),
        None => note.into(),
    }
}

impl<Deps: BookingServiceDeps> BookingServiceImpl<Deps> {
    /// Ranks the caller against the booking: admin privilege first, then the
    /// assigned mechanic, then the owning customer.
    async fn determine_actor_role(
        &self,
        customer: &str,
        mechanic_id: Uuid,
        context: Authentication<Deps::Context>,
        tx: Deps::Transaction,
    ) -> Result<ActorRole, ServiceError> {
        if self
            .permission_service
            .check_permission(ADMIN_PRIVILEGE, context.clone())
            .await
            .is_ok()
        {
            return Ok(ActorRole::Admin);
        }
        if self
            .mechanic_service
            .verify_user_is_mechanic(mechanic_id, context.clone(), tx.clone().into())
            .await
            .is_ok()
        {
            return Ok(ActorRole::Mechanic);
        }
        if self
            .permission_service
            .check_user(customer, context)
            .await
            .is_ok()
        {
            return Ok(ActorRole::Customer);
        }
        Err(ServiceError::Forbidden)
    }

    /// The conflict check: loads the mechanic's slot-holding bookings inside
    /// the current transaction and scans them against the candidate window.
    async fn check_slot_free(
        &self,
        mechanic_id: Uuid,
        candidate: &CandidateSlot,
        exclude: Option<Uuid>,
        tx: Deps::Transaction,
    ) -> Result<(), ServiceError> {
        let active: Box<[Booking]> = self
            .booking_dao
            .find_active_by_mechanic(mechanic_id, tx)
            .await?
            .iter()
            .map(Booking::from)
            .collect();
        if find_conflict(candidate, &active, exclude).is_some() {
            return Err(ServiceError::SlotUnavailable(mechanic_id));
        }
        Ok(())
    }

    /// Best-effort event emission, dispatched after the mutation committed.
    /// A failing notification collaborator never fails the lifecycle call.
    async fn notify(&self, kind: BookingEventKind, booking: &Booking) {
        if let Err(err) = self.notification_service.booking_event(kind, booking).await {
            tracing::warn!(
                "Could not emit {} for booking {}: {}",
                kind.as_str(),
                booking.id,
                err
            );
        }
    }
}

#[async_trait]
impl<Deps: BookingServiceDeps> BookingService for BookingServiceImpl<Deps> {
    type Context = Deps::Context;
    type Transaction = Deps::Transaction;

    async fn get_all(
        &self,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Arc<[Booking]>, ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        let entities = if self
            .permission_service
            .check_permission(ADMIN_PRIVILEGE, context.clone())
            .await
            .is_ok()
        {
            self.booking_dao.all(tx.clone()).await?
        } else {
            let Some(current_user) = self
                .permission_service
                .current_user_id(context.clone())
                .await?
            else {
                return Err(ServiceError::Forbidden);
            };
            match self
                .mechanic_service
                .get_mechanic_for_user(
                    current_user.clone(),
                    Authentication::Full,
                    tx.clone().into(),
                )
                .await?
            {
                Some(mechanic) => {
                    self.booking_dao
                        .find_by_mechanic(mechanic.id, tx.clone())
                        .await?
                }
                None => {
                    self.booking_dao
                        .find_by_customer(current_user.as_ref(), tx.clone())
                        .await?
                }
            }
        };

        let mut bookings: Vec<Booking> = entities.iter().map(Booking::from).collect();
        bookings.sort_by_key(|booking| (booking.booking_date, booking.booking_time));
        self.transaction_dao.commit(tx).await?;
        Ok(bookings.into())
    }

    async fn get(
        &self,
        id: Uuid,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Booking, ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        let booking = self
            .booking_dao
            .find_by_id(id, tx.clone())
            .await?
            .as_ref()
            .map(Booking::from)
            .ok_or(ServiceError::EntityNotFound(id))?;
        self.determine_actor_role(
            booking.customer.as_ref(),
            booking.mechanic_id,
            context,
            tx.clone(),
        )
        .await?;
        self.transaction_dao.commit(tx).await?;
        Ok(booking)
    }

    async fn create(
        &self,
        request: &CreateBookingRequest,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Booking, ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        let (admin, owner) = join!(
            self.permission_service
                .check_permission(ADMIN_PRIVILEGE, context.clone()),
            self.permission_service
                .check_user(request.customer.as_ref(), context.clone()),
        );
        admin.or(owner)?;

        let mut validation = Vec::with_capacity(4);
        if request.customer.is_empty() {
            validation.push(ValidationFailureItem::MissingField("customer".into()));
        }
        if request.vehicle_id == Uuid::nil() {
            validation.push(ValidationFailureItem::InvalidValue("vehicle_id".into()));
        }
        if request.service_offering_id == Uuid::nil() {
            validation.push(ValidationFailureItem::InvalidValue(
                "service_offering_id".into(),
            ));
        }
        if request.mechanic_id == Some(Uuid::nil()) {
            validation.push(ValidationFailureItem::InvalidValue("mechanic_id".into()));
        }
        if !validation.is_empty() {
            return Err(ServiceError::ValidationError(validation.into()));
        }

        // Malformed times must fail before any conflict arithmetic happens.
        let booking_time = parse_time_of_day(&request.booking_time)?;

        let vehicle = self
            .vehicle_service
            .get(request.vehicle_id, Authentication::Full, tx.clone().into())
            .await?;
        if vehicle.owner != request.customer {
            return Err(ServiceError::Forbidden);
        }

        let offering = self
            .service_offering_service
            .get(
                request.service_offering_id,
                Authentication::Full,
                tx.clone().into(),
            )
            .await?;
        if !offering.is_available {
            return Err(ServiceError::ServiceOfferingUnavailable(offering.id));
        }
        if offering.estimated_duration_minutes < MIN_BOOKING_DURATION_MINUTES {
            return Err(ServiceError::ValidationError(
                [ValidationFailureItem::InvalidValue(
                    "estimated_duration_minutes".into(),
                )]
                .into(),
            ));
        }

        let mechanic_id =
            resolve_assigned_mechanic(request.mechanic_id, offering.default_mechanic_id)?;
        let mechanic = self
            .mechanic_service
            .get(mechanic_id, Authentication::Full, tx.clone().into())
            .await?;
        if !mechanic.is_bookable() {
            return Err(ServiceError::MechanicUnavailable(mechanic.id));
        }

        let candidate = CandidateSlot {
            booking_date: request.booking_date,
            booking_time,
            duration_minutes: offering.estimated_duration_minutes,
        };
        let (start, _) = candidate.window();
        if start < self.clock_service.date_time_now() {
            return Err(ServiceError::PastDateTime(start));
        }
        self.check_slot_free(mechanic.id, &candidate, None, tx.clone())
            .await?;

        let created_by = self
            .permission_service
            .current_user_id(context.clone())
            .await?;
        let booking = Booking {
            id: self.uuid_service.new_uuid("booking-id"),
            customer: request.customer.clone(),
            mechanic_id: mechanic.id,
            vehicle_id: vehicle.id,
            service_offering_id: offering.id,
            booking_date: request.booking_date,
            booking_time,
            estimated_duration_minutes: offering.estimated_duration_minutes,
            status: BookingStatus::Pending,
            service_location: request.service_location,
            estimated_cost: offering.base_cost,
            actual_cost: None,
            customer_notes: request.customer_notes.clone(),
            mechanic_notes: None,
            admin_notes: None,
            cancellation_reason: None,
            cancelled_by: None,
            reschedule_history: Arc::new([]),
            created: Some(self.clock_service.date_time_now()),
            created_by,
            version: self.uuid_service.new_uuid("booking-version"),
        };

        self.booking_dao
            .create(&(&booking).try_into()?, BOOKING_SERVICE_PROCESS, tx.clone())
            .await?;
        self.service_offering_service
            .record_booking(offering.id, Authentication::Full, tx.clone().into())
            .await?;
        self.transaction_dao.commit(tx).await?;

        tracing::info!("Booking {} requested for mechanic {}", booking.id, mechanic.id);
        self.notify(BookingEventKind::Created, &booking).await;
        Ok(booking)
    }

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
    ) -> Result<Booking, ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        let mut entity = self
            .booking_dao
            .find_by_id(id, tx.clone())
            .await?
            .ok_or(ServiceError::EntityNotFound(id))?;
        let from: BookingStatus = entity.status.into();

        let role = self
            .determine_actor_role(
                entity.customer.as_ref(),
                entity.mechanic_id,
                context,
                tx.clone(),
            )
            .await?;

        if !transition_allowed(from, role, target) {
            // A transition some other role could still perform is an
            // authorization problem; one nobody may perform is illegal.
            if ActorRole::ALL
                .iter()
                .any(|actor| transition_allowed(from, *actor, target))
            {
                return Err(ServiceError::Forbidden);
            }
            return Err(ServiceError::InvalidTransition(from, target));
        }

        let mut validation = Vec::with_capacity(2);
        if target == BookingStatus::Cancelled {
            match &cancellation_reason {
                None => {
                    validation.push(ValidationFailureItem::MissingField(
                        "cancellation_reason".into(),
                    ));
                }
                Some(reason) if reason.chars().count() > MAX_CANCELLATION_REASON_LEN => {
                    validation.push(ValidationFailureItem::TooLong(
                        "cancellation_reason".into(),
                        MAX_CANCELLATION_REASON_LEN,
                    ));
                }
                Some(_) => {}
            }
        } else if cancellation_reason.is_some() {
            validation.push(ValidationFailureItem::ModificationNotAllowed(
                "cancellation_reason".into(),
            ));
        }
        if actual_cost.is_some() && target != BookingStatus::Completed {
            validation.push(ValidationFailureItem::ModificationNotAllowed(
                "actual_cost".into(),
            ));
        }
        if actual_cost.is_some_and(|cost| cost < 0.0) {
            validation.push(ValidationFailureItem::InvalidValue("actual_cost".into()));
        }
        if !validation.is_empty() {
            return Err(ServiceError::ValidationError(validation.into()));
        }

        // Pending bookings never reserved the slot, so entering `confirmed`
        // is the moment the slot is claimed and must be re-checked.
        if target == BookingStatus::Confirmed {
            let candidate = CandidateSlot {
                booking_date: entity.booking_date,
                booking_time: entity.booking_time,
                duration_minutes: entity.estimated_duration_minutes,
            };
            self.check_slot_free(entity.mechanic_id, &candidate, Some(entity.id), tx.clone())
                .await?;
        }

        entity.status = target.into();
        if target == BookingStatus::Cancelled {
            entity.cancellation_reason = cancellation_reason;
            entity.cancelled_by = Some(role.into());
        }
        if let Some(cost) = actual_cost {
            // Validation above only lets this through on completion.
            entity.actual_cost = Some(cost);
        }
        if let Some(note) = &note {
            match role {
                ActorRole::Admin => {
                    entity.admin_notes = Some(append_note(entity.admin_notes.as_ref(), note));
                }
                ActorRole::Mechanic => {
                    entity.mechanic_notes =
                        Some(append_note(entity.mechanic_notes.as_ref(), note));
                }
                ActorRole::Customer => {
                    entity.customer_notes =
                        Some(append_note(entity.customer_notes.as_ref(), note));
                }
            }
        }
        entity.version = self.uuid_service.new_uuid("booking-version");

        self.booking_dao
            .update(&entity, BOOKING_SERVICE_PROCESS, tx.clone())
            .await?;
        self.transaction_dao.commit(tx).await?;

        let booking = Booking::from(&entity);
        tracing::info!(
            "Booking {} moved from {} to {} by {}",
            booking.id,
            from,
            target,
            role
        );
        let event = match target {
            BookingStatus::Confirmed => Some(BookingEventKind::Confirmed),
            BookingStatus::Cancelled => Some(BookingEventKind::Cancelled { cancelled_by: role }),
            BookingStatus::Completed => Some(BookingEventKind::Completed),
            BookingStatus::NoShow => Some(BookingEventKind::MarkedNoShow),
            _ => None,
        };
        if let Some(kind) = event {
            self.notify(kind, &booking).await;
        }
        Ok(booking)
    }

    async fn reschedule(
        &self,
        id: Uuid,
        new_date: Date,
        new_time: Arc<str>,
        reason: Option<Arc<str>>,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Booking, ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        let mut entity = self
            .booking_dao
            .find_by_id(id, tx.clone())
            .await?
            .ok_or(ServiceError::EntityNotFound(id))?;
        let from: BookingStatus = entity.status.into();

        self.determine_actor_role(
            entity.customer.as_ref(),
            entity.mechanic_id,
            context.clone(),
            tx.clone(),
        )
        .await?;

        if !matches!(
            from,
            BookingStatus::Pending | BookingStatus::Confirmed | BookingStatus::Rescheduled
        ) {
            return Err(ServiceError::InvalidTransition(
                from,
                BookingStatus::Rescheduled,
            ));
        }

        let new_time_of_day = parse_time_of_day(&new_time)?;
        let candidate = CandidateSlot {
            booking_date: new_date,
            booking_time: new_time_of_day,
            duration_minutes: entity.estimated_duration_minutes,
        };
        let (start, _) = candidate.window();
        let now = self.clock_service.date_time_now();
        if start < now {
            return Err(ServiceError::PastDateTime(start));
        }
        self.check_slot_free(entity.mechanic_id, &candidate, Some(entity.id), tx.clone())
            .await?;

        let changed_by = self
            .permission_service
            .current_user_id(context)
            .await?
            .unwrap_or_else(|| "system".into());
        let entry = RescheduleEntry {
            original_date: entity.booking_date,
            original_time: entity.booking_time,
            new_date,
            new_time: new_time_of_day,
            reason,
            changed_by,
            changed_at: now,
        };
        let mut history: Vec<dao::booking::RescheduleEntryEntity> =
            entity.reschedule_history.iter().cloned().collect();
        history.push((&entry).into());
        entity.reschedule_history = history.into();

        entity.booking_date = new_date;
        entity.booking_time = new_time_of_day;
        entity.status = BookingStatus::Rescheduled.into();
        entity.version = self.uuid_service.new_uuid("booking-version");

        self.booking_dao
            .update(&entity, BOOKING_SERVICE_PROCESS, tx.clone())
            .await?;
        self.transaction_dao.commit(tx).await?;

        let booking = Booking::from(&entity);
        tracing::info!(
            "Booking {} rescheduled to {} {}",
            booking.id,
            booking.booking_date,
            booking.booking_time
        );
        self.notify(BookingEventKind::Rescheduled, &booking).await;
        Ok(booking)
    }
}

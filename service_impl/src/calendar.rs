use std::sync::Arc;

use async_trait::async_trait;
use dao::{booking::BookingDao, TransactionDao};
use service::{
    booking::Booking,
    calendar::{CalendarMonth, MechanicCalendarService},
    mechanic::MechanicService,
    permission::{Authentication, ADMIN_PRIVILEGE},
    PermissionService, ServiceError, ValidationFailureItem,
};
use time::Date;
use tokio::join;
use uuid::Uuid;

use crate::gen_service_impl;

gen_service_impl! {
    struct MechanicCalendarServiceImpl: MechanicCalendarService = MechanicCalendarServiceDeps {
        BookingDao: BookingDao<Transaction = Self::Transaction> = booking_dao,
        MechanicService: MechanicService<Context = Self::Context, Transaction = Self::Transaction> = mechanic_service,
        PermissionService: PermissionService<Context = Self::Context> = permission_service,
        TransactionDao: TransactionDao<Transaction = Self::Transaction> = transaction_dao,
    }
}

/// `[first-of-month, first-of-next-month)` in calendar dates.
fn month_window(month: CalendarMonth) -> Result<(Date, Date), ServiceError> {
    let invalid = || {
        ServiceError::ValidationError(
            [ValidationFailureItem::InvalidValue("month".into())].into(),
        )
    };
    let month_of_year = time::Month::try_from(month.month).map_err(|_| invalid())?;
    let first = Date::from_calendar_date(month.year, month_of_year, 1).map_err(|_| invalid())?;
    let next_year = if month_of_year == time::Month::December {
        month.year + 1
    } else {
        month.year
    };
    let next =
        Date::from_calendar_date(next_year, month_of_year.next(), 1).map_err(|_| invalid())?;
    Ok((first, next))
}

#[async_trait]
impl<Deps: MechanicCalendarServiceDeps> MechanicCalendarService
    for MechanicCalendarServiceImpl<Deps>
{
    type Context = Deps::Context;
    type Transaction = Deps::Transaction;

    async fn get_calendar(
        &self,
        mechanic_id: Uuid,
        month: Option<CalendarMonth>,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Arc<[Booking]>, ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        let (admin, is_mechanic) = join!(
            self.permission_service
                .check_permission(ADMIN_PRIVILEGE, context.clone()),
            self.mechanic_service
                .verify_user_is_mechanic(mechanic_id, context, tx.clone().into()),
        );
        admin.or(is_mechanic)?;

        if !self
            .mechanic_service
            .exists(mechanic_id, Authentication::Full, tx.clone().into())
            .await?
        {
            return Err(ServiceError::EntityNotFound(mechanic_id));
        }

        let window = month.map(month_window).transpose()?;
        let mut bookings: Vec<Booking> = self
            .booking_dao
            .find_active_by_mechanic(mechanic_id, tx.clone())
            .await?
            .iter()
            .map(Booking::from)
            .filter(|booking| match window {
                Some((first, next)) => {
                    first <= booking.booking_date && booking.booking_date < next
                }
                None => true,
            })
            .collect();
        bookings.sort_by_key(|booking| (booking.booking_date, booking.booking_time));

        self.transaction_dao.commit(tx).await?;
        Ok(bookings.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn test_month_window() {
        let (first, next) = month_window(CalendarMonth {
            year: 2025,
            month: 3,
        })
        .unwrap();
        assert_eq!(first, date!(2025 - 03 - 01));
        assert_eq!(next, date!(2025 - 04 - 01));
    }

    #[test]
    fn test_month_window_december_rolls_into_next_year() {
        let (first, next) = month_window(CalendarMonth {
            year: 2025,
            month: 12,
        })
        .unwrap();
        assert_eq!(first, date!(2025 - 12 - 01));
        assert_eq!(next, date!(2026 - 01 - 01));
    }

    #[test]
    fn test_month_window_rejects_bad_month() {
        assert!(month_window(CalendarMonth {
            year: 2025,
            month: 13,
        })
        .is_err());
    }
}

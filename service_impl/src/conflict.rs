use garage_utils::time_window::{window_from_parts, windows_overlap};
use service::booking::Booking;
use time::{Date, PrimitiveDateTime, Time};
use uuid::Uuid;

/// The slot a create or reschedule request asks for, before any booking
/// record exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CandidateSlot {
    pub booking_date: Date,
    pub booking_time: Time,
    pub duration_minutes: u32,
}
impl CandidateSlot {
    pub fn window(&self) -> (PrimitiveDateTime, PrimitiveDateTime) {
        window_from_parts(self.booking_date, self.booking_time, self.duration_minutes)
    }
}

/// A candidate collides with an existing booking when that booking occupies
/// a slot and either sits on the identical `(date, time)` pair or its
/// `[start, end)` window overlaps the candidate's.
pub fn conflicts_with(candidate: &CandidateSlot, existing: &Booking) -> bool {
    if !existing.status.occupies_slot() {
        return false;
    }
    if existing.booking_date == candidate.booking_date
        && existing.booking_time == candidate.booking_time
    {
        return true;
    }
    let existing_window = window_from_parts(
        existing.booking_date,
        existing.booking_time,
        existing.estimated_duration_minutes,
    );
    windows_overlap(candidate.window(), existing_window)
}

/// Scan a mechanic's bookings for a collision with the candidate slot.
/// `exclude` lets a reschedule ignore the booking being moved.
pub fn find_conflict(
    candidate: &CandidateSlot,
    existing: &[Booking],
    exclude: Option<Uuid>,
) -> Option<Uuid> {
    existing
        .iter()
        .filter(|booking| Some(booking.id) != exclude)
        .find(|booking| conflicts_with(candidate, booking))
        .map(|booking| booking.id)
}

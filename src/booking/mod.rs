pub mod domain;
pub mod repository;

pub use domain::{
    Booking, BookingDraft, BookingError, BookingId, BookingState, BookingStatus, BookingSummary,
    NewBooking, Party, UnknownStatus,
};
pub use repository::{BookingRepository, SqliteBookingRepository};

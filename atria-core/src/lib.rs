pub mod guest;
pub mod payment;
pub mod stay;

pub use guest::GuestDetails;
pub use stay::{StayError, StayRange};

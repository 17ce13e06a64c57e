pub mod events;
pub mod pii;

pub use events::ReservationEvent;
pub use pii::Masked;

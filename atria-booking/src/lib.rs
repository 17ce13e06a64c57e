pub mod error;
pub mod expiry;
pub mod hold;
pub mod models;
pub mod orchestrator;

pub use error::BookingError;
pub use hold::{HoldManager, HoldSummary};
pub use models::{Booking, BookingStatus, Hold, HoldLine, HoldStatus, PaymentState};
pub use orchestrator::{
    BookingDetails, BookingOrchestrator, CancellationPolicy, MockPaymentAdapter, RefundInfo,
};

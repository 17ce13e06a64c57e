pub mod ledger;
pub mod pricing;
pub mod room;

pub use ledger::{DayAvailability, InventoryLedger, LedgerError, LedgerLine};
pub use pricing::{Extra, MealPlan, PriceBreakdown, PricingConfig, PricingEngine};
pub use room::{Hotel, RoomCatalog, RoomDirectory, RoomType, RoomTypeStatus};

use atria_shared::pii::Masked;
use serde::{Deserialize, Serialize};

/// Guest contact details captured when a hold is converted into a booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: Masked<String>,
    pub phone: Option<String>,
}

impl GuestDetails {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

use serde::{Deserialize, Serialize};

use atria_core::stay::StayRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MealPlan {
    RoomOnly,
    Breakfast,
    HalfBoard,
    FullBoard,
}

/// Bookable add-on (airport transfer, crib, parking...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Extra {
    pub name: String,
    pub amount_cents: i32,
    /// Charged once per night instead of once per stay.
    pub per_night: bool,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    pub currency: String,

    /// Applied to the fee-inclusive subtotal.
    pub tax_rate: f64,

    /// Flat fee per booking (in cents).
    pub booking_fee_cents: i32,

    /// Meal-plan surcharges, per person per night (in cents).
    pub breakfast_cents: i32,
    pub half_board_cents: i32,
    pub full_board_cents: i32,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            currency: "USD".to_string(),
            tax_rate: 0.10,
            booking_fee_cents: 500,
            breakfast_cents: 1_500,
            half_board_cents: 2_800,
            full_board_cents: 4_000,
        }
    }
}

impl PricingConfig {
    pub fn meal_plan_surcharge(&self, plan: MealPlan) -> i32 {
        match plan {
            MealPlan::RoomOnly => 0,
            MealPlan::Breakfast => self.breakfast_cents,
            MealPlan::HalfBoard => self.half_board_cents,
            MealPlan::FullBoard => self.full_board_cents,
        }
    }
}

/// Pricing input for one room line.
#[derive(Debug, Clone)]
pub struct QuoteLine {
    pub nightly_rate_cents: i32,
    pub stay: StayRange,
    pub quantity: i32,
    /// Guests per room.
    pub adults: i32,
    pub meal_plan: MealPlan,
    pub extras: Vec<Extra>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LineBreakdown {
    pub nights: i32,
    pub nightly_rate_cents: i32,
    pub room_subtotal_cents: i32,
    pub meal_plan_cents: i32,
    pub extras_cents: i32,
    pub line_total_cents: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PriceBreakdown {
    pub currency: String,
    pub lines: Vec<LineBreakdown>,
    pub room_subtotal_cents: i32,
    pub meal_plan_cents: i32,
    pub extras_cents: i32,
    pub booking_fee_cents: i32,
    pub tax_cents: i32,
    pub total_cents: i32,
}

/// Deterministic price computation. No clock, no I/O: the same inputs always
/// produce the same breakdown, which is what lets the orchestrator re-derive
/// a quote at confirmation time and compare it against the held one.
pub struct PricingEngine {
    config: PricingConfig,
}

impl PricingEngine {
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    pub fn line(&self, line: &QuoteLine) -> LineBreakdown {
        let nights = line.stay.nights() as i32;
        let room_subtotal_cents = line.nightly_rate_cents * nights * line.quantity;
        let meal_plan_cents =
            self.config.meal_plan_surcharge(line.meal_plan) * line.adults * nights * line.quantity;
        let extras_cents: i32 = line
            .extras
            .iter()
            .map(|e| {
                let per_unit = if e.per_night {
                    e.amount_cents * nights
                } else {
                    e.amount_cents
                };
                per_unit * e.quantity
            })
            .sum();

        LineBreakdown {
            nights,
            nightly_rate_cents: line.nightly_rate_cents,
            room_subtotal_cents,
            meal_plan_cents,
            extras_cents,
            line_total_cents: room_subtotal_cents + meal_plan_cents + extras_cents,
        }
    }

    pub fn quote(&self, lines: &[QuoteLine]) -> PriceBreakdown {
        let line_breakdowns: Vec<LineBreakdown> = lines.iter().map(|l| self.line(l)).collect();

        let room_subtotal_cents = line_breakdowns.iter().map(|l| l.room_subtotal_cents).sum();
        let meal_plan_cents = line_breakdowns.iter().map(|l| l.meal_plan_cents).sum();
        let extras_cents = line_breakdowns.iter().map(|l| l.extras_cents).sum();
        let booking_fee_cents = self.config.booking_fee_cents;

        let taxable: i32 =
            room_subtotal_cents + meal_plan_cents + extras_cents + booking_fee_cents;
        let tax_cents = (taxable as f64 * self.config.tax_rate).round() as i32;

        PriceBreakdown {
            currency: self.config.currency.clone(),
            lines: line_breakdowns,
            room_subtotal_cents,
            meal_plan_cents,
            extras_cents,
            booking_fee_cents,
            tax_cents,
            total_cents: taxable + tax_cents,
        }
    }
}

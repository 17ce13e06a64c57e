use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use atria_catalog::ledger::DayAvailability;
use atria_catalog::room::{Hotel, RoomDirectory, RoomType};
use atria_core::stay::StayRange;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HotelDetailResponse {
    pub hotel: Hotel,
    pub room_types: Vec<RoomType>,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct RoomAvailabilityResponse {
    pub room_type: RoomType,
    /// Rooms sellable across the whole stay (the minimum free over all dates).
    pub available: i32,
    pub days: Vec<DayAvailability>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/hotels", get(list_hotels))
        .route("/v1/hotels/{slug}", get(get_hotel))
        .route("/v1/hotels/{slug}/rooms", get(room_availability))
}

/// GET /v1/hotels
async fn list_hotels(State(state): State<AppState>) -> Result<Json<Vec<Hotel>>, StatusCode> {
    let hotels = state
        .catalog
        .list_hotels()
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(hotels))
}

/// GET /v1/hotels/{slug}
async fn get_hotel(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<HotelDetailResponse>, StatusCode> {
    let hotel = state
        .catalog
        .get_hotel_by_slug(&slug)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;
    let room_types = state
        .catalog
        .list_room_types(hotel.id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(HotelDetailResponse { hotel, room_types }))
}

/// GET /v1/hotels/{slug}/rooms?check_in=...&check_out=...
/// Per-room-type availability for a stay window
async fn room_availability(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Vec<RoomAvailabilityResponse>>, StatusCode> {
    let stay = StayRange::new(query.check_in, query.check_out)
        .map_err(|_| StatusCode::BAD_REQUEST)?;
    let hotel = state
        .catalog
        .get_hotel_by_slug(&slug)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;
    let room_types = state
        .catalog
        .list_room_types(hotel.id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let mut out = Vec::with_capacity(room_types.len());
    for room_type in room_types {
        let days = state
            .ledger
            .availability(room_type.id, &stay)
            .await
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        let available = days.iter().map(|d| d.free).min().unwrap_or(0);
        out.push(RoomAvailabilityResponse {
            room_type,
            available,
            days,
        });
    }
    Ok(Json(out))
}

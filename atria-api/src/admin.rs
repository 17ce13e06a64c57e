use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{post, put},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use atria_catalog::room::{Hotel, RoomDirectory, RoomType, RoomTypeStatus};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateHotelRequest {
    pub slug: String,
    pub name: String,
    pub city: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRoomTypeRequest {
    pub hotel_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub total_rooms: i32,
    pub base_rate_cents: i32,
    pub max_occupancy: i32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoomTypeRequest {
    pub base_rate_cents: Option<i32>,
    pub description: Option<String>,
    pub status: Option<RoomTypeStatus>,
    pub total_rooms: Option<i32>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/admin/hotels", post(create_hotel))
        .route("/v1/admin/rooms", post(create_room_type))
        .route("/v1/admin/rooms/{id}", put(update_room_type))
}

/// POST /v1/admin/hotels
async fn create_hotel(
    State(state): State<AppState>,
    Json(req): Json<CreateHotelRequest>,
) -> Result<Json<Hotel>, StatusCode> {
    if req.slug.is_empty() || req.name.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let hotel = Hotel {
        id: Uuid::new_v4(),
        slug: req.slug,
        name: req.name,
        city: req.city,
        description: req.description,
    };
    state.catalog.upsert_hotel(hotel.clone());
    tracing::info!(slug = %hotel.slug, "hotel created");
    Ok(Json(hotel))
}

/// POST /v1/admin/rooms
async fn create_room_type(
    State(state): State<AppState>,
    Json(req): Json<CreateRoomTypeRequest>,
) -> Result<Json<RoomType>, StatusCode> {
    if req.total_rooms <= 0 || req.base_rate_cents < 0 || req.max_occupancy <= 0 {
        return Err(StatusCode::BAD_REQUEST);
    }
    let hotel = state
        .catalog
        .get_hotel(req.hotel_id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    if hotel.is_none() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let room = RoomType {
        id: Uuid::new_v4(),
        hotel_id: req.hotel_id,
        name: req.name,
        description: req.description,
        total_rooms: req.total_rooms,
        base_rate_cents: req.base_rate_cents,
        max_occupancy: req.max_occupancy,
        status: RoomTypeStatus::Active,
    };
    state.ledger.register(room.id, room.total_rooms).await;
    state.catalog.upsert_room_type(room.clone());
    tracing::info!(room = %room.name, hotel = %req.hotel_id, "room type created");
    Ok(Json(room))
}

/// PUT /v1/admin/rooms/{id}
/// Rate/description/capacity updates; rate changes feed the price-mismatch
/// check on open holds.
async fn update_room_type(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateRoomTypeRequest>,
) -> Result<Json<RoomType>, StatusCode> {
    if let Some(total) = req.total_rooms {
        if total < 0 {
            return Err(StatusCode::BAD_REQUEST);
        }
    }
    let updated = state
        .catalog
        .update_room_type(
            id,
            req.base_rate_cents,
            req.description,
            req.status,
            req.total_rooms,
        )
        .ok_or(StatusCode::NOT_FOUND)?;
    if let Some(total) = req.total_rooms {
        state.ledger.register(id, total).await;
    }
    Ok(Json(updated))
}

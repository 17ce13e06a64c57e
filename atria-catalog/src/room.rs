use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hotel {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub city: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomTypeStatus {
    Active,
    Inactive,
}

/// A sellable room category of one hotel. Identity is immutable; rate and
/// description change through the admin surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomType {
    pub id: Uuid,
    pub hotel_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Physical room count, i.e. the per-date capacity.
    pub total_rooms: i32,
    pub base_rate_cents: i32,
    pub max_occupancy: i32,
    pub status: RoomTypeStatus,
}

impl RoomType {
    pub fn is_bookable(&self) -> bool {
        self.status == RoomTypeStatus::Active && self.total_rooms > 0
    }
}

/// Lookup seam consumed by the reservation core. The core needs existence,
/// hotel association and the current rate; everything else is display-only.
#[async_trait]
pub trait RoomDirectory: Send + Sync {
    async fn get_room_type(
        &self,
        id: Uuid,
    ) -> Result<Option<RoomType>, Box<dyn std::error::Error + Send + Sync>>;

    async fn get_hotel(
        &self,
        id: Uuid,
    ) -> Result<Option<Hotel>, Box<dyn std::error::Error + Send + Sync>>;

    async fn get_hotel_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<Hotel>, Box<dyn std::error::Error + Send + Sync>>;

    async fn list_hotels(&self) -> Result<Vec<Hotel>, Box<dyn std::error::Error + Send + Sync>>;

    async fn list_room_types(
        &self,
        hotel_id: Uuid,
    ) -> Result<Vec<RoomType>, Box<dyn std::error::Error + Send + Sync>>;
}

/// In-memory catalog registry.
pub struct RoomCatalog {
    hotels: DashMap<Uuid, Hotel>,
    slugs: DashMap<String, Uuid>,
    room_types: DashMap<Uuid, RoomType>,
}

impl RoomCatalog {
    pub fn new() -> Self {
        Self {
            hotels: DashMap::new(),
            slugs: DashMap::new(),
            room_types: DashMap::new(),
        }
    }

    pub fn upsert_hotel(&self, hotel: Hotel) {
        self.slugs.insert(hotel.slug.clone(), hotel.id);
        self.hotels.insert(hotel.id, hotel);
    }

    pub fn upsert_room_type(&self, room_type: RoomType) {
        self.room_types.insert(room_type.id, room_type);
    }

    /// Apply a rate/description/capacity update, keeping identity untouched.
    pub fn update_room_type(
        &self,
        id: Uuid,
        base_rate_cents: Option<i32>,
        description: Option<String>,
        status: Option<RoomTypeStatus>,
        total_rooms: Option<i32>,
    ) -> Option<RoomType> {
        let mut entry = self.room_types.get_mut(&id)?;
        if let Some(rate) = base_rate_cents {
            entry.base_rate_cents = rate;
        }
        if let Some(desc) = description {
            entry.description = Some(desc);
        }
        if let Some(status) = status {
            entry.status = status;
        }
        if let Some(total) = total_rooms {
            entry.total_rooms = total;
        }
        Some(entry.clone())
    }
}

impl Default for RoomCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RoomDirectory for RoomCatalog {
    async fn get_room_type(
        &self,
        id: Uuid,
    ) -> Result<Option<RoomType>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.room_types.get(&id).map(|r| r.value().clone()))
    }

    async fn get_hotel(
        &self,
        id: Uuid,
    ) -> Result<Option<Hotel>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.hotels.get(&id).map(|h| h.value().clone()))
    }

    async fn get_hotel_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<Hotel>, Box<dyn std::error::Error + Send + Sync>> {
        let id = match self.slugs.get(slug) {
            Some(entry) => *entry.value(),
            None => return Ok(None),
        };
        Ok(self.hotels.get(&id).map(|h| h.value().clone()))
    }

    async fn list_hotels(&self) -> Result<Vec<Hotel>, Box<dyn std::error::Error + Send + Sync>> {
        let mut hotels: Vec<Hotel> = self.hotels.iter().map(|e| e.value().clone()).collect();
        hotels.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(hotels)
    }

    async fn list_room_types(
        &self,
        hotel_id: Uuid,
    ) -> Result<Vec<RoomType>, Box<dyn std::error::Error + Send + Sync>> {
        let mut rooms: Vec<RoomType> = self
            .room_types
            .iter()
            .filter(|e| e.value().hotel_id == hotel_id)
            .map(|e| e.value().clone())
            .collect();
        rooms.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rooms)
    }
}

use uuid::Uuid;

use atria_catalog::ledger::InventoryLedger;
use atria_catalog::room::{Hotel, RoomCatalog, RoomType, RoomTypeStatus};

/// Provision a small demo catalog so a fresh instance is browsable without
/// any admin calls. Returns the seeded hotels.
pub async fn seed_demo_catalog(catalog: &RoomCatalog, ledger: &InventoryLedger) -> Vec<Hotel> {
    let mut hotels = Vec::new();

    let harbor = Hotel {
        id: Uuid::new_v4(),
        slug: "harbor-view".to_string(),
        name: "Harbor View".to_string(),
        city: "Lisbon".to_string(),
        description: Some("Waterfront property near Alfama".to_string()),
    };
    let rooms = [
        ("Standard Queen", 10, 9_500, 2),
        ("Deluxe Double", 6, 14_000, 3),
        ("Seafront Suite", 2, 28_000, 4),
    ];
    for (name, total, rate, occupancy) in rooms {
        let room = RoomType {
            id: Uuid::new_v4(),
            hotel_id: harbor.id,
            name: name.to_string(),
            description: None,
            total_rooms: total,
            base_rate_cents: rate,
            max_occupancy: occupancy,
            status: RoomTypeStatus::Active,
        };
        ledger.register(room.id, room.total_rooms).await;
        catalog.upsert_room_type(room);
    }
    catalog.upsert_hotel(harbor.clone());
    hotels.push(harbor);

    let garden = Hotel {
        id: Uuid::new_v4(),
        slug: "garden-court".to_string(),
        name: "Garden Court".to_string(),
        city: "Porto".to_string(),
        description: None,
    };
    for (name, total, rate, occupancy) in [("Classic Twin", 8, 8_000, 2), ("Family Room", 4, 16_500, 5)] {
        let room = RoomType {
            id: Uuid::new_v4(),
            hotel_id: garden.id,
            name: name.to_string(),
            description: None,
            total_rooms: total,
            base_rate_cents: rate,
            max_occupancy: occupancy,
            status: RoomTypeStatus::Active,
        };
        ledger.register(room.id, room.total_rooms).await;
        catalog.upsert_room_type(room);
    }
    catalog.upsert_hotel(garden.clone());
    hotels.push(garden);

    tracing::info!("seeded {} demo hotels", hotels.len());
    hotels
}

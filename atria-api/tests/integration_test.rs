use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use atria_api::middleware::resiliency::CircuitBreaker;
use atria_api::state::Resiliency;
use atria_api::{app, AppState};
use atria_booking::{
    BookingOrchestrator, CancellationPolicy, HoldManager, MockPaymentAdapter,
};
use atria_catalog::ledger::InventoryLedger;
use atria_catalog::pricing::{PricingConfig, PricingEngine};
use atria_catalog::room::{Hotel, RoomCatalog, RoomType, RoomTypeStatus};
use atria_store::BusinessRules;

/// Two-room hotel, deterministic rates, configurable hold TTL.
async fn test_app(ttl_seconds: i64) -> (axum::Router, Uuid) {
    let catalog = Arc::new(RoomCatalog::new());
    let hotel = Hotel {
        id: Uuid::new_v4(),
        slug: "harbor-view".to_string(),
        name: "Harbor View".to_string(),
        city: "Lisbon".to_string(),
        description: None,
    };
    let room = RoomType {
        id: Uuid::new_v4(),
        hotel_id: hotel.id,
        name: "Deluxe Double".to_string(),
        description: None,
        total_rooms: 2,
        base_rate_cents: 10_000,
        max_occupancy: 3,
        status: RoomTypeStatus::Active,
    };
    let room_id = room.id;
    catalog.upsert_hotel(hotel);
    catalog.upsert_room_type(room);

    let ledger = Arc::new(InventoryLedger::new());
    ledger.register(room_id, 2).await;
    let pricing = Arc::new(PricingEngine::new(PricingConfig::default()));
    let (events_tx, _) = tokio::sync::broadcast::channel(64);

    let holds = Arc::new(HoldManager::new(
        ledger.clone(),
        catalog.clone(),
        pricing.clone(),
        chrono::Duration::seconds(ttl_seconds),
        events_tx.clone(),
    ));
    let orchestrator = Arc::new(BookingOrchestrator::new(
        holds.clone(),
        ledger.clone(),
        catalog.clone(),
        pricing.clone(),
        Arc::new(MockPaymentAdapter),
        CancellationPolicy::default(),
        0,
        events_tx.clone(),
    ));

    let rules: BusinessRules = serde_json::from_str("{}").unwrap();
    let state = AppState {
        catalog,
        ledger,
        pricing,
        holds,
        orchestrator,
        events_tx,
        business_rules: rules,
        resiliency: Arc::new(Resiliency {
            payment_cb: CircuitBreaker::new("payment", 5, Duration::from_secs(30)),
        }),
    };
    (app(state), room_id)
}

async fn send(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    let request = match body {
        Some(value) => builder.body(Body::from(value.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

fn stay_request(room_id: Uuid, quantity: i32) -> Value {
    json!({
        "check_in": "2030-06-01",
        "check_out": "2030-06-04",
        "rooms": [{
            "room_type_id": room_id,
            "quantity": quantity,
            "adults": 2,
            "meal_plan": "BREAKFAST",
        }],
    })
}

fn guest_payload(hold_token: &Value) -> Value {
    json!({
        "hold_token": hold_token,
        "guest": {
            "first_name": "Ana",
            "last_name": "Moreira",
            "email": "ana@example.com",
        },
    })
}

#[tokio::test]
async fn quote_is_side_effect_free_and_deterministic() {
    let (app, room_id) = test_app(900).await;

    let (status, first) = send(&app, "POST", "/v1/bookings/calculate", Some(stay_request(room_id, 1))).await;
    assert_eq!(status, StatusCode::OK);
    // 10000 x 3 nights + breakfast 1500 x 2 adults x 3 nights = 39_000, fee 500, 10% tax
    assert_eq!(first["room_subtotal_cents"], 30_000);
    assert_eq!(first["meal_plan_cents"], 9_000);
    assert_eq!(first["total_cents"], 43_450);

    let (_, second) = send(&app, "POST", "/v1/bookings/calculate", Some(stay_request(room_id, 1))).await;
    assert_eq!(first, second);

    // Quoting must not touch inventory: a 2-room hold still fits.
    let (status, _) = send(&app, "POST", "/v1/bookings/init", Some(stay_request(room_id, 2))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn full_booking_flow() {
    let (app, room_id) = test_app(900).await;

    // Hold both rooms.
    let (status, hold) = send(&app, "POST", "/v1/bookings/init", Some(stay_request(room_id, 2))).await;
    assert_eq!(status, StatusCode::OK);
    let token = hold["token"].clone();

    // Overlapping request has nothing left.
    let (status, err) = send(&app, "POST", "/v1/bookings/init", Some(stay_request(room_id, 1))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "INSUFFICIENT_INVENTORY");

    // The hold is queryable and extendable.
    let uri = format!("/v1/bookings/hold/{}", token.as_str().unwrap());
    let (status, _) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "POST", &format!("{uri}/extend"), None).await;
    assert_eq!(status, StatusCode::OK);

    // Convert to a booking.
    let (status, booking) = send(&app, "POST", "/v1/bookings", Some(guest_payload(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(booking["status"], "PENDING_PAYMENT");
    assert_eq!(booking["payment_status"], "PENDING");
    let code = booking["code"].as_str().unwrap().to_string();

    // The consumed hold is gone.
    let (status, _) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Pay.
    let (status, paid) = send(
        &app,
        "POST",
        &format!("/v1/bookings/{code}/pay"),
        Some(json!({"payment_method": "card"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["status"], "CONFIRMED");
    assert_eq!(paid["payment_status"], "PAID");

    // Cancel far before check-in: full refund, inventory is sellable again.
    let (status, cancelled) = send(
        &app,
        "POST",
        &format!("/v1/bookings/{code}/cancel"),
        Some(json!({"reason": "change of plans"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["booking"]["status"], "CANCELLED");
    assert_eq!(cancelled["refund"]["amount_cents"], booking["quote"]["total_cents"]);

    let (status, _) = send(&app, "POST", "/v1/bookings/init", Some(stay_request(room_id, 2))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn expired_hold_returns_400_on_booking() {
    let (app, room_id) = test_app(-1).await;

    let (status, hold) = send(&app, "POST", "/v1/bookings/init", Some(stay_request(room_id, 1))).await;
    assert_eq!(status, StatusCode::OK);
    let token = hold["token"].clone();

    // Born expired: invisible on read, rejected on booking.
    let uri = format!("/v1/bookings/hold/{}", token.as_str().unwrap());
    let (status, _) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, err) = send(&app, "POST", "/v1/bookings", Some(guest_payload(&token))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "HOLD_EXPIRED");

    let (status, err) = send(&app, "POST", &format!("{uri}/extend"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "HOLD_EXPIRED");
}

#[tokio::test]
async fn hold_release_is_idempotent_over_http() {
    let (app, room_id) = test_app(900).await;

    let (_, hold) = send(&app, "POST", "/v1/bookings/init", Some(stay_request(room_id, 2))).await;
    let uri = format!("/v1/bookings/hold/{}", hold["token"].as_str().unwrap());

    for _ in 0..2 {
        let (status, body) = send(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "RELEASED");
    }
    // Unknown token still releases with 200.
    let (status, _) = send(&app, "DELETE", &format!("/v1/bookings/hold/{}", Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::OK);

    // Everything is free again.
    let (status, _) = send(&app, "POST", "/v1/bookings/init", Some(stay_request(room_id, 2))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn declined_payment_maps_to_402_and_webhook_settles_async_payment() {
    let (app, room_id) = test_app(900).await;

    let (_, hold) = send(&app, "POST", "/v1/bookings/init", Some(stay_request(room_id, 1))).await;
    let (_, booking) = send(&app, "POST", "/v1/bookings", Some(guest_payload(&hold["token"]))).await;
    let code = booking["code"].as_str().unwrap().to_string();

    let (status, err) = send(
        &app,
        "POST",
        &format!("/v1/bookings/{code}/pay"),
        Some(json!({"payment_reference": "declined"})),
    )
    .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(err["code"], "PAYMENT_FAILED");

    // Async attempt stays pending until the gateway webhook lands.
    let (status, pending) = send(
        &app,
        "POST",
        &format!("/v1/bookings/{code}/pay"),
        Some(json!({"payment_reference": "async"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pending["payment_status"], "PENDING");

    let intent_id = format!("mock_pi_{}", booking["id"].as_str().unwrap().replace('-', ""));
    let (status, _) = send(
        &app,
        "POST",
        "/v1/bookings/webhook/stripe",
        Some(json!({
            "id": "evt_1",
            "type": "payment_intent.succeeded",
            "data": {"object": {"id": intent_id}},
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, settled) = send(&app, "GET", &format!("/v1/bookings/{code}"), None).await;
    assert_eq!(settled["status"], "CONFIRMED");
    assert_eq!(settled["payment_status"], "PAID");

    // Webhooks for unknown intents are acknowledged, not retried forever.
    let (status, _) = send(
        &app,
        "POST",
        "/v1/bookings/webhook/stripe",
        Some(json!({
            "id": "evt_2",
            "type": "payment_intent.succeeded",
            "data": {"object": {"id": "pi_unknown"}},
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn browse_and_admin_provisioning() {
    let (app, _) = test_app(900).await;

    let (status, hotels) = send(&app, "GET", "/v1/hotels", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hotels.as_array().unwrap().len(), 1);

    let (status, detail) = send(&app, "GET", "/v1/hotels/harbor-view", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["room_types"].as_array().unwrap().len(), 1);

    let (status, days) = send(
        &app,
        "GET",
        "/v1/hotels/harbor-view/rooms?check_in=2030-06-01&check_out=2030-06-03",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(days[0]["available"], 2);

    // Provision a new hotel + room through the admin surface, then quote it.
    let (status, hotel) = send(
        &app,
        "POST",
        "/v1/admin/hotels",
        Some(json!({"slug": "city-loft", "name": "City Loft", "city": "Faro"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, room) = send(
        &app,
        "POST",
        "/v1/admin/rooms",
        Some(json!({
            "hotel_id": hotel["id"],
            "name": "Loft King",
            "total_rooms": 3,
            "base_rate_cents": 12_000,
            "max_occupancy": 2,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let room_id: Uuid = serde_json::from_value(room["id"].clone()).unwrap();

    let (status, quote) = send(
        &app,
        "POST",
        "/v1/bookings/calculate",
        Some(json!({
            "check_in": "2030-06-01",
            "check_out": "2030-06-03",
            "rooms": [{"room_type_id": room_id, "quantity": 1}],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quote["room_subtotal_cents"], 24_000);

    // Rate updates flow into fresh quotes.
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/v1/admin/rooms/{room_id}"),
        Some(json!({"base_rate_cents": 15_000})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, requote) = send(
        &app,
        "POST",
        "/v1/bookings/calculate",
        Some(json!({
            "check_in": "2030-06-01",
            "check_out": "2030-06-03",
            "rooms": [{"room_type_id": room_id, "quantity": 1}],
        })),
    )
    .await;
    assert_eq!(requote["room_subtotal_cents"], 30_000);
}

#[tokio::test]
async fn price_drift_between_hold_and_booking_is_a_conflict() {
    let (app, room_id) = test_app(900).await;

    let (_, hold) = send(&app, "POST", "/v1/bookings/init", Some(stay_request(room_id, 1))).await;

    // Admin raises the rate while the guest is checking out.
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/v1/admin/rooms/{room_id}"),
        Some(json!({"base_rate_cents": 11_000})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, err) = send(&app, "POST", "/v1/bookings", Some(guest_payload(&hold["token"]))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["code"], "PRICE_MISMATCH");

    // The hold survives, so the guest can accept the new price via re-quote.
    let uri = format!("/v1/bookings/hold/{}", hold["token"].as_str().unwrap());
    let (status, _) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
}

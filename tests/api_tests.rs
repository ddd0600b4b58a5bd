use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use fleet_billing::config::EnvironmentConfig;
use fleet_billing::repositories::InMemoryFleetStore;
use fleet_billing::services::FixedChance;
use fleet_billing::{create_router, AppState};

/// App de test sobre un almacén en memoria con una tirada de mantenimiento fija
struct TestApp {
    router: Router,
}

impl TestApp {
    fn new(roll: u32) -> Self {
        let state = AppState::new(
            Arc::new(InMemoryFleetStore::new()),
            EnvironmentConfig::default(),
            Arc::new(FixedChance(roll)),
        );
        Self {
            router: create_router(state),
        }
    }

    async fn send(&self, method: Method, uri: &str, body: Option<String>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if body.is_some() {
            builder = builder.header("content-type", "application/json");
        }
        let request = builder
            .body(body.map(Body::from).unwrap_or_else(Body::empty))
            .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body.to_string())).await
    }

    async fn post_raw(&self, uri: &str, body: &str) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body.to_string())).await
    }

    async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, Some(body.to_string())).await
    }

    async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, None).await
    }
}

fn car_sharing_seed() -> String {
    json!({
        "Cars": [
            {"Id": 1, "LicensePlate": "CAR-1", "Driver": "Anna", "Model": "Corsa", "TotalDistance": 1000, "DistanceSinceLastMaintenance": 0}
        ],
        "Customers": [
            {"Id": 1, "Name": "Bob", "Balance": 200},
            {"Id": 2, "Name": "Poor", "Balance": 10}
        ]
    })
    .to_string()
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new(99);
    let (status, body) = app.get("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "fleet_billing");
}

#[tokio::test]
async fn test_vehicle_crud() {
    let app = TestApp::new(99);

    let (status, body) = app
        .post("/api/vehicles", json!({"license_plate": "ABC-123", "driver": "Anna", "model": "Golf"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["license_plate"], "ABC-123");

    let (status, body) = app
        .post("/api/vehicles", json!({"license_plate": "ABC-123", "driver": "Other", "model": "Golf"}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");

    let (status, body) = app.put("/api/vehicles/ABC-123", json!({"driver": "Carl"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["driver"], "Carl");
    assert_eq!(body["data"]["model"], "Golf");

    let (_, body) = app.get("/api/vehicles?driver=carl").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = app.delete("/api/vehicles/ABC-123").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get("/api/vehicles/ABC-123").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_vehicle_validation_error() {
    let app = TestApp::new(99);
    let (status, body) = app
        .post("/api/vehicles", json!({"license_plate": "", "model": "Golf"}))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_finish_trip_scenario_with_events() {
    let app = TestApp::new(99);
    let (status, _) = app.post_raw("/api/import", &car_sharing_seed()).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .post("/api/trips/finish", json!({"license_plate": "CAR-1", "customer_id": 1, "distance": 2000}))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["vehicle"]["total_distance"], 3000.0);
    assert_eq!(body["data"]["vehicle"]["distance_since_maintenance"], 0.0);
    assert_eq!(body["data"]["customer"]["balance"], "-500.5");
    assert_eq!(body["data"]["fare"]["paid_amount"], "700.5");
    assert_eq!(body["data"]["maintenance"], "distance_threshold");

    let (_, events) = app.get("/api/events").await;
    let entries = events["data"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    // del más reciente al más antiguo
    assert_eq!(entries[0]["event"]["kind"], "maintenance_performed");
    assert_eq!(entries[0]["event"]["payload"]["total_distance_at_trigger"], 3000.0);
    assert_eq!(entries[1]["event"]["kind"], "trip_finished");

    let (_, filtered) = app.get("/api/events?kind=trip_finished").await;
    assert_eq!(filtered["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_start_trip_outcomes() {
    let app = TestApp::new(99);
    app.post_raw("/api/import?format=car_sharing", &car_sharing_seed()).await;

    let (status, body) = app
        .post("/api/trips/start", json!({"license_plate": "CAR-1", "customer_id": 1, "distance": 100}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "started");
    assert_eq!(body["data"]["estimated_cost"], "35.5");

    let (status, body) = app
        .post("/api/trips/start", json!({"license_plate": "CAR-1", "customer_id": 2, "distance": 100}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["data"]["status"], "insufficient_funds");
    assert_eq!(body["data"]["minimum_balance"], "40");

    let (_, customer) = app.get("/api/customers/2").await;
    assert_eq!(customer["data"]["balance"], "10");
}

#[tokio::test]
async fn test_missing_entities_return_not_found() {
    let app = TestApp::new(99);
    app.post_raw("/api/import", &car_sharing_seed()).await;

    let (status, _) = app
        .post("/api/trips/finish", json!({"license_plate": "NOPE", "customer_id": 1, "distance": 5}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .post("/api/trips/finish", json!({"license_plate": "CAR-1", "customer_id": 77, "distance": 5}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.post("/api/vehicles/NOPE/maintenance", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_negative_distance_is_rejected() {
    let app = TestApp::new(99);
    app.post_raw("/api/import", &car_sharing_seed()).await;

    let (status, body) = app
        .post("/api/trips/finish", json!({"license_plate": "CAR-1", "customer_id": 1, "distance": -1}))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_huge_distance_is_rejected_and_balance_kept() {
    let app = TestApp::new(99);
    app.post_raw("/api/import", &car_sharing_seed()).await;

    for _ in 0..2 {
        let (status, body) = app
            .post("/api/trips/finish", json!({"license_plate": "CAR-1", "customer_id": 1, "distance": 1e30}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    let (status, customer) = app.get("/api/customers/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(customer["data"]["balance"], "200");
}

#[tokio::test]
async fn test_fleet_import_is_idempotent_over_http() {
    let app = TestApp::new(99);
    let batch = json!([
        {
            "LicensePlate": "TX-1",
            "Driver": "Paul",
            "Fares": [
                {"From": "A", "To": "B", "Distance": 5, "PaidAmount": 12, "FareStartDate": "2024-03-10T08:00:00Z"},
                {"From": "B", "To": "C", "Distance": 7, "PaidAmount": 15, "FareStartDate": "2024-03-10T09:00:00Z"}
            ]
        }
    ])
    .to_string();

    let (status, first) = app.post_raw("/api/import", &batch).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["data"]["vehicles_inserted"], 1);
    assert_eq!(first["data"]["fares_inserted"], 2);

    let (_, second) = app.post_raw("/api/import?format=fleet", &batch).await;
    assert_eq!(second["data"]["fares_inserted"], 0);
    assert_eq!(second["data"]["duplicate_fares_skipped"], 2);

    let (_, vehicle) = app.get("/api/vehicles/TX-1").await;
    assert_eq!(vehicle["data"]["fares"].as_array().unwrap().len(), 2);
    assert_eq!(vehicle["data"]["model"], "Unknown");
}

#[tokio::test]
async fn test_import_rejects_undecodable_bodies() {
    let app = TestApp::new(99);

    let (status, body) = app.post_raw("/api/import", "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INPUT");

    let (status, _) = app.post_raw("/api/import?format=xml", "[]").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, vehicles) = app.get("/api/vehicles").await;
    assert!(vehicles["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_customer_endpoints() {
    let app = TestApp::new(99);

    let (status, created) = app.post("/api/customers", json!({"name": "Maria", "balance": 5})).await;
    assert_eq!(status, StatusCode::OK);
    let id = created["data"]["id"].as_i64().unwrap();

    let (status, _) = app.post("/api/customers", json!({"name": "Neg", "balance": -1})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, topped) = app
        .post(&format!("/api/customers/{}/top-up", id), json!({"amount": "35.25"}))
        .await;
    assert_eq!(topped["data"]["balance"], "40.25");

    let (_, found) = app.get("/api/customers?name=MARIA").await;
    assert_eq!(found["data"][0]["id"].as_i64(), Some(id));

    let (_, renamed) = app.put(&format!("/api/customers/{}", id), json!({"name": "Maria L."})).await;
    assert_eq!(renamed["data"]["name"], "Maria L.");

    let (status, _) = app.delete(&format!("/api/customers/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get(&format!("/api/customers/{}", id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_add_fare_reports_expensive_warning() {
    let app = TestApp::new(99);
    app.post("/api/vehicles", json!({"license_plate": "LUX-1", "driver": "Eve", "model": "S-Class"}))
        .await;

    let (status, body) = app
        .post(
            "/api/vehicles/LUX-1/fares",
            json!({"distance": 30, "paid_amount": 12000, "origin": "Hotel", "destination": "Airport"}),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("LUX-1"));
    assert_eq!(body["data"]["vehicle"]["total_distance"], 30.0);
}

#[tokio::test]
async fn test_statistics_endpoints() {
    let app = TestApp::new(99);
    app.post_raw("/api/import", &car_sharing_seed()).await;
    app.post("/api/vehicles", json!({"license_plate": "NEW-2", "driver": "Kim", "model": "Polo"}))
        .await;
    app.post("/api/trips/finish", json!({"license_plate": "NEW-2", "customer_id": 1, "distance": 5}))
        .await;

    let (_, most_used) = app.get("/api/statistics/most-used-car").await;
    assert_eq!(most_used["data"]["license_plate"], "CAR-1");

    let (_, average) = app.get("/api/statistics/average-distance").await;
    assert_eq!(average["data"]["average_distance"], 502.5);

    let (_, top) = app.get("/api/statistics/top-paying-customers?count=5").await;
    assert_eq!(top["data"][0]["customer"]["name"], "Bob");
    assert_eq!(top["data"][0]["total_spent"], "2.25");

    let (status, report) = app.get("/api/statistics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["data"]["vehicle_summaries"].as_array().unwrap().len(), 2);
    assert_eq!(report["data"]["customers_with_insufficient_funds"][0]["name"], "Poor");
}

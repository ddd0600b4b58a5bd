use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;

use fleet_billing::config::MaintenanceConfig;
use fleet_billing::models::import::{FareRecord, ImportBatch, VehicleRecord};
use fleet_billing::repositories::{FleetStore, InMemoryFleetStore};
use fleet_billing::services::{
    EventJournal, FixedChance, FleetEvent, FleetService, ImportService, MaintenancePolicy, Notifier,
};

struct Fleet {
    service: Arc<FleetService>,
    importer: Arc<ImportService>,
    journal: Arc<EventJournal>,
    store: Arc<InMemoryFleetStore>,
}

fn fleet(roll: u32) -> Fleet {
    let store = Arc::new(InMemoryFleetStore::new());
    let journal = Arc::new(EventJournal::new(1000));
    let notifier = Notifier::new().subscribe(journal.clone());
    let policy = MaintenancePolicy::new(&MaintenanceConfig::default(), Arc::new(FixedChance(roll)));
    let service = FleetService::new(store.clone(), notifier, policy);
    let importer = ImportService::new(store.clone(), service.write_gate());
    Fleet {
        service: Arc::new(service),
        importer: Arc::new(importer),
        journal,
        store,
    }
}

fn fleet_batch(plate: &str, hours: &[u32]) -> ImportBatch {
    ImportBatch {
        vehicles: vec![VehicleRecord {
            license_plate: plate.to_string(),
            driver: "Paul".to_string(),
            fares: hours
                .iter()
                .map(|hour| FareRecord {
                    origin: "Depot".to_string(),
                    destination: format!("Stop {}", hour),
                    distance: 1.0,
                    paid_amount: Decimal::from(3),
                    started_at: Utc.with_ymd_and_hms(2024, 6, 1, *hour, 0, 0).unwrap(),
                })
                .collect(),
            ..Default::default()
        }],
        ..Default::default()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_trips_never_lose_updates() {
    let fleet = fleet(99);
    fleet.service.add_vehicle("CAR-1", "Anna", "Corsa").await.unwrap();
    let customer = fleet
        .service
        .add_customer("Bob", Decimal::from(1000))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..20 {
        let service = fleet.service.clone();
        let customer_id = customer.id;
        handles.push(tokio::spawn(async move {
            service.finish_trip("CAR-1", customer_id, 5.0).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let vehicle = fleet.service.get_vehicle("CAR-1").await.unwrap();
    let customer = fleet.service.get_customer(customer.id).await.unwrap();

    // 20 viajes de 5 km a 2.25 cada uno
    assert_eq!(vehicle.total_distance, 100.0);
    assert_eq!(vehicle.fares.len(), 20);
    assert_eq!(customer.balance, Decimal::from(955));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_imports_and_trips_interleave_safely() {
    let fleet = fleet(99);
    fleet.importer.import(fleet_batch("TX-1", &[8])).await.unwrap();
    let customer = fleet
        .service
        .add_customer("Ivy", Decimal::from(500))
        .await
        .unwrap();

    let importer = fleet.importer.clone();
    let import_task = tokio::spawn(async move {
        for _ in 0..5 {
            importer.import(fleet_batch("TX-1", &[8, 9, 10])).await.unwrap();
        }
    });
    let service = fleet.service.clone();
    let customer_id = customer.id;
    let trip_task = tokio::spawn(async move {
        for _ in 0..5 {
            service.finish_trip("TX-1", customer_id, 2.0).await.unwrap();
        }
    });
    import_task.await.unwrap();
    trip_task.await.unwrap();

    let vehicle = fleet.store.find_vehicle_by_plate("TX-1").await.unwrap().unwrap();
    let fares = fleet.store.fares_for_vehicle(vehicle.id).await.unwrap();

    // 3 importadas sin duplicar + 5 viajes
    assert_eq!(fares.len(), 8);
    assert_eq!(vehicle.total_distance, 10.0);
}

#[tokio::test]
async fn test_event_order_within_one_trip() {
    let fleet = fleet(0);
    fleet.service.add_vehicle("CAR-9", "Anna", "Corsa").await.unwrap();
    let customer = fleet
        .service
        .add_customer("Bob", Decimal::from(100))
        .await
        .unwrap();

    fleet.service.start_trip("CAR-9", customer.id, 3.0).await.unwrap();
    fleet.service.finish_trip("CAR-9", customer.id, 3.0).await.unwrap();

    let kinds: Vec<&str> = fleet.journal.events().iter().map(FleetEvent::kind).collect();
    assert_eq!(kinds, vec!["trip_started", "trip_finished", "maintenance_performed"]);
}

#[tokio::test]
async fn test_reimport_does_not_blank_plate() {
    let fleet = fleet(99);
    let seed = ImportBatch {
        vehicles: vec![VehicleRecord {
            id: Some(4),
            license_plate: "SH-4".to_string(),
            driver: "Ola".to_string(),
            model: Some("Clio".to_string()),
            total_distance: Some(10.0),
            distance_since_maintenance: Some(10.0),
            fares: Vec::new(),
        }],
        ..Default::default()
    };
    fleet.importer.import(seed).await.unwrap();

    let blank = ImportBatch {
        vehicles: vec![VehicleRecord {
            id: Some(4),
            license_plate: String::new(),
            driver: String::new(),
            model: Some("Clio".to_string()),
            total_distance: Some(25.0),
            distance_since_maintenance: Some(25.0),
            fares: Vec::new(),
        }],
        ..Default::default()
    };
    fleet.importer.import(blank).await.unwrap();

    let vehicle = fleet.service.get_vehicle("SH-4").await.unwrap();
    assert_eq!(vehicle.driver, "Ola");
    assert_eq!(vehicle.total_distance, 25.0);
}

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use gigledger::application::engine::MarketplaceEngine;
use gigledger::config::EngineConfig;
use gigledger::domain::events::LedgerEvent;
use gigledger::domain::ids::{OrderId, ServiceId, UserId};
use gigledger::domain::money::Amount;
use gigledger::domain::order::{NewOrder, PackageType};
use gigledger::domain::ports::{EventSink, LedgerStoreBox};
use gigledger::domain::withdrawal::Destination;
use gigledger::infrastructure::clock::ManualClock;
use gigledger::infrastructure::in_memory::InMemoryLedgerStore;
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};

pub const CLIENT: &str = "client-1";
pub const FREELANCER: &str = "freelancer-1";

/// Collects published events for assertions.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<LedgerEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<LedgerEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn publish(&self, event: &LedgerEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

pub struct Harness {
    pub engine: Arc<MarketplaceEngine>,
    pub clock: Arc<ManualClock>,
    pub sink: Arc<RecordingSink>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_store(Box::new(InMemoryLedgerStore::new()), EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self::with_store(Box::new(InMemoryLedgerStore::new()), config)
    }

    pub fn with_store(store: LedgerStoreBox, config: EngineConfig) -> Self {
        let clock = Arc::new(ManualClock::new(start_time()));
        let sink = Arc::new(RecordingSink::default());
        let engine = Arc::new(MarketplaceEngine::new(
            store,
            clock.clone(),
            sink.clone(),
            config,
        ));
        Self {
            engine,
            clock,
            sink,
        }
    }

    pub fn advance(&self, secs: i64) {
        self.clock.advance(Duration::seconds(secs)).unwrap();
    }

    /// Drives a fresh order all the way to `completed`, crediting `price` to
    /// the freelancer.
    pub async fn completed_order(&self, price: i64) -> OrderId {
        let order = self.engine.create_order(new_order(price)).await.unwrap();
        let id = order.order_id;
        let client = UserId::from(CLIENT);
        let freelancer = UserId::from(FREELANCER);

        self.engine.accept_order(&id, &freelancer).await.unwrap();
        self.engine
            .attach_file(&id, &freelancer, "delivery.zip")
            .await
            .unwrap();
        self.engine.submit_work(&id, &freelancer).await.unwrap();
        self.engine.approve_order(&id, &client).await.unwrap();
        id
    }
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
}

pub fn amount(value: i64) -> Amount {
    Amount::new(Decimal::from(value)).unwrap()
}

pub fn new_order(price: i64) -> NewOrder {
    NewOrder {
        client_id: UserId::from(CLIENT),
        freelancer_id: UserId::from(FREELANCER),
        service_id: ServiceId::from("logo-design"),
        package_type: PackageType::Standard,
        price: amount(price),
        revisions_allowed: 2,
        requirements: "A minimalist logo".to_string(),
    }
}

pub fn destination() -> Destination {
    Destination {
        bank_name: "BCA".to_string(),
        account_number: "1234567890".to_string(),
        account_holder: "Freelancer One".to_string(),
    }
}

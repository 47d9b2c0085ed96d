//! Shared test helpers for client tests.

#![allow(dead_code)]

use mobilestack_client::transport::mock::MockTransport;
use mobilestack_client::{MobileService, ServiceConfig};
use mobilestack_model::{Declaration, TableEntity};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

pub const BASE_URL: &str = "https://rentahome.example.net";
pub const APP_KEY: &str = "app-key-123";

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Listing {
    pub id: i32,
    pub title: String,
    pub bedrooms: i32,
    pub footage: i64,
    pub price: f64,
    pub published: bool,
}

impl TableEntity for Listing {
    fn declare() -> Declaration<Self> {
        Declaration::<Self>::new()
            .table("listing")
            .key("id", |l| &l.id, |l| &mut l.id)
            .column("title", |l| &l.title, |l| &mut l.title)
            .column("bedrooms", |l| &l.bedrooms, |l| &mut l.bedrooms)
            .column("footage", |l| &l.footage, |l| &mut l.footage)
            .column("price", |l| &l.price, |l| &mut l.price)
            .column("published", |l| &l.published, |l| &mut l.published)
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Channel {
    pub id: i32,
    pub reg_id: String,
}

impl TableEntity for Channel {
    fn declare() -> Declaration<Self> {
        Declaration::<Self>::new()
            .table("pushChannel")
            .key("id", |c| &c.id, |c| &mut c.id)
            .column("regId", |c| &c.reg_id, |c| &mut c.reg_id)
    }
}

/// A declaration missing its key, for schema-failure paths.
#[derive(Debug, Default)]
pub struct Broken {
    pub name: String,
}

impl TableEntity for Broken {
    fn declare() -> Declaration<Self> {
        Declaration::<Self>::new()
            .table("broken")
            .column("name", |b| &b.name, |b| &mut b.name)
    }
}

pub fn listing(title: &str, bedrooms: i32) -> Listing {
    Listing {
        id: 0,
        title: title.to_string(),
        bedrooms,
        footage: 900,
        price: 1250.0,
        published: true,
    }
}

/// Routes client logs to the test harness; filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A service whose requests all go to a fresh [`MockTransport`].
pub fn mock_service() -> (MobileService, Arc<MockTransport>) {
    init_tracing();
    let transport = Arc::new(MockTransport::new());
    let service =
        MobileService::with_transport(ServiceConfig::new(BASE_URL, APP_KEY), transport.clone())
            .expect("service builds");
    (service, transport)
}

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use order_view_engine::models::{FabricationState, Order, OrderItem, SaleState, ShippingState};
use order_view_engine::storage::{InMemoryViewState, StorageError, ViewStateBackend};
use rust_decimal::Decimal;
use serde_json::Value;
use tokio::sync::Notify;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// Three orders: one with two items in `SIN_HACER` and `HECHO`, one done,
/// one in progress.
pub fn scenario_orders() -> Vec<Order> {
    vec![
        Order::new("Lucía Romero", date(2024, 4, 10))
            .with_phone("+54 11 5555 0101")
            .with_item(OrderItem::new("Sello logo", FabricationState::SinHacer).with_values(
                Decimal::new(12000, 0),
                Decimal::new(6000, 0),
            ))
            .with_item(
                OrderItem::new("Sello firma", FabricationState::Hecho)
                    .with_sale_state(SaleState::Transferido)
                    .with_values(Decimal::new(8000, 0), Decimal::new(8000, 0)),
            )
            .with_totals(Decimal::new(20000, 0), Decimal::new(14000, 0)),
        Order::new("Martín Sosa", date(2024, 4, 12)).with_item(
            OrderItem::new("Monograma", FabricationState::Hecho)
                .with_shipping_state(ShippingState::Despachado),
        ),
        Order::new("Paula Ibáñez", date(2024, 4, 15))
            .with_item(OrderItem::new("Lacre boda", FabricationState::Haciendo).with_priority(true)),
    ]
}

/// Backend whose reads block until released and which counts writes.
#[derive(Clone, Default)]
pub struct GatedBackend {
    inner: InMemoryViewState,
    release: Arc<Notify>,
    writes: Arc<AtomicUsize>,
    reads_resolved: Arc<AtomicUsize>,
    early_writes: Arc<AtomicUsize>,
}

impl GatedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &InMemoryViewState {
        &self.inner
    }

    pub fn release_load(&self) {
        self.release.notify_one();
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn reads_resolved(&self) -> usize {
        self.reads_resolved.load(Ordering::SeqCst)
    }

    /// Writes that reached the backend before any read had resolved.
    pub fn early_writes(&self) -> usize {
        self.early_writes.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ViewStateBackend for GatedBackend {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        self.release.notified().await;
        let value = self.inner.get(key).await;
        self.reads_resolved.fetch_add(1, Ordering::SeqCst);
        value
    }

    async fn set(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        if self.reads_resolved() == 0 {
            self.early_writes.fetch_add(1, Ordering::SeqCst);
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.inner.delete(key).await
    }
}

/// Backend whose first write stalls for `first_write_delay` before landing.
#[derive(Clone)]
pub struct SlowFirstWriteBackend {
    inner: InMemoryViewState,
    first_write_delay: Duration,
    writes_started: Arc<AtomicUsize>,
}

impl SlowFirstWriteBackend {
    pub fn new(first_write_delay: Duration) -> Self {
        Self {
            inner: InMemoryViewState::new(),
            first_write_delay,
            writes_started: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn inner(&self) -> &InMemoryViewState {
        &self.inner
    }

    pub fn writes_started(&self) -> usize {
        self.writes_started.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ViewStateBackend for SlowFirstWriteBackend {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        if self.writes_started.fetch_add(1, Ordering::SeqCst) == 0 {
            tokio::time::sleep(self.first_write_delay).await;
        }
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.inner.delete(key).await
    }
}

/// Backend that fails every call.
pub struct FailingBackend;

#[async_trait::async_trait]
impl ViewStateBackend for FailingBackend {
    async fn get(&self, _key: &str) -> Result<Option<Value>, StorageError> {
        Err(StorageError::OperationFailed("unavailable".into()))
    }

    async fn set(&self, _key: &str, _value: &Value) -> Result<(), StorageError> {
        Err(StorageError::OperationFailed("unavailable".into()))
    }

    async fn delete(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::OperationFailed("unavailable".into()))
    }
}

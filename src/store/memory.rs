use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AccountStore, BookingFilter, BookingStore, DriverUpdate, StatusChange};
use crate::entities::{
    account,
    booking::{self, BookingStatus},
};
use crate::error::{AppError, AppResult};
use crate::utils::geo::GeoPoint;

/// Process-local account store. Used by tests and by local runs without Postgres.
#[derive(Default)]
pub struct MemoryAccountStore {
    accounts: RwLock<HashMap<Uuid, account::Model>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn apply_driver_update(&self, update: DriverUpdate) -> AppResult<()> {
        let mut accounts = self.accounts.write().await;
        match update {
            DriverUpdate::Engaged(id) => {
                let driver = accounts
                    .get_mut(&id)
                    .ok_or_else(|| AppError::NotFound("Account not found".to_string()))?;
                driver.is_available = false;
            }
            DriverUpdate::Released(id) => match accounts.get_mut(&id) {
                Some(driver) => driver.is_available = true,
                None => tracing::warn!(driver_id = %id, "Assigned driver no longer exists"),
            },
            DriverUpdate::RideCompleted(id) => {
                let driver = accounts
                    .get_mut(&id)
                    .ok_or_else(|| AppError::NotFound("Account not found".to_string()))?;
                driver.total_rides += 1;
                driver.is_available = true;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<account::Model>> {
        Ok(self.accounts.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<account::Model>> {
        Ok(self
            .accounts
            .read()
            .await
            .values()
            .find(|a| a.email == email)
            .cloned())
    }

    async fn create(&self, account: account::Model) -> AppResult<account::Model> {
        let mut accounts = self.accounts.write().await;
        if accounts.values().any(|a| a.email == account.email) {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }
        accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn set_availability(&self, id: Uuid, is_available: bool) -> AppResult<()> {
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("Account not found".to_string()))?;
        account.is_available = is_available;
        Ok(())
    }

    async fn set_location(
        &self,
        id: Uuid,
        location: GeoPoint,
        address: Option<String>,
    ) -> AppResult<Option<account::Model>> {
        let mut accounts = self.accounts.write().await;
        Ok(accounts.get_mut(&id).map(|account| {
            account.location_lat = Some(location.lat);
            account.location_lng = Some(location.lng);
            account.location_address = address;
            account.clone()
        }))
    }
}

/// Bookings kept next to the account store they update driver flags in.
pub struct MemoryBookingStore {
    bookings: RwLock<Vec<booking::Model>>,
    accounts: Arc<MemoryAccountStore>,
}

impl MemoryBookingStore {
    pub fn new(accounts: Arc<MemoryAccountStore>) -> Self {
        Self {
            bookings: RwLock::new(Vec::new()),
            accounts,
        }
    }
}

#[async_trait]
impl BookingStore for MemoryBookingStore {
    async fn create(&self, booking: booking::Model) -> AppResult<booking::Model> {
        self.bookings.write().await.push(booking.clone());
        Ok(booking)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<booking::Model>> {
        Ok(self
            .bookings
            .read()
            .await
            .iter()
            .find(|b| b.id == id)
            .cloned())
    }

    async fn list(&self, filter: &BookingFilter) -> AppResult<Vec<booking::Model>> {
        let bookings = self.bookings.read().await;
        // Iterate in reverse so equal timestamps keep newest-inserted first
        let mut matched: Vec<booking::Model> = bookings
            .iter()
            .rev()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matched)
    }

    async fn update_if_status(
        &self,
        id: Uuid,
        expected: BookingStatus,
        change: StatusChange,
    ) -> AppResult<Option<booking::Model>> {
        // Check and write under one write lock; bookings lock before accounts
        let mut bookings = self.bookings.write().await;
        let Some(booking) = bookings.iter_mut().find(|b| b.id == id) else {
            return Ok(None);
        };
        if booking.status != expected {
            return Ok(None);
        }

        if let Some(update) = change.driver_update {
            self.accounts.apply_driver_update(update).await?;
        }
        change.apply(booking);
        Ok(Some(booking.clone()))
    }
}

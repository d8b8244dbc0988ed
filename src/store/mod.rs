//! Persistence boundary for accounts and bookings.
//!
//! Services hold these as trait objects so the relational store can be swapped
//! for the in-memory one in tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::entities::{
    account,
    booking::{self, BookingStatus},
};
use crate::error::AppResult;
use crate::utils::geo::GeoPoint;

pub use memory::{MemoryAccountStore, MemoryBookingStore};
pub use postgres::{PgAccountStore, PgBookingStore};

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<account::Model>>;

    async fn find_by_email(&self, email: &str) -> AppResult<Option<account::Model>>;

    /// Insert a new account. Fails with `Conflict` if the email is taken.
    async fn create(&self, account: account::Model) -> AppResult<account::Model>;

    async fn set_availability(&self, id: Uuid, is_available: bool) -> AppResult<()>;

    async fn set_location(
        &self,
        id: Uuid,
        location: GeoPoint,
        address: Option<String>,
    ) -> AppResult<Option<account::Model>>;
}

/// Conditions for listing bookings. Empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub rider_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
    pub statuses: Vec<BookingStatus>,
}

impl BookingFilter {
    pub fn pending() -> Self {
        Self {
            statuses: vec![BookingStatus::Pending],
            ..Default::default()
        }
    }

    pub fn for_rider(rider_id: Uuid) -> Self {
        Self {
            rider_id: Some(rider_id),
            ..Default::default()
        }
    }

    pub fn active_for_driver(driver_id: Uuid) -> Self {
        Self {
            driver_id: Some(driver_id),
            statuses: BookingStatus::active().to_vec(),
            ..Default::default()
        }
    }

    pub fn matches(&self, booking: &booking::Model) -> bool {
        self.rider_id.is_none_or(|id| booking.rider_id == id)
            && self.driver_id.is_none_or(|id| booking.driver_id == Some(id))
            && (self.statuses.is_empty() || self.statuses.contains(&booking.status))
    }
}

/// Driver bookkeeping committed in the same write as a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverUpdate {
    /// Driver took the booking and stops receiving rides
    Engaged(Uuid),
    /// Booking was cancelled; a driver that no longer exists is skipped
    Released(Uuid),
    /// Ride finished: `total_rides + 1` and available again
    RideCompleted(Uuid),
}

/// Fields written together with a status change. `None` leaves the column as is.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub status: BookingStatus,
    pub driver_id: Option<Uuid>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub driver_update: Option<DriverUpdate>,
}

impl StatusChange {
    pub fn to(status: BookingStatus) -> Self {
        Self {
            status,
            driver_id: None,
            accepted_at: None,
            completed_at: None,
            driver_update: None,
        }
    }

    pub fn apply(&self, booking: &mut booking::Model) {
        booking.status = self.status;
        if let Some(driver_id) = self.driver_id {
            booking.driver_id = Some(driver_id);
        }
        if let Some(at) = self.accepted_at {
            booking.accepted_at = Some(at.into());
        }
        if let Some(at) = self.completed_at {
            booking.completed_at = Some(at.into());
        }
    }
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn create(&self, booking: booking::Model) -> AppResult<booking::Model>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<booking::Model>>;

    /// Bookings matching `filter`, newest first.
    async fn list(&self, filter: &BookingFilter) -> AppResult<Vec<booking::Model>>;

    /// Atomically apply `change` only if the booking is still in `expected`.
    ///
    /// Returns the updated booking, or `None` when the booking is missing or
    /// its status no longer matches. Concurrent callers racing on the same
    /// `expected` status see exactly one `Some`. The change's `driver_update`
    /// is applied in the same write: if it fails, the booking is left as is.
    async fn update_if_status(
        &self,
        id: Uuid,
        expected: BookingStatus,
        change: StatusChange,
    ) -> AppResult<Option<booking::Model>>;
}

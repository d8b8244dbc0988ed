use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{
    account,
    booking::{self, BookingStatus},
    ADDRESS_MAX_LEN, VEHICLE_FIELD_MAX_LEN,
};
use crate::error::{AppError, AppResult};
use crate::services::check_len;
use crate::services::matching::find_nearby;
use crate::store::{AccountStore, BookingFilter, BookingStore, DriverUpdate, StatusChange};
use crate::utils::geo::GeoPoint;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub address: String,
    pub lat: f64,
    pub lng: f64,
}

impl Place {
    fn validate(&self, label: &str) -> AppResult<()> {
        if self.address.trim().is_empty() {
            return Err(AppError::Validation(format!("{} address is required", label)));
        }
        check_len(self.address.trim(), ADDRESS_MAX_LEN, &format!("{} address", label))?;
        if !GeoPoint::new(self.lat, self.lng).is_valid() {
            return Err(AppError::Validation(format!(
                "{} coordinates are out of range",
                label
            )));
        }
        Ok(())
    }
}

/// Booking request as submitted by a rider. Missing parts are reported as
/// validation failures instead of deserialization errors.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    pub pickup: Option<Place>,
    pub destination: Option<Place>,
    pub fare: Option<f64>,
    pub vehicle_type: Option<String>,
}

/// Booking lifecycle: creation, acceptance, status transitions and the
/// driver availability bookkeeping that goes with them.
#[derive(Clone)]
pub struct BookingService {
    accounts: Arc<dyn AccountStore>,
    bookings: Arc<dyn BookingStore>,
    radius_km: f64,
}

impl BookingService {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        bookings: Arc<dyn BookingStore>,
        radius_km: f64,
    ) -> Self {
        Self {
            accounts,
            bookings,
            radius_km,
        }
    }

    async fn caller(&self, account_id: Uuid) -> AppResult<account::Model> {
        self.accounts
            .find_by_id(account_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Account not found".to_string()))
    }

    async fn driver(&self, account_id: Uuid) -> AppResult<account::Model> {
        let account = self.caller(account_id).await?;
        if !account.is_driver() {
            return Err(AppError::Role("Driver access required".to_string()));
        }
        Ok(account)
    }

    pub async fn get(&self, booking_id: Uuid) -> AppResult<booking::Model> {
        self.bookings
            .find_by_id(booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))
    }

    /// Create a pending booking for a rider
    pub async fn create(&self, rider_id: Uuid, request: NewBooking) -> AppResult<booking::Model> {
        let rider = self.caller(rider_id).await?;
        if rider.is_driver() {
            return Err(AppError::Role("Only riders can create bookings".to_string()));
        }

        let pickup = request
            .pickup
            .ok_or_else(|| AppError::Validation("Pickup location is required".to_string()))?;
        let destination = request
            .destination
            .ok_or_else(|| AppError::Validation("Destination is required".to_string()))?;
        let fare = request
            .fare
            .ok_or_else(|| AppError::Validation("Fare is required".to_string()))?;

        pickup.validate("Pickup")?;
        destination.validate("Destination")?;
        if !fare.is_finite() || fare < 0.0 {
            return Err(AppError::Validation(
                "Fare must be a non-negative number".to_string(),
            ));
        }

        let vehicle_type = request
            .vehicle_type
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        if let Some(vehicle_type) = &vehicle_type {
            check_len(vehicle_type, VEHICLE_FIELD_MAX_LEN, "Vehicle type")?;
        }

        let booking = self
            .bookings
            .create(booking::Model {
                id: Uuid::new_v4(),
                rider_id: rider.id,
                driver_id: None,
                pickup_address: pickup.address.trim().to_string(),
                pickup_lat: pickup.lat,
                pickup_lng: pickup.lng,
                destination_address: destination.address.trim().to_string(),
                destination_lat: destination.lat,
                destination_lng: destination.lng,
                fare,
                status: BookingStatus::Pending,
                vehicle_type,
                created_at: Utc::now().into(),
                accepted_at: None,
                completed_at: None,
            })
            .await?;

        tracing::info!(booking_id = %booking.id, rider_id = %rider.id, "Booking created");
        Ok(booking)
    }

    /// Take a pending booking. At most one driver can win a given booking.
    pub async fn accept(&self, booking_id: Uuid, driver_id: Uuid) -> AppResult<booking::Model> {
        let driver = self.driver(driver_id).await?;

        let booking = self
            .bookings
            .find_by_id(booking_id)
            .await?
            .filter(|b| b.status == BookingStatus::Pending)
            .ok_or_else(|| AppError::NotAvailable("Booking not available".to_string()))?;

        let location = driver
            .location()
            .ok_or_else(|| AppError::Configuration("Driver location not set".to_string()))?;
        if location.distance_km(&booking.pickup_point()) > self.radius_km {
            return Err(AppError::NotAvailable(
                "Booking too far from your location".to_string(),
            ));
        }

        let change = StatusChange {
            driver_id: Some(driver.id),
            accepted_at: Some(Utc::now()),
            driver_update: Some(DriverUpdate::Engaged(driver.id)),
            ..StatusChange::to(BookingStatus::Accepted)
        };
        let accepted = self
            .bookings
            .update_if_status(booking_id, BookingStatus::Pending, change)
            .await?
            .ok_or_else(|| {
                tracing::debug!(%booking_id, driver_id = %driver.id, "Lost accept race");
                AppError::NotAvailable("Booking not available".to_string())
            })?;

        tracing::info!(%booking_id, driver_id = %driver.id, "Booking accepted");
        Ok(accepted)
    }

    /// Move a booking along its lifecycle on behalf of the rider or the
    /// assigned driver.
    pub async fn update_status(
        &self,
        booking_id: Uuid,
        caller_id: Uuid,
        new_status: &str,
    ) -> AppResult<booking::Model> {
        let caller = self.caller(caller_id).await?;
        let booking = self.get(booking_id).await?;

        let is_assigned_driver = caller.is_driver() && booking.driver_id == Some(caller.id);
        if caller.is_driver() && !is_assigned_driver {
            return Err(AppError::Role(
                "You are not assigned to this booking".to_string(),
            ));
        }
        if !caller.is_driver() && booking.rider_id != caller.id {
            return Err(AppError::Role(
                "You can only update your own bookings".to_string(),
            ));
        }

        let next: BookingStatus = new_status.parse().map_err(AppError::Validation)?;

        if next == BookingStatus::Accepted {
            return Err(AppError::Validation(
                "Bookings are accepted through the accept endpoint".to_string(),
            ));
        }
        if !booking.status.can_transition_to(next) {
            return Err(AppError::Validation(format!(
                "Cannot move booking from {} to {}",
                booking.status, next
            )));
        }
        if matches!(next, BookingStatus::InProgress | BookingStatus::Completed)
            && !is_assigned_driver
        {
            return Err(AppError::Role(format!(
                "Only the assigned driver can mark a booking {}",
                next
            )));
        }

        let mut change = StatusChange::to(next);
        match next {
            BookingStatus::Completed => {
                change.completed_at = Some(Utc::now());
                change.driver_update = Some(DriverUpdate::RideCompleted(caller.id));
            }
            BookingStatus::Cancelled => {
                change.driver_update = booking.driver_id.map(DriverUpdate::Released);
            }
            _ => {}
        }

        // Compare against the status we validated; a concurrent change loses here
        let updated = self
            .bookings
            .update_if_status(booking_id, booking.status, change)
            .await?
            .ok_or_else(|| {
                AppError::NotAvailable("Booking was updated by someone else".to_string())
            })?;

        tracing::info!(
            %booking_id,
            caller_id = %caller.id,
            from = %booking.status,
            to = %next,
            "Booking status updated"
        );
        Ok(updated)
    }

    /// Pending bookings within the service radius of the driver, newest first
    pub async fn list_available_for(&self, driver_id: Uuid) -> AppResult<Vec<booking::Model>> {
        let driver = self.driver(driver_id).await?;
        // Check before hitting the store so a missing location fails fast
        let location = driver
            .location()
            .ok_or_else(|| AppError::Configuration("Driver location not set".to_string()))?;

        let pending = self.bookings.list(&BookingFilter::pending()).await?;
        find_nearby(Some(location), pending, self.radius_km)
    }

    pub async fn list_for_rider(&self, rider_id: Uuid) -> AppResult<Vec<booking::Model>> {
        self.bookings.list(&BookingFilter::for_rider(rider_id)).await
    }

    /// Accepted and in-progress bookings assigned to the driver
    pub async fn list_for_driver(&self, driver_id: Uuid) -> AppResult<Vec<booking::Model>> {
        let driver = self.driver(driver_id).await?;
        self.bookings
            .list(&BookingFilter::active_for_driver(driver.id))
            .await
    }
}

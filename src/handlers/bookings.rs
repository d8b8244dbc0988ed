use std::collections::HashMap;

use axum::{extract::State, http::StatusCode, Extension};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{
    account,
    booking::{self, BookingStatus},
};
use crate::error::{AppError, AppResult};
use crate::extract::{Json, Path, Query};
use crate::services::booking::{NewBooking, Place};
use crate::utils::jwt::Claims;
use crate::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct PartyInfo {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
}

impl From<&account::Model> for PartyInfo {
    fn from(a: &account::Model) -> Self {
        Self {
            id: a.id,
            name: a.name.clone(),
            phone: a.phone.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub id: Uuid,
    pub rider_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub rider: Option<PartyInfo>,
    pub driver: Option<PartyInfo>,
    pub pickup: Place,
    pub destination: Place,
    pub fare: f64,
    pub status: BookingStatus,
    pub vehicle_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Resolves rider/driver summaries, fetching each account at most once
#[derive(Default)]
struct Parties {
    cache: HashMap<Uuid, Option<PartyInfo>>,
}

impl Parties {
    async fn get(&mut self, state: &AppState, id: Uuid) -> AppResult<Option<PartyInfo>> {
        if let Some(hit) = self.cache.get(&id) {
            return Ok(hit.clone());
        }
        let party = state.accounts.find(id).await?.as_ref().map(PartyInfo::from);
        self.cache.insert(id, party.clone());
        Ok(party)
    }

    async fn respond(&mut self, state: &AppState, b: booking::Model) -> AppResult<BookingResponse> {
        let rider = self.get(state, b.rider_id).await?;
        let driver = match b.driver_id {
            Some(id) => self.get(state, id).await?,
            None => None,
        };

        Ok(BookingResponse {
            id: b.id,
            rider_id: b.rider_id,
            driver_id: b.driver_id,
            rider,
            driver,
            pickup: Place {
                address: b.pickup_address,
                lat: b.pickup_lat,
                lng: b.pickup_lng,
            },
            destination: Place {
                address: b.destination_address,
                lat: b.destination_lat,
                lng: b.destination_lng,
            },
            fare: b.fare,
            status: b.status,
            vehicle_type: b.vehicle_type,
            created_at: b.created_at.with_timezone(&Utc),
            accepted_at: b.accepted_at.map(|t| t.with_timezone(&Utc)),
            completed_at: b.completed_at.map(|t| t.with_timezone(&Utc)),
        })
    }

    async fn respond_all(
        &mut self,
        state: &AppState,
        bookings: Vec<booking::Model>,
    ) -> AppResult<Vec<BookingResponse>> {
        let mut responses = Vec::with_capacity(bookings.len());
        for b in bookings {
            responses.push(self.respond(state, b).await?);
        }
        Ok(responses)
    }
}

/// Create a booking
pub async fn create_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<NewBooking>,
) -> AppResult<(StatusCode, Json<BookingResponse>)> {
    let booking = state.bookings.create(claims.sub, payload).await?;
    let response = Parties::default().respond(&state, booking).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BookingScope {
    /// Bookings the caller created as a rider
    #[default]
    Mine,
    /// Pending bookings near the calling driver
    Available,
    /// Bookings the calling driver is working
    DriverActive,
}

#[derive(Debug, Deserialize)]
pub struct ListBookingsQuery {
    #[serde(default)]
    pub scope: BookingScope,
}

/// List bookings for the caller, newest first
pub async fn list_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ListBookingsQuery>,
) -> AppResult<Json<Vec<BookingResponse>>> {
    let bookings = match query.scope {
        BookingScope::Mine => state.bookings.list_for_rider(claims.sub).await?,
        BookingScope::Available => state.bookings.list_available_for(claims.sub).await?,
        BookingScope::DriverActive => state.bookings.list_for_driver(claims.sub).await?,
    };

    let responses = Parties::default().respond_all(&state, bookings).await?;
    Ok(Json(responses))
}

/// Accept a pending booking as the calling driver
pub async fn accept_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
) -> AppResult<Json<BookingResponse>> {
    let booking = state.bookings.accept(booking_id, claims.sub).await?;
    Ok(Json(Parties::default().respond(&state, booking).await?))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: Option<String>,
}

/// Start, complete or cancel a booking
pub async fn update_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> AppResult<Json<BookingResponse>> {
    let status = payload
        .status
        .ok_or_else(|| AppError::Validation("Status is required".to_string()))?;

    let booking = state
        .bookings
        .update_status(booking_id, claims.sub, &status)
        .await?;
    Ok(Json(Parties::default().respond(&state, booking).await?))
}

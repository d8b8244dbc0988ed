use axum::{extract::State, http::StatusCode, Extension};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::account::{self, AccountRole};
use crate::error::AppResult;
use crate::extract::Json;
use crate::services::account::{LocationInput, NewAccount, Session};
use crate::utils::jwt::Claims;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LocationInfo {
    pub lat: f64,
    pub lng: f64,
    pub address: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: AccountRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_number: Option<String>,
    pub location: Option<LocationInfo>,
    pub is_available: bool,
    pub rating: f64,
    pub total_rides: i32,
    pub created_at: DateTime<Utc>,
}

impl From<account::Model> for AccountInfo {
    fn from(a: account::Model) -> Self {
        let location = a.location().map(|p| LocationInfo {
            lat: p.lat,
            lng: p.lng,
            address: a.location_address.clone(),
        });

        Self {
            id: a.id,
            name: a.name,
            email: a.email,
            phone: a.phone,
            role: a.role,
            vehicle_type: a.vehicle_type,
            vehicle_number: a.vehicle_number,
            location,
            is_available: a.is_available,
            rating: a.rating,
            total_rides: a.total_rides,
            created_at: a.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub account: AccountInfo,
}

impl From<Session> for AuthResponse {
    fn from(session: Session) -> Self {
        Self {
            token: session.token,
            account: session.account.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub account: AccountInfo,
}

/// Register a rider or driver account
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<NewAccount>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let session = state.accounts.register(payload).await?;
    Ok((StatusCode::CREATED, Json(session.into())))
}

/// Login with email and password
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let session = state.accounts.login(&payload.email, &payload.password).await?;
    Ok(Json(session.into()))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<AccountResponse>> {
    let account = state.accounts.me(claims.sub).await?;
    Ok(Json(AccountResponse {
        account: account.into(),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityRequest {
    pub is_available: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityResponse {
    pub message: String,
    pub is_available: bool,
}

/// Toggle whether the driver is taking rides
pub async fn update_availability(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<AvailabilityRequest>,
) -> AppResult<Json<AvailabilityResponse>> {
    let is_available = state
        .accounts
        .set_availability(claims.sub, payload.is_available)
        .await?;

    Ok(Json(AvailabilityResponse {
        message: "Availability updated".to_string(),
        is_available,
    }))
}

/// Record the driver's current position
pub async fn update_location(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<LocationInput>,
) -> AppResult<Json<AccountResponse>> {
    let account = state.accounts.update_location(claims.sub, payload).await?;
    Ok(Json(AccountResponse {
        account: account.into(),
    }))
}

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::config::Config;
use crate::entities::account::{self, AccountRole};
use crate::entities::{
    ADDRESS_MAX_LEN, EMAIL_MAX_LEN, NAME_MAX_LEN, PHONE_MAX_LEN, VEHICLE_FIELD_MAX_LEN,
};
use crate::error::{AppError, AppResult};
use crate::services::check_len;
use crate::store::AccountStore;
use crate::utils::geo::GeoPoint;
use crate::utils::jwt::create_token;
use crate::utils::password::{hash_password, verify_password};

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Deserialize)]
pub struct LocationInput {
    pub lat: f64,
    pub lng: f64,
    pub address: Option<String>,
}

impl LocationInput {
    fn point(&self) -> AppResult<GeoPoint> {
        let point = GeoPoint::new(self.lat, self.lng);
        if !point.is_valid() {
            return Err(AppError::Validation(
                "Location coordinates are out of range".to_string(),
            ));
        }
        Ok(point)
    }

    fn address(&self) -> AppResult<Option<String>> {
        let address = self
            .address
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty());
        if let Some(address) = address {
            check_len(address, ADDRESS_MAX_LEN, "Location address")?;
        }
        Ok(address.map(str::to_string))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default = "default_role")]
    pub role: AccountRole,
    pub vehicle_type: Option<String>,
    pub vehicle_number: Option<String>,
    pub license_number: Option<String>,
    pub location: Option<LocationInput>,
}

fn default_role() -> AccountRole {
    AccountRole::Rider
}

/// Issued on registration and login
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub account: account::Model,
}

fn required(value: Option<String>, field: &str) -> AppResult<String> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation(format!("{} is required for drivers", field)))?;
    check_len(&value, VEHICLE_FIELD_MAX_LEN, field)?;
    Ok(value)
}

#[derive(Clone)]
pub struct AccountService {
    accounts: Arc<dyn AccountStore>,
    jwt_secret: String,
    jwt_expiration_hours: i64,
}

impl AccountService {
    pub fn new(accounts: Arc<dyn AccountStore>, config: &Config) -> Self {
        Self {
            accounts,
            jwt_secret: config.jwt_secret.clone(),
            jwt_expiration_hours: config.jwt_expiration_hours,
        }
    }

    fn issue(&self, account: account::Model) -> AppResult<Session> {
        let token = create_token(
            account.id,
            &account.email,
            account.role,
            &self.jwt_secret,
            self.jwt_expiration_hours,
        )?;
        Ok(Session { token, account })
    }

    pub async fn register(&self, input: NewAccount) -> AppResult<Session> {
        let name = input.name.trim().to_string();
        let email = input.email.trim().to_lowercase();
        let phone = input.phone.trim().to_string();

        if name.is_empty() {
            return Err(AppError::Validation("Name is required".to_string()));
        }
        check_len(&name, NAME_MAX_LEN, "Name")?;
        if !email.contains('@') {
            return Err(AppError::Validation("A valid email is required".to_string()));
        }
        check_len(&email, EMAIL_MAX_LEN, "Email")?;
        check_len(&phone, PHONE_MAX_LEN, "Phone")?;
        if input.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let location = input
            .location
            .as_ref()
            .map(|l| Ok::<_, AppError>((l.point()?, l.address()?)))
            .transpose()?;

        let (vehicle_type, vehicle_number, license_number) = match input.role {
            AccountRole::Driver => (
                Some(required(input.vehicle_type, "Vehicle type")?),
                Some(required(input.vehicle_number, "Vehicle number")?),
                Some(required(input.license_number, "License number")?),
            ),
            AccountRole::Rider => (None, None, None),
        };

        let password_hash = hash_password(&input.password)?;

        let account = self
            .accounts
            .create(account::Model {
                id: Uuid::new_v4(),
                name,
                email,
                password_hash,
                phone,
                role: input.role,
                vehicle_type,
                vehicle_number,
                license_number,
                location_lat: location.as_ref().map(|(p, _)| p.lat),
                location_lng: location.as_ref().map(|(p, _)| p.lng),
                location_address: location.and_then(|(_, a)| a),
                is_available: true,
                rating: 5.0,
                total_rides: 0,
                created_at: Utc::now().into(),
            })
            .await?;

        tracing::info!(account_id = %account.id, role = ?account.role, "Account registered");
        self.issue(account)
    }

    /// Unknown email and wrong password are reported separately, as
    /// validation failures.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<Session> {
        let account = self
            .accounts
            .find_by_email(&email.trim().to_lowercase())
            .await?
            .ok_or_else(|| AppError::Validation("Email not found".to_string()))?;

        if !verify_password(password, &account.password_hash)? {
            return Err(AppError::Validation("Incorrect password".to_string()));
        }

        self.issue(account)
    }

    pub async fn me(&self, account_id: Uuid) -> AppResult<account::Model> {
        self.accounts
            .find_by_id(account_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Account not found".to_string()))
    }

    pub async fn find(&self, account_id: Uuid) -> AppResult<Option<account::Model>> {
        self.accounts.find_by_id(account_id).await
    }

    async fn driver(&self, account_id: Uuid) -> AppResult<account::Model> {
        let account = self.me(account_id).await?;
        if !account.is_driver() {
            return Err(AppError::Role("Driver access required".to_string()));
        }
        Ok(account)
    }

    pub async fn set_availability(&self, account_id: Uuid, is_available: bool) -> AppResult<bool> {
        let driver = self.driver(account_id).await?;
        self.accounts.set_availability(driver.id, is_available).await?;
        tracing::debug!(driver_id = %driver.id, is_available, "Availability updated");
        Ok(is_available)
    }

    pub async fn update_location(
        &self,
        account_id: Uuid,
        location: LocationInput,
    ) -> AppResult<account::Model> {
        let driver = self.driver(account_id).await?;
        let point = location.point()?;
        let address = location.address()?;

        self.accounts
            .set_location(driver.id, point, address)
            .await?
            .ok_or_else(|| AppError::NotFound("Account not found".to_string()))
    }
}

use async_trait::async_trait;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, Database,
    DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use uuid::Uuid;

use super::{AccountStore, BookingFilter, BookingStore, DriverUpdate, StatusChange};
use crate::config::Config;
use crate::entities::{
    account,
    booking::{self, BookingStatus},
};
use crate::error::{AppError, AppResult};
use crate::utils::geo::GeoPoint;

pub async fn connect(config: &Config) -> AppResult<DatabaseConnection> {
    Database::connect(&config.database_url)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to connect to database: {}", e)))
}

#[derive(Clone)]
pub struct PgAccountStore {
    db: DatabaseConnection,
}

impl PgAccountStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<account::Model>> {
        Ok(account::Entity::find_by_id(id).one(&self.db).await?)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<account::Model>> {
        Ok(account::Entity::find()
            .filter(account::Column::Email.eq(email))
            .one(&self.db)
            .await?)
    }

    async fn create(&self, account: account::Model) -> AppResult<account::Model> {
        if self.find_by_email(&account.email).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        // The unique index still guards against a concurrent registration
        account
            .into_active_model()
            .reset_all()
            .insert(&self.db)
            .await
            .map_err(|e| match e.sql_err() {
                Some(sea_orm::SqlErr::UniqueConstraintViolation(_)) => {
                    AppError::Conflict("Email already registered".to_string())
                }
                _ => AppError::Database(e),
            })
    }

    async fn set_availability(&self, id: Uuid, is_available: bool) -> AppResult<()> {
        let result = account::Entity::update_many()
            .col_expr(account::Column::IsAvailable, Expr::value(is_available))
            .filter(account::Column::Id.eq(id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound("Account not found".to_string()));
        }
        Ok(())
    }

    async fn set_location(
        &self,
        id: Uuid,
        location: GeoPoint,
        address: Option<String>,
    ) -> AppResult<Option<account::Model>> {
        let Some(existing) = self.find_by_id(id).await? else {
            return Ok(None);
        };

        let mut active: account::ActiveModel = existing.into();
        active.location_lat = Set(Some(location.lat));
        active.location_lng = Set(Some(location.lng));
        active.location_address = Set(address);

        Ok(Some(active.update(&self.db).await?))
    }
}

async fn apply_driver_update<C: ConnectionTrait>(conn: &C, update: DriverUpdate) -> AppResult<()> {
    let (id, query) = match update {
        DriverUpdate::Engaged(id) => (
            id,
            account::Entity::update_many()
                .col_expr(account::Column::IsAvailable, Expr::value(false)),
        ),
        DriverUpdate::Released(id) => (
            id,
            account::Entity::update_many()
                .col_expr(account::Column::IsAvailable, Expr::value(true)),
        ),
        DriverUpdate::RideCompleted(id) => (
            id,
            account::Entity::update_many()
                .col_expr(
                    account::Column::TotalRides,
                    Expr::col(account::Column::TotalRides).add(1),
                )
                .col_expr(account::Column::IsAvailable, Expr::value(true)),
        ),
    };

    let result = query
        .filter(account::Column::Id.eq(id))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        if let DriverUpdate::Released(_) = update {
            tracing::warn!(driver_id = %id, "Assigned driver no longer exists");
            return Ok(());
        }
        return Err(AppError::NotFound("Account not found".to_string()));
    }
    Ok(())
}

#[derive(Clone)]
pub struct PgBookingStore {
    db: DatabaseConnection,
}

impl PgBookingStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BookingStore for PgBookingStore {
    async fn create(&self, booking: booking::Model) -> AppResult<booking::Model> {
        Ok(booking
            .into_active_model()
            .reset_all()
            .insert(&self.db)
            .await?)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<booking::Model>> {
        Ok(booking::Entity::find_by_id(id).one(&self.db).await?)
    }

    async fn list(&self, filter: &BookingFilter) -> AppResult<Vec<booking::Model>> {
        let mut query = booking::Entity::find();

        if let Some(rider_id) = filter.rider_id {
            query = query.filter(booking::Column::RiderId.eq(rider_id));
        }
        if let Some(driver_id) = filter.driver_id {
            query = query.filter(booking::Column::DriverId.eq(driver_id));
        }
        if !filter.statuses.is_empty() {
            query = query.filter(booking::Column::Status.is_in(filter.statuses.clone()));
        }

        Ok(query
            .order_by_desc(booking::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    async fn update_if_status(
        &self,
        id: Uuid,
        expected: BookingStatus,
        change: StatusChange,
    ) -> AppResult<Option<booking::Model>> {
        let mut patch = booking::ActiveModel {
            status: Set(change.status),
            ..Default::default()
        };
        if let Some(driver_id) = change.driver_id {
            patch.driver_id = Set(Some(driver_id));
        }
        if let Some(at) = change.accepted_at {
            patch.accepted_at = Set(Some(at.into()));
        }
        if let Some(at) = change.completed_at {
            patch.completed_at = Set(Some(at.into()));
        }

        // Dropping the transaction on an early return rolls it back
        let txn = self.db.begin().await?;

        // UPDATE ... WHERE id = $1 AND status = $2: one winner per expected status
        let result = booking::Entity::update_many()
            .set(patch)
            .filter(booking::Column::Id.eq(id))
            .filter(booking::Column::Status.eq(expected))
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(None);
        }

        if let Some(update) = change.driver_update {
            apply_driver_update(&txn, update).await?;
        }

        let updated = booking::Entity::find_by_id(id).one(&txn).await?;
        txn.commit().await?;
        Ok(updated)
    }
}

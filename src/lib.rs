pub mod config;
pub mod entities;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod store;
pub mod utils;

use std::sync::Arc;

pub use config::Config;
pub use error::{AppError, AppResult};

use services::{AccountService, BookingService};
use store::{AccountStore, BookingStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub accounts: AccountService,
    pub bookings: BookingService,
}

impl AppState {
    pub fn new(
        config: Config,
        account_store: Arc<dyn AccountStore>,
        booking_store: Arc<dyn BookingStore>,
    ) -> Self {
        let accounts = AccountService::new(account_store.clone(), &config);
        let bookings =
            BookingService::new(account_store, booking_store, config.service_radius_km);

        Self {
            config,
            accounts,
            bookings,
        }
    }
}

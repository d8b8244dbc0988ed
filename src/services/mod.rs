pub mod account;
pub mod booking;
pub mod matching;

pub use account::AccountService;
pub use booking::BookingService;

use crate::error::{AppError, AppResult};

/// Reject values that would overflow their column
pub(crate) fn check_len(value: &str, max: usize, field: &str) -> AppResult<()> {
    if value.chars().count() > max {
        return Err(AppError::Validation(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(())
}

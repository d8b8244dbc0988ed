use crate::entities::booking;
use crate::error::{AppError, AppResult};
use crate::utils::geo::{is_within_radius, GeoPoint};

/// Keep the bookings whose pickup lies within `radius_km` of the driver.
///
/// Input order is preserved, so callers passing a newest-first list get a
/// newest-first result. A driver without a recorded location is an error
/// rather than an empty match, so callers can tell the two apart.
pub fn find_nearby(
    driver_location: Option<GeoPoint>,
    pending: Vec<booking::Model>,
    radius_km: f64,
) -> AppResult<Vec<booking::Model>> {
    let origin = driver_location
        .ok_or_else(|| AppError::Configuration("Driver location not set".to_string()))?;

    Ok(pending
        .into_iter()
        .filter(|b| is_within_radius(&origin, &b.pickup_point(), radius_km))
        .collect())
}

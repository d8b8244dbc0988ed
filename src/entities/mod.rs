pub mod account;
pub mod booking;

// Widths of the varchar columns created by the migrations
pub const NAME_MAX_LEN: usize = 100;
pub const EMAIL_MAX_LEN: usize = 255;
pub const PHONE_MAX_LEN: usize = 32;
pub const ADDRESS_MAX_LEN: usize = 255;
pub const VEHICLE_FIELD_MAX_LEN: usize = 50;

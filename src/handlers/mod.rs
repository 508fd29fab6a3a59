pub mod health;
pub mod identity;
pub mod overtime;
pub mod shared;
pub mod time_bank;
pub mod workdays;

pub mod authorization;
pub mod candidate;
pub mod macros;
pub mod minutes;
pub mod movement;
pub mod notification;
pub mod policy;
pub mod time_bank;
pub mod workday;

// Re-export all models for easy importing
pub use authorization::*;
pub use candidate::*;
pub use minutes::*;
pub use movement::*;
pub use notification::*;
pub use policy::*;
pub use time_bank::*;
pub use workday::*;

pub mod approval;
pub mod candidate;
pub mod directory;
pub mod engine;
pub mod ledger;
pub mod normalizer;
pub mod notifications;
pub mod policy;
pub mod reconciler;
pub mod requests;
pub mod store;

pub use directory::WorkforceDirectory;
pub use engine::OvertimeEngine;
pub use notifications::{Notifier, RecordingNotifier};
pub use store::OvertimeStore;

pub mod notifications;
pub mod overtime;
pub mod workforce;

// Re-export all repositories for easy importing
pub use notifications::PgNotifier;
pub use overtime::PgOvertimeStore;
pub use workforce::PgWorkforceDirectory;

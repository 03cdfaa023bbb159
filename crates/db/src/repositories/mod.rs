//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument. Multi-row mutations that must be
//! atomic (response recording) run inside a single transaction.

pub mod aggregate_repo;
pub mod alert_repo;
pub mod chat_repo;
pub mod delivery_record_repo;
pub mod dispatch_job_repo;
pub mod user_location_repo;
pub mod user_repo;

pub use aggregate_repo::AggregateRepo;
pub use alert_repo::AlertRepo;
pub use chat_repo::ChatRepo;
pub use delivery_record_repo::DeliveryRecordRepo;
pub use dispatch_job_repo::DispatchJobRepo;
pub use user_location_repo::UserLocationRepo;
pub use user_repo::UserRepo;

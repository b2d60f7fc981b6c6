pub mod maintenance;
pub mod metrics;
pub mod postgres;
pub mod seeder;
pub mod sqlite;
pub mod store;

pub use seeder::{SeedError, SeedOutcome, SeedPolicy, SeedReport, SeedTrigger, Seeder};
pub use store::{Store, StoreError, connect_store};

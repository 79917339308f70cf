pub mod audit;
pub mod batches;
pub mod records;
pub mod refresh_tokens;
pub mod searches;
pub mod stats;
pub mod tenants;
pub mod users;

mod audit_event;
mod batch;
mod record;
mod refresh_token;
mod search;
mod tenant;
mod user;

pub use audit_event::AuditEvent;
pub use batch::{Batch, BatchStatus};
pub use record::Record;
pub use refresh_token::RefreshToken;
pub use search::{Search, SearchWithOwner};
pub use tenant::{Tenant, TenantWithCounts};
pub use user::User;

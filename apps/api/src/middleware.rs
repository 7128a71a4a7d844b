mod identity;
mod rate_limit;

pub use identity::{CurrentUser, attach_identity};
pub use rate_limit::{RateLimitPolicy, rate_limit, subject_or_client_key};

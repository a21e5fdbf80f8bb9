pub mod key;
pub mod rate_limit;
pub mod token_bucket;
pub use key::client_key;
pub use rate_limit::{Decision, RateLimiter};
pub use token_bucket::TokenBucket;

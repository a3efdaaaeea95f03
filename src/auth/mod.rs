pub mod credentials;
pub mod csrf;
pub mod rate_limit;
pub mod sessions;
pub mod token;

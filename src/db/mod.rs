pub mod connection;
pub mod intents;
pub mod sessions;

pub use connection::Database;

pub mod connection;
pub mod endpoints;
pub mod generator;

pub use connection::{ApiConnectionError, OpenRouterClient};
pub use generator::TextGenerator;

pub mod api_connection;
pub mod cli;
pub mod pipeline;
pub mod services;
pub mod settings;

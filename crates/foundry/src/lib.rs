pub mod agents;
pub mod client;
pub mod configuration;
pub mod credentials;
pub mod errors;
pub mod models;
pub mod responses;
pub mod retry;

pub mod agents;
pub mod ask;
pub mod version;

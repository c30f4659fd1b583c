pub mod broker;
pub mod history;
pub mod image;
pub mod registry;
pub mod scheduler;
pub mod server;
pub mod transport;
pub mod types;
pub mod wire;

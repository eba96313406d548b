pub mod config;
pub mod logging;
pub mod packet;
pub mod payload;
pub mod scheduler;
pub mod transport;

pub mod config;
pub mod dispatch;
pub mod metrics;
pub mod modes;

pub mod config;
pub mod outbox;
pub mod replay;

//! Fraud desk core: case store, verification dialogue and call log.

pub mod call_log;
pub mod case;
pub mod channel;
pub mod config;
pub mod desk;
pub mod dialogue;
pub mod error;
pub mod event;
pub mod intent;
pub mod script;
pub mod store;
pub mod types;

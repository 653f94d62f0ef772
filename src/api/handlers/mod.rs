//! HTTP handlers

pub mod health;
pub mod snapshot;
pub mod dns;

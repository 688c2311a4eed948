//! Core services and infrastructure

pub mod gate;
pub mod logging;
pub mod sync;
pub mod version;

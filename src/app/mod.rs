//! Application module

pub mod cli;
pub mod simulate;
pub mod startup;

//! # Integration Scenarios

pub mod fixtures;

mod assembly;
mod phases;
mod routing;

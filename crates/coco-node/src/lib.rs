//! # CoCo Node Library
//!
//! Exposes the assembled application for the `cocod` binary and for
//! integration tests.
//!
//! - `app/` - store keys, keepers, module manager, lifecycle entry points
//! - `modules/` - the fifteen standard modules
//! - `container/` - node configuration
//! - `genesis/` - genesis document creation and loading
//! - `driver` - local block loop for development

#![warn(clippy::all)]
#![allow(clippy::type_complexity)]

pub mod app;
pub mod container;
pub mod driver;
pub mod genesis;
pub mod modules;

pub use app::{AppError, AppKeepers, AppOptions, AssemblyError, CocoApp};
pub use driver::{BlockDriver, DriverSummary, StopReason};
pub use genesis::{GenesisBuilder, GenesisDoc, GenesisError};

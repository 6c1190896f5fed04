//! # CC-05 Module Accounts
//!
//! Which module-owned accounts may mint, burn or stake, and which addresses
//! ordinary transactions may never credit.
//!
//! **Subsystem ID:** 05
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! - `ModuleAccountsBuilder` collects account grants once at startup and
//!   rejects duplicates
//! - `ModuleAccountTable` is the frozen result: it has no setters, and
//!   `get_macc_perms` hands out copies only
//! - `module_account_addrs` derives every module account address;
//!   `blocked_module_addrs` leaves out accounts flagged as allowed to
//!   receive
//!
//! ## Module Structure
//!
//! ```text
//! cc-05-module-accounts/
//! ├── domain/          # Permission, ModuleAccountPermission, AccountsError
//! └── table.rs         # ModuleAccountsBuilder, ModuleAccountTable
//! ```

#![warn(clippy::all)]

pub mod domain;
pub mod table;

pub use domain::{AccountsError, MaccPerms, ModuleAccountPermission, Permission};
pub use table::{ModuleAccountTable, ModuleAccountsBuilder};

//! # CC-01 Store Keys
//!
//! Named handles for the storage partitions each module owns, the
//! in-memory multistore they address, and the execution context handed to
//! every lifecycle hook.
//!
//! **Subsystem ID:** 01
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! - Issue unique `(name, kind)` store keys, one set per module
//! - Mount every issued key in a `MultiStore` before block processing
//! - Carry the open storage transaction into hooks through `Context`
//!
//! ## Module Structure
//!
//! ```text
//! cc-01-store/
//! ├── domain/          # StoreKey, StoreKind, StoreError
//! ├── allocator.rs     # StoreKeyAllocator
//! ├── multistore.rs    # KvStore, MultiStore, CommitInfo
//! └── context.rs       # Context passed into hooks
//! ```

#![warn(clippy::all)]

pub mod allocator;
pub mod context;
pub mod domain;
pub mod multistore;

pub use allocator::StoreKeyAllocator;
pub use context::Context;
pub use domain::{StoreError, StoreKey, StoreKind};
pub use multistore::{CommitInfo, KvStore, MultiStore};

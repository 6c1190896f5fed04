//! # CoCo Test Suite
//!
//! Cross-crate scenarios that assemble the registry crates by hand, without
//! the node's module set.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── fixtures.rs    # Recording modules and store helpers
//!     ├── phases.rs      # Phase ordering and genesis routing
//!     ├── assembly.rs    # Startup rejection of bad wiring
//!     └── routing.rs     # Routers and capability scoping together
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p coco-tests
//! cargo test -p coco-tests integration::phases::
//! ```

pub mod integration;

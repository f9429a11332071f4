//! bindery — an ordered multi-valued settings registry.
//!
//! ## Crate layout
//! - `core`: the registry runtime — container, composite indexer,
//!   live views, set algebra, schema layer, and observability.
//!
//! The `prelude` module mirrors the surface consumers use when
//! declaring schemas and dispatching against settings.

pub use bindery_core as core;

pub use bindery_core::MAX_ARITY;
pub use bindery_core::error::InternalError as Error;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

///
/// Prelude
/// using _ brings traits into scope and avoids name conflicts
///

pub mod prelude {
    pub use crate::core::prelude::*;
    pub use serde::{Deserialize, Serialize};
}

//! Core runtime for bindery: the ordered multi-valued settings
//! registry, its composite indexer, live view projections, the
//! order-preserving set algebra, and the schema layer that validates
//! every insertion.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod binding;
pub mod error;
pub mod key;
pub mod obs;
pub mod registry;
pub mod schema;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_support;

///
/// CONSTANTS
///

/// Maximum number of value columns a schema may declare.
///
/// This bounds binding tuples and view specs to sizes the projection
/// and validation paths are sized for.
pub const MAX_ARITY: usize = 16;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, sinks, or counters are re-exported here.
///

pub mod prelude {
    pub use crate::{
        binding::Binding,
        key::Key,
        registry::{
            Registry,
            index::{IndexExpr, Selection, SliceExpr},
            view::{ColumnRef, ViewItem, ViewProjection},
        },
        schema::{ColumnDefault, SchemaBuilder, SchemaDescriptor, ViewSpec},
        value::{Float64, Value, ValueSet},
    };
}

//! Strata IR crate.
//!
//! An arena-based, multi-dialect IR together with the pattern-driven
//! conversion engine used to lower it between abstraction levels.

// === IR substrate ===
pub mod context;
pub mod location;
pub mod ops;
pub mod printer;
pub mod refs;
pub mod symbol;
pub mod symbol_table;
pub mod types;
pub mod validation;
pub mod walk;

// === Dialect modules ===
pub mod dialect;

// === Conversion engine ===
pub mod rewrite;

// Re-export smallvec for use in macros and external crates
pub use smallvec;

pub use context::{
    BlockArgData, BlockData, IrContext, OperationData, OperationDataBuilder, RegionData, Use,
    ValueData,
};
pub use location::{Location, Span};
pub use ops::{ConversionError, DialectOp, OpKind};
pub use refs::{BlockRef, OpRef, PathRef, RegionRef, TypeRef, ValueDef, ValueRef};
pub use symbol::Symbol;
pub use types::{Attribute, PathInterner, TypeData, TypeDataBuilder, TypeInterner};
pub use walk::WalkAction;

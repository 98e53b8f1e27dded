//! Entity handles for the arena IR.
//!
//! Every handle is a `u32` index into a `PrimaryMap` owned by `IrContext`.
//! Handles are `Copy` and never own the entity they point at: ownership is
//! the region → block → operation tree recorded in the context itself.

use cranelift_entity::entity_impl;
use std::fmt;

/// Handle to an operation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OpRef(u32);
entity_impl!(OpRef, "op");

/// Handle to an SSA value (operation result or block argument).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueRef(u32);
entity_impl!(ValueRef, "v");

/// Handle to a basic block.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockRef(u32);
entity_impl!(BlockRef, "block");

/// Handle to a region (ordered list of blocks).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionRef(u32);
entity_impl!(RegionRef, "region");

/// Handle to an interned type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeRef(u32);
entity_impl!(TypeRef, "ty");

/// Handle to an interned source path.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathRef(u32);
entity_impl!(PathRef, "path");

/// Where a value is defined.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueDef {
    /// Result of an operation at the given index.
    OpResult(OpRef, u32),
    /// Block argument at the given index.
    BlockArg(BlockRef, u32),
}

impl ValueDef {
    /// The defining operation, if this value is an operation result.
    pub fn defining_op(self) -> Option<OpRef> {
        match self {
            ValueDef::OpResult(op, _) => Some(op),
            ValueDef::BlockArg(..) => None,
        }
    }

    /// Position of the value among its siblings (result or argument index).
    pub fn index(self) -> u32 {
        match self {
            ValueDef::OpResult(_, idx) | ValueDef::BlockArg(_, idx) => idx,
        }
    }
}

impl fmt::Display for ValueDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueDef::OpResult(op, idx) => write!(f, "{op}#{idx}"),
            ValueDef::BlockArg(block, idx) => write!(f, "{block}#{idx}"),
        }
    }
}

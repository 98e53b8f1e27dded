//! Dialect vocabularies.
//!
//! Each module declares typed op wrappers (via [`define_op!`](crate::define_op)),
//! constructor functions that create detached operations, and the type
//! helpers of that dialect.

pub mod arith;
pub mod cf;
pub mod core;
pub mod func;
pub mod hal;
pub mod llvm;
pub mod memref;
pub mod nvvm;
pub mod rocdl;
pub mod vm;

use smallvec::smallvec;

use crate::context::{BlockData, IrContext, RegionData};
use crate::location::Location;
use crate::refs::{BlockRef, OpRef, RegionRef, TypeRef};

/// Create an unowned region holding a single entry block with the given arguments.
pub fn region_with_entry(
    ctx: &mut IrContext,
    location: Location,
    arg_types: impl IntoIterator<Item = TypeRef>,
) -> (RegionRef, BlockRef) {
    let block = ctx.create_block(BlockData::with_args(location, arg_types));
    let region = ctx.create_region(RegionData {
        location,
        blocks: smallvec![block],
        parent_op: None,
    });
    (region, block)
}

/// Create an unowned, empty region.
pub fn empty_region(ctx: &mut IrContext, location: Location) -> RegionRef {
    ctx.create_region(RegionData {
        location,
        blocks: smallvec![],
        parent_op: None,
    })
}

/// Entry block of the `index`-th region of `op`.
pub fn entry_block(ctx: &IrContext, op: OpRef, index: usize) -> Option<BlockRef> {
    let region = *ctx.op(op).regions.get(index)?;
    ctx.region(region).blocks.first().copied()
}

/// Append `op` to a block, keeping a trailing terminator of kind `terminator` last.
pub fn push_before_terminator(
    ctx: &mut IrContext,
    block: BlockRef,
    op: OpRef,
    terminator: crate::ops::OpKind,
) {
    let ops = &ctx.block(block).ops;
    match ops.last().copied() {
        Some(last) if crate::ops::OpKind::of(ctx, last) == terminator => {
            ctx.insert_op_before(block, last, op)
        }
        _ => ctx.push_op(block, op),
    }
}

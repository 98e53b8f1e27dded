//! Recursive operation traversal.
//!
//! All walks visit operations in document order: a parent before the
//! operations nested in its regions, blocks in region order, operations in
//! block order.

use std::ops::ControlFlow;

use crate::context::IrContext;
use crate::ops::DialectOp;
use crate::refs::{BlockRef, OpRef, RegionRef};

/// Controls whether to descend into children during a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkAction {
    /// Continue walking and descend into nested regions.
    Advance,
    /// Skip the nested regions of the current operation.
    Skip,
}

pub fn walk_region<B>(
    ctx: &IrContext,
    region: RegionRef,
    f: &mut dyn FnMut(OpRef) -> ControlFlow<B, WalkAction>,
) -> ControlFlow<B, ()> {
    for &block in &ctx.region(region).blocks {
        walk_block(ctx, block, f)?;
    }
    ControlFlow::Continue(())
}

pub fn walk_block<B>(
    ctx: &IrContext,
    block: BlockRef,
    f: &mut dyn FnMut(OpRef) -> ControlFlow<B, WalkAction>,
) -> ControlFlow<B, ()> {
    for &op in &ctx.block(block).ops {
        walk_op(ctx, op, f)?;
    }
    ControlFlow::Continue(())
}

/// Walk an operation and its nested regions.
pub fn walk_op<B>(
    ctx: &IrContext,
    op: OpRef,
    f: &mut dyn FnMut(OpRef) -> ControlFlow<B, WalkAction>,
) -> ControlFlow<B, ()> {
    match f(op) {
        ControlFlow::Break(b) => return ControlFlow::Break(b),
        ControlFlow::Continue(WalkAction::Skip) => return ControlFlow::Continue(()),
        ControlFlow::Continue(WalkAction::Advance) => {}
    }
    for &region in &ctx.op(op).regions {
        walk_region(ctx, region, f)?;
    }
    ControlFlow::Continue(())
}

/// Walk operations of a specific dialect type in a region.
pub fn walk_typed<T, B>(
    ctx: &IrContext,
    region: RegionRef,
    f: &mut dyn FnMut(T) -> ControlFlow<B, WalkAction>,
) -> ControlFlow<B, ()>
where
    T: DialectOp,
{
    walk_region(ctx, region, &mut |op| match T::from_op(ctx, op) {
        Ok(typed) => f(typed),
        Err(_) => ControlFlow::Continue(WalkAction::Advance),
    })
}

/// Every operation nested under `root`, in document order, excluding `root`.
pub fn nested_ops(ctx: &IrContext, root: OpRef) -> Vec<OpRef> {
    let mut out = Vec::new();
    for &region in &ctx.op(root).regions {
        let _ = walk_region::<()>(ctx, region, &mut |op| {
            out.push(op);
            ControlFlow::Continue(WalkAction::Advance)
        });
    }
    out
}

/// Whether `op` sits (transitively) inside a region of `ancestor`.
pub fn is_nested_in(ctx: &IrContext, op: OpRef, ancestor: OpRef) -> bool {
    let mut current = ctx.parent_op(op);
    while let Some(parent) = current {
        if parent == ancestor {
            return true;
        }
        current = ctx.parent_op(parent);
    }
    false
}

/// Nearest enclosing operation satisfying `pred`.
pub fn find_ancestor(
    ctx: &IrContext,
    op: OpRef,
    mut pred: impl FnMut(OpRef) -> bool,
) -> Option<OpRef> {
    let mut current = ctx.parent_op(op);
    while let Some(parent) = current {
        if pred(parent) {
            return Some(parent);
        }
        current = ctx.parent_op(parent);
    }
    None
}

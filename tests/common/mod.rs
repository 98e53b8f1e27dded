//! Common fixtures for the end-to-end lowering tests.

#![allow(dead_code)]

use strata::ir::dialect::{core, func};
use strata::ir::{BlockRef, DialectOp, IrContext, Location, OpRef, Span, Symbol, TypeRef, ValueRef};

pub fn test_ctx(file: &str) -> (IrContext, Location) {
    let mut ctx = IrContext::new();
    let path = ctx.paths.intern(file);
    (ctx, Location::new(path, Span::default()))
}

/// Add a function to `module` and return it with its entry block.
pub fn add_func(
    ctx: &mut IrContext,
    loc: Location,
    module: core::Module,
    name: &'static str,
    inputs: &[TypeRef],
    results: &[TypeRef],
) -> (func::Func, BlockRef) {
    let f = func::func(ctx, loc, Symbol::new(name), inputs, results);
    module.push(ctx, f.op_ref());
    let entry = f.entry_block(ctx).unwrap();
    (f, entry)
}

/// Append `op` to `block` and return its first result.
pub fn emit(ctx: &mut IrContext, block: BlockRef, op: OpRef) -> ValueRef {
    ctx.push_op(block, op);
    ctx.op_result(op, 0)
}

pub fn finish(ctx: &mut IrContext, loc: Location, block: BlockRef, values: &[ValueRef]) {
    let ret = func::r#return(ctx, loc, values);
    ctx.push_op(block, ret.op_ref());
}

pub fn op_names(ctx: &IrContext, block: BlockRef) -> Vec<String> {
    ctx.block(block)
        .ops
        .iter()
        .map(|&op| ctx.op_full_name(op))
        .collect()
}

//! Demonstration modules for the `demo` subcommand.

use clap::ValueEnum;
use strata::ir::dialect::arith::{self, CmpPredicate};
use strata::ir::dialect::hal::{self, WorkgroupQuery};
use strata::ir::dialect::memref::{self, Dim};
use strata::ir::dialect::{core, func};
use strata::ir::{Attribute, BlockRef, DialectOp, IrContext, Location, OpRef, Span, Symbol, ValueRef};
use strata::{GpuBackend, LoweringOptions};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// Exported `add` and `maximum` functions, lowered to the VM
    Vm,
    /// A kernel reading two bindings and its workgroup id, lowered to GPU intrinsics
    Gpu,
    /// A kernel querying a fourth workgroup axis, which cannot be lowered
    Failure,
}

impl Scenario {
    pub fn options(self, backend: GpuBackend) -> LoweringOptions {
        match self {
            Scenario::Vm => LoweringOptions::vm(),
            Scenario::Gpu | Scenario::Failure => LoweringOptions::gpu(backend),
        }
    }

    pub fn build(self, ctx: &mut IrContext) -> OpRef {
        let path = ctx.paths.intern("demo.mlir");
        let loc = Location::new(path, Span::default());
        match self {
            Scenario::Vm => vm_module(ctx, loc),
            Scenario::Gpu => kernel_module(ctx, loc, 1),
            Scenario::Failure => kernel_module(ctx, loc, 3),
        }
    }
}

fn entry(ctx: &IrContext, f: func::Func) -> BlockRef {
    ctx.region(f.body(ctx)).blocks[0]
}

/// Append `op` to `block` and return its first result.
fn emit(ctx: &mut IrContext, block: BlockRef, op: OpRef) -> ValueRef {
    ctx.push_op(block, op);
    ctx.op_result(op, 0)
}

fn vm_module(ctx: &mut IrContext, loc: Location) -> OpRef {
    let i32_ty = core::i32(&mut ctx.types);
    let root = core::module(ctx, loc, None);
    let inner = core::module(ctx, loc, Some(Symbol::new("demo")));
    root.push(ctx, inner.op_ref());

    // add() -> i32 { 5 + 7 }
    let add = func::func(ctx, loc, Symbol::new("add"), &[], &[i32_ty]);
    ctx.set_attr(add.op_ref(), strata_vm::ATTR_EXPORT(), Some(Attribute::Unit));
    inner.push(ctx, add.op_ref());
    let body = entry(ctx, add);
    let five = arith::constant(ctx, loc, i32_ty, 5).op_ref();
    let five = emit(ctx, body, five);
    let seven = arith::constant(ctx, loc, i32_ty, 7).op_ref();
    let seven = emit(ctx, body, seven);
    let sum = arith::addi(ctx, loc, five, seven).op_ref();
    let sum = emit(ctx, body, sum);
    let ret = func::r#return(ctx, loc, &[sum]).op_ref();
    ctx.push_op(body, ret);

    // max(a, b) -> i32 { a > b ? a : b }, exported as `maximum`
    let max = func::func(ctx, loc, Symbol::new("max"), &[i32_ty, i32_ty], &[i32_ty]);
    ctx.set_attr(max.op_ref(), strata_vm::ATTR_EXPORT(), Some(Attribute::from("maximum")));
    inner.push(ctx, max.op_ref());
    let body = entry(ctx, max);
    let (a, b) = (ctx.block_arg(body, 0), ctx.block_arg(body, 1));
    let greater = arith::cmpi(ctx, loc, CmpPredicate::Sgt, a, b).op_ref();
    let greater = emit(ctx, body, greater);
    let larger = arith::select(ctx, loc, greater, a, b).op_ref();
    let larger = emit(ctx, body, larger);
    let ret = func::r#return(ctx, loc, &[larger]).op_ref();
    ctx.push_op(body, ret);

    root.op_ref()
}

fn kernel_module(ctx: &mut IrContext, loc: Location, axis: u64) -> OpRef {
    let root = core::module(ctx, loc, None);
    let iface = hal::interface(ctx, loc, Symbol::new("io"));
    for (name, binding) in [("input", 0), ("output", 1)] {
        let decl = hal::interface_binding(ctx, loc, Symbol::new(name), 0, binding);
        iface.push(ctx, decl.op_ref());
    }
    root.push(ctx, iface.op_ref());

    let kernel = func::func(ctx, loc, Symbol::new("scale"), &[], &[]);
    root.push(ctx, kernel.op_ref());
    let body = entry(ctx, kernel);
    let f32_ty = core::f32(&mut ctx.types);
    let view = memref::memref(&mut ctx.types, f32_ty, &[Dim::Static(16), Dim::Static(4)], 0);
    for name in ["input", "output"] {
        let subspan = hal::binding_subspan(ctx, loc, &[Symbol::new("io"), Symbol::new(name)], view);
        ctx.push_op(body, subspan.op_ref());
    }
    let id = hal::workgroup_query(ctx, loc, WorkgroupQuery::Id, axis);
    ctx.push_op(body, id);
    let ret = func::r#return(ctx, loc, &[]).op_ref();
    ctx.push_op(body, ret);

    root.op_ref()
}

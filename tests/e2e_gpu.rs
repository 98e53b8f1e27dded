//! End-to-end tests for the GPU lowering pipeline.

mod common;

use common::{add_func, finish, op_names, test_ctx};
use strata::ir::dialect::hal::{self, WorkgroupQuery};
use strata::ir::dialect::memref::{self, Dim};
use strata::ir::dialect::{core, func, llvm};
use strata::ir::printer::print_op;
use strata::ir::rewrite::LegalizationErrorKind;
use strata::ir::symbol_table::lookup_symbol_in;
use strata::ir::{BlockRef, DialectOp, IrContext, Location, OpRef, Symbol};
use strata::{GpuBackend, LoweringOptions, lower_module};
use strata_gpu::passes::func_to_llvm::binding_argument;

/// Module with interface `@io { @a (0, 0), @b (0, 1), @c (1, 0) }` and an empty kernel `@k`.
fn kernel_module(ctx: &mut IrContext, loc: Location) -> (core::Module, func::Func, BlockRef) {
    let root = core::module(ctx, loc, None);
    let iface = hal::interface(ctx, loc, Symbol::new("io"));
    for (name, set, binding) in [("a", 0, 0), ("b", 0, 1), ("c", 1, 0)] {
        let decl = hal::interface_binding(ctx, loc, Symbol::new(name), set, binding);
        iface.push(ctx, decl.op_ref());
    }
    root.push(ctx, iface.op_ref());
    let (kernel, entry) = add_func(ctx, loc, root, "k", &[], &[]);
    (root, kernel, entry)
}

fn subspan(ctx: &mut IrContext, loc: Location, entry: BlockRef, slot: &'static str) -> OpRef {
    let f32_ty = core::f32(&mut ctx.types);
    let view = memref::memref(&mut ctx.types, f32_ty, &[Dim::Static(8)], 0);
    let op = hal::binding_subspan(ctx, loc, &[Symbol::new("io"), Symbol::new(slot)], view).op_ref();
    ctx.push_op(entry, op);
    op
}

fn lowered_kernel(ctx: &IrContext, root: core::Module) -> OpRef {
    let kernel = lookup_symbol_in(ctx, root.op_ref(), Symbol::new("k")).unwrap();
    assert!(llvm::Func::matches(ctx, kernel));
    kernel
}

#[test]
fn bindings_become_arguments_in_first_use_order() {
    let (mut ctx, loc) = test_ctx("kernel.mlir");
    let (root, _, entry) = kernel_module(&mut ctx, loc);
    for slot in ["c", "a", "c"] {
        subspan(&mut ctx, loc, entry, slot);
    }
    finish(&mut ctx, loc, entry, &[]);

    lower_module(&mut ctx, root.op_ref(), &LoweringOptions::gpu(GpuBackend::Nvvm)).unwrap();

    let kernel = lowered_kernel(&ctx, root);
    assert_eq!(ctx.block_args(entry).len(), 2);
    assert_eq!(binding_argument(&ctx, kernel, 1, 0), Some(0));
    assert_eq!(binding_argument(&ctx, kernel, 0, 0), Some(1));
    assert_eq!(binding_argument(&ctx, kernel, 0, 1), None);

    let f32_ty = core::f32(&mut ctx.types);
    let pointer = llvm::ptr(&mut ctx.types, f32_ty, 0);
    for &arg in ctx.block_args(entry) {
        assert_eq!(ctx.value_ty(arg), pointer);
    }

    // both subspans of `c` read the same argument
    let c_arg = ctx.block_arg(entry, 0);
    let readers = ctx
        .uses(c_arg)
        .iter()
        .filter(|u| llvm::InsertValue::matches(&ctx, u.user))
        .count();
    assert_eq!(readers, 4);
}

#[test]
fn lowering_is_deterministic() {
    let lowered = || {
        let (mut ctx, loc) = test_ctx("kernel.mlir");
        let (root, _, entry) = kernel_module(&mut ctx, loc);
        subspan(&mut ctx, loc, entry, "b");
        let id = hal::workgroup_query(&mut ctx, loc, WorkgroupQuery::Count, 2);
        ctx.push_op(entry, id);
        finish(&mut ctx, loc, entry, &[]);
        lower_module(&mut ctx, root.op_ref(), &LoweringOptions::gpu(GpuBackend::Rocdl)).unwrap();
        print_op(&ctx, root.op_ref())
    };
    let first = lowered();
    assert!(first.contains("rocdl.grid.dim.z"));
    assert_eq!(first, lowered());
}

#[test]
fn workgroup_queries_follow_the_backend() {
    for (backend, expected) in [
        (GpuBackend::Nvvm, "nvvm.read.ptx.sreg.nctaid.x"),
        (GpuBackend::Rocdl, "rocdl.grid.dim.x"),
    ] {
        let (mut ctx, loc) = test_ctx("grid.mlir");
        let (root, _, entry) = kernel_module(&mut ctx, loc);
        let count = hal::workgroup_query(&mut ctx, loc, WorkgroupQuery::Count, 0);
        ctx.push_op(entry, count);
        finish(&mut ctx, loc, entry, &[]);

        lower_module(&mut ctx, root.op_ref(), &LoweringOptions::gpu(backend)).unwrap();

        assert_eq!(op_names(&ctx, entry), [expected, "llvm.sext", "llvm.return"]);
        let i64_ty = core::i64(&mut ctx.types);
        let sext = ctx.block(entry).ops[1];
        assert_eq!(ctx.op_result_types(sext), &[i64_ty]);
    }
}

#[test]
fn fourth_workgroup_axis_fails_with_a_remark() {
    let (mut ctx, loc) = test_ctx("axis.mlir");
    let (root, _, entry) = kernel_module(&mut ctx, loc);
    let id = hal::workgroup_query(&mut ctx, loc, WorkgroupQuery::Id, 3);
    ctx.push_op(entry, id);
    finish(&mut ctx, loc, entry, &[]);

    let err = lower_module(&mut ctx, root.op_ref(), &LoweringOptions::gpu(GpuBackend::Nvvm))
        .unwrap_err();
    assert_eq!(err.op(), Some(id));
    assert!(matches!(
        err.kind(),
        LegalizationErrorKind::IllegalOperation { name, .. } if name == "hal.interface.workgroup.id"
    ));
    assert_eq!(
        err.diagnostics()[0].message,
        "workgroup dimension 3 is out of range"
    );
}

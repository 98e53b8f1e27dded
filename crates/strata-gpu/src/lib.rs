//! GPU-target lowering.
//!
//! Lowers HAL kernels (functions reaching buffers through interface
//! bindings and querying the workgroup grid) to `llvm` functions taking one
//! pointer per binding, with the grid queries mapped to NVVM or ROCDL
//! intrinsics depending on the selected [`GpuBackend`].

pub mod passes;
mod type_converter;

use derive_more::Display;
use strata_ir::dialect::hal::{self, WorkgroupQuery};
use strata_ir::dialect::core;
use strata_ir::rewrite::{
    ConversionMode, ConversionResult, ConversionSummary, ConversionTarget, PatternSet,
    apply_conversion,
};
use strata_ir::{DialectOp, IrContext, OpRef};
use tracing::debug;

pub use type_converter::{element_pointer, llvm_type_converter, memref_descriptor};

/// Intrinsic family the workgroup queries are lowered to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Display)]
pub enum GpuBackend {
    #[default]
    #[display("nvvm")]
    Nvvm,
    #[display("rocdl")]
    Rocdl,
}

/// Register every GPU lowering pattern.
pub fn populate_patterns(patterns: &mut PatternSet, backend: GpuBackend) {
    patterns
        .add(passes::func_to_llvm::FlattenKernelSignature)
        .add(passes::binding_to_llvm::LowerBindingSubspan)
        .add(passes::return_to_llvm::LowerReturn);
    for query in [WorkgroupQuery::Id, WorkgroupQuery::Count, WorkgroupQuery::Size] {
        patterns.add(passes::workgroup_to_intrinsics::LowerWorkgroupQuery { query, backend });
    }
}

/// What a lowered kernel module may contain.
pub fn conversion_target() -> ConversionTarget {
    let mut target = ConversionTarget::new();
    target
        .add_legal_dialect("llvm")
        .add_legal_dialect("nvvm")
        .add_legal_dialect("rocdl")
        .add_legal_dialect("core")
        .add_legal_op(hal::Interface::kind())
        .add_legal_op(hal::InterfaceBinding::kind())
        .add_legal_op(hal::InterfaceEnd::kind())
        .add_illegal_dialect("hal")
        .add_illegal_dialect("func");
    target
}

/// Lower every kernel nested in `module`.
pub fn lower(
    ctx: &mut IrContext,
    module: OpRef,
    backend: GpuBackend,
    mode: ConversionMode,
) -> ConversionResult<ConversionSummary> {
    debug_assert!(core::Module::matches(ctx, module));
    debug!(%backend, "gpu lowering");
    let converter = llvm_type_converter();
    let mut patterns = PatternSet::new();
    populate_patterns(&mut patterns, backend);
    apply_conversion(ctx, module, &conversion_target(), &patterns, &converter, mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;
    use strata_ir::dialect::memref::{self, Dim};
    use strata_ir::dialect::{func, llvm};
    use strata_ir::printer::print_op;
    use strata_ir::rewrite::LegalizationErrorKind;
    use strata_ir::{Location, Span, Symbol, TypeRef};

    fn test_ctx() -> (IrContext, Location) {
        let mut ctx = IrContext::new();
        let path = ctx.paths.intern("kernel.mlir");
        (ctx, Location::new(path, Span::default()))
    }

    /// Module with interface `@io { @in (0, 0), @out (0, 1) }` and an empty kernel `@k`.
    fn kernel_module(ctx: &mut IrContext, loc: Location) -> (core::Module, func::Func) {
        let module = core::module(ctx, loc, None);
        let iface = hal::interface(ctx, loc, Symbol::new("io"));
        for (name, binding) in [("in", 0), ("out", 1)] {
            let decl = hal::interface_binding(ctx, loc, Symbol::from_dynamic(name), 0, binding);
            iface.push(ctx, decl.op_ref());
        }
        module.push(ctx, iface.op_ref());
        let kernel = func::func(ctx, loc, Symbol::new("k"), &[], &[]);
        module.push(ctx, kernel.op_ref());
        (module, kernel)
    }

    fn push_subspan(ctx: &mut IrContext, loc: Location, kernel: func::Func, slot: &str, shape: &[Dim]) {
        let f32_ty = core::f32(&mut ctx.types);
        push_view(ctx, loc, kernel, slot, f32_ty, shape);
    }

    fn push_view(
        ctx: &mut IrContext,
        loc: Location,
        kernel: func::Func,
        slot: &str,
        element: TypeRef,
        shape: &[Dim],
    ) {
        let entry = kernel.entry_block(ctx).unwrap();
        let view = memref::memref(&mut ctx.types, element, shape, 0);
        let subspan = hal::binding_subspan(
            ctx,
            loc,
            &[Symbol::new("io"), Symbol::from_dynamic(slot)],
            view,
        );
        ctx.push_op(entry, subspan.op_ref());
    }

    fn push_return(ctx: &mut IrContext, loc: Location, kernel: func::Func) {
        let entry = kernel.entry_block(ctx).unwrap();
        let ret = func::r#return(ctx, loc, &[]);
        ctx.push_op(entry, ret.op_ref());
    }

    #[test]
    fn kernel_is_flattened_and_bindings_become_descriptors() {
        let (mut ctx, loc) = test_ctx();
        let (module, kernel) = kernel_module(&mut ctx, loc);
        push_subspan(&mut ctx, loc, kernel, "out", &[Dim::Static(2), Dim::Static(3)]);
        let entry = kernel.entry_block(&ctx).unwrap();
        let id = hal::workgroup_query(&mut ctx, loc, WorkgroupQuery::Id, 1);
        ctx.push_op(entry, id);
        push_return(&mut ctx, loc, kernel);

        let summary = lower(&mut ctx, module.op_ref(), GpuBackend::Nvvm, ConversionMode::Full)
            .unwrap();
        assert_eq!(summary.patterns_applied, 4);

        assert_snapshot!(print_op(&ctx, module.op_ref()), @r#"
        core.module {
          hal.interface @io {
            hal.interface.binding @in {binding = 0, set = 0}
            hal.interface.binding @out {binding = 1, set = 0}
            hal.interface.end
          }
          llvm.func @k {function_type = core.fn(llvm.ptr(core.f32) {addrspace = 0}) {inputs = 1}, hal.bindings = [[0, 1]], linkage = "external"} {
          ^bb2(%0: llvm.ptr(core.f32) {addrspace = 0}):
            %1 = llvm.undef : llvm.struct(llvm.ptr(core.f32) {addrspace = 0}, llvm.ptr(core.f32) {addrspace = 0}, core.i64, llvm.array(core.i64) {len = 2}, llvm.array(core.i64) {len = 2})
            %2 = llvm.insertvalue %1, %0 {position = [0]} : llvm.struct(llvm.ptr(core.f32) {addrspace = 0}, llvm.ptr(core.f32) {addrspace = 0}, core.i64, llvm.array(core.i64) {len = 2}, llvm.array(core.i64) {len = 2})
            %3 = llvm.insertvalue %2, %0 {position = [1]} : llvm.struct(llvm.ptr(core.f32) {addrspace = 0}, llvm.ptr(core.f32) {addrspace = 0}, core.i64, llvm.array(core.i64) {len = 2}, llvm.array(core.i64) {len = 2})
            %4 = llvm.constant {value = 0} : core.i64
            %5 = llvm.insertvalue %3, %4 {position = [2]} : llvm.struct(llvm.ptr(core.f32) {addrspace = 0}, llvm.ptr(core.f32) {addrspace = 0}, core.i64, llvm.array(core.i64) {len = 2}, llvm.array(core.i64) {len = 2})
            %6 = llvm.constant {value = 2} : core.i64
            %7 = llvm.insertvalue %5, %6 {position = [3, 0]} : llvm.struct(llvm.ptr(core.f32) {addrspace = 0}, llvm.ptr(core.f32) {addrspace = 0}, core.i64, llvm.array(core.i64) {len = 2}, llvm.array(core.i64) {len = 2})
            %8 = llvm.constant {value = 3} : core.i64
            %9 = llvm.insertvalue %7, %8 {position = [3, 1]} : llvm.struct(llvm.ptr(core.f32) {addrspace = 0}, llvm.ptr(core.f32) {addrspace = 0}, core.i64, llvm.array(core.i64) {len = 2}, llvm.array(core.i64) {len = 2})
            %10 = llvm.constant {value = 3} : core.i64
            %11 = llvm.insertvalue %9, %10 {position = [4, 0]} : llvm.struct(llvm.ptr(core.f32) {addrspace = 0}, llvm.ptr(core.f32) {addrspace = 0}, core.i64, llvm.array(core.i64) {len = 2}, llvm.array(core.i64) {len = 2})
            %12 = llvm.constant {value = 1} : core.i64
            %13 = llvm.insertvalue %11, %12 {position = [4, 1]} : llvm.struct(llvm.ptr(core.f32) {addrspace = 0}, llvm.ptr(core.f32) {addrspace = 0}, core.i64, llvm.array(core.i64) {len = 2}, llvm.array(core.i64) {len = 2})
            %14 = nvvm.read.ptx.sreg.ctaid.y : core.i32
            %15 = llvm.sext %14 : core.i64
            llvm.return
          }
          core.module_end
        }
        "#);
    }

    #[test]
    fn rocdl_backend_selects_rocdl_queries() {
        let (mut ctx, loc) = test_ctx();
        let (module, kernel) = kernel_module(&mut ctx, loc);
        let entry = kernel.entry_block(&ctx).unwrap();
        for (query, axis) in [
            (WorkgroupQuery::Id, 0),
            (WorkgroupQuery::Count, 1),
            (WorkgroupQuery::Size, 2),
        ] {
            let op = hal::workgroup_query(&mut ctx, loc, query, axis);
            ctx.push_op(entry, op);
        }
        push_return(&mut ctx, loc, kernel);

        lower(&mut ctx, module.op_ref(), GpuBackend::Rocdl, ConversionMode::Full).unwrap();

        let lowered = strata_ir::symbol_table::lookup_symbol_in(&ctx, module.op_ref(), Symbol::new("k"))
            .unwrap();
        assert!(llvm::Func::matches(&ctx, lowered));
        let entry = strata_ir::dialect::entry_block(&ctx, lowered, 0).unwrap();
        let names: Vec<_> = ctx
            .block(entry)
            .ops
            .iter()
            .map(|&op| ctx.op_full_name(op))
            .collect();
        assert_eq!(
            names,
            [
                "rocdl.workgroup.id.x",
                "llvm.sext",
                "rocdl.grid.dim.y",
                "llvm.sext",
                "rocdl.workgroup.dim.z",
                "llvm.sext",
                "llvm.return",
            ]
        );
    }

    #[test]
    fn dynamic_binding_fails_with_a_remark() {
        let (mut ctx, loc) = test_ctx();
        let (module, kernel) = kernel_module(&mut ctx, loc);
        push_subspan(&mut ctx, loc, kernel, "in", &[Dim::Dynamic]);
        push_return(&mut ctx, loc, kernel);

        let err = lower(&mut ctx, module.op_ref(), GpuBackend::Nvvm, ConversionMode::Full)
            .unwrap_err();
        assert!(matches!(
            err.kind(),
            LegalizationErrorKind::IllegalOperation { name, .. } if name == "hal.interface.binding.subspan"
        ));
        assert_eq!(err.diagnostics().len(), 1);
        assert_eq!(
            err.diagnostics()[0].message,
            "dynamically shaped bindings are not supported"
        );
    }

    #[test]
    fn differently_typed_views_of_one_binding_fail() {
        let (mut ctx, loc) = test_ctx();
        let (module, kernel) = kernel_module(&mut ctx, loc);
        let i32_ty = core::i32(&mut ctx.types);
        push_subspan(&mut ctx, loc, kernel, "in", &[Dim::Static(4)]);
        push_view(&mut ctx, loc, kernel, "in", i32_ty, &[Dim::Static(4)]);
        push_return(&mut ctx, loc, kernel);

        let err = lower(&mut ctx, module.op_ref(), GpuBackend::Nvvm, ConversionMode::Full)
            .unwrap_err();
        assert!(matches!(
            err.kind(),
            LegalizationErrorKind::IllegalOperation { name, .. } if name == "hal.interface.binding.subspan"
        ));
        assert_eq!(
            err.diagnostics()[0].message,
            "binding (set 0, binding 0) is viewed with a different element type"
        );
    }

    #[test]
    fn oversized_static_shape_fails_with_a_remark() {
        let (mut ctx, loc) = test_ctx();
        let (module, kernel) = kernel_module(&mut ctx, loc);
        push_subspan(&mut ctx, loc, kernel, "out", &[Dim::Static(1 << 22); 4]);
        push_return(&mut ctx, loc, kernel);

        let err = lower(&mut ctx, module.op_ref(), GpuBackend::Nvvm, ConversionMode::Full)
            .unwrap_err();
        assert_eq!(err.diagnostics().len(), 1);
        assert_eq!(err.diagnostics()[0].message, "static shape too large");
    }

    #[test]
    fn unknown_binding_is_a_precondition_violation() {
        let (mut ctx, loc) = test_ctx();
        let (module, kernel) = kernel_module(&mut ctx, loc);
        push_subspan(&mut ctx, loc, kernel, "missing", &[Dim::Static(1)]);
        push_return(&mut ctx, loc, kernel);

        let err = lower(&mut ctx, module.op_ref(), GpuBackend::Nvvm, ConversionMode::Full)
            .unwrap_err();
        assert!(matches!(
            err.kind(),
            LegalizationErrorKind::PreconditionViolated { message, .. }
                if message == "binding declaration not found"
        ));
    }

    #[test]
    fn private_kernels_are_not_flattened() {
        let (mut ctx, loc) = test_ctx();
        let (module, kernel) = kernel_module(&mut ctx, loc);
        ctx.set_attr(
            kernel.op_ref(),
            core::ATTR_SYM_VISIBILITY(),
            Some(strata_ir::Attribute::from("private")),
        );
        push_return(&mut ctx, loc, kernel);

        let err = lower(&mut ctx, module.op_ref(), GpuBackend::Nvvm, ConversionMode::Full)
            .unwrap_err();
        assert_eq!(err.op(), Some(kernel.op_ref()));
    }
}

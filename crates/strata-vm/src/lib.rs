//! VM-target lowering.
//!
//! Rewrites nested `core.module`s holding `func`, `arith` and `cf` code into
//! `vm.module`s of 32-bit register instructions. The outermost module is
//! kept as the container of the VM modules.

pub mod passes;
mod type_converter;

use strata_ir::dialect::{core, vm};
use strata_ir::rewrite::{
    ConversionMode, ConversionResult, ConversionSummary, ConversionTarget, Legality, PatternSet,
    apply_conversion,
};
use strata_ir::{DialectOp, IrContext, OpRef};
use tracing::debug;

use passes::arith_to_vm::{
    BINARY_OPS, BinaryToVm, CmpToVm, ConstantToVm, SHIFT_OPS, SelectToVm, ShiftToVm,
};
use passes::cf_to_vm::{BrToVm, CondBrToVm};
use passes::func_to_vm::{CallToVm, FuncToVm, ReturnToVm};
use passes::module_to_vm::{ModuleEndToVm, NestedModuleToVm};

pub use passes::func_to_vm::{ATTR_EXPORT, ATTR_REFLECTION};
pub use type_converter::vm_type_converter;

/// Register every VM lowering pattern.
pub fn populate_patterns(patterns: &mut PatternSet) {
    patterns
        .add(NestedModuleToVm)
        .add(ModuleEndToVm)
        .add(FuncToVm)
        .add(ReturnToVm)
        .add(CallToVm)
        .add(ConstantToVm)
        .add(CmpToVm)
        .add(SelectToVm)
        .add(BrToVm)
        .add(CondBrToVm);
    for (from, to) in BINARY_OPS {
        patterns.add(BinaryToVm { from, to });
    }
    for (from, to) in SHIFT_OPS {
        patterns.add(ShiftToVm { from, to });
    }
}

/// What a lowered module may contain.
///
/// `core` stays legal for the outermost module, but a `core.module` nested
/// in another one and a `core.module_end` closing a `vm.module` must go.
pub fn conversion_target() -> ConversionTarget {
    let mut target = ConversionTarget::new();
    target
        .add_dynamic_check(|ctx, op| {
            let parent = ctx.parent_op(op)?;
            if core::Module::matches(ctx, op) && core::Module::matches(ctx, parent) {
                return Some(Legality::Illegal);
            }
            if core::ModuleEnd::matches(ctx, op) && vm::Module::matches(ctx, parent) {
                return Some(Legality::Illegal);
            }
            None
        })
        .add_legal_dialect("vm")
        .add_legal_dialect("core")
        .add_illegal_dialect("func")
        .add_illegal_dialect("arith")
        .add_illegal_dialect("cf");
    target
}

/// Lower every module nested in `module` to the VM dialect.
pub fn lower(
    ctx: &mut IrContext,
    module: OpRef,
    mode: ConversionMode,
) -> ConversionResult<ConversionSummary> {
    debug_assert!(core::Module::matches(ctx, module));
    debug!("vm lowering");
    let converter = vm_type_converter();
    let mut patterns = PatternSet::new();
    populate_patterns(&mut patterns);
    apply_conversion(ctx, module, &conversion_target(), &patterns, &converter, mode)
}

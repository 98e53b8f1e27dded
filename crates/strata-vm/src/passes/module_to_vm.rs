//! Nested `core.module` → `vm.module`.
//!
//! Only modules nested inside another `core.module` are rewritten; the
//! outermost module stays a `core.module` holding the VM modules. The body
//! blocks move into the new module unchanged, so their terminator is then
//! rewritten separately once it sits under a `vm.module`.

use strata_ir::dialect::{core, vm};
use strata_ir::rewrite::{ConversionPattern, ConversionRewriter, OpAdaptor};
use strata_ir::{DialectOp, OpKind, OpRef, Symbol};
use tracing::debug;

pub struct NestedModuleToVm;

impl ConversionPattern for NestedModuleToVm {
    fn root(&self) -> OpKind {
        core::Module::kind()
    }

    fn match_and_rewrite(
        &self,
        op: OpRef,
        _adaptor: &OpAdaptor,
        rewriter: &mut ConversionRewriter<'_>,
    ) -> bool {
        let ctx = rewriter.ctx();
        let Ok(module) = core::Module::from_op(ctx, op) else {
            return false;
        };
        let nested = ctx
            .parent_op(op)
            .is_some_and(|parent| core::Module::matches(ctx, parent));
        if !nested {
            return false;
        }
        let name = module.sym_name(ctx).unwrap_or_else(|| Symbol::new("module"));
        let location = ctx.op(op).location;
        let old_body = ctx.op(op).regions[0];

        let ctx = rewriter.ctx_mut();
        let body = strata_ir::dialect::empty_region(ctx, location);
        let lowered = vm::module(ctx, location, Some(name), body);
        rewriter.insert(lowered.op_ref());
        rewriter.inline_region_before(old_body, body, None);

        debug!(module = %name, "nested module moved into vm.module");
        rewriter.erase_op(op);
        true
    }
}

/// `core.module_end` inside a `vm.module` → `vm.module_end`.
pub struct ModuleEndToVm;

impl ConversionPattern for ModuleEndToVm {
    fn root(&self) -> OpKind {
        core::ModuleEnd::kind()
    }

    fn match_and_rewrite(
        &self,
        op: OpRef,
        _adaptor: &OpAdaptor,
        rewriter: &mut ConversionRewriter<'_>,
    ) -> bool {
        let ctx = rewriter.ctx();
        let in_vm_module = ctx
            .parent_op(op)
            .is_some_and(|parent| vm::Module::matches(ctx, parent));
        if !in_vm_module {
            return false;
        }
        let location = ctx.op(op).location;
        let end = vm::module_end(rewriter.ctx_mut(), location);
        rewriter.replace_op_with(op, end.op_ref());
        true
    }
}

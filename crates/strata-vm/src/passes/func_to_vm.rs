//! Function-level lowering: `func.func`, `func.return` and `func.call`.
//!
//! A `vm.func` keeps only the reflection metadata and the visibility of its
//! source function; every other attribute is dropped. A function carrying the
//! `export` attribute is also exported, under its own name for a unit marker
//! or under the given string otherwise.

use strata_ir::dialect::{core, func, vm};
use strata_ir::rewrite::{ConversionPattern, ConversionRewriter, OpAdaptor};
use strata_ir::{Attribute, DialectOp, OpKind, OpRef, Symbol, symbols};
use tracing::debug;

symbols! {
    /// Reflection metadata carried through to the VM function.
    ATTR_REFLECTION => "reflection",
    /// Export marker: unit to export under the function name, string to rename.
    ATTR_EXPORT => "export",
}

/// Attributes a `vm.func` inherits from its source function.
fn retained_attributes() -> [Symbol; 2] {
    [ATTR_REFLECTION(), core::ATTR_SYM_VISIBILITY()]
}

pub struct FuncToVm;

impl ConversionPattern for FuncToVm {
    fn root(&self) -> OpKind {
        func::Func::kind()
    }

    fn match_and_rewrite(
        &self,
        op: OpRef,
        _adaptor: &OpAdaptor,
        rewriter: &mut ConversionRewriter<'_>,
    ) -> bool {
        let ctx = rewriter.ctx();
        let Ok(source) = func::Func::from_op(ctx, op) else {
            return false;
        };
        let (Some(name), Some(signature)) = (source.sym_name(ctx), source.signature(ctx)) else {
            return false;
        };
        let location = ctx.op(op).location;
        let old_body = source.body(ctx);
        let attrs: Vec<(Symbol, Attribute)> = retained_attributes()
            .into_iter()
            .filter_map(|key| Some((key, ctx.op_attr(op, key)?.clone())))
            .collect();
        let export_name = ctx.op_attr(op, ATTR_EXPORT()).map(|attr| match attr.as_str() {
            Some(renamed) => renamed.to_owned(),
            None => name.to_string(),
        });

        let Some(conversion) = rewriter.convert_signature(&signature.inputs) else {
            return false;
        };
        let Some(results) = rewriter.convert_types(&signature.results) else {
            return false;
        };

        let ctx = rewriter.ctx_mut();
        let fn_ty = core::fn_type(&mut ctx.types, conversion.converted_types(), &results);
        let body = strata_ir::dialect::empty_region(ctx, location);
        let lowered = vm::func(ctx, location, name, fn_ty, body, attrs);
        rewriter.insert(lowered.op_ref());
        rewriter.inline_region_before(old_body, body, None);
        if !rewriter.convert_region_types(body, Some(&conversion)) {
            return false;
        }

        if let Some(export_name) = export_name {
            debug!(function = %name, %export_name, "exporting vm function");
            let export = vm::export(rewriter.ctx_mut(), location, name, export_name);
            rewriter.set_insertion_point_after(lowered.op_ref());
            rewriter.insert(export.op_ref());
        }
        rewriter.erase_op(op);
        true
    }
}

/// `func.return` → `vm.return`.
pub struct ReturnToVm;

impl ConversionPattern for ReturnToVm {
    fn root(&self) -> OpKind {
        func::Return::kind()
    }

    fn match_and_rewrite(
        &self,
        op: OpRef,
        adaptor: &OpAdaptor,
        rewriter: &mut ConversionRewriter<'_>,
    ) -> bool {
        let location = rewriter.ctx().op(op).location;
        let ret = vm::r#return(rewriter.ctx_mut(), location, adaptor.operands());
        rewriter.replace_op_with(op, ret.op_ref());
        true
    }
}

/// `func.call` → `vm.call`, with the declared result types converted.
pub struct CallToVm;

impl ConversionPattern for CallToVm {
    fn root(&self) -> OpKind {
        func::Call::kind()
    }

    fn match_and_rewrite(
        &self,
        op: OpRef,
        adaptor: &OpAdaptor,
        rewriter: &mut ConversionRewriter<'_>,
    ) -> bool {
        let ctx = rewriter.ctx();
        let Some(callee) = func::Call::from_op(ctx, op)
            .ok()
            .and_then(|call| call.callee(ctx))
        else {
            return false;
        };
        let location = ctx.op(op).location;
        let result_types = ctx.op_result_types(op).to_vec();
        let Some(results) = rewriter.convert_types(&result_types) else {
            return false;
        };
        let call = vm::call(
            rewriter.ctx_mut(),
            location,
            callee,
            adaptor.operands(),
            &results,
        );
        rewriter.replace_op_with(op, call.op_ref());
        true
    }
}

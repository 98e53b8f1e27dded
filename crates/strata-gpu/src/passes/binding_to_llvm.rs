//! `hal.interface.binding.subspan` → memref descriptor built from a kernel argument.
//!
//! The binding reference is resolved to its declaration, whose
//! `(set, binding)` pair selects the argument of the enclosing flattened
//! `llvm.func`. For a statically shaped view the descriptor is assembled
//! in place:
//!
//! ```text
//! %d0 = llvm.undef
//! %d1 = llvm.insertvalue %d0, %arg {position = [0]}   // allocated
//! %d2 = llvm.insertvalue %d1, %arg {position = [1]}   // aligned
//! %d3 = llvm.insertvalue %d2, %zero {position = [2]}  // offset
//! ...sizes at [3, i], row-major strides at [4, i]
//! ```
//!
//! Dynamically shaped views are not supported yet, nor are views whose
//! element type differs from the one the kernel argument was created for.

use smallvec::SmallVec;
use strata_ir::dialect::{hal, llvm, memref};
use strata_ir::rewrite::{ConversionPattern, ConversionRewriter, OpAdaptor};
use strata_ir::symbol_table::lookup_nearest_symbol;
use strata_ir::{DialectOp, OpKind, OpRef, ValueRef, walk};

use super::func_to_llvm::binding_argument;
use crate::type_converter::element_pointer;

pub struct LowerBindingSubspan;

impl ConversionPattern for LowerBindingSubspan {
    fn root(&self) -> OpKind {
        hal::BindingSubspan::kind()
    }

    fn match_and_rewrite(
        &self,
        op: OpRef,
        _adaptor: &OpAdaptor,
        rewriter: &mut ConversionRewriter<'_>,
    ) -> bool {
        let ctx = rewriter.ctx();
        let Ok(subspan) = hal::BindingSubspan::from_op(ctx, op) else {
            return false;
        };
        let decl = subspan
            .binding_ref(ctx)
            .and_then(|path| lookup_nearest_symbol(ctx, op, &path))
            .and_then(|decl| hal::InterfaceBinding::from_op(ctx, decl).ok());
        let Some(decl) = decl else {
            rewriter.precondition_failed(op, "binding declaration not found");
            return false;
        };
        let (Some(set), Some(binding)) = (decl.set(ctx), decl.binding(ctx)) else {
            rewriter.precondition_failed(op, "binding declaration lacks `set` or `binding`");
            return false;
        };

        // the kernel must already be flattened
        let Some(kernel) = walk::find_ancestor(ctx, op, |p| llvm::Func::matches(ctx, p)) else {
            return false;
        };
        let Some(index) = binding_argument(ctx, kernel, set, binding) else {
            rewriter.precondition_failed(
                op,
                format!("kernel has no argument for set {set}, binding {binding}"),
            );
            return false;
        };
        let Some(entry) = strata_ir::dialect::entry_block(ctx, kernel, 0) else {
            return false;
        };
        let pointer = ctx.block_arg(entry, index as u32);

        let view_ty = subspan.result_type(ctx);
        let Some(view) = memref::memref_type(&ctx.types, view_ty) else {
            return false;
        };
        let Some(shape) = view.static_shape() else {
            rewriter.emit_remark(op, "dynamically shaped bindings are not supported");
            return false;
        };
        let Some((sizes, strides)) = static_layout(&shape) else {
            rewriter.emit_remark(op, "static shape too large");
            return false;
        };
        let pointer_ty = rewriter.ctx().value_ty(pointer);
        if element_pointer(&mut rewriter.ctx_mut().types, &view) != Some(pointer_ty) {
            rewriter.emit_remark(
                op,
                format!("binding (set {set}, binding {binding}) is viewed with a different element type"),
            );
            return false;
        }
        let Some(descriptor_ty) = rewriter.convert_type(view_ty) else {
            return false;
        };

        let location = rewriter.ctx().op(op).location;
        let i64_ty = llvm::index_type(&mut rewriter.ctx_mut().types);

        let undef = llvm::undef(rewriter.ctx_mut(), location, descriptor_ty).op_ref();
        rewriter.insert(undef);
        let mut descriptor = rewriter.ctx().op_result(undef, 0);

        let mut insert_field = |rewriter: &mut ConversionRewriter<'_>, value: ValueRef, position: &[u64]| {
            let field = llvm::insertvalue(rewriter.ctx_mut(), location, descriptor, value, position);
            rewriter.insert(field.op_ref());
            descriptor = rewriter.ctx().op_result(field.op_ref(), 0);
        };

        insert_field(rewriter, pointer, &[0]);
        insert_field(rewriter, pointer, &[1]);

        let constant = |rewriter: &mut ConversionRewriter<'_>, value: i64| -> ValueRef {
            let c = llvm::constant(rewriter.ctx_mut(), location, i64_ty, value).op_ref();
            rewriter.insert(c);
            rewriter.ctx().op_result(c, 0)
        };

        let offset = constant(rewriter, 0);
        insert_field(rewriter, offset, &[2]);

        for (i, &size) in sizes.iter().enumerate() {
            let size = constant(rewriter, size);
            insert_field(rewriter, size, &[3, i as u64]);
        }
        for (i, &stride) in strides.iter().enumerate() {
            let stride = constant(rewriter, stride);
            insert_field(rewriter, stride, &[4, i as u64]);
        }

        rewriter.replace_op(op, &[descriptor]);
        true
    }
}

type Extents = SmallVec<[i64; 4]>;

/// Sizes and row-major strides of a static shape, or `None` if any of them
/// does not fit in an `i64`.
fn static_layout(shape: &[u64]) -> Option<(Extents, Extents)> {
    let sizes = shape
        .iter()
        .map(|&dim| i64::try_from(dim).ok())
        .collect::<Option<Extents>>()?;
    let mut strides: Extents = SmallVec::from_elem(1, sizes.len());
    for i in (0..sizes.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1].checked_mul(sizes[i + 1])?;
    }
    Some((sizes, strides))
}

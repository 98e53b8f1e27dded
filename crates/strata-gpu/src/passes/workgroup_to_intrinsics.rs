//! Workgroup queries → backend intrinsics.
//!
//! `hal.interface.workgroup.{id,count,size} {dimension = d}` reads a 32-bit
//! special register of the selected backend for axis `d`, then sign-extends
//! it to the 64-bit integer an index converts to.

use strata_ir::dialect::hal::{self, WorkgroupQuery};
use strata_ir::dialect::{llvm, nvvm, rocdl};
use strata_ir::rewrite::{ConversionPattern, ConversionRewriter, OpAdaptor};
use strata_ir::{DialectOp, OpKind, OpRef};

use crate::GpuBackend;

/// Intrinsic names for each axis of a query.
fn intrinsics(backend: GpuBackend, query: WorkgroupQuery) -> &'static [&'static str; 3] {
    match (backend, query) {
        (GpuBackend::Nvvm, WorkgroupQuery::Id) => &nvvm::BLOCK_ID,
        (GpuBackend::Nvvm, WorkgroupQuery::Count) => &nvvm::GRID_DIM,
        (GpuBackend::Nvvm, WorkgroupQuery::Size) => &nvvm::BLOCK_DIM,
        (GpuBackend::Rocdl, WorkgroupQuery::Id) => &rocdl::BLOCK_ID,
        (GpuBackend::Rocdl, WorkgroupQuery::Count) => &rocdl::GRID_DIM,
        (GpuBackend::Rocdl, WorkgroupQuery::Size) => &rocdl::BLOCK_DIM,
    }
}

pub struct LowerWorkgroupQuery {
    pub query: WorkgroupQuery,
    pub backend: GpuBackend,
}

impl ConversionPattern for LowerWorkgroupQuery {
    fn root(&self) -> OpKind {
        self.query.kind()
    }

    fn match_and_rewrite(
        &self,
        op: OpRef,
        _adaptor: &OpAdaptor,
        rewriter: &mut ConversionRewriter<'_>,
    ) -> bool {
        let ctx = rewriter.ctx();
        let location = ctx.op(op).location;
        let Some(&result_ty) = ctx.op_result_types(op).first() else {
            return false;
        };
        let Some(dimension) = hal::workgroup_dimension(ctx, op) else {
            return false;
        };
        let Some(&name) = usize::try_from(dimension)
            .ok()
            .and_then(|axis| intrinsics(self.backend, self.query).get(axis))
        else {
            rewriter.emit_remark(op, format!("workgroup dimension {dimension} is out of range"));
            return false;
        };
        let Some(wide_ty) = rewriter.convert_type(result_ty) else {
            return false;
        };

        let ctx = rewriter.ctx_mut();
        let read = match self.backend {
            GpuBackend::Nvvm => nvvm::sreg(ctx, location, name),
            GpuBackend::Rocdl => rocdl::query(ctx, location, name),
        };
        rewriter.insert(read);
        let narrow = rewriter.ctx().op_result(read, 0);
        let extended = llvm::sext(rewriter.ctx_mut(), location, narrow, wide_ty).op_ref();
        rewriter.insert(extended);
        let value = rewriter.ctx().op_result(extended, 0);
        rewriter.replace_op(op, &[value]);
        true
    }
}

//! `func.return` → `llvm.return`.

use strata_ir::dialect::{func, llvm};
use strata_ir::rewrite::{ConversionPattern, ConversionRewriter, OpAdaptor};
use strata_ir::{DialectOp, OpKind, OpRef};

pub struct LowerReturn;

impl ConversionPattern for LowerReturn {
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
        let ret = llvm::r#return(rewriter.ctx_mut(), location, adaptor.operands());
        rewriter.replace_op_with(op, ret.op_ref());
        true
    }
}

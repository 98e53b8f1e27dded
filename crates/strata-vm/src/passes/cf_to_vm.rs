//! `cf` branches → `vm` branches.

use strata_ir::dialect::{cf, vm};
use strata_ir::rewrite::{ConversionPattern, ConversionRewriter, OpAdaptor};
use strata_ir::{DialectOp, OpKind, OpRef};

pub struct BrToVm;

impl ConversionPattern for BrToVm {
    fn root(&self) -> OpKind {
        cf::Br::kind()
    }

    fn match_and_rewrite(
        &self,
        op: OpRef,
        adaptor: &OpAdaptor,
        rewriter: &mut ConversionRewriter<'_>,
    ) -> bool {
        let ctx = rewriter.ctx();
        let Ok(br) = cf::Br::from_op(ctx, op) else {
            return false;
        };
        let dest = br.dest(ctx);
        let location = ctx.op(op).location;
        let lowered = vm::br(rewriter.ctx_mut(), location, dest, adaptor.operands());
        rewriter.replace_op_with(op, lowered.op_ref());
        true
    }
}

/// `cf.cond_br` → `vm.cond_br`. The operands after the condition are split
/// by the argument count of the true destination.
pub struct CondBrToVm;

impl ConversionPattern for CondBrToVm {
    fn root(&self) -> OpKind {
        cf::CondBr::kind()
    }

    fn match_and_rewrite(
        &self,
        op: OpRef,
        adaptor: &OpAdaptor,
        rewriter: &mut ConversionRewriter<'_>,
    ) -> bool {
        let ctx = rewriter.ctx();
        let Ok(branch) = cf::CondBr::from_op(ctx, op) else {
            return false;
        };
        let (true_dest, false_dest) = (branch.true_dest(ctx), branch.false_dest(ctx));
        let Some((&condition, rest)) = adaptor.operands().split_first() else {
            return false;
        };
        let true_len = ctx.block(true_dest).args.len();
        if rest.len() < true_len {
            return false;
        }
        let (true_args, false_args) = rest.split_at(true_len);
        let location = ctx.op(op).location;
        let lowered = vm::cond_br(
            rewriter.ctx_mut(),
            location,
            condition,
            true_dest,
            true_args,
            false_dest,
            false_args,
        );
        rewriter.replace_op_with(op, lowered.op_ref());
        true
    }
}

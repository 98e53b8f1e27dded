//! `arith` → 32-bit VM instructions.
//!
//! Binary operations, shifts and comparisons are driven by name tables: one
//! pattern instance per source operation, each carrying the VM instruction
//! it lowers to.

use strata_ir::dialect::arith::{self, CmpPredicate};
use strata_ir::dialect::{core, vm};
use strata_ir::rewrite::{ConversionPattern, ConversionRewriter, OpAdaptor};
use strata_ir::{DialectOp, IrContext, OpKind, OpRef, ValueRef};

/// Width of every VM integer register.
const REGISTER_BITS: u32 = 32;

/// `arith.<op>` → `vm.<op>` for the plain two-operand instructions.
pub const BINARY_OPS: [(&str, &str); 10] = [
    ("addi", "add.i32"),
    ("subi", "sub.i32"),
    ("muli", "mul.i32"),
    ("divsi", "div.i32.s"),
    ("divui", "div.i32.u"),
    ("remsi", "rem.i32.s"),
    ("remui", "rem.i32.u"),
    ("andi", "and.i32"),
    ("ori", "or.i32"),
    ("xori", "xor.i32"),
];

pub const SHIFT_OPS: [(&str, &str); 3] = [
    ("shli", "shl.i32"),
    ("shrsi", "shr.i32.s"),
    ("shrui", "shr.i32.u"),
];

/// VM comparison for an integer predicate. Signedness is never substituted.
pub fn cmp_instruction(predicate: CmpPredicate) -> &'static str {
    match predicate {
        CmpPredicate::Eq => "cmp.eq.i32",
        CmpPredicate::Ne => "cmp.ne.i32",
        CmpPredicate::Slt => "cmp.lt.i32.s",
        CmpPredicate::Sle => "cmp.lte.i32.s",
        CmpPredicate::Sgt => "cmp.gt.i32.s",
        CmpPredicate::Sge => "cmp.gte.i32.s",
        CmpPredicate::Ult => "cmp.lt.i32.u",
        CmpPredicate::Ule => "cmp.lte.i32.u",
        CmpPredicate::Ugt => "cmp.gt.i32.u",
        CmpPredicate::Uge => "cmp.gte.i32.u",
    }
}

/// Compile-time value of `value`, whether still an `arith.constant` or
/// already lowered to a VM constant.
fn constant_operand(ctx: &IrContext, value: ValueRef) -> Option<i64> {
    let def = ctx.value_def(value).defining_op()?;
    arith::constant_value(ctx, def).or_else(|| vm::constant_value(ctx, def))
}

/// `arith.constant` → `vm.const.i32` (or `vm.const.i32.zero`).
///
/// Only `i1` and `i32` constants are supported; `true` becomes -1.
pub struct ConstantToVm;

impl ConversionPattern for ConstantToVm {
    fn root(&self) -> OpKind {
        arith::Constant::kind()
    }

    fn match_and_rewrite(
        &self,
        op: OpRef,
        _adaptor: &OpAdaptor,
        rewriter: &mut ConversionRewriter<'_>,
    ) -> bool {
        let ctx = rewriter.ctx();
        let Ok(constant) = arith::Constant::from_op(ctx, op) else {
            return false;
        };
        let Some(&ty) = ctx.op_result_types(op).first() else {
            return false;
        };
        let Some(width) = core::int_width(&ctx.types, ty) else {
            rewriter.emit_remark(op, "unsupported const type for dialect");
            return false;
        };
        if width != 1 && width != REGISTER_BITS {
            rewriter.emit_remark(op, "unsupported bit width for dialect constant");
            return false;
        }
        let Some(value) = constant.value(ctx) else {
            return false;
        };
        let value = if width == 1 {
            // sign-extend the single bit: true is all ones
            -((value & 1) as i32)
        } else {
            // keep the low 32 bits
            value as i32
        };

        let location = ctx.op(op).location;
        let ctx = rewriter.ctx_mut();
        let lowered = if value == 0 {
            vm::const_i32_zero(ctx, location).op_ref()
        } else {
            vm::const_i32(ctx, location, value).op_ref()
        };
        rewriter.replace_op_with(op, lowered);
        true
    }
}

/// Table-driven two-operand lowering.
pub struct BinaryToVm {
    pub from: &'static str,
    pub to: &'static str,
}

impl ConversionPattern for BinaryToVm {
    fn root(&self) -> OpKind {
        OpKind::new("arith", self.from)
    }

    fn match_and_rewrite(
        &self,
        op: OpRef,
        adaptor: &OpAdaptor,
        rewriter: &mut ConversionRewriter<'_>,
    ) -> bool {
        let (Some(lhs), Some(rhs)) = (adaptor.operand(0), adaptor.operand(1)) else {
            return false;
        };
        let ctx = rewriter.ctx();
        let location = ctx.op(op).location;
        let Some(&ty) = ctx.op_result_types(op).first() else {
            return false;
        };
        if rewriter.convert_type(ty).is_none() {
            return false;
        }
        let lowered = vm::binary(rewriter.ctx_mut(), location, self.to, lhs, rhs);
        rewriter.replace_op_with(op, lowered);
        true
    }
}

/// Shift by a constant amount.
///
/// The shifted value must be exactly `i32` and the amount a constant no
/// larger than 32; anything else is left unconverted.
pub struct ShiftToVm {
    pub from: &'static str,
    pub to: &'static str,
}

impl ConversionPattern for ShiftToVm {
    fn root(&self) -> OpKind {
        OpKind::new("arith", self.from)
    }

    fn match_and_rewrite(
        &self,
        op: OpRef,
        adaptor: &OpAdaptor,
        rewriter: &mut ConversionRewriter<'_>,
    ) -> bool {
        let (Some(value), Some(amount)) = (adaptor.operand(0), adaptor.operand(1)) else {
            return false;
        };
        let ctx = rewriter.ctx();
        let location = ctx.op(op).location;
        let Some(&ty) = ctx.op_result_types(op).first() else {
            return false;
        };
        if core::int_width(&ctx.types, ty) != Some(REGISTER_BITS) {
            rewriter.emit_remark(op, "only 32-bit shifts are supported");
            return false;
        }
        let amount = constant_operand(ctx, amount)
            .and_then(|amount| u8::try_from(amount).ok())
            .filter(|&amount| u32::from(amount) <= REGISTER_BITS);
        let Some(amount) = amount else {
            rewriter.emit_remark(
                op,
                format!("shift amount must be a constant between 0 and {REGISTER_BITS}"),
            );
            return false;
        };

        let lowered = vm::shift(rewriter.ctx_mut(), location, self.to, value, amount);
        rewriter.replace_op_with(op, lowered);
        true
    }
}

/// `arith.cmpi` → the matching `vm.cmp.*.i32`.
pub struct CmpToVm;

impl ConversionPattern for CmpToVm {
    fn root(&self) -> OpKind {
        arith::CmpI::kind()
    }

    fn match_and_rewrite(
        &self,
        op: OpRef,
        adaptor: &OpAdaptor,
        rewriter: &mut ConversionRewriter<'_>,
    ) -> bool {
        let ctx = rewriter.ctx();
        let Some(predicate) = arith::CmpI::from_op(ctx, op)
            .ok()
            .and_then(|cmp| cmp.predicate(ctx))
        else {
            return false;
        };
        let (Some(lhs), Some(rhs)) = (adaptor.operand(0), adaptor.operand(1)) else {
            return false;
        };
        let location = ctx.op(op).location;
        let lowered = vm::binary(
            rewriter.ctx_mut(),
            location,
            cmp_instruction(predicate),
            lhs,
            rhs,
        );
        rewriter.replace_op_with(op, lowered);
        true
    }
}

/// `arith.select` → `vm.select.i32`, once the selected values are `i32`.
pub struct SelectToVm;

impl ConversionPattern for SelectToVm {
    fn root(&self) -> OpKind {
        arith::Select::kind()
    }

    fn match_and_rewrite(
        &self,
        op: OpRef,
        adaptor: &OpAdaptor,
        rewriter: &mut ConversionRewriter<'_>,
    ) -> bool {
        let [cond, true_value, false_value] = adaptor.operands() else {
            return false;
        };
        let (cond, true_value, false_value) = (*cond, *true_value, *false_value);
        let ctx = rewriter.ctx();
        let location = ctx.op(op).location;
        if core::int_width(&ctx.types, ctx.value_ty(true_value)) != Some(REGISTER_BITS) {
            return false;
        }
        let select = vm::select_i32(rewriter.ctx_mut(), location, cond, true_value, false_value);
        rewriter.replace_op_with(op, select.op_ref());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparisons_keep_their_signedness() {
        for predicate in CmpPredicate::ALL {
            let name = cmp_instruction(predicate);
            let expected_suffix = match predicate {
                CmpPredicate::Eq | CmpPredicate::Ne => ".i32",
                CmpPredicate::Slt | CmpPredicate::Sle | CmpPredicate::Sgt | CmpPredicate::Sge => {
                    ".i32.s"
                }
                CmpPredicate::Ult | CmpPredicate::Ule | CmpPredicate::Ugt | CmpPredicate::Uge => {
                    ".i32.u"
                }
            };
            assert!(name.ends_with(expected_suffix), "{predicate:?} -> {name}");
        }
        assert_eq!(cmp_instruction(CmpPredicate::Ule), "cmp.lte.i32.u");
        assert_eq!(cmp_instruction(CmpPredicate::Sle), "cmp.lte.i32.s");
    }

    #[test]
    fn every_comparison_has_a_distinct_instruction() {
        let mut names: Vec<_> = CmpPredicate::ALL.into_iter().map(cmp_instruction).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), CmpPredicate::ALL.len());
    }
}

//! `arith` dialect: signless integer arithmetic, comparison and select.

use crate::context::{IrContext, OperationDataBuilder};
use crate::dialect::core;
use crate::location::Location;
use crate::ops::DialectOp;
use crate::refs::{TypeRef, ValueRef};
use crate::symbol::Symbol;
use crate::types::Attribute;
use crate::{define_op, symbols};

symbols! {
    DIALECT_NAME => "arith",
    ATTR_VALUE => "value",
    ATTR_PREDICATE => "predicate",
}

define_op! {
    /// `arith.constant`: an integer constant of the result type.
    Constant = "arith" . "constant"
}

impl Constant {
    pub fn value(&self, ctx: &IrContext) -> Option<i64> {
        ctx.op_attr(self.0, ATTR_VALUE())?.as_int()
    }
}

pub fn constant(ctx: &mut IrContext, location: Location, ty: TypeRef, value: i64) -> Constant {
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), Symbol::new("constant"))
        .result(ty)
        .attr(ATTR_VALUE(), Attribute::from(value))
        .build(ctx);
    Constant(ctx.create_op(data))
}

/// Create a two-operand arith op whose result has the type of `lhs`.
fn binary(
    ctx: &mut IrContext,
    location: Location,
    name: &'static str,
    lhs: ValueRef,
    rhs: ValueRef,
) -> crate::OpRef {
    let ty = ctx.value_ty(lhs);
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), Symbol::new(name))
        .operand(lhs)
        .operand(rhs)
        .result(ty)
        .build(ctx);
    ctx.create_op(data)
}

macro_rules! binary_ops {
    ($($(#[$meta:meta])* $ty:ident, $ctor:ident => $name:literal;)*) => {
        $(
            define_op! { $(#[$meta])* $ty = "arith" . $name }

            impl $ty {
                pub fn lhs(&self, ctx: &IrContext) -> ValueRef {
                    ctx.op_operands(self.0)[0]
                }

                pub fn rhs(&self, ctx: &IrContext) -> ValueRef {
                    ctx.op_operands(self.0)[1]
                }
            }

            pub fn $ctor(
                ctx: &mut IrContext,
                location: Location,
                lhs: ValueRef,
                rhs: ValueRef,
            ) -> $ty {
                $ty(binary(ctx, location, $name, lhs, rhs))
            }
        )*
    };
}

binary_ops! {
    AddI, addi => "addi";
    SubI, subi => "subi";
    MulI, muli => "muli";
    DivSI, divsi => "divsi";
    DivUI, divui => "divui";
    RemSI, remsi => "remsi";
    RemUI, remui => "remui";
    AndI, andi => "andi";
    OrI, ori => "ori";
    XOrI, xori => "xori";
    /// Left shift. The second operand is the shift amount.
    ShLI, shli => "shli";
    /// Arithmetic right shift.
    ShRSI, shrsi => "shrsi";
    /// Logical right shift.
    ShRUI, shrui => "shrui";
}

/// Integer comparison predicates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CmpPredicate {
    Eq,
    Ne,
    Slt,
    Sle,
    Sgt,
    Sge,
    Ult,
    Ule,
    Ugt,
    Uge,
}

impl CmpPredicate {
    pub const ALL: [CmpPredicate; 10] = [
        CmpPredicate::Eq,
        CmpPredicate::Ne,
        CmpPredicate::Slt,
        CmpPredicate::Sle,
        CmpPredicate::Sgt,
        CmpPredicate::Sge,
        CmpPredicate::Ult,
        CmpPredicate::Ule,
        CmpPredicate::Ugt,
        CmpPredicate::Uge,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CmpPredicate::Eq => "eq",
            CmpPredicate::Ne => "ne",
            CmpPredicate::Slt => "slt",
            CmpPredicate::Sle => "sle",
            CmpPredicate::Sgt => "sgt",
            CmpPredicate::Sge => "sge",
            CmpPredicate::Ult => "ult",
            CmpPredicate::Ule => "ule",
            CmpPredicate::Ugt => "ugt",
            CmpPredicate::Uge => "uge",
        }
    }

    pub fn from_symbol(sym: Symbol) -> Option<Self> {
        Self::ALL.into_iter().find(|p| sym == p.as_str())
    }
}

define_op! {
    /// `arith.cmpi {predicate}`: integer comparison producing `core.i1`.
    CmpI = "arith" . "cmpi"
}

impl CmpI {
    pub fn predicate(&self, ctx: &IrContext) -> Option<CmpPredicate> {
        CmpPredicate::from_symbol(ctx.op_attr(self.0, ATTR_PREDICATE())?.as_symbol()?)
    }
}

pub fn cmpi(
    ctx: &mut IrContext,
    location: Location,
    predicate: CmpPredicate,
    lhs: ValueRef,
    rhs: ValueRef,
) -> CmpI {
    let i1 = core::i1(&mut ctx.types);
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), Symbol::new("cmpi"))
        .operand(lhs)
        .operand(rhs)
        .result(i1)
        .attr(
            ATTR_PREDICATE(),
            Attribute::Symbol(Symbol::new(predicate.as_str())),
        )
        .build(ctx);
    CmpI(ctx.create_op(data))
}

define_op! {
    /// `arith.select`: `cond ? true_value : false_value`.
    Select = "arith" . "select"
}

pub fn select(
    ctx: &mut IrContext,
    location: Location,
    cond: ValueRef,
    true_value: ValueRef,
    false_value: ValueRef,
) -> Select {
    let ty = ctx.value_ty(true_value);
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), Symbol::new("select"))
        .operands([cond, true_value, false_value])
        .result(ty)
        .build(ctx);
    Select(ctx.create_op(data))
}

/// The constant an operation materializes, if it is an `arith.constant`.
pub fn constant_value(ctx: &IrContext, op: crate::OpRef) -> Option<i64> {
    Constant::from_op(ctx, op).ok()?.value(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Span;

    #[test]
    fn predicates_round_trip_through_symbols() {
        for pred in CmpPredicate::ALL {
            assert_eq!(
                CmpPredicate::from_symbol(Symbol::new(pred.as_str())),
                Some(pred)
            );
        }
        assert_eq!(CmpPredicate::from_symbol(Symbol::new("oeq")), None);
    }

    #[test]
    fn binary_result_follows_lhs_type() {
        let mut ctx = IrContext::new();
        let path = ctx.paths.intern("a.mlir");
        let loc = Location::new(path, Span::default());
        let i32_ty = core::i32(&mut ctx.types);
        let a = constant(&mut ctx, loc, i32_ty, 5);
        let b = constant(&mut ctx, loc, i32_ty, 7);
        let va = ctx.op_result(a.op_ref(), 0);
        let vb = ctx.op_result(b.op_ref(), 0);

        let add = addi(&mut ctx, loc, va, vb);

        assert_eq!(ctx.op_result_types(add.op_ref()), &[i32_ty]);
        assert_eq!(add.lhs(&ctx), va);
        assert_eq!(add.rhs(&ctx), vb);
        assert_eq!(constant_value(&ctx, b.op_ref()), Some(7));
        assert_eq!(constant_value(&ctx, add.op_ref()), None);
    }
}

//! `cf` dialect: unstructured branches between blocks.

use crate::context::{IrContext, OperationDataBuilder};
use crate::location::Location;
use crate::refs::{BlockRef, ValueRef};
use crate::symbol::Symbol;
use crate::{define_op, symbols};

symbols! {
    DIALECT_NAME => "cf",
}

define_op! {
    /// `cf.br`: jump to the single successor, passing every operand as a block argument.
    Br = "cf" . "br"
}

impl Br {
    pub fn dest(&self, ctx: &IrContext) -> BlockRef {
        ctx.op(self.0).successors[0]
    }
}

pub fn br(ctx: &mut IrContext, location: Location, dest: BlockRef, args: &[ValueRef]) -> Br {
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), Symbol::new("br"))
        .operands(args.iter().copied())
        .successor(dest)
        .build(ctx);
    Br(ctx.create_op(data))
}

define_op! {
    /// `cf.cond_br`: operands are the condition, then the true destination's
    /// arguments, then the false destination's arguments.
    CondBr = "cf" . "cond_br"
}

impl CondBr {
    pub fn condition(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.0)[0]
    }

    pub fn true_dest(&self, ctx: &IrContext) -> BlockRef {
        ctx.op(self.0).successors[0]
    }

    pub fn false_dest(&self, ctx: &IrContext) -> BlockRef {
        ctx.op(self.0).successors[1]
    }
}

pub fn cond_br(
    ctx: &mut IrContext,
    location: Location,
    condition: ValueRef,
    true_dest: BlockRef,
    true_args: &[ValueRef],
    false_dest: BlockRef,
    false_args: &[ValueRef],
) -> CondBr {
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), Symbol::new("cond_br"))
        .operand(condition)
        .operands(true_args.iter().copied())
        .operands(false_args.iter().copied())
        .successor(true_dest)
        .successor(false_dest)
        .build(ctx);
    CondBr(ctx.create_op(data))
}

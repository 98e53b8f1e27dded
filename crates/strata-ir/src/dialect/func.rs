//! `func` dialect: functions, calls and returns.

use crate::context::{IrContext, OperationDataBuilder};
use crate::dialect::core;
use crate::location::Location;
use crate::refs::{BlockRef, RegionRef, TypeRef, ValueRef};
use crate::symbol::Symbol;
use crate::types::Attribute;
use crate::{define_op, symbols};

symbols! {
    DIALECT_NAME => "func",
    ATTR_FUNCTION_TYPE => "function_type",
    ATTR_CALLEE => "callee",
}

define_op! {
    /// `func.func`: a named function with one body region.
    Func = "func" . "func"
}

impl Func {
    pub fn sym_name(&self, ctx: &IrContext) -> Option<Symbol> {
        ctx.op_attr(self.0, core::ATTR_SYM_NAME())?.as_symbol()
    }

    pub fn function_type(&self, ctx: &IrContext) -> Option<TypeRef> {
        ctx.op_attr(self.0, ATTR_FUNCTION_TYPE())?.as_type()
    }

    pub fn signature(&self, ctx: &IrContext) -> Option<core::FnSignature> {
        core::fn_signature(&ctx.types, self.function_type(ctx)?)
    }

    /// Visibility, defaulting to public when unset.
    pub fn is_public(&self, ctx: &IrContext) -> bool {
        match ctx.op_attr(self.0, core::ATTR_SYM_VISIBILITY()) {
            None => true,
            Some(attr) => attr.as_str() == Some("public"),
        }
    }

    pub fn body(&self, ctx: &IrContext) -> RegionRef {
        ctx.op(self.0).regions[0]
    }

    pub fn entry_block(&self, ctx: &IrContext) -> Option<BlockRef> {
        super::entry_block(ctx, self.0, 0)
    }
}

/// Create a function whose entry block takes `inputs` as arguments.
pub fn func(
    ctx: &mut IrContext,
    location: Location,
    name: Symbol,
    inputs: &[TypeRef],
    results: &[TypeRef],
) -> Func {
    let fn_ty = core::fn_type(&mut ctx.types, inputs, results);
    let (region, _) = super::region_with_entry(ctx, location, inputs.iter().copied());
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), Symbol::new("func"))
        .attr(core::ATTR_SYM_NAME(), Attribute::Symbol(name))
        .attr(ATTR_FUNCTION_TYPE(), Attribute::Type(fn_ty))
        .region(region)
        .build(ctx);
    Func(ctx.create_op(data))
}

define_op! {
    /// `func.return`
    Return = "func" . "return"
}

pub fn r#return(ctx: &mut IrContext, location: Location, values: &[ValueRef]) -> Return {
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), Symbol::new("return"))
        .operands(values.iter().copied())
        .build(ctx);
    Return(ctx.create_op(data))
}

define_op! {
    /// `func.call`: direct call to a symbol.
    Call = "func" . "call"
}

impl Call {
    pub fn callee(&self, ctx: &IrContext) -> Option<Symbol> {
        ctx.op_attr(self.0, ATTR_CALLEE())?.as_symbol()
    }
}

pub fn call(
    ctx: &mut IrContext,
    location: Location,
    callee: Symbol,
    args: &[ValueRef],
    results: &[TypeRef],
) -> Call {
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), Symbol::new("call"))
        .operands(args.iter().copied())
        .results(results.iter().copied())
        .attr(ATTR_CALLEE(), Attribute::Symbol(callee))
        .build(ctx);
    Call(ctx.create_op(data))
}

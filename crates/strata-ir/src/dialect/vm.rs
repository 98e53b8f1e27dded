//! `vm` dialect: a register VM with 32-bit integer instructions.
//!
//! All integer values are `core.i32`; comparisons yield `core.i32` booleans.

use crate::context::{IrContext, OperationDataBuilder};
use crate::dialect::core;
use crate::location::Location;
use crate::ops::DialectOp;
use crate::refs::{BlockRef, OpRef, RegionRef, TypeRef, ValueRef};
use crate::symbol::Symbol;
use crate::types::Attribute;
use crate::{define_op, symbols};

symbols! {
    DIALECT_NAME => "vm",
    ATTR_FUNCTION_TYPE => "function_type",
    ATTR_FUNCTION_REF => "function_ref",
    ATTR_EXPORT_NAME => "export_name",
    ATTR_CALLEE => "callee",
    ATTR_VALUE => "value",
    ATTR_AMOUNT => "amount",
}

// ============================================================================
// Structure
// ============================================================================

define_op! {
    /// `vm.module`: container for VM functions, ends in `vm.module_end`.
    Module = "vm" . "module"
}

impl Module {
    pub fn body(&self, ctx: &IrContext) -> Option<BlockRef> {
        super::entry_block(ctx, self.0, 0)
    }
}

/// Create a module around an existing (typically empty) region.
pub fn module(
    ctx: &mut IrContext,
    location: Location,
    name: Option<Symbol>,
    body: RegionRef,
) -> Module {
    let mut builder =
        OperationDataBuilder::new(location, DIALECT_NAME(), Symbol::new("module")).region(body);
    if let Some(name) = name {
        builder = builder.attr(core::ATTR_SYM_NAME(), Attribute::Symbol(name));
    }
    let data = builder.build(ctx);
    Module(ctx.create_op(data))
}

define_op! {
    /// `vm.module_end`
    ModuleEnd = "vm" . "module_end"
}

pub fn module_end(ctx: &mut IrContext, location: Location) -> ModuleEnd {
    let data =
        OperationDataBuilder::new(location, DIALECT_NAME(), Symbol::new("module_end")).build(ctx);
    ModuleEnd(ctx.create_op(data))
}

define_op! {
    /// `vm.func {sym_name, function_type}`
    Func = "vm" . "func"
}

impl Func {
    pub fn sym_name(&self, ctx: &IrContext) -> Option<Symbol> {
        ctx.op_attr(self.0, core::ATTR_SYM_NAME())?.as_symbol()
    }

    pub fn signature(&self, ctx: &IrContext) -> Option<core::FnSignature> {
        let ty = ctx.op_attr(self.0, ATTR_FUNCTION_TYPE())?.as_type()?;
        core::fn_signature(&ctx.types, ty)
    }

    pub fn body(&self, ctx: &IrContext) -> RegionRef {
        ctx.op(self.0).regions[0]
    }
}

pub fn func(
    ctx: &mut IrContext,
    location: Location,
    name: Symbol,
    function_type: TypeRef,
    body: RegionRef,
    extra_attrs: impl IntoIterator<Item = (Symbol, Attribute)>,
) -> Func {
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), Symbol::new("func"))
        .attrs(extra_attrs)
        .attr(core::ATTR_SYM_NAME(), Attribute::Symbol(name))
        .attr(ATTR_FUNCTION_TYPE(), Attribute::Type(function_type))
        .region(body)
        .build(ctx);
    Func(ctx.create_op(data))
}

define_op! {
    /// `vm.export {function_ref, export_name}`
    Export = "vm" . "export"
}

impl Export {
    pub fn function_ref(&self, ctx: &IrContext) -> Option<Symbol> {
        ctx.op_attr(self.0, ATTR_FUNCTION_REF())?.as_symbol()
    }

    pub fn export_name(&self, ctx: &IrContext) -> Option<String> {
        ctx.op_attr(self.0, ATTR_EXPORT_NAME())?
            .as_str()
            .map(str::to_owned)
    }
}

pub fn export(
    ctx: &mut IrContext,
    location: Location,
    function_ref: Symbol,
    export_name: String,
) -> Export {
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), Symbol::new("export"))
        .attr(ATTR_FUNCTION_REF(), Attribute::Symbol(function_ref))
        .attr(ATTR_EXPORT_NAME(), Attribute::String(export_name))
        .build(ctx);
    Export(ctx.create_op(data))
}

// ============================================================================
// Control flow
// ============================================================================

define_op! {
    /// `vm.return`
    Return = "vm" . "return"
}

pub fn r#return(ctx: &mut IrContext, location: Location, values: &[ValueRef]) -> Return {
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), Symbol::new("return"))
        .operands(values.iter().copied())
        .build(ctx);
    Return(ctx.create_op(data))
}

define_op! {
    /// `vm.call {callee}`
    Call = "vm" . "call"
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

define_op! {
    /// `vm.br`
    Br = "vm" . "br"
}

pub fn br(ctx: &mut IrContext, location: Location, dest: BlockRef, args: &[ValueRef]) -> Br {
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), Symbol::new("br"))
        .operands(args.iter().copied())
        .successor(dest)
        .build(ctx);
    Br(ctx.create_op(data))
}

define_op! {
    /// `vm.cond_br`: condition, true arguments, false arguments.
    CondBr = "vm" . "cond_br"
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

// ============================================================================
// Constants
// ============================================================================

define_op! {
    /// `vm.const.i32 {value}`
    ConstI32 = "vm" . "const.i32"
}

impl ConstI32 {
    pub fn value(&self, ctx: &IrContext) -> Option<i64> {
        ctx.op_attr(self.0, ATTR_VALUE())?.as_int()
    }
}

pub fn const_i32(ctx: &mut IrContext, location: Location, value: i32) -> ConstI32 {
    let i32_ty = core::i32(&mut ctx.types);
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), Symbol::new("const.i32"))
        .result(i32_ty)
        .attr(ATTR_VALUE(), Attribute::from(i64::from(value)))
        .build(ctx);
    ConstI32(ctx.create_op(data))
}

define_op! {
    /// `vm.const.i32.zero`
    ConstI32Zero = "vm" . "const.i32.zero"
}

pub fn const_i32_zero(ctx: &mut IrContext, location: Location) -> ConstI32Zero {
    let i32_ty = core::i32(&mut ctx.types);
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), Symbol::new("const.i32.zero"))
        .result(i32_ty)
        .build(ctx);
    ConstI32Zero(ctx.create_op(data))
}

/// Constant an operation materializes, if it is a VM constant.
pub fn constant_value(ctx: &IrContext, op: OpRef) -> Option<i64> {
    if ConstI32Zero::matches(ctx, op) {
        return Some(0);
    }
    ConstI32::from_op(ctx, op).ok()?.value(ctx)
}

// ============================================================================
// Arithmetic
// ============================================================================

macro_rules! i32_ops {
    ($($ty:ident => $name:literal;)*) => {
        $(
            define_op! {
                #[doc = concat!("`vm.", $name, "`")]
                $ty = "vm" . $name
            }
        )*
    };
}

i32_ops! {
    AddI32 => "add.i32";
    SubI32 => "sub.i32";
    MulI32 => "mul.i32";
    DivI32S => "div.i32.s";
    DivI32U => "div.i32.u";
    RemI32S => "rem.i32.s";
    RemI32U => "rem.i32.u";
    AndI32 => "and.i32";
    OrI32 => "or.i32";
    XorI32 => "xor.i32";
    ShlI32 => "shl.i32";
    ShrI32S => "shr.i32.s";
    ShrI32U => "shr.i32.u";
    CmpEqI32 => "cmp.eq.i32";
    CmpNeI32 => "cmp.ne.i32";
    CmpLtI32S => "cmp.lt.i32.s";
    CmpLtI32U => "cmp.lt.i32.u";
    CmpLteI32S => "cmp.lte.i32.s";
    CmpLteI32U => "cmp.lte.i32.u";
    CmpGtI32S => "cmp.gt.i32.s";
    CmpGtI32U => "cmp.gt.i32.u";
    CmpGteI32S => "cmp.gte.i32.s";
    CmpGteI32U => "cmp.gte.i32.u";
    SelectI32 => "select.i32";
}

/// Create a two-operand `core.i32` instruction such as `vm.add.i32` or `vm.cmp.lt.i32.s`.
pub fn binary(
    ctx: &mut IrContext,
    location: Location,
    name: &'static str,
    lhs: ValueRef,
    rhs: ValueRef,
) -> OpRef {
    let i32_ty = core::i32(&mut ctx.types);
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), Symbol::new(name))
        .operand(lhs)
        .operand(rhs)
        .result(i32_ty)
        .build(ctx);
    ctx.create_op(data)
}

/// Create a shift by a constant amount (`vm.shl.i32`, `vm.shr.i32.s`, `vm.shr.i32.u`).
pub fn shift(
    ctx: &mut IrContext,
    location: Location,
    name: &'static str,
    value: ValueRef,
    amount: u8,
) -> OpRef {
    let i32_ty = core::i32(&mut ctx.types);
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), Symbol::new(name))
        .operand(value)
        .result(i32_ty)
        .attr(ATTR_AMOUNT(), Attribute::IntBits(u64::from(amount)))
        .build(ctx);
    ctx.create_op(data)
}

pub fn select_i32(
    ctx: &mut IrContext,
    location: Location,
    cond: ValueRef,
    true_value: ValueRef,
    false_value: ValueRef,
) -> SelectI32 {
    let i32_ty = core::i32(&mut ctx.types);
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), Symbol::new("select.i32"))
        .operands([cond, true_value, false_value])
        .result(i32_ty)
        .build(ctx);
    SelectI32(ctx.create_op(data))
}

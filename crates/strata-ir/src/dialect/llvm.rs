//! `llvm` dialect: the subset of LLVM IR the GPU lowering targets.

use crate::context::{IrContext, OperationDataBuilder};
use crate::dialect::core;
use crate::location::Location;
use crate::refs::{RegionRef, TypeRef, ValueRef};
use crate::symbol::Symbol;
use crate::types::{Attribute, TypeDataBuilder, TypeInterner};
use crate::{define_op, symbols};

symbols! {
    DIALECT_NAME => "llvm",
    ATTR_ADDRSPACE => "addrspace",
    ATTR_LEN => "len",
    ATTR_LINKAGE => "linkage",
    ATTR_POSITION => "position",
    ATTR_VALUE => "value",
}

// ============================================================================
// Types
// ============================================================================

pub fn ptr(types: &mut TypeInterner, element: TypeRef, address_space: u64) -> TypeRef {
    types.intern(
        TypeDataBuilder::new(DIALECT_NAME(), Symbol::new("ptr"))
            .param(element)
            .attr(ATTR_ADDRSPACE(), Attribute::IntBits(address_space))
            .build(),
    )
}

pub fn struct_ty(types: &mut TypeInterner, fields: &[TypeRef]) -> TypeRef {
    types.intern(
        TypeDataBuilder::new(DIALECT_NAME(), Symbol::new("struct"))
            .params(fields.iter().copied())
            .build(),
    )
}

pub fn array(types: &mut TypeInterner, element: TypeRef, len: u64) -> TypeRef {
    types.intern(
        TypeDataBuilder::new(DIALECT_NAME(), Symbol::new("array"))
            .param(element)
            .attr(ATTR_LEN(), Attribute::IntBits(len))
            .build(),
    )
}

pub fn void(types: &mut TypeInterner) -> TypeRef {
    types.simple("llvm", "void")
}

pub fn is_llvm_type(types: &TypeInterner, ty: TypeRef) -> bool {
    types.get(ty).dialect == DIALECT_NAME()
}

// ============================================================================
// Operations
// ============================================================================

define_op! {
    /// `llvm.func {sym_name, function_type, linkage}`
    Func = "llvm" . "func"
}

impl Func {
    pub fn body(&self, ctx: &IrContext) -> RegionRef {
        ctx.op(self.0).regions[0]
    }
}

/// Create a function with an empty body region and the given attributes.
///
/// The body is filled by moving blocks in; see `ConversionRewriter::inline_region_before`.
pub fn func(
    ctx: &mut IrContext,
    location: Location,
    body: RegionRef,
    attrs: impl IntoIterator<Item = (Symbol, Attribute)>,
) -> Func {
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), Symbol::new("func"))
        .attrs(attrs)
        .region(body)
        .build(ctx);
    Func(ctx.create_op(data))
}

define_op! {
    /// `llvm.return`
    Return = "llvm" . "return"
}

pub fn r#return(ctx: &mut IrContext, location: Location, values: &[ValueRef]) -> Return {
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), Symbol::new("return"))
        .operands(values.iter().copied())
        .build(ctx);
    Return(ctx.create_op(data))
}

define_op! {
    /// `llvm.undef`
    Undef = "llvm" . "undef"
}

pub fn undef(ctx: &mut IrContext, location: Location, ty: TypeRef) -> Undef {
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), Symbol::new("undef"))
        .result(ty)
        .build(ctx);
    Undef(ctx.create_op(data))
}

define_op! {
    /// `llvm.insertvalue {position}`: aggregate with one (possibly nested) field replaced.
    InsertValue = "llvm" . "insertvalue"
}

pub fn insertvalue(
    ctx: &mut IrContext,
    location: Location,
    aggregate: ValueRef,
    value: ValueRef,
    position: &[u64],
) -> InsertValue {
    let ty = ctx.value_ty(aggregate);
    let position = position.iter().map(|&p| Attribute::IntBits(p)).collect();
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), Symbol::new("insertvalue"))
        .operand(aggregate)
        .operand(value)
        .result(ty)
        .attr(ATTR_POSITION(), Attribute::List(position))
        .build(ctx);
    InsertValue(ctx.create_op(data))
}

define_op! {
    /// `llvm.constant {value}`
    Constant = "llvm" . "constant"
}

pub fn constant(ctx: &mut IrContext, location: Location, ty: TypeRef, value: i64) -> Constant {
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), Symbol::new("constant"))
        .result(ty)
        .attr(ATTR_VALUE(), Attribute::from(value))
        .build(ctx);
    Constant(ctx.create_op(data))
}

define_op! {
    /// `llvm.sext`: sign extension to a wider integer.
    Sext = "llvm" . "sext"
}

pub fn sext(ctx: &mut IrContext, location: Location, value: ValueRef, ty: TypeRef) -> Sext {
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), Symbol::new("sext"))
        .operand(value)
        .result(ty)
        .build(ctx);
    Sext(ctx.create_op(data))
}

/// The i64 type used for descriptor offsets, sizes and strides.
pub fn index_type(types: &mut TypeInterner) -> TypeRef {
    core::i64(types)
}

//! `core` dialect: builtin scalar and function types, modules, and the
//! unrealized conversion cast used to bridge 1:N type expansions.

use smallvec::SmallVec;

use crate::context::{IrContext, OperationDataBuilder};
use crate::location::Location;
use crate::ops::DialectOp;
use crate::refs::{BlockRef, OpRef, TypeRef, ValueRef};
use crate::symbol::Symbol;
use crate::types::{Attribute, TypeDataBuilder, TypeInterner};
use crate::{define_op, symbols};

symbols! {
    DIALECT_NAME => "core",
    ATTR_SYM_NAME => "sym_name",
    ATTR_SYM_VISIBILITY => "sym_visibility",
    ATTR_INPUTS => "inputs",
}

// ============================================================================
// Types
// ============================================================================

pub fn i1(types: &mut TypeInterner) -> TypeRef {
    types.simple("core", "i1")
}

pub fn i8(types: &mut TypeInterner) -> TypeRef {
    types.simple("core", "i8")
}

pub fn i16(types: &mut TypeInterner) -> TypeRef {
    types.simple("core", "i16")
}

pub fn i32(types: &mut TypeInterner) -> TypeRef {
    types.simple("core", "i32")
}

pub fn i64(types: &mut TypeInterner) -> TypeRef {
    types.simple("core", "i64")
}

pub fn index(types: &mut TypeInterner) -> TypeRef {
    types.simple("core", "index")
}

pub fn f32(types: &mut TypeInterner) -> TypeRef {
    types.simple("core", "f32")
}

pub fn f64(types: &mut TypeInterner) -> TypeRef {
    types.simple("core", "f64")
}

/// Bit width of a fixed-width `core` integer type. `index` has no fixed width.
pub fn int_width(types: &TypeInterner, ty: TypeRef) -> Option<u32> {
    let data = types.get(ty);
    if data.dialect != DIALECT_NAME() {
        return None;
    }
    data.name.with_str(|name| match name {
        "i1" => Some(1),
        "i8" => Some(8),
        "i16" => Some(16),
        "i32" => Some(32),
        "i64" => Some(64),
        _ => None,
    })
}

pub fn is_index(types: &TypeInterner, ty: TypeRef) -> bool {
    types.is_dialect(ty, DIALECT_NAME(), Symbol::new("index"))
}

pub fn is_float(types: &TypeInterner, ty: TypeRef) -> bool {
    let data = types.get(ty);
    data.dialect == DIALECT_NAME() && (data.name == "f32" || data.name == "f64")
}

/// Function type. Params are the inputs followed by the results; the
/// `inputs` attribute records where the split is.
pub fn fn_type(types: &mut TypeInterner, inputs: &[TypeRef], results: &[TypeRef]) -> TypeRef {
    types.intern(
        TypeDataBuilder::new(DIALECT_NAME(), Symbol::new("fn"))
            .params(inputs.iter().chain(results).copied())
            .attr(ATTR_INPUTS(), Attribute::from(inputs.len() as u64))
            .build(),
    )
}

/// Decoded view of a `core.fn` type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FnSignature {
    pub inputs: SmallVec<[TypeRef; 4]>,
    pub results: SmallVec<[TypeRef; 2]>,
}

pub fn fn_signature(types: &TypeInterner, ty: TypeRef) -> Option<FnSignature> {
    let data = types.get(ty);
    if data.dialect != DIALECT_NAME() || data.name != "fn" {
        return None;
    }
    let split = data.attrs.get(&ATTR_INPUTS())?.as_int()? as usize;
    if split > data.params.len() {
        return None;
    }
    Some(FnSignature {
        inputs: data.params[..split].iter().copied().collect(),
        results: data.params[split..].iter().copied().collect(),
    })
}

// ============================================================================
// Operations
// ============================================================================

define_op! {
    /// `core.module`: a symbol table with a single-block body ending in `core.module_end`.
    Module = "core" . "module"
}

impl Module {
    pub fn body(&self, ctx: &IrContext) -> Option<BlockRef> {
        super::entry_block(ctx, self.0, 0)
    }

    pub fn sym_name(&self, ctx: &IrContext) -> Option<Symbol> {
        ctx.op_attr(self.0, ATTR_SYM_NAME())?.as_symbol()
    }

    /// Append an operation to the body, before the terminator.
    pub fn push(&self, ctx: &mut IrContext, op: OpRef) {
        if let Some(body) = self.body(ctx) {
            super::push_before_terminator(ctx, body, op, ModuleEnd::kind());
        }
    }
}

/// Create a module with an empty body (just the terminator).
pub fn module(ctx: &mut IrContext, location: Location, name: Option<Symbol>) -> Module {
    let (region, body) = super::region_with_entry(ctx, location, []);
    let end = module_end(ctx, location);
    ctx.push_op(body, end.op_ref());

    let mut builder = OperationDataBuilder::new(location, DIALECT_NAME(), Symbol::new("module"))
        .region(region);
    if let Some(name) = name {
        builder = builder.attr(ATTR_SYM_NAME(), Attribute::Symbol(name));
    }
    let data = builder.build(ctx);
    Module(ctx.create_op(data))
}

define_op! {
    /// `core.module_end`: terminator of a `core.module` body.
    ModuleEnd = "core" . "module_end"
}

pub fn module_end(ctx: &mut IrContext, location: Location) -> ModuleEnd {
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), Symbol::new("module_end"))
        .build(ctx);
    ModuleEnd(ctx.create_op(data))
}

define_op! {
    /// `core.unrealized_conversion_cast`: placeholder bridging values whose
    /// types disagree mid-conversion.
    UnrealizedConversionCast = "core" . "unrealized_conversion_cast"
}

pub fn unrealized_conversion_cast(
    ctx: &mut IrContext,
    location: Location,
    inputs: &[ValueRef],
    result: TypeRef,
) -> UnrealizedConversionCast {
    let data = OperationDataBuilder::new(
        location,
        DIALECT_NAME(),
        Symbol::new("unrealized_conversion_cast"),
    )
    .operands(inputs.iter().copied())
    .result(result)
    .build(ctx);
    UnrealizedConversionCast(ctx.create_op(data))
}

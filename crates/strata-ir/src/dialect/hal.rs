//! `hal` dialect: executable interface declarations and the abstract
//! buffer/workgroup queries a kernel body makes against them.

use crate::context::{IrContext, OperationDataBuilder};
use crate::dialect::core;
use crate::location::Location;
use crate::ops::{DialectOp, OpKind};
use crate::refs::{BlockRef, OpRef, TypeRef};
use crate::symbol::Symbol;
use crate::types::Attribute;
use crate::{define_op, symbols};

symbols! {
    DIALECT_NAME => "hal",
    ATTR_SET => "set",
    ATTR_BINDING => "binding",
    ATTR_DIMENSION => "dimension",
}

define_op! {
    /// `hal.interface`: symbol table of binding declarations, terminated by `hal.interface.end`.
    Interface = "hal" . "interface"
}

impl Interface {
    pub fn body(&self, ctx: &IrContext) -> Option<BlockRef> {
        super::entry_block(ctx, self.0, 0)
    }

    /// Append a declaration before the terminator.
    pub fn push(&self, ctx: &mut IrContext, op: OpRef) {
        if let Some(body) = self.body(ctx) {
            super::push_before_terminator(ctx, body, op, InterfaceEnd::kind());
        }
    }
}

pub fn interface(ctx: &mut IrContext, location: Location, name: Symbol) -> Interface {
    let (region, body) = super::region_with_entry(ctx, location, []);
    let end = interface_end(ctx, location);
    ctx.push_op(body, end.op_ref());
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), Symbol::new("interface"))
        .attr(core::ATTR_SYM_NAME(), Attribute::Symbol(name))
        .region(region)
        .build(ctx);
    Interface(ctx.create_op(data))
}

define_op! {
    /// `hal.interface.end`
    InterfaceEnd = "hal" . "interface.end"
}

pub fn interface_end(ctx: &mut IrContext, location: Location) -> InterfaceEnd {
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), Symbol::new("interface.end"))
        .build(ctx);
    InterfaceEnd(ctx.create_op(data))
}

define_op! {
    /// `hal.interface.binding {sym_name, set, binding}`: one buffer slot.
    InterfaceBinding = "hal" . "interface.binding"
}

impl InterfaceBinding {
    pub fn set(&self, ctx: &IrContext) -> Option<i64> {
        ctx.op_attr(self.0, ATTR_SET())?.as_int()
    }

    pub fn binding(&self, ctx: &IrContext) -> Option<i64> {
        ctx.op_attr(self.0, ATTR_BINDING())?.as_int()
    }
}

pub fn interface_binding(
    ctx: &mut IrContext,
    location: Location,
    name: Symbol,
    set: u64,
    binding: u64,
) -> InterfaceBinding {
    let data = OperationDataBuilder::new(
        location,
        DIALECT_NAME(),
        Symbol::new("interface.binding"),
    )
    .attr(core::ATTR_SYM_NAME(), Attribute::Symbol(name))
    .attr(ATTR_SET(), Attribute::IntBits(set))
    .attr(ATTR_BINDING(), Attribute::IntBits(binding))
    .build(ctx);
    InterfaceBinding(ctx.create_op(data))
}

define_op! {
    /// `hal.interface.binding.subspan {binding = @interface::@slot}`: the
    /// memref view of a bound buffer.
    BindingSubspan = "hal" . "interface.binding.subspan"
}

impl BindingSubspan {
    /// The nested symbol reference naming the binding declaration.
    pub fn binding_ref(&self, ctx: &IrContext) -> Option<Vec<Symbol>> {
        match ctx.op_attr(self.0, ATTR_BINDING())? {
            Attribute::Symbol(sym) => Some(vec![*sym]),
            Attribute::List(items) => items.iter().map(Attribute::as_symbol).collect(),
            _ => None,
        }
    }

    pub fn result_type(&self, ctx: &IrContext) -> TypeRef {
        ctx.op_result_types(self.0)[0]
    }
}

pub fn binding_subspan(
    ctx: &mut IrContext,
    location: Location,
    binding: &[Symbol],
    ty: TypeRef,
) -> BindingSubspan {
    let binding_ref = binding.iter().map(|s| Attribute::Symbol(*s)).collect();
    let data = OperationDataBuilder::new(
        location,
        DIALECT_NAME(),
        Symbol::new("interface.binding.subspan"),
    )
    .attr(ATTR_BINDING(), Attribute::List(binding_ref))
    .result(ty)
    .build(ctx);
    BindingSubspan(ctx.create_op(data))
}

/// The three execution-grid queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorkgroupQuery {
    Id,
    Count,
    Size,
}

impl WorkgroupQuery {
    pub fn op_name(self) -> &'static str {
        match self {
            WorkgroupQuery::Id => WorkgroupId::OP_NAME,
            WorkgroupQuery::Count => WorkgroupCount::OP_NAME,
            WorkgroupQuery::Size => WorkgroupSize::OP_NAME,
        }
    }

    pub fn kind(self) -> OpKind {
        match self {
            WorkgroupQuery::Id => WorkgroupId::kind(),
            WorkgroupQuery::Count => WorkgroupCount::kind(),
            WorkgroupQuery::Size => WorkgroupSize::kind(),
        }
    }
}

define_op! {
    /// `hal.interface.workgroup.id {dimension}`
    WorkgroupId = "hal" . "interface.workgroup.id"
}

define_op! {
    /// `hal.interface.workgroup.count {dimension}`
    WorkgroupCount = "hal" . "interface.workgroup.count"
}

define_op! {
    /// `hal.interface.workgroup.size {dimension}`
    WorkgroupSize = "hal" . "interface.workgroup.size"
}

/// Axis queried by any of the workgroup ops.
pub fn workgroup_dimension(ctx: &IrContext, op: OpRef) -> Option<i64> {
    ctx.op_attr(op, ATTR_DIMENSION())?.as_int()
}

/// Create a workgroup query producing a `core.index`.
pub fn workgroup_query(
    ctx: &mut IrContext,
    location: Location,
    query: WorkgroupQuery,
    dimension: u64,
) -> OpRef {
    let index = core::index(&mut ctx.types);
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), Symbol::new(query.op_name()))
        .attr(ATTR_DIMENSION(), Attribute::IntBits(dimension))
        .result(index)
        .build(ctx);
    ctx.create_op(data)
}

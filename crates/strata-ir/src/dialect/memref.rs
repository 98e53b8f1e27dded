//! `memref` types: shaped views of memory.
//!
//! `memref.memref(elem) {shape, addrspace}` where `shape` is a list of
//! integer extents and `Attribute::Unit` marks a dynamic extent.

use smallvec::SmallVec;

use crate::refs::TypeRef;
use crate::symbol::Symbol;
use crate::types::{Attribute, TypeDataBuilder, TypeInterner};
use crate::symbols;

symbols! {
    DIALECT_NAME => "memref",
    ATTR_SHAPE => "shape",
    ATTR_ADDRSPACE => "addrspace",
}

/// One extent of a memref shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dim {
    Static(u64),
    Dynamic,
}

/// Decoded view of a memref type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemRefType {
    pub element: TypeRef,
    pub shape: SmallVec<[Dim; 4]>,
    pub address_space: u64,
}

impl MemRefType {
    pub fn has_static_shape(&self) -> bool {
        self.shape.iter().all(|d| matches!(d, Dim::Static(_)))
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Static extents, or `None` if any extent is dynamic.
    pub fn static_shape(&self) -> Option<SmallVec<[u64; 4]>> {
        self.shape
            .iter()
            .map(|d| match d {
                Dim::Static(n) => Some(*n),
                Dim::Dynamic => None,
            })
            .collect()
    }
}

pub fn memref(
    types: &mut TypeInterner,
    element: TypeRef,
    shape: &[Dim],
    address_space: u64,
) -> TypeRef {
    let shape_attr = shape
        .iter()
        .map(|d| match d {
            Dim::Static(n) => Attribute::IntBits(*n),
            Dim::Dynamic => Attribute::Unit,
        })
        .collect();
    types.intern(
        TypeDataBuilder::new(DIALECT_NAME(), Symbol::new("memref"))
            .param(element)
            .attr(ATTR_SHAPE(), Attribute::List(shape_attr))
            .attr(ATTR_ADDRSPACE(), Attribute::IntBits(address_space))
            .build(),
    )
}

pub fn memref_type(types: &TypeInterner, ty: TypeRef) -> Option<MemRefType> {
    let data = types.get(ty);
    if data.dialect != DIALECT_NAME() || data.name != "memref" {
        return None;
    }
    let element = *data.params.first()?;
    let shape = data
        .attrs
        .get(&ATTR_SHAPE())?
        .as_list()?
        .iter()
        .map(|attr| match attr {
            Attribute::IntBits(n) => Some(Dim::Static(*n)),
            Attribute::Unit => Some(Dim::Dynamic),
            _ => None,
        })
        .collect::<Option<SmallVec<_>>>()?;
    let address_space = data
        .attrs
        .get(&ATTR_ADDRSPACE())
        .and_then(Attribute::as_int)
        .unwrap_or(0) as u64;
    Some(MemRefType {
        element,
        shape,
        address_space,
    })
}

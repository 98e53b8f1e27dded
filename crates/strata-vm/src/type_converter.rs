//! Type conversion to the VM's 32-bit register model.
//!
//! Integers up to 32 bits and `core.index` all become `core.i32`. Wider
//! integers and floats have no VM representation.

use strata_ir::dialect::core;
use strata_ir::rewrite::{TypeConversion, TypeConverter};

pub fn vm_type_converter() -> TypeConverter {
    let mut converter = TypeConverter::new();
    converter.add_conversion(|types, ty| {
        if core::is_index(types, ty) {
            return Some(TypeConversion::one(core::i32(types)));
        }
        match core::int_width(types, ty)? {
            1..=32 => Some(TypeConversion::one(core::i32(types))),
            _ => Some(TypeConversion::Illegal),
        }
    });
    converter.add_conversion(|types, ty| core::is_float(types, ty).then_some(TypeConversion::Illegal));
    converter
}

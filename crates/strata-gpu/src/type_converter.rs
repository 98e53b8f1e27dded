//! Type conversion from `core`/`memref` types to LLVM types.
//!
//! - `core.index` becomes `core.i64`; other integers and floats are kept.
//! - A statically shaped memref becomes its descriptor struct
//!   `{allocated ptr, aligned ptr, offset, sizes[rank], strides[rank]}`.
//! - A dynamically shaped memref is unconvertible.
//! - LLVM types are already legal.

use smallvec::{SmallVec, smallvec};
use strata_ir::TypeRef;
use strata_ir::dialect::memref::{self, MemRefType};
use strata_ir::dialect::{core, llvm};
use strata_ir::rewrite::{TypeConversion, TypeConverter};
use strata_ir::types::TypeInterner;

/// Create the type converter used by the GPU lowering.
pub fn llvm_type_converter() -> TypeConverter {
    let mut converter = TypeConverter::new();
    converter.add_legal_type(llvm::is_llvm_type);
    converter.add_conversion(|types, ty| scalar_type(types, ty).map(TypeConversion::one));
    converter.add_conversion(|types, ty| {
        let memref = memref::memref_type(types, ty)?;
        Some(match memref_descriptor(types, &memref) {
            Some(descriptor) => TypeConversion::one(descriptor),
            None => TypeConversion::Illegal,
        })
    });
    converter
}

fn scalar_type(types: &mut TypeInterner, ty: TypeRef) -> Option<TypeRef> {
    if core::is_index(types, ty) {
        return Some(llvm::index_type(types));
    }
    if core::int_width(types, ty).is_some() || core::is_float(types, ty) {
        return Some(ty);
    }
    None
}

/// Pointer to the converted element type, in the memref's address space.
pub fn element_pointer(types: &mut TypeInterner, memref: &MemRefType) -> Option<TypeRef> {
    let element = scalar_type(types, memref.element)?;
    Some(llvm::ptr(types, element, memref.address_space))
}

/// Descriptor struct of a statically shaped memref.
pub fn memref_descriptor(types: &mut TypeInterner, memref: &MemRefType) -> Option<TypeRef> {
    if !memref.has_static_shape() {
        return None;
    }
    let ptr = element_pointer(types, memref)?;
    let i64_ty = llvm::index_type(types);
    let mut fields: SmallVec<[TypeRef; 5]> = smallvec![ptr, ptr, i64_ty];
    if memref.rank() > 0 {
        let dims = llvm::array(types, i64_ty, memref.rank() as u64);
        fields.push(dims);
        fields.push(dims);
    }
    Some(llvm::struct_ty(types, &fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_ir::IrContext;
    use strata_ir::dialect::memref::Dim;
    use strata_ir::printer::print_type;

    #[test]
    fn scalars_keep_width_and_index_widens() {
        let mut ctx = IrContext::new();
        let converter = llvm_type_converter();
        let index = core::index(&mut ctx.types);
        let i16_ty = core::i16(&mut ctx.types);
        let f32_ty = core::f32(&mut ctx.types);
        let i64_ty = core::i64(&mut ctx.types);

        assert_eq!(converter.convert_type(&mut ctx.types, index), Some(i64_ty));
        assert!(converter.is_legal(&mut ctx.types, i16_ty));
        assert!(converter.is_legal(&mut ctx.types, f32_ty));
    }

    #[test]
    fn static_memref_becomes_descriptor() {
        let mut ctx = IrContext::new();
        let converter = llvm_type_converter();
        let f32_ty = core::f32(&mut ctx.types);
        let ty = memref::memref(&mut ctx.types, f32_ty, &[Dim::Static(4), Dim::Static(8)], 1);

        let converted = converter.convert_type(&mut ctx.types, ty).unwrap();
        assert_eq!(
            print_type(&ctx, converted),
            "llvm.struct(llvm.ptr(core.f32) {addrspace = 1}, llvm.ptr(core.f32) {addrspace = 1}, \
             core.i64, llvm.array(core.i64) {len = 2}, llvm.array(core.i64) {len = 2})"
        );
        assert!(converter.is_legal(&mut ctx.types, converted));
    }

    #[test]
    fn rank_zero_descriptor_has_no_shape_arrays() {
        let mut ctx = IrContext::new();
        let converter = llvm_type_converter();
        let index = core::index(&mut ctx.types);
        let ty = memref::memref(&mut ctx.types, index, &[], 0);

        let converted = converter.convert_type(&mut ctx.types, ty).unwrap();
        assert_eq!(
            print_type(&ctx, converted),
            "llvm.struct(llvm.ptr(core.i64) {addrspace = 0}, llvm.ptr(core.i64) {addrspace = 0}, core.i64)"
        );
    }

    #[test]
    fn dynamic_memref_is_unconvertible() {
        let mut ctx = IrContext::new();
        let converter = llvm_type_converter();
        let f32_ty = core::f32(&mut ctx.types);
        let ty = memref::memref(&mut ctx.types, f32_ty, &[Dim::Dynamic], 0);
        let fn_ty = core::fn_type(&mut ctx.types, &[], &[]);

        assert_eq!(converter.convert_type(&mut ctx.types, ty), None);
        assert_eq!(converter.convert_type(&mut ctx.types, fn_ty), None);
    }
}

//! GPU lowering patterns.
//!
//! - [`func_to_llvm`]: kernel signature flattening
//! - [`binding_to_llvm`]: buffer bindings to memref descriptors
//! - [`workgroup_to_intrinsics`]: workgroup queries to NVVM/ROCDL reads
//! - [`return_to_llvm`]: function returns

pub mod binding_to_llvm;
pub mod func_to_llvm;
pub mod return_to_llvm;
pub mod workgroup_to_intrinsics;

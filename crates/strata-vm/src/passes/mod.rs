//! VM lowering patterns, grouped by source dialect.

pub mod arith_to_vm;
pub mod cf_to_vm;
pub mod func_to_vm;
pub mod module_to_vm;

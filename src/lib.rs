//! Strata: pattern-driven lowering of a multi-dialect IR.
//!
//! The conversion engine lives in [`strata_ir::rewrite`]; the two pattern
//! libraries in [`strata_gpu`] and [`strata_vm`]. This crate ties them into
//! a single entry point, [`lower_module`], selected by [`LoweringOptions`].

pub mod pipeline;

pub use pipeline::{LoweringOptions, LoweringTarget, lower_module};
pub use strata_gpu::GpuBackend;
pub use strata_ir as ir;

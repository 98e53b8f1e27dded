//! Lowering pipeline.
//!
//! ```text
//! core.module (func / arith / cf / hal)
//!     │
//!     ├─► [target: vm]  ─► strata_vm::lower  ─► core.module { vm.module ... }
//!     │
//!     └─► [target: gpu] ─► strata_gpu::lower ─► core.module { llvm.func ... }
//! ```
//!
//! Both targets run the same legalization driver with their own type
//! converter, pattern set and conversion target. A failed run leaves the
//! module half-converted; callers must discard it.

use derive_more::Display;
use strata_gpu::GpuBackend;
use strata_ir::rewrite::{ConversionMode, ConversionResult, ConversionSummary};
use strata_ir::validation::debug_assert_valid;
use strata_ir::{IrContext, OpRef};
use tracing::{debug, info};

/// Which pattern library a module is lowered with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display)]
pub enum LoweringTarget {
    #[default]
    #[display("vm")]
    Vm,
    #[display("gpu ({_0})")]
    Gpu(GpuBackend),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoweringOptions {
    pub target: LoweringTarget,
    pub mode: ConversionMode,
}

impl LoweringOptions {
    pub fn vm() -> Self {
        Self {
            target: LoweringTarget::Vm,
            mode: ConversionMode::Full,
        }
    }

    pub fn gpu(backend: GpuBackend) -> Self {
        Self {
            target: LoweringTarget::Gpu(backend),
            mode: ConversionMode::Full,
        }
    }

    pub fn with_mode(self, mode: ConversionMode) -> Self {
        Self { mode, ..self }
    }
}

/// Lower `module` (a `core.module`) in place.
pub fn lower_module(
    ctx: &mut IrContext,
    module: OpRef,
    options: &LoweringOptions,
) -> ConversionResult<ConversionSummary> {
    info!(target = %options.target, mode = ?options.mode, "lowering module");
    let summary = match options.target {
        LoweringTarget::Vm => strata_vm::lower(ctx, module, options.mode)?,
        LoweringTarget::Gpu(backend) => strata_gpu::lower(ctx, module, backend, options.mode)?,
    };
    debug_assert_valid(ctx, module, "lower_module");
    for remark in &summary.diagnostics {
        debug!(%remark, "declined pattern left a remark");
    }
    Ok(summary)
}

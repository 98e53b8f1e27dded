//! Command-line interface for the Strata lowering demos.

use clap::{Parser, Subcommand, ValueEnum};
use strata::GpuBackend;

use crate::demo::Scenario;

#[derive(Parser)]
#[command(name = "strata")]
#[command(about = "Pattern-driven IR lowering to a register VM and GPU intrinsics", long_about = None)]
pub struct Cli {
    /// Log filter directives (overrides `RUST_LOG`), e.g. `strata_ir=debug`
    #[arg(long, global = true)]
    pub log: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Build a demonstration module, lower it and print the IR before and after
    Demo {
        #[arg(value_enum)]
        scenario: Scenario,

        /// Intrinsic family for the GPU scenarios
        #[arg(long, value_enum, default_value_t = Backend::Nvvm)]
        backend: Backend,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    Nvvm,
    Rocdl,
}

impl From<Backend> for GpuBackend {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::Nvvm => GpuBackend::Nvvm,
            Backend::Rocdl => GpuBackend::Rocdl,
        }
    }
}

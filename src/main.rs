//! Strata CLI entry point.

mod cli;
mod demo;

use std::process::ExitCode;

use clap::Parser;
use cli::{Cli, Command};
use demo::Scenario;
use strata::ir::IrContext;
use strata::ir::printer::print_op;
use strata::{GpuBackend, lower_module};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log.as_deref());

    match cli.command {
        Command::Demo { scenario, backend } => run_demo(scenario, backend.into()),
    }
}

/// Install a stderr subscriber filtered by `--log`, then `RUST_LOG`, then `warn`.
fn init_logging(directives: Option<&str>) {
    let filter = match directives {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_demo(scenario: Scenario, backend: GpuBackend) -> ExitCode {
    let mut ctx = IrContext::new();
    let module = scenario.build(&mut ctx);
    let options = scenario.options(backend);

    println!("=== Input ===\n{}", print_op(&ctx, module));
    match lower_module(&mut ctx, module, &options) {
        Ok(summary) => {
            println!("=== Lowered ({}) ===\n{}", options.target, print_op(&ctx, module));
            for remark in &summary.diagnostics {
                println!("{remark}");
            }
            println!(
                "{} pattern(s) applied, {} operation(s) visited",
                summary.patterns_applied, summary.ops_visited
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            for diagnostic in err.diagnostics() {
                eprintln!("  {diagnostic}");
            }
            ExitCode::FAILURE
        }
    }
}

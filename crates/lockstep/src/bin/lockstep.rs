//! Multi-device lockstep stencil runner.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use lockstep::runner;
use lockstep_core::config::RunConfig;
use lockstep_cuda::CudaStencilBackend;

/// Run a 2D stencil in lockstep on every CUDA device, verifying each
/// device's result against a concurrently computed host reference.
#[derive(Debug, Parser)]
#[command(name = "lockstep", version, about)]
struct Args {
    /// Grid width in samples.
    #[arg(long, default_value_t = 128)]
    nx: usize,
    /// Grid height in samples.
    #[arg(long, default_value_t = 128)]
    ny: usize,
    /// Number of lockstep iterations.
    #[arg(long, default_value_t = 10)]
    nticks: u32,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = RunConfig::new(args.nx, args.ny, args.nticks);
    let backend = CudaStencilBackend::new();

    match runner::execute(&backend, &config) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("run failed: {err}");
            ExitCode::FAILURE
        }
    }
}

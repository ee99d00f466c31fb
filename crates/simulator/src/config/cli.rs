use clap::{Parser, Subcommand};

use crate::config::simulate::SimulateArgs;
use crate::config::solve::SolveArgs;

#[derive(Parser)]
#[command(name = "ratesim", about, long_about, version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Solve a single scenario file and print the allocation
    Solve(SolveArgs),
    /// Drive the controller with a synthetic workload
    Simulate(Box<SimulateArgs>),
}

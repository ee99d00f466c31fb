use anyhow::Result;
use clap::Parser;
use simulator::cmd;
use simulator::config::Cli;
use simulator::config::Commands;

/// Sets up global panic hooks.
fn setup_global_hooks() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        default_hook(panic_info);
        tracing::error!("Thread panicked: {}", panic_info);
    }));
}

fn main() -> Result<()> {
    setup_global_hooks();

    let cli = Cli::parse();

    match cli.command {
        Commands::Solve(args) => cmd::run_solve(args),
        Commands::Simulate(args) => cmd::run_simulate(*args),
    }
}

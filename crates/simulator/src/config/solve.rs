use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Clone, Debug)]
pub struct SolveArgs {
    #[arg(
        long,
        value_hint = clap::ValueHint::FilePath,
        help = "Scenario file with `config` and `clients`, YAML or JSON"
    )]
    pub scenario: PathBuf,

    #[arg(long, help = "Pretty-print the solution JSON")]
    pub pretty: bool,
}

use clap::Parser;
use stratbench::cli::{Cli, run};
use stratbench::logging::init_logging;

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_logging(cli.json_logs);
    run(cli)
}

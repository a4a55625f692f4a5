use clap::Parser;
use vidtidy::cli::{Cli, run_cli};
use vidtidy::logging;
use vidtidy::output::OutputFormatter;

fn main() {
    logging::init_logger();

    let cli = Cli::parse();
    if let Err(e) = run_cli(cli) {
        OutputFormatter::error(&e);
        std::process::exit(1);
    }
}

use clap::Parser;
use folioscope::cli::{run, Cli};
use folioscope::logging::init_logging;

fn main() -> std::process::ExitCode {
    init_logging();
    run(Cli::parse())
}

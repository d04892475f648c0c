use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use checklist_engine_lib::SweeperOptions;

#[derive(Parser)]
#[command(name = "checklist-sweeper")]
#[command(about = "Locks overdue checklist approvals and rescores the affected months", long_about = None)]
struct Cli {
    /// YAML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run a single sweep and exit
    #[arg(long)]
    once: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let options = SweeperOptions {
        config_path: cli.config,
        once: cli.once,
    };

    match checklist_engine_lib::run(options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("checklist-sweeper failed: {error}");
            ExitCode::FAILURE
        }
    }
}

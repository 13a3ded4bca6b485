//! `gimbal`: open the controller link, send commands, watch the replies.

use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use gimbal_link::SerialLink;
use gimbal_runner::cli::Args;
use gimbal_runner::logging::init_tracing;
use gimbal_runner::monitor::{run_monitor, send_commands};
use gimbal_runner::RunnerError;
use tracing::{error, info, warn};

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), RunnerError> {
    let config = args.link_config()?;
    let frames = args.outgoing_frames()?;
    let options = args.monitor_options();
    gimbal_metrics::describe_metrics();

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || {
            stop.store(true, Ordering::SeqCst);
        })?;
    }

    let link = SerialLink::new();
    link.open(config)?;

    let result = send_commands(&link, &frames).and_then(|_| run_monitor(&link, &stop, &options));

    // The monitor has returned, so no read or write is in flight
    if let Err(e) = link.close() {
        warn!("could not close link cleanly: {}", e);
    }

    let stats = result?;
    info!("{}", stats);
    Ok(())
}

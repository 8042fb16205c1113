use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use log::info;
use miette::{IntoDiagnostic, Result};
use skyaim::emulator::Emulator;
use skyaim::runtime::{LoopConfig, spawn_aim_loop};
use skyaim::scenario::Scenario;
use skyaim::sink::{JsonLinesSink, LogSink};
use skyaim::{Cli, VERSION};
use skyaim_core::{CommandSink, InputExchange};

fn main() -> Result<()> {
    let args = Cli::parse();

    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .init();

    if args.once {
        let command = skyaim::run_once(&args).into_diagnostic()?;
        println!("{}", serde_json::to_string(&command).into_diagnostic()?);
        return Ok(());
    }

    info!("SkyAim {} starting", VERSION);

    let scenario = match &args.scenario {
        Some(path) => Scenario::load(path).into_diagnostic()?,
        None => Scenario::default(),
    };

    let exchange = Arc::new(InputExchange::new());
    let running = Arc::new(AtomicBool::new(true));

    let emulator = Emulator::start(&scenario, exchange.clone(), running.clone()).into_diagnostic()?;

    let sink: Box<dyn CommandSink + Send> = if args.output {
        Box::new(JsonLinesSink::new(io::stdout()))
    } else {
        Box::new(LogSink)
    };
    let config = LoopConfig {
        rate_hz: args.rate,
        max_cycles: args.cycles,
    };
    let aim_loop = spawn_aim_loop(exchange, sink, config, running.clone()).into_diagnostic()?;

    // Only returns once the cycle limit is reached; without one the process runs until killed
    let (_, summary) = aim_loop.join().into_diagnostic()?;
    running.store(false, Ordering::SeqCst);
    emulator.join().into_diagnostic()?;

    info!(
        "Done: {} cycles, {} lock captures, exchange {:?}",
        summary.cycles, summary.captures, summary.exchange
    );
    Ok(())
}

//! Thread that drives the aim loop at a fixed rate.
//!
//! The loop waits on a `crossbeam` ticker instead of spinning. Each tick it
//! runs one [`AimLoop::step`] and hands the command to its sink. It stops
//! when the shared `running` flag is cleared or after `max_cycles`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::tick;
use log::{debug, info};
use skyaim_core::{AimLoop, CommandSink, ExchangeStats, InputExchange};

use crate::RuntimeError;

pub const AIM_LOOP_THREAD: &str = "aim-loop";

/// Period of a ticker running at `rate_hz`, at least one tick per second
pub fn tick_period(rate_hz: u32) -> Duration {
    Duration::from_secs(1) / rate_hz.max(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopConfig {
    pub rate_hz: u32,
    /// Stop after this many cycles, run until stopped when `None`
    pub max_cycles: Option<u64>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        LoopConfig {
            rate_hz: crate::DEFAULT_RATE_HZ,
            max_cycles: None,
        }
    }
}

/// What the loop did before it stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSummary {
    pub cycles: u64,
    pub emitted: u64,
    pub captures: u64,
    pub exchange: ExchangeStats,
}

/// Handle to a running aim loop thread
pub struct AimLoopHandle<S> {
    running: Arc<AtomicBool>,
    thread: JoinHandle<(S, LoopSummary)>,
}

impl<S> AimLoopHandle<S> {
    /// Ask the loop to stop after its current tick
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the loop to stop, returning the sink and a summary
    pub fn join(self) -> Result<(S, LoopSummary), RuntimeError> {
        self.thread
            .join()
            .map_err(|_| RuntimeError::ThreadPanicked(AIM_LOOP_THREAD.to_string()))
    }
}

/// Start the aim loop on its own thread.
///
/// # Arguments
/// * `exchange` - Inputs shared with the producers
/// * `sink` - Receives every successfully computed command
/// * `config` - Rate and optional cycle limit
/// * `running` - Cleared by the host to stop the loop
pub fn spawn_aim_loop<S>(
    exchange: Arc<InputExchange>,
    mut sink: S,
    config: LoopConfig,
    running: Arc<AtomicBool>,
) -> Result<AimLoopHandle<S>, RuntimeError>
where
    S: CommandSink + Send + 'static,
{
    let flag = running.clone();
    let thread = thread::Builder::new()
        .name(AIM_LOOP_THREAD.to_string())
        .spawn(move || {
            let summary = run_aim_loop(exchange, &mut sink, config, &flag);
            (sink, summary)
        })?;

    Ok(AimLoopHandle { running, thread })
}

fn run_aim_loop<S: CommandSink>(
    exchange: Arc<InputExchange>,
    sink: &mut S,
    config: LoopConfig,
    running: &AtomicBool,
) -> LoopSummary {
    let ticker = tick(tick_period(config.rate_hz));
    let report_every = u64::from(config.rate_hz.max(1)) * 10;
    let mut aim_loop = AimLoop::new(exchange);
    let mut emitted = 0u64;

    info!("Aim loop running at {} Hz", config.rate_hz);

    while running.load(Ordering::SeqCst) {
        if ticker.recv().is_err() {
            break;
        }
        if aim_loop.step(sink).is_some() {
            emitted += 1;
        }

        let cycles = aim_loop.cycles();
        if cycles % report_every == 0 {
            let stats = aim_loop.exchange().stats();
            debug!(
                "{} cycles, {} emitted, {} lock captures, exchange {:?}",
                cycles,
                emitted,
                aim_loop.tracker().capture_count(),
                stats
            );
        }
        if config.max_cycles.is_some_and(|max| cycles >= max) {
            debug!("Cycle limit {} reached", cycles);
            break;
        }
    }

    let summary = LoopSummary {
        cycles: aim_loop.cycles(),
        emitted,
        captures: aim_loop.tracker().capture_count(),
        exchange: aim_loop.exchange().stats(),
    };
    info!(
        "Aim loop stopped after {} cycles ({} commands emitted)",
        summary.cycles, summary.emitted
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyaim_core::{AimInput, CameraCommand};

    #[test]
    fn test_tick_period() {
        assert_eq!(tick_period(100), Duration::from_millis(10));
        assert_eq!(tick_period(1), Duration::from_secs(1));
        assert_eq!(tick_period(0), Duration::from_secs(1));
    }

    #[test]
    fn test_loop_stops_after_max_cycles() {
        let exchange = Arc::new(InputExchange::new());
        exchange.publish_attitude(0.0, 0.0, 0.0, 50.0, 0.0, 0.0);
        exchange.publish_aim(AimInput {
            theta: 30.0,
            phi: 90.0,
            ..Default::default()
        });

        let config = LoopConfig {
            rate_hz: 1000,
            max_cycles: Some(5),
        };
        let handle = spawn_aim_loop(
            exchange,
            Vec::<CameraCommand>::new(),
            config,
            Arc::new(AtomicBool::new(true)),
        )
        .unwrap();

        let (commands, summary) = handle.join().unwrap();
        assert_eq!(summary.cycles, 5);
        assert_eq!(summary.emitted, 5);
        assert_eq!(commands.len(), 5);
        assert!((commands[4].yaw - 90.0).abs() < 1e-9);
        assert!((commands[4].pitch - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_loop_stops_on_running_flag() {
        let exchange = Arc::new(InputExchange::new());
        let running = Arc::new(AtomicBool::new(true));
        let config = LoopConfig {
            rate_hz: 200,
            max_cycles: None,
        };
        let handle =
            spawn_aim_loop(exchange, Vec::<CameraCommand>::new(), config, running.clone()).unwrap();

        thread::sleep(Duration::from_millis(100));
        assert!(!handle.is_finished());
        running.store(false, Ordering::SeqCst);

        let (commands, summary) = handle.join().unwrap();
        assert!(summary.cycles > 0);
        assert_eq!(commands.len() as u64, summary.emitted);
    }

    #[test]
    fn test_loop_picks_up_new_inputs() {
        let exchange = Arc::new(InputExchange::new());
        let config = LoopConfig {
            rate_hz: 500,
            max_cycles: None,
        };
        let handle = spawn_aim_loop(
            exchange.clone(),
            Vec::<CameraCommand>::new(),
            config,
            Arc::new(AtomicBool::new(true)),
        )
        .unwrap();

        thread::sleep(Duration::from_millis(20));
        exchange.publish_aim(AimInput {
            theta: 30.0,
            phi: 180.0,
            zoom: 8.0,
            ..Default::default()
        });
        thread::sleep(Duration::from_millis(50));
        handle.stop();

        let (commands, _) = handle.join().unwrap();
        let last = commands.last().unwrap();
        assert!((last.yaw - 180.0).abs() < 1e-9);
        assert_eq!(last.zoom, 8.0);
    }
}

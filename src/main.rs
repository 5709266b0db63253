//! Terminal demo of the display scheduler.
//!
//! Rotates three text providers (a clock, a scrolling ticker and a scores
//! board that periodically goes live) and accepts on-demand commands as
//! JSON lines on stdin, e.g.
//!
//! ```text
//! {"request_id":"1","action":"start","mode":"ticker","duration":10}
//! {"request_id":"2","action":"stop"}
//! ```
//!
//! Type `quit` to stop. `RUST_LOG=debug` shows scheduling decisions.

use anyhow::{bail, Context};
use display_scheduler::{
    command_channel, Capabilities, ComposedImage, ContentProvider, ModeScheduler,
    ProviderError, ProviderRegistry, SchedulerConfig, ScrollConfig, ScrollEngine, SharedState,
    StopHandle, SystemClock,
};
use std::env;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

const TICKER_TEXT: &str = "  BREAKING: scheduler demo running  ***  scores go live every minute  ***";
const GLYPH_WIDTH: u32 = 6;
const TICKER_HEIGHT: u32 = 8;
const LIVE_PERIOD_SECS: u64 = 60;
const LIVE_SPAN_SECS: u64 = 20;

struct Args {
    config_path: Option<String>,
    seconds: Option<u64>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = Args {
        config_path: None,
        seconds: None,
    };
    let mut iter = env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--seconds" | "-s" => {
                let value = iter.next().context("--seconds needs a value")?;
                args.seconds = Some(
                    value
                        .parse::<u64>()
                        .with_context(|| format!("invalid --seconds value '{value}'"))?,
                );
            }
            "--help" | "-h" => {
                println!("Usage: display-scheduler [config.json] [--seconds N]");
                std::process::exit(0);
            }
            other if other.starts_with('-') => bail!("unknown option '{other}'"),
            path => args.config_path = Some(path.to_string()),
        }
    }
    Ok(args)
}

struct ClockFace;

impl ContentProvider for ClockFace {
    fn provider_id(&self) -> &str {
        "clock"
    }

    fn modes(&self) -> Vec<String> {
        vec!["clock".into()]
    }

    fn display(&mut self, _mode: &str, _force_clear: bool) -> Result<bool, ProviderError> {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| ProviderError::display(e.to_string()))?
            .as_secs();
        let (h, m, s) = ((secs / 3600) % 24, (secs / 60) % 60, secs % 60);
        render(&format!("[clock]   {h:02}:{m:02}:{s:02} UTC"));
        Ok(true)
    }

    fn display_duration(&self, _mode: &str) -> Option<f64> {
        Some(8.0)
    }
}

struct Ticker {
    engine: ScrollEngine,
}

impl Ticker {
    fn new(config: ScrollConfig) -> Self {
        let width = TICKER_TEXT.len() as u32 * GLYPH_WIDTH;
        let mut image = ComposedImage::new(width, TICKER_HEIGHT);
        for (i, byte) in TICKER_TEXT.bytes().enumerate() {
            if byte == b' ' {
                continue;
            }
            let x0 = i as u32 * GLYPH_WIDTH;
            for x in x0..x0 + GLYPH_WIDTH - 1 {
                image.set_pixel(x, 0, [255, 200, 0]);
            }
        }
        let mut engine = ScrollEngine::new(config);
        engine.set_content(image);
        Ticker { engine }
    }
}

impl ContentProvider for Ticker {
    fn provider_id(&self) -> &str {
        "ticker"
    }

    fn modes(&self) -> Vec<String> {
        vec!["ticker".into()]
    }

    fn display(&mut self, _mode: &str, force_clear: bool) -> Result<bool, ProviderError> {
        if force_clear {
            self.engine.reset();
        }
        if self.engine.update(Instant::now()).is_none() {
            return Ok(true);
        }
        let Some(frame) = self.engine.extract_visible() else {
            return Ok(false);
        };
        let strip: String = (0..frame.width())
            .step_by(GLYPH_WIDTH as usize / 2)
            .map(|x| match frame.pixel(x, 0) {
                Some([0, 0, 0]) | None => ' ',
                Some(_) => '#',
            })
            .collect();
        render(&format!("[ticker]  |{strip}| {:7.1}px", self.engine.position()));
        Ok(true)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::HIGH_RATE | Capabilities::DYNAMIC_DURATION
    }

    fn dynamic_duration_cap(&self) -> Option<f64> {
        Some(30.0)
    }

    fn cycle_duration(&self, _mode: &str) -> Result<Option<f64>, ProviderError> {
        Ok(Some(self.engine.estimated_duration(5.0, 60.0)))
    }

    fn is_cycle_complete(&self) -> Result<bool, ProviderError> {
        Ok(self.engine.is_cycle_complete())
    }

    fn reset_cycle_state(&mut self) {
        self.engine.reset();
    }
}

struct Scores {
    started: Instant,
}

impl Scores {
    fn live_now(&self) -> bool {
        self.started.elapsed().as_secs() % LIVE_PERIOD_SECS >= LIVE_PERIOD_SECS - LIVE_SPAN_SECS
    }
}

impl ContentProvider for Scores {
    fn provider_id(&self) -> &str {
        "scores"
    }

    fn modes(&self) -> Vec<String> {
        vec!["scores_recent".into(), "scores_live".into()]
    }

    fn display(&mut self, mode: &str, _force_clear: bool) -> Result<bool, ProviderError> {
        match mode {
            "scores_recent" => render("[scores]  FINAL  HOME 3 - 1 AWAY"),
            "scores_live" if self.live_now() => {
                let minute = self.started.elapsed().as_secs() % LIVE_PERIOD_SECS;
                render(&format!("[scores]  LIVE {minute:02}'  HOME 1 - 1 AWAY"));
            }
            "scores_live" => return Ok(false),
            other => return Err(ProviderError::display(format!("unknown mode '{other}'"))),
        }
        Ok(true)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::LIVE_PRIORITY
    }

    fn has_live_priority(&self) -> Result<bool, ProviderError> {
        Ok(true)
    }

    fn has_live_content(&self) -> Result<bool, ProviderError> {
        Ok(self.live_now())
    }

    fn live_modes(&self) -> Result<Vec<String>, ProviderError> {
        Ok(vec!["scores_live".into()])
    }
}

fn render(line: &str) {
    print!("\r\x1B[2K{line}");
    let _ = io::stdout().flush();
}

fn spawn_command_reader(sender: display_scheduler::CommandSender, stop: StopHandle) {
    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line == "quit" {
                stop.stop();
                break;
            }
            if let Err(e) = sender.send_json(line) {
                eprintln!("\nIgnoring command: {e}");
            }
        }
    });
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = parse_args()?;

    let config = match &args.config_path {
        Some(path) => SchedulerConfig::from_path(path)
            .with_context(|| format!("loading configuration from '{path}'"))?,
        None => SchedulerConfig::default(),
    };

    let mut registry = ProviderRegistry::new();
    registry.register(Box::new(ClockFace));
    registry.register(Box::new(Ticker::new(config.scroll)));
    registry.register(Box::new(Scores {
        started: Instant::now(),
    }));

    let (sender, receiver) = command_channel();
    let published = SharedState::new();
    let mut last_state = None;
    let watcher = published.clone();
    let report_state = move || {
        let state = watcher.latest_json().ok().flatten();
        if state.is_some() && state != last_state {
            if let Some(json) = &state {
                log::info!("on-demand state: {json}");
            }
            last_state = state;
        }
    };

    let mut scheduler = ModeScheduler::new(registry, config, Arc::new(SystemClock))
        .with_command_receiver(receiver)
        .with_state_publisher(published)
        .with_background(report_state);

    let stop = scheduler.stop_handle();
    spawn_command_reader(sender, stop.clone());

    let stats = match args.seconds {
        Some(seconds) => scheduler.run_for(Duration::from_secs(seconds)),
        None => scheduler.run(&stop),
    };
    println!();
    println!(
        "ticks {}  activations {}  advances {}  preemptions {}  failures {}",
        stats.ticks,
        stats.activations,
        stats.rotation_advances,
        stats.preemptions,
        stats.display_failures
    );
    Ok(())
}

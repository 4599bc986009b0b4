//! JDI Panel Control Tool
//!
//! Inspects the JDI 1080p driver and runs its power cycle against a
//! simulated board.

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use jdi_panel_hw::dsi::{dcs, CommandFrame, Packet, PacketFlags};
use jdi_panel_hw::sim::{SimBoard, SimDelay, SimHost, SimLine, SimRegulator, Trace};
use jdi_panel_hw::{
    DriverRegistry, JdiPanel, Panel, DEFAULT_MODE, DSI_CONFIG, INIT_SEQUENCE, JDI_1080P,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::Config;

type SimPanel = JdiPanel<SimHost, SimRegulator, SimLine, SimDelay>;
type ProbeFn = fn(&Config, &Trace) -> jdi_panel_hw::Result<SimPanel>;

#[derive(Parser)]
#[command(name = "jdipanelctl")]
#[command(about = "Bring-up tool for the JDI 1080p DSI panel")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Board description
    #[arg(short, long, default_value = "config/default.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show driver and link information
    Info,
    /// Show the display mode
    Mode {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Dump the bring-up command stream as framed packets
    Sequence,
    /// Probe, prepare, enable, disable, unprepare and remove the panel
    Cycle {
        /// Init table index whose transfer fails
        #[arg(long)]
        fail_frame: Option<usize>,

        /// Sleep for the real settle times
        #[arg(long)]
        real_delays: bool,
    },
    /// Write a default board description
    InitConfig {
        /// Output file path
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Info => handle_info(&load_config(&cli.config)?),
        Commands::Mode { json } => handle_mode(json),
        Commands::Sequence => handle_sequence(&load_config(&cli.config)?),
        Commands::Cycle {
            fail_frame,
            real_delays,
        } => {
            let mut config = load_config(&cli.config)?;
            if fail_frame.is_some() {
                config.simulation.fail_frame = fail_frame;
            }
            config.simulation.real_delays |= real_delays;
            handle_cycle(&config)
        }
        Commands::InitConfig { output } => {
            Config::default().save(&output)?;
            println!("Configuration written to: {}", output.display());
            Ok(())
        }
    }
}

/// Loads the board description, falling back to defaults when absent.
fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        warn!("{} not found, using built-in defaults", path.display());
        return Ok(Config::default());
    }
    let config = Config::load(path).context("Failed to load configuration")?;
    info!("Loaded configuration from: {}", path.display());
    Ok(config)
}

fn handle_info(config: &Config) -> Result<()> {
    println!("Driver: {}", JDI_1080P.name);
    println!("  Compatible: {}", JDI_1080P.compatible.join(", "));
    println!("  Device node: {}", config.device.compatible);
    println!("DSI link:");
    println!("  Lanes: {}", DSI_CONFIG.lanes);
    println!("  Format: {}", DSI_CONFIG.format);
    println!("  Mode flags: {:?}", DSI_CONFIG.mode_flags);
    println!("  Virtual channel: {}", config.device.virtual_channel);
    println!("Init table: {} frames", INIT_SEQUENCE.len());
    Ok(())
}

fn handle_mode(json: bool) -> Result<()> {
    let mode = &DEFAULT_MODE;
    if json {
        let value = serde_json::json!({
            "name": mode.name(),
            "clock": mode.clock,
            "hdisplay": mode.hdisplay,
            "hsync_start": mode.hsync_start,
            "hsync_end": mode.hsync_end,
            "htotal": mode.htotal,
            "vdisplay": mode.vdisplay,
            "vsync_start": mode.vsync_start,
            "vsync_end": mode.vsync_end,
            "vtotal": mode.vtotal,
            "vrefresh": mode.vrefresh,
            "flags": mode.flags,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("Mode {}:", mode);
        println!("  Clock: {} kHz", mode.clock);
        println!(
            "  Horizontal: {} active, {} front, {} sync, {} back ({} total)",
            mode.hdisplay,
            mode.hfront_porch(),
            mode.hsync_width(),
            mode.hback_porch(),
            mode.htotal
        );
        println!(
            "  Vertical: {} active, {} front, {} sync, {} back ({} total)",
            mode.vdisplay,
            mode.vfront_porch(),
            mode.vsync_width(),
            mode.vback_porch(),
            mode.vtotal
        );
    }
    Ok(())
}

fn handle_sequence(config: &Config) -> Result<()> {
    let channel = config.device.virtual_channel;
    let frames = std::iter::once(CommandFrame::dcs(&[dcs::SOFT_RESET]))
        .chain(INIT_SEQUENCE.iter().copied())
        .chain(std::iter::once(CommandFrame::dcs(&[dcs::SET_DISPLAY_ON])));

    for (i, frame) in frames.enumerate() {
        let packet = Packet::new(channel, PacketFlags::LOW_POWER, &frame)
            .with_context(|| format!("Failed to frame command {}", i))?;
        println!("{:2}  {}", i, packet);
    }
    Ok(())
}

fn probe_sim(config: &Config, trace: &Trace) -> jdi_panel_hw::Result<SimPanel> {
    let faults = config.simulation.faults();
    let mut board = SimBoard::with_trace(trace.clone(), faults.clone());
    let host = SimHost::new(trace.clone(), faults);
    let delay = SimDelay::new(trace.clone()).real_time(config.simulation.real_delays);
    jdi_panel_hw::probe(&mut board, host, delay, config.device.virtual_channel)
}

fn handle_cycle(config: &Config) -> Result<()> {
    let mut registry: DriverRegistry<ProbeFn> = DriverRegistry::new();
    registry.register(JDI_1080P, probe_sim)?;

    let (driver, probe) = registry.match_compatible(&config.device.compatible)?;
    info!("Matched {} to {}", config.device.compatible, driver.name);

    let trace = Trace::default();
    let result = run_cycle(*probe, config, &trace);

    println!("Hardware trace:");
    for event in trace.events() {
        println!("  {}", event);
    }
    result
}

fn run_cycle(probe: ProbeFn, config: &Config, trace: &Trace) -> Result<()> {
    let panel = probe(config, trace).context("Probe failed")?;

    if let Err(e) = panel.prepare() {
        jdi_panel_hw::remove(panel);
        return Err(e).context("Prepare failed");
    }
    println!("Panel {}", panel.state());

    panel.enable()?;
    for mode in panel.get_modes()? {
        println!("Mode {} ({})", mode.name, mode.timing);
    }
    println!("Panel {}", panel.state());

    panel.disable()?;
    panel.unprepare()?;
    println!("Panel {}", panel.state());

    jdi_panel_hw::remove(panel);
    Ok(())
}

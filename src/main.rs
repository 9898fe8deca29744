use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dictate_overlay::codec;
use dictate_overlay::conf::{self, Settings};
use dictate_overlay::geometry::{ScreenRect, Size};
use dictate_overlay::placement::{Direction, PlacementPolicy};
use dictate_overlay::runtime::Runtime;
use dictate_overlay::session::{HeadlessSession, TimedOp};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "dictate-overlay")]
#[command(about = "Floating overlay and popup panel management for the dictate OSD")]
#[command(version = "0.1.0")]
struct Cli {
    /// Settings file (default: ~/.config/dictate-overlay/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute a panel frame with the placement policy
    Place {
        /// Visible screen bounds as x,y,width,height
        #[arg(long, value_parser = parse_rect, default_value = "0,0,1440,900", allow_hyphen_values = true)]
        screen: ScreenRect,

        /// Panel size as WIDTHxHEIGHT
        #[arg(long, value_parser = parse_size)]
        size: Size,

        /// Anchor rectangle as x,y,width,height (omit for bottom-center placement)
        #[arg(long, value_parser = parse_rect, allow_hyphen_values = true)]
        anchor: Option<ScreenRect>,

        /// Space between anchor and panel
        #[arg(long, default_value = "6")]
        gap: f64,

        /// Side of the anchor to place on (above, below)
        #[arg(long, default_value = "above")]
        direction: Direction,

        /// Distance above the screen bottom for bottom-center placement
        #[arg(long, allow_negative_numbers = true)]
        offset: Option<f64>,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Replay an NDJSON command script against the headless window server
    Simulate {
        /// Script with one command per line
        script: PathBuf,

        /// Screen frame as x,y,width,height
        #[arg(long, value_parser = parse_rect, default_value = "0,0,1440,900", allow_hyphen_values = true)]
        screen: ScreenRect,
    },

    /// Run the overlay event loop, reading NDJSON commands from stdin
    Run {
        /// Screen frame as x,y,width,height
        #[arg(long, value_parser = parse_rect, default_value = "0,0,1440,900", allow_hyphen_values = true)]
        screen: ScreenRect,
    },

    /// Show the effective settings
    Config,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum OutputFormat {
    Text,
    Json,
}

fn parse_rect(s: &str) -> Result<ScreenRect, String> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("Invalid rectangle '{}': {}", s, e))?;

    match parts.as_slice() {
        [x, y, width, height] => Ok(ScreenRect::new(*x, *y, *width, *height)),
        _ => Err(format!("Expected x,y,width,height, got '{}'", s)),
    }
}

fn parse_size(s: &str) -> Result<Size, String> {
    let (width, height) = s
        .split_once('x')
        .ok_or_else(|| format!("Expected WIDTHxHEIGHT, got '{}'", s))?;
    let width = width
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("Invalid width '{}': {}", width, e))?;
    let height = height
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("Invalid height '{}': {}", height, e))?;
    Ok(Size::new(width, height))
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    match path {
        Some(path) => Settings::load_from(path)
            .with_context(|| format!("Failed to load settings from {}", path.display())),
        None => Ok(Settings::load()),
    }
}

fn print_op(op: &TimedOp) {
    match serde_json::to_string(op) {
        Ok(line) => println!("{}", line),
        Err(e) => log::warn!("Failed to encode op: {}", e),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_deref())?;

    match cli.command {
        Commands::Place {
            screen,
            size,
            anchor,
            gap,
            direction,
            offset,
            format,
        } => {
            let policy = match anchor {
                Some(anchor) => PlacementPolicy::anchored(anchor, gap, direction),
                None => PlacementPolicy::bottom_center(
                    offset.unwrap_or(settings.overlay.vertical_offset),
                ),
            };
            let frame = policy.place(size, Some(screen));

            match format {
                OutputFormat::Text => println!("{}", frame),
                OutputFormat::Json => println!("{}", serde_json::to_string(&frame)?),
            }
        }

        Commands::Simulate { script, screen } => {
            let contents = std::fs::read_to_string(&script)
                .with_context(|| format!("Failed to read script {}", script.display()))?;
            let commands = codec::decode_script(&contents)
                .with_context(|| format!("Failed to parse script {}", script.display()))?;
            log::info!("Replaying {} commands", commands.len());

            let mut session = HeadlessSession::new(screen, settings, Instant::now());
            for op in session.simulate(&commands) {
                print_op(&op);
            }
        }

        Commands::Run { screen } => {
            let (runtime, sender) = Runtime::new(screen, settings, Box::new(print_op))
                .context("Failed to start overlay runtime")?;

            std::thread::spawn(move || {
                let stdin = std::io::stdin();
                for line in stdin.lock().lines() {
                    let Ok(line) = line else {
                        break;
                    };
                    if codec::is_blank_or_comment(&line) {
                        continue;
                    }
                    match codec::decode_command(&line) {
                        Ok(command) => {
                            if sender.send(command).is_err() {
                                break;
                            }
                        }
                        Err(e) => log::warn!("Ignoring command: {}", e),
                    }
                }
            });

            runtime.run().context("Overlay runtime failed")?;
        }

        Commands::Config => {
            match conf::config_path() {
                Some(path) => println!("# {}", path.display()),
                None => println!("# no config directory available"),
            }
            print!("{}", settings.to_toml()?);
        }
    }

    Ok(())
}

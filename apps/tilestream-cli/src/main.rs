use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use glam::Vec3;
use tilestream_common::{GridCoord, TerrainConfig};
use tilestream_field::NoiseField;
use tilestream_render::DebugTileRenderer;
use tilestream_stream::{
    InlineSpawner, JobSpawner, TerrainStreamer, ThreadSpawner, TickTimer, Viewer,
};
use tilestream_terrain::{SynthSettings, TilePayload, synthesize};
use tilestream_tools::StreamInspector;
use tracing_subscriber::EnvFilter;

/// World units kept between the viewer and the ground below it.
const EYE_HEIGHT: f64 = 2.0;

#[derive(Parser)]
#[command(name = "tilestream-cli", about = "CLI tool for tilestream terrain streaming")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ConfigArg {
    /// YAML config file; defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl ConfigArg {
    fn load(&self) -> anyhow::Result<TerrainConfig> {
        match &self.config {
            Some(path) => TerrainConfig::load(path)
                .with_context(|| format!("loading config {}", path.display())),
            None => Ok(TerrainConfig::default()),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Print the effective configuration as YAML
    Config {
        #[command(flatten)]
        config: ConfigArg,
    },
    /// Generate one tile and print its statistics
    Tile {
        /// Tile X coordinate
        #[arg(allow_hyphen_values = true)]
        x: i64,
        /// Tile Z coordinate
        #[arg(allow_hyphen_values = true)]
        z: i64,
        /// Also print a coarse shaded heightmap
        #[arg(long)]
        shade: bool,
        #[command(flatten)]
        config: ConfigArg,
    },
    /// Walk a headless viewer across the terrain and report streaming stats
    Walk {
        /// Number of ticks to run
        #[arg(short, long, default_value = "200")]
        ticks: u64,
        /// World units moved per tick
        #[arg(short, long, default_value = "40.0")]
        speed: f32,
        /// Heading in degrees; 0 walks along +X, 90 along +Z
        #[arg(long, default_value = "0.0")]
        heading: f32,
        /// Override max_render_threads
        #[arg(long)]
        threads: Option<usize>,
        /// Generate tiles on the tick thread instead of worker threads
        #[arg(long)]
        inline: bool,
        /// Sleep between ticks when using worker threads, in milliseconds
        #[arg(long, default_value = "16")]
        tick_ms: u64,
        /// Print every tick report as a JSON line
        #[arg(long)]
        json: bool,
        /// Print the tile state map around the viewer at the end
        #[arg(long)]
        map: bool,
        #[command(flatten)]
        config: ConfigArg,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("tilestream-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("stream: {}", tilestream_stream::crate_info());
            println!("render: {}", tilestream_render::crate_info());
            println!("tools: {}", tilestream_tools::crate_info());
            let config = TerrainConfig::default();
            println!(
                "defaults: render_distance={} tile_size={} resolution={} threads={}",
                config.render_distance,
                config.tile_size,
                config.height_map_resolution,
                config.max_render_threads
            );
        }
        Commands::Config { config } => {
            let config = config.load()?;
            print!("{}", config.to_yaml_string()?);
        }
        Commands::Tile {
            x,
            z,
            shade,
            config,
        } => {
            let config = config.load()?;
            let field = NoiseField::with_seed(config.seed);
            let settings = SynthSettings::from(&config);
            let payload = synthesize(&field, GridCoord::new(x, z), &settings);
            println!("{}", StreamInspector::inspect_tile(&payload));
            if shade {
                print!("{}", shade_heights(&payload, 32));
            }
        }
        Commands::Walk {
            ticks,
            speed,
            heading,
            threads,
            inline,
            tick_ms,
            json,
            map,
            config,
        } => {
            let mut config = config.load()?;
            if let Some(threads) = threads {
                config.max_render_threads = threads;
            }
            let walk = Walk {
                ticks,
                step: heading_vector(heading) * speed,
                pause: if inline {
                    Duration::ZERO
                } else {
                    Duration::from_millis(tick_ms)
                },
                json,
                map,
            };
            let field = Arc::new(NoiseField::with_seed(config.seed));
            if inline {
                let streamer = TerrainStreamer::with_spawner(
                    config,
                    field,
                    DebugTileRenderer::new(),
                    InlineSpawner,
                )?;
                run_walk(streamer, &walk)?;
            } else {
                let streamer = TerrainStreamer::with_spawner(
                    config,
                    field,
                    DebugTileRenderer::new(),
                    ThreadSpawner,
                )?;
                run_walk(streamer, &walk)?;
            }
        }
    }

    Ok(())
}

struct Walk {
    ticks: u64,
    step: Vec3,
    pause: Duration,
    json: bool,
    map: bool,
}

/// Headless viewer driven by the walk loop.
struct Walker {
    position: Vec3,
}

impl Viewer for Walker {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn recenter(&mut self, local: Vec3) {
        self.position = local;
    }
}

fn heading_vector(degrees: f32) -> Vec3 {
    let radians = degrees.to_radians();
    Vec3::new(radians.cos(), 0.0, radians.sin())
}

fn run_walk<S: JobSpawner>(
    mut streamer: TerrainStreamer<DebugTileRenderer, S>,
    walk: &Walk,
) -> anyhow::Result<()> {
    let half = (streamer.config().tile_size * 0.5) as f32;
    let mut viewer = Walker {
        position: Vec3::new(half, EYE_HEIGHT as f32, half),
    };
    let mut timer = TickTimer::new(64);

    println!(
        "Walking {} ticks, step=({:.1}, {:.1}), r={}",
        walk.ticks,
        walk.step.x,
        walk.step.z,
        streamer.config().render_distance
    );

    for _ in 0..walk.ticks {
        let report = streamer.tick(&mut viewer);
        timer.record(report.tick_time);
        if walk.json {
            println!("{}", serde_json::to_string(&report)?);
        }

        keep_above_ground(&streamer, &mut viewer);
        viewer.position += walk.step;
        if !walk.pause.is_zero() {
            std::thread::sleep(walk.pause);
        }
    }

    let summary = StreamInspector::summary(&streamer);
    println!("{summary}");
    let counters = streamer.renderer().counters();
    println!(
        "Renderer: instances={} loaded={} evicted={} repositioned={}",
        streamer.renderer().len(),
        counters.loaded,
        counters.evicted,
        counters.repositioned
    );
    println!(
        "Tick time: avg={:?} min={:?} max={:?} (last {})",
        timer.average(),
        timer.min(),
        timer.max(),
        timer.count()
    );
    let world = streamer.viewer_world();
    println!(
        "Viewer: world=({:.1}, {:.1}, {:.1}) local=({:.1}, {:.1}, {:.1})",
        world.x, world.y, world.z, viewer.position.x, viewer.position.y, viewer.position.z
    );
    if walk.map {
        print!(
            "{}",
            StreamInspector::state_map(&streamer, streamer.config().render_distance + 1)
        );
    }
    Ok(())
}

fn keep_above_ground<S: JobSpawner>(
    streamer: &TerrainStreamer<DebugTileRenderer, S>,
    viewer: &mut Walker,
) {
    let world = streamer.local_to_world(viewer.position);
    match streamer.ground_elevation(world) {
        Ok(ground) if world.y < ground + EYE_HEIGHT => {
            let lifted = (ground + EYE_HEIGHT - world.y) as f32;
            tracing::debug!(ground, lifted, "viewer lifted above terrain");
            viewer.position.y += lifted;
        }
        Ok(_) => {}
        Err(err) => tracing::trace!(error = %err, "ground not loaded under viewer"),
    }
}

fn shade_heights(payload: &TilePayload, width: usize) -> String {
    const RAMP: &[u8] = b" .:-=+*#%@";
    let resolution = payload.heights.resolution();
    let cells = width.min(resolution).max(1);
    let span = (resolution - 1) as f64 / (cells.max(2) - 1) as f64;

    let mut out = String::new();
    for r in 0..cells {
        for c in 0..cells {
            let row = ((r as f64 * span).round() as usize).min(resolution - 1);
            let col = ((c as f64 * span).round() as usize).min(resolution - 1);
            let h = payload.height_at(row, col).clamp(0.0, 1.0);
            let index = ((h * (RAMP.len() - 1) as f32).round() as usize).min(RAMP.len() - 1);
            out.push(RAMP[index] as char);
        }
        out.push('\n');
    }
    out
}

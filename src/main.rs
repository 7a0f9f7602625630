mod stream;

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use strata_world::{FieldGenerator, WorldConfig};

#[derive(Parser, Debug)]
#[command(name = "strata", version, about = "Streaming voxel terrain: generation, meshing and edits")]
struct Args {
    /// World configuration file (TOML). Built-in defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `info,events=trace`. Overrides RUST_LOG.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Walk an observer across the world, streaming and meshing chunks around it.
    Stream(stream::StreamArgs),
    /// Print the column profile and a density/material strip at one world column.
    Sample {
        /// World voxel X.
        x: i32,
        /// World voxel Y.
        y: i32,
        /// Lowest voxel Z printed.
        #[arg(long, default_value_t = 0)]
        z_min: i32,
        /// Highest voxel Z printed; defaults to a little above the surface.
        #[arg(long)]
        z_max: Option<i32>,
    },
    /// Print the effective configuration as TOML.
    DumpConfig,
}

fn init_logging(level: Option<&str>) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(filters) = level {
        builder.parse_filters(filters);
    }
    builder.format_timestamp_millis().init();
}

fn load_config(path: Option<&PathBuf>) -> Result<WorldConfig, Box<dyn Error>> {
    let cfg = match path {
        Some(p) => {
            let cfg = WorldConfig::load(p)?;
            log::info!("loaded world config from {}", p.display());
            cfg
        }
        None => WorldConfig::default(),
    };
    Ok(cfg)
}

fn sample(cfg: &WorldConfig, x: i32, y: i32, z_min: i32, z_max: Option<i32>) {
    let g = FieldGenerator::new(cfg);
    let col = g.sample_column(x, y);
    println!("column ({x}, {y})");
    println!("  height          {:.2}", col.height);
    println!("  biome           {:?}", col.biome);
    println!("  feature         {:?}", col.feature);
    println!("  continentalness {:.3}", col.continentalness);
    println!("  erosion         {:.3}", col.erosion);
    println!("  peaks           {:.3}", col.peaks);
    println!("  temperature     {:.3}", col.temperature);
    println!("  moisture        {:.3}", col.moisture);
    println!(
        "  plateau/valley/canyon {:.3} / {:.3} / {:.3}",
        col.plateau, col.valley, col.canyon
    );
    println!("  water level     {:.2}", g.water_level(x, y));
    let top = z_max.unwrap_or(col.height.ceil() as i32 + 4).min(cfg.world_height_voxels());
    for z in (z_min..=top).rev() {
        let d = g.density(x, y, z);
        let mark = if d <= 0.0 { '#' } else { '.' };
        println!("  z={z:>5} {mark} density {d:>7.3} {}", g.material(x, y, z));
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logging(args.log_level.as_deref());
    let cfg = load_config(args.config.as_ref())?;
    match args.command {
        Command::Stream(opts) => stream::run(cfg, args.config.as_deref(), &opts)?,
        Command::Sample { x, y, z_min, z_max } => sample(&cfg, x, y, z_min, z_max),
        Command::DumpConfig => print!("{}", toml::to_string_pretty(&cfg)?),
    }
    Ok(())
}

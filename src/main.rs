//! rectlayout - resolve an anchor layout scene and print every node's rect
//! and world transform.

mod config;
mod scene;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use config::SceneConfig;
use glam::Vec2;
use scene::{render_json, render_table, Scene};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Resolve an anchor-based UI layout scene", long_about = None)]
struct Args {
    /// Scene description (TOML)
    #[arg(short, long, default_value = config::DEFAULT_SCENE_PATH)]
    scene: PathBuf,

    /// Override the target (device) resolution, e.g. 1920x1080
    #[arg(long, value_parser = parse_size)]
    target: Option<Vec2>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Fail instead of falling back to an empty scene when the file is unreadable
    #[arg(long)]
    strict: bool,

    /// Report the topmost node under a viewport point, e.g. 400,300
    #[arg(long, value_parser = parse_point)]
    hit: Option<Vec2>,

    /// Write the loaded scene back out as TOML (useful as a starting template)
    #[arg(long)]
    save: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

fn main() -> Result<()> {
    // WARN by default; override with RUST_LOG
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    info!("Starting rectlayout v{}", rectlayout_engine::VERSION);

    let args = Args::parse();
    let config = if args.strict {
        SceneConfig::load_strict(&args.scene)?
    } else {
        SceneConfig::load_from_path(&args.scene)
    };

    if let Some(path) = &args.save {
        config
            .save_to_path(path)
            .with_context(|| format!("Failed to save scene to {}", path.display()))?;
        info!("Saved scene to {}", path.display());
    }

    let mut scene = Scene::build(&config)
        .with_context(|| format!("Failed to build scene {}", args.scene.display()))?;
    if let Some(target) = args.target {
        scene.set_target(target);
    }

    let rows = scene.report();
    match args.format {
        OutputFormat::Table => print!("{}", render_table(&rows)),
        OutputFormat::Json => println!("{}", render_json(&rows)?),
    }

    if let Some(point) = args.hit {
        match scene.hit(point) {
            Some(name) => println!("hit ({}, {}): {name}", point.x, point.y),
            None => println!("hit ({}, {}): none", point.x, point.y),
        }
    }

    let stats = scene.tree().stats();
    info!(
        nodes = rows.len(),
        recomputes = stats.total(),
        "resolved scene"
    );
    Ok(())
}

fn parse_pair(value: &str, separator: char) -> Result<Vec2, String> {
    let (a, b) = value
        .split_once(separator)
        .ok_or_else(|| format!("expected two numbers separated by '{separator}', got '{value}'"))?;
    let parse = |s: &str| {
        s.trim()
            .parse::<f32>()
            .map_err(|err| format!("invalid number '{s}': {err}"))
    };
    Ok(Vec2::new(parse(a)?, parse(b)?))
}

fn parse_size(value: &str) -> Result<Vec2, String> {
    let size = parse_pair(value, 'x')?;
    if size.x < 0.0 || size.y < 0.0 {
        return Err(format!("size must not be negative, got '{value}'"));
    }
    Ok(size)
}

fn parse_point(value: &str) -> Result<Vec2, String> {
    parse_pair(value, ',')
}

use crate::config::{Config, load_config};
use crate::layout::compute_gallery;
use crate::layout::rules::parse_rule_list;
use crate::layout_dump::{gallery_json, write_gallery_dump};
use crate::parser::load_items;
#[cfg(feature = "png")]
use crate::render::write_output_png;
use crate::render::{render_svg, write_output_svg};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "gband", version, about = "Pack a media manifest into gallery bands")]
pub struct Args {
    /// Manifest file (.json / .json5) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout for JSON and SVG if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "json")]
    pub output_format: OutputFormat,

    /// Config JSON file
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Visual column count
    #[arg(short = 'n', long = "columns")]
    pub columns: Option<usize>,

    /// Generator seed; defaults to the current 8-hour epoch
    #[arg(long = "seed", allow_hyphen_values = true)]
    pub seed: Option<i64>,

    /// Comma separated rule subset, e.g. "A,I"
    #[arg(long = "rules")]
    pub rules: Option<String>,

    /// Render width in pixels (SVG/PNG)
    #[arg(short = 'w', long = "width")]
    pub width: Option<f32>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Json,
    Svg,
    Png,
}

pub fn run() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let config = resolve_config(&args)?;

    let input = read_input(args.input.as_deref())?;
    let items = load_items(&input, config.layout.clip_param)?;
    let gallery = compute_gallery(&items, &config.layout)?;

    match args.output_format {
        OutputFormat::Json => match args.output.as_deref() {
            Some(path) => write_gallery_dump(path, &gallery, &items)
                .with_context(|| format!("failed to write {}", path.display()))?,
            None => println!("{}", gallery_json(&gallery, &items)?),
        },
        OutputFormat::Svg => {
            let svg = render_svg(&gallery, &items, &config.theme, &config.render);
            write_output_svg(&svg, args.output.as_deref())?;
        }
        OutputFormat::Png => write_png(&args, &gallery, &items, &config)?,
    }
    Ok(())
}

#[cfg(feature = "png")]
fn write_png(
    args: &Args,
    gallery: &crate::layout::Gallery,
    items: &[crate::ir::Item],
    config: &Config,
) -> Result<()> {
    let output = ensure_output(&args.output, "png")?;
    let svg = render_svg(gallery, items, &config.theme, &config.render);
    write_output_png(&svg, &output, &config.render, &config.theme)
}

#[cfg(not(feature = "png"))]
fn write_png(
    _args: &Args,
    _gallery: &crate::layout::Gallery,
    _items: &[crate::ir::Item],
    _config: &Config,
) -> Result<()> {
    Err(anyhow::anyhow!("PNG output requires the `png` feature"))
}

fn init_tracing() {
    // RUST_LOG wins; otherwise only warnings reach stderr.
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .try_init();
}

fn resolve_config(args: &Args) -> Result<Config> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(columns) = args.columns {
        config.layout.columns = columns;
    }
    if let Some(seed) = args.seed {
        config.layout.seed = Some(seed);
    }
    if let Some(rules) = args.rules.as_deref() {
        config.layout.allowed_rules = Some(parse_rule_list(rules)?);
    }
    if let Some(width) = args.width {
        config.render.width = width;
    }
    config.layout.validate()?;
    Ok(config)
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path
        && path != Path::new("-")
    {
        return std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest {}", path.display()));
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

#[cfg(feature = "png")]
fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!(
        "Output path required for {} output",
        ext
    ))
}

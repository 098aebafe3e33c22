//! artwork-recolor - CLI entry point
//!
//! Thin wrapper around the library: argument parsing, logging setup and
//! command dispatch.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use env_logger::{Builder, Env};
use log::info;

use artwork_recolor::{
    clean_dir, is_stale, run_job, run_manifest, touch, Background, BackgroundSetting, BuildJob,
    BuildLayout, BuildManifest, Color, RasterOptions, RecolorProfile,
};

/// Recolor SVG logos and icons for light and dark themes
#[derive(Parser, Debug)]
#[command(name = "artwork-recolor")]
#[command(version)]
#[command(about = "Recolor SVG logos and icons for light and dark themes", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Log level: error, warn, info, debug, trace
    #[arg(short, long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Normalize exported source SVGs in place
    Clean {
        /// Directory of source SVG files
        #[arg(long, default_value = "source")]
        source: PathBuf,
    },

    /// Recolor a single SVG file
    Color {
        /// Input SVG file
        #[arg(short = 'i', long = "in")]
        input: PathBuf,

        /// Brand color (name or hex)
        #[arg(short = 'c', long)]
        base_color: Color,

        /// Background: 0-255 for a brand-tinted gray, or a color
        #[arg(short = 'b', long)]
        bg: Option<Background>,

        /// Element to hide, e.g. `caret` or `no-caret` (repeatable)
        #[arg(long)]
        hide: Vec<String>,

        /// Raster output width
        #[arg(short = 'W', long, default_value_t = 0, conflicts_with = "height")]
        width: u32,

        /// Raster output height
        #[arg(short = 'H', long, default_value_t = 0)]
        height: u32,

        /// Raster scaling factor when no width or height is given
        #[arg(short, long, default_value_t = 1.0)]
        scale: f32,

        /// Output file; the extension picks the format (svg, png)
        #[arg(short, long = "out", required = true)]
        output: Vec<PathBuf>,
    },

    /// Build every themed variant, preview and the splash animation
    Build {
        /// Project directory containing `source/`
        #[arg(long, default_value = ".")]
        base: PathBuf,

        /// Source SVG directory (default: `<base>/source`)
        #[arg(long)]
        source: Option<PathBuf>,

        /// Output directory (default: `<base>/build`)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Preview and splash directory (default: `<base>/.meta`)
        #[arg(long)]
        meta: Option<PathBuf>,

        /// JSON manifest to run instead of the standard plan
        #[arg(short, long)]
        manifest: Option<PathBuf>,

        /// Rebuild even if nothing changed since the last build
        #[arg(short, long)]
        force: bool,

        /// Print the manifest as JSON and exit
        #[arg(long)]
        print_manifest: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    Builder::from_env(Env::default().default_filter_or(&args.log_level)).init();

    match args.command {
        Commands::Clean { source } => {
            let cleaned = clean_dir(&source)
                .with_context(|| format!("failed to clean {}", source.display()))?;
            info!("Cleaned {} files", cleaned.len());
        }

        Commands::Color {
            input,
            base_color,
            bg,
            hide,
            width,
            height,
            scale,
            output,
        } => {
            let mut profile = RecolorProfile::new(base_color.to_hex()).with_raster(RasterOptions {
                width,
                height,
                scale,
            });
            profile.background = bg.as_ref().map(BackgroundSetting::from);
            profile.hide = hide;

            let job = BuildJob {
                input,
                outputs: output,
                profile,
            };
            run_job(&job).with_context(|| format!("failed to color {}", job.input.display()))?;
        }

        Commands::Build {
            base,
            source,
            out,
            meta,
            manifest,
            force,
            print_manifest,
        } => {
            let mut layout = BuildLayout::under(&base);
            if let Some(source) = source {
                layout.source = source;
            }
            if let Some(out) = out {
                layout.output = out;
            }
            if let Some(meta) = meta {
                layout.meta = meta;
            }
            let manifest = match manifest {
                Some(path) => BuildManifest::load(&path)
                    .with_context(|| format!("failed to load manifest {}", path.display()))?,
                None => BuildManifest::standard(&layout),
            };

            if print_manifest {
                println!("{}", manifest.to_json_pretty()?);
                return Ok(());
            }

            let stamp = base.join(".update");
            if !force && !is_stale(&stamp, &layout.source)? {
                info!("Artwork is up to date");
                return Ok(());
            }

            clean_dir(&layout.source)
                .with_context(|| format!("failed to clean {}", layout.source.display()))?;
            run_manifest(&manifest)?;
            touch(&stamp)?;
        }
    }

    Ok(())
}

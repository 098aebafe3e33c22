//! Batch builds: the standard light/dark/preview plan, job execution and the
//! splash animation.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, RgbaImage};
use log::{debug, info};
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::document::Document;
use crate::error::{Error, Result};
use crate::export::{self, flatten_on_white, ExportError, RasterOptions};
use crate::profile::{BackgroundSetting, BuildJob, BuildManifest, RecolorProfile};
use crate::recolor::RecolorStats;

/// Brand color of the default light and dark artwork.
pub const DEFAULT_BRAND: &str = "#333";

/// Height, in pixels, of preview images.
pub const PREVIEW_HEIGHT: u32 = 80;

/// Delay between splash animation frames.
pub const SPLASH_FRAME_DELAY_MS: u32 = 500;

/// Preview variants: name and brand color.
pub const PREVIEW_COLORS: &[(&str, &str)] = &[
    ("light", DEFAULT_BRAND),
    ("dark", DEFAULT_BRAND),
    ("red", "#f00"),
    ("orange", "#ff7f00"),
    ("yellow", "#ff0"),
    ("green", "#0f0"),
    ("blue", "#00f"),
    ("indigo", "#4b0082"),
    ("violet", "#8b00ff"),
];

/// Artwork sources every build renders.
pub const SOURCES: &[&str] = &["logo", "icon"];

// ============================================================================
// Standard plan
// ============================================================================

/// Directories used by the standard build plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildLayout {
    /// Cleaned source SVGs (`logo.svg`, `icon.svg`).
    pub source: PathBuf,
    /// Output root; SVGs go to `svg/`, PNGs to `png/`.
    pub output: PathBuf,
    /// Splash frames, splash GIF and `preview/` images.
    pub meta: PathBuf,
}

impl BuildLayout {
    /// The conventional layout under a project directory.
    pub fn under(base: &Path) -> Self {
        Self {
            source: base.join("source"),
            output: base.join("build"),
            meta: base.join(".meta"),
        }
    }

    fn source_svg(&self, name: &str) -> PathBuf {
        self.source.join(format!("{}.svg", name))
    }

    fn preview(&self, name: &str) -> PathBuf {
        self.meta.join("preview").join(format!("{}.png", name))
    }
}

impl BuildManifest {
    /// The standard plan: themed logo and icon, splash frames, and previews.
    pub fn standard(layout: &BuildLayout) -> Self {
        let mut jobs = Vec::new();

        for source in SOURCES {
            for (theme, background) in [("light", None), ("dark", Some(BackgroundSetting::Level(0)))] {
                let name = format!("{}_{}", source, theme);
                let mut profile = RecolorProfile::new(DEFAULT_BRAND);
                profile.background = background;
                jobs.push(BuildJob {
                    input: layout.source_svg(source),
                    outputs: vec![
                        layout.output.join("svg").join(format!("{}.svg", name)),
                        layout.output.join("png").join(format!("{}.png", name)),
                    ],
                    profile,
                });
            }
        }

        let splash_frames = vec![layout.meta.join("splash1.png"), layout.meta.join("splash2.png")];
        jobs.push(BuildJob {
            input: layout.source_svg("logo"),
            outputs: vec![splash_frames[0].clone()],
            profile: RecolorProfile::new(DEFAULT_BRAND).with_hidden("caret"),
        });
        jobs.push(BuildJob {
            input: layout.source_svg("logo"),
            outputs: vec![splash_frames[1].clone()],
            profile: RecolorProfile::new(DEFAULT_BRAND),
        });

        for (name, color) in PREVIEW_COLORS {
            for (sub, level) in [("light", 255u8), ("dark", 0u8)] {
                // The plain light and dark previews only exist on their own backdrop.
                if matches!(*name, "light" | "dark") && *name != sub {
                    continue;
                }
                for source in SOURCES {
                    let mut profile = RecolorProfile::new(*color)
                        .with_raster(RasterOptions::with_height(PREVIEW_HEIGHT));
                    if *name != "light" {
                        profile.background = Some(BackgroundSetting::Level(level));
                    }
                    jobs.push(BuildJob {
                        input: layout.source_svg(source),
                        outputs: vec![layout.preview(&format!("{}_{}_{}", source, name, sub))],
                        profile,
                    });
                }
            }
        }

        Self {
            jobs,
            splash_frames,
            splash: Some(layout.meta.join("splash.gif")),
        }
    }
}

// ============================================================================
// Freshness
// ============================================================================

/// Returns true when `stamp` is missing or older than any file under `source`.
pub fn is_stale(stamp: &Path, source: &Path) -> Result<bool> {
    let Ok(stamp_time) = fs::metadata(stamp).and_then(|m| m.modified()) else {
        return Ok(true);
    };

    let mut newest = SystemTime::UNIX_EPOCH;
    for entry in WalkDir::new(source) {
        let entry = entry?;
        if entry.file_type().is_file() {
            let modified = entry.metadata()?.modified().map_err(|source| Error::Io {
                path: entry.path().to_path_buf(),
                source,
            })?;
            newest = newest.max(modified);
        }
    }
    Ok(stamp_time < newest)
}

/// Creates or truncates the stamp file.
pub fn touch(stamp: &Path) -> Result<()> {
    File::create(stamp).map(drop).map_err(|source| Error::Io {
        path: stamp.to_path_buf(),
        source,
    })
}

// ============================================================================
// Execution
// ============================================================================

/// Recolors one input and writes every output of the job.
pub fn run_job(job: &BuildJob) -> Result<RecolorStats> {
    info!("Coloring: {}", job.input.display());
    let recolorer = job.profile.recolorer()?;
    let mut doc = Document::open(&job.input)?;
    let stats = recolorer.apply(&mut doc)?;

    for output in &job.outputs {
        export::save(&doc, output, &job.profile.raster)?;
    }
    Ok(stats)
}

/// Runs every job of a manifest, then assembles the splash animation.
///
/// Jobs are independent and run in parallel; the first failure is returned.
pub fn run_manifest(manifest: &BuildManifest) -> Result<Vec<RecolorStats>> {
    let stats = manifest
        .jobs
        .par_iter()
        .map(run_job)
        .collect::<Result<Vec<_>>>()?;

    if let Some(splash) = &manifest.splash {
        if !manifest.splash_frames.is_empty() {
            assemble_splash(&manifest.splash_frames, splash)?;
        }
    }

    info!("Built {} jobs", stats.len());
    Ok(stats)
}

// ============================================================================
// Splash animation
// ============================================================================

/// Loads rendered frames from disk and writes them as a looping GIF.
pub fn assemble_splash(frame_paths: &[PathBuf], output: &Path) -> std::result::Result<(), ExportError> {
    let frames = frame_paths
        .iter()
        .map(|path| image::open(path).map(|img| img.to_rgba8()))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    write_splash_gif(&frames, output)
}

/// Encodes frames, flattened on white, as an endlessly looping GIF.
pub fn write_splash_gif(frames: &[RgbaImage], output: &Path) -> std::result::Result<(), ExportError> {
    info!("Writing: {}", output.display());
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent).map_err(|source| ExportError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let file = File::create(output).map_err(|source| ExportError::Io {
        path: output.to_path_buf(),
        source,
    })?;

    let mut encoder = GifEncoder::new(BufWriter::new(file));
    encoder.set_repeat(Repeat::Infinite)?;
    for frame in frames {
        debug!("Splash frame {}x{}", frame.width(), frame.height());
        let delay = Delay::from_numer_denom_ms(SPLASH_FRAME_DELAY_MS, 1);
        encoder.encode_frame(Frame::from_parts(flatten_on_white(frame), 0, 0, delay))?;
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use image::AnimationDecoder;
    use image::codecs::gif::GifDecoder;
    use std::io::BufReader;

    const LOGO: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 40 20">
  <rect class="v_background" fill="#ffffff" width="40" height="20"/>
  <path class="v_caret" fill="#000000" d="M0 0h10v10h-10z"/>
  <path class="v_letters" fill="#ff0000" d="M20 0h10v10h-10z"/>
</svg>"##;

    fn project() -> (tempfile::TempDir, BuildLayout) {
        let dir = tempfile::tempdir().unwrap();
        let layout = BuildLayout::under(dir.path());
        fs::create_dir_all(&layout.source).unwrap();
        for source in SOURCES {
            fs::write(layout.source_svg(source), LOGO).unwrap();
        }
        (dir, layout)
    }

    #[test]
    fn standard_plan_shape() {
        let layout = BuildLayout::under(Path::new("proj"));
        let manifest = BuildManifest::standard(&layout);

        // 4 themed + 2 splash + 32 previews.
        assert_eq!(manifest.jobs.len(), 38);
        assert_eq!(manifest.splash, Some(PathBuf::from("proj/.meta/splash.gif")));

        let dark_logo = &manifest.jobs[1];
        assert_eq!(dark_logo.input, PathBuf::from("proj/source/logo.svg"));
        assert_eq!(dark_logo.outputs[0], PathBuf::from("proj/build/svg/logo_dark.svg"));
        assert_eq!(dark_logo.profile.background, Some(BackgroundSetting::Level(0)));

        let splash1 = &manifest.jobs[4];
        assert_eq!(splash1.profile.hide, vec!["caret".to_string()]);
        assert!(manifest.jobs[5].profile.hide.is_empty());
    }

    #[test]
    fn standard_previews() {
        let layout = BuildLayout::under(Path::new("proj"));
        let manifest = BuildManifest::standard(&layout);
        let find = |name: &str| {
            let path = layout.preview(name);
            manifest.jobs.iter().find(|job| job.outputs[0] == path)
        };

        let light = find("logo_light_light").unwrap();
        assert_eq!(light.profile.background, None);
        assert_eq!(light.profile.raster.height, PREVIEW_HEIGHT);
        assert!(find("logo_light_dark").is_none());
        assert!(find("icon_dark_light").is_none());

        let red_dark = find("icon_red_dark").unwrap();
        assert_eq!(red_dark.profile.base_color, "#f00");
        assert_eq!(red_dark.profile.background, Some(BackgroundSetting::Level(0)));
        assert_eq!(
            find("logo_violet_light").unwrap().profile.background,
            Some(BackgroundSetting::Level(255))
        );
    }

    #[test]
    fn staleness_follows_stamp() {
        let (dir, layout) = project();
        let stamp = dir.path().join(".update");
        assert!(is_stale(&stamp, &layout.source).unwrap());

        touch(&stamp).unwrap();
        let later = SystemTime::now() + std::time::Duration::from_secs(60);
        File::options()
            .write(true)
            .open(&stamp)
            .unwrap()
            .set_modified(later)
            .unwrap();
        assert!(!is_stale(&stamp, &layout.source).unwrap());
    }

    #[test]
    fn run_job_writes_outputs() {
        let (dir, layout) = project();
        let out = dir.path().join("build/svg/logo_dark.svg");
        let job = BuildJob {
            input: layout.source_svg("logo"),
            outputs: vec![out.clone(), dir.path().join("build/png/logo_dark.png")],
            profile: RecolorProfile::new("#333").with_background(BackgroundSetting::Level(0)),
        };

        let stats = run_job(&job).unwrap();
        assert_eq!(stats.recolored, 2);
        assert_eq!(stats.backgrounds, 1);

        let svg = fs::read_to_string(&out).unwrap();
        assert!(!svg.contains("#ff0000"));
        let png = image::open(dir.path().join("build/png/logo_dark.png")).unwrap();
        assert_eq!((png.width(), png.height()), (40, 20));
    }

    #[test]
    fn run_job_reports_bad_profile() {
        let (_dir, layout) = project();
        let job = BuildJob {
            input: layout.source_svg("logo"),
            outputs: vec![],
            profile: RecolorProfile::new("#12"),
        };
        assert!(matches!(run_job(&job), Err(Error::Color(_))));
    }

    #[test]
    fn run_manifest_assembles_splash() {
        let (dir, layout) = project();
        let manifest = BuildManifest::standard(&layout);
        let stats = run_manifest(&manifest).unwrap();
        assert_eq!(stats.len(), manifest.jobs.len());

        assert!(layout.preview("icon_indigo_dark").exists());
        assert!(dir.path().join("build/svg/icon_light.svg").exists());

        let gif = File::open(layout.meta.join("splash.gif")).unwrap();
        let decoder = GifDecoder::new(BufReader::new(gif)).unwrap();
        let frames = decoder.into_frames().collect_frames().unwrap();
        assert_eq!(frames.len(), 2);
        // Flattened on white: no transparency left.
        assert!(frames[0].buffer().pixels().all(|p| p[3] == 255));
    }
}

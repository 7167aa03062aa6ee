//! PNG renditions of the SVG artwork in Updates/
//!
//! Banner and icon PNGs referenced by the descriptor are rendered from SVG
//! sources with Inkscape, or ImageMagick when Inkscape is not installed.

use crate::stages::vcs::Git;
use crate::ui::log::RunLog;
use anyhow::{Context, Result, bail};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

const SQUARE: &[(u32, u32)] = &[(128, 128), (256, 256)];
const BANNER: &[(u32, u32)] = &[(772, 250), (1544, 500)];

/// External rasterizer found on PATH
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Converter {
  Inkscape(PathBuf),
  ImageMagick(PathBuf),
}

impl Converter {
  /// Inkscape first, then ImageMagick's `convert`
  pub fn detect() -> Option<Self> {
    if let Ok(path) = which::which("inkscape") {
      return Some(Self::Inkscape(path));
    }
    which::which("convert").ok().map(Self::ImageMagick)
  }

  fn program(&self) -> &Path {
    match self {
      Self::Inkscape(path) | Self::ImageMagick(path) => path,
    }
  }

  pub fn args(&self, svg: &Path, png: &Path, (width, height): (u32, u32)) -> Vec<OsString> {
    match self {
      Self::Inkscape(_) => vec![
        "--export-filename".into(),
        png.into(),
        "--export-width".into(),
        width.to_string().into(),
        "--export-height".into(),
        height.to_string().into(),
        svg.into(),
      ],
      Self::ImageMagick(_) => vec![
        "-background".into(),
        "transparent".into(),
        "-resize".into(),
        format!("{}x{}", width, height).into(),
        svg.into(),
        png.into(),
      ],
    }
  }

  fn convert(&self, svg: &Path, png: &Path, size: (u32, u32)) -> Result<()> {
    let output = Command::new(self.program())
      .args(self.args(svg, png, size))
      .output()
      .with_context(|| format!("Failed to run {}", self.program().display()))?;
    if !output.status.success() {
      bail!(
        "converting {} failed: {}",
        svg.display(),
        String::from_utf8_lossy(&output.stderr).trim()
      );
    }
    Ok(())
  }
}

/// Output sizes by file name: logos/icons are square, banners are wide
pub fn sizes_for(file_name: &str) -> Vec<(u32, u32)> {
  let name = file_name.to_lowercase();
  if name.contains("logo") || name.contains("icon") {
    SQUARE.to_vec()
  } else if name.contains("banner") {
    BANNER.to_vec()
  } else {
    SQUARE.iter().chain(BANNER).copied().collect()
  }
}

/// `<stem>-<w>x<h>.png` next to the SVG
pub fn output_path(svg: &Path, (width, height): (u32, u32)) -> PathBuf {
  let stem = svg.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
  svg.with_file_name(format!("{}-{}x{}.png", stem, width, height))
}

fn is_svg(name: &str) -> bool {
  name.to_lowercase().ends_with(".svg")
}

/// SVG files of `updates_dir` to render, sorted by name
///
/// In a git repository only SVGs git reports as changed are selected.
pub fn candidates(work_dir: &Path, updates_dir: &Path) -> Result<Vec<PathBuf>> {
  let mut names: Vec<String> = match Git::open(work_dir) {
    Some(git) => git
      .changed_files()
      .iter()
      .filter(|f| is_svg(f))
      .filter_map(|f| Path::new(f).file_name().map(|n| n.to_string_lossy().into_owned()))
      .collect(),
    None => fs::read_dir(updates_dir)
      .with_context(|| format!("Failed to list {}", updates_dir.display()))?
      .filter_map(|entry| entry.ok())
      .filter(|entry| entry.path().is_file())
      .map(|entry| entry.file_name().to_string_lossy().into_owned())
      .filter(|name| is_svg(name))
      .collect(),
  };
  names.sort();
  names.dedup();

  Ok(
    names
      .into_iter()
      .map(|name| updates_dir.join(name))
      .filter(|path| path.is_file())
      .collect(),
  )
}

/// Render PNGs for the changed SVGs; returns the files written
pub fn run(work_dir: &Path, updates_dir: &Path, log: &RunLog) -> Result<Vec<PathBuf>> {
  if !updates_dir.is_dir() {
    return Ok(Vec::new());
  }

  let svgs = candidates(work_dir, updates_dir)?;
  if svgs.is_empty() {
    log.detail("no SVG files to convert");
    return Ok(Vec::new());
  }

  let Some(converter) = Converter::detect() else {
    log.warn("Neither inkscape nor convert (ImageMagick) found, skipping SVG conversion");
    return Ok(Vec::new());
  };

  log.info(format!("🖼️  Converting {} SVG file(s)...", svgs.len()));
  let mut written = Vec::new();
  for svg in &svgs {
    let name = svg.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    for size in sizes_for(&name) {
      let png = output_path(svg, size);
      converter.convert(svg, &png, size)?;
      log.detail(format!("converted {} -> {}", name, png.display()));
      written.push(png);
    }
  }
  log.info(format!("✅ {} PNG file(s) written", written.len()));
  Ok(written)
}

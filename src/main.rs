mod archive;
mod commands;
mod core;
mod metadata;
mod remote;
mod source;
mod stages;
mod ui;
mod utils;

use clap::Parser;
use core::context::{ReleaseContext, RunOptions};
use core::error::{ReleaseError, print_error};
use std::path::PathBuf;

/// Package a WordPress plugin release and publish it to its update server
#[derive(Parser)]
#[command(name = "plugin-release")]
#[command(version, about, long_about = None)]
#[command(styles = get_styles())]
struct Cli {
  /// Plugin directory containing update.config (default: current directory)
  work_dir: Option<PathBuf>,

  /// Build the archive and descriptor but do not upload them
  #[arg(long)]
  no_upload: bool,

  /// Skip the CHANGELOG.md stage
  #[arg(long)]
  no_changelog: bool,

  /// Skip SVG to PNG conversion
  #[arg(long)]
  no_images: bool,

  /// Skip the GitHub commit/tag/push stage
  #[arg(long)]
  no_git: bool,

  /// Approve the GitHub stage without prompting
  #[arg(short, long)]
  yes: bool,
}

impl Cli {
  fn options(&self) -> RunOptions {
    RunOptions {
      upload: !self.no_upload,
      changelog: !self.no_changelog,
      images: !self.no_images,
      git: !self.no_git,
      assume_yes: self.yes,
    }
  }
}

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .valid(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

fn main() {
  let cli = Cli::parse();

  let work_dir = match cli.work_dir.clone() {
    Some(dir) => dir,
    None => match std::env::current_dir() {
      Ok(dir) => dir,
      Err(e) => handle_error(ReleaseError::message(format!("Failed to get current directory: {}", e))),
    },
  };

  let ctx = match ReleaseContext::build(&work_dir, cli.options()) {
    Ok(ctx) => ctx,
    Err(e) => handle_error(e),
  };

  if let Err(e) = commands::run_release(&ctx) {
    handle_error(e);
  }
}

fn handle_error(err: ReleaseError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}

//! Release command: the whole pipeline for one plugin directory
//!
//! Stage policy:
//! - fail-fast: descriptor load, version extraction, source patch, archive
//!   build, descriptor persist
//! - fail-soft: changelog, images, upload, git bookkeeping
//!
//! A fail-soft stage that errors is logged and the run goes on with the
//! artifacts produced so far.

use crate::archive::{ArchiveBuilder, ArchiveSummary, ExclusionSet};
use crate::core::context::{DESCRIPTOR_FILE, ReleaseContext};
use crate::core::error::{DescriptorError, ReleaseError, ReleaseResult, ResultExt, log_error};
use crate::metadata::model::ReleaseMetadata;
use crate::metadata::sections::{changelog_html, changelog_plain};
use crate::metadata::store::MetadataStore;
use crate::remote::{self, AssetOutcome, RemoteSync, RemoteTarget, UploadOutcome};
use crate::source::extract::VersionExtractor;
use crate::source::patch::{IntegrationTarget, MARKER_TIME_FORMAT, SourcePatcher};
use crate::stages::{changelog, images, vcs};
use std::fs;
use std::path::Path;

/// What a completed run produced
#[derive(Debug)]
pub struct ReleaseReport {
  pub version: String,
  pub slug: String,
  pub archive: ArchiveSummary,
  pub download_url: String,
  /// Whether update_info.json was rewritten
  pub descriptor_written: bool,
  /// Fail-soft stages that reported an error
  pub soft_failures: Vec<String>,
}

/// Run the release pipeline
///
/// Fail-fast errors are appended to the run log before they are returned.
pub fn run_release(ctx: &ReleaseContext) -> ReleaseResult<ReleaseReport> {
  run(ctx).inspect_err(|err| log_error(&ctx.log, err))
}

fn run(ctx: &ReleaseContext) -> ReleaseResult<ReleaseReport> {
  let log = &ctx.log;
  let mut soft_failures = Vec::new();

  log.info(format!(
    "🚀 plugin-release {} in {}",
    env!("CARGO_PKG_VERSION"),
    ctx.root.display()
  ));

  let mut store = MetadataStore::load(&ctx.descriptor_path())?;

  // Version
  let main_file = ctx.main_file();
  let source = fs::read_to_string(&main_file).with_context(|| format!("Failed to read {}", main_file.display()))?;
  let extraction = VersionExtractor::new(ctx.config.version_policy).extract(&main_file, &source)?;
  for decl in &extraction.declarations {
    log.detail(format!("{} declares {}", decl.kind, decl.value));
  }
  let version = extraction.winner.clone();
  log.info(format!("🔢 Current version: {}", version));

  // Slug, settled before the source patch references it
  let slug = store.metadata.effective_slug();
  if slug.trim().is_empty() {
    return Err(
      DescriptorError::NoSlug {
        path: store.path().to_path_buf(),
      }
      .into(),
    );
  }
  if store.metadata.slug.as_deref().is_none_or(str::is_empty) {
    log.info(format!("Slug not set, using '{}'", slug));
    store.metadata.slug = Some(slug.clone());
  }

  // Source patch
  let timestamp = chrono::Local::now().format(MARKER_TIME_FORMAT).to_string();
  let patcher = SourcePatcher::new(&main_file, timestamp.clone());
  let target = IntegrationTarget {
    url: store.metadata.descriptor_url(),
    slug: slug.clone(),
  };
  let outcome = patcher.patch(&source, &extraction, &target)?;
  for change in &outcome.changes {
    log.detail(change);
  }
  let backup = patcher.write(&outcome.text)?;
  log.info(format!(
    "✏️  {} updated ({} change(s), backup {})",
    file_name(&main_file),
    outcome.changes.len(),
    file_name(&backup)
  ));

  // Descriptor version
  if store.reconcile(&version, &timestamp, ctx.config.version_policy) {
    log.info(format!("📄 {} raised to {}", DESCRIPTOR_FILE, version));
  } else {
    log.detail(format!("{} already at {}", DESCRIPTOR_FILE, store.metadata.version));
  }

  if ctx.options.changelog
    && let Some(text) = soft(ctx, "changelog", &mut soft_failures, changelog::run(&ctx.root, &version, log))
      .flatten()
  {
    store.metadata.set_changelog(changelog_html(&text));
  }

  if ctx.options.images {
    soft(ctx, "images", &mut soft_failures, images::run(&ctx.root, &ctx.updates_dir(), log));
  }

  // Archive
  let exclusions = ExclusionSet::new(&ctx.config.skip_pattern)?;
  log.detail(format!("Skip patterns: {}", exclusions.patterns().collect::<Vec<_>>().join(", ")));
  let archive_name = format!("{}-v{}.zip", slug, version);
  let archive_path = ctx.updates_dir().join(&archive_name);
  log.info(format!("📦 Building {}...", archive_name));
  let archive = ArchiveBuilder::new(&ctx.root, &slug, &exclusions, log).build(&archive_path)?;
  log.info(format!("✅ {} ({} files, {} bytes)", archive_name, archive.files, archive.bytes));
  log.info(format!("   sha256 {}", archive.sha256));

  store.metadata.set_download_file(&archive_name);
  log.info(format!("🔗 Download URL: {}", store.metadata.download_url));

  let descriptor_written = match store.persist()? {
    Some(backup) => {
      log.info(format!("📄 {} written (backup {})", DESCRIPTOR_FILE, file_name(&backup)));
      true
    }
    None => {
      log.info(format!("📄 {} unchanged", DESCRIPTOR_FILE));
      false
    }
  };

  // Upload
  if !ctx.options.upload {
    log.info("Upload disabled");
  } else if !ctx.config.upload_enabled() {
    log.info("No upload target configured, skipping upload");
  } else if soft(
    ctx,
    "upload",
    &mut soft_failures,
    upload(ctx, &store.metadata, &archive.path, store.path()),
  )
  .is_some()
  {
    log.info("✅ Upload completed");
  }

  // Git bookkeeping
  if ctx.options.git {
    let message = store.metadata.changelog().map(changelog_plain);
    soft(
      ctx,
      "git",
      &mut soft_failures,
      vcs::run(&ctx.root, &version, message.as_deref(), ctx.options.assume_yes, log),
    );
  }

  if soft_failures.is_empty() {
    log.info("🎉 Release process completed");
  } else {
    log.info(format!(
      "🎉 Release process completed with errors in: {}",
      soft_failures.join(", ")
    ));
  }

  Ok(ReleaseReport {
    version,
    slug,
    download_url: store.metadata.download_url.clone(),
    archive,
    descriptor_written,
    soft_failures,
  })
}

/// Log a fail-soft stage error and keep going
fn soft<T, E: Into<ReleaseError>>(
  ctx: &ReleaseContext,
  stage: &str,
  failures: &mut Vec<String>,
  result: Result<T, E>,
) -> Option<T> {
  match result {
    Ok(value) => Some(value),
    Err(err) => {
      let err = err.into();
      ctx.log.warn(format!("{} stage failed: {}", stage, err));
      failures.push(stage.to_string());
      None
    }
  }
}

/// Push archive, descriptor and image assets to the update server
fn upload(ctx: &ReleaseContext, metadata: &ReleaseMetadata, archive: &Path, descriptor: &Path) -> ReleaseResult<()> {
  let log = &ctx.log;
  let target = RemoteTarget::resolve(&ctx.config.ssh_dir_base, &metadata.download_url)?;
  log.info(format!("⬆️  Uploading to {}", target.dir));

  let backend = remote::open_backend(&ctx.config, log)?;
  let mut sync = RemoteSync::new(backend, target, log);
  sync.prepare();

  sync.upload(archive).context("archive upload failed")?;
  sync
    .upload_as(descriptor, DESCRIPTOR_FILE)
    .context("descriptor upload failed")?;

  let assets = metadata.assets();
  if !assets.is_empty() {
    let results = sync.upload_assets(&assets, &ctx.updates_dir())?;
    let sent = results
      .iter()
      .filter(|(_, outcome)| matches!(outcome, AssetOutcome::Uploaded(UploadOutcome::Uploaded { .. })))
      .count();
    log.detail(format!("{} of {} image asset(s) transferred", sent, results.len()));
  }
  Ok(())
}

fn file_name(path: &Path) -> String {
  path
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_else(|| path.display().to_string())
}

//! Tests for the changelog stage

use crate::helpers::*;
use anyhow::Result;

const CHANGELOG: &str = "# Changelog\n\n## [1.1.0] - 2024-05-01\n\n- Faster uploads\n- Fixed <b> escaping\n\n## [1.0.0] - 2024-01-01\n\n- First release\n";

#[test]
fn test_existing_section_lands_in_descriptor() -> Result<()> {
  let project = PluginProject::new()?;
  project.write_file("CHANGELOG.md", CHANGELOG)?;

  let output = release_command(&project.path, &["--no-upload"])
    .env("AUTO_CHANGELOG", "1")
    .output()?;
  assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

  let descriptor = project.descriptor()?;
  assert_eq!(
    descriptor["sections"]["changelog"],
    "<ul><li>Faster uploads</li><li>Fixed &lt;b&gt; escaping</li></ul>"
  );
  // Other sections survive next to the new one
  assert_eq!(descriptor["sections"]["description"], "<p>Demo & more</p>");
  Ok(())
}

#[test]
fn test_empty_preview_leaves_changelog_alone() -> Result<()> {
  let project = PluginProject::new()?;
  project.write_file(
    "CHANGELOG.md",
    "# Changelog\n\n## [1.0.0] - 2024-01-01\n\n- First release\n",
  )?;

  let output = release_command(&project.path, &["--no-upload"])
    .env("AUTO_CHANGELOG", "1")
    .output()?;
  assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

  // Outside a git repository there is nothing to propose for 1.1.0
  assert_eq!(
    project.read_file("CHANGELOG.md")?,
    "# Changelog\n\n## [1.0.0] - 2024-01-01\n\n- First release\n"
  );
  assert!(project.descriptor()?["sections"].get("changelog").is_none());
  Ok(())
}

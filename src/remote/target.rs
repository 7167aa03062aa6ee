//! Remote directory derived from the public download URL
//!
//! `https://example.com/a/b/file.zip` with base `/var/www` lives in
//! `/var/www/a/b`: the URL path minus its file name, under the base directory.

use crate::core::error::{ReleaseResult, RemoteError};
use percent_encoding::percent_decode_str;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
  /// Remote directory, no trailing separator (empty = login directory)
  pub dir: String,
}

impl RemoteTarget {
  /// Resolve the remote directory for `download_url` under `base_dir`
  ///
  /// Path segments are percent-decoded: the server directory is the one the
  /// web server maps the URL to, not the URL's escaped spelling.
  pub fn resolve(base_dir: &str, download_url: &str) -> ReleaseResult<Self> {
    let raw_path = match Url::parse(download_url) {
      Ok(url) if url.cannot_be_a_base() => {
        return Err(RemoteError::UrlHasNoFilename {
          url: download_url.to_string(),
        }
        .into());
      }
      Ok(url) => url.path().to_string(),
      // Scheme-less values are taken as a bare path
      Err(_) => download_url.split(['?', '#']).next().unwrap_or_default().to_string(),
    };

    if raw_path.is_empty() || raw_path.ends_with('/') {
      return Err(RemoteError::UrlEndsInDirectory {
        url: download_url.to_string(),
      }
      .into());
    }

    let mut segments: Vec<String> = raw_path
      .split('/')
      .filter(|segment| !segment.is_empty())
      .map(|segment| percent_decode_str(segment).decode_utf8_lossy().into_owned())
      .collect();

    let file = segments.pop().unwrap_or_default();
    if file.is_empty() || file == "." || file == ".." {
      return Err(RemoteError::UrlHasNoFilename {
        url: download_url.to_string(),
      }
      .into());
    }

    let mut dir = base_dir.trim_end_matches('/').to_string();
    for segment in segments {
      dir.push('/');
      dir.push_str(&segment);
    }
    Ok(Self { dir })
  }

  /// Remote path of a file inside the target directory
  pub fn file(&self, name: &str) -> String {
    if self.dir.is_empty() {
      name.to_string()
    } else {
      format!("{}/{}", self.dir, name)
    }
  }
}

/// Last path segment of an asset URL, if it is a well-formed URL with one
pub fn url_file_name(raw: &str) -> Option<String> {
  let url = Url::parse(raw).ok()?;
  let name = url.path_segments()?.next_back()?;
  (!name.is_empty()).then(|| percent_decode_str(name).decode_utf8_lossy().into_owned())
}

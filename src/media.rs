//! Local image host: data URL uploads written to a directory and served
//! back as static files.
use log::*;

use std::path::PathBuf;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tokio::fs;
use uuid::Uuid;

use crate::app::AppConfig;
use crate::error::*;

pub const DEFAULT_MEDIA_DIR: &str = "media";
pub const DEFAULT_BASE_URL: &str = "/media";

#[async_trait(?Send)]
pub trait MediaHost {
  /// Store a `data:<mime>;base64,<payload>` image, returning its URL.
  async fn upload(&self, data: &str) -> Result<String>;

  /// Remove a previously uploaded image.  Unknown ids are ignored.
  async fn destroy(&self, public_id: &str) -> Result<()>;
}

pub fn is_data_url(value: &str) -> bool {
  value.starts_with("data:")
}

/// Last path segment of `url` up to its first `.`.
pub fn public_id_from_url(url: &str) -> Option<&str> {
  let file = url.rsplit('/').next()?;
  let id = file.split('.').next()?;
  if id.is_empty() {
    None
  } else {
    Some(id)
  }
}

/// Upload a new image.  Only data URLs are accepted, so every stored image
/// URL names a file created for that record.
pub async fn host_image(media: &dyn MediaHost, value: &str) -> Result<String> {
  if !is_data_url(value) {
    return Err(Error::validation("Image must be a data URL"));
  }
  media.upload(value).await
}

/// Remove a hosted image, failures are only logged.
pub async fn discard_image(media: &dyn MediaHost, url: &str) {
  if let Some(public_id) = public_id_from_url(url) {
    if let Err(err) = media.destroy(public_id).await {
      warn!("Failed to remove image {}: {}", url, err);
    }
  }
}

fn extension_for(mime: &str) -> &str {
  match mime {
    "image/jpeg" | "image/jpg" => "jpg",
    "image/svg+xml" => "svg",
    _ => match mime.split_once('/') {
      Some((_, sub)) if !sub.is_empty() && sub.chars().all(|c| c.is_ascii_alphanumeric()) => sub,
      _ => "bin",
    },
  }
}

/// Split a data URL into its extension and decoded bytes.
fn decode_data_url(data: &str) -> Result<(&str, Vec<u8>)> {
  let invalid = || Error::validation("Invalid image data");
  let rest = data.strip_prefix("data:").ok_or_else(invalid)?;
  let (mime, payload) = rest.split_once(";base64,").ok_or_else(invalid)?;
  let bytes = STANDARD.decode(payload.trim()).map_err(|_| invalid())?;
  if bytes.is_empty() {
    return Err(invalid());
  }
  Ok((extension_for(mime), bytes))
}

#[derive(Debug, Clone)]
pub struct DiskMedia {
  pub dir: PathBuf,
  pub base_url: String,
}

impl DiskMedia {
  pub fn new(dir: impl Into<PathBuf>, base_url: &str) -> Self {
    Self {
      dir: dir.into(),
      base_url: base_url.trim_end_matches('/').to_string(),
    }
  }

  pub fn from_config(config: &AppConfig) -> Result<Self> {
    let dir = config.get_str("media.dir")?.unwrap_or_else(|| DEFAULT_MEDIA_DIR.to_string());
    let base_url = config.get_str("media.base_url")?
      .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    Ok(Self::new(dir, &base_url))
  }
}

#[async_trait(?Send)]
impl MediaHost for DiskMedia {
  async fn upload(&self, data: &str) -> Result<String> {
    let (ext, bytes) = decode_data_url(data)?;
    let file = format!("{}.{}", Uuid::new_v4().simple(), ext);
    fs::create_dir_all(&self.dir).await?;
    fs::write(self.dir.join(&file), &bytes).await?;
    debug!("media: stored {} ({} bytes)", file, bytes.len());
    Ok(format!("{}/{}", self.base_url, file))
  }

  async fn destroy(&self, public_id: &str) -> Result<()> {
    if public_id.is_empty() || public_id.contains(|c| matches!(c, '/' | '\\' | '.')) {
      return Ok(());
    }
    let mut entries = match fs::read_dir(&self.dir).await {
      Ok(entries) => entries,
      Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
      Err(err) => return Err(err.into()),
    };
    while let Some(entry) = entries.next_entry().await? {
      let name = entry.file_name();
      let name = name.to_string_lossy();
      if public_id_from_url(&name) == Some(public_id) {
        fs::remove_file(entry.path()).await?;
        debug!("media: removed {}", name);
      }
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const PNG: &str = "data:image/png;base64,iVBORw0KGgo=";

  #[test]
  fn public_id_is_last_segment_stem() {
    assert_eq!(public_id_from_url("http://host/media/abc123.png"), Some("abc123"));
    assert_eq!(public_id_from_url("/media/abc.tar.gz"), Some("abc"));
    assert_eq!(public_id_from_url("plain"), Some("plain"));
    assert_eq!(public_id_from_url("http://host/media/"), None);
  }

  #[test]
  fn data_url_decoding() {
    let (ext, bytes) = decode_data_url(PNG).unwrap();
    assert_eq!(ext, "png");
    assert_eq!(&bytes[1..4], b"PNG");

    assert_eq!(decode_data_url("data:image/jpeg;base64,AAAA").unwrap().0, "jpg");
    assert!(decode_data_url("http://host/a.png").is_err());
    assert!(decode_data_url("data:image/png,plain").is_err());
    assert!(decode_data_url("data:image/png;base64,!!!").is_err());
  }

  #[actix_rt::test]
  async fn upload_then_destroy() {
    let dir = tempfile::tempdir().unwrap();
    let media = DiskMedia::new(dir.path().join("media"), "/media/");

    let url = media.upload(PNG).await.unwrap();
    assert!(url.starts_with("/media/"));
    assert!(url.ends_with(".png"));

    let id = public_id_from_url(&url).unwrap();
    let file = dir.path().join("media").join(format!("{}.png", id));
    assert!(file.exists());

    media.destroy(id).await.unwrap();
    assert!(!file.exists());
    // already gone
    media.destroy(id).await.unwrap();
  }

  #[actix_rt::test]
  async fn only_data_urls_are_hosted() {
    let dir = tempfile::tempdir().unwrap();
    let media = DiskMedia::new(dir.path(), "/media");

    let url = host_image(&media, PNG).await.unwrap();
    let err = host_image(&media, &url).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert!(host_image(&media, "http://elsewhere/x.png").await.is_err());
  }

  #[actix_rt::test]
  async fn destroy_without_dir_is_ok() {
    let dir = tempfile::tempdir().unwrap();
    let media = DiskMedia::new(dir.path().join("missing"), "/media");
    media.destroy("abc").await.unwrap();
  }
}

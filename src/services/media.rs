use log::*;

use std::path::PathBuf;

use actix_web::web;

use crate::error::*;
use crate::app::*;
use crate::media::{DEFAULT_BASE_URL, DEFAULT_MEDIA_DIR};

/// Serves uploaded images as static files.
#[derive(Debug, Clone)]
pub struct MediaService {
  pub dir: PathBuf,
  pub mount: String,
}

impl super::Service for MediaService {
  fn load_app_config(&mut self, config: &AppConfig, _prefix: &str) -> Result<()> {
    if let Some(dir) = config.get_path("media.dir")? {
      self.dir = dir;
    }
    if let Some(base_url) = config.get_str("media.base_url")? {
      self.mount = mount_path(&base_url);
    }
    info!("Media: serving {:?} at {}", self.dir, self.mount);
    Ok(())
  }

  fn web_config(&self, web: &mut web::ServiceConfig) {
    if let Err(err) = std::fs::create_dir_all(&self.dir) {
      warn!("Media: can't create {:?}: {}", self.dir, err);
    }
    web.service(actix_files::Files::new(&self.mount, &self.dir));
  }
}

/// Path part of the public base url, `http://host/media` mounts at `/media`.
fn mount_path(base_url: &str) -> String {
  let path = match base_url.split_once("://") {
    Some((_, rest)) => rest.find('/').map(|idx| &rest[idx..]).unwrap_or(""),
    None => base_url,
  };
  let path = path.trim_end_matches('/');
  if path.is_empty() {
    "/".to_string()
  } else {
    path.to_string()
  }
}

pub fn new_factory() -> MediaService {
  MediaService {
    dir: PathBuf::from(DEFAULT_MEDIA_DIR),
    mount: DEFAULT_BASE_URL.to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn mount_from_base_url() {
    assert_eq!(mount_path("/media"), "/media");
    assert_eq!(mount_path("/media/"), "/media");
    assert_eq!(mount_path("https://cdn.example.com/static/media"), "/static/media");
    assert_eq!(mount_path("http://localhost:8080"), "/");
  }
}

use log::*;

use std::collections::HashMap;
use std::sync::Arc;

use actix_web::{web, HttpRequest};

use crate::error::*;
use crate::app::*;
use crate::auth::SessionKeys;
use crate::db::{Backend, Store};
use crate::media::{DiskMedia, MediaHost};

mod auth;
mod user;
mod post;
mod notification;
mod media;

/// Largest accepted JSON body, images arrive inline as data URLs.
pub const JSON_LIMIT: usize = 10 * 1024 * 1024;

type BoxService = Box<dyn Service>;

pub trait Service: ServiceClone + Send {
  /// Load Service config from AppConfig.
  fn load_app_config(&mut self, config: &AppConfig, prefix: &str) -> Result<()>;

  /// Setup Service endpoints.
  fn web_config(&self, _web: &mut web::ServiceConfig) {
  }

  fn api_config(&self, _web: &mut web::ServiceConfig) {
  }
}

pub trait ServiceClone {
  fn clone_box(&self) -> BoxService;
}

impl<T> ServiceClone for T
where
    T: 'static + Service + Clone,
{
  fn clone_box(&self) -> BoxService {
    Box::new(self.clone())
  }
}

impl Clone for BoxService {
  fn clone(&self) -> BoxService {
    self.clone_box()
  }
}

fn json_error(err: actix_web::error::JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
  debug!("Rejected json body: {}", err);
  Error::validation(format!("Invalid request body: {}", err)).into()
}

fn query_error(err: actix_web::error::QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
  Error::validation(format!("Invalid query: {}", err)).into()
}

fn path_error(err: actix_web::error::PathError, _req: &HttpRequest) -> actix_web::Error {
  Error::validation(format!("Invalid path: {}", err)).into()
}

#[derive(Clone)]
pub struct Services {
  backend: Backend,
  session: SessionKeys,
  media: DiskMedia,
  services: Vec<BoxService>,
}

impl Services {
  pub fn new(backend: Backend, session: SessionKeys, media: DiskMedia) -> Services {
    Services {
      backend,
      session,
      media,
      services: Vec::new(),
    }
  }

  fn load_service(&mut self, name: &str, config: &AppConfig, prefix: &str) -> Result<BoxService> {
    let mut service: BoxService = match name {
      "Auth" => Box::new(auth::new_factory()),
      "User" => Box::new(user::new_factory()),
      "Post" => Box::new(post::new_factory()),
      "Notification" => Box::new(notification::new_factory()),
      "Media" => Box::new(media::new_factory()),
      _ => {
        return Err(anyhow::anyhow!("Unknown Service: {}", name).into());
      },
    };

    service.load_app_config(config, prefix)?;
    Ok(service)
  }

  /// Load Service config from AppConfig.
  pub fn load_app_config(&mut self, config: &AppConfig, prefix: &str) -> Result<()> {
    let mut loaded: HashMap<String, bool> = HashMap::new();
    let list = config.get_str_list(&format!("{}.services", prefix))?;
    if list.is_empty() {
      return Err(anyhow::anyhow!("missing list of services: {}.services", prefix).into());
    }
    for name in list {
      info!("Loading {}Service config", name);
      // check if it is loaded already.
      if loaded.contains_key(&name) {
        return Err(anyhow::anyhow!("can't load service multiple times: {}", name).into());
      }
      loaded.insert(name.clone(), true);
      // load service
      let service = self.load_service(&name, config, prefix)?;
      self.services.push(service);
    }
    Ok(())
  }

  /// Setup Service endpoints.
  pub fn web_config(&self, web: &mut web::ServiceConfig) {
    // Open the store for this worker.
    let store: Arc<dyn Store> = self.backend.open();
    let media: Arc<dyn MediaHost> = Arc::new(self.media.clone());
    web
      .app_data(web::Data::from(store))
      .app_data(web::Data::from(media))
      .app_data(web::Data::new(self.session.clone()))
      .app_data(web::JsonConfig::default().limit(JSON_LIMIT).error_handler(json_error))
      .app_data(web::QueryConfig::default().error_handler(query_error))
      .app_data(web::PathConfig::default().error_handler(path_error));

    for service in self.services.iter() {
      service.web_config(web);
    }
    web.service(
      web::scope("/api")
        .configure(|web| {
          for service in self.services.iter() {
            service.api_config(web);
          }
        })
    );
  }
}

pub fn config_services(config: &AppConfig, prefix: &str) -> Result<Services> {
  let db_url = config.require_str("db.url")?;
  let backend = Backend::from_url(&db_url);
  let session = SessionKeys::from_config(config)?;
  let media = DiskMedia::from_config(config)?;

  let mut services = Services::new(backend, session, media);
  services.load_app_config(config, prefix)?;
  Ok(services)
}

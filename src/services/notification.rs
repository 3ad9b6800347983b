use log::*;

use actix_web::{delete, get, web, HttpResponse};

use crate::error::*;
use crate::app::*;
use crate::forms::MessageOut;

use crate::db::{populate::*, Store};
use crate::middleware::AuthUser;

/// list notifications, then mark them read
#[get("/notifications")]
async fn list(
  auth: AuthUser,
  store: web::Data<dyn Store>,
) -> Result<HttpResponse> {
  let notifications = store.notifications_for(auth.id()).await?;
  let details = populate_notifications(store.get_ref(), notifications).await?;

  let marked = store.mark_notifications_read(auth.id()).await?;
  debug!("notifications: user={} listed={} marked={}", auth.id(), details.len(), marked);
  Ok(HttpResponse::Ok().json(details))
}

/// delete all notifications
#[delete("/notifications")]
async fn clear(
  auth: AuthUser,
  store: web::Data<dyn Store>,
) -> Result<HttpResponse> {
  let deleted = store.delete_notifications(auth.id()).await?;
  debug!("notifications: user={} deleted={}", auth.id(), deleted);
  Ok(HttpResponse::Ok().json(MessageOut::new("Notifications deleted")))
}

#[derive(Debug, Clone, Default)]
pub struct NotificationService;

impl super::Service for NotificationService {
  fn load_app_config(&mut self, _config: &AppConfig, _prefix: &str) -> Result<()> {
    Ok(())
  }

  fn api_config(&self, web: &mut web::ServiceConfig) {
    web
      .service(list)
      .service(clear);
  }
}

pub fn new_factory() -> NotificationService {
  Default::default()
}

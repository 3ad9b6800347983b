use anyhow::anyhow;

use tokio_postgres::Row;

use crate::error::*;
use crate::models::*;

use crate::db::*;
use crate::db::util::*;

#[derive(Clone)]
pub struct NotificationService {
  notifications_for: VersionedStatement,
  mark_read: VersionedStatement,
  delete_all: VersionedStatement,
}

lazy_static! {
  static ref NOTIFICATION_COLUMNS: ColumnMappers = {
    ColumnMappers {
      table_name: "notifications",
      columns: vec![
        generated("id"),
        column("from_id"),
        column("to_id"),
        column("kind"),
        column("read"),
        generated("created_at"),
      ],
    }
  };
}

fn notification_from_row(row: &Row) -> Result<Notification> {
  let kind: &str = row.get(3);
  Ok(Notification {
    id: row.get(0),
    from_id: row.get(1),
    to_id: row.get(2),
    kind: kind.parse::<NotificationKind>().map_err(|err| anyhow!(err))?,
    read: row.get(4),
    created_at: row.get(5),
  })
}

impl NotificationService {
  pub fn new(cl: SharedClient) -> NotificationService {
    let stmt = |query: &str| VersionedStatement::new(cl.clone(), query);

    NotificationService {
      notifications_for: stmt(&format!("{} WHERE to_id = $1 ORDER BY id",
        NOTIFICATION_COLUMNS.build_select_query())),
      mark_read: stmt("UPDATE notifications SET read = TRUE WHERE to_id = $1 AND NOT read"),
      delete_all: stmt("DELETE FROM notifications WHERE to_id = $1"),
    }
  }

  pub async fn prepare(&self) -> Result<()> {
    self.notifications_for.prepare().await?;
    self.mark_read.prepare().await?;
    self.delete_all.prepare().await?;
    Ok(())
  }

  pub async fn list(&self, to: i32) -> Result<Vec<Notification>> {
    let rows = self.notifications_for.query(&[&to]).await?;
    rows.iter().map(notification_from_row).collect()
  }

  pub async fn mark_read(&self, to: i32) -> Result<u64> {
    self.mark_read.execute(&[&to]).await
  }

  pub async fn delete_all(&self, to: i32) -> Result<u64> {
    self.delete_all.execute(&[&to]).await
  }
}

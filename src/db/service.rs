use log::*;

use std::rc::Rc;
use std::cell::RefCell;
use std::time::Duration;

use async_trait::async_trait;

use tokio::time::sleep;

use tokio_postgres::{
  connect, Client, Statement, Row, NoTls,
  types::ToSql,
};

use crate::error::*;
use crate::models::*;

use super::{
  Store,
  UserService,
  PostService,
  NotificationService,
};

const MAX_RETRIES: u32 = 10;

pub type RefClient = Rc<(u64, Client)>;

/// Client connected state
#[derive(Clone)]
pub enum ClientState {
  Disconnected(u64),
  Connecting(u64),
  Connected(RefClient),
}

/// A postgres client shared by all statements of one worker.
/// Each time the client reconnects a new version number is generated.
#[derive(Clone)]
pub struct SharedClient {
  state: Rc<RefCell<ClientState>>,
}

impl SharedClient {
  pub fn new(url: &str) -> Self {
    let shared_cl = Self {
      state: Rc::new(RefCell::new(ClientState::Disconnected(0))),
    };
    let task_cl = shared_cl.clone();
    let url = url.to_string();
    actix_rt::spawn(async move {
      task_cl.run_client(url).await;
      debug!("client background task stopped.");
    });
    shared_cl
  }

  async fn run_client(&self, url: String) {
    let mut version = 0;
    loop {
      version += 1;
      debug!("client task: Connecting: ver={}", version);
      self.set_state(ClientState::Connecting(version));
      let (cl, conn) = loop {
        match connect(&url, NoTls).await {
          Ok(res) => break res,
          Err(e) => {
            debug!("client task: ver={}: connect error: {}", version, e);
            sleep(Duration::from_millis(500)).await;
          },
        }
      };
      debug!("client task: ver={}: Connecting -> Connected", version);
      self.set_state(ClientState::Connected(Rc::new((version, cl))));
      // Drive the connection until it closes.
      match conn.await {
        Err(e) => {
          warn!("postgres connection error: {}", e);
        },
        Ok(_) => {
          debug!("postgres connection closed.");
          self.set_state(ClientState::Disconnected(version));
          return;
        },
      }
      debug!("client task: ver={}: Connected -> Connecting", version);
      sleep(Duration::from_millis(500)).await;
    }
  }

  pub async fn get_client(&self) -> Result<RefClient> {
    let mut retries = 0u32;
    loop {
      match self.get_state() {
        ClientState::Connected(cl) => return Ok(cl),
        ClientState::Connecting(version) | ClientState::Disconnected(version) => {
          debug!("get_client: ver={}: waiting for connection", version);
          sleep(Duration::from_millis(100)).await;
        },
      }
      retries += 1;
      if retries >= MAX_RETRIES {
        return Err(Error::DisconnectedError("Failed to connect to database".to_string()));
      }
    }
  }

  /// Check client version.
  pub fn check_version(&self, version: u64) -> bool {
    match *self.state.borrow() {
      ClientState::Connected(ref cl) => cl.0 == version,
      _ => false,
    }
  }

  fn get_state(&self) -> ClientState {
    self.state.borrow().clone()
  }

  fn set_state(&self, state: ClientState) {
    self.state.replace(state);
  }
}

#[derive(Clone)]
pub struct ClientStatement {
  cl: RefClient,
  statement: Statement,
}

impl ClientStatement {
  pub fn get_version(&self) -> u64 {
    self.cl.0
  }
}

/// A prepared statement that re-prepares itself after a reconnect.
#[derive(Clone)]
pub struct VersionedStatement {
  shared_cl: SharedClient,

  /// Prepared against the client version stored inside.
  prepared: RefCell<Option<Rc<ClientStatement>>>,

  query: String,
}

macro_rules! impl_client_method {
  ($method:ident, $res_ty:ty) => {
    pub async fn $method(&self, params: &[&(dyn ToSql + Sync)]) -> Result<$res_ty> {
      let mut retries = 0;
      loop {
        let prepared = self.get_statement().await?;

        match prepared.cl.1.$method(&prepared.statement, params).await {
          Ok(res) => return Ok(res),
          Err(err) if err.is_closed() => {
            retries += 1;
            if retries >= MAX_RETRIES {
              return Err(Error::DisconnectedError(
                "Failed to connect to database".to_string()));
            }
            info!("DB connection closed, retry query.");
            sleep(Duration::from_millis(100)).await;
          },
          Err(err) => {
            debug!("Postgres error: {}, query=[[{}]]", err, self.query);
            return Err(err.into());
          },
        }
      }
    }
  };
}

impl VersionedStatement {
  pub fn new(shared_cl: SharedClient, query: &str) -> Self {
    Self {
      shared_cl,
      prepared: RefCell::new(None),
      query: query.to_string(),
    }
  }

  pub async fn prepare(&self) -> Result<()> {
    self.get_statement().await?;
    Ok(())
  }

  pub async fn get_statement(&self) -> Result<Rc<ClientStatement>> {
    let mut retries = 0u32;
    loop {
      let current = self.prepared.borrow().clone();
      if let Some(prepared) = current {
        if self.shared_cl.check_version(prepared.get_version()) {
          return Ok(prepared);
        }
        debug!("get_statement: ver={}: stale, prepare again", prepared.get_version());
        self.prepared.replace(None);
      }

      let cl = self.shared_cl.get_client().await?;
      match cl.1.prepare(&self.query).await {
        Ok(statement) => {
          let prepared = Rc::new(ClientStatement {
            cl,
            statement,
          });
          self.prepared.replace(Some(prepared.clone()));
          return Ok(prepared);
        },
        Err(err) if err.is_closed() => {
          debug!("get_statement: connection closed while preparing");
        },
        Err(err) => {
          error!("Postgres prepare error: {}, query=[[{}]]", err, self.query);
          return Err(err.into());
        },
      }

      retries += 1;
      if retries >= MAX_RETRIES {
        return Err(Error::DisconnectedError("Failed to connect to database".to_string()));
      }
      sleep(Duration::from_millis(100)).await;
    }
  }

  impl_client_method!(query, Vec<Row>);
  impl_client_method!(query_one, Row);
  impl_client_method!(query_opt, Option<Row>);
  impl_client_method!(execute, u64);
}

/// Postgres store, one per worker.
#[derive(Clone)]
pub struct DbService {
  pub shared_cl: SharedClient,
  pub user: UserService,
  pub post: PostService,
  pub notification: NotificationService,
}

impl DbService {
  pub fn new(db_url: &str) -> DbService {
    let shared_cl = SharedClient::new(db_url);

    DbService {
      user: UserService::new(shared_cl.clone()),
      post: PostService::new(shared_cl.clone()),
      notification: NotificationService::new(shared_cl.clone()),
      shared_cl,
    }
  }

  /// Apply a batch of SQL statements, used for the schema.
  pub async fn batch_execute(&self, sql: &str) -> Result<()> {
    let cl = self.shared_cl.get_client().await?;
    cl.1.batch_execute(sql).await?;
    Ok(())
  }
}

#[async_trait(?Send)]
impl Store for DbService {
  async fn prepare(&self) -> Result<()> {
    info!("DBService: Prepare UserService.");
    self.user.prepare().await?;
    info!("DBService: Prepare PostService.");
    self.post.prepare().await?;
    info!("DBService: Prepare NotificationService.");
    self.notification.prepare().await?;

    info!("DBService: finished.");
    Ok(())
  }

  async fn user_by_id(&self, id: i32) -> Result<Option<User>> {
    self.user.get_by_id(id).await
  }

  async fn user_by_username(&self, username: &str) -> Result<Option<User>> {
    self.user.get_by_username(username).await
  }

  async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
    self.user.get_by_email(email).await
  }

  async fn users_by_ids(&self, ids: &[i32]) -> Result<Vec<User>> {
    self.user.get_by_ids(ids).await
  }

  async fn insert_user(&self, user: &NewUser) -> Result<User> {
    self.user.insert(user).await
  }

  async fn update_user(&self, user: &User) -> Result<()> {
    self.user.update(user).await
  }

  async fn sample_users(&self, exclude: i32, size: i64) -> Result<Vec<User>> {
    self.user.sample(exclude, size).await
  }

  async fn follower_ids(&self, user_id: i32) -> Result<Vec<i32>> {
    self.user.follower_ids(user_id).await
  }

  async fn following_ids(&self, user_id: i32) -> Result<Vec<i32>> {
    self.user.following_ids(user_id).await
  }

  async fn toggle_follow(&self, actor: i32, target: i32) -> Result<FollowChange> {
    self.user.toggle_follow(actor, target).await
  }

  async fn insert_post(&self, post: &NewPost) -> Result<Post> {
    self.post.insert(post).await
  }

  async fn post_by_id(&self, id: i32) -> Result<Option<Post>> {
    self.post.get_by_id(id).await
  }

  async fn delete_post(&self, id: i32) -> Result<u64> {
    self.post.delete(id).await
  }

  async fn list_posts(&self, filter: PostFilter, skip: i64, limit: i64) -> Result<(Vec<Post>, i64)> {
    self.post.list(filter, skip, limit).await
  }

  async fn toggle_like(&self, actor: i32, post: &Post) -> Result<LikeChange> {
    self.post.toggle_like(actor, post.id).await
  }

  async fn likes_for(&self, post_ids: &[i32]) -> Result<Vec<Like>> {
    self.post.likes_for(post_ids).await
  }

  async fn liked_post_ids(&self, user_id: i32) -> Result<Vec<i32>> {
    self.post.liked_post_ids(user_id).await
  }

  async fn insert_comment(&self, post_id: i32, user_id: i32, text: &str) -> Result<Comment> {
    self.post.insert_comment(post_id, user_id, text).await
  }

  async fn comments_for(&self, post_ids: &[i32]) -> Result<Vec<Comment>> {
    self.post.comments_for(post_ids).await
  }

  async fn notifications_for(&self, to: i32) -> Result<Vec<Notification>> {
    self.notification.list(to).await
  }

  async fn mark_notifications_read(&self, to: i32) -> Result<u64> {
    self.notification.mark_read(to).await
  }

  async fn delete_notifications(&self, to: i32) -> Result<u64> {
    self.notification.delete_all(to).await
  }
}

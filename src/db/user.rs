use chrono::Utc;

use tokio_postgres::Row;

use crate::error::*;
use crate::models::*;

use crate::db::*;
use crate::db::util::*;

/// Constraint name to conflict message.
const USER_UNIQUE: &[(&str, &str)] = &[
  ("users_username_key", "Username already exists"),
  ("users_email_key", "Email already exists"),
];

#[derive(Clone)]
pub struct UserService {
  // gets
  user_by_id: VersionedStatement,
  user_by_email: VersionedStatement,
  user_by_username: VersionedStatement,
  users_by_ids: VersionedStatement,
  sample_users: VersionedStatement,

  // store user
  insert_user: VersionedStatement,
  update_user: VersionedStatement,

  // follow graph
  follower_ids: VersionedStatement,
  following_ids: VersionedStatement,
  follow: VersionedStatement,
  unfollow: VersionedStatement,
}

lazy_static! {
  static ref USER_COLUMNS: ColumnMappers = {
    ColumnMappers {
      table_name: "users",
      columns: vec![
        generated("id"),
        column("username"),
        column("email"),
        column("password"),
        column("full_name"),
        column("bio"),
        column("link"),
        column("profile_picture"),
        column("cover_picture"),
        generated("created_at"),
        column("updated_at"),
      ],
    }
  };
}

fn user_from_row(row: &Row) -> User {
  User {
    id: row.get(0),
    username: row.get(1),
    email: row.get(2),
    password: row.get(3),
    full_name: row.get(4),
    bio: row.get(5),
    link: row.get(6),
    profile_picture: row.get(7),
    cover_picture: row.get(8),
    created_at: row.get(9),
    updated_at: row.get(10),
  }
}

// A new edge notifies the followed user in the same statement.
static FOLLOW: &str = r#"
WITH edge AS (
  INSERT INTO follows(follower_id, followee_id) VALUES($1, $2)
  ON CONFLICT DO NOTHING
  RETURNING follower_id, followee_id
)
INSERT INTO notifications(from_id, to_id, kind)
SELECT follower_id, followee_id, 'follow' FROM edge
"#;

impl UserService {
  pub fn new(cl: SharedClient) -> UserService {
    let select = USER_COLUMNS.build_select_query();
    let stmt = |query: &str| VersionedStatement::new(cl.clone(), query);

    UserService {
      user_by_id: stmt(&format!("{} WHERE id = $1", select)),
      user_by_email: stmt(&format!("{} WHERE email = $1", select)),
      user_by_username: stmt(&format!("{} WHERE username = $1", select)),
      users_by_ids: stmt(&format!("{} WHERE id = ANY($1)", select)),
      sample_users: stmt(&format!("{} WHERE id <> $1 ORDER BY random() LIMIT $2", select)),

      insert_user: stmt(&USER_COLUMNS.build_insert_query()),
      update_user: stmt(&USER_COLUMNS.build_update_where("id")),

      follower_ids: stmt(r#"SELECT follower_id FROM follows WHERE followee_id = $1
        ORDER BY created_at, follower_id"#),
      following_ids: stmt(r#"SELECT followee_id FROM follows WHERE follower_id = $1
        ORDER BY created_at, followee_id"#),
      follow: stmt(FOLLOW),
      unfollow: stmt("DELETE FROM follows WHERE follower_id = $1 AND followee_id = $2"),
    }
  }

  pub async fn prepare(&self) -> Result<()> {
    self.user_by_id.prepare().await?;
    self.user_by_email.prepare().await?;
    self.user_by_username.prepare().await?;
    self.users_by_ids.prepare().await?;
    self.sample_users.prepare().await?;

    self.insert_user.prepare().await?;
    self.update_user.prepare().await?;

    self.follower_ids.prepare().await?;
    self.following_ids.prepare().await?;
    self.follow.prepare().await?;
    self.unfollow.prepare().await?;
    Ok(())
  }

  pub async fn get_by_id(&self, id: i32) -> Result<Option<User>> {
    let row = self.user_by_id.query_opt(&[&id]).await?;
    Ok(row.as_ref().map(user_from_row))
  }

  pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
    let row = self.user_by_email.query_opt(&[&email]).await?;
    Ok(row.as_ref().map(user_from_row))
  }

  pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
    let row = self.user_by_username.query_opt(&[&username]).await?;
    Ok(row.as_ref().map(user_from_row))
  }

  pub async fn get_by_ids(&self, ids: &[i32]) -> Result<Vec<User>> {
    if ids.is_empty() {
      return Ok(Vec::new());
    }
    let rows = self.users_by_ids.query(&[&ids]).await?;
    Ok(rows.iter().map(user_from_row).collect())
  }

  pub async fn sample(&self, exclude: i32, size: i64) -> Result<Vec<User>> {
    let rows = self.sample_users.query(&[&exclude, &size]).await?;
    Ok(rows.iter().map(user_from_row).collect())
  }

  pub async fn insert(&self, user: &NewUser) -> Result<User> {
    let empty = "";
    let now = Utc::now();
    let row = self.insert_user.query_one(&[
      &user.username, &user.email, &user.password, &user.full_name,
      &empty, &empty, &empty, &empty, &now,
    ]).await.map_err(|err| map_unique_violation(err, USER_UNIQUE))?;
    Ok(user_from_row(&row))
  }

  pub async fn update(&self, user: &User) -> Result<()> {
    let now = Utc::now();
    self.update_user.execute(&[
      &user.username, &user.email, &user.password, &user.full_name,
      &user.bio, &user.link, &user.profile_picture, &user.cover_picture, &now,
      &user.id,
    ]).await.map_err(|err| map_unique_violation(err, USER_UNIQUE))?;
    Ok(())
  }

  pub async fn follower_ids(&self, user_id: i32) -> Result<Vec<i32>> {
    let rows = self.follower_ids.query(&[&user_id]).await?;
    Ok(rows.iter().map(|row| row.get(0)).collect())
  }

  pub async fn following_ids(&self, user_id: i32) -> Result<Vec<i32>> {
    let rows = self.following_ids.query(&[&user_id]).await?;
    Ok(rows.iter().map(|row| row.get(0)).collect())
  }

  pub async fn toggle_follow(&self, actor: i32, target: i32) -> Result<FollowChange> {
    // Removing first keeps each branch a single statement.
    if self.unfollow.execute(&[&actor, &target]).await? > 0 {
      return Ok(FollowChange::Unfollowed);
    }
    self.follow.execute(&[&actor, &target]).await?;
    Ok(FollowChange::Followed)
  }
}

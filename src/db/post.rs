use tokio_postgres::Row;

use crate::error::*;
use crate::models::*;

use crate::db::*;
use crate::db::util::*;

/// One listing: page query and total count.
#[derive(Clone)]
struct ListStatements {
  page: VersionedStatement,
  count: VersionedStatement,
}

#[derive(Clone)]
pub struct PostService {
  // get one post
  post_by_id: VersionedStatement,

  // store/delete post
  insert_post: VersionedStatement,
  delete_post: VersionedStatement,

  // listings
  list_all: ListStatements,
  list_by_owner: ListStatements,
  list_liked_by: ListStatements,
  list_followed_by: ListStatements,

  // (un)like post
  like_post: VersionedStatement,
  unlike_post: VersionedStatement,
  likes_for: VersionedStatement,
  liked_post_ids: VersionedStatement,

  // comments
  insert_comment: VersionedStatement,
  comments_for: VersionedStatement,
}

lazy_static! {
  static ref POST_COLUMNS: ColumnMappers = {
    ColumnMappers {
      table_name: "posts",
      columns: vec![
        generated("id"),
        column("user_id"),
        column("text"),
        column("image"),
        generated("created_at"),
        generated("updated_at"),
      ],
    }
  };

  static ref COMMENT_COLUMNS: ColumnMappers = {
    ColumnMappers {
      table_name: "comments",
      columns: vec![
        generated("id"),
        column("post_id"),
        column("user_id"),
        column("text"),
        generated("created_at"),
      ],
    }
  };
}

fn post_from_row(row: &Row) -> Post {
  Post {
    id: row.get(0),
    user_id: row.get(1),
    text: row.get(2),
    image: row.get(3),
    created_at: row.get(4),
    updated_at: row.get(5),
  }
}

fn comment_from_row(row: &Row) -> Comment {
  Comment {
    id: row.get(0),
    post_id: row.get(1),
    user_id: row.get(2),
    text: row.get(3),
    created_at: row.get(4),
  }
}

// A new like notifies the post owner in the same statement.
static LIKE_POST: &str = r#"
WITH edge AS (
  INSERT INTO post_likes(post_id, user_id) VALUES($1, $2)
  ON CONFLICT DO NOTHING
  RETURNING post_id, user_id
)
INSERT INTO notifications(from_id, to_id, kind)
SELECT e.user_id, p.user_id, 'like' FROM edge e INNER JOIN posts p ON p.id = e.post_id
"#;

static NEWEST_FIRST: &str = "ORDER BY p.created_at DESC, p.id DESC";

impl PostService {
  pub fn new(cl: SharedClient) -> PostService {
    let stmt = |query: &str| VersionedStatement::new(cl.clone(), query);
    let select = format!("SELECT {} FROM posts p", POST_COLUMNS.get_columns(Some("p")));
    let list = |join_where: &str, param_offset: usize| {
      ListStatements {
        page: stmt(&format!("{} {} {} LIMIT ${} OFFSET ${}",
          select, join_where, NEWEST_FIRST, param_offset + 1, param_offset + 2)),
        count: stmt(&format!("SELECT COUNT(*) FROM posts p {}", join_where)),
      }
    };

    PostService {
      post_by_id: stmt(&format!("{} WHERE p.id = $1", select)),

      insert_post: stmt(&POST_COLUMNS.build_insert_query()),
      delete_post: stmt("DELETE FROM posts WHERE id = $1"),

      list_all: list("", 0),
      list_by_owner: list("WHERE p.user_id = $1", 1),
      list_liked_by: list(
        "INNER JOIN post_likes l ON l.post_id = p.id WHERE l.user_id = $1", 1),
      list_followed_by: list(
        "INNER JOIN follows f ON f.followee_id = p.user_id WHERE f.follower_id = $1", 1),

      like_post: stmt(LIKE_POST),
      unlike_post: stmt("DELETE FROM post_likes WHERE post_id = $1 AND user_id = $2"),
      likes_for: stmt(r#"SELECT post_id, user_id FROM post_likes WHERE post_id = ANY($1)
        ORDER BY created_at, user_id"#),
      liked_post_ids: stmt(r#"SELECT post_id FROM post_likes WHERE user_id = $1
        ORDER BY created_at, post_id"#),

      insert_comment: stmt(&COMMENT_COLUMNS.build_insert_query()),
      comments_for: stmt(&format!("{} WHERE post_id = ANY($1) ORDER BY id",
        COMMENT_COLUMNS.build_select_query())),
    }
  }

  pub async fn prepare(&self) -> Result<()> {
    self.post_by_id.prepare().await?;

    self.insert_post.prepare().await?;
    self.delete_post.prepare().await?;

    for list in [&self.list_all, &self.list_by_owner, &self.list_liked_by, &self.list_followed_by] {
      list.page.prepare().await?;
      list.count.prepare().await?;
    }

    self.like_post.prepare().await?;
    self.unlike_post.prepare().await?;
    self.likes_for.prepare().await?;
    self.liked_post_ids.prepare().await?;

    self.insert_comment.prepare().await?;
    self.comments_for.prepare().await?;
    Ok(())
  }

  pub async fn get_by_id(&self, id: i32) -> Result<Option<Post>> {
    let row = self.post_by_id.query_opt(&[&id]).await?;
    Ok(row.as_ref().map(post_from_row))
  }

  pub async fn insert(&self, post: &NewPost) -> Result<Post> {
    let row = self.insert_post.query_one(&[&post.user_id, &post.text, &post.image]).await?;
    Ok(post_from_row(&row))
  }

  pub async fn delete(&self, id: i32) -> Result<u64> {
    self.delete_post.execute(&[&id]).await
  }

  pub async fn list(&self, filter: PostFilter, skip: i64, limit: i64) -> Result<(Vec<Post>, i64)> {
    let (rows, count) = match filter {
      PostFilter::All => {
        let list = &self.list_all;
        (list.page.query(&[&limit, &skip]).await?, list.count.query_one(&[]).await?)
      },
      PostFilter::Owner(user_id) => {
        let list = &self.list_by_owner;
        (list.page.query(&[&user_id, &limit, &skip]).await?,
          list.count.query_one(&[&user_id]).await?)
      },
      PostFilter::LikedBy(user_id) => {
        let list = &self.list_liked_by;
        (list.page.query(&[&user_id, &limit, &skip]).await?,
          list.count.query_one(&[&user_id]).await?)
      },
      PostFilter::FollowedBy(user_id) => {
        let list = &self.list_followed_by;
        (list.page.query(&[&user_id, &limit, &skip]).await?,
          list.count.query_one(&[&user_id]).await?)
      },
    };
    let total: i64 = count.get(0);
    Ok((rows.iter().map(post_from_row).collect(), total))
  }

  pub async fn toggle_like(&self, actor: i32, post_id: i32) -> Result<LikeChange> {
    if self.unlike_post.execute(&[&post_id, &actor]).await? > 0 {
      return Ok(LikeChange::Unliked);
    }
    self.like_post.execute(&[&post_id, &actor]).await?;
    Ok(LikeChange::Liked)
  }

  pub async fn likes_for(&self, post_ids: &[i32]) -> Result<Vec<Like>> {
    if post_ids.is_empty() {
      return Ok(Vec::new());
    }
    let rows = self.likes_for.query(&[&post_ids]).await?;
    Ok(rows.iter().map(|row| Like {
      post_id: row.get(0),
      user_id: row.get(1),
    }).collect())
  }

  pub async fn liked_post_ids(&self, user_id: i32) -> Result<Vec<i32>> {
    let rows = self.liked_post_ids.query(&[&user_id]).await?;
    Ok(rows.iter().map(|row| row.get(0)).collect())
  }

  pub async fn insert_comment(&self, post_id: i32, user_id: i32, text: &str) -> Result<Comment> {
    let row = self.insert_comment.query_one(&[&post_id, &user_id, &text]).await?;
    Ok(comment_from_row(&row))
  }

  pub async fn comments_for(&self, post_ids: &[i32]) -> Result<Vec<Comment>> {
    if post_ids.is_empty() {
      return Ok(Vec::new());
    }
    let rows = self.comments_for.query(&[&post_ids]).await?;
    Ok(rows.iter().map(comment_from_row).collect())
  }
}

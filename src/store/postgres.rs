use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};

use super::{BlogStore, Comment, ContactMessage, NewContactMessage, Post, PostFields, StoreError, User};

const POST_COLUMNS: &str = r#"
    p.id, p.author_id, p.title, p.subtitle, p.date, p.body, p.img_url, p.pinned,
    u.name AS author_name
"#;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("run migrations")?;
        Ok(())
    }
}

/// SQLSTATE for a value wider than its VARCHAR column.
const STRING_DATA_RIGHT_TRUNCATION: &str = "22001";

/// Maps write errors the client can cause: a unique violation on `field`
/// or an over-long value. Anything else stays a database error.
fn write_error(field: &'static str) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |e| {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                return StoreError::Duplicate(field);
            }
            if db.code().as_deref() == Some(STRING_DATA_RIGHT_TRUNCATION) {
                return StoreError::TooLong("value");
            }
        }
        StoreError::Database(e)
    }
}

fn affected(rows: u64) -> Result<(), StoreError> {
    if rows == 0 {
        Err(StoreError::NotFound)
    } else {
        Ok(())
    }
}

#[async_trait]
impl BlogStore for PgStore {
    async fn create_user(
        &self,
        email: &str,
        name: &str,
        password_hash: &str,
    ) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, name, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, email, password_hash, name
            "#,
        )
        .bind(email)
        .bind(name)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(write_error("Email"))
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"SELECT id, email, password_hash, name FROM users WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"SELECT id, email, password_hash, name FROM users WHERE email = $1"#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn list_posts(&self) -> Result<Vec<Post>, StoreError> {
        let sql = format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM blog_posts p
            LEFT JOIN users u ON u.id = p.author_id
            ORDER BY p.pinned DESC, p.id DESC
            "#
        );
        let rows = sqlx::query_as::<_, Post>(&sql).fetch_all(&self.pool).await?;
        Ok(rows)
    }

    async fn find_post(&self, id: i64) -> Result<Option<Post>, StoreError> {
        let sql = format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM blog_posts p
            LEFT JOIN users u ON u.id = p.author_id
            WHERE p.id = $1
            "#
        );
        let row = sqlx::query_as::<_, Post>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn create_post(
        &self,
        author_id: i64,
        fields: &PostFields,
        date: &str,
    ) -> Result<i64, StoreError> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO blog_posts (author_id, title, subtitle, date, body, img_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(author_id)
        .bind(&fields.title)
        .bind(&fields.subtitle)
        .bind(date)
        .bind(&fields.body)
        .bind(&fields.img_url)
        .fetch_one(&self.pool)
        .await
        .map_err(write_error("Title"))?;
        Ok(id)
    }

    async fn update_post(
        &self,
        id: i64,
        author_id: i64,
        fields: &PostFields,
    ) -> Result<(), StoreError> {
        let res = sqlx::query(
            r#"
            UPDATE blog_posts
               SET title = $2, subtitle = $3, body = $4, img_url = $5, author_id = $6
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&fields.title)
        .bind(&fields.subtitle)
        .bind(&fields.body)
        .bind(&fields.img_url)
        .bind(author_id)
        .execute(&self.pool)
        .await
        .map_err(write_error("Title"))?;
        affected(res.rows_affected())
    }

    async fn set_pinned(&self, id: i64, pinned: bool) -> Result<(), StoreError> {
        let res = sqlx::query(r#"UPDATE blog_posts SET pinned = $2 WHERE id = $1"#)
            .bind(id)
            .bind(pinned)
            .execute(&self.pool)
            .await?;
        affected(res.rows_affected())
    }

    async fn delete_post(&self, id: i64) -> Result<(), StoreError> {
        // comments go with it through ON DELETE CASCADE
        let res = sqlx::query(r#"DELETE FROM blog_posts WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;
        affected(res.rows_affected())
    }

    async fn list_comments(&self, post_id: i64) -> Result<Vec<Comment>, StoreError> {
        let rows = sqlx::query_as::<_, Comment>(
            r#"
            SELECT c.id, c.text, c.author_id, c.post_id, u.name AS author_name
              FROM comments c
              LEFT JOIN users u ON u.id = c.author_id
             WHERE c.post_id = $1
             ORDER BY c.id ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn find_comment(&self, id: i64) -> Result<Option<Comment>, StoreError> {
        let row = sqlx::query_as::<_, Comment>(
            r#"
            SELECT c.id, c.text, c.author_id, c.post_id, u.name AS author_name
              FROM comments c
              LEFT JOIN users u ON u.id = c.author_id
             WHERE c.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn create_comment(
        &self,
        post_id: i64,
        author_id: i64,
        text: &str,
    ) -> Result<Comment, StoreError> {
        let row = sqlx::query_as::<_, Comment>(
            r#"
            WITH inserted AS (
                INSERT INTO comments (text, author_id, post_id)
                VALUES ($1, $2, $3)
                RETURNING id, text, author_id, post_id
            )
            SELECT i.id, i.text, i.author_id, i.post_id, u.name AS author_name
              FROM inserted i
              LEFT JOIN users u ON u.id = i.author_id
            "#,
        )
        .bind(text)
        .bind(author_id)
        .bind(post_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_comment(&self, id: i64) -> Result<(), StoreError> {
        let res = sqlx::query(r#"DELETE FROM comments WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;
        affected(res.rows_affected())
    }

    async fn insert_contact_message(
        &self,
        msg: &NewContactMessage,
    ) -> Result<ContactMessage, StoreError> {
        let row = sqlx::query_as::<_, ContactMessage>(
            r#"
            INSERT INTO contact_messages (name, email, message, date)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, message, date
            "#,
        )
        .bind(&msg.name)
        .bind(&msg.email)
        .bind(&msg.message)
        .bind(&msg.date)
        .fetch_one(&self.pool)
        .await
        .map_err(write_error("Message"))?;
        Ok(row)
    }
}

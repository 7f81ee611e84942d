use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex, MutexGuard,
};

use async_trait::async_trait;

use super::{BlogStore, Comment, ContactMessage, NewContactMessage, Post, PostFields, StoreError, User};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    posts: Vec<Post>,
    comments: Vec<Comment>,
    contact_messages: Vec<ContactMessage>,
    next_user: i64,
    next_post: i64,
    next_comment: i64,
    next_contact: i64,
}

impl Tables {
    fn user_name(&self, id: i64) -> Option<String> {
        self.users.iter().find(|u| u.id == id).map(|u| u.name.clone())
    }
}

fn next(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

/// VARCHAR widths from `migrations/0001_init.sql`, in characters.
const USER_EMAIL_MAX: usize = 100;
const USER_NAME_MAX: usize = 100;
const POST_FIELD_MAX: usize = 250;
const CONTACT_NAME_MAX: usize = 120;
const CONTACT_EMAIL_MAX: usize = 200;
const CONTACT_DATE_MAX: usize = 50;

fn fits(value: &str, max: usize, field: &'static str) -> Result<(), StoreError> {
    if value.chars().count() > max {
        Err(StoreError::TooLong(field))
    } else {
        Ok(())
    }
}

fn post_fits(fields: &PostFields) -> Result<(), StoreError> {
    fits(&fields.title, POST_FIELD_MAX, "title")?;
    fits(&fields.subtitle, POST_FIELD_MAX, "subtitle")?;
    fits(&fields.img_url, POST_FIELD_MAX, "img_url")
}

/// In-process store mirroring the Postgres schema, ids start at 1.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Table access for store operations; fails while the store is marked unavailable.
    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(self.lock())
    }

    /// Makes every store operation fail like a lost database connection.
    pub fn set_unavailable(&self, down: bool) {
        self.unavailable.store(down, Ordering::SeqCst);
    }

    pub fn contact_messages(&self) -> Vec<ContactMessage> {
        self.lock().contact_messages.clone()
    }

    pub fn comment_count(&self) -> usize {
        self.lock().comments.len()
    }
}

#[async_trait]
impl BlogStore for MemoryStore {
    async fn create_user(
        &self,
        email: &str,
        name: &str,
        password_hash: &str,
    ) -> Result<User, StoreError> {
        fits(email, USER_EMAIL_MAX, "email")?;
        fits(name, USER_NAME_MAX, "name")?;
        let mut t = self.tables()?;
        if t.users.iter().any(|u| u.email == email) {
            return Err(StoreError::Duplicate("Email"));
        }
        let user = User {
            id: next(&mut t.next_user),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            name: name.to_string(),
        };
        t.users.push(user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.tables()?.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.tables()?.users.iter().find(|u| u.email == email).cloned())
    }

    async fn list_posts(&self) -> Result<Vec<Post>, StoreError> {
        let t = self.tables()?;
        let mut posts: Vec<Post> = t
            .posts
            .iter()
            .map(|p| Post {
                author_name: t.user_name(p.author_id),
                ..p.clone()
            })
            .collect();
        posts.sort_by(|a, b| b.pinned.cmp(&a.pinned).then(b.id.cmp(&a.id)));
        Ok(posts)
    }

    async fn find_post(&self, id: i64) -> Result<Option<Post>, StoreError> {
        let t = self.tables()?;
        Ok(t.posts.iter().find(|p| p.id == id).map(|p| Post {
            author_name: t.user_name(p.author_id),
            ..p.clone()
        }))
    }

    async fn create_post(
        &self,
        author_id: i64,
        fields: &PostFields,
        date: &str,
    ) -> Result<i64, StoreError> {
        post_fits(fields)?;
        let mut t = self.tables()?;
        if t.posts.iter().any(|p| p.title == fields.title) {
            return Err(StoreError::Duplicate("Title"));
        }
        let id = next(&mut t.next_post);
        t.posts.push(Post {
            id,
            author_id,
            title: fields.title.clone(),
            subtitle: fields.subtitle.clone(),
            date: date.to_string(),
            body: fields.body.clone(),
            img_url: fields.img_url.clone(),
            pinned: false,
            author_name: None,
        });
        Ok(id)
    }

    async fn update_post(
        &self,
        id: i64,
        author_id: i64,
        fields: &PostFields,
    ) -> Result<(), StoreError> {
        post_fits(fields)?;
        let mut t = self.tables()?;
        if t.posts.iter().any(|p| p.id != id && p.title == fields.title) {
            return Err(StoreError::Duplicate("Title"));
        }
        let post = t.posts.iter_mut().find(|p| p.id == id).ok_or(StoreError::NotFound)?;
        post.title = fields.title.clone();
        post.subtitle = fields.subtitle.clone();
        post.body = fields.body.clone();
        post.img_url = fields.img_url.clone();
        post.author_id = author_id;
        Ok(())
    }

    async fn set_pinned(&self, id: i64, pinned: bool) -> Result<(), StoreError> {
        let mut t = self.tables()?;
        let post = t.posts.iter_mut().find(|p| p.id == id).ok_or(StoreError::NotFound)?;
        post.pinned = pinned;
        Ok(())
    }

    async fn delete_post(&self, id: i64) -> Result<(), StoreError> {
        let mut t = self.tables()?;
        let before = t.posts.len();
        t.posts.retain(|p| p.id != id);
        if t.posts.len() == before {
            return Err(StoreError::NotFound);
        }
        t.comments.retain(|c| c.post_id != id);
        Ok(())
    }

    async fn list_comments(&self, post_id: i64) -> Result<Vec<Comment>, StoreError> {
        let t = self.tables()?;
        Ok(t
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .map(|c| Comment {
                author_name: t.user_name(c.author_id),
                ..c.clone()
            })
            .collect())
    }

    async fn find_comment(&self, id: i64) -> Result<Option<Comment>, StoreError> {
        let t = self.tables()?;
        Ok(t.comments.iter().find(|c| c.id == id).map(|c| Comment {
            author_name: t.user_name(c.author_id),
            ..c.clone()
        }))
    }

    async fn create_comment(
        &self,
        post_id: i64,
        author_id: i64,
        text: &str,
    ) -> Result<Comment, StoreError> {
        let mut t = self.tables()?;
        if !t.posts.iter().any(|p| p.id == post_id) {
            return Err(StoreError::NotFound);
        }
        let comment = Comment {
            id: next(&mut t.next_comment),
            text: text.to_string(),
            author_id,
            post_id,
            author_name: t.user_name(author_id),
        };
        t.comments.push(comment.clone());
        Ok(comment)
    }

    async fn delete_comment(&self, id: i64) -> Result<(), StoreError> {
        let mut t = self.tables()?;
        let before = t.comments.len();
        t.comments.retain(|c| c.id != id);
        if t.comments.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn insert_contact_message(
        &self,
        msg: &NewContactMessage,
    ) -> Result<ContactMessage, StoreError> {
        fits(&msg.name, CONTACT_NAME_MAX, "name")?;
        fits(&msg.email, CONTACT_EMAIL_MAX, "email")?;
        fits(&msg.date, CONTACT_DATE_MAX, "date")?;
        let mut t = self.tables()?;
        let row = ContactMessage {
            id: next(&mut t.next_contact),
            name: msg.name.clone(),
            email: msg.email.clone(),
            message: msg.message.clone(),
            date: msg.date.clone(),
        };
        t.contact_messages.push(row.clone());
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(title: &str) -> PostFields {
        PostFields {
            title: title.into(),
            subtitle: "sub".into(),
            body: "body".into(),
            img_url: "https://example.com/a.png".into(),
        }
    }

    #[tokio::test]
    async fn listing_puts_pinned_first_then_newest() {
        let store = MemoryStore::new();
        let user = store.create_user("a@example.com", "Ann", "hash").await.unwrap();
        let first = store.create_post(user.id, &fields("one"), "d").await.unwrap();
        let second = store.create_post(user.id, &fields("two"), "d").await.unwrap();
        let third = store.create_post(user.id, &fields("three"), "d").await.unwrap();
        store.set_pinned(first, true).await.unwrap();

        let ids: Vec<i64> = store.list_posts().await.unwrap().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![first, third, second]);
    }

    #[tokio::test]
    async fn duplicate_email_and_title_are_rejected() {
        let store = MemoryStore::new();
        let user = store.create_user("a@example.com", "Ann", "h").await.unwrap();
        assert!(matches!(
            store.create_user("a@example.com", "Other", "h").await,
            Err(StoreError::Duplicate("Email"))
        ));
        store.create_post(user.id, &fields("same"), "d").await.unwrap();
        assert!(matches!(
            store.create_post(user.id, &fields("same"), "d").await,
            Err(StoreError::Duplicate("Title"))
        ));
    }

    #[tokio::test]
    async fn values_wider_than_their_column_are_rejected() {
        let store = MemoryStore::new();
        let long_name = "n".repeat(101);
        assert!(matches!(
            store.create_user("a@example.com", &long_name, "h").await,
            Err(StoreError::TooLong("name"))
        ));
        let user = store.create_user("a@example.com", "Ann", "h").await.unwrap();

        let wide = "é".repeat(250);
        store.create_post(user.id, &fields(&wide), "d").await.unwrap();
        let too_wide = "é".repeat(251);
        assert!(matches!(
            store.create_post(user.id, &fields(&too_wide), "d").await,
            Err(StoreError::TooLong("title"))
        ));
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_call() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        assert!(matches!(store.find_user(1).await, Err(StoreError::Database(_))));
        assert!(matches!(store.list_posts().await, Err(StoreError::Database(_))));
        store.set_unavailable(false);
        assert!(store.list_posts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_a_post_takes_its_comments() {
        let store = MemoryStore::new();
        let user = store.create_user("a@example.com", "Ann", "h").await.unwrap();
        let post = store.create_post(user.id, &fields("p"), "d").await.unwrap();
        let comment = store.create_comment(post, user.id, "hi").await.unwrap();
        assert_eq!(comment.author_name.as_deref(), Some("Ann"));

        store.delete_post(post).await.unwrap();
        assert_eq!(store.comment_count(), 0);
        assert!(matches!(store.delete_post(post).await, Err(StoreError::NotFound)));
    }
}

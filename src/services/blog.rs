use crate::{
    entities::{
        blog_category, blog_comment, blog_post, blog_tag, post_tag, BlogCategory, BlogComment,
        BlogPost, BlogTag, PostTag,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use url::Url;
use uuid::Uuid;

/// Blog module: categories, tags, posts with optional YouTube videos, and
/// comments. Slugs are derived from names/titles when absent.
pub struct BlogService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl BlogService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    // ---- categories and tags ----

    pub async fn create_category(
        &self,
        name: String,
    ) -> Result<blog_category::Model, ServiceError> {
        let slug = slugify(&name);
        self.ensure_free_category(&name, &slug).await?;

        let model = blog_category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            slug: Set(slug),
        };
        Ok(model.insert(&*self.db).await?)
    }

    pub async fn list_categories(&self) -> Result<Vec<blog_category::Model>, ServiceError> {
        Ok(BlogCategory::find()
            .order_by_asc(blog_category::Column::Name)
            .all(&*self.db)
            .await?)
    }

    pub async fn create_tag(&self, name: String) -> Result<blog_tag::Model, ServiceError> {
        let slug = slugify(&name);
        let existing = BlogTag::find()
            .filter(blog_tag::Column::Slug.eq(slug.clone()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Tag {} already exists",
                name
            )));
        }

        let model = blog_tag::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            slug: Set(slug),
        };
        Ok(model.insert(&*self.db).await?)
    }

    pub async fn list_tags(&self) -> Result<Vec<blog_tag::Model>, ServiceError> {
        Ok(BlogTag::find()
            .order_by_asc(blog_tag::Column::Name)
            .all(&*self.db)
            .await?)
    }

    // ---- posts ----

    /// Creates a post (optionally published immediately) and attaches its tags
    #[instrument(skip(self, input))]
    pub async fn create_post(
        &self,
        author_id: Uuid,
        input: CreatePostInput,
    ) -> Result<blog_post::Model, ServiceError> {
        if let Some(video_url) = &input.video_url {
            validate_youtube_url(video_url)?;
        }

        let slug = slugify(&input.title);
        let clash = BlogPost::find()
            .filter(
                blog_post::Column::Title
                    .eq(input.title.clone())
                    .or(blog_post::Column::Slug.eq(slug.clone())),
            )
            .one(&*self.db)
            .await?;
        if clash.is_some() {
            return Err(ServiceError::Conflict(format!(
                "A post titled {} already exists",
                input.title
            )));
        }

        if let Some(category_id) = input.category_id {
            BlogCategory::find_by_id(category_id)
                .one(&*self.db)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Blog category {} not found", category_id))
                })?;
        }

        let txn = self.db.begin().await?;
        let now = Utc::now();
        let post_id = Uuid::new_v4();

        let post = blog_post::ActiveModel {
            id: Set(post_id),
            title: Set(input.title),
            slug: Set(slug),
            content: Set(input.content),
            video_url: Set(input.video_url),
            category_id: Set(input.category_id),
            author_id: Set(author_id),
            is_published: Set(input.publish),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let post = post.insert(&txn).await?;

        for tag_id in &input.tag_ids {
            BlogTag::find_by_id(*tag_id)
                .one(&txn)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("Tag {} not found", tag_id)))?;
            let link = post_tag::ActiveModel {
                post_id: Set(post_id),
                tag_id: Set(*tag_id),
            };
            link.insert(&txn).await?;
        }

        txn.commit().await?;

        if post.is_published {
            self.event_sender
                .send_or_log(Event::PostPublished(post_id))
                .await;
        }
        info!("Created blog post {}", post_id);
        Ok(post)
    }

    pub async fn set_published(
        &self,
        slug: &str,
        published: bool,
    ) -> Result<blog_post::Model, ServiceError> {
        let post = self.load_post_by_slug(slug).await?;

        let mut active: blog_post::ActiveModel = post.into();
        active.is_published = Set(published);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        if published {
            self.event_sender
                .send_or_log(Event::PostPublished(updated.id))
                .await;
        }
        Ok(updated)
    }

    /// Updates a post addressed by its slug. Changing the title regenerates
    /// the slug; passing `tag_ids` replaces the post's tag set.
    #[instrument(skip(self, input))]
    pub async fn update_post(
        &self,
        slug: &str,
        input: UpdatePostInput,
    ) -> Result<blog_post::Model, ServiceError> {
        if let Some(video_url) = input.video_url.as_ref().and_then(|v| v.as_deref()) {
            validate_youtube_url(video_url)?;
        }
        let post = self.load_post_by_slug(slug).await?;
        let post_id = post.id;

        let txn = self.db.begin().await?;

        let mut active: blog_post::ActiveModel = post.into();
        if let Some(title) = input.title {
            active.slug = Set(slugify(&title));
            active.title = Set(title);
        }
        if let Some(content) = input.content {
            active.content = Set(content);
        }
        if let Some(video_url) = input.video_url {
            active.video_url = Set(video_url);
        }
        if let Some(category_id) = input.category_id {
            active.category_id = Set(Some(category_id));
        }
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        if let Some(tag_ids) = &input.tag_ids {
            PostTag::delete_many()
                .filter(post_tag::Column::PostId.eq(post_id))
                .exec(&txn)
                .await?;
            for tag_id in tag_ids {
                BlogTag::find_by_id(*tag_id)
                    .one(&txn)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound(format!("Tag {} not found", tag_id)))?;
                let link = post_tag::ActiveModel {
                    post_id: Set(post_id),
                    tag_id: Set(*tag_id),
                };
                link.insert(&txn).await?;
            }
        }

        txn.commit().await?;
        Ok(updated)
    }

    pub async fn delete_post(&self, slug: &str) -> Result<(), ServiceError> {
        let post = self.load_post_by_slug(slug).await?;
        post.delete(&*self.db).await?;
        Ok(())
    }

    /// Published posts, newest first
    pub async fn list_published(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<blog_post::Model>, u64), ServiceError> {
        let paginator = BlogPost::find()
            .filter(blog_post::Column::IsPublished.eq(true))
            .order_by_desc(blog_post::Column::CreatedAt)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let data = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((data, total))
    }

    pub async fn get_post_by_slug(&self, slug: &str) -> Result<PostDetail, ServiceError> {
        let post = self.load_post_by_slug(slug).await?;

        let tag_ids: Vec<Uuid> = PostTag::find()
            .filter(post_tag::Column::PostId.eq(post.id))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|link| link.tag_id)
            .collect();
        let tags = BlogTag::find()
            .filter(blog_tag::Column::Id.is_in(tag_ids))
            .all(&*self.db)
            .await?;

        let comments = post
            .find_related(BlogComment)
            .order_by_desc(blog_comment::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        Ok(PostDetail {
            post,
            tags,
            comments,
        })
    }

    // ---- comments ----

    pub async fn add_comment(
        &self,
        slug: &str,
        author_id: Option<Uuid>,
        content: String,
    ) -> Result<blog_comment::Model, ServiceError> {
        if content.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Comment must not be empty".to_string(),
            ));
        }
        let post = self.load_post_by_slug(slug).await?;

        let comment_id = Uuid::new_v4();
        let model = blog_comment::ActiveModel {
            id: Set(comment_id),
            post_id: Set(post.id),
            author_id: Set(author_id),
            content: Set(content),
            created_at: Set(Utc::now()),
        };
        let created = model.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::CommentAdded {
                post_id: post.id,
                comment_id,
            })
            .await;
        Ok(created)
    }

    async fn load_post_by_slug(&self, slug: &str) -> Result<blog_post::Model, ServiceError> {
        BlogPost::find()
            .filter(blog_post::Column::Slug.eq(slug))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Post {} not found", slug)))
    }

    async fn ensure_free_category(&self, name: &str, slug: &str) -> Result<(), ServiceError> {
        let existing = BlogCategory::find()
            .filter(
                blog_category::Column::Name
                    .eq(name)
                    .or(blog_category::Column::Slug.eq(slug)),
            )
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Category {} already exists",
                name
            )));
        }
        Ok(())
    }
}

/// Lowercase, hyphen-separated slug from arbitrary text
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut last_was_hyphen = true;
    for c in text.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// A valid video link is a YouTube watch URL carrying a `v` parameter
pub fn validate_youtube_url(value: &str) -> Result<(), ServiceError> {
    let parsed = Url::parse(value)
        .map_err(|_| ServiceError::ValidationError("Please provide a valid URL".to_string()))?;

    match parsed.host_str() {
        Some("www.youtube.com") | Some("youtube.com") => {}
        _ => {
            return Err(ServiceError::ValidationError(
                "Please provide a valid YouTube URL".to_string(),
            ))
        }
    }

    let has_video_id = parsed
        .query_pairs()
        .any(|(key, val)| key == "v" && !val.is_empty());
    if !has_video_id {
        return Err(ServiceError::ValidationError(
            "Invalid YouTube URL. Ensure it contains a video ID".to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct CreatePostInput {
    pub title: String,
    pub content: String,
    pub video_url: Option<String>,
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub tag_ids: Vec<Uuid>,
    #[serde(default)]
    pub publish: bool,
}

/// `video_url` is doubly optional: absent leaves it untouched, `null` clears
/// it. `tag_ids`, when present, replaces the post's tag set.
#[derive(Debug, Default, Deserialize)]
pub struct UpdatePostInput {
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub video_url: Option<Option<String>>,
    pub category_id: Option<Uuid>,
    pub tag_ids: Option<Vec<Uuid>>,
}

fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    serde::Deserialize::deserialize(deserializer).map(Some)
}

#[derive(Debug, Serialize)]
pub struct PostDetail {
    pub post: blog_post::Model,
    pub tags: Vec<blog_tag::Model>,
    pub comments: Vec<blog_comment::Model>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_basic() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("  Spaced   Out  "), "spaced-out");
        assert_eq!(slugify("Rust & SQL, together!"), "rust-sql-together");
        assert_eq!(slugify("UPPER"), "upper");
    }

    #[test]
    fn valid_watch_urls_pass() {
        assert!(validate_youtube_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ").is_ok());
        assert!(validate_youtube_url("https://youtube.com/watch?v=abc123").is_ok());
    }

    #[test]
    fn non_youtube_hosts_are_rejected() {
        assert!(validate_youtube_url("https://vimeo.com/12345").is_err());
        assert!(validate_youtube_url("https://youtu.be/dQw4w9WgXcQ").is_err());
        assert!(validate_youtube_url("not a url at all").is_err());
    }

    #[test]
    fn missing_video_id_is_rejected() {
        assert!(validate_youtube_url("https://www.youtube.com/watch").is_err());
        assert!(validate_youtube_url("https://www.youtube.com/watch?v=").is_err());
        assert!(validate_youtube_url("https://www.youtube.com/watch?list=PL123").is_err());
    }
}

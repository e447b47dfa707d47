mod common;

use common::TestApp;
use storefront_api::{
    errors::ServiceError,
    services::blog::{CreatePostInput, UpdatePostInput},
};
use uuid::Uuid;

fn post_input(title: &str) -> CreatePostInput {
    CreatePostInput {
        title: title.to_string(),
        content: "Body text".to_string(),
        video_url: None,
        category_id: None,
        tag_ids: vec![],
        publish: false,
    }
}

#[tokio::test]
async fn posts_get_slugs_derived_from_their_title() {
    let app = TestApp::new().await;
    let author = Uuid::new_v4();

    let post = app
        .state
        .services
        .blog
        .create_post(author, post_input("Opening Hours & Holiday Schedule"))
        .await
        .expect("create post");
    assert_eq!(post.slug, "opening-hours-holiday-schedule");
    assert!(!post.is_published);
}

#[tokio::test]
async fn duplicate_titles_are_rejected() {
    let app = TestApp::new().await;
    let author = Uuid::new_v4();
    let blog = &app.state.services.blog;

    blog.create_post(author, post_input("Tasting Notes"))
        .await
        .unwrap();
    let duplicate = blog.create_post(author, post_input("Tasting Notes")).await;
    assert!(matches!(duplicate, Err(ServiceError::Conflict(_))));
}

#[tokio::test]
async fn video_urls_must_be_youtube_watch_links() {
    let app = TestApp::new().await;
    let author = Uuid::new_v4();
    let blog = &app.state.services.blog;

    let mut input = post_input("With Video");
    input.video_url = Some("https://vimeo.com/12345".to_string());
    assert!(matches!(
        blog.create_post(author, input).await,
        Err(ServiceError::ValidationError(_))
    ));

    let mut input = post_input("With Video");
    input.video_url = Some("https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string());
    let post = blog.create_post(author, input).await.unwrap();
    assert!(post.video_url.is_some());

    // Updating to a v-less URL is also rejected
    let result = blog
        .update_post(
            &post.slug,
            UpdatePostInput {
                video_url: Some(Some("https://www.youtube.com/watch".to_string())),
                ..UpdatePostInput::default()
            },
        )
        .await;
    assert!(matches!(result, Err(ServiceError::ValidationError(_))));
}

#[tokio::test]
async fn only_published_posts_are_listed_publicly() {
    let app = TestApp::new().await;
    let author = Uuid::new_v4();
    let blog = &app.state.services.blog;

    let draft = blog.create_post(author, post_input("Draft")).await.unwrap();
    let mut input = post_input("Live Post");
    input.publish = true;
    blog.create_post(author, input).await.unwrap();

    let (posts, total) = blog.list_published(1, 10).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(posts[0].title, "Live Post");

    // Publishing the draft makes it visible; the public route agrees
    blog.set_published(&draft.slug, true).await.unwrap();
    let (status, body) = app.get("/api/v1/blog/posts", None).await;
    assert_eq!(status, axum::http::StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn post_detail_carries_tags_and_comments() {
    let app = TestApp::new().await;
    let author = Uuid::new_v4();
    let blog = &app.state.services.blog;

    let tag = blog.create_tag("Events".to_string()).await.unwrap();
    let mut input = post_input("Harvest Party");
    input.tag_ids = vec![tag.id];
    input.publish = true;
    let post = blog.create_post(author, input).await.unwrap();

    blog.add_comment(&post.slug, None, "Looking forward to it".to_string())
        .await
        .unwrap();
    blog.add_comment(&post.slug, Some(author), "See you there".to_string())
        .await
        .unwrap();

    let detail = blog.get_post_by_slug("harvest-party").await.unwrap();
    assert_eq!(detail.tags.len(), 1);
    assert_eq!(detail.tags[0].name, "Events");
    assert_eq!(detail.comments.len(), 2);
    // Newest first
    assert_eq!(detail.comments[0].content, "See you there");
}

#[tokio::test]
async fn empty_comments_are_rejected() {
    let app = TestApp::new().await;
    let author = Uuid::new_v4();
    let blog = &app.state.services.blog;

    let post = blog.create_post(author, post_input("Quiet Post")).await.unwrap();
    let result = blog.add_comment(&post.slug, None, "   ".to_string()).await;
    assert!(matches!(result, Err(ServiceError::ValidationError(_))));
}

#[tokio::test]
async fn category_and_tag_slugs_are_unique() {
    let app = TestApp::new().await;
    let blog = &app.state.services.blog;

    blog.create_category("Wine News".to_string()).await.unwrap();
    let duplicate = blog.create_category("Wine News".to_string()).await;
    assert!(matches!(duplicate, Err(ServiceError::Conflict(_))));
}

#[tokio::test]
async fn updating_a_post_replaces_its_tags() {
    let app = TestApp::new().await;
    let author = Uuid::new_v4();
    let blog = &app.state.services.blog;

    let events = blog.create_tag("Events".to_string()).await.unwrap();
    let offers = blog.create_tag("Offers".to_string()).await.unwrap();

    let mut input = post_input("Weekend Specials");
    input.tag_ids = vec![events.id];
    let post = blog.create_post(author, input).await.unwrap();

    blog.update_post(
        &post.slug,
        UpdatePostInput {
            tag_ids: Some(vec![offers.id]),
            ..UpdatePostInput::default()
        },
    )
    .await
    .unwrap();

    let detail = blog.get_post_by_slug(&post.slug).await.unwrap();
    assert_eq!(detail.tags.len(), 1);
    assert_eq!(detail.tags[0].name, "Offers");
}

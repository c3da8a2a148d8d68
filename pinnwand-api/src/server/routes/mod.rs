use crate::server::ServerRouter;
use axum::Router;
use pinnwand_common::model::Id;
use pinnwand_common::model::post::PostMarker;
use serde::Deserialize;

mod auth;
mod feed;
mod posts;
mod users;

pub fn routes() -> ServerRouter {
    Router::new()
        .merge(feed::routes())
        .merge(auth::routes())
        .merge(posts::routes())
        .merge(users::routes())
}

/// Query string shared by every paginated route.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
pub(crate) struct FeedQuery {
    page: Option<String>,
}

impl FeedQuery {
    /// The requested page number. Anything non-numeric counts as the first
    /// page; out-of-range numbers are clamped later, during composition.
    pub(crate) fn page(&self) -> Option<u64> {
        self.page.as_deref().and_then(|page| page.parse().ok())
    }
}

pub(crate) fn profile_path(username: &str) -> String {
    format!("/{username}")
}

pub(crate) fn post_detail_path(username: &str, post_id: Id<PostMarker>) -> String {
    format!("/{username}/{post_id}")
}

#[cfg(test)]
mod tests {
    use crate::server::{LOGIN_PATH, ServerState, routes};
    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use http_body_util::BodyExt;
    use pinnwand_common::model::follow::Follow;
    use pinnwand_common::model::post::{CreatePost, PostMarker, PostText};
    use pinnwand_common::model::user::{CreateUser, User, UserHandle};
    use pinnwand_common::model::Id;
    use pinnwand_common::util::PositiveDuration;
    use pinnwand_db::cache::FeedCache;
    use pinnwand_db::mem::InMemoryStore;
    use pinnwand_db::store::Store;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use time::Duration;
    use tower::ServiceExt;

    fn app(store: &Arc<InMemoryStore>) -> Router {
        let window = PositiveDuration::new(Duration::seconds(20)).unwrap();
        let state = ServerState::new(
            Arc::clone(store) as Arc<dyn Store>,
            FeedCache::new(window),
        );

        routes().with_state(state)
    }

    async fn signup(store: &InMemoryStore, handle: &str) -> User {
        store
            .create_user(&CreateUser {
                handle: UserHandle::new(handle.into()).unwrap(),
            })
            .await
            .unwrap()
    }

    async fn write_post(store: &InMemoryStore, author: &User, text: &str) -> Id<PostMarker> {
        store
            .create_post(&CreatePost {
                author: author.id,
                text: PostText::new(text.into()).unwrap(),
                group: None,
                image: None,
            })
            .await
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn login(app: &Router, handle: &str) -> String {
        let response = app
            .clone()
            .oneshot(post_json("/auth/login", None, &json!({ "handle": handle })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        body_json(response).await["token"].as_str().unwrap().to_owned()
    }

    fn location(response: &axum::response::Response) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .unwrap()
    }

    #[tokio::test]
    async fn anonymous_writers_are_sent_to_login() {
        let store = Arc::new(InMemoryStore::new());
        let app = app(&store);

        let response = app
            .oneshot(post_json("/new", None, &json!({ "text": "hello" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), LOGIN_PATH);
    }

    #[tokio::test]
    async fn created_posts_show_up_on_the_index() {
        let store = Arc::new(InMemoryStore::new());
        let app = app(&store);
        signup(&store, "anna").await;
        let token = login(&app, "anna").await;

        let response = app
            .clone()
            .oneshot(post_json(
                "/new",
                Some(&token),
                &json!({ "text": "first post" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");

        let index = body_json(app.oneshot(get("/")).await.unwrap()).await;
        assert_eq!(index["total_count"], 1);
        assert_eq!(index["items"][0]["text"], "first post");
    }

    #[tokio::test]
    async fn empty_text_is_a_field_error() {
        let store = Arc::new(InMemoryStore::new());
        let app = app(&store);
        signup(&store, "anna").await;
        let token = login(&app, "anna").await;

        let response = app
            .oneshot(post_json("/new", Some(&token), &json!({ "text": "" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert_eq!(body["errors"][0]["field"], "text");
    }

    #[tokio::test]
    async fn unknown_groups_and_authors_are_not_found() {
        let store = Arc::new(InMemoryStore::new());
        let app = app(&store);

        let group = app.clone().oneshot(get("/group/nope")).await.unwrap();
        assert_eq!(group.status(), StatusCode::NOT_FOUND);

        let profile = app.oneshot(get("/nobody")).await.unwrap();
        assert_eq!(profile.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn editing_someone_elses_post_bounces_to_the_post() {
        let store = Arc::new(InMemoryStore::new());
        let app = app(&store);
        let anna = signup(&store, "anna").await;
        signup(&store, "boris").await;
        let post_id = write_post(&store, &anna, "annas words").await;
        let token = login(&app, "boris").await;

        let response = app
            .oneshot(post_json(
                &format!("/anna/{post_id}/edit"),
                Some(&token),
                &json!({ "text": "borises words" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), format!("/anna/{post_id}"));

        let post = store.fetch_post(post_id).await.unwrap().unwrap();
        assert_eq!(post.text.get(), "annas words");
    }

    #[tokio::test]
    async fn authors_can_edit_their_posts() {
        let store = Arc::new(InMemoryStore::new());
        let app = app(&store);
        let anna = signup(&store, "anna").await;
        let post_id = write_post(&store, &anna, "draft").await;
        let token = login(&app, "anna").await;

        let response = app
            .oneshot(post_json(
                &format!("/anna/{post_id}/edit"),
                Some(&token),
                &json!({ "text": "final" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let post = store.fetch_post(post_id).await.unwrap().unwrap();
        assert_eq!(post.text.get(), "final");
    }

    #[tokio::test]
    async fn follow_is_idempotent_and_self_follow_is_ignored() {
        let store = Arc::new(InMemoryStore::new());
        let app = app(&store);
        let anna = signup(&store, "anna").await;
        let boris = signup(&store, "boris").await;
        let token = login(&app, "boris").await;

        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(post_json("/anna/follow", Some(&token), &json!({})))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            assert_eq!(location(&response), "/anna");
        }
        assert!(store
            .is_following(Follow::new(boris.id, anna.id))
            .await
            .unwrap());

        let anna_token = login(&app, "anna").await;
        let response = app
            .clone()
            .oneshot(post_json("/anna/follow", Some(&anna_token), &json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(!store
            .is_following(Follow::new(anna.id, anna.id))
            .await
            .unwrap());

        let response = app
            .oneshot(post_json("/anna/unfollow", Some(&token), &json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(!store
            .is_following(Follow::new(boris.id, anna.id))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn the_follow_feed_requires_a_login() {
        let store = Arc::new(InMemoryStore::new());
        let app = app(&store);
        signup(&store, "anna").await;

        let anonymous = app.clone().oneshot(get("/follow")).await.unwrap();
        assert_eq!(anonymous.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&anonymous), LOGIN_PATH);

        let token = login(&app, "anna").await;
        let request = Request::builder()
            .uri("/follow")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["total_count"], 0);
    }

    #[tokio::test]
    async fn comments_land_under_the_post_and_empty_ones_vanish() {
        let store = Arc::new(InMemoryStore::new());
        let app = app(&store);
        let anna = signup(&store, "anna").await;
        signup(&store, "boris").await;
        let post_id = write_post(&store, &anna, "discuss").await;
        let token = login(&app, "boris").await;

        let response = app
            .clone()
            .oneshot(post_json(
                &format!("/anna/{post_id}/comment"),
                Some(&token),
                &json!({ "text": "nice one" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), format!("/anna/{post_id}"));

        let response = app
            .clone()
            .oneshot(post_json(
                &format!("/anna/{post_id}/comment"),
                Some(&token),
                &json!({ "text": "" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let detail = body_json(
            app.oneshot(get(&format!("/anna/{post_id}"))).await.unwrap(),
        )
        .await;
        assert_eq!(detail["comments"].as_array().unwrap().len(), 1);
        assert_eq!(detail["comments"][0]["text"], "nice one");
    }

    #[tokio::test]
    async fn the_profile_reports_the_following_flag() {
        let store = Arc::new(InMemoryStore::new());
        let app = app(&store);
        let anna = signup(&store, "anna").await;
        let boris = signup(&store, "boris").await;
        write_post(&store, &anna, "hello").await;
        store
            .create_follow(Follow::new(boris.id, anna.id))
            .await
            .unwrap();

        let anonymous = body_json(app.clone().oneshot(get("/anna")).await.unwrap()).await;
        assert_eq!(anonymous["following"], false);
        assert_eq!(anonymous["post_count"], 1);

        let token = login(&app, "boris").await;
        let request = Request::builder()
            .uri("/anna")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let profile = body_json(app.oneshot(request).await.unwrap()).await;
        assert_eq!(profile["following"], true);
    }

    #[tokio::test]
    async fn signup_rejects_taken_handles() {
        let store = Arc::new(InMemoryStore::new());
        let app = app(&store);

        let first = app
            .clone()
            .oneshot(post_json("/auth/signup", None, &json!({ "handle": "anna" })))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app
            .oneshot(post_json("/auth/signup", None, &json!({ "handle": "anna" })))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn unknown_routes_are_not_found() {
        let store = Arc::new(InMemoryStore::new());
        let app = app(&store);

        let response = app
            .oneshot(get("/anna/not-a-post-id/extra/deep"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

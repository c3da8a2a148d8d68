use crate::server::auth::CurrentActor;
use crate::server::json::Json;
use crate::server::routes::post_detail_path;
use crate::server::{FieldError, LOGIN_PATH, Result, ServerError, ServerRouter};
use axum::Router;
use axum::extract::State;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::routing::{RouterExt, TypedPath};
use pinnwand_common::access::{self, Action, Decision};
use pinnwand_common::feed::FeedScope;
use pinnwand_common::model::Id;
use pinnwand_common::model::comment::{Comment, CommentText, CreateComment};
use pinnwand_common::model::group::{GroupMarker, GroupSlug};
use pinnwand_common::model::post::{CreatePost, EditPost, ImageRef, Post, PostMarker, PostText};
use pinnwand_db::store::Store;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    Router::new()
        .typed_post(create_post)
        .typed_get(post_detail)
        .typed_post(edit_post)
        .typed_post(add_comment)
}

/// Payload for creating and editing posts. Fields arrive raw so that
/// problems come back as field-level validation errors, the way the form
/// reports them, instead of as one opaque deserialization failure.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
struct PostBody {
    text: Option<String>,
    group: Option<String>,
    image: Option<String>,
}

struct ValidPost {
    text: PostText,
    group: Option<Id<GroupMarker>>,
    image: Option<ImageRef>,
}

async fn validate_post_body(store: &Arc<dyn Store>, body: PostBody) -> Result<ValidPost> {
    let mut errors = Vec::new();

    let text = match PostText::new(body.text.unwrap_or_default()) {
        Ok(text) => Some(text),
        Err(err) => {
            errors.push(FieldError {
                field: "text",
                message: err.to_string(),
            });
            None
        }
    };

    let group = match body.group {
        None => None,
        Some(slug) => match GroupSlug::new(slug) {
            Err(err) => {
                errors.push(FieldError {
                    field: "group",
                    message: err.to_string(),
                });
                None
            }
            Ok(slug) => match store.fetch_group_by_slug(&slug).await? {
                Some(group) => Some(group.id),
                None => {
                    errors.push(FieldError {
                        field: "group",
                        message: format!("Unknown group: {}", slug.get()),
                    });
                    None
                }
            },
        },
    };

    let image = match body.image.map(ImageRef::new) {
        None => None,
        Some(Ok(image)) => Some(image),
        Some(Err(err)) => {
            errors.push(FieldError {
                field: "image",
                message: err.to_string(),
            });
            None
        }
    };

    match (text, errors.is_empty()) {
        (Some(text), true) => Ok(ValidPost { text, group, image }),
        _ => Err(ServerError::Validation { errors }),
    }
}

/// A post addressed as `/{username}/{post_id}`: the username has to match
/// the stored author, or the post does not exist at this path.
async fn fetch_authored_post(
    store: &Arc<dyn Store>,
    username: &str,
    post_id: Id<PostMarker>,
) -> Result<Post> {
    store
        .fetch_post(post_id)
        .await?
        .filter(|post| post.author.handle.get() == username)
        .ok_or(ServerError::PostNotFound(post_id))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/new", rejection(ServerError))]
struct NewPostPath();

async fn create_post(
    NewPostPath(): NewPostPath,
    CurrentActor(actor): CurrentActor,
    State(store): State<Arc<dyn Store>>,
    Json(body): Json<PostBody>,
) -> Result<Response> {
    let Ok(author) = access::require_user(actor, Action::CreatePost) else {
        return Ok(Redirect::to(LOGIN_PATH).into_response());
    };

    let valid = validate_post_body(&store, body).await?;
    store
        .create_post(&CreatePost {
            author,
            text: valid.text,
            group: valid.group,
            image: valid.image,
        })
        .await?;

    Ok(Redirect::to("/").into_response())
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/{username}/{post_id}", rejection(ServerError))]
struct PostDetailPath {
    username: String,
    post_id: Id<PostMarker>,
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
struct PostDetailResponse {
    post: Post,
    author_post_count: u64,
    comments: Vec<Comment>,
}

async fn post_detail(
    PostDetailPath { username, post_id }: PostDetailPath,
    State(store): State<Arc<dyn Store>>,
) -> Result<Json<PostDetailResponse>> {
    let post = fetch_authored_post(&store, &username, post_id).await?;
    let author_post_count = store.count_posts(FeedScope::Author(post.author.id)).await?;
    let comments = store.list_comments(post_id).await?;

    Ok(Json(PostDetailResponse {
        post,
        author_post_count,
        comments,
    }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/{username}/{post_id}/edit", rejection(ServerError))]
struct EditPostPath {
    username: String,
    post_id: Id<PostMarker>,
}

async fn edit_post(
    EditPostPath { username, post_id }: EditPostPath,
    CurrentActor(actor): CurrentActor,
    State(store): State<Arc<dyn Store>>,
    Json(body): Json<PostBody>,
) -> Result<Response> {
    let Ok(user) = access::require_user(actor, Action::EditPost) else {
        return Ok(Redirect::to(LOGIN_PATH).into_response());
    };

    let post = fetch_authored_post(&store, &username, post_id).await?;
    if let Decision::Deny(_) = access::check_author(user, post.author.id) {
        // silently back to the post, no error signal
        return Ok(Redirect::to(&post_detail_path(&username, post_id)).into_response());
    }

    let valid = validate_post_body(&store, body).await?;
    store
        .update_post(
            post_id,
            &EditPost {
                text: valid.text,
                group: valid.group,
                image: valid.image,
            },
        )
        .await?;

    Ok(Redirect::to(&post_detail_path(&username, post_id)).into_response())
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/{username}/{post_id}/comment", rejection(ServerError))]
struct AddCommentPath {
    username: String,
    post_id: Id<PostMarker>,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
struct CommentBody {
    text: Option<String>,
}

async fn add_comment(
    AddCommentPath { username, post_id }: AddCommentPath,
    CurrentActor(actor): CurrentActor,
    State(store): State<Arc<dyn Store>>,
    Json(body): Json<CommentBody>,
) -> Result<Response> {
    let Ok(author) = access::require_user(actor, Action::AddComment) else {
        return Ok(Redirect::to(LOGIN_PATH).into_response());
    };

    let post = fetch_authored_post(&store, &username, post_id).await?;

    // an empty comment is dropped without a word; the redirect happens either way
    if let Ok(text) = CommentText::new(body.text.unwrap_or_default()) {
        store
            .create_comment(&CreateComment {
                post: post.id,
                author,
                text,
            })
            .await?;
    }

    Ok(Redirect::to(&post_detail_path(&username, post_id)).into_response())
}

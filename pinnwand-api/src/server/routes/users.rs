use crate::server::auth::CurrentActor;
use crate::server::json::Json;
use crate::server::routes::{FeedQuery, profile_path};
use crate::server::{LOGIN_PATH, Result, ServerError, ServerRouter};
use axum::Router;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::routing::{RouterExt, TypedPath};
use pinnwand_common::access::{self, Action, Decision};
use pinnwand_common::feed::{FeedPage, FeedScope};
use pinnwand_common::model::follow::Follow;
use pinnwand_common::model::user::{User, UserHandle};
use pinnwand_db::feed::FeedComposer;
use pinnwand_db::store::Store;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    Router::new()
        .typed_get(profile)
        .typed_post(follow)
        .typed_post(unfollow)
}

async fn fetch_author(store: &Arc<dyn Store>, username: &str) -> Result<User> {
    // a string that isn't a valid handle can't name an author, same 404
    let handle = UserHandle::new(username.to_owned())
        .map_err(|err| ServerError::AuthorNotFound(err.0))?;
    store
        .fetch_user_by_handle(&handle)
        .await?
        .ok_or_else(|| ServerError::AuthorNotFound(handle.into_inner()))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/{username}", rejection(ServerError))]
struct ProfilePath {
    username: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
struct ProfileResponse {
    author: User,
    post_count: u64,
    following: bool,
    feed: FeedPage,
}

async fn profile(
    ProfilePath { username }: ProfilePath,
    Query(query): Query<FeedQuery>,
    CurrentActor(actor): CurrentActor,
    State(store): State<Arc<dyn Store>>,
    State(composer): State<Arc<FeedComposer>>,
) -> Result<Json<ProfileResponse>> {
    let author = fetch_author(&store, &username).await?;
    let feed = composer
        .compose(FeedScope::Author(author.id), query.page())
        .await?;
    let following = match actor.user_id() {
        Some(user) => store.is_following(Follow::new(user, author.id)).await?,
        None => false,
    };

    Ok(Json(ProfileResponse {
        post_count: feed.total_count,
        author,
        following,
        feed,
    }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/{username}/follow", rejection(ServerError))]
struct FollowPath {
    username: String,
}

async fn follow(
    FollowPath { username }: FollowPath,
    CurrentActor(actor): CurrentActor,
    State(store): State<Arc<dyn Store>>,
) -> Result<Response> {
    let Ok(user) = access::require_user(actor, Action::Follow) else {
        return Ok(Redirect::to(LOGIN_PATH).into_response());
    };

    let author = fetch_author(&store, &username).await?;
    // a refused self-follow still lands on the profile, without any signal
    if access::check_follow_target(user, author.id) == Decision::Allow {
        store.create_follow(Follow::new(user, author.id)).await?;
    }

    Ok(Redirect::to(&profile_path(&username)).into_response())
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/{username}/unfollow", rejection(ServerError))]
struct UnfollowPath {
    username: String,
}

async fn unfollow(
    UnfollowPath { username }: UnfollowPath,
    CurrentActor(actor): CurrentActor,
    State(store): State<Arc<dyn Store>>,
) -> Result<Response> {
    let Ok(user) = access::require_user(actor, Action::Unfollow) else {
        return Ok(Redirect::to(LOGIN_PATH).into_response());
    };

    let author = fetch_author(&store, &username).await?;
    store.delete_follow(Follow::new(user, author.id)).await?;

    Ok(Redirect::to(&profile_path(&username)).into_response())
}

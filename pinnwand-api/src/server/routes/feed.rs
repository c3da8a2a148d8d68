use crate::server::auth::CurrentActor;
use crate::server::json::Json;
use crate::server::routes::FeedQuery;
use crate::server::{LOGIN_PATH, Result, ServerError, ServerRouter};
use axum::Router;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::routing::{RouterExt, TypedPath};
use pinnwand_common::access::{self, Action};
use pinnwand_common::feed::{FeedPage, FeedScope};
use pinnwand_common::model::group::{Group, GroupSlug};
use pinnwand_db::feed::FeedComposer;
use pinnwand_db::store::Store;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    Router::new()
        .typed_get(index)
        .typed_get(group_feed)
        .typed_get(follow_feed)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/", rejection(ServerError))]
struct IndexPath();

#[axum::debug_handler(state = crate::server::ServerState)]
async fn index(
    IndexPath(): IndexPath,
    Query(query): Query<FeedQuery>,
    State(composer): State<Arc<FeedComposer>>,
) -> Result<Json<FeedPage>> {
    let page = composer.compose(FeedScope::All, query.page()).await?;

    Ok(Json(page))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/group/{slug}", rejection(ServerError))]
struct GroupFeedPath {
    slug: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
struct GroupFeedResponse {
    group: Group,
    feed: FeedPage,
}

async fn group_feed(
    GroupFeedPath { slug }: GroupFeedPath,
    Query(query): Query<FeedQuery>,
    State(store): State<Arc<dyn Store>>,
    State(composer): State<Arc<FeedComposer>>,
) -> Result<Json<GroupFeedResponse>> {
    // a syntactically invalid slug can't name a group, so it is the same 404
    let slug = GroupSlug::new(slug).map_err(|err| ServerError::GroupNotFound(err.0))?;
    let group = store
        .fetch_group_by_slug(&slug)
        .await?
        .ok_or_else(|| ServerError::GroupNotFound(slug.get().to_owned()))?;
    let feed = composer
        .compose(FeedScope::Group(group.id), query.page())
        .await?;

    Ok(Json(GroupFeedResponse { group, feed }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/follow", rejection(ServerError))]
struct FollowFeedPath();

async fn follow_feed(
    FollowFeedPath(): FollowFeedPath,
    Query(query): Query<FeedQuery>,
    CurrentActor(actor): CurrentActor,
    State(composer): State<Arc<FeedComposer>>,
) -> Result<Response> {
    let Ok(user) = access::require_user(actor, Action::ReadFollowingFeed) else {
        return Ok(Redirect::to(LOGIN_PATH).into_response());
    };

    let page = composer
        .compose(FeedScope::Following(user), query.page())
        .await?;

    Ok(Json(page).into_response())
}

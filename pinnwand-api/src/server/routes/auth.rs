use crate::server::json::Json;
use crate::server::{Result, ServerError, ServerRouter};
use axum::Router;
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use pinnwand_common::model::auth::{AuthToken, Authentication};
use pinnwand_common::model::user::{CreateUser, User, UserHandle};
use pinnwand_common::util::PositiveDuration;
use pinnwand_db::store::Store;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::{Duration, UtcDateTime};

/// Issued tokens stop working after this long.
const TOKEN_LIFETIME_DAYS: i64 = 30;

pub fn routes() -> ServerRouter {
    Router::new()
        .typed_post(signup)
        .typed_post(login)
        .typed_get(login_prompt)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/auth/signup", rejection(ServerError))]
struct SignupPath();

async fn signup(
    SignupPath(): SignupPath,
    State(store): State<Arc<dyn Store>>,
    Json(body): Json<CreateUser>,
) -> Result<Json<User>> {
    let user = store.create_user(&body).await?;

    Ok(Json(user))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/auth/login", rejection(ServerError))]
struct LoginPath();

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct LoginBody {
    handle: UserHandle,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct LoginResponse {
    token: String,
}

async fn login(
    LoginPath(): LoginPath,
    State(store): State<Arc<dyn Store>>,
    Json(body): Json<LoginBody>,
) -> Result<Json<LoginResponse>> {
    let user = store
        .fetch_user_by_handle(&body.handle)
        .await?
        .ok_or_else(|| ServerError::AuthorNotFound(body.handle.get().to_owned()))?;

    let token = AuthToken::generate_random(user.id);
    let authentication = Authentication {
        user: user.id,
        token_hash: token.hash()?,
        created_at: UtcDateTime::now(),
        expires_after: PositiveDuration::new(Duration::days(TOKEN_LIFETIME_DAYS)),
    };
    store.create_auth(&authentication).await?;

    Ok(Json(LoginResponse {
        token: token.as_token_str(),
    }))
}

/// The login redirect target answers GETs with a plain 401 so anonymous
/// actors bounced here see why they landed on it.
async fn login_prompt(LoginPath(): LoginPath) -> ServerError {
    ServerError::LoginRequired
}

use crate::server::json::Json;
use axum::{
    Router,
    extract::{
        FromRef, Request,
        rejection::{JsonRejection, PathRejection},
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use pinnwand_common::model::Id;
use pinnwand_common::model::auth::AuthTokenHashError;
use pinnwand_common::model::post::PostMarker;
use pinnwand_db::cache::FeedCache;
use pinnwand_db::feed::FeedComposer;
use pinnwand_db::store::{DbError, Store};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

mod auth;
mod json;
mod routes;

pub type ServerRouter = Router<ServerState>;

/// Where anonymous actors are sent instead of an authorization error.
pub const LOGIN_PATH: &str = "/auth/login";

#[derive(Clone, FromRef)]
pub struct ServerState {
    pub store: Arc<dyn Store>,
    pub feed: Arc<FeedComposer>,
}

impl ServerState {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, cache: FeedCache) -> Self {
        let feed = Arc::new(FeedComposer::new(Arc::clone(&store), cache));

        Self { store, feed }
    }
}

pub fn routes() -> ServerRouter {
    routes::routes().fallback(fallback)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error("The auth token could not be hashed: {0}")]
    AuthTokenHash(#[from] AuthTokenHashError),
    #[error(transparent)]
    Database(#[from] DbError),
    #[error("No group with slug {0} was found.")]
    GroupNotFound(String),
    #[error("No author named {0} was found.")]
    AuthorNotFound(String),
    #[error("Post with id {0} was not found.")]
    PostNotFound(Id<PostMarker>),
    #[error("Validation failed for {} field(s)", .errors.len())]
    Validation { errors: Vec<FieldError> },
    #[error("Authentication required")]
    LoginRequired,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl ServerError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PathRejection(_)
            | ServerError::GroupNotFound(_)
            | ServerError::AuthorNotFound(_)
            | ServerError::PostNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Database(DbError::AlreadyExists) => StatusCode::CONFLICT,
            ServerError::JsonRejection(_) => StatusCode::BAD_REQUEST,
            ServerError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::LoginRequired => StatusCode::UNAUTHORIZED,
            ServerError::JsonResponse(_)
            | ServerError::Database(_)
            | ServerError::AuthTokenHash(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
struct ErrorResponse<'a> {
    status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a [FieldError]>,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        error!(error = %self, %status, "Replying with error");

        let errors = match &self {
            ServerError::Validation { errors } => Some(errors.as_slice()),
            _ => None,
        };
        let error_response = ErrorResponse {
            status: status.as_u16(),
            errors,
        };

        (status, Json(error_response)).into_response()
    }
}

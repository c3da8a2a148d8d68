use crate::server::ServerError;
use axum::{
    Json as AxumJson,
    extract::FromRequest,
    http::header,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// [`axum::Json`] with this server's rejection and error logging.
#[derive(FromRequest, Debug, Clone, Copy, Default)]
#[from_request(via(AxumJson), rejection(ServerError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        match serde_json::to_vec(&self.0) {
            Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
            Err(err) => ServerError::JsonResponse(err).into_response(),
        }
    }
}

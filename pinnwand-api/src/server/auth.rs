use crate::server::ServerError;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use pinnwand_common::access::Actor;
use pinnwand_common::model::auth::AuthToken;
use pinnwand_db::store::Store;
use std::sync::Arc;
use time::UtcDateTime;

type AuthorizationHeader = TypedHeader<Authorization<Bearer>>;

/// The identity a request acts as, resolved from its bearer token.
///
/// A missing, malformed, unknown or expired token makes the request
/// anonymous instead of rejecting it; the permission gate then decides
/// whether anonymous is good enough, and the handler answers with the login
/// redirect when it is not. Only infrastructure failures reject here.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct CurrentActor(pub Actor);

impl<S> FromRequestParts<S> for CurrentActor
where
    Arc<dyn Store>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Ok(header) = AuthorizationHeader::from_request_parts(parts, state).await else {
            return Ok(Self(Actor::Anonymous));
        };
        let Ok(token) = header.token().parse::<AuthToken>() else {
            return Ok(Self(Actor::Anonymous));
        };

        let token_hash = token.hash()?;
        let store = Arc::<dyn Store>::from_ref(state);
        let Some(authentication) = store.fetch_auth(&token_hash).await? else {
            return Ok(Self(Actor::Anonymous));
        };

        if authentication.user != token.user_id
            || authentication.is_expired_at(UtcDateTime::now())
        {
            return Ok(Self(Actor::Anonymous));
        }

        Ok(Self(Actor::User(authentication.user)))
    }
}

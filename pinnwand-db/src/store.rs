use async_trait::async_trait;
use pinnwand_common::feed::FeedScope;
use pinnwand_common::model::auth::{AuthTokenHash, Authentication};
use pinnwand_common::model::comment::{Comment, CommentMarker, CreateComment};
use pinnwand_common::model::follow::Follow;
use pinnwand_common::model::group::{CreateGroup, Group, GroupSlug};
use pinnwand_common::model::post::{CreatePost, EditPost, Post, PostMarker};
use pinnwand_common::model::user::{CreateUser, User, UserHandle};
use pinnwand_common::model::{Id, ModelValidationError};
use pinnwand_common::snowflake::TimestampError;
use thiserror::Error;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the store was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error("Generating an id failed: {0}")]
    IdGeneration(#[from] TimestampError),
    #[error("The row already exists")]
    AlreadyExists,
    #[error("A referenced row does not exist")]
    MissingReference,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Everything the platform persists, behind one object-safe seam so the
/// HTTP surface and the feed composer run unchanged against PostgreSQL or
/// the in-memory store.
#[async_trait]
pub trait Store: Send + Sync {
    async fn create_user(&self, user: &CreateUser) -> Result<User>;
    async fn fetch_user_by_handle(&self, handle: &UserHandle) -> Result<Option<User>>;

    /// Groups are created administratively; nothing on the HTTP surface
    /// writes them.
    async fn create_group(&self, group: &CreateGroup) -> Result<Group>;
    async fn fetch_group_by_slug(&self, slug: &GroupSlug) -> Result<Option<Group>>;

    async fn create_post(&self, post: &CreatePost) -> Result<Id<PostMarker>>;
    async fn fetch_post(&self, id: Id<PostMarker>) -> Result<Option<Post>>;
    /// Applies the author-editable fields. The author column is never touched.
    async fn update_post(&self, id: Id<PostMarker>, edit: &EditPost) -> Result<()>;
    /// Returns whether a row was actually deleted.
    async fn delete_post(&self, id: Id<PostMarker>) -> Result<bool>;
    async fn count_posts(&self, scope: FeedScope) -> Result<u64>;
    /// The scope's posts, newest first (creation time, then id descending).
    async fn list_posts(&self, scope: FeedScope, limit: u64, offset: u64) -> Result<Vec<Post>>;

    async fn create_comment(&self, comment: &CreateComment) -> Result<Id<CommentMarker>>;
    /// A post's comments in creation order, oldest first.
    async fn list_comments(&self, post: Id<PostMarker>) -> Result<Vec<Comment>>;

    /// Returns whether a new edge was created; an existing edge is left
    /// alone and reported as `false`.
    async fn create_follow(&self, edge: Follow) -> Result<bool>;
    /// Returns whether an edge existed; removing a missing edge is a no-op.
    async fn delete_follow(&self, edge: Follow) -> Result<bool>;
    async fn is_following(&self, edge: Follow) -> Result<bool>;

    async fn create_auth(&self, auth: &Authentication) -> Result<()>;
    async fn fetch_auth(&self, token_hash: &AuthTokenHash) -> Result<Option<Authentication>>;
}

use crate::record::{AuthenticationRecord, CommentRecord, GroupRecord, PostRecord, UserRecord};
use crate::store::{DbError, Result, Store};
use async_trait::async_trait;
use pinnwand_common::feed::FeedScope;
use pinnwand_common::model::auth::{AuthTokenHash, Authentication};
use pinnwand_common::model::comment::{Comment, CommentMarker, CreateComment};
use pinnwand_common::model::follow::Follow;
use pinnwand_common::model::group::{CreateGroup, Group, GroupSlug};
use pinnwand_common::model::post::{CreatePost, EditPost, ImageRef, Post, PostMarker};
use pinnwand_common::model::user::{CreateUser, User, UserHandle};
use pinnwand_common::model::{Id, PinnwandSnowflake, PinnwandSnowflakeGenerator};
use pinnwand_common::snowflake::{ProcessId, WorkerId};
use sqlx::PgPool;
use std::sync::Mutex;
use time::{OffsetDateTime, UtcDateTime};

/// The PostgreSQL-backed [`Store`].
pub struct DbClient {
    pool: PgPool,
    snowflake_generator: Mutex<PinnwandSnowflakeGenerator>,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool, worker_id: WorkerId, process_id: ProcessId) -> Self {
        let snowflake_generator = Mutex::new(PinnwandSnowflakeGenerator::new(worker_id, process_id));

        Self {
            pool,
            snowflake_generator,
        }
    }

    fn generate_snowflake(&self) -> Result<PinnwandSnowflake> {
        let snowflake = self
            .snowflake_generator
            .lock()
            .expect("snowflake generator mutex poisoned")
            .generate()?;

        Ok(snowflake)
    }
}

const POST_SELECT: &str = "
    SELECT
        posts.post_snowflake,
        posts.text,
        posts.image,
        posts.created_at,
        users.user_snowflake,
        users.handle,
        groups.group_snowflake,
        groups.slug AS group_slug,
        groups.title AS group_title,
        groups.description AS group_description
    FROM posts.posts
    JOIN users.users ON users.user_snowflake = posts.user_snowflake
    LEFT JOIN posts.groups ON groups.group_snowflake = posts.group_snowflake
";

const POST_ORDER: &str = "ORDER BY posts.created_at DESC, posts.post_snowflake DESC";

/// The WHERE clause selecting a scope's posts, and its bind parameter.
fn scope_filter(scope: FeedScope) -> (&'static str, Option<i64>) {
    match scope {
        FeedScope::All => ("", None),
        FeedScope::Group(group) => (
            "WHERE posts.group_snowflake = $1",
            Some(u64::from(group).cast_signed()),
        ),
        FeedScope::Author(author) => (
            "WHERE posts.user_snowflake = $1",
            Some(u64::from(author).cast_signed()),
        ),
        FeedScope::Following(follower) => (
            "WHERE posts.user_snowflake IN (
                SELECT author_snowflake FROM users.follows WHERE follower_snowflake = $1
            )",
            Some(u64::from(follower).cast_signed()),
        ),
    }
}

/// Maps constraint violations onto their [`DbError`] variants.
fn insert_error(err: sqlx::Error) -> DbError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => DbError::AlreadyExists,
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
            DbError::MissingReference
        }
        _ => DbError::Sqlx(err),
    }
}

#[async_trait]
impl Store for DbClient {
    async fn create_user(&self, user: &CreateUser) -> Result<User> {
        let snowflake = self.generate_snowflake()?;

        sqlx::query("INSERT INTO users.users (user_snowflake, handle) VALUES ($1, $2)")
            .bind(snowflake.get().cast_signed())
            .bind(user.handle.get())
            .execute(&self.pool)
            .await
            .map_err(insert_error)?;

        Ok(User {
            id: snowflake.into(),
            handle: user.handle.clone(),
        })
    }

    async fn fetch_user_by_handle(&self, handle: &UserHandle) -> Result<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT user_snowflake, handle FROM users.users WHERE handle = $1",
        )
        .bind(handle.get())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(User::try_from).transpose()?)
    }

    async fn create_group(&self, group: &CreateGroup) -> Result<Group> {
        let snowflake = self.generate_snowflake()?;

        sqlx::query(
            "INSERT INTO posts.groups (group_snowflake, slug, title, description)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(snowflake.get().cast_signed())
        .bind(group.slug.get())
        .bind(&group.title)
        .bind(&group.description)
        .execute(&self.pool)
        .await
        .map_err(insert_error)?;

        Ok(Group {
            id: snowflake.into(),
            slug: group.slug.clone(),
            title: group.title.clone(),
            description: group.description.clone(),
        })
    }

    async fn fetch_group_by_slug(&self, slug: &GroupSlug) -> Result<Option<Group>> {
        let record = sqlx::query_as::<_, GroupRecord>(
            "SELECT group_snowflake, slug, title, description
             FROM posts.groups WHERE slug = $1",
        )
        .bind(slug.get())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Group::try_from).transpose()?)
    }

    async fn create_post(&self, post: &CreatePost) -> Result<Id<PostMarker>> {
        let snowflake = self.generate_snowflake()?;
        let created_at = OffsetDateTime::from(UtcDateTime::now());

        sqlx::query(
            "INSERT INTO posts.posts
                 (post_snowflake, user_snowflake, group_snowflake, text, image, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(snowflake.get().cast_signed())
        .bind(u64::from(post.author).cast_signed())
        .bind(post.group.map(|group| u64::from(group).cast_signed()))
        .bind(post.text.get())
        .bind(post.image.as_ref().map(ImageRef::get))
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(insert_error)?;

        Ok(snowflake.into())
    }

    async fn fetch_post(&self, id: Id<PostMarker>) -> Result<Option<Post>> {
        let sql = format!("{POST_SELECT} WHERE posts.post_snowflake = $1");

        let record = sqlx::query_as::<_, PostRecord>(&sql)
            .bind(u64::from(id).cast_signed())
            .fetch_optional(&self.pool)
            .await?;

        Ok(record.map(Post::try_from).transpose()?)
    }

    async fn update_post(&self, id: Id<PostMarker>, edit: &EditPost) -> Result<()> {
        sqlx::query(
            "UPDATE posts.posts SET text = $2, group_snowflake = $3, image = $4
             WHERE post_snowflake = $1",
        )
        .bind(u64::from(id).cast_signed())
        .bind(edit.text.get())
        .bind(edit.group.map(|group| u64::from(group).cast_signed()))
        .bind(edit.image.as_ref().map(ImageRef::get))
        .execute(&self.pool)
        .await
        .map_err(insert_error)?;

        Ok(())
    }

    async fn delete_post(&self, id: Id<PostMarker>) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts.posts WHERE post_snowflake = $1")
            .bind(u64::from(id).cast_signed())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_posts(&self, scope: FeedScope) -> Result<u64> {
        let (filter, param) = scope_filter(scope);
        let sql = format!("SELECT COUNT(*) FROM posts.posts {filter}");

        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        if let Some(param) = param {
            query = query.bind(param);
        }
        let count = query.fetch_one(&self.pool).await?;

        Ok(count.cast_unsigned())
    }

    async fn list_posts(&self, scope: FeedScope, limit: u64, offset: u64) -> Result<Vec<Post>> {
        let (filter, param) = scope_filter(scope);
        let (limit_param, offset_param) = if param.is_some() {
            ("$2", "$3")
        } else {
            ("$1", "$2")
        };
        let sql =
            format!("{POST_SELECT} {filter} {POST_ORDER} LIMIT {limit_param} OFFSET {offset_param}");

        let mut query = sqlx::query_as::<_, PostRecord>(&sql);
        if let Some(param) = param {
            query = query.bind(param);
        }
        let records = query
            .bind(limit.cast_signed())
            .bind(offset.cast_signed())
            .fetch_all(&self.pool)
            .await?;

        records
            .into_iter()
            .map(|record| Post::try_from(record).map_err(DbError::from))
            .collect()
    }

    async fn create_comment(&self, comment: &CreateComment) -> Result<Id<CommentMarker>> {
        let snowflake = self.generate_snowflake()?;
        let created_at = OffsetDateTime::from(UtcDateTime::now());

        sqlx::query(
            "INSERT INTO posts.comments
                 (comment_snowflake, post_snowflake, user_snowflake, text, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(snowflake.get().cast_signed())
        .bind(u64::from(comment.post).cast_signed())
        .bind(u64::from(comment.author).cast_signed())
        .bind(comment.text.get())
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(insert_error)?;

        Ok(snowflake.into())
    }

    async fn list_comments(&self, post: Id<PostMarker>) -> Result<Vec<Comment>> {
        let records = sqlx::query_as::<_, CommentRecord>(
            "SELECT
                comments.comment_snowflake,
                comments.post_snowflake,
                comments.text,
                comments.created_at,
                users.user_snowflake,
                users.handle
            FROM posts.comments
            JOIN users.users ON users.user_snowflake = comments.user_snowflake
            WHERE comments.post_snowflake = $1
            ORDER BY comments.created_at ASC, comments.comment_snowflake ASC",
        )
        .bind(u64::from(post).cast_signed())
        .fetch_all(&self.pool)
        .await?;

        records
            .into_iter()
            .map(|record| Comment::try_from(record).map_err(DbError::from))
            .collect()
    }

    async fn create_follow(&self, edge: Follow) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO users.follows (follower_snowflake, author_snowflake)
             VALUES ($1, $2)
             ON CONFLICT DO NOTHING",
        )
        .bind(u64::from(edge.follower).cast_signed())
        .bind(u64::from(edge.author).cast_signed())
        .execute(&self.pool)
        .await
        .map_err(insert_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_follow(&self, edge: Follow) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM users.follows
             WHERE follower_snowflake = $1 AND author_snowflake = $2",
        )
        .bind(u64::from(edge.follower).cast_signed())
        .bind(u64::from(edge.author).cast_signed())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn is_following(&self, edge: Follow) -> Result<bool> {
        let following = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (
                SELECT 1 FROM users.follows
                WHERE follower_snowflake = $1 AND author_snowflake = $2
            )",
        )
        .bind(u64::from(edge.follower).cast_signed())
        .bind(u64::from(edge.author).cast_signed())
        .fetch_one(&self.pool)
        .await?;

        Ok(following)
    }

    async fn create_auth(&self, auth: &Authentication) -> Result<()> {
        sqlx::query(
            "INSERT INTO users.auth_tokens
                 (token_hash, user_snowflake, created_at, expires_after_seconds)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(auth.token_hash.0.as_slice())
        .bind(u64::from(auth.user).cast_signed())
        .bind(OffsetDateTime::from(auth.created_at))
        .bind(
            auth.expires_after
                .map(|expires_after| expires_after.get().whole_seconds()),
        )
        .execute(&self.pool)
        .await
        .map_err(insert_error)?;

        Ok(())
    }

    async fn fetch_auth(&self, token_hash: &AuthTokenHash) -> Result<Option<Authentication>> {
        let record = sqlx::query_as::<_, AuthenticationRecord>(
            "SELECT user_snowflake, token_hash, created_at, expires_after_seconds
             FROM users.auth_tokens WHERE token_hash = $1",
        )
        .bind(token_hash.0.as_slice())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Authentication::try_from).transpose()?)
    }
}

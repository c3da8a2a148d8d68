use pinnwand_common::model::ModelValidationError;
use pinnwand_common::model::auth::Authentication;
use pinnwand_common::model::comment::{Comment, CommentText};
use pinnwand_common::model::group::{Group, GroupSlug};
use pinnwand_common::model::post::{ImageRef, Post, PostText};
use pinnwand_common::model::user::{User, UserHandle};
use sqlx::FromRow;
use time::{Duration, OffsetDateTime};

#[derive(Clone, Debug, FromRow)]
pub(crate) struct UserRecord {
    pub user_snowflake: i64,
    pub handle: String,
}

#[derive(Clone, Debug, FromRow)]
pub(crate) struct GroupRecord {
    pub group_snowflake: i64,
    pub slug: String,
    pub title: String,
    pub description: String,
}

#[derive(Clone, Debug, FromRow)]
pub(crate) struct PostRecord {
    pub post_snowflake: i64,
    pub text: String,
    pub image: Option<String>,
    pub created_at: OffsetDateTime,
    pub user_snowflake: i64,
    pub handle: String,
    pub group_snowflake: Option<i64>,
    pub group_slug: Option<String>,
    pub group_title: Option<String>,
    pub group_description: Option<String>,
}

#[derive(Clone, Debug, FromRow)]
pub(crate) struct CommentRecord {
    pub comment_snowflake: i64,
    pub post_snowflake: i64,
    pub text: String,
    pub created_at: OffsetDateTime,
    pub user_snowflake: i64,
    pub handle: String,
}

#[derive(Clone, Debug, FromRow)]
pub(crate) struct AuthenticationRecord {
    pub user_snowflake: i64,
    pub token_hash: Vec<u8>,
    pub created_at: OffsetDateTime,
    pub expires_after_seconds: Option<i64>,
}

impl TryFrom<UserRecord> for User {
    type Error = ModelValidationError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.user_snowflake.cast_unsigned().into(),
            handle: UserHandle::new(value.handle)?,
        })
    }
}

impl TryFrom<GroupRecord> for Group {
    type Error = ModelValidationError;

    fn try_from(value: GroupRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.group_snowflake.cast_unsigned().into(),
            slug: GroupSlug::new(value.slug)?,
            title: value.title,
            description: value.description,
        })
    }
}

impl TryFrom<PostRecord> for Post {
    type Error = ModelValidationError;

    fn try_from(value: PostRecord) -> Result<Self, Self::Error> {
        // group columns come from a LEFT JOIN and are either all set or all null
        let group = match (value.group_snowflake, value.group_slug) {
            (Some(group_snowflake), Some(slug)) => Some(Group {
                id: group_snowflake.cast_unsigned().into(),
                slug: GroupSlug::new(slug)?,
                title: value.group_title.unwrap_or_default(),
                description: value.group_description.unwrap_or_default(),
            }),
            _ => None,
        };

        Ok(Self {
            id: value.post_snowflake.cast_unsigned().into(),
            author: User {
                id: value.user_snowflake.cast_unsigned().into(),
                handle: UserHandle::new(value.handle)?,
            },
            text: PostText::new(value.text)?,
            group,
            image: value.image.map(ImageRef::new).transpose()?,
            created_at: value.created_at.to_utc(),
        })
    }
}

impl TryFrom<CommentRecord> for Comment {
    type Error = ModelValidationError;

    fn try_from(value: CommentRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.comment_snowflake.cast_unsigned().into(),
            post: value.post_snowflake.cast_unsigned().into(),
            author: User {
                id: value.user_snowflake.cast_unsigned().into(),
                handle: UserHandle::new(value.handle)?,
            },
            text: CommentText::new(value.text)?,
            created_at: value.created_at.to_utc(),
        })
    }
}

impl TryFrom<AuthenticationRecord> for Authentication {
    type Error = ModelValidationError;

    fn try_from(value: AuthenticationRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            user: value.user_snowflake.cast_unsigned().into(),
            token_hash: Box::<[u8]>::from(value.token_hash).try_into()?,
            created_at: value.created_at.to_utc(),
            expires_after: value
                .expires_after_seconds
                .map(|seconds| Duration::seconds(seconds).try_into())
                .transpose()?,
        })
    }
}

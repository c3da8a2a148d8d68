use crate::model::group::{Group, GroupMarker};
use crate::model::user::{User, UserMarker};
use crate::model::Id;
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use thiserror::Error;
use time::UtcDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub author: User,
    pub text: PostText,
    pub group: Option<Group>,
    pub image: Option<ImageRef>,
    pub created_at: UtcDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct CreatePost {
    pub author: Id<UserMarker>,
    pub text: PostText,
    pub group: Option<Id<GroupMarker>>,
    pub image: Option<ImageRef>,
}

/// The author-editable part of a post. The author itself is immutable.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct EditPost {
    pub text: PostText,
    pub group: Option<Id<GroupMarker>>,
    pub image: Option<ImageRef>,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct PostText(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Post text must not be empty")]
pub struct InvalidPostTextError;

impl PostText {
    pub fn new(text: String) -> Result<Self, InvalidPostTextError> {
        if text.is_empty() {
            Err(InvalidPostTextError)
        } else {
            Ok(PostText(text))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for PostText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        PostText::new(inner).map_err(|_| Error::invalid_value(Unexpected::Str(""), &"PostText"))
    }
}

/// A reference to an uploaded attachment, stored as an opaque path.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct ImageRef(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Image reference must not be empty")]
pub struct InvalidImageRefError;

impl ImageRef {
    pub fn new(reference: String) -> Result<Self, InvalidImageRefError> {
        if reference.is_empty() {
            Err(InvalidImageRefError)
        } else {
            Ok(ImageRef(reference))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for ImageRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        ImageRef::new(inner).map_err(|_| Error::invalid_value(Unexpected::Str(""), &"ImageRef"))
    }
}

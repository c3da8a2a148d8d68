use crate::model::user::UserMarker;
use crate::model::Id;
use serde::{Deserialize, Serialize};

/// A directed edge in the social graph: `follower` sees `author`'s posts in
/// their follow feed. At most one edge exists per ordered pair; the
/// permission gate refuses self-follows before an edge is ever constructed.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Deserialize, Serialize)]
pub struct Follow {
    pub follower: Id<UserMarker>,
    pub author: Id<UserMarker>,
}

impl Follow {
    #[must_use]
    pub fn new(follower: Id<UserMarker>, author: Id<UserMarker>) -> Self {
        Self { follower, author }
    }
}

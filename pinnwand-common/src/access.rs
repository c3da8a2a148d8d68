//! The permission gate: pure decisions about who may do what. The HTTP
//! surface asks before touching the store and maps each deny reason to its
//! response (a login redirect, a bounce back to the resource, or a silent
//! no-op). The gate itself never redirects.

use crate::model::user::UserMarker;
use crate::model::Id;

/// The identity a request acts as.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash)]
pub enum Actor {
    #[default]
    Anonymous,
    User(Id<UserMarker>),
}

impl Actor {
    #[must_use]
    pub fn user_id(self) -> Option<Id<UserMarker>> {
        match self {
            Actor::Anonymous => None,
            Actor::User(id) => Some(id),
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum Action {
    ReadFeed,
    ReadPost,
    ReadFollowingFeed,
    CreatePost,
    EditPost,
    AddComment,
    Follow,
    Unfollow,
}

impl Action {
    #[must_use]
    fn requires_authentication(self) -> bool {
        match self {
            Action::ReadFeed | Action::ReadPost => false,
            Action::ReadFollowingFeed
            | Action::CreatePost
            | Action::EditPost
            | Action::AddComment
            | Action::Follow
            | Action::Unfollow => true,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum DenyReason {
    NotAuthenticated,
    NotAuthor,
    SelfFollow,
}

/// Whether `actor` may perform `action` at all. Resource-specific rules are
/// [`check_author`] and [`check_follow_target`].
#[must_use]
pub fn check(actor: Actor, action: Action) -> Decision {
    if action.requires_authentication() && actor == Actor::Anonymous {
        Decision::Deny(DenyReason::NotAuthenticated)
    } else {
        Decision::Allow
    }
}

/// Whether `user` may edit a post written by `author`. Only the author may;
/// everyone else is bounced back to the post, not shown an error.
#[must_use]
pub fn check_author(user: Id<UserMarker>, author: Id<UserMarker>) -> Decision {
    if user == author {
        Decision::Allow
    } else {
        Decision::Deny(DenyReason::NotAuthor)
    }
}

/// Whether `follower` may follow `author`. Following yourself is refused
/// without any user-visible signal.
#[must_use]
pub fn check_follow_target(follower: Id<UserMarker>, author: Id<UserMarker>) -> Decision {
    if follower == author {
        Decision::Deny(DenyReason::SelfFollow)
    } else {
        Decision::Allow
    }
}

/// [`check`] plus unwrapping the authenticated id, for handlers that need it.
pub fn require_user(actor: Actor, action: Action) -> Result<Id<UserMarker>, DenyReason> {
    match check(actor, action) {
        Decision::Deny(reason) => Err(reason),
        Decision::Allow => actor.user_id().ok_or(DenyReason::NotAuthenticated),
    }
}

#[cfg(test)]
mod tests {
    use crate::access::{
        Action, Actor, Decision, DenyReason, check, check_author, check_follow_target,
        require_user,
    };

    #[test]
    fn reads_are_open_to_everyone() {
        for action in [Action::ReadFeed, Action::ReadPost] {
            assert_eq!(check(Actor::Anonymous, action), Decision::Allow);
            assert_eq!(check(Actor::User(1.into()), action), Decision::Allow);
        }
    }

    #[test]
    fn mutations_require_authentication() {
        let gated = [
            Action::ReadFollowingFeed,
            Action::CreatePost,
            Action::EditPost,
            Action::AddComment,
            Action::Follow,
            Action::Unfollow,
        ];

        for action in gated {
            assert_eq!(
                check(Actor::Anonymous, action),
                Decision::Deny(DenyReason::NotAuthenticated)
            );
            assert_eq!(check(Actor::User(1.into()), action), Decision::Allow);
        }
    }

    #[test]
    fn only_the_author_may_edit() {
        assert_eq!(check_author(1.into(), 1.into()), Decision::Allow);
        assert_eq!(
            check_author(2.into(), 1.into()),
            Decision::Deny(DenyReason::NotAuthor)
        );
    }

    #[test]
    fn self_follow_is_refused() {
        assert_eq!(check_follow_target(1.into(), 2.into()), Decision::Allow);
        assert_eq!(
            check_follow_target(1.into(), 1.into()),
            Decision::Deny(DenyReason::SelfFollow)
        );
    }

    #[test]
    fn require_user_returns_the_id() {
        assert_eq!(require_user(Actor::User(7.into()), Action::CreatePost), Ok(7.into()));
        assert_eq!(
            require_user(Actor::Anonymous, Action::CreatePost),
            Err(DenyReason::NotAuthenticated)
        );
    }
}

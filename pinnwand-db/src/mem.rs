use crate::store::{DbError, Result, Store};
use async_trait::async_trait;
use pinnwand_common::feed::FeedScope;
use pinnwand_common::model::auth::{AuthTokenHash, Authentication};
use pinnwand_common::model::comment::{Comment, CommentMarker, CreateComment};
use pinnwand_common::model::follow::Follow;
use pinnwand_common::model::group::{CreateGroup, Group, GroupSlug};
use pinnwand_common::model::post::{CreatePost, EditPost, Post, PostMarker};
use pinnwand_common::model::user::{CreateUser, User, UserHandle, UserMarker};
use pinnwand_common::model::{Id, PinnwandSnowflakeGenerator};
use pinnwand_common::snowflake::{ProcessId, WorkerId};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};
use time::UtcDateTime;

/// A [`Store`] living entirely in process memory. Backs the test suites and
/// is handy for poking at the API without a database; nothing about it is
/// durable.
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

struct Inner {
    snowflakes: PinnwandSnowflakeGenerator,
    users: Vec<User>,
    groups: Vec<Group>,
    posts: Vec<Post>,
    comments: Vec<Comment>,
    follows: HashSet<Follow>,
    logins: Vec<Authentication>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        let inner = Inner {
            snowflakes: PinnwandSnowflakeGenerator::new(
                WorkerId::default(),
                ProcessId::default(),
            ),
            users: Vec::new(),
            groups: Vec::new(),
            posts: Vec::new(),
            comments: Vec::new(),
            follows: HashSet::new(),
            logins: Vec::new(),
        };

        Self {
            inner: Mutex::new(inner),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("store mutex poisoned")
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Inner {
    fn user(&self, id: Id<UserMarker>) -> Result<User> {
        self.users
            .iter()
            .find(|user| user.id == id)
            .cloned()
            .ok_or(DbError::MissingReference)
    }

    fn in_scope(&self, scope: FeedScope, post: &Post) -> bool {
        match scope {
            FeedScope::All => true,
            FeedScope::Group(group) => post.group.as_ref().is_some_and(|g| g.id == group),
            FeedScope::Author(author) => post.author.id == author,
            FeedScope::Following(follower) => self
                .follows
                .contains(&Follow::new(follower, post.author.id)),
        }
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn create_user(&self, user: &CreateUser) -> Result<User> {
        let mut inner = self.lock();

        if inner.users.iter().any(|u| u.handle == user.handle) {
            return Err(DbError::AlreadyExists);
        }

        let created = User {
            id: inner.snowflakes.generate()?.into(),
            handle: user.handle.clone(),
        };
        inner.users.push(created.clone());

        Ok(created)
    }

    async fn fetch_user_by_handle(&self, handle: &UserHandle) -> Result<Option<User>> {
        Ok(self
            .lock()
            .users
            .iter()
            .find(|user| &user.handle == handle)
            .cloned())
    }

    async fn create_group(&self, group: &CreateGroup) -> Result<Group> {
        let mut inner = self.lock();

        if inner.groups.iter().any(|g| g.slug == group.slug) {
            return Err(DbError::AlreadyExists);
        }

        let created = Group {
            id: inner.snowflakes.generate()?.into(),
            slug: group.slug.clone(),
            title: group.title.clone(),
            description: group.description.clone(),
        };
        inner.groups.push(created.clone());

        Ok(created)
    }

    async fn fetch_group_by_slug(&self, slug: &GroupSlug) -> Result<Option<Group>> {
        Ok(self
            .lock()
            .groups
            .iter()
            .find(|group| &group.slug == slug)
            .cloned())
    }

    async fn create_post(&self, post: &CreatePost) -> Result<Id<PostMarker>> {
        let mut inner = self.lock();

        let author = inner.user(post.author)?;
        let group = post
            .group
            .map(|group_id| {
                inner
                    .groups
                    .iter()
                    .find(|group| group.id == group_id)
                    .cloned()
                    .ok_or(DbError::MissingReference)
            })
            .transpose()?;

        let id = inner.snowflakes.generate()?.into();
        inner.posts.push(Post {
            id,
            author,
            text: post.text.clone(),
            group,
            image: post.image.clone(),
            created_at: UtcDateTime::now(),
        });

        Ok(id)
    }

    async fn fetch_post(&self, id: Id<PostMarker>) -> Result<Option<Post>> {
        Ok(self.lock().posts.iter().find(|post| post.id == id).cloned())
    }

    async fn update_post(&self, id: Id<PostMarker>, edit: &EditPost) -> Result<()> {
        let mut inner = self.lock();

        let group = edit
            .group
            .map(|group_id| {
                inner
                    .groups
                    .iter()
                    .find(|group| group.id == group_id)
                    .cloned()
                    .ok_or(DbError::MissingReference)
            })
            .transpose()?;

        if let Some(post) = inner.posts.iter_mut().find(|post| post.id == id) {
            post.text = edit.text.clone();
            post.group = group;
            post.image = edit.image.clone();
        }

        Ok(())
    }

    async fn delete_post(&self, id: Id<PostMarker>) -> Result<bool> {
        let mut inner = self.lock();

        let before = inner.posts.len();
        inner.posts.retain(|post| post.id != id);
        inner.comments.retain(|comment| comment.post != id);

        Ok(inner.posts.len() != before)
    }

    async fn count_posts(&self, scope: FeedScope) -> Result<u64> {
        let inner = self.lock();

        let count = inner
            .posts
            .iter()
            .filter(|post| inner.in_scope(scope, post))
            .count();

        Ok(count as u64)
    }

    async fn list_posts(&self, scope: FeedScope, limit: u64, offset: u64) -> Result<Vec<Post>> {
        let inner = self.lock();

        let mut posts: Vec<Post> = inner
            .posts
            .iter()
            .filter(|post| inner.in_scope(scope, post))
            .cloned()
            .collect();
        posts.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        Ok(posts
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .collect())
    }

    async fn create_comment(&self, comment: &CreateComment) -> Result<Id<CommentMarker>> {
        let mut inner = self.lock();

        let author = inner.user(comment.author)?;
        if !inner.posts.iter().any(|post| post.id == comment.post) {
            return Err(DbError::MissingReference);
        }

        let id = inner.snowflakes.generate()?.into();
        inner.comments.push(Comment {
            id,
            post: comment.post,
            author,
            text: comment.text.clone(),
            created_at: UtcDateTime::now(),
        });

        Ok(id)
    }

    async fn list_comments(&self, post: Id<PostMarker>) -> Result<Vec<Comment>> {
        let mut comments: Vec<Comment> = self
            .lock()
            .comments
            .iter()
            .filter(|comment| comment.post == post)
            .cloned()
            .collect();
        comments.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        Ok(comments)
    }

    async fn create_follow(&self, edge: Follow) -> Result<bool> {
        Ok(self.lock().follows.insert(edge))
    }

    async fn delete_follow(&self, edge: Follow) -> Result<bool> {
        Ok(self.lock().follows.remove(&edge))
    }

    async fn is_following(&self, edge: Follow) -> Result<bool> {
        Ok(self.lock().follows.contains(&edge))
    }

    async fn create_auth(&self, auth: &Authentication) -> Result<()> {
        self.lock().logins.push(auth.clone());
        Ok(())
    }

    async fn fetch_auth(&self, token_hash: &AuthTokenHash) -> Result<Option<Authentication>> {
        Ok(self
            .lock()
            .logins
            .iter()
            .find(|login| &login.token_hash == token_hash)
            .cloned())
    }
}

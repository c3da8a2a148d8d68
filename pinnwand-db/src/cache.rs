use pinnwand_common::feed::FeedPage;
use pinnwand_common::util::PositiveDuration;
use std::sync::{Mutex, MutexGuard};
use time::{Duration, UtcDateTime};

/// Process-wide cache for the composed root feed ("all posts", page one).
///
/// One timestamped slot: an entry is served as-is until the window elapses.
/// Mutations never invalidate the slot, so a post deleted right after a fill
/// keeps showing up until the window runs out. That staleness is an accepted
/// trade for not recomputing the hottest page on every request.
///
/// The `*_at` variants take the clock as a parameter, mirroring
/// [`SnowflakeGenerator::generate_at`](pinnwand_common::snowflake::SnowflakeGenerator::generate_at).
pub struct FeedCache {
    window: Duration,
    slot: Mutex<Option<Snapshot>>,
}

#[derive(Clone, Debug)]
struct Snapshot {
    filled_at: UtcDateTime,
    page: FeedPage,
}

impl FeedCache {
    #[must_use]
    pub fn new(window: PositiveDuration) -> Self {
        Self {
            window: window.get(),
            slot: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn get(&self) -> Option<FeedPage> {
        self.get_at(UtcDateTime::now())
    }

    /// The cached page, if the slot was filled less than one window before
    /// `now`.
    #[must_use]
    pub fn get_at(&self, now: UtcDateTime) -> Option<FeedPage> {
        self.lock()
            .as_ref()
            .filter(|snapshot| now - snapshot.filled_at < self.window)
            .map(|snapshot| snapshot.page.clone())
    }

    pub fn fill(&self, page: &FeedPage) {
        self.fill_at(page, UtcDateTime::now());
    }

    pub fn fill_at(&self, page: &FeedPage, now: UtcDateTime) {
        *self.lock() = Some(Snapshot {
            filled_at: now,
            page: page.clone(),
        });
    }

    pub fn clear(&self) {
        *self.lock() = None;
    }

    fn lock(&self) -> MutexGuard<'_, Option<Snapshot>> {
        self.slot.lock().expect("cache mutex poisoned")
    }
}

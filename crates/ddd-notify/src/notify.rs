//! Collective Notify API.
//!
//! A round follows begin → announce → notify → end. `notify` is collective:
//! every rank runs it once per round, including ranks whose announcements are
//! already known to be invalid. Those ranks still take part in both waves, so
//! the failure surfaces as the same [`NotifyError::Exception`] everywhere.

use std::sync::Arc;

use ddd_core::{ExceptionCode, Rank};
use ddd_transport::{MemoryPool, Transport};

use crate::config::NotifyConfig;
use crate::error::{NotifyError, Result};
use crate::record::NotifyRecord;
use crate::wave::{merge_up, route_down};

/// A message this rank intends to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Announcement {
    pub dest: Rank,
    pub size: u64,
}

/// A message this rank must expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ExpectedRecv {
    pub src: Rank,
    pub size: u64,
}

/// Runs Notify rounds for one rank.
pub struct Notifier<'a, T: Transport> {
    transport: &'a T,
    pool: &'a Arc<dyn MemoryPool>,
    config: &'a NotifyConfig,
}

impl<'a, T: Transport> Notifier<'a, T> {
    pub fn new(transport: &'a T, pool: &'a Arc<dyn MemoryPool>, config: &'a NotifyConfig) -> Self {
        Self {
            transport,
            pool,
            config,
        }
    }

    /// Start a round with room for `count` announcements.
    pub fn begin(&self, count: usize) -> NotifyRound<'_, 'a, T> {
        NotifyRound {
            notifier: self,
            capacity: count,
            announcements: Vec::with_capacity(count),
        }
    }

    /// Run one round over `announcements`.
    ///
    /// Returns the expected receives, ordered by source rank and, within one
    /// source, by the order the source announced them.
    pub async fn notify(&self, announcements: &[Announcement]) -> Result<Vec<ExpectedRecv>> {
        let local = self.validate(announcements);
        self.run(announcements, local).await
    }

    /// Take part in a round while withdrawing with `code`.
    ///
    /// Returns the combined exception of the round, which is `code` or a
    /// more negative code raised elsewhere.
    pub async fn notify_exception(&self, code: ExceptionCode) -> NotifyError {
        match self.run(&[], Some(code)).await {
            Ok(_) => NotifyError::Exception(code),
            Err(e) => e,
        }
    }

    fn validate(&self, announcements: &[Announcement]) -> Option<ExceptionCode> {
        let me = self.transport.rank();
        let size = self.transport.size();
        let limit = self.config.limit(size);

        if announcements.len() > limit {
            tracing::warn!(
                rank = me.0,
                count = announcements.len(),
                limit,
                "notify: too many announced sends"
            );
            return Some(ExceptionCode::TOO_MANY_SENDS);
        }
        if let Some(bad) = announcements
            .iter()
            .find(|a| a.dest == me || a.dest.index() >= size)
        {
            tracing::warn!(rank = me.0, dest = bad.dest.0, "notify: invalid destination");
            return Some(ExceptionCode::INVALID_DESTINATION);
        }
        None
    }

    async fn run(
        &self,
        announcements: &[Announcement],
        exception: Option<ExceptionCode>,
    ) -> Result<Vec<ExpectedRecv>> {
        let me = self.transport.rank();

        let mut own = Vec::with_capacity(announcements.len() + 1);
        own.push(NotifyRecord::placeholder(me));
        if exception.is_none() {
            own.extend(
                announcements
                    .iter()
                    .enumerate()
                    .map(|(i, a)| NotifyRecord::message(me, a.dest, i as u32, a.size)),
            );
        }

        let up = merge_up(self.transport, self.pool, own, exception).await?;
        let mine = route_down(self.transport, up).await?;

        tracing::debug!(
            rank = me.0,
            sends = announcements.len(),
            recvs = mine.len(),
            "notify: round complete"
        );

        Ok(mine
            .into_iter()
            .map(|r| ExpectedRecv {
                src: r.from,
                size: r.size,
            })
            .collect())
    }
}

/// One Notify round in progress.
pub struct NotifyRound<'n, 'a, T: Transport> {
    notifier: &'n Notifier<'a, T>,
    capacity: usize,
    announcements: Vec<Announcement>,
}

impl<'n, 'a, T: Transport> NotifyRound<'n, 'a, T> {
    /// Announce a send of `size` bytes to `dest`.
    ///
    /// # Panics
    /// If more announcements are made than the round was begun with.
    pub fn announce(&mut self, dest: Rank, size: u64) {
        assert!(
            self.announcements.len() < self.capacity,
            "notify round begun with {} announcements, got more",
            self.capacity
        );
        self.announcements.push(Announcement { dest, size });
    }

    /// Run the collective; see [`Notifier::notify`].
    pub async fn notify(&self) -> Result<Vec<ExpectedRecv>> {
        self.notifier.notify(&self.announcements).await
    }

    /// Finish the round and release its announcement list.
    pub fn end(self) {}
}

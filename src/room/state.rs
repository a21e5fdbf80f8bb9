use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{Notify, RwLock};

use super::{ChatMessage, ClientId};
use crate::error::{MurmurError, Result};

/// Membership and log. Written only by the registry loop.
#[derive(Debug, Default)]
pub(crate) struct RoomState {
    pub members: HashSet<ClientId>,
    pub log: Vec<ChatMessage>,
}

pub(crate) type SharedRoom = Arc<RwLock<RoomState>>;

/// Outstanding-intent accounting shared by the intake side and the loop.
///
/// An intent is counted from the moment a caller starts submitting it until
/// the loop has applied it (or the submission fails). Shutdown sets `closing`
/// and then waits for the count to reach zero; a submitter increments before
/// it reads `closing`, so either the submitter sees the flag and backs out, or
/// the loop sees the count and keeps draining.
#[derive(Debug, Default)]
pub(crate) struct Lifecycle {
    outstanding: AtomicUsize,
    closing: AtomicBool,
    idle: Notify,
}

impl Lifecycle {
    /// Count a new submission, or refuse it once shutdown has begun
    pub fn begin(&self) -> Result<Ticket<'_>> {
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        let ticket = Ticket {
            lifecycle: self,
            handed_off: false,
        };
        if self.closing.load(Ordering::SeqCst) {
            // dropping the ticket undoes the increment
            return Err(MurmurError::ShuttingDown);
        }
        Ok(ticket)
    }

    /// One counted intent is done
    pub fn finish(&self) {
        if self.outstanding.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }

    /// Returns true if shutdown had already begun
    pub fn close(&self) -> bool {
        self.closing.swap(true, Ordering::SeqCst)
    }

    pub fn is_closing(&self) -> bool {
        self.closing.load(Ordering::SeqCst)
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    /// Resolve once nothing is outstanding
    pub async fn wait_idle(&self) {
        loop {
            // registered before the check so a concurrent finish is not missed
            let idle = self.idle.notified();
            if self.outstanding() == 0 {
                return;
            }
            idle.await;
        }
    }
}

/// Holds one unit of the outstanding count while a caller submits an intent.
/// Dropped without `hand_off` (error, or the caller's future was cancelled)
/// it gives the unit back; handed off, the loop releases it after applying.
#[derive(Debug)]
pub(crate) struct Ticket<'a> {
    lifecycle: &'a Lifecycle,
    handed_off: bool,
}

impl Ticket<'_> {
    pub fn hand_off(mut self) {
        self.handed_off = true;
    }
}

impl Drop for Ticket<'_> {
    fn drop(&mut self) {
        if !self.handed_off {
            self.lifecycle.finish();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn dropped_ticket_releases_its_count() {
        let lc = Lifecycle::default();
        {
            let _ticket = lc.begin().unwrap();
            assert_eq!(lc.outstanding(), 1);
        }
        assert_eq!(lc.outstanding(), 0);
    }

    #[test]
    fn handed_off_ticket_stays_counted_until_finished() {
        let lc = Lifecycle::default();
        lc.begin().unwrap().hand_off();
        assert_eq!(lc.outstanding(), 1);
        lc.finish();
        assert_eq!(lc.outstanding(), 0);
    }

    #[test]
    fn begin_fails_after_close() {
        let lc = Lifecycle::default();
        assert!(!lc.close());
        assert!(matches!(lc.begin(), Err(MurmurError::ShuttingDown)));
        assert_eq!(lc.outstanding(), 0);
        assert!(lc.close());
    }

    #[tokio::test]
    async fn wait_idle_wakes_when_count_drains() {
        let lc = Arc::new(Lifecycle::default());
        lc.begin().unwrap().hand_off();
        let waiter = {
            let lc = lc.clone();
            tokio::spawn(async move { lc.wait_idle().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());
        lc.finish();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }
}

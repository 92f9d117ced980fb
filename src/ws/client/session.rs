use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;

/// State shared by the read loop (writer) and the heartbeat task (reader).
#[derive(Debug)]
pub(crate) struct SessionState {
    sequence: watch::Sender<Option<u64>>,
    open: AtomicBool,
}

impl SessionState {
    pub fn new() -> Self {
        let (sequence, _) = watch::channel(None);
        Self {
            sequence,
            open: AtomicBool::new(false),
        }
    }

    pub fn sequence(&self) -> Option<u64> {
        *self.sequence.borrow()
    }

    /// Record a newly dispatched sequence number, older values are ignored.
    pub fn update_sequence(&self, value: u64) -> bool {
        let updated = self.sequence.send_if_modified(|current| match current {
            Some(last) if *last >= value => false,
            _ => {
                current.replace(value);
                true
            }
        });

        if !updated {
            log::trace!(
                "Ignore sequence {} not newer than {:?}",
                value,
                self.sequence()
            );
        }

        updated
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    pub fn set_open(&self, open: bool) {
        self.open.store(open, Ordering::Release);
    }
}

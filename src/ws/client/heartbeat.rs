use std::{sync::Arc, time::Duration};

use futures_util::SinkExt;
use snafu::prelude::*;
use tokio::{sync::watch, task::JoinHandle, time::Instant};

use super::{session::SessionState, SharedSink, Transport};
use crate::ws::payload::{Payload, PayloadStreamError};

/// How long [`HeartbeatHandle::stop`] waits the task before abort it
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Error which stops the heartbeat task
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), module(error), context(suffix(false)))]
pub enum HeartbeatError {
    /// send heartbeat payload failed while connection is still open
    #[snafu(display("send heartbeat failed: {source}"))]
    SendHeartbeatFailed {
        /// source error
        source: PayloadStreamError,
    },

    /// heartbeat task panicked or was aborted
    #[snafu(display("heartbeat task failed: {source}"))]
    TaskFailed {
        /// source error
        source: tokio::task::JoinError,
    },
}

/// Handle of a running heartbeat task
#[derive(Debug)]
pub(crate) struct HeartbeatHandle {
    interval: Duration,
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<Result<(), HeartbeatError>>,
}

impl HeartbeatHandle {
    pub fn start<S: Transport>(
        interval: Duration,
        session: Arc<SessionState>,
        sink: SharedSink<S>,
    ) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);

        let worker = HeartbeatWorker {
            interval,
            session,
            sink,
            stop_rx,
        };

        Self {
            interval,
            stop_tx,
            task: tokio::spawn(worker.run()),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Signal the task to stop and wait it to finish, abort it if it does not.
    pub async fn stop(mut self) -> Result<(), HeartbeatError> {
        log::debug!("Stopping heartbeat task");
        let _ = self.stop_tx.send(true);

        match tokio::time::timeout(STOP_TIMEOUT, &mut self.task).await {
            Ok(joined) => joined.context(error::TaskFailed)?,
            Err(_) => {
                log::warn!("Heartbeat task not stopped in {:?}, abort it", STOP_TIMEOUT);
                self.task.abort();
                Ok(())
            }
        }
    }
}

struct HeartbeatWorker<S> {
    interval: Duration,
    session: Arc<SessionState>,
    sink: SharedSink<S>,
    stop_rx: watch::Receiver<bool>,
}

impl<S: Transport> HeartbeatWorker<S> {
    async fn run(mut self) -> Result<(), HeartbeatError> {
        // desynchronize clients reconnecting at the same time
        let jitter = self.interval.mul_f64(rand::random::<f64>());

        log::debug!(
            "Heartbeat start, interval {:?}, first beat after {:?}",
            self.interval,
            jitter
        );

        let mut beat_tick = Instant::now() + jitter;

        loop {
            tokio::select! {
                biased;

                _ = self.stop_rx.changed() => {
                    log::debug!("Heartbeat got stop signal");
                    break;
                }

                _ = tokio::time::sleep_until(beat_tick) => {}
            }

            if !self.session.is_open() {
                log::debug!("Session closed, heartbeat stop");
                break;
            }

            let sequence = self.session.sequence();
            log::trace!("Send heartbeat with sequence {:?}", sequence);

            let sink = &self.sink;
            let result = tokio::select! {
                biased;

                _ = self.stop_rx.changed() => {
                    log::debug!("Heartbeat got stop signal while sending");
                    break;
                }

                result = async { sink.lock().await.send(Payload::Heartbeat(sequence)).await } => result,
            };

            if let Err(err) = result {
                if !self.session.is_open() || err.is_closed() {
                    log::debug!("Send heartbeat failed while closing: {}", err);
                    break;
                }
                log::warn!("Send heartbeat failed: {}", err);
                return Err(err).context(error::SendHeartbeatFailed);
            }

            beat_tick += self.interval;
            log::trace!("Next heartbeat at {:?}", beat_tick);
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use tokio::sync::Mutex;

    use super::*;
    use crate::ws::client::testing;
    use crate::ws::payload::PayloadSink;

    fn start(interval: Duration) -> (HeartbeatHandle, Arc<SessionState>, testing::MockServer) {
        let (transport, server) = testing::pair();
        let (sink, _stream) = futures_util::StreamExt::split(transport);
        let sink = Arc::new(Mutex::new(PayloadSink::new(sink)));

        let session = Arc::new(SessionState::new());
        session.set_open(true);

        let handle = HeartbeatHandle::start(interval, session.clone(), sink);
        (handle, session, server)
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_cadence() {
        let interval = Duration::from_millis(1000);
        let (handle, _session, mut server) = start(interval);

        let mut sent_at = Vec::new();
        for _ in 0..4 {
            let payload = server.recv().await.unwrap();
            assert_eq!(payload, Payload::Heartbeat(None));
            sent_at.push(Instant::now());
        }

        for pair in sent_at.windows(2) {
            let gap = pair[1] - pair[0];
            assert!(gap >= interval, "gap {:?} too short", gap);
            assert!(gap < interval + Duration::from_millis(5), "gap {:?} too long", gap);
        }

        handle.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_first_beat_within_interval() {
        let interval = Duration::from_secs(45);
        let started_at = Instant::now();
        let (handle, _session, mut server) = start(interval);

        server.recv().await.unwrap();
        assert!(Instant::now() - started_at <= interval);

        handle.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_carries_latest_sequence() {
        let (handle, session, mut server) = start(Duration::from_secs(10));

        session.update_sequence(1);
        assert_eq!(server.recv().await.unwrap(), Payload::Heartbeat(Some(1)));

        session.update_sequence(2);
        session.update_sequence(3);
        assert_eq!(server.recv().await.unwrap(), Payload::Heartbeat(Some(3)));

        handle.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_stop_before_first_beat() {
        let (handle, _session, mut server) = start(Duration::from_secs(3600));

        assert!(handle.is_running());
        handle.stop().await.unwrap();

        tokio::time::sleep(Duration::from_secs(7200)).await;
        assert!(server.try_recv().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_stops_when_session_closed() {
        let (handle, session, mut server) = start(Duration::from_secs(1));

        server.recv().await.unwrap();
        session.set_open(false);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(server.try_recv().is_none());
        assert!(!handle.is_running());
        handle.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_stop_while_send_stalled() {
        let (handle, _session, server) = start(Duration::from_secs(1));

        server.stall();
        // first beat is now pending on the stalled transport
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(handle.is_running());

        let stopped = tokio::time::timeout(Duration::from_secs(1), handle.stop()).await;
        assert!(matches!(stopped, Ok(Ok(()))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_send_error_is_reported() {
        let (handle, _session, server) = start(Duration::from_secs(1));

        // transport write half is gone while session is still open
        drop(server);
        tokio::time::sleep(Duration::from_secs(2)).await;

        let err = handle.stop().await.unwrap_err();
        assert!(matches!(err, HeartbeatError::SendHeartbeatFailed { .. }));
    }
}

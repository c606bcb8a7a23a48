//! Background poll loop
//!
//! Drives the cache controller on a fixed interval from a dedicated tokio task
//! and forwards each cycle's result over a channel to whoever renders it.
//! Cycles never overlap: a session runs one at a time, and restarting waits
//! for the previous session's task to exit before spawning the next.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::cache::{CacheController, CycleOutcome};
use crate::data::fetcher::Fetcher;

/// Messages sent from the poll loop to the presenter
#[derive(Debug)]
pub enum PollEvent {
    /// A network fetch is about to start
    Fetching,
    /// A cycle finished
    Cycle(CycleOutcome),
}

/// Lifecycle of the poller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// Never started
    Idle,
    /// A session is looping
    Running,
    /// The last session has ended
    Cancelled,
}

/// A running poll session
#[derive(Debug)]
struct Session {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owns the poll session and is the only thing that starts or stops cycles
#[derive(Debug)]
pub struct Poller<F> {
    controller: Arc<CacheController<F>>,
    interval: Duration,
    session: Option<Session>,
    state: PollState,
}

impl<F: Fetcher> Poller<F> {
    /// Creates an idle poller
    ///
    /// # Arguments
    /// * `controller` - The cache controller to drive
    /// * `interval` - Delay between the end of one cycle and the start of the next
    pub fn new(controller: Arc<CacheController<F>>, interval: Duration) -> Self {
        Self {
            controller,
            interval,
            session: None,
            state: PollState::Idle,
        }
    }

    /// Current lifecycle state
    ///
    /// A session that stopped on its own (its receiver was dropped) reports
    /// `Cancelled`.
    pub fn state(&self) -> PollState {
        match (&self.session, self.state) {
            (Some(session), PollState::Running) if session.handle.is_finished() => {
                PollState::Cancelled
            }
            (_, state) => state,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == PollState::Running
    }

    /// Starts a new session, replacing any session already running
    ///
    /// Events are sent to `events` until the session is cancelled or the
    /// receiver is dropped.
    pub async fn start(&mut self, events: mpsc::Sender<PollEvent>) {
        self.cancel().await;

        let token = CancellationToken::new();
        let handle = tokio::spawn(run_session(
            Arc::clone(&self.controller),
            self.interval,
            token.clone(),
            events,
        ));

        self.session = Some(Session { token, handle });
        self.state = PollState::Running;
    }

    /// Stops the current session, if any
    ///
    /// An in-flight fetch is abandoned rather than awaited, so this returns
    /// as soon as the session task reaches its next suspension point.
    pub async fn cancel(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        session.token.cancel();
        if let Err(e) = session.handle.await {
            tracing::error!(error = %e, "poll session task failed");
        }
        self.state = PollState::Cancelled;
    }
}

impl<F> Drop for Poller<F> {
    fn drop(&mut self) {
        if let Some(session) = &self.session {
            session.token.cancel();
        }
    }
}

/// The loop body of one session
async fn run_session<F: Fetcher>(
    controller: Arc<CacheController<F>>,
    interval: Duration,
    token: CancellationToken,
    events: mpsc::Sender<PollEvent>,
) {
    tracing::info!(interval_ms = interval.as_millis() as u64, "poll session started");

    loop {
        if token.is_cancelled() {
            break;
        }

        let notify = events.clone();
        let cycle = controller.run_cycle_notify(move || {
            // Best effort: a full channel just skips the loading notice
            let _ = notify.try_send(PollEvent::Fetching);
        });

        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            outcome = cycle => outcome,
        };
        tracing::debug!(outcome = outcome.label(), "cycle finished");

        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            sent = events.send(PollEvent::Cycle(outcome)) => {
                if sent.is_err() {
                    tracing::debug!("presenter dropped its receiver");
                    break;
                }
            }
        }

        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    tracing::info!("poll session ended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ArtifactStore;
    use crate::config::WeatherConfig;
    use crate::data::fetcher::testing::ScriptedFetcher;
    use tempfile::TempDir;
    use tokio::time::timeout;

    const STEP: Duration = Duration::from_secs(2);

    fn create_poller(
        fetcher: ScriptedFetcher,
        interval: Duration,
    ) -> (Poller<ScriptedFetcher>, Arc<CacheController<ScriptedFetcher>>, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = ArtifactStore::with_dir(temp_dir.path().to_path_buf());
        let controller = Arc::new(CacheController::new(
            store,
            fetcher,
            WeatherConfig::default().resource_key(),
            Duration::from_secs(60),
        ));
        let poller = Poller::new(Arc::clone(&controller), interval);
        (poller, controller, temp_dir)
    }

    async fn next_event(rx: &mut mpsc::Receiver<PollEvent>) -> Option<PollEvent> {
        timeout(STEP, rx.recv()).await.expect("Timed out waiting for event")
    }

    #[tokio::test]
    async fn test_poller_starts_idle() {
        let (poller, _controller, _temp_dir) =
            create_poller(ScriptedFetcher::new(), Duration::from_millis(10));

        assert_eq!(poller.state(), PollState::Idle);
        assert!(!poller.is_running());
    }

    #[tokio::test]
    async fn test_poller_forwards_fetching_then_outcomes() {
        let fetcher = ScriptedFetcher::new();
        fetcher.push_ok(b"payload");
        let (mut poller, controller, _temp_dir) =
            create_poller(fetcher, Duration::from_millis(20));
        let (tx, mut rx) = mpsc::channel(8);

        poller.start(tx).await;
        assert_eq!(poller.state(), PollState::Running);

        assert!(matches!(next_event(&mut rx).await, Some(PollEvent::Fetching)));
        assert!(matches!(
            next_event(&mut rx).await,
            Some(PollEvent::Cycle(CycleOutcome::Refreshed(_)))
        ));
        // Second cycle finds the artifact fresh and does not fetch again
        assert!(matches!(
            next_event(&mut rx).await,
            Some(PollEvent::Cycle(CycleOutcome::UsedFresh(_)))
        ));

        poller.cancel().await;
        assert_eq!(poller.state(), PollState::Cancelled);
        assert_eq!(controller.fetcher().calls(), 1);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_interval_sleep() {
        let (mut poller, controller, _temp_dir) =
            create_poller(ScriptedFetcher::new(), Duration::from_secs(3600));
        let (tx, mut rx) = mpsc::channel(8);

        poller.start(tx).await;
        assert!(matches!(next_event(&mut rx).await, Some(PollEvent::Fetching)));
        assert!(matches!(
            next_event(&mut rx).await,
            Some(PollEvent::Cycle(CycleOutcome::Unavailable(_)))
        ));

        timeout(STEP, poller.cancel())
            .await
            .expect("Cancel should not wait out the interval");

        // The session dropped its sender without starting another cycle
        assert!(next_event(&mut rx).await.is_none());
        assert_eq!(controller.fetcher().calls(), 1);
    }

    #[tokio::test]
    async fn test_cancel_abandons_in_flight_fetch() {
        let fetcher = ScriptedFetcher::new().with_delay(Duration::from_secs(3600));
        let (mut poller, _controller, _temp_dir) =
            create_poller(fetcher, Duration::from_millis(10));
        let (tx, mut rx) = mpsc::channel(8);

        poller.start(tx).await;
        assert!(matches!(next_event(&mut rx).await, Some(PollEvent::Fetching)));

        timeout(STEP, poller.cancel())
            .await
            .expect("Cancel should not wait for the fetch");

        assert!(next_event(&mut rx).await.is_none());
        assert_eq!(poller.state(), PollState::Cancelled);
    }

    #[tokio::test]
    async fn test_restart_replaces_previous_session() {
        let fetcher = ScriptedFetcher::new().with_delay(Duration::from_secs(3600));
        let (mut poller, controller, _temp_dir) =
            create_poller(fetcher, Duration::from_millis(10));
        let (first_tx, mut first_rx) = mpsc::channel(8);
        let (second_tx, mut second_rx) = mpsc::channel(8);

        poller.start(first_tx).await;
        assert!(matches!(next_event(&mut first_rx).await, Some(PollEvent::Fetching)));

        timeout(STEP, poller.start(second_tx))
            .await
            .expect("Restart should not wait for the old fetch");

        // The first session is gone for good
        assert!(next_event(&mut first_rx).await.is_none());
        assert!(matches!(next_event(&mut second_rx).await, Some(PollEvent::Fetching)));
        assert_eq!(poller.state(), PollState::Running);
        assert_eq!(controller.fetcher().calls(), 2);

        poller.cancel().await;
    }

    #[tokio::test]
    async fn test_session_stops_when_receiver_dropped() {
        let (mut poller, _controller, _temp_dir) =
            create_poller(ScriptedFetcher::new(), Duration::from_millis(10));
        let (tx, rx) = mpsc::channel(8);
        drop(rx);

        poller.start(tx).await;

        timeout(STEP, async {
            while poller.is_running() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("Session should end on its own");
        assert_eq!(poller.state(), PollState::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_without_session_is_noop() {
        let (mut poller, _controller, _temp_dir) =
            create_poller(ScriptedFetcher::new(), Duration::from_millis(10));

        poller.cancel().await;

        assert_eq!(poller.state(), PollState::Idle);
    }
}

// launcher badge sync: desired vs acknowledged badge state, reconciled over a
// channel that is known to drop the first update after a cold start
//
// every send goes through one delivery task so updates leave in the order they
// were made. delayed resends capture a snapshot of the desired state and turn
// into no-ops if it changed before they fire.

use futures::future::BoxFuture;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum BadgeError {
    #[error("D-Bus error: {0}")]
    Bus(#[from] zbus::Error),
    #[error("Native badge error: {0}")]
    Native(String),
    #[error("No launcher channel available")]
    Unavailable,
}

/// One message to the launcher. `None` fields are left untouched by the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BadgeUpdate {
    pub visible: Option<bool>,
    pub count: Option<i64>,
}

impl BadgeUpdate {
    pub fn visibility(visible: bool) -> Self {
        Self {
            visible: Some(visible),
            count: None,
        }
    }

    pub fn count(count: i64) -> Self {
        Self {
            visible: None,
            count: Some(count),
        }
    }

    pub fn full(visible: bool, count: i64) -> Self {
        Self {
            visible: Some(visible),
            count: Some(count),
        }
    }
}

/// Transport for badge updates. Implementations only deliver; retry policy
/// lives in [`LauncherBadgeSync`].
pub trait BadgeChannel: Send + Sync {
    fn name(&self) -> &'static str;
    fn send(&self, update: BadgeUpdate) -> BoxFuture<'_, Result<(), BadgeError>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeTiming {
    pub burst: Vec<Duration>,
    pub reassert: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgePhase {
    Hidden,
    VisibleClean,
    VisibleStale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LauncherBadgeState {
    pub visible: bool,
    pub count: i64,
    pub last_acknowledged_visible: Option<bool>,
    pub last_acknowledged_count: Option<i64>,
}

impl LauncherBadgeState {
    pub fn phase(&self) -> BadgePhase {
        if !self.visible {
            return BadgePhase::Hidden;
        }
        let count_acked = self.last_acknowledged_count.unwrap_or_default() == self.count;
        if self.last_acknowledged_visible == Some(true) && count_acked {
            BadgePhase::VisibleClean
        } else {
            BadgePhase::VisibleStale
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            visible: self.visible,
            count: self.count,
        }
    }

    fn acknowledge(&mut self, update: BadgeUpdate) {
        if let Some(visible) = update.visible {
            self.last_acknowledged_visible = Some(visible);
        }
        if let Some(count) = update.count {
            self.last_acknowledged_count = Some(count);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Snapshot {
    visible: bool,
    count: i64,
}

type SharedState = Arc<Mutex<LauncherBadgeState>>;

fn lock(state: &SharedState) -> MutexGuard<'_, LauncherBadgeState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct LauncherBadgeSync {
    state: SharedState,
    outbox: mpsc::UnboundedSender<BadgeUpdate>,
    timing: BadgeTiming,
    runtime: Handle,
    channel_name: &'static str,
}

impl LauncherBadgeSync {
    /// Spawns the delivery task on `runtime`; timers are scheduled there too.
    pub fn new(channel: Arc<dyn BadgeChannel>, timing: BadgeTiming, runtime: Handle) -> Self {
        let state = SharedState::default();
        let (outbox, inbox) = mpsc::unbounded_channel();
        let channel_name = channel.name();

        runtime.spawn(deliver(channel, inbox, state.clone()));
        info!("[badge] using {} channel", channel_name);

        Self {
            state,
            outbox,
            timing,
            runtime,
            channel_name,
        }
    }

    pub fn channel_name(&self) -> &'static str {
        self.channel_name
    }

    pub fn state(&self) -> LauncherBadgeState {
        *lock(&self.state)
    }

    pub fn phase(&self) -> BadgePhase {
        lock(&self.state).phase()
    }

    /// launch state: hidden with a zero count, sent once
    pub fn reset(&self) {
        {
            let mut state = lock(&self.state);
            state.visible = false;
            state.count = 0;
        }
        self.enqueue(BadgeUpdate::full(false, 0));
    }

    pub fn set_visible(&self, visible: bool) {
        let (was_visible, snapshot) = {
            let mut state = lock(&self.state);
            let was_visible = state.visible;
            state.visible = visible;
            (was_visible, state.snapshot())
        };

        self.enqueue(BadgeUpdate::visibility(visible));
        if visible && !was_visible {
            self.schedule_burst(snapshot);
        }
    }

    /// A count on a hidden badge shows it first; shells ignore counts on hidden entries.
    pub fn set_count(&self, count: i64) {
        let (was_visible, snapshot) = {
            let mut state = lock(&self.state);
            let was_visible = state.visible;
            state.visible = true;
            state.count = count;
            (was_visible, state.snapshot())
        };

        if was_visible {
            self.enqueue(BadgeUpdate::count(count));
            self.schedule(self.timing.reassert, snapshot, BadgeUpdate::count(count));
        } else {
            self.enqueue(BadgeUpdate::visibility(true));
            self.enqueue(BadgeUpdate::count(count));
            self.schedule_burst(snapshot);
        }
    }

    fn enqueue(&self, update: BadgeUpdate) {
        post(&self.outbox, update);
    }

    fn schedule_burst(&self, snapshot: Snapshot) {
        let update = BadgeUpdate::full(snapshot.visible, snapshot.count);
        for delay in &self.timing.burst {
            self.schedule(*delay, snapshot, update);
        }
    }

    fn schedule(&self, delay: Duration, snapshot: Snapshot, update: BadgeUpdate) {
        let state = self.state.clone();
        let outbox = self.outbox.clone();

        self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;

            if lock(&state).snapshot() != snapshot {
                debug!("[badge] skipping stale resend {:?} after {:?}", update, delay);
                return;
            }
            post(&outbox, update);
        });
    }
}

fn post(outbox: &mpsc::UnboundedSender<BadgeUpdate>, update: BadgeUpdate) -> bool {
    let sent = outbox.send(update).is_ok();
    if !sent {
        warn!("[badge] delivery task gone, dropping {:?}", update);
    }
    sent
}

async fn deliver(
    channel: Arc<dyn BadgeChannel>,
    mut inbox: mpsc::UnboundedReceiver<BadgeUpdate>,
    state: SharedState,
) {
    while let Some(update) = inbox.recv().await {
        match channel.send(update).await {
            Ok(()) => {
                debug!("[badge] delivered {:?}", update);
                lock(&state).acknowledge(update);
            }
            Err(e) => warn!("[badge] {} send failed for {:?}: {}", channel.name(), update, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::time::{sleep, Instant};

    type Log = Arc<Mutex<Vec<(Duration, BadgeUpdate)>>>;

    struct Recorder {
        start: Instant,
        sent: Log,
        failing: AtomicBool,
    }

    impl BadgeChannel for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        fn send(&self, update: BadgeUpdate) -> BoxFuture<'_, Result<(), BadgeError>> {
            if self.failing.load(Ordering::SeqCst) {
                return Box::pin(async { Err(BadgeError::Unavailable) });
            }
            self.sent.lock().unwrap().push((self.start.elapsed(), update));
            Box::pin(async { Ok(()) })
        }
    }

    fn timing() -> BadgeTiming {
        BadgeTiming {
            burst: [80, 180, 480, 1200, 2200]
                .into_iter()
                .map(Duration::from_millis)
                .collect(),
            reassert: Duration::from_millis(1200),
        }
    }

    fn badge(failing: bool) -> (LauncherBadgeSync, Log) {
        let sent = Log::default();
        let recorder = Recorder {
            start: Instant::now(),
            sent: sent.clone(),
            failing: AtomicBool::new(failing),
        };
        let badge = LauncherBadgeSync::new(Arc::new(recorder), timing(), Handle::current());
        (badge, sent)
    }

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[tokio::test(start_paused = true)]
    async fn test_count_from_hidden_sends_visibility_then_count() {
        let (badge, sent) = badge(false);

        badge.set_count(5);
        sleep(ms(500)).await;
        badge.set_count(7);
        sleep(ms(3000)).await;

        let sent = sent.lock().unwrap().clone();
        let visibility: Vec<_> = sent
            .iter()
            .filter(|(_, u)| *u == BadgeUpdate::visibility(true))
            .collect();
        assert_eq!(visibility.len(), 1);

        let vis_at = sent.iter().position(|(_, u)| *u == BadgeUpdate::visibility(true));
        let count_at = sent.iter().position(|(_, u)| *u == BadgeUpdate::count(5));
        assert_eq!(sent.iter().filter(|(_, u)| *u == BadgeUpdate::count(5)).count(), 1);
        assert!(vis_at < count_at, "visibility must precede count: {sent:?}");

        // nothing carrying the superseded 5 after the 7 arrived
        assert!(sent
            .iter()
            .filter(|(at, _)| *at >= ms(500))
            .all(|(_, u)| u.count != Some(5)));

        // the 7 is reasserted once, 1.2s after it was set
        let sevens: Vec<_> = sent
            .iter()
            .filter(|(_, u)| *u == BadgeUpdate::count(7))
            .map(|(at, _)| *at)
            .collect();
        assert_eq!(sevens, vec![ms(500), ms(1700)]);

        assert_eq!(badge.phase(), BadgePhase::VisibleClean);
        assert_eq!(badge.state().last_acknowledged_count, Some(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_show_runs_confirmation_burst() {
        let (badge, sent) = badge(false);

        badge.set_visible(true);
        sleep(ms(3000)).await;

        let sent = sent.lock().unwrap().clone();
        let times: Vec<_> = sent.iter().map(|(at, _)| *at).collect();
        assert_eq!(times, vec![ms(0), ms(80), ms(180), ms(480), ms(1200), ms(2200)]);
        assert_eq!(sent[0].1, BadgeUpdate::visibility(true));
        assert!(sent[1..].iter().all(|(_, u)| *u == BadgeUpdate::full(true, 0)));
        assert_eq!(badge.phase(), BadgePhase::VisibleClean);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hide_makes_pending_burst_stale() {
        let (badge, sent) = badge(false);

        badge.set_visible(true);
        sleep(ms(100)).await;
        badge.set_visible(false);
        sleep(ms(3000)).await;

        let sent = sent.lock().unwrap().clone();
        assert_eq!(
            sent,
            vec![
                (ms(0), BadgeUpdate::visibility(true)),
                (ms(80), BadgeUpdate::full(true, 0)),
                (ms(100), BadgeUpdate::visibility(false)),
            ]
        );
        assert_eq!(badge.phase(), BadgePhase::Hidden);
    }

    #[tokio::test(start_paused = true)]
    async fn test_count_on_visible_badge_reasserts_once() {
        let (badge, sent) = badge(false);
        badge.set_visible(true);
        sleep(ms(3000)).await;
        sent.lock().unwrap().clear();

        badge.set_count(3);
        sleep(ms(2000)).await;

        let counts: Vec<_> = sent.lock().unwrap().iter().map(|(_, u)| *u).collect();
        assert_eq!(counts, vec![BadgeUpdate::count(3), BadgeUpdate::count(3)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_sends_are_swallowed() {
        let (badge, sent) = badge(true);

        badge.set_count(2);
        sleep(ms(3000)).await;

        assert!(sent.lock().unwrap().is_empty());
        let state = badge.state();
        assert!(state.visible);
        assert_eq!(state.count, 2);
        assert_eq!(state.last_acknowledged_visible, None);
        assert_eq!(badge.phase(), BadgePhase::VisibleStale);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_sends_hidden_once() {
        let (badge, sent) = badge(false);

        badge.reset();
        sleep(ms(3000)).await;

        let sent = sent.lock().unwrap().clone();
        assert_eq!(sent, vec![(ms(0), BadgeUpdate::full(false, 0))]);
        assert_eq!(badge.phase(), BadgePhase::Hidden);
    }

    #[test]
    fn test_post_after_delivery_task_is_gone() {
        let (outbox, inbox) = mpsc::unbounded_channel();
        assert!(post(&outbox, BadgeUpdate::count(3)));

        drop(inbox);
        assert!(!post(&outbox, BadgeUpdate::count(4)));
    }

    #[test]
    fn test_phase_from_state() {
        let mut state = LauncherBadgeState::default();
        assert_eq!(state.phase(), BadgePhase::Hidden);

        state.visible = true;
        state.count = 4;
        assert_eq!(state.phase(), BadgePhase::VisibleStale);

        state.acknowledge(BadgeUpdate::full(true, 4));
        assert_eq!(state.phase(), BadgePhase::VisibleClean);

        state.count = 5;
        assert_eq!(state.phase(), BadgePhase::VisibleStale);
    }
}

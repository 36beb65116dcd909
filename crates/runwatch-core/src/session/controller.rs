use futures_util::StreamExt;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::bytes::{Bytes, BytesMut};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::error::{Error, Result};
use crate::events::{Framing, LineDecoder, classify};
use crate::session::mode::RunMode;
use crate::session::outcome::{ResultRoute, SessionOutcome, Toast};
use crate::session::progress::{Effect, ProgressMachine};
use crate::session::steps::{Step, StepRegistry};
use crate::source::{FrameSource, FrameStream, TransportError};
use crate::types::SessionId;

pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(1);
pub const TRANSPORT_FAILURE_TOAST: &str = "Failed to run test";

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub mode: RunMode,
    pub registry: StepRegistry,
    pub framing: Framing,
    /// How long the finished panel stays up before navigating to the result.
    pub grace_period: Duration,
}

impl SessionOptions {
    pub fn new(mode: RunMode) -> Self {
        Self {
            mode,
            registry: StepRegistry::builtin(),
            framing: Framing::default(),
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }

    pub fn with_registry(mut self, registry: StepRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }
}

/// Immutable view of a session, published after every applied event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSnapshot {
    pub progress: u8,
    pub steps: Vec<Step>,
    pub log: Vec<String>,
    pub toast: Option<Toast>,
    pub loading: bool,
    pub panel_open: bool,
    pub outcome: Option<SessionOutcome>,
    pub navigate_to: Option<ResultRoute>,
}

impl RunSnapshot {
    /// Nothing further will be shown: a failure, or a success that has
    /// already navigated away.
    pub fn is_final(&self) -> bool {
        match &self.outcome {
            Some(SessionOutcome::Failed { .. }) => true,
            Some(SessionOutcome::Succeeded { .. }) => self.navigate_to.is_some(),
            None => false,
        }
    }
}

struct SessionState {
    machine: ProgressMachine,
    log: Vec<String>,
    toast: Option<Toast>,
    panel_open: bool,
    navigate_to: Option<ResultRoute>,
}

impl SessionState {
    fn new(options: &SessionOptions) -> Self {
        Self {
            machine: ProgressMachine::new(options.registry.clone(), options.mode.tick_budget()),
            log: Vec::new(),
            toast: None,
            panel_open: true,
            navigate_to: None,
        }
    }

    /// Classifies one line and applies it. Returns whether anything was
    /// applied, and the outcome if this line resolved the session.
    fn apply_line(&mut self, line: &str) -> (bool, Option<SessionOutcome>) {
        let Some(event) = classify(line) else {
            return (false, None);
        };
        if self.machine.is_resolved() {
            debug!(target: "runwatch::session", ?event, "draining after outcome");
            return (false, None);
        }

        let mut resolved = None;
        for effect in self.machine.apply(event) {
            match effect {
                Effect::AppendLog(text) => self.log.push(text),
                Effect::ShowToast(toast) => self.toast = Some(toast),
                Effect::Resolve(outcome) => resolved = Some(outcome),
            }
        }
        (true, resolved)
    }

    fn snapshot(&self) -> RunSnapshot {
        RunSnapshot {
            progress: self.machine.progress(),
            steps: self.machine.steps().to_vec(),
            log: self.log.clone(),
            toast: self.toast.clone(),
            loading: !self.machine.is_resolved(),
            panel_open: self.panel_open,
            outcome: self.machine.outcome().cloned(),
            navigate_to: self.navigate_to.clone(),
        }
    }
}

struct Publisher {
    tx: watch::Sender<RunSnapshot>,
}

impl Publisher {
    /// Skipped once every observer has gone away.
    fn publish(&self, state: &SessionState) {
        if self.tx.receiver_count() == 0 {
            return;
        }
        self.tx.send_replace(state.snapshot());
    }
}

/// One run, from opening the frame source to a single outcome.
pub struct RunSession<S> {
    id: SessionId,
    source: S,
    options: SessionOptions,
    cancel: CancellationToken,
}

impl<S> RunSession<S>
where
    S: FrameSource + 'static,
{
    pub fn new(source: S, options: SessionOptions) -> Self {
        Self {
            id: SessionId::new(),
            source,
            options,
            cancel: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Spawns the reader task and returns a handle to observe it.
    pub fn start(self) -> RunHandle {
        let state = SessionState::new(&self.options);
        let (tx, snapshots) = watch::channel(state.snapshot());
        let (outcome_tx, outcome) = oneshot::channel();
        let span = info_span!(
            "run_session",
            session_id = %self.id,
            mode = self.options.mode.name()
        );
        let id = self.id;
        let cancel = self.cancel.clone();

        let driver = SessionDriver {
            source: self.source,
            options: self.options,
            cancel: self.cancel,
            state,
            publisher: Publisher { tx },
            outcome_tx: Some(outcome_tx),
            pending_navigation: None,
        };
        let task = tokio::spawn(driver.run().instrument(span));

        RunHandle {
            id,
            snapshots,
            outcome,
            task,
            cancel,
        }
    }
}

struct SessionDriver<S> {
    source: S,
    options: SessionOptions,
    cancel: CancellationToken,
    state: SessionState,
    publisher: Publisher,
    outcome_tx: Option<oneshot::Sender<SessionOutcome>>,
    pending_navigation: Option<(Instant, ResultRoute)>,
}

impl<S: FrameSource> SessionDriver<S> {
    async fn run(mut self) {
        info!(target: "runwatch::session", "session started");

        let opened = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            opened = self.source.open() => Some(opened),
        };

        let mut decoder = LineDecoder::new(self.options.framing);
        let mut buf = BytesMut::new();
        let mut transport_error = None;

        match opened {
            Some(Ok(frames)) => {
                let fragments = self.read_frames(frames, &mut decoder, &mut buf).await;
                match fragments {
                    Ok(0) if !self.cancel.is_cancelled() => {
                        transport_error = Some(TransportError::NoStream);
                    }
                    Ok(count) => {
                        debug!(target: "runwatch::session", fragments = count, "stream ended");
                    }
                    Err(e) => transport_error = Some(e),
                }
            }
            Some(Err(e)) => transport_error = Some(e),
            None => debug!(target: "runwatch::session", "cancelled before the stream opened"),
        }

        while let Some(line) = decoder.decode_line_eof(&mut buf) {
            self.handle_line(&line);
        }

        if let Some(error) = transport_error {
            if self.state.machine.is_resolved() {
                debug!(target: "runwatch::session", %error, "transport error after outcome");
            } else {
                warn!(target: "runwatch::session", %error, "transport failure");
                self.state.toast = Some(Toast::error(format!("{TRANSPORT_FAILURE_TOAST}: {error}")));
            }
        }

        if let Some(outcome) = self.state.machine.finish_unterminated() {
            self.resolve(outcome);
        }
        self.publisher.publish(&self.state);

        if let Some((deadline, route)) = self.pending_navigation.take() {
            let cancelled = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => true,
                _ = tokio::time::sleep_until(deadline) => false,
            };
            if cancelled {
                debug!(target: "runwatch::session", "cancelled during grace period");
            } else {
                self.navigate(route);
            }
        }

        info!(target: "runwatch::session", "session finished");
    }

    /// Reads until the stream ends or the session is cancelled, returning
    /// the number of fragments seen.
    async fn read_frames(
        &mut self,
        mut frames: FrameStream,
        decoder: &mut LineDecoder,
        buf: &mut BytesMut,
    ) -> std::result::Result<usize, TransportError> {
        let mut fragments = 0usize;
        loop {
            let navigation_deadline = self.pending_navigation.as_ref().map(|(at, _)| *at);
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => ReadStep::Cancelled,
                _ = sleep_until_some(navigation_deadline), if navigation_deadline.is_some() => {
                    ReadStep::Navigate
                }
                next = frames.next() => ReadStep::Frame(next),
            };

            let next = match next {
                ReadStep::Cancelled => {
                    debug!(target: "runwatch::session", "cancelled while reading");
                    return Ok(fragments);
                }
                ReadStep::Navigate => {
                    if let Some((_, route)) = self.pending_navigation.take() {
                        self.navigate(route);
                    }
                    continue;
                }
                ReadStep::Frame(next) => next,
            };

            match next {
                Some(Ok(fragment)) => {
                    fragments += 1;
                    buf.extend_from_slice(&fragment);
                    while let Some(line) = decoder.decode_line(buf) {
                        self.handle_line(&line);
                    }
                }
                Some(Err(e)) => return Err(e),
                None => return Ok(fragments),
            }
        }
    }

    fn handle_line(&mut self, line: &str) {
        let (applied, resolved) = self.state.apply_line(line);
        if let Some(outcome) = resolved {
            self.resolve(outcome);
        }
        if applied {
            self.publisher.publish(&self.state);
        }
    }

    fn resolve(&mut self, outcome: SessionOutcome) {
        info!(target: "runwatch::session", %outcome, "session resolved");
        if let SessionOutcome::Succeeded { run_id } = &outcome {
            let route = ResultRoute {
                run_id: run_id.clone(),
            };
            self.pending_navigation = Some((Instant::now() + self.options.grace_period, route));
        }
        if let Some(tx) = self.outcome_tx.take() {
            // The handle may already be gone.
            let _ = tx.send(outcome);
        }
    }

    fn navigate(&mut self, route: ResultRoute) {
        debug!(target: "runwatch::session", route = %route, "navigating to result");
        self.state.panel_open = false;
        self.state.navigate_to = Some(route);
        self.publisher.publish(&self.state);
    }
}

enum ReadStep {
    Cancelled,
    Navigate,
    Frame(Option<std::result::Result<Bytes, TransportError>>),
}

async fn sleep_until_some(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Observer side of a running session. Dropping it (or calling
/// [`detach`](Self::detach)) leaves the session running to completion.
pub struct RunHandle {
    id: SessionId,
    snapshots: watch::Receiver<RunSnapshot>,
    outcome: oneshot::Receiver<SessionOutcome>,
    task: JoinHandle<()>,
    cancel: CancellationToken,
}

impl RunHandle {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn snapshots(&self) -> watch::Receiver<RunSnapshot> {
        self.snapshots.clone()
    }

    pub fn latest(&self) -> RunSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Ends the frame source; the session resolves as an unterminated run.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Waits for the session outcome. Returns as soon as the outcome is
    /// known, without waiting for the success grace period.
    pub async fn wait(self) -> Result<SessionOutcome> {
        self.outcome.await.map_err(|_| Error::SessionAborted)
    }

    /// Stops observing. Snapshot publication becomes a no-op once no other
    /// receivers remain.
    pub fn detach(self) -> JoinHandle<()> {
        self.task
    }
}

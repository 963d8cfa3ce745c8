//! Async facade owning the grid.
//!
//! Commands are validated immediately against the projected grid (live state
//! plus every accepted but not yet applied mutation). Accepted mutations are
//! queued on a single worker that waits out the highlight window, re-validates
//! against live state and applies them in issue order.

use std::{collections::BTreeMap, fmt, sync::Arc, time::Duration};

use shared::{
    domain::{GridPosition, ProgramId, SpanGroup},
    error::GridError,
    protocol::{
        CellSnapshot, ClosedProgramRecord, CommandId, CommandOutcome, FeedbackEvent,
        FeedbackLevel, HighlightTone, Layout, LayoutSummary,
    },
};
use tokio::{
    sync::{broadcast, mpsc, oneshot, Mutex},
    time::{sleep_until, Instant},
};
use tracing::{debug, info, warn};

use crate::{
    config::EngineConfig,
    feedback::{FeedbackBus, FeedbackSink},
    interpreter::{CommandInterpreter, Interpretation, LayoutRequest},
    persistence::{LayoutPersistence, LayoutStore},
    programs::ProgramCatalog,
    registry::{HeadlessHost, MountTracker, ProgramHost},
    span::{Mutation, SpanManager},
    workflows::{ReopenSession, ReorderSession},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutAction {
    Save,
    Load,
    Delete,
}

impl fmt::Display for LayoutAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LayoutAction::Save => "save",
            LayoutAction::Load => "load",
            LayoutAction::Delete => "delete",
        };
        f.write_str(label)
    }
}

/// Asks the operator for a layout name when a command did not carry one.
pub trait LayoutNamePrompt: Send + Sync {
    fn prompt(&self, action: LayoutAction) -> Option<String>;
}

struct EngineState {
    spans: SpanManager,
    projected: SpanManager,
    mounts: MountTracker,
    reorder: Option<ReorderSession>,
    reopen: Option<ReopenSession>,
}

struct PendingMutation {
    id: CommandId,
    due: Instant,
    mutation: Mutation,
    done: String,
}

enum QueueItem {
    Apply(PendingMutation),
    Flush(oneshot::Sender<()>),
}

pub struct GridEngine {
    state: Arc<Mutex<EngineState>>,
    queue: mpsc::UnboundedSender<QueueItem>,
    feedback: FeedbackBus,
    persistence: LayoutPersistence,
    interpreter: CommandInterpreter,
    config: EngineConfig,
    host: Arc<dyn ProgramHost>,
    prompt: Option<Arc<dyn LayoutNamePrompt>>,
}

impl GridEngine {
    /// Engine with the default catalog and no renderer. Must be called
    /// inside a tokio runtime.
    pub fn new(config: EngineConfig, store: Arc<dyn LayoutStore>) -> Arc<Self> {
        Self::new_with_dependencies(
            config,
            Arc::new(ProgramCatalog::default()),
            store,
            Arc::new(HeadlessHost),
            None,
            None,
        )
    }

    pub fn new_with_dependencies(
        config: EngineConfig,
        catalog: Arc<ProgramCatalog>,
        store: Arc<dyn LayoutStore>,
        host: Arc<dyn ProgramHost>,
        sink: Option<Arc<dyn FeedbackSink>>,
        prompt: Option<Arc<dyn LayoutNamePrompt>>,
    ) -> Arc<Self> {
        let mut feedback = FeedbackBus::new(&config);
        if let Some(sink) = sink {
            feedback = feedback.with_sink(sink);
        }
        let spans = SpanManager::new(Arc::clone(&catalog));
        let state = Arc::new(Mutex::new(EngineState {
            projected: spans.clone(),
            spans,
            mounts: MountTracker::new(),
            reorder: None,
            reopen: None,
        }));

        let (queue, receiver) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(
            receiver,
            Arc::clone(&state),
            feedback.clone(),
            Arc::clone(&host),
        ));

        Arc::new(Self {
            state,
            queue,
            feedback,
            persistence: LayoutPersistence::new(store),
            interpreter: CommandInterpreter::new(catalog),
            config,
            host,
            prompt,
        })
    }

    pub fn catalog(&self) -> &ProgramCatalog {
        self.interpreter.catalog()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FeedbackEvent> {
        self.feedback.subscribe()
    }

    /// Interprets one utterance.
    ///
    /// Grid commands return as soon as they are validated; the mutation
    /// itself lands after the configured action delay.
    pub async fn process_command(&self, text: &str) -> CommandOutcome {
        let id = CommandId::new();
        let interpretation = {
            let guard = self.state.lock().await;
            self.interpreter.interpret(text, &guard.projected)
        };

        match interpretation {
            Interpretation::Unmatched => {
                debug!(text, "command not recognised");
                CommandOutcome::unmatched()
            }
            Interpretation::Rejected { kind, error } => {
                self.reject(id, kind.as_str(), &[], error)
            }
            Interpretation::Grid(plan) => {
                match self
                    .submit(id, plan.mutation, plan.done, self.config.action_delay)
                    .await
                {
                    Ok(_) => {
                        info!(command = %id, kind = plan.kind.as_str(), "command accepted");
                        self.feedback.notify(Some(id), FeedbackLevel::Info, plan.pending.clone());
                        CommandOutcome::accepted(id, plan.pending)
                    }
                    Err((error, cells)) => self.reject(id, plan.kind.as_str(), &cells, error),
                }
            }
            Interpretation::Layout(request) => self.run_layout_request(id, request).await,
        }
    }

    /// Resolves once every mutation queued before this call has been applied.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.queue.send(QueueItem::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }

    pub async fn save_layout(&self, name: &str) -> Result<Layout, GridError> {
        self.flush().await;
        let grid = self.state.lock().await.spans.grid().clone();
        self.persistence.save(name, &grid).await
    }

    pub async fn load_layout(&self, name: &str) -> Result<Layout, GridError> {
        self.flush().await;
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let layout = self.persistence.load_by_name(name, &mut state.spans).await?;
        state.projected = state.spans.clone();
        reconcile_mounts(state, self.host.as_ref(), &self.feedback, None);
        Ok(layout)
    }

    pub async fn delete_layout(&self, name: &str) -> Result<(), GridError> {
        self.persistence.delete(name).await
    }

    pub async fn list_layouts(&self) -> Result<Vec<LayoutSummary>, GridError> {
        self.persistence.list().await
    }

    pub async fn reset_layouts(&self) -> Result<(), GridError> {
        self.persistence.reset().await
    }

    pub async fn snapshot(&self) -> BTreeMap<GridPosition, CellSnapshot> {
        self.state.lock().await.spans.grid().snapshot()
    }

    pub async fn groups(&self) -> Vec<SpanGroup> {
        self.state.lock().await.spans.groups()
    }

    pub async fn occupant_of(&self, position: GridPosition) -> Option<ProgramId> {
        self.state
            .lock()
            .await
            .spans
            .grid()
            .occupant_of(position)
            .cloned()
    }

    pub async fn closed_programs(&self) -> Vec<ClosedProgramRecord> {
        self.state.lock().await.spans.closed_programs().to_vec()
    }

    pub async fn begin_reorder(&self, source: GridPosition) -> Result<ReorderSession, GridError> {
        let mut guard = self.state.lock().await;
        let session = ReorderSession::begin(source, guard.projected.grid())?;
        debug!(%source, program = %session.program(), "reorder session started");
        guard.reorder = Some(session.clone());
        Ok(session)
    }

    pub async fn toggle_reorder_target(&self, target: GridPosition) -> Result<bool, GridError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let session = state.reorder.as_mut().ok_or(GridError::NoActiveSession)?;
        session.toggle_target(target, state.projected.grid())
    }

    pub async fn reorder_session(&self) -> Option<ReorderSession> {
        self.state.lock().await.reorder.clone()
    }

    /// Moves the selected program and ends the session.
    pub async fn confirm_reorder(&self) -> Result<Vec<GridPosition>, GridError> {
        let session = {
            let guard = self.state.lock().await;
            guard.reorder.clone().ok_or(GridError::NoActiveSession)?
        };
        let mutation = session.confirm()?;
        let name = self.catalog().display_name(session.program());
        let done = format!("{name} moved");
        let cells = self.submit_confirmed(mutation, done).await?;
        self.state.lock().await.reorder = None;
        Ok(cells)
    }

    pub async fn cancel_reorder(&self) {
        self.state.lock().await.reorder = None;
    }

    pub async fn begin_reopen(&self) -> Vec<ClosedProgramRecord> {
        let mut guard = self.state.lock().await;
        guard.reopen = Some(ReopenSession::new());
        guard.projected.closed_programs().to_vec()
    }

    pub async fn select_reopen_program(&self, program: &ProgramId) -> Result<(), GridError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let session = state.reopen.as_mut().ok_or(GridError::NoActiveSession)?;
        session.select_program(program, &state.projected)
    }

    pub async fn toggle_reopen_target(&self, target: GridPosition) -> Result<bool, GridError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let session = state.reopen.as_mut().ok_or(GridError::NoActiveSession)?;
        session.toggle_target(target, state.projected.grid())
    }

    pub async fn reopen_session(&self) -> Option<ReopenSession> {
        self.state.lock().await.reopen.clone()
    }

    pub async fn confirm_reopen(&self) -> Result<Vec<GridPosition>, GridError> {
        let session = {
            let guard = self.state.lock().await;
            guard.reopen.clone().ok_or(GridError::NoActiveSession)?
        };
        let mutation = session.confirm()?;
        let done = match session.selected_program() {
            Some(program) => format!("{} reopened", self.catalog().display_name(program)),
            None => "Program reopened".to_string(),
        };
        let cells = self.submit_confirmed(mutation, done).await?;
        self.state.lock().await.reopen = None;
        Ok(cells)
    }

    pub async fn cancel_reopen(&self) {
        self.state.lock().await.reopen = None;
    }

    /// Validates `mutation` on the projected grid and queues it.
    ///
    /// On rejection the error comes back with the cells worth flagging.
    async fn submit(
        &self,
        id: CommandId,
        mutation: Mutation,
        done: String,
        delay: Duration,
    ) -> Result<Vec<GridPosition>, (GridError, Vec<GridPosition>)> {
        let mut guard = self.state.lock().await;
        let mut probe = guard.projected.clone();
        let cells = probe
            .apply(&mutation)
            .map_err(|error| (error, mutation.highlight_positions()))?;
        guard.projected = probe;

        self.feedback
            .highlight(id, mutation.highlight_positions(), HighlightTone::Pending);
        let pending = PendingMutation {
            id,
            due: Instant::now() + delay,
            mutation,
            done,
        };
        if self.queue.send(QueueItem::Apply(pending)).is_err() {
            warn!(command = %id, "mutation worker is gone; dropping mutation");
            guard.projected = guard.spans.clone();
        }
        Ok(cells)
    }

    /// Workflow confirmations apply without the highlight window and are
    /// awaited.
    async fn submit_confirmed(
        &self,
        mutation: Mutation,
        done: String,
    ) -> Result<Vec<GridPosition>, GridError> {
        let id = CommandId::new();
        let kind = mutation.kind();
        match self.submit(id, mutation, done, Duration::ZERO).await {
            Ok(cells) => {
                self.flush().await;
                Ok(cells)
            }
            Err((error, cells)) => {
                self.reject(id, kind, &cells, error.clone());
                Err(error)
            }
        }
    }

    async fn run_layout_request(&self, id: CommandId, request: LayoutRequest) -> CommandOutcome {
        let result = match request {
            LayoutRequest::Save { name } => match self.layout_name(name, LayoutAction::Save) {
                Ok(name) => self
                    .save_layout(&name)
                    .await
                    .map(|layout| format!("Layout \"{}\" saved", layout.name)),
                Err(error) => Err(error),
            },
            LayoutRequest::Load { name } => match self.layout_name(name, LayoutAction::Load) {
                Ok(name) => self
                    .load_layout(&name)
                    .await
                    .map(|layout| format!("Layout \"{}\" loaded", layout.name)),
                Err(error) => Err(error),
            },
            LayoutRequest::Delete { name } => match self.layout_name(name, LayoutAction::Delete) {
                Ok(name) => self
                    .delete_layout(&name)
                    .await
                    .map(|()| format!("Layout \"{}\" deleted", name.trim())),
                Err(error) => Err(error),
            },
            LayoutRequest::List => self.list_layouts().await.map(|layouts| {
                if layouts.is_empty() {
                    "No saved layouts".to_string()
                } else {
                    let names: Vec<&str> = layouts.iter().map(|l| l.name.as_str()).collect();
                    format!("Saved layouts: {}", names.join(", "))
                }
            }),
        };

        match result {
            Ok(message) => {
                self.feedback
                    .notify(Some(id), FeedbackLevel::Success, message.clone());
                CommandOutcome::accepted(id, message)
            }
            Err(error) => self.reject(id, "layout", &[], error),
        }
    }

    fn layout_name(&self, name: Option<String>, action: LayoutAction) -> Result<String, GridError> {
        name.or_else(|| self.prompt.as_ref().and_then(|prompt| prompt.prompt(action)))
            .filter(|name| !name.trim().is_empty())
            .ok_or(GridError::LayoutNameRequired)
    }

    fn reject(
        &self,
        id: CommandId,
        kind: &str,
        cells: &[GridPosition],
        error: GridError,
    ) -> CommandOutcome {
        warn!(command = %id, kind, code = ?error.code(), %error, "command rejected");
        self.feedback
            .highlight(id, cells.to_vec(), HighlightTone::Error);
        self.feedback
            .notify(Some(id), FeedbackLevel::Error, error.to_string());
        CommandOutcome::rejected(id, &error)
    }
}

async fn run_worker(
    mut receiver: mpsc::UnboundedReceiver<QueueItem>,
    state: Arc<Mutex<EngineState>>,
    feedback: FeedbackBus,
    host: Arc<dyn ProgramHost>,
) {
    while let Some(item) = receiver.recv().await {
        match item {
            QueueItem::Flush(done) => {
                let _ = done.send(());
            }
            QueueItem::Apply(pending) => {
                sleep_until(pending.due).await;
                apply_pending(&state, &feedback, host.as_ref(), pending).await;
            }
        }
    }
    debug!("mutation worker stopped");
}

async fn apply_pending(
    state: &Mutex<EngineState>,
    feedback: &FeedbackBus,
    host: &dyn ProgramHost,
    pending: PendingMutation,
) {
    let PendingMutation {
        id, mutation, done, ..
    } = pending;
    let mut guard = state.lock().await;
    let state = &mut *guard;

    match state.spans.apply(&mutation) {
        Ok(cells) => {
            info!(command = %id, kind = mutation.kind(), cells = cells.len(), "mutation applied");
            feedback.highlight(id, cells, HighlightTone::Success);
            feedback.notify(Some(id), FeedbackLevel::Success, done);
            reconcile_mounts(state, host, feedback, Some(id));
        }
        Err(error) => {
            // Live state moved since validation; the projection is stale.
            warn!(command = %id, kind = mutation.kind(), %error, "deferred mutation no longer valid");
            state.projected = state.spans.clone();
            feedback.highlight(id, mutation.highlight_positions(), HighlightTone::Error);
            feedback.notify(Some(id), FeedbackLevel::Error, error.to_string());
        }
    }
}

fn reconcile_mounts(
    state: &mut EngineState,
    host: &dyn ProgramHost,
    feedback: &FeedbackBus,
    id: Option<CommandId>,
) {
    let groups = state.spans.groups();
    for program in state.mounts.reconcile(host, &groups) {
        let name = state.spans.catalog().display_name(&program);
        feedback.notify(
            id,
            FeedbackLevel::Warning,
            format!("{name} could not be displayed"),
        );
    }
}

#[cfg(test)]
#[path = "tests/engine_tests.rs"]
mod tests;

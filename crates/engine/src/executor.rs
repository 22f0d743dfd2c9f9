//! Simulated workflow execution.
//!
//! `WorkflowExecutor` is the central orchestrator:
//! 1. Takes a point-in-time copy of the workflow and computes its
//!    execution sequence.
//! 2. Walks the sequence one node at a time, dispatching each node to the
//!    simulator registered for its kind.
//! 3. Reports progress through an [`ExecutionHandler`]: start, running log,
//!    completion, completion log, in that order for every node.
//! 4. Skips the unchosen target of a Condition and every direct successor of
//!    a failed node. A failure never aborts the run and nothing is retried.
//!
//! The only suspension points are the step delay and the settle delay of
//! each iteration.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use nodes::builtin::DEFAULT_HTTP_SUCCESS_PROBABILITY;
use nodes::{ExecutionContext, NodeError, NodeKind, NodeRegistry, RandomSource, ThreadRandom};

use crate::dag::execution_sequence;
use crate::models::{Node, Workflow};
use crate::validation::validate;
use crate::EngineError;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tuning knobs for the executor.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutorConfig {
    /// Simulated work time of every node except Delay.
    pub step_delay: Duration,
    /// Pause after each node's completion events.
    pub settle_delay: Duration,
    /// Wall-clock length of one second of a Delay node's `duration`.
    pub delay_unit: Duration,
    /// Chance that a simulated HTTP request succeeds.
    pub http_success_probability: f64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            step_delay: Duration::from_millis(1000),
            settle_delay: Duration::from_millis(200),
            delay_unit: Duration::from_secs(1),
            http_success_probability: DEFAULT_HTTP_SUCCESS_PROBABILITY,
        }
    }
}

impl ExecutorConfig {
    /// No waiting at all; every other setting at its default.
    pub fn instant() -> Self {
        Self {
            step_delay: Duration::ZERO,
            settle_delay: Duration::ZERO,
            delay_unit: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Defaults overridden by environment variables:
    /// - `FLOWFORGE_STEP_DELAY_MS`
    /// - `FLOWFORGE_SETTLE_DELAY_MS`
    /// - `FLOWFORGE_DELAY_UNIT_MS`
    /// - `FLOWFORGE_HTTP_SUCCESS_PROBABILITY`
    ///
    /// Unparsable values, and probabilities outside `[0, 1]`, are logged and
    /// ignored.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let millis = |key: &str, fallback: Duration| {
            Duration::from_millis(env_or(key, fallback.as_millis() as u64))
        };

        Self {
            step_delay: millis("FLOWFORGE_STEP_DELAY_MS", defaults.step_delay),
            settle_delay: millis("FLOWFORGE_SETTLE_DELAY_MS", defaults.settle_delay),
            delay_unit: millis("FLOWFORGE_DELAY_UNIT_MS", defaults.delay_unit),
            http_success_probability: env_where(
                "FLOWFORGE_HTTP_SUCCESS_PROBABILITY",
                defaults.http_success_probability,
                |p: &f64| (0.0..=1.0).contains(p),
            ),
        }
    }
}

fn env_or<T: FromStr>(key: &str, fallback: T) -> T {
    env_where(key, fallback, |_| true)
}

/// Parsed value of `key` if it is set, parses and passes `accept`.
fn env_where<T: FromStr>(key: &str, fallback: T, accept: impl Fn(&T) -> bool) -> T {
    let Ok(raw) = std::env::var(key) else {
        return fallback;
    };
    match raw.trim().parse::<T>() {
        Ok(value) if accept(&value) => value,
        _ => {
            warn!("ignoring {key}={raw:?}: not a valid value");
            fallback
        }
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Status carried by a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSeverity {
    Running,
    Success,
    Error,
}

/// One line of the execution log.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub node_id: String,
    pub node_label: String,
    pub severity: LogSeverity,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl LogRecord {
    fn new(node: &Node, severity: LogSeverity, message: impl Into<String>) -> Self {
        Self {
            node_id: node.id.clone(),
            node_label: node.display_label().to_owned(),
            severity,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Callbacks a host receives while a run progresses.
///
/// All methods default to doing nothing.
pub trait ExecutionHandler {
    fn on_node_start(&mut self, _node_id: &str) {}
    fn on_node_complete(&mut self, _node_id: &str, _success: bool) {}
    fn on_log(&mut self, _record: LogRecord) {}
    fn on_finish(&mut self) {}
}

/// Everything an [`ExecutionHandler`] can observe, as a value.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionEvent {
    NodeStarted(String),
    NodeCompleted { node_id: String, success: bool },
    Log(LogRecord),
    Finished,
}

impl ExecutionEvent {
    /// Node the event belongs to; `None` for [`ExecutionEvent::Finished`].
    pub fn node_id(&self) -> Option<&str> {
        match self {
            Self::NodeStarted(id) => Some(id),
            Self::NodeCompleted { node_id, .. } => Some(node_id),
            Self::Log(record) => Some(&record.node_id),
            Self::Finished => None,
        }
    }
}

/// Handler that keeps every event in arrival order.
#[derive(Debug, Default, Clone)]
pub struct RecordingHandler {
    pub events: Vec<ExecutionEvent>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(node_id, success)` for every completion, in order.
    pub fn completions(&self) -> Vec<(String, bool)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ExecutionEvent::NodeCompleted { node_id, success } => Some((node_id.clone(), *success)),
                _ => None,
            })
            .collect()
    }

    pub fn logs(&self) -> impl Iterator<Item = &LogRecord> {
        self.events.iter().filter_map(|e| match e {
            ExecutionEvent::Log(record) => Some(record),
            _ => None,
        })
    }

    /// Every event that mentions `node_id`.
    pub fn events_for<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a ExecutionEvent> + 'a {
        self.events.iter().filter(move |e| e.node_id() == Some(node_id))
    }

    pub fn finish_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, ExecutionEvent::Finished))
            .count()
    }
}

impl ExecutionHandler for RecordingHandler {
    fn on_node_start(&mut self, node_id: &str) {
        self.events.push(ExecutionEvent::NodeStarted(node_id.to_owned()));
    }

    fn on_node_complete(&mut self, node_id: &str, success: bool) {
        self.events.push(ExecutionEvent::NodeCompleted {
            node_id: node_id.to_owned(),
            success,
        });
    }

    fn on_log(&mut self, record: LogRecord) {
        self.events.push(ExecutionEvent::Log(record));
    }

    fn on_finish(&mut self) {
        self.events.push(ExecutionEvent::Finished);
    }
}

// ---------------------------------------------------------------------------
// Output of a completed run
// ---------------------------------------------------------------------------

/// Where the executor is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Running,
    Finished,
}

/// What happened during one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub run_id: uuid::Uuid,
    /// The execution sequence the run walked.
    pub order: Vec<String>,
    /// Nodes that ran, in order (failed ones included).
    pub executed: Vec<String>,
    /// Nodes whose simulated outcome was a failure.
    pub failed: Vec<String>,
    /// Nodes passed over because of a branch decision or a failed parent.
    pub skipped: Vec<String>,
}

impl RunSummary {
    pub fn succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

// ---------------------------------------------------------------------------
// WorkflowExecutor
// ---------------------------------------------------------------------------

/// Runs workflows against a node registry.
///
/// `run` borrows the executor mutably, so one executor can never have two
/// runs in flight.
pub struct WorkflowExecutor {
    registry: NodeRegistry,
    config: ExecutorConfig,
    random: Arc<dyn RandomSource>,
    phase: RunPhase,
}

impl WorkflowExecutor {
    /// Executor with the built-in simulators and thread-local randomness.
    pub fn new(config: ExecutorConfig) -> Self {
        Self {
            registry: NodeRegistry::builtin(config.http_success_probability),
            config,
            random: Arc::new(ThreadRandom),
            phase: RunPhase::Idle,
        }
    }

    /// Replace the randomness source, e.g. with a seeded or fixed one.
    pub fn with_random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    /// Replace the simulator registry.
    pub fn with_registry(mut self, registry: NodeRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Validate first and only run a workflow free of errors.
    ///
    /// # Errors
    /// [`EngineError::NotRunnable`] carrying the report when validation
    /// found at least one error; the handler receives no events then.
    pub async fn run_validated<H>(
        &mut self,
        workflow: &Workflow,
        handler: &mut H,
    ) -> Result<RunSummary, EngineError>
    where
        H: ExecutionHandler + ?Sized,
    {
        let report = validate(&workflow.nodes, &workflow.edges);
        if !report.is_valid {
            warn!(errors = report.error_count(), "refusing to run an invalid workflow");
            return Err(EngineError::NotRunnable(report));
        }
        Ok(self.run(workflow, handler).await)
    }

    /// Run the workflow to completion.
    ///
    /// The caller is expected to have validated the workflow; a cyclic
    /// graph still terminates but its order is meaningless.
    #[instrument(skip_all, fields(nodes = workflow.nodes.len(), edges = workflow.edges.len()))]
    pub async fn run<H>(&mut self, workflow: &Workflow, handler: &mut H) -> RunSummary
    where
        H: ExecutionHandler + ?Sized,
    {
        self.phase = RunPhase::Running;

        // Point-in-time copy; the caller may keep editing its own graph.
        let snapshot = workflow.clone();
        let order = execution_sequence(&snapshot.nodes, &snapshot.edges);
        let node_map: HashMap<&str, &Node> = snapshot
            .nodes
            .iter()
            .map(|n| (n.id.as_str(), n))
            .collect();

        let ctx = ExecutionContext::new(Arc::clone(&self.random));
        info!(run_id = %ctx.run_id, "executing {} nodes in order: {:?}", order.len(), order);

        let mut skipped: HashSet<String> = HashSet::new();
        let mut summary = RunSummary {
            run_id: ctx.run_id,
            order: order.clone(),
            executed: Vec::new(),
            failed: Vec::new(),
            skipped: Vec::new(),
        };

        for node_id in &order {
            if skipped.contains(node_id) {
                debug!("skipping node '{}'", node_id);
                summary.skipped.push(node_id.clone());
                continue;
            }
            let Some(node) = node_map.get(node_id.as_str()).copied() else {
                warn!("edge target '{}' is not a node; ignoring it", node_id);
                continue;
            };

            handler.on_node_start(node_id);
            handler.on_log(LogRecord::new(
                node,
                LogSeverity::Running,
                format!("Executing {}...", node.display_label()),
            ));

            tokio::time::sleep(self.step_delay(node)).await;

            let outcome = match self.registry.get(node.kind) {
                Some(simulator) => simulator.execute(&node.data, &ctx).await,
                None => Err(NodeError::Unsupported(node.kind)),
            };
            let success = outcome.is_ok();

            handler.on_node_complete(node_id, success);
            let (severity, message) = match &outcome {
                Ok(result) => (LogSeverity::Success, result.message.clone()),
                Err(err) => (LogSeverity::Error, err.to_string()),
            };
            handler.on_log(LogRecord::new(node, severity, message));

            tokio::time::sleep(self.config.settle_delay).await;

            summary.executed.push(node_id.clone());

            match outcome {
                Ok(result) => {
                    info!("node '{}' succeeded", node_id);
                    if node.kind == NodeKind::Condition {
                        if let Some(branch) = result.branch {
                            // Shallow: only the first edge off the other branch.
                            if let Some(edge) = snapshot
                                .outgoing(node_id)
                                .find(|e| e.source_handle != Some(branch))
                            {
                                skipped.insert(edge.target.clone());
                            }
                        }
                    }
                }
                Err(err) => {
                    warn!("node '{}' failed: {}", node_id, err);
                    summary.failed.push(node_id.clone());
                    skipped.extend(snapshot.outgoing(node_id).map(|e| e.target.clone()));
                }
            }
        }

        self.phase = RunPhase::Finished;
        handler.on_finish();

        info!(
            executed = summary.executed.len(),
            failed = summary.failed.len(),
            skipped = summary.skipped.len(),
            "run {} finished",
            summary.run_id
        );
        summary
    }

    fn step_delay(&self, node: &Node) -> Duration {
        match node.kind {
            NodeKind::Delay => {
                let secs = self.config.delay_unit.as_secs_f64() * node.data.delay_seconds();
                Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
            }
            _ => self.config.step_delay,
        }
    }
}

impl std::fmt::Debug for WorkflowExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowExecutor")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

// ============================================================
// Unit tests
// ============================================================
#[cfg(test)]
mod tests {
    use super::*;

    // Every test owns its variable names so parallel tests never collide.

    #[test]
    fn env_or_reads_valid_values() {
        std::env::set_var("FLOWFORGE_TEST_ENV_OR_VALID", " 250 ");
        assert_eq!(env_or("FLOWFORGE_TEST_ENV_OR_VALID", 7u64), 250);
    }

    #[test]
    fn env_or_falls_back_on_garbage() {
        std::env::set_var("FLOWFORGE_TEST_ENV_OR_GARBAGE", "abc");
        assert_eq!(env_or("FLOWFORGE_TEST_ENV_OR_GARBAGE", 7u64), 7);
        assert_eq!(env_or("FLOWFORGE_TEST_ENV_OR_GARBAGE", 0.5f64), 0.5);
    }

    #[test]
    fn env_or_falls_back_when_unset() {
        std::env::remove_var("FLOWFORGE_TEST_ENV_OR_UNSET");
        assert_eq!(env_or("FLOWFORGE_TEST_ENV_OR_UNSET", 7u64), 7);
    }

    #[test]
    fn probability_outside_unit_interval_is_rejected() {
        let in_unit = |p: &f64| (0.0..=1.0).contains(p);
        for raw in ["NaN", "inf", "-0.1", "1.5"] {
            std::env::set_var("FLOWFORGE_TEST_ENV_WHERE_PROBABILITY", raw);
            assert_eq!(
                env_where("FLOWFORGE_TEST_ENV_WHERE_PROBABILITY", 0.8, in_unit),
                0.8,
                "{raw} should be rejected"
            );
        }
        std::env::set_var("FLOWFORGE_TEST_ENV_WHERE_PROBABILITY", "0.25");
        assert_eq!(
            env_where("FLOWFORGE_TEST_ENV_WHERE_PROBABILITY", 0.8, in_unit),
            0.25
        );
    }

    #[test]
    fn instant_config_keeps_default_probability() {
        let config = ExecutorConfig::instant();
        assert_eq!(config.step_delay, Duration::ZERO);
        assert_eq!(config.http_success_probability, DEFAULT_HTTP_SUCCESS_PROBABILITY);
    }
}

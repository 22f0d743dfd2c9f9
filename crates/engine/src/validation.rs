//! Workflow validation. Run this before executing a workflow.
//!
//! Every rule is evaluated on every call, so one report lists all problems
//! at once. Findings come back as [`Issue`]s rather than `Err`: a graph with
//! problems is still a perfectly good value to edit.
//!
//! | Rule | Finding | Severity |
//! |---|---|---|
//! | [`Rule::MissingTrigger`] | no Trigger node | error |
//! | [`Rule::MultipleTriggers`] | more than one Trigger node | warning |
//! | [`Rule::Cycle`] | graph has a cycle | error |
//! | [`Rule::BlankLabel`] | node label empty or whitespace | warning |
//! | [`Rule::MissingUrl`] | HttpRequest node without a URL | error |
//! | [`Rule::InvalidDuration`] | Delay node duration unset or ≤ 0 | error |
//! | [`Rule::MissingBranch`] | Condition lacks a yes or no edge | error |
//! | [`Rule::Disconnected`] | node with no edge at all (graphs of 2+ nodes) | warning |
//! | [`Rule::UnknownNodeReference`] | edge endpoint is not a node | error |
//! | [`Rule::DuplicateNodeId`] | two nodes share an id | error |
//! | [`Rule::DuplicateBranch`] | Condition has two edges on one handle | error |

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;
use tracing::debug;

use nodes::{Branch, NodeKind};

use crate::dag::detect_cycle;
use crate::models::{Edge, Node};

// ---------------------------------------------------------------------------
// Issue
// ---------------------------------------------------------------------------

/// How serious a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks a run.
    Error,
    /// Reported, never blocks.
    Warning,
}

/// Which check produced a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    MissingTrigger,
    MultipleTriggers,
    Cycle,
    BlankLabel,
    MissingUrl,
    InvalidDuration,
    MissingBranch,
    Disconnected,
    UnknownNodeReference,
    DuplicateNodeId,
    DuplicateBranch,
}

impl Rule {
    pub fn severity(self) -> Severity {
        match self {
            Self::MultipleTriggers | Self::BlankLabel | Self::Disconnected => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub severity: Severity,
    pub rule: Rule,
    /// Node the finding is about, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    pub message: String,
}

impl Issue {
    fn new(rule: Rule, node_id: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            severity: rule.severity(),
            rule,
            node_id: node_id.map(str::to_owned),
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{tag}: {}", self.message)
    }
}

// ---------------------------------------------------------------------------
// ValidationReport
// ---------------------------------------------------------------------------

/// Everything [`validate`] found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    /// `true` iff no issue has [`Severity::Error`].
    pub is_valid: bool,
    pub issues: Vec<Issue>,
}

impl ValidationReport {
    fn from_issues(issues: Vec<Issue>) -> Self {
        Self {
            is_valid: !issues.iter().any(Issue::is_error),
            issues,
        }
    }

    pub fn errors(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    /// Findings produced by `rule`.
    pub fn by_rule(&self, rule: Rule) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(move |i| i.rule == rule)
    }
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

/// Check a graph against every rule and collect the findings.
pub fn validate(nodes: &[Node], edges: &[Edge]) -> ValidationReport {
    let mut issues = Vec::new();

    check_triggers(nodes, &mut issues);
    check_references(nodes, edges, &mut issues);

    if detect_cycle(nodes, edges) {
        issues.push(Issue::new(
            Rule::Cycle,
            None,
            "Workflow contains a cyclic dependency (infinite loop detected)",
        ));
    }

    for node in nodes {
        check_fields(node, &mut issues);
        if node.kind == NodeKind::Condition {
            check_branches(node, edges, &mut issues);
        }
    }

    check_connectivity(nodes, edges, &mut issues);

    let report = ValidationReport::from_issues(issues);
    debug!(
        errors = report.error_count(),
        warnings = report.warning_count(),
        "validated workflow with {} nodes and {} edges",
        nodes.len(),
        edges.len()
    );
    report
}

fn check_triggers(nodes: &[Node], issues: &mut Vec<Issue>) {
    let triggers = nodes.iter().filter(|n| n.kind == NodeKind::Trigger).count();

    if triggers == 0 {
        issues.push(Issue::new(
            Rule::MissingTrigger,
            None,
            "Workflow must have at least one Trigger node",
        ));
    } else if triggers > 1 {
        // Every trigger-rooted path runs; see `execution_sequence`.
        issues.push(Issue::new(
            Rule::MultipleTriggers,
            None,
            format!(
                "Multiple Trigger nodes found ({triggers}). Each one will start its own path in the same run."
            ),
        ));
    }
}

fn check_references(nodes: &[Node], edges: &[Edge], issues: &mut Vec<Issue>) {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut reported: HashSet<&str> = HashSet::new();
    for node in nodes {
        if !seen.insert(node.id.as_str()) && reported.insert(node.id.as_str()) {
            issues.push(Issue::new(
                Rule::DuplicateNodeId,
                Some(&node.id),
                format!("Node id \"{}\" is used by more than one node", node.id),
            ));
        }
    }

    for edge in edges {
        for (side, id) in [("source", &edge.source), ("target", &edge.target)] {
            if !seen.contains(id.as_str()) {
                issues.push(Issue::new(
                    Rule::UnknownNodeReference,
                    None,
                    format!("Edge \"{}\" references unknown {side} node \"{id}\"", edge.id),
                ));
            }
        }
    }
}

fn check_fields(node: &Node, issues: &mut Vec<Issue>) {
    let id = Some(node.id.as_str());
    let name = node.data.label_or("unnamed");

    if node.data.has_blank_label() {
        issues.push(Issue::new(
            Rule::BlankLabel,
            id,
            format!("A {} node has no label set", node.kind),
        ));
    }

    match node.kind {
        NodeKind::HttpRequest => {
            let missing = node.data.url.as_deref().map_or(true, |u| u.trim().is_empty());
            if missing {
                issues.push(Issue::new(
                    Rule::MissingUrl,
                    id,
                    format!("HTTP Request node \"{name}\" is missing a URL"),
                ));
            }
        }
        NodeKind::Delay => {
            let valid = node.data.duration.is_some_and(|d| d.is_finite() && d > 0.0);
            if !valid {
                issues.push(Issue::new(
                    Rule::InvalidDuration,
                    id,
                    format!("Delay node \"{name}\" has invalid duration"),
                ));
            }
        }
        _ => {}
    }
}

fn check_branches(node: &Node, edges: &[Edge], issues: &mut Vec<Issue>) {
    let id = Some(node.id.as_str());
    let name = node.data.label_or("unnamed");
    let handles: Vec<Option<Branch>> = edges
        .iter()
        .filter(|e| e.source == node.id)
        .map(|e| e.source_handle)
        .collect();

    let count = |branch: Branch| handles.iter().filter(|h| **h == Some(branch)).count();
    let (yes, no) = (count(Branch::Yes), count(Branch::No));

    if yes == 0 || no == 0 {
        issues.push(Issue::new(
            Rule::MissingBranch,
            id,
            format!("Condition node \"{name}\" must have both Yes and No branches connected"),
        ));
    }

    for (branch, n) in [(Branch::Yes, yes), (Branch::No, no)] {
        if n > 1 {
            issues.push(Issue::new(
                Rule::DuplicateBranch,
                id,
                format!("Condition node \"{name}\" has {n} edges on its {branch} branch; only one is allowed"),
            ));
        }
    }
}

fn check_connectivity(nodes: &[Node], edges: &[Edge], issues: &mut Vec<Issue>) {
    if nodes.len() <= 1 {
        return;
    }

    let connected: HashSet<&str> = edges
        .iter()
        .flat_map(|e| [e.source.as_str(), e.target.as_str()])
        .collect();

    for node in nodes.iter().filter(|n| !connected.contains(n.id.as_str())) {
        issues.push(Issue::new(
            Rule::Disconnected,
            Some(&node.id),
            format!(
                "Node \"{}\" is not connected to any other node",
                node.display_label()
            ),
        ));
    }
}

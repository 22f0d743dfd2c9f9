//! The closed set of step kinds a workflow can contain.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What a node does when the workflow runs.
///
/// Serialised with the same names the document format uses
/// (`"trigger"`, `"httpRequest"`, …).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    /// Entry point of a workflow.
    Trigger,
    /// A generic unit of work.
    Action,
    /// Two-way branch selected by the node's test value.
    Condition,
    /// Waits for a configured number of seconds.
    Delay,
    /// An outgoing HTTP call (simulated).
    HttpRequest,
    /// Terminal step.
    End,
}

impl NodeKind {
    /// Every kind, in palette order.
    pub const ALL: [NodeKind; 6] = [
        NodeKind::Trigger,
        NodeKind::Action,
        NodeKind::Condition,
        NodeKind::Delay,
        NodeKind::HttpRequest,
        NodeKind::End,
    ];

    /// Wire name, identical to the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trigger => "trigger",
            Self::Action => "action",
            Self::Condition => "condition",
            Self::Delay => "delay",
            Self::HttpRequest => "httpRequest",
            Self::End => "end",
        }
    }

    /// Human-readable name, also the default label of a fresh node.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Trigger => "Trigger",
            Self::Action => "Action",
            Self::Condition => "Condition",
            Self::Delay => "Delay",
            Self::HttpRequest => "HTTP Request",
            Self::End => "End",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown node kind: {s}"))
    }
}

/// Branch handle on a Condition node's outgoing edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Branch {
    Yes,
    No,
}

impl Branch {
    /// Wire name, identical to the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
        }
    }

    /// The branch not taken.
    pub fn other(self) -> Branch {
        match self {
            Self::Yes => Self::No,
            Self::No => Self::Yes,
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yes => write!(f, "Yes"),
            Self::No => write!(f, "No"),
        }
    }
}

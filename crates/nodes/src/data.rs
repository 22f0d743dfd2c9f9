//! The kind-specific record carried by every node.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::NodeKind;

/// Editable fields of a node.
///
/// One flat record covers every kind; a field that does not apply to a
/// node's kind is simply left unset. Fields this crate does not know about
/// are kept in `extra` so a document survives an import/export round trip
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    /// Display label, shared by all kinds.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub label: String,

    /// Free text for Action nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Target URL for HttpRequest nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// HTTP verb for HttpRequest nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Wait time in seconds for Delay nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,

    /// Human-readable condition for Condition nodes. Never evaluated.
    #[serde(
        default,
        alias = "conditionLabel",
        skip_serializing_if = "Option::is_none"
    )]
    pub condition_expression: Option<String>,

    /// `"false"` sends a Condition node down its `no` branch; anything else
    /// takes `yes`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_value: Option<String>,

    /// How a Trigger node is started (informational).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_type: Option<String>,

    /// Unrecognised fields, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NodeData {
    /// The data a freshly placed node of `kind` starts with.
    pub fn defaults_for(kind: NodeKind) -> Self {
        let mut data = NodeData {
            label: kind.display_name().to_owned(),
            ..NodeData::default()
        };
        match kind {
            NodeKind::Trigger => data.trigger_type = Some("manual".into()),
            NodeKind::Action => data.description = Some(String::new()),
            NodeKind::Condition => {
                data.condition_expression = Some(String::new());
                data.test_value = Some("true".into());
            }
            NodeKind::Delay => data.duration = Some(2.0),
            NodeKind::HttpRequest => {
                data.url = Some(String::new());
                data.method = Some("GET".into());
            }
            NodeKind::End => {}
        }
        data
    }

    /// `true` when the label is empty or whitespace only.
    pub fn has_blank_label(&self) -> bool {
        self.label.trim().is_empty()
    }

    /// Seconds a Delay node waits; one second when unset or not positive.
    pub fn delay_seconds(&self) -> f64 {
        self.duration
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .unwrap_or(1.0)
    }

    /// The label, or `fallback` when it is blank.
    pub fn label_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        if self.label.is_empty() {
            fallback
        } else {
            &self.label
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

//! Document lifecycle stages and the valid-transition table.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Lifecycle stage of an object in the store.
///
/// Source documents move through `Raw -> Processing -> Processed` (or
/// `Failed`); derived output versions move through
/// `Draft -> Final -> Archived`. The stage recorded in object tags is the
/// sole source of truth for where an object sits in its pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Source document as ingested, not yet picked up.
    Raw,
    /// Source document currently being processed by a worker.
    Processing,
    /// Source document whose processing completed successfully.
    Processed,
    /// Source document whose processing failed.
    Failed,
    /// Output version produced but not yet reviewed.
    Draft,
    /// Output version approved by review.
    Final,
    /// Output version superseded by a newer approval.
    Archived,
}

/// A single edge in the lifecycle graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRule {
    pub from: Stage,
    pub to: Stage,
    /// Human-readable reason this edge exists, surfaced in audit output.
    pub description: &'static str,
    /// Whether the edge represents a human approval decision.
    pub requires_approval: bool,
}

static VALID_TRANSITIONS: Lazy<Vec<TransitionRule>> = Lazy::new(|| {
    vec![
        TransitionRule {
            from: Stage::Raw,
            to: Stage::Processing,
            description: "worker picked up the document",
            requires_approval: false,
        },
        TransitionRule {
            from: Stage::Processing,
            to: Stage::Processed,
            description: "processing completed",
            requires_approval: false,
        },
        TransitionRule {
            from: Stage::Processing,
            to: Stage::Failed,
            description: "processing failed",
            requires_approval: false,
        },
        TransitionRule {
            from: Stage::Failed,
            to: Stage::Raw,
            description: "reset for a fresh ingestion attempt",
            requires_approval: false,
        },
        TransitionRule {
            from: Stage::Failed,
            to: Stage::Processing,
            description: "direct retry after failure",
            requires_approval: false,
        },
        TransitionRule {
            from: Stage::Processed,
            to: Stage::Raw,
            description: "full reprocessing requested",
            requires_approval: false,
        },
        TransitionRule {
            from: Stage::Draft,
            to: Stage::Final,
            description: "version approved",
            requires_approval: true,
        },
        TransitionRule {
            from: Stage::Final,
            to: Stage::Archived,
            description: "superseded by a newer approved version",
            requires_approval: false,
        },
        TransitionRule {
            from: Stage::Archived,
            to: Stage::Final,
            description: "archived version restored",
            requires_approval: true,
        },
    ]
});

impl Stage {
    /// All stages, in pipeline order.
    pub const ALL: [Stage; 7] = [
        Stage::Raw,
        Stage::Processing,
        Stage::Processed,
        Stage::Failed,
        Stage::Draft,
        Stage::Final,
        Stage::Archived,
    ];

    /// The lowercase wire form persisted in object tags.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Raw => "raw",
            Stage::Processing => "processing",
            Stage::Processed => "processed",
            Stage::Failed => "failed",
            Stage::Draft => "draft",
            Stage::Final => "final",
            Stage::Archived => "archived",
        }
    }

    /// Whether the lifecycle graph permits moving from this stage to `to`.
    pub fn can_transition_to(&self, to: Stage) -> bool {
        VALID_TRANSITIONS
            .iter()
            .any(|rule| rule.from == *self && rule.to == to)
    }

    /// The rules whose source is this stage.
    pub fn valid_transitions(&self) -> Vec<TransitionRule> {
        VALID_TRANSITIONS
            .iter()
            .filter(|rule| rule.from == *self)
            .copied()
            .collect()
    }

    /// Whether moving from this stage to `to` records an approval decision.
    pub fn requires_approval(&self, to: Stage) -> bool {
        VALID_TRANSITIONS
            .iter()
            .any(|rule| rule.from == *self && rule.to == to && rule.requires_approval)
    }

    /// Whether no edges leave this stage.
    pub fn is_terminal(&self) -> bool {
        !VALID_TRANSITIONS.iter().any(|rule| rule.from == *self)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = UnknownStage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw" => Ok(Stage::Raw),
            "processing" => Ok(Stage::Processing),
            "processed" => Ok(Stage::Processed),
            "failed" => Ok(Stage::Failed),
            "draft" => Ok(Stage::Draft),
            "final" => Ok(Stage::Final),
            "archived" => Ok(Stage::Archived),
            other => Err(UnknownStage {
                value: other.to_string(),
            }),
        }
    }
}

/// Error returned when parsing an unrecognized stage tag value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown stage: {value}")]
pub struct UnknownStage {
    pub value: String,
}

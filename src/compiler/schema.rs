//! The flow-language document emitted by lowering.
//!
//! Field names and discriminator strings are fixed by the platform. Parameter
//! maps are `BTreeMap`s so serialized output is byte-stable.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const FLOW_LANGUAGE_VERSION: &str = "2019-10-30";

pub mod action_type {
    pub const MESSAGE: &str = "MessageParticipant";
    pub const SPEECH_INPUT: &str = "ConnectParticipantWithLexBot";
    pub const KEYPAD_INPUT: &str = "GetParticipantInput";
    pub const INVOKE_FUNCTION: &str = "InvokeLambdaFunction";
    pub const UPDATE_ATTRIBUTES: &str = "UpdateContactAttributes";
    pub const COMPARE: &str = "Compare";
    pub const TRANSFER_TO_QUEUE: &str = "TransferContactToQueue";
    pub const TRANSFER_TO_FLOW: &str = "TransferToFlow";
    pub const DISCONNECT: &str = "DisconnectParticipant";
    pub const WAIT: &str = "Wait";
    pub const LOOP: &str = "Loop";
}

pub mod error_type {
    pub const NO_MATCHING_CONDITION: &str = "NoMatchingCondition";
    pub const NO_MATCHING_ERROR: &str = "NoMatchingError";
    pub const INPUT_TIMEOUT: &str = "InputTimeLimitExceeded";
    pub const QUEUE_AT_CAPACITY: &str = "QueueAtCapacity";
    pub const LOW_CONFIDENCE: &str = "LowConfidence";
    pub const MAX_RETRIES_EXCEEDED: &str = "MaxRetriesExceeded";
}

pub const LOOP_CONTINUE: &str = "ContinueLooping";
pub const LOOP_DONE: &str = "DoneLooping";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FlowDocument {
    pub version: String,
    pub start_action: String,
    pub actions: Vec<ActionRecord>,
}

impl FlowDocument {
    pub fn action(&self, identifier: &str) -> Option<&ActionRecord> {
        self.actions.iter().find(|a| a.identifier == identifier)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ActionRecord {
    pub identifier: String,
    #[serde(rename = "Type")]
    pub action_type: String,
    pub parameters: BTreeMap<String, Value>,
    pub transitions: ActionTransitions,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ActionTransitions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_action: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<ConditionRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ErrorRecord>,
}

impl ActionTransitions {
    /// Every target this record points at, in emission order.
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.next_action
            .as_deref()
            .into_iter()
            .chain(self.conditions.iter().map(|c| c.next_action.as_str()))
            .chain(self.errors.iter().map(|e| e.next_action.as_str()))
    }

    pub fn error_target(&self, error_type: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.error_type == error_type)
            .map(|e| e.next_action.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConditionRecord {
    pub next_action: String,
    pub condition: ConditionExpression,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConditionExpression {
    pub operator: String,
    pub operands: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorRecord {
    pub next_action: String,
    pub error_type: String,
}

use super::NodeKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The platform's flow types. Each one admits a different set of actions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowType {
    #[default]
    ContactFlow,
    CustomerQueue,
    CustomerHold,
    CustomerWhisper,
    AgentWhisper,
    OutboundWhisper,
    AgentTransfer,
    QueueTransfer,
}

impl FlowType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowType::ContactFlow => "CONTACT_FLOW",
            FlowType::CustomerQueue => "CUSTOMER_QUEUE",
            FlowType::CustomerHold => "CUSTOMER_HOLD",
            FlowType::CustomerWhisper => "CUSTOMER_WHISPER",
            FlowType::AgentWhisper => "AGENT_WHISPER",
            FlowType::OutboundWhisper => "OUTBOUND_WHISPER",
            FlowType::AgentTransfer => "AGENT_TRANSFER",
            FlowType::QueueTransfer => "QUEUE_TRANSFER",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        let normalized = name.replace(['-', ' '], "_").to_ascii_uppercase();
        let flow_type = match normalized.as_str() {
            "CONTACT_FLOW" | "CONTACTFLOW" => FlowType::ContactFlow,
            "CUSTOMER_QUEUE" | "CUSTOMERQUEUE" => FlowType::CustomerQueue,
            "CUSTOMER_HOLD" | "CUSTOMERHOLD" => FlowType::CustomerHold,
            "CUSTOMER_WHISPER" | "CUSTOMERWHISPER" => FlowType::CustomerWhisper,
            "AGENT_WHISPER" | "AGENTWHISPER" => FlowType::AgentWhisper,
            "OUTBOUND_WHISPER" | "OUTBOUNDWHISPER" => FlowType::OutboundWhisper,
            "AGENT_TRANSFER" | "AGENTTRANSFER" => FlowType::AgentTransfer,
            "QUEUE_TRANSFER" | "QUEUETRANSFER" => FlowType::QueueTransfer,
            _ => return None,
        };
        Some(flow_type)
    }

    /// Whether the platform accepts this action kind in flows of this type.
    pub fn supports(&self, kind: &NodeKind) -> bool {
        let whisper = matches!(
            self,
            FlowType::CustomerWhisper | FlowType::AgentWhisper | FlowType::OutboundWhisper
        );
        match kind {
            NodeKind::Message { .. }
            | NodeKind::SetAttributes { .. }
            | NodeKind::Branch { .. }
            | NodeKind::InvokeExternal(_)
            | NodeKind::Disconnect
            | NodeKind::Loop { .. } => true,
            NodeKind::CollectInput { .. } => {
                matches!(self, FlowType::ContactFlow | FlowType::CustomerQueue)
            }
            NodeKind::TransferToQueue { .. } => matches!(
                self,
                FlowType::ContactFlow | FlowType::AgentTransfer | FlowType::QueueTransfer
            ),
            NodeKind::TransferToFlow { .. } => !whisper && *self != FlowType::CustomerHold,
            NodeKind::Wait { .. } => matches!(
                self,
                FlowType::ContactFlow | FlowType::CustomerQueue | FlowType::CustomerHold
            ),
        }
    }
}

impl fmt::Display for FlowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

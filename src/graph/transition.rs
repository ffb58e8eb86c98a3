use serde::{Deserialize, Serialize};
use std::fmt;

/// Comparison operators understood by the platform's `Compare` action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Equals,
    NumberGreaterThan,
    NumberLessThan,
    NumberGreaterOrEqualTo,
    NumberLessOrEqualTo,
    TextStartsWith,
    TextEndsWith,
    TextContains,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equals => "Equals",
            Operator::NumberGreaterThan => "NumberGreaterThan",
            Operator::NumberLessThan => "NumberLessThan",
            Operator::NumberGreaterOrEqualTo => "NumberGreaterOrEqualTo",
            Operator::NumberLessOrEqualTo => "NumberLessOrEqualTo",
            Operator::TextStartsWith => "TextStartsWith",
            Operator::TextEndsWith => "TextEndsWith",
            Operator::TextContains => "TextContains",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        let op = match name {
            "Equals" => Operator::Equals,
            "NumberGreaterThan" => Operator::NumberGreaterThan,
            "NumberLessThan" => Operator::NumberLessThan,
            "NumberGreaterOrEqualTo" => Operator::NumberGreaterOrEqualTo,
            "NumberLessOrEqualTo" => Operator::NumberLessOrEqualTo,
            "TextStartsWith" => Operator::TextStartsWith,
            "TextEndsWith" => Operator::TextEndsWith,
            "TextContains" => Operator::TextContains,
            _ => return None,
        };
        Some(op)
    }
}

/// A single branch condition: `<subject> <operator> <value>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Comparison {
    pub operator: Operator,
    pub value: String,
}

impl Comparison {
    pub fn new(operator: Operator, value: impl Into<String>) -> Self {
        Self {
            operator,
            value: value.into(),
        }
    }

    pub fn equals(value: impl Into<String>) -> Self {
        Self::new(Operator::Equals, value)
    }
}

/// The outcome key of a transition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Discriminator {
    /// Normal completion of the action.
    Next,
    /// The action failed.
    Error,
    /// The caller gave no input in time.
    Timeout,
    /// No route or case matched.
    Default,
    /// A speech result came back below the confidence threshold.
    LowConfidence,
    /// The speech stage ran out of reprompts.
    MaxRetriesExceeded,
    /// The target queue refused the contact.
    QueueAtCapacity,
    Intent(String),
    Digits(String),
    Condition(Comparison),
    LoopContinue,
    LoopDone,
}

impl Discriminator {
    /// Discriminators that select a route in a routing table.
    pub fn is_route(&self) -> bool {
        matches!(
            self,
            Discriminator::Intent(_) | Discriminator::Digits(_) | Discriminator::Condition(_)
        )
    }
}

impl fmt::Display for Discriminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discriminator::Next => write!(f, "Next"),
            Discriminator::Error => write!(f, "Error"),
            Discriminator::Timeout => write!(f, "Timeout"),
            Discriminator::Default => write!(f, "Default"),
            Discriminator::LowConfidence => write!(f, "LowConfidence"),
            Discriminator::MaxRetriesExceeded => write!(f, "MaxRetriesExceeded"),
            Discriminator::QueueAtCapacity => write!(f, "QueueAtCapacity"),
            Discriminator::Intent(name) => write!(f, "Intent({})", name),
            Discriminator::Digits(digits) => write!(f, "Digits({})", digits),
            Discriminator::Condition(c) => write!(f, "{}({})", c.operator.as_str(), c.value),
            Discriminator::LoopContinue => write!(f, "LoopContinue"),
            Discriminator::LoopDone => write!(f, "LoopDone"),
        }
    }
}

/// A labeled, forward-only edge. The target is an identifier that may not
/// exist yet while the graph is being built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transition {
    pub on: Discriminator,
    pub target: String,
}

impl Transition {
    pub fn new(on: Discriminator, target: impl Into<String>) -> Self {
        Self {
            on,
            target: target.into(),
        }
    }
}

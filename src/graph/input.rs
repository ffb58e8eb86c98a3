use super::{Discriminator, Prompt, Transition};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Speech recognition parameters for the primary input stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechInput {
    /// Registry name of the speech bot.
    pub bot: String,
    pub confidence_threshold: Option<f32>,
    pub retries: u8,
}

impl SpeechInput {
    pub fn new(bot: impl Into<String>) -> Self {
        Self {
            bot: bot.into(),
            confidence_threshold: None,
            retries: 0,
        }
    }

    pub fn with_confidence(mut self, threshold: f32) -> Self {
        self.confidence_threshold = Some(threshold.clamp(0.0, 1.0));
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.retries = retries;
        self
    }
}

/// Keypad parameters for the fallback input stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigitInput {
    pub max_digits: u8,
    pub timeout_seconds: u32,
    /// Prompt for the keypad stage; the primary prompt is reused when absent.
    pub prompt: Option<Prompt>,
}

impl Default for DigitInput {
    fn default() -> Self {
        Self {
            max_digits: 1,
            timeout_seconds: 5,
            prompt: None,
        }
    }
}

impl DigitInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_digits(mut self, max_digits: u8) -> Self {
        self.max_digits = max_digits.max(1);
        self
    }

    pub fn with_timeout(mut self, seconds: u32) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<Prompt>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }
}

/// A failure outcome of an input stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FallbackTrigger {
    NoMatch,
    LowConfidence,
    RetriesExhausted,
    Timeout,
    Error,
}

impl FallbackTrigger {
    pub const ALL: [FallbackTrigger; 5] = [
        FallbackTrigger::NoMatch,
        FallbackTrigger::LowConfidence,
        FallbackTrigger::RetriesExhausted,
        FallbackTrigger::Timeout,
        FallbackTrigger::Error,
    ];

    /// The transition discriminator that carries this outcome.
    pub fn discriminator(&self) -> Discriminator {
        match self {
            FallbackTrigger::NoMatch => Discriminator::Default,
            FallbackTrigger::LowConfidence => Discriminator::LowConfidence,
            FallbackTrigger::RetriesExhausted => Discriminator::MaxRetriesExceeded,
            FallbackTrigger::Timeout => Discriminator::Timeout,
            FallbackTrigger::Error => Discriminator::Error,
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        FallbackTrigger::ALL
            .into_iter()
            .find(|t| t.to_string().eq_ignore_ascii_case(name))
    }

    fn bit(&self) -> u8 {
        1 << (*self as u8)
    }
}

impl fmt::Display for FallbackTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FallbackTrigger::NoMatch => "NoMatch",
            FallbackTrigger::LowConfidence => "LowConfidence",
            FallbackTrigger::RetriesExhausted => "RetriesExhausted",
            FallbackTrigger::Timeout => "Timeout",
            FallbackTrigger::Error => "Error",
        };
        f.write_str(name)
    }
}

/// The set of primary-stage failures that hand over to the keypad stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FallbackTriggerSet(u8);

impl Default for FallbackTriggerSet {
    fn default() -> Self {
        Self::all()
    }
}

impl FallbackTriggerSet {
    pub fn all() -> Self {
        FallbackTrigger::ALL.into_iter().collect()
    }

    pub fn empty() -> Self {
        Self(0)
    }

    pub fn with(mut self, trigger: FallbackTrigger) -> Self {
        self.0 |= trigger.bit();
        self
    }

    pub fn without(mut self, trigger: FallbackTrigger) -> Self {
        self.0 &= !trigger.bit();
        self
    }

    pub fn contains(&self, trigger: FallbackTrigger) -> bool {
        self.0 & trigger.bit() != 0
    }

    pub fn iter(&self) -> impl Iterator<Item = FallbackTrigger> + '_ {
        FallbackTrigger::ALL
            .into_iter()
            .filter(move |t| self.contains(*t))
    }
}

impl FromIterator<FallbackTrigger> for FallbackTriggerSet {
    fn from_iter<I: IntoIterator<Item = FallbackTrigger>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), Self::with)
    }
}

/// How a `CollectInput` node listens to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputConfiguration {
    pub primary: Option<SpeechInput>,
    pub fallback: Option<DigitInput>,
    pub triggers: FallbackTriggerSet,
}

impl InputConfiguration {
    pub fn speech(primary: SpeechInput) -> Self {
        Self {
            primary: Some(primary),
            fallback: None,
            triggers: FallbackTriggerSet::default(),
        }
    }

    pub fn keypad(fallback: DigitInput) -> Self {
        Self {
            primary: None,
            fallback: Some(fallback),
            triggers: FallbackTriggerSet::default(),
        }
    }

    /// Speech first, keypad when one of the triggers fires.
    pub fn sequential(primary: SpeechInput, fallback: DigitInput) -> Self {
        Self {
            primary: Some(primary),
            fallback: Some(fallback),
            triggers: FallbackTriggerSet::default(),
        }
    }

    pub fn fallback_on(mut self, triggers: FallbackTriggerSet) -> Self {
        self.triggers = triggers;
        self
    }

    pub fn is_sequential(&self) -> bool {
        self.primary.is_some() && self.fallback.is_some()
    }

    /// Failure outcomes the first stage of this input can produce.
    pub fn outcomes(&self) -> Vec<FallbackTrigger> {
        match &self.primary {
            Some(speech) => FallbackTrigger::ALL
                .into_iter()
                .filter(|t| match t {
                    FallbackTrigger::LowConfidence => speech.confidence_threshold.is_some(),
                    FallbackTrigger::RetriesExhausted => speech.retries > 0,
                    _ => true,
                })
                .collect(),
            None => vec![
                FallbackTrigger::NoMatch,
                FallbackTrigger::Timeout,
                FallbackTrigger::Error,
            ],
        }
    }
}

/// One entry of a routing table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputRoute {
    pub intent: Option<String>,
    pub digits: Vec<String>,
    pub target: String,
}

/// What the caller produced in a single turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recognition {
    pub intent: Option<String>,
    pub digits: Option<String>,
}

impl Recognition {
    pub fn intent(name: impl Into<String>) -> Self {
        Self {
            intent: Some(name.into()),
            digits: None,
        }
    }

    pub fn digits(digits: impl Into<String>) -> Self {
        Self {
            intent: None,
            digits: Some(digits.into()),
        }
    }

    pub fn both(intent: impl Into<String>, digits: impl Into<String>) -> Self {
        Self {
            intent: Some(intent.into()),
            digits: Some(digits.into()),
        }
    }
}

/// Ordered input routes plus the default route.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingTable {
    pub routes: Vec<InputRoute>,
    pub defaults: Vec<String>,
}

impl RoutingTable {
    /// Groups intent and digit transitions by target, in first-seen order.
    pub fn from_transitions<'a>(transitions: impl IntoIterator<Item = &'a Transition>) -> Self {
        let mut table = Self::default();
        for transition in transitions {
            let existing = table
                .routes
                .iter()
                .position(|r| r.target == transition.target);
            match (&transition.on, existing) {
                (Discriminator::Intent(name), Some(i)) if table.routes[i].intent.is_none() => {
                    table.routes[i].intent = Some(name.clone());
                }
                (Discriminator::Intent(name), _) => table.routes.push(InputRoute {
                    intent: Some(name.clone()),
                    digits: Vec::new(),
                    target: transition.target.clone(),
                }),
                (Discriminator::Digits(digits), Some(i)) => {
                    table.routes[i].digits.push(digits.clone());
                }
                (Discriminator::Digits(digits), None) => table.routes.push(InputRoute {
                    intent: None,
                    digits: vec![digits.clone()],
                    target: transition.target.clone(),
                }),
                (Discriminator::Default, _) => table.defaults.push(transition.target.clone()),
                _ => {}
            }
        }
        table
    }

    pub fn default_target(&self) -> Option<&str> {
        self.defaults.first().map(String::as_str)
    }

    pub fn has_single_default(&self) -> bool {
        self.defaults.len() == 1
    }

    /// Picks the target for a recognition result. An intent match wins over a
    /// digit match from the same turn; the default catches everything else.
    pub fn resolve(&self, recognition: &Recognition) -> Option<&str> {
        let by_intent = recognition.intent.as_deref().and_then(|intent| {
            self.routes
                .iter()
                .find(|r| r.intent.as_deref() == Some(intent))
        });
        let by_digits = || {
            recognition.digits.as_deref().and_then(|digits| {
                self.routes
                    .iter()
                    .find(|r| r.digits.iter().any(|d| d == digits))
            })
        };
        by_intent
            .or_else(by_digits)
            .map(|r| r.target.as_str())
            .or_else(|| self.default_target())
    }

    /// Intent transitions followed by digit transitions. Defaults are not included.
    pub fn transitions(&self) -> Vec<Transition> {
        let intents = self.routes.iter().filter_map(|r| {
            r.intent
                .as_ref()
                .map(|i| Transition::new(Discriminator::Intent(i.clone()), r.target.clone()))
        });
        let digits = self.routes.iter().flat_map(|r| {
            r.digits
                .iter()
                .map(|d| Transition::new(Discriminator::Digits(d.clone()), r.target.clone()))
        });
        intents.chain(digits).collect()
    }

    pub fn digit_transitions(&self) -> Vec<Transition> {
        self.transitions()
            .into_iter()
            .filter(|t| matches!(t.on, Discriminator::Digits(_)))
            .collect()
    }
}

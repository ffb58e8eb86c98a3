use super::{BuilderState, Exit, Sequence};
use crate::graph::{Comparison, Discriminator, FallbackTrigger, Operator};

/// Declares the routes out of a `get_customer_input` step.
///
/// Each route opens a nested sequence. A route whose sequence is left empty, or
/// that doesn't end in a terminal step, continues with whatever follows the
/// input step.
pub struct InputMenu<'a> {
    state: &'a mut BuilderState,
    node: String,
    joins: Vec<Exit>,
}

impl<'a> InputMenu<'a> {
    pub(super) fn new(state: &'a mut BuilderState, node: String) -> Self {
        Self {
            state,
            node,
            joins: Vec::new(),
        }
    }

    pub(super) fn into_joins(self) -> Vec<Exit> {
        self.joins
    }

    fn open(&mut self, on: Vec<Discriminator>, f: impl FnOnce(&mut Sequence<'_>)) {
        let exits = on
            .into_iter()
            .map(|on| Exit {
                from: self.node.clone(),
                on,
            })
            .collect();
        let tail = Sequence::run(&mut *self.state, exits, f);
        self.joins.extend(tail);
    }

    /// Routes an optional intent and any of `digits` to one sequence.
    pub fn route(
        &mut self,
        intent: Option<String>,
        digits: Vec<String>,
        f: impl FnOnce(&mut Sequence<'_>),
    ) -> &mut Self {
        let on = intent
            .map(Discriminator::Intent)
            .into_iter()
            .chain(digits.into_iter().map(Discriminator::Digits))
            .collect();
        self.open(on, f);
        self
    }

    /// Routes a spoken intent and any of `digits` to the same sequence.
    pub fn when<D>(
        &mut self,
        intent: impl Into<String>,
        digits: impl IntoIterator<Item = D>,
        f: impl FnOnce(&mut Sequence<'_>),
    ) -> &mut Self
    where
        D: Into<String>,
    {
        let mut on = vec![Discriminator::Intent(intent.into())];
        on.extend(digits.into_iter().map(|d| Discriminator::Digits(d.into())));
        self.open(on, f);
        self
    }

    pub fn when_intent(
        &mut self,
        intent: impl Into<String>,
        f: impl FnOnce(&mut Sequence<'_>),
    ) -> &mut Self {
        self.open(vec![Discriminator::Intent(intent.into())], f);
        self
    }

    pub fn when_digits(
        &mut self,
        digits: impl Into<String>,
        f: impl FnOnce(&mut Sequence<'_>),
    ) -> &mut Self {
        self.open(vec![Discriminator::Digits(digits.into())], f);
        self
    }

    /// The route taken when nothing matched.
    pub fn otherwise(&mut self, f: impl FnOnce(&mut Sequence<'_>)) -> &mut Self {
        self.open(vec![Discriminator::Default], f);
        self
    }

    pub fn on_timeout(&mut self, f: impl FnOnce(&mut Sequence<'_>)) -> &mut Self {
        self.open(vec![Discriminator::Timeout], f);
        self
    }

    pub fn on_error(&mut self, f: impl FnOnce(&mut Sequence<'_>)) -> &mut Self {
        self.open(vec![Discriminator::Error], f);
        self
    }

    /// Handles a specific failure outcome of the input.
    pub fn on_failure(
        &mut self,
        trigger: FallbackTrigger,
        f: impl FnOnce(&mut Sequence<'_>),
    ) -> &mut Self {
        self.open(vec![trigger.discriminator()], f);
        self
    }
}

/// Declares the cases of a `branch` step, checked in declaration order.
pub struct BranchCases<'a> {
    state: &'a mut BuilderState,
    node: String,
    joins: Vec<Exit>,
}

impl<'a> BranchCases<'a> {
    pub(super) fn new(state: &'a mut BuilderState, node: String) -> Self {
        Self {
            state,
            node,
            joins: Vec::new(),
        }
    }

    pub(super) fn into_joins(self) -> Vec<Exit> {
        self.joins
    }

    fn case(&mut self, on: Discriminator, f: impl FnOnce(&mut Sequence<'_>)) {
        let exits = vec![Exit {
            from: self.node.clone(),
            on,
        }];
        let tail = Sequence::run(&mut *self.state, exits, f);
        self.joins.extend(tail);
    }

    pub fn equals(
        &mut self,
        value: impl Into<String>,
        f: impl FnOnce(&mut Sequence<'_>),
    ) -> &mut Self {
        self.when(Operator::Equals, value, f)
    }

    pub fn when(
        &mut self,
        operator: Operator,
        value: impl Into<String>,
        f: impl FnOnce(&mut Sequence<'_>),
    ) -> &mut Self {
        let comparison = Comparison::new(operator, value);
        self.case(Discriminator::Condition(comparison), f);
        self
    }

    pub fn otherwise(&mut self, f: impl FnOnce(&mut Sequence<'_>)) -> &mut Self {
        self.case(Discriminator::Default, f);
        self
    }
}

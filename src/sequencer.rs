//! Step queue computation and the cursor over it.

use crate::enums::{InterfaceType, Step};
use crate::macros::has_configurable_macros;
use crate::paths;
use crate::types::ConfigResponse;
use serde_json::Value;

/// Active steps in display order.
///
/// Pure: the same state and config always give the same queue. Without a
/// loaded config only the fixed steps are present.
pub fn compute_queue(state: &Value, loaded: Option<&ConfigResponse>, show_welcome: bool) -> Vec<Step> {
    let mut queue = Vec::with_capacity(Step::ALL.len());

    let welcome_dismissed = paths::resolve(state, "do_not_show_welcome")
        .is_some_and(|v| paths::value_to_text(v) == "1");
    if show_welcome && !welcome_dismissed {
        queue.push(Step::Welcome);
    }
    queue.push(Step::SelectTemplate);
    queue.push(Step::CreateHost);

    if let Some(config) = loaded {
        let install_agent = config.install_agent_required;
        if install_agent {
            queue.push(Step::InstallAgent);
        }

        let other_interface = [InterfaceType::Snmp, InterfaceType::Ipmi, InterfaceType::Jmx]
            .into_iter()
            .any(|t| config.interface_required(t));
        if other_interface || (config.agent_interface_required && !install_agent) {
            queue.push(Step::AddInterface);
        }

        if !config.template.readme.trim().is_empty() {
            queue.push(Step::Readme);
        }
        if has_configurable_macros(&config.template) {
            queue.push(Step::ConfigureHost);
        }
    }

    queue.push(Step::Finish);
    queue.push(Step::Complete);
    queue
}

/// Cursor over the current queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepSequencer {
    queue: Vec<Step>,
    current: Step,
}

impl StepSequencer {
    /// Starts at the first step of `queue`.
    pub fn new(queue: Vec<Step>) -> Self {
        let current = queue.first().copied().unwrap_or(Step::SelectTemplate);
        StepSequencer { queue, current }
    }

    pub fn current(&self) -> Step {
        self.current
    }

    pub fn queue(&self) -> &[Step] {
        &self.queue
    }

    pub fn index(&self) -> Option<usize> {
        self.queue.iter().position(|s| *s == self.current)
    }

    pub fn contains(&self, step: Step) -> bool {
        self.queue.contains(&step)
    }

    pub fn is_terminal(&self) -> bool {
        self.queue.last() == Some(&self.current)
    }

    /// Back is possible from any step except the first and the terminal one.
    pub fn can_go_back(&self) -> bool {
        !self.is_terminal() && self.queue.iter().any(|s| *s < self.current)
    }

    /// Replaces the queue and returns the steps that dropped out of it.
    pub fn set_queue(&mut self, queue: Vec<Step>) -> Vec<Step> {
        let removed = self
            .queue
            .iter()
            .filter(|s| !queue.contains(s))
            .copied()
            .collect();
        self.queue = queue;
        removed
    }

    /// Moves to the next step after the current one.
    ///
    /// The current step may have left the queue, so the target is the first
    /// queued step ordered after it. Stays on the last step otherwise.
    pub fn advance(&mut self) -> Step {
        let next = self
            .queue
            .iter()
            .copied()
            .find(|s| *s > self.current)
            .or_else(|| self.queue.last().copied());
        if let Some(next) = next {
            self.current = next;
        }
        self.current
    }

    /// Moves to the closest queued step before the current one.
    pub fn back(&mut self) -> Option<Step> {
        if !self.can_go_back() {
            return None;
        }
        let previous = self.queue.iter().copied().rev().find(|s| *s < self.current)?;
        self.current = previous;
        Some(previous)
    }
}

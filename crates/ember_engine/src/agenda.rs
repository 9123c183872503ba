//! The FIFO work queue driving the run loop.

use std::collections::VecDeque;

use ember_foundation::FactRef;

/// What happened to the fact.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskKind {
    /// The fact was asserted; rules are matched.
    Assert,
    /// The fact was retracted; truth maintenance runs.
    Retract,
}

/// A unit of pending work.
#[derive(Clone, Debug)]
pub struct Task {
    /// Task kind.
    pub kind: TaskKind,
    /// The fact the task concerns.
    pub fact: FactRef,
}

impl Task {
    /// An assert task.
    #[must_use]
    pub fn assert(fact: FactRef) -> Self {
        Self {
            kind: TaskKind::Assert,
            fact,
        }
    }

    /// A retract task.
    #[must_use]
    pub fn retract(fact: FactRef) -> Self {
        Self {
            kind: TaskKind::Retract,
            fact,
        }
    }
}

/// Pending tasks in arrival order.
#[derive(Clone, Debug, Default)]
pub struct Agenda {
    tasks: VecDeque<Task>,
}

impl Agenda {
    /// Creates an empty agenda.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a task.
    pub fn push(&mut self, task: Task) {
        self.tasks.push_back(task);
    }

    /// Puts a task back at the front.
    pub fn unshift(&mut self, task: Task) {
        self.tasks.push_front(task);
    }

    /// Removes and returns the oldest task.
    pub fn shift(&mut self) -> Option<Task> {
        self.tasks.pop_front()
    }

    /// Returns true if any task is pending.
    #[must_use]
    pub fn has_tasks(&self) -> bool {
        !self.tasks.is_empty()
    }

    /// Number of pending tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns true if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Drops every pending task.
    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    /// Iterates pending tasks, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }
}

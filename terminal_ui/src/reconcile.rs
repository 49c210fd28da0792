//! Local mirror of the server's task list.
//!
//! The canonical list only ever comes from the server. User mutations are
//! layered on top as tickets that move `Optimistic -> Confirmed | Reverted`;
//! [`TaskList::view`] is the canonical list with every live ticket applied.
//! A [`TaskList::resync`] swaps in a fresh canonical list and drops settled
//! tickets, which is the only recovery path: there is no rollback math.

use taskflow_shared::Task;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    SetCompleted { id: Uuid, completed: bool },
    Remove { id: Uuid },
}

impl Mutation {
    fn apply(&self, tasks: &mut Vec<Task>) {
        match *self {
            Mutation::SetCompleted { id, completed } => {
                if let Some(task) = tasks.iter_mut().find(|t| t.id == id) {
                    task.completed = completed;
                }
            }
            Mutation::Remove { id } => tasks.retain(|t| t.id != id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Optimistic,
    Confirmed,
    Reverted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

#[derive(Debug)]
struct Pending {
    ticket: Ticket,
    mutation: Mutation,
    phase: Phase,
}

#[derive(Debug, Default)]
pub struct TaskList {
    canonical: Vec<Task>,
    pending: Vec<Pending>,
    next_ticket: u64,
}

impl TaskList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the canonical list with a fresh server snapshot. Tickets
    /// still in flight survive; confirmed and reverted ones are dropped.
    pub fn resync(&mut self, tasks: Vec<Task>) {
        self.canonical = tasks;
        self.pending.retain(|p| p.phase == Phase::Optimistic);
    }

    pub fn apply(&mut self, mutation: Mutation) -> Ticket {
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        self.pending.push(Pending {
            ticket,
            mutation,
            phase: Phase::Optimistic,
        });
        ticket
    }

    pub fn confirm(&mut self, ticket: Ticket) {
        self.settle(ticket, Phase::Confirmed);
    }

    pub fn revert(&mut self, ticket: Ticket) {
        self.settle(ticket, Phase::Reverted);
    }

    fn settle(&mut self, ticket: Ticket, phase: Phase) {
        if let Some(pending) = self
            .pending
            .iter_mut()
            .find(|p| p.ticket == ticket && p.phase == Phase::Optimistic)
        {
            pending.phase = phase;
        }
    }

    /// `None` once the ticket has been dropped by a resync.
    pub fn phase(&self, ticket: Ticket) -> Option<Phase> {
        self.pending
            .iter()
            .find(|p| p.ticket == ticket)
            .map(|p| p.phase)
    }

    pub fn view(&self) -> Vec<Task> {
        let mut tasks = self.canonical.clone();
        for pending in self.pending.iter().filter(|p| p.phase != Phase::Reverted) {
            pending.mutation.apply(&mut tasks);
        }
        tasks
    }

    pub fn get(&self, id: Uuid) -> Option<Task> {
        self.view().into_iter().find(|t| t.id == id)
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.get(id).is_some()
    }

    /// `(completed, total)` over the current view.
    pub fn counts(&self) -> (usize, usize) {
        let view = self.view();
        let done = view.iter().filter(|t| t.completed).count();
        (done, view.len())
    }
}

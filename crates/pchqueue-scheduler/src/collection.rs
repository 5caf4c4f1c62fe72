//! Ordered collections of pending PCH tasks.
//!
//! A collection is kept sorted ascending by task key with unique keys. Every
//! mutation goes through a linear merge or set difference, so the invariant
//! holds after each call regardless of how callers batch their input.

use pchqueue_core::{PchTask, PchTasks, ProjectPartId, is_normalized, normalize_ids};
use std::cmp::Ordering;
use tracing::warn;

/// Pending tasks sorted by key, at most one task per key.
#[derive(Debug, Clone, Default)]
pub struct PchTaskCollection {
    tasks: PchTasks,
}

impl PchTaskCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PchTask> {
        self.tasks.iter()
    }

    pub fn as_slice(&self) -> &[PchTask] {
        &self.tasks
    }

    /// Whether a task with exactly this key is pending.
    pub fn contains_key(&self, key: &[ProjectPartId]) -> bool {
        self.tasks
            .binary_search_by(|task| task.key().cmp(key))
            .is_ok()
    }

    /// Merge `new_tasks` into the collection and return how many keys were
    /// not pending before. A new task replaces a pending one with the same
    /// key.
    pub fn merge(&mut self, new_tasks: PchTasks) -> usize {
        let new_tasks = normalize_batch(new_tasks);
        let old_len = self.tasks.len();

        let existing = std::mem::take(&mut self.tasks);
        let mut merged = Vec::with_capacity(existing.len() + new_tasks.len());
        let mut new_iter = new_tasks.into_iter().peekable();
        let mut old_iter = existing.into_iter().peekable();

        loop {
            let ordering = match (new_iter.peek(), old_iter.peek()) {
                (Some(new), Some(old)) => new.key().cmp(old.key()),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => break,
            };

            match ordering {
                Ordering::Less => merged.extend(new_iter.next()),
                Ordering::Greater => merged.extend(old_iter.next()),
                Ordering::Equal => {
                    merged.extend(new_iter.next());
                    old_iter.next();
                }
            }
        }

        self.tasks = merged;
        debug_assert!(self.is_sorted_unique());

        self.tasks.len() - old_len
    }

    /// Remove every task keyed by exactly one of `ids` and return how many
    /// were removed. `ids` should be sorted ascending without duplicates; if
    /// it is not, a normalized copy is used.
    pub fn remove_project_parts(&mut self, ids: &[ProjectPartId]) -> usize {
        if ids.is_empty() || self.tasks.is_empty() {
            return 0;
        }

        let normalized;
        let ids = if is_normalized(ids) {
            ids
        } else {
            warn!(count = ids.len(), "Project part ids for removal are not sorted, normalizing");
            let mut owned = ids.to_vec();
            normalize_ids(&mut owned);
            normalized = owned;
            normalized.as_slice()
        };

        let old_len = self.tasks.len();
        let existing = std::mem::take(&mut self.tasks);
        let mut kept = Vec::with_capacity(existing.len());
        let mut ids_iter = ids.iter().peekable();

        for task in existing {
            while ids_iter
                .next_if(|id| std::slice::from_ref(*id) < task.key())
                .is_some()
            {}

            match ids_iter.peek() {
                Some(id) if std::slice::from_ref(*id) == task.key() => {}
                _ => kept.push(task),
            }
        }

        self.tasks = kept;
        debug_assert!(self.is_sorted_unique());

        old_len - self.tasks.len()
    }

    /// Remove and return the last `count` tasks in key order, or all of them
    /// if fewer are pending.
    pub fn drain_tail(&mut self, count: usize) -> PchTasks {
        let start = self.tasks.len().saturating_sub(count);
        self.tasks.split_off(start)
    }

    fn is_sorted_unique(&self) -> bool {
        self.tasks.windows(2).all(|pair| pair[0].key() < pair[1].key())
    }
}

/// Sort a batch by key, keeping the last submitted task for repeated keys.
fn normalize_batch(mut tasks: PchTasks) -> PchTasks {
    if tasks.windows(2).all(|pair| pair[0].key() < pair[1].key()) {
        return tasks;
    }

    tasks.sort_by(|a, b| a.key().cmp(b.key()));

    let mut unique: PchTasks = Vec::with_capacity(tasks.len());
    for task in tasks {
        match unique.last_mut() {
            Some(last) if last.key() == task.key() => *last = task,
            _ => unique.push(task),
        }
    }
    unique
}

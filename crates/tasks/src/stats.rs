//! Per-user task statistics, recomputed on every list request

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::TaskView;

/// Counters over one user's full task set
///
/// A completed task is counted only in `completed`, whatever its deadline,
/// so `due + upcoming` covers open tasks only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatistics {
    pub total: usize,
    pub completed: usize,
    /// Open tasks whose deadline is strictly before `now`
    pub due: usize,
    /// Open tasks whose deadline is at or after `now`
    pub upcoming: usize,
}

impl TaskStatistics {
    pub fn compute<'a, I>(tasks: I, now: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = &'a TaskView>,
    {
        tasks.into_iter().fold(Self::default(), |mut stats, task| {
            stats.total += 1;
            if task.is_done() {
                stats.completed += 1;
            } else if task.deadline < now {
                stats.due += 1;
            } else {
                stats.upcoming += 1;
            }
            stats
        })
    }
}

//! XP milestones ("quests") derived from a learner's points.

use serde::Serialize;

use crate::model::rules::QUEST_MILESTONES;
use crate::progress::rounded_percentage;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestStatus {
    pub title: String,
    pub value: u32,
    pub percentage: u8,
    pub completed: bool,
}

/// Progress toward every milestone in [`QUEST_MILESTONES`].
#[must_use]
pub fn quest_progress(points: u32) -> Vec<QuestStatus> {
    QUEST_MILESTONES
        .iter()
        .map(|&value| QuestStatus {
            title: format!("Earn {value} XP"),
            value,
            percentage: rounded_percentage(points as usize, value as usize),
            completed: points >= value,
        })
        .collect()
}

/// The first milestone not reached yet, if any.
#[must_use]
pub fn next_quest(points: u32) -> Option<QuestStatus> {
    quest_progress(points).into_iter().find(|q| !q.completed)
}

//! Stage pipeline engine.
//!
//! A [`Pipeline`] is the in-memory view of one application's stages together
//! with its current-stage pointer. Every pipeline operation is applied here
//! first; the persistence layer loads the pipeline under a row lock, calls one
//! method, and writes back what changed inside the same transaction.
//!
//! Invariants held after every successful operation:
//!
//! - the current stage, if any, is one of this pipeline's stages;
//! - no two stages share a `stage_order`;
//! - a completed stage has `completed_at` set.

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{Stage, StageResult, TemplateStage};

/// Message returned when advancing an application that has no stages.
pub const NO_PIPELINE_MSG: &str = "This application has no stages defined.";

/// Message returned when no incomplete stage follows the current one.
pub const FINAL_STAGE_MSG: &str = "No more stages. This is the final stage.";

/// Message returned when a stage id is not part of the pipeline.
pub const STAGE_NOT_FOUND_MSG: &str = "Stage not found.";

/// Input for adding a stage.
#[derive(Debug, Clone, Default)]
pub struct NewStage {
    pub stage_name: String,
    /// Appended after the last stage when absent.
    pub stage_order: Option<i32>,
    pub feedback_notes: Option<String>,
    pub result: StageResult,
}

impl NewStage {
    pub fn named(stage_name: impl Into<String>) -> Self {
        Self {
            stage_name: stage_name.into(),
            ..Default::default()
        }
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.stage_order = Some(order);
        self
    }
}

/// Partial update of a stage. `feedback_notes: Some(None)` clears the notes.
#[derive(Debug, Clone, Default)]
pub struct StageChanges {
    pub stage_name: Option<String>,
    pub stage_order: Option<i32>,
    pub feedback_notes: Option<Option<String>>,
    pub result: Option<StageResult>,
}

/// Result of [`Pipeline::add_stage`].
#[derive(Debug, Clone)]
pub struct AddedStage {
    pub stage: Stage,
    /// True when the application had no current stage and now points here.
    pub became_current: bool,
}

/// What happened to the current-stage pointer after a delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrentChange {
    Unchanged,
    Reassigned(Option<Uuid>),
}

/// Result of [`Pipeline::delete_stage`].
#[derive(Debug, Clone)]
pub struct RemovedStage {
    pub stage: Stage,
    pub current: CurrentChange,
}

/// How a new application receives its initial stages.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum StageSeed {
    /// Copy the stages of a template, preserving their order.
    Template(Uuid),
    /// Caller-supplied ordered list.
    Manual(Vec<SeedStage>),
    #[default]
    None,
}

/// One caller-supplied seed stage.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedStage {
    pub stage_name: String,
    /// Defaults to the 1-based position in the list.
    pub stage_order: Option<i32>,
}

impl StageSeed {
    /// Build a seed from the optional wire keys. A template wins over a list;
    /// an empty list means no seeding.
    pub fn from_parts(template_id: Option<Uuid>, stages: Option<Vec<SeedStage>>) -> Self {
        match (template_id, stages) {
            (Some(id), _) => Self::Template(id),
            (None, Some(list)) if !list.is_empty() => Self::Manual(list),
            _ => Self::None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// Turn a manual seed list into stage drafts, defaulting order to list position.
pub fn manual_seed_stages(list: &[SeedStage]) -> Vec<NewStage> {
    list.iter()
        .enumerate()
        .map(|(i, s)| NewStage {
            stage_name: s.stage_name.clone(),
            stage_order: Some(s.stage_order.unwrap_or(i as i32 + 1)),
            ..Default::default()
        })
        .collect()
}

/// Turn template stages into stage drafts, sorted by template order.
pub fn template_seed_stages(stages: &[TemplateStage]) -> Vec<NewStage> {
    let mut sorted: Vec<&TemplateStage> = stages.iter().collect();
    sorted.sort_by_key(|s| s.stage_order);
    sorted
        .into_iter()
        .map(|s| NewStage::named(s.stage_name.clone()).with_order(s.stage_order))
        .collect()
}

/// One application's ordered stages and its current-stage pointer.
#[derive(Debug, Clone)]
pub struct Pipeline {
    application_id: Uuid,
    current_stage_id: Option<Uuid>,
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Build a pipeline from persisted state. Stages may arrive in any order.
    pub fn new(application_id: Uuid, current_stage_id: Option<Uuid>, stages: Vec<Stage>) -> Self {
        let mut pipeline = Self {
            application_id,
            current_stage_id,
            stages,
        };
        pipeline.sort();
        pipeline
    }

    /// An application without any stages.
    pub fn empty(application_id: Uuid) -> Self {
        Self::new(application_id, None, Vec::new())
    }

    pub fn application_id(&self) -> Uuid {
        self.application_id
    }

    pub fn current_stage_id(&self) -> Option<Uuid> {
        self.current_stage_id
    }

    pub fn current(&self) -> Option<&Stage> {
        self.current_stage_id.and_then(|id| self.stage(id))
    }

    /// Stages ordered by `stage_order`.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn stage(&self, id: Uuid) -> Option<&Stage> {
        self.stages.iter().find(|s| s.id == id)
    }

    pub fn into_stages(self) -> Vec<Stage> {
        self.stages
    }

    /// Order assigned to a stage added without an explicit one.
    pub fn next_order(&self) -> Result<i32> {
        match self.stages.iter().map(|s| s.stage_order).max() {
            None => Ok(1),
            Some(max) => max
                .checked_add(1)
                .ok_or_else(|| Error::InvalidInput("stage_order overflow".to_string())),
        }
    }

    /// Append a stage. The first stage of a pipeline without a current stage
    /// becomes current.
    pub fn add_stage(&mut self, id: Uuid, new: NewStage, now: DateTime<Utc>) -> Result<AddedStage> {
        let stage_name = require_name(&new.stage_name)?;
        let stage_order = match new.stage_order {
            Some(order) => {
                require_positive_order(order)?;
                self.ensure_order_free(order, None)?;
                order
            }
            None => self.next_order()?,
        };

        let stage = Stage {
            id,
            application_id: self.application_id,
            stage_name,
            stage_order,
            feedback_notes: new.feedback_notes,
            result: new.result,
            is_completed: false,
            completed_at: None,
            created_at: now,
        };

        let became_current = self.current_stage_id.is_none();
        if became_current {
            self.current_stage_id = Some(id);
        }
        self.stages.push(stage.clone());
        self.sort();

        debug!(
            subsystem = "pipeline",
            op = "add_stage",
            application_id = %self.application_id,
            stage_id = %id,
            stage_order,
            became_current,
            "Stage added"
        );

        Ok(AddedStage {
            stage,
            became_current,
        })
    }

    /// Add several stages in order. Used for seeding a new application.
    pub fn seed<F>(&mut self, drafts: Vec<NewStage>, mut next_id: F, now: DateTime<Utc>) -> Result<Vec<Stage>>
    where
        F: FnMut() -> Uuid,
    {
        let mut created = Vec::with_capacity(drafts.len());
        for draft in drafts {
            created.push(self.add_stage(next_id(), draft, now)?.stage);
        }
        Ok(created)
    }

    /// Mark a stage completed. Repeating the call overwrites result, notes and
    /// timestamp. The current-stage pointer is left alone.
    pub fn complete_stage(
        &mut self,
        stage_id: Uuid,
        result: StageResult,
        feedback_notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Stage> {
        let stage = self.stage_mut(stage_id)?;
        stage.is_completed = true;
        stage.completed_at = Some(now);
        stage.result = result;
        if feedback_notes.is_some() {
            stage.feedback_notes = feedback_notes;
        }
        Ok(stage.clone())
    }

    /// Advance to the incomplete stage with the smallest order above the
    /// current one. Completion of the current stage is not required.
    pub fn move_to_next(&mut self) -> Result<Stage> {
        let current_id = self
            .current_stage_id
            .ok_or_else(|| Error::InvalidState(NO_PIPELINE_MSG.to_string()))?;
        let current_order = self
            .stage(current_id)
            .map(|s| s.stage_order)
            .ok_or_else(|| {
                Error::Internal(format!(
                    "current stage {} is not part of application {}",
                    current_id, self.application_id
                ))
            })?;

        let next = self
            .stages
            .iter()
            .filter(|s| s.stage_order > current_order && !s.is_completed)
            .min_by_key(|s| (s.stage_order, s.id))
            .cloned()
            .ok_or_else(|| Error::InvalidState(FINAL_STAGE_MSG.to_string()))?;

        debug!(
            subsystem = "pipeline",
            op = "move_to_next",
            application_id = %self.application_id,
            from = %current_id,
            to = %next.id,
            "Current stage advanced"
        );

        self.current_stage_id = Some(next.id);
        Ok(next)
    }

    /// Remove a stage. Deleting the current stage moves the pointer to the
    /// remaining stage with the lowest id, or clears it.
    pub fn delete_stage(&mut self, stage_id: Uuid) -> Result<RemovedStage> {
        let index = self
            .stages
            .iter()
            .position(|s| s.id == stage_id)
            .ok_or_else(|| Error::NotFound(STAGE_NOT_FOUND_MSG.to_string()))?;
        let stage = self.stages.remove(index);

        let current = if self.current_stage_id == Some(stage_id) {
            let replacement = self.stages.iter().map(|s| s.id).min();
            self.current_stage_id = replacement;
            CurrentChange::Reassigned(replacement)
        } else {
            CurrentChange::Unchanged
        };

        Ok(RemovedStage { stage, current })
    }

    /// Apply a partial update. Completion flags and the pointer are untouched.
    pub fn update_stage(&mut self, stage_id: Uuid, changes: StageChanges) -> Result<Stage> {
        let stage_name = changes.stage_name.as_deref().map(require_name).transpose()?;
        if let Some(order) = changes.stage_order {
            require_positive_order(order)?;
            self.ensure_order_free(order, Some(stage_id))?;
        }

        let stage = self.stage_mut(stage_id)?;
        if let Some(name) = stage_name {
            stage.stage_name = name;
        }
        if let Some(order) = changes.stage_order {
            stage.stage_order = order;
        }
        if let Some(notes) = changes.feedback_notes {
            stage.feedback_notes = notes;
        }
        if let Some(result) = changes.result {
            stage.result = result;
        }
        let updated = stage.clone();
        self.sort();
        Ok(updated)
    }

    /// Verify the pipeline invariants.
    pub fn check_invariants(&self) -> Result<()> {
        if let Some(current) = self.current_stage_id {
            if self.stage(current).is_none() {
                return Err(Error::Internal(format!(
                    "current stage {} does not belong to application {}",
                    current, self.application_id
                )));
            }
        }
        for pair in self.stages.windows(2) {
            if pair[0].stage_order == pair[1].stage_order {
                return Err(Error::Internal(format!(
                    "duplicate stage_order {} in application {}",
                    pair[0].stage_order, self.application_id
                )));
            }
        }
        for stage in &self.stages {
            if stage.application_id != self.application_id {
                return Err(Error::Internal(format!(
                    "stage {} belongs to application {}",
                    stage.id, stage.application_id
                )));
            }
            if stage.is_completed && stage.completed_at.is_none() {
                return Err(Error::Internal(format!(
                    "completed stage {} has no completed_at",
                    stage.id
                )));
            }
        }
        Ok(())
    }

    fn stage_mut(&mut self, id: Uuid) -> Result<&mut Stage> {
        self.stages
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| Error::NotFound(STAGE_NOT_FOUND_MSG.to_string()))
    }

    fn ensure_order_free(&self, order: i32, except: Option<Uuid>) -> Result<()> {
        let taken = self
            .stages
            .iter()
            .any(|s| s.stage_order == order && Some(s.id) != except);
        if taken {
            return Err(Error::Conflict(format!(
                "A stage with order {} already exists for this application.",
                order
            )));
        }
        Ok(())
    }

    fn sort(&mut self) {
        self.stages.sort_by_key(|s| (s.stage_order, s.id));
    }
}

fn require_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput("Stage name is required".to_string()));
    }
    Ok(trimmed.to_string())
}

fn require_positive_order(order: i32) -> Result<()> {
    if order < 1 {
        return Err(Error::InvalidInput(
            "stage_order must be a positive integer".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uuid_utils::new_v7;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn pipeline_with(names: &[&str]) -> Pipeline {
        let mut pipeline = Pipeline::empty(new_v7());
        let drafts = names.iter().map(|n| NewStage::named(*n)).collect();
        pipeline.seed(drafts, new_v7, now()).unwrap();
        pipeline
    }

    fn id_of(pipeline: &Pipeline, name: &str) -> Uuid {
        pipeline
            .stages()
            .iter()
            .find(|s| s.stage_name == name)
            .map(|s| s.id)
            .unwrap()
    }

    #[test]
    fn test_first_added_stage_becomes_current() {
        let mut pipeline = Pipeline::empty(new_v7());
        let added = pipeline
            .add_stage(new_v7(), NewStage::named("Phone Screen"), now())
            .unwrap();

        assert!(added.became_current);
        assert_eq!(added.stage.stage_order, 1);
        assert_eq!(pipeline.current_stage_id(), Some(added.stage.id));
        pipeline.check_invariants().unwrap();
    }

    #[test]
    fn test_later_stage_does_not_steal_current() {
        let mut pipeline = pipeline_with(&["Phone Screen"]);
        let first = pipeline.current_stage_id();
        let added = pipeline
            .add_stage(new_v7(), NewStage::named("Onsite"), now())
            .unwrap();

        assert!(!added.became_current);
        assert_eq!(added.stage.stage_order, 2);
        assert_eq!(pipeline.current_stage_id(), first);
    }

    #[test]
    fn test_omitted_order_appends_after_max_even_with_gaps() {
        let mut pipeline = Pipeline::empty(new_v7());
        pipeline
            .add_stage(new_v7(), NewStage::named("A").with_order(3), now())
            .unwrap();
        pipeline
            .add_stage(new_v7(), NewStage::named("B").with_order(7), now())
            .unwrap();
        let added = pipeline
            .add_stage(new_v7(), NewStage::named("C"), now())
            .unwrap();
        assert_eq!(added.stage.stage_order, 8);
    }

    #[test]
    fn test_add_rejects_duplicate_order() {
        let mut pipeline = pipeline_with(&["Phone Screen", "Onsite"]);
        let err = pipeline
            .add_stage(new_v7(), NewStage::named("Again").with_order(2), now())
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(pipeline.stages().len(), 2);
    }

    #[test]
    fn test_add_rejects_blank_name_and_bad_order() {
        let mut pipeline = Pipeline::empty(new_v7());
        assert!(matches!(
            pipeline.add_stage(new_v7(), NewStage::named("   "), now()),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            pipeline.add_stage(new_v7(), NewStage::named("X").with_order(0), now()),
            Err(Error::InvalidInput(_))
        ));
        assert!(pipeline.current_stage_id().is_none());
    }

    #[test]
    fn test_add_keeps_initial_result() {
        let mut pipeline = Pipeline::empty(new_v7());
        let draft = NewStage {
            stage_name: "Take-home".into(),
            result: StageResult::Fail,
            feedback_notes: Some("late".into()),
            ..Default::default()
        };
        let added = pipeline.add_stage(new_v7(), draft, now()).unwrap();
        assert_eq!(added.stage.result, StageResult::Fail);
        assert!(!added.stage.is_completed);
        assert_eq!(added.stage.feedback_notes.as_deref(), Some("late"));
    }

    #[test]
    fn test_complete_sets_flags_without_advancing() {
        let mut pipeline = pipeline_with(&["Phone Screen", "Onsite"]);
        let current = pipeline.current_stage_id().unwrap();

        let done = pipeline
            .complete_stage(current, StageResult::Pass, Some("great".into()), now())
            .unwrap();

        assert!(done.is_completed);
        assert!(done.completed_at.is_some());
        assert_eq!(done.result, StageResult::Pass);
        assert_eq!(done.feedback_notes.as_deref(), Some("great"));
        assert_eq!(pipeline.current_stage_id(), Some(current));
        pipeline.check_invariants().unwrap();
    }

    #[test]
    fn test_complete_twice_overwrites_latest_values() {
        let mut pipeline = pipeline_with(&["Phone Screen"]);
        let id = pipeline.current_stage_id().unwrap();
        let first_at = now();
        let later_at = first_at + chrono::Duration::minutes(5);

        pipeline
            .complete_stage(id, StageResult::Pass, Some("first".into()), first_at)
            .unwrap();
        let again = pipeline
            .complete_stage(id, StageResult::Fail, Some("second".into()), later_at)
            .unwrap();

        assert!(again.is_completed);
        assert_eq!(again.result, StageResult::Fail);
        assert_eq!(again.feedback_notes.as_deref(), Some("second"));
        assert_eq!(again.completed_at, Some(later_at));
    }

    #[test]
    fn test_complete_without_notes_keeps_existing_notes() {
        let mut pipeline = pipeline_with(&["Phone Screen"]);
        let id = pipeline.current_stage_id().unwrap();
        pipeline
            .update_stage(
                id,
                StageChanges {
                    feedback_notes: Some(Some("bring portfolio".into())),
                    ..Default::default()
                },
            )
            .unwrap();

        let done = pipeline
            .complete_stage(id, StageResult::Pending, None, now())
            .unwrap();
        assert_eq!(done.feedback_notes.as_deref(), Some("bring portfolio"));
        // Completed with a pending result is legal.
        assert_eq!(done.result, StageResult::Pending);
    }

    #[test]
    fn test_complete_unknown_stage_is_not_found() {
        let mut pipeline = pipeline_with(&["Phone Screen"]);
        let err = pipeline
            .complete_stage(new_v7(), StageResult::Pass, None, now())
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_move_to_next_without_pipeline_is_invalid_state() {
        let mut pipeline = Pipeline::empty(new_v7());
        let err = pipeline.move_to_next().unwrap_err();
        assert!(matches!(err, Error::InvalidState(ref m) if m == NO_PIPELINE_MSG));
    }

    #[test]
    fn test_move_to_next_does_not_require_completion() {
        let mut pipeline = pipeline_with(&["Phone Screen", "Onsite"]);
        let onsite = id_of(&pipeline, "Onsite");

        let next = pipeline.move_to_next().unwrap();
        assert_eq!(next.id, onsite);
        assert_eq!(pipeline.current_stage_id(), Some(onsite));
    }

    #[test]
    fn test_move_to_next_exhausted_is_invalid_state() {
        let mut pipeline = pipeline_with(&["Phone Screen", "Onsite"]);
        let phone = id_of(&pipeline, "Phone Screen");
        let onsite = id_of(&pipeline, "Onsite");

        pipeline
            .complete_stage(phone, StageResult::Pass, None, now())
            .unwrap();
        pipeline
            .complete_stage(onsite, StageResult::Pass, None, now())
            .unwrap();

        let err = pipeline.move_to_next().unwrap_err();
        assert!(matches!(err, Error::InvalidState(ref m) if m == FINAL_STAGE_MSG));
        // Pointer stays where it was.
        assert_eq!(pipeline.current_stage_id(), Some(phone));
    }

    #[test]
    fn test_move_to_next_at_last_stage_is_invalid_state() {
        let mut pipeline = pipeline_with(&["Phone Screen", "Onsite"]);
        pipeline.move_to_next().unwrap();
        assert!(matches!(
            pipeline.move_to_next(),
            Err(Error::InvalidState(_))
        ));
    }

    #[test]
    fn test_move_to_next_skips_completed_stages() {
        let mut pipeline = pipeline_with(&["Screen", "Take-home", "Onsite", "Offer"]);
        let take_home = id_of(&pipeline, "Take-home");
        let onsite = id_of(&pipeline, "Onsite");
        pipeline
            .complete_stage(take_home, StageResult::Pass, None, now())
            .unwrap();

        let next = pipeline.move_to_next().unwrap();
        assert_eq!(next.id, onsite);
        assert!(!next.is_completed);
    }

    #[test]
    fn test_move_to_next_is_monotonic_and_never_selects_completed() {
        let mut pipeline = pipeline_with(&["A", "B", "C", "D", "E", "F"]);
        let c = id_of(&pipeline, "C");
        let e = id_of(&pipeline, "E");
        pipeline.complete_stage(c, StageResult::Fail, None, now()).unwrap();
        pipeline.complete_stage(e, StageResult::Pass, None, now()).unwrap();

        let mut previous = pipeline.current().unwrap().stage_order;
        let mut visited = Vec::new();
        while let Ok(next) = pipeline.move_to_next() {
            assert!(next.stage_order > previous);
            assert!(!next.is_completed);
            previous = next.stage_order;
            visited.push(next.stage_name.clone());
            pipeline.check_invariants().unwrap();
        }
        assert_eq!(visited, vec!["B", "D", "F"]);
    }

    #[test]
    fn test_move_to_next_uses_order_not_insertion() {
        let mut pipeline = Pipeline::empty(new_v7());
        pipeline
            .add_stage(new_v7(), NewStage::named("First").with_order(1), now())
            .unwrap();
        pipeline
            .add_stage(new_v7(), NewStage::named("Fifth").with_order(5), now())
            .unwrap();
        pipeline
            .add_stage(new_v7(), NewStage::named("Third").with_order(3), now())
            .unwrap();

        assert_eq!(pipeline.move_to_next().unwrap().stage_name, "Third");
        assert_eq!(pipeline.move_to_next().unwrap().stage_name, "Fifth");
    }

    #[test]
    fn test_delete_non_current_leaves_pointer() {
        let mut pipeline = pipeline_with(&["Phone Screen", "Onsite"]);
        let current = pipeline.current_stage_id();
        let onsite = id_of(&pipeline, "Onsite");

        let removed = pipeline.delete_stage(onsite).unwrap();
        assert_eq!(removed.current, CurrentChange::Unchanged);
        assert_eq!(pipeline.current_stage_id(), current);
    }

    #[test]
    fn test_delete_current_reassigns_to_lowest_remaining_id() {
        let mut pipeline = Pipeline::empty(new_v7());
        // Orders descend while ids ascend.
        let ids: Vec<Uuid> = (1..=3u128).map(Uuid::from_u128).collect();
        for (i, id) in ids.iter().enumerate() {
            pipeline
                .add_stage(*id, NewStage::named(format!("S{}", i)).with_order(10 - i as i32), now())
                .unwrap();
        }
        assert_eq!(pipeline.current_stage_id(), Some(ids[0]));

        let removed = pipeline.delete_stage(ids[0]).unwrap();
        assert_eq!(removed.current, CurrentChange::Reassigned(Some(ids[1])));

        let removed = pipeline.delete_stage(ids[1]).unwrap();
        assert_eq!(removed.current, CurrentChange::Reassigned(Some(ids[2])));
        pipeline.check_invariants().unwrap();
    }

    #[test]
    fn test_delete_last_stage_clears_pointer() {
        let mut pipeline = pipeline_with(&["Only"]);
        let only = pipeline.current_stage_id().unwrap();

        let removed = pipeline.delete_stage(only).unwrap();
        assert_eq!(removed.current, CurrentChange::Reassigned(None));
        assert!(pipeline.current_stage_id().is_none());
        assert!(matches!(
            pipeline.move_to_next(),
            Err(Error::InvalidState(_))
        ));
    }

    #[test]
    fn test_delete_unknown_stage_is_not_found() {
        let mut pipeline = pipeline_with(&["Only"]);
        assert!(matches!(
            pipeline.delete_stage(new_v7()),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_add_after_all_deleted_becomes_current_again() {
        let mut pipeline = pipeline_with(&["Only"]);
        let only = pipeline.current_stage_id().unwrap();
        pipeline.delete_stage(only).unwrap();

        let added = pipeline
            .add_stage(new_v7(), NewStage::named("Fresh"), now())
            .unwrap();
        assert!(added.became_current);
        assert_eq!(added.stage.stage_order, 1);
    }

    #[test]
    fn test_update_changes_fields_but_not_flags_or_pointer() {
        let mut pipeline = pipeline_with(&["Phone Screen", "Onsite"]);
        let current = pipeline.current_stage_id();
        let onsite = id_of(&pipeline, "Onsite");

        let updated = pipeline
            .update_stage(
                onsite,
                StageChanges {
                    stage_name: Some("Final Onsite".into()),
                    stage_order: Some(5),
                    feedback_notes: Some(Some("panel of four".into())),
                    result: Some(StageResult::Pass),
                },
            )
            .unwrap();

        assert_eq!(updated.stage_name, "Final Onsite");
        assert_eq!(updated.stage_order, 5);
        assert_eq!(updated.result, StageResult::Pass);
        assert!(!updated.is_completed);
        assert!(updated.completed_at.is_none());
        assert_eq!(pipeline.current_stage_id(), current);
        pipeline.check_invariants().unwrap();
    }

    #[test]
    fn test_update_can_clear_notes() {
        let mut pipeline = pipeline_with(&["Phone Screen"]);
        let id = pipeline.current_stage_id().unwrap();
        pipeline
            .update_stage(
                id,
                StageChanges {
                    feedback_notes: Some(Some("x".into())),
                    ..Default::default()
                },
            )
            .unwrap();
        let cleared = pipeline
            .update_stage(
                id,
                StageChanges {
                    feedback_notes: Some(None),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(cleared.feedback_notes.is_none());
    }

    #[test]
    fn test_update_order_collision_is_conflict() {
        let mut pipeline = pipeline_with(&["Phone Screen", "Onsite"]);
        let onsite = id_of(&pipeline, "Onsite");
        let err = pipeline
            .update_stage(
                onsite,
                StageChanges {
                    stage_order: Some(1),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        // Keeping its own order is not a collision.
        pipeline
            .update_stage(
                onsite,
                StageChanges {
                    stage_order: Some(2),
                    ..Default::default()
                },
            )
            .unwrap();
    }

    #[test]
    fn test_reorder_changes_move_to_next_target() {
        let mut pipeline = pipeline_with(&["A", "B", "C"]);
        let c = id_of(&pipeline, "C");
        let b = id_of(&pipeline, "B");
        pipeline
            .update_stage(
                b,
                StageChanges {
                    stage_order: Some(9),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(pipeline.move_to_next().unwrap().id, c);
    }

    #[test]
    fn test_seed_manual_defaults_order_to_position() {
        let list = vec![
            SeedStage {
                stage_name: "Recruiter Call".into(),
                stage_order: None,
            },
            SeedStage {
                stage_name: "Onsite".into(),
                stage_order: Some(4),
            },
            SeedStage {
                stage_name: "Offer".into(),
                stage_order: None,
            },
        ];
        let drafts = manual_seed_stages(&list);
        let orders: Vec<Option<i32>> = drafts.iter().map(|d| d.stage_order).collect();
        assert_eq!(orders, vec![Some(1), Some(4), Some(3)]);

        let mut pipeline = Pipeline::empty(new_v7());
        let created = pipeline.seed(drafts, new_v7, now()).unwrap();
        // Current is the first created stage, not the lowest order.
        assert_eq!(pipeline.current_stage_id(), Some(created[0].id));
        pipeline.check_invariants().unwrap();
    }

    #[test]
    fn test_seed_from_template_makes_first_template_stage_current() {
        let template_id = new_v7();
        let template = vec![
            TemplateStage {
                id: new_v7(),
                template_id,
                stage_name: "Onsite".into(),
                stage_order: 2,
            },
            TemplateStage {
                id: new_v7(),
                template_id,
                stage_name: "Phone Screen".into(),
                stage_order: 1,
            },
        ];

        let mut pipeline = Pipeline::empty(new_v7());
        pipeline
            .seed(template_seed_stages(&template), new_v7, now())
            .unwrap();

        assert_eq!(pipeline.current().unwrap().stage_name, "Phone Screen");
        assert_eq!(pipeline.stages().len(), 2);
    }

    #[test]
    fn test_seed_duplicate_orders_fail() {
        let list = vec![
            SeedStage {
                stage_name: "A".into(),
                stage_order: Some(1),
            },
            SeedStage {
                stage_name: "B".into(),
                stage_order: Some(1),
            },
        ];
        let mut pipeline = Pipeline::empty(new_v7());
        let err = pipeline
            .seed(manual_seed_stages(&list), new_v7, now())
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn test_stage_seed_from_parts() {
        let template = new_v7();
        let list = vec![SeedStage {
            stage_name: "A".into(),
            stage_order: None,
        }];
        assert_eq!(
            StageSeed::from_parts(Some(template), Some(list.clone())),
            StageSeed::Template(template)
        );
        assert_eq!(
            StageSeed::from_parts(None, Some(list.clone())),
            StageSeed::Manual(list)
        );
        assert!(StageSeed::from_parts(None, Some(Vec::new())).is_none());
        assert!(StageSeed::from_parts(None, None).is_none());
    }

    #[test]
    fn test_loaded_pipeline_is_sorted_by_order() {
        let app = new_v7();
        let make = |name: &str, order: i32| Stage {
            id: new_v7(),
            application_id: app,
            stage_name: name.into(),
            stage_order: order,
            feedback_notes: None,
            result: StageResult::Pending,
            is_completed: false,
            completed_at: None,
            created_at: now(),
        };
        let stages = vec![make("C", 3), make("A", 1), make("B", 2)];
        let current = stages[1].id;
        let pipeline = Pipeline::new(app, Some(current), stages);

        let names: Vec<&str> = pipeline.stages().iter().map(|s| s.stage_name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        pipeline.check_invariants().unwrap();
    }

    #[test]
    fn test_invariants_detect_foreign_current() {
        let pipeline = Pipeline::new(new_v7(), Some(new_v7()), Vec::new());
        assert!(matches!(
            pipeline.check_invariants(),
            Err(Error::Internal(_))
        ));
    }
}

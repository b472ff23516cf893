//! Action plan entity - corrective and preventive actions (Plano de Ação)

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::entity::{default_revision, Entity};
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::numbering::SequenceFamily;

/// Action item status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    #[default]
    Open,
    InProgress,
    Done,
    Cancelled,
}

impl ActionStatus {
    /// Done or cancelled
    pub fn is_finished(&self) -> bool {
        matches!(self, ActionStatus::Done | ActionStatus::Cancelled)
    }
}

impl std::fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionStatus::Open => write!(f, "open"),
            ActionStatus::InProgress => write!(f, "in_progress"),
            ActionStatus::Done => write!(f, "done"),
            ActionStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Plan status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    #[default]
    Open,
    InProgress,
    Completed,
    Verified,
}

impl std::fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanStatus::Open => write!(f, "open"),
            PlanStatus::InProgress => write!(f, "in_progress"),
            PlanStatus::Completed => write!(f, "completed"),
            PlanStatus::Verified => write!(f, "verified"),
        }
    }
}

impl std::str::FromStr for PlanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "open" => Ok(PlanStatus::Open),
            "in_progress" => Ok(PlanStatus::InProgress),
            "completed" => Ok(PlanStatus::Completed),
            "verified" => Ok(PlanStatus::Verified),
            _ => Err(format!(
                "Invalid plan status: {}. Use open, in_progress, completed, or verified",
                s
            )),
        }
    }
}

/// One action: what, who, when
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionItem {
    /// 1-based position in the plan
    pub action_number: u32,

    pub what: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub who: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<NaiveDate>,

    #[serde(default)]
    pub status: ActionStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
}

impl ActionItem {
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.status.is_finished() && self.due.is_some_and(|d| d < today)
    }
}

/// Errors from plan workflow operations
#[derive(Debug, Error, PartialEq)]
pub enum PlanError {
    #[error("{0} is already verified")]
    AlreadyVerified(String),

    #[error("action {0} not found")]
    ActionNotFound(u32),

    #[error("action {0} is already done")]
    ActionDone(u32),

    #[error("{reference} is {status}; only completed plans can be verified")]
    NotCompleted { reference: String, status: PlanStatus },
}

/// Corrective-action plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionPlan {
    pub id: EntityId,

    /// Sequential number (e.g., "PA-0009")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,

    pub title: String,

    /// RNC that triggered the plan (number or id)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_rnc: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_cause: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<ActionItem>,

    #[serde(default)]
    pub status: PlanStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_by: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    pub created: DateTime<Utc>,

    pub author: String,

    #[serde(default = "default_revision")]
    pub revision: u32,
}

impl Entity for ActionPlan {
    const PREFIX: EntityPrefix = EntityPrefix::Plan;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn number(&self) -> Option<&str> {
        self.number.as_deref()
    }

    fn family(&self) -> SequenceFamily {
        SequenceFamily::ActionPlan
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn state(&self) -> String {
        self.status.to_string()
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }

    fn author(&self) -> &str {
        &self.author
    }
}

impl ActionPlan {
    pub fn new(title: String, author: String) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Plan),
            number: None,
            title,
            origin_rnc: None,
            root_cause: None,
            actions: Vec::new(),
            status: PlanStatus::default(),
            verified_by: None,
            verified_date: None,
            tags: Vec::new(),
            created: Utc::now(),
            author,
            revision: 1,
        }
    }

    /// Append an action and return its number.
    ///
    /// A completed plan that receives new work goes back in progress.
    pub fn add_action(&mut self, what: String, who: Option<String>, due: Option<NaiveDate>) -> u32 {
        let action_number = self
            .actions
            .iter()
            .map(|a| a.action_number)
            .max()
            .unwrap_or(0)
            + 1;
        self.actions.push(ActionItem {
            action_number,
            what,
            who,
            due,
            status: ActionStatus::Open,
            completed_date: None,
            evidence: None,
        });
        if self.status != PlanStatus::Open {
            self.status = PlanStatus::InProgress;
        }
        action_number
    }

    /// Mark action `n` done and advance the plan
    pub fn complete_action(
        &mut self,
        n: u32,
        date: NaiveDate,
        evidence: Option<String>,
    ) -> Result<(), PlanError> {
        if self.status == PlanStatus::Verified {
            return Err(PlanError::AlreadyVerified(self.display_ref()));
        }
        let action = self
            .actions
            .iter_mut()
            .find(|a| a.action_number == n)
            .ok_or(PlanError::ActionNotFound(n))?;
        if action.status == ActionStatus::Done {
            return Err(PlanError::ActionDone(n));
        }

        action.status = ActionStatus::Done;
        action.completed_date = Some(date);
        if evidence.is_some() {
            action.evidence = evidence;
        }

        self.status = if self.actions.iter().all(|a| a.status.is_finished()) {
            PlanStatus::Completed
        } else {
            PlanStatus::InProgress
        };
        self.revision += 1;
        Ok(())
    }

    /// Confirm the actions were effective; only a completed plan can be verified
    pub fn verify(&mut self, by: String, date: NaiveDate) -> Result<(), PlanError> {
        if self.status != PlanStatus::Completed {
            return Err(PlanError::NotCompleted {
                reference: self.display_ref(),
                status: self.status,
            });
        }
        self.status = PlanStatus::Verified;
        self.verified_by = Some(by);
        self.verified_date = Some(date);
        self.revision += 1;
        Ok(())
    }

    pub fn overdue(&self, today: NaiveDate) -> Vec<&ActionItem> {
        self.actions.iter().filter(|a| a.is_overdue(today)).collect()
    }

    /// Finished actions over all actions, 0.0 to 1.0
    pub fn progress(&self) -> f64 {
        if self.actions.is_empty() {
            return 0.0;
        }
        let finished = self.actions.iter().filter(|a| a.status.is_finished()).count();
        finished as f64 / self.actions.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn plan() -> ActionPlan {
        let mut plan = ActionPlan::new("Stop bore drift on lathe 3".to_string(), "qa".to_string());
        plan.origin_rnc = Some("RNC-0042".to_string());
        plan
    }

    #[test]
    fn test_add_action_numbers_sequentially() {
        let mut plan = plan();
        assert_eq!(plan.add_action("Replace spindle bearing".to_string(), None, None), 1);
        assert_eq!(
            plan.add_action("Train operators".to_string(), Some("ana".to_string()), None),
            2
        );
        assert_eq!(plan.status, PlanStatus::Open);
    }

    #[test]
    fn test_plan_auto_completes() {
        let mut plan = plan();
        plan.add_action("a".to_string(), None, None);
        plan.add_action("b".to_string(), None, None);

        plan.complete_action(1, date(2025, 3, 1), None).unwrap();
        assert_eq!(plan.status, PlanStatus::InProgress);
        assert!((plan.progress() - 0.5).abs() < 1e-9);

        plan.complete_action(2, date(2025, 3, 2), Some("photo".to_string()))
            .unwrap();
        assert_eq!(plan.status, PlanStatus::Completed);
        assert!((plan.progress() - 1.0).abs() < 1e-9);
        assert_eq!(plan.revision, 3);
    }

    #[test]
    fn test_new_action_reopens_completed_plan() {
        let mut plan = plan();
        plan.add_action("a".to_string(), None, None);
        plan.complete_action(1, date(2025, 3, 1), None).unwrap();
        assert_eq!(plan.status, PlanStatus::Completed);

        plan.add_action("follow-up audit".to_string(), None, None);
        assert_eq!(plan.status, PlanStatus::InProgress);
    }

    #[test]
    fn test_complete_action_errors() {
        let mut plan = plan();
        plan.add_action("a".to_string(), None, None);
        assert_eq!(
            plan.complete_action(9, date(2025, 3, 1), None),
            Err(PlanError::ActionNotFound(9))
        );
        plan.complete_action(1, date(2025, 3, 1), None).unwrap();
        assert_eq!(
            plan.complete_action(1, date(2025, 3, 1), None),
            Err(PlanError::ActionDone(1))
        );
    }

    #[test]
    fn test_verify_requires_completion() {
        let mut plan = plan();
        plan.add_action("a".to_string(), None, None);
        assert!(matches!(
            plan.verify("auditor".to_string(), date(2025, 4, 1)),
            Err(PlanError::NotCompleted { .. })
        ));

        plan.complete_action(1, date(2025, 3, 1), None).unwrap();
        plan.verify("auditor".to_string(), date(2025, 4, 1)).unwrap();
        assert_eq!(plan.status, PlanStatus::Verified);
    }

    #[test]
    fn test_overdue() {
        let mut plan = plan();
        plan.add_action("late".to_string(), None, Some(date(2025, 1, 10)));
        plan.add_action("on time".to_string(), None, Some(date(2025, 2, 10)));
        plan.add_action("no date".to_string(), None, None);

        let overdue = plan.overdue(date(2025, 1, 20));
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].what, "late");

        plan.complete_action(1, date(2025, 1, 21), None).unwrap();
        assert!(plan.overdue(date(2025, 1, 22)).is_empty());
    }

    #[test]
    fn test_progress_empty() {
        assert_eq!(plan().progress(), 0.0);
    }
}

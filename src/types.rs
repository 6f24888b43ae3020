//! Domain enumerations and wire types shared across services and HTTP handlers.

use serde::{Deserialize, Serialize};

/// Fixed milestone template applied when a deal enters a trigger stage.
pub struct MilestoneTemplate {
    pub title: &'static str,
    /// Days after the transition for `scheduled_date`, if any.
    pub days_out: Option<i64>,
}

/// Position in the sales pipeline, ordered from first contact to close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealStage {
    Lead,
    Qualified,
    Showing,
    Offer,
    Application,
    Contract,
    Closing,
    ClosedWon,
    ClosedLost,
    Lost,
}

impl DealStage {
    pub const ALL: &'static [DealStage] = &[
        DealStage::Lead,
        DealStage::Qualified,
        DealStage::Showing,
        DealStage::Offer,
        DealStage::Application,
        DealStage::Contract,
        DealStage::Closing,
        DealStage::ClosedWon,
        DealStage::ClosedLost,
        DealStage::Lost,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DealStage::Lead => "lead",
            DealStage::Qualified => "qualified",
            DealStage::Showing => "showing",
            DealStage::Offer => "offer",
            DealStage::Application => "application",
            DealStage::Contract => "contract",
            DealStage::Closing => "closing",
            DealStage::ClosedWon => "closed_won",
            DealStage::ClosedLost => "closed_lost",
            DealStage::Lost => "lost",
        }
    }

    /// Parse a stage code from the wire. Unknown codes are a validation error
    /// at the caller.
    pub fn parse(code: &str) -> Option<DealStage> {
        Self::ALL.iter().copied().find(|s| s.as_str() == code)
    }

    /// Terminal stages close the deal and stamp `closed_at`.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DealStage::ClosedWon | DealStage::ClosedLost | DealStage::Lost
        )
    }

    /// Deal status implied by entering this stage.
    pub fn implied_status(&self) -> DealStatus {
        match self {
            DealStage::ClosedWon => DealStatus::ClosedWon,
            DealStage::ClosedLost | DealStage::Lost => DealStatus::ClosedLost,
            _ => DealStatus::Active,
        }
    }

    /// Checklist rows auto-created on entry. Empty for non-trigger stages.
    ///
    /// Re-entering a trigger stage applies the template again; dedup is
    /// intentionally not attempted here.
    pub fn trigger_milestones(&self) -> &'static [MilestoneTemplate] {
        match self {
            DealStage::Application => &[
                MilestoneTemplate { title: "Submit mortgage application", days_out: Some(1) },
                MilestoneTemplate { title: "Deliver supporting documents to lender", days_out: Some(3) },
                MilestoneTemplate { title: "Order appraisal", days_out: Some(7) },
                MilestoneTemplate { title: "Receive loan commitment", days_out: Some(21) },
            ],
            DealStage::Contract => &[
                MilestoneTemplate { title: "Deposit earnest money", days_out: Some(2) },
                MilestoneTemplate { title: "Schedule home inspection", days_out: Some(5) },
                MilestoneTemplate { title: "Review title report", days_out: Some(10) },
                MilestoneTemplate { title: "Clear financing contingency", days_out: Some(17) },
                MilestoneTemplate { title: "Final walkthrough", days_out: None },
            ],
            _ => &[],
        }
    }
}

/// Deal lifecycle status. `closed_at` is set iff the status is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealStatus {
    Active,
    ClosedWon,
    ClosedLost,
}

impl DealStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DealStatus::Active => "active",
            DealStatus::ClosedWon => "closed_won",
            DealStatus::ClosedLost => "closed_lost",
        }
    }
}

/// Task completion status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Closed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Closed => "closed",
        }
    }

    pub fn parse(code: &str) -> Option<TaskStatus> {
        match code {
            "todo" => Some(TaskStatus::Todo),
            "in_progress" => Some(TaskStatus::InProgress),
            "closed" => Some(TaskStatus::Closed),
            _ => None,
        }
    }
}

/// Task priority level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

/// Notification feed category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    TaskDue,
    TaskOverdue,
    TaskAssigned,
    DealStage,
}

impl NotificationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationCategory::TaskDue => "task_due",
            NotificationCategory::TaskOverdue => "task_overdue",
            NotificationCategory::TaskAssigned => "task_assigned",
            NotificationCategory::DealStage => "deal_stage",
        }
    }

    pub fn parse(code: &str) -> Option<NotificationCategory> {
        match code {
            "task_due" => Some(NotificationCategory::TaskDue),
            "task_overdue" => Some(NotificationCategory::TaskOverdue),
            "task_assigned" => Some(NotificationCategory::TaskAssigned),
            "deal_stage" => Some(NotificationCategory::DealStage),
            _ => None,
        }
    }
}

/// Outcome of a stage transition, echoed back to the caller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageChangeOutcome {
    pub id: String,
    pub current_stage: String,
    pub status: String,
    pub milestones_created: usize,
}

/// Aggregate counters for the dashboard page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub active_deals: usize,
    pub pipeline_value: f64,
    pub closed_won_this_month: usize,
    pub commission_this_month: f64,
    pub open_tasks: usize,
    pub overdue_tasks: usize,
    pub unread_notifications: usize,
}

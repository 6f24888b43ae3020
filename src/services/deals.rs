//! Deal stage transitions.

use chrono::{Duration, NaiveDate, Utc};
use uuid::Uuid;

use crate::db::{CrmDb, DbDealActivity, DbMilestone};
use crate::error::AppError;
use crate::types::{DealStage, StageChangeOutcome};

/// Minimum length of a trimmed lost reason.
const MIN_LOST_REASON_LEN: usize = 10;

/// Move a deal to a new pipeline stage.
///
/// Validates the stage code and, for `lost`, the reason, then applies the
/// row update, any trigger-stage milestones, and the activity entry in a
/// single transaction. Nothing is written when validation fails or the deal
/// is absent, so a rejected transition leaves the deal untouched.
///
/// `today` anchors milestone scheduling; callers pass the current date so the
/// logic stays deterministic under test.
pub fn change_stage(
    db: &CrmDb,
    user_id: &str,
    deal_id: &str,
    stage_code: &str,
    lost_reason: Option<&str>,
    today: NaiveDate,
) -> Result<StageChangeOutcome, AppError> {
    let stage = DealStage::parse(stage_code).ok_or_else(|| {
        AppError::validation_with(
            format!("Unknown stage: {stage_code}"),
            DealStage::ALL.iter().map(|s| s.as_str().to_string()).collect(),
        )
    })?;

    let reason = match stage {
        DealStage::Lost => {
            let trimmed = lost_reason.map(str::trim).unwrap_or_default();
            if trimmed.len() < MIN_LOST_REASON_LEN {
                return Err(AppError::validation(format!(
                    "A lost reason of at least {MIN_LOST_REASON_LEN} characters is required"
                )));
            }
            Some(trimmed.to_string())
        }
        _ => None,
    };

    let deal = db
        .get_deal(user_id, deal_id)?
        .ok_or_else(|| AppError::NotFound("Deal".to_string()))?;

    let from_stage = deal.current_stage.clone();
    let status = stage.implied_status();
    let closed_at = stage.is_terminal().then(|| Utc::now().to_rfc3339());
    let templates = stage.trigger_milestones();

    let outcome = db.with_transaction(|db| {
        db.update_deal_stage(
            deal_id,
            stage.as_str(),
            status.as_str(),
            closed_at.as_deref(),
            reason.as_deref(),
        )?;

        let now = Utc::now().to_rfc3339();
        for template in templates {
            let scheduled_date = template
                .days_out
                .map(|days| (today + Duration::days(days)).format("%Y-%m-%d").to_string());
            db.insert_milestone(&DbMilestone {
                id: Uuid::new_v4().to_string(),
                deal_id: deal_id.to_string(),
                title: template.title.to_string(),
                status: "pending".to_string(),
                scheduled_date,
                completed_at: None,
                created_at: now.clone(),
            })?;
        }

        db.insert_deal_activity(&DbDealActivity {
            id: Uuid::new_v4().to_string(),
            deal_id: deal_id.to_string(),
            user_id: user_id.to_string(),
            title: format!("Stage changed: {from_stage} -> {}", stage.as_str()),
            detail: reason.clone(),
            created_at: now,
        })?;

        Ok(StageChangeOutcome {
            id: deal_id.to_string(),
            current_stage: stage.as_str().to_string(),
            status: status.as_str().to_string(),
            milestones_created: templates.len(),
        })
    })?;

    tracing::info!(
        deal_id,
        stage = stage.as_str(),
        milestones = outcome.milestones_created,
        "deal stage changed"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::{sample_deal, seed_user, test_db};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 1).expect("valid date")
    }

    #[test]
    fn test_unknown_stage_is_rejected() {
        let db = test_db();
        let user = seed_user(&db, "u1", "agent@porchlight.test");
        db.upsert_deal(&sample_deal("d1", &user, "Maple Ave"))
            .expect("upsert");

        let err = change_stage(&db, &user, "d1", "escrow", None, today())
            .expect_err("unknown stage must fail");
        assert!(matches!(err, AppError::Validation { .. }));

        let deal = db.get_deal(&user, "d1").expect("get").expect("exists");
        assert_eq!(deal.current_stage, "lead");
    }

    #[test]
    fn test_foreign_deal_is_not_found() {
        let db = test_db();
        let owner = seed_user(&db, "u1", "a@porchlight.test");
        let other = seed_user(&db, "u2", "b@porchlight.test");
        db.upsert_deal(&sample_deal("d1", &owner, "Owned"))
            .expect("upsert");

        let err = change_stage(&db, &other, "d1", "qualified", None, today())
            .expect_err("foreign deal must look absent");
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_short_lost_reason_leaves_deal_unchanged() {
        let db = test_db();
        let user = seed_user(&db, "u1", "agent@porchlight.test");
        db.upsert_deal(&sample_deal("d1", &user, "Maple Ave"))
            .expect("upsert");

        // Whitespace padding must not count toward the minimum
        let err = change_stage(&db, &user, "d1", "lost", Some("  too bad   "), today())
            .expect_err("short reason must fail");
        assert!(matches!(err, AppError::Validation { .. }));

        let deal = db.get_deal(&user, "d1").expect("get").expect("exists");
        assert_eq!(deal.current_stage, "lead");
        assert_eq!(deal.status, "active");
        assert!(deal.lost_reason.is_none());
        assert!(db.get_deal_activity("d1").expect("activity").is_empty());
    }

    #[test]
    fn test_lost_with_reason_closes_deal() {
        let db = test_db();
        let user = seed_user(&db, "u1", "agent@porchlight.test");
        db.upsert_deal(&sample_deal("d1", &user, "Maple Ave"))
            .expect("upsert");

        let outcome = change_stage(
            &db,
            &user,
            "d1",
            "lost",
            Some("Buyer backed out after inspection"),
            today(),
        )
        .expect("transition");
        assert_eq!(outcome.status, "closed_lost");
        assert_eq!(outcome.milestones_created, 0);

        let deal = db.get_deal(&user, "d1").expect("get").expect("exists");
        assert_eq!(deal.current_stage, "lost");
        assert_eq!(deal.status, "closed_lost");
        assert!(deal.closed_at.is_some());
        assert_eq!(
            deal.lost_reason.as_deref(),
            Some("Buyer backed out after inspection")
        );
    }

    #[test]
    fn test_closed_won_stamps_closed_at() {
        let db = test_db();
        let user = seed_user(&db, "u1", "agent@porchlight.test");
        db.upsert_deal(&sample_deal("d1", &user, "Maple Ave"))
            .expect("upsert");

        let outcome =
            change_stage(&db, &user, "d1", "closed_won", None, today()).expect("transition");
        assert_eq!(outcome.status, "closed_won");

        let deal = db.get_deal(&user, "d1").expect("get").expect("exists");
        assert!(deal.closed_at.is_some());
    }

    #[test]
    fn test_trigger_stage_creates_milestones_and_activity() {
        let db = test_db();
        let user = seed_user(&db, "u1", "agent@porchlight.test");
        db.upsert_deal(&sample_deal("d1", &user, "Maple Ave"))
            .expect("upsert");

        let outcome =
            change_stage(&db, &user, "d1", "contract", None, today()).expect("transition");
        assert_eq!(outcome.milestones_created, 5);

        let milestones = db.get_milestones("d1").expect("milestones");
        assert_eq!(milestones.len(), 5);
        // days_out = 2 lands on June 3rd; the walkthrough stays unscheduled
        assert!(milestones
            .iter()
            .any(|m| m.title == "Deposit earnest money"
                && m.scheduled_date.as_deref() == Some("2026-06-03")));
        assert!(milestones
            .iter()
            .any(|m| m.title == "Final walkthrough" && m.scheduled_date.is_none()));

        let activity = db.get_deal_activity("d1").expect("activity");
        assert_eq!(activity.len(), 1);
        assert_eq!(activity[0].title, "Stage changed: lead -> contract");
    }

    #[test]
    fn test_reentering_trigger_stage_applies_template_again() {
        let db = test_db();
        let user = seed_user(&db, "u1", "agent@porchlight.test");
        db.upsert_deal(&sample_deal("d1", &user, "Maple Ave"))
            .expect("upsert");

        change_stage(&db, &user, "d1", "application", None, today()).expect("first");
        change_stage(&db, &user, "d1", "showing", None, today()).expect("back");
        change_stage(&db, &user, "d1", "application", None, today()).expect("second");

        let milestones = db.get_milestones("d1").expect("milestones");
        assert_eq!(milestones.len(), 8);
    }

    #[test]
    fn test_non_trigger_stage_keeps_deal_active() {
        let db = test_db();
        let user = seed_user(&db, "u1", "agent@porchlight.test");
        db.upsert_deal(&sample_deal("d1", &user, "Maple Ave"))
            .expect("upsert");

        let outcome =
            change_stage(&db, &user, "d1", "qualified", None, today()).expect("transition");
        assert_eq!(outcome.status, "active");
        assert_eq!(outcome.milestones_created, 0);

        let deal = db.get_deal(&user, "d1").expect("get").expect("exists");
        assert!(deal.closed_at.is_none());
        assert!(db.get_milestones("d1").expect("milestones").is_empty());
    }
}

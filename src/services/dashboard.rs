//! Dashboard aggregates.

use chrono::NaiveDate;
use rusqlite::params;

use crate::db::CrmDb;
use crate::error::AppError;
use crate::types::DashboardStats;

/// Compute the dashboard counters for one user.
///
/// "This month" is the calendar month containing `today`. Soft-deleted rows
/// are excluded throughout.
pub fn stats(db: &CrmDb, user_id: &str, today: NaiveDate) -> Result<DashboardStats, AppError> {
    let today_str = today.format("%Y-%m-%d").to_string();
    let month_start = today.format("%Y-%m-01").to_string();

    let (active_deals, pipeline_value): (i64, Option<f64>) = db.conn_ref().query_row(
        "SELECT COUNT(*), SUM(deal_value) FROM deals
         WHERE user_id = ?1 AND status = 'active' AND is_deleted = 0",
        params![user_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    // closed_at is RFC 3339; a YYYY-MM-DD prefix comparison still orders
    // correctly against it
    let (closed_won_this_month, commission_this_month): (i64, Option<f64>) =
        db.conn_ref().query_row(
            "SELECT COUNT(*), SUM(commission_amount) FROM deals
             WHERE user_id = ?1
               AND status = 'closed_won'
               AND is_deleted = 0
               AND closed_at >= ?2",
            params![user_id, month_start],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

    let (open_tasks, overdue_tasks): (i64, i64) = db.conn_ref().query_row(
        "SELECT
            COUNT(*),
            SUM(CASE WHEN due_date IS NOT NULL AND due_date < ?2 THEN 1 ELSE 0 END)
         FROM tasks
         WHERE user_id = ?1 AND status IN ('todo', 'in_progress')",
        params![user_id, today_str],
        |row| Ok((row.get(0)?, row.get::<_, Option<i64>>(1)?.unwrap_or(0))),
    )?;

    let unread_notifications = db.count_unread_notifications(user_id)?;

    Ok(DashboardStats {
        active_deals: active_deals as usize,
        pipeline_value: pipeline_value.unwrap_or(0.0),
        closed_won_this_month: closed_won_this_month as usize,
        commission_this_month: commission_this_month.unwrap_or(0.0),
        open_tasks: open_tasks as usize,
        overdue_tasks: overdue_tasks as usize,
        unread_notifications,
    })
}

use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::MySqlPool;
use utoipa::ToSchema;

/// Audit entry joined with the employee it concerns, plus a relative age
/// label for display. The underlying rows are append-only; nothing ever
/// updates or deletes them.
#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct ActivityView {
    #[schema(example = "Jane Doe")]
    pub employee_name: String,

    #[schema(example = "Check-in")]
    pub action: String,

    #[schema(example = "Checked in at 08:15 15/01/2026", nullable = true)]
    pub detail: Option<String>,

    #[schema(example = "2026-01-15T08:15:00", value_type = String, format = "date-time")]
    pub timestamp: NaiveDateTime,

    #[sqlx(default)]
    #[schema(example = "5 minutes ago")]
    pub time_ago: String,
}

/// Append one entry. Failures are logged and swallowed so a broken audit
/// write never voids the attendance event it describes.
pub async fn record(pool: &MySqlPool, employee_id: u64, action: &str, detail: &str) {
    let result = sqlx::query(
        r#"
        INSERT INTO recent_activity (employee_id, action, detail, timestamp)
        VALUES (?, ?, ?, NOW())
        "#,
    )
    .bind(employee_id)
    .bind(action)
    .bind(detail)
    .execute(pool)
    .await;

    if let Err(e) = result {
        tracing::error!(error = %e, employee_id, action, "Failed to record activity");
    }
}

/// Newest entries first, joined against the roster; rows whose employee has
/// been removed drop out of the join.
pub async fn recent(
    pool: &MySqlPool,
    limit: u32,
    now: NaiveDateTime,
) -> Result<Vec<ActivityView>, sqlx::Error> {
    let mut entries = sqlx::query_as::<_, ActivityView>(
        r#"
        SELECT e.full_name AS employee_name, a.action, a.detail, a.timestamp
        FROM recent_activity a
        JOIN employees e ON e.id = a.employee_id
        ORDER BY a.timestamp DESC
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    for entry in &mut entries {
        let age = (now - entry.timestamp).num_seconds().max(0);
        entry.time_ago = humanize_age(age);
    }

    Ok(entries)
}

/// Relative label: under a minute is "just now", under an hour counts
/// minutes, anything older counts hours.
pub fn humanize_age(age_seconds: i64) -> String {
    if age_seconds < 60 {
        "just now".to_string()
    } else if age_seconds < 3600 {
        format!("{} minutes ago", age_seconds / 60)
    } else {
        format!("{} hours ago", age_seconds / 3600)
    }
}

#[cfg(test)]
mod tests {
    use super::humanize_age;

    #[test]
    fn fresh_entries_read_just_now() {
        assert_eq!(humanize_age(0), "just now");
        assert_eq!(humanize_age(59), "just now");
    }

    #[test]
    fn minute_range_counts_minutes() {
        assert_eq!(humanize_age(60), "1 minutes ago");
        assert_eq!(humanize_age(59 * 60 + 59), "59 minutes ago");
    }

    #[test]
    fn hour_range_counts_hours() {
        assert_eq!(humanize_age(3600), "1 hours ago");
        assert_eq!(humanize_age(26 * 3600), "26 hours ago");
    }
}

use chrono::NaiveDate;
use sqlx::sqlite::SqliteExecutor;
use sqlx::Row;

use travo_core::OrderNumberFormat;

use super::RepositoryError;

/// Next order number for the month of `on`: scan every number sharing the
/// month prefix, take the highest parseable sequence, add one (or start at
/// one). Must be called inside the terminal-approval `BEGIN IMMEDIATE`
/// transaction; the exclusive write lock is what makes read-max-then-assign
/// safe against a racing terminal approval.
pub async fn next_order_number<'e, E>(
    executor: E,
    format: &OrderNumberFormat,
    on: NaiveDate,
) -> Result<String, RepositoryError>
where
    E: SqliteExecutor<'e>,
{
    let month_prefix = format.month_prefix(on);
    let pattern = format!("{month_prefix}%");

    let rows = sqlx::query("SELECT order_number FROM travel_order WHERE order_number LIKE ?")
        .bind(&pattern)
        .fetch_all(executor)
        .await?;

    let highest = rows
        .iter()
        .filter_map(|row| row.try_get::<String, _>("order_number").ok())
        .filter_map(|number| format.sequence_of(&month_prefix, &number))
        .max();

    let next = highest.map_or(1, |sequence| sequence + 1);
    Ok(format.render(on, next))
}

use anyhow::Result;
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::time::Duration;

use crate::model::employee::Employee;

/// Hot-path cache for the check-in flow: every matched sample needs the
/// employee's salary fields for the overtime computation.
static EMPLOYEE_CACHE: Lazy<Cache<u64, Employee>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(50_000)
        .time_to_live(Duration::from_secs(3600)) // 1h TTL
        .build()
});

/// Cache-aside lookup.
pub async fn get(pool: &MySqlPool, employee_id: u64) -> Result<Option<Employee>, sqlx::Error> {
    if let Some(hit) = EMPLOYEE_CACHE.get(&employee_id).await {
        return Ok(Some(hit));
    }

    let employee = sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE id = ?")
        .bind(employee_id)
        .fetch_optional(pool)
        .await?;

    if let Some(emp) = &employee {
        EMPLOYEE_CACHE.insert(employee_id, emp.clone()).await;
    }
    Ok(employee)
}

/// Drop a stale entry after an edit or delete.
pub async fn invalidate(employee_id: u64) {
    EMPLOYEE_CACHE.invalidate(&employee_id).await;
}

/// Pre-load active employees in batches.
pub async fn warmup_employee_cache(pool: &MySqlPool, batch_size: usize) -> Result<()> {
    let mut stream =
        sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE active = TRUE").fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let employee = row?;
        batch.push(employee);
        total += 1;

        if batch.len() >= batch_size {
            insert_batch(&batch).await;
            batch.clear();
        }
    }

    if !batch.is_empty() {
        insert_batch(&batch).await;
    }

    log::info!("Employee cache warmup complete: {} active employees", total);
    Ok(())
}

async fn insert_batch(employees: &[Employee]) {
    let futures: Vec<_> = employees
        .iter()
        .map(|e| EMPLOYEE_CACHE.insert(e.id, e.clone()))
        .collect();

    futures::future::join_all(futures).await;
}

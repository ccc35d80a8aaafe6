//! Quarter queries against Redis.
//!
//! Layout:
//! - `capplan:quarter:<id>` hash with `data` (row JSON), `name`, `dataset`
//!   (live dataset text) and an optional `baseline` (baseline dataset text).
//! - `capplan:quarters` sorted set of ids scored by creation time.
//! - `capplan:quarters:active` string holding the id of the active quarter.

use std::collections::HashMap;

use crate::client::{RedisError, RedisPool, RedisResult};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};

const INDEX_KEY: &str = "capplan:quarters";
const ACTIVE_KEY: &str = "capplan:quarters:active";

fn quarter_key(id: &str) -> String {
    format!("capplan:quarter:{}", id)
}

/// Quarter metadata as stored in the `data` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuarterRow {
    pub id: String,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
}

/// A quarter row together with its stored dataset payloads.
#[derive(Debug, Clone)]
pub struct QuarterRecord {
    pub row: QuarterRow,
    pub is_active: bool,
    /// Serialized live dataset.
    pub dataset: String,
    /// Serialized baseline dataset, if one was ever set.
    pub baseline: Option<String>,
}

pub async fn create_quarter(
    pool: &RedisPool,
    id: &str,
    name: &str,
    dataset_json: &str,
) -> RedisResult<()> {
    let mut conn = pool.clone();
    let now = chrono::Utc::now();
    let row = QuarterRow {
        id: id.to_string(),
        name: name.to_string(),
        created_at: now.to_rfc3339(),
        updated_at: now.to_rfc3339(),
    };
    let key = quarter_key(id);
    let _: () = redis::pipe()
        .atomic()
        .hset(&key, "data", serde_json::to_string(&row)?)
        .ignore()
        .hset(&key, "name", name)
        .ignore()
        .hset(&key, "dataset", dataset_json)
        .ignore()
        .zadd(INDEX_KEY, id, now.timestamp_millis())
        .ignore()
        .query_async(&mut conn)
        .await?;
    Ok(())
}

pub async fn get_quarter(pool: &RedisPool, id: &str) -> RedisResult<QuarterRecord> {
    let mut conn = pool.clone();
    let fields: HashMap<String, String> = conn.hgetall(quarter_key(id)).await?;
    let active = active_quarter_id(pool).await?;
    record_from_fields(id, fields, active.as_deref())
}

fn record_from_fields(
    id: &str,
    mut fields: HashMap<String, String>,
    active: Option<&str>,
) -> RedisResult<QuarterRecord> {
    let row_json = fields
        .remove("data")
        .ok_or_else(|| RedisError::NotFound(format!("Quarter not found: {}", id)))?;
    let row: QuarterRow = serde_json::from_str(&row_json)?;
    let dataset = fields.remove("dataset").ok_or_else(|| {
        RedisError::OperationFailed(format!("Quarter {} has no stored dataset", id))
    })?;
    Ok(QuarterRecord {
        is_active: active == Some(row.id.as_str()),
        row,
        dataset,
        baseline: fields.remove("baseline"),
    })
}

/// List quarter rows, most recently created first. Datasets are not loaded.
pub async fn list_quarters(pool: &RedisPool) -> RedisResult<Vec<QuarterRow>> {
    let mut conn = pool.clone();
    let ids: Vec<String> = conn.zrevrange(INDEX_KEY, 0, -1).await?;
    let mut rows = Vec::with_capacity(ids.len());
    for id in ids {
        let json: Option<String> = conn.hget(quarter_key(&id), "data").await?;
        match json {
            Some(j) => rows.push(serde_json::from_str(&j)?),
            None => tracing::warn!(quarter_id = %id, "Indexed quarter has no row, skipping"),
        }
    }
    Ok(rows)
}

/// Id held by the active-quarter register.
pub async fn active_quarter_id(pool: &RedisPool) -> RedisResult<Option<String>> {
    let mut conn = pool.clone();
    let id: Option<String> = conn.get(ACTIVE_KEY).await?;
    Ok(id)
}

pub async fn quarter_exists(pool: &RedisPool, id: &str) -> RedisResult<bool> {
    let mut conn = pool.clone();
    let exists: bool = conn.hexists(quarter_key(id), "data").await?;
    Ok(exists)
}

async fn load_row(pool: &RedisPool, id: &str) -> RedisResult<QuarterRow> {
    let mut conn = pool.clone();
    let json: Option<String> = conn.hget(quarter_key(id), "data").await?;
    match json {
        Some(j) => Ok(serde_json::from_str(&j)?),
        None => Err(RedisError::NotFound(format!("Quarter not found: {}", id))),
    }
}

/// Update the name and/or live dataset of a quarter.
pub async fn update_quarter(
    pool: &RedisPool,
    id: &str,
    name: Option<&str>,
    dataset_json: Option<&str>,
) -> RedisResult<()> {
    let mut row = load_row(pool, id).await?;
    if let Some(n) = name {
        row.name = n.to_string();
    }
    row.updated_at = chrono::Utc::now().to_rfc3339();

    let key = quarter_key(id);
    let mut pipe = redis::pipe();
    pipe.atomic()
        .hset(&key, "data", serde_json::to_string(&row)?)
        .ignore()
        .hset(&key, "name", &row.name)
        .ignore();
    if let Some(json) = dataset_json {
        pipe.hset(&key, "dataset", json).ignore();
    }
    let mut conn = pool.clone();
    let _: () = pipe.query_async(&mut conn).await?;
    Ok(())
}

/// Overwrite the baseline dataset of a quarter.
pub async fn set_baseline(pool: &RedisPool, id: &str, baseline_json: &str) -> RedisResult<()> {
    let mut row = load_row(pool, id).await?;
    row.updated_at = chrono::Utc::now().to_rfc3339();

    let key = quarter_key(id);
    let mut conn = pool.clone();
    let _: () = redis::pipe()
        .atomic()
        .hset(&key, "data", serde_json::to_string(&row)?)
        .ignore()
        .hset(&key, "baseline", baseline_json)
        .ignore()
        .query_async(&mut conn)
        .await?;
    Ok(())
}

/// Sets the register only while the quarter hash exists.
const ACTIVATE_SCRIPT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 0 then
    return 0
end
redis.call('SET', KEYS[2], ARGV[1])
return 1
"#;

/// Removes the hash and index entry, and clears the register if it holds `id`.
const DELETE_SCRIPT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 0 then
    return 0
end
redis.call('DEL', KEYS[1])
redis.call('ZREM', KEYS[2], ARGV[1])
if redis.call('GET', KEYS[3]) == ARGV[1] then
    redis.call('DEL', KEYS[3])
end
return 1
"#;

/// Point the active-quarter register at `id`.
///
/// The register is a single key, so replacing its value deactivates whichever
/// quarter was active before in the same write. The existence check and the
/// write run as one script, so a concurrent delete cannot slip in between.
pub async fn activate_quarter(pool: &RedisPool, id: &str) -> RedisResult<()> {
    let mut conn = pool.clone();
    let updated: i64 = redis::Script::new(ACTIVATE_SCRIPT)
        .key(quarter_key(id))
        .key(ACTIVE_KEY)
        .arg(id)
        .invoke_async(&mut conn)
        .await?;
    if updated == 0 {
        return Err(RedisError::NotFound(format!("Quarter not found: {}", id)));
    }
    Ok(())
}

/// Remove a quarter. Clears the active register when it pointed at `id`; the
/// caller decides which quarter, if any, becomes active next.
pub async fn delete_quarter(pool: &RedisPool, id: &str) -> RedisResult<()> {
    let mut conn = pool.clone();
    let deleted: i64 = redis::Script::new(DELETE_SCRIPT)
        .key(quarter_key(id))
        .key(INDEX_KEY)
        .key(ACTIVE_KEY)
        .arg(id)
        .invoke_async(&mut conn)
        .await?;
    if deleted == 0 {
        return Err(RedisError::NotFound(format!("Quarter not found: {}", id)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    const ROW: &str = r#"{"id":"q1","name":"Q1","created_at":"t0","updated_at":"t1"}"#;

    #[test]
    fn test_record_from_fields_marks_active() {
        let record = record_from_fields(
            "q1",
            fields(&[("data", ROW), ("dataset", "{}"), ("baseline", "{\"projects\":[]}")]),
            Some("q1"),
        )
        .unwrap();
        assert!(record.is_active);
        assert_eq!(record.row.name, "Q1");
        assert_eq!(record.baseline.as_deref(), Some("{\"projects\":[]}"));
    }

    #[test]
    fn test_record_from_fields_without_baseline() {
        let record =
            record_from_fields("q1", fields(&[("data", ROW), ("dataset", "{}")]), Some("q2"))
                .unwrap();
        assert!(!record.is_active);
        assert!(record.baseline.is_none());
    }

    #[test]
    fn test_empty_hash_is_not_found() {
        let err = record_from_fields("missing", HashMap::new(), None).unwrap_err();
        assert!(matches!(err, RedisError::NotFound(_)));
    }

    /// Runs against `CAPPLAN_REDIS_URL` / `REDIS_URL`.
    #[tokio::test]
    #[ignore = "needs a running Redis server"]
    async fn test_delete_clears_register_and_blocks_activation() {
        let pool = crate::init_pool_from_env().await.unwrap();
        let id = format!("test-{}", chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default());
        create_quarter(&pool, &id, "Scratch", "{}").await.unwrap();
        activate_quarter(&pool, &id).await.unwrap();
        assert_eq!(active_quarter_id(&pool).await.unwrap().as_deref(), Some(id.as_str()));

        delete_quarter(&pool, &id).await.unwrap();
        assert_eq!(active_quarter_id(&pool).await.unwrap(), None);
        assert!(!quarter_exists(&pool, &id).await.unwrap());

        let err = activate_quarter(&pool, &id).await.unwrap_err();
        assert!(matches!(err, RedisError::NotFound(_)));
        assert_eq!(active_quarter_id(&pool).await.unwrap(), None);
        assert!(matches!(
            delete_quarter(&pool, &id).await.unwrap_err(),
            RedisError::NotFound(_)
        ));
    }
}

//! Token/cost usage aggregation
//!
//! Sums persisted usage records for one run, grouped by (usage type, usage
//! reason, model name). Usage telemetry is best-effort: database failures
//! during aggregation are logged and absorbed, and the run's metadata is
//! returned without the usage section rather than failing the run.

use sqlx::postgres::PgPool;
use sqlx::Row;
use tracing::{error, info};

use crate::errors::Result;
use crate::types::{RunMetadata, UsageItem};

const COST_PRECISION: usize = 10;

/// One persisted usage record, read-only from the engine's perspective
///
/// Only distinct model calls generate rows; a retried retrieval does not
/// re-query usage, so sums are never double-counted across retry attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageRecord {
    pub organization_id: i64,
    pub run_id: String,
    pub usage_type: String,
    pub llm_usage_reason: Option<String>,
    pub model_name: String,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
    pub embedding_tokens: i64,
    pub cost_in_dollars: f64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Grouped sum over records for one run, the in-memory equivalent of the
/// SQL executed by [`UsageStore::aggregate`]
pub fn summarize(records: &[UsageRecord], run_id: &str, organization_id: i64) -> Vec<UsageRow> {
    let mut groups: Vec<UsageRow> = Vec::new();
    for record in records
        .iter()
        .filter(|r| r.run_id == run_id && r.organization_id == organization_id)
    {
        let existing = groups.iter_mut().find(|g| {
            g.usage_type == record.usage_type
                && g.llm_usage_reason == record.llm_usage_reason
                && g.model_name == record.model_name
        });
        match existing {
            Some(group) => {
                group.input_tokens += record.prompt_tokens;
                group.output_tokens += record.completion_tokens;
                group.total_tokens += record.total_tokens;
                group.embedding_tokens += record.embedding_tokens;
                group.cost_in_dollars += record.cost_in_dollars;
            }
            None => groups.push(UsageRow {
                usage_type: record.usage_type.clone(),
                llm_usage_reason: record.llm_usage_reason.clone(),
                model_name: record.model_name.clone(),
                input_tokens: record.prompt_tokens,
                output_tokens: record.completion_tokens,
                total_tokens: record.total_tokens,
                embedding_tokens: record.embedding_tokens,
                cost_in_dollars: record.cost_in_dollars,
            }),
        }
    }
    groups
}

/// One grouped-sum row from the usage table
#[derive(Debug, Clone, PartialEq)]
pub struct UsageRow {
    pub usage_type: String,
    pub llm_usage_reason: Option<String>,
    pub model_name: String,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub total_tokens: i64,
    pub embedding_tokens: i64,
    pub cost_in_dollars: f64,
}

/// Read handle over the persisted usage store
pub struct UsageStore {
    pool: PgPool,
    schema: String,
}

impl UsageStore {
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Self {
        Self {
            pool,
            schema: schema.into(),
        }
    }

    /// Resolve a bearer token to (organization uid, organization identifier)
    ///
    /// An unknown token resolves to (None, None); it is not an error.
    pub async fn organization_from_bearer_token(
        &self,
        token: &str,
    ) -> Result<(Option<i64>, Option<String>)> {
        let key_query = format!(
            r#"SELECT organization_id FROM "{}".platform_key WHERE key = $1"#,
            self.schema
        );
        let uid: Option<i64> = sqlx::query(&key_query)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?
            .map(|row| row.try_get("organization_id"))
            .transpose()?;

        let Some(uid) = uid else {
            return Ok((None, None));
        };

        let org_query = format!(
            r#"SELECT organization_id FROM "{}".organization WHERE id = $1"#,
            self.schema
        );
        let identifier: Option<String> = sqlx::query(&org_query)
            .bind(uid)
            .fetch_optional(&self.pool)
            .await?
            .map(|row| row.try_get("organization_id"))
            .transpose()?;

        Ok((Some(uid), identifier))
    }

    /// Aggregate usage for a run into its metadata
    ///
    /// Best-effort: any failure is logged and the metadata is returned
    /// unchanged. The grouped sum runs inside a single read transaction.
    pub async fn aggregate(
        &self,
        token: &str,
        mut metadata: RunMetadata,
    ) -> RunMetadata {
        match self.query_usage(token, &metadata.run_id).await {
            Ok(rows) => {
                for (key, item) in rows.iter().map(group_row) {
                    metadata.usage.entry(key).or_default().push(item);
                }
            }
            Err(e) => {
                error!(error = %e, run_id = %metadata.run_id, "Error querying usage metadata");
            }
        }
        metadata
    }

    async fn query_usage(&self, token: &str, run_id: &str) -> Result<Vec<UsageRow>> {
        let (organization_uid, org_id) = self.organization_from_bearer_token(token).await?;
        info!(
            org_id = org_id.as_deref().unwrap_or(""),
            run_id, "Querying usage metadata"
        );

        let query = format!(
            r#"
            SELECT
                usage_type,
                llm_usage_reason,
                model_name,
                SUM(prompt_tokens)::BIGINT AS input_tokens,
                SUM(completion_tokens)::BIGINT AS output_tokens,
                SUM(total_tokens)::BIGINT AS total_tokens,
                SUM(embedding_tokens)::BIGINT AS embedding_tokens,
                SUM(cost_in_dollars)::FLOAT8 AS cost_in_dollars
            FROM "{}".token_usage
            WHERE run_id = $1 AND organization_id = $2
            GROUP BY usage_type, llm_usage_reason, model_name
            "#,
            self.schema
        );

        let mut tx = self.pool.begin().await?;
        let rows = sqlx::query(&query)
            .bind(run_id)
            .bind(organization_uid)
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;

        rows.iter()
            .map(|row| {
                Ok(UsageRow {
                    usage_type: row.try_get("usage_type")?,
                    llm_usage_reason: row.try_get("llm_usage_reason")?,
                    model_name: row.try_get("model_name")?,
                    input_tokens: row.try_get::<Option<i64>, _>("input_tokens")?.unwrap_or(0),
                    output_tokens: row.try_get::<Option<i64>, _>("output_tokens")?.unwrap_or(0),
                    total_tokens: row.try_get::<Option<i64>, _>("total_tokens")?.unwrap_or(0),
                    embedding_tokens: row
                        .try_get::<Option<i64>, _>("embedding_tokens")?
                        .unwrap_or(0),
                    cost_in_dollars: row
                        .try_get::<Option<f64>, _>("cost_in_dollars")?
                        .unwrap_or(0.0),
                })
            })
            .collect()
    }
}

/// Build the reporting key and item for one grouped row
///
/// Rows with a usage reason are keyed as `"{reason}_{usage_type}"` and carry
/// prompt/completion/total token sums; rows without one are pure embedding
/// usage and carry the embedding token sum instead.
pub fn group_row(row: &UsageRow) -> (String, UsageItem) {
    let cost = format_cost(row.cost_in_dollars);
    match &row.llm_usage_reason {
        Some(reason) => (
            format!("{reason}_{}", row.usage_type),
            UsageItem {
                model_name: row.model_name.clone(),
                cost_in_dollars: cost,
                input_tokens: Some(row.input_tokens),
                output_tokens: Some(row.output_tokens),
                total_tokens: Some(row.total_tokens),
                embedding_tokens: None,
            },
        ),
        None => (
            row.usage_type.clone(),
            UsageItem {
                model_name: row.model_name.clone(),
                cost_in_dollars: cost,
                input_tokens: None,
                output_tokens: None,
                total_tokens: None,
                embedding_tokens: Some(row.embedding_tokens),
            },
        ),
    }
}

/// Fixed-precision cost rendering with trailing zeros and the decimal
/// point trimmed
pub fn format_cost(value: f64) -> String {
    let formatted = format!("{:.*}", COST_PRECISION, value);
    if formatted.contains('.') {
        formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    } else {
        formatted
    }
}

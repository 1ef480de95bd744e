use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection};

use crate::db::DatabaseError;
use crate::models::{DifferentialRecord, DifferentialSource};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Insert or replace the differential record for a case.
/// On conflict the original `created_at` is kept.
pub fn upsert_differential_record(
    conn: &Connection,
    record: &DifferentialRecord,
) -> Result<(), DatabaseError> {
    let ranked = serde_json::to_string(&record.ranked_differentials).map_err(|e| {
        DatabaseError::Serialization {
            field: "ranked_differentials".into(),
            reason: e.to_string(),
        }
    })?;
    let insights =
        serde_json::to_string(&record.llm_insights).map_err(|e| DatabaseError::Serialization {
            field: "llm_insights".into(),
            reason: e.to_string(),
        })?;

    conn.execute(
        "INSERT INTO differential_records (case_id, status, message, ranked_differentials, source, llm_insights, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(case_id) DO UPDATE SET
           status = excluded.status,
           message = excluded.message,
           ranked_differentials = excluded.ranked_differentials,
           source = excluded.source,
           llm_insights = excluded.llm_insights,
           updated_at = excluded.updated_at",
        params![
            record.case_id,
            record.status,
            record.message,
            ranked,
            record.source.as_str(),
            insights,
            record.created_at.format(TIMESTAMP_FORMAT).to_string(),
            record.updated_at.format(TIMESTAMP_FORMAT).to_string(),
        ],
    )?;
    Ok(())
}

/// Get the differential record for a case, if one was ever stored.
pub fn get_differential_record(
    conn: &Connection,
    case_id: &str,
) -> Result<Option<DifferentialRecord>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT case_id, status, message, ranked_differentials, source, llm_insights, created_at, updated_at
         FROM differential_records
         WHERE case_id = ?1
         LIMIT 1",
    )?;
    let mut rows = stmt.query_map(params![case_id], read_row)?;
    match rows.next() {
        Some(row) => Ok(Some(row_to_record(row?)?)),
        None => Ok(None),
    }
}

struct RawRecordRow {
    case_id: String,
    status: String,
    message: String,
    ranked_differentials: String,
    source: String,
    llm_insights: String,
    created_at: String,
    updated_at: String,
}

fn read_row(row: &rusqlite::Row) -> Result<RawRecordRow, rusqlite::Error> {
    Ok(RawRecordRow {
        case_id: row.get(0)?,
        status: row.get(1)?,
        message: row.get(2)?,
        ranked_differentials: row.get(3)?,
        source: row.get(4)?,
        llm_insights: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn row_to_record(raw: RawRecordRow) -> Result<DifferentialRecord, DatabaseError> {
    let ranked_differentials = serde_json::from_str(&raw.ranked_differentials).map_err(|e| {
        DatabaseError::Serialization {
            field: "ranked_differentials".into(),
            reason: e.to_string(),
        }
    })?;
    let llm_insights =
        serde_json::from_str(&raw.llm_insights).map_err(|e| DatabaseError::Serialization {
            field: "llm_insights".into(),
            reason: e.to_string(),
        })?;

    Ok(DifferentialRecord {
        case_id: raw.case_id,
        status: raw.status,
        message: raw.message,
        ranked_differentials,
        source: DifferentialSource::from_str(&raw.source)?,
        llm_insights,
        created_at: NaiveDateTime::parse_from_str(&raw.created_at, TIMESTAMP_FORMAT)
            .unwrap_or_default(),
        updated_at: NaiveDateTime::parse_from_str(&raw.updated_at, TIMESTAMP_FORMAT)
            .unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use crate::models::{DifferentialConsideration, Likelihood, LlmInsights};

    fn test_db() -> Connection {
        open_memory_database().unwrap()
    }

    fn make_record(case_id: &str, source: DifferentialSource) -> DifferentialRecord {
        let now = chrono::Local::now().naive_local();
        DifferentialRecord {
            case_id: case_id.into(),
            status: "success".into(),
            message: "Differential considerations generated".into(),
            ranked_differentials: vec![DifferentialConsideration {
                condition: "IgA nephropathy".into(),
                likelihood: Likelihood::High,
                reasoning: "High classifier probability with proteinuria.".into(),
                confidence: Some(0.71),
            }],
            source,
            llm_insights: LlmInsights::placeholder(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn insert_and_retrieve() {
        let conn = test_db();
        let record = make_record("case-001", DifferentialSource::Llm);
        upsert_differential_record(&conn, &record).unwrap();

        let loaded = get_differential_record(&conn, "case-001").unwrap().unwrap();
        assert_eq!(loaded.case_id, "case-001");
        assert_eq!(loaded.source, DifferentialSource::Llm);
        assert_eq!(loaded.ranked_differentials, record.ranked_differentials);
        assert_eq!(loaded.llm_insights, record.llm_insights);
    }

    #[test]
    fn upsert_replaces_existing() {
        let conn = test_db();
        let mut record = make_record("case-002", DifferentialSource::RulesFallback);
        upsert_differential_record(&conn, &record).unwrap();

        record.source = DifferentialSource::Llm;
        record.message = "Refreshed".into();
        upsert_differential_record(&conn, &record).unwrap();

        let loaded = get_differential_record(&conn, "case-002").unwrap().unwrap();
        assert_eq!(loaded.source, DifferentialSource::Llm);
        assert_eq!(loaded.message, "Refreshed");

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM differential_records", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn missing_returns_none() {
        let conn = test_db();
        assert!(get_differential_record(&conn, "unknown").unwrap().is_none());
    }

    #[test]
    fn corrupt_json_column_is_an_error() {
        let conn = test_db();
        conn.execute(
            "INSERT INTO differential_records VALUES ('bad', 'success', 'm', 'not json', 'llm', '{}', '2026-01-01 00:00:00', '2026-01-01 00:00:00')",
            [],
        )
        .unwrap();
        let err = get_differential_record(&conn, "bad").unwrap_err();
        assert!(matches!(err, DatabaseError::Serialization { .. }));
    }
}

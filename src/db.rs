use crate::errors::{AppError, AppResult};
use crate::models::{PricingRequest, PricingResult};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::{Connection, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

pub type DbPool = Arc<Mutex<Connection>>;

/// SQLite caps bound parameters per statement; deletes are chunked below it.
const DELETE_CHUNK: usize = 500;

pub fn init_db(db_path: &Path) -> AppResult<DbPool> {
    if let Some(dir) = db_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| AppError::Database(format!("create dir: {e}")))?;
    }
    let conn = Connection::open(db_path)?;

    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA cache_size=-64000;")?;
    migrate(&conn)?;

    tracing::info!("database initialized at {}", db_path.display());
    Ok(Arc::new(Mutex::new(conn)))
}

/// Private in-memory database, used by tests and dry runs.
pub fn init_in_memory() -> AppResult<DbPool> {
    let conn = Connection::open_in_memory()?;
    migrate(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

fn migrate(conn: &Connection) -> AppResult<()> {
    let schema = include_str!("../migrations/001_init.sql");
    conn.execute_batch(schema)?;
    Ok(())
}

/// Close the connection at shutdown. Fails if another handle is still alive.
pub fn close_db(db: DbPool) -> AppResult<()> {
    let mutex = Arc::try_unwrap(db)
        .map_err(|_| AppError::Database("close: connection still shared".into()))?;
    let conn = mutex
        .into_inner()
        .map_err(|e| AppError::Database(format!("lock poisoned: {e}")))?;
    conn.close().map_err(|(_, e)| AppError::from(e))?;
    tracing::info!("database closed");
    Ok(())
}

fn lock(db: &DbPool) -> AppResult<MutexGuard<'_, Connection>> {
    db.lock().map_err(|e| AppError::Database(format!("lock poisoned: {e}")))
}

/// RFC3339, microsecond precision, `Z` suffix: text order == time order.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e)))
}

// ── Writes ──

pub fn insert_calculation(
    db: &DbPool,
    request: &PricingRequest,
    result: &PricingResult,
) -> AppResult<CalculationRecord> {
    insert_calculation_at(db, request, result, Utc::now())
}

pub fn insert_calculation_at(
    db: &DbPool,
    request: &PricingRequest,
    result: &PricingResult,
    created_at: DateTime<Utc>,
) -> AppResult<CalculationRecord> {
    let conn = lock(db)?;
    Ok(insert_row(&conn, request, result, created_at)?)
}

/// Insert many rows in one transaction, each under its own savepoint.
/// A row the database refuses is rolled back alone and reported in its
/// slot; the outer error is reserved for lock, begin and commit failures.
pub fn insert_calculations(
    db: &DbPool,
    items: &[(PricingRequest, PricingResult)],
) -> AppResult<Vec<AppResult<CalculationRecord>>> {
    let mut conn = lock(db)?;
    let mut tx = conn.transaction()?;
    let now = Utc::now();
    let mut outcomes = Vec::with_capacity(items.len());
    for (request, result) in items {
        let sp = tx.savepoint()?;
        match insert_row(&sp, request, result, now) {
            Ok(record) => {
                sp.commit()?;
                outcomes.push(Ok(record));
            }
            // Dropping `sp` rolls the row back.
            Err(e) => outcomes.push(Err(AppError::from(e))),
        }
    }
    tx.commit()?;
    Ok(outcomes)
}

fn insert_row(
    conn: &Connection,
    request: &PricingRequest,
    result: &PricingResult,
    created_at: DateTime<Utc>,
) -> rusqlite::Result<CalculationRecord> {
    let created_at = created_at.trunc_subsecs(6);
    conn.execute(
        "INSERT INTO calculations (spot, strike, maturity, risk_free_rate, dividend_yield, volatility, call_price, put_price, d1, d2, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        rusqlite::params![
            request.spot,
            request.strike,
            request.maturity,
            request.risk_free_rate,
            request.dividend_yield,
            request.volatility,
            result.call_price,
            result.put_price,
            result.d1,
            result.d2,
            format_timestamp(&created_at),
        ],
    )?;
    Ok(CalculationRecord {
        id: conn.last_insert_rowid(),
        request: *request,
        result: *result,
        created_at,
    })
}

pub fn delete_calculations(db: &DbPool, ids: &[i64]) -> AppResult<usize> {
    if ids.is_empty() {
        return Ok(0);
    }
    let mut conn = lock(db)?;
    let tx = conn.transaction()?;
    let mut deleted = 0;
    for chunk in ids.chunks(DELETE_CHUNK) {
        let placeholders = vec!["?"; chunk.len()].join(",");
        let sql = format!("DELETE FROM calculations WHERE id IN ({placeholders})");
        deleted += tx.execute(&sql, rusqlite::params_from_iter(chunk.iter()))?;
    }
    tx.commit()?;
    Ok(deleted)
}

// ── Reads ──

const RECORD_COLUMNS: &str =
    "id, spot, strike, maturity, risk_free_rate, dividend_yield, volatility, call_price, put_price, d1, d2, created_at";

fn read_request(row: &Row<'_>) -> rusqlite::Result<PricingRequest> {
    Ok(PricingRequest {
        spot: row.get(1)?,
        strike: row.get(2)?,
        maturity: row.get(3)?,
        risk_free_rate: row.get(4)?,
        dividend_yield: row.get(5)?,
        volatility: row.get(6)?,
    })
}

fn read_record(row: &Row<'_>) -> rusqlite::Result<CalculationRecord> {
    let raw_ts: String = row.get(11)?;
    Ok(CalculationRecord {
        id: row.get(0)?,
        request: read_request(row)?,
        result: PricingResult {
            call_price: row.get(7)?,
            put_price: row.get(8)?,
            d1: row.get(9)?,
            d2: row.get(10)?,
        },
        created_at: parse_timestamp(11, &raw_ts)?,
    })
}

/// Newest first, offset/limit pagination.
pub fn list_calculations(db: &DbPool, skip: usize, limit: usize) -> AppResult<Vec<CalculationSummary>> {
    let conn = lock(db)?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECORD_COLUMNS} FROM calculations ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2"
    ))?;
    let rows = stmt.query_map(rusqlite::params![limit as i64, skip as i64], |row| {
        read_record(row).map(CalculationSummary::from)
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn get_calculation(db: &DbPool, id: i64) -> AppResult<Option<CalculationRecord>> {
    let conn = lock(db)?;
    let mut stmt = conn.prepare(&format!("SELECT {RECORD_COLUMNS} FROM calculations WHERE id = ?1"))?;
    let mut rows = stmt.query_map(rusqlite::params![id], read_record)?;
    Ok(rows.next().transpose()?)
}

pub fn count_calculations(db: &DbPool) -> AppResult<i64> {
    let conn = lock(db)?;
    let total = conn.query_row("SELECT COUNT(*) FROM calculations", [], |row| row.get(0))?;
    Ok(total)
}

// ── Row types ──

/// A persisted calculation with its identity and creation time.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationRecord {
    pub id: i64,
    #[serde(flatten)]
    pub request: PricingRequest,
    #[serde(flatten)]
    pub result: PricingResult,
    pub created_at: DateTime<Utc>,
}

/// History listing row: the record without d1/d2.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationSummary {
    pub id: i64,
    #[serde(flatten)]
    pub request: PricingRequest,
    pub call_price: f64,
    pub put_price: f64,
    pub created_at: DateTime<Utc>,
}

impl From<CalculationRecord> for CalculationSummary {
    fn from(r: CalculationRecord) -> Self {
        Self {
            id: r.id,
            request: r.request,
            call_price: r.result.call_price,
            put_price: r.result.put_price,
            created_at: r.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::black_scholes::price_request;
    use chrono::Duration;

    fn sample(spot: f64) -> (PricingRequest, PricingResult) {
        let req = PricingRequest::new(spot, 100.0, 1.0, 0.05, 0.02, 0.2);
        let res = price_request(&req).unwrap();
        (req, res)
    }

    fn insert_all(db: &DbPool, items: &[(PricingRequest, PricingResult)]) -> Vec<CalculationRecord> {
        insert_calculations(db, items)
            .unwrap()
            .into_iter()
            .collect::<AppResult<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn test_insert_and_get_roundtrip() {
        let db = init_in_memory().unwrap();
        let (req, res) = sample(110.0);
        let rec = insert_calculation(&db, &req, &res).unwrap();
        assert!(rec.id > 0);

        let fetched = get_calculation(&db, rec.id).unwrap().unwrap();
        assert_eq!(fetched, rec);
        assert_eq!(fetched.result.d1, res.d1);
    }

    #[test]
    fn test_get_missing_is_none() {
        let db = init_in_memory().unwrap();
        assert!(get_calculation(&db, 99_999).unwrap().is_none());
    }

    #[test]
    fn test_list_newest_first_with_pagination() {
        let db = init_in_memory().unwrap();
        let base = Utc::now() - Duration::days(3);
        let mut ids = Vec::new();
        for i in 0..5 {
            let (req, res) = sample(100.0 + i as f64);
            let rec = insert_calculation_at(&db, &req, &res, base + Duration::hours(i)).unwrap();
            ids.push(rec.id);
        }

        let page = list_calculations(&db, 0, 2).unwrap();
        assert_eq!(page.iter().map(|r| r.id).collect::<Vec<_>>(), vec![ids[4], ids[3]]);

        let page = list_calculations(&db, 2, 10).unwrap();
        assert_eq!(page.iter().map(|r| r.id).collect::<Vec<_>>(), vec![ids[2], ids[1], ids[0]]);

        assert!(list_calculations(&db, 10, 10).unwrap().is_empty());
    }

    #[test]
    fn test_same_timestamp_ties_break_on_id() {
        let db = init_in_memory().unwrap();
        let recs = insert_all(&db, &[sample(90.0), sample(95.0)]);
        let page = list_calculations(&db, 0, 10).unwrap();
        assert_eq!(page[0].id, recs[1].id);
        assert_eq!(page[1].id, recs[0].id);
    }

    #[test]
    fn test_delete_ignores_missing_ids() {
        let db = init_in_memory().unwrap();
        let recs = insert_all(&db, &[sample(90.0), sample(95.0), sample(100.0)]);
        let deleted = delete_calculations(&db, &[recs[0].id, recs[2].id, 12_345]).unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(count_calculations(&db).unwrap(), 1);
        assert!(get_calculation(&db, recs[1].id).unwrap().is_some());
        assert_eq!(delete_calculations(&db, &[]).unwrap(), 0);
    }

    #[test]
    fn test_refused_row_does_not_roll_back_others() {
        let db = init_in_memory().unwrap();
        let (req, mut bad) = sample(100.0);
        // SQLite binds NaN as NULL, which the NOT NULL column refuses.
        bad.call_price = f64::NAN;
        let outcomes = insert_calculations(&db, &[sample(90.0), (req, bad), sample(110.0)]).unwrap();

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_ok());
        assert!(matches!(outcomes[1], Err(AppError::Database(_))));
        assert!(outcomes[2].is_ok());
        assert_eq!(count_calculations(&db).unwrap(), 2);
    }

    #[test]
    fn test_count() {
        let db = init_in_memory().unwrap();
        assert_eq!(count_calculations(&db).unwrap(), 0);
        insert_all(&db, &[sample(90.0), sample(95.0)]);
        assert_eq!(count_calculations(&db).unwrap(), 2);
    }

    #[test]
    fn test_file_db_open_and_close() {
        let dir = std::env::temp_dir().join(format!(
            "bs_calculator_db_{}_{}",
            std::process::id(),
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        let path = dir.join("nested").join("calc.db");
        let db = init_db(&path).unwrap();
        let (req, res) = sample(100.0);
        insert_calculation(&db, &req, &res).unwrap();
        close_db(db).unwrap();

        let db = init_db(&path).unwrap();
        assert_eq!(count_calculations(&db).unwrap(), 1);
        close_db(db).unwrap();
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_close_fails_while_shared() {
        let db = init_in_memory().unwrap();
        let other = db.clone();
        assert!(close_db(db).is_err());
        drop(other);
    }
}

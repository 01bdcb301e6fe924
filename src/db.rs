//! Embedded SQLite storage for per-device state.
//!
//! One row per device id in `device_state`, always the most recently accepted
//! report; six owned rows in `neighbor_cells`, fully replaced on every
//! accepted report inside the same transaction as the device-row write.

use crate::models::{DeviceSummary, NeighborCell, TelemetryReport};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use thiserror::Error;

const SCHEMA_SQL: &str = include_str!("storage/schema.sql");

#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Integrity: {0}")]
    IntegrityCheckFailed(String),
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
}

pub type DbResult<T> = Result<T, DbError>;

pub struct Db {
    conn: Connection,
}

impl Db {
    pub fn open(path: &Path) -> DbResult<Self> {
        let c = Connection::open(path)?;
        let d = Self { conn: c };
        d.apply_pragmas()?;
        d.apply_schema()?;
        Ok(d)
    }

    pub fn open_in_memory() -> DbResult<Self> {
        let c = Connection::open_in_memory()?;
        let d = Self { conn: c };
        d.apply_pragmas()?;
        d.apply_schema()?;
        Ok(d)
    }

    fn apply_pragmas(&self) -> DbResult<()> {
        self.conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;",
        )?;
        Ok(())
    }

    fn apply_schema(&self) -> DbResult<()> {
        self.conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    pub fn integrity_check(&self) -> DbResult<()> {
        let r: String = self
            .conn
            .pragma_query_value(None, "integrity_check", |row| row.get(0))?;
        if r != "ok" {
            return Err(DbError::IntegrityCheckFailed(r));
        }
        Ok(())
    }

    /// Create-or-fully-replace the state for `report.device_id`.
    ///
    /// Every column is overwritten, the previous neighbor-cell set is
    /// discarded, and the six new rows are inserted, all in one transaction.
    /// Any failure rolls back to the pre-update state.
    pub fn upsert_device(
        &mut self,
        report: &TelemetryReport,
        received_at: DateTime<Utc>,
    ) -> DbResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO device_state (
                device_id, sw_version, model, cell_id, mcc, mnc, rx_lvl, lac, tm_adv,
                backup_voltage, online_status, message_number, mode, col_net_rf_ch,
                gps_date, gps_time, latitude, longitude, speed, course, satt, gps_fix,
                temperature, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                       ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24)
             ON CONFLICT(device_id) DO UPDATE SET
                sw_version = excluded.sw_version,
                model = excluded.model,
                cell_id = excluded.cell_id,
                mcc = excluded.mcc,
                mnc = excluded.mnc,
                rx_lvl = excluded.rx_lvl,
                lac = excluded.lac,
                tm_adv = excluded.tm_adv,
                backup_voltage = excluded.backup_voltage,
                online_status = excluded.online_status,
                message_number = excluded.message_number,
                mode = excluded.mode,
                col_net_rf_ch = excluded.col_net_rf_ch,
                gps_date = excluded.gps_date,
                gps_time = excluded.gps_time,
                latitude = excluded.latitude,
                longitude = excluded.longitude,
                speed = excluded.speed,
                course = excluded.course,
                satt = excluded.satt,
                gps_fix = excluded.gps_fix,
                temperature = excluded.temperature,
                updated_at = excluded.updated_at",
            params![
                report.device_id,
                report.sw_version,
                report.model,
                report.cell_id,
                report.mcc,
                report.mnc,
                report.rx_lvl,
                report.lac,
                report.tm_adv,
                report.backup_voltage,
                report.online_status,
                report.message_number,
                report.mode,
                report.col_net_rf_ch,
                report.gps_date.format("%Y-%m-%d").to_string(),
                report.gps_time.map(|t| t.format("%H:%M:%S").to_string()),
                report.latitude,
                report.longitude,
                report.speed,
                report.course,
                report.satt,
                report.gps_fix,
                report.temperature,
                received_at.to_rfc3339(),
            ],
        )?;
        tx.execute(
            "DELETE FROM neighbor_cells WHERE device_id = ?1",
            params![report.device_id],
        )?;
        for cell in &report.neighbor_cells {
            tx.execute(
                "INSERT INTO neighbor_cells (device_id, cell_id, mcc, mnc, lac, rx_lvl, tm_adv)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    report.device_id,
                    cell.cell_id,
                    cell.mcc,
                    cell.mnc,
                    cell.lac,
                    cell.rx_lvl,
                    cell.tm_adv,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// One summary per device id, ascending, for a deterministic view.
    pub fn latest_snapshot(&self) -> DbResult<Vec<DeviceSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT device_id, backup_voltage, online_status, mode,
                    gps_date, gps_time, latitude, longitude, gps_fix
             FROM device_state
             ORDER BY device_id ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(DeviceSummary {
                device_id: row.get(0)?,
                backup_voltage: row.get(1)?,
                online_status: row.get(2)?,
                mode: row.get(3)?,
                gps_date: row.get(4)?,
                gps_time: row
                    .get::<_, Option<String>>(5)?
                    .unwrap_or_else(|| "N/A".to_owned()),
                latitude: row.get(6)?,
                longitude: row.get(7)?,
                gps_fix: row.get(8)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn device_count(&self) -> DbResult<i64> {
        let n = self
            .conn
            .query_row("SELECT COUNT(*) FROM device_state", [], |row| row.get(0))?;
        Ok(n)
    }

    /// Full stored state for one device, neighbor cells included, in insert
    /// order. `None` if the device has never reported.
    pub fn fetch_device(&self, device_id: &str) -> DbResult<Option<TelemetryReport>> {
        let report = self
            .conn
            .query_row(
                "SELECT device_id, sw_version, model, cell_id, mcc, mnc, rx_lvl, lac, tm_adv,
                        backup_voltage, online_status, message_number, mode, col_net_rf_ch,
                        gps_date, gps_time, latitude, longitude, speed, course, satt, gps_fix,
                        temperature
                 FROM device_state WHERE device_id = ?1",
                params![device_id],
                |row| {
                    Ok(TelemetryReport {
                        device_id: row.get(0)?,
                        sw_version: row.get(1)?,
                        model: row.get(2)?,
                        cell_id: row.get(3)?,
                        mcc: row.get(4)?,
                        mnc: row.get(5)?,
                        rx_lvl: row.get(6)?,
                        lac: row.get(7)?,
                        tm_adv: row.get(8)?,
                        backup_voltage: row.get(9)?,
                        online_status: row.get(10)?,
                        message_number: row.get(11)?,
                        mode: row.get(12)?,
                        col_net_rf_ch: row.get(13)?,
                        gps_date: parse_date(&row.get::<_, String>(14)?, 14)?,
                        gps_time: match row.get::<_, Option<String>>(15)? {
                            Some(s) => Some(parse_time(&s, 15)?),
                            None => None,
                        },
                        latitude: row.get(16)?,
                        longitude: row.get(17)?,
                        speed: row.get(18)?,
                        course: row.get(19)?,
                        satt: row.get(20)?,
                        gps_fix: row.get(21)?,
                        temperature: row.get(22)?,
                        neighbor_cells: Vec::new(),
                    })
                },
            )
            .optional()?;
        let Some(mut report) = report else {
            return Ok(None);
        };
        report.neighbor_cells = self.neighbor_cells(device_id)?;
        Ok(Some(report))
    }

    pub fn neighbor_cells(&self, device_id: &str) -> DbResult<Vec<NeighborCell>> {
        let mut stmt = self.conn.prepare(
            "SELECT cell_id, mcc, mnc, lac, rx_lvl, tm_adv
             FROM neighbor_cells WHERE device_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![device_id], |row| {
            Ok(NeighborCell {
                cell_id: row.get(0)?,
                mcc: row.get(1)?,
                mnc: row.get(2)?,
                lac: row.get(3)?,
                rx_lvl: row.get(4)?,
                tm_adv: row.get(5)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

fn parse_date(s: &str, col: usize) -> Result<NaiveDate, rusqlite::Error> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(col, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_time(s: &str, col: usize) -> Result<NaiveTime, rusqlite::Error> {
    NaiveTime::parse_from_str(s, "%H:%M:%S").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(col, rusqlite::types::Type::Text, Box::new(e))
    })
}

//! Wire types for device telemetry reports.
//!
//! Field names match what the trackers actually send: serving-cell metrics,
//! a GPS fix, and exactly six neighboring-cell measurements per report.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of neighbor-cell entries every report must carry.
pub const REQUIRED_NEIGHBOR_CELLS: usize = 6;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("exactly 6 neighbor cells are required")]
pub struct NeighborCountError {
    pub got: usize,
}

/// One auxiliary cell measurement attached to a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborCell {
    pub cell_id: String,
    pub mcc: String,
    pub mnc: String,
    pub lac: String,
    pub rx_lvl: String,
    pub tm_adv: String,
}

/// One full telemetry report from a device.
///
/// All scalar fields are required; a body missing any of them is rejected at
/// the JSON extractor. `gps_time` alone may be null — devices without a fix
/// report no time of day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryReport {
    pub device_id: String,
    pub sw_version: String,
    pub model: String,
    pub cell_id: String,
    pub mcc: String,
    pub mnc: String,
    pub rx_lvl: String,
    pub lac: String,
    pub tm_adv: String,
    pub backup_voltage: f64,
    pub online_status: bool,
    pub message_number: i64,
    pub mode: String,
    pub col_net_rf_ch: String,
    pub gps_date: NaiveDate,
    pub gps_time: Option<NaiveTime>,
    pub latitude: f64,
    pub longitude: f64,
    pub speed: f64,
    pub course: f64,
    pub satt: i64,
    pub gps_fix: bool,
    pub temperature: f64,
    pub neighbor_cells: Vec<NeighborCell>,
}

impl TelemetryReport {
    /// Reject any report whose neighbor-cell set is not exactly six entries.
    /// Runs before any state mutation; a failed report leaves no trace.
    pub fn validate(&self) -> Result<(), NeighborCountError> {
        if self.neighbor_cells.len() != REQUIRED_NEIGHBOR_CELLS {
            return Err(NeighborCountError {
                got: self.neighbor_cells.len(),
            });
        }
        Ok(())
    }
}

/// One row of the `/latest_data` view: the fields a live map needs,
/// not the full serving-cell detail.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceSummary {
    pub device_id: String,
    pub backup_voltage: f64,
    pub online_status: bool,
    pub mode: String,
    pub gps_date: String,
    pub gps_time: String,
    pub latitude: f64,
    pub longitude: f64,
    pub gps_fix: bool,
}

#[cfg(test)]
pub(crate) fn sample_report(device_id: &str) -> TelemetryReport {
    TelemetryReport {
        device_id: device_id.to_owned(),
        sw_version: "1.0.2".to_owned(),
        model: "ST410".to_owned(),
        cell_id: "1A2B".to_owned(),
        mcc: "724".to_owned(),
        mnc: "10".to_owned(),
        rx_lvl: "23".to_owned(),
        lac: "55F0".to_owned(),
        tm_adv: "2".to_owned(),
        backup_voltage: 3.91,
        online_status: true,
        message_number: 17,
        mode: "1".to_owned(),
        col_net_rf_ch: "45".to_owned(),
        gps_date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
        gps_time: Some(NaiveTime::from_hms_opt(9, 26, 53).unwrap()),
        latitude: -23.5505,
        longitude: -46.6333,
        speed: 12.5,
        course: 181.0,
        satt: 9,
        gps_fix: true,
        temperature: 31.5,
        neighbor_cells: (0..6)
            .map(|i| NeighborCell {
                cell_id: format!("N{i}"),
                mcc: "724".to_owned(),
                mnc: "10".to_owned(),
                lac: "55F0".to_owned(),
                rx_lvl: format!("{}", 20 + i),
                tm_adv: "0".to_owned(),
            })
            .collect(),
    }
}

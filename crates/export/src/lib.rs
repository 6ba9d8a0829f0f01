//! Trajectory serialization: JSON envelopes and CSV tables.
//!
//! The exchange format is an ordered sequence of per-step records carrying
//! the epoch (seconds past J2000 plus scale name), frame, state components,
//! and step metadata. Both writers rely on shortest-round-trip float
//! formatting, so a serialize/deserialize cycle reproduces every `f64`
//! bit-for-bit.

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use astroprop_core::state::{Frame, StateVector};
use astroprop_core::time::{Epoch, TimeScale};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced while reading or writing trajectory artifacts.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("trajectory I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("JSON (de)serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV (de)serialization failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("unknown frame `{0}` in trajectory record")]
    UnknownFrame(String),
    #[error("unknown time scale `{0}` in trajectory record")]
    UnknownTimeScale(String),
}

/// One trajectory sample: a state plus the step metadata that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryRecord {
    pub epoch_seconds_j2000: f64,
    pub time_scale: String,
    pub frame: String,
    pub x_km: f64,
    pub y_km: f64,
    pub z_km: f64,
    pub vx_km_s: f64,
    pub vy_km_s: f64,
    pub vz_km_s: f64,
    #[serde(default)]
    pub mass_kg: Option<f64>,
    /// Signed step that produced this sample (zero for the initial state).
    pub step_s: f64,
    /// Scaled local error estimate of the accepted step.
    pub error_estimate: f64,
}

impl TrajectoryRecord {
    /// Record from a tagged state and its step metadata.
    pub fn from_state(state: &StateVector, step_s: f64, error_estimate: f64) -> Self {
        Self {
            epoch_seconds_j2000: state.epoch.seconds_since_j2000(),
            time_scale: state.epoch.scale().name().to_string(),
            frame: state.frame.name().to_string(),
            x_km: state.position_km[0],
            y_km: state.position_km[1],
            z_km: state.position_km[2],
            vx_km_s: state.velocity_km_s[0],
            vy_km_s: state.velocity_km_s[1],
            vz_km_s: state.velocity_km_s[2],
            mass_kg: state.mass_kg,
            step_s,
            error_estimate,
        }
    }

    /// Rebuild the tagged state (attitude is not part of the exchange
    /// format).
    pub fn to_state(&self) -> Result<StateVector, ExportError> {
        let frame = Frame::from_name(&self.frame)
            .ok_or_else(|| ExportError::UnknownFrame(self.frame.clone()))?;
        let scale = TimeScale::from_name(&self.time_scale)
            .ok_or_else(|| ExportError::UnknownTimeScale(self.time_scale.clone()))?;
        let mut state = StateVector::new(
            [self.x_km, self.y_km, self.z_km],
            [self.vx_km_s, self.vy_km_s, self.vz_km_s],
            frame,
            Epoch::from_seconds_since_j2000(self.epoch_seconds_j2000, scale),
        );
        state.mass_kg = self.mass_kg;
        Ok(state)
    }
}

/// Create a writer for the target path, handling stdout (`-`) by convention.
pub fn writer_for_path(path: &Path) -> io::Result<Box<dyn Write>> {
    if path == Path::new("-") {
        return Ok(Box::new(BufWriter::new(io::stdout())));
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path)?;
    Ok(Box::new(BufWriter::new(file)))
}

/// Write records as a pretty-printed JSON array.
pub fn write_json(writer: &mut dyn Write, records: &[TrajectoryRecord]) -> Result<(), ExportError> {
    serde_json::to_writer_pretty(&mut *writer, records)?;
    writer.write_all(b"\n")?;
    Ok(())
}

/// Read a JSON array of records.
pub fn read_json(reader: &mut dyn Read) -> Result<Vec<TrajectoryRecord>, ExportError> {
    Ok(serde_json::from_reader(reader)?)
}

/// Write records as CSV with a header row.
pub fn write_csv(writer: &mut dyn Write, records: &[TrajectoryRecord]) -> Result<(), ExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in records {
        csv_writer.serialize(record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Read CSV records written by [`write_csv`].
pub fn read_csv(reader: &mut dyn Read) -> Result<Vec<TrajectoryRecord>, ExportError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut records = Vec::new();
    for row in csv_reader.deserialize() {
        records.push(row?);
    }
    Ok(records)
}

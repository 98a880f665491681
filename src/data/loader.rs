// ============================================================
// Layer 4 — Data Directory Loader
// ============================================================
// Reads the three input files of a dataset directory:
//
//   recordings.safetensors  — tensor "eeg" [subject, channel, time]
//                             (F32 or F64), header metadata:
//                               subjects = JSON array of ids
//                               channels = JSON array of names
//                               sfreq    = sampling rate (optional)
//   Demographics.csv        — ID, Age ("20-25"), Gender_ 1=female_2=male
//   UPPS.csv                — ID, UPPS_sens_seek (only for the upps task)
//
// Extra CSV columns are ignored.
//
// Reference: safetensors crate documentation
//            csv crate documentation (serde deserialisation)
//            Rust Book §9 (Error Handling)

use anyhow::{bail, Context, Result};
use ndarray::Array3;
use safetensors::{Dtype, SafeTensors};
use serde::Deserialize;
use std::{
    collections::HashMap,
    fs,
    path::PathBuf,
};

use crate::domain::{
    recording::{Recordings, DEFAULT_SFREQ},
    subject::{Demographics, SubjectInfo},
    task::DownstreamTask,
    traits::{DemographicSource, RecordingSource},
};

pub const RECORDINGS_FILE:   &str = "recordings.safetensors";
pub const DEMOGRAPHICS_FILE: &str = "Demographics.csv";
pub const UPPS_FILE:         &str = "UPPS.csv";

/// Name of the EEG tensor inside the recordings file.
pub const EEG_TENSOR: &str = "eeg";

#[derive(Debug, Deserialize)]
struct DemographicRow {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Age")]
    age: String,
    #[serde(rename = "Gender_ 1=female_2=male")]
    gender: u8,
}

#[derive(Debug, Deserialize)]
struct UppsRow {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "UPPS_sens_seek")]
    sens_seek: f64,
}

/// Loads recordings and demographics from one directory.
pub struct DirectoryLoader {
    dir: PathBuf,
}

impl DirectoryLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, file: &str) -> Result<PathBuf> {
        let path = self.dir.join(file);
        if !path.exists() {
            bail!("missing input file '{}'", path.display());
        }
        Ok(path)
    }
}

impl RecordingSource for DirectoryLoader {
    fn load_recordings(&self) -> Result<Recordings> {
        let path = self.path(RECORDINGS_FILE)?;
        let bytes = fs::read(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        let recordings = parse_recordings(&bytes)
            .with_context(|| format!("Invalid recordings file '{}'", path.display()))?;

        tracing::info!(
            "Loaded recordings: {} subjects × {} channels × {} samples @ {} Hz",
            recordings.subjects().len(),
            recordings.channels().len(),
            recordings.n_times(),
            recordings.sfreq()
        );
        Ok(recordings)
    }
}

impl DemographicSource for DirectoryLoader {
    fn load_demographics(&self, task: DownstreamTask) -> Result<Demographics> {
        let path = self.path(DEMOGRAPHICS_FILE)?;
        let mut reader = csv::Reader::from_path(&path)
            .with_context(|| format!("Cannot open '{}'", path.display()))?;

        let mut rows = Vec::new();
        for row in reader.deserialize::<DemographicRow>() {
            let row = row.with_context(|| format!("Bad row in '{}'", path.display()))?;
            rows.push(SubjectInfo::new(row.id, row.age, row.gender));
        }
        let mut table = Demographics::new(rows);
        tracing::info!("Loaded {} demographic rows", table.len());

        if task.needs_trait_table() {
            let path = self.path(UPPS_FILE)?;
            let mut reader = csv::Reader::from_path(&path)
                .with_context(|| format!("Cannot open '{}'", path.display()))?;
            let mut scores = Vec::new();
            for row in reader.deserialize::<UppsRow>() {
                let row = row.with_context(|| format!("Bad row in '{}'", path.display()))?;
                scores.push((row.id, row.sens_seek));
            }
            tracing::info!("Merged {} UPPS scores", scores.len());
            table.merge_upps(scores);
        }

        Ok(table)
    }
}

/// Decode a recordings file held in memory.
pub fn parse_recordings(bytes: &[u8]) -> Result<Recordings> {
    let (_, header) = SafeTensors::read_metadata(bytes)
        .map_err(|e| anyhow::anyhow!("safetensors header: {e:?}"))?;
    let meta: HashMap<String, String> = header.metadata().clone().unwrap_or_default();

    let subjects: Vec<String> = serde_json::from_str(
        meta.get("subjects").context("metadata key 'subjects' is missing")?,
    )
    .context("metadata 'subjects' is not a JSON string array")?;
    let channels: Vec<String> = serde_json::from_str(
        meta.get("channels").context("metadata key 'channels' is missing")?,
    )
    .context("metadata 'channels' is not a JSON string array")?;
    let sfreq = match meta.get("sfreq") {
        Some(s) => s.trim().parse::<f64>().with_context(|| format!("bad sfreq '{s}'"))?,
        None    => DEFAULT_SFREQ,
    };

    let tensors = SafeTensors::deserialize(bytes)
        .map_err(|e| anyhow::anyhow!("safetensors body: {e:?}"))?;
    let view = tensors
        .tensor(EEG_TENSOR)
        .map_err(|e| anyhow::anyhow!("tensor '{EEG_TENSOR}': {e:?}"))?;

    let shape = view.shape().to_vec();
    if shape.len() != 3 {
        bail!("tensor '{EEG_TENSOR}' must be 3-D [subject, channel, time], got {shape:?}");
    }

    let values: Vec<f32> = match view.dtype() {
        Dtype::F32 => view
            .data()
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect(),
        Dtype::F64 => view
            .data()
            .chunks_exact(8)
            .map(|b| f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]) as f32)
            .collect(),
        other => bail!("tensor '{EEG_TENSOR}' has unsupported dtype {other:?}"),
    };

    let data = Array3::from_shape_vec((shape[0], shape[1], shape[2]), values)
        .context("tensor data does not match its shape")?;
    Ok(Recordings::new(subjects, channels, sfreq, data)?)
}

/// Write `recordings` in the format [`parse_recordings`] reads.
#[cfg(test)]
pub fn write_recordings(recordings: &Recordings, path: &std::path::Path) -> Result<()> {
    let data  = recordings.data();
    let shape = data.shape().to_vec();
    let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();

    let view = safetensors::tensor::TensorView::new(Dtype::F32, shape, &bytes)
        .map_err(|e| anyhow::anyhow!("tensor view: {e:?}"))?;

    let mut meta = HashMap::new();
    meta.insert("subjects".to_string(), serde_json::to_string(recordings.subjects())?);
    meta.insert("channels".to_string(), serde_json::to_string(recordings.channels())?);
    meta.insert("sfreq".to_string(), recordings.sfreq().to_string());

    let out = safetensors::serialize(vec![(EEG_TENSOR, view)], &Some(meta))
        .map_err(|e| anyhow::anyhow!("safetensors serialise: {e:?}"))?;
    fs::write(path, out).with_context(|| format!("Cannot write '{}'", path.display()))?;
    Ok(())
}

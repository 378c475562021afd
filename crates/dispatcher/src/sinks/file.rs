//! FileSink - writes frames to disk, one folder per sensor
//!
//! ```text
//! <base_path>/<sensor_id>/<frame_id>.bin        encoded frame, as published
//! <base_path>/<sensor_id>/<frame_id>.ply        binary PLY: x y z object_id channel
//! <base_path>/<sensor_id>/meta/<frame_id>.json  tick report
//! ```

use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use contracts::ContractError;
use measurement::{LidarFrame, LidarMeasurement};
use tracing::{debug, error, instrument};

use crate::sink::FrameSink;

/// Which point cloud files to write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FileFormat {
    /// Raw encoded frame
    #[default]
    Bin,
    /// Binary little-endian PLY
    Ply,
    Both,
}

impl FileFormat {
    fn writes_bin(self) -> bool {
        matches!(self, FileFormat::Bin | FileFormat::Both)
    }

    fn writes_ply(self) -> bool {
        matches!(self, FileFormat::Ply | FileFormat::Both)
    }
}

impl FromStr for FileFormat {
    type Err = io::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bin" => Ok(FileFormat::Bin),
            "ply" => Ok(FileFormat::Ply),
            "both" => Ok(FileFormat::Both),
            other => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unknown file format '{other}' (bin|ply|both)"),
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    pub base_path: PathBuf,
    pub format: FileFormat,
    /// Write the tick report next to each frame
    pub write_meta: bool,
}

impl Default for FileSinkConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("./output"),
            format: FileFormat::default(),
            write_meta: true,
        }
    }
}

impl FileSinkConfig {
    /// Build from sink params (`base_path`, `format`, `write_meta`)
    pub fn from_params(params: &HashMap<String, String>) -> io::Result<Self> {
        let defaults = Self::default();
        let base_path = params
            .get("base_path")
            .map(PathBuf::from)
            .unwrap_or(defaults.base_path);
        let format = params
            .get("format")
            .map(|f| f.parse())
            .transpose()?
            .unwrap_or(defaults.format);
        let write_meta = match params.get("write_meta").map(String::as_str) {
            None => defaults.write_meta,
            Some("true") => true,
            Some("false") => false,
            Some(other) => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("write_meta must be true or false, got '{other}'"),
                ))
            }
        };

        Ok(Self {
            base_path,
            format,
            write_meta,
        })
    }
}

pub struct FileSink {
    name: String,
    config: FileSinkConfig,
    created_dirs: HashSet<PathBuf>,
}

impl FileSink {
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> io::Result<Self> {
        fs::create_dir_all(&config.base_path)?;

        Ok(Self {
            name: name.into(),
            config,
            created_dirs: HashSet::new(),
        })
    }

    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> io::Result<Self> {
        Self::new(name, FileSinkConfig::from_params(params)?)
    }

    fn ensure_dir(&mut self, dir: &Path) -> io::Result<()> {
        if !self.created_dirs.contains(dir) {
            fs::create_dir_all(dir)?;
            self.created_dirs.insert(dir.to_path_buf());
        }
        Ok(())
    }

    fn write_frame_to_disk(&mut self, frame: &LidarFrame) -> io::Result<()> {
        let sensor_dir = self.config.base_path.join(frame.sensor_id.as_str());
        self.ensure_dir(&sensor_dir)?;
        let stem = format!("{:06}", frame.frame_id);

        if self.config.format.writes_bin() {
            fs::write(sensor_dir.join(format!("{stem}.bin")), &frame.data)?;
        }
        if self.config.format.writes_ply() {
            let comment = format!(
                "sensor {} frame {} horizontal_angle {}",
                frame.sensor_id,
                frame.frame_id,
                frame.horizontal_angle()
            );
            save_point_cloud(
                &sensor_dir.join(format!("{stem}.ply")),
                frame.measurement(),
                &comment,
            )?;
        }
        if self.config.write_meta {
            let meta_dir = sensor_dir.join("meta");
            self.ensure_dir(&meta_dir)?;
            let meta_file = File::create(meta_dir.join(format!("{stem}.json")))?;
            serde_json::to_writer(meta_file, &frame.report)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        }

        Ok(())
    }

    fn persist_frame(&mut self, frame: &LidarFrame) -> Result<(), ContractError> {
        self.write_frame_to_disk(frame).map_err(|e| {
            error!(sink = %self.name, frame_id = frame.frame_id, error = %e, "Write failed");
            ContractError::sink_write(&self.name, e.to_string())
        })
    }
}

/// Binary PLY with per-point groundtruth id and channel index
fn save_point_cloud(path: &Path, m: &LidarMeasurement, comment: &str) -> io::Result<()> {
    let mut file = BufWriter::new(File::create(path)?);

    writeln!(file, "ply")?;
    writeln!(file, "format binary_little_endian 1.0")?;
    writeln!(file, "comment {comment}")?;
    writeln!(file, "element vertex {}", m.point_count())?;
    writeln!(file, "property float x")?;
    writeln!(file, "property float y")?;
    writeln!(file, "property float z")?;
    writeln!(file, "property uint object_id")?;
    writeln!(file, "property uint channel")?;
    writeln!(file, "end_header")?;

    for channel in 0..m.channel_count() {
        let Some((points, ids)) = m.channel(channel) else {
            continue;
        };
        for (p, id) in points.iter().zip(ids) {
            file.write_all(&p.x.to_le_bytes())?;
            file.write_all(&p.y.to_le_bytes())?;
            file.write_all(&p.z.to_le_bytes())?;
            file.write_all(&id.to_le_bytes())?;
            file.write_all(&channel.to_le_bytes())?;
        }
    }

    file.flush()
}

impl FrameSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_publish",
        skip(self, frame),
        fields(sink = %self.name, frame_id = frame.frame_id)
    )]
    async fn publish(&mut self, frame: &LidarFrame) -> Result<(), ContractError> {
        self.persist_frame(frame)
    }

    #[instrument(name = "file_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "file_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        debug!(sink = %self.name, "FileSink closed");
        Ok(())
    }
}

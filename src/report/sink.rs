use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::debug;

use crate::search::{ParetoFront, ParetoPoint};

/// Receives solved points as the search produces them
pub trait ResultSink {
    fn accept(&mut self, index: usize, point: &ParetoPoint) -> Result<()>;

    /// Called once with the complete front
    fn finish(&mut self, _front: &ParetoFront) -> Result<()> {
        Ok(())
    }
}

/// Keeps every point in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    pub points: Vec<ParetoPoint>,
    pub finished: bool,
}

impl ResultSink for MemorySink {
    fn accept(&mut self, _index: usize, point: &ParetoPoint) -> Result<()> {
        self.points.push(point.clone());
        Ok(())
    }

    fn finish(&mut self, _front: &ParetoFront) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct FrontSummary<'a> {
    run_id: String,
    generated_at: String,
    points: Vec<PointSummary<'a>>,
}

#[derive(Debug, Serialize)]
struct PointSummary<'a> {
    label: &'a str,
    epsilon: Option<f64>,
    total_cost: f64,
    total_carbon: f64,
    retrofit: Option<&'a str>,
}

/// Writes `point_<n>.json` per point and `front.json` with the summary
#[derive(Debug, Clone)]
pub struct JsonDirectorySink {
    dir: PathBuf,
}

impl JsonDirectorySink {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating result directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn write_json(&self, name: &str, value: &impl Serialize) -> Result<()> {
        let path = self.dir.join(name);
        let body = serde_json::to_string_pretty(value)?;
        fs::write(&path, body).with_context(|| format!("writing {}", path.display()))?;
        debug!(path = %path.display(), "result written");
        Ok(())
    }
}

impl ResultSink for JsonDirectorySink {
    fn accept(&mut self, index: usize, point: &ParetoPoint) -> Result<()> {
        self.write_json(&format!("point_{index}.json"), point)
    }

    fn finish(&mut self, front: &ParetoFront) -> Result<()> {
        let summary = FrontSummary {
            run_id: front.run_id.to_string(),
            generated_at: front.generated_at.to_rfc3339(),
            points: front
                .points
                .iter()
                .map(|p| PointSummary {
                    label: &p.label,
                    epsilon: p.epsilon,
                    total_cost: p.report.total_cost(),
                    total_carbon: p.report.total_carbon(),
                    retrofit: p.report.retrofit.as_deref(),
                })
                .collect(),
        };
        self.write_json("front.json", &summary)
    }
}

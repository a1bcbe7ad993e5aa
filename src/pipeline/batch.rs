//! Batch runner
//!
//! Walks an input tree, mirrors each accepted file into the output tree and
//! runs the pipeline over the files on a bounded worker pool.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::{ExportError, Result};
use crate::pipeline::orchestrator::{FileReport, Pipeline};

/// Aggregate result of a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub input_root: PathBuf,
    pub output_root: PathBuf,
    pub files: Vec<FileReport>,
    pub total_elapsed: Duration,
}

impl BatchReport {
    pub fn exported(&self) -> usize {
        self.files.iter().filter(|f| f.is_exported()).count()
    }

    pub fn failed(&self) -> usize {
        self.files.len() - self.exported()
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| ExportError::Io(e.into()))
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// Runs one pipeline over every matching file under `input_root`
pub struct BatchRunner {
    pipeline: Pipeline,
    input_root: PathBuf,
    output_root: PathBuf,
}

impl BatchRunner {
    pub fn new(
        pipeline: Pipeline,
        input_root: impl Into<PathBuf>,
        output_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            pipeline,
            input_root: input_root.into(),
            output_root: output_root.into(),
        }
    }

    /// Accepted input files, sorted by path
    ///
    /// Symlinked files are included; symlinked directories are not descended.
    pub fn discover(&self) -> Result<Vec<PathBuf>> {
        if !self.input_root.is_dir() {
            return Err(ExportError::invalid_config(
                "input_folder",
                self.input_root.display(),
                "an existing directory",
            ));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&self.input_root).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                ExportError::Io(e.into_io_error().unwrap_or_else(|| {
                    std::io::Error::new(std::io::ErrorKind::Other, "directory walk failed")
                }))
            })?;
            // `Path::is_file` follows symlinks, `DirEntry::file_type` does not
            if entry.path().is_file() && self.pipeline.config().accepts_extension(entry.path()) {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }

    /// Mirror `input` under the output root with the export extension
    pub fn output_path_for(&self, input: &Path) -> PathBuf {
        let relative = input.strip_prefix(&self.input_root).unwrap_or(input);
        let relative = match relative.file_name() {
            Some(_) => relative.to_path_buf(),
            None => PathBuf::from("output"),
        };
        self.output_root
            .join(relative)
            .with_extension(self.pipeline.config().export.format.extension())
    }

    /// Process every discovered file
    ///
    /// Only discovery and pool setup can fail; per-file failures are carried
    /// in the report.
    pub fn run(&self) -> Result<BatchReport> {
        let started_at = Utc::now();
        let started = Instant::now();
        let files = self.discover()?;
        let jobs = self.pipeline.config().jobs;
        log::info!(
            "Found {} file(s) under {} ({} worker(s))",
            files.len(),
            self.input_root.display(),
            jobs
        );

        let reports: Vec<FileReport> = if jobs <= 1 {
            files
                .iter()
                .map(|input| self.pipeline.process_file(input, &self.output_path_for(input)))
                .collect()
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(jobs)
                .build()
                .map_err(|e| ExportError::invalid_config("jobs", jobs, e.to_string()))?;
            pool.install(|| {
                files
                    .par_iter()
                    .map(|input| self.pipeline.process_file(input, &self.output_path_for(input)))
                    .collect()
            })
        };

        let report = BatchReport {
            started_at,
            input_root: self.input_root.clone(),
            output_root: self.output_root.clone(),
            files: reports,
            total_elapsed: started.elapsed(),
        };
        log::info!(
            "Total processing time: {:.2} seconds ({} exported, {} failed)",
            report.total_elapsed.as_secs_f64(),
            report.exported(),
            report.failed()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{SampleWidth, SymphoniaDecoder};
    use crate::export::{Bitrate, ExportFormat, ExportSpec, WavEncoder};
    use crate::loudness::FfmpegFilter;
    use crate::pipeline::config::{EffectRequest, RunConfig};
    use std::fs;

    fn runner(input: &Path, output: &Path, format: ExportFormat) -> BatchRunner {
        let config = RunConfig::new(
            EffectRequest::default(),
            ExportSpec {
                format,
                bitrate: Bitrate::parse("96k").unwrap(),
                sample_rate_khz: 44.1,
                bit_depth: Some(SampleWidth::Bits16),
            },
        );
        let pipeline = Pipeline::with_components(
            config,
            Box::new(SymphoniaDecoder::new()),
            Box::new(WavEncoder),
            Box::new(FfmpegFilter::default()),
        )
        .unwrap();
        BatchRunner::new(pipeline, input, output)
    }

    #[test]
    fn test_output_path_mirrors_tree() {
        let r = runner(Path::new("in"), Path::new("out"), ExportFormat::M4a);
        assert_eq!(
            r.output_path_for(Path::new("in/album/disc1/track.wav")),
            PathBuf::from("out/album/disc1/track.m4a")
        );
        assert_eq!(
            r.output_path_for(Path::new("in/song.MP3")),
            PathBuf::from("out/song.m4a")
        );
    }

    #[test]
    fn test_discover_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("in");
        fs::create_dir_all(root.join("b")).unwrap();
        fs::create_dir_all(root.join("a")).unwrap();
        for name in ["b/2.wav", "a/1.MP3", "a/cover.jpg", "notes.txt", "0.wav"] {
            fs::write(root.join(name), b"x").unwrap();
        }

        let r = runner(&root, &dir.path().join("out"), ExportFormat::Wav);
        let found: Vec<_> = r
            .discover()
            .unwrap()
            .into_iter()
            .map(|p| p.strip_prefix(&root).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            found,
            vec![
                PathBuf::from("0.wav"),
                PathBuf::from("a/1.MP3"),
                PathBuf::from("b/2.wav"),
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_discover_includes_symlinked_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("in");
        fs::create_dir_all(&root).unwrap();
        let target = dir.path().join("elsewhere.wav");
        fs::write(&target, b"x").unwrap();
        std::os::unix::fs::symlink(&target, root.join("linked.wav")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone.wav"), root.join("dangling.wav"))
            .unwrap();

        let r = runner(&root, &dir.path().join("out"), ExportFormat::Wav);
        assert_eq!(r.discover().unwrap(), vec![root.join("linked.wav")]);
    }

    #[test]
    fn test_missing_input_root_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let r = runner(&dir.path().join("nope"), dir.path(), ExportFormat::Wav);
        assert_eq!(r.run().unwrap_err().error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_report_counts() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("in");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("broken.wav"), b"not audio").unwrap();

        let report = runner(&root, &dir.path().join("out"), ExportFormat::Wav)
            .run()
            .unwrap();
        assert_eq!(report.files.len(), 1);
        assert_eq!(report.failed(), 1);
        assert!(report.has_failures());
        assert!(report.to_json().unwrap().contains("\"status\": \"failed\""));
    }
}

use std::path::Path;

use serde::Serialize;

use crate::config::{AnalyzerConfig, MAX_WORKERS};

#[derive(Debug, Default, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn merge(&mut self, other: ValidationReport) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

/// Checks a run before any scheduling happens. Errors abort the run;
/// warnings are logged and the run proceeds.
pub fn validate_run(directory: &Path, workers: usize, config: &AnalyzerConfig) -> ValidationReport {
    let mut report = ValidationReport::default();

    if !directory.is_dir() {
        report.errors.push(format!(
            "Video directory does not exist or is not a directory: {}",
            directory.display()
        ));
    }

    if workers < 1 || workers > MAX_WORKERS {
        report.errors.push(format!(
            "Worker count {workers} outside the supported range 1..={MAX_WORKERS}"
        ));
    } else {
        let parallelism = num_cpus::get();
        if workers > parallelism {
            report.warnings.push(format!(
                "Worker count {workers} exceeds the {parallelism} available CPUs; \
                 extra workers will time-slice"
            ));
        }
    }

    report.merge(validate_config(config));
    report
}

fn validate_config(config: &AnalyzerConfig) -> ValidationReport {
    let mut report = ValidationReport::default();

    if !(1..=100).contains(&config.jpeg_quality) {
        report.errors.push(format!(
            "JPEG quality {} outside 1..=100",
            config.jpeg_quality
        ));
    }

    if config.append_timeout_ms == 0 {
        report
            .warnings
            .push("Append timeout of 0 ms turns every contended append into a miss".into());
    }
    if config.report_timeout_ms == 0 {
        report
            .warnings
            .push("Report timeout of 0 ms turns every full-channel send into a miss".into());
    }

    if let Some(dir) = &config.export_dir
        && dir.is_file()
    {
        report.errors.push(format!(
            "Export path exists and is a file: {}",
            dir.display()
        ));
    }

    report
}

use super::PerfTool;
use crate::model::PerfSample;
use anyhow::Context;
use std::fmt::Debug;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Produces the per-sample metric mappings of one performance tool.
pub trait PerfLogReader: Debug {
    fn read_samples(&self, tool: PerfTool, perf_dir: &Path) -> anyhow::Result<Vec<PerfSample>>;
}

/// Reads `<perf_dir>/<tool>.jsonl`, one JSON object of metrics per line.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonlPerfReader;

impl PerfLogReader for JsonlPerfReader {
    fn read_samples(&self, tool: PerfTool, perf_dir: &Path) -> anyhow::Result<Vec<PerfSample>> {
        let path = perf_dir.join(format!("{}.jsonl", tool.file_stem()));
        if !path.exists() {
            tracing::warn!(
                event = "perf_log_missing",
                path = %path.display(),
                "No {} samples found",
                tool.file_stem()
            );
            return Ok(Vec::new());
        }

        let file = File::open(&path)
            .with_context(|| format!("failed to open perf log: {}", path.display()))?;
        let reader = BufReader::new(file);

        let mut samples = Vec::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let sample: PerfSample = serde_json::from_str(&line).map_err(|e| {
                anyhow::anyhow!("{} line {}: parse error: {}", path.display(), i + 1, e)
            })?;
            samples.push(sample);
        }
        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ColumnValue;

    #[test]
    fn test_reads_samples_in_file_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("iperf.jsonl"),
            concat!(
                r#"{"NumberOfConnections": 1, "Protocol": "UDP"}"#,
                "\n\n",
                r#"{"NumberOfConnections": "8"}"#,
                "\n"
            ),
        )
        .unwrap();

        let samples = JsonlPerfReader.read_samples(PerfTool::Iperf, dir.path()).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0]["NumberOfConnections"], ColumnValue::Int(1));
        assert_eq!(samples[1]["NumberOfConnections"], ColumnValue::Text("8".into()));
    }

    #[test]
    fn test_missing_file_yields_no_samples() {
        let dir = tempfile::tempdir().unwrap();
        let samples = JsonlPerfReader.read_samples(PerfTool::Latency, dir.path()).unwrap();
        assert!(samples.is_empty());
    }

    #[test]
    fn test_malformed_line_names_location() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("fio-raid.jsonl"), "{\"QDepth\": 1}\n{oops\n").unwrap();
        let err = JsonlPerfReader
            .read_samples(PerfTool::FioRaid, dir.path())
            .unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}

//! JSON file output
//!
//! Writes the crawl output as one pretty-printed JSON object mapping each
//! field key to its array of values.

use crate::output::aggregator::CrawlOutput;
use crate::output::stats::CrawlStats;
use crate::output::traits::{OutputResult, OutputSink};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes `CrawlOutput` to a JSON file
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OutputSink for JsonFileSink {
    fn name(&self) -> &str {
        "json"
    }

    fn write(&mut self, output: &CrawlOutput, _stats: &CrawlStats) -> OutputResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer_pretty(&mut writer, output)?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        tracing::info!(
            "Wrote {} values to {}",
            output.value_count(),
            self.path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_writes_pretty_json_in_key_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("output.json");
        let output = CrawlOutput::with_keys(["title", "links"]);

        let mut sink = JsonFileSink::new(&path);
        sink.write(&output, &CrawlStats::new()).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains('\n'));
        assert!(written.find("\"title\"").unwrap() < written.find("\"links\"").unwrap());

        let parsed: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed, serde_json::json!({"title": [], "links": []}));
    }
}

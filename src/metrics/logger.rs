use super::RoundMetrics;
use anyhow::Result;
use csv::Writer;
use std::fs::File;
use std::io::Write;
use std::path::Path;

pub struct MetricsLogger<W: Write = File> {
    writer: Writer<W>,
}

impl MetricsLogger<File> {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let writer = Writer::from_path(path)?;
        Ok(Self { writer })
    }
}

impl<W: Write> MetricsLogger<W> {
    pub fn from_writer(inner: W) -> Self {
        Self {
            writer: Writer::from_writer(inner),
        }
    }

    pub fn log_batch(&mut self, history: &[RoundMetrics]) -> Result<()> {
        for metrics in history {
            self.writer.serialize(metrics)?;
        }
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer.into_inner().map_err(|e| anyhow::anyhow!("csv flush failed: {}", e.error()))
    }
}

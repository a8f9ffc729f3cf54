use std::io::{self, Write};

use serde::Serialize;

use crate::table::AbundanceTable;

/// Machine-readable run summary printed by the CLI after a table has been
/// written out.
#[derive(Debug, Clone, Serialize)]
pub struct IngestSummary {
    pub operation: String,
    pub features: usize,
    pub samples: usize,
    pub output: Option<String>,
    pub finished_at: String,
}

impl IngestSummary {
    pub fn new(operation: &str, table: &AbundanceTable, output: Option<String>) -> Self {
        Self {
            operation: operation.to_string(),
            features: table.num_features(),
            samples: table.num_samples(),
            output,
            finished_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_summary(summary: &IngestSummary) -> io::Result<()> {
        Self::print_json(summary)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

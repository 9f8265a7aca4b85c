//! Report rendering
//!
//! Text output is one `<digestHex> <sizeBytes>` line per blob followed by
//! `total: <sumBytes>`. JSON output carries full digests.

use crate::collector::CollectionReport;
use crate::config::OutputFormat;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct JsonBlob<'a> {
    digest: &'a str,
    size: u64,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    blobs: Vec<JsonBlob<'a>>,
    total: u64,
}

pub fn render(report: &CollectionReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(report)),
        OutputFormat::Json => render_json(report),
    }
}

/// Write the rendered report to `out` in one piece.
pub fn write_report<W: Write>(out: &mut W, report: &CollectionReport, format: OutputFormat) -> Result<()> {
    let rendered = render(report, format)?;
    out.write_all(rendered.as_bytes())?;
    out.flush()?;
    Ok(())
}

fn render_text(report: &CollectionReport) -> String {
    let mut text = String::new();
    for (digest, size) in report.blobs.iter() {
        text.push_str(&format!("{} {}\n", digest.hex(), size));
    }
    text.push_str(&format!("total: {}\n", report.total));
    text
}

fn render_json(report: &CollectionReport) -> Result<String> {
    let json = JsonReport {
        blobs: report
            .blobs
            .iter()
            .map(|(digest, size)| JsonBlob {
                digest: digest.as_str(),
                size,
            })
            .collect(),
        total: report.total,
    };
    let mut text = serde_json::to_string_pretty(&json)?;
    text.push('\n');
    Ok(text)
}

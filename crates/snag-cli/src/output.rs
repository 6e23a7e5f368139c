//! Output formatting for CLI commands.
//!
//! Supports table (human-readable) and JSON output formats.

use std::io::Write;

use serde::Serialize;
use snag_config::SaveReport;

use crate::cli::Format;
use crate::error::CliError;

/// Output formatter that handles both table and JSON output.
#[derive(Debug, Clone)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Get the current format.
    #[must_use]
    pub const fn format(&self) -> Format {
        self.format
    }

    /// Check if JSON format is selected.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self.format, Format::Json)
    }

    /// Write a serializable value to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => {
                value.write_table(writer)?;
            }
        }
        Ok(())
    }

    /// Write a serializable value to a string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_string<T>(&self, value: &T) -> Result<String, CliError>
    where
        T: Serialize + TableDisplay,
    {
        let mut buf = Vec::new();
        self.write(&mut buf, value)?;
        String::from_utf8(buf).map_err(|e| CliError::Format(format!("UTF-8 error: {e}")))
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(Format::Table)
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value as a human-readable table.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

/// Outcome of an accepted save.
#[derive(Debug, Clone, Serialize)]
pub struct SaveResult {
    /// Success notice.
    pub message: String,
    /// Entries submitted.
    pub submitted: usize,
    /// Incomplete entries left out of the save.
    pub dropped: usize,
    /// Project keys pruned for having no rules.
    pub pruned: usize,
}

impl SaveResult {
    /// Builds the result from a session notice and save report.
    #[must_use]
    pub fn new(message: impl Into<String>, report: SaveReport) -> Self {
        Self {
            message: message.into(),
            submitted: report.submitted,
            dropped: report.dropped,
            pruned: report.pruned,
        }
    }
}

impl TableDisplay for SaveResult {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "✓ {}", self.message)?;
        writeln!(writer, "  Submitted:      {}", self.submitted)?;
        if self.dropped > 0 {
            writeln!(writer, "  Left out:       {} incomplete", self.dropped)?;
        }
        if self.pruned > 0 {
            writeln!(writer, "  Pruned:         {} empty project(s)", self.pruned)?;
        }
        Ok(())
    }
}

/// Shortens `s` to at most `max_len` characters.
pub(crate) fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    } else {
        s.chars().take(max_len).collect()
    }
}

/// Renders an optional value, `-` when absent or empty.
pub(crate) fn or_dash(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result() -> SaveResult {
        SaveResult {
            message: "User mappings saved successfully".into(),
            submitted: 2,
            dropped: 1,
            pruned: 0,
        }
    }

    #[test]
    fn save_result_table() {
        let output = OutputFormat::new(Format::Table)
            .to_string(&result())
            .expect("should format");
        assert!(output.contains("✓ User mappings saved successfully"));
        assert!(output.contains("Left out:       1 incomplete"));
        assert!(!output.contains("Pruned"));
    }

    #[test]
    fn save_result_json() {
        let output = OutputFormat::new(Format::Json)
            .to_string(&result())
            .expect("should format");
        assert!(output.contains("\"submitted\": 2"));
    }

    #[test]
    fn format_accessors() {
        let fmt = OutputFormat::default();
        assert_eq!(fmt.format(), Format::Table);
        assert!(!fmt.is_json());
        assert!(OutputFormat::new(Format::Json).is_json());
    }

    #[test]
    fn truncate_short_string() {
        assert_eq!(truncate("hello", 10), "hello");
    }

    #[test]
    fn truncate_long_string() {
        assert_eq!(truncate("hello world", 8), "hello...");
    }

    #[test]
    fn truncate_multibyte() {
        assert_eq!(truncate("ünïcödé-name", 6), "ünï...");
    }

    #[test]
    fn dash_for_missing_values() {
        assert_eq!(or_dash(None), "-");
        assert_eq!(or_dash(Some("")), "-");
        assert_eq!(or_dash(Some("x")), "x");
    }
}

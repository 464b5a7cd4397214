//! Output formatting utilities

use std::io::IsTerminal;

use crate::cli::OutputFormat;

/// Determine the effective output format based on context
pub fn effective_format(format: OutputFormat, is_document: bool) -> OutputFormat {
    match format {
        OutputFormat::Auto => {
            if is_document {
                OutputFormat::Yaml
            } else if std::io::stdout().is_terminal() {
                OutputFormat::Table
            } else {
                OutputFormat::Tsv
            }
        }
        other => other,
    }
}

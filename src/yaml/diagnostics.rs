//! YAML errors with source spans for miette's fancy reporter

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Errors from loading a YAML document
#[derive(Debug, Error, Diagnostic)]
pub enum YamlError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] YamlSyntaxError),

    #[error("IO error: {0}")]
    #[diagnostic(code(qat::yaml::io))]
    Io(#[from] std::io::Error),
}

/// A YAML syntax or schema error pointing at the offending location
#[derive(Debug, Error, Diagnostic)]
#[error("invalid YAML in {filename}: {message}")]
#[diagnostic(
    code(qat::yaml::syntax),
    help("check indentation, quoting, and that every row has its setting fields")
)]
pub struct YamlSyntaxError {
    pub filename: String,
    pub message: String,

    #[source_code]
    pub src: NamedSource<String>,

    #[label("here")]
    pub span: Option<SourceSpan>,
}

impl YamlSyntaxError {
    /// Build from a serde_yml error, locating it in `content`
    pub fn from_serde_error(err: &serde_yml::Error, content: &str, filename: &str) -> Self {
        let span = err.location().map(|loc| {
            let offset = loc.index().min(content.len());
            SourceSpan::from((offset, 1usize.min(content.len() - offset)))
        });

        Self {
            filename: filename.to_string(),
            message: err.to_string(),
            src: NamedSource::new(filename, content.to_string()),
            span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_has_span() {
        let content = "title: ok\nequipment: [unclosed";
        let err = serde_yml::from_str::<serde_yml::Value>(content).unwrap_err();
        let diag = YamlSyntaxError::from_serde_error(&err, content, "report.qat.yaml");
        assert!(diag.span.is_some());
        assert!(!diag.message.is_empty());
        assert!(diag.to_string().starts_with("invalid YAML in report.qat.yaml"));
    }
}

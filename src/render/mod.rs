//! Printable HTML reports
//!
//! The page is laid out for A4 printing; converting it to PDF is left to
//! the browser or an external tool.

pub mod view;

pub use view::{format_value, ReportView, UNDETERMINED};

use rust_embed::Embed;
use tera::Tera;
use thiserror::Error;
use tracing::debug;

use crate::entities::report::{QaReport, ReportEvaluation};

#[derive(Embed)]
#[folder = "templates/"]
struct EmbeddedTemplates;

const REPORT_TEMPLATE: &str = "report.html";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Template not found: {0}")]
    NotFound(String),

    #[error("Template rendering error: {0}")]
    Template(String),
}

/// Renders evaluated reports with the embedded Tera templates
pub struct ReportRenderer {
    tera: Tera,
}

impl ReportRenderer {
    pub fn new() -> Result<Self, RenderError> {
        let mut tera = Tera::default();

        for file in EmbeddedTemplates::iter() {
            let filename = file.as_ref();
            if let Some(content) = EmbeddedTemplates::get(filename) {
                if let Ok(template_str) = std::str::from_utf8(&content.data) {
                    tera.add_raw_template(filename, template_str)
                        .map_err(|e| RenderError::Template(e.to_string()))?;
                }
            }
        }

        Ok(Self { tera })
    }

    /// Render `report` and its evaluation to a standalone HTML page
    pub fn render_html(
        &self,
        report: &QaReport,
        evaluation: &ReportEvaluation,
        decimals: usize,
    ) -> Result<String, RenderError> {
        if !self.tera.get_template_names().any(|n| n == REPORT_TEMPLATE) {
            return Err(RenderError::NotFound(REPORT_TEMPLATE.to_string()));
        }

        let view = ReportView::new(report, evaluation, decimals);
        let context = tera::Context::from_serialize(&view)
            .map_err(|e| RenderError::Template(e.to_string()))?;

        debug!(report = %report.id, tables = view.tables.len(), "rendering report");
        self.tera
            .render(REPORT_TEMPLATE, &context)
            .map_err(|e| RenderError::Template(render_chain(&e)))
    }
}

/// Tera nests the useful message in the error source chain
fn render_chain(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = std::error::Error::source(inner);
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;
    use crate::core::identity::RowId;
    use crate::core::reading::Reading;
    use crate::entities::equipment::{EquipmentInfo, EquipmentType};
    use crate::entities::test_table::{KvpRow, LeakageRow, Table, TestTable};

    fn sample_report() -> QaReport {
        let mut report = QaReport::new(
            "Annual QA <Room 2>",
            EquipmentInfo::new(EquipmentType::DentalIntraoral),
            "A. Tester",
        );
        report.tests.push(TestTable::RadiationLeakage(Table {
            rows: vec![
                LeakageRow {
                    id: RowId::new(),
                    location: "Front".to_string(),
                    readings: vec![Reading::parse("0.2"), Reading::parse("0.4")],
                },
                LeakageRow {
                    id: RowId::new(),
                    location: "Back".to_string(),
                    readings: vec![Reading::blank()],
                },
            ],
            ..Table::default()
        }));
        report.tests.push(TestTable::OperatingPotential(Table {
            rows: vec![KvpRow {
                id: RowId::new(),
                applied_kvp: 60.0,
                ma: None,
                time_ms: None,
                readings: vec![Reading::parse("60.4")],
            }],
            ..Table::default()
        }));
        report
    }

    #[test]
    fn test_render_contains_tables() {
        let report = sample_report();
        let eval = report.evaluate(&Config::default()).unwrap();
        let html = ReportRenderer::new()
            .unwrap()
            .render_html(&report, &eval, 2)
            .unwrap();

        assert!(html.contains("Radiation Leakage Level"));
        assert!(html.contains("Accuracy of Operating Potential"));
        assert!(html.contains("60 ± 2"));
        assert!(html.contains("0.40"));
        assert!(html.contains("—"));
    }

    #[test]
    fn test_shared_tolerance_spans_rows() {
        let report = sample_report();
        let eval = report.evaluate(&Config::default()).unwrap();
        let html = ReportRenderer::new()
            .unwrap()
            .render_html(&report, &eval, 2)
            .unwrap();

        assert!(html.contains(r#"rowspan="2""#));
        assert_eq!(html.matches("&lt;= 1").count(), 1);
    }

    #[test]
    fn test_title_is_escaped() {
        let report = sample_report();
        let eval = report.evaluate(&Config::default()).unwrap();
        let html = ReportRenderer::new()
            .unwrap()
            .render_html(&report, &eval, 2)
            .unwrap();
        assert!(html.contains("Annual QA &lt;Room 2&gt;"));
    }
}

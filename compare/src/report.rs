use std::path::Path;

use chrono::Local;
use serde::Deserialize;
use serde::Serialize;

use crate::error::CompareError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Info,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Info => "info",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub category: String,
    pub severity: Severity,
    pub message: String,
    pub action: String,
}

/// Outcome of one probe subprocess as seen by the runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub tool: String,
    pub success: bool,
    pub output: String,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_file: Option<String>,
}

impl ProbeResult {
    pub fn failed(tool: &str, error: impl Into<String>) -> Self {
        Self {
            tool: tool.to_string(),
            success: false,
            output: String::new(),
            error: error.into(),
            report_file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonSummary {
    pub timestamp: String,
    pub local_base_url: String,
    pub staging_base_url: String,
    pub total_tools: usize,
    pub successful_tools: usize,
    pub failed_tools: usize,
    pub success_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterReport {
    pub comparison_summary: ComparisonSummary,
    pub tool_results: Vec<ProbeResult>,
    pub recommendations: Vec<Recommendation>,
}

impl MasterReport {
    pub fn assemble(
        local_base_url: &str,
        staging_base_url: &str,
        tool_results: Vec<ProbeResult>,
    ) -> Self {
        let total_tools = tool_results.len();
        let successful_tools = tool_results.iter().filter(|r| r.success).count();
        let success_rate = if total_tools > 0 {
            successful_tools as f64 / total_tools as f64 * 100.0
        } else {
            0.0
        };
        Self {
            comparison_summary: ComparisonSummary {
                timestamp: Local::now().to_rfc3339(),
                local_base_url: local_base_url.to_string(),
                staging_base_url: staging_base_url.to_string(),
                total_tools,
                successful_tools,
                failed_tools: total_tools - successful_tools,
                success_rate,
            },
            recommendations: synthesize_recommendations(&tool_results),
            tool_results,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.comparison_summary.failed_tools > 0
    }
}

fn synthesize_recommendations(results: &[ProbeResult]) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    for result in results.iter().filter(|r| !r.success) {
        let (category, severity, action) = match result.tool.as_str() {
            "api_comparison" => (
                "API Issues",
                Severity::High,
                "Check if local services are running and accessible",
            ),
            "ui_comparison" => (
                "UI Issues",
                Severity::Medium,
                "Install Node.js and the browser differ, check the frontend service",
            ),
            "db_comparison" => (
                "Database Issues",
                Severity::High,
                "Check database connectivity and credentials",
            ),
            "config_comparison" => (
                "Configuration Issues",
                Severity::Medium,
                "Review environment variables and service configuration",
            ),
            _ => continue,
        };
        recommendations.push(Recommendation {
            category: category.to_string(),
            severity,
            message: format!("{} failed: {}", tool_title(&result.tool), result.error),
            action: action.to_string(),
        });
    }

    if !results.is_empty() && results.iter().all(|r| r.success) {
        recommendations.push(Recommendation {
            category: "Success".to_string(),
            severity: Severity::Info,
            message: "All comparison tools completed successfully".to_string(),
            action: "Review individual reports for detailed findings".to_string(),
        });
    }

    recommendations
}

/// "api_comparison" -> "Api Comparison".
fn tool_title(tool: &str) -> String {
    tool.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

pub fn write_pretty_json<T: Serialize>(path: &Path, value: &T) -> Result<(), CompareError> {
    let encoded = serde_json::to_string_pretty(value)?;
    std::fs::write(path, encoded)?;
    Ok(())
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Self-contained HTML rollup of a master report: inline styles, severity
/// color-coding, green/red tool borders, captured output per tool.
pub fn render_html(report: &MasterReport) -> String {
    let summary = &report.comparison_summary;

    let mut recommendations_html = String::new();
    for recommendation in &report.recommendations {
        recommendations_html.push_str(&format!(
            r#"<div class="recommendation {severity}">
    <strong>{category} ({severity_upper}):</strong> {message}<br>
    <em>Action:</em> {action}
</div>
"#,
            severity = recommendation.severity.as_str(),
            severity_upper = recommendation.severity.as_str().to_uppercase(),
            category = escape_html(&recommendation.category),
            message = escape_html(&recommendation.message),
            action = escape_html(&recommendation.action),
        ));
    }

    let mut tool_results_html = String::new();
    for result in &report.tool_results {
        let (class, status) = if result.success {
            ("success", "SUCCESS")
        } else {
            ("failure", "FAILED")
        };
        let report_file = match &result.report_file {
            Some(path) => format!(
                "<p><strong>Report File:</strong> {}</p>\n",
                escape_html(path)
            ),
            None => String::new(),
        };
        let output = if result.output.is_empty() {
            String::new()
        } else {
            format!("<h4>Output:</h4><pre>{}</pre>\n", escape_html(&result.output))
        };
        let error = if result.error.is_empty() {
            String::new()
        } else {
            format!("<h4>Error:</h4><pre>{}</pre>\n", escape_html(&result.error))
        };
        tool_results_html.push_str(&format!(
            r#"<div class="tool-result {class}">
    <h3>{title} - {status}</h3>
    {report_file}{output}{error}</div>
"#,
            title = escape_html(&tool_title(&result.tool)),
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Treeline Master Comparison Report</title>
    <style>
        body {{ font-family: Arial, sans-serif; margin: 20px; }}
        .header {{ background: #2c3e50; color: white; padding: 20px; border-radius: 5px; }}
        .summary {{ background: #ecf0f1; padding: 15px; border-radius: 5px; margin: 20px 0; }}
        .tool-result {{ border: 1px solid #bdc3c7; margin: 10px 0; padding: 15px; border-radius: 5px; }}
        .success {{ border-left: 5px solid #27ae60; }}
        .failure {{ border-left: 5px solid #e74c3c; }}
        .recommendations {{ background: #fff3cd; border: 1px solid #ffeaa7; padding: 15px; border-radius: 5px; }}
        .recommendation {{ margin: 10px 0; padding: 10px; border-radius: 3px; }}
        .high {{ background: #ffebee; }}
        .medium {{ background: #fff3e0; }}
        .info {{ background: #e8f5e8; }}
        pre {{ background: #f8f9fa; padding: 10px; border-radius: 3px; overflow-x: auto; }}
    </style>
</head>
<body>
    <div class="header">
        <h1>Treeline Master Comparison Report</h1>
        <p>Generated: {timestamp}</p>
    </div>

    <div class="summary">
        <h2>Summary</h2>
        <p><strong>Local URL:</strong> {local}</p>
        <p><strong>Staging URL:</strong> {staging}</p>
        <p><strong>Tools Run:</strong> {total}</p>
        <p><strong>Successful:</strong> {successful}</p>
        <p><strong>Failed:</strong> {failed}</p>
        <p><strong>Success Rate:</strong> {rate:.1}%</p>
    </div>

    <div class="recommendations">
        <h2>Recommendations</h2>
        {recommendations_html}
    </div>

    <h2>Tool Results</h2>
    {tool_results_html}
</body>
</html>
"#,
        timestamp = escape_html(&summary.timestamp),
        local = escape_html(&summary.local_base_url),
        staging = escape_html(&summary.staging_base_url),
        total = summary.total_tools,
        successful = summary.successful_tools,
        failed = summary.failed_tools,
        rate = summary.success_rate,
    )
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use pretty_assertions::assert_eq;

    fn succeeded(tool: &str) -> ProbeResult {
        ProbeResult {
            tool: tool.to_string(),
            success: true,
            output: "ok".to_string(),
            error: String::new(),
            report_file: Some(format!("{tool}.json")),
        }
    }

    #[test]
    fn all_success_yields_a_single_info_recommendation() {
        let report = MasterReport::assemble(
            "http://local",
            "http://staging",
            vec![succeeded("api_comparison"), succeeded("db_comparison")],
        );
        assert_eq!(report.recommendations.len(), 1);
        assert_eq!(report.recommendations[0].severity, Severity::Info);
        assert_eq!(report.recommendations[0].category, "Success");
        assert!(!report.has_failures());
        assert_eq!(report.comparison_summary.success_rate, 100.0);
    }

    #[test]
    fn failures_map_to_their_category_and_severity() {
        let report = MasterReport::assemble(
            "l",
            "s",
            vec![
                ProbeResult::failed("api_comparison", "connection refused"),
                ProbeResult::failed("ui_comparison", "Node.js not available"),
                ProbeResult::failed("db_comparison", "bad credentials"),
                ProbeResult::failed("config_comparison", "timeout"),
            ],
        );
        let severities: Vec<(&str, Severity)> = report
            .recommendations
            .iter()
            .map(|r| (r.category.as_str(), r.severity))
            .collect();
        assert_eq!(
            severities,
            vec![
                ("API Issues", Severity::High),
                ("UI Issues", Severity::Medium),
                ("Database Issues", Severity::High),
                ("Configuration Issues", Severity::Medium),
            ]
        );
        assert!(report.has_failures());
        assert_eq!(report.comparison_summary.failed_tools, 4);
    }

    #[test]
    fn mixed_results_omit_the_success_recommendation() {
        let report = MasterReport::assemble(
            "l",
            "s",
            vec![
                succeeded("api_comparison"),
                ProbeResult::failed("db_comparison", "down"),
            ],
        );
        assert_eq!(report.recommendations.len(), 1);
        assert_eq!(report.recommendations[0].category, "Database Issues");
        assert_eq!(report.comparison_summary.success_rate, 50.0);
    }

    #[test]
    fn report_round_trips_through_json() {
        let report = MasterReport::assemble(
            "http://local",
            "http://staging",
            vec![
                succeeded("api_comparison"),
                ProbeResult::failed("ui_comparison", "Node.js not available"),
            ],
        );
        let encoded = serde_json::to_string(&report).unwrap();
        let decoded: MasterReport = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, report);
    }

    #[test]
    fn severity_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Severity::High).unwrap(), "high");
        assert_eq!(serde_json::to_value(Severity::Info).unwrap(), "info");
    }

    #[test]
    fn html_report_escapes_and_color_codes() {
        let report = MasterReport::assemble(
            "http://local",
            "http://staging",
            vec![
                succeeded("api_comparison"),
                ProbeResult::failed("db_comparison", "<script>alert(1)</script>"),
            ],
        );
        let html = render_html(&report);
        assert!(html.contains("tool-result success"));
        assert!(html.contains("tool-result failure"));
        assert!(html.contains("Api Comparison - SUCCESS"));
        assert!(html.contains("Db Comparison - FAILED"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>alert"));
    }

    #[test]
    fn tool_titles_are_humanized() {
        assert_eq!(tool_title("api_comparison"), "Api Comparison");
        assert_eq!(tool_title("ui_comparison"), "Ui Comparison");
    }
}

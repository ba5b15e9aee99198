//! Markdown summary of a collection result.
//!
//! Produces human-readable tables of metric values and failures.

use crate::result::CollectionResult;

fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.3}", v),
        None => "-".to_string(),
    }
}

/// Generate a Markdown summary.
pub fn generate_markdown(result: &CollectionResult) -> String {
    let mut md = String::new();

    md.push_str(&format!("# Metric collection {}\n\n", result.collection));
    md.push_str(&format!("**Model:** {}\n\n", result.model));
    md.push_str(&format!(
        "**Metrics:** {} ({} failed)\n\n",
        result.metrics.len(),
        result.failed_metrics().len()
    ));

    md.push_str("## Metric values\n\n");
    write_metric_table(&mut md, result);

    md.push_str("## Data errors\n\n");
    write_errors(&mut md, result);

    md
}

fn write_metric_table(md: &mut String, result: &CollectionResult) {
    md.push_str("| Metric | Observation | Value | Error | Nonlinearity | Units |\n");
    md.push_str("|--------|-------------|-------|-------|--------------|-------|\n");

    for (name, entry) in &result.metrics {
        for (obs, metric) in &entry.metric {
            let nonlinearity = metric
                .nonlinearity
                .as_ref()
                .map_or_else(|| "-".to_string(), |nl| format_value(nl.value));
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} |\n",
                name,
                obs,
                format_value(metric.value),
                format_value(metric.value_error),
                nonlinearity,
                entry.metadata.units
            ));
        }
    }
    md.push('\n');
}

fn write_errors(md: &mut String, result: &CollectionResult) {
    let mut any = false;
    for (name, entry) in &result.metrics {
        for (dataset, diag) in &entry.diagnostic {
            if let Some(keyerror) = &diag.keyerror {
                md.push_str(&format!("- **{}** / {}: {}\n", name, dataset, keyerror));
                any = true;
            }
        }
    }
    if !any {
        md.push_str("None.\n");
    }
    md.push('\n');
}

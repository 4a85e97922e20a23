use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use disease_patterns_core::export::RiskTier;
use disease_patterns_core::AnalysisReport;

/// Ranked rows plus a header block and totals, as printed by the CLI.
pub fn render_table(report: &AnalysisReport) -> String {
    let meta = &report.metadata;
    let mut out = String::new();
    out.push_str(&format!("Filters: {}\n", meta.filter_description));
    out.push_str(&format!(
        "Branch: {} | Mode: {} | Age buckets: {}\n",
        meta.branch, meta.mode, meta.bucket_scheme
    ));
    if meta.approximate {
        out.push_str("Note: age and gender were re-sliced together; counts are approximate\n");
    }
    if !meta.unavailable_sources.is_empty() {
        let sources: Vec<String> = meta
            .unavailable_sources
            .iter()
            .map(|s| s.to_string())
            .collect();
        out.push_str(&format!("Unavailable: {}\n", sources.join(", ")));
    }

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("#"),
        header_cell("Diagnosis"),
        header_cell("Cases"),
        header_cell("Share"),
        header_cell("Patients"),
        header_cell("Avg Age"),
        header_cell("Gender"),
        header_cell("Age Group"),
        header_cell("Peak"),
        header_cell("Trend"),
        header_cell("Risk"),
    ]);
    apply_table_style(&mut table);
    for column in [0, 2, 3, 4, 5] {
        align_column(&mut table, column, CellAlignment::Right);
    }

    for row in &report.rows {
        let summary = &row.summary;
        let tier = RiskTier::from_percentage(summary.percentage_exact);
        table.add_row(vec![
            Cell::new(row.rank),
            Cell::new(&summary.label),
            Cell::new(summary.total_cases),
            Cell::new(format!("{}%", summary.percentage)),
            Cell::new(summary.unique_patients),
            Cell::new(format!("{:.1}", summary.average_age)),
            Cell::new(format!(
                "{} ({}%)",
                summary.dominant_gender, summary.dominant_gender_percentage
            )),
            Cell::new(&summary.dominant_age_bucket),
            Cell::new(summary.peak_month.as_deref().unwrap_or("-")),
            Cell::new(summary.trend),
            risk_cell(tier),
        ]);
    }
    out.push_str(&table.to_string());
    out.push('\n');

    let totals = &report.totals;
    out.push_str(&format!(
        "Total records: {} | Diagnoses: {} | Patients: {} | Top prevalence: {}%\n",
        totals.total_records,
        totals.unique_diagnosis_count,
        totals.unique_patients,
        totals.top_condition_prevalence
    ));
    out
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label).add_attribute(Attribute::Bold)
}

fn risk_cell(tier: RiskTier) -> Cell {
    let color = match tier {
        RiskTier::High => Color::Red,
        RiskTier::Medium => Color::Yellow,
        RiskTier::Low => Color::Green,
    };
    Cell::new(tier).fg(color)
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

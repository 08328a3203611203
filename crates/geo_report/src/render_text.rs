//! Plain-text renderer: a compact operator summary, one section per block.
//! Asset-free; same section order as the JSON form.

use std::fmt::{self, Write};

use crate::ReportModel;

pub fn render_text(m: &ReportModel) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_report(m, &mut out);
    out
}

fn write_report(m: &ReportModel, w: &mut String) -> fmt::Result {
    let o = &m.overview;
    writeln!(w, "{}", o.title)?;
    writeln!(w, "{}", "=".repeat(o.title.chars().count()))?;
    writeln!(w, "metrics:        {}", o.metric_columns.join(", "))?;
    writeln!(w, "threshold:      {}", o.threshold)?;
    writeln!(w, "regions from:   {}", o.region_source)?;
    writeln!(w, "months ({}):  {}", o.month_domain_source, o.months.join(", "))?;
    writeln!(w, "master:         {} districts in {} states", o.master_districts, o.master_states)?;
    for l in &o.levels {
        writeln!(
            w,
            "  {:<9} {} months x {} regions = {} rows ({} zero-filled)",
            l.level, l.months, l.regions, l.rows, l.zero_rows
        )?;
    }

    section(w, "Resolution")?;
    writeln!(w, "  {:<16} {:>10} {:>8} {:>8}", "status", "rows", "share", "pairs")?;
    for s in &m.resolution.statuses {
        writeln!(w, "  {:<16} {:>10} {:>8} {:>8}", s.status, s.rows, s.rows_pct_1dp, s.pairs)?;
    }
    writeln!(
        w,
        "  {:<16} {:>10} {:>8} {:>8}",
        "total", m.resolution.total_rows, "", m.resolution.total_pairs
    )?;
    writeln!(w, "  unresolved rows left out of district totals: {}", m.resolution.unresolved_rows)?;

    section(w, "Exclusions")?;
    let e = &m.exclusions;
    writeln!(w, "  raw rows:             {}", e.raw_rows)?;
    writeln!(w, "  skipped (malformed):  {}", e.skipped_malformed)?;
    writeln!(w, "  empty state:          {}", e.empty_state)?;
    writeln!(w, "  empty district:       {}", e.empty_district)?;
    writeln!(w, "  missing month:        {}", e.missing_month)?;
    writeln!(w, "  outside month domain: {}", e.outside_month_domain)?;
    writeln!(w, "  prepared rows:        {} ({} after duplicate collapse)", e.prepared_rows, e.collapsed_rows)?;

    section(w, "Totals")?;
    for t in &m.totals.rows {
        writeln!(
            w,
            "  {:<16} prepared {}  matched {}  unresolved {}",
            t.column, t.prepared, t.matched, t.unresolved
        )?;
    }

    section(w, "Validation")?;
    writeln!(w, "  overall: {}", if m.validation.pass { "PASS" } else { "FAIL" })?;
    for s in &m.validation.stages {
        writeln!(
            w,
            "  {:<20} {}  ({} errors, {} warnings)",
            s.stage,
            if s.pass { "pass" } else { "FAIL" },
            s.errors,
            s.warnings
        )?;
    }
    for i in &m.validation.issues {
        writeln!(w, "  [{}] {} {}: {}", i.severity, i.stage, i.code, i.message)?;
    }

    if !m.near_misses.rows.is_empty() {
        section(w, "Near misses")?;
        for n in &m.near_misses.rows {
            writeln!(
                w,
                "  {} / {} -> {} (score {}, {} rows)",
                n.state,
                n.district_norm,
                n.candidate.as_deref().unwrap_or("-"),
                n.score_1dp,
                n.rows
            )?;
        }
    }

    section(w, "Inputs")?;
    writeln!(w, "  engine {}", m.integrity.engine_version)?;
    for d in &m.integrity.inputs {
        writeln!(w, "  {:<7} {}  {}", d.role, d.sha256, d.path)?;
    }
    Ok(())
}

fn section(w: &mut String, title: &str) -> fmt::Result {
    writeln!(w)?;
    writeln!(w, "{title}")?;
    writeln!(w, "{}", "-".repeat(title.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_model;

    #[test]
    fn status_table_is_always_rendered() {
        let text = render_text(&build_model(&crate::tests::sample_summary()));
        assert!(text.contains("Resolution"));
        for status in ["matched", "low_confidence", "no_match", "state_not_found"] {
            assert!(text.contains(status), "missing {status}");
        }
        assert!(text.contains("overall: PASS"));
        assert!(text.contains("panaji -> north goa") || text.contains("panaji -> south goa"));
    }
}

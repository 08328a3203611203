//! render_json.rs — Report JSON renderer
//! (overview → resolution → exclusions → totals → validation → near_misses → integrity).
//!
//! The value is written through the canonical JSON writer, which sorts keys;
//! section content is built explicitly so no field leaks in by accident.

use serde_json::{Map as JsonMap, Value};

use crate::{
    ReportModel, SectionExclusions, SectionIntegrity, SectionNearMisses, SectionOverview,
    SectionResolution, SectionTotals, SectionValidation,
};

pub fn render_json(m: &ReportModel) -> Value {
    let mut root = obj();
    root.insert("overview".into(), overview_json(&m.overview));
    root.insert("resolution".into(), resolution_json(&m.resolution));
    root.insert("exclusions".into(), exclusions_json(&m.exclusions));
    root.insert("totals".into(), totals_json(&m.totals));
    root.insert("validation".into(), validation_json(&m.validation));
    root.insert("near_misses".into(), near_misses_json(&m.near_misses));
    root.insert("integrity".into(), integrity_json(&m.integrity));
    Value::Object(root)
}

/* ----------------------- sections ----------------------- */

fn overview_json(o: &SectionOverview) -> Value {
    let mut v = obj();
    v.insert("title".into(), Value::String(o.title.clone()));
    v.insert("metric_columns".into(), strings(&o.metric_columns));
    v.insert("threshold".into(), Value::String(o.threshold.clone()));
    v.insert("region_source".into(), Value::String(o.region_source.clone()));
    v.insert("months".into(), strings(&o.months));
    v.insert("month_domain_source".into(), Value::String(o.month_domain_source.clone()));

    let mut master = obj();
    master.insert("districts".into(), o.master_districts.into());
    master.insert("states".into(), o.master_states.into());
    v.insert("master".into(), Value::Object(master));

    let levels = o
        .levels
        .iter()
        .map(|l| {
            let mut r = obj();
            r.insert("level".into(), Value::String(l.level.clone()));
            r.insert("months".into(), l.months.into());
            r.insert("regions".into(), l.regions.into());
            r.insert("rows".into(), l.rows.into());
            r.insert("zero_rows".into(), l.zero_rows.into());
            Value::Object(r)
        })
        .collect();
    v.insert("levels".into(), Value::Array(levels));
    Value::Object(v)
}

fn resolution_json(r: &SectionResolution) -> Value {
    let mut v = obj();
    let statuses = r
        .statuses
        .iter()
        .map(|s| {
            let mut row = obj();
            row.insert("status".into(), Value::String(s.status.clone()));
            row.insert("rows".into(), s.rows.into());
            row.insert("rows_pct".into(), Value::String(s.rows_pct_1dp.clone()));
            row.insert("pairs".into(), s.pairs.into());
            Value::Object(row)
        })
        .collect();
    v.insert("statuses".into(), Value::Array(statuses));
    v.insert("total_rows".into(), r.total_rows.into());
    v.insert("total_pairs".into(), r.total_pairs.into());
    v.insert("unresolved_rows".into(), r.unresolved_rows.into());
    Value::Object(v)
}

fn exclusions_json(e: &SectionExclusions) -> Value {
    let mut v = obj();
    v.insert("raw_rows".into(), e.raw_rows.into());
    v.insert("skipped_malformed".into(), e.skipped_malformed.into());
    v.insert("empty_state".into(), e.empty_state.into());
    v.insert("empty_district".into(), e.empty_district.into());
    v.insert("missing_month".into(), e.missing_month.into());
    v.insert("outside_month_domain".into(), e.outside_month_domain.into());
    v.insert("total_excluded".into(), e.total_excluded.into());
    v.insert("prepared_rows".into(), e.prepared_rows.into());
    v.insert("collapsed_rows".into(), e.collapsed_rows.into());
    Value::Object(v)
}

fn totals_json(t: &SectionTotals) -> Value {
    Value::Array(
        t.rows
            .iter()
            .map(|r| {
                let mut row = obj();
                row.insert("column".into(), Value::String(r.column.clone()));
                row.insert("prepared".into(), Value::String(r.prepared.clone()));
                row.insert("matched".into(), Value::String(r.matched.clone()));
                row.insert("unresolved".into(), Value::String(r.unresolved.clone()));
                Value::Object(row)
            })
            .collect(),
    )
}

fn validation_json(s: &SectionValidation) -> Value {
    let mut v = obj();
    v.insert("pass".into(), Value::Bool(s.pass));
    let stages = s
        .stages
        .iter()
        .map(|st| {
            let mut row = obj();
            row.insert("stage".into(), Value::String(st.stage.clone()));
            row.insert("pass".into(), Value::Bool(st.pass));
            row.insert("errors".into(), st.errors.into());
            row.insert("warnings".into(), st.warnings.into());
            Value::Object(row)
        })
        .collect();
    v.insert("stages".into(), Value::Array(stages));
    let issues = s
        .issues
        .iter()
        .map(|i| {
            let mut row = obj();
            row.insert("stage".into(), Value::String(i.stage.clone()));
            row.insert("severity".into(), Value::String(i.severity.clone()));
            row.insert("code".into(), Value::String(i.code.clone()));
            row.insert("message".into(), Value::String(i.message.clone()));
            Value::Object(row)
        })
        .collect();
    v.insert("issues".into(), Value::Array(issues));
    Value::Object(v)
}

fn near_misses_json(n: &SectionNearMisses) -> Value {
    Value::Array(
        n.rows
            .iter()
            .map(|r| {
                let mut row = obj();
                row.insert("state".into(), Value::String(r.state.clone()));
                row.insert("district_norm".into(), Value::String(r.district_norm.clone()));
                row.insert(
                    "candidate".into(),
                    r.candidate.clone().map(Value::String).unwrap_or(Value::Null),
                );
                row.insert("score".into(), Value::String(r.score_1dp.clone()));
                row.insert("rows".into(), r.rows.into());
                Value::Object(row)
            })
            .collect(),
    )
}

fn integrity_json(i: &SectionIntegrity) -> Value {
    let mut v = obj();
    v.insert("engine_version".into(), Value::String(i.engine_version.clone()));
    let inputs = i
        .inputs
        .iter()
        .map(|d| {
            let mut row = obj();
            row.insert("role".into(), Value::String(d.role.clone()));
            row.insert("path".into(), Value::String(d.path.clone()));
            row.insert("sha256".into(), Value::String(d.sha256.clone()));
            Value::Object(row)
        })
        .collect();
    v.insert("inputs".into(), Value::Array(inputs));
    Value::Object(v)
}

/* ----------------------- helpers ----------------------- */

#[inline]
fn obj() -> JsonMap<String, Value> {
    JsonMap::new()
}

fn strings(items: &[String]) -> Value {
    Value::Array(items.iter().cloned().map(Value::String).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_model;

    #[test]
    fn sections_are_all_present() {
        let v = render_json(&build_model(&crate::tests::sample_summary()));
        for key in ["overview", "resolution", "exclusions", "totals", "validation", "near_misses", "integrity"] {
            assert!(v.get(key).is_some(), "missing section {key}");
        }
        assert_eq!(v["resolution"]["statuses"][3]["status"], "state_not_found");
        assert_eq!(v["resolution"]["statuses"][3]["rows"], 1);
        assert_eq!(v["totals"][0]["matched"], "6");
        assert!(v["near_misses"][0]["candidate"].is_string());
    }
}

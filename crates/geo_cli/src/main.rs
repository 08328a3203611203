// crates/geo_cli/src/main.rs
//
// Wires files → pipeline → artifacts: exit codes, typed error mapping,
// logging initialisation, the `run` path (load → overrides → pipeline →
// tables + summary → optional rendering) and `build-master`.

mod args; // sibling module in this crate

mod exitcodes {
    /// Process exit codes.
    pub const OK: i32 = 0;
    /// Usage, configuration, or unreadable input content.
    pub const CONFIG: i32 = 2;
    /// Sum preservation, duplicate keys, or null keys failed.
    pub const INVARIANT: i32 = 3;
    pub const IO: i32 = 4;
}

use std::path::Path;
use std::process::ExitCode;

use args::{parse_and_validate as parse_cli, BuildMasterArgs, Command, RunArgs};
use geo_core::Params;
use geo_io::{canonical_json, hasher, IoError};
use geo_pipeline::{run, InputDigest, PipelineError, PipelineOutputs, RunInputs};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Central error type for CLI → exit-code mapping.
#[derive(Debug)]
enum MainError {
    /// Bad flags, params, or input content (missing columns, unparsable CSV/JSON)
    Config(String),
    /// A validation invariant failed; the run stopped
    Invariant(String),
    /// Read/write/path errors
    Io(String),
    /// Rendering errors (report build or output)
    Render(String),
}

impl std::fmt::Display for MainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MainError::Config(m) => write!(f, "config: {m}"),
            MainError::Invariant(m) => write!(f, "invariant: {m}"),
            MainError::Io(m) => write!(f, "io: {m}"),
            MainError::Render(m) => write!(f, "render: {m}"),
        }
    }
}

fn main() -> ExitCode {
    let cli = match parse_cli() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("georoll: error: {e}");
            return ExitCode::from(exitcodes::CONFIG as u8);
        }
    };
    init_tracing(cli.quiet);

    let result = match &cli.command {
        Command::Run(a) => run_once(a),
        Command::BuildMaster(a) => build_master(a),
    };
    let rc = match result {
        Ok(()) => exitcodes::OK,
        Err(e) => {
            eprintln!("georoll: error: {e}");
            map_error(&e)
        }
    };
    ExitCode::from(rc as u8)
}

/// Logs go to stderr. `RUST_LOG` wins unless `--quiet` is given.
fn init_tracing(quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("warn")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Map our typed errors to the exit-code table.
fn map_error(e: &MainError) -> i32 {
    use exitcodes::*;
    match e {
        MainError::Config(_) => CONFIG,
        MainError::Invariant(_) => INVARIANT,
        MainError::Io(_) => IO,
        MainError::Render(_) => IO,
    }
}

/// Translate geo_io::IoError into MainError buckets.
fn map_io_err(e: IoError) -> MainError {
    use IoError::*;
    match e {
        // Input content / configuration
        Csv { .. } | MissingColumn { .. } | Json { .. } | Invalid(_) => MainError::Config(e.to_string()),
        // I/O-ish
        Path(m) => MainError::Io(format!("path: {m}")),
        Hash(m) => MainError::Io(format!("hash: {m}")),
    }
}

/// Translate geo_pipeline::PipelineError into MainError buckets.
fn map_pipeline_err(e: PipelineError) -> MainError {
    if e.is_invariant() {
        MainError::Invariant(e.to_string())
    } else {
        MainError::Config(e.to_string())
    }
}

// ------------------------------------------------------------------
// run
// ------------------------------------------------------------------

fn run_once(a: &RunArgs) -> Result<(), MainError> {
    // 1) Params file (defaults for omitted fields), then CLI overrides
    let mut params = match &a.params {
        Some(p) => geo_io::load_params(p).map_err(map_io_err)?,
        None => Params::default(),
    };
    apply_overrides(&mut params, a);
    params.validate().map_err(|e| MainError::Config(e.to_string()))?;

    // 2) Inputs
    let master = geo_io::read_master_csv(&a.master).map_err(map_io_err)?;
    if master.empty > 0 {
        warn!(empty = master.empty, "empty master rows dropped");
    }
    let batch = geo_io::read_raw_csvs(a.raw.as_slice(), &params.metric_columns).map_err(map_io_err)?;
    info!(files = batch.sources.len(), records = batch.len(), skipped = batch.skipped, "raw exports read");

    let mut digests = vec![digest("master", &a.master)?];
    for r in &a.raw {
        digests.push(digest("raw", r)?);
    }
    if let Some(p) = &a.params {
        digests.push(digest("params", p)?);
    }

    // 3) Pipeline
    let inputs = RunInputs {
        master: master.entries,
        raw: batch.records,
        skipped_malformed: batch.skipped,
        digests,
    };
    let outs = run(inputs, params).map_err(map_pipeline_err)?;

    // 4) Artifacts
    write_artifacts(&a.out, &outs)?;

    // 5) Optional report rendering (read-only)
    maybe_render_reports(a, &outs, &a.out)?;

    info!(out = %a.out.display(), "artifacts written");
    Ok(())
}

/// CLI flags win over the params file.
fn apply_overrides(params: &mut Params, a: &RunArgs) {
    if let Some(p) = a.preset {
        params.metric_columns = p.column_names();
    }
    if !a.metrics.is_empty() {
        params.metric_columns = a.metrics.iter().map(|m| m.trim().to_string()).collect();
    }
    if let Some(t) = a.threshold {
        params.threshold = t;
    }
    if let Some(d) = &a.months {
        params.month_domain = Some(d.clone());
    }
    if let Some(r) = a.region_source {
        params.region_source = r;
    }
}

fn digest(role: &str, path: &Path) -> Result<InputDigest, MainError> {
    Ok(InputDigest {
        role: role.to_string(),
        path: path.display().to_string(),
        sha256: hasher::sha256_file(path).map_err(map_io_err)?,
    })
}

fn write_artifacts(out_dir: &Path, outs: &PipelineOutputs) -> Result<(), MainError> {
    std::fs::create_dir_all(out_dir)
        .map_err(|e| MainError::Io(format!("mkdir {}: {e}", out_dir.display())))?;

    for (name, table) in [
        ("district_monthly.csv", &outs.district),
        ("state_monthly.csv", &outs.state),
        ("national_monthly.csv", &outs.national),
    ] {
        geo_io::write_table_csv(&out_dir.join(name), table)
            .map_err(|e| MainError::Io(format!("write {name}: {e}")))?;
    }

    canonical_json::write_canonical_file(&out_dir.join("run_summary.json"), &outs.summary)
        .map_err(|e| MainError::Io(format!("write run_summary.json: {e}")))?;
    Ok(())
}

fn maybe_render_reports(a: &RunArgs, outs: &PipelineOutputs, out_dir: &Path) -> Result<(), MainError> {
    if a.render.is_empty() {
        return Ok(());
    }
    let model = geo_report::build_model(&outs.summary);

    // Emit requested formats (unknown → error)
    for fmt in &a.render {
        match fmt.as_str() {
            "json" => render_json_report(&model, out_dir)?,
            "text" => render_text_report(&model, out_dir)?,
            other => return Err(MainError::Render(format!("unknown renderer: {other}"))),
        }
    }
    Ok(())
}

// Always accept the concrete model type; gate body by feature.
fn render_json_report(model: &geo_report::ReportModel, out_dir: &Path) -> Result<(), MainError> {
    #[cfg(feature = "report-json")]
    {
        let value = geo_report::render_json(model);
        canonical_json::write_canonical_file(&out_dir.join("report.json"), &value)
            .map_err(|e| MainError::Io(format!("write report.json: {e}")))
    }
    #[cfg(not(feature = "report-json"))]
    {
        let _ = (model, out_dir);
        Err(MainError::Render("json renderer not enabled (build with feature `report-json`)".into()))
    }
}

fn render_text_report(model: &geo_report::ReportModel, out_dir: &Path) -> Result<(), MainError> {
    #[cfg(feature = "report-text")]
    {
        let text = geo_report::render_text(model);
        canonical_json::write_atomic(&out_dir.join("report.txt"), text.as_bytes())
            .map_err(|e| MainError::Io(format!("write report.txt: {e}")))
    }
    #[cfg(not(feature = "report-text"))]
    {
        let _ = (model, out_dir);
        Err(MainError::Render("text renderer not enabled (build with feature `report-text`)".into()))
    }
}

// ------------------------------------------------------------------
// build-master
// ------------------------------------------------------------------

fn build_master(a: &BuildMasterArgs) -> Result<(), MainError> {
    let load = geo_io::build_master_from_lgd_csv(&a.lgd).map_err(map_io_err)?;
    if load.entries.is_empty() {
        return Err(MainError::Config(format!("{}: no usable districts", a.lgd.display())));
    }
    geo_io::write_master_csv(&a.out, &load.entries).map_err(map_io_err)?;
    info!(
        out = %a.out.display(),
        districts = load.entries.len(),
        empty = load.empty,
        duplicates = load.duplicates,
        "master written"
    );
    Ok(())
}

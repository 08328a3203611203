// crates/geo_cli/src/args.rs
//
// Deterministic, offline CLI argument surface.
//
// Rules:
// - No networked paths (reject any scheme:// like http/https/file)
// - `run`: --master + one or more --raw; metrics from --preset XOR --metrics
//   (or the params file); CLI overrides win over the params file
// - `build-master`: --lgd + --out
// - --render [json|text]* emits report files next to the tables

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use clap::{Args as ClapArgs, Parser, Subcommand};
use geo_core::{MetricPreset, MonthDomain, RegionSource};

/// Parsed CLI arguments (raw).
#[derive(Debug, Parser, Clone)]
#[command(
    name = "georoll",
    disable_help_subcommand = true,
    about = "Offline district resolution and monthly rollup of pincode-level records"
)]
pub struct Cli {
    /// Only warnings and errors on stderr (overrides RUST_LOG).
    #[arg(long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Resolve raw exports against the master and write gridded monthly tables.
    Run(RunArgs),
    /// Build the canonical district master from the raw LGD key export.
    BuildMaster(BuildMasterArgs),
}

#[derive(Debug, ClapArgs, Clone)]
pub struct RunArgs {
    /// Canonical district master CSV (state_norm, district_standard, district_lgd_code).
    #[arg(long)]
    pub master: PathBuf,

    /// Raw export CSV; repeat for several files (read in order).
    #[arg(long = "raw", required = true, num_args = 1..)]
    pub raw: Vec<PathBuf>,

    /// Fixed metric columns of a feed shape: enrolment, biometric, demographic.
    #[arg(long, value_parser = parse_preset, conflicts_with = "metrics")]
    pub preset: Option<MetricPreset>,

    /// Explicit comma-separated metric columns.
    #[arg(long, value_delimiter = ',', conflicts_with = "preset")]
    pub metrics: Vec<String>,

    /// Params JSON; omitted fields take their defaults.
    #[arg(long)]
    pub params: Option<PathBuf>,

    /// Match acceptance threshold, 0..=100.
    #[arg(long, value_parser = parse_threshold)]
    pub threshold: Option<f64>,

    /// Comma-separated month order, e.g. "March 2025,April 2025".
    #[arg(long, value_parser = parse_months)]
    pub months: Option<MonthDomain>,

    /// Where grid regions come from: master or observed.
    #[arg(long, value_parser = parse_region_source)]
    pub region_source: Option<RegionSource>,

    /// Output directory (default: current directory).
    #[arg(long, default_value = ".")]
    pub out: PathBuf,

    /// Renderer(s) to emit. Choose up to 2 (json, text). Omit to skip rendering.
    #[arg(long, value_parser = ["json", "text"], num_args = 0..=2)]
    pub render: Vec<String>,
}

#[derive(Debug, ClapArgs, Clone)]
pub struct BuildMasterArgs {
    /// Raw LGD key export (State Name, District Name (In English), District LGD Code).
    #[arg(long)]
    pub lgd: PathBuf,

    /// Destination master CSV.
    #[arg(long)]
    pub out: PathBuf,
}

/// Errors surfaced by argument validation.
/// Keep messages short/stable (handy for scripts/tests).
#[derive(Debug)]
pub enum CliError {
    NonLocalPath(String),
    NotFound(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use CliError::*;
        match self {
            NonLocalPath(p) => write!(f, "path must be local file (no scheme): {p}"),
            NotFound(p) => write!(f, "file not found: {p}"),
        }
    }
}
impl std::error::Error for CliError {}

/* ---------------- value parsers ---------------- */

pub fn parse_preset(s: &str) -> Result<MetricPreset, String> {
    s.parse().map_err(|e| format!("{e}"))
}

pub fn parse_region_source(s: &str) -> Result<RegionSource, String> {
    s.parse().map_err(|e| format!("{e}"))
}

pub fn parse_threshold(s: &str) -> Result<f64, String> {
    let t: f64 = s.trim().parse().map_err(|_| format!("not a number: {s}"))?;
    if !(0.0..=100.0).contains(&t) {
        return Err("threshold must be within 0..=100".into());
    }
    Ok(t)
}

pub fn parse_months(s: &str) -> Result<MonthDomain, String> {
    let labels: Vec<&str> = s.split(',').map(str::trim).filter(|l| !l.is_empty()).collect();
    if labels.is_empty() {
        return Err("empty month list".into());
    }
    MonthDomain::from_labels(&labels).map_err(|e| format!("{e}"))
}

/* ---------------- path checks ---------------- */

/// Reject any explicit URI scheme (e.g., http://, https://, file://).
#[inline]
fn has_scheme(s: &str) -> bool {
    let lower = s.trim().to_ascii_lowercase();
    lower.contains("://") || lower.starts_with("http:") || lower.starts_with("https:") || lower.starts_with("file:")
}

/// Ensure a provided path string is local (no scheme); existence is checked separately.
#[inline]
fn ensure_local_path(p: &Path) -> Result<(), CliError> {
    if let Some(s) = p.to_str() {
        if has_scheme(s) {
            return Err(CliError::NonLocalPath(s.to_string()));
        }
    }
    Ok(())
}

/// Ensure a path is local (no scheme) and exists as a regular file.
fn ensure_local_exists(p: &Path, label: &'static str) -> Result<(), CliError> {
    ensure_local_path(p)?;
    let meta = fs::metadata(p).map_err(|_| CliError::NotFound(format!("{label} {}", p.display())))?;
    if !meta.is_file() {
        return Err(CliError::NotFound(format!("{label} {}", p.display())));
    }
    Ok(())
}

/// Best-effort normalization to an absolute path.
/// If canonicalize fails (e.g., path doesn't exist yet), produce an absolute path relative to CWD.
fn normalize_path(p: &Path) -> PathBuf {
    fs::canonicalize(p).unwrap_or_else(|_| {
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            env::current_dir().unwrap_or_else(|_| PathBuf::from(".")).join(p)
        }
    })
}

/* ---------------- entry points ---------------- */

/// Entry point used by main.rs. Usage errors exit through clap (code 2).
pub fn parse_and_validate() -> Result<Cli, CliError> {
    validate(Cli::parse())
}

/// Scheme and existence checks, then path normalization.
pub fn validate(mut cli: Cli) -> Result<Cli, CliError> {
    match &mut cli.command {
        Command::Run(a) => {
            ensure_local_exists(&a.master, "--master")?;
            for r in &a.raw {
                ensure_local_exists(r, "--raw")?;
            }
            if let Some(p) = &a.params {
                ensure_local_exists(p, "--params")?;
            }
            ensure_local_path(&a.out)?;

            a.master = normalize_path(&a.master);
            a.raw = a.raw.iter().map(|p| normalize_path(p)).collect();
            a.params = a.params.take().map(|p| normalize_path(&p));
            a.out = normalize_path(&a.out);
        }
        Command::BuildMaster(a) => {
            ensure_local_exists(&a.lgd, "--lgd")?;
            ensure_local_path(&a.out)?;
            a.lgd = normalize_path(&a.lgd);
            a.out = normalize_path(&a.out);
        }
    }
    Ok(cli)
}

// ------------------------------
// Tests
// ------------------------------
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_parser_bounds() {
        assert_eq!(parse_threshold("85").unwrap(), 85.0);
        assert_eq!(parse_threshold("0").unwrap(), 0.0);
        assert!(parse_threshold("100.5").is_err());
        assert!(parse_threshold("-1").is_err());
        assert!(parse_threshold("high").is_err());
    }

    #[test]
    fn months_parser_keeps_given_order() {
        let d = parse_months("April 2025, March 2025").unwrap();
        let labels: Vec<String> = d.months().iter().map(|m| m.label()).collect();
        assert_eq!(labels, vec!["April 2025", "March 2025"]);
        assert!(parse_months(" , ").is_err());
        assert!(parse_months("March 2025,March 2025").is_err());
    }

    #[test]
    fn preset_and_metrics_conflict() {
        let r = Cli::try_parse_from([
            "georoll", "run", "--master", "m.csv", "--raw", "r.csv", "--preset", "biometric",
            "--metrics", "a,b",
        ]);
        assert!(r.is_err());
    }

    #[test]
    fn run_flags_parse() {
        let cli = Cli::try_parse_from([
            "georoll", "--quiet", "run", "--master", "m.csv", "--raw", "a.csv", "b.csv",
            "--metrics", "x,y", "--region-source", "observed", "--render", "json", "text",
        ])
        .unwrap();
        assert!(cli.quiet);
        match cli.command {
            Command::Run(a) => {
                assert_eq!(a.raw.len(), 2);
                assert_eq!(a.metrics, vec!["x", "y"]);
                assert_eq!(a.region_source, Some(RegionSource::Observed));
                assert_eq!(a.render, vec!["json", "text"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn ensure_local_path_rejects_schemes() {
        assert!(ensure_local_path(Path::new("http://x")).is_err());
        assert!(ensure_local_path(Path::new("file://C:/x.csv")).is_err());
        assert!(ensure_local_path(Path::new("/tmp/file.csv")).is_ok());
    }

    #[test]
    fn missing_inputs_are_reported() {
        let cli = Cli::try_parse_from([
            "georoll", "build-master", "--lgd", "definitely/not/here.csv", "--out", "m.csv",
        ])
        .unwrap();
        assert!(matches!(validate(cli), Err(CliError::NotFound(_))));
    }

    #[test]
    fn normalize_path_returns_absolute() {
        let abs = normalize_path(Path::new("does/not/exist.csv"));
        assert!(abs.is_absolute());
    }
}

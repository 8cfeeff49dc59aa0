//! CLI binary for aqreports.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `RunConfig` and prints the run summary.

use anyhow::{Context, Result};
use aqreports::{
    run, run_local, OcrBackend, ProgressCallback, RunConfig, RunOutput, RunProgressCallback,
};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar for the run plus a log line per report.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Wall-clock start per report name.
    start_times: Mutex<HashMap<String, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_run_start` reports how many reports there are.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Harvesting");
        bar.set_message("Fetching listing page…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} reports  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Processing");
    }

    fn elapsed(&self, name: &str) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(name))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl RunProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_reports: usize) {
        self.activate_bar(total_reports);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Processing {total_reports} reports…"))
        ));
    }

    fn on_report_start(&self, name: &str, _index: usize, _total: usize) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(name.to_string(), Instant::now());
        }
        self.bar.set_message(name.to_string());
        self.bar.inc(1);
    }

    fn on_report_complete(&self, name: &str, rows: usize) {
        let secs = self.elapsed(name);
        self.bar.println(format!(
            "  {} {:<40}  {:<10}  {}",
            green("✓"),
            name,
            dim(&format!("{rows:>4} rows")),
            dim(&format!("{secs:.1}s")),
        ));
    }

    fn on_report_error(&self, name: &str, error: &str) {
        let secs = self.elapsed(name);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg = if error.chars().count() > 80 {
            let cut: String = error.chars().take(79).collect();
            format!("{cut}\u{2026}")
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} {:<40}  {}  {}",
            red("✗"),
            name,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
    }

    fn on_run_complete(&self, total_reports: usize, success_count: usize) {
        let failed = total_reports.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} reports cleaned",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} reports cleaned  ({} skipped)",
                if success_count == 0 { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total_reports,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Full run: harvest, download and process into ./reports
  aqreports --work-dir reports

  # Re-process PDFs already downloaded, no network except OCR
  aqreports --work-dir reports --local

  # Extra block-list entries (substrings of the report link)
  aqreports --block June2020 --block Dec2021

  # Transcribe image tables with a vision LLM instead of Cloud Vision
  aqreports --ocr-backend vlm --provider openai --model gpt-4.1-mini

  # Machine-readable summary
  aqreports --json > run.json

OUTPUT LAYOUT (inside --work-dir):
  <report>.pdf                 downloaded reports
  <report>.csv                 OCR sheet of an image-table report
  extracted_images/<report>.png   page image of an image-table report
  extracted_data/<report>.csv     cleaned table per report
  final_data.csv               all reports, dates normalised, with Year

ENVIRONMENT VARIABLES:
  GOOGLE_VISION_API_KEY   Cloud Vision key (default OCR backend)
  OPENAI_API_KEY          OpenAI key for --ocr-backend vlm
  ANTHROPIC_API_KEY       Anthropic key for --ocr-backend vlm
  GEMINI_API_KEY          Gemini key for --ocr-backend vlm
  EDGEQUAKE_LLM_PROVIDER  Provider for --ocr-backend vlm (same as --provider)
  EDGEQUAKE_MODEL         Model for --ocr-backend vlm (same as --model)
  AQREPORTS_BLOCK         Comma-separated extra block-list substrings
  AQREPORTS_API_TIMEOUT   VLM request timeout in seconds (default 60)
  PDFIUM_LIB_PATH         Directory or file of an existing libpdfium
"#;

/// Harvest air-quality PDF reports and normalise their tables into one CSV.
#[derive(Parser, Debug)]
#[command(
    name = "aqreports",
    version,
    about = "Harvest air-quality PDF reports and normalise their tables into one CSV",
    long_about = "Downloads the monthly air-quality reports linked from the EPA listing page, \
extracts the readings table from each (text layout, page text or OCR), cleans every layout \
variant into the same columns and writes per-report CSVs plus final_data.csv.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Listing page whose PDF links are harvested.
    #[arg(long, env = "AQREPORTS_LISTING_URL")]
    listing_url: Option<String>,

    /// Origin prefixed to relative PDF links.
    #[arg(long, env = "AQREPORTS_ORIGIN")]
    origin: Option<String>,

    /// Extra block-list substring (repeatable, or comma-separated in the env var).
    /// Added to the built-in list.
    #[arg(long = "block", value_name = "SUBSTRING", env = "AQREPORTS_BLOCK",
          value_delimiter = ',')]
    block: Vec<String>,

    /// Working directory for PDFs, sheets and CSVs.
    #[arg(short, long, env = "AQREPORTS_WORK_DIR", default_value = ".")]
    work_dir: PathBuf,

    /// Process PDFs already in the work directory; skip harvest and download.
    #[arg(long, env = "AQREPORTS_LOCAL")]
    local: bool,

    /// OCR service for image-table reports.
    #[arg(long, env = "AQREPORTS_OCR_BACKEND", value_enum, default_value = "vision")]
    ocr_backend: OcrBackendArg,

    /// Cloud Vision API key.
    #[arg(long, env = "GOOGLE_VISION_API_KEY", hide_env_values = true)]
    vision_api_key: Option<String>,

    /// LLM provider for the VLM backend: openai, anthropic, gemini, mistral, ollama.
    #[arg(long, env = "EDGEQUAKE_LLM_PROVIDER")]
    provider: Option<String>,

    /// LLM model ID for the VLM backend.
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// Cloud Vision request timeout in seconds.
    #[arg(long, env = "AQREPORTS_OCR_TIMEOUT", default_value_t = 15)]
    ocr_timeout: u64,

    /// VLM chat request timeout in seconds.
    #[arg(long, env = "AQREPORTS_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Minimum OCR word confidence (0–100).
    #[arg(long, env = "AQREPORTS_MIN_CONFIDENCE", default_value_t = 50,
          value_parser = clap::value_parser!(u8).range(0..=100))]
    min_confidence: u8,

    /// HTTP timeout in seconds for the listing page and each download.
    #[arg(long, env = "AQREPORTS_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Path to libpdfium (file or directory).
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Print the run output (summary and per-report outcomes) as JSON on stdout.
    #[arg(long, env = "AQREPORTS_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "AQREPORTS_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "AQREPORTS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "AQREPORTS_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum OcrBackendArg {
    Vision,
    Vlm,
}

impl From<OcrBackendArg> for OcrBackend {
    fn from(v: OcrBackendArg) -> Self {
        match v {
            OcrBackendArg::Vision => OcrBackend::Vision,
            OcrBackendArg::Vlm => OcrBackend::Vlm,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn RunProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Run ──────────────────────────────────────────────────────────────
    let output = if cli.local {
        run_local(&config).await
    } else {
        run(&config).await
    }
    .context("Run failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&json_report(&output))
            .context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&output, show_progress);
    }

    Ok(())
}

/// Map CLI args to `RunConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<RunConfig> {
    let mut builder = RunConfig::builder()
        .work_dir(cli.work_dir.clone())
        .ocr_backend(cli.ocr_backend.clone().into())
        .ocr_timeout_secs(cli.ocr_timeout)
        .api_timeout_secs(cli.api_timeout)
        .ocr_min_confidence(cli.min_confidence)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref url) = cli.listing_url {
        builder = builder.listing_url(url.clone());
    }
    if let Some(ref origin) = cli.origin {
        builder = builder.site_origin(origin.clone());
    }
    for b in &cli.block {
        builder = builder.block(b.clone());
    }
    if let Some(ref key) = cli.vision_api_key {
        builder = builder.vision_api_key(key.clone());
    }
    if let Some(ref p) = cli.provider {
        builder = builder.provider_name(p.clone());
    }
    if let Some(ref m) = cli.model {
        builder = builder.model(m.clone());
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_lib_path(lib.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn json_report(output: &RunOutput) -> serde_json::Value {
    serde_json::json!({
        "final_csv": output.final_csv,
        "summary": output.summary,
        "reports": output.reports,
    })
}

fn print_summary(output: &RunOutput, show_progress: bool) {
    let s = &output.summary;
    if !show_progress {
        eprintln!(
            "Cleaned {}/{} reports in {}ms",
            s.cleaned,
            s.cleaned + s.failed,
            s.total_duration_ms
        );
        for r in output.reports.iter().filter(|r| !r.succeeded()) {
            if let Some(ref e) = r.error {
                eprintln!("  {} {}", red("✗"), e);
            }
        }
    }
    eprintln!(
        "   {} text / {} image  ·  readable {}  over-wide {}  under-wide {}  ocr {}",
        dim(&s.text_tables.to_string()),
        dim(&s.image_tables.to_string()),
        s.readable,
        s.over_wide,
        s.under_wide,
        s.ocr_sheets,
    );
    if s.links_duplicate > 0 {
        eprintln!(
            "   {} duplicate links skipped (same file name)",
            dim(&s.links_duplicate.to_string())
        );
    }
    eprintln!(
        "{}  {} rows  {}ms  →  {}",
        if s.failed == 0 { green("✔") } else { cyan("⚠") },
        s.rows_written,
        s.total_duration_ms,
        bold(&output.final_csv.display().to_string()),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn blocks_are_added_to_defaults() {
        let cli = Cli::parse_from(["aqreports", "--block", "June2020", "-w", "/tmp/aq"]);
        let config = build_config(&cli, None).unwrap();
        assert!(config.block_list.iter().any(|b| b == "May2019"));
        assert!(config.block_list.iter().any(|b| b == "June2020"));
        assert_eq!(config.work_dir, PathBuf::from("/tmp/aq"));
    }

    #[test]
    fn vlm_backend_flag() {
        let cli = Cli::parse_from(["aqreports", "--ocr-backend", "vlm", "--model", "gpt-4.1"]);
        let config = build_config(&cli, None).unwrap();
        assert_eq!(config.ocr_backend, OcrBackend::Vlm);
        assert_eq!(config.model.as_deref(), Some("gpt-4.1"));
    }

    #[test]
    fn api_timeout_defaults_to_60_and_is_separate() {
        let cli = Cli::parse_from(["aqreports", "--ocr-timeout", "20"]);
        let config = build_config(&cli, None).unwrap();
        assert_eq!(config.ocr_timeout_secs, 20);
        assert_eq!(config.api_timeout_secs, 60);

        let cli = Cli::parse_from(["aqreports", "--api-timeout", "180"]);
        assert_eq!(build_config(&cli, None).unwrap().api_timeout_secs, 180);
    }

    #[test]
    fn flags_read_documented_env_vars() {
        let cmd = Cli::command();
        let env_of = |id: &str| {
            cmd.get_arguments()
                .find(|a| a.get_id() == id)
                .and_then(|a| a.get_env())
                .and_then(|e| e.to_str())
                .map(str::to_string)
        };
        assert_eq!(env_of("provider").as_deref(), Some("EDGEQUAKE_LLM_PROVIDER"));
        assert_eq!(env_of("model").as_deref(), Some("EDGEQUAKE_MODEL"));
        assert_eq!(env_of("block").as_deref(), Some("AQREPORTS_BLOCK"));
        assert_eq!(env_of("local").as_deref(), Some("AQREPORTS_LOCAL"));
        assert_eq!(env_of("json").as_deref(), Some("AQREPORTS_JSON"));
        assert_eq!(env_of("api_timeout").as_deref(), Some("AQREPORTS_API_TIMEOUT"));
    }

    #[test]
    fn comma_separated_blocks_are_split() {
        let cli = Cli::parse_from(["aqreports", "--block", "June2020,Dec2021"]);
        assert_eq!(cli.block, vec!["June2020", "Dec2021"]);
    }

    #[test]
    fn confidence_out_of_range_rejected() {
        assert!(Cli::try_parse_from(["aqreports", "--min-confidence", "150"]).is_err());
    }
}

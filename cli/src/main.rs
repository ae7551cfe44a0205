use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context};
use clap::{ArgAction, Parser};
use console::style;
use rcg_core::{
    inspect, sheet::Grid, Analyzer, Config, Highlight, Report, ResultRecord, Rule, Sheet,
};
use serde_yaml::Value as YamlValue;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Record Comment Guard CLI entry point.
#[derive(Debug, Parser)]
#[command(
    name = "rcg",
    about = "Check record-comment columns of a sheet export for style issues and duplicates."
)]
struct Args {
    /// Path to config file (YAML). Built-in defaults apply when it is missing.
    #[arg(long, default_value = "record-check.yml")]
    config: PathBuf,

    /// Sheet exported as CSV.
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Columns to check (comma-separated). Defaults to every column whose
    /// name contains the header marker.
    #[arg(long, value_delimiter = ',', value_name = "COL[,COL]")]
    column: Vec<String>,

    /// Identifier column shown next to each finding and used for duplicate partners.
    #[arg(long, value_name = "COL")]
    id_column: Option<String>,

    /// Run only these rules (comma-separated labels).
    #[arg(long, value_delimiter = ',', value_name = "LABEL[,LABEL]")]
    only: Vec<String>,

    /// Skip these rules (comma-separated labels).
    #[arg(long, value_delimiter = ',', value_name = "LABEL[,LABEL]")]
    disable: Vec<String>,

    /// Set config overrides (repeatable as key=value). Example: --set sheet.header_scan_rows=30
    #[arg(long = "set", value_name = "KEY=VALUE", num_args = 0..)]
    sets: Vec<String>,

    /// Emit JSON output for automation.
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,

    /// Also write an HTML report with highlighted text.
    #[arg(long, value_name = "PATH")]
    html: Option<PathBuf>,

    /// Exit non-zero when any finding is reported.
    #[arg(long, action = ArgAction::SetTrue)]
    strict: bool,

    /// Suppress per-record output.
    #[arg(long, action = ArgAction::SetTrue)]
    quiet: bool,

    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    run(args)
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: Args) -> anyhow::Result<()> {
    let mut cfg = load_config(&args.config)?;
    apply_overrides(&mut cfg, &args.sets)?;
    filter_rules(&mut cfg.rules, &args.only, &args.disable);
    if cfg.rules.is_empty() {
        warn!("no pattern rules enabled; only duplicate checks will run");
    }
    let analyzer = Analyzer::new(&cfg)?;

    let grid = read_grid(&args.input)?;
    let sheet = Sheet::from_grid(grid, &cfg.sheet)
        .with_context(|| format!("Failed to locate the header in {}", args.input.display()))?;
    let targets = sheet.resolve_targets(&args.column, &cfg.sheet.header_marker)?;
    info!(columns = %targets.join(", "), header_row = sheet.header_index + 1, "resolved columns");
    if !args.json && !args.quiet {
        println!("{} {}", style("Checking:").bold(), targets.join(", "));
    }

    let id_column = match &args.id_column {
        Some(name) => Some(
            sheet
                .resolve_id_column(Some(name.as_str()))
                .ok_or_else(|| anyhow!("identifier column `{name}` not found"))?,
        ),
        None => {
            let resolved = sheet.resolve_id_column(cfg.sheet.id_column.as_deref());
            if resolved.is_none() {
                if let Some(name) = &cfg.sheet.id_column {
                    warn!(column = %name, "identifier column missing; using row numbers");
                }
            }
            resolved
        }
    };

    let report = inspect(&analyzer, &sheet.table, &targets, id_column.as_deref())?;
    info!(
        rows = report.row_count,
        findings = report.records.len(),
        "inspection finished"
    );

    if let Some(path) = &args.html {
        fs::write(path, render_html_report(&report))
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        if !args.quiet {
            for record in &report.records {
                print_record(record);
            }
        }
        print_summary(&report);
    }

    if args.strict && !report.is_clean() {
        std::process::exit(1);
    }
    Ok(())
}

fn load_config(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let value: YamlValue = serde_yaml::from_str(&text)
        .with_context(|| format!("Failed to parse YAML {}", path.display()))?;
    let cfg: Config = serde_yaml::from_value(value)
        .with_context(|| format!("Invalid config structure in {}", path.display()))?;
    Ok(cfg)
}

fn apply_overrides(cfg: &mut Config, sets: &[String]) -> anyhow::Result<()> {
    for kv in sets {
        let mut parts = kv.splitn(2, '=');
        let key = parts.next().unwrap_or("").trim();
        let val = parts.next().unwrap_or("").trim();
        if key.is_empty() {
            continue;
        }
        match key {
            "sheet.header_marker" => cfg.sheet.header_marker = val.to_string(),
            "sheet.header_scan_rows" => {
                cfg.sheet.header_scan_rows = val
                    .parse::<usize>()
                    .with_context(|| format!("`{key}` expects a number, got `{val}`"))?;
            }
            "sheet.id_column" => {
                cfg.sheet.id_column = (!val.is_empty()).then(|| val.to_string());
            }
            "messages.duplicate_sentence" => cfg.messages.duplicate_sentence = val.to_string(),
            "messages.duplicate_cell" => cfg.messages.duplicate_cell = val.to_string(),
            "messages.unknown_partner" => cfg.messages.unknown_partner = val.to_string(),
            "messages.row_label" => cfg.messages.row_label = val.to_string(),
            _ => return Err(anyhow!("unknown override key `{key}`")),
        }
    }
    Ok(())
}

fn filter_rules(rules: &mut Vec<Rule>, only: &[String], disable: &[String]) {
    let matches = |rule: &Rule, names: &[String]| names.iter().any(|n| n.trim() == rule.label);
    rules.retain(|rule| {
        if !only.is_empty() && !matches(rule, only) {
            return false;
        }
        !matches(rule, disable)
    });
}

fn csv_builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder.has_headers(false).flexible(true);
    builder
}

fn read_grid(path: &Path) -> anyhow::Result<Grid> {
    let reader = csv_builder()
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    collect_grid(reader).with_context(|| format!("Failed to read {}", path.display()))
}

/// Every record as a row; empty fields become `None`.
fn collect_grid<R: std::io::Read>(mut reader: csv::Reader<R>) -> csv::Result<Grid> {
    let mut grid = Grid::new();
    for record in reader.records() {
        let record = record?;
        grid.push(
            record
                .iter()
                .map(|field| (!field.is_empty()).then(|| field.to_string()))
                .collect(),
        );
    }
    Ok(grid)
}

fn print_record(record: &ResultRecord) {
    let id = if record.display_id.is_empty() {
        String::new()
    } else {
        format!(" ({})", record.display_id)
    };
    println!(
        "{}",
        style(format!("row {}{id}, '{}'", record.row, record.column)).bold()
    );
    let mut line = String::from("  > ");
    for segment in record.segments() {
        let piece = match segment.class {
            Highlight::Plain => segment.text.to_string(),
            Highlight::Hard => style(segment.text).red().bold().to_string(),
            Highlight::Duplicate => style(segment.text).blue().bold().to_string(),
        };
        line.push_str(&piece);
    }
    println!("{line}");
    println!("  {} {}", style("issues:").red(), record.messages.join(",    "));
    println!();
}

fn print_summary(report: &Report) {
    println!(
        "{} rows checked, {} findings",
        report.row_count,
        report.records.len()
    );
    if report.is_clean() {
        println!("{}", style("No issues found.").green().bold());
    }
}

const HTML_STYLE: &str = r#".error-highlight {
    color: red;
    font-weight: bold;
    background-color: #ffe0e0;
    padding: 2px 4px;
    border-radius: 4px;
}
.sentence-error-highlight {
    color: #0056b3;
    font-weight: bold;
    background-color: #e0f0ff;
    padding: 2px 4px;
    border-radius: 4px;
}"#;

fn render_html_report(report: &Report) -> String {
    use rcg_core::highlight::escape_html;

    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<style>\n");
    out.push_str(HTML_STYLE);
    out.push_str("\n</style>\n</head>\n<body>\n");
    out.push_str(&format!(
        "<p>{} rows checked, {} findings</p>\n",
        report.row_count,
        report.records.len()
    ));
    if report.is_clean() {
        out.push_str("<p>No issues found.</p>\n");
    }
    for record in &report.records {
        let id = if record.display_id.is_empty() {
            String::new()
        } else {
            format!(" ({})", escape_html(&record.display_id))
        };
        out.push_str(&format!(
            "<section>\n<h3>row {}{id}, '{}'</h3>\n<blockquote>{}</blockquote>\n<p>{}</p>\n</section>\n<hr>\n",
            record.row,
            escape_html(&record.column),
            record.html(),
            escape_html(&record.messages.join(",    ")),
        ));
    }
    out.push_str("</body>\n</html>\n");
    out
}

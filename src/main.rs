use anyhow::{Context, Result};
use clap::Parser;
use edadash::parser;
use edadash::runtime::{Outcome, Session, SessionConfig};
use edadash::OutputFormat;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "edadash")]
#[command(about = "Explore a dataset with summary tables, charts, groupby and pivot", long_about = None)]
struct Args {
    /// CSV or JSON file to upload, or '-' to read CSV from stdin
    input: String,

    /// Session script (e.g., 'describe() | scatter(height, weight) | groupby(region, mean)')
    script: String,

    /// JSON session configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for chart images
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Chart image format
    #[arg(long, value_parser = ["png", "svg"])]
    format: Option<String>,

    /// Fail when a chart has too few columns selected
    #[arg(long)]
    strict: bool,

    /// Print tables as JSON instead of CSV
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default(),
    };
    match args.format.as_deref() {
        Some("svg") => config.render.format = OutputFormat::Svg,
        Some("png") => config.render.format = OutputFormat::Png,
        _ => {}
    }
    if args.strict {
        config.strict_selection = true;
    }

    // Parse the script before touching the input
    let script = match parser::parse_script(&args.script) {
        Ok((_, script)) => script,
        Err(e) => {
            eprintln!("Parse error: {:?}", e);
            std::process::exit(1);
        }
    };

    let mut session = Session::new(config);
    if args.input == "-" {
        session
            .upload(io::stdin().lock())
            .context("Failed to read dataset from stdin")?;
    } else {
        session
            .upload_file(Path::new(&args.input))
            .with_context(|| format!("Failed to upload {}", args.input))?;
    }

    let outcomes = session.run_script(&script).context("Session failed")?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let mut chart_number = 0;
    let mut tables_written = 0;

    for outcome in outcomes {
        match outcome {
            Outcome::Chart { instruction, bytes } => {
                chart_number += 1;
                let path = write_chart(
                    &args.out_dir,
                    chart_number,
                    instruction.kind.slug(),
                    session.config().render.format.extension(),
                    &bytes,
                )?;
                info!(title = %instruction.title, path = %path.display(), "chart written");
            }
            Outcome::Table(table) => {
                if args.json {
                    let line = serde_json::to_string(&table.to_json()).context("Failed to encode table")?;
                    writeln!(handle, "{}", line).context("Failed to write table to stdout")?;
                } else {
                    if tables_written > 0 {
                        writeln!(handle).context("Failed to write table to stdout")?;
                    }
                    table.write_csv(&mut handle)?;
                }
                tables_written += 1;
            }
            Outcome::Warning(message) => {
                eprintln!("Warning: {}", message);
            }
        }
    }

    handle.flush().context("Failed to flush stdout")?;

    Ok(())
}

fn write_chart(dir: &Path, number: usize, slug: &str, extension: &str, bytes: &[u8]) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(format!("{:02}-{}.{}", number, slug, extension));
    fs::write(&path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

//! docunify CLI - DOCX/PDF unification and caption/section audit tool

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;

use docunify::{
    validate_sections_with_fallback, verify_figure_placement, verify_table_placement,
    ConvertOptions, ConverterRegistry, OutputFormat, ParseOptions, Placement, PlacementReport,
    SectionReport, UnifiedDocument,
};

#[derive(Parser)]
#[command(name = "docunify")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Unify DOCX and PDF documents and audit captions and sections", long_about = None)]
struct Cli {
    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a document into unified JSON
    Parse {
        /// Input DOCX or PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,

        /// Output the document's full text instead of JSON
        #[arg(long, conflicts_with = "compact")]
        text: bool,

        /// Omit base64 image payloads
        #[arg(long)]
        no_image_data: bool,

        /// Fail on the first unreadable page or part
        #[arg(long)]
        strict: bool,
    },

    /// Show document information
    Info {
        /// Input DOCX or PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Check that figure captions sit below their images
    Figures {
        /// Input DOCX or PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that table captions sit above their tables
    Tables {
        /// Input DOCX or PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check required sections are present
    Sections {
        /// Input DOCX or PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Required section (repeatable; "A/B" accepts either)
        #[arg(short, long = "required", value_name = "NAME")]
        required: Vec<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Extract images to a directory
    Extract {
        /// Input DOCX or PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
    },

    /// Show version information
    Version,
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let result = match cli.command {
        Commands::Parse {
            input,
            output,
            compact,
            text,
            no_image_data,
            strict,
        } => {
            let format = if text {
                OutputFormat::Text
            } else {
                OutputFormat::Json
            };
            cmd_parse(&input, output.as_deref(), format, compact, no_image_data, strict)
        }
        Commands::Info { input } => cmd_info(&input),
        Commands::Figures { input, json } => cmd_figures(&input, json),
        Commands::Tables { input, json } => cmd_tables(&input, json),
        Commands::Sections {
            input,
            required,
            json,
        } => cmd_sections(&input, &required, json),
        Commands::Extract { input, output } => cmd_extract(&input, output.as_deref()),
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

/// Parse for auditing: payloads are never needed.
fn load(input: &Path) -> docunify::Result<UnifiedDocument> {
    log::debug!("Loading {}", input.display());
    let options = ParseOptions::new().lenient().without_image_data();
    ConverterRegistry::with_defaults().parse(input, &options)
}

fn print_json<T: serde::Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_parse(
    input: &Path,
    output: Option<&Path>,
    format: OutputFormat,
    compact: bool,
    no_image_data: bool,
    strict: bool,
) -> CliResult {
    let mut parse = ParseOptions::new();
    if no_image_data {
        parse = parse.without_image_data();
    }
    if strict {
        parse = parse.strict();
    }
    let mut options = ConvertOptions::new()
        .with_parse_options(parse)
        .with_format(format);
    if compact {
        options = options.compact();
    }

    let result = ConverterRegistry::with_defaults().convert(input, &options)?;
    log::debug!("Rendered {} bytes of {}", result.content_len(), result.mime_type);

    if let Some(path) = output {
        fs::write(path, &result.content)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", result.content);
    }

    Ok(())
}

fn cmd_info(input: &Path) -> CliResult {
    let doc = load(input)?;

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: {}", "Format".bold(), doc.source_type.as_str().to_uppercase());
    for (key, value) in doc.metadata.iter() {
        if key == "page_dimensions" {
            continue;
        }
        match value.as_str() {
            Some(text) => println!("{}: {}", key.bold(), text),
            None => println!("{}: {}", key.bold(), value),
        }
    }

    println!();
    println!("{}", "Content Statistics".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    let words = doc.text.full_text.split_whitespace().count();
    println!("{}: {}", "Words".bold(), words);
    if let Some(pages) = doc.extras.page_count {
        println!("{}: {}", "Pages".bold(), pages);
    }
    if let Some(paragraphs) = doc.extras.paragraph_count {
        println!("{}: {}", "Paragraphs".bold(), paragraphs);
    }
    println!("{}: {}", "Sections".bold(), doc.sections.len());
    println!("{}: {}", "Tables".bold(), doc.extras.table_count);
    println!("{}: {}", "Images".bold(), doc.extras.image_count);

    Ok(())
}

fn cmd_figures(input: &Path, json: bool) -> CliResult {
    let doc = load(input)?;
    let report = verify_figure_placement(&doc.stream_lines());
    if json {
        return print_json(&report);
    }
    print_placement("Figure Placement", "caption below image", &report);
    Ok(())
}

fn cmd_tables(input: &Path, json: bool) -> CliResult {
    let doc = load(input)?;
    let report = verify_table_placement(&doc.stream_lines());
    if json {
        return print_json(&report);
    }
    print_placement("Table Placement", "caption above table", &report);

    for note in report.metadata_tables.iter().flatten() {
        println!("  {} {}", "•".dimmed(), note.dimmed());
    }
    for missing in report.unlabeled_tables.iter().flatten() {
        println!("  {} {}", "!".yellow(), missing);
    }
    Ok(())
}

fn print_placement(title: &str, rule: &str, report: &PlacementReport) {
    println!("{} ({})", title.cyan().bold(), rule.dimmed());
    println!("{}", "─".repeat(40).dimmed());

    for detail in &report.details {
        let mark = if detail.is_valid {
            "✓".green()
        } else {
            "✗".red()
        };
        let placement = match detail.placement {
            Placement::Above => "ABOVE".normal(),
            Placement::Below => "BELOW".normal(),
            Placement::Unknown => "UNKNOWN".yellow(),
        };
        let caption = detail.caption.lines().next().unwrap_or_default();
        println!("  {} [{}] {}", mark, placement, caption);
    }

    println!();
    println!(
        "{}: {}  {}: {}  {}: {}",
        "Captions".bold(),
        report.total,
        "Above".bold(),
        report.placements_above,
        "Below".bold(),
        report.placements_below
    );
    let accuracy = format!("{:.2}%", report.accuracy_percentage);
    if report.all_valid {
        println!("{}: {}", "Accuracy".bold(), accuracy.green());
    } else {
        println!("{}: {}", "Accuracy".bold(), accuracy.red());
    }
}

fn cmd_sections(input: &Path, required: &[String], json: bool) -> CliResult {
    let doc = load(input)?;
    let report = validate_sections_with_fallback(&doc.sections, &doc.stream_lines(), required);
    if json {
        return print_json(&report);
    }
    print_sections(&report);
    Ok(())
}

fn print_sections(report: &SectionReport) {
    println!("{}", "Section Completeness".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    for name in &report.present_sections {
        println!("  {} {}", "✓".green(), name);
    }
    for name in &report.missing_sections {
        println!("  {} {}", "✗".red(), name);
    }
    if let Some(ref error) = report.details.error {
        println!("{}: {}", "Degraded".yellow().bold(), error);
    }

    println!();
    println!(
        "{}: {:.1}% ({}/{})",
        "Score".bold(),
        report.completeness_score,
        report.details.found_count,
        report.details.total_required
    );
}

fn cmd_extract(input: &Path, output: Option<&Path>) -> CliResult {
    let doc = ConverterRegistry::with_defaults().parse(input, &ParseOptions::new().lenient())?;

    let output_dir = output
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&output_dir)?;

    let mut count = 0;
    for image in &doc.images {
        let Some(bytes) = image.payload_bytes() else {
            continue;
        };
        let filename = format!("{}.{}", image.identifier, image.extension());
        fs::write(output_dir.join(&filename), bytes)?;
        println!("{} {}", "Extracted".green(), filename);
        count += 1;
    }

    println!("\n{} {} images extracted", "Done!".green().bold(), count);

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "docunify".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("DOCX/PDF unification and audit tool");
    println!();
    println!("Repository: {}", "https://github.com/iyulab/docunify".dimmed());
    println!("License: MIT");
}

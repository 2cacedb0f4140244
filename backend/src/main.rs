//! Sales Engine CLI - classify sales lines and build the Type pivot
//!
//! # Main Commands
//!
//! ```bash
//! salesengine process sales.csv master.csv --output-dir out   # Full run
//! salesengine process sales.csv master.csv --zip Reports.zip  # Zipped reports
//! ```
//!
//! # Rules Commands
//!
//! ```bash
//! salesengine rules --output rules.json   # Dump the built-in rules
//! salesengine check-rules rules.json      # Validate an edited rules file
//! salesengine inspect sales.csv           # Show what the loader reads
//! ```

use clap::{Parser, Subcommand};
use salesengine::export::{write_report_dir, write_report_zip};
use salesengine::logs::LOG_BROADCASTER;
use salesengine::{
    default_rules, load_csv_file, process_with_rules, ClassificationRules, ProcessOptions,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "salesengine")]
#[command(about = "Classify sales transactions and summarize them by product taxonomy", long_about = None)]
struct Cli {
    /// Only print results, not progress
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full pipeline: sales + master CSV → enriched table + pivot summary
    Process {
        /// Sales CSV file
        sales: PathBuf,

        /// Product master CSV file
        master: PathBuf,

        /// Rules file (default: $SALESENGINE_RULES or built-in rules)
        #[arg(short, long)]
        rules: Option<PathBuf>,

        /// Write Detailed_Sales.csv and Pivot_Summary.csv to this directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Write both reports into a ZIP archive
        #[arg(short, long)]
        zip: Option<PathBuf>,

        /// Number of enriched rows to preview (default: 5)
        #[arg(long, default_value = "5")]
        preview: usize,
    },

    /// Load a CSV and show detected format and column types
    Inspect {
        /// Input CSV file
        input: PathBuf,
    },

    /// Print the built-in classification rules as JSON
    Rules {
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate and compile a rules file
    CheckRules {
        /// Rules JSON file
        input: PathBuf,
    },
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    LOG_BROADCASTER.set_echo(!cli.quiet);

    let result = match cli.command {
        Commands::Process {
            sales,
            master,
            rules,
            output_dir,
            zip,
            preview,
        } => {
            let options = ProcessOptions {
                rules_path: rules.map(|p| p.to_string_lossy().to_string()),
                preview_rows: preview,
                output_dir: output_dir.map(|p| p.to_string_lossy().to_string()),
                zip_path: zip.map(|p| p.to_string_lossy().to_string()),
            };
            cmd_process(&sales, &master, &options)
        }

        Commands::Inspect { input } => cmd_inspect(&input),

        Commands::Rules { output } => cmd_rules(output.as_deref()),

        Commands::CheckRules { input } => cmd_check_rules(&input),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_process(
    sales_path: &Path,
    master_path: &Path,
    options: &ProcessOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Sales: {}", sales_path.display());
    let sales = load_csv_file(sales_path)?;
    eprintln!(
        "   Encoding: {}, Delimiter: '{}', Rows: {}",
        sales.encoding,
        format_delimiter(sales.delimiter),
        sales.frame.height()
    );

    eprintln!("📄 Master: {}", master_path.display());
    let master = load_csv_file(master_path)?;
    eprintln!(
        "   Encoding: {}, Delimiter: '{}', Rows: {}",
        master.encoding,
        format_delimiter(master.delimiter),
        master.frame.height()
    );

    let rules = options.load_rules()?;
    let report = process_with_rules(&sales.frame, &master.frame, &rules)?;

    let summary = report.summary();
    println!("Total Rows:   {}", summary.total_rows);
    println!("Pivot Groups: {}", summary.pivot_groups);
    for count in &summary.type_counts {
        println!("  {:<16} {}", count.txn.as_str(), count.rows);
    }

    if options.preview_rows > 0 {
        println!("{}", report.enriched.head(Some(options.preview_rows)));
    }

    if let Some(ref dir) = options.output_dir {
        for path in write_report_dir(&report, dir)? {
            eprintln!("   💾 Saved to: {}", path.display());
        }
    }

    if let Some(ref zip_path) = options.zip_path {
        let file = fs::File::create(zip_path)?;
        write_report_zip(&report, file)?;
        eprintln!("   💾 Saved to: {}", zip_path);
    }

    eprintln!("\n✨ Done!");
    Ok(())
}

fn cmd_inspect(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Loading: {}", input.display());

    let loaded = load_csv_file(input)?;
    println!("Encoding:  {}", loaded.encoding);
    println!("Delimiter: '{}'", format_delimiter(loaded.delimiter));
    println!("Rows:      {}", loaded.frame.height());
    println!("Columns:");
    for (i, column) in loaded.frame.get_columns().iter().enumerate() {
        println!(
            "  [{:2}] {} ({}, {} empty)",
            i + 1,
            column.name(),
            column.dtype(),
            column.null_count()
        );
    }
    Ok(())
}

fn cmd_rules(output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let json = default_rules().to_json()?;
    write_output(&json, output)
}

fn cmd_check_rules(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Checking rules: {}", input.display());

    let rules = ClassificationRules::load(input)?;
    let compiled = rules.compile()?;

    println!("✅ Rules valid (version {})", rules.version);
    println!("   Billing rules:  {}", compiled.billing().len());
    println!("   Customer groups: {}", compiled.groups().len());
    println!("   Customer rules: {}", compiled.customer_rules().len());
    Ok(())
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

fn write_output(content: &str, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match output {
        Some(path) => {
            fs::write(path, content)?;
            eprintln!("💾 Saved to: {}", path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}

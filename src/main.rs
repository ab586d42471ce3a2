use std::fs::File;
use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_subscriber::EnvFilter;

use groupscholar_section_gpa::config::{self, AnalysisOptions, DEFAULT_THRESHOLD};
use groupscholar_section_gpa::error::FileIssue;
use groupscholar_section_gpa::models::{GradeRecord, ListKind};
use groupscholar_section_gpa::{classifier, db, export, pipeline, report};

#[derive(Parser)]
#[command(name = "section-gpa")]
#[command(about = "Section GPA significance and good/work lists for Group Scholar runs", long_about = None)]
struct Cli {
    /// Log debug output to stderr
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ListArgs {
    /// Path to a .run file inside a Runs/ directory
    run: PathBuf,
    /// Fail a section file on its first malformed line
    #[arg(long)]
    strict: bool,
    /// Write the list as CSV instead of printing it
    #[arg(long)]
    csv: Option<PathBuf>,
    /// Store the list in the history database and flag returning students
    #[arg(long)]
    record: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare every section's GPA with its group
    Analyze {
        run: PathBuf,
        #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
        threshold: f64,
        #[arg(long)]
        strict: bool,
        /// Print the analysis as JSON
        #[arg(long)]
        json: bool,
    },
    /// Students earning A or A-
    GoodList(ListArgs),
    /// Students earning D+, D, D- or F
    WorkList(ListArgs),
    /// Generate a markdown report for a run
    Report {
        run: PathBuf,
        #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
        threshold: f64,
        #[arg(long)]
        strict: bool,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Create or upgrade the history schema
    InitDb,
    /// Show every list a student has appeared on
    History { student_id: String },
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url = config::database_url()?;
    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

fn print_issues(issues: &[FileIssue]) {
    if issues.is_empty() {
        return;
    }
    eprintln!("{} file(s) could not be used:", issues.len());
    for issue in issues {
        eprintln!("- {}", issue.error);
    }
}

async fn run_list(kind: ListKind, args: ListArgs) -> anyhow::Result<()> {
    let options = AnalysisOptions::new(DEFAULT_THRESHOLD, args.strict);
    let result = pipeline::performance_list(kind, &args.run, options.mode)
        .with_context(|| format!("failed to load run {}", args.run.display()))?;
    print_issues(&result.issues);
    let records: Vec<GradeRecord> = result.value;

    if let Some(path) = &args.csv {
        let file = File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        export::write_list_csv(file, &records)?;
        println!("{} written to {} ({} students).", kind.title(), path.display(), records.len());
    } else if records.is_empty() {
        println!("No students qualify for the {}.", kind.title());
    } else {
        println!("{} ({} students):", kind.title(), records.len());
        for record in &records {
            println!(
                "- {}, {} ({}) {} in {}",
                record.last_name,
                record.first_name,
                record.student_id,
                record.letter_grade,
                record.section_id
            );
        }
    }

    if args.record {
        let pool = connect().await?;
        let matches = db::record_flags(&pool, kind, &records).await?;
        let returning: Vec<_> = matches.iter().filter(|m| m.already_known).collect();
        println!(
            "Recorded {} entries; {} students were already on the {}.",
            matches.len(),
            returning.len(),
            kind.title()
        );
        for entry in returning {
            println!(
                "- {} ({} in {}) previously in {}",
                entry.student_id,
                entry.grade,
                entry.section_id,
                entry.prior_sections.join(", ")
            );
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Analyze {
            run,
            threshold,
            strict,
            json,
        } => {
            let options = AnalysisOptions::new(threshold, strict);
            let result = pipeline::analyze_sections(&run, &options)
                .with_context(|| format!("failed to load run {}", run.display()))?;

            if json {
                println!("{}", export::analysis_json(&result.value, &result.issues)?);
                return Ok(());
            }

            print_issues(&result.issues);
            let analysis = result.value;
            println!(
                "Run {}: GPA {:.3} (std dev {:.3}) across {} graded students",
                analysis.run,
                analysis.aggregate.mean_gpa,
                analysis.aggregate.std_dev,
                analysis.aggregate.student_count
            );
            for group in &analysis.groups {
                println!(
                    "Group {}: GPA {:.3} (std dev {:.3})",
                    group.group, group.aggregate.mean_gpa, group.aggregate.std_dev
                );
                for result in &group.results {
                    match (result.z_score, result.p_value) {
                        (Some(z), Some(p)) => println!(
                            "- {} z {:.3} p {:.5} {}{}",
                            result.section_id,
                            z,
                            p,
                            result.direction,
                            if result.is_significant { " (significant)" } else { "" }
                        ),
                        _ => println!(
                            "- {} comparison undefined: {}",
                            result.section_id,
                            result.note.as_deref().unwrap_or("no data")
                        ),
                    }
                }
            }
        }
        Commands::GoodList(args) => run_list(ListKind::Good, args).await?,
        Commands::WorkList(args) => run_list(ListKind::Work, args).await?,
        Commands::Report {
            run,
            threshold,
            strict,
            out,
        } => {
            let options = AnalysisOptions::new(threshold, strict);
            let loaded = pipeline::load_run(&run, options.mode)
                .with_context(|| format!("failed to load run {}", run.display()))?;
            let analysis = pipeline::analyze_loaded(&loaded.value, options.threshold);
            let records = loaded.value.records();
            let sections: Vec<_> = loaded.value.sections().collect();
            let report = report::build_report(
                &analysis,
                Utc::now().date_naive(),
                &sections,
                &classifier::good_list(&records),
                &classifier::work_list(&records),
                &loaded.issues,
            );
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::InitDb => {
            let pool = connect().await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::History { student_id } => {
            let pool = connect().await?;
            let entries = db::fetch_student_history(&pool, &student_id).await?;
            if entries.is_empty() {
                println!("{student_id} has not appeared on the good or work list.");
                return Ok(());
            }
            println!("History for {student_id}:");
            for entry in entries {
                println!(
                    "- {} list: {} in {} (recorded {})",
                    entry.list_kind, entry.grade, entry.section_id, entry.recorded_on
                );
            }
        }
    }

    Ok(())
}

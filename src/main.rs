mod batch;
mod charclass;
mod db;
mod export;
mod fetcher;
mod model;
mod parser;
mod pipeline;
mod settings;
mod wordlist;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use fetcher::{Fetcher, HtmlDirFetcher, SutianClient};
use model::{MissingReason, SelectedRecord, WordOutcome};
use settings::Settings;

#[derive(Parser)]
#[command(name = "sutian_scraper", about = "Example sentence extractor for the MOE Taiwanese dictionary")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up a single word and show the selected example
    Word { word: String },
    /// Run extraction on a saved HTML page
    Parse {
        file: PathBuf,
        /// Headword the page was queried for
        #[arg(short, long)]
        word: String,
    },
    /// Process a word list and write the batch report
    Batch {
        /// Vocabulary workbook (.xlsx) or a text/CSV word list
        words_file: PathBuf,
        /// Workbook sheet to read (default: first word sheet)
        #[arg(short, long)]
        sheet: Option<String>,
        /// Report title (default: sheet name, else file stem)
        #[arg(short, long)]
        title: Option<String>,
        /// Max words to process
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Read `<dir>/<word>.html` instead of querying the site
        #[arg(long)]
        html_dir: Option<PathBuf>,
        /// Delay between words in milliseconds (overrides config)
        #[arg(long)]
        pacing_ms: Option<u64>,
        /// Directory the report folder is created in
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
        /// Skip saving to the SQLite database
        #[arg(long)]
        no_db: bool,
        /// Skip writing JSON, CSV and text reports
        #[arg(long)]
        no_export: bool,
    },
    /// Show stored run statistics
    Stats {
        /// Recent runs to list
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load()?;

    let result = match cli.command {
        Commands::Word { word } => {
            let client = SutianClient::new(&settings)?;
            let outcome = pipeline::process_word(&client, &word, &settings.source_label);
            print_outcome(&word, &outcome);
            Ok(())
        }
        Commands::Parse { file, word } => {
            let html = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {:?}", file))?;
            let outcome = match pipeline::resolve_document(&word, &html) {
                Ok(candidate) => WordOutcome::Success(pipeline::build_record(
                    &word,
                    candidate,
                    &settings.source_label,
                    chrono::Local::now(),
                )),
                Err(reason) => WordOutcome::Missing(reason),
            };
            print_outcome(&word, &outcome);
            Ok(())
        }
        Commands::Batch {
            words_file,
            sheet,
            title,
            limit,
            html_dir,
            pacing_ms,
            out_dir,
            no_db,
            no_export,
        } => {
            let list = wordlist::load_any(&words_file, sheet.as_deref())?;
            let mut words = list.words;
            if let Some(n) = limit {
                words.truncate(n);
            }
            let title = title.or(list.sheet).unwrap_or_else(|| {
                words_file
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "words".into())
            });
            println!("Processing {} words from {:?} ({})...", words.len(), words_file, title);

            let result = match html_dir {
                // saved pages need no pacing
                Some(dir) => run_with(&HtmlDirFetcher::new(dir), &words, Duration::ZERO, &settings),
                None => {
                    let pacing = Duration::from_millis(pacing_ms.unwrap_or(settings.pacing_ms));
                    run_with(&SutianClient::new(&settings)?, &words, pacing, &settings)
                }
            };

            let summary = result.summary();
            summary.print();

            if !no_db {
                let conn = db::connect(&settings.db_path)?;
                db::init_schema(&conn)?;
                let run_id = db::save_batch(&conn, &title, &result)?;
                println!("Saved run #{} to {}", run_id, settings.db_path);
            }
            if !no_export {
                let paths = export::write_all(&out_dir, &title, &settings.base_url, &result)?;
                println!("Wrote reports to {:?}", paths.dir);
                println!("Report: {:?}", paths.report);
                println!("JSON:   {:?}", paths.json);
                if let Some(p) = &paths.records_csv {
                    println!("CSV:    {:?}", p);
                }
                if let Some(p) = &paths.missing_csv {
                    println!("CSV:    {:?}", p);
                }
            }
            Ok(())
        }
        Commands::Stats { limit } => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Runs:      {}", s.runs);
            println!("Records:   {} ({} distinct words)", s.records, s.distinct_words);
            println!("Missing:   {}", s.missing);
            for (tier, n) in &s.by_quality {
                println!("  {:<10} {}", tier, n);
            }

            let runs = db::fetch_runs(&conn, limit)?;
            if !runs.is_empty() {
                println!(
                    "\n{:>4} | {:<20} | {:>5} | {:>5} | {:>5} | {:<19}",
                    "#", "Title", "Total", "OK", "Miss", "Created"
                );
                println!("{}", "-".repeat(72));
                for r in &runs {
                    println!(
                        "{:>4} | {:<20} | {:>5} | {:>5} | {:>5} | {:<19}",
                        r.id,
                        pipeline::truncate(&r.title, 20),
                        r.total,
                        r.successes,
                        r.missing,
                        r.created_at
                    );
                }
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn run_with<F: Fetcher>(
    fetcher: &F,
    words: &[String],
    pacing: Duration,
    settings: &Settings,
) -> batch::BatchResult {
    let pb = ProgressBar::new(words.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let result = pipeline::with_quiet_panics(|| {
        batch::run_batch(words, pacing, |word| {
            pb.set_message(word.to_string());
            let outcome = pipeline::process_word(fetcher, word, &settings.source_label);
            pb.inc(1);
            outcome
        })
    });

    pb.finish_and_clear();
    result
}

fn print_outcome(word: &str, outcome: &WordOutcome) {
    match outcome {
        WordOutcome::Success(r) => print_record(r),
        WordOutcome::Missing(MissingReason::RetrievalFailed(detail)) => {
            println!("Could not fetch \"{}\": {}", word, detail)
        }
        WordOutcome::Missing(reason) => println!("No example for \"{}\": {}", word, reason),
    }
}

fn print_record(r: &SelectedRecord) {
    println!("Word:          {}", r.word);
    println!("Sentence:      {}", r.sentence);
    println!("Transcription: {}", r.transcription.as_deref().unwrap_or("-"));
    println!("Translation:   {}", r.translation.as_deref().unwrap_or("-"));
    if r.source_lemma != r.word {
        println!("Source lemma:  {}", r.source_lemma);
    }
    println!("Quality:       {}", r.quality);
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use media_catalog_stats::catalog::Catalog;
use media_catalog_stats::drilldown::Bucket;
use media_catalog_stats::export::write_csv;
use media_catalog_stats::filter::FilterCriteria;
use media_catalog_stats::load::load_source;
use media_catalog_stats::models::AggregateBundle;
use media_catalog_stats::progress::{format_duration, set_log_only, Phase};
use media_catalog_stats::safety::validate_output_path;
use media_catalog_stats::session::{AnalysisOptions, AnalysisSession};

#[derive(Parser)]
#[command(name = "catalog-stats")]
#[command(about = "Statistics, genre co-occurrence and drill-downs over a home media catalog")]
struct Args {
    /// Catalog source: a directory of <TABLE>.json files or a SQLite database
    source: PathBuf,

    /// Write KPIs and every aggregate as JSON
    #[arg(long)]
    output: Option<PathBuf>,

    #[arg(long)]
    year_min: Option<i32>,

    #[arg(long)]
    year_max: Option<i32>,

    /// Case-insensitive substring of the French or English title
    #[arg(long)]
    text: Option<String>,

    /// Keep records with a French audio track
    #[arg(long)]
    french: bool,

    /// Keep records with an English audio track
    #[arg(long)]
    english: bool,

    /// Genre code left out of the co-occurrence universe (repeatable)
    #[arg(long = "exclude")]
    exclude: Vec<String>,

    #[arg(long, default_value = "20")]
    top_genres: usize,

    #[arg(long, default_value = "10")]
    top_series: usize,

    /// Bucket to drill into, e.g. year=2001, disc=D12:fr:films, genre=HOR:series, pair=HOR,SCFI
    #[arg(long)]
    drill: Option<String>,

    /// Export the drill-down subset as CSV
    #[arg(long, requires = "drill")]
    csv: Option<PathBuf>,

    /// Pair statistics for two genre codes, e.g. HOR,SCFI
    #[arg(long)]
    pair: Option<String>,

    #[arg(long, default_value = "0")]
    workers: usize,

    /// Hide spinners and log phases instead
    #[arg(long)]
    log_only: bool,
}

impl Args {
    /// Asking for both languages is the same as asking for neither.
    fn criteria(&self) -> FilterCriteria {
        let (french, english) = if self.french && self.english {
            (false, false)
        } else {
            (self.french, self.english)
        };
        FilterCriteria::new()
            .with_years(self.year_min, self.year_max)
            .with_text(self.text.as_deref().unwrap_or(""))
            .with_languages(french, english)
    }
}

fn print_summary(session: &AnalysisSession) {
    let kpis = session.kpis();
    let bundle: &AggregateBundle = session.bundle();

    println!("\n{:=<60}", "");
    println!("Catalog statistics");
    println!("  Records:          {}", kpis.total);
    println!("  Unique titles:    {}", kpis.unique_titles);
    println!("  With summary:     {:.1}%", kpis.pct_summary);
    println!("  With audio:       {:.1}% (tracks {:.1}%)", kpis.pct_audio_any, kpis.pct_audio_tracks);
    println!("  Series:           {}", kpis.series_count);
    println!("  Years:            {}", bundle.by_year.len());
    println!("  Discs:            {}", bundle.discs.len());
    println!(
        "  Languages:        both {} / fr {} / en {} / none {}",
        bundle.languages.both,
        bundle.languages.french_only,
        bundle.languages.english_only,
        bundle.languages.none
    );
    println!("{:-<60}", "");
    println!("Top series:");
    for rank in &bundle.top_series {
        println!("  {:>5}  {}", rank.count, rank.title);
    }
    println!("Top genres:");
    for row in bundle.genre_totals.iter().take(10) {
        println!("  {:>5}  {} ({})", row.total, row.label, row.code);
    }
    let cooc = &bundle.cooccurrence;
    println!(
        "Co-occurrence: {} genres, {} films, {} non-zero cells",
        cooc.size(),
        cooc.total_films,
        cooc.non_zero_cells
    );
    println!("{:=<60}", "");
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    set_log_only(args.log_only);

    if args.workers > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.workers)
            .build_global()
            .context("Failed to set thread pool size")?;
    }

    let source_paths = [args.source.as_path()];
    if let Some(output) = &args.output {
        validate_output_path(output, "json", &source_paths)?;
    }
    if let Some(csv) = &args.csv {
        validate_output_path(csv, "csv", &source_paths)?;
    }
    let bucket: Option<Bucket> = args
        .drill
        .as_deref()
        .map(str::parse::<Bucket>)
        .transpose()
        .context("Invalid --drill bucket")?;
    let pair: Option<(String, String)> = match args.pair.as_deref() {
        Some(s) => match s.split_once(',') {
            Some((a, b)) if !a.trim().is_empty() && !b.trim().is_empty() => {
                Some((a.trim().to_string(), b.trim().to_string()))
            }
            _ => bail!("Invalid --pair '{}': expected two genre codes like HOR,SCFI", s),
        },
        None => None,
    };

    let start = Instant::now();

    let phase = Phase::start("Loading tables");
    let (source, tables, failures) = load_source(&args.source)?;
    phase.finish(&format!("{} failed", failures.len()));
    info!(source = %source.path().display(), failures = failures.len(), "source loaded");

    let phase = Phase::start("Building catalog");
    let catalog = Arc::new(Catalog::build(&tables));
    drop(tables);
    phase.finish(&format!("{} records", catalog.len()));

    let phase = Phase::start("Computing aggregates");
    let options = AnalysisOptions {
        top_genres: args.top_genres,
        top_series: args.top_series,
    };
    let session = AnalysisSession::open(catalog, options)
        .with_filter(args.criteria())
        .with_exclusions(&args.exclude);
    phase.finish(&format!("{} selected", session.len()));

    print_summary(&session);

    if let Some(output) = &args.output {
        session
            .report(&failures)
            .write_to_file(output)
            .with_context(|| format!("Failed to write report {}", output.display()))?;
        println!("Report written to {}", output.display());
    }

    if let Some(bucket) = &bucket {
        let drill = session.drill_down(bucket);
        println!("\n{}", drill.title());
        for record in &drill.records {
            let year = record.year.map(|y| y.to_string()).unwrap_or_default();
            println!(
                "  {:<8} {:<40} {:<6} {}",
                record.kind.as_str(),
                record.display_title(),
                year,
                record.genres.join("|")
            );
        }
        if let Some(csv) = &args.csv {
            write_csv(csv, drill.records.iter().copied())?;
            println!("Exported {} rows to {}", drill.count(), csv.display());
        }
    }

    if let Some((a, b)) = &pair {
        let report = session.pair_report(a, b);
        println!(
            "\n{} ({}) ∩ {} ({}): {} of {} films",
            report.label_a, report.code_a, report.label_b, report.code_b, report.both, report.total_films
        );
        println!(
            "  {}: {}  {}: {}  union: {}",
            report.code_a, report.a_count, report.code_b, report.b_count, report.union
        );
        println!(
            "  Jaccard {:.3}  Lift {:.3}  PMI {:.3}",
            report.measures.jaccard, report.measures.lift, report.measures.pmi
        );
        for sample in &report.sample {
            let year = sample.year.map(|y| y.to_string()).unwrap_or_default();
            println!("  - {} / {} {}", sample.title_fr, sample.title_en, year);
        }
    }

    info!(elapsed = %format_duration(start.elapsed()), "done");
    Ok(())
}

use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use aviflora::config::{ConfigLoader, ResolvedConfig};
use aviflora::db::Database;
use aviflora::domain::{Category, EnrichmentRecord, SpeciesRecord};
use aviflora::enrich::{BatchReport, Enricher};
use aviflora::error::AvifloraError;
use aviflora::export;
use aviflora::gbif::GbifHttpClient;
use aviflora::image::HttpImageFetcher;
use aviflora::inat::InatHttpClient;
use aviflora::ingest;
use aviflora::output::{JsonOutput, OutputMode};
use aviflora::store::Store;

#[derive(Parser)]
#[command(name = "aviflora")]
#[command(about = "Bird and plant catalog: load species lists, enrich them from iNaturalist and GBIF, report gaps")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<String>,

    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Create the schema and load both species CSVs (full replace)")]
    Init,
    #[command(about = "Enrich every species and write the export CSV")]
    Enrich,
    #[command(about = "Flag exported rows missing image, summary or kingdom")]
    Gaps,
    #[command(about = "List species of one category")]
    List(ListArgs),
    #[command(about = "Show one species with its latest enrichment record")]
    Show(ShowArgs),
}

#[derive(Args)]
struct ListArgs {
    category: Category,

    #[arg(long)]
    query: Option<String>,
}

#[derive(Args)]
struct ShowArgs {
    category: Category,
    scientific_name: String,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<AvifloraError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &AvifloraError) -> u8 {
    match error {
        AvifloraError::SpeciesNotFound(_)
        | AvifloraError::ProfileNotFound(_)
        | AvifloraError::ExportMissing(_) => 2,
        AvifloraError::HttpClient(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };
    let config = ConfigLoader::resolve(cli.config.as_deref()).into_diagnostic()?;

    match cli.command {
        Commands::Init => run_init(&config, output_mode),
        Commands::Enrich => run_enrich(&config, output_mode),
        Commands::Gaps => run_gaps(&config, output_mode),
        Commands::List(args) => run_list(args, &config, output_mode),
        Commands::Show(args) => run_show(args, &config, output_mode),
    }
}

#[derive(Serialize)]
struct InitResult {
    birds: usize,
    plants: usize,
}

fn run_init(config: &ResolvedConfig, output_mode: OutputMode) -> miette::Result<()> {
    let mut db = Database::open(&config.db_path).into_diagnostic()?;
    let birds = ingest::load_birds(&mut db, &config.birds_csv).into_diagnostic()?;
    let plants = ingest::load_plants(&mut db, &config.plants_csv).into_diagnostic()?;

    let result = InitResult { birds, plants };
    match output_mode {
        OutputMode::Json => JsonOutput::print(&result).into_diagnostic()?,
        OutputMode::Text => {
            println!("loaded {} birds and {} plants into {}", birds, plants, config.db_path);
        }
    }
    Ok(())
}

fn run_enrich(config: &ResolvedConfig, output_mode: OutputMode) -> miette::Result<()> {
    let db = Database::open(&config.db_path).into_diagnostic()?;
    let store = Store::new(config.cache_dir.clone(), config.media_dir.clone());
    let inat = InatHttpClient::new().into_diagnostic()?;
    let gbif = GbifHttpClient::new().into_diagnostic()?;
    let images = HttpImageFetcher::new().into_diagnostic()?;
    let enricher = Enricher::new(store, inat, gbif, images);

    let report = enricher
        .run_batch(&db, &config.export_csv)
        .into_diagnostic()?;

    match output_mode {
        OutputMode::Json => JsonOutput::print(&report).into_diagnostic()?,
        OutputMode::Text => print_batch_summary(&report, config),
    }
    Ok(())
}

fn print_batch_summary(report: &BatchReport, config: &ResolvedConfig) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let red = "\x1b[31m";
    let reset = "\x1b[0m";

    println!("{green}enriched {} species{reset}", report.processed);
    if report.skipped > 0 {
        println!("{yellow}skipped {} without a scientific name{reset}", report.skipped);
    }
    if !report.failures.is_empty() {
        println!("{red}failed {}:{reset}", report.failures.len());
        for failure in &report.failures {
            println!(
                "{red}  {} {}: {}{reset}",
                failure.category, failure.scientific_name, failure.reason
            );
        }
    }
    println!("export written to {}", config.export_csv);
}

#[derive(Serialize)]
struct GapsResult {
    flagged: usize,
    total: usize,
    gaps_csv: String,
}

fn run_gaps(config: &ResolvedConfig, output_mode: OutputMode) -> miette::Result<()> {
    let rows = export::read_rows(&config.export_csv).into_diagnostic()?;
    let gaps = export::detect_gaps(&rows);
    export::write_gaps(&config.gaps_csv, &gaps).into_diagnostic()?;

    let result = GapsResult {
        flagged: gaps.len(),
        total: rows.len(),
        gaps_csv: config.gaps_csv.to_string(),
    };
    match output_mode {
        OutputMode::Json => JsonOutput::print(&result).into_diagnostic()?,
        OutputMode::Text => {
            println!(
                "{} of {} species are missing key data, see {}",
                result.flagged, result.total, result.gaps_csv
            );
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct ListResult {
    species: Vec<SpeciesRecord>,
}

fn run_list(args: ListArgs, config: &ResolvedConfig, output_mode: OutputMode) -> miette::Result<()> {
    let db = Database::open(&config.db_path).into_diagnostic()?;
    let species = db
        .search_species(args.category, args.query.as_deref())
        .into_diagnostic()?;

    match output_mode {
        OutputMode::Json => JsonOutput::print(&ListResult { species }).into_diagnostic()?,
        OutputMode::Text => {
            for record in &species {
                println!(
                    "{:>4}  {:<32} {:<28} {}",
                    record.id,
                    record.scientific_name,
                    record.common_name.as_deref().unwrap_or("-"),
                    record.family.as_deref().unwrap_or("-")
                );
            }
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct ShowResult {
    species: Option<SpeciesRecord>,
    profile: EnrichmentRecord,
}

fn run_show(args: ShowArgs, config: &ResolvedConfig, output_mode: OutputMode) -> miette::Result<()> {
    let db = Database::open(&config.db_path).into_diagnostic()?;
    let species = db
        .species_by_name(args.category, &args.scientific_name)
        .into_diagnostic()?;
    let profile = match db
        .latest_profile(args.category, &args.scientific_name)
        .into_diagnostic()?
    {
        Some(profile) => profile,
        None if species.is_none() => {
            return Err(AvifloraError::SpeciesNotFound(args.scientific_name)).into_diagnostic();
        }
        None => {
            return Err(AvifloraError::ProfileNotFound(args.scientific_name)).into_diagnostic();
        }
    };

    match output_mode {
        OutputMode::Json => {
            JsonOutput::print(&ShowResult { species, profile }).into_diagnostic()?
        }
        OutputMode::Text => print_profile(species.as_ref(), &profile),
    }
    Ok(())
}

fn print_profile(species: Option<&SpeciesRecord>, profile: &EnrichmentRecord) {
    let common = profile
        .common_name
        .as_deref()
        .or_else(|| species.and_then(|s| s.common_name.as_deref()));
    match common {
        Some(common) => println!("{} ({common})", profile.scientific_name),
        None => println!("{}", profile.scientific_name),
    }

    let ranks = [
        ("kingdom", &profile.kingdom),
        ("phylum", &profile.phylum),
        ("class", &profile.class),
        ("order", &profile.taxon_order),
        ("family", &profile.family),
        ("genus", &profile.genus),
    ];
    for (rank, value) in ranks {
        if let Some(value) = value {
            println!("  {rank:<8} {value}");
        }
    }
    if !profile.countries.is_empty() {
        println!("  countries: {}", profile.countries.join(", "));
    }
    if let Some(image) = &profile.image_local {
        println!("  image: {image}");
    }
    if let Some(summary) = &profile.summary {
        println!();
        println!("{summary}");
    }
}

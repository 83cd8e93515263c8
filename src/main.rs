use std::process;

use tracing_subscriber::{filter::LevelFilter, fmt};

use taglift::cli::{Cli, Commands, DocumentArgs};
use taglift::config;
use taglift::error::AppError;
use taglift::services::{
    ocr_document, run_batch, titelize_document, MistralOcr, PaperlessClient, TitleGenerator,
};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(determine_log_level(&cli));

    if let Err(err) = run(cli).await {
        eprintln!("{err}");
        process::exit(1);
    }
}

fn init_tracing(level: LevelFilter) {
    let subscriber = fmt().with_max_level(level).with_target(false).finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::warn!("Tracing subscriber already set; skipping re-initialization.");
    }
}

fn determine_log_level(cli: &Cli) -> LevelFilter {
    match cli.verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    match cli.command {
        Some(Commands::Run(_)) => {
            let config = config::load()?;
            run_batch(&config).await?;
        }
        Some(Commands::Ocr(args)) => {
            run_single_ocr(args).await?;
        }
        Some(Commands::Titelize(args)) => {
            run_single_titelize(args).await?;
        }
        None => {
            Cli::print_help();
        }
    }

    Ok(())
}

async fn run_single_ocr(args: DocumentArgs) -> Result<(), AppError> {
    let config = config::load()?;
    let store = PaperlessClient::from_config(&config.paperless)?;
    let ocr = MistralOcr::from_config(&config.ocr)?;

    ocr_document(&store, &ocr, args.document_id, args.remove_tag).await?;
    Ok(())
}

async fn run_single_titelize(args: DocumentArgs) -> Result<(), AppError> {
    let config = config::load()?;
    let store = PaperlessClient::from_config(&config.paperless)?;
    let titles = TitleGenerator::from_config(&config.title)?;

    titelize_document(&store, &titles, args.document_id, args.remove_tag).await?;
    Ok(())
}

use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand};

/// Top-level CLI entry point.
#[derive(Debug, Parser)]
#[command(
    name = "taglift",
    version,
    about = "Tag-driven OCR and title enrichment for Paperless documents"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
    /// Increase logging verbosity (-v, -vv).
    #[arg(global = true, short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn print_help() {
        let mut cmd = Cli::command();
        let _ = cmd.print_help();
        println!();
    }
}

/// Supported subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Process every document tagged for OCR, then every document tagged for titling.
    Run(RunArgs),
    /// OCR a single document by id and update its content.
    Ocr(DocumentArgs),
    /// Generate a title for a single document by id.
    Titelize(DocumentArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs;

/// Ad-hoc invocation against one document.
#[derive(Debug, Args)]
pub struct DocumentArgs {
    /// Identifier of the document in the store.
    #[arg(value_name = "DOCUMENT_ID")]
    pub document_id: u64,
    /// Tag to remove from the document as part of the update.
    #[arg(long = "remove-tag", value_name = "TAG_ID")]
    pub remove_tag: Option<u64>,
}

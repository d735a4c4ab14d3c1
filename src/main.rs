use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use colored::Colorize;
use draftd::Result;
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "draftd")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Workflow orchestrator for evidence-backed manuscript production", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Project directory (default: current directory)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a manuscript project in the current directory
    Init {
        /// Project name (default: directory name)
        #[arg(short, long)]
        name: Option<String>,

        /// Target journal
        #[arg(short, long)]
        journal: Option<String>,

        /// Skip checkpoint history initialization
        #[arg(long)]
        no_checkpoints: bool,
    },

    /// Show workflow status and next steps
    Status {
        /// Show sections, runs and provenance
        #[arg(short, long)]
        detailed: bool,

        /// Output the state document as JSON
        #[arg(long)]
        json: bool,
    },

    /// Update a workflow stage (repository_analysis, plan, assessment,
    /// research, drafting, critique, assembly)
    Stage {
        /// Stage name
        name: String,

        /// New status (not_started, in_progress, completed, failed)
        status: String,

        /// Artifact path relative to the manuscript directory
        #[arg(long)]
        artifact: Option<String>,
    },

    /// Update a drafting section (unseen names register dynamically)
    Section {
        /// Section name, e.g. abstract, methods
        name: String,

        /// New status (not_started, in_progress, completed, failed)
        status: String,

        /// Artifact path relative to the manuscript directory
        #[arg(long)]
        artifact: Option<String>,
    },

    /// Critique iterations
    #[command(subcommand)]
    Critique(draftd::cli::critique::CritiqueCommands),

    /// Assemble the full manuscript from completed sections
    Assemble {
        /// Output path (default: full_manuscript.md in the manuscript)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Archive the current manuscript state as a workflow run
    Archive {
        /// Short description for the run id, e.g. "plos-v2"
        #[arg(short, long)]
        description: Option<String>,

        /// Target journal for this run
        #[arg(short, long)]
        journal: Option<String>,
    },

    /// Evidence table operations
    #[command(subcommand)]
    Evidence(draftd::cli::evidence::EvidenceCommands),

    /// Citation validation and audit
    #[command(subcommand)]
    Cite(draftd::cli::cite::CiteCommands),

    /// Checkpoint history operations
    #[command(subcommand)]
    Checkpoint(draftd::cli::checkpoint::CheckpointCommands),

    /// Generate shell completions
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{}", format!("Error: {e}").red());
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let dir = cli.dir.as_deref();

    match cli.command {
        Commands::Init {
            name,
            journal,
            no_checkpoints,
        } => {
            draftd::cli::init::run(name.as_deref(), journal.as_deref(), dir, no_checkpoints)?;
        }

        Commands::Status { detailed, json } => {
            draftd::cli::status::run(detailed, json, dir)?;
        }

        Commands::Stage {
            name,
            status,
            artifact,
        } => {
            draftd::cli::stage::run(&name, &status, artifact.as_deref(), dir)?;
        }

        Commands::Section {
            name,
            status,
            artifact,
        } => {
            draftd::cli::section::run(&name, &status, artifact.as_deref(), dir)?;
        }

        Commands::Critique(command) => {
            draftd::cli::critique::run(command, dir)?;
        }

        Commands::Assemble { output } => {
            draftd::cli::assemble::run(output.as_deref(), dir)?;
        }

        Commands::Archive {
            description,
            journal,
        } => {
            draftd::cli::archive::run(description.as_deref(), journal.as_deref(), dir)?;
        }

        Commands::Evidence(command) => {
            draftd::cli::evidence::run(command, dir)?;
        }

        Commands::Cite(command) => {
            draftd::cli::cite::run(command, dir)?;
        }

        Commands::Checkpoint(command) => {
            draftd::cli::checkpoint::run(command, dir)?;
        }

        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "draftd", &mut io::stdout());
        }
    }

    Ok(())
}

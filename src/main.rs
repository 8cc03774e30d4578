//! dadgar - a local-first AI legal assistant
//!
//! Drafting, lawyer/notary directory search, news briefing, web-page
//! analysis and project planning over a credential-shielding model proxy.

mod autosave;
mod checkpoint;
mod commands;
mod config;
mod db;
mod guide;
mod llm;
mod markdown;
mod models;
mod prompts;
mod proxy;
mod session;
mod state;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "dadgar")]
#[command(author, version, about = "A local-first AI legal assistant")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize dadgar (first-time setup)
    Init,

    /// Run the credential-injecting model proxy
    Serve,

    /// Draft a legal document (streams to stdout)
    Draft {
        /// Document subject; omitted = resume the autosaved draft inputs
        topic: Option<String>,

        /// Details and background for the drafter
        #[arg(short, long)]
        description: Option<String>,

        /// petition, complaint, contract, legal_letter, defense_brief, legal_research
        #[arg(short = 't', long)]
        doc_type: Option<String>,
    },

    /// Lawyer search and the discovered directory
    Lawyers {
        #[command(subcommand)]
        operation: LawyerCommands,
    },

    /// Find notary public offices
    Notaries {
        /// Service and location you need, in your own words
        query: String,
    },

    /// Summarize the latest news on a topic, with sources
    News {
        /// Topic to summarize
        query: String,
    },

    /// Analyze one web page and answer a question about it
    Analyze {
        /// Page URL
        url: String,

        /// What you want to know about the page
        query: String,
    },

    /// Strategic planning: break a goal into actionable tasks
    Plan {
        #[command(subcommand)]
        operation: PlanCommands,
    },

    /// Interactive guided session (describe a goal, get routed)
    Guide,

    /// Input suggestions for the finder tools
    Suggest {
        /// lawyers or notaries
        kind: String,

        /// Partial input to complete
        query: String,
    },

    /// Snapshot and restore the whole session state
    Checkpoint {
        #[command(subcommand)]
        operation: CheckpointCommands,
    },
}

#[derive(Subcommand)]
enum LawyerCommands {
    /// Search the web for lawyers matching your situation
    Find {
        /// Your legal situation, in your own words
        query: String,

        /// How many results to ask for
        #[arg(short, long, default_value_t = 10)]
        max_results: u32,
    },

    /// List the discovered directory
    Directory {
        /// Filter by city (substring)
        #[arg(long)]
        city: Option<String>,

        /// Filter by specialty (substring)
        #[arg(long)]
        specialty: Option<String>,

        /// Minimum years of experience
        #[arg(long)]
        min_experience: Option<u32>,

        /// relevance, experience, city, city_specialty
        #[arg(short, long, default_value = "relevance")]
        sort: String,
    },

    /// Shortlist a lawyer by its position in the directory listing
    Save { index: usize },

    /// List the saved shortlist
    Saved,

    /// Remove a saved lawyer by its position in the shortlist
    Remove { index: usize },

    /// Attach a note to a saved lawyer
    Note { index: usize, note: String },

    /// Clear the saved shortlist
    ClearSaved,

    /// Clear the entire discovered directory
    ClearDirectory,
}

#[derive(Subcommand)]
enum PlanCommands {
    /// Generate a plan for a goal
    New { goal: String },

    /// Show the last generated plan
    Show,

    /// Prepare and stream a draft from one plan task
    Execute { index: usize },
}

#[derive(Subcommand)]
enum CheckpointCommands {
    /// Snapshot the current state under a name
    Create { name: String },

    /// List checkpoints, newest first
    List,

    /// Restore a checkpoint by id
    Restore { id: String },

    /// Delete a checkpoint by id
    Delete { id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dadgar=info,tower_http=warn".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            commands::init()?;
        }
        Commands::Serve => {
            commands::serve().await?;
        }
        Commands::Draft {
            topic,
            description,
            doc_type,
        } => {
            commands::draft(topic, description, doc_type).await?;
        }
        Commands::Lawyers { operation } => match operation {
            LawyerCommands::Find { query, max_results } => {
                commands::lawyers_find(&query, max_results).await?;
            }
            LawyerCommands::Directory {
                city,
                specialty,
                min_experience,
                sort,
            } => {
                commands::lawyers_directory(city, specialty, min_experience, &sort)?;
            }
            LawyerCommands::Save { index } => {
                commands::lawyers_save(index)?;
            }
            LawyerCommands::Saved => {
                commands::lawyers_saved()?;
            }
            LawyerCommands::Remove { index } => {
                commands::lawyers_remove(index)?;
            }
            LawyerCommands::Note { index, note } => {
                commands::lawyers_note(index, &note)?;
            }
            LawyerCommands::ClearSaved => {
                commands::lawyers_clear_saved()?;
            }
            LawyerCommands::ClearDirectory => {
                commands::lawyers_clear_directory()?;
            }
        },
        Commands::Notaries { query } => {
            commands::notaries(&query).await?;
        }
        Commands::News { query } => {
            commands::news(&query).await?;
        }
        Commands::Analyze { url, query } => {
            commands::analyze(&url, &query).await?;
        }
        Commands::Plan { operation } => match operation {
            PlanCommands::New { goal } => {
                commands::plan_new(&goal).await?;
            }
            PlanCommands::Show => {
                commands::plan_show()?;
            }
            PlanCommands::Execute { index } => {
                commands::plan_execute(index).await?;
            }
        },
        Commands::Guide => {
            commands::guide().await?;
        }
        Commands::Suggest { kind, query } => {
            commands::suggest(&kind, &query).await?;
        }
        Commands::Checkpoint { operation } => match operation {
            CheckpointCommands::Create { name } => {
                commands::checkpoint_create(&name)?;
            }
            CheckpointCommands::List => {
                commands::checkpoint_list()?;
            }
            CheckpointCommands::Restore { id } => {
                commands::checkpoint_restore(&id)?;
            }
            CheckpointCommands::Delete { id } => {
                commands::checkpoint_delete(&id)?;
            }
        },
    }

    Ok(())
}

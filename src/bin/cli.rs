//! linestore admin CLI
//!
//! Runs one engine operation against a data directory and prints the
//! result as JSON.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use linestore::bank::PageRequest;
use linestore::codec::parse_timestamp;
use linestore::model::{AttemptDraft, AttemptPatch, Difficulty, QuestionDraft, QuestionPatch};
use linestore::protocol::{Response, Status};
use linestore::{AdmissionClass, Config, Engine, QuestionQuery, Result, StoreError};
use serde::Serialize;
use serde_json::json;
use tracing_subscriber::{fmt, EnvFilter};

/// linestore CLI
#[derive(Parser, Debug)]
#[command(name = "linestore")]
#[command(about = "Admin CLI for the linestore record store")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, env = "LINESTORE_DATA_DIR", default_value = "./data")]
    data_dir: PathBuf,

    /// Attempts log (defaults to {data_dir}/attempts.jsonl)
    #[arg(long, env = "LINESTORE_ATTEMPTS_FILE")]
    attempts_file: Option<PathBuf>,

    /// Question bank (defaults to {data_dir}/questions.json)
    #[arg(long, env = "LINESTORE_QUESTIONS_FILE")]
    questions_file: Option<PathBuf>,

    /// Read requests per client per minute
    #[arg(long, env = "LINESTORE_READ_RATE", default_value = "60")]
    read_rate: usize,

    /// Mutating requests per client per minute
    #[arg(long, env = "LINESTORE_MUTATE_RATE", default_value = "20")]
    mutate_rate: usize,

    /// Client key used for admission control
    #[arg(long, default_value = "local")]
    client: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Report file sizes, roles and snapshot state
    Health,

    /// Aggregate counts over the bank and the attempts log
    Stats,

    /// List roles
    Roles {
        /// ETag from a previous response
        #[arg(long)]
        if_none_match: Option<String>,
    },

    /// Page through the questions of one role
    Questions {
        role: String,

        #[arg(long)]
        difficulty: Option<Difficulty>,

        #[arg(long, default_value = "0")]
        offset: usize,

        #[arg(long, default_value = "20")]
        limit: usize,

        #[arg(long)]
        shuffle: bool,

        #[arg(long)]
        seed: Option<u64>,

        /// ETag from a previous response
        #[arg(long)]
        if_none_match: Option<String>,
    },

    /// The question at `index` for a role (wraps around)
    Next {
        role: String,

        #[arg(long, default_value = "0")]
        index: usize,

        #[arg(long)]
        difficulty: Option<Difficulty>,
    },

    /// A random question for a role
    Random {
        role: String,

        #[arg(long)]
        difficulty: Option<Difficulty>,

        #[arg(long)]
        seed: Option<u64>,
    },

    /// Search question text and topics
    Search {
        query: String,

        #[arg(long)]
        role: Option<String>,

        #[arg(long, default_value = "50")]
        limit: usize,
    },

    /// Session attempts
    Attempts {
        #[command(subcommand)]
        command: AttemptCommands,
    },

    /// Trainer edits of the question bank
    Trainer {
        #[command(subcommand)]
        command: TrainerCommands,
    },

    /// Normalize attempt dates in place (keeps a .bak copy)
    Repair,

    /// Append synthetic attempts
    Seed {
        #[arg(long, default_value = "20")]
        count: usize,

        #[arg(long, default_value = "7")]
        seed: u64,

        #[arg(long)]
        role: Option<String>,
    },

    /// Recorded transcripts, newest first
    Transcripts {
        /// Show a single transcript
        #[arg(long)]
        id: Option<String>,

        #[arg(long, default_value = "50")]
        limit: usize,
    },

    /// Recorded analysis results, newest first
    Analysis {
        /// Show a single analysis record
        #[arg(long)]
        id: Option<String>,

        #[arg(long)]
        session: Option<String>,

        #[arg(long, default_value = "50")]
        limit: usize,
    },
}

#[derive(Subcommand, Debug)]
enum AttemptCommands {
    List {
        #[arg(long)]
        role: Option<String>,

        #[arg(long, default_value = "50")]
        limit: usize,
    },

    Get {
        id: String,
    },

    Add {
        role: String,

        #[arg(long)]
        score: u32,

        #[arg(long)]
        duration: u32,

        #[arg(long)]
        date: Option<String>,

        #[arg(long)]
        difficulty: Option<Difficulty>,
    },

    Update {
        id: String,

        #[arg(long)]
        role: Option<String>,

        #[arg(long)]
        score: Option<u32>,

        #[arg(long)]
        duration: Option<u32>,

        #[arg(long)]
        date: Option<String>,

        #[arg(long)]
        difficulty: Option<Difficulty>,
    },

    Delete {
        id: String,
    },

    /// CSV export on stdout
    Export {
        #[arg(long)]
        role: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum TrainerCommands {
    List {
        #[arg(long)]
        role: Option<String>,

        #[arg(long)]
        topic: Option<String>,

        #[arg(long)]
        difficulty: Option<Difficulty>,

        /// Include questions shipped with the bank
        #[arg(long)]
        include_core: bool,
    },

    Add {
        role: String,
        text: String,

        #[arg(long)]
        topic: Option<String>,

        #[arg(long)]
        difficulty: Option<Difficulty>,
    },

    Update {
        id: String,

        #[arg(long)]
        role: Option<String>,

        #[arg(long)]
        text: Option<String>,

        #[arg(long)]
        topic: Option<String>,

        #[arg(long)]
        difficulty: Option<Difficulty>,
    },

    Delete {
        id: String,
    },
}

fn main() -> ExitCode {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,linestore=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    tracing::debug!("linestore v{}", linestore::VERSION);
    tracing::debug!("Data directory: {}", args.data_dir.display());

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            exit_code(&e)
        }
    }
}

fn run(args: Args) -> Result<()> {
    let mut builder = Config::builder()
        .data_dir(&args.data_dir)
        .read_rate(args.read_rate)
        .mutate_rate(args.mutate_rate);
    if let Some(path) = &args.attempts_file {
        builder = builder.attempts_file(path);
    }
    if let Some(path) = &args.questions_file {
        builder = builder.questions_file(path);
    }

    let engine = Engine::open(builder.build())?;
    engine.admit(admission_class(&args.command), &args.client)?;

    match args.command {
        Commands::Health => emit(&engine.health()?),
        Commands::Stats => emit(&engine.stats()?),
        Commands::Roles { if_none_match } => emit_response(&engine.roles(if_none_match.as_deref())?),
        Commands::Questions {
            role,
            difficulty,
            offset,
            limit,
            shuffle,
            seed,
            if_none_match,
        } => {
            let query = QuestionQuery {
                role,
                difficulty,
                page: PageRequest {
                    offset,
                    limit,
                    shuffle,
                    seed,
                },
            };
            emit_response(&engine.questions(&query, if_none_match.as_deref())?)
        }
        Commands::Next {
            role,
            index,
            difficulty,
        } => emit(&engine.next_question(&role, difficulty, index)?),
        Commands::Random {
            role,
            difficulty,
            seed,
        } => emit(&engine.random_question(&role, difficulty, seed)?),
        Commands::Search { query, role, limit } => {
            emit(&engine.search(&query, role.as_deref(), limit)?)
        }
        Commands::Attempts { command } => run_attempts(&engine, command),
        Commands::Trainer { command } => run_trainer(&engine, command),
        Commands::Repair => emit(&engine.repair_attempts()?),
        Commands::Seed { count, seed, role } => {
            let inserted = engine.seed_attempts(count, seed, role.as_deref())?;
            emit(&json!({ "ok": true, "inserted": inserted }))
        }
        Commands::Transcripts { id, limit } => match id {
            Some(id) => emit(&engine.get_transcript(&id)?),
            None => emit(&engine.list_transcripts(limit)?),
        },
        Commands::Analysis { id, session, limit } => match id {
            Some(id) => emit(&engine.get_analysis(&id)?),
            None => emit(&engine.list_analysis(limit, session.as_deref())?),
        },
    }
}

fn run_attempts(engine: &Engine, command: AttemptCommands) -> Result<()> {
    match command {
        AttemptCommands::List { role, limit } => emit(&engine.list_attempts(role.as_deref(), limit)?),
        AttemptCommands::Get { id } => emit(&engine.get_attempt(&id)?),
        AttemptCommands::Add {
            role,
            score,
            duration,
            date,
            difficulty,
        } => {
            let draft = AttemptDraft {
                role,
                score,
                duration_min: duration,
                date: date.as_deref().map(parse_date).transpose()?,
                difficulty,
            };
            emit(&engine.add_attempt(draft)?)
        }
        AttemptCommands::Update {
            id,
            role,
            score,
            duration,
            date,
            difficulty,
        } => {
            let patch = AttemptPatch {
                role,
                score,
                duration_min: duration,
                date: date.as_deref().map(parse_date).transpose()?,
                difficulty,
            };
            emit(&engine.update_attempt(&id, patch)?)
        }
        AttemptCommands::Delete { id } => {
            engine.delete_attempt(&id)?;
            emit(&json!({ "ok": true, "deleted": id }))
        }
        AttemptCommands::Export { role } => {
            print!("{}", engine.export_attempts_csv(role.as_deref())?);
            Ok(())
        }
    }
}

fn run_trainer(engine: &Engine, command: TrainerCommands) -> Result<()> {
    match command {
        TrainerCommands::List {
            role,
            topic,
            difficulty,
            include_core,
        } => emit(&engine.trainer_questions(
            role.as_deref(),
            topic.as_deref(),
            difficulty,
            include_core,
        )?),
        TrainerCommands::Add {
            role,
            text,
            topic,
            difficulty,
        } => emit(&engine.create_question(QuestionDraft {
            role,
            text,
            topic,
            difficulty,
        })?),
        TrainerCommands::Update {
            id,
            role,
            text,
            topic,
            difficulty,
        } => emit(&engine.update_question(
            &id,
            QuestionPatch {
                role,
                text,
                topic,
                difficulty,
            },
        )?),
        TrainerCommands::Delete { id } => {
            engine.delete_question(&id)?;
            emit(&json!({ "ok": true, "deleted": id }))
        }
    }
}

fn admission_class(command: &Commands) -> AdmissionClass {
    match command {
        Commands::Repair | Commands::Seed { .. } => AdmissionClass::Mutate,
        Commands::Attempts { command } => match command {
            AttemptCommands::Add { .. }
            | AttemptCommands::Update { .. }
            | AttemptCommands::Delete { .. } => AdmissionClass::Mutate,
            _ => AdmissionClass::Read,
        },
        Commands::Trainer { command } => match command {
            TrainerCommands::List { .. } => AdmissionClass::Read,
            _ => AdmissionClass::Mutate,
        },
        _ => AdmissionClass::Read,
    }
}

fn parse_date(raw: &str) -> Result<chrono::DateTime<chrono::Utc>> {
    parse_timestamp(raw).ok_or_else(|| StoreError::Validation(format!("unparseable date {:?}", raw)))
}

fn emit<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn emit_response(response: &Response) -> Result<()> {
    let body: serde_json::Value = if response.body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&response.body)?
    };
    emit(&json!({
        "status": response.status.code(),
        "etag": response.cache.as_ref().map(|c| c.etag.as_str()),
        "cache_control": response.cache.as_ref().map(|c| c.cache_control.as_str()),
        "body": body,
    }))
}

fn exit_code(e: &StoreError) -> ExitCode {
    match e.status() {
        Status::BadRequest => ExitCode::from(2),
        Status::NotFound => ExitCode::from(3),
        Status::TooManyRequests => ExitCode::from(4),
        _ => ExitCode::FAILURE,
    }
}

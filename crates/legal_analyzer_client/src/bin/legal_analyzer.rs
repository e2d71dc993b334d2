//! crates/legal_analyzer_client/src/bin/legal_analyzer.rs
//!
//! `legal-analyzer`: a command-line front end over the analyzer workflow.
//! Every invocation resumes the stored session, runs one command and exits.

use chrono::Local;
use clap::{Parser, Subcommand};
use legal_analyzer_client::{
    http::build_client, ClientConfig, FileSessionStore, HttpBackend, HttpCompletionClient,
};
use legal_analyzer_core::{
    analysis::{AnalysisItem, AnalysisReport},
    export::{analysis_file_name, transcript_file_name},
    ports::SessionStorage,
    workflow::{AnalyzerWorkflow, Tab, UploadedFile},
    ChatRole,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type Workflow = AnalyzerWorkflow<HttpBackend, HttpCompletionClient, FileSessionStore>;

#[derive(Parser, Debug)]
#[command(name = "legal-analyzer", about = "Analyze legal documents and chat about them")]
struct Args {
    /// Base URL of the analyzer backend. Defaults to `LEGAL_BACKEND_URL`.
    #[arg(long)]
    backend_url: Option<String>,

    /// URL of the chat completion proxy. Defaults to `LEGAL_PROXY_URL`.
    #[arg(long)]
    proxy_url: Option<String>,

    /// File that keeps the session id between runs. Defaults to `LEGAL_STATE_PATH`.
    #[arg(long, value_name = "FILE")]
    state: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract a PDF or TXT file and make it the current document.
    Upload { path: PathBuf },
    /// Ask the model for a structured analysis of the current document.
    Analyze,
    /// Print the stored analysis.
    Show,
    /// Ask a question about the current document.
    Chat { message: Vec<String> },
    /// Print the conversation with turn numbers.
    History,
    /// Re-ask the question behind the assistant turn at INDEX.
    Regenerate { index: usize },
    /// Write the analysis as pretty JSON.
    ExportAnalysis {
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Write the conversation as a plain-text transcript.
    ExportChat {
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Save a query for later.
    Favorite { query: Vec<String> },
    /// List saved queries, newest first.
    Favorites,
    /// Forget the current document.
    Reset,
    /// Delete the session file; the next run starts a new session.
    Forget,
    /// Show the session and current document.
    Status,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {}", message);
            ExitCode::FAILURE
        }
    }
}

fn load_config(args: &Args) -> Result<ClientConfig, String> {
    ClientConfig::from_env()
        .and_then(|config| {
            config.with_overrides(
                args.backend_url.as_deref(),
                args.proxy_url.as_deref(),
                args.state.clone(),
            )
        })
        .map_err(|e| e.to_string())
}

async fn run(args: Args) -> Result<(), String> {
    let config = load_config(&args)?;

    if let Command::Forget = args.command {
        let store = FileSessionStore::open(&config.state_path).map_err(|e| e.to_string())?;
        store.clear().map_err(|e| e.to_string())?;
        println!("Session forgotten.");
        return Ok(());
    }

    let store = FileSessionStore::open(&config.state_path).map_err(|e| e.to_string())?;
    let client = build_client().map_err(|e| e.to_string())?;
    let backend = HttpBackend::new(client.clone(), &config.backend_url, store.session_id());
    let llm = HttpCompletionClient::new(client, &config.proxy_url);
    let mut workflow: Workflow = AnalyzerWorkflow::new(backend, llm, store);
    workflow.resume().await;

    let today = Local::now().date_naive();
    match args.command {
        Command::Upload { path } => {
            let bytes = std::fs::read(&path)
                .map_err(|e| format!("Error reading or saving file: {}", e))?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            let id = workflow
                .upload(UploadedFile {
                    file_name,
                    content_type: None,
                    bytes,
                })
                .await
                .map_err(|e| e.to_string())?;
            let chars = workflow.document().map(|d| d.text.chars().count()).unwrap_or(0);
            println!("Uploaded document {} ({} characters).", id, chars);
        }
        Command::Analyze => {
            workflow.analyze().await.map_err(|e| e.to_string())?;
            if let Some(analysis) = workflow.analysis() {
                print_report(&analysis.report);
            }
        }
        Command::Show => {
            if !workflow.select_tab(Tab::Results) {
                return Err("No analysis yet. Run `legal-analyzer analyze` first.".to_string());
            }
            if let Some(analysis) = workflow.analysis() {
                print_report(&analysis.report);
            }
        }
        Command::Chat { message } => {
            workflow
                .send_chat(&message.join(" "))
                .await
                .map_err(|e| e.to_string())?;
            if let Some(reply) = workflow.history().last() {
                println!("{}", reply.content);
            }
        }
        Command::History => print_history(&workflow),
        Command::Regenerate { index } => {
            let replaced = workflow.regenerate(index).await.map_err(|e| e.to_string())?;
            if !replaced {
                return Err(format!("Turn {} is not an answer to a question.", index));
            }
            print_history(&workflow);
        }
        Command::ExportAnalysis { out } => {
            let json = workflow
                .export_analysis()
                .ok_or_else(|| "No analysis to export.".to_string())?;
            let out = out.unwrap_or_else(|| PathBuf::from(analysis_file_name(today)));
            std::fs::write(&out, json).map_err(|e| e.to_string())?;
            println!("Analysis written to {}", out.display());
        }
        Command::ExportChat { out } => {
            let out = out.unwrap_or_else(|| PathBuf::from(transcript_file_name(today)));
            std::fs::write(&out, workflow.export_transcript()).map_err(|e| e.to_string())?;
            println!("Transcript written to {}", out.display());
        }
        Command::Favorite { query } => {
            workflow
                .save_favorite(&query.join(" "))
                .await
                .map_err(|e| e.to_string())?;
            println!("Saved.");
        }
        Command::Favorites => {
            for favorite in workflow.favorites().await.map_err(|e| e.to_string())? {
                println!("{}  {}", favorite.created_at.format("%Y-%m-%d %H:%M"), favorite.query);
            }
        }
        Command::Reset => {
            workflow.reset().map_err(|e| e.to_string())?;
            println!("Current document cleared.");
        }
        Command::Status => {
            println!("Session:  {}", workflow.session_id());
            match workflow.document() {
                Some(doc) => println!("Document: {} ({})", doc.file_name, doc.id),
                None => println!("Document: none"),
            }
            println!("Analysis: {}", if workflow.analysis().is_some() { "yes" } else { "no" });
            println!("Chat:     {} turns", workflow.history().len());
        }
        Command::Forget => {}
    }
    Ok(())
}

fn print_history(workflow: &Workflow) {
    for (index, turn) in workflow.history().iter().enumerate() {
        let who = match turn.role {
            ChatRole::User => "you",
            ChatRole::Assistant => "assistant",
        };
        println!("[{}] {}: {}", index, who, turn.content);
    }
}

fn print_section(title: &str, items: &[AnalysisItem]) {
    if items.is_empty() {
        return;
    }
    println!("\n{}:", title);
    for item in items {
        println!("  - {}", item.display());
    }
}

fn print_report(report: &AnalysisReport) {
    if let Some(kind) = &report.document_type {
        println!("Document type: {}", kind);
    }
    if let Some(summary) = &report.summary {
        println!("\n{}", summary);
    }
    print_section("Parties", &report.parties);
    print_section("Key terms", &report.key_terms);
    print_section("Obligations", &report.obligations);
    print_section("Risks", &report.risks);
    print_section("Recommendations", &report.recommendations);
    if let Some(date) = &report.expiry_date {
        println!("\nExpiry date: {}", date);
    }
    if let Some(place) = &report.jurisdiction {
        println!("Jurisdiction: {}", place);
    }
}

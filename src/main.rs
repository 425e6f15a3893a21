mod agent;
mod cli;
mod config;
mod error;
mod pdf;
mod render;
mod session;
mod trace;
mod types;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use chrono::Local;
use clap::Parser;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use agent::events::{EventSink, ToolStatusKind, TurnEvent};
use agent::llm::openai::OpenAIProvider;
use agent::r#loop::AgentLoop;
use agent::tool::ToolExecutor;
use agent::tool::fs::Sandbox;
use agent::tool::web::HttpPageFetcher;
use agent::types::Message;
use cli::{ChatArgs, Cli, Commands, InitArgs};
use config::Config;
use pdf::{CommandPdfGenerator, PdfExtractText};
use render::HtmlResumeRenderer;
use session::Session;

const EXIT_FAILURE: i32 = 1;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Init(args) => init(&args),
        Commands::Chat(args) => chat(args).await,
        Commands::Tools => print_tools(),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(EXIT_FAILURE);
    }
}

fn init(args: &InitArgs) -> anyhow::Result<()> {
    if std::path::Path::new(&args.config).exists() && !args.r#override {
        bail!(
            "Config file {} already exists, use --override to replace it",
            args.config
        );
    }
    std::fs::write(&args.config, Config::scaffold()?)
        .with_context(|| format!("Failed to write config file {}", args.config))?;
    info!("Config written to {}", args.config);

    let config = Config::load(&args.config, &[])?;
    std::fs::create_dir_all(&config.data.root)
        .with_context(|| format!("Failed to create data directory {}", config.data.root.display()))?;
    info!("Data directory ready at {}", config.data.root.display());
    Ok(())
}

fn print_tools() -> anyhow::Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(&agent::tool::definitions())?
    );
    Ok(())
}

async fn chat(args: ChatArgs) -> anyhow::Result<()> {
    let mut config = Config::load(&args.config, &args.config_overrides)?;
    if let Some(dir) = &args.data_dir {
        config.data.root = std::path::absolute(dir)
            .with_context(|| format!("Invalid data directory {}", dir))?;
    }

    let sandbox = Sandbox::open(&config.data.root)
        .context("Data directory unavailable (create it with `worklooking init`)")?;
    info!("Using data directory {}", sandbox.root().display());
    let session = Session::new(&sandbox);
    let resume = session.load_resume().await;
    let candidature = session.load_config().await;
    let mut history = if args.reset {
        info!("Starting a new conversation");
        Vec::new()
    } else {
        session.load_history().await
    };
    history.push(session::user_message(&args.message, args.attachment.as_deref()));

    let executor = ToolExecutor::new(
        sandbox.clone(),
        Arc::new(HtmlResumeRenderer),
        Arc::new(CommandPdfGenerator::new(
            config.render.pdf_command.clone(),
            Duration::from_secs(config.render.pdf_timeout_secs),
        )),
        Arc::new(PdfExtractText),
        Arc::new(HttpPageFetcher::new(Duration::from_secs(
            config.fetch.selector_timeout_secs,
        ))),
    )
    .default_theme(config.render.theme.as_str())
    .max_fetch_chars(config.fetch.max_chars);

    let mut provider = OpenAIProvider::new(&config.llm.base_url, &args.api_key, &config.llm.model)
        .temperature(config.llm.temperature)
        .max_tokens(config.llm.max_tokens);
    for (key, value) in &config.llm.headers {
        provider = provider.header(key, value);
    }
    let mut agent = AgentLoop::new(provider, executor).max_rounds(config.agent.max_rounds);

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling turn");
            interrupt.cancel();
        }
    });

    let started_at = Local::now();
    let start = Instant::now();
    let (events, rx) = EventSink::channel();
    let (result, ()) = tokio::join!(
        agent.handle_turn(&history, resume, candidature, events, &cancel),
        print_events(rx)
    );
    let elapsed_secs = start.elapsed().as_secs_f64();

    let (reply, transcript, rounds, failure) = match result {
        Ok(outcome) => {
            if let Some(resume) = &outcome.updated_resume {
                session.save_resume(resume).await?;
                info!("Source resume updated");
            }
            if let Some(candidature) = &outcome.updated_config {
                session.save_config(candidature).await?;
                info!("Candidature config updated");
            }
            (
                Message::assistant(outcome.content),
                outcome.messages,
                Some(outcome.rounds),
                None,
            )
        }
        Err(e) => (session::error_message(&e), history.clone(), None, Some(e)),
    };

    if let Some(content) = &reply.content {
        println!("{}", content);
    }

    if let Some(path) = &args.trace {
        trace::write_trace(
            path,
            &trace::TraceEntry {
                started_at,
                model: config.llm.model.clone(),
                elapsed_secs,
                rounds,
                outcome: reply.content.clone().unwrap_or_default(),
                tools: agent.tools().to_vec(),
                messages: transcript,
            },
        )?;
    }

    history.push(reply);
    session.save_history(&history).await?;

    match failure {
        Some(e) => Err(e).context("Turn failed"),
        None => Ok(()),
    }
}

/// Print turn progress as it happens: partial replies on stdout, tool
/// activity on stderr.
async fn print_events(mut rx: UnboundedReceiver<TurnEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            TurnEvent::AssistantPartial { content } => println!("{}", content),
            TurnEvent::ToolStatus(status) => match status.status {
                ToolStatusKind::Start => eprintln!("[{}] running", status.name),
                ToolStatusKind::End => {
                    match status.result.as_ref().and_then(|r| r.get("error")) {
                        Some(err) => eprintln!("[{}] failed: {}", status.name, err),
                        None => eprintln!("[{}] done", status.name),
                    }
                }
            },
        }
    }
}

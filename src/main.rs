use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use edubot::session::GREETING;
use edubot::{
    ChatController, ChatSession, Config, GeminiClient, KeywordTableDetector, LocalSource,
    ResponseGenerator, ResponseSink,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Overseas education advisor chat", long_about = None)]
struct Args {
    /// Document to attach to the conversation (repeatable)
    #[arg(short = 'f', long = "file")]
    files: Vec<PathBuf>,

    /// Directory of documents to attach
    #[arg(short = 'd', long)]
    dir: Option<PathBuf>,

    /// Send a single message, print the reply and exit
    #[arg(short = 'm', long)]
    message: Option<String>,

    /// Gemini model name
    #[arg(long)]
    model: Option<String>,

    /// Gemini API base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Log level (overrides LOG_LEVEL)
    #[arg(long)]
    log_level: Option<String>,
}

/// Prints streamed text to stdout as it arrives.
#[derive(Default)]
struct TerminalSink {
    printed: String,
    completed: bool,
}

impl TerminalSink {
    fn write(&mut self, text: &str) {
        let mut stdout = io::stdout();
        if let Some(delta) = text.strip_prefix(self.printed.as_str()) {
            let _ = write!(stdout, "{}", delta);
        } else {
            // A retry restarted the reply
            let _ = write!(stdout, "\n{}", text);
        }
        let _ = stdout.flush();
        self.printed = text.to_string();
    }
}

impl ResponseSink for TerminalSink {
    fn typing(&mut self, partial: &str) {
        self.write(partial);
    }

    fn complete(&mut self, full: &str) {
        self.write(full);
        println!();
        self.printed.clear();
        self.completed = true;
    }

    fn notice(&mut self, message: &str) {
        if !self.printed.is_empty() {
            println!();
            self.printed.clear();
        }
        eprintln!("[!] {}", message);
    }
}

fn init_tracing(level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn attach(session: &mut ChatSession, path: &Path) {
    match LocalSource::new(path).collect() {
        Ok(files) => {
            for file in &files {
                println!("Attached {} ({})", file.name(), file.format());
            }
            session.add_uploads(files);
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to attach upload");
            eprintln!("Could not attach {}: {}", path.display(), e);
        }
    }
}

async fn respond(controller: &ChatController, session: &mut ChatSession, message: &str) {
    let mut sink = TerminalSink::default();
    let reply = controller.handle_message(session, message, &mut sink).await;
    // Fallback replies are never streamed
    if !sink.completed {
        println!("{}", reply);
    }
}

fn print_history(session: &ChatSession) {
    println!("{}", session.transcript());
}

fn print_files(session: &ChatSession) {
    if session.uploads().is_empty() {
        println!("No files attached.");
        return;
    }
    for file in session.uploads() {
        println!("{} ({}, {} bytes)", file.name(), file.mime_type(), file.len());
    }
}

async fn run_repl(controller: &ChatController, session: &mut ChatSession) -> Result<()> {
    println!("{}", GREETING);
    println!("Commands: /upload PATH, /files, /history, /quit");

    let mut buffer = String::new();
    loop {
        print!("> ");
        io::stdout().flush()?;

        buffer.clear();
        if io::stdin().read_line(&mut buffer)? == 0 {
            break;
        }
        let input = buffer.trim();
        if input.is_empty() {
            continue;
        }

        match input.split_once(' ').unwrap_or((input, "")) {
            ("/quit", _) | ("/exit", _) => break,
            ("/files", _) => print_files(session),
            ("/history", _) => print_history(session),
            ("/upload", path) if !path.trim().is_empty() => attach(session, Path::new(path.trim())),
            ("/upload", _) => println!("Usage: /upload PATH"),
            _ => respond(controller, session, input).await,
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    let mut config = Config::from_env()?;
    if let Some(model) = args.model {
        config.gemini.model = model;
    }
    if let Some(base_url) = args.base_url {
        config.gemini.base_url = base_url;
    }
    if let Some(level) = args.log_level {
        config.logging.log_level = level;
    }

    init_tracing(&config.logging.log_level);
    info!(model = %config.gemini.model, "Starting edubot");

    let client = GeminiClient::new(config.gemini.clone())?;
    let generator = ResponseGenerator::new(Arc::new(client), config.retry);
    let controller = ChatController::new(
        generator,
        Arc::new(KeywordTableDetector::new()),
        config.extraction.clone(),
    );

    let mut session = ChatSession::new();
    for path in &args.files {
        attach(&mut session, path);
    }
    if let Some(dir) = &args.dir {
        attach(&mut session, dir);
    }

    match args.message {
        Some(message) => respond(&controller, &mut session, &message).await,
        None => run_repl(&controller, &mut session).await?,
    }

    Ok(())
}

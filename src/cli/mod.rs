pub mod commands;

use std::io::{self, Write};
use std::path::PathBuf;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::cli::commands::{Commands, VisitorAction};
use crate::client::{geo::GeoLookup, identity::VisitorIdStore, open_session, ClientError, RelayClient};
use crate::config::{AppConfig, ConfigError};
use crate::db::{get_connection, DuckDbStore, StoreError, VisitorStore};
use crate::terminal::{Terminal, PROMPT, TYPE_DELAY};

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("I/O Error: {0}")]
    Io(#[from] io::Error),
    #[error("DATABASE_URL is not configured")]
    NoDatabase,
    #[error("No data directory on this platform, pass --id-file")]
    NoIdLocation,
    #[error("The serve command is handled by the server entry point")]
    Serve,
}

pub async fn run_cli(command: Commands, config_path: &str) -> Result<(), CliError> {
    match command {
        Commands::Serve => Err(CliError::Serve),
        Commands::Terminal {
            server,
            id_file,
            skip_geo,
            geo_url,
        } => run_terminal(&server, id_file, skip_geo, &geo_url).await,
        Commands::Visitors { action } => {
            let config = AppConfig::load(config_path)?;
            let database = config.database.as_ref().ok_or(CliError::NoDatabase)?;
            let pool = get_connection(database).map_err(StoreError::from)?;
            run_visitors(action, &DuckDbStore::new(pool)).await
        }
    }
}

async fn run_visitors(action: VisitorAction, store: &dyn VisitorStore) -> Result<(), CliError> {
    match action {
        VisitorAction::List { limit } => {
            let visitors = store.list_visitors(limit).await?;
            if visitors.is_empty() {
                println!("No visitors found.");
                return Ok(());
            }
            println!("{:<38} | {:<26} | {}", "ID", "Last Seen", "Location");
            println!("{:-<38}-+-{:-<26}-+-{:-<20}", "", "", "");
            for v in visitors {
                println!(
                    "{:<38} | {:<26} | {}, {}",
                    v.visitor_id.to_string(),
                    v.last_seen.to_rfc3339(),
                    v.city,
                    v.country
                );
            }
        }
        VisitorAction::Show { id } => match store.get_visitor(id).await? {
            Some(v) => {
                println!("Visitor:     {}", v.visitor_id);
                println!("Fingerprint: {}", v.fingerprint_hash);
                println!("IP:          {}", v.ip);
                println!("Location:    {}, {} ({}, {})", v.city, v.country, v.latitude, v.longitude);
                println!("User Agent:  {}", v.user_agent);
                println!("First Seen:  {}", v.first_seen.to_rfc3339());
                println!("Last Seen:   {}", v.last_seen.to_rfc3339());
            }
            None => println!("Visitor {} not found.", id),
        },
        VisitorAction::History { id, limit } => {
            let conversations = store.recent_conversations(id, limit).await?;
            if conversations.is_empty() {
                println!("No conversations for visitor {}.", id);
            }
            for c in conversations {
                println!("[{}] #{}", c.ts.to_rfc3339(), c.id);
                println!("> {}", c.prompt);
                println!("{}", c.answer);
                println!("---");
            }
        }
    }
    Ok(())
}

async fn run_terminal(
    server: &str,
    id_file: Option<PathBuf>,
    skip_geo: bool,
    geo_url: &str,
) -> Result<(), CliError> {
    let http = reqwest::Client::new();
    let relay = RelayClient::new(http.clone(), server);
    let ids = match id_file {
        Some(path) => VisitorIdStore::new(path),
        None => VisitorIdStore::default_location().ok_or(CliError::NoIdLocation)?,
    };
    let geo = (!skip_geo).then(|| GeoLookup::new(http, geo_url));

    let session = open_session(&ids, geo.as_ref(), &relay).await?;

    let mut terminal = Terminal::default();
    let mut stdout = io::stdout();
    write!(stdout, "{}", terminal.screen().text())?;
    stdout.flush()?;

    // Line input: the console echoes keys itself, the terminal tracks state
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if matches!(line.trim(), "/exit" | "/quit") {
            break;
        }

        let Some(prompt) = terminal.enter_line(&line) else {
            write!(stdout, "{PROMPT}")?;
            stdout.flush()?;
            continue;
        };

        let answer = match relay.query(session.visitor_id, &prompt).await {
            Ok(answer) => answer,
            Err(e) => format!("ERROR: {}", e),
        };

        terminal
            .play_answer(&answer, TYPE_DELAY, |_, c| {
                print!("{c}");
                io::stdout().flush().ok();
            })
            .await;
        terminal.ready_for_input();

        write!(stdout, "\n{PROMPT}")?;
        stdout.flush()?;
    }

    println!();
    Ok(())
}

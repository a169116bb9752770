mod cli;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use cli::{Cli, Commands, SuggestionAction};
use pemblebox::board::Page;
use pemblebox::config::Config;
use pemblebox::onboarding::STEPS;
use pemblebox::types::{Status, Suggestion, SuggestionDraft};
use pemblebox::PembleBox;

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Steps => print_steps(),
        Commands::Page { name } => print_page(Page::from_slug(&name)),
        Commands::Invite { handle } => {
            let app = connect(&cli.config, cli.database_url).await?;
            app.request_invite(&handle).await.context("Failed to submit request. Please try again.")?;
            println!("We'll send you an invite within 24 hours!");
        }
        Commands::Suggestions { action } => {
            let app = connect(&cli.config, cli.database_url).await?;
            run_suggestions(&app, action).await?;
        }
    }
    Ok(())
}

async fn connect(config_path: &Option<PathBuf>, database_url: Option<String>) -> Result<PembleBox> {
    let mut config = Config::load(config_path.as_deref())?;
    if database_url.is_some() {
        config.database_url = database_url;
    }
    PembleBox::connect(config).await
}

async fn run_suggestions(app: &PembleBox, action: SuggestionAction) -> Result<()> {
    let store = app.store();
    match action {
        SuggestionAction::List => {
            print_list(&store.list().await?);
        }
        SuggestionAction::Add { kind, title, details } => {
            let draft = SuggestionDraft::from_form(&kind, &title, &details)?;
            let created = store.create(&draft).await?;
            println!("Your suggestion has been submitted. Thank you! ({})", created.id);
        }
        SuggestionAction::Toggle { id } => {
            let updated = store.toggle_status(&id).await?;
            println!("{} is now {}", updated.title, updated.status);
        }
        SuggestionAction::SetStatus { id, status } => {
            let status: Status = status.parse()?;
            let updated = store.set_status(&id, status).await?;
            println!("{} is now {}", updated.title, updated.status);
        }
        SuggestionAction::Remove { id } => {
            store.delete(&id).await?;
            println!("Suggestion has been removed");
        }
        SuggestionAction::Watch => {
            let mut board = app.board();
            board.open().await;
            if !store.changes().is_live() {
                info!("local storage has no change feed; showing the current list only");
            }
            print_list(board.items());

            let ctrl_c = tokio::signal::ctrl_c();
            tokio::pin!(ctrl_c);
            let mut tick = tokio::time::interval(std::time::Duration::from_millis(250));
            loop {
                tokio::select! {
                    _ = &mut ctrl_c => break,
                    _ = tick.tick() => {
                        if board.sync_if_stale().await {
                            print_list(board.items());
                        }
                        for notice in board.take_notices() {
                            eprintln!("{}: {}", notice.title, notice.description);
                        }
                    }
                }
            }
            board.close();
        }
    }
    Ok(())
}

fn print_steps() {
    for (i, step) in STEPS.iter().enumerate() {
        println!("{}. {}", i + 1, step.title);
        println!("   {}", step.description);
        if let Some(link) = step.link {
            println!("   {link}");
        }
    }
}

fn print_list(list: &[Suggestion]) {
    if list.is_empty() {
        println!("No suggestions yet.");
        return;
    }
    for s in list {
        let mark = match s.status {
            Status::Added => "added  ",
            Status::Pending => "pending",
        };
        println!("[{mark}] {} ({} • {}) id={}", s.title, s.kind, s.created_at.format("%Y-%m-%d"), s.id);
        if let Some(details) = &s.details {
            println!("          {details}");
        }
    }
}

fn print_page(page: Page) {
    println!("== {} ==", page.label());
    match page {
        Page::Home => {
            println!("Welcome to PembleBox");
            println!("Your gateway to endless entertainment, completely free!");
        }
        Page::GetStarted => println!("Run `pemblebox steps` for the onboarding guide."),
        Page::Suggest => println!("Run `pemblebox suggestions list` to browse the suggestion box."),
        Page::Donate => {
            println!("Please consider supporting to keep the server running.");
            println!("https://buymeacoffee.com/carsonpemble");
        }
    }
}

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use craas_token::cli;
use craas_token::client::{CraasClient, TokenApi};
use craas_token::config::{self, Config};
use craas_token::jobs;
use craas_token::models::token::Token;
use craas_token::reconcile;
use craas_token::resource::{TokenResource, TokenSpec};
use craas_token::state::TrackedState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = config::load()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "craas_token=info".into()),
        ))
        .with(cfg.json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!cfg.json_logs).then(tracing_subscriber::fmt::layer))
        .init();

    let args = cli::Cli::parse();

    let result = run(cfg, args.command).await;
    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    result
}

async fn run(cfg: Config, command: cli::Commands) -> anyhow::Result<()> {
    let client = CraasClient::new(
        cfg.endpoint.clone(),
        cfg.auth_token()?,
        cfg.request_timeout,
    )?;
    let state = Arc::new(TrackedState::load(&cfg.state_file).await?);
    let resource = Arc::new(TokenResource::new(client, state));

    match command {
        cli::Commands::Token { command } => handle_token_command(command, &resource, &cfg).await,
        cli::Commands::Refresh => {
            let diagnostics = jobs::refresh::run_once(resource.as_ref(), &cfg.state_file).await?;
            if diagnostics.is_empty() {
                println!("All {} tracked token(s) are current.", resource.state().len());
            }
            for d in diagnostics {
                println!("{:<8} {:<38} {}: {}", format!("{:?}", d.severity), d.token_id, d.summary, d.detail);
            }
            Ok(())
        }
        cli::Commands::Watch { interval } => {
            let period = interval
                .map(std::time::Duration::from_secs)
                .unwrap_or(cfg.refresh_interval);
            tracing::info!(period_secs = period.as_secs(), "starting token refresh loop");
            let handle = jobs::refresh::spawn(resource.clone(), cfg.state_file.clone(), period);

            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for Ctrl-C")?;
            handle.abort();
            let _ = handle.await;
            resource.state().save(&cfg.state_file).await?;
            tracing::info!("token refresh loop stopped");
            Ok(())
        }
    }
}

async fn handle_token_command(
    cmd: cli::TokenCommands,
    resource: &TokenResource<CraasClient>,
    cfg: &Config,
) -> anyhow::Result<()> {
    match cmd {
        cli::TokenCommands::Create {
            name,
            project_id,
            mode_rw,
            all_registries,
            registry_ids,
            expires_at,
        } => {
            let project = match project_id {
                Some(raw) => uuid::Uuid::parse_str(&raw).context("Invalid project_id")?,
                None => cfg
                    .project_id
                    .context("project_id is required (pass --project-id or set CRAAS_PROJECT_ID)")?,
            };

            let spec = TokenSpec {
                name,
                mode_rw,
                all_registries,
                registry_ids,
                is_set: expires_at.is_some(),
                expires_at,
            };
            let created = resource.create(project, &spec).await?;
            resource.state().save(&cfg.state_file).await?;

            println!(
                "Token created:\n  ID:       {}\n  Username: {}\n  Token:    {}",
                created.id, created.username, created.token
            );
        }
        cli::TokenCommands::Get { id } => {
            let token = resource.api().get_token(&id).await?;
            print_tokens(std::slice::from_ref(&token));
            match reconcile::decide(&token, Utc::now()) {
                reconcile::Outcome::Keep => println!("\nLifecycle: current"),
                reconcile::Outcome::Remove { reason } => println!("\nLifecycle: stale ({})", reason),
            }
        }
        cli::TokenCommands::List => {
            let tokens = resource.api().list_tokens().await?;
            if tokens.is_empty() {
                println!("No tokens found.");
            } else {
                print_tokens(&tokens);
            }
        }
        cli::TokenCommands::Update {
            id,
            name,
            mode_rw,
            all_registries,
            registry_ids,
            expires_at,
            no_expiry,
        } => {
            let current = resource
                .state()
                .get(&id)
                .with_context(|| format!("token {} is not tracked", id))?;

            let mut spec = TokenSpec {
                name: name.unwrap_or(current.name),
                mode_rw: mode_rw.unwrap_or(current.mode_rw),
                all_registries: all_registries.unwrap_or(current.all_registries),
                registry_ids: registry_ids.unwrap_or(current.registry_ids),
                is_set: current.is_set,
                expires_at: current.expires_at,
            };
            if spec.all_registries && all_registries == Some(true) {
                spec.registry_ids.clear();
            }
            if let Some(at) = expires_at {
                spec.is_set = true;
                spec.expires_at = Some(at);
            }
            if no_expiry {
                spec.is_set = false;
                spec.expires_at = None;
            }

            let updated = resource.update(&id, &spec).await?;
            resource.state().save(&cfg.state_file).await?;
            println!("Token {} updated ({}).", updated.id, updated.name);
        }
        cli::TokenCommands::Delete { id } => {
            resource.delete(&id).await?;
            resource.state().save(&cfg.state_file).await?;
            println!("Token {} deleted.", id);
        }
    }
    Ok(())
}

fn print_tokens(tokens: &[Token]) {
    println!(
        "{:<38} {:<24} {:<10} {:<6} EXPIRES",
        "ID", "NAME", "STATUS", "RW"
    );
    for t in tokens {
        let expires = t
            .expiration
            .deadline()
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "never".into());
        println!(
            "{:<38} {:<24} {:<10} {:<6} {}",
            t.id, t.name, t.status.as_str(), t.scope.mode_rw, expires
        );
    }
}

use std::{process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    CompanyApi, CompanyFormController, CompanyListController, ConfirmationGate, DeleteOutcome,
    FormField, HttpCompanyClient, LoadStatus, RefreshTrigger, SubmitOutcome,
};
use dialoguer::Confirm;
use shared::domain::{CompanyDraft, CompanyId};
use tracing::warn;
use tracing_subscriber::EnvFilter;

mod config;
mod render;

use config::{load_settings, normalize_base_url};
use render::{render_company, render_list};

#[derive(Parser, Debug)]
#[command(about = "Manage the company directory")]
struct Args {
    /// Base URL of the directory service (overrides config and env).
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// Request timeout in seconds.
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_secs: Option<u64>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List all companies.
    List,
    /// Show one company.
    Show { id: i64 },
    /// Add a company, then print the refreshed list.
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        location: String,
    },
    /// Replace a company's name and location.
    Update {
        id: i64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        location: String,
    },
    /// Delete a company after confirmation.
    Delete {
        id: i64,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
}

struct PromptGate {
    assume_yes: bool,
}

impl ConfirmationGate for PromptGate {
    fn confirm(&self, message: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        tokio::task::block_in_place(|| {
            Confirm::new()
                .with_prompt(message)
                .default(false)
                .interact()
        })
        .unwrap_or_else(|err| {
            warn!("confirmation prompt failed: {err}");
            false
        })
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(base_url) = args.base_url {
        settings.base_url = base_url;
    }
    if let Some(timeout_secs) = args.timeout_secs {
        settings.request_timeout_secs = timeout_secs;
    }
    let base_url = normalize_base_url(&settings.base_url)?;
    let api: Arc<dyn CompanyApi> = Arc::new(
        HttpCompanyClient::with_timeout(&base_url, settings.request_timeout())
            .context("failed to initialize company api client")?,
    );

    match args.command {
        Command::List => {
            let list = mounted_list(&api, false, RefreshTrigger::new()).await;
            let state = list.state().await;
            print!("{}", render_list(&state));
            Ok(exit_code(state.load_status() != LoadStatus::Failed))
        }
        Command::Show { id } => match api.get_by_id(CompanyId(id)).await {
            Ok(company) => {
                println!("{}", render_company(&company));
                Ok(ExitCode::SUCCESS)
            }
            Err(err) => {
                eprintln!("Error: {err}");
                Ok(ExitCode::FAILURE)
            }
        },
        Command::Add { name, location } => {
            let trigger = RefreshTrigger::new();
            let list = mounted_list(&api, false, trigger.clone()).await;
            let form = CompanyFormController::new(Arc::clone(&api), trigger);

            form.open().await?;
            form.update_field(FormField::Name, name).await?;
            form.update_field(FormField::Location, location).await?;
            let created = match form.submit().await? {
                SubmitOutcome::Created(company) => {
                    println!("Added {}", render_company(&company));
                    true
                }
                SubmitOutcome::Invalid | SubmitOutcome::Failed(_) => {
                    let state = form.state().await;
                    eprintln!("Error: {}", state.error().unwrap_or("failed to add company"));
                    form.cancel().await?;
                    false
                }
                SubmitOutcome::Discarded => false,
            };

            if created && list.sync_with_trigger().await {
                print!("{}", render_list(&list.state().await));
            }
            Ok(exit_code(created))
        }
        Command::Update { id, name, location } => {
            let draft = CompanyDraft::new(name.trim(), location.trim());
            match api.update(CompanyId(id), &draft).await {
                Ok(company) => {
                    println!("Updated {}", render_company(&company));
                    Ok(ExitCode::SUCCESS)
                }
                Err(err) => {
                    eprintln!("Error: {err}");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::Delete { id, yes } => {
            let list = mounted_list(&api, yes, RefreshTrigger::new()).await;
            let outcome = list.delete(CompanyId(id)).await;
            match &outcome {
                DeleteOutcome::Deleted => println!("Deleted company {id}"),
                DeleteOutcome::Declined => println!("Delete cancelled"),
                DeleteOutcome::Failed(_) | DeleteOutcome::Discarded => {}
            }
            print!("{}", render_list(&list.state().await));
            Ok(exit_code(!matches!(outcome, DeleteOutcome::Failed(_))))
        }
    }
}

async fn mounted_list(
    api: &Arc<dyn CompanyApi>,
    assume_yes: bool,
    trigger: RefreshTrigger,
) -> Arc<CompanyListController> {
    let list = CompanyListController::new(
        Arc::clone(api),
        Arc::new(PromptGate { assume_yes }),
        trigger.signal(),
    );
    list.mount().await;
    list
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

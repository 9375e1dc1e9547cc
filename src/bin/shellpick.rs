// src/bin/shellpick.rs

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use colored::Colorize;
use std::collections::HashMap;
use std::path::PathBuf;

use shellpick::cli::Cli;
use shellpick::context::{InvocationContext, WorkspaceContext};
use shellpick::core::invocation::execute_invocation;
use shellpick::models::WorkspaceFolder;
use shellpick::system::config_loader::{FileConfigurationSource, NamedCommandExecutor};
use shellpick::system::executor::StdProcessRunner;
use shellpick::system::memory::{JsonFileStore, SessionStore};
use shellpick::system::ui::{ConsoleReporter, DialoguerPicker, DialoguerPrompt};

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(Some(value)) => println!("{value}"),
        Ok(None) => {
            eprintln!("{}", "Cancelled.".dimmed());
            std::process::exit(1);
        }
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<Option<String>> {
    let config = FileConfigurationSource::load(&cli.scopes)?;
    let args = config
        .find_args(&cli.input)
        .ok_or_else(|| anyhow!("No invocation record matches '{}'.", cli.input))?;

    let workspace = build_workspace(&cli.folders)?;
    let runner = StdProcessRunner;
    let picker = DialoguerPicker;
    let prompter = DialoguerPrompt;
    let reporter = ConsoleReporter;
    let session = SessionStore::default();
    let persistent = JsonFileStore::open(
        cli.state_file
            .clone()
            .unwrap_or_else(JsonFileStore::default_path),
    );
    let commands = NamedCommandExecutor::new(
        config.commands().clone(),
        workspace
            .folders
            .first()
            .map(|folder| folder.path.clone())
            .unwrap_or_else(|| PathBuf::from(".")),
        workspace.env.clone(),
    );

    let ctx = InvocationContext {
        config: &config,
        runner: &runner,
        picker: &picker,
        prompter: &prompter,
        commands: &commands,
        session: &session,
        persistent: &persistent,
        reporter: &reporter,
        workspace: &workspace,
    };

    Ok(execute_invocation(&args, &ctx)?)
}

fn build_workspace(folders: &[PathBuf]) -> Result<WorkspaceContext> {
    let paths = if folders.is_empty() {
        vec![std::env::current_dir().context("Could not determine the current directory")?]
    } else {
        folders.to_vec()
    };

    let folders = paths
        .into_iter()
        .map(|path| {
            let name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.to_string_lossy().into_owned());
            WorkspaceFolder {
                name,
                path: dunce::simplified(&path).to_path_buf(),
            }
        })
        .collect();

    Ok(WorkspaceContext {
        folders,
        env: std::env::vars().collect::<HashMap<_, _>>(),
        ..Default::default()
    })
}

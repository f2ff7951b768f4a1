//! QMS - a local, file-backed quality management system CLI.
//!
//! Single-actor model: one command invocation runs to completion and
//! exits before another starts. There are no locks and no daemon; every
//! command is a straight-line sequence of filesystem operations ordered so
//! that state after a partial failure is recoverable from metadata plus the
//! audit log.

mod audit;
mod cli;
mod commands;
mod context;
mod docio;
mod error;
mod identity;
mod meta;
mod project;
mod prompts;
mod registry;
mod tasks;
mod templates;
mod version;
mod workflow;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use cli::{Cli, Command, NamespaceAction};
use context::CommandContext;
use error::QmsError;
use project::Project;
use registry::Registry;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help/--version print and succeed; anything else is a usage
            // error and exits 1 after the help text.
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
            let _ = e.print();
            return code;
        }
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            if let Some(qms_error) = e.downcast_ref::<QmsError>() {
                if let Some(hint) = qms_error.hint() {
                    eprintln!("{hint}");
                }
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let cwd = std::env::current_dir().context("cannot determine working directory")?;

    if let Command::Init = cli.command {
        return commands::init::run(&cwd);
    }

    let project = Project::discover(&cwd)?;
    let registry = Registry::load(&project)?;
    let ctx = CommandContext::authenticate(&project, &registry, cli.user.as_deref())?;

    match cli.command {
        Command::Create {
            doc_type,
            title,
            parent,
            name,
        } => commands::create::run(
            &ctx,
            &commands::create::CreateArgs {
                doc_type,
                title,
                parent,
                name,
            },
        ),
        Command::Read {
            doc_id,
            version,
            draft,
        } => commands::read::run(&ctx, &doc_id, version.as_deref(), draft),
        Command::Checkout { doc_id } => commands::checkout::run(&ctx, &doc_id),
        Command::Checkin { doc_id } => commands::checkin::run(&ctx, &doc_id),
        Command::Route {
            doc_id,
            review,
            approval,
            assign,
            retire,
        } => commands::route::run(
            &ctx,
            &commands::route::RouteArgs {
                doc_id,
                review,
                approval,
                assign,
                retire,
            },
        ),
        Command::Assign { doc_id, assignees } => commands::assign::run(&ctx, &doc_id, &assignees),
        Command::Review {
            doc_id,
            recommend,
            request_updates,
            comment,
        } => commands::review::run(
            &ctx,
            &commands::review::ReviewArgs {
                doc_id,
                recommend,
                request_updates,
                comment,
            },
        ),
        Command::Approve { doc_id } => commands::approve::run(&ctx, &doc_id),
        Command::Reject { doc_id, comment } => {
            commands::reject::run(&ctx, &doc_id, comment.as_deref())
        }
        Command::Release { doc_id } => commands::release::run(&ctx, &doc_id),
        Command::Revert { doc_id, reason } => {
            commands::revert::run(&ctx, &doc_id, reason.as_deref())
        }
        Command::Close { doc_id } => commands::close::run(&ctx, &doc_id),
        Command::Cancel { doc_id, confirm } => commands::cancel::run(&ctx, &doc_id, confirm),
        Command::Fix { doc_id } => commands::fix::run(&ctx, &doc_id),
        Command::Status { doc_id } => commands::status::run(&ctx, &doc_id),
        Command::Inbox => commands::inbox::run(&ctx),
        Command::Workspace => commands::workspace::run(&ctx),
        Command::History { doc_id } => commands::history::run(&ctx, &doc_id),
        Command::Comments { doc_id, version } => {
            commands::comments::run(&ctx, &doc_id, version.as_deref())
        }
        Command::Init => unreachable!("handled before project discovery"),
        Command::Namespace { action } => match action {
            NamespaceAction::List => commands::namespace::list(&ctx),
            NamespaceAction::Add { name } => commands::namespace::add(&ctx, &name),
        },
        Command::User { add, group, list } => {
            if let Some(user) = add {
                commands::user::add(&ctx, &user, group.as_deref())
            } else if list {
                commands::user::list(&ctx)
            } else {
                anyhow::bail!("specify --add <user> --group <group> or --list")
            }
        }
        Command::Migrate => commands::migrate::run(&ctx),
        Command::VerifyMigration => commands::verify_migration::run(&ctx),
    }
}

#[cfg(test)]
#[path = "tests/scenario_tests.rs"]
mod scenario_tests;

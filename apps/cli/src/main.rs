use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use client_core::{config::DEFAULT_CONFIG_FILE, load_settings, LeaveClient};
use shared::{
    domain::{Actor, LeaveStatus, LeaveType, RequestId, UserId, UserRole},
    protocol::{LeavePatch, ListQuery, SortField, SortOrder},
};
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "leavectl", about = "Submit and review leave requests")]
struct Cli {
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Overrides `server_url` from the config file.
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long = "as", default_value_t = 1)]
    user_id: i64,
    #[arg(long, default_value = "")]
    name: String,
    #[arg(long, default_value = "")]
    department: String,
    #[arg(long, default_value = "user")]
    role: UserRole,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    List {
        #[arg(long)]
        status: Option<LeaveStatus>,
        #[arg(long)]
        leave_type: Option<LeaveType>,
        /// Only the caller's own requests.
        #[arg(long)]
        mine: bool,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        newest_first: bool,
    },
    Show {
        id: i64,
    },
    Create {
        start: NaiveDate,
        end: NaiveDate,
        leave_type: LeaveType,
        reason: String,
    },
    Edit {
        id: i64,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(long)]
        leave_type: Option<LeaveType>,
        #[arg(long)]
        reason: Option<String>,
    },
    Approve {
        id: i64,
        #[arg(long)]
        comment: Option<String>,
    },
    Reject {
        id: i64,
        comment: String,
    },
    Delete {
        id: i64,
    },
    Attach {
        id: i64,
        file: PathBuf,
    },
    Stats {
        #[arg(long)]
        user: Option<i64>,
        /// Per-requester totals of a whole department instead of one user.
        #[arg(long, conflicts_with = "user")]
        department: Option<String>,
        #[arg(long)]
        year: Option<i32>,
    },
}

/// Number of entries before 1-based `page`.
fn page_offset(page: u32, take: u32) -> Result<u32> {
    page.saturating_sub(1)
        .checked_mul(take)
        .with_context(|| format!("page {page} is out of range"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("warn").init();
    let cli = Cli::parse();

    let mut settings = load_settings(&cli.config)?;
    if let Some(url) = cli.server_url.clone() {
        settings.server_url = url;
    }
    debug!(server_url = %settings.server_url, "using leave authority");

    let actor = Actor {
        user_id: UserId(cli.user_id),
        name: cli.name,
        department: cli.department,
        role: cli.role,
    };
    let client = LeaveClient::over_http(&settings, actor)?;

    match cli.command {
        Command::List {
            status,
            leave_type,
            mine,
            page,
            newest_first,
        } => {
            let take = settings.page_size.max(1);
            let skip = page_offset(page, take)?;
            let query = ListQuery {
                status,
                leave_type,
                requester_id: mine.then_some(UserId(cli.user_id)),
                sort: Some(SortField::CreatedAt),
                order: Some(if newest_first {
                    SortOrder::Desc
                } else {
                    SortOrder::Asc
                }),
                ..ListQuery::page(skip, take)
            };
            let requests = client.fetch_requests(&query).await?;
            for request in &requests {
                println!(
                    "#{:<5} {:<9} {:<10} {} .. {} ({} d) {}",
                    request.id,
                    request.status,
                    request.leave_type,
                    request.start_date,
                    request.end_date,
                    request.duration_days,
                    request.requester_name
                );
            }
            println!(
                "page {page}: {} of {} requests",
                requests.len(),
                client.store().total_count()
            );
        }
        Command::Show { id } => {
            let request = client.fetch_request(RequestId(id)).await?;
            println!("{}", serde_json::to_string_pretty(&request)?);
        }
        Command::Create {
            start,
            end,
            leave_type,
            reason,
        } => {
            let created = client.create(start, end, leave_type, &reason).await?;
            println!(
                "created request #{} ({} working days)",
                created.id, created.duration_days
            );
        }
        Command::Edit {
            id,
            start,
            end,
            leave_type,
            reason,
        } => {
            let id = RequestId(id);
            client.fetch_request(id).await?;
            let patch = LeavePatch {
                start_date: start,
                end_date: end,
                leave_type,
                reason,
                ..LeavePatch::default()
            };
            if patch.is_empty() {
                anyhow::bail!("nothing to change; pass --start, --end, --leave-type or --reason");
            }
            let updated = client.edit(id, patch).await?;
            println!("{}", serde_json::to_string_pretty(&updated)?);
        }
        Command::Approve { id, comment } => {
            let id = RequestId(id);
            client.fetch_request(id).await?;
            let approved = client.approve(id, comment.as_deref()).await?;
            println!("request #{} is {}", approved.id, approved.status);
        }
        Command::Reject { id, comment } => {
            let id = RequestId(id);
            client.fetch_request(id).await?;
            let rejected = client.reject(id, &comment).await?;
            println!("request #{} is {}", rejected.id, rejected.status);
        }
        Command::Delete { id } => {
            let id = RequestId(id);
            client.fetch_request(id).await?;
            client.delete(id).await?;
            println!("deleted request #{id}");
        }
        Command::Attach { id, file } => {
            let id = RequestId(id);
            let filename = file
                .file_name()
                .and_then(|name| name.to_str())
                .with_context(|| format!("'{}' has no usable file name", file.display()))?
                .to_string();
            let content =
                fs::read(&file).with_context(|| format!("failed to read '{}'", file.display()))?;
            client.fetch_request(id).await?;
            let updated = client.attach(id, &filename, content).await?;
            println!(
                "attached {} to request #{}",
                updated.attachment_ref.as_deref().unwrap_or(&filename),
                updated.id
            );
        }
        Command::Stats {
            user,
            department,
            year,
        } => {
            let year = year.unwrap_or_else(|| Utc::now().year());
            if let Some(department) = department {
                let stats = client.department_statistics(&department, year).await?;
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                let user_id = UserId(user.unwrap_or(cli.user_id));
                let stats = client.user_statistics(user_id, year).await?;
                println!("{}", serde_json::to_string_pretty(&stats)?);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;

//! Kairos CLI - schedule, inspect and cancel timer jobs

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use colored::Colorize;
use kairos_sdk::{
    ClientConfig, JobRecord, JobStatus, JobsService, JobsServiceClient,
    ProcessInstanceJobDescription, TriggerTime,
};
use std::time::Duration;
use tabled::{Table, Tabled};

const DEFAULT_SCHEDULER_URL: &str = "http://127.0.0.1:8089";
const DEFAULT_SERVICE_URL: &str = "http://127.0.0.1:8080";

#[derive(Parser)]
#[command(name = "kairos")]
#[command(about = "Kairos job scheduler CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Scheduler base URL
    #[arg(long, env = "KAIROS_SCHEDULER_URL", default_value = DEFAULT_SCHEDULER_URL)]
    scheduler_url: String,

    /// Base URL of the service that receives callbacks
    #[arg(long, env = "KAIROS_SERVICE_URL", default_value = DEFAULT_SERVICE_URL)]
    service_url: String,

    /// Request timeout in seconds
    #[arg(long, default_value = "10")]
    timeout: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Schedule a timer on a process instance
    Schedule {
        /// Process definition id
        process_id: String,

        /// Process instance id
        process_instance_id: String,

        /// RFC 3339 instant or ISO-8601 duration (e.g. PT30S)
        #[arg(short, long)]
        at: String,

        /// Job id (generated when omitted)
        #[arg(long)]
        id: Option<String>,

        /// Priority (higher fires first)
        #[arg(short, long, default_value = "0")]
        priority: i32,

        /// Forwarded as `limit` on the callback
        #[arg(short, long)]
        limit: Option<u32>,
    },

    /// Cancel a job
    Cancel {
        /// Job ID
        job_id: String,
    },

    /// Show one job
    Get {
        /// Job ID
        job_id: String,
    },

    /// List jobs
    List {
        /// Comma-separated statuses (e.g. SCHEDULED,RETRYING)
        #[arg(short, long, value_delimiter = ',')]
        status: Vec<JobStatus>,
    },
}

#[derive(Tabled)]
struct JobRow {
    id: String,
    status: String,
    process: String,
    instance: String,
    fires_at: String,
    retries: i32,
    last_error: String,
}

impl From<&JobRecord> for JobRow {
    fn from(record: &JobRecord) -> Self {
        Self {
            id: record.id.clone(),
            status: record.status.to_string(),
            process: record.process_id.clone(),
            instance: record.process_instance_id.clone().unwrap_or_default(),
            fires_at: format_millis(record.fire_at),
            retries: record.retries,
            last_error: record.last_error.clone().unwrap_or_default(),
        }
    }
}

fn format_millis(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|at| at.to_rfc3339())
        .unwrap_or_else(|| millis.to_string())
}

fn trigger_time(at: &str) -> TriggerTime {
    match DateTime::parse_from_rfc3339(at) {
        Ok(instant) => TriggerTime::at_datetime(instant.with_timezone(&Utc)),
        Err(_) => TriggerTime::expression(at),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let client = JobsServiceClient::new(ClientConfig {
        scheduler_url: cli.scheduler_url.clone(),
        service_url: cli.service_url.clone(),
        request_timeout: Duration::from_secs(cli.timeout),
    })
    .context("Invalid client configuration")?;

    match cli.command {
        Commands::Schedule {
            process_id,
            process_instance_id,
            at,
            id,
            priority,
            limit,
        } => {
            let mut description =
                ProcessInstanceJobDescription::new(trigger_time(&at), process_id, process_instance_id)
                    .with_priority(priority);
            if let Some(id) = id {
                description = description.with_id(id);
            }
            if let Some(limit) = limit {
                description = description.with_repeat_limit(limit);
            }

            let job_id = client
                .schedule_process_instance_job(description)
                .await
                .context("Failed to schedule job")?;
            let record = client.get_job(&job_id).await.context("Failed to fetch job")?;

            println!("{}", "✓ Job scheduled successfully".green().bold());
            println!();
            println!("{}", Table::new(vec![JobRow::from(&record)]));
        }

        Commands::Cancel { job_id } => {
            if client.cancel_job(&job_id).await {
                println!("{}", format!("✓ Job {} cancelled", job_id).green().bold());
            } else {
                println!(
                    "{}",
                    format!("✗ Job {} was not cancelled (unknown or unreachable)", job_id).yellow()
                );
            }
        }

        Commands::Get { job_id } => {
            let record = client.get_job(&job_id).await?;
            println!("{}", Table::new(vec![JobRow::from(&record)]));
        }

        Commands::List { status } => {
            let jobs = client.list_jobs(&status).await.context("Failed to list jobs")?;
            if jobs.is_empty() {
                println!("{}", "No jobs".yellow());
            } else {
                let rows: Vec<JobRow> = jobs.iter().map(JobRow::from).collect();
                println!("{}", Table::new(rows));
                println!("{} {}", "Total:".bold(), jobs.len());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_time_parsing() {
        assert_eq!(
            trigger_time("2026-10-14T12:00:00Z"),
            TriggerTime::at(1_791_979_200_000)
        );
        assert_eq!(trigger_time("PT30S"), TriggerTime::expression("PT30S"));
    }

    #[test]
    fn test_list_status_flag() {
        let cli = Cli::try_parse_from(["kairos", "list", "--status", "SCHEDULED,error"]).unwrap();
        match cli.command {
            Commands::List { status } => {
                assert_eq!(status, vec![JobStatus::Scheduled, JobStatus::Error]);
            }
            _ => panic!("expected list"),
        }
    }

    #[test]
    fn test_format_millis() {
        assert_eq!(format_millis(0), "1970-01-01T00:00:00+00:00");
    }
}

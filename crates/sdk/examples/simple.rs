//! Simple SDK Example
//!
//! Schedules a timer on a process instance, reads back when it fires, then
//! cancels it.
//!
//! # Usage
//!
//! 1. Start the scheduler:
//!    ```bash
//!    cargo run --package kairos-daemon
//!    ```
//!
//! 2. Run this example:
//!    ```bash
//!    cargo run --example simple
//!    ```

use kairos_sdk::{
    ClientConfig, JobStatus, JobsService, JobsServiceClient, ProcessInstanceJobDescription,
    TriggerTime,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Kairos SDK - Simple Example");
    println!("===========================\n");

    let client = JobsServiceClient::new(ClientConfig::default())?;

    // 1. Schedule a timer 30 seconds out
    println!("1. Scheduling a timer...");
    let description =
        ProcessInstanceJobDescription::new(TriggerTime::expression("PT30S"), "loan", "pi-1")
            .with_priority(5);
    let id = client.schedule_process_instance_job(description).await?;
    println!("   ✓ Job scheduled: {}\n", id);

    // 2. Read back the resolved fire time
    println!("2. Fetching scheduled time...");
    let at = client.get_scheduled_time(&id).await?;
    println!("   ✓ Fires at {}\n", at.to_rfc3339());

    // 3. List pending jobs
    println!("3. Listing pending jobs...");
    let pending = client
        .list_jobs(&[JobStatus::Scheduled, JobStatus::Retrying])
        .await?;
    for job in &pending {
        println!("   - {} [{}] {}", job.id, job.status, job.process_id);
    }
    println!();

    // 4. Cancel it
    println!("4. Cancelling...");
    if client.cancel_job(&id).await {
        println!("   ✓ Cancelled");
    } else {
        println!("   ✗ Job was already gone");
    }

    Ok(())
}

//! Kairos SDK - Rust Client Library
//!
//! Lets a process engine schedule timer jobs on a remote Kairos scheduler and
//! receive them back on its own `/management/jobs/...` callback endpoint.
//!
//! # Example
//!
//! ```no_run
//! use kairos_sdk::{ClientConfig, JobsService, JobsServiceClient, ProcessInstanceJobDescription, TriggerTime};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = JobsServiceClient::new(ClientConfig {
//!         scheduler_url: "http://127.0.0.1:8089".to_string(),
//!         service_url: "http://127.0.0.1:8080".to_string(),
//!         ..ClientConfig::default()
//!     })?;
//!
//!     let id = client
//!         .schedule_process_instance_job(ProcessInstanceJobDescription::new(
//!             TriggerTime::expression("PT30S"),
//!             "loan",
//!             "pi-1",
//!         ))
//!         .await?;
//!
//!     println!("Timer fires at {}", client.get_scheduled_time(&id).await?);
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod types;

pub use client::{JobsService, JobsServiceClient};
pub use error::{Result, SdkError};
pub use types::{
    ClientConfig, JobRecord, JobStatus, ProcessInstanceJobDescription, ProcessJobDescription,
    TriggerTime,
};

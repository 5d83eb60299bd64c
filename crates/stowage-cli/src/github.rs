//! Job status lookup through the GitHub REST API.

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::fmt;
use tracing::{debug, info, warn};

/// Outcome of the current job as reported by the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Success,
    Failure,
    Cancelled,
    /// Any other reported value, such as `in_progress` or `skipped`.
    Other(String),
    /// The status could not be determined.
    Unknown,
}

impl JobStatus {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "" => JobStatus::Unknown,
            "success" => JobStatus::Success,
            "failure" => JobStatus::Failure,
            "cancelled" => JobStatus::Cancelled,
            other => JobStatus::Other(other.to_string()),
        }
    }

    /// Whether a cache save must be skipped.
    pub fn vetoes_save(&self) -> bool {
        matches!(self, JobStatus::Failure | JobStatus::Cancelled)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Success => write!(f, "success"),
            JobStatus::Failure => write!(f, "failure"),
            JobStatus::Cancelled => write!(f, "cancelled"),
            JobStatus::Other(s) => write!(f, "{}", s),
            JobStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Identifies the running job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobContext {
    pub api_url: String,
    pub owner: String,
    pub repo: String,
    pub run_id: String,
    pub job: String,
    pub token: String,
}

impl JobContext {
    /// Build from runner variables; `None` when any piece is missing.
    pub fn from_env(token: Option<String>) -> Option<Self> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        let token = token
            .filter(|t| !t.trim().is_empty())
            .or_else(|| var("GITHUB_TOKEN"))
            .or_else(|| var("ACTIONS_RUNTIME_TOKEN"))?;
        let (owner, repo) = var("GITHUB_REPOSITORY")?
            .split_once('/')
            .map(|(o, r)| (o.to_string(), r.to_string()))?;

        Some(Self {
            api_url: var("GITHUB_API_URL")?,
            owner,
            repo,
            run_id: var("GITHUB_RUN_ID")?,
            job: var("GITHUB_JOB")?,
            token,
        })
    }

    pub fn jobs_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/actions/runs/{}/jobs",
            self.api_url.trim_end_matches('/'),
            self.owner,
            self.repo,
            self.run_id
        )
    }
}

#[derive(Debug, Deserialize)]
struct JobsResponse {
    #[serde(default)]
    jobs: Vec<Job>,
}

#[derive(Debug, Deserialize)]
struct Job {
    name: String,
    status: Option<String>,
    conclusion: Option<String>,
}

pub struct JobStatusClient {
    client: Client,
}

impl Default for JobStatusClient {
    fn default() -> Self {
        Self::new()
    }
}

impl JobStatusClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Status of the job in `context`. Every failure maps to [`JobStatus::Unknown`].
    pub async fn job_status(&self, context: &JobContext) -> JobStatus {
        let url = context.jobs_url();
        debug!(url = %url, "Querying job status");

        let res = match self
            .client
            .get(&url)
            .bearer_auth(&context.token)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "stowage")
            .send()
            .await
        {
            Ok(res) => res,
            Err(e) => {
                warn!("Error querying job status: {}", e);
                return JobStatus::Unknown;
            }
        };

        if res.status() != StatusCode::OK {
            warn!("Failed to query job status: {}", res.status());
            return JobStatus::Unknown;
        }

        let body: JobsResponse = match res.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Unreadable job status response: {}", e);
                return JobStatus::Unknown;
            }
        };

        match body.jobs.into_iter().find(|job| job.name == context.job) {
            Some(job) => {
                let status = job
                    .conclusion
                    .filter(|c| !c.is_empty())
                    .or(job.status)
                    .map(|s| JobStatus::parse(&s))
                    .unwrap_or(JobStatus::Unknown);
                info!(status = %status, "Current job status: {}", status);
                status
            }
            None => {
                warn!("Could not find job '{}' in the run", context.job);
                JobStatus::Unknown
            }
        }
    }
}

// ⏰ Scheduler - recurring pipeline runs from a hot-reloaded jobs file
// Hourly jobs repeat from registration; Daily and Weekly (Mondays) run at HH:MM local time

use anyhow::{bail, Context, Result};
use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

/// Seconds between jobs-file checks
pub const POLL_INTERVAL_SECS: u64 = 10;

/// Document limit used by scheduled runs
pub const SCHEDULED_DOC_LIMIT: usize = 5;

/// Run time given to new jobs when none is specified
pub const DEFAULT_JOB_TIME: &str = "09:00";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobInterval {
    Hourly,
    Daily,
    Weekly,
}

impl fmt::Display for JobInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            JobInterval::Hourly => "Hourly",
            JobInterval::Daily => "Daily",
            JobInterval::Weekly => "Weekly",
        })
    }
}

impl FromStr for JobInterval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hourly" => Ok(JobInterval::Hourly),
            "daily" => Ok(JobInterval::Daily),
            "weekly" => Ok(JobInterval::Weekly),
            other => Err(format!("unknown interval '{}' (hourly, daily, weekly)", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerJob {
    pub id: serde_json::Value,
    pub interval: JobInterval,
    /// "HH:MM"; ignored for hourly jobs
    #[serde(default)]
    pub time: Option<String>,
    /// "YYYY-MM-DD HH:MM" local time the job was added
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl SchedulerJob {
    pub fn label(&self) -> String {
        match &self.id {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    fn run_time(&self) -> Option<NaiveTime> {
        self.time
            .as_deref()
            .and_then(|t| NaiveTime::parse_from_str(t.trim(), "%H:%M").ok())
    }
}

/// Load the jobs file. Missing or malformed files mean no jobs;
/// entries with an unknown interval are skipped.
pub fn load_jobs(path: &Path) -> Vec<SchedulerJob> {
    let Ok(content) = fs::read_to_string(path) else {
        return Vec::new();
    };

    let entries: Vec<serde_json::Value> = match serde_json::from_str(&content) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(path = ?path, error = %e, "jobs file is malformed, no jobs scheduled");
            return Vec::new();
        }
    };

    entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<SchedulerJob>(entry) {
            Ok(job) => Some(job),
            Err(e) => {
                warn!(error = %e, "skipping unreadable job");
                None
            }
        })
        .collect()
}

pub fn save_jobs(path: &Path, jobs: &[SchedulerJob]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }
    }
    let json = serde_json::to_string_pretty(jobs).context("Failed to encode scheduler jobs")?;
    fs::write(path, json).with_context(|| format!("Failed to write jobs file: {:?}", path))
}

/// Append a job to the jobs file and return it.
///
/// The id is the creation time in epoch milliseconds, bumped past any id
/// already in the file. Unreadable entries are not carried over.
pub fn add_job(
    path: &Path,
    interval: JobInterval,
    time: Option<&str>,
    now: NaiveDateTime,
) -> Result<SchedulerJob> {
    let time = time.unwrap_or(DEFAULT_JOB_TIME).trim();
    let Ok(parsed) = NaiveTime::parse_from_str(time, "%H:%M") else {
        bail!("Invalid job time '{}', expected HH:MM", time);
    };

    let mut jobs = load_jobs(path);
    let mut id = now.and_utc().timestamp_millis();
    while jobs.iter().any(|job| job.label() == id.to_string()) {
        id += 1;
    }

    let job = SchedulerJob {
        id: serde_json::Value::String(id.to_string()),
        interval,
        time: Some(parsed.format("%H:%M").to_string()),
        created_at: Some(now.format("%Y-%m-%d %H:%M").to_string()),
    };
    jobs.push(job.clone());
    save_jobs(path, &jobs)?;
    info!(job = %job.label(), interval = %interval, "added scheduler job");
    Ok(job)
}

/// Remove the job with this id; returns whether one was removed
pub fn remove_job(path: &Path, id: &str) -> Result<bool> {
    let mut jobs = load_jobs(path);
    let before = jobs.len();
    jobs.retain(|job| job.label() != id);
    if jobs.len() == before {
        return Ok(false);
    }
    save_jobs(path, &jobs)?;
    info!(job = id, "removed scheduler job");
    Ok(true)
}

/// Next instant strictly after `after` at which the job is due.
/// `None` for Daily/Weekly jobs without a valid "HH:MM" time.
pub fn next_run(job: &SchedulerJob, after: NaiveDateTime) -> Option<NaiveDateTime> {
    match job.interval {
        JobInterval::Hourly => Some(after + Duration::hours(1)),
        JobInterval::Daily => {
            let at = job.run_time()?;
            let today = after.date().and_time(at);
            Some(if today > after { today } else { today + Duration::days(1) })
        }
        JobInterval::Weekly => {
            let at = job.run_time()?;
            let days_ahead = (7 + Weekday::Mon.num_days_from_monday() as i64
                - after.weekday().num_days_from_monday() as i64)
                % 7;
            let candidate = (after.date() + Duration::days(days_ahead)).and_time(at);
            Some(if candidate > after { candidate } else { candidate + Duration::weeks(1) })
        }
    }
}

#[derive(Debug, Clone)]
struct ScheduledJob {
    job: SchedulerJob,
    next_run: NaiveDateTime,
}

/// Registered jobs and their next due instants
#[derive(Debug, Default)]
pub struct Scheduler {
    jobs: Vec<ScheduledJob>,
    loaded: Option<Vec<SchedulerJob>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-register when the job list differs from the last one seen; returns whether it did
    pub fn reload(&mut self, jobs: Vec<SchedulerJob>, now: NaiveDateTime) -> bool {
        if self.loaded.as_ref() == Some(&jobs) {
            return false;
        }

        info!(jobs = jobs.len(), "configuration changed, reloading jobs");
        self.jobs = jobs
            .iter()
            .filter_map(|job| match next_run(job, now) {
                Some(next_run) => {
                    info!(job = %job.label(), interval = ?job.interval, next = %next_run, "registered job");
                    Some(ScheduledJob {
                        job: job.clone(),
                        next_run,
                    })
                }
                None => {
                    warn!(job = %job.label(), time = ?job.time, "job has no valid HH:MM time, not registered");
                    None
                }
            })
            .collect();

        if self.jobs.is_empty() {
            info!("no active jobs, scheduler idle");
        }
        self.loaded = Some(jobs);
        true
    }

    /// Jobs due at `now`; each is rescheduled past `now`
    pub fn take_due(&mut self, now: NaiveDateTime) -> Vec<SchedulerJob> {
        let mut due = Vec::new();
        for scheduled in &mut self.jobs {
            if scheduled.next_run <= now {
                due.push(scheduled.job.clone());
                if let Some(next) = next_run(&scheduled.job, now) {
                    scheduled.next_run = next;
                }
            }
        }
        due
    }

    pub fn upcoming(&self) -> Vec<(String, NaiveDateTime)> {
        self.jobs
            .iter()
            .map(|s| (s.job.label(), s.next_run))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn job(interval: JobInterval, time: Option<&str>) -> SchedulerJob {
        SchedulerJob {
            id: serde_json::json!("job-1"),
            interval,
            time: time.map(str::to_string),
            created_at: None,
        }
    }

    #[test]
    fn test_next_run_hourly() {
        let now = at(2024, 5, 1, 9, 30);
        assert_eq!(next_run(&job(JobInterval::Hourly, None), now), Some(at(2024, 5, 1, 10, 30)));
    }

    #[test]
    fn test_next_run_daily() {
        let daily = job(JobInterval::Daily, Some("08:15"));
        assert_eq!(next_run(&daily, at(2024, 5, 1, 7, 0)), Some(at(2024, 5, 1, 8, 15)));
        assert_eq!(next_run(&daily, at(2024, 5, 1, 8, 15)), Some(at(2024, 5, 2, 8, 15)));
        assert_eq!(next_run(&daily, at(2024, 12, 31, 23, 0)), Some(at(2025, 1, 1, 8, 15)));
    }

    #[test]
    fn test_next_run_weekly_is_monday() {
        let weekly = job(JobInterval::Weekly, Some("06:00"));
        // 2024-05-01 is a Wednesday
        assert_eq!(next_run(&weekly, at(2024, 5, 1, 12, 0)), Some(at(2024, 5, 6, 6, 0)));
        // Monday before and after the run time
        assert_eq!(next_run(&weekly, at(2024, 5, 6, 5, 0)), Some(at(2024, 5, 6, 6, 0)));
        assert_eq!(next_run(&weekly, at(2024, 5, 6, 7, 0)), Some(at(2024, 5, 13, 6, 0)));
    }

    #[test]
    fn test_next_run_requires_time() {
        assert_eq!(next_run(&job(JobInterval::Daily, None), at(2024, 5, 1, 0, 0)), None);
        assert_eq!(next_run(&job(JobInterval::Weekly, Some("25:99")), at(2024, 5, 1, 0, 0)), None);
    }

    #[test]
    fn test_load_jobs_tolerates_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scheduler_jobs.json");

        assert!(load_jobs(&path).is_empty());

        fs::write(&path, "not json").unwrap();
        assert!(load_jobs(&path).is_empty());

        fs::write(
            &path,
            r#"[{"id": 1, "interval": "Daily", "time": "09:00"},
                {"id": "x", "interval": "Monthly", "time": "09:00"},
                {"id": "h", "interval": "Hourly"}]"#,
        )
        .unwrap();
        let jobs = load_jobs(&path);
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].label(), "1");
        assert_eq!(jobs[1].interval, JobInterval::Hourly);
    }

    #[test]
    fn test_scheduler_reload_and_due() {
        let mut scheduler = Scheduler::new();
        let start = at(2024, 5, 1, 8, 0);
        let jobs = vec![job(JobInterval::Daily, Some("09:00")), job(JobInterval::Daily, None)];

        assert!(scheduler.reload(jobs.clone(), start));
        assert_eq!(scheduler.len(), 1);
        assert!(!scheduler.reload(jobs, start));

        assert!(scheduler.take_due(at(2024, 5, 1, 8, 59)).is_empty());
        let due = scheduler.take_due(at(2024, 5, 1, 9, 0));
        assert_eq!(due.len(), 1);
        assert_eq!(scheduler.upcoming()[0].1, at(2024, 5, 2, 9, 0));

        assert!(scheduler.reload(Vec::new(), start));
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_interval_from_str() {
        assert_eq!("daily".parse::<JobInterval>(), Ok(JobInterval::Daily));
        assert_eq!(" Weekly ".parse::<JobInterval>(), Ok(JobInterval::Weekly));
        assert!("monthly".parse::<JobInterval>().is_err());
        assert_eq!(JobInterval::Hourly.to_string(), "Hourly");
    }

    #[test]
    fn test_add_list_remove_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config").join("scheduler_jobs.json");
        let now = at(2024, 5, 1, 8, 30);

        let daily = add_job(&path, JobInterval::Daily, Some("7:05"), now).unwrap();
        assert_eq!(daily.time.as_deref(), Some("07:05"));
        assert_eq!(daily.created_at.as_deref(), Some("2024-05-01 08:30"));

        // Same instant still yields a distinct id
        let hourly = add_job(&path, JobInterval::Hourly, None, now).unwrap();
        assert_ne!(hourly.label(), daily.label());
        assert_eq!(hourly.time.as_deref(), Some(DEFAULT_JOB_TIME));

        let jobs = load_jobs(&path);
        assert_eq!(jobs, vec![daily.clone(), hourly.clone()]);

        assert!(remove_job(&path, &daily.label()).unwrap());
        assert!(!remove_job(&path, "missing").unwrap());
        assert_eq!(load_jobs(&path), vec![hourly]);
    }

    #[test]
    fn test_add_job_rejects_bad_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scheduler_jobs.json");
        assert!(add_job(&path, JobInterval::Daily, Some("25:99"), at(2024, 5, 1, 0, 0)).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_saved_jobs_keep_file_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scheduler_jobs.json");
        fs::write(&path, r#"[{"id": 7, "interval": "Weekly", "time": "06:00"}]"#).unwrap();

        add_job(&path, JobInterval::Daily, Some("09:00"), at(2024, 5, 1, 0, 0)).unwrap();
        let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw[0]["id"], serde_json::json!(7));
        assert!(raw[0].get("created_at").is_none());
        assert_eq!(raw[1]["interval"], "Daily");
        assert_eq!(raw[1]["created_at"], "2024-05-01 00:00");
    }
}

use std::time::Duration;

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Tasks executed at the same time.
    pub concurrency: usize,
    pub limits: TimeLimits,
    /// Tasks claimed before the process exits to be restarted.
    pub max_tasks_per_child: u32,
    pub poll_interval: Duration,
    /// Claims older than this are handed back to the queue.
    pub visibility_timeout: Duration,
}

/// Wall-clock budget of a single task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeLimits {
    /// After this the batch is asked to stop before its next frame.
    pub soft: Duration,
    /// After this the task is aborted and recorded failed.
    pub hard: Duration,
}

impl Default for TimeLimits {
    fn default() -> Self {
        Self {
            soft: Duration::from_secs(240),
            hard: Duration::from_secs(300),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 2,
            limits: TimeLimits::default(),
            max_tasks_per_child: 50,
            poll_interval: Duration::from_millis(1000),
            visibility_timeout: Duration::from_secs(600),
        }
    }
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default |
    /// |--------------------------------|---------|
    /// | `WORKER_CONCURRENCY`           | `2`     |
    /// | `TASK_TIME_LIMIT_SECS`         | `300`   |
    /// | `TASK_SOFT_TIME_LIMIT_SECS`    | `240`   |
    /// | `WORKER_MAX_TASKS_PER_CHILD`   | `50`    |
    /// | `WORKER_POLL_INTERVAL_MS`      | `1000`  |
    /// | `TASK_VISIBILITY_TIMEOUT_SECS` | `600`   |
    ///
    /// Panics on unparseable values or a soft limit above the hard limit.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let concurrency: usize = env_parse("WORKER_CONCURRENCY", defaults.concurrency);
        let hard = env_parse("TASK_TIME_LIMIT_SECS", defaults.limits.hard.as_secs());
        let soft = env_parse("TASK_SOFT_TIME_LIMIT_SECS", defaults.limits.soft.as_secs());
        assert!(
            soft <= hard,
            "TASK_SOFT_TIME_LIMIT_SECS ({soft}) must not exceed TASK_TIME_LIMIT_SECS ({hard})"
        );

        Self {
            concurrency: concurrency.max(1),
            limits: TimeLimits {
                soft: Duration::from_secs(soft),
                hard: Duration::from_secs(hard),
            },
            max_tasks_per_child: env_parse("WORKER_MAX_TASKS_PER_CHILD", defaults.max_tasks_per_child),
            poll_interval: Duration::from_millis(env_parse(
                "WORKER_POLL_INTERVAL_MS",
                defaults.poll_interval.as_millis() as u64,
            )),
            visibility_timeout: Duration::from_secs(env_parse(
                "TASK_VISIBILITY_TIMEOUT_SECS",
                defaults.visibility_timeout.as_secs(),
            )),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(v) => v
            .parse()
            .unwrap_or_else(|_| panic!("{name} must be a valid number, got {v:?}")),
        Err(_) => default,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

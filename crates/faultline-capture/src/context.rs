//! Default context provider
//!
//! Gathers non-identifying information about the running process and the
//! machine. Never includes hostname or username.
//!
//! Static contexts: `device`, `os`, `app`, `culture`, `environment`.
//! Dynamic contexts: `performance` and the free memory part of `device`.

use std::{
    path::Path,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Instant,
};

use chrono::{Local, Utc};
use faultline_core::{
    config::Config,
    domain::ContextMap,
    ports::{ContextProvider, Contexts},
};
use serde_json::{json, Value};
use tracing::warn;
use uuid::Uuid;

/// Context provider backed by the standard library and `/proc`.
pub struct SystemContextProvider {
    app_name: String,
    app_version: String,
    started_at: chrono::DateTime<Utc>,
    started: Instant,
    device_id: String,
    frames: Option<Arc<AtomicU64>>,
}

impl SystemContextProvider {
    /// Creates a provider; the device id is persisted under `data_dir`.
    pub fn new(config: &Config, data_dir: Option<&Path>) -> Self {
        let device_id = match data_dir {
            Some(dir) => load_or_create_device_id(&dir.join("device_id")).unwrap_or_else(|e| {
                warn!(error = %e, "Could not persist device id; using a session id");
                Uuid::new_v4().simple().to_string()
            }),
            None => Uuid::new_v4().simple().to_string(),
        };
        Self {
            app_name: config.app.name.clone(),
            app_version: config.app.version.clone(),
            started_at: Utc::now(),
            started: Instant::now(),
            device_id,
            frames: None,
        }
    }

    /// Reports the number of frames ticked in the `performance` context.
    pub fn with_frame_counter(mut self, frames: Arc<AtomicU64>) -> Self {
        self.frames = Some(frames);
        self
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }
}

impl ContextProvider for SystemContextProvider {
    fn static_contexts(&self) -> Contexts {
        let mut contexts = Contexts::new();

        contexts.insert(
            "device".into(),
            object(json!({
                "arch": std::env::consts::ARCH,
                "processor_count": std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
                "memory_size": read_meminfo_bytes("MemTotal"),
                "device_unique_identifier": self.device_id,
            })),
        );
        contexts.insert(
            "os".into(),
            object(json!({
                "name": std::env::consts::OS,
                "kernel_version": read_kernel_version(),
            })),
        );
        contexts.insert(
            "app".into(),
            object(json!({
                "app_name": self.app_name,
                "app_version": self.app_version,
                "app_start_time": self.started_at.to_rfc3339(),
                "app_arch": std::env::consts::ARCH,
            })),
        );
        contexts.insert(
            "culture".into(),
            object(json!({
                "locale": locale(),
                "timezone": Local::now().format("%:z").to_string(),
            })),
        );
        contexts.insert(
            "environment".into(),
            object(json!({
                "debug_build": cfg!(debug_assertions),
            })),
        );

        contexts
    }

    fn dynamic_contexts(&self) -> Contexts {
        let mut contexts = Contexts::new();

        let mut performance = object(json!({
            "uptime_ms": self.started.elapsed().as_millis() as u64,
        }));
        if let Some(frames) = &self.frames {
            performance.insert("frames".into(), Value::from(frames.load(Ordering::Relaxed)));
        }
        contexts.insert("performance".into(), performance);

        if let Some(free) = read_meminfo_bytes("MemAvailable") {
            contexts.insert("device".into(), object(json!({ "free_memory": free })));
        }

        contexts
    }
}

fn object(value: Value) -> ContextMap {
    match value {
        Value::Object(map) => map,
        _ => ContextMap::new(),
    }
}

fn locale() -> String {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|v| !v.is_empty())
        .map(|v| v.split('.').next().unwrap_or_default().to_string())
        .unwrap_or_default()
}

fn read_kernel_version() -> String {
    std::fs::read_to_string("/proc/version")
        .ok()
        .and_then(|v| v.split_whitespace().nth(2).map(String::from))
        .unwrap_or_default()
}

/// Reads a `/proc/meminfo` field (reported in KiB) as bytes.
fn read_meminfo_bytes(field: &str) -> Option<u64> {
    let content = std::fs::read_to_string("/proc/meminfo").ok()?;
    parse_meminfo(&content, field)
}

fn parse_meminfo(content: &str, field: &str) -> Option<u64> {
    content.lines().find_map(|line| {
        let rest = line.strip_prefix(field)?.strip_prefix(':')?;
        let kib: u64 = rest.split_whitespace().next()?.parse().ok()?;
        Some(kib * 1024)
    })
}

/// Reads the device id stored at `path`, creating it on first use.
pub fn load_or_create_device_id(path: &Path) -> anyhow::Result<String> {
    if let Ok(existing) = std::fs::read_to_string(path) {
        let existing = existing.trim();
        if !existing.is_empty() {
            return Ok(existing.to_string());
        }
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let id = Uuid::new_v4().simple().to_string();
    std::fs::write(path, &id)?;
    Ok(id)
}

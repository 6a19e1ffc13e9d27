//! Replay command - Feed recorded signals through the capture pipeline
//!
//! Reads a JSON Lines file where every line is one record:
//!
//! ```text
//! {"type": "error", "signal": {"function": "_ready", "file": "res://main.gd", "line": 3, "code": "x", "error_type": "script"}}
//! {"type": "message", "message": "Level loaded", "is_error": false}
//! {"type": "tick"}
//! ```
//!
//! Envelopes go to the configured outbox, or stay in memory with `--dry-run`.

use std::{collections::BTreeMap, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Args;
use faultline_capture::{metrics::CaptureMetrics, Pipeline};
use faultline_core::{config::Config, domain::ErrorSignal, ports::Transport};
use faultline_sinks::{select_sink, MemoryTransport, OutboxTransport, Platform};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::output::{get_formatter, OutputFormat, Table};

#[derive(Debug, Args)]
pub struct ReplayCommand {
    /// JSON Lines file of recorded signals
    pub file: PathBuf,

    /// Keep envelopes in memory instead of writing them to the outbox
    #[arg(long)]
    pub dry_run: bool,

    /// Sink platform: native, mobile, web or unsupported
    #[arg(long, default_value = "native")]
    pub platform: Platform,

    /// Start a new frame after every N records (0 = only on tick records)
    #[arg(long, default_value = "0")]
    pub frame_every: u32,

    /// Print the pipeline metrics after the replay
    #[arg(long)]
    pub metrics: bool,
}

/// One line of a replay file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplayRecord {
    Error {
        signal: ErrorSignal,
    },
    Message {
        message: String,
        #[serde(default)]
        is_error: bool,
    },
    Tick,
}

/// Counts reported after a replay.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReplaySummary {
    pub records: usize,
    pub frames: u64,
    pub captures: BTreeMap<String, u64>,
    pub drops: BTreeMap<String, u64>,
    pub discards: BTreeMap<String, u64>,
    pub dispatch_failures: BTreeMap<String, u64>,
    pub last_event_id: Option<String>,
}

impl ReplaySummary {
    fn from_pipeline(pipeline: &Pipeline, records: usize) -> Self {
        let metrics = pipeline.metrics();
        let last = pipeline.last_event_id();
        Self {
            records,
            frames: pipeline.frame(),
            captures: CaptureMetrics::by_label(&metrics.captures_total),
            drops: CaptureMetrics::by_label(&metrics.drops_total),
            discards: CaptureMetrics::by_label(&metrics.discards_total),
            dispatch_failures: CaptureMetrics::by_label(&metrics.dispatch_failures_total),
            last_event_id: (!last.is_nil()).then(|| last.to_string()),
        }
    }

    pub fn captured(&self, form: &str) -> u64 {
        self.captures.get(form).copied().unwrap_or(0)
    }

    /// Non-zero counters, one row per outcome and label.
    pub fn counters_table(&self) -> Table {
        let mut table = Table::new(["Outcome", "Label", "Count"]).align_right(2);
        let groups = [
            ("captured", &self.captures),
            ("dropped", &self.drops),
            ("discarded", &self.discards),
            ("undelivered", &self.dispatch_failures),
        ];
        for (outcome, counts) in groups {
            for (label, count) in counts.iter().filter(|&(_, &count)| count > 0) {
                table.row([outcome.to_string(), label.clone(), count.to_string()]);
            }
        }
        table
    }
}

/// Parses a replay file. Blank lines and lines starting with `#` are skipped.
pub fn parse_records(content: &str) -> Result<Vec<ReplayRecord>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(i, line)| {
            serde_json::from_str(line).with_context(|| format!("Invalid record on line {}", i + 1))
        })
        .collect()
}

/// Pipeline in front of the sink for `platform`, with the sink initialized
/// and the host marked ready.
pub fn build_pipeline(
    config: Config,
    platform: Platform,
    transport: Arc<dyn Transport>,
) -> Result<Pipeline> {
    let sink = Arc::new(select_sink(platform, Some(transport)));
    let pipeline = Pipeline::new(config, sink).context("Failed to build pipeline")?;
    start(&pipeline)?;
    Ok(pipeline)
}

fn start(pipeline: &Pipeline) -> Result<()> {
    pipeline.init_sink().context("Failed to initialize sink")?;
    pipeline.mark_ready();
    Ok(())
}

/// Feeds `records` to `pipeline`, then closes it.
///
/// Returns the summary together with the pipeline's metrics text.
pub fn run_replay(
    pipeline: &Pipeline,
    records: &[ReplayRecord],
    frame_every: u32,
) -> Result<(ReplaySummary, String)> {
    for (i, record) in records.iter().enumerate() {
        match record {
            ReplayRecord::Error { signal } => pipeline.on_error(signal),
            ReplayRecord::Message { message, is_error } => {
                pipeline.on_log_message(message, *is_error)
            }
            ReplayRecord::Tick => pipeline.tick_frame(),
        }
        if frame_every > 0 && (i as u32 + 1) % frame_every == 0 {
            pipeline.tick_frame();
        }
    }

    let summary = ReplaySummary::from_pipeline(pipeline, records.len());
    let metrics = pipeline.metrics().encode()?;
    pipeline.close();
    debug!(?summary, "Replay finished");
    Ok((summary, metrics))
}

impl ReplayCommand {
    pub async fn execute(&self, config: Config, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);

        let content = std::fs::read_to_string(&self.file)
            .with_context(|| format!("Failed to read {}", self.file.display()))?;
        let records = parse_records(&content)?;
        info!(file = %self.file.display(), records = records.len(), platform = %self.platform, "Replaying signals");

        let outbox_dir = config.outbox.dir.clone();
        let transport: Arc<dyn Transport> = if self.dry_run {
            Arc::new(MemoryTransport::new())
        } else {
            Arc::new(OutboxTransport::new(&outbox_dir))
        };

        let pipeline = build_pipeline(config, self.platform, transport)?;
        let (summary, metrics) = run_replay(&pipeline, &records, self.frame_every)?;

        if format.is_json() {
            let mut json = serde_json::to_value(&summary)?;
            if !self.dry_run {
                json["outbox"] = serde_json::json!(outbox_dir.display().to_string());
            }
            formatter.print_json(&json);
        } else {
            formatter.success(&format!(
                "Replayed {} record(s) over {} frame(s)",
                summary.records, summary.frames
            ));
            let counters = summary.counters_table();
            if !counters.is_empty() {
                formatter.table(&counters);
            }
            for (form, count) in &summary.dispatch_failures {
                formatter.warn(&format!("{count} {form}(s) could not be delivered"));
            }
            if self.dry_run {
                formatter.info("Dry run: nothing was written");
            } else {
                formatter.info(&format!("Envelopes written to {}", outbox_dir.display()));
            }
        }

        if self.metrics {
            print!("{metrics}");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use faultline_core::{config::ConfigBuilder, domain::ErrorType};

    use super::*;

    const DSN: &str = "https://public@errors.example.com/42";

    fn pipeline(config: Config, platform: Platform, transport: Arc<MemoryTransport>) -> Pipeline {
        let sink = Arc::new(select_sink(platform, Some(transport)));
        let pipeline = Pipeline::builder(config, sink)
            .without_system_context()
            .build()
            .unwrap();
        start(&pipeline).unwrap();
        pipeline
    }

    fn error(line: u32) -> ReplayRecord {
        ReplayRecord::Error {
            signal: ErrorSignal::new("_process", "res://main.gd", line, "bad index", ErrorType::Script),
        }
    }

    #[test]
    fn test_parse_records() {
        let content = r#"
# recorded session
{"type": "error", "signal": {"function": "_ready", "file": "res://main.gd", "line": 3, "code": "x", "error_type": "script"}}
{"type": "message", "message": "Level loaded"}

{"type": "tick"}
"#;
        let records = parse_records(content).unwrap();
        assert_eq!(records.len(), 3);
        assert!(matches!(&records[0], ReplayRecord::Error { signal } if signal.line == 3));
        assert_eq!(
            records[1],
            ReplayRecord::Message {
                message: "Level loaded".into(),
                is_error: false
            }
        );
        assert_eq!(records[2], ReplayRecord::Tick);
    }

    #[test]
    fn test_parse_reports_line_number() {
        let err = parse_records("{\"type\": \"tick\"}\n{oops}").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_replay_applies_frame_budget() {
        let config = ConfigBuilder::new().dsn(DSN).events_per_frame(2).build();
        let transport = Arc::new(MemoryTransport::new());
        let records = vec![error(1), error(2), error(3), ReplayRecord::Tick, error(4)];

        let p = pipeline(config, Platform::Native, transport.clone());
        let (summary, metrics) = run_replay(&p, &records, 0).unwrap();

        assert_eq!(summary.records, 5);
        assert_eq!(summary.frames, 1);
        assert_eq!(summary.captured("event"), 3);
        assert_eq!(summary.captured("breadcrumb"), 4);
        assert_eq!(transport.events().len(), 3);
        assert!(summary.last_event_id.is_some());
        assert!(metrics.contains("faultline_captures_total"));
        assert!(transport.is_closed());
    }

    #[test]
    fn test_replay_frame_every() {
        let config = ConfigBuilder::new().dsn(DSN).events_per_frame(1).build();
        let transport = Arc::new(MemoryTransport::new());
        let records = vec![error(1), error(2), error(3)];

        let p = pipeline(config, Platform::Native, transport);
        let (summary, _) = run_replay(&p, &records, 1).unwrap();
        assert_eq!(summary.frames, 3);
        assert_eq!(summary.captured("event"), 3);
    }

    #[test]
    fn test_replay_on_unsupported_platform_drops_events() {
        let config = ConfigBuilder::new().dsn(DSN).build();
        let transport = Arc::new(MemoryTransport::new());

        let p = pipeline(config, Platform::Unsupported, transport.clone());
        let (summary, _) = run_replay(&p, &[error(1)], 0).unwrap();
        assert_eq!(summary.captured("event"), 0);
        assert_eq!(summary.drops["sink_disabled"], 1);
        assert!(transport.is_empty());
    }

    #[test]
    fn test_counters_table_lists_non_zero_counts() {
        let mut summary = ReplaySummary::default();
        summary.captures.insert("event".into(), 3);
        summary.captures.insert("log".into(), 0);
        summary.drops.insert("recursion".into(), 1);

        assert_eq!(
            summary.counters_table().to_json(),
            serde_json::json!([
                {"outcome": "captured", "label": "event", "count": "3"},
                {"outcome": "dropped", "label": "recursion", "count": "1"},
            ])
        );
        assert!(ReplaySummary::default().counters_table().is_empty());
    }
}

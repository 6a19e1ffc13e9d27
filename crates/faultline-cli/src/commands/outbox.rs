//! Outbox command - Inspect envelopes written by the outbox transport
//!
//! Provides the `faultline outbox` CLI command with subcommands:
//! - `list`: Show all stored envelopes
//! - `view <id>`: Display one envelope
//! - `delete`: Remove envelopes from the outbox

use std::path::PathBuf;

use anyhow::Result;
use clap::Subcommand;
use faultline_core::{config::Config, ports::EnvelopeItem};
use faultline_sinks::{OutboxEntry, OutboxTransport};

use crate::output::{get_formatter, OutputFormat, Table};

#[derive(Debug, Subcommand)]
pub enum OutboxCommand {
    /// List stored envelopes, newest first
    List {
        /// Outbox directory (defaults to the configured one)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// View a stored envelope
    View {
        /// Envelope id or id prefix
        id: String,
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Delete envelopes from the outbox
    Delete {
        /// Envelope id or id prefix
        id: Option<String>,
        /// Delete all envelopes
        #[arg(long)]
        all: bool,
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

impl OutboxCommand {
    fn outbox(&self, config: &Config) -> OutboxTransport {
        let dir = match self {
            OutboxCommand::List { dir } | OutboxCommand::View { dir, .. } => dir,
            OutboxCommand::Delete { dir, .. } => dir,
        };
        OutboxTransport::new(dir.clone().unwrap_or_else(|| config.outbox.dir.clone()))
    }

    pub async fn execute(&self, config: &Config, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let outbox = self.outbox(config);

        match self {
            OutboxCommand::List { .. } => {
                let entries = outbox.list()?;
                if format.is_json() {
                    let json: Vec<serde_json::Value> = entries
                        .iter()
                        .map(|e| {
                            serde_json::json!({
                                "id": e.id,
                                "kind": e.kind,
                                "date": e.date,
                                "size_bytes": e.size_bytes,
                            })
                        })
                        .collect();
                    formatter.print_json(&serde_json::json!(json));
                    return Ok(());
                }

                if entries.is_empty() {
                    formatter.info(&format!("No envelopes in {}", outbox.dir().display()));
                    return Ok(());
                }

                formatter.table(&entries_table(&entries));
                println!();
                println!("Total: {} envelope(s)", entries.len());
            }

            OutboxCommand::View { id, .. } => match outbox.read(id)? {
                Some(envelope) => {
                    if format.is_json() {
                        formatter.print_json(&serde_json::to_value(&envelope)?);
                        return Ok(());
                    }
                    println!("id: {}", envelope.id());
                    println!("sink: {}", envelope.header.sink);
                    println!("sent_at: {}", envelope.header.sent_at.to_rfc3339());
                    match &envelope.item {
                        EnvelopeItem::Event {
                            event,
                            breadcrumbs,
                            attachments,
                            ..
                        } => {
                            println!("level: {}", event.level.as_str());
                            if let Some(message) = &event.message {
                                println!("message: {}", message);
                            }
                            for exception in &event.exceptions {
                                println!("exception: {}: {}", exception.kind, exception.value);
                                for frame in &exception.frames {
                                    println!(
                                        "  at {} ({}:{})",
                                        frame.function, frame.filename, frame.lineno
                                    );
                                }
                            }
                            for (key, value) in &event.tags {
                                println!("tag {}: {}", key, value);
                            }
                            println!("breadcrumbs: {}", breadcrumbs.len());
                            for attachment in attachments {
                                println!("attachment: {}", attachment.filename);
                            }
                        }
                        EnvelopeItem::Log { record } => {
                            println!("level: {}", record.level.as_str());
                            println!("body: {}", record.body);
                            for (key, value) in &record.attributes {
                                println!("{}: {}", key, value);
                            }
                        }
                    }
                }
                None => formatter.error(&format!("Envelope '{}' not found", id)),
            },

            OutboxCommand::Delete { id, all, .. } => {
                if *all {
                    let count = outbox.delete_all()?;
                    formatter.success(&format!("Deleted {} envelope(s)", count));
                } else if let Some(id) = id {
                    if outbox.delete(id)? {
                        formatter.success(&format!("Deleted envelope '{}'", id));
                    } else {
                        formatter.error(&format!("Envelope '{}' not found", id));
                    }
                } else {
                    formatter.error("Specify an envelope id or use --all");
                }
            }
        }

        Ok(())
    }
}

fn entries_table(entries: &[OutboxEntry]) -> Table {
    let mut table = Table::new(["ID", "Kind", "Date", "Size"]).align_right(3);
    for entry in entries {
        table.row([
            entry.id.clone(),
            entry.kind.clone(),
            entry.date.clone(),
            format_size(entry.size_bytes),
        ]);
    }
    table
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn test_entries_table() {
        let entries = vec![OutboxEntry {
            id: "0123456789abcdef0123456789abcdef".into(),
            kind: "event".into(),
            date: "20261016120000".into(),
            size_bytes: 2048,
            path: PathBuf::from("/tmp/outbox/event.json"),
        }];

        let table = entries_table(&entries);
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.to_json(),
            serde_json::json!([{
                "id": "0123456789abcdef0123456789abcdef",
                "kind": "event",
                "date": "20261016120000",
                "size": "2.0 KB",
            }])
        );
    }

    #[test]
    fn test_explicit_dir_overrides_config() {
        let cmd = OutboxCommand::List {
            dir: Some(PathBuf::from("/tmp/elsewhere")),
        };
        let outbox = cmd.outbox(&Config::default());
        assert_eq!(outbox.dir(), std::path::Path::new("/tmp/elsewhere"));

        let cmd = OutboxCommand::Delete {
            id: None,
            all: true,
            dir: None,
        };
        assert_eq!(cmd.outbox(&Config::default()).dir(), Config::default().outbox.dir);
    }
}

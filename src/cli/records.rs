use super::ui;
use crate::core::model::Id;
use crate::core::resource::Resource;
use crate::providers::Repository;
use crate::providers::wire;
use anyhow::{Context, Result, bail};
use clap::Subcommand;
use comfy_table::Cell;
use serde_json::Value;

const MAX_COLUMNS: usize = 8;

#[derive(Debug, Clone, Subcommand)]
pub enum RecordsCommand {
    /// List every record of a resource
    List { resource: Resource },
    /// Show one record
    Show { resource: Resource, id: Id },
    /// Create a record from JSON
    Create {
        resource: Resource,
        /// JSON body, or @path to read it from a file
        #[arg(long)]
        data: String,
    },
    /// Replace a record with JSON
    Update {
        resource: Resource,
        id: Id,
        /// JSON body, or @path to read it from a file
        #[arg(long)]
        data: String,
    },
    /// Delete a record
    Delete { resource: Resource, id: Id },
}

impl RecordsCommand {
    pub fn resource(&self) -> Resource {
        match self {
            RecordsCommand::List { resource }
            | RecordsCommand::Show { resource, .. }
            | RecordsCommand::Create { resource, .. }
            | RecordsCommand::Update { resource, .. }
            | RecordsCommand::Delete { resource, .. } => *resource,
        }
    }
}

/// Parses `--data`, reading the file when the argument starts with `@`.
pub fn parse_payload(data: &str) -> Result<Value> {
    let text = match data.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read payload file: {path}"))?,
        None => data.to_string(),
    };
    let value: Value = serde_json::from_str(&text).context("Payload is not valid JSON")?;
    if !value.is_object() {
        bail!("Payload must be a JSON object");
    }
    Ok(value)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map
            .get("name")
            .or_else(|| map.get("id"))
            .and_then(scalar_text),
        Value::Array(_) => None,
    }
}

/// Columns shown for a loosely typed collection: `id` first, then the
/// scalar fields of the first record.
fn columns(records: &[Value]) -> Vec<String> {
    let Some(Value::Object(first)) = records.first() else {
        return Vec::new();
    };
    let mut columns: Vec<String> = Vec::new();
    if first.contains_key("id") {
        columns.push("id".to_string());
    }
    for (key, value) in first {
        if key != "id" && scalar_text(value).is_some() {
            columns.push(key.clone());
        }
    }
    columns.truncate(MAX_COLUMNS);
    columns
}

pub fn display_records(title: &str, records: &[Value]) -> String {
    let columns = columns(records);
    let mut table = ui::new_styled_table();
    table.set_header(columns.iter().map(|c| ui::header_cell(c)).collect::<Vec<_>>());
    for record in records {
        table.add_row(
            columns
                .iter()
                .map(|c| {
                    Cell::new(
                        record
                            .get(c)
                            .and_then(scalar_text)
                            .unwrap_or_default(),
                    )
                })
                .collect::<Vec<_>>(),
        );
    }
    format!(
        "{}\n\n{}",
        ui::style_text(title, ui::StyleType::Title),
        table
    )
}

/// Field/value listing of a single record; nested values are shown as JSON.
pub fn display_record(title: &str, record: &Value) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Field"), ui::header_cell("Value")]);
    if let Value::Object(map) = record {
        for (key, value) in map {
            let text = match value {
                Value::Array(_) | Value::Object(_) => value.to_string(),
                other => scalar_text(other).unwrap_or_default(),
            };
            table.add_row(vec![Cell::new(key), Cell::new(text)]);
        }
    }
    format!(
        "{}\n\n{}",
        ui::style_text(title, ui::StyleType::Title),
        table
    )
}

pub async fn run(repo: &Repository<'_>, command: &RecordsCommand) -> Result<()> {
    match command {
        RecordsCommand::List { resource } => {
            let records = ui::with_spinner(
                &format!("Fetching {resource}..."),
                repo.list(*resource),
            )
            .await?;
            if records.is_empty() {
                ui::print_empty(resource.name());
            } else {
                println!("{}", display_records(resource.name(), &records));
            }
        }
        RecordsCommand::Show { resource, id } => {
            if !resource.has_items() {
                bail!("{resource} has no individual records; use `records list {resource}`");
            }
            let record = ui::with_spinner(
                &format!("Fetching {resource}..."),
                repo.get(*resource, *id),
            )
            .await?;
            println!("{}", display_record(&format!("{resource} #{id}"), &record));
        }
        RecordsCommand::Create { resource, data } => {
            if !resource.is_writable() || *resource == Resource::Settings {
                bail!("{resource} cannot be created here");
            }
            let created = repo.create(*resource, &parse_payload(data)?).await?;
            match wire::record_id(&created) {
                Some(id) => println!("Created {resource} #{id}"),
                None => println!("Created {resource}"),
            }
        }
        RecordsCommand::Update { resource, id, data } => {
            if !resource.is_updatable() {
                bail!("{resource} cannot be updated");
            }
            repo.update(*resource, *id, &parse_payload(data)?).await?;
            println!("Updated {resource} #{id}");
        }
        RecordsCommand::Delete { resource, id } => {
            if !resource.is_writable() || !resource.has_items() {
                bail!("{resource} cannot be deleted");
            }
            repo.delete(*resource, *id).await?;
            println!("Deleted {resource} #{id}");
        }
    }
    Ok(())
}

/// Renders a reporting endpoint: a list becomes a table, anything else a
/// field listing.
pub async fn report(repo: &Repository<'_>, name: &str) -> Result<()> {
    let value = ui::with_spinner("Fetching report...", repo.report(name)).await?;
    let title = format!("Report: {name}");
    match value {
        Value::Array(ref items) if items.is_empty() => ui::print_empty("report rows"),
        Value::Array(items) => println!("{}", display_records(&title, &items)),
        Value::Object(map) if map.contains_key("results") => {
            let items = wire::records(Value::Object(map));
            if items.is_empty() {
                ui::print_empty("report rows");
            } else {
                println!("{}", display_records(&title, &items));
            }
        }
        other => println!("{}", display_record(&title, &other)),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cache::QueryKey;
    use crate::providers::repository::testing::FakeBackend;
    use crate::store::memory::MemoryCache;
    use serde_json::json;
    use std::io::Write;
    use std::sync::Arc;

    #[test]
    fn test_parse_payload_inline_and_file() {
        assert_eq!(
            parse_payload(r#"{"name": "Sawah"}"#).unwrap(),
            json!({"name": "Sawah"})
        );

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"quantity": 12}}"#).unwrap();
        let arg = format!("@{}", file.path().display());
        assert_eq!(parse_payload(&arg).unwrap(), json!({"quantity": 12}));

        assert!(parse_payload("[1, 2]").is_err());
        assert!(parse_payload("not json").is_err());
    }

    #[test]
    fn test_display_records_flattens_references() {
        let records = vec![
            json!({"id": 1, "name": "Sawah Utara", "investor": {"id": 2, "name": "Budi"}, "tags": ["a"]}),
            json!({"id": 2, "name": "Kolam", "investor": null}),
        ];

        let output = display_records("assets", &records);

        assert!(output.contains("Sawah Utara"));
        assert!(output.contains("Budi"));
        assert!(!output.contains("tags"));
    }

    #[tokio::test]
    async fn test_roles_are_read_only() {
        let backend = FakeBackend::default();
        let repo = Repository::new(
            &backend,
            Arc::new(MemoryCache::<QueryKey, Value>::new()),
            None,
        );

        let err = run(
            &repo,
            &RecordsCommand::Delete {
                resource: Resource::Role,
                id: 1,
            },
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("cannot be deleted"));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_create_posts_payload() {
        let backend = FakeBackend::with(&[("/api/sales/sales/", json!({"id": 7}))]);
        let repo = Repository::new(
            &backend,
            Arc::new(MemoryCache::<QueryKey, Value>::new()),
            None,
        );

        run(
            &repo,
            &RecordsCommand::Create {
                resource: Resource::Sale,
                data: r#"{"quantity": 3}"#.to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(
            backend.calls(),
            vec![r#"POST /api/sales/sales/ {"quantity":3}"#.to_string()]
        );
    }
}

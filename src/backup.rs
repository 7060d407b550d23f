//! Workspace bundles: every record collection plus the workspace settings,
//! written as JSON documents inside a zip with per-entry checksums.

use crate::model::{LessonInstance, ScheduleEntry};
use crate::schedule;
use crate::session;
use crate::store::{Collection, RecordStore, SettingsStore};
use anyhow::{anyhow, ensure, Context};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::info;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const BUNDLE_FORMAT: &str = "docente-records-v1";
const MANIFEST_ENTRY: &str = "manifest.json";
const SETTINGS_ENTRY: &str = "settings.json";
const EXPORTED_SETTINGS: [&str; 2] = [schedule::CONFIG_KEY, session::CURRENT_INSTANCE_KEY];

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BundledRecord {
    id: String,
    body: Value,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Manifest {
    format: String,
    app_version: String,
    exported_at: String,
    /// Entry path to lowercase hex SHA-256 of its bytes.
    entries: BTreeMap<String, String>,
    counts: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleSummary {
    pub bundle_format: String,
    /// Records per collection name.
    pub counts: BTreeMap<String, usize>,
}

fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

fn collection_entry(collection: Collection) -> String {
    format!("records/{}.json", collection.as_str())
}

pub fn export_bundle<S: RecordStore + SettingsStore>(
    store: &S,
    out_path: &Path,
) -> anyhow::Result<BundleSummary> {
    let mut documents: Vec<(String, Vec<u8>)> = Vec::new();
    let mut counts = BTreeMap::new();
    for collection in Collection::ALL {
        let rows: Vec<BundledRecord> = store
            .list(collection)
            .with_context(|| format!("failed to read {}", collection.as_str()))?
            .into_iter()
            .map(|(id, body)| BundledRecord { id, body })
            .collect();
        counts.insert(collection.as_str().to_string(), rows.len());
        documents.push((collection_entry(collection), serde_json::to_vec_pretty(&rows)?));
    }

    let mut settings = BTreeMap::new();
    for key in EXPORTED_SETTINGS {
        if let Some(v) = store.setting(key).context("failed to read settings")? {
            settings.insert(key.to_string(), v);
        }
    }
    documents.push((SETTINGS_ENTRY.to_string(), serde_json::to_vec_pretty(&settings)?));

    let manifest = Manifest {
        format: BUNDLE_FORMAT.to_string(),
        app_version: env!("CARGO_PKG_VERSION").to_string(),
        exported_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        entries: documents
            .iter()
            .map(|(name, bytes)| (name.clone(), sha256_hex(bytes)))
            .collect(),
        counts: counts.clone(),
    };

    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }
    let out_file = File::create(out_path)
        .with_context(|| format!("failed to create {}", out_path.to_string_lossy()))?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);
    zip.start_file(MANIFEST_ENTRY, opts)?;
    zip.write_all(&serde_json::to_vec_pretty(&manifest)?)?;
    for (name, bytes) in &documents {
        zip.start_file(name.as_str(), opts)?;
        zip.write_all(bytes)?;
    }
    zip.finish().context("failed to finalize bundle")?;

    info!(path = %out_path.to_string_lossy(), ?counts, "workspace exported");
    Ok(BundleSummary {
        bundle_format: BUNDLE_FORMAT.to_string(),
        counts,
    })
}

fn read_entry(archive: &mut ZipArchive<File>, name: &str) -> anyhow::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    archive
        .by_name(name)
        .with_context(|| format!("bundle is missing {}", name))?
        .read_to_end(&mut bytes)
        .with_context(|| format!("failed to read {}", name))?;
    Ok(bytes)
}

/// Rejects records that would not load back as their collection's type.
fn check_record(collection: Collection, row: &BundledRecord) -> anyhow::Result<()> {
    match collection {
        Collection::LessonInstances => {
            let inst: LessonInstance = serde_json::from_value(row.body.clone())
                .with_context(|| format!("lesson instance {} is malformed", row.id))?;
            ensure!(inst.id == row.id, "lesson instance {} stored under {}", inst.id, row.id);
        }
        Collection::ScheduleEntries => {
            let entry: ScheduleEntry = serde_json::from_value(row.body.clone())
                .with_context(|| format!("schedule entry {} is malformed", row.id))?;
            ensure!(
                entry.lesson_key() == row.id,
                "schedule entry {} stored under {}",
                entry.lesson_key(),
                row.id
            );
        }
    }
    Ok(())
}

/// Replaces every collection and the exported settings with the bundle's
/// content. Nothing is written unless the whole bundle checks out.
pub fn import_bundle<S: RecordStore + SettingsStore>(
    store: &S,
    in_path: &Path,
) -> anyhow::Result<BundleSummary> {
    let in_file = File::open(in_path)
        .with_context(|| format!("failed to open {}", in_path.to_string_lossy()))?;
    let mut archive = ZipArchive::new(in_file).context("not a zip bundle")?;

    let manifest: Manifest = serde_json::from_slice(&read_entry(&mut archive, MANIFEST_ENTRY)?)
        .context("manifest.json is invalid")?;
    if manifest.format != BUNDLE_FORMAT {
        return Err(anyhow!("unsupported bundle format: {}", manifest.format));
    }
    let mut verified = |name: &str| -> anyhow::Result<Vec<u8>> {
        let bytes = read_entry(&mut archive, name)?;
        let expected = manifest
            .entries
            .get(name)
            .ok_or_else(|| anyhow!("manifest has no checksum for {}", name))?;
        let actual = sha256_hex(&bytes);
        ensure!(
            &actual == expected,
            "checksum mismatch for {}: manifest {}, bundle {}",
            name,
            expected,
            actual
        );
        Ok(bytes)
    };

    let mut incoming: Vec<(Collection, Vec<BundledRecord>)> = Vec::new();
    for collection in Collection::ALL {
        let name = collection_entry(collection);
        let rows: Vec<BundledRecord> = serde_json::from_slice(&verified(&name)?)
            .with_context(|| format!("{} is invalid", name))?;
        for row in &rows {
            check_record(collection, row)?;
        }
        incoming.push((collection, rows));
    }
    let settings: BTreeMap<String, Value> = serde_json::from_slice(&verified(SETTINGS_ENTRY)?)
        .context("settings.json is invalid")?;

    let mut counts = BTreeMap::new();
    for (collection, rows) in &incoming {
        for (id, _) in store.list(*collection)? {
            store.delete(*collection, &id)?;
        }
        for row in rows {
            store.put(*collection, &row.id, &row.body)?;
        }
        counts.insert(collection.as_str().to_string(), rows.len());
    }
    for key in EXPORTED_SETTINGS {
        match settings.get(key) {
            Some(v) => store.set_setting(key, v)?,
            None => store.clear_setting(key)?,
        }
    }

    info!(path = %in_path.to_string_lossy(), ?counts, "workspace imported");
    Ok(BundleSummary {
        bundle_format: manifest.format,
        counts,
    })
}

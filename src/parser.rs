use crate::ir::{Item, ManifestRecord};
use anyhow::{Context, Result, bail};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

static DIM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?P<w>\d+(?:\.\d+)?)\s*(?:/|x|:|×)\s*(?P<h>\d+(?:\.\d+)?)\s*$").unwrap()
});

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ManifestFile {
    List(Vec<RawRecord>),
    Wrapped { items: Vec<RawRecord> },
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    id: NumberOrString,
    dim: String,
    #[serde(default)]
    importance: Option<NumberOrString>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    String(String),
}

impl NumberOrString {
    fn as_f64(&self) -> Option<f64> {
        match self {
            NumberOrString::Number(val) => Some(*val),
            NumberOrString::String(val) => val.trim().parse::<f64>().ok(),
        }
    }

    fn as_string(&self) -> String {
        match self {
            NumberOrString::Number(val) => format!("{}", val),
            NumberOrString::String(val) => val.clone(),
        }
    }
}

/// Parse a manifest: a JSON array of `{ id, dim, importance }` records, or an
/// object wrapping that array under `items`. JSON5 is accepted as a fallback.
pub fn parse_manifest(input: &str) -> Result<Vec<ManifestRecord>> {
    let file: ManifestFile = match serde_json::from_str(input) {
        Ok(file) => file,
        Err(json_err) => json5::from_str(input)
            .map_err(|_| json_err)
            .context("invalid manifest")?,
    };
    let raw = match file {
        ManifestFile::List(records) => records,
        ManifestFile::Wrapped { items } => items,
    };
    let mut records = Vec::with_capacity(raw.len());
    for (idx, record) in raw.into_iter().enumerate() {
        let id = record.id.as_string();
        let importance = match &record.importance {
            None => 0.0,
            Some(value) => value
                .as_f64()
                .with_context(|| format!("record {idx} ({id}): importance is not a number"))?,
        };
        records.push(ManifestRecord {
            id,
            dim: record.dim,
            importance,
        });
    }
    Ok(records)
}

/// Split a `"w/h"` dimension string. `x`, `:` and `×` also separate.
pub fn parse_dim(dim: &str) -> Option<(f64, f64)> {
    let caps = DIM_RE.captures(dim)?;
    let width = caps.name("w")?.as_str().parse::<f64>().ok()?;
    let height = caps.name("h")?.as_str().parse::<f64>().ok()?;
    Some((width, height))
}

pub fn items_from_manifest(records: &[ManifestRecord], clip_param: f64) -> Result<Vec<Item>> {
    records
        .iter()
        .enumerate()
        .map(|(idx, record)| {
            let Some((width, height)) = parse_dim(&record.dim) else {
                bail!("record {idx} ({}): invalid dim `{}`", record.id, record.dim);
            };
            if width <= 0.0 || height <= 0.0 {
                bail!("record {idx} ({}): dim `{}` has a zero side", record.id, record.dim);
            }
            Ok(Item::new(
                record.id.clone(),
                width,
                height,
                record.importance,
                clip_param,
            ))
        })
        .collect()
}

pub fn load_items(input: &str, clip_param: f64) -> Result<Vec<Item>> {
    let records = parse_manifest(input)?;
    items_from_manifest(&records, clip_param)
}

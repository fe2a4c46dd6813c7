//! Label taxonomy built from two independently-schemaed tabular sources.
//!
//! The category source carries each label's shape (category, sub-category,
//! fine-grained); the rating source carries risk ratings and suggested
//! actions. Both are CSV files keyed by label text. They are merged over
//! the union of their normalized keys into one lookup the orchestrator
//! resolves per sentence. Built from Arrow RecordBatches so the tabular
//! path stays Arrow end to end.

use std::collections::HashMap;
use std::fs::File;
use std::io::Seek;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, Float64Array, Int64Array, LargeStringArray, StringArray};
use arrow::csv::ReaderBuilder;
use arrow::csv::reader::Format;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use tracing::{debug, info, warn};

use privlens_core::normalize_label;
use privlens_core::taxonomy::{Rating, TaxonomyEntry};

use crate::schema::{CATEGORY_SOURCE, RATING_SOURCE, SchemaError};

/// Rows sampled when inferring a CSV header; only the column names are
/// kept, so the sample size never affects how cells decode.
const SCHEMA_INFER_ROWS: usize = 128;

/// Per-label shape metadata from the category source.
///
/// Blank cells are filled with the unmapped defaults at load time, so the
/// three shape fields are always populated; only `action` stays optional.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryMeta {
    pub category: String,
    pub sub_category: String,
    pub fine_grained: String,
    pub action: Option<String>,
}

/// Per-label rating metadata from the rating source.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingMeta {
    /// Explicit rating, or one bucketed from the score column. `None`
    /// when the row had neither; the merge then leaves the default.
    pub rating: Option<Rating>,
    pub action: Option<String>,
}

/// NormalizedKey → shape metadata, loaded from the category CSV.
#[derive(Debug, Default)]
pub struct CategorySource {
    pub entries: HashMap<String, CategoryMeta>,
}

/// NormalizedKey → rating metadata, loaded from the ratings CSV.
#[derive(Debug, Default)]
pub struct RatingSource {
    pub entries: HashMap<String, RatingMeta>,
}

/// The merged taxonomy the orchestrator resolves labels against.
pub struct TaxonomyMap {
    pub entries: HashMap<String, TaxonomyEntry>,
    unmapped: TaxonomyEntry,
}

impl CategorySource {
    /// Load the category source, validating its header eagerly.
    ///
    /// A header missing any of the four required fields is fatal: the
    /// taxonomy cannot categorize anything without this file.
    pub fn load(path: &Path) -> Result<Self, SchemaError> {
        let (schema, batches) = read_csv(path)?;
        CATEGORY_SOURCE.resolve(&schema)?;
        let source = Self::from_batches(&batches)?;
        info!(entries = source.entries.len(), path = %path.display(), "loaded category source");
        Ok(source)
    }

    /// Build from Arrow batches.
    ///
    /// Rows with a blank label are skipped; blank shape cells fall back to
    /// the unmapped defaults; later rows overwrite earlier ones for the
    /// same key.
    pub fn from_batches(batches: &[RecordBatch]) -> Result<Self, SchemaError> {
        let defaults = TaxonomyEntry::unmapped();
        let mut entries = HashMap::new();

        for batch in batches {
            let cols = CATEGORY_SOURCE.resolve(&batch.schema())?;
            let label_col = batch.column(cols.required("label"));
            let category_col = batch.column(cols.required("category"));
            let sub_col = batch.column(cols.required("sub_category"));
            let fine_col = batch.column(cols.required("fine_grained"));
            let action_col = cols.index("action").map(|i| batch.column(i));

            for row in 0..batch.num_rows() {
                let key = match get_string(label_col.as_ref(), row) {
                    Some(label) => normalize_label(&label),
                    None => String::new(),
                };
                if key.is_empty() {
                    debug!(row, "category source row has no label; skipped");
                    continue;
                }

                let meta = CategoryMeta {
                    category: cell_or(category_col.as_ref(), row, &defaults.category),
                    sub_category: cell_or(sub_col.as_ref(), row, &defaults.sub_category),
                    fine_grained: cell_or(fine_col.as_ref(), row, &defaults.fine_grained),
                    action: action_col.and_then(|col| trimmed_cell(col.as_ref(), row)),
                };
                entries.insert(key, meta);
            }
        }

        Ok(Self { entries })
    }
}

impl RatingSource {
    /// Load the rating source.
    ///
    /// A missing label column is fatal, but a file with neither a rating
    /// nor a score column degrades to an empty source with a warning:
    /// every label then rates neutral.
    pub fn load(path: &Path) -> Result<Self, SchemaError> {
        let (schema, batches) = read_csv(path)?;
        let cols = RATING_SOURCE.resolve(&schema)?;
        if cols.index("rating").is_none() && cols.index("score").is_none() {
            warn!(
                path = %path.display(),
                "rating source has no rating or score column; ratings default to neutral"
            );
            return Ok(Self::default());
        }
        let source = Self::from_batches(&batches)?;
        info!(entries = source.entries.len(), path = %path.display(), "loaded rating source");
        Ok(source)
    }

    /// Build from Arrow batches.
    ///
    /// Per row: an explicit rating cell wins if it parses into one of the
    /// four known values; otherwise a numeric score is bucketed by fixed
    /// thresholds; otherwise the row carries no rating. An explicit action
    /// cell wins over one synthesized from topic/title/url.
    pub fn from_batches(batches: &[RecordBatch]) -> Result<Self, SchemaError> {
        let mut entries = HashMap::new();

        for batch in batches {
            let cols = RATING_SOURCE.resolve(&batch.schema())?;
            if cols.index("rating").is_none() && cols.index("score").is_none() {
                warn!("rating source batches have no rating or score column; ratings default to neutral");
                return Ok(Self::default());
            }

            let label_col = batch.column(cols.required("label"));
            let rating_col = cols.index("rating").map(|i| batch.column(i));
            let score_col = cols.index("score").map(|i| batch.column(i));
            let action_col = cols.index("action").map(|i| batch.column(i));
            let topic_col = cols.index("topic").map(|i| batch.column(i));
            let title_col = cols.index("title").map(|i| batch.column(i));
            let url_col = cols.index("url").map(|i| batch.column(i));

            for row in 0..batch.num_rows() {
                let key = match get_string(label_col.as_ref(), row) {
                    Some(label) => normalize_label(&label),
                    None => String::new(),
                };
                if key.is_empty() {
                    debug!(row, "rating source row has no label; skipped");
                    continue;
                }

                let mut rating = rating_col
                    .and_then(|col| trimmed_cell(col.as_ref(), row))
                    .and_then(|text| Rating::parse(&text));
                if rating.is_none() {
                    rating = score_col
                        .and_then(|col| get_float(col.as_ref(), row))
                        .map(Rating::from_score);
                }

                let action = action_col
                    .and_then(|col| trimmed_cell(col.as_ref(), row))
                    .or_else(|| synthesize_action(topic_col, title_col, url_col, row));

                entries.insert(key, RatingMeta { rating, action });
            }
        }

        Ok(Self { entries })
    }
}

/// Join any available topic/title/url cells into a review pointer.
fn synthesize_action(
    topic_col: Option<&Arc<dyn Array>>,
    title_col: Option<&Arc<dyn Array>>,
    url_col: Option<&Arc<dyn Array>>,
    row: usize,
) -> Option<String> {
    let parts: Vec<String> = [topic_col, title_col, url_col]
        .into_iter()
        .flatten()
        .filter_map(|col| trimmed_cell(col.as_ref(), row))
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(format!("Review: {}", parts.join(" | ")))
    }
}

impl TaxonomyMap {
    /// Load both sources and merge them.
    ///
    /// No ratings path means no rating source is configured; the merge
    /// proceeds with an empty one and everything rates neutral.
    pub fn load(category_path: &Path, ratings_path: Option<&Path>) -> Result<Self, SchemaError> {
        let categories = CategorySource::load(category_path)?;
        let ratings = match ratings_path {
            Some(path) => RatingSource::load(path)?,
            None => {
                warn!("no rating source configured; ratings default to neutral");
                RatingSource::default()
            }
        };
        let map = Self::merge(categories, ratings);
        info!(merged = map.entries.len(), "built label taxonomy");
        Ok(map)
    }

    /// Merge the two sources over the union of their keys.
    ///
    /// Every merged entry starts from the unmapped defaults. The category
    /// source supplies the shape and a baseline action; the rating
    /// source's rating always overrides, and its action overrides only
    /// when present. Keys are merged independently, so the result does not
    /// depend on file row order beyond each source's own last-row-wins.
    pub fn merge(categories: CategorySource, ratings: RatingSource) -> TaxonomyMap {
        let mut entries: HashMap<String, TaxonomyEntry> = HashMap::new();

        for (key, meta) in categories.entries {
            let mut entry = TaxonomyEntry::unmapped();
            entry.category = meta.category;
            entry.sub_category = meta.sub_category;
            entry.fine_grained = meta.fine_grained;
            if let Some(action) = meta.action {
                entry.action = Some(action);
            }
            entries.insert(key, entry);
        }

        for (key, meta) in ratings.entries {
            let entry = entries.entry(key).or_insert_with(TaxonomyEntry::unmapped);
            if let Some(rating) = meta.rating {
                entry.rating = rating;
            }
            if let Some(action) = meta.action {
                entry.action = Some(action);
            }
        }

        TaxonomyMap {
            entries,
            unmapped: TaxonomyEntry::unmapped(),
        }
    }

    /// Look up an already-normalized key. Total: unknown keys resolve to
    /// the unmapped entry.
    pub fn resolve(&self, key: &str) -> &TaxonomyEntry {
        self.entries.get(key).unwrap_or(&self.unmapped)
    }

    /// Normalize a raw label and resolve it.
    pub fn resolve_label(&self, label: &str) -> &TaxonomyEntry {
        self.resolve(&normalize_label(label))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Read a whole CSV file into Arrow batches.
///
/// Schema inference supplies the header names only; every column decodes
/// as Utf8 and typed values are parsed per row downstream. A malformed
/// cell in a numeric column therefore skips that cell's value instead of
/// failing the read.
fn read_csv(path: &Path) -> Result<(Schema, Vec<RecordBatch>), SchemaError> {
    let read_err = |source| SchemaError::Read {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).map_err(read_err)?;
    let format = Format::default().with_header(true);
    let (inferred, _) = format.infer_schema(&mut file, Some(SCHEMA_INFER_ROWS))?;
    file.rewind().map_err(read_err)?;

    let schema = Schema::new(
        inferred
            .fields()
            .iter()
            .map(|f| Field::new(f.name(), DataType::Utf8, true))
            .collect::<Vec<_>>(),
    );
    let reader = ReaderBuilder::new(Arc::new(schema.clone()))
        .with_format(format)
        .build(file)?;
    let batches = reader.collect::<Result<Vec<_>, _>>()?;
    Ok((schema, batches))
}

// ── Arrow extraction helpers ──

/// Extract a string value from an Arrow array (handles Utf8 and LargeUtf8).
fn get_string(col: &dyn Array, row: usize) -> Option<String> {
    if col.is_null(row) {
        return None;
    }
    col.as_any()
        .downcast_ref::<StringArray>()
        .map(|arr| arr.value(row).to_string())
        .or_else(|| {
            col.as_any()
                .downcast_ref::<LargeStringArray>()
                .map(|arr| arr.value(row).to_string())
        })
}

/// A trimmed, non-empty string cell; blank cells count as absent.
fn trimmed_cell(col: &dyn Array, row: usize) -> Option<String> {
    get_string(col, row)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// A string cell, or the given fallback when the cell is blank.
fn cell_or(col: &dyn Array, row: usize, fallback: &str) -> String {
    trimmed_cell(col, row).unwrap_or_else(|| fallback.to_string())
}

/// Extract a float from a Float64, Int64, or numeric-string column.
fn get_float(col: &dyn Array, row: usize) -> Option<f64> {
    if col.is_null(row) {
        return None;
    }
    if let Some(arr) = col.as_any().downcast_ref::<Float64Array>() {
        return Some(arr.value(row));
    }
    if let Some(arr) = col.as_any().downcast_ref::<Int64Array>() {
        return Some(arr.value(row) as f64);
    }
    get_string(col, row).and_then(|s| s.trim().parse::<f64>().ok())
}

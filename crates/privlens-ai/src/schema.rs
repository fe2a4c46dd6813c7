//! Alias-driven column mapping for the taxonomy source files.
//!
//! Neither source file has a fixed header: the label column alone answers
//! to "label", "case", "tosdr_case" or "pred_label" depending on which
//! export produced the file. Each source declares its fields and accepted
//! aliases up front, and the whole mapping is validated against the actual
//! header before any row is read, so a bad file fails with one error that
//! names every unresolved field.

use std::collections::HashMap;
use std::path::PathBuf;

use arrow::datatypes::Schema;
use thiserror::Error;

/// Error raised while loading a taxonomy source file.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error(
        "{source_name}: missing required column(s) [{}]; found columns [{}]",
        missing.join(", "),
        found.join(", ")
    )]
    MissingColumns {
        source_name: &'static str,
        missing: Vec<&'static str>,
        found: Vec<String>,
    },

    #[error("read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] arrow::error::ArrowError),
}

/// One logical field and the header aliases that can supply it.
pub struct ColumnSpec {
    pub field: &'static str,
    pub aliases: &'static [&'static str],
    pub required: bool,
}

/// Declarative column mapping for one source file.
pub struct SourceSchema {
    pub name: &'static str,
    pub columns: &'static [ColumnSpec],
}

/// Column mapping for the category source: label plus the three shape
/// columns are mandatory, action is optional.
pub const CATEGORY_SOURCE: SourceSchema = SourceSchema {
    name: "category source",
    columns: &[
        ColumnSpec {
            field: "label",
            aliases: &["label", "case", "tosdr_case", "pred_label"],
            required: true,
        },
        ColumnSpec {
            field: "category",
            aliases: &["category", "broad", "broad_category"],
            required: true,
        },
        ColumnSpec {
            field: "sub_category",
            aliases: &["sub_category", "subcategory", "sub", "sub-category", "sub category"],
            required: true,
        },
        ColumnSpec {
            field: "fine_grained",
            aliases: &[
                "fine_grained",
                "finegrained",
                "fine",
                "fine_grained_category",
                "fine-grained category",
                "fine grained category",
            ],
            required: true,
        },
        ColumnSpec {
            field: "action",
            aliases: &["action", "recommendation", "suggested_action"],
            required: false,
        },
    ],
};

/// Column mapping for the rating source: only the label is mandatory here.
/// Rating and score are each optional, but the loader refuses to produce
/// ratings when both are absent.
pub const RATING_SOURCE: SourceSchema = SourceSchema {
    name: "rating source",
    columns: &[
        ColumnSpec {
            field: "label",
            aliases: &["label", "case", "tosdr_case", "pred_label"],
            required: true,
        },
        ColumnSpec {
            field: "rating",
            aliases: &["class", "rating", "risk", "risk_rating", "severity"],
            required: false,
        },
        ColumnSpec {
            field: "score",
            aliases: &["score", "weight", "case_score"],
            required: false,
        },
        ColumnSpec {
            field: "action",
            aliases: &["action", "recommendation", "suggested_action"],
            required: false,
        },
        ColumnSpec {
            field: "topic",
            aliases: &["topic"],
            required: false,
        },
        ColumnSpec {
            field: "title",
            aliases: &["title"],
            required: false,
        },
        ColumnSpec {
            field: "url",
            aliases: &["url", "link"],
            required: false,
        },
    ],
};

impl SourceSchema {
    /// Resolve every declared field against an Arrow schema.
    ///
    /// Headers match aliases case-insensitively after trimming, so
    /// "Sub-Category" satisfies the `sub-category` alias. Required fields
    /// that no alias matches are collected and reported together.
    pub fn resolve(&self, schema: &Schema) -> Result<ResolvedColumns, SchemaError> {
        let headers: Vec<String> = schema
            .fields()
            .iter()
            .map(|f| f.name().trim().to_lowercase())
            .collect();

        let mut indices = HashMap::new();
        let mut missing = Vec::new();
        for spec in self.columns {
            let hit = spec
                .aliases
                .iter()
                .find_map(|alias| headers.iter().position(|h| h == alias));
            match hit {
                Some(idx) => {
                    indices.insert(spec.field, idx);
                }
                None if spec.required => missing.push(spec.field),
                None => {}
            }
        }

        if !missing.is_empty() {
            return Err(SchemaError::MissingColumns {
                source_name: self.name,
                missing,
                found: schema.fields().iter().map(|f| f.name().clone()).collect(),
            });
        }
        Ok(ResolvedColumns { indices })
    }
}

/// Field → column index mapping produced by [`SourceSchema::resolve`].
#[derive(Debug)]
pub struct ResolvedColumns {
    indices: HashMap<&'static str, usize>,
}

impl ResolvedColumns {
    /// Column index for an optional field, `None` when absent.
    pub fn index(&self, field: &str) -> Option<usize> {
        self.indices.get(field).copied()
    }

    /// Column index for a field the schema declares required.
    ///
    /// Resolution has already rejected schemas missing a required field,
    /// so this only panics on a field name the schema never declared.
    pub fn required(&self, field: &str) -> usize {
        self.indices[field]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::datatypes::{DataType, Field};

    fn schema_of(names: &[&str]) -> Schema {
        Schema::new(
            names
                .iter()
                .map(|n| Field::new(*n, DataType::Utf8, true))
                .collect::<Vec<_>>(),
        )
    }

    #[test]
    fn resolves_exact_headers() {
        let schema = schema_of(&["label", "category", "sub_category", "fine_grained"]);
        let cols = CATEGORY_SOURCE.resolve(&schema).unwrap();
        assert_eq!(cols.required("label"), 0);
        assert_eq!(cols.required("fine_grained"), 3);
        assert_eq!(cols.index("action"), None);
    }

    #[test]
    fn resolves_aliased_headers_case_insensitively() {
        let schema = schema_of(&[
            "Case",
            "Category",
            "Sub-Category",
            "Fine-grained category",
            "Recommendation",
        ]);
        let cols = CATEGORY_SOURCE.resolve(&schema).unwrap();
        assert_eq!(cols.required("label"), 0);
        assert_eq!(cols.required("sub_category"), 2);
        assert_eq!(cols.required("fine_grained"), 3);
        assert_eq!(cols.index("action"), Some(4));
    }

    #[test]
    fn header_whitespace_is_trimmed() {
        let schema = schema_of(&[" label ", "category", "\tsub_category", "fine_grained "]);
        let cols = CATEGORY_SOURCE.resolve(&schema).unwrap();
        assert_eq!(cols.required("label"), 0);
        assert_eq!(cols.required("sub_category"), 2);
    }

    #[test]
    fn missing_required_columns_all_reported() {
        let schema = schema_of(&["case", "category"]);
        let err = CATEGORY_SOURCE.resolve(&schema).unwrap_err();
        match err {
            SchemaError::MissingColumns {
                source_name,
                missing,
                found,
            } => {
                assert_eq!(source_name, "category source");
                assert_eq!(missing, vec!["sub_category", "fine_grained"]);
                assert_eq!(found, vec!["case", "category"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn error_message_names_fields_and_columns() {
        let schema = schema_of(&["case"]);
        let err = CATEGORY_SOURCE.resolve(&schema).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("category source"), "{msg}");
        assert!(msg.contains("sub_category"), "{msg}");
        assert!(msg.contains("fine_grained"), "{msg}");
        assert!(msg.contains("case"), "{msg}");
    }

    #[test]
    fn rating_source_needs_only_label() {
        let schema = schema_of(&["tosdr_case", "Topic", "URL"]);
        let cols = RATING_SOURCE.resolve(&schema).unwrap();
        assert_eq!(cols.required("label"), 0);
        assert_eq!(cols.index("rating"), None);
        assert_eq!(cols.index("score"), None);
        assert_eq!(cols.index("topic"), Some(1));
        assert_eq!(cols.index("url"), Some(2));
    }

    #[test]
    fn rating_source_without_label_fails() {
        let schema = schema_of(&["class", "score"]);
        let err = RATING_SOURCE.resolve(&schema).unwrap_err();
        assert!(matches!(err, SchemaError::MissingColumns { .. }));
    }

    #[test]
    fn first_alias_hit_wins() {
        // "class" outranks "rating" in the alias order, matching the
        // rating source exports where both columns coexist.
        let schema = schema_of(&["case", "rating", "class"]);
        let cols = RATING_SOURCE.resolve(&schema).unwrap();
        assert_eq!(cols.index("rating"), Some(2));
    }
}

//! Conversion between [`CollectionItem`] and the serialized [`BackupRecord`] row.
//!
//! Embeddings are stored as JSON arrays and metadata as JSON objects, so the
//! same text works for `JSON` (PostgreSQL) and `TEXT` (SQLite) columns.

use crate::error::CodecError;
use crate::types::{BackupRecord, CollectionItem, Metadata, MetadataValue};

/// Serialize an item into a backup row.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] if the embedding or a metadata float is not finite.
pub fn encode_item(item: &CollectionItem) -> Result<BackupRecord, CodecError> {
    let embedding = encode_embedding(&item.embedding).map_err(|reason| CodecError::Encode {
        id: item.id.clone(),
        reason,
    })?;
    let metadata = item
        .metadata
        .as_ref()
        .map(encode_metadata)
        .transpose()
        .map_err(|reason| CodecError::Encode {
            id: item.id.clone(),
            reason,
        })?;
    Ok(BackupRecord {
        id: item.id.clone(),
        embedding: Some(embedding),
        metadata,
        document: item.document.clone(),
    })
}

/// Deserialize a backup row back into an item.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] if the embedding is missing or malformed, or
/// if metadata is not an object of scalar values.
pub fn decode_record(record: &BackupRecord) -> Result<CollectionItem, CodecError> {
    let decode_err = |reason: String| CodecError::Decode {
        id: record.id.clone(),
        reason,
    };
    let raw = record
        .embedding
        .as_deref()
        .ok_or_else(|| decode_err("embedding is NULL".into()))?;
    let embedding = decode_embedding(raw).map_err(decode_err)?;
    let metadata = match record.metadata.as_deref() {
        None => None,
        Some(raw) => decode_metadata(raw).map_err(decode_err)?,
    };
    Ok(CollectionItem {
        id: record.id.clone(),
        embedding,
        metadata,
        document: record.document.clone(),
    })
}

fn encode_embedding(embedding: &[f32]) -> Result<String, String> {
    if let Some(pos) = embedding.iter().position(|v| !v.is_finite()) {
        return Err(format!("embedding[{pos}] is not finite"));
    }
    serde_json::to_string(embedding).map_err(|e| e.to_string())
}

fn decode_embedding(raw: &str) -> Result<Vec<f32>, String> {
    let values: Vec<f64> =
        serde_json::from_str(raw).map_err(|e| format!("invalid embedding: {e}"))?;
    values
        .into_iter()
        .enumerate()
        .map(|(i, v)| {
            #[expect(clippy::cast_possible_truncation)]
            let f = v as f32;
            if f.is_finite() {
                Ok(f)
            } else {
                Err(format!("embedding[{i}] is out of f32 range"))
            }
        })
        .collect()
}

fn encode_metadata(metadata: &Metadata) -> Result<String, String> {
    for (key, value) in metadata {
        if let MetadataValue::Float(f) = value
            && !f.is_finite()
        {
            return Err(format!("metadata field {key:?} is not finite"));
        }
    }
    serde_json::to_string(metadata).map_err(|e| e.to_string())
}

fn decode_metadata(raw: &str) -> Result<Option<Metadata>, String> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| format!("invalid metadata: {e}"))?;
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Object(map) => map
            .into_iter()
            .map(|(k, v)| {
                MetadataValue::try_from(v)
                    .map(|mv| (k.clone(), mv))
                    .map_err(|e| format!("metadata field {k:?}: {e}"))
            })
            .collect::<Result<Metadata, _>>()
            .map(Some),
        other => Err(format!("metadata must be an object, got {other}")),
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn record(embedding: Option<&str>, metadata: Option<&str>) -> BackupRecord {
        BackupRecord {
            id: "r1".into(),
            embedding: embedding.map(str::to_owned),
            metadata: metadata.map(str::to_owned),
            document: None,
        }
    }

    #[test]
    fn encode_produces_json_columns() {
        let mut meta = Metadata::new();
        meta.insert("lang".into(), "en".into());
        let item = CollectionItem::new("a", vec![0.1, 0.2])
            .with_metadata(meta)
            .with_document("hello");
        let rec = encode_item(&item).unwrap();
        assert_eq!(rec.id, "a");
        assert_eq!(rec.embedding.as_deref(), Some("[0.1,0.2]"));
        assert_eq!(rec.metadata.as_deref(), Some(r#"{"lang":"en"}"#));
        assert_eq!(rec.document.as_deref(), Some("hello"));
    }

    #[test]
    fn roundtrip_preserves_spec_scenario_embeddings() {
        for (id, emb) in [("a", [0.1, 0.2]), ("b", [0.3, 0.4]), ("c", [0.5, 0.6])] {
            let item = CollectionItem::new(id, emb.to_vec());
            let back = decode_record(&encode_item(&item).unwrap()).unwrap();
            assert_eq!(back, item);
        }
    }

    #[test]
    fn encode_rejects_nan_embedding() {
        let item = CollectionItem::new("bad", vec![0.1, f32::NAN]);
        let err = encode_item(&item).unwrap_err();
        assert!(matches!(err, CodecError::Encode { ref id, .. } if id == "bad"));
    }

    #[test]
    fn encode_rejects_infinite_metadata() {
        let mut meta = Metadata::new();
        meta.insert("score".into(), MetadataValue::Float(f64::INFINITY));
        let item = CollectionItem::new("bad", vec![1.0]).with_metadata(meta);
        assert!(encode_item(&item).is_err());
    }

    #[test]
    fn decode_null_embedding_fails() {
        let err = decode_record(&record(None, None)).unwrap_err();
        assert!(matches!(err, CodecError::Decode { .. }));
    }

    #[test]
    fn decode_malformed_embedding_fails() {
        assert!(decode_record(&record(Some("[0.1, \"x\"]"), None)).is_err());
        assert!(decode_record(&record(Some("not json"), None)).is_err());
    }

    #[test]
    fn decode_out_of_range_embedding_fails() {
        assert!(decode_record(&record(Some("[1e300]"), None)).is_err());
    }

    #[test]
    fn decode_json_null_metadata_is_none() {
        let item = decode_record(&record(Some("[1.0]"), Some("null"))).unwrap();
        assert!(item.metadata.is_none());
    }

    #[test]
    fn decode_rejects_nested_metadata() {
        let err = decode_record(&record(Some("[1.0]"), Some(r#"{"tags": ["a"]}"#))).unwrap_err();
        assert!(err.to_string().contains("tags"));
    }

    #[test]
    fn decode_rejects_non_object_metadata() {
        assert!(decode_record(&record(Some("[1.0]"), Some("[1]"))).is_err());
    }

    #[test]
    fn integral_floats_stay_floats() {
        let item = CollectionItem::new("t", vec![1.0]).with_metadata(
            [
                ("ts".to_owned(), MetadataValue::Float(1e16)),
                ("ratio".to_owned(), MetadataValue::Float(2.0)),
            ]
            .into(),
        );
        let rec = encode_item(&item).unwrap();
        assert_eq!(decode_record(&rec).unwrap(), item);
    }

    #[test]
    fn decode_accepts_alternate_number_forms() {
        // Hand-edited backups may use other spacing and exponent forms.
        let item = decode_record(&record(Some("[0.1, 2e-1, 3]"), None)).unwrap();
        assert_eq!(item.embedding, vec![0.1, 0.2, 3.0]);
    }

    fn metadata_value() -> impl Strategy<Value = MetadataValue> {
        prop_oneof![
            Just(MetadataValue::Null),
            any::<bool>().prop_map(MetadataValue::Bool),
            any::<i64>().prop_map(MetadataValue::Int),
            (-1.0e12f64..1.0e12).prop_map(MetadataValue::Float),
            "[a-zA-Z0-9 ]{0,16}".prop_map(MetadataValue::Str),
        ]
    }

    fn collection_item() -> impl Strategy<Value = CollectionItem> {
        (
            "[a-z0-9_-]{1,12}",
            prop::collection::vec(-1.0e6f32..1.0e6, 0..32),
            prop::option::of(prop::collection::btree_map("[a-z]{1,8}", metadata_value(), 0..6)),
            prop::option::of("[ -~]{0,40}"),
        )
            .prop_map(|(id, embedding, metadata, document)| CollectionItem {
                id,
                embedding,
                metadata,
                document,
            })
    }

    proptest! {
        #[test]
        fn encode_decode_roundtrip(item in collection_item()) {
            let back = decode_record(&encode_item(&item).unwrap()).unwrap();
            prop_assert_eq!(&back.id, &item.id);
            prop_assert_eq!(&back.document, &item.document);
            prop_assert_eq!(back.embedding.len(), item.embedding.len());
            for (a, b) in back.embedding.iter().zip(&item.embedding) {
                prop_assert!((a - b).abs() <= f32::EPSILON * b.abs().max(1.0));
            }
            match (&back.metadata, &item.metadata) {
                (None, None) => {}
                (Some(got), Some(want)) => {
                    prop_assert_eq!(got.len(), want.len());
                    for (k, want_v) in want {
                        let got_v = &got[k];
                        match (got_v, want_v) {
                            (MetadataValue::Float(g), MetadataValue::Float(w)) => {
                                prop_assert!((g - w).abs() <= f64::EPSILON * w.abs().max(1.0));
                            }
                            _ => prop_assert_eq!(got_v, want_v),
                        }
                    }
                }
                _ => prop_assert!(false, "metadata presence changed"),
            }
        }
    }
}

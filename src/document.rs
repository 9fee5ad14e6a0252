//! Wire shape of a document-creation request.
//!
//! These are plain data-transfer structs owned by the submission path. The gate never looks
//! at them. Field names follow the endpoint's JSON schema, which mixes snake_case and
//! camelCase keys.

use serde::{Deserialize, Serialize};

/// Document-creation payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub description: Option<Description>,
    #[serde(rename = "doc_id", default)]
    pub doc_id: Option<String>,
    #[serde(rename = "doc_status", default)]
    pub doc_status: Option<String>,
    #[serde(rename = "doc_type", default)]
    pub doc_type: Option<String>,
    #[serde(rename = "importRequest", default)]
    pub import_request: bool,
    #[serde(default)]
    pub owner_inn: Option<String>,
    #[serde(default)]
    pub participant_inn: Option<String>,
    #[serde(default)]
    pub producer_inn: Option<String>,
    #[serde(default)]
    pub production_date: Option<String>,
    #[serde(default)]
    pub production_type: Option<String>,
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub reg_date: Option<String>,
    #[serde(default)]
    pub reg_number: Option<String>,
}

/// Participant block nested in a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Description {
    #[serde(rename = "participantInn", default)]
    pub participant_inn: Option<String>,
}

/// One product line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default)]
    pub certificate_document: Option<String>,
    #[serde(default)]
    pub certificate_document_date: Option<String>,
    #[serde(default)]
    pub certificate_document_number: Option<String>,
    #[serde(default)]
    pub owner_inn: Option<String>,
    #[serde(default)]
    pub producer_inn: Option<String>,
    #[serde(default)]
    pub production_date: Option<String>,
    #[serde(default)]
    pub tnved_code: Option<String>,
    #[serde(default)]
    pub uit_code: Option<String>,
    #[serde(default)]
    pub uitu_code: Option<String>,
}

impl Document {
    /// Serialize to the JSON body the endpoint expects.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn serializes_mixed_case_keys() {
        let doc = Document {
            description: Some(Description { participant_inn: Some("7700".into()) }),
            doc_id: Some("d-1".into()),
            import_request: true,
            products: vec![Product { tnved_code: Some("6401".into()), ..Product::default() }],
            ..Document::default()
        };
        let v: Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();
        assert_eq!(v["description"]["participantInn"], "7700");
        assert_eq!(v["doc_id"], "d-1");
        assert_eq!(v["importRequest"], true);
        assert_eq!(v["products"][0]["tnved_code"], "6401");
        assert!(v["products"][0]["uit_code"].is_null());
    }

    #[test]
    fn empty_document_keeps_every_key() {
        let v: Value = serde_json::from_str(&Document::default().to_json().unwrap()).unwrap();
        let obj = v.as_object().unwrap();
        for key in [
            "description",
            "doc_id",
            "doc_status",
            "doc_type",
            "importRequest",
            "owner_inn",
            "participant_inn",
            "producer_inn",
            "production_date",
            "production_type",
            "products",
            "reg_date",
            "reg_number",
        ] {
            assert!(obj.contains_key(key), "missing {}", key);
        }
    }

    #[test]
    fn parses_sparse_payload() {
        let doc: Document =
            serde_json::from_str(r#"{"doc_type": "LP_INTRODUCE_GOODS", "products": [{}]}"#)
                .unwrap();
        assert_eq!(doc.doc_type.as_deref(), Some("LP_INTRODUCE_GOODS"));
        assert_eq!(doc.products.len(), 1);
        assert!(!doc.import_request);
    }
}

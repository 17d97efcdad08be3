//! # Firestore Store
//!
//! reqwest implementation of [`DocumentStore`] against the Firestore v1
//! REST API. Log appends use a `:commit` field transform so concurrent
//! writers cannot clobber the array; partial updates send an `updateMask`
//! so untouched fields survive.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Map, Value};

use crate::project::{LogEntry, Project, ProjectPatch};

use super::{DocumentStore, StoreError};

const BASE_URL: &str = "https://firestore.googleapis.com/v1";

/// Firestore REST client for the `projects` collection.
pub struct FirestoreStore {
    http: reqwest::Client,
    project_id: String,
    collection: String,
    api_key: String,
}

impl FirestoreStore {
    pub fn new(project_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            project_id: project_id.into(),
            collection: "projects".to_string(),
            api_key: api_key.into(),
        }
    }

    /// Build a client from `FIREBASE_PROJECT_ID` and `FIREBASE_API_KEY`.
    /// Absent configuration means the server runs store-less.
    pub fn from_env() -> Option<Self> {
        let project_id = std::env::var("FIREBASE_PROJECT_ID").ok()?;
        let api_key = std::env::var("FIREBASE_API_KEY").ok()?;
        if project_id.is_empty() || api_key.is_empty() {
            return None;
        }
        Some(Self::new(project_id, api_key))
    }

    fn documents_url(&self) -> String {
        format!(
            "{BASE_URL}/projects/{}/databases/(default)/documents",
            self.project_id
        )
    }

    fn document_path(&self, id: &str) -> String {
        format!(
            "projects/{}/databases/(default)/documents/{}/{}",
            self.project_id, self.collection, id
        )
    }

    fn encode_record<T: serde::Serialize>(record: &T) -> Result<Value, StoreError> {
        let json = serde_json::to_value(record)
            .map_err(|e| StoreError::Rejected(format!("encode failed: {e}")))?;
        Ok(json!({ "fields": to_firestore_fields(&json) }))
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn create(&self, project: &Project) -> Result<String, StoreError> {
        let url = format!(
            "{}/{}?key={}",
            self.documents_url(),
            self.collection,
            self.api_key
        );
        let response = self
            .http
            .post(&url)
            .json(&Self::encode_record(project)?)
            .send()
            .await?
            .error_for_status()?;

        let body: Value = response.json().await?;
        let name = body["name"]
            .as_str()
            .ok_or_else(|| StoreError::Rejected("create returned no document name".into()))?;
        let id = name
            .rsplit('/')
            .next()
            .unwrap_or(name)
            .to_string();
        Ok(id)
    }

    async fn update(&self, id: &str, patch: &ProjectPatch) -> Result<(), StoreError> {
        if patch.is_empty() {
            return Ok(());
        }
        let mut url = format!(
            "{}/{}/{}?key={}",
            self.documents_url(),
            self.collection,
            id,
            self.api_key
        );
        for field in ["verdict", "status", "draft"] {
            let touched = match field {
                "verdict" => patch.verdict.is_some(),
                "status" => patch.status.is_some(),
                _ => patch.draft.is_some(),
            };
            if touched {
                url.push_str(&format!("&updateMask.fieldPaths={field}"));
            }
        }

        let response = self
            .http
            .patch(&url)
            .json(&Self::encode_record(patch)?)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(id.to_string()));
        }
        response.error_for_status()?;
        Ok(())
    }

    async fn append_log(&self, id: &str, entry: &LogEntry) -> Result<(), StoreError> {
        let url = format!("{}:commit?key={}", self.documents_url(), self.api_key);
        let entry_json = serde_json::to_value(entry)
            .map_err(|e| StoreError::Rejected(format!("encode failed: {e}")))?;
        let body = json!({
            "writes": [{
                "transform": {
                    "document": self.document_path(id),
                    "fieldTransforms": [{
                        "fieldPath": "logs",
                        "appendMissingElements": {
                            "values": [to_firestore_value(&entry_json)]
                        }
                    }]
                }
            }]
        });

        let response = self.http.post(&url).json(&body).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(id.to_string()));
        }
        response.error_for_status()?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Project, StoreError> {
        let url = format!(
            "{}/{}/{}?key={}",
            self.documents_url(),
            self.collection,
            id,
            self.api_key
        );
        let response = self.http.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(id.to_string()));
        }
        let body: Value = response.error_for_status()?.json().await?;
        decode_document(&body, id)
    }

    async fn list(&self, owner_id: &str, limit: usize) -> Result<Vec<Project>, StoreError> {
        let url = format!("{}:runQuery?key={}", self.documents_url(), self.api_key);
        let body = json!({
            "structuredQuery": {
                "from": [{ "collectionId": self.collection }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": "owner_id" },
                        "op": "EQUAL",
                        "value": { "stringValue": owner_id }
                    }
                },
                "orderBy": [{
                    "field": { "fieldPath": "created_at" },
                    "direction": "DESCENDING"
                }],
                "limit": limit
            }
        });

        let response = self.http.post(&url).json(&body).send().await?.error_for_status()?;
        let rows: Vec<Value> = response.json().await?;

        let mut projects = Vec::new();
        for row in &rows {
            let Some(doc) = row.get("document") else {
                continue;
            };
            let id = doc["name"]
                .as_str()
                .and_then(|n| n.rsplit('/').next())
                .unwrap_or_default();
            projects.push(decode_document(doc, id)?);
        }
        Ok(projects)
    }
}

fn decode_document(doc: &Value, id: &str) -> Result<Project, StoreError> {
    let fields = doc
        .get("fields")
        .ok_or_else(|| StoreError::Rejected("document has no fields".into()))?;
    let json = from_firestore_fields(fields);
    let mut project: Project = serde_json::from_value(json)
        .map_err(|e| StoreError::Rejected(format!("decode failed: {e}")))?;
    // The document name, not the stored field, is authoritative for the id.
    project.id = id.to_string();
    Ok(project)
}

/// Encode a JSON object's members as a Firestore `fields` map.
fn to_firestore_fields(json: &Value) -> Value {
    match json {
        Value::Object(map) => {
            let fields: Map<String, Value> = map
                .iter()
                .map(|(k, v)| (k.clone(), to_firestore_value(v)))
                .collect();
            Value::Object(fields)
        }
        other => json!({ "value": to_firestore_value(other) }),
    }
}

/// Encode one JSON value as a Firestore `Value`.
fn to_firestore_value(json: &Value) -> Value {
    match json {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                // Firestore integers travel as strings
                json!({ "integerValue": i.to_string() })
            } else {
                json!({ "doubleValue": n.as_f64() })
            }
        }
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => json!({
            "arrayValue": {
                "values": items.iter().map(to_firestore_value).collect::<Vec<_>>()
            }
        }),
        Value::Object(_) => json!({ "mapValue": { "fields": to_firestore_fields(json) } }),
    }
}

/// Decode a Firestore `fields` map back to a JSON object.
fn from_firestore_fields(fields: &Value) -> Value {
    match fields {
        Value::Object(map) => {
            let decoded: Map<String, Value> = map
                .iter()
                .map(|(k, v)| (k.clone(), from_firestore_value(v)))
                .collect();
            Value::Object(decoded)
        }
        _ => Value::Null,
    }
}

/// Decode one Firestore `Value`.
fn from_firestore_value(value: &Value) -> Value {
    let Some(map) = value.as_object() else {
        return Value::Null;
    };
    if let Some(s) = map.get("stringValue") {
        return s.clone();
    }
    if let Some(b) = map.get("booleanValue") {
        return b.clone();
    }
    if let Some(i) = map.get("integerValue") {
        let parsed = i.as_str().and_then(|s| s.parse::<i64>().ok());
        return parsed.map(Value::from).unwrap_or(Value::Null);
    }
    if let Some(d) = map.get("doubleValue") {
        return d.clone();
    }
    if let Some(a) = map.get("arrayValue") {
        let items = a
            .get("values")
            .and_then(Value::as_array)
            .map(|vs| vs.iter().map(from_firestore_value).collect())
            .unwrap_or_default();
        return Value::Array(items);
    }
    if let Some(m) = map.get("mapValue") {
        return from_firestore_fields(m.get("fields").unwrap_or(&Value::Null));
    }
    Value::Null
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{Agent, LogKind, Verdict};
    use chrono::Utc;

    #[test]
    fn test_value_codec_round_trips_scalars() {
        for original in [
            json!("text"),
            json!(true),
            json!(42),
            json!(1.5),
            Value::Null,
        ] {
            let encoded = to_firestore_value(&original);
            assert_eq!(from_firestore_value(&encoded), original);
        }
    }

    #[test]
    fn test_integer_travels_as_string() {
        let encoded = to_firestore_value(&json!(7));
        assert_eq!(encoded["integerValue"], "7");
    }

    #[test]
    fn test_project_round_trips_through_fields() {
        let mut project = Project::new(
            "p-9",
            "user-1",
            "RFP Analysis",
            "Some RFP",
            Some("win themes".to_string()),
        );
        project.verdict = Verdict::Go;
        project.push_log(LogEntry {
            id: 0,
            agent: Agent::Historian,
            message: "Ingesting RFP content...".to_string(),
            timestamp: Utc::now(),
            kind: LogKind::Info,
        });

        let json = serde_json::to_value(&project).unwrap();
        let fields = to_firestore_fields(&json);
        let decoded = from_firestore_fields(&fields);
        let restored: Project = serde_json::from_value(decoded).unwrap();

        assert_eq!(restored.id, project.id);
        assert_eq!(restored.verdict, Verdict::Go);
        assert_eq!(restored.logs.len(), 1);
        assert_eq!(restored.logs[0].agent, Agent::Historian);
    }

    #[test]
    fn test_update_mask_lists_only_touched_fields() {
        let store = FirestoreStore::new("demo", "key");
        let url_base = store.documents_url();
        assert!(url_base.contains("demo"));
        // Patch encoding omits untouched fields entirely.
        let patch = ProjectPatch::verdict(Verdict::NoGo);
        let encoded = FirestoreStore::encode_record(&patch).unwrap();
        let fields = encoded["fields"].as_object().unwrap();
        assert!(fields.contains_key("verdict"));
        assert!(!fields.contains_key("status"));
        assert!(!fields.contains_key("draft"));
    }

    #[test]
    fn test_document_path_targets_collection() {
        let store = FirestoreStore::new("demo", "key");
        assert_eq!(
            store.document_path("abc"),
            "projects/demo/databases/(default)/documents/projects/abc"
        );
    }
}

//! Blocking client for the Airtable REST API.
//!
//! ```text
//! GET   {api}/{base}/{table}?offset=<token>   list, one page per call
//! PATCH {api}/{base}/{table}/{record_id}      partial update
//! POST  {api}/{base}/{table}                  create, up to 10 records
//! ```

use std::collections::BTreeSet;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

use tablesync_core::{Fields, Record, RecordId, Settings, Table};

use crate::error::RemoteError;
use crate::store::RecordStore;
use crate::USER_AGENT;

/// Records per create request accepted by the API.
pub const MAX_RECORDS_PER_REQUEST: usize = 10;

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ListPage {
    #[serde(default)]
    records: Vec<ApiRecord>,
    /// Continuation token; absent (or empty) on the last page.
    #[serde(default)]
    offset: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiRecord {
    id: String,
    #[serde(default)]
    fields: Fields,
}

#[derive(Debug, Serialize)]
struct FieldsBody<'a> {
    fields: &'a Fields,
}

#[derive(Debug, Serialize)]
struct CreateBody<'a> {
    records: Vec<FieldsBody<'a>>,
}

#[derive(Debug, Deserialize)]
struct CreateResponse {
    #[serde(default)]
    records: Vec<ApiRecord>,
}

// ── Client ──────────────────────────────────────────────────────────

/// Remote table addressed by `{api}/{base}/{table}`.
pub struct AirtableClient {
    agent: ureq::Agent,
    table_url: Url,
    token: SecretString,
}

impl AirtableClient {
    pub fn new(settings: &Settings) -> Result<Self, RemoteError> {
        Self::with_base_url(
            &settings.api_url,
            &settings.base_id,
            &settings.table_name,
            settings.access_token.clone(),
        )
    }

    /// Build a client against an explicit API root (tests point this at a mock server).
    pub fn with_base_url(
        api_url: &str,
        base_id: &str,
        table_name: &str,
        token: SecretString,
    ) -> Result<Self, RemoteError> {
        let mut table_url = Url::parse(api_url)
            .map_err(|e| RemoteError::Transport(format!("invalid API URL '{api_url}': {e}")))?;
        table_url
            .path_segments_mut()
            .map_err(|_| RemoteError::Transport(format!("API URL '{api_url}' cannot be a base")))?
            .pop_if_empty()
            .push(base_id)
            .push(table_name);

        let agent = ureq::AgentBuilder::new().user_agent(USER_AGENT).build();
        Ok(Self {
            agent,
            table_url,
            token,
        })
    }

    pub fn table_url(&self) -> &str {
        self.table_url.as_str()
    }

    fn record_url(&self, id: &RecordId) -> Url {
        let mut url = self.table_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(&id.0);
        }
        url
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.token.expose_secret())
    }

    fn list_page(&self, offset: Option<&str>) -> Result<ListPage, RemoteError> {
        let mut request = self
            .agent
            .get(self.table_url.as_str())
            .set("Authorization", &self.bearer());
        if let Some(offset) = offset {
            request = request.query("offset", offset);
        }
        let page = request.call()?.into_json::<ListPage>()?;
        Ok(page)
    }
}

impl RecordStore for AirtableClient {
    fn fetch_all(&self) -> Result<Table, RemoteError> {
        let mut records = Vec::new();
        let mut offset: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self.list_page(offset.as_deref())?;
            pages += 1;
            tracing::debug!(page = pages, records = page.records.len(), "fetched page");
            records.extend(
                page.records
                    .into_iter()
                    .map(|r| Record::with_id(r.id, r.fields)),
            );

            match page.offset {
                Some(next) if !next.is_empty() => offset = Some(next),
                _ => break,
            }
        }

        tracing::info!(records = records.len(), pages, "found records in remote table");
        Ok(remote_table(records))
    }

    fn update(&self, id: &RecordId, fields: &Fields) -> Result<(), RemoteError> {
        self.agent
            .request_url("PATCH", &self.record_url(id))
            .set("Authorization", &self.bearer())
            .send_json(FieldsBody { fields })?;
        Ok(())
    }

    fn create_batch(&self, records: &[Fields]) -> Result<Vec<RecordId>, RemoteError> {
        let body = CreateBody {
            records: records.iter().map(|fields| FieldsBody { fields }).collect(),
        };
        let response = self
            .agent
            .request_url("POST", &self.table_url)
            .set("Authorization", &self.bearer())
            .send_json(body)?
            .into_json::<CreateResponse>()?;
        Ok(response
            .records
            .into_iter()
            .map(|r| RecordId::from(r.id))
            .collect())
    }

    fn max_batch_size(&self) -> usize {
        MAX_RECORDS_PER_REQUEST
    }
}

/// Remote records omit empty fields, so columns are the sorted union of
/// every field name seen.
fn remote_table(records: Vec<Record>) -> Table {
    let columns: BTreeSet<String> = records
        .iter()
        .flat_map(|r| r.fields.keys().cloned())
        .collect();
    Table::new(columns.into_iter().collect(), records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;
    use tablesync_core::FieldValue;

    fn client(server: &MockServer) -> AirtableClient {
        AirtableClient::with_base_url(
            &format!("{}/v0", server.base_url()),
            "appBase",
            "Patients",
            SecretString::new("pat_test".into()),
        )
        .expect("client")
    }

    fn status_fields(status: &str) -> Fields {
        let mut fields = Fields::new();
        fields.insert("status".into(), FieldValue::from(status));
        fields
    }

    #[test]
    fn table_url_encodes_segments() {
        let client = AirtableClient::with_base_url(
            "https://api.airtable.com/v0/",
            "appBase",
            "My Table",
            SecretString::new("t".into()),
        )
        .expect("client");
        assert_eq!(
            client.table_url(),
            "https://api.airtable.com/v0/appBase/My%20Table"
        );
    }

    #[test]
    fn fetch_all_follows_offset_until_absent() {
        let server = MockServer::start();

        let first = server.mock(|when, then| {
            when.method(GET)
                .path("/v0/appBase/Patients")
                .header("Authorization", "Bearer pat_test")
                .query_param_missing("offset");
            then.status(200).json_body(json!({
                "records": [
                    {"id": "rec1", "fields": {"pcrs_id": "A1", "status": "open"}},
                    {"id": "rec2", "fields": {"pcrs_id": "A2"}}
                ],
                "offset": "itr1/rec2"
            }));
        });
        let second = server.mock(|when, then| {
            when.method(GET)
                .path("/v0/appBase/Patients")
                .query_param("offset", "itr1/rec2");
            then.status(200).json_body(json!({
                "records": [
                    {"id": "rec3", "fields": {"pcrs_id": "A3", "ward": 4}}
                ]
            }));
        });

        let table = client(&server).fetch_all().expect("fetch_all");

        first.assert();
        second.assert();
        assert_eq!(table.len(), 3);
        let ids: Vec<_> = table
            .records
            .iter()
            .map(|r| r.id.clone().expect("remote id").0)
            .collect();
        assert_eq!(ids, vec!["rec1", "rec2", "rec3"]);
        assert_eq!(table.columns, vec!["pcrs_id", "status", "ward"]);
    }

    #[test]
    fn empty_offset_ends_pagination() {
        let server = MockServer::start();
        let only = server.mock(|when, then| {
            when.method(GET).path("/v0/appBase/Patients");
            then.status(200)
                .json_body(json!({"records": [{"id": "rec1", "fields": {}}], "offset": ""}));
        });

        let table = client(&server).fetch_all().expect("fetch_all");
        only.assert_hits(1);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn listing_failure_is_returned() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v0/appBase/Patients");
            then.status(401)
                .json_body(json!({"error": {"type": "AUTHENTICATION_REQUIRED"}}));
        });

        let err = client(&server).fetch_all().unwrap_err();
        match err {
            RemoteError::Status { status, body } => {
                assert_eq!(status, 401);
                assert!(body.contains("AUTHENTICATION_REQUIRED"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn update_patches_record_path_with_given_fields() {
        let server = MockServer::start();
        let patch = server.mock(|when, then| {
            when.method(PATCH)
                .path("/v0/appBase/Patients/rec1")
                .header("Authorization", "Bearer pat_test")
                .json_body(json!({"fields": {"status": "closed"}}));
            then.status(200)
                .json_body(json!({"id": "rec1", "fields": {"status": "closed"}}));
        });

        client(&server)
            .update(&RecordId::from("rec1"), &status_fields("closed"))
            .expect("update");
        patch.assert();
    }

    #[test]
    fn update_rejection_carries_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(PATCH).path("/v0/appBase/Patients/rec9");
            then.status(422)
                .json_body(json!({"error": {"type": "INVALID_VALUE_FOR_COLUMN"}}));
        });

        let err = client(&server)
            .update(&RecordId::from("rec9"), &status_fields("bogus"))
            .unwrap_err();
        assert!(matches!(err, RemoteError::Status { status: 422, .. }), "got: {err}");
    }

    #[test]
    fn create_batch_wraps_records_and_returns_ids() {
        let server = MockServer::start();
        let post = server.mock(|when, then| {
            when.method(POST)
                .path("/v0/appBase/Patients")
                .json_body(json!({
                    "records": [
                        {"fields": {"status": "open"}},
                        {"fields": {"status": "closed"}}
                    ]
                }));
            then.status(200).json_body(json!({
                "records": [
                    {"id": "recN1", "fields": {"status": "open"}},
                    {"id": "recN2", "fields": {"status": "closed"}}
                ]
            }));
        });

        let ids = client(&server)
            .create_batch(&[status_fields("open"), status_fields("closed")])
            .expect("create");
        post.assert();
        assert_eq!(ids, vec![RecordId::from("recN1"), RecordId::from("recN2")]);
    }

    #[test]
    fn batch_size_matches_api_limit() {
        let server = MockServer::start();
        assert_eq!(client(&server).max_batch_size(), MAX_RECORDS_PER_REQUEST);
    }
}

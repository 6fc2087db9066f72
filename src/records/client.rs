//! HTTP client for the Cosmos DB SQL REST API.

use crate::config::Config;
use crate::polling::format_endpoint;
use crate::records::{
    RecordStore,
    auth::{MasterKey, rfc1123},
    types::{NewResumeRecord, ResumeRecord, StoreError},
};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode, header::CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{Value, json};
use time::OffsetDateTime;
use tokio::sync::OnceCell;
use uuid::Uuid;

const COSMOS_API_VERSION: &str = "2018-12-31";
const PARTITION_KEY_PATH: &str = "/name";
const FILE_NAME_QUERY: &str = "SELECT * FROM c WHERE c.fileName = @filename";

/// Resume record store backed by a partitioned Cosmos DB collection.
pub struct CosmosRecordStore {
    client: Client,
    endpoint: String,
    key: MasterKey,
    database: String,
    container: String,
    schema_ready: OnceCell<()>,
}

impl CosmosRecordStore {
    /// Construct a store from the loaded configuration.
    pub fn new(config: &Config) -> Result<Self, StoreError> {
        Self::connect(
            &config.cosmos_endpoint,
            &config.cosmos_key,
            &config.cosmos_database,
            &config.cosmos_container,
        )
    }

    /// Construct a store for an explicit account, database, and collection.
    pub fn connect(
        endpoint: &str,
        master_key: &str,
        database: &str,
        container: &str,
    ) -> Result<Self, StoreError> {
        let client = Client::builder().user_agent("resume-insights/0.1").build()?;
        let key = MasterKey::decode(master_key).map_err(StoreError::InvalidKey)?;
        tracing::debug!(endpoint, database, container, "Initialized document store client");
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            key,
            database: database.to_string(),
            container: container.to_string(),
            schema_ready: OnceCell::new(),
        })
    }

    /// Create the database and partitioned collection when missing.
    ///
    /// Runs against the service at most once per store instance.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        self.schema_ready
            .get_or_try_init(|| async {
                self.create_if_absent("dbs", "dbs", "", json!({ "id": self.database }))
                    .await?;
                let database_link = self.database_link();
                self.create_if_absent(
                    &format!("{database_link}/colls"),
                    "colls",
                    &database_link,
                    json!({
                        "id": self.container,
                        "partitionKey": { "paths": [PARTITION_KEY_PATH], "kind": "Hash" }
                    }),
                )
                .await?;
                tracing::debug!(
                    database = %self.database,
                    container = %self.container,
                    "Document store schema ready"
                );
                Ok::<(), StoreError>(())
            })
            .await?;
        Ok(())
    }

    fn database_link(&self) -> String {
        format!("dbs/{}", self.database)
    }

    fn collection_link(&self) -> String {
        format!("dbs/{}/colls/{}", self.database, self.container)
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        resource_type: &str,
        resource_link: &str,
    ) -> Result<RequestBuilder, StoreError> {
        let date = rfc1123(OffsetDateTime::now_utc())?;
        let authorization = self
            .key
            .authorization(method.as_str(), resource_type, resource_link, &date)
            .map_err(StoreError::InvalidKey)?;
        Ok(self
            .client
            .request(method, format_endpoint(&self.endpoint, path))
            .header("authorization", authorization)
            .header("x-ms-date", date)
            .header("x-ms-version", COSMOS_API_VERSION))
    }

    async fn create_if_absent(
        &self,
        path: &str,
        resource_type: &str,
        resource_link: &str,
        body: Value,
    ) -> Result<(), StoreError> {
        let response = self
            .request(Method::POST, path, resource_type, resource_link)?
            .json(&body)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                tracing::info!(resource_type, id = %body["id"], "Created document store resource");
                Ok(())
            }
            StatusCode::CONFLICT => {
                tracing::debug!(resource_type, id = %body["id"], "Document store resource exists");
                Ok(())
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                let error = StoreError::UnexpectedStatus { status, body };
                tracing::error!(resource_type, error = %error, "Failed to ensure resource");
                Err(error)
            }
        }
    }
}

#[async_trait]
impl RecordStore for CosmosRecordStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        CosmosRecordStore::ensure_schema(self).await
    }

    async fn create_record(&self, record: NewResumeRecord) -> Result<ResumeRecord, StoreError> {
        self.ensure_schema().await?;

        let record = record.into_record(Uuid::new_v4().to_string(), current_timestamp_rfc3339());
        let link = self.collection_link();
        let response = self
            .request(Method::POST, &format!("{link}/docs"), "docs", &link)?
            .header(
                "x-ms-documentdb-partitionkey",
                serde_json::to_string(&[&record.name])?,
            )
            .json(&record)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = StoreError::UnexpectedStatus { status, body };
            tracing::error!(file_name = %record.file_name, error = %error, "Failed to store resume record");
            return Err(error);
        }

        tracing::info!(
            id = %record.id,
            name = %record.name,
            file_name = %record.file_name,
            "Stored resume record"
        );
        Ok(record)
    }

    async fn find_by_file_name(&self, file_name: &str) -> Result<Option<ResumeRecord>, StoreError> {
        let link = self.collection_link();
        let body = serde_json::to_vec(&json!({
            "query": FILE_NAME_QUERY,
            "parameters": [{ "name": "@filename", "value": file_name }]
        }))?;
        let mut continuation: Option<String> = None;

        loop {
            let mut request = self
                .request(Method::POST, &format!("{link}/docs"), "docs", &link)?
                .header(CONTENT_TYPE, "application/query+json")
                .header("x-ms-documentdb-isquery", "True")
                .header("x-ms-documentdb-query-enablecrosspartition", "True")
                .body(body.clone());
            if let Some(token) = &continuation {
                request = request.header("x-ms-continuation", token.as_str());
            }

            let response = request.send().await?;
            if response.status() == StatusCode::NOT_FOUND {
                tracing::debug!(file_name, "Collection missing; no records yet");
                return Ok(None);
            }
            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                let error = StoreError::UnexpectedStatus { status, body };
                tracing::error!(file_name, error = %error, "Resume query failed");
                return Err(error);
            }

            let next = response
                .headers()
                .get("x-ms-continuation")
                .and_then(|value| value.to_str().ok())
                .filter(|value| !value.is_empty())
                .map(str::to_string);
            let page: QueryPage = response.json().await?;
            if let Some(record) = page.documents.into_iter().next() {
                return Ok(Some(record));
            }

            match next {
                Some(token) => continuation = Some(token),
                None => return Ok(None),
            }
        }
    }
}

#[derive(Deserialize)]
struct QueryPage {
    #[serde(rename = "Documents", default)]
    documents: Vec<ResumeRecord>,
}

/// Current timestamp formatted for record storage.
fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::EntityMention;
    use httpmock::{Method::POST, MockServer};

    fn store(server: &MockServer) -> CosmosRecordStore {
        CosmosRecordStore::connect(
            &server.base_url(),
            "Y29zbW9zLXRlc3QtbWFzdGVyLWtleQ==",
            "resumes",
            "records",
        )
        .expect("store")
    }

    fn new_record(file_name: &str) -> NewResumeRecord {
        NewResumeRecord {
            name: "Jane Doe".into(),
            entities: vec![EntityMention::new("Acme Corp", "Organization")],
            file_name: file_name.into(),
            key_phrases: vec!["cloud".into()],
            summary: "Engineer.".into(),
        }
    }

    #[tokio::test]
    async fn create_record_ensures_schema_once_and_partitions_by_name() {
        let server = MockServer::start_async().await;
        let database = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/dbs")
                    .header("x-ms-version", COSMOS_API_VERSION)
                    .header_exists("x-ms-date")
                    .json_body(json!({ "id": "resumes" }));
                then.status(409).body("Conflict");
            })
            .await;
        let collection = server
            .mock_async(|when, then| {
                when.method(POST).path("/dbs/resumes/colls").json_body(json!({
                    "id": "records",
                    "partitionKey": { "paths": ["/name"], "kind": "Hash" }
                }));
                then.status(201).json_body(json!({ "id": "records" }));
            })
            .await;
        let documents = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/dbs/resumes/colls/records/docs")
                    .header("x-ms-documentdb-partitionkey", r#"["Jane Doe"]"#)
                    .json_body_partial(r#"{ "fileName": "cv.pdf", "name": "Jane Doe" }"#);
                then.status(201).json_body(json!({}));
            })
            .await;

        let store = store(&server);
        let first = store.create_record(new_record("cv.pdf")).await.expect("first");
        let second = store.create_record(new_record("cv.pdf")).await.expect("second");

        database.assert_hits(1);
        collection.assert_hits(1);
        documents.assert_hits(2);
        assert_ne!(first.id, second.id, "re-ingest creates a distinct record");
        assert_eq!(first.file_name, "cv.pdf");
        assert!(OffsetDateTime::parse(
            &first.upload_time,
            &time::format_description::well_known::Rfc3339
        )
        .is_ok());
    }

    #[tokio::test]
    async fn schema_failure_aborts_the_write() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/dbs");
                then.status(401).body("unauthorized");
            })
            .await;
        let documents = server
            .mock_async(|when, then| {
                when.method(POST).path("/dbs/resumes/colls/records/docs");
                then.status(201);
            })
            .await;

        let error = store(&server)
            .create_record(new_record("cv.pdf"))
            .await
            .expect_err("unauthorized");

        assert!(matches!(error, StoreError::UnexpectedStatus { status, .. } if status == StatusCode::UNAUTHORIZED));
        documents.assert_hits(0);
    }

    #[tokio::test]
    async fn find_by_file_name_returns_first_cross_partition_match() {
        let server = MockServer::start_async().await;
        let query = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/dbs/resumes/colls/records/docs")
                    .header("content-type", "application/query+json")
                    .header("x-ms-documentdb-isquery", "True")
                    .header("x-ms-documentdb-query-enablecrosspartition", "True")
                    .json_body(json!({
                        "query": FILE_NAME_QUERY,
                        "parameters": [{ "name": "@filename", "value": "cv.pdf" }]
                    }));
                then.status(200).json_body(json!({
                    "_rid": "x",
                    "Documents": [
                        { "id": "a", "fileName": "cv.pdf", "name": "Jane Doe", "summary": "", "key_phrases": [], "entities": [], "uploadTime": "t1" },
                        { "id": "b", "fileName": "cv.pdf", "name": "Jane D.", "summary": "", "key_phrases": [], "entities": [], "uploadTime": "t2" }
                    ],
                    "_count": 2
                }));
            })
            .await;

        let record = store(&server)
            .find_by_file_name("cv.pdf")
            .await
            .expect("query")
            .expect("record");

        query.assert();
        assert_eq!(record.id, "a");
        assert_eq!(record.name, "Jane Doe");
    }

    #[tokio::test]
    async fn find_by_file_name_without_matches_is_none() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/dbs/resumes/colls/records/docs");
                then.status(200)
                    .json_body(json!({ "Documents": [], "_count": 0 }));
            })
            .await;

        let record = store(&server).find_by_file_name("missing.pdf").await.expect("query");
        assert!(record.is_none());
    }

    #[tokio::test]
    async fn missing_collection_reads_as_no_match() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/dbs/resumes/colls/records/docs");
                then.status(404).body("Resource Not Found");
            })
            .await;

        let record = store(&server).find_by_file_name("cv.pdf").await.expect("query");
        assert!(record.is_none());
    }
}

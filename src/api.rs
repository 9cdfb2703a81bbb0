//! HTTP client for the remote tabular-data service.
//!
//! Every method is a single blocking request/response exchange. Callers run
//! these on worker threads; nothing here touches UI state. Errors are
//! normalized into the two-way split the UI cares about: a structured
//! message from the service, or a transport failure with no usable message.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One row of a query result. Keys keep the order the backend sent them in;
/// all rows of a result set are assumed to share the first row's key set.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Output formats the conversion endpoint accepts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Parquet,
    Csv,
}

impl OutputFormat {
    pub const ALL: [Self; 2] = [Self::Parquet, Self::Csv];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Parquet => "Parquet",
            Self::Csv => "CSV",
        }
    }

    /// Wire value for the `output_format` multipart field. The service keys
    /// its converters by extension, dot included.
    pub fn as_field(self) -> &'static str {
        match self {
            Self::Parquet => ".parquet",
            Self::Csv => ".csv",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "parquet" => Some(Self::Parquet),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }
}

/// How the save endpoint treats an existing table of the same name.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    #[default]
    Append,
    Overwrite,
}

impl WriteMode {
    pub const ALL: [Self; 2] = [Self::Append, Self::Overwrite];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Append => "Append",
            Self::Overwrite => "Overwrite",
        }
    }

    /// Wire value for the `write_mode` multipart field.
    pub fn as_field(self) -> &'static str {
        match self {
            Self::Append => "append",
            Self::Overwrite => "overwrite",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "append" => Some(Self::Append),
            "overwrite" => Some(Self::Overwrite),
            _ => None,
        }
    }
}

/// Upload-and-convert request. Built from the Convert form on submit,
/// consumed by one dispatch, not retained.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file: PathBuf,
    pub output_format: OutputFormat,
}

/// Save-to-table request. Same lifecycle as [`UploadRequest`].
#[derive(Debug, Clone)]
pub struct SaveTableRequest {
    pub file: PathBuf,
    pub table_name: String,
    pub write_mode: WriteMode,
}

/// Ad-hoc query request. `table_name` may also carry a storage path from a
/// prior upload; an empty string is permitted and left for the service to
/// accept or reject.
#[derive(Debug, Clone, Serialize)]
pub struct QueryRequest {
    pub table_name: String,
    pub sql: String,
}

/// Successful `/uploadfile/` response.
#[derive(Debug, Clone, Deserialize)]
pub struct Converted {
    pub file_path: String,
}

/// Successful `/savetable/` response.
#[derive(Debug, Clone, Deserialize)]
pub struct Saved {
    pub destination: String,
}

#[derive(Deserialize)]
struct TablesResponse {
    tables: Vec<String>,
}

#[derive(Deserialize)]
struct QueryResponse {
    result: Vec<Record>,
}

/// Failure bodies carry the message under `detail` (file endpoints) or
/// `error` (query endpoint).
#[derive(Deserialize)]
struct BackendMessage {
    detail: Option<String>,
    error: Option<String>,
}

/// Outcome of a single dispatch against the service.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Non-2xx response with a structured message field; shown verbatim.
    #[error("{0}")]
    Backend(String),
    /// The exchange produced no usable message: network failure, malformed
    /// body, or a non-2xx response without a message field.
    #[error("{0}")]
    Transport(String),
}

impl ApiError {
    /// User-facing message for this failure. Backend messages are surfaced
    /// verbatim; transport details are logged and replaced with the
    /// workflow's generic fallback.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Backend(msg) => msg.clone(),
            ApiError::Transport(detail) => {
                log::debug!("transport failure: {detail}");
                fallback.to_string()
            }
        }
    }
}

/// Client for the tabular-data service. Cheap to clone; worker threads take
/// a clone per dispatch.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl ApiClient {
    /// Create a client for the service at `base_url`. No request timeout is
    /// set: operation latency is owned by the service, and a hung call is
    /// surfaced to the user as a workflow that stays pending.
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(None::<std::time::Duration>)
            .build()
            .unwrap_or_else(|_| reqwest::blocking::Client::new());

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Upload a file and convert it to the requested format.
    pub fn convert(&self, req: &UploadRequest) -> Result<Converted, ApiError> {
        let form = reqwest::blocking::multipart::Form::new()
            .file("file", &req.file)
            .map_err(|e| {
                ApiError::Transport(format!("could not read {}: {}", req.file.display(), e))
            })?
            .text("output_format", req.output_format.as_field());

        let response = self
            .client
            .post(self.endpoint("/uploadfile/"))
            .multipart(form)
            .send()
            .map_err(transport)?;
        parse_response(response)
    }

    /// Upload a file and persist it as a named table.
    pub fn save_table(&self, req: &SaveTableRequest) -> Result<Saved, ApiError> {
        let form = reqwest::blocking::multipart::Form::new()
            .file("file", &req.file)
            .map_err(|e| {
                ApiError::Transport(format!("could not read {}: {}", req.file.display(), e))
            })?
            .text("table_name", req.table_name.clone())
            .text("write_mode", req.write_mode.as_field());

        let response = self
            .client
            .post(self.endpoint("/savetable/"))
            .multipart(form)
            .send()
            .map_err(transport)?;
        parse_response(response)
    }

    /// List the tables the service knows about.
    pub fn list_tables(&self) -> Result<Vec<String>, ApiError> {
        let response = self
            .client
            .get(self.endpoint("/tables/"))
            .send()
            .map_err(transport)?;
        let parsed: TablesResponse = parse_response(response)?;
        Ok(parsed.tables)
    }

    /// Run a query and return its rows.
    pub fn query(&self, req: &QueryRequest) -> Result<Vec<Record>, ApiError> {
        let response = self
            .client
            .post(self.endpoint("/query/"))
            .json(req)
            .send()
            .map_err(transport)?;
        let parsed: QueryResponse = parse_response(response)?;
        Ok(parsed.result)
    }

    /// URL of the download endpoint for a converted file.
    pub fn download_url(&self, file_path: &str) -> String {
        format!("{}/download/{}", self.base_url, file_path)
    }
}

fn transport(err: reqwest::Error) -> ApiError {
    ApiError::Transport(err.to_string())
}

fn parse_response<T: serde::de::DeserializeOwned>(
    response: reqwest::blocking::Response,
) -> Result<T, ApiError> {
    let status = response.status();
    let body = response.text().map_err(transport)?;

    if !status.is_success() {
        if let Ok(msg) = serde_json::from_str::<BackendMessage>(&body) {
            if let Some(text) = msg.detail.or(msg.error) {
                return Err(ApiError::Backend(text));
            }
        }
        return Err(ApiError::Transport(format!("server returned {status}")));
    }

    serde_json::from_str(&body)
        .map_err(|e| ApiError::Transport(format!("malformed response body: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_csv() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "name,age").unwrap();
        writeln!(file, "Alice,30").unwrap();
        writeln!(file, "Bob,25").unwrap();
        file
    }

    #[test]
    fn test_convert_returns_file_path() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/uploadfile/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"file_path": "data/output_1.parquet"}"#)
            .create();

        let file = sample_csv();
        let client = ApiClient::new(server.url());
        let converted = client
            .convert(&UploadRequest {
                file: file.path().to_path_buf(),
                output_format: OutputFormat::Parquet,
            })
            .unwrap();

        assert_eq!(converted.file_path, "data/output_1.parquet");
        mock.assert();
    }

    #[test]
    fn test_convert_missing_file_is_transport_error() {
        // The request must fail before any network activity.
        let client = ApiClient::new("http://127.0.0.1:1");
        let err = client
            .convert(&UploadRequest {
                file: PathBuf::from("/no/such/file.csv"),
                output_format: OutputFormat::Csv,
            })
            .unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
    }

    #[test]
    fn test_save_table_returns_destination_verbatim() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/savetable/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"destination": "warehouse.t1"}"#)
            .create();

        let file = sample_csv();
        let client = ApiClient::new(server.url());
        let saved = client
            .save_table(&SaveTableRequest {
                file: file.path().to_path_buf(),
                table_name: "t1".to_string(),
                write_mode: WriteMode::Append,
            })
            .unwrap();

        assert_eq!(saved.destination, "warehouse.t1");
    }

    #[test]
    fn test_query_parses_records_in_order() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/query/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"result": [{"a": 1, "b": 2}, {"a": 3, "b": 4}]}"#)
            .create();

        let client = ApiClient::new(server.url());
        let records = client
            .query(&QueryRequest {
                table_name: "t1".to_string(),
                sql: "SELECT * FROM self".to_string(),
            })
            .unwrap();

        assert_eq!(records.len(), 2);
        let keys: Vec<&String> = records[0].keys().collect();
        assert_eq!(keys, ["a", "b"]);
        assert_eq!(records[1]["b"], serde_json::json!(4));
    }

    #[test]
    fn test_query_error_field_surfaced_verbatim() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/query/")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": "syntax error"}"#)
            .create();

        let client = ApiClient::new(server.url());
        let err = client
            .query(&QueryRequest {
                table_name: "t1".to_string(),
                sql: "SELEC".to_string(),
            })
            .unwrap_err();

        assert!(matches!(&err, ApiError::Backend(msg) if msg == "syntax error"));
        assert_eq!(err.user_message("fallback"), "syntax error");
    }

    #[test]
    fn test_detail_field_surfaced_verbatim() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/uploadfile/")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"detail": "Unsupported file format: .xlsx"}"#)
            .create();

        let file = sample_csv();
        let client = ApiClient::new(server.url());
        let err = client
            .convert(&UploadRequest {
                file: file.path().to_path_buf(),
                output_format: OutputFormat::Parquet,
            })
            .unwrap_err();

        assert_eq!(
            err.user_message("An error occurred during upload."),
            "Unsupported file format: .xlsx"
        );
    }

    #[test]
    fn test_non_2xx_without_message_falls_back() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/query/")
            .with_status(502)
            .with_body("Bad Gateway")
            .create();

        let client = ApiClient::new(server.url());
        let err = client
            .query(&QueryRequest {
                table_name: String::new(),
                sql: "SELECT 1".to_string(),
            })
            .unwrap_err();

        assert!(matches!(err, ApiError::Transport(_)));
        assert_eq!(
            err.user_message("An error occurred while running the query."),
            "An error occurred while running the query."
        );
    }

    #[test]
    fn test_malformed_success_body_is_transport_error() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/tables/")
            .with_status(200)
            .with_body("not json")
            .create();

        let client = ApiClient::new(server.url());
        assert!(matches!(
            client.list_tables().unwrap_err(),
            ApiError::Transport(_)
        ));
    }

    #[test]
    fn test_list_tables() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/tables/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"tables": ["trades", "quotes"]}"#)
            .create();

        let client = ApiClient::new(server.url());
        assert_eq!(client.list_tables().unwrap(), ["trades", "quotes"]);
    }

    #[test]
    fn test_download_url() {
        let client = ApiClient::new("http://localhost:8000/");
        assert_eq!(
            client.download_url("data/output_1.parquet"),
            "http://localhost:8000/download/data/output_1.parquet"
        );
    }
}

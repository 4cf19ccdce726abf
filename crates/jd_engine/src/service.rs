use std::path::Path;
use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::types::TextExtractRequest;
use crate::{
    ExtractError, ExtractedData, FailureKind, HealthResponse, ProgressResponse, ServiceError,
    StatusResponse, SubmitResponse, UploadResponse,
};

const SPREADSHEET_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const ALLOWED_EXTENSIONS: [&str; 2] = ["xlsx", "xls"];

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Root of the versioned API, e.g. `http://localhost:8000/api/v1/`.
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_download_bytes: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api/v1/".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            max_download_bytes: 50 * 1024 * 1024,
        }
    }
}

/// A spreadsheet file as picked by the user, kept for resubmission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub bytes: Bytes,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Rejects files the service would refuse anyway, before any request.
    pub fn validate(&self) -> Result<(), ExtractError> {
        let extension = Path::new(&self.name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension {
            Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => {}
            _ => {
                return Err(ExtractError::Validation(format!(
                    "'{}' is not an .xlsx or .xls file",
                    self.name
                )))
            }
        }
        if self.bytes.is_empty() {
            return Err(ExtractError::Validation(format!("'{}' is empty", self.name)));
        }
        Ok(())
    }
}

/// Parameters of a job submission.
#[derive(Debug, Clone, Copy)]
pub struct SubmitRequest<'a> {
    pub file: &'a SourceFile,
    pub sheet_id: &'a str,
    pub sheet_name: &'a str,
    pub column_index: usize,
}

/// The remote extraction service. Polling calls are idempotent reads.
#[async_trait::async_trait]
pub trait ExtractionService: Send + Sync {
    async fn upload(&self, file: &SourceFile) -> Result<UploadResponse, ServiceError>;

    async fn submit(&self, request: SubmitRequest<'_>) -> Result<SubmitResponse, ServiceError>;

    async fn status(&self, request_id: &str) -> Result<StatusResponse, ServiceError>;

    async fn progress(&self, request_id: &str) -> Result<ProgressResponse, ServiceError>;

    async fn extract_text(&self, text: &str) -> Result<ExtractedData, ServiceError>;

    async fn download(&self, request_id: &str) -> Result<Bytes, ServiceError>;

    async fn health(&self) -> Result<HealthResponse, ServiceError>;
}

#[derive(Debug, Clone)]
pub struct HttpExtractionService {
    settings: ServiceSettings,
    base: Url,
    client: reqwest::Client,
}

impl HttpExtractionService {
    pub fn new(settings: ServiceSettings) -> Result<Self, ServiceError> {
        let mut base = settings.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base = Url::parse(&base)
            .map_err(|err| ServiceError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(ServiceError::new(
                FailureKind::InvalidUrl,
                format!("{base} cannot be used as a base url"),
            ));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ServiceError::new(FailureKind::Network, err.to_string()))?;

        Ok(Self {
            settings,
            base,
            client,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ServiceError> {
        self.base
            .join(path)
            .map_err(|err| ServiceError::new(FailureKind::InvalidUrl, err.to_string()))
    }

    /// `{base}/{path}/{request_id}` with the id escaped as one segment.
    fn job_endpoint(&self, path: &str, request_id: &str) -> Result<Url, ServiceError> {
        let mut url = self.endpoint(path)?;
        url.path_segments_mut()
            .map_err(|_| ServiceError::new(FailureKind::InvalidUrl, "base url has no path"))?
            .pop_if_empty()
            .push(request_id);
        Ok(url)
    }

    fn file_part(file: &SourceFile) -> Result<Part, ServiceError> {
        Part::bytes(file.bytes.to_vec())
            .file_name(file.name.clone())
            .mime_str(SPREADSHEET_MIME)
            .map_err(|err| ServiceError::new(FailureKind::Network, err.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ServiceError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_json(response).await
    }
}

#[async_trait::async_trait]
impl ExtractionService for HttpExtractionService {
    async fn upload(&self, file: &SourceFile) -> Result<UploadResponse, ServiceError> {
        let form = Form::new().part("file", Self::file_part(file)?);
        let response = self
            .client
            .post(self.endpoint("excel/upload")?)
            .multipart(form)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_json(response).await
    }

    async fn submit(&self, request: SubmitRequest<'_>) -> Result<SubmitResponse, ServiceError> {
        let form = Form::new()
            .part("file", Self::file_part(request.file)?)
            .text("sheet_id", request.sheet_id.to_string())
            .text("sheet_name", request.sheet_name.to_string())
            .text("jd_column_index", request.column_index.to_string());
        let response = self
            .client
            .post(self.endpoint("excel/extract")?)
            .multipart(form)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_json(response).await
    }

    async fn status(&self, request_id: &str) -> Result<StatusResponse, ServiceError> {
        self.get_json(self.job_endpoint("excel/status", request_id)?)
            .await
    }

    async fn progress(&self, request_id: &str) -> Result<ProgressResponse, ServiceError> {
        self.get_json(self.job_endpoint("progress", request_id)?)
            .await
    }

    async fn extract_text(&self, text: &str) -> Result<ExtractedData, ServiceError> {
        let response = self
            .client
            .post(self.endpoint("text/extract")?)
            .json(&TextExtractRequest { jd_text: text })
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_json(response).await
    }

    async fn download(&self, request_id: &str) -> Result<Bytes, ServiceError> {
        let response = self
            .client
            .get(self.job_endpoint("excel/download", request_id)?)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let response = check_status(response)?;

        let max_bytes = self.settings.max_download_bytes;
        if let Some(content_len) = response.content_length() {
            if content_len > max_bytes {
                return Err(ServiceError::new(
                    FailureKind::TooLarge {
                        max_bytes,
                        actual: Some(content_len),
                    },
                    "result file too large",
                ));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > max_bytes {
                return Err(ServiceError::new(
                    FailureKind::TooLarge {
                        max_bytes,
                        actual: Some(next_len),
                    },
                    "result file too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(Bytes::from(bytes))
    }

    async fn health(&self) -> Result<HealthResponse, ServiceError> {
        self.get_json(self.endpoint("health")?).await
    }
}

fn check_status(response: Response) -> Result<Response, ServiceError> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(ServiceError::new(FailureKind::NotFound, status.to_string()));
    }
    if !status.is_success() {
        return Err(ServiceError::new(
            FailureKind::HttpStatus(status.as_u16()),
            status.to_string(),
        ));
    }
    Ok(response)
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ServiceError> {
    let response = check_status(response)?;
    let body = response.bytes().await.map_err(map_reqwest_error)?;
    serde_json::from_slice(&body)
        .map_err(|err| ServiceError::new(FailureKind::Decode, err.to_string()))
}

fn map_reqwest_error(err: reqwest::Error) -> ServiceError {
    if err.is_timeout() {
        return ServiceError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return ServiceError::new(FailureKind::Decode, err.to_string());
    }
    ServiceError::new(FailureKind::Network, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_spreadsheets_pass_validation() {
        assert!(SourceFile::new("jobs.xlsx", vec![1u8]).validate().is_ok());
        assert!(SourceFile::new("OLD.XLS", vec![1u8]).validate().is_ok());
        assert!(matches!(
            SourceFile::new("jobs.csv", vec![1u8]).validate(),
            Err(ExtractError::Validation(_))
        ));
        assert!(matches!(
            SourceFile::new("jobs.xlsx", Vec::<u8>::new()).validate(),
            Err(ExtractError::Validation(_))
        ));
    }

    #[test]
    fn job_endpoint_escapes_request_id() {
        let service = HttpExtractionService::new(ServiceSettings {
            base_url: "http://localhost:8000/api/v1".to_string(),
            ..ServiceSettings::default()
        })
        .unwrap();
        let url = service.job_endpoint("excel/status", "a b/c").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/v1/excel/status/a%20b%2Fc");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = HttpExtractionService::new(ServiceSettings {
            base_url: "not a url".to_string(),
            ..ServiceSettings::default()
        })
        .unwrap_err();
        assert_eq!(err.kind, FailureKind::InvalidUrl);
    }
}

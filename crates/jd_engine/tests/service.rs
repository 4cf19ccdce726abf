use std::time::Duration;

use jd_engine::{
    ExtractionService, FailureKind, HttpExtractionService, PollFailure, ServiceSettings,
    SourceFile, SubmitRequest,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn service_for(server: &MockServer) -> HttpExtractionService {
    service_with(server, ServiceSettings::default())
}

fn service_with(server: &MockServer, settings: ServiceSettings) -> HttpExtractionService {
    HttpExtractionService::new(ServiceSettings {
        base_url: format!("{}/api/v1", server.uri()),
        ..settings
    })
    .unwrap()
}

fn workbook_file() -> SourceFile {
    SourceFile::new("jobs.xlsx", b"PK\x03\x04fake".to_vec())
}

#[tokio::test]
async fn upload_returns_sheets() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/excel/upload"))
        .and(header_regex("content-type", "^multipart/form-data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "fileName": "jobs.xlsx",
            "sheets": [
                {"id": "sheet_0_Open", "name": "Open", "headers": ["Title", "JD"],
                 "rows": [["Dev", "Rust role"]], "totalRows": 1},
                {"id": "sheet_1_Closed", "name": "Closed", "headers": [], "rows": [], "totalRows": 0}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let upload = service_for(&server).upload(&workbook_file()).await.unwrap();
    assert_eq!(upload.file_name, "jobs.xlsx");
    let names: Vec<_> = upload.sheets.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Open", "Closed"]);
    assert_eq!(upload.sheets[0].rows[0][1], "Rust role");
}

#[tokio::test]
async fn submit_returns_request_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/excel/extract"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "request_id": "req-42",
            "status": "processing",
            "message": "Processing 3 job descriptions"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let file = workbook_file();
    let response = service_for(&server)
        .submit(SubmitRequest {
            file: &file,
            sheet_id: "sheet_0_Open",
            sheet_name: "Open",
            column_index: 1,
        })
        .await
        .unwrap();
    assert_eq!(response.request_id, "req-42");
    assert_eq!(response.status, "processing");
}

#[tokio::test]
async fn submit_server_error_is_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/excel/extract"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let file = workbook_file();
    let err = service_for(&server)
        .submit(SubmitRequest {
            file: &file,
            sheet_id: "s",
            sheet_name: "S",
            column_index: 0,
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(500));
    assert_eq!(err.poll_failure(), PollFailure::Transport);
}

#[tokio::test]
async fn status_carries_results_when_complete() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/excel/status/req-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "complete",
            "request_id": "req-1",
            "results": [
                {"row_index": 0, "original_jd": "Rust role",
                 "extracted_data": {"bill_rate": "100", "skills": ["Go", "Rust"], "msp_owner": "Bob"}}
            ],
            "total_processed": 1,
            "success_count": 1,
            "failure_count": 0
        })))
        .mount(&server)
        .await;

    let status = service_for(&server).status("req-1").await.unwrap();
    assert!(status.is_complete());
    assert_eq!(status.summary().success_count, 1);
    let results = status.into_results();
    let record = &results[&0];
    assert_eq!(record.owner.as_deref(), Some("Bob"));
    assert_eq!(record.derived_values()[5], "Go, Rust");
}

#[tokio::test]
async fn unknown_progress_is_not_ready() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/progress/req-9"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "not found"})))
        .mount(&server)
        .await;

    let err = service_for(&server).progress("req-9").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::NotFound);
    assert_eq!(err.poll_failure(), PollFailure::NotReady);
}

#[tokio::test]
async fn progress_decodes_counts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/progress/req-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "request_id": "req-1", "total": 4, "processed": 2, "complete": false
        })))
        .mount(&server)
        .await;

    let progress = service_for(&server).progress("req-1").await.unwrap();
    assert_eq!((progress.processed, progress.total), (2, 4));
    assert!(!progress.complete);
}

#[tokio::test]
async fn malformed_body_is_decode_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/progress/req-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let err = service_for(&server).progress("req-1").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Decode);
}

#[tokio::test]
async fn slow_status_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/excel/status/req-1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_json(json!({"status": "processing"})),
        )
        .mount(&server)
        .await;

    let service = service_with(
        &server,
        ServiceSettings {
            request_timeout: Duration::from_millis(50),
            ..ServiceSettings::default()
        },
    );
    let err = service.status("req-1").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Timeout);
}

#[tokio::test]
async fn download_returns_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/excel/download/req-1"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PK\x03\x04xlsx".to_vec()))
        .mount(&server)
        .await;

    let bytes = service_for(&server).download("req-1").await.unwrap();
    assert_eq!(&bytes[..], b"PK\x03\x04xlsx");
}

#[tokio::test]
async fn download_over_cap_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/excel/download/req-1"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 11]))
        .mount(&server)
        .await;

    let service = service_with(
        &server,
        ServiceSettings {
            max_download_bytes: 10,
            ..ServiceSettings::default()
        },
    );
    let err = service.download("req-1").await.unwrap_err();
    assert_eq!(
        err.kind,
        FailureKind::TooLarge {
            max_bytes: 10,
            actual: Some(11)
        }
    );
}

#[tokio::test]
async fn text_extract_posts_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/text/extract"))
        .and(body_json(json!({"jd_text": "Senior Rust engineer, remote"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ai_location": "Remote",
            "skills": ["Rust"],
            "ai_extraction_status": "success"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let data = service_for(&server)
        .extract_text("Senior Rust engineer, remote")
        .await
        .unwrap();
    assert_eq!(data.ai_location.as_deref(), Some("Remote"));
    assert_eq!(data.skills, Some(vec!["Rust".to_string()]));
}

#[tokio::test]
async fn health_reports_service() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "healthy", "service": "jd-extraction", "version": "1.0.0"
        })))
        .mount(&server)
        .await;

    let health = service_for(&server).health().await.unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.version.as_deref(), Some("1.0.0"));
}

//! REST API types for upload responses.
//!
//! Every import result maps to one status code and one JSON body:
//!
//! | Result                 | Status | Body                                            |
//! |------------------------|--------|-------------------------------------------------|
//! | Accepted               | 200    | `{ "message", "recordsSaved" }`                 |
//! | Rejected headers       | 400    | `{ "error": "Invalid column headers" }`         |
//! | Row failures           | 400    | `{ "errors": [ { "sheet", "row", "errors" } ] }` |
//! | Unreadable file        | 400    | `{ "error": "Invalid spreadsheet file" }`       |
//! | Unknown sheet          | 400    | `{ "error": "Sheet not found: <name>" }`        |
//! | Persistence failure    | 500    | `{ "error": "Database insertion error" }`       |
//! | Worker stopped         | 500    | `{ "error": "Import interrupted" }`             |

use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{ExtractError, ImportError, ServerError};
use crate::models::{ImportOutcome, RowError};

pub const MSG_SUCCESS: &str = "File processed successfully";
pub const MSG_NO_FILE: &str = "No file uploaded";
pub const MSG_INVALID_FILE: &str = "Invalid spreadsheet file";
pub const MSG_TOO_LARGE: &str = "File too large";
pub const MSG_DB_ERROR: &str = "Database insertion error";
pub const MSG_INTERRUPTED: &str = "Import interrupted";

/// Status code and JSON body returned by the upload endpoint.
pub type ApiResponse = (StatusCode, Json<Value>);

/// Response sent after a successful import.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    pub message: String,
    /// Number of records written
    pub records_saved: usize,
}

/// Response listing every failing row of a submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorsResponse {
    pub errors: Vec<RowError>,
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "error": error
    })
}

fn error_with(status: StatusCode, error: &str) -> ApiResponse {
    (status, Json(error_response(error)))
}

/// Map a completed import to its HTTP response.
pub fn outcome_response(outcome: &ImportOutcome) -> ApiResponse {
    match outcome {
        ImportOutcome::Accepted { count, .. } => {
            let body = ImportResponse {
                message: MSG_SUCCESS.to_string(),
                records_saved: *count,
            };
            (StatusCode::OK, Json(json!(body)))
        }
        ImportOutcome::Rejected(reason) => error_with(StatusCode::BAD_REQUEST, &reason.to_string()),
        ImportOutcome::ValidationFailed(errors) => {
            let body = ValidationErrorsResponse { errors: errors.clone() };
            (StatusCode::BAD_REQUEST, Json(json!(body)))
        }
    }
}

/// Map a fatal import error to its HTTP response.
///
/// Store details stay in the server log; clients get a fixed message.
pub fn import_error_response(error: &ImportError) -> ApiResponse {
    match error {
        ImportError::Extract(e @ ExtractError::SheetNotFound(_)) => {
            error_with(StatusCode::BAD_REQUEST, &e.to_string())
        }
        ImportError::Extract(_) => error_with(StatusCode::BAD_REQUEST, MSG_INVALID_FILE),
        ImportError::Persistence(_) => error_with(StatusCode::INTERNAL_SERVER_ERROR, MSG_DB_ERROR),
        ImportError::Worker(_) => error_with(StatusCode::INTERNAL_SERVER_ERROR, MSG_INTERRUPTED),
    }
}

/// Map a request handling error to its HTTP response.
pub fn server_error_response(error: &ServerError) -> ApiResponse {
    match error {
        ServerError::BadRequest(msg) => error_with(StatusCode::BAD_REQUEST, msg),
        ServerError::Store(_) => error_with(StatusCode::INTERNAL_SERVER_ERROR, MSG_DB_ERROR),
        ServerError::Io(e) => error_with(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::models::{Field, RejectReason, ValidatedRecord};
    use chrono::NaiveDate;

    #[test]
    fn test_accepted_response() {
        let record = ValidatedRecord::new("Alice", 123.45, NaiveDate::from_ymd_opt(2026, 10, 2).unwrap(), true);
        let (status, Json(body)) = outcome_response(&ImportOutcome::Accepted {
            count: 1,
            records: vec![record],
        });

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "message": "File processed successfully", "recordsSaved": 1 }));
    }

    #[test]
    fn test_empty_import_response() {
        let (status, Json(body)) = outcome_response(&ImportOutcome::Accepted { count: 0, records: vec![] });
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["recordsSaved"], 0);
    }

    #[test]
    fn test_rejected_headers_response() {
        let outcome = ImportOutcome::Rejected(RejectReason::InvalidHeaders {
            missing: vec![Field::Verified],
            unexpected: vec!["Notes".into()],
        });
        let (status, Json(body)) = outcome_response(&outcome);

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Invalid column headers" }));
    }

    #[test]
    fn test_validation_failed_response() {
        let outcome = ImportOutcome::ValidationFailed(vec![RowError {
            sheet: "October".into(),
            row: 4,
            errors: vec!["Name is required".into(), "Verified must be Yes or No".into()],
        }]);
        let (status, Json(body)) = outcome_response(&outcome);

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({ "errors": [ {
                "sheet": "October",
                "row": 4,
                "errors": ["Name is required", "Verified must be Yes or No"]
            } ] })
        );
    }

    #[test]
    fn test_import_error_responses() {
        let (status, Json(body)) =
            import_error_response(&ImportError::Extract(ExtractError::MalformedFile("zip".into())));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], MSG_INVALID_FILE);

        let (status, Json(body)) =
            import_error_response(&ImportError::Extract(ExtractError::SheetNotFound("March".into())));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Sheet not found: March");

        let (status, Json(body)) =
            import_error_response(&ImportError::Persistence(StoreError::Insert("disk full".into())));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], MSG_DB_ERROR);

        let (status, Json(body)) = import_error_response(&ImportError::Worker("task cancelled".into()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], MSG_INTERRUPTED);
    }

    #[test]
    fn test_bad_request_response() {
        let (status, Json(body)) = server_error_response(&ServerError::BadRequest(MSG_NO_FILE.into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "No file uploaded" }));
    }
}

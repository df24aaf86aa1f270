//! Defines the app level error type and its conversion to JSON error responses.
use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::QueryRejection;
use serde_json::json;

use crate::database_id::{ItemId, PersonId, ReceiptId};

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An error occurred while serializing a struct as JSON
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),

    /// A query parameter was missing or could not be parsed.
    #[error("{0}")]
    InvalidQuery(String),

    /// The JSON request body was missing a field or could not be parsed.
    #[error("{0}")]
    InvalidRequestBody(String),

    /// The category key is not one of the known categories.
    #[error("invalid category \"{0}\"")]
    InvalidCategory(String),

    /// The transaction type is neither "expense" nor "income".
    #[error("invalid transaction type \"{0}\"")]
    InvalidTransactionType(String),

    /// A year, month and day combination that is not a calendar date.
    #[error("invalid date: {0}")]
    InvalidDate(String),

    /// An empty string was used as a person's name.
    #[error("person name cannot be empty")]
    EmptyPersonName,

    /// The specified person name already exists in the database.
    #[error("the person \"{0}\" already exists in the database")]
    DuplicatePersonName(String),

    /// The payer ID does not refer to a person that is allowed to pay.
    #[error("person {0} does not exist or is not a payer")]
    InvalidPayer(PersonId),

    /// An owner ID does not refer to an existing person.
    #[error("person {0} does not exist")]
    InvalidOwner(PersonId),

    /// An empty string was used as the shop on a receipt.
    #[error("shop cannot be empty")]
    EmptyShopName,

    /// A carry-over balance needs at least one person flagged as a payer.
    #[error("no person has been flagged as a payer")]
    NoPayerDefined,

    /// The multipart form could not be parsed.
    #[error("could not parse multipart form: {0}")]
    MultipartError(String),

    /// The multipart form did not contain a file in the `file` field.
    #[error("no file was uploaded in the field 'file'")]
    MissingFile,

    /// The uploaded file is not an NDJSON file or a zip archive.
    #[error("supported formats: .ndjson, .jsonl or .zip")]
    NotNdjson,

    /// The uploaded zip archive could not be read.
    #[error("could not read zip archive: {0}")]
    InvalidZip(String),

    /// The uploaded zip archive has no `.ndjson` entry.
    #[error("the zip archive does not contain a .ndjson file")]
    ZipWithoutNdjson,

    /// An error occurred while building a zip archive.
    #[error("could not write zip archive: {0}")]
    ArchiveWriteError(String),

    /// Tried to update a person that does not exist
    #[error("tried to update a person that is not in the database")]
    UpdateMissingPerson,

    /// Tried to delete a person that does not exist
    #[error("tried to delete a person that is not in the database")]
    DeleteMissingPerson,

    /// Tried to update a receipt that does not exist
    #[error("tried to update receipt {0} which is not in the database")]
    UpdateMissingReceipt(ReceiptId),

    /// Tried to delete a receipt that does not exist
    #[error("tried to delete receipt {0} which is not in the database")]
    DeleteMissingReceipt(ReceiptId),

    /// Tried to update an item that does not exist
    #[error("tried to update item {0} which is not in the database")]
    UpdateMissingItem(ItemId),

    /// Tried to delete an item that does not exist
    #[error("tried to delete item {0} which is not in the database")]
    DeleteMissingItem(ItemId),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        tracing::debug!("rejected query string: {rejection}");
        Error::InvalidQuery(rejection.to_string())
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("rejected request body: {rejection}");
        Error::InvalidRequestBody(rejection.body_text())
    }
}

impl Error {
    /// The HTTP status code that should be sent to the client for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::NotFound
            | Error::UpdateMissingPerson
            | Error::DeleteMissingPerson
            | Error::UpdateMissingReceipt(_)
            | Error::DeleteMissingReceipt(_)
            | Error::UpdateMissingItem(_)
            | Error::DeleteMissingItem(_) => StatusCode::NOT_FOUND,
            Error::DuplicatePersonName(_) => StatusCode::CONFLICT,
            Error::InvalidQuery(_)
            | Error::InvalidRequestBody(_)
            | Error::InvalidCategory(_)
            | Error::InvalidTransactionType(_)
            | Error::InvalidDate(_)
            | Error::EmptyPersonName
            | Error::InvalidPayer(_)
            | Error::InvalidOwner(_)
            | Error::EmptyShopName
            | Error::NoPayerDefined
            | Error::MultipartError(_)
            | Error::MissingFile
            | Error::NotNdjson
            | Error::InvalidZip(_)
            | Error::ZipWithoutNdjson => StatusCode::BAD_REQUEST,
            Error::SqlError(_)
            | Error::InvalidTimezoneError(_)
            | Error::DatabaseLockError
            | Error::JSONSerializationError(_)
            | Error::ArchiveWriteError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code = self.status_code();

        let detail = match self {
            Error::InvalidTimezoneError(timezone) => format!(
                "Could not get local timezone \"{timezone}\". Check your server settings and \
                ensure the timezone has been set to valid, canonical timezone string"
            ),
            // Internal errors are not intended to be shown to the client.
            error if status_code == StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!("An unexpected error occurred: {}", error);
                "An unexpected error occurred, check the server logs for more details.".to_owned()
            }
            error => error.to_string(),
        };

        (status_code, Json(json!({ "detail": detail }))).into_response()
    }
}

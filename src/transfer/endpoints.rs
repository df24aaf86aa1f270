//! Route handlers for downloading and uploading the receipt archive.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Multipart, State, multipart::{Field, MultipartRejection}},
    http::{HeaderName, HeaderValue, header},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::{
    AppState, Error,
    timezone::local_today,
    transfer::{
        ImportSummary, SCHEMA_VERSION, export_receipts, export_receipts_zip, import_receipts,
        read_ndjson_from_zip,
    },
};

const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";
const ZIP_CONTENT_TYPE: &str = "application/zip";
const EXPORTED_COUNT: HeaderName = HeaderName::from_static("x-exported-count");
const SCHEMA_VERSION_HEADER: HeaderName = HeaderName::from_static("x-schema-version");
const EXPORTED_AT: HeaderName = HeaderName::from_static("x-exported-at");

/// The state needed for exporting and importing receipts.
#[derive(Debug, Clone)]
pub struct TransferState {
    /// The database connection for reading and writing receipts.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Europe/Warsaw".
    pub local_timezone: String,
}

impl FromRef<AppState> for TransferState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Download every receipt as an NDJSON attachment.
pub async fn export_receipts_endpoint(
    State(state): State<TransferState>,
) -> Result<Response, Error> {
    let today = local_today(&state.local_timezone)?;
    let exported_at = now_rfc3339()?;

    let mut body = Vec::new();
    let count = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        export_receipts(&connection, &mut body)?
    };

    tracing::info!("exported {count} receipts");

    attachment(
        NDJSON_CONTENT_TYPE,
        &format!("receipts_{today}.ndjson"),
        count,
        &exported_at,
        body,
    )
}

/// Download every receipt as a zip archive holding `receipts.ndjson` and
/// `manifest.json`.
pub async fn export_receipts_zip_endpoint(
    State(state): State<TransferState>,
) -> Result<Response, Error> {
    let today = local_today(&state.local_timezone)?;
    let exported_at = now_rfc3339()?;

    let (body, count) = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        export_receipts_zip(&connection, &exported_at)?
    };

    tracing::info!("exported {count} receipts into a zip archive");

    attachment(
        ZIP_CONTENT_TYPE,
        &format!("receipts_{today}.zip"),
        count,
        &exported_at,
        body,
    )
}

fn now_rfc3339() -> Result<String, Error> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(|error| Error::JSONSerializationError(error.to_string()))
}

fn attachment(
    content_type: &'static str,
    file_name: &str,
    count: usize,
    exported_at: &str,
    body: Vec<u8>,
) -> Result<Response, Error> {
    let disposition = format!("attachment; filename=\"{file_name}\"");

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(content_type)),
            (header::CONTENT_DISPOSITION, header_value(&disposition)?),
            (EXPORTED_COUNT, HeaderValue::from(count)),
            (SCHEMA_VERSION_HEADER, HeaderValue::from(SCHEMA_VERSION)),
            (EXPORTED_AT, header_value(exported_at)?),
        ],
        body,
    )
        .into_response())
}

/// Create receipts from an NDJSON file or a zip archive uploaded in the
/// multipart field `file`.
pub async fn import_receipts_endpoint(
    State(state): State<TransferState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ImportSummary>, Error> {
    let mut multipart =
        multipart.map_err(|rejection| Error::MultipartError(rejection.body_text()))?;
    let mut data = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| Error::MultipartError(error.body_text()))?
    {
        if field.name() == Some("file") {
            data = Some(parse_multipart_field(field).await?);
            break;
        }
    }

    let data = data.ok_or(Error::MissingFile)?;
    let today = local_today(&state.local_timezone)?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let summary = import_receipts(&data, today, &connection)
        .inspect_err(|error| tracing::error!("import failed: {error}"))?;

    tracing::info!(
        "imported {} receipts, {} lines rejected",
        summary.inserted,
        summary.errors
    );

    Ok(Json(summary))
}

async fn parse_multipart_field(field: Field<'_>) -> Result<String, Error> {
    let file_name = match field.file_name() {
        Some(file_name) => file_name.to_owned(),
        None => return Err(Error::MissingFile),
    };

    let is_zip = is_zip_file_name(&file_name);
    if !is_zip && !is_ndjson_file_name(&file_name) {
        return Err(Error::NotNdjson);
    }

    let data = match field.bytes().await {
        Ok(data) => data,
        Err(error) => {
            tracing::error!("Could not read data from multipart form field: {error}");
            return Err(Error::MultipartError(
                "Could not read data from multipart form field.".to_owned(),
            ));
        }
    };

    tracing::debug!("Received file '{}' that is {} bytes", file_name, data.len());

    if is_zip {
        return read_ndjson_from_zip(&data);
    }

    String::from_utf8(data.to_vec())
        .map_err(|error| Error::MultipartError(format!("'{file_name}' is not UTF-8: {error}")))
}

fn is_ndjson_file_name(file_name: &str) -> bool {
    let file_name = file_name.to_lowercase();
    file_name.ends_with(".ndjson") || file_name.ends_with(".jsonl")
}

fn is_zip_file_name(file_name: &str) -> bool {
    file_name.to_lowercase().ends_with(".zip")
}

fn header_value(value: &str) -> Result<HeaderValue, Error> {
    HeaderValue::from_str(value).map_err(|error| {
        tracing::error!("invalid header value {value:?}: {error}");
        Error::JSONSerializationError(error.to_string())
    })
}

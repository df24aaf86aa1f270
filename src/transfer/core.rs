//! Reading and writing the receipt archive, one JSON object per line.

use std::io::{Cursor, Read, Write};

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Date;
use zip::{
    CompressionMethod, ZipArchive, ZipWriter, result::ZipError, write::SimpleFileOptions,
};

use crate::{
    Error,
    category::Category,
    database_id::{PersonId, ReceiptId},
    person::get_person,
    receipt::{
        NewItem, NewReceipt, Receipt, TransactionType, get_receipts_after, insert_receipt,
        validate_owners,
    },
};

/// How many receipts are read from the database at a time when exporting.
pub const EXPORT_BATCH_SIZE: usize = 2000;
/// How many valid receipts are buffered before they are written in one SQL transaction.
pub const IMPORT_BATCH_SIZE: usize = 200;
/// The most line errors that are reported back after an import.
pub const MAX_ERROR_SAMPLES: usize = 50;
/// The version of the line format written by [export_receipts].
pub const SCHEMA_VERSION: u32 = 1;
/// The archive entry holding the receipts in a zip export.
pub const ZIP_RECEIPTS_FILE: &str = "receipts.ndjson";
/// The archive entry describing a zip export.
pub const ZIP_MANIFEST_FILE: &str = "manifest.json";

// ============================================================================
// MODELS
// ============================================================================

/// A number that may have been written as a JSON number or a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Numeric {
    Number(f64),
    Text(String),
}

impl Numeric {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Numeric::Number(number) => Some(*number),
            Numeric::Text(text) => text.trim().parse().ok(),
        }
        .filter(|number: &f64| number.is_finite())
    }
}

fn default_quantity() -> Numeric {
    Numeric::Text("1".to_owned())
}

/// One line item in the archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemLine {
    pub category: Category,
    pub value: Numeric,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_quantity")]
    pub quantity: Numeric,
    #[serde(default)]
    pub owner_ids: Vec<PersonId>,
}

/// One receipt in the archive, written as a single line of JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptLine {
    pub payment_date: Date,
    pub payer_id: PersonId,
    pub shop: String,
    pub transaction_type: TransactionType,
    pub items: Vec<ItemLine>,
}

impl From<&Receipt> for ReceiptLine {
    fn from(receipt: &Receipt) -> Self {
        Self {
            payment_date: receipt.payment_date,
            payer_id: receipt.payer,
            shop: receipt.shop.clone(),
            transaction_type: receipt.transaction_type,
            items: receipt
                .items
                .iter()
                .map(|item| ItemLine {
                    category: item.category,
                    value: Numeric::Text(item.value.to_string()),
                    description: item.description.clone(),
                    quantity: Numeric::Text(item.quantity.to_string()),
                    owner_ids: item.owners.clone(),
                })
                .collect(),
        }
    }
}

/// Describes the contents of a zip export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub schema_version: u32,
    /// When the export was made, as an RFC 3339 timestamp.
    pub exported_at: String,
    /// How many receipts are in the archive.
    pub count: usize,
}

/// A line that could not be imported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineError {
    /// The 1-based line number in the uploaded file.
    pub line: usize,
    pub error: String,
}

/// The outcome of an import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub ok: bool,
    /// How many receipts were created.
    pub inserted: usize,
    /// How many non-blank lines were rejected.
    pub errors: usize,
    /// The first few rejected lines and why.
    pub error_samples: Vec<LineError>,
}

impl Default for ImportSummary {
    fn default() -> Self {
        Self {
            ok: true,
            inserted: 0,
            errors: 0,
            error_samples: Vec::new(),
        }
    }
}

impl ImportSummary {
    fn record_error(&mut self, line: usize, error: LineParseError) {
        self.errors += 1;

        if self.error_samples.len() < MAX_ERROR_SAMPLES {
            self.error_samples.push(LineError {
                line,
                error: error.to_string(),
            });
        }
    }
}

/// Why a single line was rejected.
#[derive(Debug, thiserror::Error)]
enum LineParseError {
    #[error("invalid line: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Invalid(#[from] Error),

    #[error("item {index}: {field} must be a number, got {value:?}")]
    NotANumber {
        index: usize,
        field: &'static str,
        value: Numeric,
    },
}

// ============================================================================
// EXPORT
// ============================================================================

/// Write every receipt to `writer` as one line of JSON each, in ID order.
///
/// Receipts are read [EXPORT_BATCH_SIZE] at a time with their items.
/// Returns the number of receipts written.
pub fn export_receipts(connection: &Connection, writer: &mut impl Write) -> Result<usize, Error> {
    let mut last_id: ReceiptId = 0;
    let mut count = 0;

    loop {
        let receipts = get_receipts_after(last_id, EXPORT_BATCH_SIZE, connection)?;

        let Some(batch_last) = receipts.last().map(|receipt| receipt.id) else {
            break;
        };

        for receipt in &receipts {
            serde_json::to_writer(&mut *writer, &ReceiptLine::from(receipt))
                .map_err(|error| Error::JSONSerializationError(error.to_string()))?;
            writer
                .write_all(b"\n")
                .map_err(|error| Error::JSONSerializationError(error.to_string()))?;
            count += 1;
        }

        last_id = batch_last;
    }

    Ok(count)
}

/// Write every receipt into a zip archive along with a [Manifest].
///
/// The receipts are stored as [ZIP_RECEIPTS_FILE] and the manifest as
/// [ZIP_MANIFEST_FILE]. Returns the archive and the number of receipts in it.
pub fn export_receipts_zip(
    connection: &Connection,
    exported_at: &str,
) -> Result<(Vec<u8>, usize), Error> {
    let mut archive = ZipWriter::new(Cursor::new(Vec::new()));

    archive
        .start_file(ZIP_RECEIPTS_FILE, deflated())
        .map_err(archive_write_error)?;
    let count = export_receipts(connection, &mut archive)?;

    let manifest = Manifest {
        schema_version: SCHEMA_VERSION,
        exported_at: exported_at.to_owned(),
        count,
    };
    archive
        .start_file(ZIP_MANIFEST_FILE, deflated())
        .map_err(archive_write_error)?;
    serde_json::to_writer_pretty(&mut archive, &manifest)
        .map_err(|error| Error::JSONSerializationError(error.to_string()))?;

    let bytes = archive.finish().map_err(archive_write_error)?.into_inner();

    Ok((bytes, count))
}

fn deflated() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

fn archive_write_error(error: ZipError) -> Error {
    tracing::error!("could not write zip archive: {error}");
    Error::ArchiveWriteError(error.to_string())
}

/// Read the NDJSON receipts out of an uploaded zip archive.
///
/// [ZIP_RECEIPTS_FILE] is used if the archive has one, otherwise the first
/// `.ndjson` entry.
///
/// # Errors
/// Returns [Error::InvalidZip] if `bytes` is not a readable zip archive or
/// the entry is not UTF-8, and [Error::ZipWithoutNdjson] if there is no
/// `.ndjson` entry.
pub fn read_ndjson_from_zip(bytes: &[u8]) -> Result<String, Error> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|error| Error::InvalidZip(error.to_string()))?;

    let entry_name = archive
        .file_names()
        .find(|name| *name == ZIP_RECEIPTS_FILE)
        .or_else(|| {
            archive
                .file_names()
                .find(|name| name.to_lowercase().ends_with(".ndjson"))
        })
        .map(str::to_owned)
        .ok_or(Error::ZipWithoutNdjson)?;

    let mut entry = archive
        .by_name(&entry_name)
        .map_err(|error| Error::InvalidZip(error.to_string()))?;
    let mut data = String::new();
    entry
        .read_to_string(&mut data)
        .map_err(|error| Error::InvalidZip(format!("{entry_name}: {error}")))?;

    tracing::debug!("read {} bytes from '{entry_name}'", data.len());

    Ok(data)
}

// ============================================================================
// IMPORT
// ============================================================================

/// Create a receipt for every valid line in `data`.
///
/// Blank lines are skipped. Invalid lines are counted and the import carries
/// on with the next line. Valid receipts are written in SQL transactions of
/// [IMPORT_BATCH_SIZE].
///
/// # Errors
/// Returns an [Error] if a batch could not be written to the database.
pub fn import_receipts(
    data: &str,
    save_date: Date,
    connection: &Connection,
) -> Result<ImportSummary, Error> {
    let mut summary = ImportSummary::default();
    let mut batch = Vec::with_capacity(IMPORT_BATCH_SIZE);

    for (index, line) in data.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match parse_line(line, connection) {
            Ok(receipt) => batch.push(receipt),
            Err(error) => {
                tracing::debug!("skipping line {}: {error}", index + 1);
                summary.record_error(index + 1, error);
            }
        }

        if batch.len() >= IMPORT_BATCH_SIZE {
            summary.inserted += flush_batch(&batch, save_date, connection)?;
            batch.clear();
        }
    }

    if !batch.is_empty() {
        summary.inserted += flush_batch(&batch, save_date, connection)?;
    }

    Ok(summary)
}

fn flush_batch(
    batch: &[NewReceipt],
    save_date: Date,
    connection: &Connection,
) -> Result<usize, Error> {
    let transaction = connection.unchecked_transaction()?;

    for receipt in batch {
        insert_receipt(receipt, save_date, &transaction)?;
    }

    transaction.commit()?;

    Ok(batch.len())
}

fn parse_line(line: &str, connection: &Connection) -> Result<NewReceipt, LineParseError> {
    let line: ReceiptLine = serde_json::from_str(line)?;

    if line.shop.trim().is_empty() {
        return Err(Error::EmptyShopName.into());
    }

    get_person(line.payer_id, connection).map_err(|error| match error {
        Error::NotFound => Error::InvalidPayer(line.payer_id),
        error => error,
    })?;

    let mut items = Vec::with_capacity(line.items.len());

    for (index, item) in line.items.into_iter().enumerate() {
        let value = item.value.as_f64().ok_or(LineParseError::NotANumber {
            index,
            field: "value",
            value: item.value.clone(),
        })?;
        let quantity = item
            .quantity
            .as_f64()
            .filter(|quantity| quantity.fract() == 0.0)
            .ok_or(LineParseError::NotANumber {
                index,
                field: "quantity",
                value: item.quantity.clone(),
            })?;

        validate_owners(&item.owner_ids, connection)?;

        items.push(NewItem {
            category: item.category,
            value,
            description: item.description,
            quantity: quantity as i64,
            owners: item.owner_ids,
        });
    }

    Ok(NewReceipt {
        payment_date: line.payment_date,
        payer: line.payer_id,
        shop: line.shop,
        transaction_type: line.transaction_type,
        items,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read, Write};

    use rusqlite::Connection;
    use time::macros::date;
    use zip::{ZipArchive, ZipWriter, write::SimpleFileOptions};

    use crate::{
        Error,
        category::Category,
        db::initialize,
        person::{PersonForm, create_person},
        receipt::{NewItem, NewReceipt, ReceiptFilter, TransactionType, create_receipt, get_receipts},
        transfer::core::{
            MAX_ERROR_SAMPLES, Manifest, Numeric, ReceiptLine, SCHEMA_VERSION, ZIP_MANIFEST_FILE,
            ZIP_RECEIPTS_FILE, export_receipts, export_receipts_zip, import_receipts,
            read_ndjson_from_zip,
        },
    };

    fn get_connection_with_people() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        create_person(&PersonForm::payer("Alice"), &connection).unwrap();
        create_person(&PersonForm::owner("Bob"), &connection).unwrap();
        connection
    }

    fn export_to_string(connection: &Connection) -> (usize, String) {
        let mut buffer = Vec::new();
        let count = export_receipts(connection, &mut buffer).unwrap();
        (count, String::from_utf8(buffer).unwrap())
    }

    #[test]
    fn export_writes_one_line_per_receipt() {
        let connection = get_connection_with_people();
        for shop in ["Lidl", "Biedronka"] {
            create_receipt(
                &NewReceipt::build(date!(2025 - 03 - 01), 1, shop, TransactionType::Expense)
                    .item(NewItem::new(Category::FoodDrinks, 12.5, &[2, 1]).description("bread")),
                date!(2025 - 03 - 02),
                &connection,
            )
            .unwrap();
        }

        let (count, text) = export_to_string(&connection);

        assert_eq!(count, 2);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["paymentDate"], "2025-03-01");
        assert_eq!(first["payerId"], 1);
        assert_eq!(first["shop"], "Lidl");
        assert_eq!(first["transactionType"], "expense");
        assert_eq!(first["items"][0]["value"], "12.5");
        assert_eq!(first["items"][0]["quantity"], "1");
        assert_eq!(first["items"][0]["ownerIds"], serde_json::json!([1, 2]));

        let second: ReceiptLine = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.shop, "Biedronka");
    }

    #[test]
    fn export_of_empty_database_is_empty() {
        let connection = get_connection_with_people();

        assert_eq!(export_to_string(&connection), (0, String::new()));
    }

    #[test]
    fn exported_archive_imports_into_fresh_database() {
        let source = get_connection_with_people();
        create_receipt(
            &NewReceipt::build(date!(2025 - 01 - 10), 1, "Orlen", TransactionType::Expense)
                .item(NewItem::new(Category::Fuel, 250.0, &[1]))
                .item(NewItem::new(Category::Alcohol, 30.0, &[2]).description("wine")),
            date!(2025 - 01 - 10),
            &source,
        )
        .unwrap();
        let (_, text) = export_to_string(&source);

        let target = get_connection_with_people();
        let summary = import_receipts(&text, date!(2025 - 02 - 01), &target).unwrap();

        assert_eq!(summary.inserted, 1);
        assert_eq!(summary.errors, 0);
        let receipts = get_receipts(&ReceiptFilter::default(), &target).unwrap();
        assert_eq!(receipts.len(), 1);
        assert_eq!(receipts[0].shop, "Orlen");
        assert_eq!(receipts[0].items.len(), 2);
        assert_eq!(receipts[0].items[1].owners, vec![2]);
        assert_eq!(receipts[0].save_date, Some(date!(2025 - 02 - 01)));
    }

    #[test]
    fn import_skips_blank_lines_and_counts_errors() {
        let connection = get_connection_with_people();
        let data = [
            r#"{"paymentDate":"2025-03-01","payerId":1,"shop":"Lidl","transactionType":"expense","items":[{"category":"food_drinks","value":10,"quantity":2,"ownerIds":[1]}]}"#,
            "",
            "   ",
            r#"{"paymentDate":"2025-03-01","payerId":99,"shop":"Lidl","transactionType":"expense","items":[]}"#,
            "not json",
            r#"{"paymentDate":"2025-03-01","payerId":1,"shop":"Lidl","transactionType":"expense","items":"nope"}"#,
            r#"{"paymentDate":"2025-03-01","payerId":1,"shop":"Lidl","transactionType":"expense","items":[{"category":"food_drinks","value":"abc"}]}"#,
            r#"{"paymentDate":"2025-03-01","payerId":1,"shop":"Lidl","transactionType":"expense","items":[{"category":"food_drinks","value":"1","ownerIds":[42]}]}"#,
            r#"{"paymentDate":"2025-03-01","payerId":2,"shop":"Work","transactionType":"income","items":[{"category":"work_income","value":"5000.00"}]}"#,
        ]
        .join("\n");

        let summary = import_receipts(&data, date!(2025 - 03 - 02), &connection).unwrap();

        assert!(summary.ok);
        assert_eq!(summary.inserted, 2);
        assert_eq!(summary.errors, 5);
        let lines: Vec<usize> = summary.error_samples.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![4, 5, 6, 7, 8]);
        assert!(summary.error_samples[3].error.contains("value"));

        let receipts = get_receipts(&ReceiptFilter::default(), &connection).unwrap();
        assert_eq!(receipts[0].items[0].quantity, 2);
        assert_eq!(receipts[1].items[0].value, 5000.0);
    }

    #[test]
    fn import_rejects_missing_keys_and_unknown_values() {
        let connection = get_connection_with_people();
        let data = [
            r#"{"paymentDate":"2025-03-01","payerId":1,"shop":"Lidl","items":[]}"#,
            r#"{"paymentDate":"2025-02-30","payerId":1,"shop":"Lidl","transactionType":"expense","items":[]}"#,
            r#"{"paymentDate":"2025-03-01","payerId":1,"shop":"Lidl","transactionType":"gift","items":[]}"#,
            r#"{"paymentDate":"2025-03-01","payerId":1,"shop":"Lidl","transactionType":"expense","items":[{"category":"groceries","value":1}]}"#,
            r#"{"paymentDate":"2025-03-01","payerId":1,"shop":"Lidl","transactionType":"expense","items":[{"category":"fuel","value":1,"quantity":"1.5"}]}"#,
        ]
        .join("\n");

        let summary = import_receipts(&data, date!(2025 - 03 - 02), &connection).unwrap();

        assert_eq!(summary.inserted, 0);
        assert_eq!(summary.errors, 5);
        assert!(summary.error_samples[0].error.contains("transactionType"));
    }

    #[test]
    fn error_samples_are_capped() {
        let connection = get_connection_with_people();
        let data = vec!["{}"; MAX_ERROR_SAMPLES + 10].join("\n");

        let summary = import_receipts(&data, date!(2025 - 03 - 02), &connection).unwrap();

        assert_eq!(summary.errors, MAX_ERROR_SAMPLES + 10);
        assert_eq!(summary.error_samples.len(), MAX_ERROR_SAMPLES);
    }

    #[test]
    fn import_flushes_more_than_one_batch() {
        let connection = get_connection_with_people();
        let line = r#"{"paymentDate":"2025-03-01","payerId":1,"shop":"Lidl","transactionType":"expense","items":[]}"#;
        let data = vec![line; 450].join("\n");

        let summary = import_receipts(&data, date!(2025 - 03 - 02), &connection).unwrap();

        assert_eq!(summary.inserted, 450);
        assert_eq!(
            get_receipts(&ReceiptFilter::default(), &connection)
                .unwrap()
                .len(),
            450
        );
    }

    fn make_zip(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut archive = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in entries {
            archive.start_file(*name, SimpleFileOptions::default()).unwrap();
            archive.write_all(content.as_bytes()).unwrap();
        }
        archive.finish().unwrap().into_inner()
    }

    #[test]
    fn zip_export_holds_receipts_and_manifest() {
        let connection = get_connection_with_people();
        for shop in ["Lidl", "Orlen"] {
            create_receipt(
                &NewReceipt::build(date!(2025 - 04 - 01), 1, shop, TransactionType::Expense)
                    .item(NewItem::new(Category::Fuel, 200.0, &[1, 2])),
                date!(2025 - 04 - 01),
                &connection,
            )
            .unwrap();
        }

        let (bytes, count) = export_receipts_zip(&connection, "2025-04-02T10:00:00Z").unwrap();

        assert_eq!(count, 2);
        let mut archive = ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        let mut manifest = String::new();
        archive
            .by_name(ZIP_MANIFEST_FILE)
            .unwrap()
            .read_to_string(&mut manifest)
            .unwrap();
        let manifest: Manifest = serde_json::from_str(&manifest).unwrap();
        assert_eq!(
            manifest,
            Manifest {
                schema_version: SCHEMA_VERSION,
                exported_at: "2025-04-02T10:00:00Z".to_owned(),
                count: 2,
            }
        );

        let data = read_ndjson_from_zip(&bytes).unwrap();
        assert_eq!(data, export_to_string(&connection).1);

        let target = get_connection_with_people();
        let summary = import_receipts(&data, date!(2025 - 04 - 03), &target).unwrap();
        assert_eq!((summary.inserted, summary.errors), (2, 0));
    }

    #[test]
    fn zip_export_of_empty_database_has_zero_count() {
        let connection = get_connection_with_people();

        let (bytes, count) = export_receipts_zip(&connection, "2025-04-02T10:00:00Z").unwrap();

        assert_eq!(count, 0);
        assert_eq!(read_ndjson_from_zip(&bytes), Ok(String::new()));
    }

    #[test]
    fn zip_import_prefers_receipts_file() {
        let bytes = make_zip(&[
            ("other.ndjson", "other"),
            (ZIP_RECEIPTS_FILE, "receipts"),
        ]);

        assert_eq!(read_ndjson_from_zip(&bytes), Ok("receipts".to_owned()));
    }

    #[test]
    fn zip_import_falls_back_to_first_ndjson_entry() {
        let bytes = make_zip(&[
            ("notes.txt", "ignore me"),
            ("2025/march.NDJSON", "march"),
            ("april.ndjson", "april"),
        ]);

        assert_eq!(read_ndjson_from_zip(&bytes), Ok("march".to_owned()));
    }

    #[test]
    fn zip_without_ndjson_is_rejected() {
        let bytes = make_zip(&[("manifest.json", "{}"), ("receipts.csv", "a,b")]);

        assert_eq!(read_ndjson_from_zip(&bytes), Err(Error::ZipWithoutNdjson));
    }

    #[test]
    fn bytes_that_are_not_a_zip_are_rejected() {
        let result = read_ndjson_from_zip(b"definitely not a zip archive");

        assert!(matches!(result, Err(Error::InvalidZip(_))), "got {result:?}");
    }

    #[test]
    fn numeric_accepts_numbers_and_strings() {
        assert_eq!(Numeric::Number(2.5).as_f64(), Some(2.5));
        assert_eq!(Numeric::Text(" 12.50 ".to_owned()).as_f64(), Some(12.5));
        assert_eq!(Numeric::Text("twelve".to_owned()).as_f64(), None);
        assert_eq!(Numeric::Text("NaN".to_owned()).as_f64(), None);
    }
}

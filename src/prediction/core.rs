use std::collections::BTreeMap;

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    database_id::DatabaseId,
    shop::{MIN_QUERY_LENGTH, normalize_name},
};

/// An item description and how many items have used it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemPrediction {
    pub id: DatabaseId,
    /// The trimmed, lowercase description.
    pub item_description: String,
    pub frequency: i64,
}

/// Count one more use of `description`. New descriptions start at 1.
///
/// Blank descriptions are ignored.
pub fn increment_prediction(description: &str, connection: &Connection) -> Result<(), Error> {
    let description = normalize_name(description);

    if description.is_empty() {
        return Ok(());
    }

    connection
        .prepare_cached(
            "INSERT INTO item_prediction (item_description, frequency) VALUES (?1, 1)
             ON CONFLICT(item_description) DO UPDATE SET frequency = frequency + 1",
        )?
        .execute([description])?;

    Ok(())
}

/// Search the predictions for descriptions containing `query`.
///
/// Without a query every prediction is returned in alphabetical order. A
/// query shorter than [MIN_QUERY_LENGTH] characters matches nothing.
/// Matches are ordered by frequency, most frequent first.
pub fn search_predictions(
    query: Option<&str>,
    connection: &Connection,
) -> Result<Vec<ItemPrediction>, Error> {
    let query = query.map(normalize_name).unwrap_or_default();

    if query.is_empty() {
        return connection
            .prepare(
                "SELECT id, item_description, frequency FROM item_prediction
                 ORDER BY item_description",
            )?
            .query_map([], map_item_prediction_row)?
            .map(|maybe_prediction| maybe_prediction.map_err(|error| error.into()))
            .collect();
    }

    if query.chars().count() < MIN_QUERY_LENGTH {
        return Ok(Vec::new());
    }

    connection
        .prepare(
            "SELECT id, item_description, frequency FROM item_prediction
             WHERE instr(item_description, ?1) > 0
             ORDER BY frequency DESC, item_description",
        )?
        .query_map([query], map_item_prediction_row)?
        .map(|maybe_prediction| maybe_prediction.map_err(|error| error.into()))
        .collect()
}

/// Count the descriptions of every item and store the counts as the
/// prediction frequencies.
///
/// Returns the number of distinct descriptions found.
pub fn rescan_predictions(connection: &Connection) -> Result<usize, Error> {
    let descriptions = connection
        .prepare("SELECT description FROM item")?
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut frequencies: BTreeMap<String, i64> = BTreeMap::new();

    for description in descriptions {
        let description = normalize_name(&description);

        if !description.is_empty() {
            *frequencies.entry(description).or_default() += 1;
        }
    }

    let mut upsert = connection.prepare_cached(
        "INSERT INTO item_prediction (item_description, frequency) VALUES (?1, ?2)
         ON CONFLICT(item_description) DO UPDATE SET frequency = excluded.frequency",
    )?;

    for (description, frequency) in &frequencies {
        upsert.execute((description, frequency))?;
    }

    Ok(frequencies.len())
}

/// Delete every prediction, returning how many were deleted.
pub fn clear_predictions(connection: &Connection) -> Result<usize, Error> {
    connection
        .execute("DELETE FROM item_prediction", [])
        .map_err(|error| error.into())
}

/// Create the table for the item description predictions.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_item_prediction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS item_prediction (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            item_description TEXT NOT NULL UNIQUE,
            frequency INTEGER NOT NULL DEFAULT 1
        )",
        (),
    )?;

    Ok(())
}

fn map_item_prediction_row(row: &Row) -> Result<ItemPrediction, rusqlite::Error> {
    Ok(ItemPrediction {
        id: row.get(0)?,
        item_description: row.get(1)?,
        frequency: row.get(2)?,
    })
}

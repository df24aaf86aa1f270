//! Defines the person model and its database queries.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{Error, database_id::PersonId};

// ============================================================================
// MODELS
// ============================================================================

/// A member of the household.
///
/// Payers may be recorded as having paid for a receipt. Owners may have items
/// assigned to them, in which case they carry an equal share of the item's
/// value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    /// The ID of the person.
    pub id: PersonId,
    /// The person's unique display name.
    pub name: String,
    /// Whether the person can pay for receipts.
    pub payer: bool,
    /// Whether the person can own items.
    pub owner: bool,
}

/// The data needed to create or update a person.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonForm {
    /// Leading and trailing whitespace is trimmed.
    pub name: String,
    /// Defaults to false.
    #[serde(default)]
    pub payer: bool,
    /// Defaults to true.
    #[serde(default = "default_owner")]
    pub owner: bool,
}

fn default_owner() -> bool {
    true
}

impl PersonForm {
    /// A form for a person that owns items but does not pay for receipts.
    pub fn owner(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            payer: false,
            owner: true,
        }
    }

    /// A form for a person that both pays for receipts and owns items.
    pub fn payer(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            payer: true,
            owner: true,
        }
    }

    fn validated_name(&self) -> Result<&str, Error> {
        let name = self.name.trim();

        if name.is_empty() {
            return Err(Error::EmptyPersonName);
        }

        Ok(name)
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create a person and return it with its generated ID.
///
/// # Errors
/// This function will return a:
/// - [Error::EmptyPersonName] if the name is empty or only whitespace,
/// - [Error::DuplicatePersonName] if the name is already taken,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_person(form: &PersonForm, connection: &Connection) -> Result<Person, Error> {
    let name = form.validated_name()?;

    connection
        .prepare(
            "INSERT INTO person (name, payer, owner) VALUES (?1, ?2, ?3)
             RETURNING id, name, payer, owner",
        )?
        .query_row((name, form.payer, form.owner), map_person_row)
        .map_err(|error| map_unique_name_error(error, name))
}

/// Retrieve a person by `id`.
///
/// # Errors
/// Returns [Error::NotFound] if `id` does not refer to a person.
pub fn get_person(id: PersonId, connection: &Connection) -> Result<Person, Error> {
    connection
        .prepare("SELECT id, name, payer, owner FROM person WHERE id = :id")?
        .query_row(&[(":id", &id)], map_person_row)
        .map_err(|error| error.into())
}

/// Retrieve all people ordered by ID.
pub fn get_all_persons(connection: &Connection) -> Result<Vec<Person>, Error> {
    query_persons("SELECT id, name, payer, owner FROM person ORDER BY id", connection)
}

/// Retrieve the people that may pay for receipts, ordered by ID.
pub fn get_persons_flagged_payer(connection: &Connection) -> Result<Vec<Person>, Error> {
    query_persons(
        "SELECT id, name, payer, owner FROM person WHERE payer = 1 ORDER BY id",
        connection,
    )
}

/// Retrieve the people that may own items, ordered by ID.
pub fn get_persons_flagged_owner(connection: &Connection) -> Result<Vec<Person>, Error> {
    query_persons(
        "SELECT id, name, payer, owner FROM person WHERE owner = 1 ORDER BY id",
        connection,
    )
}

fn query_persons(sql: &str, connection: &Connection) -> Result<Vec<Person>, Error> {
    connection
        .prepare(sql)?
        .query_map([], map_person_row)?
        .map(|maybe_person| maybe_person.map_err(|error| error.into()))
        .collect()
}

/// Replace the details of the person with `id`.
///
/// # Errors
/// Returns [Error::UpdateMissingPerson] if the person does not exist, or the
/// same validation errors as [create_person].
pub fn update_person(
    id: PersonId,
    form: &PersonForm,
    connection: &Connection,
) -> Result<Person, Error> {
    let name = form.validated_name()?;

    connection
        .prepare(
            "UPDATE person SET name = ?1, payer = ?2, owner = ?3 WHERE id = ?4
             RETURNING id, name, payer, owner",
        )?
        .query_row((name, form.payer, form.owner, id), map_person_row)
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::UpdateMissingPerson,
            error => map_unique_name_error(error, name),
        })
}

/// Delete the person with `id`.
///
/// Receipts paid by the person are deleted with them and the person is
/// removed from the owners of every item.
///
/// # Errors
/// Returns [Error::DeleteMissingPerson] if the person does not exist.
pub fn delete_person(id: PersonId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM person WHERE id = ?1", [id])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingPerson);
    }

    Ok(())
}

fn map_unique_name_error(error: rusqlite::Error, name: &str) -> Error {
    match error {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: _,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
            },
            _,
        ) => Error::DuplicatePersonName(name.to_owned()),
        error => error.into(),
    }
}

/// Create the person table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_person_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS person (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            payer INTEGER NOT NULL DEFAULT 0,
            owner INTEGER NOT NULL DEFAULT 1
        )",
        (),
    )?;

    Ok(())
}

fn map_person_row(row: &Row) -> Result<Person, rusqlite::Error> {
    Ok(Person {
        id: row.get(0)?,
        name: row.get(1)?,
        payer: row.get(2)?,
        owner: row.get(3)?,
    })
}

// ============================================================================
// TESTS
// ============================================================================

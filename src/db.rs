//! Creates the application's database schema.

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::{
    Error, person::create_person_table, prediction::create_item_prediction_table,
    receipt::create_receipt_tables, shop::create_recent_shop_table,
};

/// Create the tables for every domain model if they do not exist yet.
///
/// Foreign key enforcement is switched on for `connection` so that deleting a
/// person or receipt cascades to the rows that refer to it.
///
/// # Errors
/// Returns an [Error::SqlError] if a table could not be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", "ON")?;

    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_person_table(&transaction)?;
    create_receipt_tables(&transaction)?;
    create_recent_shop_table(&transaction)?;
    create_item_prediction_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

//! Defines the receipt and item models and their database queries.

use std::{collections::HashMap, fmt::Display, ops::RangeInclusive, str::FromStr};

use rusqlite::{
    Connection, OptionalExtension, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, Type, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    category::Category,
    database_id::{ItemId, PersonId, ReceiptId},
};

// ============================================================================
// MODELS
// ============================================================================

/// Whether money was spent or earned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money was spent.
    Expense,
    /// Money was received.
    Income,
}

impl TransactionType {
    /// The lowercase key used in the database and the JSON API.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Expense => "expense",
            TransactionType::Income => "income",
        }
    }
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = Error;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        match key {
            "expense" => Ok(TransactionType::Expense),
            "income" => Ok(TransactionType::Income),
            other => Err(Error::InvalidTransactionType(other.to_owned())),
        }
    }
}

impl ToSql for TransactionType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error: Error| FromSqlError::Other(Box::new(error)))
    }
}

/// A line item on a receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// The ID of the item.
    pub id: ItemId,
    /// The day the item was recorded.
    pub save_date: Option<Date>,
    /// What the item was spent on, or where the income came from.
    pub category: Category,
    /// The total value of the item.
    pub value: f64,
    /// A short text describing the item, e.g. "milk".
    pub description: String,
    /// How many units were bought.
    pub quantity: i64,
    /// The IDs of the people that share the cost of the item, in ascending order.
    pub owners: Vec<PersonId>,
}

/// An expense or income recorded as a single payment, e.g. a shopping receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    /// The ID of the receipt.
    pub id: ReceiptId,
    /// The day the receipt was recorded.
    pub save_date: Option<Date>,
    /// The day the payment happened.
    pub payment_date: Date,
    /// The ID of the person that paid.
    pub payer: PersonId,
    /// Where the payment happened.
    pub shop: String,
    /// Whether money was spent or earned.
    pub transaction_type: TransactionType,
    /// The line items on the receipt.
    pub items: Vec<Item>,
}

impl Receipt {
    /// The sum of the values of all items on the receipt.
    pub fn total(&self) -> f64 {
        self.items.iter().map(|item| item.value).sum()
    }
}

/// The data needed to create an item or replace an existing one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewItem {
    /// What the item was bought for.
    pub category: Category,
    /// The price of the item.
    pub value: f64,
    /// Free text, may be empty.
    #[serde(default)]
    pub description: String,
    /// Defaults to 1.
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    /// The people sharing the cost of the item.
    #[serde(default)]
    pub owners: Vec<PersonId>,
}

fn default_quantity() -> i64 {
    1
}

impl NewItem {
    /// Create a single unit item with an empty description.
    pub fn new(category: Category, value: f64, owners: &[PersonId]) -> Self {
        Self {
            category,
            value,
            description: String::new(),
            quantity: default_quantity(),
            owners: owners.to_vec(),
        }
    }

    /// Set the description of the item.
    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_owned();
        self
    }

    /// Set how many units of the item were bought.
    pub fn quantity(mut self, quantity: i64) -> Self {
        self.quantity = quantity;
        self
    }
}

/// The data needed to create a receipt or replace an existing one.
///
/// To create a new `NewReceipt` in code, use [NewReceipt::build].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReceipt {
    /// The day the receipt was paid.
    pub payment_date: Date,
    /// The person who paid, who must be flagged as a payer.
    pub payer: PersonId,
    /// Must not be empty.
    pub shop: String,
    /// Whether the receipt is an expense or income.
    pub transaction_type: TransactionType,
    /// The line items of the receipt.
    #[serde(default)]
    pub items: Vec<NewItem>,
}

impl NewReceipt {
    /// Start building a receipt without any items.
    pub fn build(
        payment_date: Date,
        payer: PersonId,
        shop: &str,
        transaction_type: TransactionType,
    ) -> Self {
        Self {
            payment_date,
            payer,
            shop: shop.to_owned(),
            transaction_type,
            items: Vec::new(),
        }
    }

    /// Add a line item to the receipt.
    pub fn item(mut self, item: NewItem) -> Self {
        self.items.push(item);
        self
    }
}

/// Criteria for selecting receipts. Every field that is set must match.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptFilter {
    /// Some item on the receipt is owned by this person.
    pub owner: Option<PersonId>,
    /// The receipt was paid for by this person.
    pub payer: Option<PersonId>,
    /// The day of the month of the payment date.
    pub day: Option<u8>,
    /// The month of the payment date.
    pub month: Option<u8>,
    /// The year of the payment date.
    pub year: Option<i32>,
    /// The payment date is on or after this date.
    pub payment_date_after: Option<Date>,
    /// The payment date is on or before this date.
    pub payment_date_before: Option<Date>,
    /// The receipt is an expense or income.
    pub transaction_type: Option<TransactionType>,
    /// Some item on the receipt has this category.
    pub category: Option<Category>,
}

impl ReceiptFilter {
    /// Select receipts paid within `range`.
    pub fn in_range(range: RangeInclusive<Date>) -> Self {
        Self {
            payment_date_after: Some(*range.start()),
            payment_date_before: Some(*range.end()),
            ..Default::default()
        }
    }

    /// Only select receipts of `transaction_type`.
    pub fn transaction_type(mut self, transaction_type: Option<TransactionType>) -> Self {
        self.transaction_type = transaction_type;
        self
    }
}

/// Criteria for selecting items.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemFilter {
    /// The item is owned by this person.
    pub owner: Option<PersonId>,
    /// The item has this category.
    pub category: Option<Category>,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

const RECEIPT_COLUMNS: &str =
    "receipt.id, receipt.save_date, receipt.payment_date, receipt.payer_id, receipt.shop, \
     receipt.transaction_type";

const ITEM_COLUMNS: &str = "item.id, item.save_date, item.category, item.value, \
     item.description, item.quantity, \
     (SELECT group_concat(person_id) FROM item_owner WHERE item_owner.item_id = item.id)";

/// Create a receipt and its items.
///
/// The caller should wrap this in an SQL transaction so that a failure part
/// way through does not leave a receipt with only some of its items.
///
/// # Errors
/// This function will return a:
/// - [Error::EmptyShopName] if the shop is empty or only whitespace,
/// - [Error::InvalidPayer] if the payer does not exist or is not flagged as a payer,
/// - [Error::InvalidOwner] if an item owner does not exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_receipt(
    receipt: &NewReceipt,
    save_date: Date,
    connection: &Connection,
) -> Result<Receipt, Error> {
    validate_receipt(receipt, connection)?;
    let receipt_id = insert_receipt(receipt, save_date, connection)?;

    get_receipt(receipt_id, connection)
}

/// Insert a receipt and its items without checking the payer flag or owners.
///
/// Callers are expected to have validated `receipt` already.
pub(crate) fn insert_receipt(
    receipt: &NewReceipt,
    save_date: Date,
    connection: &Connection,
) -> Result<ReceiptId, Error> {
    let receipt_id: ReceiptId = connection
        .prepare_cached(
            "INSERT INTO receipt (save_date, payment_date, payer_id, shop, transaction_type)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING id",
        )?
        .query_row(
            (
                save_date,
                receipt.payment_date,
                receipt.payer,
                receipt.shop.trim(),
                receipt.transaction_type,
            ),
            |row| row.get(0),
        )?;

    insert_items(receipt_id, &receipt.items, save_date, connection)?;

    Ok(receipt_id)
}

/// Retrieve a receipt and its items by `id`.
///
/// # Errors
/// Returns [Error::NotFound] if `id` does not refer to a receipt.
pub fn get_receipt(id: ReceiptId, connection: &Connection) -> Result<Receipt, Error> {
    let mut receipt = connection
        .prepare(&format!(
            "SELECT {RECEIPT_COLUMNS} FROM receipt WHERE receipt.id = :id"
        ))?
        .query_row(&[(":id", &id)], map_receipt_row)?;

    receipt.items = get_receipt_items(id, connection)?;

    Ok(receipt)
}

/// Retrieve the receipts matching `filter` with their items, ordered by payment date.
pub fn get_receipts(filter: &ReceiptFilter, connection: &Connection) -> Result<Vec<Receipt>, Error> {
    let mut clauses: Vec<&str> = Vec::new();
    let mut params: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(owner) = filter.owner {
        clauses.push(
            "EXISTS (SELECT 1 FROM item JOIN item_owner ON item_owner.item_id = item.id \
             WHERE item.receipt_id = receipt.id AND item_owner.person_id = ?)",
        );
        params.push(Box::new(owner));
    }

    if let Some(payer) = filter.payer {
        clauses.push("receipt.payer_id = ?");
        params.push(Box::new(payer));
    }

    if let Some(day) = filter.day {
        clauses.push("CAST(strftime('%d', receipt.payment_date) AS INTEGER) = ?");
        params.push(Box::new(day));
    }

    if let Some(month) = filter.month {
        clauses.push("CAST(strftime('%m', receipt.payment_date) AS INTEGER) = ?");
        params.push(Box::new(month));
    }

    if let Some(year) = filter.year {
        clauses.push("CAST(strftime('%Y', receipt.payment_date) AS INTEGER) = ?");
        params.push(Box::new(year));
    }

    if let Some(after) = filter.payment_date_after {
        clauses.push("receipt.payment_date >= ?");
        params.push(Box::new(after));
    }

    if let Some(before) = filter.payment_date_before {
        clauses.push("receipt.payment_date <= ?");
        params.push(Box::new(before));
    }

    if let Some(transaction_type) = filter.transaction_type {
        clauses.push("receipt.transaction_type = ?");
        params.push(Box::new(transaction_type));
    }

    if let Some(category) = filter.category {
        clauses.push(
            "EXISTS (SELECT 1 FROM item WHERE item.receipt_id = receipt.id AND item.category = ?)",
        );
        params.push(Box::new(category));
    }

    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };

    let mut receipts = connection
        .prepare(&format!(
            "SELECT {RECEIPT_COLUMNS} FROM receipt {where_clause} \
             ORDER BY receipt.payment_date, receipt.id"
        ))?
        .query_map(rusqlite::params_from_iter(params.iter()), map_receipt_row)?
        .collect::<Result<Vec<_>, _>>()?;

    for receipt in receipts.iter_mut() {
        receipt.items = get_receipt_items(receipt.id, connection)?;
    }

    Ok(receipts)
}

/// Retrieve up to `limit` receipts with an ID greater than `after`, in ID order.
///
/// The receipts and all of their items are read with one query each.
pub(crate) fn get_receipts_after(
    after: ReceiptId,
    limit: usize,
    connection: &Connection,
) -> Result<Vec<Receipt>, Error> {
    let mut receipts = connection
        .prepare_cached(&format!(
            "SELECT {RECEIPT_COLUMNS} FROM receipt WHERE receipt.id > ?1 \
             ORDER BY receipt.id LIMIT ?2"
        ))?
        .query_map((after, limit as i64), map_receipt_row)?
        .collect::<Result<Vec<_>, _>>()?;

    let Some(last_id) = receipts.last().map(|receipt| receipt.id) else {
        return Ok(receipts);
    };

    let mut items_by_receipt: HashMap<ReceiptId, Vec<Item>> = HashMap::new();
    let mut statement = connection.prepare_cached(&format!(
        "SELECT {ITEM_COLUMNS}, item.receipt_id FROM item \
         WHERE item.receipt_id > ?1 AND item.receipt_id <= ?2 ORDER BY item.id"
    ))?;
    let rows = statement.query_map((after, last_id), |row| {
        Ok((row.get::<_, ReceiptId>(7)?, map_item_row(row)?))
    })?;

    for row in rows {
        let (receipt_id, item) = row?;
        items_by_receipt.entry(receipt_id).or_default().push(item);
    }

    for receipt in receipts.iter_mut() {
        receipt.items = items_by_receipt.remove(&receipt.id).unwrap_or_default();
    }

    Ok(receipts)
}

/// Replace the details and the items of the receipt with `id`.
///
/// The old items are deleted and `receipt.items` are created in their place.
///
/// # Errors
/// Returns [Error::UpdateMissingReceipt] if the receipt does not exist, or
/// the same validation errors as [create_receipt].
pub fn update_receipt(
    id: ReceiptId,
    receipt: &NewReceipt,
    save_date: Date,
    connection: &Connection,
) -> Result<Receipt, Error> {
    validate_receipt(receipt, connection)?;

    let rows_affected = connection.execute(
        "UPDATE receipt SET payment_date = ?1, payer_id = ?2, shop = ?3, transaction_type = ?4
         WHERE id = ?5",
        (
            receipt.payment_date,
            receipt.payer,
            receipt.shop.trim(),
            receipt.transaction_type,
            id,
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingReceipt(id));
    }

    connection.execute("DELETE FROM item WHERE receipt_id = ?1", [id])?;
    insert_items(id, &receipt.items, save_date, connection)?;

    get_receipt(id, connection)
}

/// Delete the receipt with `id` and its items.
///
/// # Errors
/// Returns [Error::DeleteMissingReceipt] if the receipt does not exist.
pub fn delete_receipt(id: ReceiptId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM receipt WHERE id = ?1", [id])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingReceipt(id));
    }

    Ok(())
}

/// Retrieve an item by `id`.
///
/// # Errors
/// Returns [Error::NotFound] if `id` does not refer to an item.
pub fn get_item(id: ItemId, connection: &Connection) -> Result<Item, Error> {
    connection
        .prepare(&format!("SELECT {ITEM_COLUMNS} FROM item WHERE item.id = :id"))?
        .query_row(&[(":id", &id)], map_item_row)
        .map_err(|error| error.into())
}

/// Retrieve the items matching `filter`, ordered by ID.
pub fn get_items(filter: &ItemFilter, connection: &Connection) -> Result<Vec<Item>, Error> {
    connection
        .prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM item
             WHERE (:owner IS NULL OR EXISTS (
                    SELECT 1 FROM item_owner
                    WHERE item_owner.item_id = item.id AND item_owner.person_id = :owner))
               AND (:category IS NULL OR item.category = :category)
             ORDER BY item.id"
        ))?
        .query_map(
            rusqlite::named_params! {
                ":owner": filter.owner,
                ":category": filter.category,
            },
            map_item_row,
        )?
        .map(|maybe_item| maybe_item.map_err(|error| error.into()))
        .collect()
}

/// Replace the details and owners of the item with `id`.
///
/// # Errors
/// Returns [Error::UpdateMissingItem] if the item does not exist or
/// [Error::InvalidOwner] if an owner does not exist.
pub fn update_item(id: ItemId, item: &NewItem, connection: &Connection) -> Result<Item, Error> {
    validate_owners(&item.owners, connection)?;

    let rows_affected = connection.execute(
        "UPDATE item SET category = ?1, value = ?2, description = ?3, quantity = ?4
         WHERE id = ?5",
        (
            item.category,
            item.value,
            item.description.as_str(),
            item.quantity,
            id,
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingItem(id));
    }

    connection.execute("DELETE FROM item_owner WHERE item_id = ?1", [id])?;
    insert_owners(id, &item.owners, connection)?;

    get_item(id, connection)
}

/// Delete the item with `id`.
///
/// # Errors
/// Returns [Error::DeleteMissingItem] if the item does not exist.
pub fn delete_item(id: ItemId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM item WHERE id = ?1", [id])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingItem(id));
    }

    Ok(())
}

/// Check that `payer` exists and is flagged as a payer.
pub(crate) fn validate_payer(payer: PersonId, connection: &Connection) -> Result<(), Error> {
    let is_payer: Option<bool> = connection
        .prepare_cached("SELECT payer FROM person WHERE id = ?1")?
        .query_row([payer], |row| row.get(0))
        .optional()?;

    match is_payer {
        Some(true) => Ok(()),
        _ => Err(Error::InvalidPayer(payer)),
    }
}

/// Check that every person in `owners` exists.
pub(crate) fn validate_owners(owners: &[PersonId], connection: &Connection) -> Result<(), Error> {
    let mut statement =
        connection.prepare_cached("SELECT EXISTS(SELECT 1 FROM person WHERE id = ?1)")?;

    for &owner in owners {
        let exists: bool = statement.query_row([owner], |row| row.get(0))?;

        if !exists {
            return Err(Error::InvalidOwner(owner));
        }
    }

    Ok(())
}

fn validate_receipt(receipt: &NewReceipt, connection: &Connection) -> Result<(), Error> {
    if receipt.shop.trim().is_empty() {
        return Err(Error::EmptyShopName);
    }

    validate_payer(receipt.payer, connection)?;

    for item in &receipt.items {
        validate_owners(&item.owners, connection)?;
    }

    Ok(())
}

fn insert_items(
    receipt_id: ReceiptId,
    items: &[NewItem],
    save_date: Date,
    connection: &Connection,
) -> Result<(), Error> {
    let mut insert_item = connection.prepare_cached(
        "INSERT INTO item (receipt_id, save_date, category, value, description, quantity)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         RETURNING id",
    )?;

    for item in items {
        let item_id: ItemId = insert_item.query_row(
            (
                receipt_id,
                save_date,
                item.category,
                item.value,
                item.description.as_str(),
                item.quantity,
            ),
            |row| row.get(0),
        )?;

        insert_owners(item_id, &item.owners, connection)?;
    }

    Ok(())
}

fn insert_owners(item_id: ItemId, owners: &[PersonId], connection: &Connection) -> Result<(), Error> {
    let mut insert_owner = connection
        .prepare_cached("INSERT OR IGNORE INTO item_owner (item_id, person_id) VALUES (?1, ?2)")?;

    for owner in owners {
        insert_owner.execute((item_id, owner))?;
    }

    Ok(())
}

fn get_receipt_items(receipt_id: ReceiptId, connection: &Connection) -> Result<Vec<Item>, Error> {
    connection
        .prepare_cached(&format!(
            "SELECT {ITEM_COLUMNS} FROM item WHERE item.receipt_id = ?1 ORDER BY item.id"
        ))?
        .query_map([receipt_id], map_item_row)?
        .map(|maybe_item| maybe_item.map_err(|error| error.into()))
        .collect()
}

/// Create the receipt, item and item owner tables in the database.
///
/// # Errors
/// Returns an error if the tables cannot be created or if there is an SQL error.
pub fn create_receipt_tables(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS receipt (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            save_date TEXT,
            payment_date TEXT NOT NULL,
            payer_id INTEGER NOT NULL,
            shop TEXT NOT NULL,
            transaction_type TEXT NOT NULL CHECK (transaction_type IN ('expense', 'income')),
            FOREIGN KEY(payer_id) REFERENCES person(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS item (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            receipt_id INTEGER NOT NULL,
            save_date TEXT,
            category TEXT NOT NULL,
            value REAL NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            quantity INTEGER NOT NULL DEFAULT 1,
            FOREIGN KEY(receipt_id) REFERENCES receipt(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS item_owner (
            item_id INTEGER NOT NULL,
            person_id INTEGER NOT NULL,
            PRIMARY KEY(item_id, person_id),
            FOREIGN KEY(item_id) REFERENCES item(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(person_id) REFERENCES person(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_receipt_payment_date ON receipt(payment_date, transaction_type);
        CREATE INDEX IF NOT EXISTS idx_item_receipt ON item(receipt_id);
        CREATE INDEX IF NOT EXISTS idx_item_owner_person ON item_owner(person_id);",
    )?;

    Ok(())
}

/// Map a database row to a [Receipt] without its items.
fn map_receipt_row(row: &Row) -> Result<Receipt, rusqlite::Error> {
    Ok(Receipt {
        id: row.get(0)?,
        save_date: row.get(1)?,
        payment_date: row.get(2)?,
        payer: row.get(3)?,
        shop: row.get(4)?,
        transaction_type: row.get(5)?,
        items: Vec::new(),
    })
}

/// Map a database row to an [Item].
///
/// The last column holds the comma separated owner IDs.
fn map_item_row(row: &Row) -> Result<Item, rusqlite::Error> {
    let raw_owners: Option<String> = row.get(6)?;
    let mut owners = raw_owners
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .filter(|owner| !owner.is_empty())
        .map(|owner| {
            owner.parse::<PersonId>().map_err(|error| {
                rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(error))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    owners.sort_unstable();

    Ok(Item {
        id: row.get(0)?,
        save_date: row.get(1)?,
        category: row.get(2)?,
        value: row.get(3)?,
        description: row.get(4)?,
        quantity: row.get(5)?,
        owners,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error,
        category::Category,
        db::initialize,
        person::{PersonForm, create_person},
        receipt::{
            ItemFilter, NewItem, NewReceipt, ReceiptFilter, TransactionType, create_receipt,
            get_receipt, get_receipts,
        },
    };

    use super::{
        delete_item, delete_receipt, get_item, get_items, get_receipts_after, update_item,
        update_receipt,
    };

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    /// Returns a connection with the payer Alice (ID 1) and the owner Bob (ID 2).
    fn get_connection_with_people() -> Connection {
        let conn = get_test_connection();
        create_person(&PersonForm::payer("Alice"), &conn).unwrap();
        create_person(&PersonForm::owner("Bob"), &conn).unwrap();
        conn
    }

    #[test]
    fn create_succeeds_with_items_and_owners() {
        let conn = get_connection_with_people();
        let new_receipt =
            NewReceipt::build(date!(2025 - 05 - 10), 1, " Lidl ", TransactionType::Expense)
                .item(NewItem::new(Category::FoodDrinks, 12.5, &[2, 1]).description("bread"))
                .item(NewItem::new(Category::Chemistry, 7.0, &[1]));

        let receipt = create_receipt(&new_receipt, date!(2025 - 05 - 11), &conn).unwrap();

        assert_eq!(receipt.shop, "Lidl");
        assert_eq!(receipt.save_date, Some(date!(2025 - 05 - 11)));
        assert_eq!(receipt.items.len(), 2);
        assert_eq!(receipt.items[0].owners, vec![1, 2]);
        assert_eq!(receipt.items[0].description, "bread");
        assert_eq!(receipt.items[0].quantity, 1);
        assert_eq!(receipt.total(), 19.5);
        assert_eq!(get_receipt(receipt.id, &conn), Ok(receipt));
    }

    #[test]
    fn receipts_after_load_items_in_batches() {
        let conn = get_connection_with_people();
        let save_date = date!(2025 - 05 - 31);
        let mut created = Vec::new();
        for (day, shop) in [(1, "Lidl"), (2, "Empty"), (3, "Orlen")] {
            let mut new_receipt = NewReceipt::build(
                date!(2025 - 05 - 01).replace_day(day).unwrap(),
                1,
                shop,
                TransactionType::Expense,
            );
            if shop != "Empty" {
                new_receipt = new_receipt
                    .item(NewItem::new(Category::FoodDrinks, 4.0, &[1, 2]))
                    .item(NewItem::new(Category::Fuel, day as f64, &[2]));
            }
            created.push(create_receipt(&new_receipt, save_date, &conn).unwrap());
        }

        let first_two = get_receipts_after(0, 2, &conn).unwrap();
        let rest = get_receipts_after(created[1].id, 2, &conn).unwrap();

        assert_eq!(first_two, created[..2]);
        assert_eq!(rest, created[2..]);
        assert!(first_two[1].items.is_empty());
        assert_eq!(rest[0].items[0].owners, vec![1, 2]);
        assert_eq!(get_receipts_after(created[2].id, 2, &conn), Ok(vec![]));
    }

    #[test]
    fn create_fails_when_payer_is_not_flagged() {
        let conn = get_connection_with_people();
        let new_receipt =
            NewReceipt::build(date!(2025 - 05 - 10), 2, "Lidl", TransactionType::Expense);

        let result = create_receipt(&new_receipt, date!(2025 - 05 - 10), &conn);

        assert_eq!(result, Err(Error::InvalidPayer(2)));
    }

    #[test]
    fn create_fails_on_missing_owner() {
        let conn = get_connection_with_people();
        let new_receipt =
            NewReceipt::build(date!(2025 - 05 - 10), 1, "Lidl", TransactionType::Expense)
                .item(NewItem::new(Category::Fuel, 100.0, &[1, 42]));

        let result = create_receipt(&new_receipt, date!(2025 - 05 - 10), &conn);

        assert_eq!(result, Err(Error::InvalidOwner(42)));
    }

    #[test]
    fn create_fails_on_empty_shop() {
        let conn = get_connection_with_people();
        let new_receipt = NewReceipt::build(date!(2025 - 05 - 10), 1, "  ", TransactionType::Income);

        let result = create_receipt(&new_receipt, date!(2025 - 05 - 10), &conn);

        assert_eq!(result, Err(Error::EmptyShopName));
    }

    #[test]
    fn filters_select_matching_receipts() {
        let conn = get_connection_with_people();
        let save_date = date!(2025 - 06 - 30);
        let may_groceries =
            NewReceipt::build(date!(2025 - 05 - 10), 1, "Lidl", TransactionType::Expense)
                .item(NewItem::new(Category::FoodDrinks, 10.0, &[2]));
        let june_bills =
            NewReceipt::build(date!(2025 - 06 - 01), 1, "Landlord", TransactionType::Expense)
                .item(NewItem::new(Category::FlatBills, 900.0, &[1]));
        let june_salary =
            NewReceipt::build(date!(2025 - 06 - 10), 1, "Work", TransactionType::Income)
                .item(NewItem::new(Category::WorkIncome, 5000.0, &[1]));
        let may_groceries = create_receipt(&may_groceries, save_date, &conn).unwrap();
        let june_bills = create_receipt(&june_bills, save_date, &conn).unwrap();
        let june_salary = create_receipt(&june_salary, save_date, &conn).unwrap();

        let by_owner = get_receipts(
            &ReceiptFilter {
                owner: Some(2),
                ..Default::default()
            },
            &conn,
        )
        .unwrap();
        let by_month = get_receipts(
            &ReceiptFilter {
                year: Some(2025),
                month: Some(6),
                ..Default::default()
            },
            &conn,
        )
        .unwrap();
        let by_category = get_receipts(
            &ReceiptFilter {
                category: Some(Category::FlatBills),
                ..Default::default()
            },
            &conn,
        )
        .unwrap();
        let by_range_and_type = get_receipts(
            &ReceiptFilter::in_range(date!(2025 - 05 - 01)..=date!(2025 - 06 - 05))
                .transaction_type(Some(TransactionType::Expense)),
            &conn,
        )
        .unwrap();

        assert_eq!(by_owner, vec![may_groceries.clone()]);
        assert_eq!(by_month, vec![june_bills.clone(), june_salary]);
        assert_eq!(by_category, vec![june_bills.clone()]);
        assert_eq!(by_range_and_type, vec![may_groceries, june_bills]);
    }

    #[test]
    fn update_replaces_items() {
        let conn = get_connection_with_people();
        let original = NewReceipt::build(date!(2025 - 05 - 10), 1, "Lidl", TransactionType::Expense)
            .item(NewItem::new(Category::FoodDrinks, 10.0, &[2]))
            .item(NewItem::new(Category::Alcohol, 20.0, &[1]));
        let receipt = create_receipt(&original, date!(2025 - 05 - 10), &conn).unwrap();
        let old_item_id = receipt.items[0].id;

        let replacement =
            NewReceipt::build(date!(2025 - 05 - 12), 1, "Aldi", TransactionType::Expense)
                .item(NewItem::new(Category::Clothes, 99.0, &[1, 2]));
        let updated =
            update_receipt(receipt.id, &replacement, date!(2025 - 05 - 12), &conn).unwrap();

        assert_eq!(updated.id, receipt.id);
        assert_eq!(updated.shop, "Aldi");
        assert_eq!(updated.items.len(), 1);
        assert_eq!(updated.items[0].category, Category::Clothes);
        assert_eq!(get_item(old_item_id, &conn), Err(Error::NotFound));
    }

    #[test]
    fn update_fails_on_missing_receipt() {
        let conn = get_connection_with_people();
        let replacement =
            NewReceipt::build(date!(2025 - 05 - 12), 1, "Aldi", TransactionType::Expense);

        let result = update_receipt(7, &replacement, date!(2025 - 05 - 12), &conn);

        assert_eq!(result, Err(Error::UpdateMissingReceipt(7)));
    }

    #[test]
    fn delete_removes_items() {
        let conn = get_connection_with_people();
        let new_receipt =
            NewReceipt::build(date!(2025 - 05 - 10), 1, "Lidl", TransactionType::Expense)
                .item(NewItem::new(Category::FoodDrinks, 10.0, &[2]));
        let receipt = create_receipt(&new_receipt, date!(2025 - 05 - 10), &conn).unwrap();

        delete_receipt(receipt.id, &conn).unwrap();

        assert_eq!(get_receipt(receipt.id, &conn), Err(Error::NotFound));
        assert_eq!(get_items(&ItemFilter::default(), &conn), Ok(vec![]));
        assert_eq!(
            delete_receipt(receipt.id, &conn),
            Err(Error::DeleteMissingReceipt(receipt.id))
        );
    }

    #[test]
    fn items_can_be_filtered_updated_and_deleted() {
        let conn = get_connection_with_people();
        let new_receipt =
            NewReceipt::build(date!(2025 - 05 - 10), 1, "Lidl", TransactionType::Expense)
                .item(NewItem::new(Category::FoodDrinks, 10.0, &[2]))
                .item(NewItem::new(Category::Fuel, 50.0, &[1]));
        let receipt = create_receipt(&new_receipt, date!(2025 - 05 - 10), &conn).unwrap();

        let bobs_items = get_items(
            &ItemFilter {
                owner: Some(2),
                category: None,
            },
            &conn,
        )
        .unwrap();
        assert_eq!(bobs_items, vec![receipt.items[0].clone()]);

        let updated = update_item(
            receipt.items[1].id,
            &NewItem::new(Category::CarExpenses, 55.0, &[1, 2]),
            &conn,
        )
        .unwrap();
        assert_eq!(updated.owners, vec![1, 2]);
        assert_eq!(updated.category, Category::CarExpenses);

        delete_item(updated.id, &conn).unwrap();
        assert_eq!(get_receipt(receipt.id, &conn).unwrap().items.len(), 1);
        assert_eq!(
            delete_item(updated.id, &conn),
            Err(Error::DeleteMissingItem(updated.id))
        );
    }

    #[test]
    fn deleting_person_cascades() {
        let conn = get_connection_with_people();
        let new_receipt =
            NewReceipt::build(date!(2025 - 05 - 10), 1, "Lidl", TransactionType::Expense)
                .item(NewItem::new(Category::FoodDrinks, 10.0, &[1, 2]));
        let receipt = create_receipt(&new_receipt, date!(2025 - 05 - 10), &conn).unwrap();

        conn.execute("DELETE FROM person WHERE id = 2", []).unwrap();
        assert_eq!(get_receipt(receipt.id, &conn).unwrap().items[0].owners, vec![1]);

        conn.execute("DELETE FROM person WHERE id = 1", []).unwrap();
        assert_eq!(get_receipt(receipt.id, &conn), Err(Error::NotFound));
    }
}

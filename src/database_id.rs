//! Database ID type definitions.

/// Alias for the integer type used for mapping to database IDs.
pub type DatabaseId = i64;
/// The ID of a person.
pub type PersonId = DatabaseId;
/// The ID of a receipt.
pub type ReceiptId = DatabaseId;
/// The ID of a line item on a receipt.
pub type ItemId = DatabaseId;

//! Receipts, their line items and the monthly bills view.

mod core;
mod endpoints;

pub use core::{
    Item, ItemFilter, NewItem, NewReceipt, Receipt, ReceiptFilter, TransactionType,
    create_receipt, create_receipt_tables, delete_item, delete_receipt, get_item, get_items,
    get_receipt, get_receipts, update_item, update_receipt,
};
pub(crate) use core::{get_receipts_after, insert_receipt, validate_owners};
pub use endpoints::{
    create_receipts_endpoint, delete_item_endpoint, delete_receipt_endpoint, get_bills_endpoint,
    get_item_endpoint, get_items_endpoint, get_receipt_endpoint, get_receipts_endpoint,
    update_item_endpoint, update_receipt_endpoint,
};

//! The cache of item descriptions and how often they are used, for suggesting
//! descriptions while entering receipts.

mod core;
mod endpoints;

pub use core::{
    ItemPrediction, clear_predictions, create_item_prediction_table, increment_prediction,
    rescan_predictions, search_predictions,
};
pub use endpoints::{
    clear_predictions_endpoint, rescan_predictions_endpoint, search_predictions_endpoint,
};

//! Paragon is a household receipt tracker.
//!
//! People record receipts made up of line items. Each item is owned by one or
//! more people who share its cost evenly. The library provides a JSON API for
//! the receipts and the reports built on the owners' shares, plus a server
//! rendered dashboard page.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum_server::Handle;
use tokio::signal;

mod app_state;
mod balance;
mod category;
mod charts;
mod dashboard;
mod database_id;
mod db;
mod endpoints;
mod error;
mod html;
mod logging;
mod period;
mod person;
mod prediction;
mod receipt;
mod routing;
mod shop;
mod split;
mod timezone;
mod transfer;

pub use app_state::AppState;
pub use category::Category;
pub use database_id::{DatabaseId, ItemId, PersonId, ReceiptId};
pub use db::initialize as initialize_db;
pub use error::Error;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use person::{Person, PersonForm, create_person};
pub use receipt::{NewItem, NewReceipt, Receipt, TransactionType, create_receipt};
pub use routing::build_router;

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {error}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!("failed to install signal handler: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

//! Application router configuration.

use axum::{
    Router,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};

use crate::{
    AppState, Error,
    balance::{
        create_carry_over_endpoint, get_balance_endpoint, get_monthly_balance_endpoint,
        get_spending_ratio_endpoint,
    },
    category::get_categories,
    charts::{
        get_bar_persons_endpoint, get_bar_shops_endpoint, get_line_sums_endpoint,
        get_monthly_line_sums_endpoint, get_pie_categories_endpoint,
    },
    dashboard::get_dashboard_page,
    endpoints,
    person::{
        create_person_endpoint, delete_person_endpoint, get_person_endpoint,
        get_persons_endpoint, update_person_endpoint,
    },
    prediction::{
        clear_predictions_endpoint, rescan_predictions_endpoint, search_predictions_endpoint,
    },
    receipt::{
        create_receipts_endpoint, delete_item_endpoint, delete_receipt_endpoint,
        get_bills_endpoint, get_item_endpoint, get_items_endpoint, get_receipt_endpoint,
        get_receipts_endpoint, update_item_endpoint, update_receipt_endpoint,
    },
    shop::{clear_shops_endpoint, rescan_shops_endpoint, search_shops_endpoint},
    transfer::{export_receipts_endpoint, export_receipts_zip_endpoint, import_receipts_endpoint},
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route(endpoints::CATEGORIES, get(get_categories))
        .route(
            endpoints::PERSONS,
            get(get_persons_endpoint).post(create_person_endpoint),
        )
        .route(
            endpoints::PERSON,
            get(get_person_endpoint)
                .put(update_person_endpoint)
                .delete(delete_person_endpoint),
        )
        .route(
            endpoints::RECEIPTS,
            get(get_receipts_endpoint).post(create_receipts_endpoint),
        )
        .route(
            endpoints::RECEIPT,
            get(get_receipt_endpoint)
                .put(update_receipt_endpoint)
                .delete(delete_receipt_endpoint),
        )
        .route(endpoints::ITEMS, get(get_items_endpoint))
        .route(
            endpoints::ITEM,
            get(get_item_endpoint)
                .put(update_item_endpoint)
                .delete(delete_item_endpoint),
        )
        .route(endpoints::BILLS, get(get_bills_endpoint))
        .route(endpoints::EXPORT, get(export_receipts_endpoint))
        .route(endpoints::EXPORT_ZIP, get(export_receipts_zip_endpoint))
        .route(endpoints::IMPORT, post(import_receipts_endpoint));

    let report_routes = Router::new()
        .route(
            endpoints::BALANCE,
            get(get_balance_endpoint).post(create_carry_over_endpoint),
        )
        .route(endpoints::SPENDING_RATIO, get(get_spending_ratio_endpoint))
        .route(endpoints::MONTHLY_BALANCE, get(get_monthly_balance_endpoint))
        .route(endpoints::LINE_SUMS, get(get_line_sums_endpoint))
        .route(
            endpoints::LINE_SUMS_MONTHLY,
            get(get_monthly_line_sums_endpoint),
        )
        .route(endpoints::BAR_PERSONS, get(get_bar_persons_endpoint))
        .route(endpoints::BAR_SHOPS, get(get_bar_shops_endpoint))
        .route(endpoints::PIE_CATEGORIES, get(get_pie_categories_endpoint));

    let cache_routes = Router::new()
        .route(
            endpoints::RECENT_SHOPS,
            get(search_shops_endpoint)
                .post(rescan_shops_endpoint)
                .delete(clear_shops_endpoint),
        )
        .route(
            endpoints::PREDICTIONS,
            get(search_predictions_endpoint)
                .post(rescan_predictions_endpoint)
                .delete(clear_predictions_endpoint),
        );

    Router::new()
        .route(endpoints::ROOT, get(get_index_page))
        .route(endpoints::DASHBOARD_VIEW, get(get_dashboard_page))
        .merge(api_routes)
        .merge(report_routes)
        .merge(cache_routes)
        .fallback(get_404_not_found)
        .with_state(state)
}

/// The root path '/' redirects to the dashboard page.
async fn get_index_page() -> Redirect {
    Redirect::to(endpoints::DASHBOARD_VIEW)
}

async fn get_404_not_found() -> Response {
    Error::NotFound.into_response()
}

#[cfg(test)]
mod root_route_tests {
    use axum::{http::StatusCode, response::IntoResponse};
    use axum_test::TestServer;
    use rusqlite::Connection;

    use crate::{
        AppState, endpoints,
        routing::{build_router, get_index_page},
    };

    fn get_test_server() -> TestServer {
        let state = AppState::new(Connection::open_in_memory().unwrap(), "Etc/UTC").unwrap();

        TestServer::try_new(build_router(state)).expect("Could not create test server.")
    }

    #[tokio::test]
    async fn root_redirects_to_dashboard() {
        let response = get_index_page().await.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let location = response.headers().get("location").unwrap();
        assert_eq!(location, endpoints::DASHBOARD_VIEW);
    }

    #[tokio::test]
    async fn unknown_route_is_json_not_found() {
        let server = get_test_server();

        let response = server.get("/api/nope").await;

        response.assert_status_not_found();
        let body: serde_json::Value = response.json();
        assert_eq!(
            body["detail"],
            "the requested resource could not be found"
        );
    }

    #[tokio::test]
    async fn export_route_is_not_shadowed_by_receipt_route() {
        let server = get_test_server();

        let response = server.get(endpoints::EXPORT).await;

        response.assert_status_ok();
        assert_eq!(response.header("x-exported-count"), "0");

        let response = server.get(endpoints::EXPORT_ZIP).await;

        response.assert_status_ok();
        assert_eq!(response.header("content-type"), "application/zip");
    }

    #[tokio::test]
    async fn every_api_module_is_mounted() {
        let server = get_test_server();

        server.get(endpoints::CATEGORIES).await.assert_status_ok();
        server.get(endpoints::PERSONS).await.assert_status_ok();
        server.get(endpoints::RECEIPTS).await.assert_status_ok();
        server.get(endpoints::ITEMS).await.assert_status_ok();
        server.get(endpoints::RECENT_SHOPS).await.assert_status_ok();
        server.get(endpoints::PREDICTIONS).await.assert_status_ok();
        server.get(endpoints::DASHBOARD_VIEW).await.assert_status_ok();
        server
            .get(endpoints::BILLS)
            .add_query_param("year", 2025)
            .add_query_param("month", 1)
            .await
            .assert_status_ok();
    }
}

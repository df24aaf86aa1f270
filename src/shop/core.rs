use std::collections::BTreeSet;

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, database_id::DatabaseId};

/// The shortest search text that is matched against the cache.
pub const MIN_QUERY_LENGTH: usize = 3;

/// The most shops returned by a filtered search.
pub const MAX_SEARCH_RESULTS: usize = 10;

/// A shop name and when it was last used on a receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentShop {
    pub id: DatabaseId,
    /// The trimmed, lowercase shop name.
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub last_used: OffsetDateTime,
}

/// Trim and lowercase a shop name or item description for use as a cache key.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Uppercase the first character of `text` and lowercase the rest.
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();

    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Record that `name` was used at `now`, adding it to the cache if needed.
///
/// Blank names are ignored.
pub fn touch_shop(name: &str, now: OffsetDateTime, connection: &Connection) -> Result<(), Error> {
    let name = normalize_name(name);

    if name.is_empty() {
        return Ok(());
    }

    connection
        .prepare_cached(
            "INSERT INTO recent_shop (name, last_used) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET last_used = excluded.last_used",
        )?
        .execute((name, now))?;

    Ok(())
}

/// Search the cache for shops containing `query`.
///
/// Without a query every shop is returned in alphabetical order. A query
/// shorter than [MIN_QUERY_LENGTH] characters matches nothing. Otherwise the
/// [MAX_SEARCH_RESULTS] most recently used matching shops are returned.
pub fn search_shops(query: Option<&str>, connection: &Connection) -> Result<Vec<RecentShop>, Error> {
    let query = query.map(normalize_name).unwrap_or_default();

    if query.is_empty() {
        return connection
            .prepare("SELECT id, name, last_used FROM recent_shop ORDER BY name")?
            .query_map([], map_recent_shop_row)?
            .map(|maybe_shop| maybe_shop.map_err(|error| error.into()))
            .collect();
    }

    if query.chars().count() < MIN_QUERY_LENGTH {
        return Ok(Vec::new());
    }

    connection
        .prepare(
            "SELECT id, name, last_used FROM recent_shop
             WHERE instr(name, ?1) > 0
             ORDER BY last_used DESC
             LIMIT ?2",
        )?
        .query_map((query, MAX_SEARCH_RESULTS), map_recent_shop_row)?
        .map(|maybe_shop| maybe_shop.map_err(|error| error.into()))
        .collect()
}

/// Add every shop on a receipt plus `new_shops` to the cache, marking them as
/// used at `now`.
///
/// Returns the distinct normalized names that were touched, in alphabetical order.
pub fn rescan_shops(
    new_shops: &[String],
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<Vec<String>, Error> {
    let receipt_shops = connection
        .prepare("SELECT DISTINCT shop FROM receipt")?
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    let all_shops: BTreeSet<String> = receipt_shops
        .iter()
        .chain(new_shops)
        .map(|shop| normalize_name(shop))
        .filter(|shop| !shop.is_empty())
        .collect();

    for shop in &all_shops {
        touch_shop(shop, now, connection)?;
    }

    Ok(all_shops.into_iter().collect())
}

/// Delete every shop from the cache, returning how many were deleted.
pub fn clear_shops(connection: &Connection) -> Result<usize, Error> {
    connection
        .execute("DELETE FROM recent_shop", [])
        .map_err(|error| error.into())
}

/// Create the table for the recent shop cache.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_recent_shop_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS recent_shop (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            last_used TEXT NOT NULL
        )",
        (),
    )?;

    Ok(())
}

fn map_recent_shop_row(row: &Row) -> Result<RecentShop, rusqlite::Error> {
    Ok(RecentShop {
        id: row.get(0)?,
        name: row.get(1)?,
        last_used: row.get(2)?,
    })
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use time::{Duration, macros::datetime};

    use crate::db::initialize;

    use super::{capitalize, clear_shops, rescan_shops, search_shops, touch_shop};

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    fn names(connection: &Connection, query: Option<&str>) -> Vec<String> {
        search_shops(query, connection)
            .unwrap()
            .into_iter()
            .map(|shop| shop.name)
            .collect()
    }

    #[test]
    fn capitalize_matches_sentence_case() {
        assert_eq!(capitalize("lIDL market"), "Lidl market");
        assert_eq!(capitalize("żabka"), "Żabka");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn touch_normalizes_and_updates_last_used() {
        let conn = get_test_connection();
        let earlier = datetime!(2025-05-01 10:00 UTC);
        let later = earlier + Duration::hours(2);

        touch_shop("  LIDL ", earlier, &conn).unwrap();
        touch_shop("lidl", later, &conn).unwrap();

        let shops = search_shops(None, &conn).unwrap();
        assert_eq!(shops.len(), 1);
        assert_eq!(shops[0].name, "lidl");
        assert_eq!(shops[0].last_used, later);
    }

    #[test]
    fn blank_shop_is_ignored() {
        let conn = get_test_connection();

        touch_shop("   ", datetime!(2025-05-01 10:00 UTC), &conn).unwrap();

        assert!(names(&conn, None).is_empty());
    }

    #[test]
    fn short_query_matches_nothing() {
        let conn = get_test_connection();
        touch_shop("lidl", datetime!(2025-05-01 10:00 UTC), &conn).unwrap();

        assert!(names(&conn, Some("li")).is_empty());
    }

    #[test]
    fn query_orders_by_most_recent() {
        let conn = get_test_connection();
        let now = datetime!(2025-05-01 10:00 UTC);
        touch_shop("market one", now, &conn).unwrap();
        touch_shop("market two", now + Duration::minutes(5), &conn).unwrap();
        touch_shop("bakery", now + Duration::minutes(10), &conn).unwrap();

        assert_eq!(names(&conn, Some("MARKET")), vec!["market two", "market one"]);
        assert_eq!(names(&conn, None), vec!["bakery", "market one", "market two"]);
    }

    #[test]
    fn rescan_adds_new_shops_and_clear_removes_all() {
        let conn = get_test_connection();

        let updated = rescan_shops(
            &["Aldi".to_owned(), " aldi ".to_owned(), "Biedronka".to_owned()],
            datetime!(2025-05-01 10:00 UTC),
            &conn,
        )
        .unwrap();

        assert_eq!(updated, vec!["aldi", "biedronka"]);
        assert_eq!(clear_shops(&conn), Ok(2));
        assert!(names(&conn, None).is_empty());
    }
}

//! Calendar helpers for the month and year periods used by the reports.

use std::ops::RangeInclusive;

use serde::Deserialize;
use time::{Date, Month};

use crate::{Error, database_id::PersonId};

/// The `owners[]`, `year` and `month` query parameters shared by the owner
/// share reports.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct OwnerMonthParams {
    #[serde(rename = "owners[]", default)]
    pub owners: Vec<PersonId>,
    pub year: Option<i32>,
    pub month: Option<u8>,
}

impl OwnerMonthParams {
    /// Check that at least one owner, a year and a valid month were given.
    ///
    /// # Errors
    /// Returns [Error::InvalidQuery] if a parameter is missing or the month is
    /// out of range.
    pub fn require(self) -> Result<(Vec<PersonId>, i32, Month), Error> {
        match (self.owners.is_empty(), self.year, self.month) {
            (false, Some(year), Some(month)) => Ok((self.owners, year, parse_month(month)?)),
            _ => Err(Error::InvalidQuery(
                "The parameters owners[], year and month are required and must be numbers."
                    .to_owned(),
            )),
        }
    }
}

/// The span of time a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    /// A single calendar month.
    Monthly { year: i32, month: Month },
    /// A whole calendar year.
    Yearly { year: i32 },
}

impl Period {
    /// Build a period from the `year`, `period` and `month` query parameters.
    ///
    /// `period` defaults to "monthly" and accepts "month" as an alias. A month
    /// is only required for monthly periods.
    ///
    /// # Errors
    /// Returns [Error::InvalidQuery] if a required parameter is missing or out
    /// of range.
    pub fn from_params(
        year: Option<i32>,
        period: Option<&str>,
        month: Option<u8>,
    ) -> Result<Self, Error> {
        let year = year.ok_or_else(|| {
            Error::InvalidQuery("Invalid or missing 'year' parameter".to_owned())
        })?;

        match period.unwrap_or("monthly") {
            "monthly" | "month" => {
                let month = month
                    .ok_or_else(|| {
                        Error::InvalidQuery("Invalid or missing 'month' parameter".to_owned())
                    })
                    .and_then(parse_month)?;

                Ok(Period::Monthly { year, month })
            }
            _ => Ok(Period::Yearly { year }),
        }
    }

    /// The first and last day of the period, inclusive.
    pub fn date_range(&self) -> Result<RangeInclusive<Date>, Error> {
        match *self {
            Period::Monthly { year, month } => month_range(year, month),
            Period::Yearly { year } => {
                let start = first_of_month(year, Month::January)?;
                let end = month_range(year, Month::December)?;
                Ok(start..=*end.end())
            }
        }
    }
}

/// Convert a 1-based month number into a [Month].
///
/// # Errors
/// Returns [Error::InvalidQuery] if `month` is not in 1..=12.
pub fn parse_month(month: u8) -> Result<Month, Error> {
    Month::try_from(month)
        .map_err(|_| Error::InvalidQuery(format!("{month} is not a valid month (1-12)")))
}

/// The first day of `month` in `year`.
pub fn first_of_month(year: i32, month: Month) -> Result<Date, Error> {
    Date::from_calendar_date(year, month, 1)
        .map_err(|error| Error::InvalidDate(format!("{year}-{month}: {error}")))
}

/// Every day of `month` in `year`, inclusive.
pub fn month_range(year: i32, month: Month) -> Result<RangeInclusive<Date>, Error> {
    let start = first_of_month(year, month)?;
    let end = start
        .replace_day(time::util::days_in_year_month(year, month))
        .map_err(|error| Error::InvalidDate(error.to_string()))?;

    Ok(start..=end)
}

/// All the dates in `month` of `year`, in order.
pub fn all_dates_in_month(year: i32, month: Month) -> Result<Vec<Date>, Error> {
    let range = month_range(year, month)?;
    let mut dates = Vec::with_capacity(31);
    let mut date = *range.start();

    while date <= *range.end() {
        dates.push(date);
        match date.next_day() {
            Some(next) => date = next,
            None => break,
        }
    }

    Ok(dates)
}

/// Round `value` to two decimal places for reporting.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use time::{Month, macros::date};

    use crate::{
        Error,
        period::{OwnerMonthParams, Period, all_dates_in_month, month_range, round2},
    };

    #[test]
    fn owner_month_params_require_all_fields() {
        let params = OwnerMonthParams {
            owners: vec![2, 1],
            year: Some(2025),
            month: Some(3),
        };
        assert_eq!(params.require(), Ok((vec![2, 1], 2025, Month::March)));

        let missing_owners = OwnerMonthParams {
            owners: vec![],
            year: Some(2025),
            month: Some(3),
        };
        assert!(matches!(
            missing_owners.require(),
            Err(Error::InvalidQuery(_))
        ));
    }

    #[test]
    fn monthly_is_default_period() {
        let period = Period::from_params(Some(2025), None, Some(2)).unwrap();

        assert_eq!(
            period,
            Period::Monthly {
                year: 2025,
                month: Month::February
            }
        );
        assert_eq!(
            period.date_range().unwrap(),
            date!(2025 - 02 - 01)..=date!(2025 - 02 - 28)
        );
    }

    #[test]
    fn month_alias_is_accepted() {
        let period = Period::from_params(Some(2024), Some("month"), Some(12)).unwrap();

        assert_eq!(
            period,
            Period::Monthly {
                year: 2024,
                month: Month::December
            }
        );
    }

    #[test]
    fn yearly_does_not_need_month() {
        let period = Period::from_params(Some(2024), Some("yearly"), None).unwrap();

        assert_eq!(
            period.date_range().unwrap(),
            date!(2024 - 01 - 01)..=date!(2024 - 12 - 31)
        );
    }

    #[test]
    fn monthly_needs_month() {
        let result = Period::from_params(Some(2024), Some("monthly"), None);

        assert!(matches!(result, Err(Error::InvalidQuery(_))));
    }

    #[test]
    fn month_out_of_range_is_rejected() {
        let result = Period::from_params(Some(2024), None, Some(13));

        assert!(matches!(result, Err(Error::InvalidQuery(_))));
    }

    #[test]
    fn leap_february_has_29_days() {
        let dates = all_dates_in_month(2024, Month::February).unwrap();

        assert_eq!(dates.len(), 29);
        assert_eq!(dates.last(), Some(&date!(2024 - 02 - 29)));
        assert_eq!(
            month_range(2023, Month::February).unwrap().end(),
            &date!(2023 - 02 - 28)
        );
    }

    #[test]
    fn rounds_to_cents() {
        assert_eq!(round2(10.0 / 3.0), 3.33);
        assert_eq!(round2(-7.499), -7.5);
    }
}

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    ops::RangeInclusive,
};

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::{Date, Month};

use crate::{
    Error,
    category::{Category, EXPENSE_DEFAULTS, INCOME_DEFAULTS},
    database_id::{PersonId, ReceiptId},
    period::{Period, all_dates_in_month, month_range, round2},
    receipt::{Receipt, ReceiptFilter, TransactionType, get_receipts},
    split::owned_items,
};

/// How many of a payer's largest receipts are reported as outliers.
const OUTLIER_COUNT: usize = 3;

// ============================================================================
// MODELS
// ============================================================================

/// The query parameters accepted by the chart endpoints.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ChartParams {
    pub year: Option<i32>,
    pub period: Option<String>,
    pub month: Option<u8>,
    #[serde(rename = "owners[]", default)]
    pub owners: Vec<PersonId>,
    #[serde(rename = "category[]", default)]
    pub categories: Vec<Category>,
    /// Alias for `category[]`.
    #[serde(default)]
    pub category: Vec<Category>,
    #[serde(rename = "transactionType")]
    pub transaction_type: Option<String>,
}

impl ChartParams {
    /// The dates covered by the `year`, `period` and `month` parameters.
    pub fn date_range(&self) -> Result<RangeInclusive<Date>, Error> {
        Period::from_params(self.year, self.period.as_deref(), self.month)?.date_range()
    }

    /// The requested categories, from either `category[]` or `category`.
    pub fn categories(&self) -> &[Category] {
        if self.categories.is_empty() {
            &self.category
        } else {
            &self.categories
        }
    }

    /// The requested transaction type. Defaults to expenses, and an empty
    /// value selects both types.
    ///
    /// # Errors
    /// Returns [Error::InvalidTransactionType] for any other value.
    pub fn transaction_type(&self) -> Result<Option<TransactionType>, Error> {
        match self.transaction_type.as_deref() {
            None => Ok(Some(TransactionType::Expense)),
            Some("") => Ok(None),
            Some(key) => key.parse().map(Some),
        }
    }
}

/// The cumulative share totals up to and including a day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySums {
    pub day: Date,
    pub expense: f64,
    pub income: f64,
}

/// The cumulative share totals up to and including a month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySums {
    /// The month formatted as "YYYY-MM".
    pub month: String,
    pub expense: f64,
    pub income: f64,
}

/// A payer's total for one of the bars in the person chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayerExpense {
    pub payer: PersonId,
    pub expense_sum: f64,
    pub receipt_ids: Vec<ReceiptId>,
    /// The receipts with the largest totals among `receipt_ids`, largest first.
    pub top_outlier_receipts: Vec<ReceiptId>,
}

/// The per person bar chart data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonExpenses {
    /// Items with several owners, one of which is the payer.
    pub shared_expenses: Vec<PayerExpense>,
    /// Items the payer paid for but does not own.
    pub not_own_expenses: Vec<PayerExpense>,
}

/// The total spent at a shop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopExpense {
    pub shop: String,
    pub expense_sum: f64,
}

/// The total share of a category, with the CSS colour variable for its slice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryExpense {
    pub category: Category,
    pub expense_sum: f64,
    pub fill: String,
}

// ============================================================================
// AGGREGATIONS
// ============================================================================

/// Sum `owner`'s shares per payment date, split into expenses and income.
fn shares_by_date(receipts: &[Receipt], owner: PersonId) -> BTreeMap<Date, (f64, f64)> {
    let mut totals: BTreeMap<Date, (f64, f64)> = BTreeMap::new();

    for (receipt, item) in owned_items(receipts, &[owner]) {
        let (expense, income) = totals.entry(receipt.payment_date).or_default();

        match receipt.transaction_type {
            TransactionType::Expense => *expense += item.share(),
            TransactionType::Income => *income += item.share(),
        }
    }

    totals
}

/// The running totals of `owner`'s shares for each day of a month.
pub fn daily_line_sums(
    owner: PersonId,
    year: i32,
    month: Month,
    connection: &Connection,
) -> Result<Vec<DailySums>, Error> {
    let receipts = get_receipts(&ReceiptFilter::in_range(month_range(year, month)?), connection)?;
    let totals = shares_by_date(&receipts, owner);

    let mut expense = 0.0;
    let mut income = 0.0;

    all_dates_in_month(year, month).map(|dates| {
        dates
            .into_iter()
            .map(|day| {
                if let Some((day_expense, day_income)) = totals.get(&day) {
                    expense += day_expense;
                    income += day_income;
                }

                DailySums {
                    day,
                    expense: round2(expense),
                    income: round2(income),
                }
            })
            .collect()
    })
}

/// The running totals of `owner`'s shares for each month of a year.
pub fn monthly_line_sums(
    owner: PersonId,
    year: i32,
    connection: &Connection,
) -> Result<Vec<MonthlySums>, Error> {
    let range = Period::Yearly { year }.date_range()?;
    let receipts = get_receipts(&ReceiptFilter::in_range(range), connection)?;

    let mut month_totals = [(0.0, 0.0); 12];
    for (day, (expense, income)) in shares_by_date(&receipts, owner) {
        let index = day.month() as usize - 1;
        month_totals[index].0 += expense;
        month_totals[index].1 += income;
    }

    let mut expense = 0.0;
    let mut income = 0.0;

    Ok(month_totals
        .iter()
        .enumerate()
        .map(|(index, (month_expense, month_income))| {
            expense += month_expense;
            income += month_income;

            MonthlySums {
                month: format!("{year}-{:02}", index + 1),
                expense: round2(expense),
                income: round2(income),
            }
        })
        .collect())
}

#[derive(Default)]
struct PayerTotal {
    sum: f64,
    receipt_ids: BTreeSet<ReceiptId>,
}

/// Sum what each payer spent on shared items and on items they do not own.
///
/// Only expense receipts in `range` are used. When `payers` is not empty only
/// receipts paid by one of them are used. When `categories` is not empty only
/// items in those categories are counted. Carry-over items are never counted.
pub fn bar_persons(
    range: RangeInclusive<Date>,
    payers: &[PersonId],
    categories: &[Category],
    connection: &Connection,
) -> Result<PersonExpenses, Error> {
    let filter = ReceiptFilter::in_range(range).transaction_type(Some(TransactionType::Expense));
    let receipts: Vec<Receipt> = get_receipts(&filter, connection)?
        .into_iter()
        .filter(|receipt| payers.is_empty() || payers.contains(&receipt.payer))
        .collect();

    let receipt_totals: HashMap<ReceiptId, f64> = receipts
        .iter()
        .map(|receipt| (receipt.id, receipt.total()))
        .collect();

    let mut shared: BTreeMap<PersonId, PayerTotal> = BTreeMap::new();
    let mut not_own: BTreeMap<PersonId, PayerTotal> = BTreeMap::new();

    for receipt in &receipts {
        let payer = receipt.payer;
        shared.entry(payer).or_default();
        not_own.entry(payer).or_default();

        for item in &receipt.items {
            if item.category == Category::LastMonthBalance
                || (!categories.is_empty() && !categories.contains(&item.category))
            {
                continue;
            }

            let payer_owns_item = item.owners.contains(&payer);

            if item.owners.len() > 1 && payer_owns_item {
                let total = shared.entry(payer).or_default();
                total.sum += item.value;
                total.receipt_ids.insert(receipt.id);
            }

            if !payer_owns_item {
                let total = not_own.entry(payer).or_default();
                total.sum += item.value;
                total.receipt_ids.insert(receipt.id);
            }
        }
    }

    Ok(PersonExpenses {
        shared_expenses: into_payer_expenses(shared, &receipt_totals),
        not_own_expenses: into_payer_expenses(not_own, &receipt_totals),
    })
}

fn into_payer_expenses(
    totals: BTreeMap<PersonId, PayerTotal>,
    receipt_totals: &HashMap<ReceiptId, f64>,
) -> Vec<PayerExpense> {
    let mut expenses: Vec<PayerExpense> = totals
        .into_iter()
        .map(|(payer, total)| {
            let receipt_ids: Vec<ReceiptId> = total.receipt_ids.into_iter().collect();

            PayerExpense {
                payer,
                expense_sum: round2(total.sum),
                top_outlier_receipts: top_receipts(&receipt_ids, receipt_totals),
                receipt_ids,
            }
        })
        .collect();

    expenses.sort_by(|a, b| b.expense_sum.total_cmp(&a.expense_sum));
    expenses
}

/// The IDs of the [OUTLIER_COUNT] receipts with the largest totals, largest first.
fn top_receipts(receipt_ids: &[ReceiptId], receipt_totals: &HashMap<ReceiptId, f64>) -> Vec<ReceiptId> {
    let mut ranked: Vec<(ReceiptId, f64)> = receipt_ids
        .iter()
        .map(|id| (*id, receipt_totals.get(id).copied().unwrap_or_default()))
        .collect();

    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    ranked
        .into_iter()
        .take(OUTLIER_COUNT)
        .map(|(id, _)| id)
        .collect()
}

/// Sum the full values of the items owned by any of `owners` per shop.
///
/// `transaction_type` of `None` selects both types. When `categories` is
/// empty the default categories of the transaction type are used. Carry-over
/// items are never counted.
pub fn bar_shops(
    range: RangeInclusive<Date>,
    owners: &[PersonId],
    transaction_type: Option<TransactionType>,
    categories: &[Category],
    connection: &Connection,
) -> Result<Vec<ShopExpense>, Error> {
    let mut categories: Vec<Category> = if categories.is_empty() {
        match transaction_type {
            Some(TransactionType::Expense) => EXPENSE_DEFAULTS.to_vec(),
            Some(TransactionType::Income) => INCOME_DEFAULTS.to_vec(),
            None => EXPENSE_DEFAULTS
                .iter()
                .chain(INCOME_DEFAULTS.iter())
                .copied()
                .collect(),
        }
    } else {
        categories.to_vec()
    };
    categories.retain(|category| *category != Category::LastMonthBalance);

    let filter = ReceiptFilter::in_range(range).transaction_type(transaction_type);
    let receipts = get_receipts(&filter, connection)?;

    let mut totals: HashMap<&str, f64> = HashMap::new();
    for (receipt, item) in owned_items(&receipts, owners) {
        if categories.contains(&item.category) {
            *totals.entry(receipt.shop.as_str()).or_default() += item.value;
        }
    }

    let mut shops: Vec<ShopExpense> = totals
        .into_iter()
        .map(|(shop, total)| ShopExpense {
            shop: shop.to_owned(),
            expense_sum: round2(total),
        })
        .collect();

    shops.sort_by(|a, b| {
        b.expense_sum
            .total_cmp(&a.expense_sum)
            .then_with(|| a.shop.cmp(&b.shop))
    });

    Ok(shops)
}

/// Sum the owner shares per category, sorted by category key.
///
/// When `owners` is not empty only items owned by one of them are counted.
/// Carry-over items and items without owners are never counted.
pub fn pie_categories(
    range: RangeInclusive<Date>,
    owners: &[PersonId],
    transaction_type: Option<TransactionType>,
    connection: &Connection,
) -> Result<Vec<CategoryExpense>, Error> {
    let filter = ReceiptFilter::in_range(range).transaction_type(transaction_type);
    let receipts = get_receipts(&filter, connection)?;

    let mut totals: BTreeMap<&'static str, (Category, f64)> = BTreeMap::new();
    for item in receipts.iter().flat_map(|receipt| &receipt.items) {
        if item.category == Category::LastMonthBalance
            || item.owners.is_empty()
            || (!owners.is_empty() && !item.is_owned_by_any(owners))
        {
            continue;
        }

        totals
            .entry(item.category.as_str())
            .or_insert((item.category, 0.0))
            .1 += item.share();
    }

    Ok(totals
        .into_iter()
        .map(|(key, (category, total))| CategoryExpense {
            category,
            expense_sum: round2(total),
            fill: format!("var(--color-{key})"),
        })
        .collect())
}

// ============================================================================
// TESTS
// ============================================================================

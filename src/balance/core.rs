use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::{Date, Month};

use crate::{
    Error,
    category::{Category, FUN_GROUP, INVEST_GROUP, MONTHLY_EXPENSE, MONTHLY_INCOME, SPENDING_GROUP},
    database_id::{ItemId, PersonId},
    period::{first_of_month, month_range, round2},
    person::{get_person, get_persons_flagged_payer},
    receipt::{
        NewItem, NewReceipt, Receipt, ReceiptFilter, TransactionType, create_receipt,
        get_receipts,
    },
    split::{owned_items, sum_owner_shares},
};

/// The shop and item description used for carry-over receipts.
pub const CARRY_OVER_LABEL: &str = "Last month balance";

// ============================================================================
// MODELS
// ============================================================================

/// The balance of the requested owners' shares for a month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OwnerBalance {
    /// A carry-over balance has been recorded for the month.
    Saved {
        computed_balance: f64,
        saved_balance: f64,
        difference: f64,
        create: bool,
    },
    /// No carry-over balance has been recorded, so one may be created.
    Missing {
        computed_balance: f64,
        create: bool,
        year: i32,
        month: u8,
    },
}

/// The data needed to record the balance carried over from last month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarryOver {
    pub year: i32,
    pub month: u8,
    pub value: f64,
}

/// How an owner's expenses split between investing, necessities and fun.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpendingRatio {
    /// Percentages of the total and the IDs of the items in each group.
    Ratio {
        invest: f64,
        spending: f64,
        fun: f64,
        invest_ids: Vec<ItemId>,
        spending_ids: Vec<ItemId>,
        fun_ids: Vec<ItemId>,
    },
    /// The owner had no expenses in the month.
    NoExpenses { detail: String },
}

/// The full values of an owner's income and expense items in a month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTotals {
    pub total_income: f64,
    pub total_expense: f64,
    pub balance: f64,
    pub year: i32,
    pub month: u8,
    pub owner: PersonId,
}

// ============================================================================
// BUSINESS LOGIC
// ============================================================================

/// Compute the income minus expense shares of `owners` for a month and
/// compare it against the carry-over balance saved for the month, if any.
pub fn owner_balance(
    owners: &[PersonId],
    year: i32,
    month: Month,
    connection: &Connection,
) -> Result<OwnerBalance, Error> {
    let receipts = get_receipts(&ReceiptFilter::in_range(month_range(year, month)?), connection)?;
    let (income, expenses): (Vec<Receipt>, Vec<Receipt>) = receipts
        .into_iter()
        .partition(|receipt| receipt.transaction_type == TransactionType::Income);

    let computed_balance =
        round2(sum_owner_shares(&income, owners) - sum_owner_shares(&expenses, owners));

    let first_day = first_of_month(year, month)?;
    let saved_item = income
        .iter()
        .filter(|receipt| receipt.payment_date == first_day)
        .flat_map(|receipt| &receipt.items)
        .find(|item| item.category == Category::LastMonthBalance && item.is_owned_by_any(owners));

    let balance = match saved_item {
        Some(item) => {
            let saved_balance = round2(item.share());

            OwnerBalance::Saved {
                computed_balance,
                saved_balance,
                difference: round2(computed_balance - saved_balance),
                create: false,
            }
        }
        None => OwnerBalance::Missing {
            computed_balance,
            create: true,
            year,
            month: month as u8,
        },
    };

    Ok(balance)
}

/// Record the balance carried over into a month as an income receipt on the
/// first day of the month.
///
/// The receipt is paid by the first person flagged as a payer and the carry
/// over item is owned by every payer. The caller should wrap this in an SQL
/// transaction.
///
/// # Errors
/// Returns [Error::NoPayerDefined] if no person is flagged as a payer.
pub fn record_carry_over(
    carry_over: &CarryOver,
    save_date: Date,
    connection: &Connection,
) -> Result<Receipt, Error> {
    let month = Month::try_from(carry_over.month)
        .map_err(|_| Error::InvalidRequestBody(format!("{} is not a valid month", carry_over.month)))?;
    let payment_date = first_of_month(carry_over.year, month)?;

    let payers = get_persons_flagged_payer(connection)?;
    let payer = payers.first().ok_or(Error::NoPayerDefined)?;
    let owners: Vec<PersonId> = payers.iter().map(|person| person.id).collect();

    let receipt = NewReceipt::build(
        payment_date,
        payer.id,
        CARRY_OVER_LABEL,
        TransactionType::Income,
    )
    .item(
        NewItem::new(Category::LastMonthBalance, carry_over.value, &owners)
            .description(CARRY_OVER_LABEL),
    );

    create_receipt(&receipt, save_date, connection)
}

/// Split `owner`'s expense shares for a month into the invest, spending and
/// fun groups.
///
/// # Errors
/// Returns [Error::NotFound] if `owner` does not exist.
pub fn spending_ratio(
    owner: PersonId,
    year: i32,
    month: Month,
    connection: &Connection,
) -> Result<SpendingRatio, Error> {
    get_person(owner, connection)?;

    let filter = ReceiptFilter::in_range(month_range(year, month)?)
        .transaction_type(Some(TransactionType::Expense));
    let receipts = get_receipts(&filter, connection)?;

    let mut sums = [0.0; 3];
    let mut ids: [Vec<ItemId>; 3] = Default::default();
    let groups: [&[Category]; 3] = [&INVEST_GROUP, &SPENDING_GROUP, &FUN_GROUP];

    for (_, item) in owned_items(&receipts, &[owner]) {
        if let Some(group) = groups.iter().position(|group| group.contains(&item.category)) {
            sums[group] += item.share();
            ids[group].push(item.id);
        }
    }

    let total: f64 = sums.iter().sum();

    if total == 0.0 {
        return Ok(SpendingRatio::NoExpenses {
            detail: "No expenses in this period.".to_owned(),
        });
    }

    let [invest_ids, spending_ids, fun_ids] = ids.map(|mut group_ids| {
        group_ids.sort_unstable();
        group_ids
    });

    Ok(SpendingRatio::Ratio {
        invest: round2(sums[0] / total * 100.0),
        spending: round2(sums[1] / total * 100.0),
        fun: round2(sums[2] / total * 100.0),
        invest_ids,
        spending_ids,
        fun_ids,
    })
}

/// Sum the full values of `owner`'s items in the monthly income and expense
/// categories.
pub fn monthly_totals(
    owner: PersonId,
    year: i32,
    month: Month,
    connection: &Connection,
) -> Result<MonthlyTotals, Error> {
    let receipts = get_receipts(&ReceiptFilter::in_range(month_range(year, month)?), connection)?;

    let (total_income, total_expense) = owned_items(&receipts, &[owner]).fold(
        (0.0, 0.0),
        |(income, expense), (_, item)| {
            if MONTHLY_INCOME.contains(&item.category) {
                (income + item.value, expense)
            } else if MONTHLY_EXPENSE.contains(&item.category) {
                (income, expense + item.value)
            } else {
                (income, expense)
            }
        },
    );

    Ok(MonthlyTotals {
        total_income: round2(total_income),
        total_expense: round2(total_expense),
        balance: round2(total_income - total_expense),
        year,
        month: month as u8,
        owner,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use time::{Month, macros::date};

    use crate::{
        Error,
        category::Category,
        db::initialize,
        person::{PersonForm, create_person},
        receipt::{NewItem, NewReceipt, TransactionType, create_receipt},
    };

    use super::{
        CarryOver, MonthlyTotals, OwnerBalance, SpendingRatio, monthly_totals, owner_balance,
        record_carry_over, spending_ratio,
    };

    /// Alice (1) and Carol (3) are payers, Bob (2) is only an owner.
    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        create_person(&PersonForm::payer("Alice"), &conn).unwrap();
        create_person(&PersonForm::owner("Bob"), &conn).unwrap();
        create_person(&PersonForm::payer("Carol"), &conn).unwrap();
        conn
    }

    fn add_receipt(receipt: NewReceipt, conn: &Connection) {
        create_receipt(&receipt, date!(2025 - 03 - 31), conn).unwrap();
    }

    fn add_march_receipts(conn: &Connection) {
        add_receipt(
            NewReceipt::build(date!(2025 - 03 - 10), 1, "Work", TransactionType::Income)
                .item(NewItem::new(Category::WorkIncome, 1000.0, &[1])),
            conn,
        );
        add_receipt(
            NewReceipt::build(date!(2025 - 03 - 12), 1, "Lidl", TransactionType::Expense)
                .item(NewItem::new(Category::FoodDrinks, 90.0, &[1, 2, 3]))
                .item(NewItem::new(Category::Alcohol, 40.0, &[1]))
                .item(NewItem::new(Category::InvestmentsSavings, 70.0, &[1])),
            conn,
        );
        add_receipt(
            NewReceipt::build(date!(2025 - 04 - 01), 1, "Lidl", TransactionType::Expense)
                .item(NewItem::new(Category::FoodDrinks, 500.0, &[1])),
            conn,
        );
    }

    #[test]
    fn balance_without_carry_over_asks_to_create() {
        let conn = get_test_connection();
        add_march_receipts(&conn);

        let balance = owner_balance(&[1], 2025, Month::March, &conn).unwrap();

        assert_eq!(
            balance,
            OwnerBalance::Missing {
                computed_balance: 860.0,
                create: true,
                year: 2025,
                month: 3
            }
        );
    }

    #[test]
    fn shared_item_counts_once_for_several_owners() {
        let conn = get_test_connection();
        add_march_receipts(&conn);

        let balance = owner_balance(&[2, 3], 2025, Month::March, &conn).unwrap();

        assert!(matches!(
            balance,
            OwnerBalance::Missing { computed_balance, .. } if computed_balance == -30.0
        ));
    }

    #[test]
    fn balance_compares_against_carry_over() {
        let conn = get_test_connection();
        add_march_receipts(&conn);
        let carry_over = CarryOver {
            year: 2025,
            month: 3,
            value: 100.0,
        };
        let receipt = record_carry_over(&carry_over, date!(2025 - 03 - 01), &conn).unwrap();

        assert_eq!(receipt.payer, 1);
        assert_eq!(receipt.payment_date, date!(2025 - 03 - 01));
        assert_eq!(receipt.items[0].owners, vec![1, 3]);

        let balance = owner_balance(&[1], 2025, Month::March, &conn).unwrap();

        assert_eq!(
            balance,
            OwnerBalance::Saved {
                computed_balance: 910.0,
                saved_balance: 50.0,
                difference: 860.0,
                create: false,
            }
        );
    }

    #[test]
    fn carry_over_needs_payer() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        create_person(&PersonForm::owner("Bob"), &conn).unwrap();
        let carry_over = CarryOver {
            year: 2025,
            month: 3,
            value: 100.0,
        };

        let result = record_carry_over(&carry_over, date!(2025 - 03 - 01), &conn);

        assert_eq!(result, Err(Error::NoPayerDefined));
    }

    #[test]
    fn spending_ratio_splits_groups() {
        let conn = get_test_connection();
        add_march_receipts(&conn);

        let ratio = spending_ratio(1, 2025, Month::March, &conn).unwrap();

        // Shares: food 30, alcohol 40, investments 70.
        assert_eq!(
            ratio,
            SpendingRatio::Ratio {
                invest: 50.0,
                spending: 21.43,
                fun: 28.57,
                invest_ids: vec![4],
                spending_ids: vec![2],
                fun_ids: vec![3],
            }
        );
    }

    #[test]
    fn spending_ratio_without_expenses() {
        let conn = get_test_connection();

        let ratio = spending_ratio(2, 2025, Month::March, &conn).unwrap();

        assert!(matches!(ratio, SpendingRatio::NoExpenses { .. }));
        assert_eq!(
            spending_ratio(42, 2025, Month::March, &conn),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn monthly_totals_use_full_values() {
        let conn = get_test_connection();
        add_march_receipts(&conn);

        let totals = monthly_totals(1, 2025, Month::March, &conn).unwrap();

        assert_eq!(
            totals,
            MonthlyTotals {
                total_income: 1000.0,
                total_expense: 200.0,
                balance: 800.0,
                year: 2025,
                month: 3,
                owner: 1,
            }
        );
    }
}

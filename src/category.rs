//! The fixed set of item categories and the groups used by the reports.

use std::{fmt::Display, str::FromStr};

use axum::Json;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::Error;

/// What a line item was spent on or where income came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum Category {
    Fuel,
    CarExpenses,
    Fastfood,
    Alcohol,
    FoodDrinks,
    Chemistry,
    Clothes,
    ElectronicsGames,
    TicketsEntrance,
    Delivery,
    OtherShopping,
    FlatBills,
    MonthlySubscriptions,
    OtherCyclicalExpenses,
    InvestmentsSavings,
    Other,
    ForStudy,
    WorkIncome,
    FamilyIncome,
    InvestmentsIncome,
    MoneyBack,
    /// The carry-over recorded at the start of a month.
    LastMonthBalance,
}

impl Category {
    /// Every category in display order.
    pub const ALL: [Category; 22] = [
        Category::Fuel,
        Category::CarExpenses,
        Category::Fastfood,
        Category::Alcohol,
        Category::FoodDrinks,
        Category::Chemistry,
        Category::Clothes,
        Category::ElectronicsGames,
        Category::TicketsEntrance,
        Category::Delivery,
        Category::OtherShopping,
        Category::FlatBills,
        Category::MonthlySubscriptions,
        Category::OtherCyclicalExpenses,
        Category::InvestmentsSavings,
        Category::Other,
        Category::ForStudy,
        Category::WorkIncome,
        Category::FamilyIncome,
        Category::InvestmentsIncome,
        Category::MoneyBack,
        Category::LastMonthBalance,
    ];

    /// The snake_case key used in the database and the JSON API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Fuel => "fuel",
            Category::CarExpenses => "car_expenses",
            Category::Fastfood => "fastfood",
            Category::Alcohol => "alcohol",
            Category::FoodDrinks => "food_drinks",
            Category::Chemistry => "chemistry",
            Category::Clothes => "clothes",
            Category::ElectronicsGames => "electronics_games",
            Category::TicketsEntrance => "tickets_entrance",
            Category::Delivery => "delivery",
            Category::OtherShopping => "other_shopping",
            Category::FlatBills => "flat_bills",
            Category::MonthlySubscriptions => "monthly_subscriptions",
            Category::OtherCyclicalExpenses => "other_cyclical_expenses",
            Category::InvestmentsSavings => "investments_savings",
            Category::Other => "other",
            Category::ForStudy => "for_study",
            Category::WorkIncome => "work_income",
            Category::FamilyIncome => "family_income",
            Category::InvestmentsIncome => "investments_income",
            Category::MoneyBack => "money_back",
            Category::LastMonthBalance => "last_month_balance",
        }
    }

    /// A human readable name for the category.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Fuel => "Fuel",
            Category::CarExpenses => "Car expenses",
            Category::Fastfood => "Fast food",
            Category::Alcohol => "Alcohol",
            Category::FoodDrinks => "Food & drinks",
            Category::Chemistry => "Household chemistry",
            Category::Clothes => "Clothes",
            Category::ElectronicsGames => "Electronics & games",
            Category::TicketsEntrance => "Tickets & entrance fees",
            Category::Delivery => "Delivery",
            Category::OtherShopping => "Other shopping",
            Category::FlatBills => "Flat bills",
            Category::MonthlySubscriptions => "Monthly subscriptions",
            Category::OtherCyclicalExpenses => "Other cyclical expenses",
            Category::InvestmentsSavings => "Investments & savings",
            Category::Other => "Other",
            Category::ForStudy => "For study",
            Category::WorkIncome => "Work income",
            Category::FamilyIncome => "Family income",
            Category::InvestmentsIncome => "Investment income",
            Category::MoneyBack => "Money back",
            Category::LastMonthBalance => "Last month balance",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == key)
            .ok_or_else(|| Error::InvalidCategory(key.to_owned()))
    }
}

impl ToSql for Category {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Category {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let key = value.as_str()?;
        key.parse()
            .map_err(|error: Error| FromSqlError::Other(Box::new(error)))
    }
}

/// The categories used for expenses when a report is not given any.
pub const EXPENSE_DEFAULTS: [Category; 16] = [
    Category::Fuel,
    Category::CarExpenses,
    Category::Fastfood,
    Category::Alcohol,
    Category::FoodDrinks,
    Category::Chemistry,
    Category::Clothes,
    Category::ElectronicsGames,
    Category::TicketsEntrance,
    Category::Delivery,
    Category::OtherShopping,
    Category::FlatBills,
    Category::MonthlySubscriptions,
    Category::OtherCyclicalExpenses,
    Category::InvestmentsSavings,
    Category::Other,
];

/// The categories used for income when a report is not given any.
pub const INCOME_DEFAULTS: [Category; 6] = [
    Category::ForStudy,
    Category::WorkIncome,
    Category::FamilyIncome,
    Category::InvestmentsIncome,
    Category::MoneyBack,
    Category::Other,
];

/// Income categories counted by the monthly totals.
pub const MONTHLY_INCOME: [Category; 4] = [
    Category::WorkIncome,
    Category::FamilyIncome,
    Category::InvestmentsIncome,
    Category::MoneyBack,
];

/// Expense categories counted by the monthly totals.
pub const MONTHLY_EXPENSE: [Category; 17] = [
    Category::Fuel,
    Category::CarExpenses,
    Category::Fastfood,
    Category::Alcohol,
    Category::FoodDrinks,
    Category::Chemistry,
    Category::Clothes,
    Category::ElectronicsGames,
    Category::TicketsEntrance,
    Category::Delivery,
    Category::OtherShopping,
    Category::FlatBills,
    Category::MonthlySubscriptions,
    Category::OtherCyclicalExpenses,
    Category::InvestmentsSavings,
    Category::Other,
    Category::ForStudy,
];

/// Money put aside, for the spending ratio.
pub const INVEST_GROUP: [Category; 1] = [Category::InvestmentsSavings];

/// Necessary spending, for the spending ratio.
pub const SPENDING_GROUP: [Category; 6] = [
    Category::Fuel,
    Category::CarExpenses,
    Category::FoodDrinks,
    Category::Chemistry,
    Category::TicketsEntrance,
    Category::FlatBills,
];

/// Discretionary spending, for the spending ratio.
pub const FUN_GROUP: [Category; 9] = [
    Category::Fastfood,
    Category::Alcohol,
    Category::Clothes,
    Category::ElectronicsGames,
    Category::Delivery,
    Category::OtherShopping,
    Category::MonthlySubscriptions,
    Category::OtherCyclicalExpenses,
    Category::Other,
];

/// A category key paired with its label.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct CategoryOption {
    pub key: Category,
    pub label: &'static str,
}

/// List every category with its label, for populating drop downs.
pub async fn get_categories() -> Json<Vec<CategoryOption>> {
    Json(
        Category::ALL
            .into_iter()
            .map(|key| CategoryOption {
                key,
                label: key.label(),
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use crate::{
        Error,
        category::{Category, EXPENSE_DEFAULTS, FUN_GROUP, INVEST_GROUP, SPENDING_GROUP},
    };

    #[test]
    fn keys_round_trip_through_from_str() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>(), Ok(category));
        }
    }

    #[test]
    fn serde_uses_snake_case_keys() {
        let json = serde_json::to_string(&Category::OtherCyclicalExpenses).unwrap();

        assert_eq!(json, "\"other_cyclical_expenses\"");
    }

    #[test]
    fn unknown_key_is_rejected() {
        assert_eq!(
            "groceries".parse::<Category>(),
            Err(Error::InvalidCategory("groceries".to_owned()))
        );
    }

    #[test]
    fn spending_ratio_groups_cover_expense_defaults() {
        for category in EXPENSE_DEFAULTS {
            let groups = [
                INVEST_GROUP.contains(&category),
                SPENDING_GROUP.contains(&category),
                FUN_GROUP.contains(&category),
            ];
            assert_eq!(
                groups.iter().filter(|&&in_group| in_group).count(),
                1,
                "{category} should be in exactly one group"
            );
        }
    }
}

//! Chart generation and rendering for the dashboard.
//!
//! Each chart is generated as JSON configuration for the ECharts library and
//! rendered with an HTML container and JavaScript initialization code.

use charming::{
    Chart,
    component::{Axis, Grid, Legend, Title},
    element::{
        AxisLabel, AxisPointer, AxisPointerType, AxisType, JsFunction, Tooltip, Trigger,
    },
    series::{Line, Pie, bar},
};
use maud::{Markup, PreEscaped, html};
use time::{Date, Month};

use crate::{
    Error,
    charts::{CategoryExpense, ShopExpense},
    database_id::PersonId,
    html::{CURRENCY_CODE, CURRENCY_LOCALE, HeadElement},
    period::{all_dates_in_month, round2},
    receipt::{Receipt, TransactionType},
    split::owned_items,
};

/// Only the biggest shops are drawn, the rest would not fit on the axis.
const MAX_SHOP_BARS: usize = 10;

/// A dashboard chart with its HTML container ID and ECharts configuration.
pub(super) struct DashboardChart {
    /// The HTML element ID to use for the chart (kebab-case)
    pub id: &'static str,
    /// The ECharts configuration as a JSON string
    pub options: String,
}

/// Renders the HTML containers for dashboard charts.
pub(super) fn charts_view(charts: &[DashboardChart]) -> Markup {
    html!(
        section
            id="charts"
            class="w-full mx-auto mb-4"
        {
            div class="grid grid-cols-1 xl:grid-cols-2 gap-4"
            {
                @for chart in charts {
                    div
                        id=(chart.id)
                        class="min-h-[380px] rounded dark:bg-gray-100"
                        style="min-height: 380px;"
                    {}
                }
            }
        }
    )
}

/// Generates JavaScript initialization code for dashboard charts.
///
/// Creates scripts that initialize ECharts instances with dark mode support
/// and responsive resizing.
pub(super) fn charts_script(charts: &[DashboardChart]) -> HeadElement {
    let script_content = charts
        .iter()
        .map(|chart| {
            format!(
                r#"(function() {{
                    const chartDom = document.getElementById("{}");
                    const chart = echarts.init(chartDom);
                    const option = {};
                    chart.setOption(option);

                    window.addEventListener('resize', chart.resize);

                    const darkModeMediaQuery = window.matchMedia('(prefers-color-scheme: dark)');
                    const updateTheme = () => {{
                        const isDarkMode = darkModeMediaQuery.matches;
                        chart.setTheme(isDarkMode ? 'dark' : 'default');
                    }}
                    darkModeMediaQuery.addEventListener('change', updateTheme);
                    updateTheme();
                }})();"#,
                chart.id, chart.options
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let wrapped_script = format!(
        "document.addEventListener('DOMContentLoaded', function() {{\n{}\n}});",
        script_content
    );

    HeadElement::ScriptSource(PreEscaped(wrapped_script))
}

/// The owners' expense shares per category.
pub(super) fn category_pie_chart(categories: &[CategoryExpense]) -> Chart {
    let data: Vec<(f64, &str)> = categories
        .iter()
        .map(|category| (category.expense_sum, category.category.label()))
        .collect();

    Chart::new()
        .title(Title::new().text("Expenses by category"))
        .tooltip(
            Tooltip::new()
                .trigger(Trigger::Item)
                .value_formatter(currency_formatter()),
        )
        .legend(Legend::new().bottom(0))
        .series(
            Pie::new()
                .name("Categories")
                .radius(vec!["40%", "65%"])
                .data(data),
        )
}

/// Total spent at the biggest shops on items the owners own.
pub(super) fn shop_bar_chart(shops: &[ShopExpense]) -> Chart {
    let shops = &shops[..shops.len().min(MAX_SHOP_BARS)];
    let labels: Vec<String> = shops.iter().map(|shop| shop.shop.clone()).collect();
    let values: Vec<f64> = shops.iter().map(|shop| shop.expense_sum).collect();

    Chart::new()
        .title(Title::new().text("Shops").subtext("Full value of owned items"))
        .tooltip(currency_tooltip())
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("3%")
                .contain_label(true),
        )
        .x_axis(Axis::new().type_(AxisType::Category).data(labels))
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter(currency_formatter())),
        )
        .series(bar::Bar::new().name("Spent").data(values))
}

/// Running totals of the owners' shares, one point per day of the month.
pub(super) fn daily_line_chart(cumulative: &[CumulativeDay]) -> Chart {
    let labels: Vec<String> = cumulative.iter().map(|day| day.date.day().to_string()).collect();
    let expenses: Vec<f64> = cumulative.iter().map(|day| day.expense).collect();
    let income: Vec<f64> = cumulative.iter().map(|day| day.income).collect();

    Chart::new()
        .title(Title::new().text("Month so far").subtext("Cumulative shares"))
        .tooltip(currency_tooltip())
        .legend(Legend::new().top("1%"))
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("3%")
                .top(70)
                .contain_label(true),
        )
        .x_axis(Axis::new().type_(AxisType::Category).data(labels))
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter(currency_formatter())),
        )
        .series(Line::new().name("Expenses").data(expenses))
        .series(Line::new().name("Income").data(income))
}

/// The owners' running expense and income totals at the end of a day.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct CumulativeDay {
    pub date: Date,
    pub expense: f64,
    pub income: f64,
}

/// Accumulate the shares of the items owned by any of `owners` for every day
/// of `month`.
///
/// Each item counts once however many of `owners` own it.
pub(super) fn cumulative_daily_shares(
    receipts: &[Receipt],
    owners: &[PersonId],
    year: i32,
    month: Month,
) -> Result<Vec<CumulativeDay>, Error> {
    let mut expense = 0.0;
    let mut income = 0.0;

    Ok(all_dates_in_month(year, month)?
        .into_iter()
        .map(|date| {
            for (receipt, item) in owned_items(receipts, owners) {
                if receipt.payment_date != date {
                    continue;
                }

                match receipt.transaction_type {
                    TransactionType::Expense => expense += item.share(),
                    TransactionType::Income => income += item.share(),
                }
            }

            CumulativeDay {
                date,
                expense: round2(expense),
                income: round2(income),
            }
        })
        .collect())
}

#[inline]
fn currency_formatter() -> JsFunction {
    JsFunction::new_with_args(
        "number",
        &format!(
            "const currencyFormatter = new Intl.NumberFormat('{CURRENCY_LOCALE}', {{
              style: 'currency',
              currency: '{CURRENCY_CODE}'
            }});
            return (number) ? currencyFormatter.format(number) : \"-\";"
        ),
    )
}

/// Creates a tooltip configuration for currency values
fn currency_tooltip() -> Tooltip {
    Tooltip::new()
        .trigger(Trigger::Axis)
        .value_formatter(currency_formatter())
        .axis_pointer(AxisPointer::new().type_(AxisPointerType::Shadow))
}

#[cfg(test)]
mod tests {
    use time::{Month, macros::date};

    use crate::{
        category::Category,
        charts::ShopExpense,
        receipt::{Item, Receipt, TransactionType},
    };

    use super::{CumulativeDay, cumulative_daily_shares, shop_bar_chart};

    fn receipt(payment_date: time::Date, transaction_type: TransactionType, items: Vec<Item>) -> Receipt {
        Receipt {
            id: 1,
            save_date: None,
            payment_date,
            payer: 1,
            shop: "Lidl".to_owned(),
            transaction_type,
            items,
        }
    }

    fn item(category: Category, value: f64, owners: &[i64]) -> Item {
        Item {
            id: 1,
            save_date: None,
            category,
            value,
            description: String::new(),
            quantity: 1,
            owners: owners.to_vec(),
        }
    }

    #[test]
    fn cumulative_shares_carry_forward() {
        let receipts = [
            receipt(
                date!(2025 - 02 - 03),
                TransactionType::Expense,
                vec![item(Category::FoodDrinks, 30.0, &[1, 2])],
            ),
            receipt(
                date!(2025 - 02 - 10),
                TransactionType::Income,
                vec![item(Category::WorkIncome, 100.0, &[1])],
            ),
            receipt(
                date!(2025 - 02 - 10),
                TransactionType::Expense,
                vec![item(Category::Fuel, 50.0, &[3])],
            ),
        ];

        let days = cumulative_daily_shares(&receipts, &[1, 2], 2025, Month::February).unwrap();

        assert_eq!(days.len(), 28);
        assert_eq!(
            days[1],
            CumulativeDay {
                date: date!(2025 - 02 - 02),
                expense: 0.0,
                income: 0.0
            }
        );
        assert_eq!(days[2].expense, 15.0);
        assert_eq!(
            days[27],
            CumulativeDay {
                date: date!(2025 - 02 - 28),
                expense: 15.0,
                income: 100.0
            }
        );
    }

    #[test]
    fn shop_chart_is_capped() {
        let shops: Vec<ShopExpense> = (0..15)
            .map(|index| ShopExpense {
                shop: format!("shop {index}"),
                expense_sum: 100.0 - index as f64,
            })
            .collect();

        let options = shop_bar_chart(&shops).to_string();

        assert!(options.contains("shop 9"));
        assert!(!options.contains("shop 10"));
    }
}

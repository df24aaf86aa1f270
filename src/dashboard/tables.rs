//! Table views for dashboard data display.

use maud::{Markup, html};

use crate::{
    database_id::PersonId,
    html::{TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, format_currency},
    period::round2,
    person::Person,
    receipt::{Receipt, TransactionType},
    split::owned_items,
};

const TABLE_HEADER_CELL_STYLE: &str = "px-3 py-3 text-center min-w-[100px]";
const TABLE_HEADER_FIRST_CELL_STYLE: &str =
    "px-3 py-3 sticky left-0 bg-gray-100 dark:bg-gray-700 z-10 font-semibold";
const TABLE_STICKY_CELL_STYLE: &str = "px-3 py-4 font-medium text-gray-900 dark:text-white sticky left-0 bg-white dark:bg-gray-800 z-10";
const TABLE_DATA_CELL_STYLE: &str = "text-center whitespace-nowrap";
const TABLE_CELL_GREEN_STYLE: &str = "text-green-600 dark:text-green-400";
const TABLE_CELL_RED_STYLE: &str = "text-red-600 dark:text-red-400";

/// Gets the CSS class for coloring amounts (green for positive, red for negative).
fn amount_color_class(amount: f64) -> &'static str {
    if amount >= 0.0 {
        TABLE_CELL_GREEN_STYLE
    } else {
        TABLE_CELL_RED_STYLE
    }
}

/// The income and expense shares of one column of the summary table.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct ShareSummary {
    pub label: String,
    pub income: f64,
    pub expense: f64,
}

impl ShareSummary {
    fn new(label: &str, receipts: &[Receipt], owners: &[PersonId]) -> Self {
        let mut income = 0.0;
        let mut expense = 0.0;

        for (receipt, item) in owned_items(receipts, owners) {
            match receipt.transaction_type {
                TransactionType::Income => income += item.share(),
                TransactionType::Expense => expense += item.share(),
            }
        }

        Self {
            label: label.to_owned(),
            income: round2(income),
            expense: round2(expense),
        }
    }

    pub fn balance(&self) -> f64 {
        round2(self.income - self.expense)
    }
}

/// One column per selected owner, followed by the selected owners together.
///
/// The combined column counts every item once, even when several of the
/// selected owners own it.
pub(super) fn share_summaries(receipts: &[Receipt], owners: &[Person]) -> Vec<ShareSummary> {
    let owner_ids: Vec<PersonId> = owners.iter().map(|owner| owner.id).collect();

    let mut summaries: Vec<ShareSummary> = owners
        .iter()
        .map(|owner| ShareSummary::new(&owner.name, receipts, &[owner.id]))
        .collect();

    if owners.len() > 1 {
        summaries.push(ShareSummary::new("Together", receipts, &owner_ids));
    }

    summaries
}

/// Renders a table with the income share, expense share and balance of each summary.
pub(super) fn summary_table(summaries: &[ShareSummary]) -> Markup {
    html! {
        div {
            h3 class="text-xl font-semibold mb-4" { "Summary" }

            div id="summary-table" class="overflow-x-auto rounded-lg shadow" {
                table class="w-full text-sm text-left text-gray-500 dark:text-gray-400" {
                    thead class=(TABLE_HEADER_STYLE) {
                        tr {
                            th scope="col" class=(TABLE_HEADER_FIRST_CELL_STYLE) { "" }
                            @for summary in summaries {
                                th scope="col" class={(TABLE_HEADER_CELL_STYLE) " font-semibold"} {
                                    (summary.label)
                                }
                            }
                        }
                    }
                    tbody {
                        tr class=(TABLE_ROW_STYLE) {
                            th scope="row" class=(TABLE_STICKY_CELL_STYLE) { "Income" }
                            @for summary in summaries {
                                td class={(TABLE_CELL_STYLE) " " (TABLE_DATA_CELL_STYLE) " " (TABLE_CELL_GREEN_STYLE)} {
                                    (format_currency(summary.income))
                                }
                            }
                        }

                        tr class=(TABLE_ROW_STYLE) {
                            th scope="row" class=(TABLE_STICKY_CELL_STYLE) { "Expenses" }
                            @for summary in summaries {
                                td class={(TABLE_CELL_STYLE) " " (TABLE_DATA_CELL_STYLE) " " (TABLE_CELL_RED_STYLE)} {
                                    (format_currency(summary.expense))
                                }
                            }
                        }

                        tr class=(TABLE_ROW_STYLE) {
                            th scope="row" class=(TABLE_STICKY_CELL_STYLE) { "Balance" }
                            @for summary in summaries {
                                @let balance = summary.balance();
                                td class=(TABLE_CELL_STYLE) {
                                    div class={(TABLE_DATA_CELL_STYLE) " " (amount_color_class(balance)) " font-bold"} {
                                        (format_currency(balance))
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

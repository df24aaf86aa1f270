use maud::{DOCTYPE, Markup, PreEscaped, html};

use std::sync::OnceLock;

use numfmt::{Formatter, Precision};

const ECHARTS_URL: &str = "https://cdn.jsdelivr.net/npm/echarts@5.6.0/dist/echarts.min.js";

// Table styles
pub const TABLE_HEADER_STYLE: &str = "text-xs text-gray-700 uppercase \
    bg-gray-50 dark:bg-gray-700 dark:text-gray-400";

pub const TABLE_ROW_STYLE: &str = "bg-white border-b dark:bg-gray-800 dark:border-gray-700";

pub const TABLE_CELL_STYLE: &str = "px-6 py-4";

// Page container
pub const PAGE_CONTAINER_STYLE: &str =
    "flex flex-col items-center px-6 py-8 mx-auto lg:py-5 text-gray-900 dark:text-white";

pub enum HeadElement {
    /// The file path or URL to a JavaScript script.
    ScriptLink(String),
    /// JavaScript source code.
    ScriptSource(PreEscaped<String>),
}

impl HeadElement {
    /// The ECharts library used by the chart scripts.
    pub fn echarts() -> Self {
        HeadElement::ScriptLink(ECHARTS_URL.to_owned())
    }
}

pub fn base(title: &str, head_elements: &[HeadElement], content: &Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en"
        {
            head
            {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) " - Paragon" }

                style
                {
                    r#"
                    body {
                        font-family: system-ui, sans-serif;
                    }

                    .echarts-tooltip {
                        z-index: 30 !important;
                    }
                    "#
                }

                @for element in head_elements
                {
                    @match element
                    {
                        HeadElement::ScriptSource(text) => script { (text) }
                        HeadElement::ScriptLink(path) => script src=(path) {}
                    }
                }
            }

            body class="container max-w-full min-h-screen bg-gray-50 dark:bg-gray-900"
            {
                (content)
            }
        }
    }
}

/// The symbol written after every amount of money.
pub const CURRENCY_SYMBOL: &str = "zł";
/// The ISO 4217 code of [CURRENCY_SYMBOL], used by the chart formatters.
pub const CURRENCY_CODE: &str = "PLN";
/// The locale the chart formatters format amounts for.
pub const CURRENCY_LOCALE: &str = "pl-PL";

fn currency_formatter() -> Option<&'static Formatter> {
    static FORMATTER: OnceLock<Option<Formatter>> = OnceLock::new();

    FORMATTER
        .get_or_init(|| {
            // No prefix, the symbol goes after the amount.
            Formatter::currency("")
                .inspect_err(|error| tracing::error!("could not build currency formatter: {error:?}"))
                .ok()
                .map(|formatter| formatter.precision(Precision::Decimals(2)))
        })
        .as_ref()
}

/// Format `number` with two decimals followed by [CURRENCY_SYMBOL], e.g. "-1,234.50 zł".
pub fn format_currency(number: f64) -> String {
    let sign = if number < 0.0 { "-" } else { "" };
    let amount = number.abs();

    let formatted = match currency_formatter() {
        // Zero is rendered as "0" by numfmt.
        Some(formatter) if amount != 0.0 => formatter.fmt_string(amount),
        _ => format!("{amount:.2}"),
    };

    // numfmt drops trailing zeros, e.g. "12.30" is rendered as "12.3".
    let formatted = match formatted.split_once('.') {
        Some((whole, fraction)) => format!("{whole}.{fraction:0<2}"),
        None => format!("{formatted}.00"),
    };

    format!("{sign}{formatted} {CURRENCY_SYMBOL}")
}

/// A link with blue text for use in a <p> tag.
pub fn link(url: &str, text: &str) -> Markup {
    html! (
        a
            href=(url)
            class="text-blue-600 hover:text-blue-500 dark:text-blue-500 dark:hover:text-blue-400 underline"
        {
          (text)
        }

    )
}

#[cfg(test)]
mod tests {
    use super::format_currency;

    #[test]
    fn zero_has_two_decimals() {
        assert_eq!(format_currency(0.0), "0.00 zł");
    }

    #[test]
    fn trailing_zero_is_kept() {
        assert_eq!(format_currency(12.3), "12.30 zł");
    }

    #[test]
    fn thousands_are_separated() {
        assert_eq!(format_currency(1234.5), "1,234.50 zł");
    }

    #[test]
    fn negative_amounts_lead_with_minus() {
        assert_eq!(format_currency(-7.0), "-7.00 zł");
    }
}

use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use time::{Date, Duration, OffsetDateTime};

use paragon::{
    Category, NewItem, NewReceipt, PersonForm, TransactionType, create_person, create_receipt,
    initialize_db,
};

/// A utility for creating a test database for the REST API server of paragon.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating test persons...");
    let alice = create_person(&PersonForm::payer("Alice"), &conn)?;
    let bob = create_person(&PersonForm::payer("Bob"), &conn)?;
    let flat = create_person(&PersonForm::owner("Flat"), &conn)?;

    println!("Creating test receipts...");
    let today = OffsetDateTime::now_utc().date();
    let month_start = today.replace_day(1)?;
    let last_month = (month_start - Duration::days(1)).replace_day(1)?;

    let receipts = sample_receipts(month_start, alice.id, bob.id, flat.id)
        .into_iter()
        .chain(sample_receipts(last_month, bob.id, alice.id, flat.id));

    let mut count = 0;
    for receipt in receipts {
        create_receipt(&receipt, today, &conn)?;
        count += 1;
    }

    println!("Created {count} receipts.");
    println!("Success!");

    Ok(())
}

fn sample_receipts(month_start: Date, first: i64, second: i64, shared: i64) -> Vec<NewReceipt> {
    let day = |offset: i64| month_start + Duration::days(offset);

    vec![
        NewReceipt::build(day(0), first, "Employer", TransactionType::Income)
            .item(NewItem::new(Category::WorkIncome, 5200.0, &[first])),
        NewReceipt::build(day(0), second, "Employer", TransactionType::Income)
            .item(NewItem::new(Category::WorkIncome, 4100.0, &[second])),
        NewReceipt::build(day(1), first, "Landlord", TransactionType::Expense)
            .item(NewItem::new(Category::FlatBills, 2400.0, &[first, second])),
        NewReceipt::build(day(2), second, "Lidl", TransactionType::Expense)
            .item(NewItem::new(Category::FoodDrinks, 12.49, &[first, second]).quantity(2))
            .item(NewItem::new(Category::Chemistry, 23.99, &[second]))
            .item(NewItem::new(Category::Alcohol, 8.5, &[first]).description("wine")),
        NewReceipt::build(day(4), first, "Orlen", TransactionType::Expense)
            .item(NewItem::new(Category::Fuel, 280.0, &[first])),
        NewReceipt::build(day(6), second, "IKEA", TransactionType::Expense)
            .item(NewItem::new(Category::OtherShopping, 349.0, &[shared])),
        NewReceipt::build(day(9), first, "Netflix", TransactionType::Expense).item(
            NewItem::new(Category::MonthlySubscriptions, 43.0, &[first, second, shared]),
        ),
        NewReceipt::build(day(12), second, "Biedronka", TransactionType::Expense)
            .item(NewItem::new(Category::FoodDrinks, 87.3, &[first, second]))
            .item(NewItem::new(Category::Fastfood, 19.9, &[second]).description("pizza")),
    ]
}

//! # Seed Data Generator
//!
//! Populates a database with a demo catalogue, contacts and a few
//! documents for local development.
//!
//! ## Usage
//! ```bash
//! # Seed ./data/tally.db with the default 120 products
//! cargo run -p tally-db --bin seed
//!
//! # Custom size and path
//! cargo run -p tally-db --bin seed -- --count 500 --db ./data/demo.db
//! ```
//!
//! ## Generated Data
//! - Products across stationery, electronics, furniture and cleaning,
//!   each with a unique SKU `{CATEGORY}-{INDEX}`
//! - A handful of customers (individual and company) and suppliers
//! - One received purchase per supplier, which also stocks the products
//! - A quotation and a paid invoice

use std::env;

use anyhow::Context;
use tally_core::document::{InvoiceInput, PurchaseInput};
use tally_core::{CustomerInput, CustomerType, Money, ProductInput, SupplierInput};
use tally_db::{Database, DbConfig};

/// Product families for demo data
const CATEGORIES: &[(&str, &str, &[&str])] = &[
    (
        "STA",
        "Stationery",
        &["A4 Paper Ream", "Ballpoint Pen", "Stapler", "Notebook", "Highlighter", "Envelope Pack"],
    ),
    (
        "ELE",
        "Electronics",
        &["USB Cable", "Wireless Mouse", "Keyboard", "HDMI Adapter", "Power Strip", "Webcam"],
    ),
    (
        "FUR",
        "Furniture",
        &["Office Chair", "Desk Lamp", "Filing Cabinet", "Standing Desk", "Bookshelf"],
    ),
    (
        "CLN",
        "Cleaning",
        &["Glass Cleaner", "Paper Towels", "Disinfectant Wipes", "Trash Bags", "Hand Soap"],
    ),
];

/// Size variants with a price add-on in cents
const VARIANTS: &[(&str, i64)] = &[("", 0), ("Pro", 1500), ("Bulk", 4000)];

const CUSTOMERS: &[(&str, Option<&str>, CustomerType)] = &[
    ("Jane Doe", None, CustomerType::Individual),
    ("Sam Lee", None, CustomerType::Individual),
    ("Northwind", Some("Northwind Traders Ltd"), CustomerType::Company),
    ("Contoso", Some("Contoso Pharmaceuticals"), CustomerType::Company),
];

const SUPPLIERS: &[&str] = &["Acme Wholesale", "Globex Distribution"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 120;
    let mut db_path = String::from("./data/tally.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(120);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tally Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 120)");
                println!("  -d, --db <PATH>    Database file path (default: ./data/tally.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Tally Seed Data Generator");
    println!("============================");
    println!("Database: {}", db_path);
    println!("Products: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path))
        .await
        .with_context(|| format!("opening {db_path}"))?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Products
    let start = std::time::Instant::now();
    let mut product_ids = Vec::new();
    let mut seed = 0usize;

    'outer: loop {
        for (code, category, names) in CATEGORIES {
            for name in names.iter() {
                for (variant, addon) in VARIANTS {
                    if product_ids.len() >= count {
                        break 'outer;
                    }
                    let input = generate_product(code, category, name, variant, *addon, seed);
                    let product = db
                        .products()
                        .create(&input)
                        .await
                        .with_context(|| format!("inserting {}", input.name))?;
                    product_ids.push(product.id);
                    seed += 1;
                }
            }
        }
        if seed == 0 {
            break;
        }
    }
    println!("✓ Generated {} products in {:?}", product_ids.len(), start.elapsed());

    // Contacts
    let mut customer_ids = Vec::new();
    for (name, company, kind) in CUSTOMERS {
        let customer = db
            .customers()
            .create(&CustomerInput {
                name: name.to_string(),
                email: Some(format!("{}@example.com", name.to_lowercase().replace(' ', "."))),
                customer_type: *kind,
                company_name: company.map(str::to_string),
                ..Default::default()
            })
            .await?;
        customer_ids.push(customer.id);
    }

    let mut supplier_ids = Vec::new();
    for name in SUPPLIERS {
        let supplier = db
            .suppliers()
            .create(&SupplierInput {
                name: name.to_string(),
                ..Default::default()
            })
            .await?;
        supplier_ids.push(supplier.id);
    }
    println!("✓ {} customers, {} suppliers", customer_ids.len(), supplier_ids.len());

    // Documents
    for (idx, supplier_id) in supplier_ids.iter().enumerate() {
        let items: Vec<serde_json::Value> = product_ids
            .iter()
            .skip(idx)
            .step_by(SUPPLIERS.len())
            .take(5)
            .map(|id| serde_json::json!({"productId": id, "quantity": 10}))
            .collect();
        if items.is_empty() {
            continue;
        }

        let draft = serde_json::from_value::<PurchaseInput>(serde_json::json!({
            "supplier": {"id": supplier_id},
            "status": "received",
            "items": items
        }))?
        .into_draft()?;
        db.purchases().create(draft).await?;
    }

    if let (Some(customer_id), Some(product_id)) = (customer_ids.first(), product_ids.first()) {
        let quotation = serde_json::from_value::<InvoiceInput>(serde_json::json!({
            "type": "quotation",
            "customer": {"id": customer_id},
            "items": [{"productId": product_id, "quantity": 3}]
        }))?
        .into_draft()?;
        db.invoices().create(quotation).await?;

        let sale = serde_json::from_value::<InvoiceInput>(serde_json::json!({
            "customer": {"id": customer_id},
            "discountType": "percentage",
            "discountValue": 5,
            "items": [{"productId": product_id, "quantity": 2}]
        }))?
        .into_draft()?;
        let invoice = db.invoices().create(sale).await?;
        db.invoices().pay(&invoice.id, true).await?;
    }
    println!("✓ Purchases, a quotation and a paid invoice");

    println!();
    println!("✓ Seed complete!");
    db.close().await;
    Ok(())
}

/// Builds one demo product.
fn generate_product(
    code: &str,
    category: &str,
    name: &str,
    variant: &str,
    price_addon: i64,
    seed: usize,
) -> ProductInput {
    // Base $1.99 - $49.99 plus the variant add-on
    let price_cents = 199 + ((seed * 37) % 4800) as i64 + price_addon;
    // Cost 55-75% of price
    let cost_cents = price_cents * (55 + (seed % 20) as i64) / 100;

    let full_name = if variant.is_empty() {
        name.to_string()
    } else {
        format!("{name} {variant}")
    };

    ProductInput {
        name: full_name,
        sku: Some(format!("{code}-{seed:04}")),
        category: Some(category.to_string()),
        price: Some(Money::from_cents(price_cents)),
        cost_price: Some(Money::from_cents(cost_cents)),
        quantity: Some((seed % 25) as i64),
        description: None,
        image_url: None,
    }
}

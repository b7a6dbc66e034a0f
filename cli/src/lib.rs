mod args;

pub use args::{Args, Commands, GenerateTransactionsArgs, StoreArgs};
use clap::Parser;
use common::{DEFAULT_AUTO_RELEASE_HOURS, Escrow, JsonFileStore, NewTransaction, ShippingInfo};
use rand::Rng;
use std::sync::Arc;

const PRODUCTS: [&str; 6] = [
    "Sneakers",
    "Film camera",
    "Mechanical keyboard",
    "Vintage jacket",
    "Bluetooth speaker",
    "Board game",
];

const COURIERS: [&str; 3] = ["Kerry", "Flash", "Thailand Post"];

/// Runs the CLI command parser and executes the selected command.
/// Returns true if a CLI command was handled, false otherwise.
pub async fn run_cli() -> bool {
    let args = Args::parse();
    match &args.command {
        Some(Commands::GenerateTransactions(generate_args)) => {
            match generate_transactions(&generate_args.out, generate_args.count).await {
                Ok(created) => {
                    for (id, pin) in &created {
                        println!("{id} PIN {pin}");
                    }
                    println!(
                        "Successfully generated {} transactions to: {}",
                        created.len(),
                        generate_args.out
                    );
                }
                Err(e) => eprintln!("Failed to generate transactions: {e:#}"),
            }
            true
        }
        Some(Commands::ListTransactions(store_args)) => {
            match list_transactions(&store_args.store).await {
                Ok(json) => println!("{json}"),
                Err(e) => eprintln!("Failed to list transactions: {e:#}"),
            }
            true
        }
        Some(Commands::ReleaseDue(store_args)) => {
            match release_due(&store_args.store).await {
                Ok(released) if released.is_empty() => {
                    println!("No transactions due for release.")
                }
                Ok(released) => {
                    for id in &released {
                        println!("Released {id}");
                    }
                }
                Err(e) => eprintln!("Failed to release transactions: {e:#}"),
            }
            true
        }
        None => {
            println!("No CLI command provided. Use --help to see available commands.");
            false
        }
    }
}

async fn open_escrow(path: &str) -> anyhow::Result<Escrow> {
    let store = JsonFileStore::open(path).await?;
    Ok(Escrow::new(
        Arc::new(store),
        chrono::Duration::hours(DEFAULT_AUTO_RELEASE_HOURS),
    ))
}

/// Creates `count` random transactions in the store at `path`, returning `(id, pin)` pairs.
pub async fn generate_transactions(
    path: &str,
    count: usize,
) -> anyhow::Result<Vec<(String, String)>> {
    let escrow = open_escrow(path).await?;
    let mut created = Vec::with_capacity(count);

    for _ in 0..count {
        // ThreadRng is !Send, drop it before awaiting
        let (data, stage, shipping_info) = {
            let mut rng = rand::rng();
            let data = NewTransaction {
                product_name: PRODUCTS[rng.random_range(0..PRODUCTS.len())].to_string(),
                price: rng.random_range(100..=20_000) as f64,
                phone_number: format!("08{}", rng.random_range(10_000_000..=99_999_999)),
                description: None,
            };
            let courier = COURIERS[rng.random_range(0..COURIERS.len())];
            let shipping_info = ShippingInfo {
                courier: courier.to_string(),
                tracking_number: format!("DP{}", rng.random_range(100_000_000..=999_999_999)),
                bank_name: "Demo Bank".to_string(),
                account_name: "Demo Seller".to_string(),
                account_number: "000-0-00000-0".to_string(),
            };
            (data, rng.random_range(0..3u8), shipping_info)
        };

        let tx = escrow.create(data).await?;
        if stage >= 1 {
            escrow.mark_paid(&tx.id).await?;
        }
        if stage >= 2 {
            escrow.attach_shipment(&tx.id, shipping_info).await?;
        }
        created.push((tx.id, tx.pin));
    }

    Ok(created)
}

/// Pretty JSON of every transaction in the store at `path`.
pub async fn list_transactions(path: &str) -> anyhow::Result<String> {
    let escrow = open_escrow(path).await?;
    let transactions = escrow.list().await?;
    Ok(serde_json::to_string_pretty(&transactions)?)
}

pub async fn release_due(path: &str) -> anyhow::Result<Vec<String>> {
    let escrow = open_escrow(path).await?;
    Ok(escrow.release_due(chrono::Utc::now()).await?)
}

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Depayit escrow service - run the API or manage a transaction store file"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate demo transactions into a store file (for testing only)
    ///
    /// Creates random transactions through the escrow rules, pays and ships
    /// some of them, and prints every id together with its buyer PIN. The
    /// server must be stopped while this writes to its store file.
    GenerateTransactions(GenerateTransactionsArgs),

    /// Print every transaction in a store file as JSON
    ListTransactions(StoreArgs),

    /// Release due transactions in a store file (stop the server first)
    ///
    /// Runs the auto-release sweep once against the file. The server keeps the
    /// whole store in memory and rewrites the file on every change, so the
    /// server must be stopped while this runs or its next write discards the
    /// releases made here.
    ReleaseDue(StoreArgs),
}

#[derive(ClapArgs, Debug)]
pub struct GenerateTransactionsArgs {
    /// Number of transactions to generate (for testing only)
    #[arg(short, long, help = "Number of transactions to generate")]
    pub count: usize,

    /// Store file to write to (for testing only)
    #[arg(short, long, help = "JSON store file to write to")]
    pub out: String,
}

#[derive(ClapArgs, Debug)]
pub struct StoreArgs {
    /// Path of the JSON store file
    #[arg(short, long, help = "JSON store file")]
    pub store: String,
}

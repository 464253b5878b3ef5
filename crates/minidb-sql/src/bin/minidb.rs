//! Interactive MiniDB shell.
//!
//! Reads one statement per line, executes it against a catalog rooted at
//! the data directory given as the first argument (default `./data`),
//! and prints results: one confirmation line per mutation, tab-separated
//! rows with a row-count footer for selects.

use minidb_common::StorageConfig;
use minidb_sql::session::{Session, StatementResult};
use minidb_sql::rows_to_values;
use minidb_storage::Catalog;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn print_result(result: StatementResult) {
    match result {
        StatementResult::TableCreated { table } => println!("Table {} created", table),
        StatementResult::IndexCreated { index, table } => {
            println!("Index {} created on {}", index, table)
        }
        StatementResult::RowInserted => println!("1 row inserted"),
        StatementResult::TransactionStarted { txn_id } => {
            println!("Transaction {} started", txn_id)
        }
        StatementResult::TransactionCommitted { txn_id } => {
            println!("Transaction {} committed", txn_id)
        }
        StatementResult::TransactionAborted { txn_id } => {
            println!("Transaction {} aborted", txn_id)
        }
        StatementResult::Select { rows } => {
            let count = rows.len();
            for row in rows_to_values(&rows) {
                let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
                println!("{}", line.join("\t"));
            }
            println!("{} rows", count);
        }
    }
}

fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let data_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("./data"));

    let config = StorageConfig {
        data_dir,
        ..StorageConfig::default()
    };
    let mut catalog = Catalog::new(config);
    let mut session = Session::new(&mut catalog);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("minidb> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        match session.execute(line) {
            Ok(result) => print_result(result),
            Err(e) => println!("{}", e),
        }
    }

    Ok(())
}

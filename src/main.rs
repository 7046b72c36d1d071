use clap::Parser;
use std::process;
use tablestore::StoreConfig;
use tablestore::cli::{Cli, Commands};
use tablestore::cli_handlers;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = StoreConfig::new(&cli.dir, cli.db);

    let result = match cli.command {
        Commands::Tables => cli_handlers::handle_tables(&config),
        Commands::Create { table, columns } => {
            cli_handlers::handle_create(&config, &table, &columns)
        }
        Commands::Insert { table, rows } => cli_handlers::handle_insert(&config, &table, &rows),
        Commands::Delete { table, condition } => {
            cli_handlers::handle_delete(&config, &table, condition.as_deref())
        }
        Commands::Update {
            table,
            assignments,
            condition,
        } => cli_handlers::handle_update(&config, &table, &assignments, condition.as_deref()),
        Commands::Columns { table } => cli_handlers::handle_columns(&config, &table),
        Commands::Select {
            table,
            columns,
            condition,
            json,
        } => cli_handlers::handle_select(
            &config,
            &table,
            columns.as_deref(),
            condition.as_deref(),
            json,
        ),
        Commands::Dump => cli_handlers::handle_dump(&config),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

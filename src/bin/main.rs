//! Grice CLI - Browse and query a SQLite database
//!
//! Usage:
//!   grice [--config <grice.toml>] [--database <path>] tables
//!   grice table <name>
//!   grice query <table> [--column c]... [--filter col:kind:value]... [--sort col[:dir]]...
//!   grice explain <table> [...] [--dialect <dialect>]
//!
//! Examples:
//!   grice --database app.db tables
//!   grice query people --filter age:gte:21 --sort name --per-page 10
//!   grice query people --join cities:city_id=id --outer
//!   grice explain people --filter name:in:"Ann;Bob" --dialect postgres

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use grice::config::{ConfigError, Settings};
use grice::filter::Filter;
use grice::join::{ColumnPair, TableJoin};
use grice::planner::{PageSize, QueryRequest};
use grice::sort::{Sort, SortDirection};
use grice::sql::Dialect;
use grice::TableService;

/// Log filter directives, in `RUST_LOG` syntax.
const LOG_ENV: &str = "GRICE_LOG";

#[derive(Parser)]
#[command(name = "grice")]
#[command(about = "Grice - Browse and query SQLite tables through their reflected schema")]
#[command(version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, global = true, default_value = "grice.toml")]
    config: PathBuf,

    /// Database path, overriding the configuration
    #[arg(short, long, global = true)]
    database: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every table, grouped by schema
    Tables,

    /// Show one table's columns
    Table {
        /// Table name, `schema.table` for attached databases
        name: String,
    },

    /// Run a query and print the rows
    Query(QueryArgs),

    /// Print the SQL a query would run
    Explain {
        #[command(flatten)]
        query: QueryArgs,

        /// SQL dialect to render
        #[arg(long, default_value = "sqlite")]
        dialect: DialectArg,
    },
}

#[derive(Args)]
struct QueryArgs {
    /// Table to read from
    table: String,

    /// Column to return, plain or `table.column` (repeatable)
    #[arg(long = "column")]
    columns: Vec<String>,

    /// Filter as `column:kind:value` (repeatable)
    #[arg(long = "filter")]
    filters: Vec<String>,

    /// Sort as `column[:asc|desc]` (repeatable)
    #[arg(long = "sort")]
    sorts: Vec<String>,

    /// Join as `table:from=to[,from=to]`
    #[arg(long)]
    join: Option<String>,

    /// Make the join a left outer join
    #[arg(long, requires = "join")]
    outer: bool,

    /// Zero-based page index
    #[arg(long, default_value_t = 0)]
    page: u64,

    /// Rows per page, -1 for all rows
    #[arg(long, allow_negative_numbers = true)]
    per_page: Option<i64>,
}

#[derive(Clone, ValueEnum)]
enum DialectArg {
    Sqlite,
    Postgres,
    Mysql,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Sqlite => Dialect::Sqlite,
            DialectArg::Postgres => Dialect::Postgres,
            DialectArg::Mysql => Dialect::MySql,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let settings = match load_settings(&cli) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let service = match TableService::connect(&settings) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error opening database: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Tables => print_json(&service.list_tables()),
        Commands::Table { name } => match service.get_table(&name) {
            Ok(table) => print_json(table),
            Err(e) => fail(e),
        },
        Commands::Query(args) => cmd_query(&service, &args),
        Commands::Explain { query, dialect } => cmd_explain(&service, &query, dialect.into()),
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// The config file (or environment), with `--database` taking precedence.
///
/// `--database` alone is enough to run without any configuration.
fn load_settings(cli: &Cli) -> Result<Settings, ConfigError> {
    with_database_override(Settings::load(&cli.config), cli.database.as_deref())
}

/// Only a missing config can be replaced by `--database`; a config that
/// exists but fails to read or validate is still an error.
fn with_database_override(
    loaded: Result<Settings, ConfigError>,
    database: Option<&str>,
) -> Result<Settings, ConfigError> {
    let mut settings = match (loaded, database) {
        (Ok(settings), _) => settings,
        (Err(ConfigError::FileNotFound(_)), Some(_)) => Settings::default(),
        (Err(e), _) => return Err(e),
    };
    if let Some(path) = database {
        settings.database.path = Some(path.to_string());
    }
    Ok(settings)
}

fn cmd_query(service: &TableService, args: &QueryArgs) -> ExitCode {
    let request = match build_request(service, args) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Invalid query: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match service.query_table(&request) {
        Ok(result) => print_json(&result),
        Err(e) => fail(e),
    }
}

fn cmd_explain(service: &TableService, args: &QueryArgs, dialect: Dialect) -> ExitCode {
    let request = match build_request(service, args) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Invalid query: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match service.explain(&request, dialect) {
        Ok(Some(sql)) => {
            println!("{}", sql);
            ExitCode::SUCCESS
        }
        Ok(None) => {
            println!("-- No columns selected, nothing to run");
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn build_request(service: &TableService, args: &QueryArgs) -> Result<QueryRequest, String> {
    let mut request = service.request(&args.table).page(args.page);

    if !args.columns.is_empty() {
        request = request.columns(args.columns.as_slice());
    }

    if let Some(n) = args.per_page {
        let size = PageSize::from_signed(n)
            .ok_or_else(|| format!("--per-page must be -1 or at least 0, got {}", n))?;
        request = request.page_size(size);
    }

    for text in &args.filters {
        request = request.filter(parse_filter(text)?);
    }

    for text in &args.sorts {
        request = request.sort(parse_sort(text)?);
    }

    if let Some(text) = &args.join {
        request = request.join(parse_join(text, args.outer)?);
    }

    Ok(request)
}

/// `column:kind:value`, where the value may itself contain `:`.
fn parse_filter(text: &str) -> Result<Filter, String> {
    let mut parts = text.splitn(3, ':');
    let (Some(column), Some(kind), Some(value)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(format!("filter \"{}\" is not column:kind:value", text));
    };
    Filter::new(column, kind, value).map_err(|e| e.to_string())
}

/// `column` or `column:asc|desc`.
fn parse_sort(text: &str) -> Result<Sort, String> {
    match text.split_once(':') {
        None => Ok(Sort::asc(text)),
        Some((column, dir)) => Ok(Sort {
            column_name: column.to_string(),
            direction: dir.parse::<SortDirection>()?,
        }),
    }
}

/// `table:from=to[,from=to]`.
fn parse_join(text: &str, outer: bool) -> Result<TableJoin, String> {
    let (table, pairs) = text
        .split_once(':')
        .ok_or_else(|| format!("join \"{}\" is not table:from=to", text))?;

    let pairs = pairs
        .split(',')
        .map(|pair| {
            pair.split_once('=')
                .map(|(from, to)| ColumnPair::new(from.trim(), to.trim()))
                .ok_or_else(|| format!("join pair \"{}\" is not from=to", pair))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(if outer {
        TableJoin::outer(table, pairs)
    } else {
        TableJoin::inner(table, pairs)
    })
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error encoding output: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn fail(e: grice::Error) -> ExitCode {
    eprintln!("Error: {}", e);
    ExitCode::FAILURE
}

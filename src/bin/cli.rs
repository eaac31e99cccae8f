use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;

use bayundb_catalog::catalog::{
    AlterInfo, Catalog, CatalogConfig, CatalogEntry, CatalogType, Column, DataType, ScalarFunction, Table,
    View,
};
use bayundb_catalog::common::types::ObjectId;
use bayundb_catalog::transaction::{
    IsolationLevel, TimestampBoundary, Transaction, TransactionContext, TransactionManager,
};

const HISTORY_FILE: &str = ".bncat_history";

#[derive(Parser)]
#[command(author, version, about = "bncat - an interactive shell over the versioned BayunDB catalog")]
struct Cli {
    /// Schema to start in, created if missing
    #[arg(short, long, default_value = "main")]
    schema: String,

    /// Do not serve built-in scalar functions
    #[arg(long)]
    no_builtins: bool,

    /// Command to execute
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive shell
    Shell,

    /// Execute shell commands from a file, one per line
    Script {
        /// Script file path
        path: PathBuf,
    },
}

/// Catalog plus the transactions opened from the shell, addressed by small handles
struct Session {
    catalog: Catalog,
    transactions: TransactionManager,
    handles: BTreeMap<u32, Arc<Transaction>>,
    next_handle: u32,
}

impl Session {
    fn new(schema: &str, builtin_functions: bool) -> Self {
        let catalog = Catalog::new(CatalogConfig {
            default_schema: schema.to_string(),
            builtin_functions,
        });
        Session {
            catalog,
            transactions: TransactionManager::default(),
            handles: BTreeMap::new(),
            next_handle: 1,
        }
    }

    fn transaction(&self, handle: &str) -> Result<Arc<Transaction>> {
        let handle = parse_handle(handle)?;
        self.handles
            .get(&handle)
            .cloned()
            .ok_or_else(|| anyhow!("No open transaction {}", handle))
    }

    fn finish(&mut self, handle: &str) -> Result<Arc<Transaction>> {
        let handle = parse_handle(handle)?;
        self.handles
            .remove(&handle)
            .ok_or_else(|| anyhow!("No open transaction {}", handle))
    }

    fn begin(&mut self, isolation_level: IsolationLevel) -> String {
        let txn = self
            .transactions
            .begin_transaction_with(isolation_level, TimestampBoundary::Exclusive);
        let handle = self.next_handle;
        self.next_handle += 1;
        let message = format!(
            "Transaction {} started at {} ({:?})",
            handle,
            txn.start_time(),
            isolation_level
        );
        self.handles.insert(handle, txn);
        message
    }

    /// Resolve `a,b,c` (or `-` for none) to the objects a new view depends on
    fn dependencies(&self, txn: &Transaction, names: &str) -> Result<Vec<ObjectId>> {
        if names == "-" {
            return Ok(Vec::new());
        }
        let tables = self.catalog.current_schema()?.tables().clone();
        names
            .split(',')
            .map(|name| {
                tables
                    .get_entry(txn, name)
                    .map(|entry| entry.object_id())
                    .ok_or_else(|| anyhow!("Dependency {} does not exist", name))
            })
            .collect()
    }

    fn execute(&mut self, line: &str) -> Result<String> {
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            ["begin"] => Ok(self.begin(IsolationLevel::Snapshot)),
            ["begin", "read-committed"] => Ok(self.begin(IsolationLevel::ReadCommitted)),
            ["commit", handle] => {
                let txn = self.finish(handle)?;
                let commit_id = self.transactions.commit_transaction(txn.id())?;
                Ok(format!("Transaction {} committed at {}", handle, commit_id))
            }
            ["abort", handle] => {
                let txn = self.finish(handle)?;
                self.transactions.abort_transaction(txn.id())?;
                Ok(format!("Transaction {} aborted", handle))
            }
            ["create", "table", handle, name, columns] => {
                let txn = self.transaction(handle)?;
                let columns = columns
                    .split(',')
                    .map(Column::parse_spec)
                    .collect::<std::result::Result<Vec<_>, String>>()
                    .map_err(|e| anyhow!(e))?;
                let table = Table::new(name.to_string(), columns);
                self.catalog.create_entry(txn.as_ref(), Arc::new(table), &[])?;
                Ok(format!("Table {} created", name))
            }
            ["create", "view", handle, name, deps, query @ ..] if !query.is_empty() => {
                let txn = self.transaction(handle)?;
                let dependencies = self.dependencies(&txn, deps)?;
                let view = View::new(name.to_string(), query.join(" "));
                self.catalog.create_entry(txn.as_ref(), Arc::new(view), &dependencies)?;
                Ok(format!("View {} created", name))
            }
            ["create", "function", handle, name, arguments, return_type] => {
                let txn = self.transaction(handle)?;
                let arguments = arguments
                    .split(',')
                    .filter(|arg| !arg.is_empty() && *arg != "-")
                    .map(str::parse::<DataType>)
                    .collect::<std::result::Result<Vec<_>, String>>()
                    .map_err(|e| anyhow!(e))?;
                let return_type = return_type.parse::<DataType>().map_err(|e| anyhow!(e))?;
                let function = ScalarFunction::new(name.to_string(), arguments, return_type);
                self.catalog.create_entry(txn.as_ref(), Arc::new(function), &[])?;
                Ok(format!("Function {} created", name))
            }
            ["rename", handle, old_name, new_name] => {
                let txn = self.transaction(handle)?;
                let entry = self
                    .catalog
                    .current_schema()?
                    .tables()
                    .get_entry(txn.as_ref(), old_name)
                    .ok_or_else(|| anyhow!("Catalog entry {} does not exist", old_name))?;
                let info = AlterInfo::RenameEntry {
                    new_name: new_name.to_string(),
                };
                self.catalog.alter_entry(txn.as_ref(), entry.catalog_type(), old_name, &info)?;
                Ok(format!("{} renamed to {}", old_name, new_name))
            }
            ["add-column", handle, table, column] => {
                let txn = self.transaction(handle)?;
                let column = Column::parse_spec(column).map_err(|e| anyhow!(e))?;
                let info = AlterInfo::AddColumn { column };
                self.catalog.alter_entry(txn.as_ref(), CatalogType::Table, table, &info)?;
                Ok(format!("Table {} altered", table))
            }
            ["drop", handle, kind, name] => self.drop_object(handle, kind, name, false),
            ["drop", handle, kind, name, "cascade"] => self.drop_object(handle, kind, name, true),
            ["get", handle, kind, name] => {
                let txn = self.transaction(handle)?;
                let entry = self.catalog.get_entry(txn.as_ref(), parse_kind(kind)?, name)?;
                Ok(describe(&entry))
            }
            ["list", handle, kind] => {
                let txn = self.transaction(handle)?;
                let entries = self.catalog.scan(txn.as_ref(), parse_kind(kind)?)?;
                if entries.is_empty() {
                    return Ok("(none)".to_string());
                }
                let lines: Vec<String> = entries
                    .iter()
                    .map(|entry| format!("{:<20} {}", entry.name(), entry.catalog_type()))
                    .collect();
                Ok(lines.join("\n"))
            }
            ["use", schema] => {
                if !self.catalog.schema_names().iter().any(|name| name.as_str() == *schema) {
                    self.catalog.create_schema(schema)?;
                }
                self.catalog.set_current_schema(schema)?;
                Ok(format!("Using schema {}", schema))
            }
            ["vacuum"] => {
                let horizon = self.transactions.lowest_active_start();
                let freed = self.catalog.vacuum(horizon);
                Ok(format!("Freed {} versions below timestamp {}", freed, horizon))
            }
            ["transactions"] => {
                let lines: Vec<String> = self
                    .handles
                    .iter()
                    .map(|(handle, txn)| format!("{:<4} start {:<6} {:?}", handle, txn.start_time(), txn.isolation_level()))
                    .collect();
                Ok(lines.join("\n"))
            }
            _ => bail!("Unrecognized command '{}', type 'help' for assistance", line),
        }
    }

    fn drop_object(&mut self, handle: &str, kind: &str, name: &str, cascade: bool) -> Result<String> {
        let txn = self.transaction(handle)?;
        self.catalog.drop_entry(txn.as_ref(), parse_kind(kind)?, name, cascade)?;
        Ok(format!("{} dropped", name))
    }
}

fn parse_handle(handle: &str) -> Result<u32> {
    handle
        .parse()
        .with_context(|| format!("'{}' is not a transaction handle", handle))
}

fn parse_kind(keyword: &str) -> Result<CatalogType> {
    CatalogType::from_keyword(keyword).ok_or_else(|| anyhow!("Unknown object kind '{}'", keyword))
}

fn describe(entry: &CatalogEntry) -> String {
    let body = match entry.catalog_type() {
        CatalogType::Table => entry.downcast::<Table>().map(Table::schema_string),
        CatalogType::View => entry
            .downcast::<View>()
            .map(|view| format!("CREATE VIEW {} AS {};", view.name(), view.query())),
        CatalogType::ScalarFunction => entry.downcast::<ScalarFunction>().map(ScalarFunction::signature),
    };
    format!(
        "{}\n-- {} {} at timestamp {}",
        body.unwrap_or_default(),
        entry.catalog_type(),
        entry.object_id(),
        entry.timestamp()
    )
}

fn run_shell(session: &mut Session) -> Result<()> {
    println!("Welcome to bncat. Type 'help' for assistance or 'exit' to quit.");

    let mut rl = Editor::<(), DefaultHistory>::new()?;
    if let Err(err) = rl.load_history(HISTORY_FILE) {
        if !err.to_string().contains("No such file or directory") {
            println!("Error loading history: {}", err);
        }
    }

    loop {
        match rl.readline("bncat> ") {
            Ok(line) => {
                let _ = rl.add_history_entry(&line);

                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                match line {
                    "exit" | "quit" => {
                        println!("Goodbye!");
                        break;
                    }
                    "help" => print_help(),
                    _ => match session.execute(line) {
                        Ok(output) => println!("{}", output),
                        Err(err) => println!("Error: {:#}", err),
                    },
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                println!("Error: {}", err);
                break;
            }
        }
    }

    if let Err(err) = rl.save_history(HISTORY_FILE) {
        println!("Error saving history: {}", err);
    }
    Ok(())
}

fn run_script(session: &mut Session, path: &PathBuf) -> Result<()> {
    let script = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read script {}", path.display()))?;
    for line in script.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        println!("bncat> {}", line);
        match session.execute(line) {
            Ok(output) => println!("{}", output),
            Err(err) => println!("Error: {:#}", err),
        }
    }
    Ok(())
}

fn print_help() {
    println!("Transactions:");
    println!("  begin [read-committed]                      - Start a transaction, prints its handle");
    println!("  commit <t> | abort <t>                      - Finish transaction <t>");
    println!("  transactions                                - List open transactions");
    println!();
    println!("Catalog (all run inside transaction <t>):");
    println!("  create table <t> <name> <col:TYPE,...>      - Create a table");
    println!("  create view <t> <name> <dep,...|-> <query>  - Create a view depending on tables or views");
    println!("  create function <t> <name> <TYPE,...|-> <TYPE> - Create a scalar function");
    println!("  rename <t> <old> <new>                      - Rename a table or view");
    println!("  add-column <t> <table> <col:TYPE>           - Add a column to a table");
    println!("  drop <t> <kind> <name> [cascade]            - Drop an object, optionally with dependents");
    println!("  get <t> <kind> <name>                       - Show an object as <t> sees it");
    println!("  list <t> <kind>                             - List objects of a kind (table, view, function)");
    println!();
    println!("Other commands:");
    println!("  use <schema>                                - Switch schema, creating it if needed");
    println!("  vacuum                                      - Free versions no transaction can see");
    println!("  help                                        - Display this help message");
    println!("  exit                                        - Exit the shell");
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut session = Session::new(&cli.schema, !cli.no_builtins);

    match &cli.command {
        Some(Commands::Script { path }) => run_script(&mut session, path),
        Some(Commands::Shell) | None => run_shell(&mut session),
    }
}

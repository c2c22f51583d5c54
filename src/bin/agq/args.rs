use agri_query::analyze::StoreParams;
use agri_query::context::Context;
use agri_query::JoinStrategy;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// SQLite file to use instead of the one in the current context.
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,
    /// How consecutive tables get joined. Defaults to what the current context says.
    #[arg(long, global = true, value_enum)]
    pub join: Option<JoinArg>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Creates a context.
    ///
    /// Contexts remember which database to use, so you don't have to pass --database every time.
    CreateContext(ContextParams),
    /// Selects an existing context.
    UseContext { name: String },
    /// List available contexts.
    ListContexts,
    /// Lists the tables of the database.
    Tables,
    /// Shows the columns of a table, with their declared types.
    Columns { table: String },
    /// Shows the tables a table has foreign keys to or from.
    Neighbors { table: String },
    /// Builds a query interactively: pick tables, columns, filters, grouping and ordering, then
    /// preview, run, export or save it.
    Build,
    /// Runs a saved selection.
    Run {
        name: String,
        /// Also write the results to this CSV file.
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Shows the SQL a saved selection compiles to, with its parameters.
    Show { name: String },
    /// Lists saved selections.
    Saved,
}

#[derive(clap::Args, Debug)]
pub struct ContextParams {
    /// You can reuse your context by referencing this name
    name: String,
    /// Path to the SQLite file.
    #[arg(long)]
    database: PathBuf,
    /// Join tables on declared foreign keys first, instead of on the first column name they share.
    #[arg(long)]
    foreign_key_joins: bool,
    /// Use the new context
    #[arg(long = "use")]
    pub use_it: bool,
}

#[derive(Debug, ValueEnum, Clone, Copy)]
pub enum JoinArg {
    SharedColumn,
    ForeignKeys,
}

impl From<ContextParams> for Context {
    fn from(value: ContextParams) -> Self {
        Context {
            name: value.name.into(),
            store: StoreParams::new(value.database),
            join_strategy: if value.foreign_key_joins {
                JoinStrategy::ForeignKeys
            } else {
                JoinStrategy::SharedColumn
            },
        }
    }
}

impl From<JoinArg> for JoinStrategy {
    fn from(value: JoinArg) -> Self {
        match value {
            JoinArg::SharedColumn => JoinStrategy::SharedColumn,
            JoinArg::ForeignKeys => JoinStrategy::ForeignKeys,
        }
    }
}

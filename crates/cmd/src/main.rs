use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

mod commands;

#[derive(Parser)]
#[command(author, version, about = "Query and export Tableau datasources from the command line")]
#[command(name = "tabvu")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "tabvu.yaml", global = true)]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter configuration file to edit
    Init,
    /// List the datasources available on the site
    Datasources,
    /// List the queryable fields of a datasource
    Fields {
        /// Datasource LUID (see `tabvu datasources`)
        datasource_luid: String,
    },
    /// List the distinct values of a field, for building set filters
    Values {
        datasource_luid: String,
        /// Field caption to probe
        field: String,
    },
    /// Run a saved query now: print its CSV, or export with --out-dir
    Run {
        /// Name of a saved query
        query: String,
        /// Export into this directory instead of printing
        #[arg(long)]
        out_dir: Option<PathBuf>,
        /// Output filename pattern; {name}, {date} and {time} are substituted
        #[arg(long, default_value = "{name}_{date}.csv")]
        pattern: String,
    },
    /// Manage saved queries
    #[command(subcommand)]
    Query(QueryCommands),
    /// Manage recurring export schedules
    #[command(subcommand)]
    Schedule(ScheduleCommands),
    /// Replay persisted schedules into live triggers and keep them firing
    Serve,
}

#[derive(Subcommand)]
enum QueryCommands {
    /// Save a query definition under a name
    Save {
        #[arg(long)]
        name: String,
        /// Datasource LUID
        #[arg(long)]
        datasource: String,
        /// Dimension field caption; repeatable, order is kept
        #[arg(long = "dimension")]
        dimensions: Vec<String>,
        /// Measure as CAPTION=FUNCTION, e.g. "Sales=SUM"; repeatable
        #[arg(long = "measure")]
        measures: Vec<String>,
        /// Filter in wire JSON form; repeatable
        #[arg(long = "filter")]
        filters: Vec<String>,
        /// Replace an existing query with the same name without asking
        #[arg(long)]
        overwrite: bool,
    },
    /// List saved queries
    List,
    /// Print a saved query as JSON
    Show { name: String },
    /// Delete a saved query
    Delete {
        name: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum ScheduleCommands {
    /// Create or update a recurring export of a saved query
    Save {
        #[arg(long)]
        name: String,
        /// Saved query to snapshot into the schedule
        #[arg(long)]
        query: String,
        #[arg(long, value_enum)]
        frequency: Frequency,
        /// 0 = Monday .. 6 = Sunday; required for weekly schedules
        #[arg(long)]
        day_of_week: Option<u8>,
        /// 1-31; required for monthly schedules
        #[arg(long)]
        day_of_month: Option<u8>,
        /// Time of day as HH:MM
        #[arg(long, default_value = "08:00")]
        at: String,
        #[arg(long)]
        out_dir: PathBuf,
        #[arg(long, default_value = "{name}_{date}.csv")]
        pattern: String,
    },
    /// List schedules with their next fire times
    List,
    /// Remove a schedule and its trigger
    Remove {
        name: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Run a schedule's export once, immediately
    RunNow { name: String },
}

/// Mirrors the cadence variants for argument parsing.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

#[tokio::main]
async fn main() -> Result<()> {
    diagnostics::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Init => commands::init::init_command(&cli.config),
        Commands::Datasources => commands::datasources::datasources_command(&cli.config).await,
        Commands::Fields { datasource_luid } => {
            commands::fields::fields_command(&cli.config, &datasource_luid).await
        }
        Commands::Values {
            datasource_luid,
            field,
        } => commands::values::values_command(&cli.config, &datasource_luid, &field).await,
        Commands::Run {
            query,
            out_dir,
            pattern,
        } => commands::run::run_command(&cli.config, &query, out_dir.as_deref(), &pattern).await,
        Commands::Query(command) => match command {
            QueryCommands::Save {
                name,
                datasource,
                dimensions,
                measures,
                filters,
                overwrite,
            } => {
                commands::query::save_command(
                    &cli.config,
                    &name,
                    &datasource,
                    &dimensions,
                    &measures,
                    &filters,
                    overwrite,
                )
                .await
            }
            QueryCommands::List => commands::query::list_command(&cli.config),
            QueryCommands::Show { name } => commands::query::show_command(&cli.config, &name),
            QueryCommands::Delete { name, yes } => {
                commands::query::delete_command(&cli.config, &name, yes)
            }
        },
        Commands::Schedule(command) => match command {
            ScheduleCommands::Save {
                name,
                query,
                frequency,
                day_of_week,
                day_of_month,
                at,
                out_dir,
                pattern,
            } => commands::schedule::save_command(
                &cli.config,
                &name,
                &query,
                frequency,
                day_of_week,
                day_of_month,
                &at,
                &out_dir,
                &pattern,
            ),
            ScheduleCommands::List => commands::schedule::list_command(&cli.config),
            ScheduleCommands::Remove { name, yes } => {
                commands::schedule::remove_command(&cli.config, &name, yes)
            }
            ScheduleCommands::RunNow { name } => {
                commands::schedule::run_now_command(&cli.config, &name).await
            }
        },
        Commands::Serve => commands::serve::serve_command(&cli.config).await,
    }
}

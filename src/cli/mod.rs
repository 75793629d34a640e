mod report;

pub use report::{QueryArgs, ReportArgs, SummarizeArgs, WindowArgs};

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::config::Config;
use crate::logging::{setup_logging, LogFormat};

/// Job and CPU-hour report from a search analytics index
#[derive(Parser)]
#[command(name = "jobhours")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Log format on stderr
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty, global = true)]
    log_format: LogFormat,

    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Query the index and write raw response and summary (default)
    Report(ReportArgs),

    /// Print the request body without sending it
    Query(QueryArgs),

    /// Reshape a saved raw response
    Summarize(SummarizeArgs),
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        setup_logging(self.verbose, self.log_format);
        let config = Config::load(self.config.as_deref())?;

        match self.command {
            None => ReportArgs::default().run(config)?,
            Some(Commands::Report(args)) => args.run(config)?,
            Some(Commands::Query(args)) => args.run(config)?,
            Some(Commands::Summarize(args)) => args.run(config)?,
        }
        Ok(())
    }
}

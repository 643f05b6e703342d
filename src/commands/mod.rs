pub mod init;
pub mod run;

use clap::{Parser, Subcommand};
use std::error::Error;

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Configuration initialization")]
    Init(init::InitArgs),
    #[command(about = "Run the automation cycle in the foreground")]
    Run(run::RunArgs),
}

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help(true))]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    pub async fn menu() -> Result<(), Box<dyn Error>> {
        let cli = Self::parse();
        match cli.command {
            Commands::Init(args) => init::cmd(args).map_err(Into::into),
            Commands::Run(args) => run::cmd(args).await.map_err(Into::into),
        }
    }
}

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "agentic-app",
    about = "Ask questions about traffic_accidents.csv; answers come from Python run in a sandbox",
    version
)]
pub struct Cli {
    /// Project directory containing resources/data/traffic_accidents.csv.
    ///
    /// Defaults to PROJECT_ROOT from the config, then the current directory.
    #[arg(long = "project-root", value_name = "PATH")]
    pub project_root: Option<PathBuf>,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "pbix-inspect")]
#[command(version)]
#[command(about = "List the entries of a Power BI (.pbix) file", long_about = None)]
#[command(after_help = "Examples:\n  \
  pbix-inspect sales.pbix        print entry names and sizes\n  \
  pbix-inspect -l sales.pbix     entry names only, one per line\n  \
  RUST_LOG=debug pbix-inspect sales.pbix")]
pub struct Cli {
    /// Power BI file path
    #[arg(value_name = "FILE")]
    pub file: String,

    /// List entry names only
    #[arg(short = 'l')]
    pub names_only: bool,

    /// Verbose logging to stderr (-vv => trace)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Log filter used when `RUST_LOG` is not set.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    }
}

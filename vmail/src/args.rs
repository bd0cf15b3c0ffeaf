/// Flags and command to change vMail execution
#[derive(Debug, clap::Parser, PartialEq)]
#[clap(about, version, author)]
pub struct Args {
    /// Path of the vMail configuration file (toml format)
    #[clap(short, long)]
    pub config: Option<String>,

    /// Commands
    #[clap(subcommand)]
    pub command: Option<Commands>,

    /// Stay in the foreground and also print the logs on the standard output
    #[clap(short, long)]
    pub no_daemon: bool,
}

/// Subcommand run instead of the vMail server
#[derive(Debug, clap::Subcommand, PartialEq)]
pub enum Commands {
    /// Show the loaded config (as serialized json format)
    ConfigShow,
    /// Show the difference between the loaded config and the default one
    ConfigDiff,
    /// Take one message through the pipeline and print how it ended
    Inject {
        /// Sender of the message, the null sender if omitted
        #[clap(short, long)]
        from: Option<String>,
        /// Recipients of the message
        #[clap(short, long, required = true)]
        to: Vec<String>,
        /// Path of the message (headers and body)
        file: String,
    },
}

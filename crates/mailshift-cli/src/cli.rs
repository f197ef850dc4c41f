use clap::{ArgAction, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "mailshift")]
#[command(about = "Move every message of a set of IMAP mailboxes to another server")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = "Move every message of a set of IMAP mailboxes to another server.\n\n\
    Mailboxes and servers are read from the file named by MAILSHIFT_CONFIG, \
    or mailshift.toml in the current directory.")]
pub struct Cli {
    /// More output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Migrate every configured mailbox, deleting migrated messages from the source
    MigrateMailboxes,
}

impl Cli {
    /// Log level used when RUST_LOG is not set
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

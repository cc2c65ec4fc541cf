use clap::{Parser, Subcommand};

/// CLI surface definition. One invocation builds one cache, runs one
/// operation against it, and exits.
#[derive(Parser, Debug)]
#[command(
    name = "bws-cache",
    about = "Locally cached front end for the Bitwarden Secrets Manager CLI",
    version,
    propagate_version = true
)]
pub struct Cli {
    /// Project to operate on; falls back to the config file.
    #[arg(long, global = true)]
    pub project: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List secret keys in the project.
    List {
        /// Print values alongside keys.
        #[arg(long)]
        values: bool,
    },
    /// Print the value of one secret.
    Get { key: String },
    /// Create or update a secret.
    Set { key: String, value: String },
    /// Delete a secret.
    Delete { key: String },
    /// Pass arguments through to the `bws` backend unchanged.
    Raw {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Check that the backend executable responds.
    Health,
    /// Manage CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Create a default config file if one does not exist.
    Init,
}

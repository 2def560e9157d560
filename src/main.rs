mod api;
mod commands;
mod notes;
mod session;
mod state;
mod upload;
mod validate;

use session::SessionStore;
use state::AppState;

/// Command-line arguments.
mod cli {
    use std::path::PathBuf;

    use clap::{Parser, Subcommand};

    use crate::api::client::DEFAULT_BASE_URL;

    #[derive(Parser, Debug)]
    #[command(name = "vaultdrive", version, about = "PIN-protected personal file vault")]
    pub struct Args {
        /// Backend base URL, e.g. https://host/api/drive
        #[arg(long, global = true, env = "VAULTDRIVE_API_URL", default_value = DEFAULT_BASE_URL)]
        pub api_url: String,

        #[command(subcommand)]
        pub command: Command,
    }

    #[derive(Subcommand, Debug)]
    pub enum Command {
        /// Unlock a vault with its 6-digit PIN
        Unlock {
            /// Keep the vault unlocked across login sessions
            #[arg(long)]
            remember: bool,
        },
        /// Forget the unlocked vault
        Logout,
        /// Show which vault is unlocked
        Status,
        /// Show storage usage
        Usage,
        /// List files in the vault
        Ls,
        /// Upload files, one at a time, in the given order
        Upload {
            #[arg(required = true)]
            paths: Vec<PathBuf>,
        },
        /// Download a file
        Download {
            name: String,
            /// Where to write the file (defaults to its name)
            #[arg(short, long)]
            output: Option<PathBuf>,
        },
        /// Print the download URL of a file
        Url { name: String },
        /// Print a note's text
        Cat { name: String },
        /// Delete a file
        Rm {
            name: String,
            /// Skip the confirmation prompt
            #[arg(short, long)]
            yes: bool,
        },
        /// Create or edit notes
        #[command(subcommand)]
        Note(NoteCommand),
        /// Change a vault's PIN
        ChangePin {
            /// Vault to change (defaults to the unlocked vault)
            #[arg(long)]
            vault: Option<String>,
        },
        /// Rename the unlocked vault (ends the session)
        Rename { new_name: String },
    }

    #[derive(Subcommand, Debug)]
    pub enum NoteCommand {
        /// Create a note; content is read from stdin unless --content is given
        New {
            title: String,
            #[arg(long)]
            content: Option<String>,
        },
        /// Replace an existing note's content
        Edit {
            name: String,
            #[arg(long)]
            content: Option<String>,
        },
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let _ = dotenvy::dotenv();

    env_logger::init();

    let args = {
        use clap::Parser;
        cli::Args::parse()
    };
    let mut state = match AppState::new(&args.api_url, SessionStore::open_default()) {
        Ok(state) => state,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    log::debug!("Using API base URL {}", state.api.base_url());

    if let Err(message) = run(&mut state, args.command).await {
        eprintln!("Error: {}", message);
        std::process::exit(1);
    }
}

async fn run(state: &mut AppState, command: cli::Command) -> Result<(), String> {
    use cli::{Command, NoteCommand};

    match command {
        Command::Unlock { remember } => {
            let pin = commands::prompt_pin("Vault PIN")?;
            commands::unlock(state, &pin, remember).await
        }
        Command::Logout => commands::logout(state),
        Command::Status => commands::status(state),
        Command::Usage => commands::usage(state).await,
        Command::Ls => commands::list(state).await,
        Command::Upload { paths } => commands::upload(state, &paths).await,
        Command::Download { name, output } => {
            commands::download(state, &name, output.as_deref()).await
        }
        Command::Url { name } => commands::url(state, &name),
        Command::Cat { name } => commands::preview(state, &name).await,
        Command::Rm { name, yes } => commands::remove(state, &name, yes).await,
        Command::Note(NoteCommand::New { title, content }) => {
            commands::note_new(state, &title, content).await
        }
        Command::Note(NoteCommand::Edit { name, content }) => {
            commands::note_edit(state, &name, content).await
        }
        Command::ChangePin { vault } => {
            let vault_name = match vault {
                Some(v) => v,
                None => state.require_vault()?.to_string(),
            };
            let old_pin = commands::prompt_pin("Current PIN")?;
            let new_pin = commands::prompt_pin("New PIN")?;
            commands::change_pin(state, &vault_name, &old_pin, &new_pin).await
        }
        Command::Rename { new_name } => {
            let pin = commands::prompt_pin("PIN (to verify)")?;
            commands::rename(state, &new_name, &pin).await
        }
    }
}

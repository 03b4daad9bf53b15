//! Command-line entry point.
//!
//! `serve` (the default) runs the HTTP site. The other subcommands work
//! directly on the configured SQLite file and print JSON. A running server
//! sharing that file pushes `post`ed greetings to its open pages.

use std::error::Error;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use invitation_core::db::open_db;
use invitation_core::{
    init_logging, GreetingService, GuestService, NewGreeting, SqliteGreetingRepository,
    SqliteGuestRepository, PLACEHOLDER_USER_ID,
};
use invitation_server::config::Settings;
use log::error;

#[derive(Debug, Parser)]
#[command(name = "invitation", version, about = "Wedding invitation guestbook")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server.
    Serve,
    /// Print the guestbook grouped by day.
    List,
    /// Append one guestbook message.
    Post {
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long, default_value = "")]
        message: String,
        /// Record the guest as not attending.
        #[arg(long)]
        absent: bool,
    },
    /// Register an invited guest.
    GuestAdd {
        user_name: String,
        display_name: String,
    },
    /// Look up an invited guest by user name.
    GuestLookup { user_name: String },
}

type CliResult = Result<(), Box<dyn Error>>;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = Settings::load()
        .map_err(Box::<dyn Error>::from)
        .and_then(|settings| run(cli.command.unwrap_or(Command::Serve), settings));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_exit module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command, settings: Settings) -> CliResult {
    init_logging(&settings.log_level, &settings.log_dir.to_string_lossy())?;

    match command {
        Command::Serve => serve(settings),
        Command::List => {
            let conn = open_db(&settings.db_path)?;
            let guestbook = GreetingService::new(SqliteGreetingRepository::try_new(&conn)?)
                .with_day_offset(settings.day_offset)
                .list()?;
            println!("{}", serde_json::to_string_pretty(&guestbook)?);
            Ok(())
        }
        Command::Post {
            name,
            message,
            absent,
        } => {
            let conn = open_db(&settings.db_path)?;
            let stored = GreetingService::new(SqliteGreetingRepository::try_new(&conn)?).append(
                &NewGreeting {
                    alias_name: name,
                    is_confirm: !absent,
                    message,
                    id_user: PLACEHOLDER_USER_ID,
                },
            )?;
            println!("{}", serde_json::to_string_pretty(&stored)?);
            Ok(())
        }
        Command::GuestAdd {
            user_name,
            display_name,
        } => {
            let conn = open_db(&settings.db_path)?;
            let guest = GuestService::new(SqliteGuestRepository::try_new(&conn)?)
                .add_guest(&user_name, &display_name)?;
            println!("{}", serde_json::to_string_pretty(&guest)?);
            Ok(())
        }
        Command::GuestLookup { user_name } => {
            let conn = open_db(&settings.db_path)?;
            let lookup =
                GuestService::new(SqliteGuestRepository::try_new(&conn)?).lookup(&user_name)?;
            println!("{}", serde_json::to_string_pretty(&lookup)?);
            Ok(())
        }
    }
}

fn serve(settings: Settings) -> CliResult {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(invitation_server::run(settings))?;
    Ok(())
}

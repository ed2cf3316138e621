//! Command dispatch: bridges CLI args -> core integration -> output formatting.

pub mod call;
pub mod devices;
pub mod entities;
pub mod watch;

use cozytouch_config::Settings;

use crate::cli::Command;
use crate::error::CliError;
use crate::output::Printer;

/// Dispatch a connection-bound command to its handler.
pub async fn dispatch(
    cmd: Command,
    settings: Settings,
    out: &Printer,
) -> Result<(), CliError> {
    match cmd {
        Command::Devices(args) => devices::handle(&settings, args, out).await,
        Command::Entities(args) => entities::handle(&settings, args, out).await,
        Command::Watch(args) => watch::handle(settings, args, out).await,
        Command::Call(args) => call::handle(&settings, args, out).await,
        // Handled before settings are loaded
        Command::Completions(_) => unreachable!(),
    }
}

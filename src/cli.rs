use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::{self, CommandReport};

#[derive(Debug, Parser)]
#[command(
    name = "wa-archive",
    version,
    about = "Rebuild a browsable WhatsApp archive from an iPhone backup"
)]
struct Cli {
    /// Print the command report as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct DirArgs {
    /// iPhone backup source directory (falls back to WA_ARCHIVE_SRC, then `src`).
    #[arg(long)]
    src: Option<PathBuf>,
    /// Archive destination directory (falls back to WA_ARCHIVE_DST, then `dst`).
    #[arg(long)]
    dst: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve every chat and write the HTML archive with its media.
    Export {
        #[command(flatten)]
        dirs: DirArgs,
        /// Export at most this many chats, most recent first.
        #[arg(long = "limit-chats")]
        limit_chats: Option<usize>,
        /// Render at most this many of the latest messages per chat.
        #[arg(long = "limit-msgs")]
        limit_msgs: Option<usize>,
    },
    /// List the chats an export would include.
    Sessions {
        #[command(flatten)]
        dirs: DirArgs,
    },
    /// Report manifest and media resolution counts without copying media.
    Inspect {
        #[command(flatten)]
        dirs: DirArgs,
    },
}

fn print_report(report: &CommandReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{}", report.render_text());
    }
    Ok(())
}

/// Runs the selected command; `Ok(false)` means the report carries issues.
pub fn run() -> Result<bool> {
    let cli = Cli::parse();

    let report = match cli.command {
        Command::Export {
            dirs,
            limit_chats,
            limit_msgs,
        } => commands::export::run(&commands::export::ExportCommandOptions {
            src: dirs.src,
            dst: dirs.dst,
            limit_chats,
            limit_msgs,
        })?,
        Command::Sessions { dirs } => {
            commands::sessions::run(&commands::sessions::SessionsOptions {
                src: dirs.src,
                dst: dirs.dst,
            })?
        }
        Command::Inspect { dirs } => commands::inspect::run(&commands::inspect::InspectOptions {
            src: dirs.src,
            dst: dirs.dst,
        })?,
    };

    print_report(&report, cli.json)?;
    Ok(report.ok)
}

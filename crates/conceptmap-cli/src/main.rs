use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use conceptmap_app::Session;
use conceptmap_export::{ExportLog, HEADER, find_next_unprocessed, image_already_logged};
use conceptmap_graph::HitTester;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

mod script;
mod settings;

use settings::AppSettings;

#[derive(Parser, Debug)]
#[command(author, version, about = "Annotate concept-map images and log their structure", long_about = None)]
struct Args {
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the next image in a folder that the log has not recorded
    Next {
        /// Folder of .png images (defaults to the last one used)
        #[arg(short, long)]
        folder: Option<PathBuf>,
        /// CSV log (defaults to the last one used)
        #[arg(short, long)]
        log: Option<PathBuf>,
    },
    /// Report whether an image name already has a row in the log
    Check {
        #[arg(short, long)]
        log: Option<PathBuf>,
        /// Image file name, e.g. `map01.png`
        image: String,
    },
    /// Replay a recorded annotation script for one image and log the result
    Annotate {
        #[arg(short, long)]
        image: PathBuf,
        #[arg(short, long)]
        log: Option<PathBuf>,
        /// JSON list of steps (`click`, `crosslink`, `reset_current`, ...)
        #[arg(short, long)]
        script: PathBuf,
        /// Annotate even if the image is already logged
        #[arg(long)]
        force: bool,
    },
    /// Print every row of the log
    Report {
        #[arg(short, long)]
        log: Option<PathBuf>,
    },
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .init();

    let mut settings = AppSettings::load();
    let code = match args.command {
        Command::Next { folder, log } => {
            let folder = pick(folder, settings.last_image_folder.as_deref(), "--folder")?;
            let log = pick(log, settings.last_output_file.as_deref(), "--log")?;
            match find_next_unprocessed(&folder, Some(&log))? {
                Some(next) => println!("{}", next.display()),
                None => println!("No unprocessed images in {}", folder.display()),
            }
            settings.remember(Some(folder.as_path()), Some(log.as_path()));
            ExitCode::SUCCESS
        }
        Command::Check { log, image } => {
            let log = pick(log, settings.last_output_file.as_deref(), "--log")?;
            if image_already_logged(&log, &image)? {
                println!("{image} is already logged in {}", log.display());
                ExitCode::SUCCESS
            } else {
                println!("{image} is not logged in {}", log.display());
                ExitCode::FAILURE
            }
        }
        Command::Annotate {
            image,
            log,
            script,
            force,
        } => {
            let log = pick(log, settings.last_output_file.as_deref(), "--log")?;
            let steps = script::load(&script)?;

            let mut session = Session::new(HitTester::with_radius(settings.hit_radius));
            session.open_image(image.clone());
            session.set_output(log.clone());
            if session.already_logged()? && !force {
                bail!(
                    "{} is already logged in {} (use --force to log it again)",
                    image.display(),
                    log.display()
                );
            }

            script::replay(&mut session, &steps)?;
            let metrics = session.metrics();
            let done = session
                .done(None)
                .with_context(|| format!("exporting {}", image.display()))?;

            println!("{HEADER}");
            println!("{}", done.export.row.to_csv());
            println!(
                "nodes={} edges={} hss={} crosslinks={}",
                metrics.num_nodes,
                metrics.num_edges,
                metrics.hss(),
                metrics.num_crosslinks
            );
            match &done.next_image {
                Some(next) => println!("Next image: {}", next.display()),
                None => println!("All images in this folder are logged."),
            }
            settings.remember(image.parent(), Some(log.as_path()));
            ExitCode::SUCCESS
        }
        Command::Report { log } => {
            let log = pick(log, settings.last_output_file.as_deref(), "--log")?;
            let rows = ExportLog::new(&log).rows()?;
            println!("{HEADER}");
            for row in &rows {
                println!("{}", row.to_csv());
            }
            println!("{} image(s) logged", rows.len());
            ExitCode::SUCCESS
        }
    };

    if let Err(err) = settings.save() {
        tracing::warn!("Could not save settings: {err:#}");
    }
    Ok(code)
}

/// Explicit flag, else the remembered setting, else an error naming the flag.
fn pick(explicit: Option<PathBuf>, remembered: Option<&Path>, flag: &str) -> Result<PathBuf> {
    explicit
        .or_else(|| remembered.map(Path::to_path_buf))
        .with_context(|| format!("{flag} is required (no previous value remembered)"))
}

mod config;
mod logging;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};
use config::AppConfig;
use photo_sorter_adapters::{
    present_image_row, present_move_progress, present_scan_event, BackgroundWorker,
    WorkerSettings,
};
use photo_sorter_application::{
    ApplicationError, AssignPersonCommand, AutoAssignPolicy, MoveEvent, MoveState, ScanEvent, ScanState,
    SelectionCommand, SessionController, SessionObserver, SnapshotQuery, StartMoveCommand,
    StartScanCommand, UndoDispatch, UndoMoveCommand,
};
use photo_sorter_domain::{ImageId, ImageStatus};
use tracing::debug;

#[derive(Debug, Parser)]
#[command(name = "photo-sorter")]
#[command(about = "Sort photos into per-person folders using their embedded tags", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Print debug logs to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of the per-user one
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the images found in a folder with their candidate persons
    Scan {
        source: PathBuf,

        /// Include subfolders
        #[arg(short, long)]
        recursive: bool,

        /// Print the catalog as JSON
        #[arg(long)]
        json: bool,
    },

    /// Move tagged images into <target>/<person>/
    Organize {
        source: PathBuf,
        target: PathBuf,

        /// Include subfolders
        #[arg(short, long)]
        recursive: bool,

        /// Only sort into these persons (repeatable)
        #[arg(long = "person", value_name = "NAME")]
        persons: Vec<String>,

        /// Use the first candidate when an image has several
        #[arg(long)]
        first_candidate: bool,
    },

    /// Put the files of the last organize run back
    Undo,

    /// Print the config file location, or the effective settings
    Config {
        #[arg(long)]
        show: bool,

        /// Save the effective settings to a new file
        #[arg(long, value_name = "FILE", conflicts_with = "show")]
        write: Option<PathBuf>,
    },
}

#[derive(Debug)]
enum CommandError {
    Usage(String),
    Runtime(String),
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            return if error.use_stderr() {
                ExitCode::from(2)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("{error}");
            return ExitCode::from(2);
        }
    };
    logging::init_logging(&config.log_filter, cli.verbose);

    match run_command(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(CommandError::Usage(msg)) => {
            eprintln!("{msg}");
            ExitCode::from(2)
        }
        Err(CommandError::Runtime(msg)) => {
            eprintln!("{msg}");
            ExitCode::from(1)
        }
    }
}

fn run_command(command: Command, config: &AppConfig) -> Result<(), CommandError> {
    match command {
        Command::Scan {
            source,
            recursive,
            json,
        } => {
            let mut controller = build_controller(config)?;
            scan(&mut controller, &source, recursive, config.poll_interval())?;

            let snapshot = controller.snapshot(SnapshotQuery);
            if json {
                let rendered = serde_json::to_string_pretty(&snapshot.images)
                    .map_err(|error| CommandError::Runtime(format!("cannot render JSON: {error}")))?;
                println!("{rendered}");
            } else if snapshot.images.is_empty() {
                println!("no images found");
            } else {
                for image in &snapshot.images {
                    println!("{}", present_image_row(image));
                }
            }
            Ok(())
        }
        Command::Organize {
            source,
            target,
            recursive,
            persons,
            first_candidate,
        } => {
            let mut controller = build_controller(config)?;
            scan(&mut controller, &source, recursive, config.poll_interval())?;

            let policy = if first_candidate {
                AutoAssignPolicy::FirstCandidate
            } else {
                AutoAssignPolicy::SingleCandidate
            };
            let assigned = if persons.is_empty() {
                controller.auto_assign(policy)
            } else {
                assign_listed(&mut controller, &persons, policy)
            };
            debug!(assigned, "persons assigned");

            controller.update_selection(SelectionCommand::SelectAll);
            controller
                .start_move(StartMoveCommand {
                    target_dir: target.to_string_lossy().to_string(),
                })
                .map_err(|error| CommandError::Runtime(format!("organize failed: {error}")))?;
            wait_until_idle(&mut controller, config.poll_interval());

            let summary = controller
                .snapshot(SnapshotQuery)
                .last_move
                .ok_or_else(|| CommandError::Runtime("move finished without a summary".to_string()))?;
            println!("{}", summary.status_message());
            match summary.state {
                MoveState::Failed(reason) => Err(CommandError::Runtime(format!("organize failed: {reason}"))),
                _ if summary.failed > 0 => Err(CommandError::Runtime(format!(
                    "{} files could not be moved",
                    summary.failed
                ))),
                _ => Ok(()),
            }
        }
        Command::Undo => {
            let mut controller = build_controller(config)?;
            controller
                .bootstrap()
                .map_err(|error| CommandError::Runtime(format!("cannot read undo log: {error}")))?;
            let dispatch = controller
                .undo(UndoMoveCommand)
                .map_err(|error| CommandError::Runtime(format!("undo failed: {error}")))?;
            if let UndoDispatch::NothingToUndo(report) = dispatch {
                println!("{}", report.status_message());
                return Ok(());
            }

            wait_until_idle(&mut controller, config.poll_interval());
            let report = controller
                .snapshot(SnapshotQuery)
                .last_undo
                .ok_or_else(|| CommandError::Runtime("undo finished without a report".to_string()))?;
            println!("{}", report.status_message());
            if report.success {
                Ok(())
            } else {
                Err(CommandError::Runtime(format!(
                    "{} of {} files could not be restored",
                    report.expected.saturating_sub(report.restored_count),
                    report.expected
                )))
            }
        }
        Command::Config { show, write } => {
            if let Some(path) = write {
                if path.exists() {
                    return Err(CommandError::Usage(format!(
                        "{} already exists; not overwriting",
                        path.display()
                    )));
                }
                config
                    .save(&path)
                    .map_err(|error| CommandError::Runtime(error.to_string()))?;
                println!("{}", path.display());
            } else if show {
                let rendered = serde_json::to_string_pretty(config)
                    .map_err(|error| CommandError::Runtime(format!("cannot render JSON: {error}")))?;
                println!("{rendered}");
            } else {
                match AppConfig::default_path() {
                    Some(path) => println!("{}", path.display()),
                    None => {
                        return Err(CommandError::Usage(
                            "no per-user config directory on this platform; pass --config".to_string(),
                        ))
                    }
                }
            }
            Ok(())
        }
    }
}

fn build_controller(config: &AppConfig) -> Result<SessionController, CommandError> {
    let worker = BackgroundWorker::spawn(WorkerSettings {
        undo_log_path: config.undo_log_path.clone(),
        thumbnail_dir: config.thumbnail_dir.clone(),
    })
    .map_err(|error| CommandError::Runtime(format!("failed to start worker: {error}")))?;

    let mut controller = SessionController::new(Box::new(worker));
    controller.subscribe(Box::new(ConsoleObserver));
    Ok(controller)
}

fn scan(
    controller: &mut SessionController,
    source: &Path,
    recursive: bool,
    poll_interval: Duration,
) -> Result<(), CommandError> {
    controller
        .start_scan(StartScanCommand {
            source_dir: source.to_string_lossy().to_string(),
            include_subdirs: recursive,
        })
        .map_err(scan_rejected)?;
    wait_until_idle(controller, poll_interval);

    match controller.snapshot(SnapshotQuery).scan_state {
        ScanState::Failed(reason) => Err(CommandError::Runtime(format!("scan failed: {reason}"))),
        _ => Ok(()),
    }
}

/// Bad input is the caller's fault; anything else is a runtime failure.
fn scan_rejected(error: ApplicationError) -> CommandError {
    match error {
        ApplicationError::InvalidInput(_) => CommandError::Usage(format!("cannot scan: {error}")),
        other => CommandError::Runtime(format!("cannot scan: {other}")),
    }
}

/// Assigns only persons named on the command line, applying `policy` to
/// the candidates that remain after filtering.
fn assign_listed(
    controller: &mut SessionController,
    persons: &[String],
    policy: AutoAssignPolicy,
) -> usize {
    let picks: Vec<(ImageId, String)> = controller
        .catalog()
        .iter()
        .filter(|image| image.status == ImageStatus::Scanned)
        .filter_map(|image| {
            let listed: Vec<&String> = image
                .persons
                .iter()
                .filter(|person| persons.contains(person))
                .collect();
            match (policy, listed.as_slice()) {
                (_, [only]) => Some((image.id, (*only).clone())),
                (AutoAssignPolicy::FirstCandidate, [first, ..]) => Some((image.id, (*first).clone())),
                _ => None,
            }
        })
        .collect();

    picks
        .into_iter()
        .filter(|(image_id, person)| {
            matches!(
                controller.assign_person(AssignPersonCommand {
                    image_id: *image_id,
                    person: person.clone(),
                }),
                Ok(true)
            )
        })
        .count()
}

fn wait_until_idle(controller: &mut SessionController, poll_interval: Duration) {
    loop {
        controller.process_events();
        if !controller.is_busy() {
            return;
        }
        thread::sleep(poll_interval);
    }
}

/// Progress goes to stderr so stdout stays machine-readable.
struct ConsoleObserver;

impl SessionObserver for ConsoleObserver {
    fn on_scan_event(&self, event: &ScanEvent) {
        if let Some(line) = present_scan_event(event) {
            eprintln!("{line}");
        }
    }

    fn on_move_progress(&self, event: &MoveEvent) {
        if let Some(line) = present_move_progress(event) {
            eprintln!("{line}");
        }
    }

    fn on_status(&self, message: &str) {
        eprintln!("{message}");
    }
}

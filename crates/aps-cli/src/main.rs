use std::path::PathBuf;
use std::sync::Arc;

use clap::{ArgAction, Parser, Subcommand};
use color_eyre::eyre::{eyre, Result, WrapErr};
use serde_json::json;

use aps_core::{
    ConfigError, FsBucket, PharosClient, ReplicaConfig, ReplicaStore, StoreError,
};
use aps_domain::ReplicaAddress;

#[derive(Parser)]
#[command(
    name = "aps",
    about = "Stage preservation packages into an APTrust drop bucket",
    version
)]
struct ApsCli {
    /// Emit machine-readable JSON instead of plain text.
    #[arg(long, global = true)]
    json: bool,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: ApsCommand,
}

#[derive(Subcommand)]
enum ApsCommand {
    /// Bag a payload and stage it into the drop bucket. The payload file
    /// is consumed.
    Stage { group: String, file: PathBuf },
    /// Download a staged replica. A missing replica fetches 0 bytes.
    Fetch {
        group: String,
        id: String,
        dest: PathBuf,
    },
    /// Check whether a replica exists.
    Exists { group: String, id: String },
    /// Delete a staged replica, reporting the bytes freed.
    Remove { group: String, id: String },
    /// Relocate a replica between groups.
    Mv {
        src_group: String,
        dest_group: String,
        id: String,
    },
    /// Read one attribute of a replica (checksum, sizebytes, modified).
    Attr {
        group: String,
        id: String,
        name: String,
    },
    /// Poll the preservation service for a deposit's progress.
    Status { bag_name: String },
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = ApsCli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => Ok(()),
        Err(report) => {
            eprintln!("aps: {report:#}");
            std::process::exit(exit_code(&report));
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = format!("aps_core={level},aps_domain={level},aps_cli={level}");
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn exit_code(report: &color_eyre::Report) -> i32 {
    if report.downcast_ref::<ConfigError>().is_some() {
        return 1;
    }
    if matches!(report.downcast_ref::<StoreError>(), Some(StoreError::Address(_))) {
        return 1;
    }
    2
}

fn run(cli: &ApsCli) -> Result<()> {
    let config = ReplicaConfig::from_env()?;

    match &cli.command {
        ApsCommand::Stage { group, file } => {
            let key = ReplicaAddress::for_file(group, file)
                .map_err(StoreError::Address)?
                .key();
            let bytes = open_store(&config)?.transfer(group, file)?;
            emit(
                cli,
                &format!("staged {key} ({bytes} bytes)"),
                json!({ "command": "stage", "key": key, "bytes": bytes }),
            );
        }
        ApsCommand::Fetch { group, id, dest } => {
            let bytes = open_store(&config)?.fetch(group, id, dest)?;
            emit(
                cli,
                &format!("fetched {bytes} bytes"),
                json!({ "command": "fetch", "bytes": bytes }),
            );
        }
        ApsCommand::Exists { group, id } => {
            let exists = open_store(&config)?.exists(group, id)?;
            emit(
                cli,
                &format!("{exists}"),
                json!({ "command": "exists", "exists": exists }),
            );
        }
        ApsCommand::Remove { group, id } => {
            let bytes = open_store(&config)?.remove(group, id)?;
            emit(
                cli,
                &format!("freed {bytes} bytes"),
                json!({ "command": "remove", "bytes": bytes }),
            );
        }
        ApsCommand::Mv {
            src_group,
            dest_group,
            id,
        } => {
            let bytes = open_store(&config)?.move_object(src_group, dest_group, id)?;
            emit(
                cli,
                &format!("moved {bytes} bytes"),
                json!({ "command": "mv", "bytes": bytes }),
            );
        }
        ApsCommand::Attr { group, id, name } => {
            let value = open_store(&config)?.attribute(group, id, name)?;
            let text = value.clone().unwrap_or_else(|| "absent".to_string());
            emit(
                cli,
                &text,
                json!({ "command": "attr", "name": name, "value": value }),
            );
        }
        ApsCommand::Status { bag_name } => {
            let identifier = PharosClient::object_identifier(&config.institution, bag_name);
            let client = PharosClient::new(&config.pharos)?;
            match client.item_status(&identifier)? {
                Some(event) => {
                    let stage = event.stage.clone().unwrap_or_else(|| "-".to_string());
                    emit(
                        cli,
                        &format!("{identifier}: {} ({stage})", event.status),
                        json!({
                            "command": "status",
                            "identifier": identifier,
                            "status": event.status.as_str(),
                            "stage": event.stage,
                        }),
                    );
                }
                None => emit(
                    cli,
                    &format!("no events recorded for {identifier}"),
                    json!({
                        "command": "status",
                        "identifier": identifier,
                        "status": serde_json::Value::Null,
                    }),
                ),
            }
        }
    }
    Ok(())
}

/// The CLI drives a directory-backed staging tree; the production S3
/// transport is injected by the host framework, not constructed here.
fn open_store(config: &ReplicaConfig) -> Result<ReplicaStore> {
    let root = std::env::var("APS_BUCKET_PATH")
        .map_err(|_| eyre!("APS_BUCKET_PATH is not set (path of the local staging tree)"))?;
    let bucket = FsBucket::open(root).wrap_err("opening the local staging tree")?;
    Ok(ReplicaStore::new(config.clone(), Arc::new(bucket)))
}

fn emit(cli: &ApsCli, text: &str, payload: serde_json::Value) {
    if cli.json {
        println!("{payload}");
    } else {
        println!("{text}");
    }
}

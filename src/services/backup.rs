//! Database backup and restore
//!
//! Every step runs inside a short-lived helper container started from the
//! deployed database image:
//!
//! - dump: `pg_dump` against the running database, no downtime
//! - full: tar of the whole data volume, application stopped meanwhile
//!
//! Detached helpers are polled with `docker ps` until they exit, then the
//! artifact is copied out and the helper is force-removed.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use tracing::{debug, info, warn};

use crate::config::env::constants::BACKUP_DIR_NAME;
use crate::config::env_file;
use crate::config::resolver::{DEFAULT_DB_NAME, DEFAULT_DB_USER};
use crate::domain::backup::{BackupArtifact, BackupKind};
use crate::domain::configuration::keys;
use crate::error::{DeployError, DeployResult, Outcome};
use crate::infra::command::{display_command, OutputMode};

use super::compose::{start_services, stop_services};
use super::context::DeployContext;

/// Database login read from the configuration file
#[derive(Clone)]
struct DbCredentials {
    user: String,
    name: String,
    password: String,
}

impl DbCredentials {
    fn load(ctx: &DeployContext) -> DeployResult<Self> {
        let config = env_file::load(&ctx.config.env_file)?.unwrap_or_default();
        let value = |key: &str, default: &str| {
            config
                .get(key)
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
                .to_string()
        };
        Ok(Self {
            user: value(keys::DATABASE_USERNAME, DEFAULT_DB_USER),
            name: value(keys::DATABASE_NAME, DEFAULT_DB_NAME),
            password: value(keys::POSTGRES_PASSWORD, ""),
        })
    }
}

/// `db-dump`
pub async fn db_dump(ctx: &DeployContext) -> DeployResult<Outcome> {
    db_dump_at(ctx, Local::now().naive_local()).await
}

pub(crate) async fn db_dump_at(ctx: &DeployContext, now: NaiveDateTime) -> DeployResult<Outcome> {
    let topology = ctx.read_topology().await?;
    let network = format!("--network={}", topology.network_name()?);
    let db_container = topology.db_container_name()?;
    let db_image = topology.db_image()?;

    let artifact = BackupArtifact::at(BackupKind::Dump, now);
    fs::create_dir_all(ctx.config.backup_dir())?;
    let db = DbCredentials::load(ctx)?;
    let pg_password = format!("-e=PGPASSWORD={}", db.password);

    info!(file = %artifact.file_name, "Creating database dump");
    let container_id = launch_helper(
        ctx,
        &[
            "run",
            "-d",
            &network,
            "-w=/tmp",
            &pg_password,
            db_image,
            "pg_dump",
            "-h",
            db_container,
            "-Ft",
            "-f",
            &artifact.file_name,
            "-U",
            &db.user,
            &db.name,
        ],
    )
    .await?;
    collect_artifact(ctx, &container_id, &artifact.file_name).await?;

    Ok(created(&artifact))
}

/// `db-full-backup`
pub async fn db_full_backup(ctx: &DeployContext) -> DeployResult<Outcome> {
    db_full_backup_at(ctx, Local::now().naive_local()).await
}

/// The application stays stopped if any step between stop and start fails
pub(crate) async fn db_full_backup_at(
    ctx: &DeployContext,
    now: NaiveDateTime,
) -> DeployResult<Outcome> {
    let topology = ctx.read_topology().await?;
    let volume = format!("-v={}:/volume", topology.db_volume()?);
    let db_image = topology.db_image()?;

    let artifact = BackupArtifact::at(BackupKind::Full, now);
    fs::create_dir_all(ctx.config.backup_dir())?;

    info!(file = %artifact.file_name, "Creating full database backup");
    stop_services(ctx).await?;
    let container_id = launch_helper(
        ctx,
        &[
            "run",
            "-d",
            &volume,
            "-w=/tmp",
            db_image,
            "tar",
            "-cjf",
            &artifact.file_name,
            "-C",
            "/volume",
            "./",
        ],
    )
    .await?;
    collect_artifact(ctx, &container_id, &artifact.file_name).await?;
    start_services(ctx).await?;

    Ok(created(&artifact))
}

/// `db-dump-restore`; runs against the live database
pub async fn db_dump_restore(
    ctx: &DeployContext,
    requested: Option<&str>,
) -> DeployResult<Outcome> {
    let topology = ctx.read_topology().await?;
    let network = format!("--network={}", topology.network_name()?);
    let db_container = topology.db_container_name()?;
    let db_image = topology.db_image()?;

    let files = list_backups(&ctx.config.backup_dir(), BackupKind::Dump)?;
    if files.is_empty() {
        return Ok(Outcome::cancelled("No files was found"));
    }
    let Some(file) = select_backup(ctx, &files, requested, "restore") else {
        return Ok(Outcome::cancelled("Aborted"));
    };

    ctx.show(&format!("Restoring from {}...", file));
    let db = DbCredentials::load(ctx)?;
    let pg_password = format!("PGPASSWORD={}", db.password);
    let backup_mount = backup_mount(ctx);
    let archive = format!("/tmp/{}", file);

    ctx.docker(
        &[
            "run",
            &network,
            "-e",
            &pg_password,
            "-v",
            &backup_mount,
            "--rm",
            db_image,
            "pg_restore",
            "-h",
            db_container,
            "-d",
            &db.name,
            &archive,
            "-c",
            "-Ft",
            "-U",
            &db.user,
        ],
        OutputMode::Echo,
    )
    .await?;

    Ok(Outcome::done(format!(
        "Database has been successfully restored from {}/{}",
        BACKUP_DIR_NAME, file
    )))
}

/// `db-full-backup-restore`; replaces the data volume contents
pub async fn db_full_backup_restore(
    ctx: &DeployContext,
    requested: Option<&str>,
) -> DeployResult<Outcome> {
    let topology = ctx.read_topology().await?;
    let volume = format!("{}:/volume", topology.db_volume()?);
    let db_image = topology.db_image()?;

    let files = list_backups(&ctx.config.backup_dir(), BackupKind::Full)?;
    if files.is_empty() {
        return Ok(Outcome::cancelled("No files to full restore was found"));
    }
    let Some(file) = select_backup(ctx, &files, requested, "full restore") else {
        return Ok(Outcome::cancelled("Aborted"));
    };

    ctx.show(&format!("Restoring from {}...", file));
    stop_services(ctx).await?;
    {
        let script = RestoreScript::create(ctx.config.restore_script(), &file)?;
        let backup_mount = backup_mount(ctx);
        let script_mount = format!("{}:{}", script.path.display(), script.container_path());
        let container_script = script.container_path();

        ctx.docker(
            &[
                "run",
                "-v",
                &volume,
                "-v",
                &backup_mount,
                "-v",
                &script_mount,
                "--rm",
                db_image,
                "sh",
                &container_script,
            ],
            OutputMode::Echo,
        )
        .await?;
    }
    start_services(ctx).await?;

    Ok(Outcome::done(format!(
        "Database has been successfully restored from {}/{}",
        BACKUP_DIR_NAME, file
    )))
}

fn created(artifact: &BackupArtifact) -> Outcome {
    Outcome::done(format!(
        "{}/{} has been successfully created...",
        BACKUP_DIR_NAME, artifact.file_name
    ))
}

fn backup_mount(ctx: &DeployContext) -> String {
    format!("{}:/tmp", ctx.config.backup_dir().display())
}

/// Start a detached helper and return its container id
async fn launch_helper(ctx: &DeployContext, args: &[&str]) -> DeployResult<String> {
    let output = ctx.docker(args, OutputMode::Capture).await?;
    let container_id = output.stdout.trim().to_string();
    if container_id.is_empty() {
        return Err(DeployError::MissingContainerId(display_command(
            &ctx.config.docker_bin,
            args,
        )));
    }
    debug!(container_id = %container_id, "Helper container started");
    Ok(container_id)
}

/// Wait for the helper to exit, copy the artifact out, then remove the helper
async fn collect_artifact(ctx: &DeployContext, container_id: &str, file: &str) -> DeployResult<()> {
    wait_for_exit(ctx, container_id).await?;

    let source = format!("{}:/tmp/{}", container_id, file);
    let target = ctx.config.backup_dir().display().to_string();
    let copied = ctx
        .docker(&["cp", &source, &target], OutputMode::Capture)
        .await;

    ctx.docker(&["container", "rm", "-f", container_id], OutputMode::Capture)
        .await?;
    copied.map(|_| ())
}

/// Poll until `docker ps` no longer lists the container; no upper bound
async fn wait_for_exit(ctx: &DeployContext, container_id: &str) -> DeployResult<()> {
    let filter = format!("id={}", container_id);
    loop {
        let output = ctx
            .docker(&["ps", "-f", &filter, "-q"], OutputMode::Capture)
            .await?;
        if output.stdout.trim().is_empty() {
            return Ok(());
        }
        debug!(container_id, "Helper container still running");
        tokio::time::sleep(ctx.config.poll_interval).await;
    }
}

/// Candidate files of the given kind, sorted; a missing directory has none
fn list_backups(dir: &Path, kind: BackupKind) -> DeployResult<Vec<String>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if kind.matches(name) {
                files.push(name.to_string());
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Exact-name selection; `None` when nothing matches
fn select_backup(
    ctx: &DeployContext,
    files: &[String],
    requested: Option<&str>,
    action: &str,
) -> Option<String> {
    let requested = match requested {
        Some(name) => Some(name.to_string()),
        None => {
            for file in files {
                ctx.show(&format!("fileName to {}: {}", action, file));
            }
            ctx.prompt
                .read_line(&format!("Type file name to {}: ", action))
        }
    }?;

    let found = files.iter().any(|f| *f == requested);
    if !found {
        warn!(file = %requested, "Requested backup file not found");
    }
    found.then_some(requested)
}

/// Disposable restore script, deleted when dropped
struct RestoreScript {
    path: PathBuf,
}

impl RestoreScript {
    fn create(path: PathBuf, archive: &str) -> DeployResult<Self> {
        let content = format!(
            "rm -rf /volume/* /volume/..?* /volume/.[!.]*\ntar -C /volume/ -xjf /tmp/{}\n",
            archive
        );
        fs::write(&path, content)?;
        Ok(Self { path })
    }

    fn container_path(&self) -> String {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("/script/{}", name)
    }
}

impl Drop for RestoreScript {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "Failed to remove restore script");
            }
        }
    }
}

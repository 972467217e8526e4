//! Fluent Deploy - Fluent Manager 部署工具
//!
//! Usage:
//! - `fluent-deploy create-config-file --admin-email a@b.com --admin-password <pw>`
//! - `fluent-deploy create-app-file --host-port 8080`
//! - `fluent-deploy deploy`
//! - `fluent-deploy --disable-interactivity remove`

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use fluent_deploy::config::env::constants::{COMPOSE_FILE_NAME, DEFAULT_HOST_PORT, ENV_FILE_NAME};
use fluent_deploy::config::{ConfigRequest, MailingOptions, ToolConfig, VaultOptions};
use fluent_deploy::domain::ImageVersionOverrides;
use fluent_deploy::services::app_file::{self, AppFileRequest};
use fluent_deploy::services::config_file::{self, ConfigFileRequest};
use fluent_deploy::services::update::{self, UpdateRequest};
use fluent_deploy::services::{backup, compose, DeployContext};
use fluent_deploy::{DeployError, DeployResult, Outcome};

#[derive(Parser)]
#[command(name = "fluent-deploy")]
#[command(about = "Deploy and operate Fluent Manager with Docker Compose")]
#[command(version)]
struct Cli {
    /// Answer every confirmation with its default and never read stdin
    #[arg(long, global = true)]
    disable_interactivity: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Creates Docker Compose application file (docker-compose.yml)
    CreateAppFile(CreateAppFileArgs),

    /// Creates the file with environment variables (.env) defining application configuration
    CreateConfigFile(CreateConfigFileArgs),

    /// Deploys the application (docker compose up)
    Deploy,

    /// Undeploys the application; containers and network are removed
    Undeploy,

    /// Starts the application
    Start,

    /// Stops the application
    Stop,

    /// Updates application images to the current version. Back up your data first
    Update {
        /// Pull images from the upstream registry before redeploying
        #[arg(long, hide = true)]
        refresh_images: bool,

        /// Custom registry to pull images from
        #[arg(long, hide = true)]
        registry: Option<String>,
    },

    /// Completely removes the application including volumes and images
    Remove,

    /// Creates a database dump with pg_dump into backup_db
    DbDump,

    /// Restores the database from a dump in backup_db
    DbDumpRestore {
        /// Backup file name; asked interactively when omitted
        #[arg(long)]
        file: Option<String>,
    },

    /// Creates a full backup of the database volume. The application is stopped meanwhile
    DbFullBackup,

    /// Restores the database volume from a full backup. The application is stopped meanwhile
    DbFullBackupRestore {
        /// Backup file name; asked interactively when omitted
        #[arg(long)]
        file: Option<String>,
    },
}

#[derive(Args)]
struct CreateAppFileArgs {
    /// Container alias; useful for deploying several instances on one node
    #[arg(long)]
    alias: Option<String>,

    /// Host port
    #[arg(long, default_value_t = DEFAULT_HOST_PORT)]
    host_port: u16,

    /// Custom registry to pull images from
    #[arg(long, hide = true)]
    registry: Option<String>,

    /// Refreshes images from the upstream registry
    #[arg(long, hide = true)]
    refresh_images: bool,

    #[arg(long, hide = true, default_value = COMPOSE_FILE_NAME)]
    app_file_path: PathBuf,

    #[arg(long, hide = true)]
    overridden_manager_frontend_version: Option<String>,

    #[arg(long, hide = true)]
    overridden_manager_backend_version: Option<String>,

    #[arg(long, hide = true)]
    overridden_manager_db_version: Option<String>,
}

#[derive(Args)]
struct CreateConfigFileArgs {
    /// Email of the initial admin user
    #[arg(long)]
    admin_email: String,

    /// Password of the initial admin user (12 to 64 characters)
    #[arg(long)]
    admin_password: String,

    /// Fluent Manager public url
    #[arg(long, default_value = "")]
    public_url: String,

    #[arg(long, default_value = ENV_FILE_NAME)]
    config_file_path: PathBuf,

    #[command(flatten)]
    mailing: MailingArgs,

    #[command(flatten)]
    vault: VaultArgs,
}

#[derive(Args)]
#[command(next_help_heading = "Mailing configuration")]
struct MailingArgs {
    #[arg(long)]
    enable_mailing: bool,

    #[arg(long)]
    smtp_host: Option<String>,

    #[arg(long)]
    smtp_port: Option<String>,

    #[arg(long)]
    smtp_username: Option<String>,

    #[arg(long)]
    smtp_password: Option<String>,

    #[arg(long)]
    smtp_from: Option<String>,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    smtp_auth: bool,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    smtp_tls_enable: bool,
}

#[derive(Args)]
#[command(next_help_heading = "Vault configuration")]
struct VaultArgs {
    #[arg(long)]
    enable_vault: bool,

    #[arg(long)]
    vault_url: Option<String>,

    #[arg(long)]
    vault_token: Option<String>,

    #[arg(long)]
    vault_secret_engine_path: Option<String>,
}

impl CreateConfigFileArgs {
    fn into_request(self) -> DeployResult<ConfigFileRequest> {
        let MailingArgs {
            enable_mailing,
            smtp_host,
            smtp_port,
            smtp_username,
            smtp_password,
            smtp_from,
            smtp_auth,
            smtp_tls_enable,
        } = self.mailing;
        let mailing = MailingOptions::from_args(
            enable_mailing,
            smtp_host,
            smtp_port,
            smtp_username,
            smtp_password,
            smtp_from,
            smtp_auth,
            smtp_tls_enable,
        )?;
        let vault = VaultOptions::from_args(
            self.vault.enable_vault,
            self.vault.vault_url,
            self.vault.vault_token,
            self.vault.vault_secret_engine_path,
        )?;

        Ok(ConfigFileRequest {
            config: ConfigRequest {
                admin_email: self.admin_email,
                admin_password: self.admin_password,
                public_url: self.public_url,
                mailing,
                vault,
            },
            config_file_path: self.config_file_path,
        })
    }
}

impl From<CreateAppFileArgs> for AppFileRequest {
    fn from(args: CreateAppFileArgs) -> Self {
        Self {
            alias: args.alias,
            host_port: args.host_port,
            registry: args.registry,
            refresh_images: args.refresh_images,
            app_file_path: args.app_file_path,
            overrides: ImageVersionOverrides {
                frontend: args.overridden_manager_frontend_version,
                backend: args.overridden_manager_backend_version,
                db: args.overridden_manager_db_version,
            },
        }
    }
}

async fn run(ctx: &DeployContext, command: Commands) -> DeployResult<Outcome> {
    match command {
        Commands::CreateAppFile(args) => app_file::create_app_file(ctx, &args.into()).await,
        Commands::CreateConfigFile(args) => {
            config_file::create_config_file(ctx, &args.into_request()?).await
        }
        Commands::Deploy => compose::deploy(ctx).await,
        Commands::Undeploy => compose::undeploy(ctx).await,
        Commands::Start => compose::start(ctx).await,
        Commands::Stop => compose::stop(ctx).await,
        Commands::Update {
            refresh_images,
            registry,
        } => {
            let req = UpdateRequest {
                refresh_images,
                registry,
            };
            update::update(ctx, &req).await
        }
        Commands::Remove => compose::remove(ctx).await,
        Commands::DbDump => backup::db_dump(ctx).await,
        Commands::DbDumpRestore { file } => backup::db_dump_restore(ctx, file.as_deref()).await,
        Commands::DbFullBackup => backup::db_full_backup(ctx).await,
        Commands::DbFullBackupRestore { file } => {
            backup::db_full_backup_restore(ctx, file.as_deref()).await
        }
    }
}

#[tokio::main]
async fn main() {
    // 日志写到 stderr，stdout 只输出结果消息
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match ToolConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: failed to determine working directory: {}", e);
            std::process::exit(1);
        }
    };
    config.disable_interactivity = cli.disable_interactivity;
    let ctx = DeployContext::new(config);

    match run(&ctx, cli.command).await {
        Ok(outcome) => println!("{}", outcome.message()),
        Err(e) => {
            if let DeployError::ExternalCommand { stderr, .. } = &e {
                if !stderr.trim().is_empty() {
                    eprintln!("{}", stderr.trim_end());
                }
            }
            eprintln!("Error: {}", e);
            std::process::exit(e.exit_code());
        }
    }
}

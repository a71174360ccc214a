//! Pearkit CLI - create, upgrade and package PEAR components

use anyhow::Result;
use clap::{Parser, Subcommand};
use pearkit_core::Toolkit;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod add_roles;
mod config;
mod expand;
mod init;
mod set_property;
mod status;
mod upgrade;
mod validate;

#[derive(Parser)]
#[command(name = "pearkit")]
#[command(version = pearkit_core::VERSION)]
#[command(about = "Create, upgrade and package PEAR components", long_about = None)]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory holding the component templates (required for installed
    /// binaries unless set in the config file)
    #[arg(long, global = true, env = "PEARKIT_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Configuration file (defaults to <config dir>/pearkit/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the state of a component folder
    Status {
        /// Component folder (defaults to the current directory)
        folder: Option<PathBuf>,
    },

    /// Create a new component in an empty folder
    Init {
        /// Component folder (defaults to the current directory)
        folder: Option<PathBuf>,
    },

    /// Upgrade a component folder to a newer layout
    Upgrade {
        /// Component folder (defaults to the current directory)
        folder: Option<PathBuf>,

        /// Stop at this version instead of the latest
        #[arg(long)]
        to: Option<u32>,

        /// Start from this version instead of the recorded one
        #[arg(long)]
        from: Option<u32>,
    },

    /// Create the src/ directories for PEAR file roles
    AddRoles {
        /// Comma-separated roles: php, data, doc, test, script, www
        roles: String,

        /// Component folder (defaults to the current directory)
        folder: Option<PathBuf>,
    },

    /// Regenerate package.xml from its template and the src/ tree
    ExpandPackageXml {
        /// Build properties file
        #[arg(short = 'b', long, default_value = "build.properties")]
        build_properties: PathBuf,

        /// Package manifest to expand in place
        #[arg(short = 'p', long, default_value = "package.xml")]
        package_xml: PathBuf,

        /// Source folder holding the role directories
        #[arg(short = 's', long, default_value = "src")]
        src: PathBuf,
    },

    /// Set a value in build.properties
    SetProperty {
        /// Property name
        name: String,

        /// Property value
        value: String,

        /// Place a new property right after this one
        #[arg(long)]
        after: Option<String>,

        /// Component folder (defaults to the current directory)
        folder: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = config::Config::load(cli.config.as_deref())?;
    let data_dir = config::resolve_data_dir(cli.data_dir, &settings);
    debug!(data_dir = %data_dir.display(), "using templates");
    let toolkit = Toolkit::new(data_dir);

    match cli.command {
        Commands::Status { folder } => {
            let folder = validate::component_folder(folder)?;
            status::show_status(&folder, &toolkit)?;
        }

        Commands::Init { folder } => {
            let folder = validate::component_folder(folder)?;
            init::init_component(&folder, &toolkit)?;
        }

        Commands::Upgrade { folder, to, from } => {
            let folder = validate::component_folder(folder)?;
            let options = upgrade::UpgradeOptions { to, from };
            upgrade::upgrade_component(&folder, &toolkit, &options)?;
        }

        Commands::AddRoles { roles, folder } => {
            let roles = validate::roles(&roles)?;
            let folder = validate::component_folder(folder)?;
            add_roles::add_roles(&folder, &roles)?;
        }

        Commands::ExpandPackageXml {
            build_properties,
            package_xml,
            src,
        } => {
            let options = expand::ExpandOptions {
                build_properties,
                package_xml,
                src,
            };
            expand::expand(&options)?;
        }

        Commands::SetProperty {
            name,
            value,
            after,
            folder,
        } => {
            let folder = validate::component_folder(folder)?;
            set_property::set_property(&folder, &toolkit, &name, &value, after.as_deref())?;
        }
    }

    Ok(())
}

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use shortcut_manager::artwork::ArtworkConfig;
use shortcut_manager::config::RemoteOverrides;

#[derive(Parser, Debug)]
#[command(
    name = "steam-shortcut-manager",
    version,
    about = "Manage Steam non-Steam-game shortcuts locally or over SSH"
)]
pub(crate) struct Args {
    /// Config file (default: ~/.config/steam-shortcut-manager/config.toml).
    #[arg(long, global = true)]
    pub(crate) config: Option<PathBuf>,
    /// Operate on a remote machine, e.g. deck@steamdeck.local.
    #[arg(long, global = true, value_name = "USER@HOST")]
    pub(crate) remote: Option<String>,
    #[arg(long, global = true)]
    pub(crate) port: Option<u16>,
    #[arg(long, global = true)]
    pub(crate) password: Option<String>,
    #[arg(long, global = true)]
    pub(crate) key_file: Option<PathBuf>,
    /// Steam base directory on the target machine.
    #[arg(long, global = true)]
    pub(crate) steam_dir: Option<String>,
    #[arg(long, short = 'o', global = true, value_enum, default_value_t = OutputFormat::Term)]
    pub(crate) output: OutputFormat,
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub(crate) verbose: u8,
    /// Also write JSON logs, rotated daily, into this directory.
    #[arg(long, global = true)]
    pub(crate) log_dir: Option<PathBuf>,
    #[command(subcommand)]
    pub(crate) command: Command,
}

impl Args {
    pub(crate) fn remote_overrides(&self) -> RemoteOverrides {
        RemoteOverrides {
            ssh: self.remote.clone(),
            port: self.port,
            password: self.password.clone(),
            key_file: self.key_file.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Term,
    Json,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// List shortcuts of every Steam user.
    List {
        #[arg(long, short = 'i')]
        app_id: Option<u32>,
    },
    /// Add a shortcut, or update the one with the same app id.
    Add(AddArgs),
    /// Remove every shortcut with the given name.
    Remove {
        name: String,
        #[arg(long, default_value = "all")]
        user: String,
    },
    /// Apply artwork from SteamGridDB and/or explicit image sources.
    Artwork(ArtworkArgs),
    /// List Steam user ids.
    Users,
}

#[derive(ClapArgs, Debug)]
pub(crate) struct AddArgs {
    pub(crate) name: String,
    pub(crate) exe: String,
    #[arg(long)]
    pub(crate) start_dir: Option<String>,
    #[arg(long, default_value = "")]
    pub(crate) launch_options: String,
    #[arg(long)]
    pub(crate) icon: Option<String>,
    #[arg(long = "tag")]
    pub(crate) tags: Vec<String>,
    #[arg(long)]
    pub(crate) hidden: bool,
    #[arg(long, default_value = "all")]
    pub(crate) user: String,
}

#[derive(ClapArgs, Debug)]
pub(crate) struct ArtworkArgs {
    pub(crate) app_id: u32,
    /// SteamGridDB game id.
    #[arg(long, conflicts_with = "search")]
    pub(crate) game_id: Option<u64>,
    /// Look the game up on SteamGridDB by name.
    #[arg(long)]
    pub(crate) search: Option<String>,
    #[arg(long)]
    pub(crate) grid_portrait: Option<String>,
    #[arg(long)]
    pub(crate) grid_landscape: Option<String>,
    #[arg(long)]
    pub(crate) hero: Option<String>,
    #[arg(long)]
    pub(crate) logo: Option<String>,
    #[arg(long)]
    pub(crate) icon: Option<String>,
}

impl ArtworkArgs {
    pub(crate) fn explicit_config(&self) -> ArtworkConfig {
        ArtworkConfig {
            grid_portrait: self.grid_portrait.clone(),
            grid_landscape: self.grid_landscape.clone(),
            hero: self.hero.clone(),
            logo: self.logo.clone(),
            icon: self.icon.clone(),
        }
    }

    pub(crate) fn uses_griddb(&self) -> bool {
        self.game_id.is_some() || self.search.is_some()
    }
}

use std::io::Write;
use std::time::{Duration, UNIX_EPOCH};

use anyhow::Context as _;
use indexmap::IndexMap;
use remote_exec::Host;
use serde::Serialize;
use shortcut_manager::artwork::{self, ArtworkConfig, ArtworkReport, AssetSlot, HttpFetcher};
use shortcut_manager::config::{AppConfig, API_KEY_ENV};
use shortcut_manager::griddb::GridDbClient;
use shortcut_manager::shortcut::{self, Images, Shortcut, Shortcuts};
use shortcut_manager::steam::SteamLocator;
use shortcut_manager::Error;
use tracing::info;

use crate::cli::{AddArgs, ArtworkArgs, Command, OutputFormat};

const ALL_USERS: &str = "all";

/// Everything a subcommand needs about the machine it runs against.
pub(crate) struct Context<'h> {
    pub(crate) host: &'h dyn Host,
    pub(crate) locator: SteamLocator<'h>,
    pub(crate) config: &'h AppConfig,
    pub(crate) output: OutputFormat,
}

#[derive(Serialize)]
struct ListedShortcut<'a> {
    #[serde(flatten)]
    shortcut: &'a Shortcut,
    images: &'a Images,
}

#[derive(Serialize)]
struct UserSummary {
    user: String,
    shortcuts_path: String,
    has_shortcuts: bool,
}

#[derive(Serialize)]
struct ChangeSummary<'a> {
    action: &'a str,
    name: &'a str,
    users: Vec<UserChange>,
}

#[derive(Serialize)]
struct UserChange {
    user: String,
    app_id: Option<u32>,
    count: usize,
}

pub(crate) fn run(command: &Command, ctx: &Context<'_>, out: &mut dyn Write) -> anyhow::Result<()> {
    match command {
        Command::List { app_id } => list(ctx, *app_id, out),
        Command::Add(args) => add(ctx, args, out),
        Command::Remove { name, user } => remove(ctx, name, user, out),
        Command::Artwork(args) => apply_artwork(ctx, args, out),
        Command::Users => users(ctx, out),
    }
}

fn list(ctx: &Context<'_>, app_id: Option<u32>, out: &mut dyn Write) -> anyhow::Result<()> {
    let mut results: IndexMap<String, Shortcuts> = IndexMap::new();
    for user in ctx.locator.list_users()? {
        if !ctx.locator.has_shortcuts(&user) {
            continue;
        }
        let path = ctx.locator.shortcuts_path(&user)?;
        let loaded = shortcut::load(ctx.host, &path)?;
        let mut shortcuts = match app_id {
            Some(app_id) => loaded.filter_app_id(app_id),
            None => loaded,
        };
        for (_, entry) in shortcuts.iter_mut() {
            entry.images = Some(resolve_images(&ctx.locator, &user, entry.app_id));
        }
        results.insert(user, shortcuts);
    }

    match ctx.output {
        OutputFormat::Json => {
            let listed: IndexMap<&str, IndexMap<&str, ListedShortcut<'_>>> = results
                .iter()
                .map(|(user, shortcuts)| {
                    let entries: IndexMap<&str, ListedShortcut<'_>> = shortcuts
                        .iter()
                        .map(|(key, entry)| {
                            (
                                key.as_str(),
                                ListedShortcut {
                                    shortcut: entry,
                                    images: entry.images.as_ref().unwrap_or(&NO_IMAGES),
                                },
                            )
                        })
                        .collect();
                    (user.as_str(), entries)
                })
                .collect();
            write_json(out, &listed)
        }
        OutputFormat::Term => {
            for (user, shortcuts) in &results {
                if shortcuts.is_empty() {
                    continue;
                }
                writeln!(out, "User: {user}")?;
                for (_, entry) in shortcuts.iter() {
                    write_shortcut(out, entry)?;
                }
            }
            Ok(())
        }
    }
}

static NO_IMAGES: Images = Images {
    portrait: None,
    landscape: None,
    hero: None,
    logo: None,
    icon: None,
};

fn resolve_images(locator: &SteamLocator<'_>, user: &str, app_id: u32) -> Images {
    Images {
        portrait: locator.find_image(user, app_id, AssetSlot::GridPortrait),
        landscape: locator.find_image(user, app_id, AssetSlot::GridLandscape),
        hero: locator.find_image(user, app_id, AssetSlot::Hero),
        logo: locator.find_image(user, app_id, AssetSlot::Logo),
        icon: locator.find_image(user, app_id, AssetSlot::Icon),
    }
}

fn write_shortcut(out: &mut dyn Write, entry: &Shortcut) -> anyhow::Result<()> {
    let images = entry.images.as_ref().unwrap_or(&NO_IMAGES);
    let show = |value: &Option<String>| value.clone().unwrap_or_default();
    writeln!(out, "  {}", entry.app_name)?;
    writeln!(out, "    AppId:           {}", entry.app_id)?;
    writeln!(out, "    Executable:      {}", entry.exe)?;
    writeln!(out, "    Start Dir:       {}", entry.start_dir)?;
    writeln!(out, "    Launch Options:  {}", entry.launch_options)?;
    if !entry.tags.is_empty() {
        writeln!(out, "    Tags:            {}", entry.tags.join(", "))?;
    }
    if entry.hidden() {
        writeln!(out, "    Hidden:          yes")?;
    }
    writeln!(out, "    Last Played:     {}", last_played(entry.last_play_time))?;
    writeln!(out, "    Logo Image:      {}", show(&images.logo))?;
    writeln!(out, "    Portrait Image:  {}", show(&images.portrait))?;
    writeln!(out, "    Landscape Image: {}", show(&images.landscape))?;
    writeln!(out, "    Hero Image:      {}", show(&images.hero))?;
    let icon = images.icon.clone().unwrap_or_else(|| entry.icon.clone());
    writeln!(out, "    Icon Image:      {icon}")?;
    Ok(())
}

fn last_played(timestamp: u32) -> String {
    if timestamp == 0 {
        return "never".to_string();
    }
    let when = UNIX_EPOCH + Duration::from_secs(u64::from(timestamp));
    humantime::format_rfc3339_seconds(when).to_string()
}

/// `all` means every user directory, otherwise exactly the named one.
fn target_users(ctx: &Context<'_>, selector: &str) -> anyhow::Result<Vec<String>> {
    let users = ctx.locator.list_users()?;
    let selected: Vec<String> = if selector == ALL_USERS {
        users
    } else {
        users.into_iter().filter(|user| user == selector).collect()
    };
    if selected.is_empty() {
        return Err(Error::NoUsersFound.into());
    }
    Ok(selected)
}

fn build_shortcut(args: &AddArgs) -> Shortcut {
    let mut entry = Shortcut::new(args.name.as_str(), args.exe.as_str());
    if let Some(start_dir) = args.start_dir.as_ref() {
        entry.start_dir = start_dir.clone();
    }
    entry.launch_options = args.launch_options.clone();
    if let Some(icon) = args.icon.as_ref() {
        entry.icon = icon.clone();
    }
    entry.tags = args.tags.clone();
    entry.is_hidden = u32::from(args.hidden);
    entry
}

fn add(ctx: &Context<'_>, args: &AddArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let template = build_shortcut(args);
    let mut changes = Vec::new();
    for user in target_users(ctx, &args.user)? {
        let path = ctx.locator.shortcuts_path(&user)?;
        let mut shortcuts = if ctx.host.file_exists(&path) {
            shortcut::load(ctx.host, &path)?
        } else {
            Shortcuts::new()
        };
        match shortcuts.find_by_app_id_mut(template.app_id) {
            Some(existing) => {
                let extra = std::mem::take(&mut existing.extra);
                let last_play_time = existing.last_play_time;
                *existing = template.clone();
                existing.extra = extra;
                existing.last_play_time = last_play_time;
            }
            None => {
                shortcuts.add(template.clone());
            }
        }
        shortcut::save(ctx.host, &shortcuts, &path)
            .with_context(|| format!("failed to save shortcuts for user {user}"))?;
        info!(event = "shortcut.add", user = %user, app_id = template.app_id, "shortcut added");
        changes.push(UserChange {
            user,
            app_id: Some(template.app_id),
            count: 1,
        });
    }
    report_changes(ctx, out, "add", &args.name, changes)
}

fn remove(ctx: &Context<'_>, name: &str, selector: &str, out: &mut dyn Write) -> anyhow::Result<()> {
    let mut changes = Vec::new();
    for user in target_users(ctx, selector)? {
        if !ctx.locator.has_shortcuts(&user) {
            continue;
        }
        let path = ctx.locator.shortcuts_path(&user)?;
        let mut shortcuts = shortcut::load(ctx.host, &path)?;
        let removed = shortcuts.remove_by_name(name);
        if removed == 0 {
            continue;
        }
        shortcut::save(ctx.host, &shortcuts, &path)
            .with_context(|| format!("failed to save shortcuts for user {user}"))?;
        info!(event = "shortcut.remove", user = %user, removed, "shortcuts removed");
        changes.push(UserChange {
            user,
            app_id: None,
            count: removed,
        });
    }
    report_changes(ctx, out, "remove", name, changes)
}

fn report_changes(
    ctx: &Context<'_>,
    out: &mut dyn Write,
    action: &str,
    name: &str,
    users: Vec<UserChange>,
) -> anyhow::Result<()> {
    match ctx.output {
        OutputFormat::Json => write_json(
            out,
            &ChangeSummary {
                action,
                name,
                users,
            },
        ),
        OutputFormat::Term => {
            if users.is_empty() {
                writeln!(out, "No shortcut named {name} found")?;
            }
            for change in users {
                match change.app_id {
                    Some(app_id) => writeln!(out, "{action}: {name} ({app_id}) for user {}", change.user)?,
                    None => writeln!(out, "{action}: {} x {name} for user {}", change.count, change.user)?,
                }
            }
            Ok(())
        }
    }
}

fn apply_artwork(ctx: &Context<'_>, args: &ArtworkArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let mut config = args.explicit_config();
    if args.uses_griddb() {
        let fetched = griddb_config(ctx.config, args)?;
        config = config.or(fetched);
    }
    if config.is_empty() {
        anyhow::bail!("no artwork to apply: pass image flags or --game-id/--search");
    }
    let fetcher = HttpFetcher::new()?;
    let report = artwork::set_artwork(&ctx.locator, &fetcher, args.app_id, Some(&config))?;
    write_report(ctx, out, &report)
}

fn griddb_config(config: &AppConfig, args: &ArtworkArgs) -> anyhow::Result<ArtworkConfig> {
    let api_key = config
        .griddb_api_key(std::env::var(API_KEY_ENV).ok())
        .with_context(|| format!("SteamGridDB needs an API key: set {API_KEY_ENV} or [steamgriddb] api_key"))?;
    let client = GridDbClient::new(api_key, config.griddb_base_url())?;
    let game_id = match (args.game_id, args.search.as_deref()) {
        (Some(game_id), _) => game_id,
        (None, Some(name)) => {
            let game = client.search_game(name)?;
            info!(event = "griddb.match", game_id = game.id, name = %game.name, "matched game");
            game.id
        }
        (None, None) => anyhow::bail!("--game-id or --search is required for SteamGridDB"),
    };
    Ok(client.fetch_artwork_config(game_id))
}

fn write_report(ctx: &Context<'_>, out: &mut dyn Write, report: &ArtworkReport) -> anyhow::Result<()> {
    match ctx.output {
        OutputFormat::Json => write_json(out, report),
        OutputFormat::Term => {
            for applied in &report.applied {
                writeln!(
                    out,
                    "{:<15} {:<15} {}",
                    applied.slot.label(),
                    applied.strategy,
                    applied.detail
                )?;
            }
            for failed in &report.failed {
                writeln!(out, "{:<15} {:<15} {}", failed.slot.label(), "failed", failed.error)?;
            }
            Ok(())
        }
    }
}

fn users(ctx: &Context<'_>, out: &mut dyn Write) -> anyhow::Result<()> {
    let mut summaries = Vec::new();
    for user in ctx.locator.list_users()? {
        summaries.push(UserSummary {
            shortcuts_path: ctx.locator.shortcuts_path(&user)?,
            has_shortcuts: ctx.locator.has_shortcuts(&user),
            user,
        });
    }
    match ctx.output {
        OutputFormat::Json => write_json(out, &summaries),
        OutputFormat::Term => {
            for summary in &summaries {
                let marker = if summary.has_shortcuts { "" } else { " (no shortcuts)" };
                writeln!(out, "{}{marker}", summary.user)?;
            }
            Ok(())
        }
    }
}

fn write_json<T: Serialize + ?Sized>(out: &mut dyn Write, value: &T) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value).context("failed to encode output")?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use remote_exec::LocalHost;
    use std::path::Path;

    struct Install {
        dir: tempfile::TempDir,
        config: AppConfig,
    }

    impl Install {
        fn new(users: &[&str]) -> Self {
            let dir = tempfile::tempdir().expect("tempdir");
            for user in users {
                std::fs::create_dir_all(dir.path().join("userdata").join(user)).expect("mkdir");
            }
            Self {
                dir,
                config: AppConfig::default(),
            }
        }

        fn base(&self) -> String {
            self.dir.path().to_string_lossy().into_owned()
        }

        fn shortcuts_file(&self, user: &str) -> std::path::PathBuf {
            self.dir
                .path()
                .join("userdata")
                .join(user)
                .join("config")
                .join("shortcuts.vdf")
        }

        fn run(&self, command: Command, output: OutputFormat) -> anyhow::Result<String> {
            let ctx = Context {
                host: &LocalHost,
                locator: SteamLocator::new(&LocalHost).with_base_dir(Some(self.base())),
                config: &self.config,
                output,
            };
            let mut out = Vec::new();
            run(&command, &ctx, &mut out)?;
            Ok(String::from_utf8(out).expect("utf8 output"))
        }
    }

    fn add_command(name: &str, exe: &str) -> Command {
        Command::Add(AddArgs {
            name: name.to_string(),
            exe: exe.to_string(),
            start_dir: None,
            launch_options: String::new(),
            icon: None,
            tags: vec!["Indie".to_string()],
            hidden: false,
            user: ALL_USERS.to_string(),
        })
    }

    fn load_names(path: &Path) -> Vec<String> {
        let bytes = std::fs::read(path).expect("read shortcuts");
        shortcut::decode_shortcuts(&bytes, "test")
            .expect("decode")
            .iter()
            .map(|(_, entry)| entry.app_name.clone())
            .collect()
    }

    #[test]
    fn add_creates_file_for_every_user() {
        let install = Install::new(&["100", "200"]);
        install
            .run(add_command("Celeste", "/games/celeste"), OutputFormat::Term)
            .expect("add");
        assert_eq!(load_names(&install.shortcuts_file("100")), vec!["Celeste"]);
        assert_eq!(load_names(&install.shortcuts_file("200")), vec!["Celeste"]);
    }

    #[test]
    fn add_for_one_user_leaves_others_alone() {
        let install = Install::new(&["100", "200"]);
        let Command::Add(mut args) = add_command("Celeste", "/games/celeste") else {
            panic!("expected add");
        };
        args.user = "200".to_string();
        let output = install
            .run(Command::Add(args), OutputFormat::Json)
            .expect("add");
        let summary: serde_json::Value = serde_json::from_str(&output).expect("json");
        assert_eq!(summary["action"], "add");
        assert_eq!(summary["users"].as_array().expect("users").len(), 1);
        assert_eq!(summary["users"][0]["user"], "200");
        assert!(!install.shortcuts_file("100").exists());
        assert_eq!(load_names(&install.shortcuts_file("200")), vec!["Celeste"]);
    }

    #[test]
    fn adding_same_app_twice_updates_in_place() {
        let install = Install::new(&["100"]);
        install
            .run(add_command("Celeste", "/games/celeste"), OutputFormat::Term)
            .expect("add");
        install
            .run(add_command("Celeste", "/games/celeste"), OutputFormat::Term)
            .expect("add again");
        assert_eq!(load_names(&install.shortcuts_file("100")), vec!["Celeste"]);
    }

    #[test]
    fn remove_rewrites_remaining_shortcuts() {
        let install = Install::new(&["100"]);
        for (name, exe) in [("A", "/bin/a"), ("B", "/bin/b"), ("C", "/bin/c")] {
            install
                .run(add_command(name, exe), OutputFormat::Term)
                .expect("add");
        }
        let output = install
            .run(
                Command::Remove {
                    name: "B".to_string(),
                    user: ALL_USERS.to_string(),
                },
                OutputFormat::Json,
            )
            .expect("remove");
        let summary: serde_json::Value = serde_json::from_str(&output).expect("json");
        assert_eq!(summary["users"][0]["count"], 1);
        assert_eq!(load_names(&install.shortcuts_file("100")), vec!["A", "C"]);
    }

    #[test]
    fn remove_unknown_name_leaves_file_alone() {
        let install = Install::new(&["100"]);
        install
            .run(add_command("A", "/bin/a"), OutputFormat::Term)
            .expect("add");
        let before = std::fs::read(install.shortcuts_file("100")).expect("read");
        let output = install
            .run(
                Command::Remove {
                    name: "Z".to_string(),
                    user: ALL_USERS.to_string(),
                },
                OutputFormat::Term,
            )
            .expect("remove");
        assert!(output.contains("No shortcut named Z"));
        assert_eq!(std::fs::read(install.shortcuts_file("100")).expect("read"), before);
    }

    #[test]
    fn list_json_includes_images() {
        let install = Install::new(&["100", "200"]);
        install
            .run(add_command("Celeste", "/games/celeste"), OutputFormat::Term)
            .expect("add");
        let app_id = Shortcut::new("Celeste", "/games/celeste").app_id;
        let grid = install.dir.path().join("userdata/100/config/grid");
        std::fs::create_dir_all(&grid).expect("mkdir");
        std::fs::write(grid.join(format!("{app_id}_hero.png")), b"h").expect("write");

        let output = install
            .run(Command::List { app_id: None }, OutputFormat::Json)
            .expect("list");
        let listed: serde_json::Value = serde_json::from_str(&output).expect("json");
        let entry = &listed["100"]["0"];
        assert_eq!(entry["AppName"], "Celeste");
        assert_eq!(entry["tags"]["0"], "Indie");
        assert!(entry["images"]["hero"]
            .as_str()
            .expect("hero path")
            .ends_with("_hero.png"));
        assert!(entry["images"]["logo"].is_null());
    }

    #[test]
    fn list_filters_by_app_id() {
        let install = Install::new(&["100"]);
        install
            .run(add_command("A", "/bin/a"), OutputFormat::Term)
            .expect("add");
        let output = install
            .run(Command::List { app_id: Some(1) }, OutputFormat::Term)
            .expect("list");
        assert!(output.is_empty());
        let output = install
            .run(Command::List { app_id: None }, OutputFormat::Term)
            .expect("list");
        assert!(output.contains("User: 100"));
        assert!(output.contains("Last Played:     never"));
    }

    #[test]
    fn unknown_user_is_rejected() {
        let install = Install::new(&["100"]);
        let err = install
            .run(
                Command::Remove {
                    name: "A".to_string(),
                    user: "999".to_string(),
                },
                OutputFormat::Term,
            )
            .expect_err("unknown user");
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::NoUsersFound)));
    }

    #[test]
    fn users_lists_directories() {
        let install = Install::new(&["300", "100"]);
        let output = install.run(Command::Users, OutputFormat::Term).expect("users");
        assert_eq!(output, "100 (no shortcuts)\n300 (no shortcuts)\n");
    }

    #[test]
    fn last_played_formats_timestamps() {
        assert_eq!(last_played(0), "never");
        assert_eq!(last_played(1_700_000_000), "2023-11-14T22:13:20Z");
    }
}

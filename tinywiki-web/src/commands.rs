//! One-shot CLI commands: project setup and user management.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use tinywiki_core::{is_valid_user_name, Config, UserManager, Wiki, ADMIN_ROLE};

use crate::cli::UserCommand;

const CONFIG_FILE: &str = "tinywiki.yml";
const INIT_USER: &str = "tinywiki";

/// Initialize a new wiki directory
pub fn init_project(path: Option<&Path>) -> Result<()> {
    let root = path.unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(root).with_context(|| format!("Failed to create {:?}", root))?;

    let config_path = root.join(CONFIG_FILE);
    write_config(&config_path)?;

    let config = Config::from_file(&config_path)?;
    scaffold_content(&config)?;

    println!("✓ tinywiki initialized in {:?}", root);
    println!("  - Add an account: tinywiki user add <name> --password <password> --admin");
    println!("  - Start the server: tinywiki serve");
    Ok(())
}

fn write_config(config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("{} already exists at {:?}", CONFIG_FILE, config_path);
        return Ok(());
    }

    fs::write(config_path, Config::default().to_yaml()?)
        .with_context(|| format!("Failed to write {:?}", config_path))?;
    println!("Created {:?}", config_path);
    Ok(())
}

fn scaffold_content(config: &Config) -> Result<()> {
    let wiki = Wiki::new(config.content_dir());
    fs::create_dir_all(wiki.root())
        .with_context(|| format!("Failed to create {:?}", wiki.root()))?;

    // Starter page
    if let Some(mut page) = wiki.get_bare(&config.site.home)? {
        page.set_title("Welcome");
        page.set_tags("tinywiki");
        page.body = sample_page();
        wiki.save(&mut page, INIT_USER)?;
        println!("Created {:?}", page.path);
    }
    Ok(())
}

fn sample_page() -> String {
    r#"# Welcome

This is the start page of your new wiki. Log in and press **Edit** to change it.

Link to other pages with `[[Page Name]]`, for example [[Getting Started]].
Missing pages are created the first time someone saves them.

# Formatting

Pages are markdown. Each top-level heading gets an entry in the contents box.
"#
    .to_string()
}

/// Run a `tinywiki user` subcommand against the configured users file.
pub fn run_user_command(config_path: &Path, command: UserCommand) -> Result<()> {
    let config = Config::from_file_or_default(config_path)?;
    let users = UserManager::new(config.users_path(), config.auth.default_authentication_method);

    match command {
        UserCommand::Add {
            name,
            password,
            admin,
            inactive,
            method,
        } => {
            if !is_valid_user_name(&name) {
                bail!("user names must be non-empty, without '/' or control characters");
            }
            let roles = if admin {
                vec![ADMIN_ROLE.to_string()]
            } else {
                Vec::new()
            };
            users.add_user(name.trim(), &password, !inactive, roles, method)?;
            println!("Added user {} to {:?}", name.trim(), users.path());
        }
        UserCommand::Passwd { name, password } => {
            let mut user = users
                .get_user(&name)?
                .with_context(|| format!("no such user: {}", name))?;
            user.set_password(&password);
            users.update(&user)?;
            println!("Changed password for {}", name);
        }
        UserCommand::Delete { name } => {
            if !users.delete_user(&name)? {
                bail!("no such user: {}", name);
            }
            println!("Deleted user {}", name);
        }
        UserCommand::List => {
            for user in users.list()? {
                let status = if user.active { "active" } else { "inactive" };
                println!("{}\t{}\t{}", user.name, status, user.roles.join(","));
            }
        }
    }
    Ok(())
}

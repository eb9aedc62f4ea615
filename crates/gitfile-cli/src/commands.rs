use std::io::Write;

use anyhow::Context;
use colored::Colorize;
use gitfile_sdk::{open_dir, FileService, ProviderConfig, Repository};
use gitfile_sync::PushStatus;
use gitfile_types::RepoPath;

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    match cli.command {
        Command::Init(args) => cmd_init(args, &config),
        Command::Write(args) => cmd_write(args, &config).await,
        Command::Read(args) => cmd_read(args, &config).await,
        Command::Delete(args) => cmd_delete(args, &config).await,
        Command::Log(args) => cmd_log(args, &config).await,
        Command::Push => cmd_push(&config).await,
    }
}

/// Config file (if any), then command-line overrides, then the environment
/// for a still-missing repository URL.
fn load_config(cli: &Cli) -> anyhow::Result<ProviderConfig> {
    let mut config = match &cli.config {
        Some(path) => ProviderConfig::load(path)?,
        None => ProviderConfig::default(),
    };
    if let Some(url) = &cli.repository_url {
        config.repository_url = Some(url.clone());
    }
    if let Some(branch) = &cli.branch {
        config.branch = branch.clone();
    }
    if let Some(dir) = &cli.work_dir {
        config.work_dir = Some(dir.clone());
    }
    if let Some(name) = &cli.author_name {
        config.author_name = name.clone();
    }
    if let Some(email) = &cli.author_email {
        config.author_email = email.clone();
    }
    Ok(config.with_env())
}

async fn connect(config: &ProviderConfig) -> anyhow::Result<FileService> {
    FileService::from_config(config)
        .await
        .context("failed to open remote repository")
}

fn parse_path(raw: &str) -> anyhow::Result<RepoPath> {
    RepoPath::parse(raw).with_context(|| format!("invalid path {raw:?}"))
}

fn cmd_init(args: InitArgs, config: &ProviderConfig) -> anyhow::Result<()> {
    Repository::init(open_dir(&args.path)?, &config.branch, config.identity())?;
    println!(
        "{} Initialized empty repository in {}",
        "✓".green().bold(),
        args.path.display().to_string().bold()
    );
    println!("  Branch: {}", config.branch.yellow());
    Ok(())
}

async fn cmd_write(args: WriteArgs, config: &ProviderConfig) -> anyhow::Result<()> {
    let path = parse_path(&args.path)?;
    let contents = match (args.contents, args.from_file) {
        (Some(contents), _) => contents.into_bytes(),
        (None, Some(file)) => std::fs::read(&file)
            .with_context(|| format!("failed to read {}", file.display()))?,
        (None, None) => anyhow::bail!("either --contents or --from-file is required"),
    };

    let service = connect(config).await?;
    let result = service.write_file(&path, &contents).await;
    service.shutdown().await;
    let change = result?;

    println!("{} Wrote {}", "✓".green().bold(), path.to_string().bold());
    if let Some(blob) = change.blob {
        println!("  Blob:   {}", blob.to_hex().cyan());
    }
    println!("  Commit: {}", change.commit.short_hex().yellow());
    Ok(())
}

async fn cmd_read(args: PathArgs, config: &ProviderConfig) -> anyhow::Result<()> {
    let path = parse_path(&args.path)?;
    let service = connect(config).await?;
    let file = service.read_file(&path)?;
    std::io::stdout().write_all(&file.data)?;
    Ok(())
}

async fn cmd_delete(args: PathArgs, config: &ProviderConfig) -> anyhow::Result<()> {
    let path = parse_path(&args.path)?;
    let service = connect(config).await?;
    let result = service.delete_file(&path).await;
    service.shutdown().await;
    let change = result?;

    println!("{} Deleted {}", "✓".green().bold(), path.to_string().bold());
    println!("  Commit: {}", change.commit.short_hex().yellow());
    Ok(())
}

async fn cmd_log(args: LogArgs, config: &ProviderConfig) -> anyhow::Result<()> {
    let service = connect(config).await?;
    let entries = service.repository().log(args.limit)?;
    if entries.is_empty() {
        println!("Branch {} has no commits.", config.branch.yellow());
        return Ok(());
    }
    for entry in entries {
        if args.oneline {
            println!("{} {}", entry.id.short_hex().yellow(), entry.commit.summary());
        } else {
            println!("{} {}", "commit".yellow(), entry.id.to_hex().yellow());
            println!("Author: {}", entry.commit.author);
            println!("\n    {}\n", entry.commit.message);
        }
    }
    Ok(())
}

async fn cmd_push(config: &ProviderConfig) -> anyhow::Result<()> {
    let service = connect(config).await?;
    let result = service.push().await;
    service.shutdown().await;
    match result? {
        PushStatus::UpToDate => println!("{}", "Everything up to date".green()),
        PushStatus::Updated { old, new } => {
            let old = old.map_or_else(|| "(new branch)".to_string(), |id| id.short_hex());
            println!(
                "{} {} {} -> {}",
                "✓".green().bold(),
                config.branch.yellow(),
                old.dimmed(),
                new.short_hex().bold()
            );
        }
    }
    Ok(())
}

//! IonFS CLI - Command line interface for the IonFS virtual filesystem.
//!
//! Remote paths are prefixed with `ion://`, optionally followed by a
//! repository name; anything else is a local path.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use uuid::Uuid;

use ionfs_common::{Error, ObjectDescriptor, StatusMap, Tag, SCHEME};
use ionfs_crypto::CryptoKey;
use ionfs_fs::{IonFs, PutOptions, Settings};

#[derive(Parser)]
#[command(name = "ionfs")]
#[command(about = "IonFS - Chunked, encrypted filesystem over a particle store")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Settings file (default: $IONFS_CONFIG or ~/.ionfs/appsettings.json).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Client-side encryption key arguments.
#[derive(clap::Args, Default)]
struct KeyArgs {
    /// Path to a hex-encoded symmetric key.
    #[arg(short, long, conflicts_with = "passphrase")]
    key: Option<PathBuf>,

    /// Passphrase to derive the key from.
    #[arg(long)]
    passphrase: Option<String>,
}

impl KeyArgs {
    fn load(&self) -> Result<Option<CryptoKey>> {
        match (&self.key, &self.passphrase) {
            (Some(path), _) => Ok(Some(
                CryptoKey::from_key_file(path)
                    .with_context(|| format!("Failed to read key file {}", path.display()))?,
            )),
            (None, Some(passphrase)) => Ok(Some(
                CryptoKey::from_passphrase(passphrase).context("Invalid passphrase")?,
            )),
            (None, None) => Ok(None),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show the contents of a remote folder.
    #[command(visible_alias = "ls")]
    List {
        /// Remote folder (default: root of the default repository).
        folder: Option<String>,

        #[arg(short, long)]
        recursive: bool,
    },

    /// Download a file.
    Get {
        /// Remote file.
        from: String,

        /// Local target (default: the remote name in the current directory).
        to: Option<String>,

        /// Local name to write.
        #[arg(short, long)]
        name: Option<String>,

        #[command(flatten)]
        keys: KeyArgs,
    },

    /// Upload a file.
    Put {
        /// Local file to upload.
        localfile: String,

        /// Remote destination folder.
        folder: String,

        /// Store under a different name.
        #[arg(short, long)]
        name: Option<String>,

        /// Particle store classification.
        #[arg(short, long)]
        classification: Option<String>,

        #[command(flatten)]
        keys: KeyArgs,

        /// Particle size in bytes.
        #[arg(long)]
        blocksize: Option<usize>,

        /// Store as one manifest, split by the particle store.
        #[arg(short, long)]
        manifest: bool,

        /// Tags in the form tag=value[:tag=value]...
        #[arg(long)]
        tags: Option<String>,
    },

    /// Delete a file, or a folder with --recursive.
    Del {
        path: String,

        #[arg(short, long)]
        recursive: bool,
    },

    /// Move a file between remote folders, repositories, or to and from local.
    #[command(visible_alias = "mv")]
    Move {
        from: String,
        to: String,

        #[command(flatten)]
        keys: KeyArgs,
    },

    /// Copy a file.
    #[command(visible_alias = "cp")]
    Copy {
        from: String,
        to: String,

        #[command(flatten)]
        keys: KeyArgs,
    },

    /// Create a remote folder.
    Mkdir { folder: String },

    /// Remove a remote folder.
    Rmdir {
        folder: String,

        #[arg(short, long)]
        recursive: bool,
    },

    /// Show a file's metadata record.
    Meta { file: String },

    /// Import a metadata record from a JSON file.
    AddMeta {
        /// Local metadata JSON file.
        metadata: PathBuf,

        /// Remote destination folder or file.
        folder: String,
    },

    /// Remove a file's metadata record, leaving its particles.
    RmMeta { file: String },

    /// Delete one particle by identifier.
    RmId { guid: Uuid, repo: String },

    /// Download one particle by identifier.
    GetId {
        guid: Uuid,
        repo: String,

        /// Directory to write the particle to.
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },

    /// List the particle store's classification policies.
    Policy,

    /// List configured repositories.
    Repos,

    /// Derive a key from a passphrase and print it as hex.
    Keygen { passphrase: String },

    /// Find files by tag.
    Search {
        /// Remote folder to search.
        folder: String,

        /// Tag name pattern.
        #[arg(long)]
        tag: Option<String>,

        /// Tag value pattern.
        #[arg(long)]
        value: Option<String>,

        #[arg(short, long)]
        recursive: bool,
    },

    /// Manage text secrets.
    #[command(subcommand)]
    Secrets(SecretCommands),
}

#[derive(Subcommand)]
enum SecretCommands {
    /// Store a text value.
    Put {
        data: String,

        /// Remote destination folder.
        vault: String,

        name: String,

        #[arg(short, long)]
        classification: Option<String>,

        #[command(flatten)]
        keys: KeyArgs,
    },

    /// Print a text value.
    Get {
        from: String,

        #[command(flatten)]
        keys: KeyArgs,
    },

    /// Delete a text value.
    Del { path: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Keygen { passphrase } = &cli.command {
        init_logging(cli.verbose)?;
        return cmd_keygen(passphrase);
    }

    let path = Settings::locate(cli.config.as_deref()).context("Failed to locate settings")?;
    let settings = Settings::load(&path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;

    init_logging(cli.verbose || settings.verbose)?;

    let fs = IonFs::from_settings(&settings).context("Failed to initialize IonFS")?;

    let result = run(&fs, cli.command).await;
    if let Err(e) = &result {
        if let Some(Error::PartialFailure(statuses)) = e.downcast_ref::<Error>() {
            print_statuses(statuses);
        }
    }
    result
}

fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

async fn run(fs: &IonFs, command: Commands) -> Result<()> {
    match command {
        Commands::List { folder, recursive } => {
            cmd_list(fs, folder.as_deref().unwrap_or(SCHEME), recursive).await
        }

        Commands::Get {
            from,
            to,
            name,
            keys,
        } => cmd_get(fs, &from, to.as_deref(), name.as_deref(), &keys).await,

        Commands::Put {
            localfile,
            folder,
            name,
            classification,
            keys,
            blocksize,
            manifest,
            tags,
        } => {
            let options = PutOptions {
                name,
                classification,
                key: keys.load()?,
                max_size: blocksize,
                manifest: manifest.then_some(true),
                tags: match tags {
                    Some(raw) => Tag::parse_list(&raw).context("Invalid --tags")?,
                    None => Vec::new(),
                },
            };
            cmd_put(fs, &localfile, &folder, &options).await
        }

        Commands::Del { path, recursive } => cmd_del(fs, &path, recursive).await,

        Commands::Move { from, to, keys } => cmd_move(fs, &from, &to, &keys, true).await,

        Commands::Copy { from, to, keys } => cmd_move(fs, &from, &to, &keys, false).await,

        Commands::Mkdir { folder } => cmd_mkdir(fs, &folder).await,

        Commands::Rmdir { folder, recursive } => cmd_rmdir(fs, &folder, recursive).await,

        Commands::Meta { file } => cmd_meta(fs, &file).await,

        Commands::AddMeta { metadata, folder } => cmd_add_meta(fs, &metadata, &folder).await,

        Commands::RmMeta { file } => cmd_rm_meta(fs, &file).await,

        Commands::RmId { guid, repo } => {
            fs.remove_by_id(repository_name(&repo), guid)
                .await
                .context("Failed to remove particle")?;
            println!("Removed {}", guid);
            Ok(())
        }

        Commands::GetId { guid, repo, dir } => {
            let statuses = fs
                .get_chunk(repository_name(&repo), guid, &dir)
                .await
                .context("Failed to fetch particle")?;
            if statuses.all_ok() {
                println!("Wrote {}", dir.join(guid.to_string()).display());
            } else {
                println!("Error receiving data from the particle store!");
                print_statuses(&statuses);
            }
            Ok(())
        }

        Commands::Policy => cmd_policy(fs).await,

        Commands::Repos => {
            cmd_repos(fs);
            Ok(())
        }

        Commands::Keygen { passphrase } => cmd_keygen(&passphrase),

        Commands::Search {
            folder,
            tag,
            value,
            recursive,
        } => cmd_search(fs, &folder, tag.as_deref(), value.as_deref(), recursive).await,

        Commands::Secrets(secret) => cmd_secrets(fs, secret).await,
    }
}

/// Accept `repo`, `ion://repo` or `ion://repo/`.
fn repository_name(raw: &str) -> &str {
    raw.strip_prefix(SCHEME)
        .unwrap_or(raw)
        .trim_end_matches('/')
}

fn print_statuses(statuses: &StatusMap) {
    for (id, status) in statuses.iter() {
        println!("  {} {}", id, status);
    }
}

fn print_listing(items: &[ObjectDescriptor]) {
    let width = items.iter().map(|i| i.full_name().len()).max().unwrap_or(0) + 2;
    let (folders, files): (Vec<_>, Vec<_>) = items.iter().partition(|i| i.is_folder);
    for item in folders.into_iter().chain(files) {
        println!(
            "{} {:width$}",
            if item.is_folder { "d" } else { " " },
            item.full_name(),
            width = width
        );
    }
}

/// List a remote folder.
async fn cmd_list(fs: &IonFs, folder: &str, recursive: bool) -> Result<()> {
    let folder = fs.resolver().resolve_folder(folder, true)?;
    let items = fs
        .list(&folder, recursive)
        .await
        .context("Failed to list folder")?;

    let (folder, repo) = fs.registry().bind(&folder);
    if repo.is_secret() {
        println!("Secrets repository {}\n", folder);
    } else {
        println!("Directory of {}\n", folder);
    }

    if items.is_empty() {
        println!(" Remote directory is empty");
    } else {
        print_listing(&items);
    }

    Ok(())
}

/// Download a remote file.
async fn cmd_get(
    fs: &IonFs,
    from: &str,
    to: Option<&str>,
    name: Option<&str>,
    keys: &KeyArgs,
) -> Result<()> {
    let resolver = fs.resolver();
    let source = resolver.resolve_file(from)?;

    let destination = match (to, name) {
        (Some(to), Some(name)) => format!("{}/{}", to.trim_end_matches('/'), name),
        (Some(to), None) => to.to_string(),
        (None, Some(name)) => name.to_string(),
        (None, None) => source.name.clone(),
    };
    let destination = resolver.resolve_local(&destination);

    info!("Downloading {} to {}", source, destination);
    let transfer = fs
        .get(&source, &destination, keys.load()?.as_ref())
        .await
        .context("Failed to download file")?;

    println!(
        "Downloaded {} ({} bytes, {} particles)",
        source, transfer.metadata.size, transfer.metadata.chunk_count
    );
    Ok(())
}

/// Upload a local file.
async fn cmd_put(fs: &IonFs, localfile: &str, folder: &str, options: &PutOptions) -> Result<()> {
    let resolver = fs.resolver();
    let source = resolver.resolve_local(localfile);
    let target = resolver.resolve_folder(folder, true)?;

    info!("Uploading {} to {}", source, target);
    let transfer = fs
        .put(&source, &target, options)
        .await
        .context("Failed to upload file")?;

    println!(
        "Uploaded {} ({} bytes, {} particles{})",
        transfer.metadata.name,
        transfer.metadata.size,
        transfer.metadata.chunk_count,
        if transfer.metadata.is_encrypted() { ", encrypted" } else { "" }
    );
    Ok(())
}

/// Delete a remote file or folder.
async fn cmd_del(fs: &IonFs, path: &str, recursive: bool) -> Result<()> {
    let target = fs.resolver().resolve_any(path)?;
    if !target.is_remote {
        bail!("Please use OS tools when working with the local filesystem");
    }

    if target.is_folder {
        return cmd_rmdir(fs, path, recursive).await;
    }

    let statuses = fs.delete(&target).await.context("Failed to delete file")?;
    println!("Deleted {} ({} particles)", target, statuses.len());
    Ok(())
}

/// Move or copy a file.
async fn cmd_move(fs: &IonFs, from: &str, to: &str, keys: &KeyArgs, remove: bool) -> Result<()> {
    let resolver = fs.resolver();
    let source = resolver.resolve_any(from)?;
    let target = resolver.resolve_any(to)?;
    let options = PutOptions {
        key: keys.load()?,
        ..Default::default()
    };

    if remove {
        fs.move_object(&source, &target, &options)
            .await
            .context("Failed to move")?;
        println!("Moved {} to {}", source, target);
    } else {
        fs.copy(&source, &target, &options)
            .await
            .context("Failed to copy")?;
        println!("Copied {} to {}", source, target);
    }
    Ok(())
}

/// Create a remote folder.
async fn cmd_mkdir(fs: &IonFs, folder: &str) -> Result<()> {
    let folder = fs.resolver().resolve_folder(folder, true)?;
    fs.make_dir(&folder)
        .await
        .context("Failed to create folder")?;
    println!("Created {}", folder);
    Ok(())
}

/// Remove a remote folder.
async fn cmd_rmdir(fs: &IonFs, folder: &str, recursive: bool) -> Result<()> {
    let folder = fs.resolver().resolve_folder(folder, true)?;
    fs.delete_dir(&folder, recursive)
        .await
        .context("Failed to remove folder")?;
    println!("Removed {}", folder);
    Ok(())
}

/// Show a file's metadata.
async fn cmd_meta(fs: &IonFs, file: &str) -> Result<()> {
    let file = fs.resolver().resolve_file(file)?;
    let metadata = fs
        .metadata(&file)
        .await
        .context("Failed to read metadata")?;

    println!("Metadata for {}\n", file);
    println!("{}", metadata.to_json()?);
    Ok(())
}

/// Import a metadata record.
async fn cmd_add_meta(fs: &IonFs, metadata: &Path, folder: &str) -> Result<()> {
    let target = fs.resolver().resolve_any(folder)?;
    if !target.is_remote {
        bail!("Metadata can only be added to a remote path");
    }
    let added = fs
        .add_metadata(metadata, &target)
        .await
        .context("Failed to add metadata")?;
    println!("Added metadata for {}", added.name);
    Ok(())
}

/// Drop a file's metadata record.
async fn cmd_rm_meta(fs: &IonFs, file: &str) -> Result<()> {
    let file = fs.resolver().resolve_file(file)?;
    fs.remove_metadata(&file)
        .await
        .context("Failed to remove metadata")?;
    println!("Removed metadata for {}", file);
    Ok(())
}

/// List classification policies.
async fn cmd_policy(fs: &IonFs) -> Result<()> {
    let classifications = fs
        .classifications()
        .await
        .context("Failed to fetch classifications")?;

    println!("Classifications:");
    for (code, name) in classifications {
        println!("  {:>3}  {}", code, name);
    }
    Ok(())
}

/// List configured repositories.
fn cmd_repos(fs: &IonFs) {
    println!("Repositories:");
    for repo in fs.repositories() {
        println!(
            "  {} {:<16} {:<10} {:<8} {}",
            if repo.is_default() { "*" } else { " " },
            repo.name(),
            repo.class(),
            repo.usage().to_string(),
            repo.data_store()
        );
    }
}

/// Print a passphrase-derived key.
fn cmd_keygen(passphrase: &str) -> Result<()> {
    let key = CryptoKey::from_passphrase(passphrase).context("Invalid passphrase")?;
    println!("{}", key.to_hex());
    Ok(())
}

/// Search by tag.
async fn cmd_search(
    fs: &IonFs,
    folder: &str,
    tag: Option<&str>,
    value: Option<&str>,
    recursive: bool,
) -> Result<()> {
    let folder = fs.resolver().resolve_folder(folder, true)?;
    let results = fs
        .search(&folder, tag, value, recursive)
        .await
        .context("Search failed")?;

    if results.is_empty() {
        println!("No matches in {}", folder);
        return Ok(());
    }

    let width = results.iter().map(|r| r.name.len()).max().unwrap_or(0) + 2;
    for result in results {
        println!(
            "{:width$} {}={}",
            result.name,
            result.tag,
            result.value,
            width = width
        );
    }
    Ok(())
}

async fn cmd_secrets(fs: &IonFs, command: SecretCommands) -> Result<()> {
    let resolver = fs.resolver();
    match command {
        SecretCommands::Put {
            data,
            vault,
            name,
            classification,
            keys,
        } => {
            let target = resolver.resolve_folder(&vault, true)?;
            let options = PutOptions {
                name: Some(name),
                classification,
                key: keys.load()?,
                ..Default::default()
            };
            let transfer = fs
                .put_text(&data, &target, &options)
                .await
                .context("Failed to store secret")?;
            println!("Stored {}", target.child_file(transfer.metadata.name));
        }
        SecretCommands::Get { from, keys } => {
            let source = resolver.resolve_file(&from)?;
            let text = fs
                .get_text(&source, keys.load()?.as_ref())
                .await
                .context("Failed to retrieve secret")?;
            println!("{}", text);
        }
        SecretCommands::Del { path } => {
            let target = resolver.resolve_file(&path)?;
            fs.delete(&target)
                .await
                .context("Failed to delete secret")?;
            println!("Deleted {}", target);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_put() {
        let cli = Cli::try_parse_from([
            "ionfs",
            "put",
            "a.bin",
            "ion://repo/folder/",
            "--passphrase",
            "x",
            "--blocksize",
            "1024",
            "--tags",
            "project=apollo",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Put {
                localfile,
                folder,
                keys,
                blocksize,
                manifest,
                tags,
                ..
            } => {
                assert_eq!(localfile, "a.bin");
                assert_eq!(folder, "ion://repo/folder/");
                assert_eq!(keys.passphrase.as_deref(), Some("x"));
                assert_eq!(blocksize, Some(1024));
                assert!(!manifest);
                assert_eq!(tags.as_deref(), Some("project=apollo"));
            }
            _ => panic!("expected put"),
        }
    }

    #[test]
    fn test_key_and_passphrase_conflict() {
        let result = Cli::try_parse_from([
            "ionfs", "get", "ion://a.bin", "--key", "k.hex", "--passphrase", "x",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_aliases_and_secrets() {
        assert!(matches!(
            Cli::try_parse_from(["ionfs", "ls", "ion://repo/", "-r"]).unwrap().command,
            Commands::List { recursive: true, .. }
        ));
        assert!(matches!(
            Cli::try_parse_from(["ionfs", "secrets", "put", "s3cr3t", "ion://vault/", "db"])
                .unwrap()
                .command,
            Commands::Secrets(SecretCommands::Put { .. })
        ));
    }

    #[test]
    fn test_key_args_load() {
        let keys = KeyArgs {
            key: None,
            passphrase: Some("x".to_string()),
        };
        let key = keys.load().unwrap().unwrap();
        assert_eq!(key.to_hex(), CryptoKey::from_passphrase("x").unwrap().to_hex());
        assert!(KeyArgs::default().load().unwrap().is_none());
    }

    #[test]
    fn test_repository_name() {
        assert_eq!(repository_name("repo"), "repo");
        assert_eq!(repository_name("ion://repo/"), "repo");
    }
}

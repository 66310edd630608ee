use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use livemark_config::{Config, PreviewSettings};
use livemark_engine::block_id::{ensure_block_id_in_file, resolve_block_content};
use livemark_engine::store::{DocumentStore, FsDocumentStore};
use livemark_engine::suggest::EditorSession;
use livemark_engine::{BlockLabelCache, NoteRef, Selection, TriggerState, detect};

#[derive(Parser)]
#[command(name = "livemark", about = "Inspect live-preview decorations for markdown notes")]
struct Cli {
    /// Notes folder; defaults to `notes_path` from the config file
    #[arg(long, global = true)]
    notes: Option<PathBuf>,

    /// Show raw source: nothing hidden or replaced
    #[arg(long, global = true)]
    source: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write `notes_path` to the config file, keeping any preview settings there
    Init { notes_path: PathBuf },
    #[command(flatten)]
    Note(NoteCommand),
}

/// Subcommands that work on the notes folder.
#[derive(Subcommand)]
enum NoteCommand {
    /// Print the decorations for a note with the caret at `caret`
    Decorate {
        page: String,
        #[arg(long)]
        caret: Option<usize>,
    },
    /// Print the suggestion trigger active at `caret`
    Trigger { page: String, caret: usize },
    /// Give a block an id (if it has none) and print the link to it
    BlockId {
        page: String,
        block: String,
        /// Zero-based line the block is expected on
        #[arg(long)]
        line: Option<usize>,
    },
    /// Print the current text of a referenced block
    Resolve { page: String, id: String },
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Cli::parse();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")?;
    runtime.block_on(run(cli))
}

fn load_config(notes: Option<PathBuf>) -> Result<Config> {
    let loaded = Config::load().context("Failed to load config file")?;
    match (notes, loaded) {
        (Some(notes_path), Some(mut config)) => {
            config.notes_path = notes_path;
            Ok(config)
        }
        (Some(notes_path), None) => Ok(Config::new(notes_path)),
        (None, Some(config)) => Ok(config),
        (None, None) => bail!(
            "No notes path provided and no config file found; pass --notes or create {}",
            Config::config_path().display()
        ),
    }
}

/// Points the config at `notes_path`, creating the file if needed.
fn init_config(notes_path: PathBuf, config_path: &Path) -> Result<Config> {
    FsDocumentStore::new(&notes_path)
        .with_context(|| format!("Invalid notes folder {}", notes_path.display()))?;
    let config = match Config::load_from_path(config_path)? {
        Some(existing) => Config {
            notes_path,
            ..existing
        },
        None => Config::new(notes_path),
    };
    config.save_to_path(config_path)?;
    Ok(config)
}

async fn run(cli: Cli) -> Result<()> {
    let command = match cli.command {
        Command::Init { notes_path } => {
            let config_path = Config::config_path();
            let config = init_config(notes_path, &config_path)?;
            log::info!(
                "saved notes folder {} to {}",
                config.notes_path.display(),
                config_path.display()
            );
            return Ok(());
        }
        Command::Note(command) => command,
    };

    let config = load_config(cli.notes)?;
    let settings = if cli.source {
        PreviewSettings {
            live_preview: false,
            ..config.preview.clone()
        }
    } else {
        config.preview.clone()
    };

    let store = Rc::new(
        FsDocumentStore::new(&config.notes_path)
            .with_context(|| format!("Invalid notes folder {}", config.notes_path.display()))?,
    );
    log::info!("using notes folder {}", config.notes_path.display());

    match command {
        NoteCommand::Decorate { page, caret } => {
            let mut session = EditorSession::open(store.clone(), &page, settings).await?;
            let text = session.text();
            let caret = caret.unwrap_or(text.len()).min(text.len());
            session.set_selection(Selection::caret(caret), &mut Vec::<TriggerState>::new());

            let mut labels = BlockLabelCache::new();
            labels.refresh(&*store, &text, session.page()).await;
            print!("{}", session.decorations(&labels).describe(&text));
        }
        NoteCommand::Trigger { page, caret } => {
            let text = store.read(NoteRef::from_page(&page).path()).await?;
            let state = detect(&text, &Selection::caret(caret), true);
            match state.trigger {
                Some(trigger) => println!(
                    "{trigger:?} {}..{} query {:?}",
                    state.range.start, state.range.end, state.query
                ),
                None => println!("no trigger"),
            }
        }
        NoteCommand::BlockId { page, block, line } => {
            let note = NoteRef::from_page(&page);
            let id = ensure_block_id_in_file(&*store, note.path(), &block, line, &settings)
                .await?;
            println!("[[{}]]", id.link_target(note.page()));
        }
        NoteCommand::Resolve { page, id } => {
            match resolve_block_content(&*store, &page, &id).await {
                Some(content) => println!("{content}"),
                None => bail!("Block {page}#^{id} not found"),
            }
        }
    }
    Ok(())
}

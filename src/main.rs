use std::{
    fs,
    path::{Path, PathBuf},
    process,
};

use app::{App, Flags};
use clap::{Parser, Subcommand};
use env_logger::Env;
use iced::{Application, Settings};
use log::{error, info, warn};
use mtg_decklist::{
    config::Config,
    models::{DecklistBlock, Grouping, StyleVariant},
    mtg::ScryfallClient,
    parsing::parse_decklist,
    render::{render_decklist, RenderInput},
    resolver::Resolver,
    store::{JsonFileStore, MetadataStore},
    Error, Result,
};

mod app;

#[derive(Parser)]
#[command(name = "mtg-decklist", version, about = "Turns MTG decklists into linked, grouped tables")]
struct Cli {
    /// TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Metadata store, overrides the config
    #[arg(long, global = true)]
    store: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Open the desktop app (default)
    Gui,
    /// Print the parsed sections as JSON
    Parse { file: PathBuf },
    /// Refresh card metadata for one decklist block of a document
    Resolve {
        file: PathBuf,
        #[arg(long)]
        doc: String,
        /// Block instance id, defaults to the file stem
        #[arg(long)]
        instance: Option<String>,
    },
    /// Render a decklist block to HTML using stored metadata
    Render {
        file: PathBuf,
        #[arg(long)]
        doc: String,
        /// Block instance id, defaults to the file stem
        #[arg(long)]
        instance: Option<String>,
        #[arg(long)]
        grouping: Option<String>,
        #[arg(long)]
        style: Option<String>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    if let Err(e) = run(Cli::parse()) {
        error!("{}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(store) = cli.store {
        config.store_path = store;
    }

    match cli.command.unwrap_or(Command::Gui) {
        Command::Gui => {
            let catalog = ScryfallClient::new(&config)?;
            let settings = Settings::with_flags(Flags { config, catalog });
            App::run(settings).map_err(|e| Error::Gui(e.to_string()))
        }
        Command::Parse { file } => {
            let raw = fs::read_to_string(file)?;
            println!("{}", serde_json::to_string_pretty(&parse_decklist(&raw))?);
            Ok(())
        }
        Command::Resolve {
            file,
            doc,
            instance,
        } => {
            let blocks = [DecklistBlock {
                content: fs::read_to_string(&file)?,
                instance_id: instance_id(instance, &file),
                grouping: config.grouping,
                style_variant: config.style,
            }];

            let resolver = Resolver::with_config(ScryfallClient::new(&config)?, &config);
            let mut store = JsonFileStore::new(&config.store_path);
            let runtime = tokio::runtime::Runtime::new()?;
            let meta = runtime.block_on(resolver.refresh_document(&mut store, &doc, &blocks))?;
            for (instance, snapshot) in &meta {
                info!("{}: {} cards ({})", instance, snapshot.cards.len(), snapshot.content_hash);
            }
            Ok(())
        }
        Command::Render {
            file,
            doc,
            instance,
            grouping,
            style,
            out,
        } => {
            let raw = fs::read_to_string(&file)?;
            let instance = instance_id(instance, &file);
            let store = JsonFileStore::new(&config.store_path);
            let cards = match store.snapshot(&doc, &instance)? {
                Some(snapshot) => snapshot.cards,
                None => {
                    warn!("no metadata for {} in {}, rendering without it", instance, doc);
                    Default::default()
                }
            };
            let sections = parse_decklist(&raw);
            let html = render_decklist(&RenderInput {
                raw: &raw,
                sections: &sections,
                cards: &cards,
                grouping: grouping.as_deref().map(Grouping::parse).unwrap_or(config.grouping),
                style: style.as_deref().map(StyleVariant::parse).unwrap_or(config.style),
            });
            match out {
                Some(path) => fs::write(path, html)?,
                None => println!("{}", html),
            }
            Ok(())
        }
    }
}

fn instance_id(explicit: Option<String>, file: &Path) -> String {
    explicit.unwrap_or_else(|| {
        file.file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    })
}

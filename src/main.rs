use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use futures_util::TryStreamExt;
use mlhub_stac::config::{self, ClientConfig};
use mlhub_stac::download_plan::{generate_download_plan, DownloadPlan};
use mlhub_stac::extensions::{citation, eo_bands, has_label_class, label_classes, source_links};
use mlhub_stac::selection::{selection_template, Selection};
use mlhub_stac::walkthrough::Walkthrough;
use mlhub_stac::workdir::WorkDir;
use mlhub_stac::{CatalogClient, SearchFilter};
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Profile to read from the profiles file
    #[arg(long, global = true, default_value = config::DEFAULT_PROFILE)]
    profile: String,
    /// Profiles file, defaults to ~/.mlhub/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// API key, overrides the profile and MLHUB_API_KEY
    #[arg(long, global = true)]
    api_key: Option<String>,
    /// Catalog root url, overrides the profile and MLHUB_ROOT_URL
    #[arg(long, global = true)]
    base_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a collection's description, license and citation
    Collection { id: String },
    /// List the items of one or more collections
    Search {
        #[arg(required = true)]
        collections: Vec<String>,
        /// Stop after this many matching items
        #[arg(long)]
        limit: Option<usize>,
        /// Only list items carrying this label class
        #[arg(long)]
        label_class: Option<String>,
    },
    /// Show an item's assets and links
    Item { collection: String, id: String },
    /// Show the items an item's source links point to
    Sources { collection: String, id: String },
    /// Download assets of an item
    Download {
        collection: String,
        id: String,
        #[arg(long = "asset", required = true)]
        assets: Vec<String>,
        #[arg(long, default_value = "./outputs")]
        out: PathBuf,
    },
    /// Download and verify a collection's bulk archive
    Archive {
        collection: String,
        #[arg(long, default_value = "./outputs")]
        out: PathBuf,
    },
    /// Build a download plan from a selection file
    Plan {
        selection: PathBuf,
        #[arg(long, default_value = "./outputs")]
        out: PathBuf,
        /// Run the plan after writing it
        #[arg(long)]
        execute: bool,
    },
    /// Tour a labelled collection inside a temporary directory that is removed afterwards
    Walkthrough {
        collection: String,
        #[arg(long)]
        label_class: String,
        #[arg(long, default_value = "labels")]
        label_asset: String,
        #[arg(long = "source-asset")]
        source_assets: Vec<String>,
        #[arg(long)]
        archive: bool,
    },
    /// Print a selection file template
    Template,
}

impl Cli {
    fn client_config(&self) -> Result<ClientConfig> {
        ClientConfig::load_with_overrides(
            self.config.as_deref(),
            &self.profile,
            self.api_key.clone(),
            self.base_url.clone(),
        )
        .context("Unable to resolve the client configuration")
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Template = cli.command {
        println!("{}", toml::to_string_pretty(&selection_template())?);
        return Ok(());
    }

    let client = CatalogClient::new(cli.client_config()?);

    match cli.command {
        Commands::Collection { id } => {
            let collection = client.get_collection(&id).await?;
            println!("{}", collection.id);
            println!("Description: {}", collection.description);
            println!("License: {}", collection.license);
            let citation = citation(&collection);
            if let Some(doi) = citation.doi {
                println!("DOI: {doi}");
            }
            if let Some(text) = citation.citation {
                println!("Citation: {text}");
            }
            for publication in citation.publications {
                println!(
                    "Publication: {} ({})",
                    publication.citation.unwrap_or_default(),
                    publication.doi.unwrap_or_default()
                );
            }
        }
        Commands::Search {
            collections,
            limit,
            label_class,
        } => {
            let items = client.search(&SearchFilter::collections(&collections))?.into_stream();
            let items = items.try_filter(|item| {
                let keep = match &label_class {
                    Some(class) => has_label_class(item, class),
                    None => true,
                };
                async move { keep }
            });
            futures_util::pin_mut!(items);
            let mut count = 0;
            while let Some(item) = items.try_next().await? {
                let classes: Vec<String> = label_classes(&item)
                    .iter()
                    .flat_map(|group| group.class_names())
                    .collect();
                println!("{}\t{}", item.id, classes.join(","));
                count += 1;
                if limit.is_some_and(|limit| count >= limit) {
                    break;
                }
            }
        }
        Commands::Item { collection, id } => {
            let item = client.get_item(&collection, &id).await?;
            println!("{}", item.id);
            for (key, asset) in item.assets.iter() {
                let bands: Vec<String> = eo_bands(asset)
                    .into_iter()
                    .filter_map(|band| band.common_name.or(band.name))
                    .collect();
                if bands.is_empty() {
                    println!("asset {key}: {}", asset.href);
                } else {
                    println!("asset {key} [{}]: {}", bands.join(","), asset.href);
                }
            }
            for link in item.links.iter() {
                println!("link {}: {}", link.rel, link.href);
            }
        }
        Commands::Sources { collection, id } => {
            let item = client.get_item(&collection, &id).await?;
            if source_links(&item).is_empty() {
                bail!("Item {id} has no source links");
            }
            for source in client.source_items(&item).await? {
                let keys: Vec<&String> = source.assets.keys().collect();
                println!(
                    "{}\t{}\t{:?}",
                    source.collection.as_deref().unwrap_or("-"),
                    source.id,
                    keys
                );
            }
        }
        Commands::Download {
            collection,
            id,
            assets,
            out,
        } => {
            let item = client.get_item(&collection, &id).await?;
            let dir = out.join(&item.id);
            fs::create_dir_all(&dir)?;
            for key in assets {
                let path = client.download_asset(&item, &key, &dir).await?;
                println!("{}", path.display());
            }
        }
        Commands::Archive { collection, out } => {
            fs::create_dir_all(&out)?;
            let path = out.join(format!("{collection}.tar.gz"));
            let bytes = client.download_archive(&collection, &path).await?;
            println!("{} ({bytes} bytes)", path.display());
        }
        Commands::Plan {
            selection,
            out,
            execute,
        } => {
            let selection = Selection::read(&selection)
                .with_context(|| format!("Unable to read {}", selection.display()))?;
            let plan = generate_download_plan(&client, &selection, &out).await?;
            let plan_path = out.join("download_plan.json");
            plan.write(&plan_path)?;
            println!("Wrote {} tasks to {}", plan.tasks.len(), plan_path.display());
            if execute {
                let plan = DownloadPlan::read(&plan_path)?;
                let downloaded = plan.execute(&client).await?;
                println!("Downloaded {downloaded} files");
            }
        }
        Commands::Walkthrough {
            collection,
            label_class,
            label_asset,
            source_assets,
            archive,
        } => {
            let walkthrough = Walkthrough {
                collection,
                label_class,
                label_asset,
                source_assets,
                archive,
            };
            let workdir = WorkDir::create()?;
            println!("Working in {}", workdir.path().display());
            // On error the directory is removed when `workdir` drops
            let report = walkthrough.run(&client, workdir.path()).await?;
            println!("{}: {}", walkthrough.collection, report.description);
            println!("License: {}", report.license);
            if let Some(citation) = &report.citation.citation {
                println!("Citation: {citation}");
            }
            match &report.label_item {
                Some(id) => println!(
                    "Found '{}' in {id} after {} items",
                    walkthrough.label_class, report.items_scanned
                ),
                None => println!(
                    "No item carries '{}' ({} items scanned)",
                    walkthrough.label_class, report.items_scanned
                ),
            }
            for path in report.downloaded.iter() {
                let size = fs::metadata(path)?.len();
                println!("{}\t{size}", path.display());
            }
            workdir
                .close()
                .context("Unable to remove the working directory")?;
        }
        Commands::Template => {}
    }

    Ok(())
}

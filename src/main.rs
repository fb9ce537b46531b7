use clap::{Parser, Subcommand};
use ghost2hugo::config::{self, DefaultStatus, MigrateConfig};
use ghost2hugo::{output, pipeline, validate};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ghost2hugo")]
#[command(about = "Migrate a Ghost CMS JSON export into Hugo page bundles")]
#[command(long_about = "\
Migrate a Ghost CMS JSON export into Hugo page bundles

Every published or draft post and page becomes a Markdown document with YAML
front matter. Items that reference images become page bundles with the images
copied next to index.md.

Output layout:

  content/
  ├── posts/
  │   ├── plain-post.md          # No images
  │   └── cafe-notes/            # Bundle: index.md + images
  │       ├── index.md
  │       └── pic.jpg
  ├── pages/
  │   └── about.md
  └── invalid/                   # Documents that failed front matter validation

Slug resolution (first non-empty wins):
  Title → stored Ghost slug (hex artifacts stripped) → untitled-<id>

Set RUST_LOG=debug to see every image copy and miss.
Run 'ghost2hugo gen-config' to generate a documented ghost2hugo.toml.")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./ghost2hugo.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Flags for the convert command. Each overrides the config file.
#[derive(clap::Args)]
struct ConvertArgs {
    /// Ghost JSON export
    #[arg(long)]
    input: PathBuf,

    /// Ghost content/images directory, searched recursively
    #[arg(long)]
    images: PathBuf,

    /// Output directory for posts
    #[arg(long)]
    output_posts: Option<String>,

    /// Output directory for pages
    #[arg(long)]
    output_pages: Option<String>,

    /// Directory for documents that fail validation
    #[arg(long)]
    output_invalid: Option<String>,

    /// Base URL of the Ghost site, replaces __GHOST_URL__
    #[arg(long)]
    site_url: Option<String>,

    /// Force every item to draft or published
    #[arg(long, value_enum)]
    default_status: Option<DefaultStatus>,
}

#[derive(Subcommand)]
enum Command {
    /// Convert an export into Markdown documents
    Convert(ConvertArgs),
    /// Validate the front matter of existing Markdown documents
    Check {
        /// Files or directories to check
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Print a stock ghost2hugo.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Convert(args) => {
            let config = resolve_config(cli.config, &args)?;
            println!("==> Converting {}", args.input.display());
            let summary = pipeline::run(&args.input, &args.images, &config, |event| {
                output::print_export_event(&event)
            })?;
            output::print_summary(&summary);
        }
        Command::Check { paths } => {
            let results: Vec<_> = paths
                .iter()
                .flat_map(|path| validate::find_documents(path))
                .map(|doc| {
                    let result = validate::check(&doc);
                    (doc, result)
                })
                .collect();
            output::print_check_output(&results);
            if results.iter().any(|(_, r)| r.is_err()) {
                std::process::exit(1);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load the config file and apply command-line overrides on top.
///
/// An explicitly named config file must exist; the default one is optional.
fn resolve_config(
    path: Option<PathBuf>,
    args: &ConvertArgs,
) -> Result<MigrateConfig, Box<dyn std::error::Error>> {
    let mut config = match path {
        Some(path) if !path.exists() => {
            return Err(format!("config file not found: {}", path.display()).into());
        }
        Some(path) => config::load_config(&path)?,
        None => config::load_config(Path::new(config::DEFAULT_CONFIG_FILE))?,
    };

    if let Some(site_url) = &args.site_url {
        config.site_url = site_url.clone();
    }
    if let Some(status) = args.default_status {
        config.default_status = Some(status);
    }
    if let Some(posts) = &args.output_posts {
        config.output.posts = posts.clone();
    }
    if let Some(pages) = &args.output_pages {
        config.output.pages = pages.clone();
    }
    if let Some(invalid) = &args.output_invalid {
        config.output.invalid = invalid.clone();
    }
    config.validate()?;
    Ok(config)
}

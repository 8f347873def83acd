//! @ai:module:intent CLI entry point for resolving and checking intent documents
//! @ai:module:layer presentation
//! @ai:module:public_api main
//! @ai:module:depends_on resolution, check, config, output

use clap::{Parser, Subcommand, ValueEnum};
use intent_parser::{
    check, document, manifest, output, resolution, resolver, source, AnchorSpec, CheckConfig,
    Config, EntryPolicy, FsSource, HashPolicy, Manifest, OutputFormat, ResolveOptions,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "intent")]
#[command(author, version, about = "Keep design rationale documents in sync with source code")]
struct Cli {
    /// Repository root that frontmatter `files` are relative to
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Configuration file (defaults to `intent.toml` under the root when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve every active intent document against current source
    Resolve {
        /// Language to render text in
        #[arg(long)]
        lang: Option<String>,

        /// Hash policy override
        #[arg(long, value_enum)]
        hash_policy: Option<Policy>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: Format,
    },

    /// Report obsolete, stale and overlapping chunks; fails on errors
    Check {
        /// Treat stale chunks as errors
        #[arg(long)]
        stale_is_error: bool,

        /// Do not report chunks without a stored hash
        #[arg(long)]
        hide_new: bool,

        /// Do not report overlapping chunks
        #[arg(long)]
        hide_overlaps: bool,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: Format,
    },

    /// Parse a manifest and show its entries
    Manifest {
        /// Manifest file (defaults to the configured manifest)
        path: Option<PathBuf>,

        /// Reject the whole manifest on the first malformed entry
        #[arg(long)]
        strict: bool,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: Format,
    },

    /// Parse a single intent document
    Parse {
        /// Path to the document
        path: PathBuf,

        /// Language to render text in
        #[arg(long)]
        lang: Option<String>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: Format,
    },

    /// Resolve one anchor in one source file
    Anchor {
        /// Path to the source file
        file: PathBuf,

        /// Anchor, e.g. `@function:handle` or `@line:10-14`
        anchor: String,

        /// Hash policy override
        #[arg(long, value_enum)]
        hash_policy: Option<Policy>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: Format,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
    JsonPretty,
}

impl From<Format> for OutputFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Text => OutputFormat::Text,
            Format::Json => OutputFormat::Json,
            Format::JsonPretty => OutputFormat::JsonPretty,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Policy {
    Trimmed,
    Normalized,
}

impl From<Policy> for HashPolicy {
    fn from(p: Policy) -> Self {
        match p {
            Policy::Trimmed => HashPolicy::Trimmed,
            Policy::Normalized => HashPolicy::Normalized,
        }
    }
}

fn init_logging() {
    // RUST_LOG wins when set
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("intent_parser=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(root: &Path, path: Option<&Path>) -> intent_parser::Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => Config::discover(root),
    }
}

fn load_manifest(source: &FsSource, config: &Config) -> intent_parser::Result<Manifest> {
    let text = source.read_manifest(&config.manifest)?;
    manifest::try_parse_manifest(&text, config.entry_policy)
}

fn fail(e: impl std::fmt::Display) -> ExitCode {
    eprintln!("Error: {}", e);
    ExitCode::from(2)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let config = match load_config(&cli.root, cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => return fail(e),
    };
    let fs = FsSource::new(&cli.root, &config.intent_dir);

    match cli.command {
        Commands::Resolve {
            lang,
            hash_policy,
            format,
        } => {
            let manifest = match load_manifest(&fs, &config) {
                Ok(manifest) => manifest,
                Err(e) => return fail(e),
            };

            let options = ResolveOptions {
                lang: lang.or(config.lang.clone()),
                hash_policy: hash_policy.map(Into::into).unwrap_or(config.hash_policy),
            };
            let resolved = resolution::resolve_manifest(&manifest, &fs, &options);

            println!("{}", output::format_resolution(&resolved, format.into()));
            ExitCode::SUCCESS
        }

        Commands::Check {
            stale_is_error,
            hide_new,
            hide_overlaps,
            format,
        } => {
            let manifest = match load_manifest(&fs, &config) {
                Ok(manifest) => manifest,
                Err(e) => return fail(e),
            };

            let options = ResolveOptions {
                lang: config.lang.clone(),
                hash_policy: config.hash_policy,
            };
            let resolved = resolution::resolve_manifest(&manifest, &fs, &options);

            let check_config = CheckConfig {
                stale_is_error: stale_is_error || config.stale_is_error,
                report_new: !hide_new,
                report_overlaps: !hide_overlaps,
            };
            let mut result = check::check_resolution(&manifest, &resolved, &check_config);
            let unlisted = check::find_unlisted_documents(fs.intent_dir(), &manifest);
            check::report_unlisted(&mut result, &unlisted);

            println!("{}", output::format_check_result(&result, format.into()));

            if result.passed() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }

        Commands::Manifest {
            path,
            strict,
            format,
        } => {
            let text = match path {
                Some(path) => source::read_text(&path),
                None => fs.read_manifest(&config.manifest),
            };
            let policy = if strict {
                EntryPolicy::Strict
            } else {
                config.entry_policy
            };

            match text.and_then(|text| manifest::try_parse_manifest(&text, policy)) {
                Ok(manifest) => {
                    println!("{}", output::format_manifest(&manifest, format.into()));
                    ExitCode::SUCCESS
                }
                Err(e) => fail(e),
            }
        }

        Commands::Parse { path, lang, format } => {
            let lang = lang.or(config.lang.clone());
            let options = document::DocumentOptions {
                lang: lang.as_deref(),
                ..Default::default()
            };

            let parsed = source::read_text(&path)
                .and_then(|text| document::try_parse_document(&text, &options));

            match parsed {
                Ok(doc) => {
                    println!("{}", output::format_document(&doc, format.into()));
                    ExitCode::SUCCESS
                }
                Err(e) => fail(e),
            }
        }

        Commands::Anchor {
            file,
            anchor,
            hash_policy,
            format,
        } => {
            let spec: AnchorSpec = match anchor.parse() {
                Ok(spec) => spec,
                Err(e) => return fail(e),
            };
            let text = match source::read_text(&file) {
                Ok(text) => text,
                Err(e) => return fail(e),
            };

            let policy = hash_policy.map(Into::into).unwrap_or(config.hash_policy);
            let result = resolver::resolve_anchor_with(&spec, &text, policy);
            println!("{}", output::format_anchor_result(&result, format.into()));

            if result.found {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
    }
}

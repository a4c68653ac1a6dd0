/*!
Deneb Command Line Interface

Developer tooling around the visual core: print spec templates, validate a
spec file against its grammar, and replay recorded host updates.
*/

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::rc::Rc;

use deneb::config::VisualFeatures;
use deneb::host::{
    DataFetchRequest, TooltipHideOptions, TooltipShowOptions, VisualHost,
    VisualObjectInstancesToPersist,
};
use deneb::logging::{self, LogFormat};
use deneb::specification::SpecificationService;
use deneb::{Provider, Visual, VisualConfiguration, VisualUpdateOptions, VERSION};

#[derive(Parser)]
#[command(name = "deneb")]
#[command(about = "Declarative Vega / Vega-Lite visuals for report hosts")]
#[command(version = VERSION)]
pub struct Cli {
    /// Log output format (pretty, compact, json)
    #[arg(long, global = true, default_value = "compact")]
    pub log_format: LogFormat,

    /// Enable developer-mode features (raw settings, debug logging)
    #[arg(long, global = true)]
    pub developer: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the default specification for a grammar
    Template {
        /// Grammar provider (vega, vega-lite)
        #[arg(long, default_value = "vega-lite")]
        provider: Provider,
    },

    /// Parse and validate a specification file
    Validate {
        /// Path to a JSON specification
        file: PathBuf,

        /// Grammar provider (vega, vega-lite)
        #[arg(long, default_value = "vega-lite")]
        provider: Provider,
    },

    /// Feed recorded host updates through a visual and report the outcome
    Replay {
        /// Path to a JSON array of host update options
        file: PathBuf,

        /// Refuse every request for more data
        #[arg(long)]
        refuse_fetch: bool,
    },
}

/// Host that accepts everything and logs what the visual asked for
struct LoggingHost {
    accept_fetch: bool,
}

impl VisualHost for LoggingHost {
    fn fetch_more_data(&self, request: DataFetchRequest) -> bool {
        tracing::info!(generation = request.generation, accepted = self.accept_fetch, "fetchMoreData");
        self.accept_fetch
    }

    fn persist_properties(&self, changes: &VisualObjectInstancesToPersist) {
        for instance in &changes.replace {
            tracing::info!(object = %instance.object_name, "persistProperties");
        }
    }

    fn rendering_failed(&self, _options: &VisualUpdateOptions, reason: &str) {
        eprintln!("Rendering failed: {}", reason);
    }

    fn show_tooltip(&self, options: &TooltipShowOptions) {
        tracing::debug!(items = options.data_items.len(), "showTooltip");
    }

    fn hide_tooltip(&self, _options: &TooltipHideOptions) {
        tracing::debug!("hideTooltip");
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let features = VisualFeatures {
        developer_mode: cli.developer,
        ..VisualFeatures::default()
    };
    logging::init_logging(cli.log_format, logging::default_directive(&features));

    match cli.command {
        Commands::Template { provider } => {
            println!("{}", SpecificationService::default_spec(provider));
        }

        Commands::Validate { file, provider } => {
            let text = std::fs::read_to_string(&file)?;
            let mut service = SpecificationService::new();
            let compiled = service.parse(&text, provider);
            if compiled.is_valid {
                println!("{} specification is valid", provider.display_name());
            } else {
                eprintln!(
                    "Invalid {} specification: {}",
                    provider.display_name(),
                    compiled.error.as_deref().unwrap_or_default()
                );
                std::process::exit(1);
            }
        }

        Commands::Replay { file, refuse_fetch } => {
            let text = std::fs::read_to_string(&file)?;
            let updates: Vec<VisualUpdateOptions> = serde_json::from_str(&text)?;

            let host = Rc::new(LoggingHost {
                accept_fetch: !refuse_fetch,
            });
            let mut visual = Visual::new(host, VisualConfiguration::with_features(features));
            for options in &updates {
                visual.update(options);
            }

            let service = visual.service();
            let limit = service.data_limit().state();
            println!("Updates replayed: {}", updates.len());
            println!("Visual state: {:?}", service.state());
            println!("Windows loaded: {}", limit.windows_loaded);
            println!("Rows loaded: {}", limit.rows_loaded);
            println!("Can fetch more: {}", limit.can_fetch_more);
            println!("Dataset rows: {}", service.dataset().values.len());
            match service.spec() {
                Some(spec) if spec.is_valid => println!("Specification: valid"),
                Some(spec) => println!(
                    "Specification: invalid ({})",
                    spec.error.as_deref().unwrap_or_default()
                ),
                None => println!("Specification: not parsed"),
            }
        }
    }

    Ok(())
}

use clap::{Parser, Subcommand};
use nft_batch::config::{self, BatchConfig, CONFIG_FILE_NAME};
use nft_batch::output;
use nft_batch::pipeline::{self, PipelineError, PipelineInputs};
use nft_batch::storage::IpfsCli;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "nft-batch")]
#[command(about = "Batch-generate NFT collections and pin them to IPFS")]
#[command(long_about = "\
Batch-generate NFT collections and pin them to IPFS

For every collection in the input file the base image is copied num_copies
times, the copies are added and pinned as one folder, one metadata document
per copy is rendered from the template and pinned as a second folder, and
the manifest records both folder CIDs per collection.

Layout (defaults, see 'nft-batch gen-config'):

  inputs/
  ├── input_nfts_info.json      # Collection definitions
  ├── metadata_template.json    # {name} {nft_image_folder_cid} {image_id} {image_extension}
  └── images/
      └── sunset.png            # Base images, referenced by image_name
  generated/
  ├── images/<id>/1.png …       # Staged copies
  └── metadata/<id>/1.json …    # Staged metadata
  outputs/
  └── output_nfts_info.json     # Manifest

Requires a running IPFS daemon reachable through the `ipfs` CLI.")]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(long, default_value = CONFIG_FILE_NAME, global = true)]
    config: PathBuf,

    /// Collection definitions (overrides paths.collections)
    #[arg(long, global = true)]
    collections: Option<PathBuf>,

    /// Metadata template (overrides paths.template)
    #[arg(long, global = true)]
    template: Option<PathBuf>,

    /// Base image directory (overrides paths.images)
    #[arg(long, global = true)]
    images: Option<PathBuf>,

    /// Staging root (overrides paths.staging)
    #[arg(long, global = true)]
    staging: Option<PathBuf>,

    /// Output manifest (overrides paths.manifest)
    #[arg(long, global = true)]
    manifest: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline: replicate → upload → render → upload → manifest
    Build,
    /// Load inputs and verify base images exist, without uploading
    Check,
    /// Print a stock nft-batch.toml with all options documented
    GenConfig,
}

impl Cli {
    fn apply_overrides(&self, config: &mut BatchConfig) {
        let overrides = [
            (&self.collections, &mut config.paths.collections),
            (&self.template, &mut config.paths.template),
            (&self.images, &mut config.paths.images),
            (&self.staging, &mut config.paths.staging),
            (&self.manifest, &mut config.paths.manifest),
        ];
        for (flag, target) in overrides {
            if let Some(path) = flag {
                *target = path.clone();
            }
        }
    }
}

fn load_inputs(config: &BatchConfig) -> Result<PipelineInputs, PipelineError> {
    PipelineInputs::load(
        &config.paths.collections,
        &config.paths.template,
        &config.paths.images,
        &config.paths.staging,
        &config.paths.manifest,
    )
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return ExitCode::SUCCESS;
    }

    let mut config = match config::load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            output::print_lines(&output::format_error(&e.to_string()));
            return ExitCode::FAILURE;
        }
    };
    cli.apply_overrides(&mut config);

    let inputs = match load_inputs(&config) {
        Ok(inputs) => inputs,
        Err(e) => {
            output::print_lines(&output::format_pipeline_error(&e));
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Command::Build => {
            let storage = &config.storage;
            let result = pipeline::run(
                &inputs,
                |endpoint| IpfsCli::new(storage.command.as_str(), &storage.args, endpoint),
                output::print_event,
            );
            match result {
                Ok(_) => {
                    output::print_lines(&output::format_success());
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    output::print_lines(&output::format_pipeline_error(&e));
                    ExitCode::from(e.exit_code())
                }
            }
        }
        Command::Check => {
            let issues = pipeline::check(&inputs);
            output::print_lines(&output::format_check(&inputs, &issues));
            if issues.is_empty() {
                println!("==> Inputs are valid");
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Command::GenConfig => ExitCode::SUCCESS,
    }
}

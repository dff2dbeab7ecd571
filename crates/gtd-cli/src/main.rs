mod commands;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use commands::{BuildArgs, Stage};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gtd", about = "Build, containerize and ship Go applications")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile the app and/or build its image
    Build {
        #[command(subcommand)]
        target: BuildTarget,
    },
    /// Push the image and/or call deployment triggers
    Push {
        #[command(subcommand)]
        target: PushTarget,
    },
    /// Build app and image, push the image, then call triggers
    All(BuildArgs),
    /// Remove build output and/or local images
    Clear {
        #[command(subcommand)]
        target: ClearTarget,
    },
}

#[derive(Subcommand)]
enum BuildTarget {
    /// Compile the binary and copy resources into the output dir
    App(BuildArgs),
    /// Render the Dockerfile and build the image from the output dir
    Image(BuildArgs),
    /// Build app, then image
    All(BuildArgs),
}

#[derive(Subcommand)]
enum PushTarget {
    /// Push every image tag to the registry
    Image(BuildArgs),
    /// Call each trigger URI
    Trigger(BuildArgs),
    /// Push image, then call triggers
    All(BuildArgs),
}

#[derive(Subcommand)]
enum ClearTarget {
    /// Remove the output dir
    App(BuildArgs),
    /// Remove the local image tags
    Image(BuildArgs),
    /// Clear app, then image
    All(BuildArgs),
}

impl Commands {
    /// Stages to run, in order, with the flags they share.
    fn into_plan(self) -> (&'static [Stage], BuildArgs) {
        use Stage::*;

        match self {
            Commands::Build { target } => match target {
                BuildTarget::App(args) => (&[BuildApp], args),
                BuildTarget::Image(args) => (&[BuildImage], args),
                BuildTarget::All(args) => (&[BuildApp, BuildImage], args),
            },
            Commands::Push { target } => match target {
                PushTarget::Image(args) => (&[PushImage], args),
                PushTarget::Trigger(args) => (&[PushTrigger], args),
                PushTarget::All(args) => (&[PushImage, PushTrigger], args),
            },
            Commands::All(args) => (&[BuildApp, BuildImage, PushImage, PushTrigger], args),
            Commands::Clear { target } => match target {
                ClearTarget::App(args) => (&[ClearApp], args),
                ClearTarget::Image(args) => (&[ClearImage], args),
                ClearTarget::All(args) => (&[ClearApp, ClearImage], args),
            },
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();
    let (stages, args) = cli.command.into_plan();

    init_tracing(args.verbose);
    match dotenv {
        Ok(path) => tracing::debug!(path = %path.display(), ".env loaded"),
        Err(e) if e.not_found() => tracing::debug!("no .env file"),
        Err(e) => tracing::warn!(error = %e, "failed to load .env"),
    }

    match commands::run(stages, args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}

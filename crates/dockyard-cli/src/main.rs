mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "dockyard",
    about = "Build, launch, and verify container images for Streamlit apps"
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a commented dockyard.toml
    Init,
    /// Show the ordered build stages
    Plan {
        /// Print stages as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the generated Dockerfile
    Render,
    /// Eject Dockerfile for manual customization
    Eject,
    /// Build the image with the local docker engine
    Build {
        /// Capture build output instead of streaming it
        #[arg(long)]
        quiet: bool,
    },
    /// Start a container from the built image
    Run {
        /// Host port to publish on (default: picked by the engine)
        #[arg(long, short = 'p')]
        port: Option<u16>,
    },
    /// Build, launch, and check the image end to end
    Verify {
        /// Keep the container running after a successful check
        #[arg(long)]
        keep: bool,
    },
    /// Show container status
    Status,
    /// Stream container logs
    Logs {
        /// Follow log output
        #[arg(long, short = 'f')]
        follow: bool,
        /// Number of lines to show from the end of the logs
        #[arg(long, short = 'n')]
        tail: Option<u32>,
    },
    /// Check docker and project readiness
    Doctor,
    /// Remove the container, image, and local bundle
    Destroy {
        /// Skip confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => commands::init_project().await?,
        Commands::Plan { json } => commands::plan(json).await?,
        Commands::Render => commands::render().await?,
        Commands::Eject => commands::eject().await?,
        Commands::Build { quiet } => commands::build(quiet).await?,
        Commands::Run { port } => commands::run(port).await?,
        Commands::Verify { keep } => commands::verify(keep).await?,
        Commands::Status => commands::status().await?,
        Commands::Logs { follow, tail } => commands::logs(follow, tail).await?,
        Commands::Doctor => commands::doctor().await?,
        Commands::Destroy { yes } => commands::destroy(yes).await?,
    }

    Ok(())
}

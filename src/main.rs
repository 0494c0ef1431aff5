use clap::Parser;
use log::*;

use depbot::{
    Result, UpdateOrchestrator,
    cli::Args,
    forge::github::Github,
    package_manager::PackageManager,
    repo::Repository,
    runner::ShellRunner,
};

fn initialize_logger(debug: bool) -> Result<()> {
    let filter = if debug {
        simplelog::LevelFilter::Debug
    } else {
        simplelog::LevelFilter::Info
    };

    let config = simplelog::ConfigBuilder::new()
        .add_filter_allow_str("depbot")
        .build();

    simplelog::TermLogger::init(
        filter,
        config,
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli_args = Args::parse();

    initialize_logger(cli_args.debug)?;

    let remote = cli_args.get_remote()?;
    let file_config = cli_args.load_file_config()?;
    let config = cli_args.bot_config(&file_config)?;
    let settings =
        cli_args.repository_settings(&file_config, &config, &remote)?;

    let repo = Repository::open(&config.workspace, settings)?;
    let forge = Github::new(remote).await?;

    let package_manager = PackageManager::new(
        Box::new(ShellRunner),
        config.package_manager.clone(),
        config.client_directory(),
    );

    if config.dry_run {
        info!("dry run: no branches or pull requests will be created");
    }

    let orchestrator = UpdateOrchestrator::builder()
        .config(config)
        .forge(Box::new(forge))
        .vcs(Box::new(repo))
        .package_manager(package_manager)
        .build()?;

    orchestrator.run().await?;

    Ok(())
}

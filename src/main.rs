//! plugin-ci CLI
//!
//! Entry point for the plugin's CI jobs.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use plugin_ci::comment::{read_performance_results, CommentKind, CommentPoster};
use plugin_ci::install::{default_work_dir, parse_skip_db};
use plugin_ci::specs::SpecOutcome;
use plugin_ci::{
    debug, deps, git, CiEnv, CircleCiClient, DeployPaths, Deployer, GitHubClient, HttpClient,
    InstallOptions, Installer, ProjectConfig, Redactor, Release, Result, Shell, Validate,
};

/// File written by the editor performance job.
const PERFORMANCE_RESULTS_FILE: &str = "post-editor-performance-results.txt";

#[derive(Parser)]
#[command(name = "plugin-ci")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "CI automation for the CoBlocks WordPress plugin", long_about = None)]
struct Cli {
    /// Project directory (default: current directory)
    #[arg(long, global = true)]
    project_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install WordPress core and the PHPUnit test suite
    InstallTests {
        /// Test database name
        db_name: String,

        /// Database user
        db_user: String,

        /// Database password
        #[arg(default_value = "")]
        db_pass: String,

        /// Database host, optionally host:port
        #[arg(default_value = "localhost")]
        db_host: String,

        /// WordPress version: latest, nightly, trunk, X.Y, X.Y.Z or X.Y-betaN/-RCN
        #[arg(default_value = "latest")]
        wp_version: String,

        /// Skip database creation (true/1/yes)
        #[arg(default_value = "false")]
        skip_db: String,

        /// Install into this directory instead of a fresh temp directory
        #[arg(long)]
        work_dir: Option<PathBuf>,
    },

    /// Select Cypress specs for the changed files
    SelectSpecs {
        /// Where to write the spec string (default from config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Drop globs that match no spec file in the project
        #[arg(long)]
        existing_only: bool,

        /// Changed files; newline-separated lists are accepted. Defaults to the
        /// diff against the default branch.
        files: Vec<String>,
    },

    /// Comment the build artifact download link on the pull request
    CommentArtifact,

    /// Comment editor performance results on the pull request
    CommentPerf {
        /// Results file (default: ~/project/post-editor-performance-results.txt)
        #[arg(long)]
        results: Option<PathBuf>,
    },

    /// Deploy a tagged release to WordPress.org and GitHub
    Deploy,

    /// Install system packages and the default test environment
    InstallDeps,
}

#[tokio::main]
async fn main() {
    debug::init_tracing();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!(error = %e, "plugin-ci failed");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let project_dir = match cli.project_dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    let config = ProjectConfig::discover(&project_dir)?;
    for warning in config.validate().into_result()? {
        tracing::warn!(warning = %warning, "configuration warning");
    }

    let env = CiEnv::from_env();
    tracing::debug!(debug = debug::is_debug(), project_dir = %project_dir.display(), "starting");

    match cli.command {
        Commands::InstallTests {
            db_name,
            db_user,
            db_pass,
            db_host,
            wp_version,
            skip_db,
            work_dir,
        } => {
            let options = InstallOptions {
                db_name,
                db_user,
                db_pass,
                db_host,
                wp_version,
                skip_db: parse_skip_db(&skip_db),
                work_dir: work_dir.unwrap_or_else(default_work_dir),
            };
            let installer = installer(&config, &env, &options.db_pass)?;
            installer.install(&options).await?;
        }

        Commands::SelectSpecs {
            output,
            existing_only,
            files,
        } => select_specs(&config, &project_dir, output, existing_only, files)?,

        Commands::CommentArtifact => {
            let pr = env.pull_request_number()?;
            let (owner, repo) = (env.owner()?, env.repo()?);

            let circleci = CircleCiClient::new(
                HttpClient::new()?,
                &config.github.circleci_api_url,
                owner,
                repo,
            );
            let url = circleci
                .build_artifact_url(&config.github.build_job, env.branch()?)
                .await?;

            let kind = CommentKind::Artifact {
                repo: repo.to_string(),
                url,
            };
            post_comment(&config, &env, pr, &kind).await?;
        }

        Commands::CommentPerf { results } => {
            let pr = env.pull_request_number()?;
            let path = match results {
                Some(path) => path,
                None => env.home_dir()?.join("project").join(PERFORMANCE_RESULTS_FILE),
            };
            let kind = CommentKind::Performance {
                results: read_performance_results(&path)?,
            };
            post_comment(&config, &env, pr, &kind).await?;
        }

        Commands::Deploy => {
            let release = Release::from_env(&env)?;
            let paths = DeployPaths::for_home(&env.home_dir()?, &project_dir, &config.plugin);
            let deployer = Deployer::new(Shell::new(release.redactor()), config.plugin.clone());
            deployer.deploy(&release, &paths)?;
        }

        Commands::InstallDeps => {
            let shell = Shell::default();
            let installer = installer(&config, &env, "")?;
            deps::install_dependencies(&shell, &installer, &project_dir).await?;
        }
    }

    Ok(())
}

fn installer(config: &ProjectConfig, env: &CiEnv, db_pass: &str) -> Result<Installer> {
    let shell = Shell::new(Redactor::new().with_secret("DB_PASSWORD", db_pass));
    Ok(Installer::new(
        HttpClient::new()?,
        shell,
        config.wordpress.clone(),
        config.database.clone(),
        env.job.clone(),
    ))
}

fn select_specs(
    config: &ProjectConfig,
    project_dir: &Path,
    output: Option<PathBuf>,
    existing_only: bool,
    files: Vec<String>,
) -> Result<()> {
    let files = if files.is_empty() {
        git::changed_files_against_default_branch(&Shell::default(), project_dir)?
    } else {
        files
    };

    let mut selection = match config.specs.selector().select_outcome(&files) {
        SpecOutcome::NoChanges => {
            tracing::info!("no changed files, nothing to test");
            return Ok(());
        }
        SpecOutcome::NoApplicableSpecs => {
            tracing::info!(files = files.len(), "no changed files map to e2e specs");
            return Ok(());
        }
        SpecOutcome::Selected(selection) => selection,
    };

    if existing_only {
        let dropped = selection.retain_existing(project_dir);
        if dropped > 0 {
            tracing::info!(dropped, "dropped globs without spec files");
        }
        if selection.is_empty() {
            tracing::warn!("selected features have no spec files");
            return Ok(());
        }
    }

    let path = output.unwrap_or_else(|| config.specs.output.clone());
    let written = plugin_ci::write_spec_string(&path, &selection)?;
    tracing::info!(
        features = ?selection.features(),
        specs = %selection.spec_string(),
        path = %written.display(),
        "wrote spec string"
    );
    Ok(())
}

async fn post_comment(
    config: &ProjectConfig,
    env: &CiEnv,
    pr: u64,
    kind: &CommentKind,
) -> Result<()> {
    let github = GitHubClient::new(
        &config.github.api_url,
        env.github_token()?,
        env.owner()?,
        env.repo()?,
    )?;
    let poster = CommentPoster::new(&github, config.github.bot_login.as_str());
    poster.authenticate().await?;
    poster.upsert(pr, kind).await?;
    Ok(())
}

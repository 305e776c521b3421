use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::error;

use umdb_pipeline::cli;
use umdb_pipeline::database_ops::seed::{SeedLimits, DEFAULT_MOVIE_LIMIT, DEFAULT_TV_LIMIT};
use umdb_pipeline::database_ops::tmdb::client::DEFAULT_API_BASE;
use umdb_pipeline::embedding::{
    HttpEmbedderConfig, DEFAULT_BASE_URL, DEFAULT_BATCH_SIZE, DEFAULT_MODEL, EMBEDDING_DIM,
};
use umdb_pipeline::error::exit_code_for;
use umdb_pipeline::util::env;

#[derive(Parser, Debug)]
#[command(name = "umdb", version, about = "TMDB fetch / convert / seed pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// Download top movie/TV details and credits into JSONL files (resumable)
    Fetch {
        /// Daily movie id export (NDJSON with id and popularity)
        #[arg(long, env = "UMDB_MOVIE_IDS")]
        movie_ids: PathBuf,
        /// Daily TV id export (NDJSON with id and popularity)
        #[arg(long, env = "UMDB_TV_IDS")]
        tv_ids: PathBuf,
        #[arg(long, env = "UMDB_MOVIE_LIMIT", default_value_t = cli::fetch::DEFAULT_MOVIE_LIMIT)]
        movie_limit: usize,
        #[arg(long, env = "UMDB_TV_LIMIT", default_value_t = cli::fetch::DEFAULT_TV_LIMIT)]
        tv_limit: usize,
        #[arg(long, env = "UMDB_OUTPUT_DIR", default_value = "data")]
        output_dir: PathBuf,
        /// Seconds to sleep between ids
        #[arg(long, env = "UMDB_SLEEP", default_value_t = cli::fetch::DEFAULT_DELAY_SECS)]
        sleep: f64,
        /// Delete existing output files before fetching
        #[arg(long, default_value_t = false)]
        overwrite: bool,
        /// TMDB v4 read access token
        #[arg(long, env = "TMDB_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
        #[arg(long, env = "UMDB_TMDB_BASE", default_value = DEFAULT_API_BASE)]
        api_base: String,
        /// Per-request timeout in seconds
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,
    },
    /// Normalize raw JSONL into CSV tables and embed titles
    Convert {
        #[arg(long, env = "UMDB_INPUT_DIR", default_value = "data")]
        input_dir: PathBuf,
        #[arg(long, env = "UMDB_OUTPUT_DIR", default_value = "data")]
        output_dir: PathBuf,
        /// Drop titles released after this day (YYYY-MM-DD); defaults to today
        #[arg(long, env = "UMDB_MAX_RELEASE_DATE")]
        max_release_date: Option<NaiveDate>,
        /// OpenAI-compatible embeddings base URL
        #[arg(long, env = "UMDB_EMBEDDING_URL", default_value = DEFAULT_BASE_URL)]
        embedding_url: String,
        #[arg(long, env = "UMDB_EMBEDDING_MODEL", default_value = DEFAULT_MODEL)]
        embedding_model: String,
        #[arg(long, env = "UMDB_EMBEDDING_API_KEY", hide_env_values = true)]
        embedding_api_key: Option<String>,
        #[arg(long, env = "UMDB_EMBEDDING_BATCH", default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,
    },
    /// Render a bounded SQL seed script from the CSV tables
    Seed {
        #[arg(long, env = "UMDB_INPUT_DIR", default_value = "data")]
        input_dir: PathBuf,
        #[arg(long, env = "UMDB_SEED_OUTPUT", default_value = "backend/src/main/resources/data.sql")]
        output: PathBuf,
        #[arg(long, env = "UMDB_SEED_MOVIE_LIMIT", default_value_t = DEFAULT_MOVIE_LIMIT)]
        movie_limit: usize,
        #[arg(long, env = "UMDB_SEED_TV_LIMIT", default_value_t = DEFAULT_TV_LIMIT)]
        tv_limit: usize,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    env::init_env();
    if let Err(e) = umdb_pipeline::tracing::init_tracing("info") {
        eprintln!("{e}");
    }

    let cli = Cli::parse();
    match dispatch(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(target = "umdb", error = %format!("{err:#}"), "stage failed");
            ExitCode::from(exit_code_for(&err) as u8)
        }
    }
}

async fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Fetch {
            movie_ids,
            tv_ids,
            movie_limit,
            tv_limit,
            output_dir,
            sleep,
            overwrite,
            api_key,
            api_base,
            timeout_secs,
        } => {
            use cli::fetch::{run, FetchConfig};
            let cfg = FetchConfig {
                movie_limit,
                tv_limit,
                output_dir,
                delay_secs: sleep,
                overwrite,
                api_key,
                api_base,
                timeout: Duration::from_secs(timeout_secs),
                ..FetchConfig::new(movie_ids, tv_ids)
            };
            run(cfg).await?;
        }
        Commands::Convert {
            input_dir,
            output_dir,
            max_release_date,
            embedding_url,
            embedding_model,
            embedding_api_key,
            batch_size,
        } => {
            use cli::convert::{run, ConvertConfig};
            let cfg = ConvertConfig {
                input_dir,
                output_dir,
                max_release_date,
                embedder: HttpEmbedderConfig {
                    base_url: embedding_url,
                    model: embedding_model,
                    api_key: embedding_api_key,
                    dimensions: EMBEDDING_DIM,
                    ..Default::default()
                },
                batch_size,
            };
            run(cfg).await?;
        }
        Commands::Seed {
            input_dir,
            output,
            movie_limit,
            tv_limit,
        } => {
            use cli::seed::{run, SeedConfig};
            run(SeedConfig {
                input_dir,
                output,
                limits: SeedLimits {
                    movies: movie_limit,
                    tv: tv_limit,
                },
            })?;
        }
    }
    Ok(())
}

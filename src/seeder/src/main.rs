mod manifest;

use anyhow::Context as _;
use std::path::Path;
use structopt::StructOpt;

mod args {
    use std::path::PathBuf;
    use structopt::StructOpt;

    /// Applies a JSON seed manifest to the database selected by
    /// DATABASE_URL. A store that already holds data is left untouched.
    #[derive(StructOpt)]
    pub struct Args {
        /// Seed manifest; image files are resolved relative to its directory
        pub manifest: PathBuf,
    }
}

async fn run(args: args::Args) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(&args.manifest)
        .with_context(|| format!("failed to read {}", args.manifest.display()))?;
    let parsed: manifest::Manifest =
        serde_json::from_str(&raw).context("seed manifest is malformed")?;
    let base_dir = args.manifest.parent().unwrap_or_else(|| Path::new("."));
    let graph = manifest::into_graph(parsed, base_dir)?;
    let conn = db::connect_env().await.context("cannot connect to database")?;
    if db::seed::apply(&conn, graph).await? {
        log::info!("seed data applied");
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    util::log::setup();
    let args = args::Args::from_args();
    if let Err(err) = run(args).await {
        util::print_error(err.as_ref());
        std::process::exit(1);
    }
}

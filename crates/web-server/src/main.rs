use database::{connect, run_migrations, DbRepository};
use std::sync::Arc;

// Entry point for `cargo run -p web-server`: serves against the configured
// database. The root `wellness` binary offers the same plus the other commands.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let settings = configuration::load_settings()?;
    let _guard = configuration::init_tracing(&settings)?;

    let pool = connect(settings.database_url()?).await?;
    run_migrations(&pool).await?;
    let store = Arc::new(DbRepository::new(pool));
    let auth = api_client::shared_client(&settings)?;

    web_server::run_server(&settings, None, store, auth).await
}

//! Admin utility: create a login user. Usernames must be email addresses
//! since they double as the alert notification address.

use api::config::AppConfig;
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: adduser <username> <password>");
        std::process::exit(1);
    }
    let username = &args[1];
    let password = &args[2];

    let config = AppConfig::from_env()?;
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(config.db_acquire_timeout)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("../migrations").run(&pool).await?;

    let user = auth::create_user(&pool, username, password).await?;
    println!("created user {} ({})", user.username, user.id);
    Ok(())
}

use anyhow::Context;
use audiobook_store::db::{create_orm_conn, run_migrations};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;

    let orm = create_orm_conn(&database_url).await?;
    run_migrations(&orm).await?;
    println!("Migrations applied");
    Ok(())
}

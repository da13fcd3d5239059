use std::sync::Arc;

use chrono::TimeDelta;
use clap::Parser;
use dotenvy::dotenv;
use foodtasker_api_gateway::config::{Cli, Commands, IssueTokenArgs, ServeArgs};
use foodtasker_api_gateway::identity::JwtIdentityGate;
use foodtasker_api_gateway::{AppState, app};
use foodtasker_order_service::OrderServices;
use foodtasker_order_service::clock::SystemClock;
use foodtasker_order_service::store::PgOrderStore;
use foodtasker_order_service::store::postgres::run_migrations;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(args) => serve(args).await,
        Commands::Migrate(args) => {
            run_migrations(&args.database_url).await?;
            Ok(())
        }
        Commands::IssueToken(args) => issue_token(args),
    }
}

async fn serve(args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let revenue_offset = args
        .revenue_offset()
        .ok_or("REVENUE_UTC_OFFSET_HOURS is out of range")?;

    run_migrations(&args.database.database_url).await?;
    let store = Arc::new(PgOrderStore::connect(
        &args.database.database_url,
        args.pool_size,
    )?);
    let clock = Arc::new(SystemClock);

    let state = AppState {
        services: OrderServices::new(store, clock.clone(), revenue_offset),
        identity: Arc::new(JwtIdentityGate::new(&args.secret_key, clock)),
    };

    let listener = tokio::net::TcpListener::bind(args.listen_addr).await?;
    info!("FoodTasker API listening on {}", listener.local_addr()?);

    axum::serve(listener, app(state)).await?;

    Ok(())
}

fn issue_token(args: IssueTokenArgs) -> Result<(), Box<dyn std::error::Error>> {
    let gate = JwtIdentityGate::new(&args.secret_key, Arc::new(SystemClock));
    let token = gate.issue(
        args.account_id,
        args.role.into(),
        TimeDelta::hours(args.ttl_hours),
    )?;
    println!("{token}");
    Ok(())
}

use std::net::SocketAddr;

use chrono::FixedOffset;
use clap::{Args, Parser, Subcommand, ValueEnum};
use foodtasker_order_service::models::Role;
use uuid::Uuid;

use crate::identity::JwtIdentityGate;

#[derive(Parser, Debug)]
#[command(version, about = "FoodTasker API server")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply pending migrations and serve the HTTP API
    Serve(ServeArgs),
    /// Apply pending migrations
    Migrate(DatabaseArgs),
    /// Print an access token for an existing account
    IssueToken(IssueTokenArgs),
}

#[derive(Args, Debug)]
pub struct DatabaseArgs {
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: String,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub database: DatabaseArgs,
    #[arg(long, env = "DATABASE_POOL_SIZE", default_value_t = 16)]
    pub pool_size: usize,
    #[arg(long, env = "SECRET_KEY", hide_env_values = true)]
    pub secret_key: String,
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8100")]
    pub listen_addr: SocketAddr,
    /// Offset from UTC, in hours, that decides which calendar day a delivery counts for
    #[arg(
        long,
        env = "REVENUE_UTC_OFFSET_HOURS",
        default_value_t = 0,
        allow_negative_numbers = true,
        value_parser = clap::value_parser!(i32).range(-23..=23)
    )]
    pub revenue_utc_offset_hours: i32,
}

impl ServeArgs {
    pub fn revenue_offset(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.revenue_utc_offset_hours * 3600)
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum RoleArg {
    Customer,
    Restaurant,
    Driver,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Customer => Role::Customer,
            RoleArg::Restaurant => Role::Restaurant,
            RoleArg::Driver => Role::Driver,
        }
    }
}

#[derive(Args, Debug)]
pub struct IssueTokenArgs {
    #[arg(long, env = "SECRET_KEY", hide_env_values = true)]
    pub secret_key: String,
    #[arg(long)]
    pub account_id: Uuid,
    #[arg(long, value_enum)]
    pub role: RoleArg,
    #[arg(long, default_value_t = JwtIdentityGate::ACCESS_TOKEN_EXPIRES_HOURS)]
    pub ttl_hours: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::try_parse_from([
            "foodtasker-api-gateway",
            "serve",
            "--database-url",
            "postgres://localhost/foodtasker",
            "--secret-key",
            "secret",
        ])
        .unwrap();
        let Commands::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.pool_size, 16);
        assert_eq!(args.listen_addr, "0.0.0.0:8100".parse().unwrap());
        assert_eq!(args.revenue_offset(), FixedOffset::east_opt(0));
    }

    #[test]
    fn test_issue_token_args() {
        let account_id = Uuid::new_v4().to_string();
        let cli = Cli::try_parse_from([
            "foodtasker-api-gateway",
            "issue-token",
            "--secret-key",
            "secret",
            "--account-id",
            account_id.as_str(),
            "--role",
            "driver",
        ])
        .unwrap();
        let Commands::IssueToken(args) = cli.command else {
            panic!("expected issue-token");
        };
        assert_eq!(Role::from(args.role), Role::Driver);
        assert_eq!(args.ttl_hours, 8);
        assert_eq!(args.account_id.to_string(), account_id);

        assert!(
            Cli::try_parse_from([
                "foodtasker-api-gateway",
                "serve",
                "--database-url",
                "postgres://localhost/foodtasker",
                "--secret-key",
                "secret",
                "--revenue-utc-offset-hours",
                "30",
            ])
            .is_err()
        );
    }
}

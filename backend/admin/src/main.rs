use admin::{print_quote, print_stats, set_admin, sweep_all};
use anyhow::Context;
use clap::{Parser, Subcommand};
use raffle::{Cents, fees::PaymentMethod};
use tracing_subscriber::{EnvFilter, fmt};
use server::auth::Authenticator;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[arg(long, env = "REDIS_URL", default_value = "redis://127.0.0.1:6379")]
    redis_url: String,

    #[arg(long, env = "AUTH_URL", default_value = "http://127.0.0.1:9999")]
    auth_url: String,

    /// Needed by `promote` and `demote`
    #[arg(long, env = "SERVICE_KEY", hide_env_values = true)]
    service_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Publication fee for a campaign, e.g. `fee 1000 1,50`
    Fee {
        total_tickets: u32,

        ticket_price: Cents,

        #[arg(long)]
        card: bool,
    },

    /// Release expired reservations and cancel unpaid drafts
    Sweep,

    /// Grant admin rights
    Promote { user_id: Uuid },

    /// Revoke admin rights
    Demote { user_id: Uuid },

    /// Dashboard totals
    Stats,
}

fn authenticator(auth_url: &str, service_key: Option<&str>) -> anyhow::Result<Authenticator> {
    let service_key = service_key.context("SERVICE_KEY is required to change admin rights")?;
    Ok(Authenticator::hosted(auth_url, service_key))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let args = Args::parse();

    match args.command {
        Command::Fee {
            total_tickets,
            ticket_price,
            card,
        } => {
            let method = if card { PaymentMethod::Card } else { PaymentMethod::Pix };
            print_quote(total_tickets, ticket_price, method);
        }
        Command::Sweep => sweep_all(&args.redis_url).await?,
        Command::Promote { user_id } => {
            let auth = authenticator(&args.auth_url, args.service_key.as_deref())?;
            set_admin(&args.redis_url, &auth, user_id, true).await?
        }
        Command::Demote { user_id } => {
            let auth = authenticator(&args.auth_url, args.service_key.as_deref())?;
            set_admin(&args.redis_url, &auth, user_id, false).await?
        }
        Command::Stats => print_stats(&args.redis_url).await?,
    }

    Ok(())
}

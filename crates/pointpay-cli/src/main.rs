use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use pointpay_sdk::config::DEFAULT_MERCHANT;
use pointpay_sdk::{
    HttpBackend, Outcome, PaymentBackend, PaymentType, PurchaseRequest, SessionController,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;

use config::CliConfig;

#[derive(Parser, Debug)]
#[command(name = "pointpay")]
#[command(about = "Pay with campus wallet points through a one-time QR token")]
struct Args {
    /// Wallet API base URL (overrides POINTPAY_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Bearer token for the wallet API (overrides POINTPAY_API_TOKEN)
    #[arg(long, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Issue a payment token and wait until it is consumed, expires or is cancelled
    Pay {
        #[arg(short, long)]
        amount: u64,

        #[arg(short, long, default_value = DEFAULT_MERCHANT)]
        merchant: String,

        #[arg(long = "type", value_enum, default_value_t = PayKind::Purchase)]
        payment_type: PayKind,

        /// Detach right away and wait for the completion notice
        #[arg(long)]
        background: bool,
    },

    /// Check a token once
    Status {
        #[arg(value_name = "TOKEN")]
        token: String,
    },

    /// Consume a token as the merchant
    Consume {
        #[arg(value_name = "TOKEN")]
        token: String,
    },

    /// Buy a marketplace product
    Purchase {
        #[arg(long)]
        product_id: u64,

        #[arg(long, conflicts_with = "wallet", required_unless_present = "wallet")]
        qr_token: Option<String>,

        #[arg(long)]
        wallet: bool,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum PayKind {
    Purchase,
    Transfer,
}

impl From<PayKind> for PaymentType {
    fn from(kind: PayKind) -> Self {
        match kind {
            PayKind::Purchase => PaymentType::Purchase,
            PayKind::Transfer => PaymentType::Transfer,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pointpay=info,pointpay_sdk=info,pointpay_net=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let args = Args::parse();
    let config = CliConfig::from_env()?.with_overrides(args.api_url, args.token);
    info!("Wallet API: {}", config.api_url);

    match args.command {
        Command::Pay {
            amount,
            merchant,
            payment_type,
            background,
        } => {
            let outcome = pay(&config, amount, &merchant, payment_type.into(), background).await?;
            print_outcome(outcome);
            if outcome != Outcome::Succeeded {
                bail!("payment {}", outcome);
            }
        }
        Command::Status { token } => {
            let backend = HttpBackend::new(config.net_config())?;
            let status = backend.token_status(&token).await?;
            println!("  Token:   {}", token);
            println!("  Active:  {}", status.is_active);
            if let Some(s) = status.status {
                println!("  Status:  {:?}", s);
            }
            match status.terminal_outcome() {
                Some(outcome) => print_outcome(outcome),
                None => println!("  Waiting for the merchant to scan"),
            }
        }
        Command::Consume { token } => {
            let backend = HttpBackend::new(config.net_config())?;
            match backend.consume_token(&token).await? {
                Some(receipt) => println!(
                    "{} {} points, {} (transaction {})",
                    "Consumed".green().bold(),
                    receipt.amount,
                    receipt.description,
                    receipt.id
                ),
                None => println!("{} token {}", "Consumed".green().bold(), token),
            }
        }
        Command::Purchase {
            product_id,
            qr_token,
            wallet,
        } => {
            let request = match (qr_token, wallet) {
                (Some(token), false) => PurchaseRequest::qr(product_id, &token)?,
                (None, true) => PurchaseRequest::wallet(product_id),
                _ => return Err(anyhow!("choose exactly one of --qr-token or --wallet")),
            };
            let backend = HttpBackend::new(config.net_config())?;
            let receipt = backend.purchase(&request).await?;
            println!("{}", serde_json::to_string_pretty(&receipt)?);
        }
    }

    Ok(())
}

async fn pay(
    config: &CliConfig,
    amount: u64,
    merchant: &str,
    payment_type: PaymentType,
    background: bool,
) -> Result<Outcome> {
    let backend = Arc::new(HttpBackend::new(config.net_config())?);
    let controller = SessionController::new(backend, config.session_config(payment_type));
    let mut notices = controller.subscribe();

    let handle = controller.start(amount, merchant).await?;
    let token = handle.token();

    println!();
    println!("  Token:    {}", token.id);
    println!("  Amount:   {} points", token.amount);
    println!("  Merchant: {}", token.merchant);
    println!("  QR code:  {} bytes (base64)", token.qr_code_base64.len());
    println!("  Expires:  {}", token.expires_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!();

    if background {
        let id = handle.detach();
        println!("Session {} running in the background", id);
        loop {
            match notices.recv().await {
                Ok(notice) if notice.session_id == id => return Ok(notice.outcome),
                Ok(_) | Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => bail!("notice channel closed before {} finished", id),
            }
        }
    }

    println!("Show the QR code to the merchant. Ctrl-C cancels.");
    let mut outcome_rx = handle.watch();
    let mut ticker = tokio::time::interval(Duration::from_secs(1));

    let outcome = loop {
        tokio::select! {
            settled = outcome_rx.wait_for(|o| o.is_terminal()) => {
                break settled.map(|o| *o).unwrap_or_else(|_| handle.outcome());
            }
            _ = tokio::signal::ctrl_c() => {
                handle.cancel();
            }
            _ = ticker.tick() => {
                let remaining = handle.remaining_secs();
                print!("\r  {:02}:{:02} remaining ", remaining / 60, remaining % 60);
                std::io::stdout().flush()?;
            }
        }
    };
    println!();
    Ok(outcome)
}

fn print_outcome(outcome: Outcome) {
    let label = match outcome {
        Outcome::Succeeded => "PAYMENT SUCCEEDED".green().bold(),
        Outcome::Expired => "TOKEN EXPIRED".yellow().bold(),
        Outcome::Cancelled => "PAYMENT CANCELLED".red().bold(),
        Outcome::Pending => "PENDING".normal(),
    };
    println!("{}", label);
}

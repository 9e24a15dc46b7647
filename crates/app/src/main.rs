mod args;
mod commands;
mod config_server;

use std::error::Error;

use services::FlushOutcome;
use tracing_subscriber::{EnvFilter, fmt};

use args::{ArgsError, Command, print_usage};
use config_server::ConfigState;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

async fn run() -> Result<(), Box<dyn Error + Send + Sync>> {
    let command = Command::parse(std::env::args().skip(1)).map_err(|e: ArgsError| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    match command {
        Command::Help => {
            print_usage();
            Ok(())
        }
        Command::ConfigServer { addr } => {
            let state = ConfigState::from_lookup(|key| std::env::var(key).ok());
            config_server::serve(&addr, state).await?;
            Ok(())
        }
        Command::Render {
            path,
            connection,
            credentials,
        } => {
            let config = commands::load_config(&connection).await?;
            let services = commands::connect(&config).await?;
            let (outcome, html) =
                commands::render(services, &config.site_origin, &path, credentials.as_ref())
                    .await?;
            tracing::info!(?outcome, "route resolved");
            println!("{html}");
            Ok(())
        }
        Command::Export {
            connection,
            credentials,
            category,
            format,
            out,
        } => {
            let config = commands::load_config(&connection).await?;
            let services = commands::connect(&config).await?;
            let document = commands::export(&services, &credentials, category, format).await?;
            let written = commands::write_export(&document, out.as_deref()).await?;
            println!("{}", written.display());
            Ok(())
        }
        Command::Flush { connection } => {
            let config = commands::load_config(&connection).await?;
            let services = commands::connect(&config).await?;
            match commands::flush(&services).await {
                FlushOutcome::Empty => println!("queue empty"),
                FlushOutcome::Sent(count) => println!("sent {count} events"),
                FlushOutcome::Requeued(count) => {
                    return Err(format!("backend rejected {count} events; kept locally").into());
                }
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}

//! oauth1-poster command line
//!
//! `authorize` prints the URL to grant access, `serve` receives the provider
//! callback, `post` sends one message and `reset` forgets the stored tokens.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;
use url::Url;

use oauth1_poster::{
    post_message, server, ConsumerCredentials, Endpoints, Error, FilePropertyStore, Result,
    Service, ServiceConfig, DEFAULT_MESSAGE, TWEETS_ENDPOINT,
};

#[derive(Parser, Debug)]
#[command(name = "oauth1-poster", version, about = "Authorize with OAuth1 and post a status")]
struct Cli {
    /// Directory holding deployment.json and user.json
    #[arg(long, env = "OAUTH1_POSTER_DATA_DIR", default_value = ".oauth1-poster")]
    data_dir: PathBuf,

    /// Base URL the callback route is reachable under
    #[arg(long, env = "OAUTH1_POSTER_CALLBACK_BASE", default_value = "http://127.0.0.1:8080")]
    callback_base: Url,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the handshake and print the authorization URL
    Authorize,
    /// Serve the callback route
    Serve {
        #[arg(long, default_value = "127.0.0.1:8080")]
        listen: SocketAddr,
    },
    /// Forget the stored request and access tokens
    Reset,
    /// Post one message
    Post {
        #[arg(long, default_value = DEFAULT_MESSAGE)]
        text: String,
        #[arg(long, default_value = TWEETS_ENDPOINT)]
        endpoint: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "command failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let deployment = FilePropertyStore::new(cli.data_dir.join("deployment.json"));
    let user = Arc::new(FilePropertyStore::new(cli.data_dir.join("user.json")));
    debug!(tokens = %user.path().display(), "using property store");
    let consumer = ConsumerCredentials::from_env_or_properties(&deployment)?;
    let config = ServiceConfig::new(consumer, Endpoints::twitter()?, cli.callback_base);
    let service = Service::configure(config, user)?;

    match cli.command {
        Command::Authorize => {
            let url = service.begin_authorization().await?;
            info!(%url, "open the following URL and then run the serve command");
            println!("{}", url);
        }
        Command::Serve { listen } => {
            server::serve(Arc::new(service), listen).await?;
        }
        Command::Reset => {
            service.reset()?;
            info!("stored tokens cleared");
        }
        Command::Post { text, endpoint } => {
            match post_message(&service, &endpoint, &text).await {
                Ok(posted) => println!("{}", posted.body),
                Err(Error::Authorization(_)) => {
                    info!("No access yet. Run the authorize command first.");
                }
                Err(err) => return Err(err),
            }
        }
    }
    Ok(())
}

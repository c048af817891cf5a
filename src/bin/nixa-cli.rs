use clap::{Parser, Subcommand};
use serde_json::Value;
use url::Url;

use nixaweb::navigator::{
    follow, ClickTarget, Completion, HttpFetcher, MemoryHistory, MemoryViewport, Navigator, NAVIGATION_ACCEPT,
};
use nixaweb::routing::JSON_MEDIA_TYPE;

#[derive(Parser)]
#[command(name = "nixa-cli")]
#[command(about = "Terminal client for a running Nixaweb site", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000")]
    url: String,

    /// Id of the content region inside the layout.
    #[arg(long, default_value = "content")]
    region: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow same-origin links one after another, printing each page
    Navigate {
        #[arg(required = true)]
        paths: Vec<String>,
    },
    /// Print the raw negotiated response for a path
    Fetch {
        path: String,

        /// Ask for the JSON shape (`Accept: application/json`)
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let base = Url::parse(&cli.url)?;
    let fetcher = HttpFetcher::new();

    match cli.command {
        Commands::Navigate { paths } => {
            let mut navigator = Navigator::new(base, MemoryViewport::default(), MemoryHistory::default());
            for path in paths {
                let Some(ticket) = navigator.intercept(&ClickTarget::Anchor { href: path.clone() }) else {
                    eprintln!("Skipping {path}: not on this site");
                    continue;
                };
                match follow(&mut navigator, &fetcher, &ticket, &cli.region).await {
                    Completion::Applied => {
                        let view = navigator.view();
                        println!("== {} ({})", view.title, ticket.url());
                        println!("{}", view.content);
                    }
                    Completion::Failed(error) => eprintln!("Error: {} ({error})", ticket.url()),
                    Completion::Stale => {}
                }
            }
        }
        Commands::Fetch { path, json } => {
            let url = base.join(&path)?;
            let accept = if json { JSON_MEDIA_TYPE } else { NAVIGATION_ACCEPT };
            let response = fetcher.get(&url, accept).await?;
            print_response(response.status, response.content_type.as_deref(), &response.body)?;
        }
    }

    Ok(())
}

fn print_response(status: u16, content_type: Option<&str>, body: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !(200..300).contains(&status) {
        eprintln!("Error: server returned status {status}");
        eprintln!("Response: {body}");
        return Ok(());
    }

    if content_type.is_some_and(|ct| ct.contains("application/json")) {
        let json: Value = serde_json::from_str(body)?;
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        println!("{body}");
    }
    Ok(())
}

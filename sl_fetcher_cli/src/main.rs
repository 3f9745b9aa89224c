mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use sl_fetcher::{Method, ResponseType};

use crate::commands::request::{BodyArgs, ClientArgs, PathArgs};

#[derive(Parser)]
#[command(name = "slfetch")]
#[command(about = "Send HTTP requests with base-URL joining, interceptors and typed decoding")]
struct Cli {
    #[command(flatten)]
    client: ClientArgs,

    /// Expected response type: json, text, array-buffer or blob
    #[arg(long, default_value = "json", global = true)]
    response_type: String,

    /// Log request and response details
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a GET request
    Get(PathArgs),
    /// Send a DELETE request
    Delete(PathArgs),
    /// Send a POST request with a JSON or form body
    Post(BodyArgs),
    /// Send a PUT request with a JSON or form body
    Put(BodyArgs),
    /// Send a PATCH request with a JSON or form body
    Patch(BodyArgs),
}

/// `--verbose` goes down to trace so response headers are printed.
fn log_directive(verbose: bool) -> &'static str {
    if verbose {
        "sl_fetcher=trace"
    } else {
        "sl_fetcher=info"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(log_directive(cli.verbose).parse()?),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let response_type = cli
        .response_type
        .parse::<ResponseType>()
        .map_err(anyhow::Error::msg)?;
    let client = commands::request::build_client(&cli.client, cli.verbose)?;

    let (method, path, payload) = match &cli.command {
        Commands::Get(args) => (Method::GET, &args.path, None),
        Commands::Delete(args) => (Method::DELETE, &args.path, None),
        Commands::Post(args) => (Method::POST, &args.path, Some(args.payload()?)),
        Commands::Put(args) => (Method::PUT, &args.path, Some(args.payload()?)),
        Commands::Patch(args) => (Method::PATCH, &args.path, Some(args.payload()?)),
    };

    commands::request::run(&client, method, path, payload, response_type).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::Directive;

    #[test]
    fn verbose_enables_header_logging() {
        assert_eq!(log_directive(true), "sl_fetcher=trace");
        assert_eq!(log_directive(false), "sl_fetcher=info");
        assert!(log_directive(true).parse::<Directive>().is_ok());
    }

    #[test]
    fn verbose_flag_is_global() {
        let cli = Cli::try_parse_from(["slfetch", "get", "posts", "-v"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Get(ref args) if args.path == "posts"));
    }
}

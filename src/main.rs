use std::env;

use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let raw_args: Vec<String> = env::args().collect();
    match raw_args.get(1).map(|s| s.as_str()) {
        Some("serve") => {
            let port = raw_args
                .get(2)
                .and_then(|s| s.parse::<u16>().ok())
                .unwrap_or(8080);
            if let Err(e) = property_compare::api::run_http_server(port).await {
                error!("Server error: {e}");
                std::process::exit(1);
            }
        }
        Some("compare") => {
            let args = std::iter::once("property-compare compare".to_string())
                .chain(raw_args.iter().skip(2).cloned());
            match property_compare::api::run_compare_cli(args) {
                Ok(report) => println!("{report}"),
                Err(msg) => {
                    eprintln!("{msg}");
                    std::process::exit(1);
                }
            }
        }
        _ => {
            eprintln!("Usage: cargo run -- serve [port] | cargo run -- compare [flags]");
            std::process::exit(1);
        }
    }
}

use clap::{Parser, Subcommand};
use futures_util::future::join_all;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Management CLI for the fetch gateway", long_about = None)]
struct Cli {
    #[arg(short, long, env = "GATEWAY_URL", default_value = "http://localhost:8000")]
    url: String,

    #[arg(short, long, env = "GATEWAY_ADMIN_KEY", default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gateway version and status
    Status,
    /// Show circuit state, uptime and slot usage
    Health,
    /// Show per-strategy counters and latency
    Metrics,
    /// Close the circuit breaker
    Reset,
    /// Fetch one or more URLs through the gateway, concurrently
    Fetch {
        #[arg(required = true)]
        urls: Vec<String>,

        /// Per-request budget in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Print the fetched content instead of a summary
        #[arg(long)]
        content: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    match cli.command {
        Commands::Status => {
            let res = client
                .get(format!("{base}/admin/status"))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Health => {
            let res = client.get(format!("{base}/health")).send().await?;
            print_response(res).await?;
        }
        Commands::Metrics => {
            let res = client
                .get(format!("{base}/admin/metrics"))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Reset => {
            let res = client
                .post(format!("{base}/admin/circuit/reset"))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Fetch {
            urls,
            timeout_ms,
            content,
        } => {
            let requests = urls.iter().map(|target| {
                let mut query = vec![("url", target.clone())];
                if let Some(ms) = timeout_ms {
                    query.push(("timeout_ms", ms.to_string()));
                }
                client.get(format!("{base}/fetch")).query(&query).send()
            });

            for (target, res) in urls.iter().zip(join_all(requests).await) {
                match res {
                    Ok(res) => print_fetch(target, res, content).await,
                    Err(e) => eprintln!("{target}: request failed: {e}"),
                }
            }
        }
    }

    Ok(())
}

async fn print_fetch(target: &str, res: reqwest::Response, content: bool) {
    let status = res.status();
    let body = match res.text().await {
        Ok(body) => body,
        Err(e) => {
            eprintln!("{target}: {status} unreadable body: {e}");
            return;
        }
    };
    match render_fetch(status, &body, content) {
        Ok(out) => println!("{out}"),
        Err(message) => eprintln!("{target}: {status} {message}"),
    }
}

/// Output line for one fetch, or the error message for a failed one.
///
/// Bodies that are not JSON are passed through as text.
fn render_fetch(status: StatusCode, body: &str, content: bool) -> Result<String, String> {
    let Ok(mut json) = serde_json::from_str::<Value>(body) else {
        return if status.is_success() {
            Ok(body.to_string())
        } else {
            Err(body.trim().to_string())
        };
    };

    if !status.is_success() {
        return Err(json["message"].as_str().unwrap_or(body).to_string());
    }

    if content {
        return Ok(json["content"].as_str().unwrap_or_default().to_string());
    }
    if let Some(obj) = json.as_object_mut() {
        obj.remove("content");
    }
    serde_json::to_string_pretty(&json).map_err(|e| e.to_string())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

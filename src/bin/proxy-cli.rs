use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::{Map, Value};

#[derive(Parser)]
#[command(name = "proxy-cli")]
#[command(about = "Command-line client for the forwarding proxy", long_about = None)]
struct Cli {
    #[arg(short, long, env = "PROXY_URL", default_value = "http://localhost:3000")]
    url: String,

    #[arg(short, long, env = "API_KEY", default_value = "")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the proxy's health endpoint
    Health,
    /// Forward a request through the proxy
    Forward {
        /// Target URL
        target: String,

        /// HTTP method for the target request
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,

        /// Target request header, "Name: value" (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Target request body; parsed as JSON when possible
        #[arg(short, long)]
        data: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Health => {
            let res = client.get(format!("{}/health", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Forward { target, method, headers, data } => {
            let mut auth = HeaderMap::new();
            auth.insert("h-api-key", HeaderValue::from_str(&cli.key)?);

            let payload = build_payload(target, method, &headers, data)?;
            let res = client
                .post(format!("{}/proxy", cli.url))
                .headers(auth)
                .json(&payload)
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

fn build_payload(
    target: String,
    method: String,
    headers: &[String],
    data: Option<String>,
) -> Result<Value, Box<dyn std::error::Error>> {
    let mut header_map = Map::new();
    for raw in headers {
        let (name, value) = raw
            .split_once(':')
            .ok_or_else(|| format!("header '{}' must look like 'Name: value'", raw))?;
        let value = Value::String(value.trim().to_string());
        // Repeated names become an array, which the proxy sends as repeated headers.
        match header_map.get_mut(name.trim()) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                header_map.insert(name.trim().to_string(), value);
            }
        }
    }

    let mut payload = Map::new();
    payload.insert("url".into(), Value::String(target));
    payload.insert("method".into(), Value::String(method));
    payload.insert("headers".into(), Value::Object(header_map));
    if let Some(data) = data {
        let body = serde_json::from_str(&data).unwrap_or(Value::String(data));
        payload.insert("body".into(), body);
    }
    Ok(Value::Object(payload))
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    eprintln!("Status: {}", status);
    for (name, value) in res.headers() {
        eprintln!("{}: {}", name, value.to_str().unwrap_or("<binary>"));
    }

    let text = res.text().await?;
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}

use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use dlq::server::{AppState, ServerParams};
use dlq::{AwsSettings, DeadLetterQueue, QueueRef, RedriveMode};

#[tokio::main]
pub async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = Cli::parse().run().await {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

#[derive(Debug, Parser)]
#[command(name = "dlq")]
#[command(about = "aws dead letter queue CLI client and HTTP service written in rust", long_about = None)]
pub struct Cli {
    /// Use LocalStack with static test credentials
    #[arg(long, global = true)]
    local: bool,

    /// SQS endpoint override (defaults to http://localhost:4566 with --local)
    #[arg(long, global = true, env = "DLQ_ENDPOINT")]
    endpoint: Option<String>,

    /// AWS region (falls back to the default provider chain, then us-east-1)
    #[arg(long, global = true, env = "AWS_REGION")]
    region: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print every queue with its ARN and source queue, one JSON object per line
    List,
    /// Delete all messages from the given queues
    Purge {
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Serve the dead letter queue HTTP API
    Serve(ServeArgs),
}

#[derive(Debug, Args)]
struct ServeArgs {
    #[arg(long, env = "DLQ_HOST", default_value = "127.0.0.1")]
    host: String,

    #[arg(long, env = "DLQ_PORT", default_value_t = 5000)]
    port: u16,

    /// `stub` reports success without touching SQS, `move` resends messages to their source queue
    #[arg(long, env = "DLQ_REDRIVE_MODE", default_value_t = RedriveMode::Stub)]
    redrive_mode: RedriveMode,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config = AwsSettings {
            local: self.local,
            endpoint: self.endpoint,
            region: self.region,
        }
        .load()
        .await;
        let backend = DeadLetterQueue::from_config(config);

        match self.command {
            Commands::List => {
                let directory = dlq::build_directory(&backend).await?;
                for queue in &directory {
                    println!("{}", serde_json::to_string(queue)?);
                }

                let dlqs = directory.iter().filter(|q| !q.source_queue_arn.is_empty()).count();
                log::info!("listed {} queues, {} with a source queue", directory.len(), dlqs);
            }
            Commands::Purge { urls } => {
                let queues: Vec<QueueRef> = urls
                    .into_iter()
                    .map(|queue_url| QueueRef {
                        queue_url,
                        source_queue_arn: None,
                    })
                    .collect();

                let results = dlq::purge(&backend, &queues).await;
                for result in &results {
                    println!("{}", serde_json::to_string(result)?);
                }

                let failed = results.iter().filter(|r| !r.is_success()).count();
                if failed > 0 {
                    anyhow::bail!("{} of {} queues failed to purge", failed, results.len());
                }
            }
            Commands::Serve(args) => {
                let params = ServerParams {
                    host: args.host,
                    port: args.port,
                };
                let state = AppState {
                    backend: Arc::new(backend),
                    redrive_mode: args.redrive_mode,
                };
                dlq::server::serve(&params, state).await?;
            }
        }

        Ok(())
    }
}

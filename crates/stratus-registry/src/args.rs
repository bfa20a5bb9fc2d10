use clap::Parser;

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    #[arg(long, env = "STRATUS_REGISTRY_ADDR", default_value = "0.0.0.0:8612")]
    pub listen_addr: String,

    #[arg(long, env = "ETCD_ENDPOINT", default_value = "http://127.0.0.1:2379")]
    pub etcd_endpoint: String,

    /// OTLP endpoint for exporting traces.
    #[arg(long, env = "OTLP_URL")]
    pub otlp_endpoint: Option<String>,

    /// Bearer token for the OTLP collector.
    #[arg(long, env = "OTLP_TOKEN")]
    pub otlp_token: Option<String>,
}

use clap::Parser;
use ocilogs_http::serve;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ocilogs", about = "Federated OCI log search server")]
struct Cli {
    /// JSON file holding the datasource `{jsonData, secureJsonData}` blob.
    #[arg(long, env = "OCILOGS_SETTINGS")]
    settings: PathBuf,
    #[arg(long, env = "OCILOGS_BIND_ADDR", default_value = "127.0.0.1:3100")]
    bind_addr: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = serve(&cli.settings, &cli.bind_addr).await {
        eprintln!("ERROR: {}", e);
        std::process::exit(1);
    }
}

//! Follow a live-dealer table from the terminal.

use anyhow::Result;
use live_poker::game::entities::TableId;
use pico_args::Arguments;

use lp_client::{api_client::ApiClient, websocket_client::TableWatcher};

const HELP: &str = "\
Follow a live-dealer poker table

USAGE:
  lp_client --table ID [OPTIONS]

OPTIONS:
  --server URL          Server URL  [default: http://localhost:6969]
  --table ID            Table to follow
  --token TOKEN         Session token [default: env LP_TOKEN]

FLAGS:
  -h, --help            Print help information

Without a token the client only watches.
";

struct Args {
    server_url: String,
    table_id: TableId,
    token: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut pargs = Arguments::from_env();

    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        server_url: pargs
            .opt_value_from_str("--server")?
            .unwrap_or_else(|| "http://localhost:6969".to_string()),
        table_id: pargs.value_from_str("--table")?,
        token: pargs
            .opt_value_from_str("--token")?
            .or_else(|| std::env::var("LP_TOKEN").ok()),
    };

    run(args).await
}

async fn run(args: Args) -> Result<()> {
    let mut api_client = ApiClient::new(args.server_url);
    if let Some(token) = args.token {
        api_client = api_client.with_token(token);
    }

    let blinds = api_client.blinds(args.table_id).await?;
    println!(
        "Table {} - blinds {}/{} (level {})",
        args.table_id, blinds.small_blind, blinds.big_blind, blinds.level
    );

    TableWatcher::new(api_client, args.table_id)
        .connect_and_follow()
        .await?;

    println!("\nDisconnected from table.");
    Ok(())
}

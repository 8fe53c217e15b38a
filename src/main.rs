use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use postback::codec::Value;
use postback::page::MacProtector;
use postback::state::Snapshot;
use postback::web::{run_server, WebAppState};
use postback::Config;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Config file (defaults to ~/.postback/config.toml)
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    cmd: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Run the demo web page
    Serve {
        /// Override the configured port
        #[clap(long)]
        port: Option<u16>,
    },
    /// Print the value graph inside a hidden-field value
    Decode {
        /// Base64 field contents
        field: String,
        /// Key used to verify MAC-protected fields
        #[clap(long)]
        mac_key: Option<String>,
        /// Per-user key the field was bound to
        #[clap(long)]
        user_key: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut config = Config::load(args.config.as_deref());

    match args.cmd {
        Command::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            let state = WebAppState::new(&config.persistence);
            run_server(state, &config.server).await
        }
        Command::Decode {
            field,
            mac_key,
            user_key,
        } => {
            let mut persister = config.persistence.persister();
            if let Some(key) = mac_key {
                persister = persister.with_protector(Arc::new(MacProtector::new(key.as_bytes())));
            }
            let value = persister.decode_for(&field, user_key.as_deref().filter(|k| !k.is_empty()))?;
            print_value(value);
            Ok(())
        }
    }
}

/// Print a page state field as its parts, anything else as a value tree.
fn print_value(value: Value) {
    if let Value::Pair(control, view) = &value {
        if let Value::Pair(layout, snapshot) = view.as_ref() {
            if let Value::Str(layout) = layout.as_ref() {
                let snapshot = match snapshot.as_ref() {
                    Value::Null => Some(Snapshot::default()),
                    other => Snapshot::from_value(other.clone()).ok(),
                };
                if let Some(snapshot) = snapshot {
                    println!("layout: {layout}");
                    if let Value::Map(map) = control.as_ref() {
                        for (unique_id, state) in map.iter() {
                            println!("control {}: {state:?}", unique_id.as_str().unwrap_or("?"));
                        }
                    }
                    println!("{snapshot:#?}");
                    return;
                }
            }
        }
    }
    println!("{value:#?}");
}

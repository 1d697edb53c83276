use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use floodchat::error::{FloodChatError, Result};
use floodchat::services::directory::PresenceDirectory;
use floodchat::services::transport::LocalMesh;
use floodchat::{ChatChannel, ChatController, ChatUser, Config};

#[derive(Parser, Debug)]
#[command(name = "floodchat-sim")]
#[command(about = "Runs a line of flooding chat nodes over an in-process mesh")]
struct Cli {
    #[arg(long, env = "FLOODCHAT_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, default_value_t = 3)]
    nodes: usize,

    #[arg(long = "message", default_value = "hello mesh")]
    messages: Vec<String>,

    #[arg(long, default_value_t = false, help = "Also send a direct message from the first to the last node")]
    dm: bool,

    #[arg(long, default_value_t = 250)]
    settle_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if cli.nodes < 2 {
        return Err(FloodChatError::Config(
            "at least two nodes are needed".to_string(),
        ));
    }

    let node_config = config.node();
    let mesh = LocalMesh::new();
    let transports: Vec<_> = (0..cli.nodes).map(|_| mesh.join()).collect();
    mesh.link_line(&transports);

    // Stands in for whatever discovers nearby peers on a real device.
    let directory = PresenceDirectory::new();
    let mut controllers = Vec::with_capacity(cli.nodes);
    for (index, transport) in transports.iter().enumerate() {
        let me = ChatUser::new(Some(format!("node-{index}")));
        let controller = ChatController::start(me, transport.clone(), &node_config);
        controller.attach_directory(&directory);
        let name = controller.me().display_name().to_string();
        controller.on_message_added(move |message| {
            info!(
                node = %name,
                author = message.author.display_name(),
                content = %message.content,
                "message received"
            );
        });
        directory.observe(&controller.presence());
        controllers.push(controller);
    }

    let first = &controllers[0];
    for message in &cli.messages {
        first.send_text(message.clone()).await?;
    }
    if cli.dm {
        let last = controllers[cli.nodes - 1].me();
        let channel = ChatChannel::dm([first.me().id, last.id]);
        first
            .send(format!("direct hello to {}", last.display_name()), Some(channel), None, None)
            .await?;
    }

    tokio::time::sleep(Duration::from_millis(cli.settle_ms)).await;
    for (transport, controller) in transports.iter().zip(&controllers) {
        let presence = controller.presence();
        info!(
            node = presence.user.display_name(),
            clock = presence.user.logical_clock,
            broadcasts = transport.broadcast_count(),
            "node summary"
        );
    }

    for mut controller in controllers {
        controller.shutdown().await;
    }
    Ok(())
}

//! CLI демо widgetbus
//!
//! Поднимает в одном процессе отправителя и несколько пиров на общем канале,
//! отправляет одно сообщение с подтверждением и печатает исход. С `--silent`
//! пиры не подтверждают, и видно, как исчерпываются повторы.

use std::{
    collections::HashSet,
    path::PathBuf,
    sync::{Arc, Weak},
};

use anyhow::{Context, Result};
use clap::Parser;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use widgetbus::{
    init_logging, AckBroker, ChannelEvent, ChannelHub, ErrorExt, Settings, Subscriber,
};

/// Ключ, под которым демо хранит историю отправителя.
const HISTORY_KEY: &str = "widgetbus.history";

#[derive(Parser)]
#[command(name = "widgetbus")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "widgetbus - broadcast bus demo with acknowledged delivery", long_about = None)]
struct Cli {
    /// Файл конфигурации (toml/json/yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Тема сообщения
    #[arg(short, long, default_value = "demo")]
    topic: String,
    /// Текст сообщения
    #[arg(short, long, default_value = "hello from widgetbus")]
    message: String,
    /// Количество пиров на канале
    #[arg(short, long, default_value_t = 2)]
    peers: usize,
    /// Пиры получают сообщения, но не подтверждают их
    #[arg(long)]
    silent: bool,
    /// Переопределяет интервал повторов из конфигурации
    #[arg(long)]
    retry_interval_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings =
        Settings::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(ms) = cli.retry_interval_ms {
        settings.retry_interval_ms = ms;
    }
    let logging = init_logging(&settings.logging)?;

    let hub = settings.channel_hub();
    let storage = settings.open_storage()?;
    let sender = AckBroker::with_policy(&hub, settings.broker_config(), settings.retry_policy());
    let restored = sender.broker().load_history(&storage, HISTORY_KEY);
    tracing::info!(restored, channel = sender.broker().channel_name(), "sender ready");

    let peers: Vec<Arc<AckBroker>> = (0..cli.peers)
        .map(|i| spawn_peer(&hub, &settings, &cli.topic, i, cli.silent))
        .collect();

    let (tx, rx) = oneshot::channel();
    let id = sender.send(ChannelEvent::new(&cli.topic, "", &cli.message), move |outcome| {
        let _ = tx.send(outcome);
    });
    println!("sent {id} on '{}' to {} peer(s)", cli.topic, peers.len());

    let budget = settings.retry_policy().interval * (settings.retry_attempts + 2);
    let outcome = tokio::time::timeout(budget, rx)
        .await
        .context("acknowledgement outcome never arrived")?
        .context("ack broker dropped before resolving")?;

    sender.broker().persist_history(&storage, HISTORY_KEY);
    drop(peers);

    let result = match outcome {
        Ok(ack) => {
            println!("acknowledged: {} (needs_ack = {})", ack.id, ack.needs_ack);
            Ok(())
        }
        Err(e) => {
            println!("failed [{}]: {}", e.status_code(), e.client_message());
            Err(anyhow::Error::new(e).context("delivery failed"))
        }
    };
    logging.shutdown();
    result
}

/// Пир подтверждает каждый id один раз: эхо других пиров тоже несёт
/// `needs_ack` и иначе пересылалось бы бесконечно.
fn spawn_peer(
    hub: &ChannelHub,
    settings: &Settings,
    topic: &str,
    index: usize,
    silent: bool,
) -> Arc<AckBroker> {
    let name = format!("peer-{index}");
    let config = settings.broker_config().widget(name.clone());
    let peer = Arc::new(AckBroker::with_policy(hub, config, settings.retry_policy()));

    let weak: Weak<AckBroker> = Arc::downgrade(&peer);
    let acked = Mutex::new(HashSet::new());
    peer.broker().subscribe(
        topic,
        Subscriber::new(name, move |event| {
            tracing::info!(peer = index, message = %event.message, "peer received message");
            if silent {
                return;
            }
            let Some(header) = event.ack.as_ref() else {
                return;
            };
            if !acked.lock().insert(header.id.clone()) {
                return;
            }
            if let Some(peer) = weak.upgrade() {
                peer.received(event);
            }
        }),
    );
    peer
}

mod config;
mod directory;
mod error;
mod metadata;
mod models;
mod probe;
mod scheduler;
mod slack;
mod state;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Usage,
    Version,
    Message(String),
    Run,
    Channels,
    Probe,
    Ignored,
}

fn parse_command(args: &[String]) -> Command {
    let Some(first) = args.first() else {
        return Command::Usage;
    };
    match first.to_lowercase().as_str() {
        "usage" | "--help" | "-h" => Command::Usage,
        "--version" | "-v" => Command::Version,
        "message" if args.len() > 1 => Command::Message(args[1..].join(" ")),
        "run" => Command::Run,
        "channels" => Command::Channels,
        "probe" => Command::Probe,
        _ => Command::Ignored,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match parse_command(&args) {
        Command::Usage => {
            println!("{}", usage());
            Ok(())
        }
        Command::Version => {
            println!("teqbot {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Command::Message(text) => send_message(&text).await,
        Command::Run => run().await,
        Command::Channels => list_channels().await,
        Command::Probe => probe_once().await,
        Command::Ignored => Ok(()),
    }
}

async fn run() -> Result<()> {
    let config = load_config()?;
    let services = scheduler::Services::from_config(&config)?;

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("stop requested, finishing current tick");
        signal_cancel.cancel();
    });

    scheduler::run(&config, &services, cancel).await
}

async fn send_message(text: &str) -> Result<()> {
    let config = load_config()?;
    let client = slack::SlackClient::new(&config.slack.api_base, &config.slack.token)?;
    let channel = &config.slack.message_channel;
    println!("Sending '{}' to #{} channel...", text, channel);
    match client
        .send(channel, text, &config.slack.username, slack::ROBOT_EMOJI)
        .await
    {
        Ok(confirmation) => println!("{}", confirmation),
        Err(err) => println!("Message not sent: {}", err),
    }
    Ok(())
}

async fn list_channels() -> Result<()> {
    let config = load_config()?;
    let client = slack::SlackClient::new(&config.slack.api_base, &config.slack.token)?;
    match client.list_channels().await {
        Ok(channels) => {
            println!("Slack channels:");
            for channel in channels {
                let purpose = channel
                    .purpose
                    .map(|purpose| purpose.value)
                    .filter(|value| !value.is_empty());
                match purpose {
                    Some(purpose) => {
                        println!("    #{} ({}) - {}", channel.name, channel.id, purpose)
                    }
                    None => println!("    #{} ({})", channel.name, channel.id),
                }
            }
        }
        Err(err) => println!("Unable to authenticate: {}", err),
    }
    Ok(())
}

async fn probe_once() -> Result<()> {
    let config = load_config()?;
    let stream_probe = probe::StreamProbe::new(config.probe_timeout())?;
    let result = stream_probe.probe(&config.stream_url).await;
    info!("stream up: {}", result.is_up());
    println!("{}", result.payload());
    Ok(())
}

fn load_config() -> Result<config::Config> {
    let (config, path) = config::load_config()?;
    match path {
        Some(path) => info!("loaded config from {}", path.display()),
        None => info!("no config file found, using defaults and environment"),
    }
    Ok(config)
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
                return;
            }
            Err(err) => warn!("cannot listen for SIGTERM: {}", err),
        }
    }
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("cannot listen for ctrl-c: {}", err);
        std::future::pending::<()>().await;
    }
}

fn usage() -> String {
    [
        "",
        "===============",
        "KTEQ-FM TEQ-BOT",
        "===============",
        "",
        "Requirements:",
        "  SLACK_TOKEN, STREAM_URL, TUNEIN_STATION_ID, TUNEIN_PARTNER_ID,",
        "  TUNEIN_PARTNER_KEY in the environment or /etc/teqbot/config.toml",
        "",
        "Usage:",
        "  teqbot <command>",
        "",
        "Commands:",
        "  usage             Print this usage statement",
        "  message <text>    Send a test message to the message channel",
        "  run               Start the now-playing and stream status scheduler",
        "  channels          List Slack channels",
        "  probe             Check the stream once and print the result",
        "",
    ]
    .join("\n")
}

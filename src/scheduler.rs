use crate::config::{Config, Task};
use crate::directory::DirectoryPublisher;
use crate::metadata;
use crate::probe::{self, DownCause, Probe, StreamProbe};
use crate::slack::{SlackClient, MUSIC_EMOJI, ROBOT_EMOJI, SKULL_EMOJI};
use crate::state::{MarkerStore, StreamState, NO_TRACK};
use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const TASK_ORDER: [Task; 2] = [Task::NowPlaying, Task::StreamStatus];

pub const RECOVERY_MESSAGE: &str = "Stream is back up and running!";

/// Everything a task talks to. Built once from the config.
#[derive(Clone)]
pub struct Services {
    pub probe: StreamProbe,
    pub slack: SlackClient,
    pub directory: DirectoryPublisher,
    pub store: MarkerStore,
}

impl Services {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            probe: StreamProbe::new(config.probe_timeout())?,
            slack: SlackClient::new(&config.slack.api_base, &config.slack.token)?,
            directory: DirectoryPublisher::new(&config.directory.base_url)?,
            store: MarkerStore::new(&config.markers),
        })
    }
}

/// Values that change between ticks. Mirrors the marker files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub last_track: String,
    pub status: StreamState,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            last_track: NO_TRACK.to_string(),
            status: StreamState::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NowPlayingOutcome {
    StreamDown,
    Unchanged,
    Malformed,
    Announced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutcome {
    Healthy,
    Recovered,
    Down(DownCause),
}

/// Runs until `cancel` fires. Tasks started in a tick always finish; the
/// token is only checked after the tick's sleep.
pub async fn run(config: &Config, services: &Services, cancel: CancellationToken) -> Result<()> {
    let interval = config.schedule.announce_interval.max(1);
    let tick = config.tick();
    let mut session = Session::default();
    let mut counter = 0u32;
    info!(
        "scheduler started: every {} ticks of {:?}, tasks {:?}",
        interval, tick, config.schedule.tasks
    );

    loop {
        counter += 1;
        if counter >= interval {
            run_tasks(config, services, &mut session).await;
            counter = 0;
        }
        tokio::time::sleep(tick).await;
        if cancel.is_cancelled() {
            break;
        }
    }

    info!("scheduler stopping");
    services
        .store
        .clear_status()
        .context("clear status marker on stop")
}

pub async fn run_tasks(config: &Config, services: &Services, session: &mut Session) {
    for task in TASK_ORDER {
        if !config.schedule.tasks.contains(&task) {
            continue;
        }
        match task {
            Task::NowPlaying => {
                let outcome = now_playing_task(config, services, session).await;
                debug!("now playing task: {:?}", outcome);
            }
            Task::StreamStatus => {
                let outcome = stream_status_task(config, services, session).await;
                debug!("stream status task: {:?}", outcome);
            }
        }
    }
}

pub async fn now_playing_task(
    config: &Config,
    services: &Services,
    session: &mut Session,
) -> NowPlayingOutcome {
    match services.store.read_last_track() {
        Ok(track) => session.last_track = track,
        Err(err) => warn!("using in-memory last track: {:#}", err),
    }

    let track = match services.probe.probe(&config.stream_url).await {
        Probe::Playing(track) => track,
        Probe::Down(cause) => {
            debug!("no track to compare: {}", cause.reason());
            return NowPlayingOutcome::StreamDown;
        }
    };
    if track == session.last_track {
        return NowPlayingOutcome::Unchanged;
    }

    session.last_track = track.clone();
    if let Err(err) = services.store.write_last_track(&track) {
        warn!("failed to persist last track: {:#}", err);
    }

    let observation = match metadata::parse(&track) {
        Ok(observation) => observation,
        Err(err) => {
            warn!("not announcing track: {}", err);
            return NowPlayingOutcome::Malformed;
        }
    };

    info!("new track: {}", track);
    notify(
        config,
        services,
        &config.slack.now_playing_channel,
        &track,
        MUSIC_EMOJI,
    )
    .await;
    services
        .directory
        .publish(&config.directory, &observation)
        .await;
    NowPlayingOutcome::Announced
}

/// Down alerts repeat on every run; the recovery message fires once per
/// down-to-up transition.
pub async fn stream_status_task(
    config: &Config,
    services: &Services,
    session: &mut Session,
) -> StatusOutcome {
    match services.store.read_status() {
        Ok(marker) => session.status = StreamState::from_marker(marker.as_deref()),
        Err(err) => warn!("using in-memory stream status: {:#}", err),
    }

    match services.probe.probe(&config.stream_url).await {
        Probe::Playing(_) => {
            let previous = session.status;
            if previous != StreamState::Online {
                set_status(services, session, StreamState::Online);
            }
            if previous == StreamState::Down {
                info!("stream recovered");
                notify(
                    config,
                    services,
                    &config.slack.status_channel,
                    RECOVERY_MESSAGE,
                    ROBOT_EMOJI,
                )
                .await;
                StatusOutcome::Recovered
            } else {
                StatusOutcome::Healthy
            }
        }
        Probe::Down(cause) => {
            warn!("stream is down: {}", cause.reason());
            set_status(services, session, StreamState::Down);
            notify(
                config,
                services,
                &config.slack.status_channel,
                &probe::diagnostic(cause),
                SKULL_EMOJI,
            )
            .await;
            StatusOutcome::Down(cause)
        }
    }
}

fn set_status(services: &Services, session: &mut Session, state: StreamState) {
    session.status = state;
    if let Some(marker) = state.marker() {
        if let Err(err) = services.store.write_status(marker) {
            warn!("failed to persist stream status: {:#}", err);
        }
    }
}

async fn notify(config: &Config, services: &Services, channel: &str, message: &str, icon: &str) {
    match services
        .slack
        .send(channel, message, &config.slack.username, icon)
        .await
    {
        Ok(confirmation) => debug!("{}", confirmation),
        Err(err) => warn!("failed to notify #{}: {}", channel, err),
    }
}

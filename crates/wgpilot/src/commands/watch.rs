//! `watch`: live peer view driven by a background poller.

use std::sync::Arc;
use std::time::Duration;

use owo_colors::OwoColorize;

use wgpilot_config::Settings;
use wgpilot_core::format::format_rate;
use wgpilot_core::{
    AdaptiveClient, PeerListPoller, PeerSnapshot, PollerState, PollingPolicy, StopReason,
};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

use super::peers;

fn render(snapshot: &PeerSnapshot, global: &GlobalOpts, color: bool, header: bool) -> String {
    match global.output {
        OutputFormat::Table if header => {
            let s = &snapshot.stats;
            let summary = format!(
                "{}  peers {}  online {}  down {}  up {}",
                snapshot.fetched_at.format("%H:%M:%S"),
                s.total_count,
                s.online_count,
                format_rate(s.current_download_rate),
                format_rate(s.current_upload_rate),
            );
            let table = peers::render_peers(&snapshot.peers, &global.output, color);
            format!("{summary}\n{table}")
        }
        OutputFormat::Table | OutputFormat::Plain => {
            peers::render_peers(&snapshot.peers, &global.output, color)
        }
        ref format => output::render_single(format, snapshot, |_| String::new(), |_| String::new()),
    }
}

fn stale_notice(failures: u32, color: bool) -> String {
    let text = format!("data is stale: {failures} refreshes failed in a row");
    if color {
        text.yellow().to_string()
    } else {
        text
    }
}

fn logout_error(reason: &StopReason) -> CliError {
    match reason {
        StopReason::SessionExpired => CliError::SessionExpired,
        _ => CliError::AuthFailed {
            reason: "the server rejected every login format".into(),
        },
    }
}

pub async fn handle(
    client: AdaptiveClient,
    args: &WatchArgs,
    global: &GlobalOpts,
    settings: &Settings,
) -> Result<(), CliError> {
    let interval = args
        .interval
        .map_or_else(|| settings.poll_interval(), Duration::from_secs);
    follow(client, interval, args.count, global, settings.stale_after, true).await
}

/// Print every snapshot until Ctrl-C, `count` snapshots, or the session ends.
pub async fn follow(
    client: AdaptiveClient,
    interval: Duration,
    count: Option<usize>,
    global: &GlobalOpts,
    stale_after: u32,
    header: bool,
) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let poller = PeerListPoller::new(Arc::new(client)).with_stale_after(stale_after);
    let mut handle = poller.start(PollingPolicy::every(interval));
    let mut snapshots = handle.subscribe();
    let mut states = handle.subscribe_state();
    let mut shown = 0usize;
    let mut stale = false;

    let result = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break Ok(()),
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let snapshot = snapshots.borrow_and_update().clone();
                if let Some(snapshot) = snapshot {
                    output::print_output(&render(&snapshot, global, color, header), global.quiet);
                    shown += 1;
                    if count.is_some_and(|n| shown >= n) {
                        break Ok(());
                    }
                }
            }
            changed = states.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let state = states.borrow_and_update().clone();
                match &state {
                    PollerState::Stopped(StopReason::Failed(e)) => break Err(e.clone().into()),
                    PollerState::Stopped(reason) if reason.is_logout() => {
                        break Err(logout_error(reason));
                    }
                    PollerState::Stopped(_) => break Ok(()),
                    PollerState::Waiting { consecutive_failures, .. } => {
                        if state.is_stale() && !stale {
                            eprintln!("{}", stale_notice(*consecutive_failures, color));
                        }
                        stale = state.is_stale();
                    }
                    PollerState::Idle | PollerState::Polling | PollerState::Paused => {}
                }
            }
        }
    };

    handle.stop().await;
    result
}

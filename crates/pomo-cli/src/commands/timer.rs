use pomo_core::{get_interval, CancellationToken, Event, PomoError, State};
use tracing::{info, warn};

use super::RunArgs;

fn emit(event: &Event) {
    match serde_json::to_string(event) {
        Ok(json) => println!("{json}"),
        Err(e) => warn!(error = %e, "failed to encode event"),
    }
}

pub async fn start(args: &RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.interval_config()?;
    let interval = get_interval(&config)?;

    if interval.state == State::Running {
        eprintln!(
            "interval {} is already running; if its process has exited, run `pomo pause` first",
            interval.id
        );
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, cancelling interval");
                cancel.cancel();
            }
        })
    };

    let result = interval
        .start(
            &cancel,
            &config,
            |i| emit(&Event::started(i)),
            |i| emit(&Event::ticked(i)),
            |i| emit(&Event::completed(i)),
        )
        .await;
    ctrl_c.abort();
    result?;

    let last = config.storage().by_id(interval.id)?;
    if let Some(event) = Event::stopped(&last) {
        emit(&event);
    }
    Ok(())
}

pub fn pause(args: &RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.interval_config()?;
    let interval = match config.storage().last() {
        Ok(interval) => interval,
        Err(PomoError::NoIntervals) => {
            eprintln!("no interval running");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    match interval.pause(&config) {
        Ok(()) => {
            let paused = config.storage().by_id(interval.id)?;
            if let Some(event) = Event::stopped(&paused) {
                emit(&event);
            }
        }
        Err(PomoError::IntervalNotRunning) => eprintln!("no interval running"),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

pub fn status(args: &RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.interval_config()?;
    match config.storage().last() {
        Ok(interval) => println!("{}", serde_json::to_string_pretty(&Event::snapshot(&interval))?),
        Err(PomoError::NoIntervals) => eprintln!("no intervals yet"),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::debug;

/// Format an elapsed duration as `HH:MM:SS`; hours keep growing past 99
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Report the formatted time since now, once per `period`
///
/// The first report comes one period after the call. Aborting the returned
/// handle stops the ticker.
pub fn spawn_ticker<F>(period: Duration, mut on_tick: F) -> JoinHandle<()>
where
    F: FnMut(String) + Send + 'static,
{
    let started = Instant::now();

    tokio::spawn(async move {
        let mut interval = time::interval_at(started + period, period);

        loop {
            interval.tick().await;
            let elapsed = format_elapsed(started.elapsed());
            debug!("Elapsed {}", elapsed);
            on_tick(elapsed);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::ZERO), "00:00:00");
        assert_eq!(format_elapsed(Duration::from_millis(3999)), "00:00:03");
        assert_eq!(format_elapsed(Duration::from_secs(125)), "00:02:05");
        assert_eq!(format_elapsed(Duration::from_secs(3600 * 101 + 61)), "101:01:01");
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticker_reports_every_period() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let ticker = {
            let seen = Arc::clone(&seen);
            spawn_ticker(Duration::from_secs(1), move |elapsed| {
                seen.lock().unwrap().push(elapsed);
            })
        };

        time::sleep(Duration::from_millis(125_500)).await;
        ticker.abort();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 125);
        assert_eq!(seen.first().map(String::as_str), Some("00:00:01"));
        assert_eq!(seen.last().map(String::as_str), Some("00:02:05"));
    }
}

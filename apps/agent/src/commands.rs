//! Line-based commands standing in for tray menu clicks.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use modeguard_security_mode::SecurityLevel;
use modeguard_tray::TrayEvent;

/// Parses one input line. Blank or unknown input yields `None`.
pub fn parse_command(line: &str) -> Option<TrayEvent> {
    match line.trim().to_ascii_lowercase().as_str() {
        "" => None,
        "quit" | "exit" => Some(TrayEvent::QuitRequested),
        "refresh" => Some(TrayEvent::RefreshRequested),
        other => other
            .parse::<SecurityLevel>()
            .ok()
            .map(TrayEvent::LevelSelected),
    }
}

/// Forwards parsed commands from `input` until it ends or the receiver
/// goes away.
pub async fn read_commands<R>(input: R, events: mpsc::Sender<TrayEvent>)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match parse_command(&line) {
                Some(event) => {
                    if events.send(event).await.is_err() {
                        break;
                    }
                }
                None if line.trim().is_empty() => {}
                None => warn!(
                    input = %line.trim(),
                    "unknown command (expected off, dynamic, secure, fortress, refresh or quit)"
                ),
            },
            Ok(None) => {
                debug!("command input closed");
                break;
            }
            Err(e) => {
                warn!("failed to read command input: {e}");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_levels() {
        assert_eq!(
            parse_command("secure"),
            Some(TrayEvent::LevelSelected(SecurityLevel::Secure))
        );
        assert_eq!(
            parse_command("  Fortress\n"),
            Some(TrayEvent::LevelSelected(SecurityLevel::Fortress))
        );
    }

    #[test]
    fn parses_control_commands() {
        assert_eq!(parse_command("quit"), Some(TrayEvent::QuitRequested));
        assert_eq!(parse_command("EXIT"), Some(TrayEvent::QuitRequested));
        assert_eq!(parse_command("refresh"), Some(TrayEvent::RefreshRequested));
    }

    #[test]
    fn ignores_blank_and_unknown() {
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("   "), None);
        assert_eq!(parse_command("lockdown"), None);
    }

    #[tokio::test]
    async fn forwards_commands_in_order() {
        let input: &[u8] = b"dynamic\n\nbogus\nrefresh\nquit\n";
        let (tx, mut rx) = mpsc::channel(8);

        read_commands(input, tx).await;

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(
            events,
            vec![
                TrayEvent::LevelSelected(SecurityLevel::Dynamic),
                TrayEvent::RefreshRequested,
                TrayEvent::QuitRequested,
            ]
        );
    }

    #[tokio::test]
    async fn stops_when_receiver_dropped() {
        let input: &[u8] = b"off\nsecure\n";
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        // Returns instead of blocking on a closed channel.
        read_commands(input, tx).await;
    }
}

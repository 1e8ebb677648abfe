//! Interactive session: reads commands from stdin and prints outcomes.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use game_content::ContentFactory;
use game_core::{ClickOutcome, GameEvent, SessionSnapshot};
use runtime::{Event, Runtime, RuntimeHandle, Topic};

use crate::commands::{HELP, Request};
use crate::config::ClientConfig;

/// Composition root: content, runtime and the command loop.
pub struct App {
    config: ClientConfig,
    runtime: Runtime,
}

impl App {
    pub async fn build(config: ClientConfig) -> Result<Self> {
        let factory = ContentFactory::new(&config.content_dir);
        let content = factory
            .load_all()
            .with_context(|| format!("loading content from {}", factory.data_dir().display()))?;

        let seed = config.seed.unwrap_or_else(clock_seed);
        tracing::info!(seed, effects = content.catalog.len(), "content loaded");

        let runtime = Runtime::builder()
            .config(config.runtime_config(seed))
            .content(content)
            .build()
            .await?;

        Ok(Self { config, runtime })
    }

    pub fn handle(&self) -> RuntimeHandle {
        self.runtime.handle()
    }

    /// Run until `quit` or end of input, then shut the runtime down.
    pub async fn run(self) -> Result<()> {
        let handle = self.runtime.handle();
        let printers = [Topic::Effects, Topic::Layout]
            .map(|topic| spawn_printer(handle.subscribe(topic)));

        println!("{HELP}");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<Request>() {
                Ok(Request::Quit) => break,
                Ok(request) => {
                    if let Err(e) = self.execute(&handle, request).await {
                        tracing::warn!(error = %e, "command failed");
                        println!("error: {e:#}");
                    }
                }
                Err(e) => println!("{e}"),
            }
        }

        self.runtime.shutdown().await?;
        for printer in printers {
            printer.abort();
        }
        Ok(())
    }

    pub async fn execute(&self, handle: &RuntimeHandle, request: Request) -> Result<()> {
        match request {
            Request::Click(input) => print_outcome(&handle.click(input).await?),
            Request::Hit(region) => {
                let index = match region {
                    Some(index) => index,
                    None => handle.query_status().await?.target,
                };
                print_outcome(&handle.click_region(index).await?);
            }
            Request::Apply(id) => println!("{id}: {:?}", handle.apply_effect(id).await?),
            Request::Remove(id) => {
                let removed = handle.remove_effect(id).await?;
                println!("{id}: {}", if removed { "removed" } else { "not active" });
            }
            Request::Claim(kind) => {
                let amount = handle.claim_mystery_box(kind).await?;
                println!("claimed {amount} {kind}");
            }
            Request::Skill { name, level } => {
                let stored = handle.set_skill_level(&name, level).await?;
                println!("{name} is now level {stored}");
            }
            Request::Status => {
                let status = handle.query_status().await?;
                println!(
                    "t={}ms gold={} energy={} combo={} target={}/{} speed={:.2}",
                    status.now,
                    status.gold,
                    status.energy,
                    status.combo,
                    status.target,
                    status.regions,
                    status.rotation_speed,
                );
                for (id, remaining) in status.active {
                    match remaining {
                        Some(ms) => println!("  {id} ({ms}ms left)"),
                        None => println!("  {id}"),
                    }
                }
                if status.shield_charges > 0 {
                    println!("  shield x{}", status.shield_charges);
                }
                if status.star_power_clicks > 0 {
                    println!("  star power x{}", status.star_power_clicks);
                }
                if let Some(options) = status.mystery_box {
                    println!("  mystery box: {options:?}");
                }
            }
            Request::Save(path) => {
                let path = path.unwrap_or_else(|| self.config.default_save_path());
                save_snapshot(&handle.snapshot().await?, &path)?;
                println!("saved to {}", path.display());
            }
            Request::Load(path) => {
                let path = path.unwrap_or_else(|| self.config.default_save_path());
                handle.restore(load_snapshot(&path)?, true).await?;
                println!("loaded {}", path.display());
            }
            Request::Reset => {
                handle.reset().await?;
                println!("session reset");
            }
            Request::Help => println!("{HELP}"),
            Request::Quit => {}
        }
        Ok(())
    }
}

/// Writes a checksummed snapshot, creating parent directories.
pub fn save_snapshot(snapshot: &SessionSnapshot, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let bytes = snapshot.encode()?;
    std::fs::write(path, bytes)
        .with_context(|| format!("Failed to write snapshot {}", path.display()))
}

pub fn load_snapshot(path: &Path) -> Result<SessionSnapshot> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
    Ok(SessionSnapshot::decode(&bytes)?)
}

fn print_outcome(outcome: &ClickOutcome) {
    match outcome {
        ClickOutcome::Hit(report) => {
            let mut line = format!(
                "hit region {} accuracy {:.2} combo {} +{} gold",
                report.region, report.accuracy, report.combo, report.reward
            );
            if !report.flags.is_empty() {
                line.push_str(&format!(" {:?}", report.flags));
            }
            println!("{line}");
        }
        ClickOutcome::Miss { region, reason } => match region {
            Some(region) => println!("miss: region {region} ({reason})"),
            None => println!("miss ({reason})"),
        },
        ClickOutcome::Rejected(reason) => println!("rejected: {reason}"),
    }
}

fn spawn_printer(mut rx: broadcast::Receiver<Event>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(Event::Game { at_ms, event }) => {
                    if let Some(text) = describe(&event) {
                        println!("[{at_ms}ms] {text}");
                    }
                }
                Ok(Event::Session(_)) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "event printer lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

fn describe(event: &GameEvent) -> Option<String> {
    let text = match event {
        GameEvent::EffectApplied {
            id,
            polarity,
            duration_ms: Some(ms),
        } => format!("{polarity} {id} for {}s", ms / 1_000),
        GameEvent::EffectApplied { id, polarity, .. } => format!("{polarity} {id}"),
        GameEvent::EffectExpired { id, reason } => format!("{id} ended ({reason})"),
        GameEvent::EffectBlocked { id, charges_left } => {
            format!("shield blocked {id}, {charges_left} charges left")
        }
        GameEvent::MysteryBoxOffered { options } => {
            format!("mystery box: claim one of {options:?}")
        }
        GameEvent::RollResolved { label, kind, delta } => format!("{label}: {delta:+} {kind}"),
        GameEvent::LayoutChanged { target, .. } => format!("target moved to region {target}"),
        _ => return None,
    };
    Some(text)
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use game_core::ResourceKind;

    #[test]
    fn snapshot_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.bin");
        let snapshot = SessionSnapshot {
            resources: [(ResourceKind::Gold, 42)].into_iter().collect(),
            target_index: 3,
            ..SessionSnapshot::default()
        };

        save_snapshot(&snapshot, &path).unwrap();
        assert_eq!(load_snapshot(&path).unwrap(), snapshot);
    }

    #[test]
    fn corrupted_snapshot_file_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.bin");
        save_snapshot(&SessionSnapshot::default(), &path).unwrap();

        let mut bytes = std::fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        std::fs::write(&path, bytes).unwrap();

        assert!(load_snapshot(&path).is_err());
    }

    #[test]
    fn layout_and_effect_events_are_described() {
        assert_eq!(
            describe(&GameEvent::LayoutChanged {
                target: 4,
                bonus: vec![],
                secondary: vec![],
            }),
            Some("target moved to region 4".into())
        );
        assert_eq!(describe(&GameEvent::CriticalHit { reward: 3 }), None);
    }
}

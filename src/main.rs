//! quest-sim: load quest definitions, start them on one actor, and feed
//! JSON-lines signals from stdin. Lifecycle events are written to stdout as
//! JSON lines; logs go to stderr.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use tracing::{error, info, warn};

use quest_runtime::config::SimConfig;
use quest_runtime::{MissionLog, QuestAgent, QuestLibrary, QuestRegistry, Signal};

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("quest_runtime=info,quest_sim=info")
            }),
        )
        .init();

    let config = SimConfig::from_env();

    let mut library = QuestLibrary::new(&config.data_dir);
    if let Err(e) = library.load_all() {
        error!("Failed to load quest library: {}", e);
        std::process::exit(1);
    }

    let missions = Arc::new(MissionLog::new());
    let registry = QuestRegistry::global();
    let mut agent = QuestAgent::new(config.actor_id.clone())
        .with_registry(Arc::clone(&registry))
        .with_missions(missions.clone());

    agent.events().subscribe(|event| match serde_json::to_string(event) {
        Ok(line) => {
            let mut stdout = io::stdout().lock();
            if let Err(e) = writeln!(stdout, "{}", line) {
                warn!("Failed to write event: {}", e);
            }
        }
        Err(e) => warn!("Failed to serialize event: {}", e),
    });

    for definition in library.all() {
        agent.register_definition(Arc::clone(definition));
    }
    info!("Actor '{}' running {} quest(s)", agent.actor_id(), agent.len());

    for (line_no, line) in io::stdin().lock().lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to read stdin: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let signal: Signal = match serde_json::from_str(&line) {
            Ok(signal) => signal,
            Err(e) => {
                warn!("Skipping malformed signal on line {}: {}", line_no + 1, e);
                continue;
            }
        };

        // Quests this actor doesn't own may still be hosted elsewhere in the registry
        let handled = if agent.runtime(signal.quest_id()).is_some() {
            agent.try_handle_signal(&signal)
        } else {
            registry.raise_trigger(&signal)
        };
        if !handled {
            info!(
                "Signal {} for quest '{}' did not progress anything",
                signal.signal_type(),
                signal.quest_id()
            );
        }
    }

    for snapshot in agent.snapshots() {
        info!(
            "Quest '{}': {}{}",
            snapshot.quest_id,
            snapshot.status.as_str(),
            snapshot
                .current_step
                .map(|s| format!(" (step '{}')", s))
                .unwrap_or_default()
        );
    }
    for mission in missions.all() {
        info!("Mission '{}' ({}): {:?}", mission.title, mission.id, mission.status);
    }
}

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use raidline_core::{
    ApiClient, DutyProvider, EngineConfig, FightContext, FightRecord, FightSnapshot, GameEvent,
    RecordSink, RuleEngine, load_descriptor_from_file,
};

const CONFIG_NAME: &str = "raidline";

pub fn check(path: &Path) -> Result<(), String> {
    let descriptor = load_descriptor_from_file(path).map_err(|e| e.to_string())?;
    println!(
        "{} (zone {}): {} variables, {} mechanics, {} phases - ok",
        display_name(&descriptor.name, &descriptor.name_en),
        descriptor.zone_id,
        descriptor.variables.len(),
        descriptor.mechanics.len(),
        descriptor.timeline.phases.len(),
    );
    Ok(())
}

pub fn replay(duty: &Path, events: &Path, json_only: bool) -> Result<(), String> {
    let descriptor = load_descriptor_from_file(duty).map_err(|e| e.to_string())?;
    let mut context = FightContext::new(Arc::new(descriptor));

    let content = fs::read_to_string(events)
        .map_err(|e| format!("failed to read {}: {e}", events.display()))?;

    let mut last = context.snapshot();
    if !json_only {
        print_snapshot(&last);
    }

    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let event: GameEvent = serde_json::from_str(line)
            .map_err(|e| format!("bad event on line {}: {e}", line_no + 1))?;

        let record = context.process_event(&event);

        let snapshot = context.snapshot();
        if !json_only && *snapshot != *last {
            print_snapshot(&snapshot);
            last = snapshot;
        }

        if let Some(record) = record {
            let rendered = serde_json::to_string_pretty(&record).map_err(|e| e.to_string())?;
            println!("{rendered}");
        }
    }

    Ok(())
}

/// Drive a live engine from a stream of decoded events, one JSON object per
/// stdin line. Descriptor fetches and the final record upload go to the
/// configured endpoints; snapshot changes are printed as they happen.
pub async fn run() -> Result<(), String> {
    let config: EngineConfig = confy::load(CONFIG_NAME, None).map_err(|e| e.to_string())?;
    let client = Arc::new(ApiClient::new(&config.api).map_err(|e| e.to_string())?);
    let engine = RuleEngine::with_history_limit(
        Arc::clone(&client) as Arc<dyn DutyProvider>,
        client as Arc<dyn RecordSink>,
        config.event_history_limit,
    );

    let mut snapshots = engine.subscribe();
    let printer = tokio::spawn(async move {
        while snapshots.changed().await.is_ok() {
            let snapshot = snapshots.borrow_and_update().clone();
            print_snapshot(&snapshot);
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.map_err(|e| e.to_string())? {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<GameEvent>(&line) {
            Ok(event) => {
                engine.post_event(event);
            }
            Err(error) => tracing::warn!(%error, "skipping undecodable event line"),
        }
    }

    engine.finish().await;
    printer.abort();
    Ok(())
}

pub async fn fetch(zone_id: u32) -> Result<(), String> {
    let client = api_client()?;
    match client.fetch_duty(zone_id).await {
        Some(descriptor) => {
            descriptor.validate().map_err(|e| e.to_string())?;
            let rendered =
                serde_json::to_string_pretty(&descriptor).map_err(|e| e.to_string())?;
            println!("{rendered}");
            Ok(())
        }
        None => Err(format!("no timeline found for zone {zone_id}")),
    }
}

pub async fn upload(path: &Path) -> Result<(), String> {
    let content =
        fs::read_to_string(path).map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    let record: FightRecord = serde_json::from_str(&content).map_err(|e| e.to_string())?;

    let client = api_client()?;
    if client.upload_fight(&record).await {
        println!("fight record accepted");
        Ok(())
    } else {
        Err("upload failed on every endpoint".to_string())
    }
}

fn api_client() -> Result<ApiClient, String> {
    let config: EngineConfig = confy::load(CONFIG_NAME, None).map_err(|e| e.to_string())?;
    ApiClient::new(&config.api).map_err(|e| e.to_string())
}

fn display_name<'a>(name: &'a str, name_en: &'a str) -> &'a str {
    if name_en.is_empty() { name } else { name_en }
}

fn print_snapshot(snapshot: &FightSnapshot) {
    let checkpoints: Vec<String> = snapshot
        .checkpoints
        .iter()
        .map(|c| format!("{}{}", if c.completed { "[x] " } else { "[ ] " }, c.name))
        .collect();

    let mut variables: Vec<String> = snapshot
        .variables
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect();
    variables.sort();

    println!(
        "phase: {} | subphase: {} | {} | {}",
        snapshot.phase,
        if snapshot.subphase.is_empty() {
            "-"
        } else {
            snapshot.subphase.as_str()
        },
        if checkpoints.is_empty() {
            "no checkpoints".to_string()
        } else {
            checkpoints.join(", ")
        },
        if variables.is_empty() {
            "no variables".to_string()
        } else {
            variables.join(", ")
        },
    );
}

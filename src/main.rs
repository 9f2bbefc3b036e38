use std::path::Path;
use std::time::Duration;

use glam::Vec3;
use progression_engine::encounter::DamageOutcome;
use progression_engine::events::drain;
use progression_engine::{Engine, EngineConfig, EngineEvent};
use tracing::{error, info, warn};

const DEFAULT_CONFIG_PATH: &str = "engine.toml";

/// Enemies get a swing back every this many ticks
const STRIKE_EVERY_TICKS: u64 = 4;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("progression_engine=info")),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let config = match EngineConfig::load(Path::new(&config_path)) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let mut engine = Engine::new(config.clone());
    let mut events = engine.subscribe();

    if let Err(e) = engine.load_content(&config.session.data_dir) {
        error!("Failed to load content: {}", e);
        std::process::exit(1);
    }

    for quest_id in engine.quests().all_ids() {
        if engine.can_accept(&quest_id) {
            engine.accept_quest(&quest_id);
        }
    }

    let tick_ms = config.session.tick_ms.max(1);
    let total_ticks = config.session.duration_secs * 1000 / tick_ms;
    info!(
        "Running session for {}s ({} ticks of {}ms)",
        config.session.duration_secs, total_ticks, tick_ms
    );

    let mut interval = tokio::time::interval(Duration::from_millis(tick_ms));
    for tick in 0..total_ticks {
        interval.tick().await;
        engine.advance_by(tick_ms);

        walk_dialogue(&mut engine);
        fight_nearest(&mut engine, tick % STRIKE_EVERY_TICKS == 0);

        for event in drain(&mut events) {
            log_event(&event);
        }

        if !engine.stats().is_alive() {
            warn!("Player was defeated at tick {}", tick);
            break;
        }
    }

    let stats = engine.stats();
    info!(
        "Session over: level {} ({} xp, {} to next), {} currency, {} item types",
        stats.level,
        stats.experience,
        engine.ledger().xp_to_next_level(),
        stats.currency,
        engine.inventory().len()
    );

    match engine.save_json() {
        Ok(json) => println!("{}", json),
        Err(e) => error!("{}", e),
    }
}

/// Take the first available choice on the displayed dialogue node
fn walk_dialogue(engine: &mut Engine) {
    let choice = engine
        .available_choices()
        .into_iter()
        .find(|c| c.available)
        .map(|c| c.index);
    match choice {
        Some(index) => {
            engine.advance_dialogue(index);
        }
        None if engine.current_dialogue().is_some() => engine.close_dialogue(),
        None => {}
    }
}

/// Hit the closest enemy to the origin; it may swing back if it survives
fn fight_nearest(engine: &mut Engine, enemy_turn: bool) {
    let Some(target) = engine.nearest_enemy(Vec3::ZERO).map(|e| e.id.clone()) else {
        return;
    };
    if let DamageOutcome::Wounded { .. } = engine.attack_enemy(&target) {
        if enemy_turn {
            engine.enemy_strike(&target);
        }
    }
}

fn log_event(event: &EngineEvent) {
    let payload = serde_json::to_string(event).unwrap_or_default();
    match event {
        EngineEvent::StatsChanged { .. } | EngineEvent::EnemyDamaged { .. } => {
            tracing::debug!("{}", payload)
        }
        _ => info!("{}", payload),
    }
}

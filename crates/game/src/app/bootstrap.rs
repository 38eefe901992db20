use std::path::PathBuf;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const TPS_ENV_VAR: &str = "ADVENTURE_TPS";
const SCENE_ENV_VAR: &str = "ADVENTURE_SCENE";
const SPEED_ENV_VAR: &str = "ADVENTURE_PLAYER_SPEED";
const DEFAULT_SCENE_ID: &str = "village";

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LoopConfig {
    pub(crate) target_tps: u32,
    pub(crate) scene_id: String,
    pub(crate) player_speed_override: Option<f32>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            scene_id: DEFAULT_SCENE_ID.to_string(),
            player_speed_override: None,
        }
    }
}

impl LoopConfig {
    pub(crate) fn fixed_dt_seconds(&self) -> f32 {
        1.0 / self.target_tps.max(1) as f32
    }
}

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) session_path: Option<PathBuf>,
}

pub(crate) fn build_app() -> AppWiring {
    init_tracing();
    info!("=== Adventure Startup ===");

    let config = LoopConfig {
        target_tps: parse_env_or(TPS_ENV_VAR, |raw| {
            raw.parse::<u32>().ok().filter(|tps| *tps > 0)
        })
        .unwrap_or(LoopConfig::default().target_tps),
        scene_id: parse_env_or(SCENE_ENV_VAR, |raw| {
            Some(raw.trim().to_string()).filter(|id| !id.is_empty())
        })
        .unwrap_or_else(|| DEFAULT_SCENE_ID.to_string()),
        player_speed_override: parse_env_or(SPEED_ENV_VAR, |raw| {
            raw.parse::<f32>()
                .ok()
                .filter(|speed| speed.is_finite() && *speed > 0.0)
        }),
    };
    let session_path = std::env::args_os().nth(1).map(PathBuf::from);
    info!(
        target_tps = config.target_tps,
        scene = %config.scene_id,
        speed_override = ?config.player_speed_override,
        session = ?session_path,
        "loop_config_resolved"
    );

    AppWiring {
        config,
        session_path,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

/// `None` when the variable is unset or its value is rejected by `parse`.
fn parse_env_or<T>(var: &'static str, parse: impl FnOnce(&str) -> Option<T>) -> Option<T> {
    let raw = std::env::var(var).ok()?;
    let parsed = parse(&raw);
    if parsed.is_none() {
        warn!(var, value = %raw, "env_override_ignored");
    }
    parsed
}

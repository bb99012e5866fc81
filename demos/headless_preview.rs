//! Headless avatar preview.
//!
//! Loads the stage, optionally swaps in a dropped motion file, then runs a
//! fixed 30 fps clock for a few seconds and logs where each avatar's root
//! joint ends up.
//!
//! ```text
//! cargo run --example headless_preview -- [stage.json] [motion.fbx|motion.glb]
//! ```

use std::path::Path;

use anyhow::Context;
use myth_avatar::{AvatarStage, FrameClock, StageConfig};

const PREVIEW_SECONDS: u64 = 3;
const FPS: u32 = 30;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1).peekable();
    let config = match args.next_if(|a| a.ends_with(".json")) {
        Some(path) => StageConfig::from_file(&path)
            .with_context(|| format!("reading stage config {path}"))?,
        None => StageConfig::default(),
    };
    let motion_file = args.next();

    let stage = AvatarStage::from_config(config);
    if let Err(e) = stage.load().await {
        log::warn!("Stage loaded with errors: {e}");
    }

    if let Some(path) = motion_file {
        let bytes = tokio::fs::read(&path)
            .await
            .with_context(|| format!("reading motion file {path}"))?;
        let hint = Path::new(&path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_string();
        match stage.set_motion_source(bytes, &hint).await {
            Ok(update) => log::info!("Dropped motion applied: {}", update.is_applied()),
            Err(e) => log::error!("Dropped motion rejected: {e}"),
        }
    }

    let mut clock = FrameClock::fixed_fps(FPS);
    let frames = PREVIEW_SECONDS * u64::from(FPS);
    for _ in 0..frames {
        stage.tick(clock.tick());

        if clock.frame_count % u64::from(FPS) == 0 {
            report(&stage, clock.elapsed.as_secs_f32());
        }
    }

    Ok(())
}

fn report(stage: &AvatarStage, elapsed: f32) {
    let controller = stage.controller();
    for key in stage.avatars() {
        let line = controller.with_instance(key, |instance| {
            let skeleton = &instance.mesh().skeleton;
            let root = skeleton
                .root()
                .and_then(|j| skeleton.joint(j))
                .and_then(|joint| instance.world_matrices().get(joint.node).copied())
                .map(|m| m.translation);
            format!(
                "{:>8} {:?} t={:?} root={root:?}",
                instance.name(),
                instance.state(),
                instance.time(),
            )
        });
        if let Some(line) = line {
            log::info!("[{elapsed:5.2}s] {line}");
        }
    }
}

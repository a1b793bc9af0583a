//! Headless event-driven rendering.
//!
//! Frames are a pure function of the scene, the event script, and the
//! pre-integrated maps: the animation clock runs on event timestamps, never
//! the wall clock, so two runs of the same inputs produce byte-identical
//! frame dumps. The loop slides the event window forward and exits when the
//! script is exhausted.

use crate::app::config::ViewerConfig;
use crate::app::runtime::SceneRuntime;
use crate::errors::Result;
use crate::events::{EventKind, EventScript};
use crate::render::{self, GpuContext, HeadlessTarget, Renderer};

const MICROS: f64 = 1e-6;

pub fn run(config: &ViewerConfig) -> Result<()> {
    let mut runtime = SceneRuntime::load(
        &config.scene,
        config.camera.as_deref(),
        config.culling,
    )?;
    let mut script = match &config.events {
        Some(path) => EventScript::load(path)?,
        None => EventScript::default(),
    };

    let ctx = GpuContext::new_blocking(config.device.as_deref())?;
    let target = HeadlessTarget::new(&ctx, config.width, config.height);
    let mut renderer = Renderer::new(
        &ctx,
        render::HEADLESS_FORMAT,
        &runtime.graph,
        &runtime.meshes,
        &runtime.materials,
    )?;

    while !script.finished() {
        // Deterministic time base: the next pending event's own timestamp.
        let Some(now) = script.next_time() else {
            break;
        };
        let ready: Vec<_> = script.take_ready(now).to_vec();
        for event in ready {
            let now_secs = event.time as f64 * MICROS;
            match event.kind {
                EventKind::Available => {
                    render_one(&ctx, &mut runtime, &mut renderer, &target, now_secs)?;
                }
                EventKind::Play { start, rate } => {
                    runtime.graph.clock.play(start, rate as f32, now_secs);
                    render_one(&ctx, &mut runtime, &mut renderer, &target, now_secs)?;
                }
                EventKind::Save { path } => {
                    render_one(&ctx, &mut runtime, &mut renderer, &target, now_secs)?;
                    let pixels = target.read_rgba(&ctx)?;
                    render::write_ppm(&path, target.width, target.height, &pixels)?;
                    log::info!("saved frame to {}", path.display());
                }
                EventKind::Mark { text } => {
                    println!("{text}");
                }
            }
        }
    }
    Ok(())
}

fn render_one(
    ctx: &GpuContext,
    runtime: &mut SceneRuntime,
    renderer: &mut Renderer,
    target: &HeadlessTarget,
    now_secs: f64,
) -> Result<()> {
    let time = runtime.graph.clock.time(now_secs);
    runtime.update(time);
    renderer.render(
        ctx,
        &runtime.graph,
        &mut runtime.meshes,
        runtime.camera_index,
        runtime.culling,
        &target.color_view,
        &target.depth_view,
    )
}

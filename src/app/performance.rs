//! Performance measurement mode: render N frames off-screen and report the
//! mean frame time in microseconds on standard output.

use std::time::Instant;

use crate::app::config::ViewerConfig;
use crate::app::runtime::SceneRuntime;
use crate::errors::Result;
use crate::render::{self, GpuContext, HeadlessTarget, Renderer};

pub fn run(config: &ViewerConfig, frames: u32) -> Result<()> {
    let mut runtime = SceneRuntime::load(
        &config.scene,
        config.camera.as_deref(),
        config.culling,
    )?;

    let ctx = GpuContext::new_blocking(config.device.as_deref())?;
    let target = HeadlessTarget::new(&ctx, config.width, config.height);
    let mut renderer = Renderer::new(
        &ctx,
        render::HEADLESS_FORMAT,
        &runtime.graph,
        &runtime.meshes,
        &runtime.materials,
    )?;

    let mut total_micros = 0.0f64;
    for frame in 0..frames {
        runtime.update(runtime.graph.clock.time(0.0));

        let before = Instant::now();
        renderer.render(
            &ctx,
            &runtime.graph,
            &mut runtime.meshes,
            runtime.camera_index,
            runtime.culling,
            &target.color_view,
            &target.depth_view,
        )?;
        // Drain the queue so the measurement covers GPU work too.
        let _ = ctx.device.poll(wgpu::PollType::Wait);
        total_micros += before.elapsed().as_secs_f64() * 1e6;

        log::debug!("frame {frame} done");
    }

    println!("{:.2}", total_micros / f64::from(frames.max(1)));
    Ok(())
}

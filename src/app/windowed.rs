//! Interactive windowed mode.
//!
//! A winit `ApplicationHandler` that creates the window and GPU state on
//! resume, walks the scene with the wall clock, and maps keyboard input to
//! the movable cameras: W/S dolly, arrow keys pitch and yaw, R refocuses on
//! the origin, Tab cycles cameras, Space toggles animation playback.

use std::sync::Arc;
use std::time::Instant;

use winit::application::ApplicationHandler;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowId};

use crate::app::config::ViewerConfig;
use crate::app::runtime::SceneRuntime;
use crate::errors::Result;
use crate::render::{GpuContext, Renderer, SurfaceTarget};

pub fn run(config: &ViewerConfig) -> Result<()> {
    let runtime = SceneRuntime::load(
        &config.scene,
        config.camera.as_deref(),
        config.culling,
    )?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = ViewerApp {
        config: config.clone(),
        runtime,
        window: None,
        gpu: None,
        start: Instant::now(),
    };
    event_loop.run_app(&mut app)?;
    Ok(())
}

struct GpuState {
    ctx: GpuContext,
    target: SurfaceTarget,
    renderer: Renderer,
}

struct ViewerApp {
    config: ViewerConfig,
    runtime: SceneRuntime,
    window: Option<Arc<Window>>,
    gpu: Option<GpuState>,
    start: Instant,
}

impl ViewerApp {
    fn init_gpu(&mut self, window: Arc<Window>) -> Result<GpuState> {
        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| crate::errors::HeliosError::BackendInit(e.to_string()))?;

        let ctx = pollster::block_on(GpuContext::from_instance(
            instance,
            self.config.device.as_deref(),
            Some(&surface),
        ))?;

        let size = window.inner_size();
        let target = SurfaceTarget::new(&ctx, surface, size.width, size.height)?;
        let renderer = Renderer::new(
            &ctx,
            target.config.format,
            &self.runtime.graph,
            &self.runtime.meshes,
            &self.runtime.materials,
        )?;
        Ok(GpuState {
            ctx,
            target,
            renderer,
        })
    }

    fn render_frame(&mut self) {
        let Some(gpu) = &mut self.gpu else {
            return;
        };
        // Minimized windows suspend rendering until they regain extent.
        if gpu.target.config.width == 0 || gpu.target.config.height == 0 {
            return;
        }

        let now = self.start.elapsed().as_secs_f64();
        let time = self.runtime.graph.clock.time(now);
        self.runtime.update(time);

        let Some(frame) = gpu.target.acquire(&gpu.ctx) else {
            return;
        };
        let color_view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        if let Err(e) = gpu.renderer.render(
            &gpu.ctx,
            &self.runtime.graph,
            &mut self.runtime.meshes,
            self.runtime.camera_index,
            self.runtime.culling,
            &color_view,
            &gpu.target.depth_view,
        ) {
            log::error!("frame failed: {e}");
        }
        frame.present();
    }

    fn handle_key(&mut self, event: &KeyEvent) {
        if event.state != ElementState::Pressed {
            return;
        }
        let now = self.start.elapsed().as_secs_f64();
        let camera = &mut self.runtime.graph.cameras[self.runtime.camera_index];
        match &event.logical_key {
            Key::Character(c) if c.eq_ignore_ascii_case("w") => camera.dolly(true),
            Key::Character(c) if c.eq_ignore_ascii_case("s") => camera.dolly(false),
            Key::Character(c) if c.eq_ignore_ascii_case("r") => camera.refocus(),
            Key::Named(NamedKey::ArrowUp) => camera.pitch(true),
            Key::Named(NamedKey::ArrowDown) => camera.pitch(false),
            Key::Named(NamedKey::ArrowLeft) => camera.yaw(false),
            Key::Named(NamedKey::ArrowRight) => camera.yaw(true),
            Key::Named(NamedKey::Tab) => self.runtime.cycle_camera(),
            Key::Named(NamedKey::Space) => {
                let clock = &mut self.runtime.graph.clock;
                if clock.is_playing() {
                    clock.pause(now);
                } else {
                    clock.resume(now);
                }
            }
            _ => {}
        }
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attributes = Window::default_attributes()
            .with_title("helios")
            .with_inner_size(winit::dpi::PhysicalSize::new(
                self.config.width,
                self.config.height,
            ));
        let window = match event_loop.create_window(attributes) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                log::error!("window creation failed: {e}");
                event_loop.exit();
                return;
            }
        };

        match self.init_gpu(window.clone()) {
            Ok(gpu) => {
                self.window = Some(window);
                self.gpu = Some(gpu);
                self.start = Instant::now();
            }
            Err(e) => {
                log::error!("GPU initialization failed: {e}");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(gpu) = &mut self.gpu {
                    gpu.target.resize(&gpu.ctx, size.width, size.height);
                }
            }
            WindowEvent::KeyboardInput { event, .. } => self.handle_key(&event),
            WindowEvent::RedrawRequested => {
                self.render_frame();
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

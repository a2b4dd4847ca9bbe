mod window;

use anyhow::{Context, Result};
use clap::Parser;
use prism_common::{Extent2d, SandboxConfig, TickTimer, Viewport};
use prism_gpu::{ContextDesc, GraphicsContext, PresentMode, verify};
use prism_input::{InputState, KeyCode};
use prism_render::{FlyCamera, RenderError, Renderer, ShaderBlobs};
use prism_render_wgpu::{Wgpu, WgpuAdapter, WgpuSurface, builtin_shaders};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{DeviceEvent, DeviceId, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::window::{WindowAction, WindowState};

#[derive(Parser)]
#[command(name = "prism-desktop", about = "Prism cube sandbox")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// JSON sandbox configuration
    #[arg(short, long)]
    config: Option<PathBuf>,
}

/// GPU failures abort; anything else is reported to the caller.
fn fatal_on_gpu<T>(result: Result<T, RenderError>) -> Result<T> {
    match result {
        Ok(value) => Ok(value),
        Err(RenderError::Gpu(err)) => Ok(verify(Err(err))),
        Err(err) => Err(err.into()),
    }
}

/// Everything that exists only while the window does.
struct Sandbox {
    renderer: Renderer<Wgpu>,
    window_state: WindowState,
    window: Arc<Window>,
}

struct App {
    config: SandboxConfig,
    sandbox: Option<Sandbox>,
    input: InputState,
    camera: FlyCamera,
    timer: TickTimer,
    error: Option<anyhow::Error>,
}

impl App {
    fn new(config: SandboxConfig) -> Self {
        Self {
            config,
            sandbox: None,
            input: InputState::new(),
            camera: FlyCamera::default(),
            timer: TickTimer::new(),
            error: None,
        }
    }

    fn create_sandbox(&self, event_loop: &ActiveEventLoop) -> Result<Sandbox> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));
        let window = Arc::new(event_loop.create_window(attrs)?);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = WgpuSurface::new(
            instance
                .create_surface(Arc::clone(&window))
                .context("create surface")?,
        );
        let adapter = verify(WgpuAdapter::request(&instance, Some(&surface)));

        let size = window.inner_size();
        let extent = Extent2d::new(size.width, size.height);
        let ctx = verify(GraphicsContext::new(
            &adapter,
            &surface,
            &ContextDesc {
                extent: extent.clamped(),
                buffer_count: self.config.buffer_count,
                present_mode: if self.config.vsync {
                    PresentMode::Vsync
                } else {
                    PresentMode::Immediate
                },
                ..ContextDesc::default()
            },
        ));

        let shaders = match ShaderBlobs::load(&self.config.shader_dir) {
            Ok(shaders) => shaders,
            Err(err) => {
                tracing::warn!("{err}; using built-in shaders");
                builtin_shaders()
            }
        };
        let renderer = fatal_on_gpu(Renderer::new(ctx, &shaders, self.config.clear_color))?;

        Ok(Sandbox {
            renderer,
            window_state: WindowState::new(extent),
            window,
        })
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        self.timer.update();
        if self.input.is_key_down(KeyCode::Escape) {
            event_loop.exit();
            return Ok(());
        }
        let Some(sandbox) = self.sandbox.as_mut() else {
            return Ok(());
        };
        if !sandbox.window_state.should_render() {
            return Ok(());
        }

        let resolution = sandbox.renderer.context().render_resolution();
        self.camera
            .set_aspect_ratio(Viewport::from_extent(resolution).aspect_ratio());
        self.camera.update(&mut self.input, self.timer.timestep());

        fatal_on_gpu(sandbox.renderer.render(&self.camera))?;
        let outcome = fatal_on_gpu(sandbox.renderer.present())?;
        if outcome.blocked {
            tracing::trace!(frame = outcome.frame, "waited for back buffer {}", outcome.back_buffer);
        }

        sandbox.window.set_cursor_visible(self.input.cursor_visible());
        self.input.begin_frame();
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        tracing::error!("{err:#}");
        self.error = Some(err);
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.sandbox.is_some() {
            return;
        }
        match self.create_sandbox(event_loop) {
            Ok(sandbox) => {
                tracing::info!(
                    adapter = %sandbox.renderer.context().info().name,
                    buffers = sandbox.renderer.context().buffer_count(),
                    "sandbox ready"
                );
                self.sandbox = Some(sandbox);
            }
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        self.input.handle_window_event(&event);

        let Some(sandbox) = self.sandbox.as_mut() else {
            return;
        };
        match sandbox.window_state.handle_event(&event) {
            WindowAction::Close => {
                event_loop.exit();
                return;
            }
            WindowAction::Resize(extent) => {
                let resized = sandbox.renderer.resize(extent.width, extent.height);
                if let Err(err) = fatal_on_gpu(resized) {
                    self.fail(event_loop, err);
                    return;
                }
            }
            WindowAction::None => {}
        }

        if let WindowEvent::RedrawRequested = event {
            if let Err(err) = self.redraw(event_loop) {
                self.fail(event_loop, err);
            }
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        self.input.handle_device_event(&event);
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(sandbox) = &self.sandbox else {
            event_loop.set_control_flow(ControlFlow::Wait);
            return;
        };
        event_loop.set_control_flow(sandbox.window_state.control_flow());
        if sandbox.window_state.should_render() {
            sandbox.window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(mut sandbox) = self.sandbox.take() {
            verify(sandbox.renderer.context_mut().shutdown());
            tracing::info!(frames = sandbox.renderer.frames_rendered(), "sandbox shut down");
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let config = match &cli.config {
        Some(path) => SandboxConfig::load(path)
            .with_context(|| format!("load config {}", path.display()))?,
        None => SandboxConfig::default(),
    };
    tracing::info!("prism-desktop starting");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

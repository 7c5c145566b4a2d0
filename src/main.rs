/// Main application entry point
/// Interactive window or headless PNG rendering of the demo scene
use anyhow::{Context, Result};
use clap::Parser;
use mimalloc::MiMalloc;
use soft_renderer::*;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;
use winit::{
    event::*,
    event_loop::{ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::WindowBuilder,
};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser, Debug)]
#[command(name = "soft_renderer", about = "Multi-threaded CPU triangle rasterizer")]
struct Args {
    /// JSON render config; command-line flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    width: Option<usize>,

    #[arg(long)]
    height: Option<usize>,

    /// Use the quad-tree depth buffer
    #[arg(long)]
    hierarchical: bool,

    /// Worker threads (defaults to available parallelism)
    #[arg(long)]
    threads: Option<usize>,

    /// Skip the coarse clip test
    #[arg(long)]
    no_clip: bool,

    /// Gamma-correct fragment colors
    #[arg(long)]
    gamma: bool,

    /// Render without a window and write the last frame to `--output`
    #[arg(long)]
    headless: bool,

    #[arg(long, default_value_t = 1)]
    frames: u32,

    #[arg(long, default_value = "frame.png")]
    output: PathBuf,
}

impl Args {
    fn render_config(&self) -> Result<RenderConfig> {
        let mut config = match &self.config {
            Some(path) => RenderConfig::from_json_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => RenderConfig::default(),
        };
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(threads) = self.threads {
            config.worker_threads = Some(threads);
        }
        config.hierarchical_depth |= self.hierarchical;
        config.clip &= !self.no_clip;
        config.gamma |= self.gamma;
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = args.render_config()?;
    let threads = config.worker_threads.unwrap_or_else(parallel::default_thread_count);
    let executor = Arc::new(TaskExecutor::new(threads).context("starting worker pool")?);
    tracing::info!(threads, ?config, "renderer starting");

    let result = if args.headless {
        run_headless(config, Arc::clone(&executor), args.frames, &args.output)
    } else {
        run_windowed(config, Arc::clone(&executor))
    };
    executor.shutdown();
    result
}

fn run_headless(config: RenderConfig, executor: Arc<TaskExecutor>, frames: u32, output: &Path) -> Result<()> {
    let scene = Scene::demo(config.aspect_ratio());
    let renderer = SoftRenderer::new(config, executor)?;
    let mut frame_stats = FrameStats::default();
    let mut last = RenderStats::default();

    for _ in 0..frames.max(1) {
        let start = Instant::now();
        renderer.clear_frame_buffer();
        last = renderer.render_scene(&scene, ShadingConfig::default())?;
        frame_stats.record(start.elapsed());
    }
    tracing::info!(
        triangles = last.triangles,
        culled = last.culled,
        clipped = last.clipped,
        rasterized = last.rasterized,
        "last frame"
    );
    frame_stats.flush();
    FUNCTION_COUNTERS.snapshot().log();

    let frame = renderer.frame();
    let image = image::RgbaImage::from_raw(frame.width() as u32, frame.height() as u32, frame.to_rgba_bytes())
        .context("frame buffer does not match image size")?;
    image
        .save(output)
        .with_context(|| format!("writing {}", output.display()))?;
    tracing::info!(path = %output.display(), "frame written");
    Ok(())
}

fn run_windowed(config: RenderConfig, executor: Arc<TaskExecutor>) -> Result<()> {
    tracing::info!("controls: WASD move, Space/Shift up/down, click + mouse look, H depth buffer, Esc exit");

    let event_loop = EventLoop::new().context("creating event loop")?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("Soft Renderer")
            .with_inner_size(winit::dpi::PhysicalSize::new(config.width as u32, config.height as u32))
            .build(&event_loop)
            .context("creating window")?,
    );

    let context = softbuffer::Context::new(window.clone())
        .map_err(|err| anyhow::anyhow!("softbuffer context: {err}"))?;
    let mut surface = softbuffer::Surface::new(&context, window.clone())
        .map_err(|err| anyhow::anyhow!("softbuffer surface: {err}"))?;

    let size = window.inner_size();
    let mut config = config;
    config.width = (size.width as usize).max(1);
    config.height = (size.height as usize).max(1);

    let mut scene = Scene::demo(config.aspect_ratio());
    let mut renderer = SoftRenderer::new(config, executor)?;
    let mut controller = CameraController::new();

    let mut last_frame = Instant::now();
    let mut stats_timer = Instant::now();
    let mut frame_stats = FrameStats::default();
    let mut mouse_captured = false;
    let mut last_mouse_pos: Option<(f64, f64)> = None;

    event_loop
        .run(move |event, elwt| {
            elwt.set_control_flow(ControlFlow::Poll);

            match event {
                Event::WindowEvent { event, .. } => match event {
                    WindowEvent::CloseRequested => elwt.exit(),
                    WindowEvent::Resized(new_size) => {
                        if new_size.width == 0 || new_size.height == 0 {
                            return;
                        }
                        let (w, h) = (new_size.width as usize, new_size.height as usize);
                        if let Err(err) = renderer.create_frame_buffer(w, h) {
                            tracing::error!(%err, "resize failed");
                            elwt.exit();
                            return;
                        }
                        scene.camera.set_aspect_ratio(w as f32 / h as f32);
                    }
                    WindowEvent::KeyboardInput { event, .. } => {
                        let pressed = event.state == ElementState::Pressed;
                        if let PhysicalKey::Code(keycode) = event.physical_key {
                            match keycode {
                                KeyCode::KeyW => controller.forward = pressed,
                                KeyCode::KeyS => controller.backward = pressed,
                                KeyCode::KeyA => controller.left = pressed,
                                KeyCode::KeyD => controller.right = pressed,
                                KeyCode::Space => controller.up = pressed,
                                KeyCode::ShiftLeft => controller.down = pressed,
                                KeyCode::KeyH if pressed && !event.repeat => {
                                    let hierarchical = !renderer.config().hierarchical_depth;
                                    if let Err(err) = renderer.set_hierarchical_depth(hierarchical) {
                                        tracing::error!(%err, "switching depth buffer failed");
                                        elwt.exit();
                                    }
                                }
                                KeyCode::KeyP if pressed && !event.repeat => {
                                    FUNCTION_COUNTERS.snapshot().log();
                                    FUNCTION_COUNTERS.reset();
                                }
                                KeyCode::Escape if pressed => {
                                    if mouse_captured {
                                        mouse_captured = false;
                                        last_mouse_pos = None;
                                        window.set_cursor_visible(true);
                                    } else {
                                        elwt.exit();
                                    }
                                }
                                _ => {}
                            }
                        }
                    }
                    WindowEvent::MouseInput { state, button, .. } => {
                        if button == MouseButton::Left && state == ElementState::Pressed {
                            mouse_captured = true;
                            window.set_cursor_visible(false);
                        }
                    }
                    WindowEvent::CursorMoved { position, .. } => {
                        if mouse_captured {
                            if let Some((x, y)) = last_mouse_pos {
                                scene.camera.rotate((position.x - x) as f32, (position.y - y) as f32);
                            }
                            last_mouse_pos = Some((position.x, position.y));
                        }
                    }
                    WindowEvent::RedrawRequested => {
                        let now = Instant::now();
                        let dt = (now - last_frame).as_secs_f32();
                        last_frame = now;
                        controller.update_camera(&mut scene.camera, dt);

                        if let Err(err) = draw_frame(&renderer, &scene, &mut surface) {
                            tracing::error!(%err, "frame failed");
                            elwt.exit();
                            return;
                        }

                        frame_stats.record(now.elapsed());
                        if stats_timer.elapsed() >= Duration::from_secs(1) {
                            frame_stats.flush();
                            stats_timer = Instant::now();
                        }
                    }
                    _ => {}
                },
                Event::AboutToWait => window.request_redraw(),
                _ => {}
            }
        })
        .context("event loop")?;
    Ok(())
}

fn draw_frame(
    renderer: &SoftRenderer,
    scene: &Scene,
    surface: &mut softbuffer::Surface<Arc<winit::window::Window>, Arc<winit::window::Window>>,
) -> Result<()> {
    renderer.clear_frame_buffer();
    renderer.render_scene(scene, ShadingConfig::default())?;

    let frame = renderer.frame();
    let (Some(w), Some(h)) = (NonZeroU32::new(frame.width() as u32), NonZeroU32::new(frame.height() as u32)) else {
        return Ok(());
    };
    surface
        .resize(w, h)
        .map_err(|err| anyhow::anyhow!("resizing surface: {err}"))?;
    let mut buffer = surface
        .buffer_mut()
        .map_err(|err| anyhow::anyhow!("mapping surface: {err}"))?;
    frame.copy_to_softbuffer(&mut buffer);
    buffer
        .present()
        .map_err(|err| anyhow::anyhow!("presenting frame: {err}"))?;
    Ok(())
}

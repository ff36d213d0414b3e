//! Iris: GPU shader photo filter CLI.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use iris::capture::{CaptureConfig, CaptureProvider, NokhwaCapture};
use iris::config::AppConfig;
use iris::filter::{Filter, FilterKind, FilterSelector};
use iris::frame::SourceImage;
use iris::output::{PersistenceProvider, PngWriter, WindowRenderer};
use iris::picker::{DialogPicker, FilePicker, PickError, PickerProvider};
use iris::render::{GpuSurface, RenderSurface, SoftwareSurface};
use iris::shader::{FilterNode, ShaderRegistry};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowAttributes, WindowId};

/// Apply GPU shader filters to photographs.
#[derive(Parser, Debug)]
#[command(name = "iris")]
#[command(about = "Capture or import a photo, apply a shader filter, save the result")]
#[command(after_help = "Keys: 1-5 select filter, O open photo, Space capture, S save, Esc quit")]
struct Args {
    /// Photo file to import at startup
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Capture one photo from this camera at startup
    #[arg(long)]
    camera: Option<u32>,

    /// Filter selected at startup
    #[arg(short, long, value_enum)]
    filter: Option<FilterKind>,

    /// Render once, write a PNG to this path, and exit without a window
    #[arg(long)]
    save: Option<PathBuf>,

    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Capture width hint
    #[arg(long)]
    width: Option<u32>,

    /// Capture height hint
    #[arg(long)]
    height: Option<u32>,

    /// List available cameras and exit
    #[arg(long)]
    list_cameras: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    if args.list_cameras {
        println!("Available cameras:");
        match NokhwaCapture::list_devices() {
            Ok(devices) => {
                for device in devices {
                    println!("  [{}] {}", device.index, device.name);
                }
            }
            Err(err) => eprintln!("failed to list devices: {}", err),
        }
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => AppConfig::default(),
    };
    if let Some(camera) = args.camera {
        config.camera_index = camera;
    }
    if let Some(width) = args.width {
        config.capture_width = width;
    }
    if let Some(height) = args.height {
        config.capture_height = height;
    }

    let filter = match args.filter {
        Some(kind) => kind.filter(),
        None => config.startup_filter(),
    };

    info!("starting iris");
    let registry = ShaderRegistry::with_builtin();

    match args.save.clone() {
        Some(path) => run_headless(&args, &config, &registry, filter, &path),
        None => run_window(args, config, registry, filter),
    }
}

/// The GPU surface, or the CPU mirror when no adapter is available.
fn open_surface(registry: &ShaderRegistry) -> Box<dyn RenderSurface> {
    match GpuSurface::new(registry) {
        Ok(surface) => Box::new(surface),
        Err(err) => {
            warn!("no usable GPU ({}), rendering in software", err);
            Box::new(SoftwareSurface::new())
        }
    }
}

/// Loads the photo the CLI asked for, if it asked for one.
fn load_initial_source(args: &Args, config: &AppConfig) -> Result<Option<SourceImage>> {
    if let Some(path) = &args.input {
        let source = FilePicker::new(path)
            .pick()
            .with_context(|| format!("importing {}", path.display()))?;
        return Ok(Some(source));
    }
    if args.camera.is_some() {
        let capture_config = CaptureConfig {
            device_index: config.camera_index,
            width: config.capture_width,
            height: config.capture_height,
        };
        let source = NokhwaCapture::open(capture_config)?.capture()?;
        return Ok(Some(source));
    }
    Ok(None)
}

/// One-shot mode: render the photo through the selected filter and write it.
fn run_headless(
    args: &Args,
    config: &AppConfig,
    registry: &ShaderRegistry,
    filter: Filter,
    save_path: &Path,
) -> Result<()> {
    let source = load_initial_source(args, config)?
        .ok_or_else(|| anyhow!("--save needs a photo; pass --input or --camera"))?;

    let mut surface = open_surface(registry);
    let node = match FilterNode::bind(filter, registry, source.width(), source.height()) {
        Ok(node) => node,
        Err(err) => {
            warn!("{}, saving the photo unfiltered", err);
            None
        }
    };
    surface.render(node.as_ref(), &source)?;
    let frame = surface.flatten()?;
    PngWriter::write_to(save_path, &frame)?;
    info!("saved {}", save_path.display());
    Ok(())
}

/// Default mode: preview window with key-driven selection.
fn run_window(
    args: Args,
    config: AppConfig,
    registry: ShaderRegistry,
    filter: Filter,
) -> Result<()> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = IrisApp::new(args, config, registry, filter);
    event_loop.run_app(&mut app)?;

    Ok(())
}

/// Application state for the preview event loop.
///
/// All filter state lives in the selector; the window is glue that turns key
/// presses into selection, pick, capture, and save calls. Renders are
/// coalesced through the `dirty` flag: any number of selection changes
/// between redraws results in one render of the latest selection.
struct IrisApp {
    args: Args,
    config: AppConfig,
    registry: ShaderRegistry,
    selector: FilterSelector,
    surface: Option<Box<dyn RenderSurface>>,
    source: Option<SourceImage>,
    writer: PngWriter,
    window: Option<Arc<Window>>,
    renderer: Option<WindowRenderer>,
    dirty: bool,
}

impl IrisApp {
    fn new(args: Args, config: AppConfig, registry: ShaderRegistry, filter: Filter) -> Self {
        let writer = PngWriter::new(&config.save_dir);
        let mut selector = FilterSelector::new();
        selector.set(filter);
        Self {
            args,
            config,
            registry,
            selector,
            surface: None,
            source: None,
            writer,
            window: None,
            renderer: None,
            dirty: false,
        }
    }

    /// Opens the render surface and loads the startup photo, if any.
    fn initialize(&mut self) {
        self.surface = Some(open_surface(&self.registry));

        match load_initial_source(&self.args, &self.config) {
            Ok(Some(source)) => {
                info!("startup photo: {}", source.origin);
                self.source = Some(source);
            }
            Ok(None) => info!("no startup photo; press O to open or Space to capture"),
            // The window stays open with no photo; the user can retry.
            Err(err) => error!("{:#}", err),
        }
        self.request_render();
    }

    fn request_render(&mut self) {
        self.dirty = true;
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    /// Renders the current photo through the active filter and hands the
    /// flattened result to the preview. The preview shows exactly the frame
    /// a save would write.
    fn render_current(&mut self) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        let Some(source) = &self.source else {
            return;
        };

        let filter = self.selector.active();
        let node = match FilterNode::bind(filter, &self.registry, source.width(), source.height())
        {
            Ok(node) => node,
            Err(err) => {
                warn!("{}, showing the photo unfiltered", err);
                None
            }
        };

        if let Err(err) = surface.render(node.as_ref(), source) {
            error!("render failed: {}", err);
            return;
        }
        match surface.flatten() {
            Ok(frame) => {
                if let Some(renderer) = &mut self.renderer {
                    renderer.set_frame(&frame);
                }
            }
            Err(err) => error!("flatten failed: {}", err),
        }
    }

    fn select_filter(&mut self, kind: FilterKind) {
        self.selector.set(kind.filter());
        info!("filter: {}", kind.id());
        self.request_render();
    }

    fn pick_photo(&mut self) {
        match DialogPicker::new().pick() {
            Ok(source) => {
                // The selection is kept; only the photo changes.
                self.source = Some(source);
                self.request_render();
            }
            Err(PickError::Canceled) => info!("pick canceled"),
            Err(err) => error!("{}", err),
        }
    }

    fn capture_photo(&mut self) {
        let capture_config = CaptureConfig {
            device_index: self.config.camera_index,
            width: self.config.capture_width,
            height: self.config.capture_height,
        };
        info!("capturing from camera {}", capture_config.device_index);
        let shot = NokhwaCapture::open(capture_config).and_then(|mut camera| camera.capture());
        match shot {
            Ok(source) => {
                self.source = Some(source);
                self.request_render();
            }
            // Prior photo and selection stay as they were.
            Err(err) => error!("{}", err),
        }
    }

    fn save_photo(&mut self) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        match surface.flatten() {
            Ok(frame) => {
                if let Err(err) = self.writer.save(&frame) {
                    error!("save failed: {}", err);
                }
            }
            Err(err) => warn!("nothing to save: {}", err),
        }
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, key: Key) {
        match key.as_ref() {
            Key::Character(c) => {
                if let Some(digit) = c.chars().next().and_then(|ch| ch.to_digit(10)) {
                    let index = (digit as usize).wrapping_sub(1);
                    if let Some(kind) = FilterKind::ALL.get(index) {
                        self.select_filter(*kind);
                    }
                } else if c.eq_ignore_ascii_case("o") {
                    self.pick_photo();
                } else if c.eq_ignore_ascii_case("s") {
                    self.save_photo();
                }
            }
            Key::Named(NamedKey::Space) => self.capture_photo(),
            Key::Named(NamedKey::Escape) => event_loop.exit(),
            _ => {}
        }
    }
}

impl ApplicationHandler for IrisApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attrs = WindowAttributes::default()
            .with_title("Iris - Photo Filters")
            .with_inner_size(PhysicalSize::new(
                self.config.capture_width,
                self.config.capture_height,
            ));

        match event_loop.create_window(window_attrs) {
            Ok(window) => {
                let window = Arc::new(window);
                self.window = Some(window.clone());

                match WindowRenderer::new(window) {
                    Ok(renderer) => {
                        self.renderer = Some(renderer);
                        self.initialize();
                    }
                    Err(err) => {
                        error!("failed to create renderer: {}", err);
                        event_loop.exit();
                    }
                }
            }
            Err(err) => {
                error!("failed to create window: {}", err);
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                info!("window closed");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(renderer) = &mut self.renderer {
                    renderer.resize(size);
                }
                // The photo is unchanged, but the swapchain needs repainting.
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key,
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => self.handle_key(event_loop, logical_key),
            WindowEvent::RedrawRequested => {
                if self.dirty {
                    self.render_current();
                    self.dirty = false;
                }
                if let Some(renderer) = &mut self.renderer {
                    if let Err(err) = renderer.render() {
                        error!("window render failed: {}", err);
                    }
                }
            }
            _ => {}
        }
    }
}

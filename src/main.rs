mod camera;
mod hotreload;
mod validate;

use std::ffi::CString;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context as _};
use crossbeam_channel::Receiver;
use glow::HasContext;

use glutin::config::ConfigTemplateBuilder;
use glutin::context::{ContextApi, ContextAttributesBuilder, NotCurrentContext, PossiblyCurrentContext, Version};
use glutin::display::GetGlDisplay;
use glutin::prelude::*;
use glutin::surface::{Surface, SurfaceAttributesBuilder, SwapInterval, WindowSurface};
use glutin_winit::DisplayBuilder;

use raw_window_handle::HasRawWindowHandle;

use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::Window;

use shadevars_engine::assets::read_to_string_result;
use shadevars_engine::config::{load_viewer_config_with_mode, ConfigMode};
use shadevars_engine::{
    compile_program, loge, logi, logw, AssetsRoot, EngineError, GlBackend, GlProgram, Registry,
    RegistryEvent, ViewerConfig,
};

use crate::camera::OrbitCamera;
use crate::hotreload::{HotEvent, HotReload, WatchSet};

const HOTKEYS: &str = "S=save  L=load  R=recompile  T=reset time  C=clear parked  P=print";

/// Our own saves also trigger the watcher; ignore vars events this soon after one.
const SELF_SAVE_QUIET: Duration = Duration::from_secs(1);

#[derive(Debug, Default)]
struct Args {
    log_file: Option<PathBuf>,
    assets: Option<PathBuf>,
    strict: bool,
}

fn parse_args() -> Args {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--log-file" => args.log_file = it.next().map(PathBuf::from),
            "--assets" => args.assets = it.next().map(PathBuf::from),
            "--strict" => args.strict = true,
            other => eprintln!("ignoring unknown argument '{other}'"),
        }
    }
    if args.log_file.is_none() {
        if let Ok(p) = std::env::var("SHADEVARS_LOG_FILE") {
            if !p.trim().is_empty() {
                args.log_file = Some(PathBuf::from(p));
            }
        }
    }
    args
}

fn nz(v: u32) -> NonZeroU32 {
    NonZeroU32::new(v).unwrap_or(NonZeroU32::MIN)
}

fn load_config(args: &Args) -> anyhow::Result<(AssetsRoot, ViewerConfig)> {
    let assets = match &args.assets {
        Some(dir) => AssetsRoot::at(dir.clone()),
        None => AssetsRoot::discover(&std::env::current_dir()?)
            .or_else(|_| AssetsRoot::discover(Path::new(env!("CARGO_MANIFEST_DIR"))))?,
    };
    logi!("INIT", "assets base: {}", assets.path().display());

    let json_path = assets.pick_platform_json("viewer");
    if json_path.exists() {
        let raw = read_to_string_result(&json_path)?;
        let v: serde_json::Value = serde_json::from_str(&raw).unwrap_or(serde_json::Value::Null);
        let issues = validate::validate_viewer_json(&v);
        validate::emit_summary("CONFIG", "viewer.json", &issues);
        validate::emit_issues("CONFIG", &issues);
        if args.strict && validate::has_errors(&issues) {
            return Err(anyhow!("{} failed validation", json_path.display()));
        }
    }

    let mode = if args.strict { ConfigMode::Strict } else { ConfigMode::Lenient };
    let cfg = load_viewer_config_with_mode(&assets, mode)?;

    let issues = validate::validate_paths(&cfg);
    validate::emit_summary("CONFIG", "paths", &issues);
    validate::emit_issues("CONFIG", &issues);

    logi!("INIT", "vert: {}", cfg.vert_path.display());
    logi!("INIT", "frag: {}", cfg.frag_path.display());
    logi!("INIT", "vars: {}", cfg.vars_path.display());
    Ok((assets, cfg))
}

struct Viewer {
    window: Window,
    gl_surface: Surface<WindowSurface>,
    gl_context: PossiblyCurrentContext,
    gl: glow::Context,
    vao: glow::NativeVertexArray,
    program: Option<glow::NativeProgram>,

    cfg: ViewerConfig,
    registry: Registry,
    events: Receiver<RegistryEvent>,
    backend: GlBackend,
    camera: OrbitCamera,

    cursor: (f32, f32),
    dragging: bool,
    last_save: Option<Instant>,
}

impl Viewer {
    fn read_sources(&self) -> shadevars_engine::Result<(String, String)> {
        let vert = read_to_string_result(&self.cfg.vert_path)?;
        let frag = read_to_string_result(&self.cfg.frag_path)?;
        Ok((vert, frag))
    }

    /// Compile, introspect and swap in the shader pair. On any failure the previous program
    /// stays installed.
    fn reload_program(&mut self) {
        let (vert, frag) = match self.read_sources() {
            Ok(s) => s,
            Err(e) => {
                loge!("SHADER", "{e}");
                return;
            }
        };
        let program = match compile_program(&self.gl, &vert, &frag) {
            Ok(p) => p,
            Err(e) => {
                if let EngineError::ShaderCompile { stage, .. } = &e {
                    loge!("SHADER", "{stage} failed:");
                }
                loge!("SHADER", "{e}");
                logw!("SHADER", "keeping previous program");
                return;
            }
        };

        let source = GlProgram { gl: &self.gl, program };
        if let Err(e) = self.registry.install_program(&source) {
            loge!("SHADER", "{e}");
            logw!("SHADER", "keeping previous program");
            unsafe { self.gl.delete_program(program) };
            return;
        }

        if let Some(old) = self.program.replace(program) {
            unsafe { self.gl.delete_program(old) };
        }
        logi!("SHADER", "program ready ({} uniforms)", self.registry.active_len());
    }

    fn save_vars(&mut self) {
        if self.registry.save(&self.cfg.vars_path) {
            self.last_save = Some(Instant::now());
        }
    }

    fn load_vars(&mut self) {
        self.registry.load(&self.cfg.vars_path);
    }

    fn print_uniforms(&self) {
        for (key, var) in self.registry.active() {
            let value = var.value().format().unwrap_or_else(|_| "<live>".into());
            let flag = if self.registry.is_builtin(key) {
                " [builtin]"
            } else if var.permanent {
                " [perm]"
            } else {
                ""
            };
            logi!("UNIFORM", "{key}{flag} = {value}");
        }
        for var in self.registry.overflow() {
            let value = var.value().format().unwrap_or_default();
            logi!("UNIFORM", "{} (parked) = {value}", var.key());
        }
    }

    fn on_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::KeyS => self.save_vars(),
            KeyCode::KeyL => self.load_vars(),
            KeyCode::KeyR => self.reload_program(),
            KeyCode::KeyT => {
                logi!("CLOCK", "time reset");
                self.registry.reset_clock();
            }
            KeyCode::KeyC => {
                logi!("VARS", "dropping {} parked values", self.registry.overflow_len());
                self.registry.clear_overflow();
            }
            KeyCode::KeyP => self.print_uniforms(),
            _ => {}
        }
    }

    fn on_hot(&mut self, ev: HotEvent) {
        match ev {
            HotEvent::ShaderChanged(p) => {
                logi!("WATCH", "shader changed: {}", p.display());
                self.reload_program();
            }
            HotEvent::VarsChanged(p) => {
                if self.last_save.is_some_and(|t| t.elapsed() < SELF_SAVE_QUIET) {
                    return;
                }
                logi!("WATCH", "vars changed: {}", p.display());
                self.load_vars();
            }
        }
    }

    fn drain_registry_events(&mut self) {
        for ev in self.events.try_iter() {
            match ev {
                RegistryEvent::Added { key } => logi!("UNIFORM", "+ {key}"),
                RegistryEvent::Deleted { key } => logi!("UNIFORM", "- {key}"),
                RegistryEvent::ValueChanged { key, value } => logi!("UNIFORM", "{key} <- {value}"),
                RegistryEvent::ProgramInstalled { active, overflow } => {
                    self.window.set_title(&format!(
                        "shadevars ({active} uniforms, {overflow} parked) - {HOTKEYS}"
                    ));
                }
                RegistryEvent::Discovered { .. } => {}
            }
        }
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        self.gl_surface.resize(&self.gl_context, nz(size.width), nz(size.height));
        self.camera.aspect_ratio = size.width.max(1) as f32 / size.height.max(1) as f32;
        self.registry.set_size(size.width as f32, size.height as f32);
    }

    fn on_cursor(&mut self, x: f32, y: f32) {
        let (px, py) = self.cursor;
        if self.dragging {
            self.camera.orbit((x - px) * 0.01, (y - py) * 0.01);
        }
        self.cursor = (x, y);
        // GL window coordinates start bottom-left.
        let h = self.window.inner_size().height as f32;
        self.registry.set_mouse(x, h - y, self.dragging);
    }

    fn draw(&mut self) -> anyhow::Result<()> {
        let size = self.window.inner_size();
        let (w, h) = (size.width as i32, size.height as i32);
        self.camera.feed(&mut self.registry);

        unsafe {
            self.gl.viewport(0, 0, w, h);
            self.gl.clear_color(0.02, 0.02, 0.02, 1.0);
            self.gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        }

        if let Some(program) = self.program {
            unsafe {
                self.gl.use_program(Some(program));
                self.gl.bind_vertex_array(Some(self.vao));
            }
            let mut target = self.backend.bind(&self.gl, program);
            self.registry.push(&mut target);
            unsafe {
                self.gl.draw_arrays(glow::TRIANGLES, 0, 3);
                self.gl.bind_vertex_array(None);
                self.gl.use_program(None);
            }
        }

        self.gl_surface.swap_buffers(&self.gl_context).context("swap_buffers")?;
        Ok(())
    }

    fn shutdown(&mut self) {
        self.backend.delete_textures(&self.gl);
        unsafe {
            if let Some(p) = self.program.take() {
                self.gl.delete_program(p);
            }
            self.gl.delete_vertex_array(self.vao);
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let (assets, cfg) = load_config(&args)?;

    let event_loop = EventLoop::new().context("EventLoop::new failed")?;
    let window_builder = winit::window::WindowBuilder::new()
        .with_title("shadevars")
        .with_inner_size(PhysicalSize::new(1280, 720));

    let template = ConfigTemplateBuilder::new().with_alpha_size(8).with_depth_size(24);
    let display_builder = DisplayBuilder::new().with_window_builder(Some(window_builder));

    let (window, gl_config) = display_builder
        .build(&event_loop, template, |configs| {
            configs
                .reduce(|a, b| if a.num_samples() > b.num_samples() { a } else { b })
                .expect("display offered no GL configs")
        })
        .map_err(|e| anyhow!("failed to build display: {e}"))?;
    let window = window.context("no window created")?;

    let raw_window_handle = window.raw_window_handle();
    let gl_display = gl_config.display();

    let context_attributes = ContextAttributesBuilder::new()
        .with_context_api(ContextApi::OpenGl(Some(Version::new(3, 3))))
        .build(Some(raw_window_handle));

    let not_current_gl_context: NotCurrentContext = unsafe {
        gl_display
            .create_context(&gl_config, &context_attributes)
            .context("create_context failed")?
    };

    let size = window.inner_size();
    let attrs = SurfaceAttributesBuilder::<WindowSurface>::new().build(
        raw_window_handle,
        nz(size.width),
        nz(size.height),
    );
    let gl_surface = unsafe {
        gl_display
            .create_window_surface(&gl_config, &attrs)
            .context("create_window_surface failed")?
    };

    let gl_context = not_current_gl_context
        .make_current(&gl_surface)
        .context("make_current failed")?;

    gl_surface
        .set_swap_interval(&gl_context, SwapInterval::Wait(nz(1)))
        .ok();

    let gl = unsafe {
        glow::Context::from_loader_function(|s| match CString::new(s) {
            Ok(name) => gl_display.get_proc_address(&name) as *const _,
            Err(_) => std::ptr::null(),
        })
    };
    let vao = unsafe { gl.create_vertex_array() }.map_err(|e| anyhow!("create_vertex_array: {e}"))?;

    let mut registry =
        Registry::new(&cfg.builtin_textures()).with_first_texture_unit(cfg.first_texture_unit);
    let events = registry.subscribe();

    let hot = HotReload::new(WatchSet {
        shaders: vec![cfg.vert_path.clone(), cfg.frag_path.clone()],
        vars: cfg.vars_path.clone(),
    });
    let hot = match hot {
        Ok(h) => Some(h),
        Err(e) => {
            logw!("WATCH", "hot reload disabled: {e}");
            None
        }
    };

    let mut viewer = Viewer {
        camera: OrbitCamera::new(size.width.max(1) as f32 / size.height.max(1) as f32),
        window,
        gl_surface,
        gl_context,
        gl,
        vao,
        program: None,
        backend: GlBackend::new(assets),
        registry,
        events,
        cfg,
        cursor: (0.0, 0.0),
        dragging: false,
        last_save: None,
    };

    viewer.resize(size);
    viewer.reload_program();
    if viewer.cfg.autoload_vars && viewer.cfg.vars_path.is_file() {
        viewer.load_vars();
    }
    logi!("INIT", "hotkeys: {HOTKEYS}");

    event_loop.run(move |event, target| {
        target.set_control_flow(ControlFlow::Poll);

        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => target.exit(),

                WindowEvent::KeyboardInput { event, .. } => {
                    if event.state.is_pressed() && !event.repeat {
                        if let PhysicalKey::Code(code) = event.physical_key {
                            if code == KeyCode::Escape {
                                target.exit();
                            } else {
                                viewer.on_key(code);
                            }
                        }
                    }
                }

                WindowEvent::MouseInput { state, button: MouseButton::Left, .. } => {
                    viewer.dragging = state == ElementState::Pressed;
                }

                WindowEvent::CursorMoved { position, .. } => {
                    viewer.on_cursor(position.x as f32, position.y as f32);
                }

                WindowEvent::MouseWheel { delta, .. } => {
                    let dy = match delta {
                        MouseScrollDelta::LineDelta(_, y) => y * 0.25,
                        MouseScrollDelta::PixelDelta(p) => p.y as f32 * 0.01,
                    };
                    viewer.camera.zoom(dy);
                }

                WindowEvent::Resized(new_size) => viewer.resize(new_size),

                WindowEvent::RedrawRequested => {
                    if let Err(e) = viewer.draw() {
                        loge!("RENDER", "{e:#}");
                        target.exit();
                    }
                }

                _ => {}
            },

            Event::AboutToWait => {
                if let Some(h) = &hot {
                    let pending: Vec<HotEvent> = h.rx().try_iter().collect();
                    for ev in pending {
                        viewer.on_hot(ev);
                    }
                }
                viewer.drain_registry_events();
                viewer.window.request_redraw();
            }

            Event::LoopExiting => viewer.shutdown(),

            _ => {}
        }
    })?;
    Ok(())
}

fn main() {
    let args = parse_args();
    let run_id = shadevars_engine::logging::init(args.log_file.clone());
    logi!("INIT", "run_id={run_id}");

    if let Err(e) = run(args) {
        loge!("INIT", "{e:#}");
        std::process::exit(1);
    }
}

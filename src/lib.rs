// src/lib.rs
//! verdant_engine: a dual-view foliage renderer with GPU-driven frustum
//! culling and a single indirect multi-draw per frame.

pub mod camera;
pub mod config;
pub mod context;
pub mod culling;
pub mod error;
pub mod foliage;
pub mod fps_counter;
pub mod frustum;
pub mod gltf_loader;
pub mod ground;
pub mod indirect;
pub mod instances;
pub mod mesh;
pub mod overlay;
pub mod samples;
pub mod scene;
pub mod slime;
pub mod texture;
pub mod trajectory;

pub use config::RenderConfig;
pub use error::{EngineError, Result};

use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::context::GraphicsContext;
use crate::fps_counter::FpsCounter;
use crate::scene::Scene;

#[derive(Default)]
struct MouseState {
    position: Option<(f64, f64)>,
    left_down: bool,
    right_down: bool,
}

struct AppState {
    window: Arc<Window>,
    ctx: GraphicsContext,
    scene: Scene,
    fps: FpsCounter,
    mouse: MouseState,
}

/// winit application driver. The GPU stack and the scene are created on
/// `resumed` because the window only exists from that point on.
pub struct App {
    config: RenderConfig,
    state: Option<AppState>,
}

impl App {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            state: None,
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Poll);
        if self.state.is_some() {
            return;
        }

        let [width, height] = self.config.window_size;
        let attrs = Window::default_attributes()
            .with_title("verdant")
            .with_inner_size(winit::dpi::PhysicalSize::new(width, height));
        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                log::error!("window creation failed: {err}");
                event_loop.exit();
                return;
            }
        };

        let built = pollster::block_on(GraphicsContext::new(window.clone())).and_then(|ctx| {
            let (w, h) = ctx.size();
            let scene = Scene::init(&ctx, self.config.clone(), w, h)?;
            Ok((ctx, scene))
        });
        match built {
            Ok((ctx, scene)) => {
                log::info!("scene ready: {} instances", scene.instance_total());
                self.state = Some(AppState {
                    window,
                    ctx,
                    scene,
                    fps: FpsCounter::new(),
                    mouse: MouseState::default(),
                });
            }
            Err(err) => {
                log::error!("initialization failed: {err}");
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
        let Some(state) = self.state.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),

            WindowEvent::Resized(size) => {
                state.ctx.resize(size.width, size.height);
                state.scene.resize(&state.ctx, size.width, size.height);
            }

            WindowEvent::KeyboardInput { event, .. } => {
                let pressed = event.state == ElementState::Pressed;
                match event.physical_key {
                    PhysicalKey::Code(KeyCode::KeyW) => {
                        state.scene.set_player_move_state(0, pressed)
                    }
                    PhysicalKey::Code(KeyCode::KeyS) => {
                        state.scene.set_player_move_state(1, pressed)
                    }
                    PhysicalKey::Code(KeyCode::KeyA) => {
                        state.scene.set_player_move_state(2, pressed)
                    }
                    PhysicalKey::Code(KeyCode::KeyD) => {
                        state.scene.set_player_move_state(3, pressed)
                    }
                    PhysicalKey::Code(KeyCode::Escape) => event_loop.exit(),
                    _ => {}
                }
            }

            WindowEvent::MouseInput { state: button_state, button, .. } => {
                let pressed = button_state == ElementState::Pressed;
                match button {
                    MouseButton::Left => state.mouse.left_down = pressed,
                    MouseButton::Right => state.mouse.right_down = pressed,
                    _ => {}
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                if let Some((last_x, last_y)) = state.mouse.position {
                    let dx = (position.x - last_x) as f32;
                    let dy = (position.y - last_y) as f32;
                    if state.mouse.left_down {
                        state.scene.god_view_rotate(dx, dy);
                    } else if state.mouse.right_down {
                        state.scene.god_view_pan(dx, dy);
                    }
                }
                state.mouse.position = Some((position.x, position.y));
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let amount = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / 50.0,
                };
                state.scene.god_view_zoom(amount);
            }

            WindowEvent::RedrawRequested => {
                let dt = state.fps.tick();
                state.scene.update(&state.ctx.queue, dt);
                state.scene.render(&mut state.ctx);
                state.window.request_redraw();
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }
}

/// Run the renderer on the current thread until the window closes.
#[cfg(not(target_arch = "wasm32"))]
pub fn run_native(config: RenderConfig) -> Result<()> {
    let event_loop =
        EventLoop::new().map_err(|err| EngineError::msg(format!("event loop: {err}")))?;
    let mut app = App::new(config);
    event_loop
        .run_app(&mut app)
        .map_err(|err| EngineError::msg(format!("event loop: {err}")))
}

use anyhow::Result;
use inkpane_bridge::{BridgeHost, HOST_METHODS, HOST_OBJECT};
use inkpane_config::InkpaneConfig;
use inkpane_webview::{
    NavigationMediator, RenderSurfaceMode, SurfaceBuilder, SystemBrowser, Waker, WrySurface,
};
use parking_lot::Mutex;
use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;
use tao::dpi::LogicalSize;
use tao::event::{Event, WindowEvent};
use tao::event_loop::{ControlFlow, EventLoopBuilder};
use tao::window::WindowBuilder;

const SAMPLE: &str = r#"// Press Ctrl+S to hand the text back to the host.
fn main() {
    let greeting = "hello from inkpane";
    println!("{greeting}");
}
"#;

#[derive(Debug, Clone, Copy)]
enum UserEvent {
    Tick,
}

fn main() -> Result<()> {
    env_logger::init();

    let mut config = InkpaneConfig::load();
    if std::env::args().any(|a| a == "--redirect") {
        config.surface.redirect = true;
    }
    let mode = RenderSurfaceMode::from_redirect_flag(config.surface.redirect);

    let server = Arc::new(inkpane_server::from_settings(
        &config.server.bind_host,
        config.server.asset_dir.as_deref(),
        config.server.worker_keep_alive_secs,
    ));

    let event_loop = EventLoopBuilder::<UserEvent>::with_user_event().build();
    let proxy = Mutex::new(event_loop.create_proxy());
    let waker: Waker = Arc::new(move || {
        let _ = proxy.lock().send_event(UserEvent::Tick);
    });

    let window = WindowBuilder::new()
        .with_title("Inkpane")
        .with_inner_size(LogicalSize::new(config.surface.width, config.surface.height))
        .build(&event_loop)?;

    let surface_config = SurfaceBuilder::new()
        .with_devtools(config.surface.devtools)
        .with_host_object(HOST_OBJECT, HOST_METHODS)
        .build();
    let surface = WrySurface::new(
        &window,
        &surface_config,
        Arc::clone(&server),
        Some(Arc::clone(&waker)),
    )?;
    let mediator = NavigationMediator::new(
        surface,
        mode,
        Arc::clone(&server),
        Arc::new(SystemBrowser),
    );

    let mut host = BridgeHost::new(mediator)
        .with_defaults(&config.editor.default_language, &config.editor.default_theme)
        .with_save_handler(|text| {
            log::info!("save requested: {} bytes, {} lines", text.len(), text.lines().count());
        });
    host.set_waker(Some(waker));

    let editor_ready = Rc::new(Cell::new(false));
    {
        let flag = Rc::clone(&editor_ready);
        host.on_editor_ready(move || flag.set(true));
    }
    host.load(SAMPLE, Some("rust"), None);
    if mode == RenderSurfaceMode::Redirect {
        log::info!("redirect mode: the editor opens in the system browser");
    }

    let show_line_numbers = config.editor.show_line_numbers;
    event_loop.run(move |event, _target, control_flow| {
        *control_flow = ControlFlow::Wait;
        match event {
            Event::WindowEvent {
                event: WindowEvent::CloseRequested,
                ..
            } => {
                server.stop();
                *control_flow = ControlFlow::Exit;
            }
            Event::UserEvent(UserEvent::Tick) => {
                host.tick();
                // The guest can report ready before the page load completes.
                if host.is_ready() && editor_ready.take() {
                    host.set_line_numbers(show_line_numbers);
                }
            }
            _ => {}
        }
    });
}

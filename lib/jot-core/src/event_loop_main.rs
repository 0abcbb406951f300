use crate::dispatcher::{DispatchError, Dispatcher, UiExecutor, UiTask};
use crate::JotResult;
use log::trace;
use std::sync::{Arc, OnceLock};
use std::thread::{self, ThreadId};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop, EventLoopProxy};
use winit::window::WindowId;

pub enum MainThreadMessage {
    RunOnMainThread { task: UiTask },
    Shutdown,
}

pub static EVENT_LOOP_PROXY: OnceLock<EventLoopProxy<MainThreadMessage>> = OnceLock::new();

/// Runs dispatcher tasks as winit user events.
pub struct EventLoopExecutor {
    proxy: EventLoopProxy<MainThreadMessage>,
    ui_thread: ThreadId,
}

impl UiExecutor for EventLoopExecutor {
    fn ui_thread(&self) -> ThreadId {
        self.ui_thread
    }

    fn post(&self, task: UiTask) -> Result<(), DispatchError> {
        self.proxy
            .send_event(MainThreadMessage::RunOnMainThread { task })
            .map_err(|_| DispatchError::EventLoopClosed)
    }
}

/// The part of the application that lives on the UI thread.
pub trait UiApplication {
    /// Called once, the first time the event loop resumes. Windows are created here.
    fn started(&mut self, event_loop: &ActiveEventLoop);

    fn window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent);

    /// Called each time the event loop is about to block waiting for events.
    fn idle(&mut self, _event_loop: &ActiveEventLoop) {}

    fn exiting(&mut self) {}
}

pub struct EventLoopMain {}

impl EventLoopMain {
    /// Runs the event loop on the calling thread until shutdown. `build` receives a dispatcher
    /// bound to this thread and returns the application to host.
    pub fn run<A, F>(build: F) -> JotResult<()>
    where
        A: UiApplication,
        F: FnOnce(Dispatcher) -> JotResult<A>,
    {
        let mut builder = EventLoop::<MainThreadMessage>::with_user_event();

        #[cfg(target_os = "macos")]
        {
            use winit::platform::macos::{ActivationPolicy, EventLoopBuilderExtMacOS};
            // No Dock icon and no menu bar, like a menu bar utility.
            builder.with_activation_policy(ActivationPolicy::Accessory);
        }

        let event_loop = builder
            .build()
            .map_err(|e| format!("Failed to create event loop: {e}"))?;

        let proxy = event_loop.create_proxy();
        EVENT_LOOP_PROXY
            .set(proxy.clone())
            .map_err(|_| "Event loop proxy already initialized")?;
        event_loop.set_control_flow(ControlFlow::Wait);

        let dispatcher = Dispatcher::new(Arc::new(EventLoopExecutor {
            proxy,
            ui_thread: thread::current().id(),
        }));

        let mut app = App {
            inner: build(dispatcher)?,
            started: false,
        };
        event_loop
            .run_app(&mut app)
            .map_err(|e| format!("Failed to run event loop: {e}"))?;
        Ok(())
    }

    pub fn shutdown() {
        if let Some(proxy) = EVENT_LOOP_PROXY.get() {
            let _ = proxy.send_event(MainThreadMessage::Shutdown);
        }
    }
}

struct App<A: UiApplication> {
    inner: A,
    started: bool,
}

impl<A: UiApplication> ApplicationHandler<MainThreadMessage> for App<A> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if !self.started {
            self.started = true;
            self.inner.started(event_loop);
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: MainThreadMessage) {
        match event {
            MainThreadMessage::RunOnMainThread { task } => {
                task();
            }
            MainThreadMessage::Shutdown => {
                trace!("Shutdown requested");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        self.inner.window_event(event_loop, id, event);
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        self.inner.idle(event_loop);
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.inner.exiting();
    }
}

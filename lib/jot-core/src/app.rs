use crate::bus::{BusContext, BusEmitter, ThemeChanged, ThemeMode};
use crate::config::{Config, ThemePreference};
use crate::dispatcher::Dispatcher;
use crate::event_loop_main::UiApplication;
use crate::hotkey::{
    GlobalHotkeyBackend, HotkeyBackend, HotkeyError, HotkeyRegistrar, DEFAULT_ACCELERATOR,
};
use crate::overlay::render::SoftbufferPresenter;
use crate::overlay::{
    EntryKey, EntryView, OverlayController, OverlayHandle, OverlayShell, WinitOverlayWindow,
};
use crate::platform::Platform;
use crate::thread_lock::MainThreadLock;
use crate::{JotFatalError, JotResult};
use log::{debug, error, info, trace, warn};
use notify::{recommended_watcher, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use winit::event::{ElementState, Ime, KeyEvent, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::{Key, NamedKey};
use winit::window::WindowId;

pub type AppOverlayHandle = OverlayHandle<WinitOverlayWindow, Platform>;
type AppShell = OverlayShell<WinitOverlayWindow, Platform>;
type AppRegistrar = HotkeyRegistrar<GlobalHotkeyBackend>;
type SharedTheme = Arc<Mutex<ThemeState>>;

/// Shows a binding failure to the user.
pub type BindErrorHook = Arc<dyn Fn(&HotkeyError) + Send + Sync>;

pub(crate) struct JotApp {
    dispatcher: Dispatcher,
    overlay_bus: Option<BusContext>,
    main_emitter: BusEmitter,
    theme: SharedTheme,
    on_bind_error: BindErrorHook,
    fatal: Arc<Mutex<Option<JotFatalError>>>,
    window_id: Option<WindowId>,
    shell: Option<MainThreadLock<AppShell>>,
    registrar: Option<MainThreadLock<AppRegistrar>>,
    _watcher: Option<RecommendedWatcher>,
}

impl JotApp {
    pub fn new(
        dispatcher: Dispatcher,
        overlay_bus: BusContext,
        main_emitter: BusEmitter,
        on_bind_error: BindErrorHook,
        fatal: Arc<Mutex<Option<JotFatalError>>>,
    ) -> Self {
        Self {
            dispatcher,
            overlay_bus: Some(overlay_bus),
            main_emitter,
            theme: SharedTheme::default(),
            on_bind_error,
            fatal,
            window_id: None,
            shell: None,
            registrar: None,
            _watcher: None,
        }
    }

    fn initialize(&mut self, event_loop: &ActiveEventLoop) -> JotResult<()> {
        let config = Config::current().clone();
        let overlay_bus = self
            .overlay_bus
            .take()
            .ok_or("Overlay already initialized")?;

        let window = WinitOverlayWindow::create(event_loop, &config.overlay)?;
        let native = window.window().clone();
        self.window_id = Some(window.winit_id());

        let system_theme = native.theme().map(ThemeMode::from);
        let theme = config.theme.resolve(system_theme);
        let controller = OverlayController::new(
            window,
            Platform::new(),
            overlay_bus.emitter(),
            self.dispatcher.clone(),
            config.overlay.clone(),
        )?;

        let mut shell = OverlayShell::new(controller, EntryView::new(theme), overlay_bus);
        match SoftbufferPresenter::new(native) {
            Ok(presenter) => shell = shell.with_presenter(presenter),
            Err(e) => warn!("Overlay will not be drawn: {e}"),
        }
        let shell = MainThreadLock::new(shell, self.dispatcher.clone())?;
        let overlay = OverlayHandle::new(shell.clone());
        self.shell = Some(shell);

        sync_theme(&self.main_emitter, &self.theme, config.theme, system_theme);

        let toggle = overlay.clone();
        let mut registrar = HotkeyRegistrar::new(GlobalHotkeyBackend::new()?, move || {
            trace!("Toggle shortcut pressed");
            toggle.toggle();
        });
        bind_at_startup(&mut registrar, config.toggle_accelerator(), &self.on_bind_error);
        let registrar = MainThreadLock::new(registrar, self.dispatcher.clone())?;

        if config.watch_config {
            match &config.config_path {
                Some(path) => {
                    match watch_config(
                        path.clone(),
                        registrar.clone(),
                        overlay,
                        ConfigListeners {
                            main_emitter: self.main_emitter.clone(),
                            theme: self.theme.clone(),
                            on_bind_error: self.on_bind_error.clone(),
                        },
                    ) {
                        Ok(watcher) => self._watcher = Some(watcher),
                        Err(e) => warn!("Could not watch {}: {e}", path.display()),
                    }
                }
                None => debug!("No config file to watch"),
            }
        }

        self.registrar = Some(registrar);
        info!("Jot is ready");
        Ok(())
    }

    fn with_shell(&self, f: impl FnOnce(&mut AppShell)) {
        let Some(shell) = &self.shell else {
            return;
        };
        if let Err(e) = shell.with_mut(f) {
            warn!("Overlay busy: {e}");
        }
    }
}

impl UiApplication for JotApp {
    fn started(&mut self, event_loop: &ActiveEventLoop) {
        if let Err(e) = self.initialize(event_loop) {
            error!("Failed to start: {e}");
            if let Ok(mut fatal) = self.fatal.lock() {
                *fatal = Some(e);
            }
            event_loop.exit();
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        if Some(id) != self.window_id {
            return;
        }

        match event {
            WindowEvent::Focused(focused) => {
                self.with_shell(|shell| shell.on_focus_changed(focused));
            }
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                let key = entry_key(&event);
                self.with_shell(|shell| shell.on_key(key));
            }
            WindowEvent::Ime(Ime::Commit(text)) => {
                self.with_shell(|shell| shell.on_ime_commit(text));
            }
            WindowEvent::RedrawRequested => {
                self.with_shell(|shell| shell.redraw());
            }
            WindowEvent::Resized(_) => {
                self.with_shell(|shell| shell.redraw());
            }
            WindowEvent::ThemeChanged(theme) => {
                sync_theme(
                    &self.main_emitter,
                    &self.theme,
                    Config::theme(),
                    Some(theme.into()),
                );
            }
            WindowEvent::CloseRequested => {
                self.with_shell(|shell| shell.hide());
            }
            _ => {}
        }
    }

    fn idle(&mut self, _event_loop: &ActiveEventLoop) {
        self.with_shell(|shell| {
            shell.pump_bus();
        });
    }

    fn exiting(&mut self) {
        self._watcher = None;
        if let Some(registrar) = &self.registrar {
            release_shortcut(registrar);
        }
        self.with_shell(|shell| shell.hide());
        debug!("Overlay torn down");
    }
}

/// Unbinds the toggle shortcut. Returns false, after logging, if the registrar could not be
/// reached.
fn release_shortcut<B: HotkeyBackend>(registrar: &MainThreadLock<HotkeyRegistrar<B>>) -> bool {
    match registrar.with_mut(|registrar| registrar.unbind()) {
        Ok(()) => true,
        Err(e) => {
            warn!("Shortcut left registered at exit: {e}");
            false
        }
    }
}

fn entry_key(event: &KeyEvent) -> EntryKey {
    match &event.logical_key {
        Key::Named(NamedKey::Enter) => EntryKey::Enter,
        Key::Named(NamedKey::Escape) => EntryKey::Escape,
        Key::Named(NamedKey::Backspace) => EntryKey::Backspace,
        Key::Named(NamedKey::Space) => EntryKey::Text(" ".to_string()),
        _ => match &event.text {
            Some(text) => EntryKey::Text(text.to_string()),
            None => EntryKey::Other,
        },
    }
}

/// Binds the configured accelerator. If that fails, the user is told and the default is
/// tried instead.
fn bind_at_startup(registrar: &mut AppRegistrar, accelerator: &str, on_error: &BindErrorHook) {
    let error = match registrar.bind(accelerator) {
        Ok(()) => return,
        Err(e) => e,
    };
    on_error(&error);

    if accelerator == DEFAULT_ACCELERATOR {
        return;
    }
    match registrar.bind(DEFAULT_ACCELERATOR) {
        Ok(()) => info!("Using the default shortcut {DEFAULT_ACCELERATOR} instead"),
        Err(e) => {
            error!("No overlay shortcut could be bound");
            on_error(&e);
        }
    }
}

/// Last OS appearance seen and last mode published on `theme.changed`.
#[derive(Debug, Default)]
struct ThemeState {
    system: Option<ThemeMode>,
    published: Option<ThemeMode>,
}

impl ThemeState {
    /// Returns the mode to publish, or `None` when it matches what subscribers already have.
    fn observe(
        &mut self,
        preference: ThemePreference,
        system: Option<ThemeMode>,
    ) -> Option<ThemeMode> {
        if system.is_some() {
            self.system = system;
        }

        let mode = preference.resolve(self.system);
        if self.published == Some(mode) {
            return None;
        }
        self.published = Some(mode);
        Some(mode)
    }
}

/// Publishes `theme.changed` from the main context when the resolved mode moved.
fn sync_theme(
    emitter: &BusEmitter,
    theme: &SharedTheme,
    preference: ThemePreference,
    system: Option<ThemeMode>,
) {
    let next = match theme.lock() {
        Ok(mut state) => state.observe(preference, system),
        Err(_) => None,
    };

    if let Some(mode) = next {
        debug!("Theme is now {mode}");
        if let Err(e) = emitter.publish_topic(&ThemeChanged { mode }) {
            warn!("{e}");
        }
    }
}

/// What a config reload notifies besides the overlay and the registrar.
struct ConfigListeners {
    main_emitter: BusEmitter,
    theme: SharedTheme,
    on_bind_error: BindErrorHook,
}

fn watch_config(
    path: PathBuf,
    registrar: MainThreadLock<AppRegistrar>,
    overlay: AppOverlayHandle,
    listeners: ConfigListeners,
) -> notify::Result<RecommendedWatcher> {
    let directory = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let watched = path.clone();

    let mut watcher = recommended_watcher(move |res: notify::Result<notify::Event>| match res {
        Ok(event) => {
            let relevant = matches!(
                event.kind,
                notify::EventKind::Create(_) | notify::EventKind::Modify(_)
            ) && event.paths.iter().any(|p| p.file_name() == watched.file_name());
            if relevant {
                reload_config(&watched, &registrar, &overlay, &listeners);
            }
        }
        Err(e) => warn!("Config watch error: {e}"),
    })?;

    watcher.watch(&directory, RecursiveMode::NonRecursive)?;
    debug!("Watching {} for changes", path.display());
    Ok(watcher)
}

/// Runs on the watcher's thread. Rebinding goes through the UI thread and reports back.
fn reload_config(
    path: &Path,
    registrar: &MainThreadLock<AppRegistrar>,
    overlay: &AppOverlayHandle,
    listeners: &ConfigListeners,
) {
    let mut config = match Config::load_file(path) {
        Ok(config) => config,
        Err(e) => {
            warn!("Keeping previous configuration: {e}");
            return;
        }
    };
    config.config_path = Some(path.to_path_buf());

    let accelerator = config.toggle_accelerator().to_string();
    let overlay_config = config.overlay.clone();
    let preference = config.theme;
    Config::set_config(config);
    info!("Configuration reloaded");

    sync_theme(&listeners.main_emitter, &listeners.theme, preference, None);

    overlay
        .shell()
        .post(move |shell| shell.set_config(overlay_config));

    match registrar.access_blocking(move |registrar| registrar.rebind(&accelerator)) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            warn!("Kept the previous shortcut: {e}");
            (listeners.on_bind_error)(&e);
        }
        Err(e) => warn!("Could not rebind: {e}"),
    }
}

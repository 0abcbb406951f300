use jot_core::bus::{BusContext, MessageBus, OverlaySubmit, Subscription, ThemeChanged, ThemeMode};
use jot_core::config::OverlayConfig;
use jot_core::dispatcher::ManualExecutor;
use jot_core::hotkey::{HotkeyError, HotkeyRegistrar, MockHotkeyBackend};
use jot_core::overlay::{
    EntryKey, EntryView, OverlayController, OverlayHandle, OverlayShell, OverlayState,
};
use jot_core::platform::mock::{MockOverlayWindow, MockPlatform};
use jot_core::platform::ForegroundProcessHandle;
use jot_core::thread_lock::MainThreadLock;
use std::sync::{Arc, Mutex};
use std::thread;

type Shell = OverlayShell<MockOverlayWindow, MockPlatform>;

struct Harness {
    executor: Arc<ManualExecutor>,
    bus: MessageBus,
    main: BusContext,
    window: MockOverlayWindow,
    platform: MockPlatform,
    hotkeys: MockHotkeyBackend,
    registrar: HotkeyRegistrar<MockHotkeyBackend>,
    overlay: OverlayHandle<MockOverlayWindow, MockPlatform>,
    submitted: Arc<Mutex<Vec<String>>>,
    _submit_subscription: Subscription,
}

fn previous_app() -> ForegroundProcessHandle {
    ForegroundProcessHandle::new(501, Some(9))
}

fn harness() -> Harness {
    let executor = ManualExecutor::new();
    let dispatcher = executor.dispatcher();
    let bus = MessageBus::new();
    let overlay_context = bus.context("overlay").unwrap();
    let main = bus.context("main").unwrap();

    let submitted = Arc::new(Mutex::new(Vec::new()));
    let sink = submitted.clone();
    let submit_subscription =
        main.subscribe_topic(move |submit: OverlaySubmit| sink.lock().unwrap().push(submit.text));

    let window = MockOverlayWindow::new();
    let platform = MockPlatform::new();
    platform.set_foreground(Some(previous_app()));

    let controller = OverlayController::new(
        window.clone(),
        platform.clone(),
        overlay_context.emitter(),
        dispatcher.clone(),
        OverlayConfig::default(),
    )
    .unwrap();
    let shell = OverlayShell::new(controller, EntryView::new(ThemeMode::Light), overlay_context);
    let overlay = OverlayHandle::new(MainThreadLock::new(shell, dispatcher).unwrap());

    let hotkeys = MockHotkeyBackend::new();
    let toggle = overlay.clone();
    let registrar = HotkeyRegistrar::new(hotkeys.clone(), move || toggle.toggle());

    Harness {
        executor,
        bus,
        main,
        window,
        platform,
        hotkeys,
        registrar,
        overlay,
        submitted,
        _submit_subscription: submit_subscription,
    }
}

impl Harness {
    /// Presses the accelerator on a separate thread, the way the OS delivers hotkeys.
    fn press_from_os_thread(&self, accelerator: &'static str) -> bool {
        let hotkeys = self.hotkeys.clone();
        thread::spawn(move || hotkeys.press(accelerator))
            .join()
            .unwrap()
    }

    fn with_shell<R>(&self, f: impl FnOnce(&mut Shell) -> R) -> R {
        self.overlay.shell().with_mut(f).unwrap()
    }

    fn state(&self) -> OverlayState {
        self.overlay.state().unwrap()
    }

    fn type_text(&self, text: &str) {
        for c in text.chars() {
            self.with_shell(|shell| shell.on_key(EntryKey::Text(c.to_string())));
        }
    }

    fn submitted(&self) -> Vec<String> {
        self.submitted.lock().unwrap().clone()
    }
}

#[test]
fn test_happy_path() {
    let mut h = harness();
    h.registrar.bind("Alt+J").unwrap();

    assert!(h.press_from_os_thread("Alt+J"));
    // The hotkey thread only queues work.
    assert_eq!(h.state(), OverlayState::Hidden);
    assert_eq!(h.executor.pending(), 1);

    h.executor.run_pending();
    assert_eq!(h.state(), OverlayState::Showing);
    assert!(h.window.state().visible);

    h.with_shell(|shell| shell.on_focus_changed(true));
    assert_eq!(h.state(), OverlayState::Visible);

    h.type_text("buy milk");
    h.with_shell(|shell| shell.on_key(EntryKey::Enter));
    assert_eq!(h.state(), OverlayState::Hidden);
    assert!(!h.window.state().visible);

    // Delivery happens when the main context is pumped.
    assert!(h.submitted().is_empty());
    h.main.pump();
    assert_eq!(h.submitted(), vec!["buy milk".to_string()]);

    assert_eq!(h.platform.reactivated(), vec![previous_app()]);
}

#[test]
fn test_empty_submit() {
    let mut h = harness();

    h.overlay.show();
    h.with_shell(|shell| shell.on_focus_changed(true));
    h.type_text("   ");
    h.with_shell(|shell| shell.on_key(EntryKey::Enter));
    h.main.pump();

    assert_eq!(h.state(), OverlayState::Hidden);
    assert!(h.submitted().is_empty());
    assert_eq!(h.platform.reactivated().len(), 1);
}

#[test]
fn test_escape_dismisses_without_publishing() {
    let mut h = harness();

    h.overlay.show();
    h.with_shell(|shell| shell.on_focus_changed(true));
    h.type_text("never mind");
    h.with_shell(|shell| shell.on_key(EntryKey::Escape));
    h.main.pump();

    assert_eq!(h.state(), OverlayState::Hidden);
    assert!(h.submitted().is_empty());
}

#[test]
fn test_bind_collision() {
    let mut h = harness();
    h.hotkeys.claim_elsewhere("Alt+Space");

    assert!(matches!(
        h.registrar.bind("Alt+Space"),
        Err(HotkeyError::AlreadyBound { .. })
    ));
    assert!(!h.registrar.binding().bound);
    assert!(!h.press_from_os_thread("Alt+Space"));

    h.registrar.bind("Alt+J").unwrap();
    assert!(h.registrar.bind("Alt+Space").is_err());

    assert!(h.press_from_os_thread("Alt+J"));
    h.executor.run_pending();
    assert_eq!(h.state(), OverlayState::Showing);
}

#[test]
fn test_rapid_retoggle() {
    let mut h = harness();
    h.registrar.bind("Alt+J").unwrap();

    let hotkeys = h.hotkeys.clone();
    thread::spawn(move || {
        hotkeys.press("Alt+J");
        hotkeys.press("Alt+J");
    })
    .join()
    .unwrap();

    assert_eq!(h.executor.pending(), 2);
    h.executor.run_pending();

    assert_eq!(h.state(), OverlayState::Hidden);
    assert_eq!(h.platform.captures(), 1);
    assert_eq!(h.window.times_shown(), 1);
    assert_eq!(h.platform.reactivated().len(), 1);
}

#[test]
fn test_show_is_idempotent() {
    let h = harness();

    h.overlay.show();
    h.overlay.show();

    assert_eq!(h.window.times_shown(), 1);
    assert_eq!(h.platform.captures(), 1);
    h.with_shell(|shell| assert!(shell.controller().tracker().is_armed()));
}

#[test]
fn test_single_use_reactivation() {
    let h = harness();

    h.overlay.show();
    h.overlay.hide();
    h.overlay.hide();

    assert_eq!(h.platform.reactivated().len(), 1);
}

#[test]
fn test_rebind_rollback() {
    let mut h = harness();
    h.hotkeys.claim_elsewhere("Alt+Space");
    h.registrar.bind("Alt+J").unwrap();

    assert!(h.registrar.rebind("Alt+Space").is_err());

    assert!(h.hotkeys.is_registered("Alt+J"));
    assert!(!h.hotkeys.is_registered("Alt+Space"));
    assert!(h.press_from_os_thread("Alt+J"));
    h.executor.run_pending();
    assert_eq!(h.state(), OverlayState::Showing);
}

#[test]
fn test_message_delivery_scoping() {
    let mut h = harness();

    h.overlay.show();
    h.with_shell(|shell| shell.on_focus_changed(true));
    h.type_text("first");
    h.with_shell(|shell| shell.on_key(EntryKey::Enter));

    let late = Arc::new(Mutex::new(Vec::new()));
    let sink = late.clone();
    let _late_subscription =
        h.main
            .subscribe_topic(move |submit: OverlaySubmit| sink.lock().unwrap().push(submit.text));

    h.main.pump();

    assert_eq!(h.submitted(), vec!["first".to_string()]);
    assert!(late.lock().unwrap().is_empty());
}

#[test]
fn test_theme_resyncs_on_focus() {
    let h = harness();
    let theme_source = h.bus.context("theme").unwrap();

    theme_source
        .publish_topic(&ThemeChanged {
            mode: ThemeMode::Dark,
        })
        .unwrap();
    h.with_shell(|shell| shell.pump_bus());

    h.overlay.show();
    assert_eq!(h.with_shell(|shell| shell.view().theme()), ThemeMode::Light);

    h.with_shell(|shell| shell.on_focus_changed(true));
    assert_eq!(h.with_shell(|shell| shell.view().theme()), ThemeMode::Dark);
}

#[test]
fn test_state_query_waits_for_ui_thread() {
    let h = harness();
    h.overlay.show();

    let overlay = h.overlay.clone();
    let query = thread::spawn(move || overlay.state());

    while h.executor.pending() == 0 {
        thread::yield_now();
    }
    h.executor.run_pending();

    assert_eq!(query.join().unwrap().unwrap(), OverlayState::Showing);
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Show,
    Hide,
    Toggle,
    Focus,
    Blur,
    Enter,
    Escape,
}

const OPS: [Op; 7] = [
    Op::Show,
    Op::Hide,
    Op::Toggle,
    Op::Focus,
    Op::Blur,
    Op::Enter,
    Op::Escape,
];

fn apply(h: &Harness, op: Op) {
    match op {
        Op::Show => h.overlay.show(),
        Op::Hide => h.overlay.hide(),
        Op::Toggle => h.overlay.toggle(),
        Op::Focus => h.with_shell(|shell| shell.on_focus_changed(true)),
        Op::Blur => h.with_shell(|shell| shell.on_focus_changed(false)),
        Op::Enter => {
            h.type_text("x");
            h.with_shell(|shell| shell.on_key(EntryKey::Enter));
        }
        Op::Escape => h.with_shell(|shell| shell.on_key(EntryKey::Escape)),
    }
}

#[test]
fn test_state_machine_closure() {
    for a in OPS {
        for b in OPS {
            for c in OPS {
                let h = harness();
                for op in [a, b, c] {
                    apply(&h, op);
                    h.executor.run_pending();

                    let state = h.state();
                    assert_ne!(state, OverlayState::Dismissing, "after {a:?} {b:?} {c:?}");
                    assert_eq!(
                        h.window.state().visible,
                        state != OverlayState::Hidden,
                        "after {a:?} {b:?} {c:?}"
                    );
                }
                let hidden = h.state() == OverlayState::Hidden;
                assert!(!hidden || !h.with_shell(|s| s.controller().tracker().is_armed()));
            }
        }
    }
}

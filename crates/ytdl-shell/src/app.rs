use crate::config::Config;
use crate::destinations;
use crate::gateway::GatewayEvent;
use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::net::Ipv6Addr;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, info, warn};
use ytdl_core::{
    affordances, save_preferences, Action, ActivityTracker, Affordance, Destination, Endpoint,
    NavigationOutcome, Preferences, PushEvent, Router, SessionState, SessionStore, Settings,
    Subscriptions, FREE_SPACE_EVENT,
};

pub const FEED_CAPACITY: usize = 12;
const FEED_EXCERPT_CHARS: usize = 80;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Drawer {
    Open,
    Collapsed,
}

impl Drawer {
    pub fn toggled(self) -> Self {
        match self {
            Drawer::Open => Drawer::Collapsed,
            Drawer::Collapsed => Drawer::Open,
        }
    }

    pub fn is_open(self) -> bool {
        self == Drawer::Open
    }
}

#[derive(Clone, Debug)]
pub struct FeedEntry {
    pub at: DateTime<Local>,
    pub name: String,
    pub text: String,
}

#[derive(Clone, Debug, Default)]
pub struct AddressEditor {
    pub active: bool,
    pub buffer: String,
    pub note: Option<String>,
}

type SaveFailure = Rc<RefCell<Option<String>>>;

pub struct App {
    store: SessionStore,
    port: u16,
    activity_event: String,
    preferences_path: PathBuf,
    save_failure: SaveFailure,
    drawer: Drawer,
    free_disk_space: String,
    router: Router,
    nav_cursor: usize,
    activity: ActivityTracker,
    feed: VecDeque<FeedEntry>,
    last_backend_event: Option<DateTime<Local>>,
    editor: AddressEditor,
    pending_endpoint: Option<Endpoint>,
    help_open: bool,
    quit: bool,
}

impl App {
    pub fn new(config: &Config) -> Self {
        let mut store = SessionStore::new(Settings {
            server_address: config.server_address.clone(),
        });
        let save_failure: SaveFailure = Rc::new(RefCell::new(None));
        store.observe(persist_server_address(
            config.preferences_path.clone(),
            Rc::clone(&save_failure),
        ));

        let mut router = Router::default();
        if let Err(err) = router.open_route(&config.initial_route) {
            warn!("initial_route_ignored: {err}");
        }
        let nav_cursor = destination_index(router.current());

        Self {
            activity: ActivityTracker::new(store.status().downloading),
            store,
            port: config.port,
            activity_event: config.activity_event.clone(),
            preferences_path: config.preferences_path.clone(),
            save_failure,
            drawer: Drawer::Collapsed,
            free_disk_space: String::new(),
            router,
            nav_cursor,
            feed: VecDeque::with_capacity(FEED_CAPACITY),
            last_backend_event: None,
            editor: AddressEditor::default(),
            pending_endpoint: None,
            help_open: false,
            quit: false,
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.store.settings().server_address.as_str(), self.port)
    }

    pub fn drawer(&self) -> Drawer {
        self.drawer
    }

    pub fn toggle_drawer(&mut self) {
        self.drawer = self.drawer.toggled();
    }

    pub fn free_disk_space(&self) -> &str {
        &self.free_disk_space
    }

    /// Replaces the cached announcement wholesale; the payload is not validated.
    pub fn set_free_disk_space(&mut self, text: String) {
        self.free_disk_space = text;
    }

    pub fn current_destination(&self) -> Destination {
        self.router.current()
    }

    pub fn affordances(&self) -> [Affordance; 2] {
        affordances(self.store.status())
    }

    pub fn nav_cursor(&self) -> usize {
        self.nav_cursor
    }

    pub fn activity_event(&self) -> &str {
        &self.activity_event
    }

    pub fn preferences_path(&self) -> &Path {
        &self.preferences_path
    }

    pub fn feed(&self) -> impl DoubleEndedIterator<Item = &FeedEntry> {
        self.feed.iter()
    }

    pub fn last_backend_event(&self) -> Option<DateTime<Local>> {
        self.last_backend_event
    }

    pub fn note_backend_event(&mut self) {
        self.last_backend_event = Some(Local::now());
    }

    pub fn editor(&self) -> &AddressEditor {
        &self.editor
    }

    pub fn help_open(&self) -> bool {
        self.help_open
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    pub fn take_pending_endpoint(&mut self) -> Option<Endpoint> {
        self.pending_endpoint.take()
    }

    pub fn observe_activity(&mut self, payload: &Value) {
        match self.activity.observe(payload) {
            Some(action) => {
                info!(action = action.label(), "job_activity_transition");
                self.store.dispatch(action);
            }
            None => debug!("job_activity_unchanged_or_unrecognized: {payload}"),
        }
    }

    pub fn record_feed(&mut self, event: &PushEvent) {
        if self.feed.len() == FEED_CAPACITY {
            self.feed.pop_front();
        }
        self.feed.push_back(FeedEntry {
            at: Local::now(),
            name: event.name.clone(),
            text: excerpt(&event.display_text(), FEED_EXCERPT_CHARS),
        });
    }

    pub fn follow(&mut self, destination: Destination) -> NavigationOutcome {
        let outcome = self.router.follow(destination, self.store.status());
        match outcome {
            NavigationOutcome::Navigated => {
                self.nav_cursor = destination_index(destination);
                self.editor = AddressEditor::default();
            }
            NavigationOutcome::Blocked => {
                debug!(destination = destination.title(), "navigation_blocked");
            }
            NavigationOutcome::AlreadyThere => {}
        }
        outcome
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.quit = true;
            return;
        }
        if self.editor.active {
            self.handle_editor_key(key);
            return;
        }
        if matches!(key.code, KeyCode::Char('?') | KeyCode::F(1)) {
            self.help_open = !self.help_open;
            return;
        }
        if key.code == KeyCode::Esc && self.help_open {
            self.help_open = false;
            return;
        }
        if self.help_open {
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.quit = true,
            KeyCode::Char('m') => self.toggle_drawer(),
            KeyCode::Down | KeyCode::Char('j') => self.move_nav_cursor(1),
            KeyCode::Up | KeyCode::Char('k') => self.move_nav_cursor(-1),
            KeyCode::Enter => {
                self.follow(Destination::ALL[self.nav_cursor]);
            }
            KeyCode::Char('1') => {
                self.follow(Destination::Home);
            }
            KeyCode::Char('2') => {
                self.follow(Destination::Settings);
            }
            KeyCode::Char('e') if self.router.current() == Destination::Settings => {
                self.start_edit();
            }
            _ => {}
        }
    }

    fn move_nav_cursor(&mut self, delta: isize) {
        let len = Destination::ALL.len() as isize;
        let next = (self.nav_cursor as isize + delta).rem_euclid(len);
        self.nav_cursor = next as usize;
    }

    fn start_edit(&mut self) {
        self.editor = AddressEditor {
            active: true,
            buffer: self.store.settings().server_address.clone(),
            note: None,
        };
    }

    fn handle_editor_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.editor = AddressEditor::default(),
            KeyCode::Enter => self.commit_address(),
            KeyCode::Backspace => {
                self.editor.buffer.pop();
            }
            KeyCode::Char(ch) => self.editor.buffer.push(ch),
            _ => {}
        }
    }

    fn commit_address(&mut self) {
        let value = self.editor.buffer.trim().to_string();
        if value.is_empty() {
            self.editor.note = Some("Server address cannot be empty".to_string());
            return;
        }
        if has_port_or_scheme(&value) {
            self.editor.note = Some("Enter a bare host; the port comes from --port".to_string());
            return;
        }
        let changed = self.store.dispatch(Action::SetServerAddress(value));
        self.editor.active = false;
        self.editor.buffer.clear();
        if !changed {
            self.editor.note = Some("Server address unchanged".to_string());
            return;
        }

        self.free_disk_space.clear();
        self.feed.clear();
        self.last_backend_event = None;
        self.activity.reset(self.store.status().downloading);
        let endpoint = self.endpoint();
        info!(endpoint = %endpoint, "server_address_changed");
        self.pending_endpoint = Some(endpoint);
        self.editor.note = Some(match self.save_failure.borrow().as_deref() {
            Some(err) => format!("Using new address for this session only ({err})"),
            None => "Server address saved".to_string(),
        });
    }
}

fn excerpt(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// True for `host:port` or `scheme://host` input; a bare IPv6 literal is fine.
fn has_port_or_scheme(address: &str) -> bool {
    let bare = address.trim_start_matches('[').trim_end_matches(']');
    address.contains(':') && bare.parse::<Ipv6Addr>().is_err()
}

fn destination_index(destination: Destination) -> usize {
    Destination::ALL
        .iter()
        .position(|candidate| *candidate == destination)
        .unwrap_or(0)
}

fn persist_server_address(
    path: PathBuf,
    failure: SaveFailure,
) -> impl FnMut(&SessionState, &Action) + 'static {
    move |state, action| {
        if !matches!(action, Action::SetServerAddress(_)) {
            return;
        }
        let preferences = Preferences {
            server_addr: Some(state.settings.server_address.clone()),
        };
        match save_preferences(&path, &preferences) {
            Ok(()) => {
                info!(path = %path.display(), "preferences_saved");
                *failure.borrow_mut() = None;
            }
            Err(err) => {
                warn!("preferences_save_error: {err}");
                *failure.borrow_mut() = Some(err.to_string());
            }
        }
    }
}

/// Handlers the shell registers once per lifetime, before the first event:
/// the header and status handlers, then each destination's own.
pub fn shell_subscriptions(activity_event: &str) -> Subscriptions<App> {
    let mut subscriptions = Subscriptions::new();
    subscriptions.subscribe(FREE_SPACE_EVENT, "header.free_space", |event, app: &mut App| {
        app.set_free_disk_space(event.display_text())
    });
    subscriptions.subscribe(activity_event, "status.activity", |event, app: &mut App| {
        app.observe_activity(&event.payload)
    });
    destinations::register_all(&mut subscriptions);
    subscriptions
}

pub fn apply_gateway_event(
    app: &mut App,
    subscriptions: &mut Subscriptions<App>,
    event: GatewayEvent,
) {
    match event {
        GatewayEvent::Connected { sid } => {
            info!(sid = %sid, endpoint = %app.endpoint(), "backend_connected");
        }
        GatewayEvent::Disconnected => {
            info!(endpoint = %app.endpoint(), "backend_disconnected");
        }
        GatewayEvent::Push(event) => {
            let invoked = subscriptions.deliver(&event, app);
            debug!(event = %event.name, invoked, "push_event");
        }
    }
}

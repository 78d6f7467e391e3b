use crate::socket_io::DEFAULT_HOST;

/// User-configurable connection preferences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_address: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_address: DEFAULT_HOST.to_string(),
        }
    }
}

/// Operational facts derived from backend events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Status {
    pub downloading: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub settings: Settings,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SetServerAddress(String),
    SetDownloading(bool),
}

impl Action {
    pub fn label(&self) -> &'static str {
        match self {
            Action::SetServerAddress(_) => "set_server_address",
            Action::SetDownloading(_) => "set_downloading",
        }
    }
}

/// Applies one action. A new server address invalidates the status derived
/// from the previous endpoint.
pub fn reduce(state: &SessionState, action: &Action) -> SessionState {
    match action {
        Action::SetServerAddress(address) => {
            if *address == state.settings.server_address {
                return state.clone();
            }
            SessionState {
                settings: Settings {
                    server_address: address.clone(),
                },
                status: Status::default(),
            }
        }
        Action::SetDownloading(downloading) => SessionState {
            settings: state.settings.clone(),
            status: Status {
                downloading: *downloading,
            },
        },
    }
}

type Observer = Box<dyn FnMut(&SessionState, &Action)>;

/// Single owner of the `settings` and `status` slices.
///
/// Consumers read through shared references and mutate only via
/// [`SessionStore::dispatch`]; `&mut self` serializes every application.
/// Observers run after each action that changed the state.
pub struct SessionStore {
    state: SessionState,
    observers: Vec<Observer>,
    revision: u64,
}

impl SessionStore {
    pub fn new(settings: Settings) -> Self {
        Self {
            state: SessionState {
                settings,
                status: Status::default(),
            },
            observers: Vec::new(),
            revision: 0,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.state.settings
    }

    pub fn status(&self) -> &Status {
        &self.state.status
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn observe<F>(&mut self, observer: F)
    where
        F: FnMut(&SessionState, &Action) + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    /// Returns whether the state changed. Unchanged results are a completed no-op.
    pub fn dispatch(&mut self, action: Action) -> bool {
        let next = reduce(&self.state, &action);
        if next == self.state {
            return false;
        }
        self.state = next;
        self.revision += 1;
        for observer in self.observers.iter_mut() {
            observer(&self.state, &action);
        }
        true
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn starts_idle_with_default_host() {
        let store = SessionStore::default();
        assert_eq!(store.settings().server_address, "localhost");
        assert!(!store.status().downloading);
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn reduce_is_deterministic() {
        let state = SessionState::default();
        let action = Action::SetDownloading(true);
        assert_eq!(reduce(&state, &action), reduce(&state, &action));
        assert!(reduce(&state, &action).status.downloading);
        assert_eq!(reduce(&state, &action).settings, state.settings);
    }

    #[test]
    fn new_address_resets_derived_status() {
        let state = SessionState {
            settings: Settings::default(),
            status: Status { downloading: true },
        };
        let next = reduce(&state, &Action::SetServerAddress("192.168.1.5".to_string()));
        assert_eq!(next.settings.server_address, "192.168.1.5");
        assert!(!next.status.downloading);

        let same = reduce(&state, &Action::SetServerAddress("localhost".to_string()));
        assert!(same.status.downloading);
    }

    #[test]
    fn unchanged_dispatch_is_a_quiet_no_op() {
        let calls = Rc::new(RefCell::new(0));
        let mut store = SessionStore::default();
        let seen = Rc::clone(&calls);
        store.observe(move |_, _| *seen.borrow_mut() += 1);

        assert!(!store.dispatch(Action::SetDownloading(false)));
        assert_eq!(*calls.borrow(), 0);
        assert_eq!(store.revision(), 0);

        assert!(store.dispatch(Action::SetDownloading(true)));
        assert_eq!(*calls.borrow(), 1);
        assert_eq!(store.revision(), 1);
    }

    #[test]
    fn observers_see_state_after_mutation_in_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut store = SessionStore::default();
        let sink = Rc::clone(&log);
        store.observe(move |state, action| {
            sink.borrow_mut()
                .push((action.label(), state.status.downloading));
        });

        store.dispatch(Action::SetDownloading(true));
        store.dispatch(Action::SetDownloading(false));
        store.dispatch(Action::SetServerAddress("nas.local".to_string()));

        assert_eq!(
            *log.borrow(),
            vec![
                ("set_downloading", true),
                ("set_downloading", false),
                ("set_server_address", false),
            ]
        );
        assert_eq!(store.settings().server_address, "nas.local");
    }
}

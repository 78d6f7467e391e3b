use crate::session::Status;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    Home,
    Settings,
}

impl Destination {
    pub const ALL: [Destination; 2] = [Destination::Home, Destination::Settings];

    pub fn route(self) -> &'static str {
        match self {
            Destination::Home => "/",
            Destination::Settings => "/settings",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Destination::Home => "Home",
            Destination::Settings => "Settings",
        }
    }

    pub fn from_route(route: &str) -> Option<Self> {
        let trimmed = route.trim();
        let normalized = if trimmed.len() > 1 {
            trimmed.trim_end_matches('/')
        } else {
            trimmed
        };
        Destination::ALL
            .into_iter()
            .find(|destination| destination.route() == normalized)
    }
}

/// A side-panel entry as the guard sees it on this render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Affordance {
    pub destination: Destination,
    pub enabled: bool,
}

pub fn is_enabled(status: &Status, _destination: Destination) -> bool {
    !status.downloading
}

/// Recomputed on every call; nothing is latched between renders.
pub fn affordances(status: &Status) -> [Affordance; 2] {
    Destination::ALL.map(|destination| Affordance {
        destination,
        enabled: is_enabled(status, destination),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationOutcome {
    Navigated,
    AlreadyThere,
    Blocked,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NavigationError {
    #[error("no destination for route '{0}'")]
    UnknownRoute(String),
}

#[derive(Debug, Clone)]
pub struct Router {
    current: Destination,
}

impl Router {
    pub fn new(initial: Destination) -> Self {
        Self { current: initial }
    }

    pub fn current(&self) -> Destination {
        self.current
    }

    /// Follows a side-panel affordance. Disabled affordances have no effect.
    pub fn follow(&mut self, destination: Destination, status: &Status) -> NavigationOutcome {
        if !is_enabled(status, destination) {
            return NavigationOutcome::Blocked;
        }
        if self.current == destination {
            return NavigationOutcome::AlreadyThere;
        }
        self.current = destination;
        NavigationOutcome::Navigated
    }

    /// Direct route entry. The guard is advisory and not consulted here.
    pub fn open_route(&mut self, route: &str) -> Result<Destination, NavigationError> {
        let destination = Destination::from_route(route)
            .ok_or_else(|| NavigationError::UnknownRoute(route.to_string()))?;
        self.current = destination;
        Ok(destination)
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new(Destination::Home)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDLE: Status = Status { downloading: false };
    const BUSY: Status = Status { downloading: true };

    #[test]
    fn affordances_disabled_iff_downloading() {
        for status in [IDLE, BUSY] {
            for affordance in affordances(&status) {
                assert_eq!(affordance.enabled, !status.downloading);
            }
        }
    }

    #[test]
    fn affordances_follow_every_transition() {
        let mut status = IDLE;
        let mut frames = Vec::new();
        for downloading in [true, false] {
            status.downloading = downloading;
            frames.push(affordances(&status).iter().all(|a| a.enabled));
        }
        assert_eq!(frames, vec![false, true]);
    }

    #[test]
    fn blocked_follow_keeps_current_destination() {
        let mut router = Router::default();
        assert_eq!(
            router.follow(Destination::Settings, &BUSY),
            NavigationOutcome::Blocked
        );
        assert_eq!(router.current(), Destination::Home);

        assert_eq!(
            router.follow(Destination::Settings, &IDLE),
            NavigationOutcome::Navigated
        );
        assert_eq!(
            router.follow(Destination::Settings, &IDLE),
            NavigationOutcome::AlreadyThere
        );
        assert_eq!(router.current(), Destination::Settings);
    }

    #[test]
    fn routes_map_one_to_one() {
        assert_eq!(Destination::from_route("/"), Some(Destination::Home));
        assert_eq!(
            Destination::from_route("/settings/"),
            Some(Destination::Settings)
        );
        assert_eq!(Destination::from_route("/jobs"), None);
    }

    #[test]
    fn open_route_bypasses_the_guard() {
        let mut router = Router::default();
        assert_eq!(router.open_route("/settings"), Ok(Destination::Settings));
        assert_eq!(router.current(), Destination::Settings);
        assert_eq!(
            router.open_route("/nope"),
            Err(NavigationError::UnknownRoute("/nope".to_string()))
        );
        assert_eq!(router.current(), Destination::Settings);
    }
}

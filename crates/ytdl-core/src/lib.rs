pub mod activity;
pub mod navigation;
pub mod preferences;
pub mod session;
pub mod socket_io;
pub mod subscription;

pub use activity::{parse_activity, ActivityTracker, DEFAULT_ACTIVITY_EVENT};
pub use navigation::{affordances, Affordance, Destination, NavigationOutcome, Router};
pub use preferences::{load_preferences, save_preferences, Preferences, PreferencesError};
pub use session::{Action, SessionState, SessionStore, Settings, Status};
pub use socket_io::{Endpoint, EnginePacket, PacketError, PushEvent, SocketPacket, DEFAULT_PORT};
pub use subscription::Subscriptions;

/// Event carrying the backend's formatted free disk space.
pub const FREE_SPACE_EVENT: &str = "free-space";

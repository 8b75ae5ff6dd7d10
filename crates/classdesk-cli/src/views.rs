//! Terminal renderings of the login screen and the dashboard.

use std::sync::Arc;

use classdesk_core::{Session, SessionManager, Subscription};
use parking_lot::Mutex;

/// Accounts seeded by the backend's database initializer.
pub const DEMO_ACCOUNTS: [(&str, &str, &str); 3] = [
    ("Admin", "admin", "password123"),
    ("Teacher", "teacher1", "password123"),
    ("Student", "student1", "password123"),
];

/// Dashboard that re-renders from whatever the session manager publishes.
pub struct DashboardView {
    latest: Arc<Mutex<Option<Session>>>,
    _subscription: Subscription,
}

impl DashboardView {
    pub fn attach(manager: &SessionManager) -> Self {
        let latest = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&latest);
        let subscription = manager.subscribe(move |state| {
            *sink.lock() = state.cloned();
        });

        Self {
            latest,
            _subscription: subscription,
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.latest.lock().is_some()
    }

    pub fn render(&self) -> String {
        render_dashboard(self.latest.lock().as_ref())
    }
}

pub fn render_dashboard(session: Option<&Session>) -> String {
    let Some(session) = session else {
        return "You are not logged in. Run `classdesk login` to sign in.\n".to_string();
    };

    let role = title_case(&session.primary_role);
    let mut out = String::new();
    out.push_str("Dashboard\n=========\n\n");
    out.push_str(&format!("Hello {}!\n", role));
    out.push_str(&format!("Welcome back, {}\n\n", session.display_name));
    out.push_str(&format!("  {:<10} {}\n", "Role:", role));
    out.push_str(&format!("  {:<10} {}\n", "Username:", session.display_name));
    out
}

pub fn render_demo_accounts() -> String {
    let mut out = String::from("Demo Accounts:\n");
    for (label, username, password) in DEMO_ACCOUNTS {
        out.push_str(&format!("  {:<8} {} / {}\n", format!("{}:", label), username, password));
    }
    out
}

/// Capitalize the first letter of each word and lowercase the rest.
pub fn title_case(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

//! Application wiring for the classdesk terminal client.
//!
//! `App` owns the single `SessionManager` for the process and the views
//! that observe it, and runs one `Command` per invocation.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::{debug, info, warn};

use classdesk_core::api::LOGIN_REJECTED_MESSAGE;
use classdesk_core::{AuthClient, Config, FileStore, SessionManager};

use crate::credentials::CredentialStore;
use crate::views::{render_demo_accounts, DashboardView};

const USERNAME_ENV: &str = "CLASSDESK_USERNAME";
const PASSWORD_ENV: &str = "CLASSDESK_PASSWORD";

pub const USAGE: &str = "\
Usage: classdesk [COMMAND]

Commands:
  dashboard                     Show the logged-in user (default)
  login [USERNAME] [--remember] Log in; --remember keeps the password in the OS keychain
  logout [--forget]             Log out; --forget also removes the remembered password
  demo-accounts                 List the demo accounts
  help                          Show this message";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Dashboard,
    Login { username: Option<String>, remember: bool },
    Logout { forget: bool },
    DemoAccounts,
    Help,
}

impl Command {
    pub fn parse(args: &[String]) -> Result<Self> {
        let Some((name, rest)) = args.split_first() else {
            return Ok(Command::Dashboard);
        };

        match name.as_str() {
            "dashboard" => {
                Self::expect_no_args(name, rest)?;
                Ok(Command::Dashboard)
            }
            "login" => {
                let mut username = None;
                let mut remember = false;
                for arg in rest {
                    match arg.as_str() {
                        "--remember" => remember = true,
                        flag if flag.starts_with("--") => bail!("Unknown option for login: {}", flag),
                        value if username.is_none() => username = Some(value.to_string()),
                        extra => bail!("Unexpected argument for login: {}", extra),
                    }
                }
                Ok(Command::Login { username, remember })
            }
            "logout" => match rest {
                [] => Ok(Command::Logout { forget: false }),
                [flag] if flag == "--forget" => Ok(Command::Logout { forget: true }),
                _ => bail!("Unexpected arguments for logout: {}", rest.join(" ")),
            },
            "demo-accounts" => {
                Self::expect_no_args(name, rest)?;
                Ok(Command::DemoAccounts)
            }
            "help" | "--help" | "-h" => Ok(Command::Help),
            other => bail!("Unknown command: {}", other),
        }
    }

    fn expect_no_args(name: &str, rest: &[String]) -> Result<()> {
        if !rest.is_empty() {
            bail!("Unexpected arguments for {}: {}", name, rest.join(" "));
        }
        Ok(())
    }
}

pub struct App {
    config: Config,
    session: Arc<SessionManager>,
    dashboard: DashboardView,
    credentials: CredentialStore,
}

impl App {
    pub fn new() -> Result<Self> {
        let config = match Config::load() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        };

        let data_dir = config.data_dir().unwrap_or_else(|_| PathBuf::from("./.classdesk"));
        let api_url = config.api_url();
        debug!(?data_dir, api_url = %api_url, "Configuration resolved");

        let credentials = CredentialStore::keychain(api_url.clone());
        let client = AuthClient::new(api_url)?;
        let session = Arc::new(SessionManager::new(client, Arc::new(FileStore::new(data_dir))));
        let dashboard = DashboardView::attach(&session);

        Ok(Self {
            config,
            session,
            dashboard,
            credentials,
        })
    }

    pub async fn run(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Dashboard => {
                self.show_dashboard();
                Ok(())
            }
            Command::Login { username, remember } => self.login(username, remember).await,
            Command::Logout { forget } => {
                self.logout(forget);
                Ok(())
            }
            Command::DemoAccounts => {
                print!("{}", render_demo_accounts());
                Ok(())
            }
            Command::Help => {
                println!("{}", USAGE);
                Ok(())
            }
        }
    }

    fn show_dashboard(&self) {
        // Expiry is checked here; an expired token republishes "logged out"
        let authenticated = self.session.is_authenticated();
        debug!(authenticated, view_logged_in = self.dashboard.is_logged_in(), "Rendering dashboard");
        print!("{}", self.dashboard.render());
    }

    async fn login(&mut self, username: Option<String>, remember: bool) -> Result<()> {
        let username = match username.or_else(|| std::env::var(USERNAME_ENV).ok()) {
            Some(u) => u,
            None => self.prompt_username()?,
        };
        let password = self.resolve_password(&username)?;

        if username.is_empty() || password.is_empty() {
            bail!("Username and password required");
        }

        println!("Logging in...");

        match self.session.login(&username, &password).await {
            Ok(true) => {
                if remember {
                    if let Err(e) = self.credentials.remember(&username, &password) {
                        warn!(error = %e, "Failed to store credentials");
                    }
                }

                self.config.last_username = Some(username);
                if let Err(e) = self.config.save() {
                    warn!(error = %e, "Failed to save config");
                }

                info!("Login successful");
                println!();
                print!("{}", self.dashboard.render());
                Ok(())
            }
            Ok(false) => bail!(LOGIN_REJECTED_MESSAGE),
            Err(e) => {
                let message = e.user_message();
                Err(anyhow::Error::new(e).context(message))
            }
        }
    }

    fn logout(&mut self, forget: bool) {
        let user = self
            .session
            .current_session()
            .map(|s| s.display_name)
            .or_else(|| self.config.last_username.clone());

        self.session.logout();

        if forget {
            if let Some(ref user) = user {
                if let Err(e) = self.credentials.forget(user) {
                    warn!(error = %e, "Failed to remove stored credentials");
                }
            }
        }

        println!("Logged out.");
    }

    fn prompt_username(&self) -> Result<String> {
        match self.config.last_username {
            Some(ref last) => print!("Username [{}]: ", last),
            None => print!("Username: "),
        }
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let input = input.trim();

        Ok(match self.config.last_username {
            Some(ref last) if input.is_empty() => last.clone(),
            _ => input.to_string(),
        })
    }

    fn resolve_password(&self, username: &str) -> Result<String> {
        if let Ok(password) = std::env::var(PASSWORD_ENV) {
            return Ok(password);
        }

        if let Some(stored) = self.credentials.lookup(username) {
            print!("Use stored password? [Y/n]: ");
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;

            if input.trim().to_lowercase() != "n" {
                return Ok(stored);
            }
        }

        Ok(rpassword::prompt_password("Password: ")?)
    }
}

//! Line-oriented terminal front end over the gate, auth flows and controller
use crate::{
    api::ApiGateway,
    auth::{AccessGate, AuthFlow, Navigation},
    config::ClientConfig,
    controller::{DisplayState, LinkController, LinkScope},
    feedback::{Clipboard, CopyFeedback, DeleteConfirmation},
    models::{Credentials, Realm, Registration},
    routes::Route,
    session::{SessionEvent, SessionStore},
};
use anyhow::Result;
use std::{cell::RefCell, io::Write, sync::Arc};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt},
    sync::broadcast,
};

const HELP: &str = "\
Commands:
  open <path>                   navigate (/, /login, /signup, /admin/dashboard, ...)
  login <email> <password>      sign in on the current login page
  signup <name> <email> <pw>    register on the current signup page
  logout                        sign out of the current realm
  whoami                        show the signed-in name
  list                          re-fetch the current list (admin: show all)
  shorten <url>                 create a short link (user home)
  search <email>                list links owned by <email> (admin dashboard)
  copy <id>                     copy a public link
  visit <id>                    open a public link
  delete <id>                   ask to delete a link
  confirm | cancel              answer the pending delete
  help | quit";

#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Keeps the copied text so the shell can echo it back.
#[derive(Default)]
struct EchoClipboard(RefCell<Option<String>>);

impl Clipboard for EchoClipboard {
    fn write_text(&self, text: &str) -> std::io::Result<()> {
        *self.0.borrow_mut() = Some(text.to_owned());
        Ok(())
    }
}

pub struct Shell<W: Write> {
    gateway: Arc<dyn ApiGateway>,
    gate: AccessGate,
    auth: AuthFlow,
    events: broadcast::Receiver<SessionEvent>,
    copy_base_url: String,
    route: Route,
    controller: Option<LinkController>,
    copied: CopyFeedback,
    confirm: DeleteConfirmation,
    out: W,
}

impl<W: Write> Shell<W> {
    pub fn new(
        config: &ClientConfig,
        gateway: Arc<dyn ApiGateway>,
        sessions: SessionStore,
        out: W,
    ) -> Self {
        Self {
            gate: AccessGate::new(sessions.clone()),
            auth: AuthFlow::new(gateway.clone(), sessions.clone()),
            events: sessions.subscribe(),
            gateway,
            copy_base_url: config.copy_base_url.clone(),
            route: Route::NotFound,
            controller: None,
            copied: CopyFeedback::new(config.copy_feedback),
            confirm: DeleteConfirmation::new(),
            out,
        }
    }

    pub fn route(&self) -> Route {
        self.route
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    /// Read commands from `input` until EOF or `quit`.
    pub async fn run<R: AsyncBufRead + Unpin>(&mut self, input: R) -> Result<()> {
        writeln!(self.out, "Type `help` for commands.")?;
        self.open("/").await?;

        let mut lines = input.lines();
        loop {
            write!(self.out, "{}> ", self.route.path())?;
            self.out.flush()?;
            let Some(line) = lines.next_line().await? else {
                break;
            };
            if self.execute(&line).await? == Flow::Quit {
                break;
            }
        }
        Ok(())
    }

    pub async fn execute(&mut self, line: &str) -> Result<Flow> {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Ok(Flow::Continue);
        };
        let args: Vec<&str> = words.collect();

        match (command, args.as_slice()) {
            ("help", _) => writeln!(self.out, "{HELP}")?,
            ("quit" | "exit", _) => return Ok(Flow::Quit),
            ("open", [path]) => self.open(path).await?,
            ("login", [email, password]) => self.login(email, password).await?,
            ("signup", [name, email, password]) => self.signup(name, email, password).await?,
            ("logout", []) => self.logout()?,
            ("whoami", []) => self.whoami()?,
            ("list", []) => self.list().await?,
            ("shorten", [url]) => self.shorten(url).await?,
            ("search", [email]) => self.search(email).await?,
            ("copy", [id]) => self.copy(id)?,
            ("visit", [id]) => self.visit(id).await?,
            ("delete", [id]) => self.request_delete(id)?,
            ("confirm", []) => self.confirm_delete().await?,
            ("cancel", []) => {
                self.confirm.cancel();
                self.render().await?;
            }
            _ => writeln!(self.out, "Unknown command. Type `help`.")?,
        }

        self.drain_session_events().await?;
        Ok(Flow::Continue)
    }

    // ── Navigation ─────────────────────────────────────────────────────────

    pub async fn open(&mut self, path: &str) -> Result<()> {
        let route = match self.gate.navigate(path) {
            Navigation::Render(route) => route,
            Navigation::Redirect(to) => {
                writeln!(self.out, "Not signed in; redirected to {to}")?;
                Route::resolve(to)
            }
        };

        self.route = route;
        self.confirm.cancel();
        self.controller = match route {
            Route::Home(realm) => {
                let scope = match realm {
                    Realm::User => LinkScope::Own,
                    Realm::Admin => LinkScope::All,
                };
                let controller =
                    LinkController::new(self.gateway.clone(), scope, &self.copy_base_url);
                controller.refresh().await;
                Some(controller)
            }
            _ => None,
        };
        self.render().await
    }

    async fn drain_session_events(&mut self) -> Result<()> {
        loop {
            let event = match self.events.try_recv() {
                Ok(event) => event,
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return Ok(()),
            };
            if let Some(Navigation::Redirect(to)) = self.gate.on_session_event(self.route, event) {
                self.open(to).await?;
            }
        }
    }

    // ── Auth ───────────────────────────────────────────────────────────────

    fn auth_realm(&mut self) -> Result<Option<Realm>> {
        match self.route {
            Route::Login(realm) | Route::Signup(realm) => Ok(Some(realm)),
            _ => {
                writeln!(self.out, "Open a login or signup page first.")?;
                Ok(None)
            }
        }
    }

    async fn login(&mut self, email: &str, password: &str) -> Result<()> {
        let Some(realm) = self.auth_realm()? else {
            return Ok(());
        };
        let credentials = Credentials {
            email: email.to_owned(),
            password: password.to_owned(),
        };
        match self.auth.login(realm, &credentials).await {
            Ok(home) => {
                writeln!(self.out, "Login successful!")?;
                self.open(home).await
            }
            Err(e) => Ok(writeln!(self.out, "Error: {e}")?),
        }
    }

    async fn signup(&mut self, name: &str, email: &str, password: &str) -> Result<()> {
        let Some(realm) = self.auth_realm()? else {
            return Ok(());
        };
        let registration = Registration {
            name: name.to_owned(),
            email: email.to_owned(),
            password: password.to_owned(),
        };
        match self.auth.signup(realm, &registration).await {
            Ok(home) => {
                writeln!(self.out, "Signup successful!")?;
                self.open(home).await
            }
            Err(e) => Ok(writeln!(self.out, "Error: {e}")?),
        }
    }

    fn logout(&mut self) -> Result<()> {
        let realm = Realm::for_path(self.route.path());
        self.auth.logout(realm)?;
        writeln!(self.out, "Signed out of {realm} realm.")?;
        Ok(())
    }

    fn whoami(&mut self) -> Result<()> {
        let realm = Realm::for_path(self.route.path());
        match self.auth.display_name(realm) {
            Some(name) => writeln!(self.out, "{name} ({realm})")?,
            None => writeln!(self.out, "Not signed in ({realm})")?,
        }
        Ok(())
    }

    // ── Links ──────────────────────────────────────────────────────────────

    async fn list(&mut self) -> Result<()> {
        match self.controller.as_ref() {
            Some(controller) => controller.refresh().await,
            None => return Ok(writeln!(self.out, "No link list on this page.")?),
        }
        self.render().await
    }

    async fn shorten(&mut self, url: &str) -> Result<()> {
        match self.controller.as_ref() {
            Some(c) if c.scope() == LinkScope::Own => {
                c.set_url_input(url).await;
                if let Some(link) = c.submit_create().await {
                    let public = c.public_url(&link.short_id);
                    writeln!(self.out, "Created {public}")?;
                }
                self.render().await
            }
            _ => Ok(writeln!(self.out, "Shortening is only available on your home page.")?),
        }
    }

    async fn search(&mut self, email: &str) -> Result<()> {
        match self.controller.as_ref() {
            Some(c) if c.scope() == LinkScope::All => {
                c.set_search_input(email).await;
                c.submit_search().await;
                self.render().await
            }
            _ => Ok(writeln!(self.out, "Search is only available on the admin dashboard.")?),
        }
    }

    fn copy(&mut self, id: &str) -> Result<()> {
        let Some(controller) = self.controller.as_ref() else {
            return Ok(writeln!(self.out, "No link list on this page.")?);
        };
        let clipboard = EchoClipboard::default();
        if self.copied.copy_link(controller, id, &clipboard) {
            if let Some(text) = clipboard.0.borrow().as_deref() {
                writeln!(self.out, "Copied! {text}")?;
            }
        }
        Ok(())
    }

    async fn visit(&mut self, id: &str) -> Result<()> {
        let Some(controller) = self.controller.as_ref() else {
            return Ok(writeln!(self.out, "No link list on this page.")?);
        };
        let mut opened = String::new();
        controller
            .visit_link(id, |url| opened = url.to_owned())
            .await;
        writeln!(self.out, "Opening {opened}")?;
        self.render().await
    }

    fn request_delete(&mut self, id: &str) -> Result<()> {
        if self.controller.is_none() {
            return Ok(writeln!(self.out, "No link list on this page.")?);
        }
        self.confirm.request(id);
        writeln!(
            self.out,
            "Are you sure you want to delete {id}? This action cannot be undone. (confirm/cancel)"
        )?;
        Ok(())
    }

    async fn confirm_delete(&mut self) -> Result<()> {
        let Some(controller) = self.controller.as_ref() else {
            return Ok(writeln!(self.out, "No link list on this page.")?);
        };
        match self.confirm.confirm(controller).await {
            None => writeln!(self.out, "Nothing to confirm.")?,
            Some(true) => writeln!(self.out, "Deleted.")?,
            Some(false) => {}
        }
        self.render().await
    }

    // ── Rendering ──────────────────────────────────────────────────────────

    async fn render(&mut self) -> Result<()> {
        match self.route {
            Route::Login(realm) => writeln!(self.out, "[{realm} login] login <email> <password>")?,
            Route::Signup(realm) => {
                writeln!(self.out, "[{realm} signup] signup <name> <email> <password>")?
            }
            Route::NotFound => writeln!(self.out, "Page not found.")?,
            Route::Home(_) => self.render_list().await?,
        }
        Ok(())
    }

    async fn render_list(&mut self) -> Result<()> {
        let Some(controller) = self.controller.as_ref() else {
            return Ok(());
        };
        let view = controller.snapshot().await;

        if let Some(link) = &view.last_created {
            writeln!(
                self.out,
                "Your new short link: {}",
                controller.public_url(&link.short_id)
            )?;
        }
        if let Some(query) = &view.active_query {
            writeln!(self.out, "Showing links for {query}")?;
        }

        match view.display_state() {
            DisplayState::Loading => writeln!(self.out, "Loading...")?,
            DisplayState::Errored(message) => writeln!(self.out, "Error: {message}")?,
            DisplayState::Populated([]) => writeln!(self.out, "No URLs to display.")?,
            DisplayState::Populated(links) => {
                for (i, link) in links.iter().enumerate() {
                    let marker = if self.copied.is_copied(&link.short_id) {
                        " (copied)"
                    } else {
                        ""
                    };
                    let owner = match (controller.scope(), link.created_by.as_deref()) {
                        (LinkScope::All, Some(owner)) => format!("  by {owner}"),
                        (LinkScope::All, None) => "  by N/A".to_owned(),
                        (LinkScope::Own, _) => String::new(),
                    };
                    writeln!(
                        self.out,
                        "{:>3}. {}{}  ->  {}  [{} clicks]{}",
                        i + 1,
                        controller.public_url(&link.short_id),
                        marker,
                        link.original_url,
                        link.click_count(),
                        owner,
                    )?;
                }
            }
        }
        Ok(())
    }
}

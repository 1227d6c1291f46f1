// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Line-oriented credential prompts on the controlling terminal.

use std::io::{BufRead, IsTerminal, Write};

use nix::sys::termios;
use parking_lot::Mutex;
use tfauth::credential::Credential;
use tfauth::prompt::{Interaction, LoginAnswer, LoginForm};
use url::Url;

/// Terminal prompts. There is no browser, so federated login is unavailable
/// and the silent OAuth flow can only hand out a preconfigured token.
pub struct TerminalInteraction {
    input: Mutex<Box<dyn BufRead + Send>>,
    output: Mutex<Box<dyn Write + Send>>,
    oauth_token: Option<String>,
    hide_input: bool,
}

impl TerminalInteraction {
    pub fn new(
        input: Box<dyn BufRead + Send>,
        output: Box<dyn Write + Send>,
        oauth_token: Option<String>,
    ) -> Self {
        Self { input: Mutex::new(input), output: Mutex::new(output), oauth_token, hide_input: false }
    }

    /// Prompt on stdin/stderr, hiding passwords when stdin is a terminal.
    pub fn stdio(oauth_token: Option<String>) -> Self {
        let input = Box::new(std::io::BufReader::new(std::io::stdin()));
        let mut this = Self::new(input, Box::new(std::io::stderr()), oauth_token);
        this.hide_input = std::io::stdin().is_terminal();
        this
    }

    fn say(&self, text: &str) -> anyhow::Result<()> {
        let mut out = self.output.lock();
        out.write_all(text.as_bytes())?;
        out.flush()?;
        Ok(())
    }

    /// Read one line; `None` at end of input.
    fn read_line(&self, hidden: bool) -> anyhow::Result<Option<String>> {
        let _echo = if hidden && self.hide_input { Some(EchoOffGuard::enter()?) } else { None };
        let mut line = String::new();
        if self.input.lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        if hidden && self.hide_input {
            self.say("\n")?;
        }
        Ok(Some(line.trim_end_matches(&['\r', '\n'][..]).to_owned()))
    }
}

impl Interaction for TerminalInteraction {
    fn acquire_token_silently(&self, server_uri: &Url) -> anyhow::Result<Option<Credential>> {
        tracing::debug!(server = %server_uri, configured = self.oauth_token.is_some(), "silent token request");
        Ok(self.oauth_token.as_deref().map(Credential::pat))
    }

    fn federated_supported(&self) -> bool {
        false
    }

    fn federated_login(&self, _server_uri: Option<&Url>, _auth_url: &Url) -> anyhow::Result<Option<Credential>> {
        Ok(None)
    }

    fn request_credentials(&self, form: &LoginForm<'_>) -> anyhow::Result<Option<LoginAnswer>> {
        match form.server_uri {
            Some(server) => self.say(&format!("Credentials required for {server}\n"))?,
            None => self.say("Credentials required\n")?,
        }
        if let Some(message) = form.message {
            self.say(&format!("  {message}\n"))?;
        }

        match form.username {
            Some(prefill) => self.say(&format!("Username [{prefill}]: "))?,
            None => self.say("Username: ")?,
        }
        let Some(typed) = self.read_line(false)? else {
            return Ok(None);
        };
        let username = match (typed.trim(), form.username) {
            ("", Some(prefill)) => prefill.to_owned(),
            ("", None) => return Ok(None),
            (typed, _) => typed.to_owned(),
        };

        self.say("Password: ")?;
        let Some(password) = self.read_line(true)? else {
            return Ok(None);
        };

        let mut save = false;
        if form.offer_save {
            self.say("Save password? [y/N]: ")?;
            save = self.read_line(false)?.is_some_and(|a| a.trim().eq_ignore_ascii_case("y"));
        }

        Ok(Some(LoginAnswer { credential: Credential::username_password(username, password), save }))
    }

    fn show_error(&self, title: &str, message: &str) {
        if let Err(e) = self.say(&format!("error: {title}: {message}\n")) {
            tracing::warn!(err = %e, "could not write to terminal");
        }
    }
}

/// Restores terminal echo on drop.
struct EchoOffGuard {
    original: termios::Termios,
}

impl EchoOffGuard {
    fn enter() -> anyhow::Result<Self> {
        let stdin = std::io::stdin();
        let original = termios::tcgetattr(&stdin)?;
        let mut quiet = original.clone();
        quiet.local_flags.remove(termios::LocalFlags::ECHO);
        termios::tcsetattr(&stdin, termios::SetArg::TCSANOW, &quiet)?;
        Ok(Self { original })
    }
}

impl Drop for EchoOffGuard {
    fn drop(&mut self) {
        let _ = termios::tcsetattr(std::io::stdin(), termios::SetArg::TCSANOW, &self.original);
    }
}

#[cfg(test)]
#[path = "terminal_tests.rs"]
mod tests;

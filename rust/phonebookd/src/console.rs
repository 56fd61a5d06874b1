//! Line-oriented command console.
//!
//! One signed-in session per console. Each input line is one command; each
//! answer is one JSON object on stdout, `{"ok": ...}` or `{"error": "..."}`.
//!
//! ```text
//! login <username> <password>
//! logout
//! whoami
//! view <kind> <key>
//! edit <kind> <key>
//! admin <kind> <key>
//! adminedit <kind> <key>
//! search <kind> [text]
//! set <kind> <key> <Field>=<value>[; <Field>=<value> ...]
//! create <kind> [<Field>=<value>; ...]
//! delete <kind> <key>
//! back [n]
//! counters
//! shutdown
//! quit
//! ```

use std::str::FromStr;

use anyhow::Context;
use phonebook_core::{EntityKey, EntityKind, EntityRecord};
use phonebook_session::{Directory, Session, SessionToken};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login { username: String, password: String },
    Logout,
    Whoami,
    View(EntityKey),
    Edit(EntityKey),
    AdminView(EntityKey),
    AdminEdit(EntityKey),
    Search { kind: EntityKind, query: String },
    Set { key: EntityKey, changes: Vec<(String, String)> },
    Create { kind: EntityKind, values: Vec<(String, String)> },
    Delete(EntityKey),
    Back(usize),
    Counters,
    Shutdown,
    Quit,
}

fn parse_key<'a>(words: &mut impl Iterator<Item = &'a str>) -> Result<EntityKey, String> {
    let kind: EntityKind = words.next().ok_or("missing entity kind")?.parse()?;
    let key = words
        .next()
        .ok_or("missing key")?
        .parse::<i64>()
        .map_err(|e| format!("bad key: {e}"))?;
    Ok(EntityKey::new(kind, key))
}

/// `Field=value` pairs separated by `;`.
fn parse_assignments<'a>(words: impl Iterator<Item = &'a str>) -> Result<Vec<(String, String)>, String> {
    words
        .collect::<Vec<_>>()
        .join(" ")
        .split(';')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(|a| {
            a.split_once('=')
                .map(|(f, v)| (f.trim().to_string(), v.trim().to_string()))
                .ok_or_else(|| format!("expected Field=value, got {a:?}"))
        })
        .collect()
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        let mut words = rest.split_whitespace();

        let cmd = match verb.to_ascii_lowercase().as_str() {
            "login" => Command::Login {
                username: words.next().ok_or("missing username")?.to_string(),
                password: words.next().ok_or("missing password")?.to_string(),
            },
            "logout" => Command::Logout,
            "whoami" => Command::Whoami,
            "view" => Command::View(parse_key(&mut words)?),
            "edit" => Command::Edit(parse_key(&mut words)?),
            "search" => {
                let kind: EntityKind = words.next().ok_or("missing entity kind")?.parse()?;
                Command::Search {
                    kind,
                    query: words.collect::<Vec<_>>().join(" "),
                }
            }
            "admin" => Command::AdminView(parse_key(&mut words)?),
            "adminedit" => Command::AdminEdit(parse_key(&mut words)?),
            "create" => {
                let kind: EntityKind = words.next().ok_or("missing entity kind")?.parse()?;
                Command::Create {
                    kind,
                    values: parse_assignments(words)?,
                }
            }
            "set" => {
                let key = parse_key(&mut words)?;
                let changes = parse_assignments(words)?;
                if changes.is_empty() {
                    return Err("nothing to set".into());
                }
                Command::Set { key, changes }
            }
            "delete" => Command::Delete(parse_key(&mut words)?),
            "back" => Command::Back(match words.next() {
                Some(n) => n.parse().map_err(|e| format!("bad count: {e}"))?,
                None => 1,
            }),
            "counters" => Command::Counters,
            "shutdown" => Command::Shutdown,
            "quit" | "exit" => Command::Quit,
            other => return Err(format!("unknown command: {other}")),
        };
        Ok(cmd)
    }
}

fn session_json(s: &Session) -> Value {
    json!({
        "uid": s.uid,
        "username": s.username,
        "display_name": s.display_name,
        "rid": s.rid,
        "role": s.role_name,
        "token": s.token,
    })
}

pub struct Console {
    directory: Directory,
    token: Option<SessionToken>,
}

impl Console {
    pub fn new(directory: Directory) -> Self {
        Self {
            directory,
            token: None,
        }
    }

    fn token(&self) -> anyhow::Result<&SessionToken> {
        self.token.as_ref().context("not signed in")
    }

    pub async fn execute(&mut self, cmd: Command) -> anyhow::Result<Value> {
        let dir = &self.directory;
        let value = match cmd {
            Command::Login { username, password } => {
                if let Some(old) = self.token.take() {
                    dir.sign_out(&old).await?;
                }
                let session = dir.sign_in(&username, &password).await?;
                let out = session_json(&session);
                self.token = Some(session.token);
                out
            }
            Command::Logout => {
                let token = self.token.take().context("not signed in")?;
                json!(dir.sign_out(&token).await?)
            }
            Command::Whoami => session_json(&dir.sessions().touch(self.token()?).await?),
            Command::View(key) => serde_json::to_value(dir.view(self.token()?, key).await?)?,
            Command::Edit(key) => serde_json::to_value(dir.edit(self.token()?, key).await?)?,
            Command::AdminView(key) => {
                serde_json::to_value(dir.admin_view(self.token()?, key).await?)?
            }
            Command::AdminEdit(key) => {
                serde_json::to_value(dir.admin_edit(self.token()?, key).await?)?
            }
            Command::Search { kind, query } => {
                serde_json::to_value(dir.search(self.token()?, kind, &query).await?)?
            }
            Command::Set { key, changes } => {
                let saved = dir.update(self.token()?, key, changes.as_slice()).await?;
                json!({
                    "applied": saved.outcome.applied,
                    "refused": saved.outcome.refused,
                    "redirect": saved.redirect,
                })
            }
            Command::Create { kind, values } => {
                let mut record = EntityRecord::blank(kind)
                    .with_context(|| format!("{kind} records cannot be created"))?;
                for (field, value) in &values {
                    record.set_value(field, value)?;
                }
                json!(dir.create(self.token()?, record).await?.key)
            }
            Command::Delete(key) => {
                dir.delete(self.token()?, key).await?;
                json!(true)
            }
            Command::Back(n) => json!(dir.sessions().breadcrumb_back(self.token()?, n).await?),
            Command::Counters => serde_json::to_value(dir.counters().snapshot().await?)?,
            Command::Shutdown => {
                dir.shutdown(self.token()?).await?;
                json!(true)
            }
            Command::Quit => Value::Null,
        };
        Ok(value)
    }
}

/// Serve commands from stdin until EOF or `quit`.
pub async fn run(directory: Directory) -> anyhow::Result<()> {
    let mut console = Console::new(directory);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }
        let reply = match line.parse::<Command>() {
            Ok(Command::Quit) => break,
            Ok(cmd) => match console.execute(cmd).await {
                Ok(v) => json!({ "ok": v }),
                Err(e) => json!({ "error": format!("{e:#}") }),
            },
            Err(e) => json!({ "error": e }),
        };
        stdout.write_all(format!("{reply}\n").as_bytes()).await?;
        stdout.flush().await?;
    }

    if let Some(token) = console.token.take() {
        console.directory.sign_out(&token).await?;
    }
    Ok(())
}

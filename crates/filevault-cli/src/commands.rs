use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tracing::warn;

use filevault_core::models::{Credentials, Registration, UploadFile};
use filevault_core::{Config, SessionStore};

pub const USAGE: &str = "\
Usage: filevault [--ephemeral] <command> [args]

Session:
  login [email]                 Sign in (password from FILEVAULT_PASSWORD or prompt)
  register <name> [email]       Create an account and sign in
  logout                        Sign out and forget the session
  status                        Show who is signed in
  access-code <code>            Remember a share access code
  access-code --clear           Forget the share access code

Folders:
  ls [folder_id]                List the root folder or a folder (uses the access code)
  mkdir <name> [parent_id]      Create a folder
  rename <folder_id> <name>     Rename a folder
  rmdir <folder_id>             Delete a folder
  share <folder_id>             Share a folder by access code
  unshare <folder_id>           Stop sharing a folder

Files:
  upload <folder_id> <path>...  Upload files into a folder
  rm <file_id>...               Delete files";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Login { email: Option<String> },
    Register { name: String, email: Option<String> },
    Logout,
    Status,
    SetAccessCode(String),
    ClearAccessCode,
    List { folder_id: Option<i64> },
    MakeFolder { name: String, parent_id: Option<i64> },
    Rename { folder_id: i64, name: String },
    RemoveFolder { folder_id: i64 },
    Share { folder_id: i64 },
    Unshare { folder_id: i64 },
    Upload { folder_id: i64, paths: Vec<PathBuf> },
    RemoveFiles { file_ids: Vec<i64> },
}

fn parse_id(value: Option<&String>, what: &str) -> Result<i64> {
    let value = value.with_context(|| format!("Missing {}", what))?;
    value
        .parse()
        .with_context(|| format!("Invalid {}: {}", what, value))
}

fn required(value: Option<&String>, what: &str) -> Result<String> {
    value
        .cloned()
        .with_context(|| format!("Missing {}", what))
}

impl Command {
    pub fn parse(args: &[String]) -> Result<Self> {
        let Some(name) = args.first() else {
            return Ok(Command::Help);
        };
        let rest = &args[1..];

        let command = match name.as_str() {
            "help" | "--help" | "-h" => Command::Help,
            "login" => Command::Login {
                email: rest.first().cloned(),
            },
            "register" => Command::Register {
                name: required(rest.first(), "name")?,
                email: rest.get(1).cloned(),
            },
            "logout" => Command::Logout,
            "status" => Command::Status,
            "access-code" => match rest.first().map(String::as_str) {
                Some("--clear") => Command::ClearAccessCode,
                Some(code) => Command::SetAccessCode(code.to_string()),
                None => bail!("Missing access code"),
            },
            "ls" => Command::List {
                folder_id: match rest.first() {
                    Some(_) => Some(parse_id(rest.first(), "folder id")?),
                    None => None,
                },
            },
            "mkdir" => Command::MakeFolder {
                name: required(rest.first(), "folder name")?,
                parent_id: match rest.get(1) {
                    Some(_) => Some(parse_id(rest.get(1), "parent id")?),
                    None => None,
                },
            },
            "rename" => Command::Rename {
                folder_id: parse_id(rest.first(), "folder id")?,
                name: required(rest.get(1), "folder name")?,
            },
            "rmdir" => Command::RemoveFolder {
                folder_id: parse_id(rest.first(), "folder id")?,
            },
            "share" => Command::Share {
                folder_id: parse_id(rest.first(), "folder id")?,
            },
            "unshare" => Command::Unshare {
                folder_id: parse_id(rest.first(), "folder id")?,
            },
            "upload" => {
                let folder_id = parse_id(rest.first(), "folder id")?;
                let paths: Vec<PathBuf> = rest.iter().skip(1).map(PathBuf::from).collect();
                if paths.is_empty() {
                    bail!("Nothing to upload");
                }
                Command::Upload { folder_id, paths }
            }
            "rm" => {
                if rest.is_empty() {
                    bail!("Missing file id");
                }
                let file_ids = rest
                    .iter()
                    .map(|id| parse_id(Some(id), "file id"))
                    .collect::<Result<Vec<_>>>()?;
                Command::RemoveFiles { file_ids }
            }
            other => bail!("Unknown command: {}", other),
        };
        Ok(command)
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn password() -> Result<String> {
    match std::env::var("FILEVAULT_PASSWORD") {
        Ok(password) if !password.is_empty() => Ok(password),
        _ => Ok(rpassword::prompt_password("Password: ")?),
    }
}

/// Email from the argument, the environment, the last login, or a prompt
fn email(arg: Option<String>, config: &Config) -> Result<String> {
    if let Some(email) = arg.or_else(|| std::env::var("FILEVAULT_EMAIL").ok()) {
        return Ok(email);
    }
    match config.last_email {
        Some(ref last) => {
            let input = prompt(&format!("E-mail [{}]", last))?;
            Ok(if input.is_empty() { last.clone() } else { input })
        }
        None => prompt("E-mail"),
    }
}

fn remember_email(config: &mut Config, email: String) {
    config.last_email = Some(email);
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }
}

fn print_json(value: &Value) -> Result<()> {
    if !value.is_null() {
        println!("{}", serde_json::to_string_pretty(value)?);
    }
    Ok(())
}

pub async fn run(command: Command, store: &mut SessionStore, config: &mut Config) -> Result<()> {
    match command {
        Command::Help => println!("{}", USAGE),

        Command::Login { email: arg } => {
            let email = email(arg, config)?;
            let credentials = Credentials {
                email: email.clone(),
                password: password()?,
            };
            store.login(&credentials).await?;
            remember_email(config, email);
            println!("Signed in as {}", user_label(store));
        }

        Command::Register { name, email: arg } => {
            let email = email(arg, config)?;
            let registration = Registration {
                name,
                email: email.clone(),
                password: password()?,
            };
            store.register(&registration).await?;
            remember_email(config, email);
            println!("Registered and signed in as {}", user_label(store));
        }

        Command::Logout => {
            store.logout();
            println!("Signed out");
        }

        Command::Status => {
            if store.is_authenticated() {
                println!("Signed in as {}", user_label(store));
            } else {
                println!("Not signed in");
            }
            if let Some(code) = store.access_code() {
                println!("Access code: {}", code);
            }
            println!("Server: {}", store.api().base_url());
        }

        Command::SetAccessCode(code) => {
            store.set_access_code(Some(&code));
            println!("Access code saved");
        }

        Command::ClearAccessCode => {
            store.clear_access_code();
            println!("Access code cleared");
        }

        Command::List { folder_id } => {
            let folder = match folder_id {
                Some(id) => {
                    let code = store.access_code().map(str::to_string);
                    store.api().get_folder(id, code.as_deref()).await?
                }
                None => store.api().get_root_folder().await?,
            };
            print_json(&folder)?;
        }

        Command::MakeFolder { name, parent_id } => {
            print_json(&store.api().create_folder(&name, parent_id).await?)?;
        }

        Command::Rename { folder_id, name } => {
            print_json(&store.api().rename_folder(&name, folder_id).await?)?;
        }

        Command::RemoveFolder { folder_id } => {
            print_json(&store.api().delete_folder(folder_id).await?)?;
        }

        Command::Share { folder_id } => {
            print_json(&store.api().share_folder_by_code(folder_id).await?)?;
        }

        Command::Unshare { folder_id } => {
            print_json(&store.api().stop_share_folder(folder_id).await?)?;
        }

        Command::Upload { folder_id, paths } => {
            let files = paths
                .iter()
                .map(|p| UploadFile::from_path(p))
                .collect::<Result<Vec<_>>>()?;
            print_json(&store.api().upload_files(folder_id, files).await?)?;
        }

        Command::RemoveFiles { file_ids } => {
            print_json(&store.api().delete_files(&file_ids).await?)?;
        }
    }
    Ok(())
}

fn user_label(store: &SessionStore) -> String {
    store
        .user()
        .map(|u| u.display_name())
        .unwrap_or_else(|| "unknown user".to_string())
}

//! CLI commands

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use pongdang_core::{ClientSettings, MenuItem, Role, Uid, UserSummary, pending_approvals};
use pongdang_http::client::users::DEFAULT_TEMPORARY_PASSWORD;
use pongdang_http::types::{ApprovalEntry, SignupRequest};
use pongdang_http::{LogoutReason, PongdangClient};
use serde_json::Value as JsonValue;
use tracing::info;

use crate::config;

#[derive(Subcommand)]
pub enum Commands {
    /// Log in and store the session
    Login {
        /// Account id
        user_id: String,

        /// Password
        #[arg(long, env = "PONGDANG_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Log out and wipe the stored session
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Register a new account (needs admin approval)
    Signup {
        user_id: String,

        #[arg(long, env = "PONGDANG_PASSWORD", hide_env_values = true)]
        password: String,

        #[arg(long)]
        name: String,

        #[arg(long)]
        nickname: Option<String>,

        /// Birthday as YYYY-MM-DD
        #[arg(long)]
        birthday: Option<String>,
    },

    /// Change your own password
    Passwd {
        #[arg(long, env = "PONGDANG_PASSWORD", hide_env_values = true)]
        current: String,

        #[arg(long, env = "PONGDANG_NEW_PASSWORD", hide_env_values = true)]
        new: String,
    },

    /// User administration
    Users {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Show navigation menus
    Menus {
        /// Only the main menu
        #[arg(long, conflicts_with = "uid")]
        main: bool,

        /// A single menu node
        #[arg(long)]
        uid: Option<String>,
    },

    /// Server configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// List users
    List {
        /// Only registrations waiting for approval
        #[arg(long)]
        pending: bool,
    },

    /// Approve waiting registrations
    Approve {
        #[arg(required = true)]
        uids: Vec<String>,

        /// Role to grant (defaults to the role requested at signup)
        #[arg(long)]
        role: Option<String>,
    },

    /// Delete users
    Delete {
        #[arg(required = true)]
        uids: Vec<String>,
    },

    /// Change a user's role
    Role { uid: String, role: String },

    /// Overwrite a user's password with a temporary one
    ResetPassword {
        uid: String,

        #[arg(
            long,
            env = "PONGDANG_TEMP_PASSWORD",
            hide_env_values = true,
            default_value = DEFAULT_TEMPORARY_PASSWORD
        )]
        temporary: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the runtime configuration
    Show,

    /// Show a system configuration list, e.g. `role`
    System { kind: String },

    /// Show local client settings
    Local,
}

impl Commands {
    pub async fn execute(self, settings: ClientSettings) -> Result<()> {
        let client = config::build_client(&settings)?;
        client.session().on_logout(|reason| {
            if reason == LogoutReason::SessionExpired {
                eprintln!("Session expired, please log in again");
            }
        });

        match self {
            Commands::Login { user_id, password } => {
                let profile = client.login(&user_id, &password).await?;
                println!(
                    "Logged in as {} ({}, {})",
                    profile.user_id,
                    profile.name,
                    profile.role.description()
                );
                Ok(())
            }
            Commands::Logout => {
                if client.logout().await? {
                    println!("Logged out");
                }
                client.session().settle_logout().await;
                Ok(())
            }
            Commands::Whoami => whoami(&client).await,
            Commands::Signup {
                user_id,
                password,
                name,
                nickname,
                birthday,
            } => {
                client
                    .signup(&SignupRequest {
                        user_id,
                        password,
                        name,
                        nickname,
                        birthday,
                    })
                    .await?;
                println!("Registered, waiting for approval");
                Ok(())
            }
            Commands::Passwd { current, new } => {
                client.change_password(&current, &new).await?;
                println!("Password changed");
                Ok(())
            }
            Commands::Users { command } => command.execute(&client).await,
            Commands::Menus { main, uid } => {
                if let Some(uid) = uid {
                    print_json(&client.menu(&Uid::new(uid)).await?)
                } else if main {
                    print_menus(&client.main_menu().await?);
                    Ok(())
                } else {
                    print_menus(&client.menus().await?);
                    Ok(())
                }
            }
            Commands::Config { command } => command.execute(&client, &settings).await,
        }
    }
}

impl UserCommands {
    pub async fn execute(self, client: &PongdangClient) -> Result<()> {
        match self {
            UserCommands::List { pending } => {
                let users = client.list_users().await?;
                let rows: Vec<&UserSummary> = if pending {
                    pending_approvals(&users)
                } else {
                    users.iter().collect()
                };
                for user in rows {
                    println!(
                        "{}\t{}\t{}\t{}\t{}",
                        user.uid,
                        user.user_id,
                        user.name,
                        user.role,
                        user.state.label()
                    );
                }
                Ok(())
            }
            UserCommands::Approve { uids, role } => {
                let role = role.map(Role::from);
                let users = client.list_users().await?;
                let approvals = uids
                    .iter()
                    .map(|uid| {
                        let user = find_user(&users, uid)?;
                        if !user.is_waiting() {
                            bail!("user {uid} is not waiting for approval");
                        }
                        Ok(ApprovalEntry::for_user(user, role.clone()))
                    })
                    .collect::<Result<Vec<_>>>()?;

                let actor = current_role(client).await?;
                for approval in &approvals {
                    ensure_can_grant(&actor, &approval.role)?;
                }

                client.approve_users(&approvals).await?;
                println!("Approved {} user(s)", approvals.len());
                Ok(())
            }
            UserCommands::Delete { uids } => {
                let uids: Vec<Uid> = uids.into_iter().map(Uid::new).collect();
                client.delete_users(&uids).await?;
                println!("Deleted {} user(s)", uids.len());
                Ok(())
            }
            UserCommands::Role { uid, role } => {
                let role = Role::from(role);
                ensure_can_grant(&current_role(client).await?, &role)?;
                let users = client.list_users().await?;
                let user = find_user(&users, &uid)?;
                client.change_role(user, role.clone()).await?;
                info!(%uid, %role, "Role changed");
                println!("{} is now {}", user.user_id, role.description());
                Ok(())
            }
            UserCommands::ResetPassword { uid, temporary } => {
                let users = client.list_users().await?;
                let user = find_user(&users, &uid)?;
                client.reset_password(user, &temporary).await?;
                println!("Password reset for {}", user.user_id);
                Ok(())
            }
        }
    }
}

impl ConfigCommands {
    pub async fn execute(self, client: &PongdangClient, settings: &ClientSettings) -> Result<()> {
        match self {
            ConfigCommands::Show => print_json(&client.runtime_config().await?),
            ConfigCommands::System { kind } => print_json(&client.system_config(&kind).await?),
            ConfigCommands::Local => print_json(settings),
        }
    }
}

async fn whoami(client: &PongdangClient) -> Result<()> {
    let Some(session) = client.session().current_session().await? else {
        println!("Not logged in");
        return Ok(());
    };

    let profile = &session.profile;
    println!("{} ({})", profile.user_id, profile.name);
    if let Some(nickname) = &profile.nickname {
        println!("  nickname: {nickname}");
    }
    println!("  role: {}", profile.role.description());
    match session.access_token_expires_at {
        Some(expires_at) => println!("  access token expires: {expires_at}"),
        None => println!("  access token expires: unknown"),
    }
    Ok(())
}

async fn current_role(client: &PongdangClient) -> Result<Role> {
    let profile = client
        .session()
        .profile()
        .await?
        .context("not logged in")?;
    Ok(profile.role)
}

fn ensure_can_grant(actor: &Role, target: &Role) -> Result<()> {
    if !actor.can_grant(target) {
        bail!("{} cannot grant {}", actor.description(), target.description());
    }
    Ok(())
}

fn find_user<'a>(users: &'a [UserSummary], uid: &str) -> Result<&'a UserSummary> {
    users
        .iter()
        .find(|user| user.uid.as_str() == uid)
        .with_context(|| format!("no user with uid {uid}"))
}

fn print_menus(menus: &[MenuItem]) {
    for root in menus {
        print_menu(root, 0);
    }
}

fn print_menu(item: &MenuItem, depth: usize) {
    let url = item.url.as_deref().unwrap_or("-");
    let audience = item.restricted.as_deref().unwrap_or("모든 사용자");
    println!(
        "{}{} [{}] {url} ({audience})",
        "  ".repeat(depth),
        item.name,
        item.uid
    );
    for child in &item.children {
        print_menu(child, depth + 1);
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    let value: JsonValue = serde_json::to_value(value)?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

//! Yardly 命令行入口
//! 命令输出为 JSON（stdout），日志写 stderr

use anyhow::Context;
use chrono::{DateTime, Local, Utc};
use clap::{Args, Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::ffi::OsString;
use yardly_client::{
    config::ClientConfig,
    endpoints::{BookingAction, ModerationAction},
    models::{
        admin::{
            AdminListBookingsParams, AdminListEventsParams, AdminListItemsParams,
            AdminListUsersParams, AdminPatchItemPayload, AdminPatchUserPayload, ModerationPayload,
        },
        auth::RegisterRequest,
        booking::{BookingListParams, BookingRequestsParams, BookingStatus, BookingType},
        item::{CreateItemRequest, DealMode, ItemListParams, PageParams},
    },
    telemetry, ApiClient, Queries,
};

#[derive(Parser)]
#[command(
    name = "yardly",
    version = env!("CARGO_PKG_VERSION"),
    about = "Command-line client for the Yardly marketplace API",
    long_about = None
)]
struct Cli {
    /// Override the backend base URL (YARDLY_API__BASE_URL)
    #[arg(global = true, long = "base-url")]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the access token
    Login {
        email: String,
        #[arg(long, env = "YARDLY_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create an account and log in
    Register {
        email: String,
        #[arg(long, env = "YARDLY_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long = "first-name")]
        first_name: String,
        #[arg(long = "last-name")]
        last_name: Option<String>,
    },

    /// Log out of this device
    Logout,

    /// Log out of every device
    LogoutAll,

    /// Show the current user
    Me,

    /// Browse and manage items
    #[command(subcommand)]
    Items(ItemCommands),

    /// Busy dates of an item
    Availability {
        item_id: i64,
        /// YYYY-MM-DD
        from: String,
        /// YYYY-MM-DD
        to: String,
    },

    /// Request an item; rentals need a date range
    Book {
        item_id: i64,
        /// YYYY-MM-DD (rentals only)
        #[arg(long)]
        start: Option<String>,
        /// YYYY-MM-DD (rentals only)
        #[arg(long)]
        end: Option<String>,
    },

    /// Bookings I made or received
    #[command(subcommand)]
    Bookings(BookingCommands),

    /// Favorite items
    #[command(subcommand)]
    Favorites(FavoriteCommands),

    /// Back-office operations
    #[command(subcommand)]
    Admin(AdminCommands),
}

#[derive(Args)]
struct Page {
    #[arg(long)]
    limit: Option<u32>,
    #[arg(long)]
    offset: Option<u32>,
}

impl Page {
    fn params(&self) -> PageParams {
        PageParams {
            limit: self.limit,
            offset: self.offset,
        }
    }
}

#[derive(Subcommand)]
enum ItemCommands {
    /// Public listing
    List {
        /// sale, rent, free or sale_rent
        #[arg(long)]
        mode: Option<DealMode>,
        #[command(flatten)]
        page: Page,
    },
    Show {
        id: i64,
    },
    Create {
        title: String,
        #[arg(long)]
        mode: DealMode,
    },
    /// Items I own
    Mine {
        #[command(flatten)]
        page: Page,
    },
    ByOwner {
        owner_id: i64,
        #[command(flatten)]
        page: Page,
    },
    Images {
        item_id: i64,
    },
    AddImage {
        item_id: i64,
        url: String,
    },
    DeleteImage {
        item_id: i64,
        image_id: i64,
    },
}

#[derive(Subcommand)]
enum BookingCommands {
    /// Bookings I requested
    Mine {
        #[arg(long = "status")]
        statuses: Vec<String>,
    },
    /// Bookings on my items
    Incoming {
        #[arg(long = "status")]
        statuses: Vec<String>,
    },
    /// Pending requests on my items
    Requests {
        #[arg(long = "type")]
        types: Vec<String>,
    },
    Approve {
        id: i64,
    },
    Handover {
        id: i64,
    },
    Return {
        id: i64,
    },
    Cancel {
        id: i64,
    },
    Events {
        id: i64,
    },
    /// Current and upcoming bookings of an item
    Upcoming {
        item_id: i64,
    },
}

#[derive(Subcommand)]
enum FavoriteCommands {
    Add { item_id: i64 },
    Remove { item_id: i64 },
    Check { item_id: i64 },
    List,
}

#[derive(Subcommand)]
enum AdminCommands {
    Users {
        #[arg(long)]
        q: Option<String>,
        #[command(flatten)]
        page: Page,
    },
    User {
        id: i64,
    },
    /// Change role or ban state
    PatchUser {
        id: i64,
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        ban: Option<bool>,
        #[arg(long = "reason")]
        ban_reason: Option<String>,
        /// RFC 3339 expiry; omit with --ban true for a permanent ban
        #[arg(long = "expires-at")]
        ban_expires_at: Option<DateTime<Utc>>,
    },
    Items {
        #[arg(long)]
        q: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        mode: Option<String>,
        #[arg(long)]
        include_deleted: bool,
        #[arg(long)]
        include_archived: bool,
        #[arg(long)]
        include_transferred: bool,
        #[command(flatten)]
        page: Page,
    },
    PatchItem {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        mode: Option<DealMode>,
    },
    Block {
        id: i64,
        #[arg(long)]
        reason: Option<String>,
    },
    Unblock {
        id: i64,
        #[arg(long)]
        reason: Option<String>,
    },
    DeleteItem {
        id: i64,
        #[arg(long)]
        reason: Option<String>,
    },
    Bookings {
        #[arg(long)]
        status: Option<String>,
        #[arg(long = "type")]
        booking_type: Option<String>,
        #[arg(long)]
        item_id: Option<i64>,
        #[arg(long)]
        user_id: Option<i64>,
        #[command(flatten)]
        page: Page,
    },
    Booking {
        id: i64,
    },
    BookingEvents {
        id: i64,
        #[command(flatten)]
        page: Page,
    },
    Events {
        #[arg(long)]
        entity_type: Option<String>,
        #[arg(long)]
        entity_id: Option<i64>,
        #[arg(long)]
        actor_user_id: Option<i64>,
        #[command(flatten)]
        page: Page,
    },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// 按 wire 名称解析枚举，例如 "handover_pending"
fn parse_wire<T: DeserializeOwned>(raw: &str) -> anyhow::Result<T> {
    serde_json::from_value(serde_json::Value::String(raw.to_string()))
        .with_context(|| format!("unknown value '{}'", raw))
}

fn parse_statuses(raw: &[String]) -> anyhow::Result<Vec<BookingStatus>> {
    raw.iter()
        .map(|s| match parse_wire::<BookingStatus>(s)? {
            BookingStatus::Unknown => anyhow::bail!("unknown booking status '{}'", s),
            status => Ok(status),
        })
        .collect()
}

/// 先加载 .env.local > .env，再解析参数，`env =` 参数也能读到文件里的值
fn parse_cli<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    dotenv::from_filename(".env.local").ok();
    dotenv::dotenv().ok();
    Cli::try_parse_from(args)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = parse_cli(std::env::args_os()).unwrap_or_else(|e| e.exit());

    let mut config = ClientConfig::from_env().context("Failed to load configuration")?;
    if let Some(base_url) = cli.base_url {
        config.api.base_url = base_url;
        config.validate()?;
    }

    telemetry::init_telemetry(&config);

    let client = ApiClient::from_config(&config)?;
    let queries = Queries::new(client);

    run(cli.command, &queries).await
}

async fn run(command: Commands, queries: &Queries) -> anyhow::Result<()> {
    let client = queries.client();

    match command {
        Commands::Login { email, password } => {
            let tokens = queries.login(&email, &password).await?;
            print_json(&serde_json::json!({ "logged_in": true, "token_type": tokens.token_type }))
        }
        Commands::Register {
            email,
            password,
            first_name,
            last_name,
        } => {
            let req = RegisterRequest {
                email,
                password,
                first_name,
                last_name,
            };
            let (account, _) = queries.sign_up(&req).await?;
            print_json(&account)
        }
        Commands::Logout => {
            queries.logout().await?;
            print_json(&serde_json::json!({ "logged_out": true }))
        }
        Commands::LogoutAll => {
            queries.logout_all().await?;
            print_json(&serde_json::json!({ "logged_out": true }))
        }
        Commands::Me => match queries.me().await? {
            Some(me) => print_json(&me),
            None => anyhow::bail!("not logged in"),
        },
        Commands::Items(cmd) => run_items(cmd, queries).await,
        Commands::Availability { item_id, from, to } => {
            print_json(&queries.availability(item_id, &from, &to).await?)
        }
        Commands::Book { item_id, start, end } => {
            let item = queries.item(item_id).await?;
            let today = Local::now().date_naive();
            let booking = queries
                .book_item(
                    item_id,
                    item.mode,
                    start.as_deref().unwrap_or_default(),
                    end.as_deref().unwrap_or_default(),
                    today,
                )
                .await?;
            print_json(&booking)
        }
        Commands::Bookings(cmd) => match cmd {
            BookingCommands::Mine { statuses } => {
                let params = BookingListParams {
                    statuses: parse_statuses(&statuses)?,
                    ..Default::default()
                };
                print_json(&client.bookings().list_my(&params).await?)
            }
            BookingCommands::Incoming { statuses } => {
                let params = BookingListParams {
                    statuses: parse_statuses(&statuses)?,
                    ..Default::default()
                };
                print_json(&client.bookings().list_my_items(&params).await?)
            }
            BookingCommands::Requests { types } => {
                let params = BookingRequestsParams {
                    types: types
                        .iter()
                        .map(|t| parse_wire::<BookingType>(t))
                        .collect::<anyhow::Result<_>>()?,
                    ..Default::default()
                };
                print_json(&client.bookings().list_my_items_booking_requests(&params).await?)
            }
            BookingCommands::Approve { id } => {
                print_json(&queries.booking_action(id, BookingAction::Approve).await?)
            }
            BookingCommands::Handover { id } => {
                print_json(&queries.booking_action(id, BookingAction::Handover).await?)
            }
            BookingCommands::Return { id } => {
                print_json(&queries.booking_action(id, BookingAction::Return).await?)
            }
            BookingCommands::Cancel { id } => {
                print_json(&queries.booking_action(id, BookingAction::Cancel).await?)
            }
            BookingCommands::Events { id } => print_json(&queries.booking_events(id).await?),
            BookingCommands::Upcoming { item_id } => {
                print_json(&queries.upcoming_by_item(item_id).await?)
            }
        },
        Commands::Favorites(cmd) => match cmd {
            FavoriteCommands::Add { item_id } => {
                queries.add_favorite(item_id).await?;
                print_json(&serde_json::json!({ "item_id": item_id, "is_favorite": true }))
            }
            FavoriteCommands::Remove { item_id } => {
                queries.remove_favorite(item_id).await?;
                print_json(&serde_json::json!({ "item_id": item_id, "is_favorite": false }))
            }
            FavoriteCommands::Check { item_id } => {
                let is_favorite = queries.is_favorite(item_id).await?;
                print_json(&serde_json::json!({ "item_id": item_id, "is_favorite": is_favorite }))
            }
            FavoriteCommands::List => print_json(&queries.my_favorites().await?),
        },
        Commands::Admin(cmd) => run_admin(cmd, queries).await,
    }
}

async fn run_items(cmd: ItemCommands, queries: &Queries) -> anyhow::Result<()> {
    let client = queries.client();

    match cmd {
        ItemCommands::List { mode, page } => {
            let params = ItemListParams {
                mode,
                limit: page.limit,
                offset: page.offset,
            };
            print_json(&client.items().list(&params).await?)
        }
        ItemCommands::Show { id } => print_json(&queries.item(id).await?),
        ItemCommands::Create { title, mode } => {
            print_json(&queries.create_item(&CreateItemRequest { title, mode }).await?)
        }
        ItemCommands::Mine { page } => print_json(&client.items().my_items(page.params()).await?),
        ItemCommands::ByOwner { owner_id, page } => {
            print_json(&client.items().by_owner(owner_id, page.params()).await?)
        }
        ItemCommands::Images { item_id } => {
            let images = queries.item_images(item_id).await?;
            let resolved: Vec<_> = images
                .into_iter()
                .map(|mut image| {
                    image.url = yardly_client::media::resolve_media_url(client.base_url(), &image.url);
                    image
                })
                .collect();
            print_json(&resolved)
        }
        ItemCommands::AddImage { item_id, url } => print_json(&queries.add_image(item_id, &url).await?),
        ItemCommands::DeleteImage { item_id, image_id } => {
            queries.delete_image(item_id, image_id).await?;
            print_json(&serde_json::json!({ "deleted": image_id }))
        }
    }
}

async fn run_admin(cmd: AdminCommands, queries: &Queries) -> anyhow::Result<()> {
    if !queries.is_admin().await? {
        anyhow::bail!("admin role required");
    }

    match cmd {
        AdminCommands::Users { q, page } => {
            let params = AdminListUsersParams {
                q,
                limit: page.limit,
                offset: page.offset,
            };
            print_json(&queries.admin_users(&params).await?)
        }
        AdminCommands::User { id } => print_json(&queries.admin_user(id).await?),
        AdminCommands::PatchUser {
            id,
            role,
            ban,
            ban_reason,
            ban_expires_at,
        } => {
            let payload = AdminPatchUserPayload {
                role: role.as_deref().map(parse_wire).transpose()?,
                ban,
                ban_reason,
                // 封禁且未给过期时间时显式发送 null（永久封禁）
                ban_expires_at: match (ban, ban_expires_at) {
                    (_, Some(at)) => Some(Some(at)),
                    (Some(true), None) => Some(None),
                    _ => None,
                },
            };
            print_json(&queries.admin_patch_user(id, &payload).await?)
        }
        AdminCommands::Items {
            q,
            status,
            mode,
            include_deleted,
            include_archived,
            include_transferred,
            page,
        } => {
            let params = AdminListItemsParams {
                q,
                status,
                mode,
                include_deleted,
                include_archived,
                include_transferred,
                limit: page.limit,
                offset: page.offset,
            };
            print_json(&queries.admin_items(&params).await?)
        }
        AdminCommands::PatchItem { id, title, mode } => {
            let payload = AdminPatchItemPayload {
                title,
                mode,
                status: None,
            };
            print_json(&queries.admin_patch_item(id, &payload).await?)
        }
        AdminCommands::Block { id, reason } => moderate(queries, id, ModerationAction::Block, reason).await,
        AdminCommands::Unblock { id, reason } => {
            moderate(queries, id, ModerationAction::Unblock, reason).await
        }
        AdminCommands::DeleteItem { id, reason } => {
            moderate(queries, id, ModerationAction::Delete, reason).await
        }
        AdminCommands::Bookings {
            status,
            booking_type,
            item_id,
            user_id,
            page,
        } => {
            let params = AdminListBookingsParams {
                status,
                booking_type,
                item_id,
                user_id,
                limit: page.limit,
                offset: page.offset,
            };
            print_json(&queries.admin_bookings(&params).await?)
        }
        AdminCommands::Booking { id } => print_json(&queries.admin_booking(id).await?),
        AdminCommands::BookingEvents { id, page } => {
            print_json(&queries.admin_booking_events(id, page.params()).await?)
        }
        AdminCommands::Events {
            entity_type,
            entity_id,
            actor_user_id,
            page,
        } => {
            let params = AdminListEventsParams {
                entity_type,
                entity_id,
                actor_user_id,
                limit: page.limit,
                offset: page.offset,
            };
            print_json(&queries.admin_events(&params).await?)
        }
    }
}

async fn moderate(
    queries: &Queries,
    id: i64,
    action: ModerationAction,
    reason: Option<String>,
) -> anyhow::Result<()> {
    let item = queries
        .admin_moderate_item(id, action, &ModerationPayload { reason })
        .await?;
    print_json(&item)
}

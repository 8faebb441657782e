use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use petcare_client::onboarding::set_auto_login;
use petcare_client::push::{register_for_push, ConfiguredPushProvider};
use petcare_client::types::{
    DayOfWeek, HistoryQuery, ProfileUpdate, ScheduleDraft, ScheduleKind, SensorKind, TimeRange,
};
use petcare_client::{load_config, Config, LiveEvent, PetCare};
use tracing::{debug, info, warn, Level};

#[derive(Parser)]
#[command(name = "petcare")]
#[command(about = "Command line client for the PetCare feeder")]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// REST API base URL
    #[arg(long)]
    api_url: Option<String>,

    /// Live channel URL
    #[arg(long)]
    live_url: Option<String>,

    /// Local storage file
    #[arg(long)]
    storage: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info", value_parser = clap::value_parser!(Level))]
    log_level: Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the session tokens
    Login {
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Create an account
    Register {
        name: String,
        email: String,
        #[arg(long)]
        password: String,
    },

    /// End the session and clear stored tokens
    Logout,

    /// Request password reset instructions
    ForgotPassword { email: String },

    /// Show the logged-in user
    Whoami,

    /// Update name and/or email
    Profile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },

    /// Change the account password
    ChangePassword {
        #[arg(long)]
        current: String,
        #[arg(long)]
        new: String,
    },

    /// Show current sensor readings
    Sensors,

    /// Show sensor history
    History {
        /// food, water, temperature or humidity
        metric: SensorKind,

        /// day, week, month or custom
        #[arg(long, default_value = "day")]
        range: TimeRange,

        /// Start date for a custom range (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// End date for a custom range (YYYY-MM-DD)
        #[arg(long)]
        end: Option<NaiveDate>,
    },

    /// Dispense food
    Feed {
        /// Amount in percent
        #[arg(default_value = "50")]
        amount: u8,
    },

    /// Dispense water
    Water {
        /// Amount in percent
        #[arg(default_value = "50")]
        amount: u8,
    },

    /// Set the target temperature in °C
    SetTemperature { temperature: f64 },

    /// Manage feeding and watering schedules
    #[command(subcommand)]
    Schedules(ScheduleCommands),

    /// Manage notifications
    #[command(subcommand)]
    Notifications(NotificationCommands),

    /// Stream live updates
    Monitor,

    /// Register this device for push notifications
    PushRegister {
        /// Device token, overriding the configured one
        #[arg(long)]
        token: Option<String>,
    },

    /// Enable or disable resuming the session at start-up
    AutoLogin {
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
}

#[derive(Subcommand)]
enum ScheduleCommands {
    /// List schedules
    List,

    /// Create a schedule
    Create {
        #[command(flatten)]
        draft: DraftArgs,
    },

    /// Replace an existing schedule
    Update {
        id: String,
        #[command(flatten)]
        draft: DraftArgs,
    },

    /// Delete a schedule
    Delete { id: String },

    /// Enable or disable a schedule
    Toggle {
        id: String,
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
}

#[derive(clap::Args)]
struct DraftArgs {
    /// food or water
    #[arg(long = "type", default_value = "food")]
    kind: ScheduleKind,

    /// Time of day (HH:MM)
    #[arg(long, default_value = "08:00")]
    time: String,

    /// Comma separated days (e.g. Mon,Wed,Fri); every day when omitted
    #[arg(long, value_delimiter = ',')]
    days: Vec<DayOfWeek>,

    /// Amount in percent
    #[arg(long, default_value = "50")]
    amount: u8,
}

impl From<DraftArgs> for ScheduleDraft {
    fn from(args: DraftArgs) -> Self {
        let days = if args.days.is_empty() {
            DayOfWeek::ALL.into_iter().collect()
        } else {
            args.days.into_iter().collect()
        };
        ScheduleDraft {
            kind: args.kind,
            time: args.time,
            days,
            amount: args.amount,
        }
    }
}

#[derive(Subcommand)]
enum NotificationCommands {
    /// List notifications
    List,

    /// Mark one notification as read
    Read { id: String },

    /// Mark every notification as read
    ReadAll,

    /// Delete all notifications
    Clear,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    let mut config = if let Some(config_path) = &args.config {
        debug!("Loading configuration from {:?}", config_path);
        load_config(config_path)?
    } else {
        Config::default()
    };
    if let Some(url) = args.api_url {
        config.api.base_url = url;
    }
    if let Some(url) = args.live_url {
        config.live.url = url;
    }
    if let Some(path) = args.storage {
        config.storage.path = path;
    }
    debug!(
        "Using API {} and live channel {}",
        config.api.base_url, config.live.url
    );

    let app = PetCare::from_config(&config)?;

    match args.command {
        Commands::Login { email, password } => {
            let user = app.login(&email, &password).await?;
            info!("Logged in as {} <{}>", user.name, user.email);
            app.live().disconnect().await;
        }
        Commands::Register {
            name,
            email,
            password,
        } => {
            let user = app.register(&name, &email, &password).await?;
            info!("Registered {} <{}>", user.name, user.email);
            app.live().disconnect().await;
        }
        Commands::Logout => {
            app.logout().await?;
            info!("Logged out");
        }
        Commands::ForgotPassword { email } => {
            app.forgot_password(&email).await?;
            info!("Reset instructions sent to {}", email);
        }
        Commands::Whoami => {
            let user = app.require_user().await?;
            info!("{} <{}> (id: {})", user.name, user.email, user.id);
            app.live().disconnect().await;
        }
        Commands::Profile { name, email } => {
            let user = app.update_profile(&ProfileUpdate { name, email }).await?;
            info!("Profile updated: {} <{}>", user.name, user.email);
        }
        Commands::ChangePassword { current, new } => {
            app.change_password(&current, &new).await?;
            info!("Password changed");
        }
        Commands::Sensors => run_sensors(&app).await?,
        Commands::History {
            metric,
            range,
            start,
            end,
        } => {
            let query = HistoryQuery {
                kind: metric,
                range,
                start_date: start,
                end_date: end,
            };
            run_history(&app, &query).await?;
        }
        Commands::Feed { amount } => {
            app.connect_live().await;
            let path = app.dispense_food(amount).await;
            app.live().disconnect().await;
            info!("Dispensed {}% food via {}", amount, path?);
        }
        Commands::Water { amount } => {
            app.connect_live().await;
            let path = app.dispense_water(amount).await;
            app.live().disconnect().await;
            info!("Dispensed {}% water via {}", amount, path?);
        }
        Commands::SetTemperature { temperature } => {
            app.connect_live().await;
            let path = app.set_temperature(temperature).await;
            app.live().disconnect().await;
            info!("Temperature set to {:.1}°C via {}", temperature, path?);
        }
        Commands::Schedules(command) => run_schedules(&app, command).await?,
        Commands::Notifications(command) => run_notifications(&app, command).await?,
        Commands::Monitor => run_monitor(&app).await?,
        Commands::PushRegister { token } => {
            let mut push = config.push.clone();
            if token.is_some() {
                push.device_token = token;
            }
            let provider = ConfiguredPushProvider::new(&push);
            match register_for_push(&provider, app.kv().as_ref()).await? {
                Some(token) => info!("Registered push token {}", token),
                None => warn!("Push notifications not permitted"),
            }
        }
        Commands::AutoLogin { enabled } => {
            set_auto_login(app.kv().as_ref(), enabled).await?;
            info!("Auto-login {}", if enabled { "enabled" } else { "disabled" });
        }
    }

    Ok(())
}

async fn run_sensors(app: &PetCare) -> Result<(), Box<dyn std::error::Error>> {
    let reading = app.fetch_sensor_data().await?;
    for (kind, value, status) in reading.statuses() {
        info!("{:<12} {:>6.1}{} ({})", kind, value, kind.unit(), status);
    }
    if let Some(at) = reading.last_updated {
        info!("Last updated {}", at.to_rfc3339());
    }
    Ok(())
}

async fn run_history(app: &PetCare, query: &HistoryQuery) -> Result<(), Box<dyn std::error::Error>> {
    let points = app.fetch_sensor_history(query).await?;
    if points.is_empty() {
        info!("No {} history for range {}", query.kind, query.range);
    }
    for point in points {
        info!("{:<20} {:>6.1}{}", point.label, point.value, query.kind.unit());
    }
    Ok(())
}

async fn run_schedules(
    app: &PetCare,
    command: ScheduleCommands,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        ScheduleCommands::List => {
            let schedules = app.fetch_schedules().await?;
            if schedules.is_empty() {
                info!("No schedules");
            }
            for schedule in schedules {
                let days: Vec<_> = schedule.days.iter().map(|d| d.abbreviation()).collect();
                info!(
                    "{} {} {} {}% [{}] {}",
                    schedule.id,
                    schedule.kind,
                    schedule.time,
                    schedule.amount,
                    days.join(","),
                    if schedule.enabled { "enabled" } else { "disabled" }
                );
            }
        }
        ScheduleCommands::Create { draft } => {
            let schedule = app.create_schedule(&draft.into()).await?;
            info!("Created schedule {}", schedule.id);
        }
        ScheduleCommands::Update { id, draft } => {
            let schedule = app.update_schedule(&id, &draft.into()).await?;
            info!("Updated schedule {}", schedule.id);
        }
        ScheduleCommands::Delete { id } => {
            app.delete_schedule(&id).await?;
            info!("Deleted schedule {}", id);
        }
        ScheduleCommands::Toggle { id, enabled } => {
            let schedule = app.toggle_schedule(&id, enabled).await?;
            info!(
                "Schedule {} is now {}",
                schedule.id,
                if schedule.enabled { "enabled" } else { "disabled" }
            );
        }
    }
    Ok(())
}

async fn run_notifications(
    app: &PetCare,
    command: NotificationCommands,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        NotificationCommands::List => {
            let notifications = app.fetch_notifications().await?;
            for n in &notifications {
                let when = n.timestamp.map(|t| t.to_rfc3339()).unwrap_or_default();
                info!(
                    "{} {} [{}] {}: {} {}",
                    if n.read { " " } else { "*" },
                    n.id,
                    String::from(n.severity.clone()),
                    n.title,
                    n.message,
                    when
                );
            }
            let unread = app.store().read(|s| s.notifications.unread_count()).await;
            info!("{} notifications, {} unread", notifications.len(), unread);
        }
        NotificationCommands::Read { id } => {
            app.mark_notification_read(&id).await?;
            info!("Marked {} as read", id);
        }
        NotificationCommands::ReadAll => {
            app.mark_all_notifications_read().await?;
            info!("Marked all notifications as read");
        }
        NotificationCommands::Clear => {
            app.clear_notifications().await?;
            info!("Notifications cleared");
        }
    }
    Ok(())
}

async fn run_monitor(app: &PetCare) -> Result<(), Box<dyn std::error::Error>> {
    let startup = app.startup().await;
    if startup.first_launch {
        info!("Welcome to PetCare");
    }
    if startup.user.is_none() {
        app.require_user().await?;
    }

    let mut receiver = app.live().subscribe();
    app.connect_live().await;

    info!("Monitoring live updates (press Ctrl+C to stop)...");

    loop {
        tokio::select! {
            event = receiver.recv() => {
                match event {
                    Ok(event) => print_event(&event),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Skipped {} live events", skipped);
                    }
                    Err(e) => {
                        debug!("Event receiver error: {}", e);
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down...");
                break;
            }
        }
    }

    app.live().disconnect().await;
    Ok(())
}

fn print_event(event: &LiveEvent) {
    match event {
        LiveEvent::FoodLevel(level) => info!("Food level: {:.1}%", level),
        LiveEvent::WaterLevel(level) => info!("Water level: {:.1}%", level),
        LiveEvent::Temperature(value) => info!("Temperature: {:.1}°C", value),
        LiveEvent::Humidity(value) => info!("Humidity: {:.1}%", value),
        LiveEvent::Notification(n) => info!("Notification: {} - {}", n.title, n.message),
        LiveEvent::DeviceStatus(status) => info!("Device status: {}", status),
        LiveEvent::Connected => info!("Connected"),
        LiveEvent::ConnectionLost { reason } => warn!("Connection lost: {}", reason),
        LiveEvent::Reconnecting {
            attempt,
            max_attempts,
        } => info!(
            "Reconnecting (attempt {}/{})",
            attempt,
            max_attempts.map_or("unlimited".to_string(), |m| m.to_string())
        ),
        LiveEvent::Reconnected => info!("Reconnected"),
        LiveEvent::ReconnectFailed { reason } => warn!("Reconnection failed: {}", reason),
    }
}

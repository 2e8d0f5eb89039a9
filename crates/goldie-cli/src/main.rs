// ============================================================================
// goldie - command line storefront for Oldie But Goldie
// ============================================================================
// Usage:
//   goldie search "charly garcia clics"     Search the catalog
//   goldie release 249504                   Show a release
//   goldie login --email a@b.c --password x Register or sign in
//   goldie shelf add wantlist 249504        Put a release on a shelf
//   goldie lote add 249504 --intent COMPRAR Add a release to the lote
//   goldie lote send                        Print WhatsApp links for the lote
//   goldie ask "¿Qué recitales hay?"        Ask the events assistant
// ============================================================================

use std::io::{BufRead, Write};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use goldie_core::{
    format_relative, AppConfig, AppState, Currency, DocumentStore, GoldieDb, IdpCredential,
    Intent, ItemType, LoadingOverlay, Lote, LoteEntry, Order, OrderDetails, ReleaseDetail,
    SearchResult, SessionSynchronizer, Shelf, ShelfItem, UserIdentity,
};
use rust_decimal::Decimal;
use tracing::info;

/// Oldie But Goldie record shop
#[derive(Parser)]
#[command(name = "goldie", version, about = "Browse the catalog, manage shelves and send orders")]
struct Cli {
    /// Path to the database file (default: ~/.goldie/goldie.redb)
    #[arg(long, global = true)]
    db_path: Option<String>,

    /// Print catalog results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search releases by free text
    Search {
        #[arg(required = true)]
        query: Vec<String>,
    },

    /// Show release details
    Release { id: String },

    /// Show master release details
    Master { id: String },

    /// Recent electronic releases
    Trending,

    /// Register with email and password, or sign in if already registered
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Sign in with Google through the browser
    GoogleLogin {
        /// Use an ID token you already hold instead of opening the browser
        #[arg(long)]
        id_token: Option<String>,
    },

    /// Show the signed-in account
    Whoami,

    /// Forget the stored session
    Logout,

    /// Collection and wantlist
    Shelf {
        #[command(subcommand)]
        action: ShelfAction,
    },

    /// Items gathered for an order
    Lote {
        #[command(subcommand)]
        action: LoteAction,
    },

    /// Build a single order message and WhatsApp link
    Order(OrderArgs),

    /// Ask the music-events assistant (interactive when no question is given)
    Ask { question: Vec<String> },
}

#[derive(Subcommand)]
enum ShelfAction {
    /// List a shelf, newest first
    List { shelf: String },
    /// Add a release to a shelf
    Add { shelf: String, release_id: String },
    /// Remove an item from a shelf
    Remove { shelf: String, id: String },
    /// Print the shelf and every change to it until interrupted
    Watch { shelf: String },
}

#[derive(Subcommand)]
enum LoteAction {
    /// Add a release to the lote
    Add {
        release_id: String,
        #[command(flatten)]
        terms: TermsArgs,
    },
    /// Show the lote
    List,
    /// Drop one item
    Remove { item_id: String },
    /// Empty the lote
    Clear,
    /// Print one WhatsApp link per lote item, then empty the lote
    Send {
        /// Keep the lote after printing
        #[arg(long)]
        keep: bool,
    },
}

#[derive(clap::Args)]
struct TermsArgs {
    /// COMPRAR, VENDER, OBSERVANDO
    #[arg(long, default_value = "OBSERVANDO")]
    intent: String,
    #[arg(long, default_value = "")]
    condition: String,
    #[arg(long)]
    price: Option<Decimal>,
    #[arg(long, default_value = "ARS")]
    currency: String,
}

#[derive(clap::Args)]
struct OrderArgs {
    #[arg(long)]
    artist: String,
    #[arg(long)]
    album: String,
    #[arg(long, default_value = "")]
    format: String,
    #[command(flatten)]
    terms: TermsArgs,
    /// Catalog id to link back to
    #[arg(long)]
    item_id: Option<String>,
    /// release or master
    #[arg(long, default_value = "release")]
    item_type: String,
    #[arg(long)]
    order_number: Option<String>,
    /// Price quoted by the shop, shown instead of --price
    #[arg(long)]
    admin_offer: Option<Decimal>,
    #[arg(long, default_value = "ARS")]
    admin_currency: String,
}

impl TermsArgs {
    fn details(&self, artist: String, album: String, format: String) -> OrderDetails {
        OrderDetails {
            intent: Intent::from_label(&self.intent),
            artist,
            album,
            format,
            condition: self.condition.clone(),
            price: self.price,
            currency: Currency::from_code(&self.currency),
        }
    }
}

fn parse_shelf(s: &str) -> Result<Shelf> {
    Ok(s.parse::<Shelf>()?)
}

fn busy(overlay: &mut LoadingOverlay, message: &str) {
    overlay.show(Some(message));
    eprintln!("{}", overlay.message());
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("Warning: Could not load .env file: {}", e);
    }

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("goldie_core=debug".parse()?)
                .add_directive("goldie=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::default();
    let db_path = cli.db_path.clone().or_else(|| config.db_path.clone());
    let db = Arc::new(GoldieDb::open(db_path.as_deref())?);

    let mut state = AppState::new();
    state.lote = Lote::from_entries(db.load_lote()?);

    match cli.command {
        Commands::Search { query } => cmd_search(&config, &mut state, &query.join(" "), cli.json).await,
        Commands::Release { id } => cmd_release(&config, &mut state, &id, cli.json).await,
        Commands::Master { id } => cmd_master(&config, &mut state, &id).await,
        Commands::Trending => cmd_trending(&config, &mut state).await,
        Commands::Login { email, password } => cmd_login(&config, db, &email, &password).await,
        Commands::GoogleLogin { id_token } => cmd_google_login(&config, db, id_token).await,
        Commands::Whoami => cmd_whoami(&db).await,
        Commands::Logout => cmd_logout(&db),
        Commands::Shelf { action } => cmd_shelf(&config, &mut state, &db, action).await,
        Commands::Lote { action } => cmd_lote(&config, &mut state, &db, action).await,
        Commands::Order(args) => cmd_order(&config, args),
        Commands::Ask { question } => cmd_ask(&config, question).await,
    }
}

// ============================================================================
// Catalog
// ============================================================================

fn print_results(results: &[SearchResult]) {
    if results.is_empty() {
        println!("No results.");
        return;
    }
    for result in results {
        println!(
            "{:>10}  {}  ({})",
            result.id,
            result.title,
            result.year.as_deref().unwrap_or("-")
        );
    }
}

fn print_release(release: &ReleaseDetail) {
    println!("=== {} ===", release.title);
    println!("Artist:  {}", release.primary_artist().unwrap_or("N/A"));
    println!("Year:    {}", release.year.map(|y| y.to_string()).unwrap_or_else(|| "N/A".to_string()));
    println!("Format:  {}", release.primary_format().unwrap_or("N/A"));
    println!("Country: {}", release.country.as_deref().unwrap_or("N/A"));
    if !release.genres.is_empty() {
        println!("Genres:  {}", release.genres.join(", "));
    }
    if let Some(price) = release.lowest_price {
        println!("Lowest:  US$ {:.2}", price);
    }
    if !release.tracklist.is_empty() {
        println!();
        for track in &release.tracklist {
            println!("  {:4} {} {}", track.position, track.title, track.duration);
        }
    }
}

async fn cmd_search(config: &AppConfig, state: &mut AppState, query: &str, json: bool) -> Result<()> {
    let client = config.discogs_client()?;
    busy(&mut state.overlay, "Buscando discos...");
    let results = client.search_releases(query).await;
    state.overlay.hide();
    let results = results?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        print_results(&results);
    }
    Ok(())
}

async fn cmd_release(config: &AppConfig, state: &mut AppState, id: &str, json: bool) -> Result<()> {
    let client = config.discogs_client()?;
    busy(&mut state.overlay, "Cargando disco...");
    let release = client.get_release_details(id).await;
    state.overlay.hide();
    let release = release?;

    if json {
        println!("{}", serde_json::to_string_pretty(&release)?);
    } else {
        print_release(&release);
    }
    Ok(())
}

async fn cmd_master(config: &AppConfig, state: &mut AppState, id: &str) -> Result<()> {
    let client = config.discogs_client()?;
    busy(&mut state.overlay, "Cargando master...");
    let master = client.get_master_details(id).await;
    state.overlay.hide();
    let master = master?;

    println!("=== {} ===", master.title);
    if let Some(artist) = master.artists.first() {
        println!("Artist:       {}", artist.name);
    }
    if let Some(year) = master.year {
        println!("Year:         {}", year);
    }
    if let Some(main) = master.main_release {
        println!("Main release: {}", main);
    }
    if let Some(count) = master.num_for_sale {
        println!("For sale:     {}", count);
    }
    Ok(())
}

async fn cmd_trending(config: &AppConfig, state: &mut AppState) -> Result<()> {
    let client = config.discogs_client()?;
    busy(&mut state.overlay, "Procesando...");
    let results = client.get_trending().await;
    state.overlay.hide();
    print_results(&results?);
    Ok(())
}

// ============================================================================
// Session
// ============================================================================

fn session(config: &AppConfig, db: Arc<GoldieDb>) -> Result<SessionSynchronizer> {
    let provider = Arc::new(config.identity_provider()?);
    Ok(SessionSynchronizer::new(provider, db))
}

fn print_identity(identity: &UserIdentity) {
    println!("Signed in as {}", identity.display_name.as_deref().unwrap_or(&identity.uid));
    println!("  uid:   {}", identity.uid);
    println!("  email: {}", identity.email.as_deref().unwrap_or("N/A"));
}

async fn cmd_login(config: &AppConfig, db: Arc<GoldieDb>, email: &str, password: &str) -> Result<()> {
    let sync = session(config, db.clone())?;
    let identity = sync.authenticate_user(email, password).await?;
    db.save_session(&identity)?;
    print_identity(&identity);
    Ok(())
}

async fn cmd_google_login(config: &AppConfig, db: Arc<GoldieDb>, id_token: Option<String>) -> Result<()> {
    let sync = session(config, db.clone())?;

    let identity = match id_token {
        Some(token) => sync.sign_in_with_google(IdpCredential::GoogleIdToken(token)).await?,
        None => {
            let oauth = config.google_oauth()?;
            let pending = oauth.begin();
            println!("Open this URL to sign in with Google:\n\n{}\n", pending.auth_url);
            let credential = oauth.complete(&pending).await?;
            sync.handle_redirect_result(Some(credential))
                .await?
                .context("Google sign-in returned no user")?
        }
    };

    db.save_session(&identity)?;
    print_identity(&identity);
    Ok(())
}

fn require_user(db: &GoldieDb) -> Result<UserIdentity> {
    db.load_session()?
        .context("Not signed in. Run `goldie login` or `goldie google-login` first")
}

async fn cmd_whoami(db: &GoldieDb) -> Result<()> {
    let identity = require_user(db)?;
    let profile = db.get_profile(&identity.uid).await?;

    print_identity(&identity);
    if let Some(profile) = profile {
        println!("  location:   {}", profile.location.as_deref().unwrap_or("N/A"));
        println!("  last login: {}", format_relative(Some(profile.last_login), Utc::now()));
    }
    Ok(())
}

fn cmd_logout(db: &GoldieDb) -> Result<()> {
    if db.clear_session()? {
        println!("Signed out.");
    } else {
        println!("No active session.");
    }
    Ok(())
}

// ============================================================================
// Shelves
// ============================================================================

fn print_shelf(shelf: Shelf, items: &[ShelfItem]) {
    println!("=== {} ({}) ===", shelf.as_str(), items.len());
    let now = Utc::now();
    for item in items {
        println!(
            "{:>10}  {:50}  {}",
            item.id,
            item.title,
            format_relative(Some(item.added_at), now)
        );
    }
}

async fn cmd_shelf(config: &AppConfig, state: &mut AppState, db: &GoldieDb, action: ShelfAction) -> Result<()> {
    let user = require_user(db)?;

    match action {
        ShelfAction::List { shelf } => {
            let shelf = parse_shelf(&shelf)?;
            print_shelf(shelf, &db.list_items(&user.uid, shelf).await?);
        }
        ShelfAction::Add { shelf, release_id } => {
            let shelf = parse_shelf(&shelf)?;
            let client = config.discogs_client()?;
            busy(&mut state.overlay, "Cargando disco...");
            let release = client.get_release_details(&release_id).await;
            state.overlay.hide();

            let item = db.add_item(&user.uid, shelf, release?.to_shelf_item()).await?;
            println!("Added '{}' to {}", item.title, shelf.as_str());
        }
        ShelfAction::Remove { shelf, id } => {
            let shelf = parse_shelf(&shelf)?;
            if db.remove_item(&user.uid, shelf, &id).await? {
                println!("Removed {} from {}", id, shelf.as_str());
            } else {
                println!("{} is not on {}", id, shelf.as_str());
            }
        }
        ShelfAction::Watch { shelf } => {
            let shelf = parse_shelf(&shelf)?;
            let mut subscription = db.subscribe(&user.uid, shelf).await?;
            info!("Watching {}; press Ctrl-C to stop", shelf.as_str());
            loop {
                tokio::select! {
                    items = subscription.next() => match items {
                        Some(items) => print_shelf(shelf, &items),
                        None => break,
                    },
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
        }
    }
    Ok(())
}

// ============================================================================
// Orders
// ============================================================================

async fn cmd_lote(config: &AppConfig, state: &mut AppState, db: &GoldieDb, action: LoteAction) -> Result<()> {
    match action {
        LoteAction::Add { release_id, terms } => {
            let client = config.discogs_client()?;
            busy(&mut state.overlay, "Cargando disco...");
            let release = client.get_release_details(&release_id).await;
            state.overlay.hide();
            let release = release?;

            let details = terms.details(
                release.primary_artist().unwrap_or_default().to_string(),
                release.title.clone(),
                release.primary_format().unwrap_or_default().to_string(),
            );
            state.lote.add(LoteEntry {
                item_id: release.id.to_string(),
                item_type: ItemType::Release,
                title: release.title.clone(),
                details,
            });
            db.save_lote(state.lote.entries())?;
            println!("Lote: {} item(s)", state.lote.total_count());
        }
        LoteAction::List => {
            if state.lote.is_empty() {
                println!("The lote is empty.");
            }
            for entry in state.lote.entries() {
                println!(
                    "{:>10}  {:40}  {:10}  {}",
                    entry.item_id,
                    entry.title,
                    entry.details.intent.as_label(),
                    entry.details.condition
                );
            }
        }
        LoteAction::Remove { item_id } => {
            if !state.lote.remove(&item_id) {
                bail!("{} is not in the lote", item_id);
            }
            db.save_lote(state.lote.entries())?;
            println!("Lote: {} item(s)", state.lote.total_count());
        }
        LoteAction::Clear => {
            state.lote.clear();
            db.save_lote(state.lote.entries())?;
            println!("Lote cleared.");
        }
        LoteAction::Send { keep } => {
            if state.lote.is_empty() {
                bail!("The lote is empty");
            }
            let messenger = config.messenger();
            for order in state.lote.orders() {
                println!("{}\n", messenger.whatsapp_link(&order)?);
            }
            if !keep {
                state.lote.clear();
                db.save_lote(state.lote.entries())?;
            }
        }
    }
    Ok(())
}

fn cmd_order(config: &AppConfig, args: OrderArgs) -> Result<()> {
    let item_type: ItemType = args.item_type.parse()?;

    let details = args.terms.details(args.artist, args.album, args.format);
    let mut order = Order::new(details);
    if let Some(id) = args.item_id {
        order = order.with_item(id, item_type);
    }
    if let Some(number) = args.order_number {
        order = order.with_order_number(number);
    }
    if let Some(offer) = args.admin_offer {
        order = order.with_admin_offer(offer, Currency::from_code(&args.admin_currency));
    }

    let messenger = config.messenger();
    println!("{}\n", messenger.message(&order)?);
    println!("{}", messenger.whatsapp_link(&order)?);
    Ok(())
}

// ============================================================================
// Assistant
// ============================================================================

async fn cmd_ask(config: &AppConfig, question: Vec<String>) -> Result<()> {
    let mut chat = config.assistant().start_chat();

    if !question.is_empty() {
        println!("{}", chat.send_message(&question.join(" ")).await?);
        return Ok(());
    }

    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/salir" || line == "/exit" {
            break;
        }

        match chat.send_message(line).await {
            Ok(reply) => println!("\n{}\n", reply),
            Err(e) => eprintln!("Error: {}", e),
        }
    }
    Ok(())
}

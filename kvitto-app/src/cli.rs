use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use kvitto_pdf::format::format_amount;
use kvitto_pdf::{render_invoice, write_document, DocumentBranding, InvoiceDraft, InvoiceSnapshot};
use rowbase::domain::{BrandingUpsert, NewClient};
use uuid::Uuid;

use crate::bootstrap;
use crate::config::KvittoConfig;
use crate::deeplink::DeepLink;
use crate::gate::{GateState, SignUpResult};
use crate::present;
use crate::share;
use crate::throttle::TapGuard;

#[derive(Debug, Parser)]
#[command(name = "kvitto")]
#[command(about = "Invoicing client for the Rowbase backend")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Sign in with email and password, or with an Apple identity token
    Login {
        email: String,
        /// Apple identity token (skips the password prompt)
        #[arg(long)]
        apple_token: Option<String>,
    },
    /// Create an account
    Signup { email: String },
    /// Remove the local session
    Logout,
    /// Set your display name to finish account setup
    Onboard { name: String },
    /// Manage clients
    Clients {
        #[command(subcommand)]
        command: ClientsCommand,
    },
    /// Browse invoices
    Invoices {
        #[command(subcommand)]
        command: InvoicesCommand,
    },
    /// Preview totals for a JSON draft file
    Draft {
        file: PathBuf,
        /// Also render the draft to a PDF
        #[arg(long)]
        pdf: bool,
    },
    /// Render an invoice to a PDF document
    Pdf { invoice: Uuid },
    /// Build the share payload (document + checkout link) and mark the invoice sent
    Send { invoice: Uuid },
    /// Activity feed
    Activity {
        #[command(subcommand)]
        command: ActivityCommand,
    },
    /// Document branding
    Branding {
        #[command(subcommand)]
        command: BrandingCommand,
    },
    /// Feed a deep link into the app, as the OS would
    Link { url: String },
    /// Print config path and create a default file if missing
    ConfigPath,
}

#[derive(Debug, Subcommand)]
pub enum ClientsCommand {
    List,
    Add {
        name: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        zip: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum InvoicesCommand {
    List,
    Show {
        invoice: Uuid,
    },
    /// Persist a JSON draft as an open invoice
    Create {
        file: PathBuf,
        /// Client to bill; the draft's clientName is used for display when absent
        #[arg(long)]
        client: Option<Uuid>,
    },
    Delete {
        invoice: Uuid,
    },
}

#[derive(Debug, Subcommand)]
pub enum ActivityCommand {
    /// Show the feed, grouped by day
    List {
        /// Mark everything read after showing it
        #[arg(long)]
        mark_read: bool,
        /// Keep fetching pages until the feed is exhausted
        #[arg(long)]
        all: bool,
    },
    /// Delete one feed entry
    Delete { id: Uuid },
}

#[derive(Debug, Subcommand)]
pub enum BrandingCommand {
    Show,
    Set {
        #[arg(long)]
        business_name: Option<String>,
        #[arg(long)]
        tagline: Option<String>,
        /// Accent color as #RRGGBB
        #[arg(long)]
        accent_color: Option<String>,
        #[arg(long)]
        footer_text: Option<String>,
    },
    /// Upload a logo image
    Logo { file: PathBuf },
}

/// Rewrap a flow failure with the user-facing string for it.
fn fail<E: Into<anyhow::Error>>(context: &'static str) -> impl FnOnce(E) -> anyhow::Error {
    move |err| anyhow::anyhow!(present::friendly(context, &err.into()))
}

pub async fn run(cli: Cli) -> Result<()> {
    let config = KvittoConfig::load()?;
    let mut ctx = bootstrap::build_context(config)?;
    let mut taps = TapGuard::default();

    // UI surfaces watch the gate; the CLI just logs transitions at the end.
    let mut gate_rx = ctx.gate.subscribe();

    // Launching a command is this surface's "app foreground".
    if matches!(
        cli.command,
        Commands::Clients { .. }
            | Commands::Invoices { .. }
            | Commands::Pdf { .. }
            | Commands::Send { .. }
            | Commands::Activity { .. }
            | Commands::Branding { .. }
    ) {
        bootstrap::warm_up(&mut ctx).await;
    }

    match cli.command {
        Commands::Login { email, apple_token } => {
            if !present::validate_email(&email) {
                bail!("That doesn't look like an email address.");
            }
            if !taps.try_acquire() {
                return Ok(());
            }
            let state = match apple_token {
                Some(token) => ctx
                    .gate
                    .sign_in_with_apple(&token, &mut ctx.db)
                    .await
                    .map_err(fail("Sign in failed"))?,
                None => {
                    let password = rpassword::prompt_password("Password: ")?;
                    if present::require_nonempty(&password).is_none() {
                        bail!("Password cannot be empty.");
                    }
                    ctx.gate
                        .sign_in(&email, &password, &mut ctx.db)
                        .await
                        .map_err(fail("Sign in failed"))?
                }
            };
            ctx.rebind_feed();
            match state {
                GateState::NeedsOnboarding => {
                    println!("Signed in. Finish setup with `kvitto onboard \"Your Name\"`.")
                }
                _ => println!("Signed in."),
            }
        }

        Commands::Signup { email } => {
            if !present::validate_email(&email) {
                bail!("That doesn't look like an email address.");
            }
            let password = rpassword::prompt_password("Choose a password: ")?;
            if present::require_nonempty(&password).is_none() {
                bail!("Password cannot be empty.");
            }
            if !taps.try_acquire() {
                return Ok(());
            }
            let result = ctx
                .gate
                .sign_up(&email, &password, &mut ctx.db)
                .await
                .map_err(fail("Sign up failed"))?;
            match result {
                SignUpResult::Active(_) => {
                    ctx.rebind_feed();
                    println!("Account created. Finish setup with `kvitto onboard \"Your Name\"`.")
                }
                SignUpResult::ConfirmationSent => {
                    println!("Check your email for the confirmation link.")
                }
            }
        }

        Commands::Logout => {
            ctx.gate
                .sign_out(&mut ctx.db)
                .await
                .map_err(fail("Sign out failed"))?;
            println!("Signed out.");
        }

        Commands::Onboard { name } => {
            let Some(name) = present::require_nonempty(&name) else {
                bail!("Display name cannot be empty.");
            };
            ctx.gate
                .complete_onboarding(name, &ctx.db)
                .await
                .map_err(fail("Saving your profile failed"))?;
            println!("You're all set, {name}.");
        }

        Commands::Clients { command } => match command {
            ClientsCommand::List => {
                ctx.require_user()?;
                let clients = ctx
                    .db
                    .fetch_clients()
                    .await
                    .map_err(fail("Loading clients failed"))?;
                if clients.is_empty() {
                    println!("No clients yet. Add one with `kvitto clients add`.");
                }
                for client in clients {
                    println!(
                        "{}  {}  {}",
                        client.id,
                        client.name,
                        client.email.as_deref().unwrap_or("")
                    );
                }
            }
            ClientsCommand::Add {
                name,
                email,
                phone,
                address,
                city,
                state,
                zip,
            } => {
                ctx.require_user()?;
                if let Some(email) = email.as_deref() {
                    if !present::validate_email(email) {
                        bail!("That doesn't look like an email address.");
                    }
                }
                let created = ctx
                    .db
                    .create_client(&NewClient {
                        name,
                        email,
                        phone,
                        address,
                        city,
                        state,
                        zip,
                    })
                    .await
                    .map_err(fail("Saving the client failed"))?;
                println!("Added {} ({})", created.name, created.id);
            }
        },

        Commands::Invoices { command } => match command {
            InvoicesCommand::List => {
                ctx.require_user()?;
                let invoices = ctx
                    .db
                    .fetch_invoices()
                    .await
                    .map_err(fail("Loading invoices failed"))?;
                for invoice in invoices {
                    println!(
                        "{}  {}  [{}]  {}  {}",
                        invoice.id,
                        invoice.number,
                        invoice.status.as_str(),
                        format_amount(invoice.total, &invoice.currency),
                        invoice.client_name.as_deref().unwrap_or("")
                    );
                }
            }
            InvoicesCommand::Show { invoice } => {
                ctx.require_user()?;
                let snapshot = share::load_snapshot(&ctx.db, invoice)
                    .await
                    .map_err(fail("Loading the invoice failed"))?;
                print_snapshot(&snapshot);
            }
            InvoicesCommand::Create { file, client } => {
                ctx.require_user()?;
                if !taps.try_acquire() {
                    return Ok(());
                }
                let raw = std::fs::read_to_string(&file)
                    .with_context(|| format!("Failed to read {}", file.display()))?;
                let draft: InvoiceDraft = serde_json::from_str(&raw)
                    .with_context(|| format!("Failed to parse {}", file.display()))?;
                let created = create_invoice_from_draft(&mut ctx, draft, client)
                    .await
                    .map_err(fail("Saving the invoice failed"))?;
                println!("Created invoice {}", created);
            }
            InvoicesCommand::Delete { invoice } => {
                ctx.require_user()?;
                if !taps.try_acquire() {
                    return Ok(());
                }
                ctx.db
                    .delete_invoice(invoice)
                    .await
                    .map_err(fail("Deleting the invoice failed"))?;
                println!("Deleted.");
            }
        },

        Commands::Draft { file, pdf } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let draft: InvoiceDraft = serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse {}", file.display()))?;
            let snapshot = InvoiceSnapshot::from_draft(&draft);
            print_snapshot(&snapshot);
            if draft.number.is_none() && ctx.require_user().is_ok() {
                if let Ok(existing) = ctx.db.fetch_invoices().await {
                    println!(
                        "Next invoice number: {}",
                        rowbase::domain::next_invoice_number(&existing)
                    );
                }
            }
            if pdf {
                let branding = match ctx.require_user() {
                    Ok(user_id) => ctx.branding.document_branding(&ctx.db, user_id).await,
                    Err(_) => DocumentBranding::default(),
                };
                let bytes = render_invoice(&snapshot, &branding)
                    .map_err(fail("Rendering the draft failed"))?;
                let path = write_document(&bytes, &snapshot.number)?;
                println!("Wrote {}", path.display());
            }
        }

        Commands::Pdf { invoice } => {
            let user_id = ctx.require_user()?;
            let (path, _) = share::render_document(&ctx.db, &mut ctx.branding, user_id, invoice)
                .await
                .map_err(fail("Rendering the invoice failed"))?;
            println!("Wrote {}", path.display());
        }

        Commands::Send { invoice } => {
            let user_id = ctx.require_user()?;
            if !taps.try_acquire() {
                return Ok(());
            }
            let payload = share::build_share_payload(&ctx.db, &mut ctx.branding, user_id, invoice)
                .await
                .map_err(fail("Preparing the invoice failed"))?;
            println!("Document: {}", payload.document_path.display());
            println!("Checkout: {}", payload.checkout_url);
            println!("{}", payload.message);
            // The printout above is this surface's share sheet; leaving it
            // counts as genuinely shared.
            share::mark_sent(&ctx.db, invoice)
                .await
                .map_err(fail("Marking the invoice sent failed"))?;
            println!("Marked sent.");
        }

        Commands::Activity { command } => match command {
            ActivityCommand::List { mark_read, all } => {
                ctx.require_user()?;
                ctx.feed
                    .refresh()
                    .await
                    .map_err(fail("Loading activity failed"))?;
                while all && !ctx.feed.reached_end() {
                    let added = ctx
                        .feed
                        .fetch_next_page()
                        .await
                        .map_err(fail("Loading activity failed"))?;
                    if added == 0 {
                        break;
                    }
                }

                for group in ctx.feed.day_groups() {
                    println!("{}", group.header);
                    for event in &group.events {
                        let marker = if event.is_unread() { "*" } else { " " };
                        println!(
                            " {} {}  {}  {}",
                            marker,
                            event.kind.describe(),
                            event.invoice_number.as_deref().unwrap_or(""),
                            event.display_client_name().unwrap_or("")
                        );
                    }
                }
                println!("Unread: {}", ctx.feed.unread_count());

                if mark_read {
                    let unread_rx = ctx.feed.subscribe_unread();
                    let server_call = ctx.feed.mark_all_read();
                    println!("Unread after marking: {}", *unread_rx.borrow());
                    // One-shot process: drain the background call before exit.
                    if let Some(task) = server_call {
                        let _ = task.await;
                    }
                }
            }
            ActivityCommand::Delete { id } => {
                ctx.require_user()?;
                if !taps.try_acquire() {
                    return Ok(());
                }
                ctx.feed
                    .refresh()
                    .await
                    .map_err(fail("Loading activity failed"))?;
                let server_call = ctx.feed.delete(id);
                println!("Deleted.");
                if let Some(task) = server_call {
                    let _ = task.await;
                }
            }
        },

        Commands::Branding { command } => match command {
            BrandingCommand::Show => {
                let user_id = ctx.require_user()?;
                match ctx.branding.row(&ctx.db, user_id).await {
                    Some(row) => {
                        println!("Business: {}", row.business_name.as_deref().unwrap_or("-"));
                        println!("Tagline:  {}", row.tagline.as_deref().unwrap_or("-"));
                        println!("Accent:   {}", row.accent_color.as_deref().unwrap_or("-"));
                        println!("Logo:     {}", row.logo_path.as_deref().unwrap_or("-"));
                        println!("Footer:   {}", row.footer_text.as_deref().unwrap_or("-"));
                    }
                    None => println!("No branding yet. Set it with `kvitto branding set`."),
                }
            }
            BrandingCommand::Set {
                business_name,
                tagline,
                accent_color,
                footer_text,
            } => {
                let user_id = ctx.require_user()?;
                ctx.db
                    .upsert_branding(&BrandingUpsert {
                        user_id,
                        business_name,
                        tagline,
                        accent_color,
                        logo_path: None,
                        footer_text,
                    })
                    .await
                    .map_err(fail("Saving branding failed"))?;
                ctx.branding.invalidate();
                println!("Branding saved.");
            }
            BrandingCommand::Logo { file } => {
                let user_id = ctx.require_user()?;
                let bytes = std::fs::read(&file)
                    .with_context(|| format!("Failed to read {}", file.display()))?;
                let content_type = match file.extension().and_then(|e| e.to_str()) {
                    Some("jpg") | Some("jpeg") => "image/jpeg",
                    _ => "image/png",
                };
                ctx.db
                    .upload_logo(user_id, bytes, content_type)
                    .await
                    .map_err(fail("Uploading the logo failed"))?;
                ctx.db
                    .upsert_branding(&BrandingUpsert {
                        user_id,
                        business_name: None,
                        tagline: None,
                        accent_color: None,
                        logo_path: Some(format!("branding/{}/logo.png", user_id)),
                        footer_text: None,
                    })
                    .await
                    .map_err(fail("Saving branding failed"))?;
                ctx.branding.invalidate();
                println!("Logo uploaded.");
            }
        },

        Commands::Link { url } => match DeepLink::parse(&url) {
            DeepLink::AuthConfirm { token_hash } => {
                let state = ctx
                    .gate
                    .confirm_email(&token_hash, &mut ctx.db)
                    .await
                    .map_err(fail("Email confirmation failed"))?;
                ctx.rebind_feed();
                match state {
                    GateState::NeedsOnboarding => {
                        println!("Email confirmed. Finish setup with `kvitto onboard \"Your Name\"`.")
                    }
                    _ => println!("Email confirmed. You're signed in."),
                }
            }
            DeepLink::PaymentReturn { invoice_id, status } => {
                println!(
                    "Returned from checkout for invoice {} ({}).",
                    invoice_id,
                    status.as_deref().unwrap_or("unknown")
                );
                if ctx.require_user().is_ok() {
                    if let Ok(invoice) = ctx.db.fetch_invoice(invoice_id).await {
                        println!("Invoice {} is now {}.", invoice.number, invoice.status.as_str());
                    }
                }
            }
            DeepLink::Unrecognized(raw) => println!("Ignoring unrecognized link: {raw}"),
        },

        Commands::ConfigPath => {
            let path = KvittoConfig::config_path()?;
            if !path.exists() {
                KvittoConfig::default().save()?;
                println!("Created {}", path.display());
            } else {
                println!("{}", path.display());
            }
        }
    }

    if gate_rx.has_changed().unwrap_or(false) {
        tracing::debug!("gate state is now {:?}", *gate_rx.borrow_and_update());
    }

    Ok(())
}

/// Persist a draft: totals recomputed, number assigned from the existing
/// sequence when the draft has none, line items written in order.
async fn create_invoice_from_draft(
    ctx: &mut crate::context::AppContext,
    draft: InvoiceDraft,
    client_id: Option<Uuid>,
) -> Result<String> {
    use kvitto_pdf::money;
    use rowbase::domain::{next_invoice_number, InvoiceStatus, NewInvoice, NewLineItem};

    let snapshot = InvoiceSnapshot::from_draft(&draft);
    let number = match draft.number {
        Some(number) => number,
        None => {
            let existing = ctx
                .db
                .fetch_invoices()
                .await
                .context("Failed to load existing invoices")?;
            next_invoice_number(&existing)
        }
    };

    let client_name = match client_id {
        Some(id) => Some(
            ctx.db
                .fetch_client(id)
                .await
                .context("Failed to load the client")?
                .name,
        ),
        None => draft.client_name.clone(),
    };

    let invoice = ctx
        .db
        .create_invoice(&NewInvoice {
            number: number.clone(),
            status: InvoiceStatus::Open,
            currency: draft.currency.clone(),
            subtotal: snapshot.subtotal,
            tax: snapshot.tax,
            total: snapshot.total,
            issued_at: Some(chrono::Utc::now()),
            due_date: draft.due_date,
            notes: draft.notes.clone(),
            client_id,
            client_name,
        })
        .await
        .context("Failed to save the invoice")?;

    for (position, item) in draft.items.iter().enumerate() {
        ctx.db
            .create_line_item(&NewLineItem {
                invoice_id: invoice.id,
                position: position as i32,
                title: item.title.clone(),
                description: item.description.clone().unwrap_or_default(),
                quantity: money::coerce_quantity(item.quantity),
                unit_price: money::coerce_unit_price(item.unit_price),
                amount: money::line_amount(item.quantity, item.unit_price),
            })
            .await
            .with_context(|| format!("Failed to save line item {}", position + 1))?;
    }

    Ok(number)
}

fn print_snapshot(snapshot: &InvoiceSnapshot) {
    println!("Invoice {}  [{}]", snapshot.number, snapshot.status.as_str());
    if let Some(name) = &snapshot.bill_to.name {
        println!("Bill to: {name}");
    }
    if let Some(issued) = &snapshot.issued_at {
        println!("Issued:  {}", issued.display());
    }
    if let Some(due) = &snapshot.due_date {
        println!("Due:     {}", due.display());
    }
    for line in &snapshot.lines {
        let label = match (&line.title, &line.body) {
            (Some(title), Some(body)) => format!("{title}: {body}"),
            (Some(title), None) => title.clone(),
            (None, Some(body)) => body.clone(),
            (None, None) => String::new(),
        };
        println!(
            "  {:>3} x {}  {}",
            line.quantity,
            label,
            format_amount(line.amount, &snapshot.currency)
        );
    }
    println!("Subtotal: {}", format_amount(snapshot.subtotal, &snapshot.currency));
    if !snapshot.tax.is_zero() {
        println!("Tax:      {}", format_amount(snapshot.tax, &snapshot.currency));
    }
    println!("Total:    {}", format_amount(snapshot.total, &snapshot.currency));
    if let Some(notes) = &snapshot.notes {
        println!("Notes: {notes}");
    }
}

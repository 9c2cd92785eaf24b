use rowbase::{AuthClient, RowbaseClient, RowbaseUrl};
use std::env;
use std::error::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::from_filename("./rowbase/.env.local").ok();

    let email = env::var("ROWBASE_EMAIL").expect("ROWBASE_EMAIL must be set");
    let password = env::var("ROWBASE_PASSWORD").expect("ROWBASE_PASSWORD must be set");
    let api_key = env::var("ROWBASE_ANON_KEY").expect("ROWBASE_ANON_KEY must be set");

    let url = RowbaseUrl::from_env();
    let auth = AuthClient::new(url.clone(), api_key.clone());
    let session = auth.sign_in(&email, &password).await?;

    let client = RowbaseClient::new(url, api_key).with_access_token(session.access_token);
    let invoices = client.fetch_invoices().await?;

    println!("{} invoices:", invoices.len());
    for invoice in invoices {
        println!(
            "{} [{}] {} {} | {}",
            invoice.number,
            invoice.status.as_str(),
            invoice.total,
            invoice.currency,
            invoice.client_name.as_deref().unwrap_or("(no client)"),
        );
    }

    Ok(())
}

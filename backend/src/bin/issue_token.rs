//! Mint a bearer token for local development and smoke tests.
//!
//! Usage: `issue-token <uid> [email]`
//!
//! The token is signed with the configured identity key, so the server started
//! with the same configuration accepts it.

use production_planning::{config::Config, external::JwtIdentityProvider};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::load()?;

    let mut args = std::env::args().skip(1);
    let Some(uid) = args.next() else {
        anyhow::bail!("usage: issue-token <uid> [email]");
    };
    let email = args.next();

    let provider = JwtIdentityProvider::from_config(&config.identity)?;
    let token = provider.issue(&uid, email.as_deref())?;
    println!("{}", token);
    Ok(())
}

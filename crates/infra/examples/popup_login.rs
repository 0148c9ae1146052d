//! Popup login between two in-process browsing contexts
//!
//! The opener starts a popup login. A second context plays the popup: it
//! lands on the redirect page with a token in the fragment and runs the
//! landing handler, which hands the token back over shared storage.
//!
//! Run with: `cargo run -p handoff-infra --example popup_login`

use std::sync::Arc;

use handoff_core::{Authenticator, BrowserWindow, LandingHandler};
use handoff_domain::{AuthenticatorConfig, LivenessStrategy, LoginOptions};
use handoff_infra::{init_tracing, HttpTokenValidator, SharedStorage, SimulatedWindow};
use url::Url;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing(true)?;

    let config = AuthenticatorConfig {
        liveness: LivenessStrategy::poll(50),
        ..AuthenticatorConfig::default()
    };
    let storage = SharedStorage::new();
    let opener = SimulatedWindow::new("https://app.example/");
    let mut popups = opener.watch_popups();

    // Nothing is stored and the window has no fragment, so no token is
    // validated and the demo never reaches the network.
    let validator = HttpTokenValidator::for_environment(&handoff_domain::parse_env(&config.environment))?;
    let auth = Authenticator::new(
        "demo-client",
        config,
        storage.context(),
        opener.clone(),
        Arc::new(validator),
    )?;

    let popup_context = storage.context();
    let popup_side = tokio::spawn(async move {
        let Some(popup) = popups.recv().await else {
            return;
        };
        println!("popup opened: {}", popup.url());

        let topic = Url::parse(&popup.url())
            .ok()
            .and_then(|url| url.query_pairs().find(|(k, _)| k == "state").map(|(_, v)| v.into_owned()))
            .unwrap_or_default();

        let window = popup.window();
        window.navigate(&format!(
            "https://app.example/landing#access_token=demo-token&expires_in=86400&state={topic}"
        ));
        if let Err(err) = LandingHandler::new(popup_context, window).handle().await {
            eprintln!("landing failed: {err}");
        }
    });

    let data = auth.login_implicit_grant(LoginOptions::popup().with_state("dashboard"), None).await?;
    popup_side.await?;

    println!("logged in, app state = {:?}", data.state);
    println!("token expires at {:?}", data.token_expiry_time);
    println!("storage keys after login: {:?}", storage.keys());
    Ok(())
}

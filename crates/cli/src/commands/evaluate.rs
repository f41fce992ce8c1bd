use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Args;

use paygate_core::{Entitlements, GeoSignal, PageViewRequest};
use paygate_manager::PaywallManager;

use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Page identifier.
    pub page_id: String,
    /// Page attribute as `key=value` (repeatable).
    #[arg(long = "attr", value_parser = parse_key_val)]
    pub attributes: Vec<(String, String)>,
    /// Treat the viewer as logged in and fetch their entitlements.
    #[arg(long)]
    pub logged_in: bool,
    /// Use these skus instead of fetching entitlements (repeatable).
    #[arg(long = "sku")]
    pub skus: Vec<String>,
    /// Evaluate as of this RFC 3339 instant instead of now.
    #[arg(long, value_parser = parse_instant)]
    pub at: Option<DateTime<Utc>>,
    /// Viewer country code.
    #[arg(long)]
    pub country: Option<String>,
    #[arg(long)]
    pub city: Option<String>,
    #[arg(long)]
    pub continent: Option<String>,
    #[arg(long)]
    pub georegion: Option<String>,
    #[arg(long)]
    pub dma: Option<String>,
}

impl EvaluateArgs {
    fn geo(&self) -> Option<GeoSignal> {
        let geo = GeoSignal {
            city: self.city.clone(),
            continent: self.continent.clone(),
            georegion: self.georegion.clone(),
            dma: self.dma.clone(),
            country_code: self.country.clone(),
        };
        (geo != GeoSignal::default()).then_some(geo)
    }

    fn request(&self) -> PageViewRequest {
        let mut request = PageViewRequest::new(&self.page_id);
        for (key, value) in &self.attributes {
            request = request.with_attribute(key, value);
        }
        request.geo = self.geo();
        request
    }

    fn entitlements(&self) -> Option<Entitlements> {
        (!self.skus.is_empty()).then(|| Entitlements::new(&self.skus))
    }
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{s}`"))?;
    if key.is_empty() {
        return Err(format!("empty key in `{s}`"));
    }
    Ok((key.to_owned(), value.to_owned()))
}

fn parse_instant(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| e.to_string())
}

pub async fn run(
    manager: &PaywallManager,
    args: &EvaluateArgs,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let now = args.at.unwrap_or_else(Utc::now);
    let source = manager
        .initialize(now, args.logged_in, args.entitlements())
        .await
        .context("failed to load the paywall")?;
    tracing::debug!(?source, "paywall loaded");

    let result = manager.evaluate_at(&args.request(), now);
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => {
            let verdict = if result.show { "SHOW" } else { "HIDE" };
            match result.campaign {
                Some(ref campaign) => println!("{verdict} {} (campaign {campaign})", result.page_id),
                None => println!("{verdict} {}", result.page_id),
            }
        }
    }
    Ok(())
}

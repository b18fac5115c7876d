use std::{env, fmt::Display, str::FromStr, time::Duration as StdDuration};

use chrono::Duration;
use courier_tools::{FcmConfig, RoutingConfig, SmsConfig};
use dispatch_engine::{
    db_types::VehicleTier,
    dispatch_api::rules::{DEFAULT_CODE_EXPIRY_SECS, DEFAULT_CODE_LENGTH, DEFAULT_DELIVERED_VISIBILITY_SECS},
    geo::DEFAULT_AVERAGE_SPEED_KMH,
    matcher::DEFAULT_MATCH_RADIUS_KM,
    pricing::{PricingConfig, TierRate},
    DispatchRules,
};
use log::*;
use mdg_common::{parse_boolean_flag, Rupees, Secret};

const DEFAULT_MDG_HOST: &str = "127.0.0.1";
const DEFAULT_MDG_PORT: u16 = 8370;
const DEFAULT_EXPIRY_SWEEP_SECS: i64 = 60;
/// Upper bound for the code expiry and delivered visibility windows.
const MAX_WINDOW_SECS: i64 = 7 * 24 * 3600;
const MAX_EXPIRY_SWEEP_SECS: i64 = 24 * 3600;
pub const PAYMENT_SIGNATURE_HEADER: &str = "X-Payment-Signature";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RoutingMode {
    /// Great-circle distance with a fixed average speed.
    #[default]
    Haversine,
    /// Road-network distance from an OSRM-compatible service.
    Osrm,
}

impl FromStr for RoutingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "haversine" => Ok(Self::Haversine),
            "osrm" => Ok(Self::Osrm),
            other => Err(format!("'{other}' is not a routing mode. Use 'haversine' or 'osrm'.")),
        }
    }
}

impl Display for RoutingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoutingMode::Haversine => f.write_str("haversine"),
            RoutingMode::Osrm => f.write_str("osrm"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// One metric for both pricing and matching. There is no fallback between them.
    pub routing: RoutingMode,
    pub osrm: RoutingConfig,
    pub average_speed_kmh: f64,
    pub match_radius_km: f64,
    pub rules: DispatchRules,
    /// How often the delivery code expiry sweep runs.
    pub expiry_sweep_interval: StdDuration,
    pub pricing: PricingConfig,
    pub payment_webhook: PaymentWebhookConfig,
    pub fcm: FcmConfig,
    pub sms: SmsConfig,
}

#[derive(Clone, Debug, Default)]
pub struct PaymentWebhookConfig {
    pub hmac_secret: Secret<String>,
    /// If false, webhook signatures are not checked. Only for local development.
    pub hmac_checks: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_MDG_HOST.to_string(),
            port: DEFAULT_MDG_PORT,
            database_url: String::default(),
            routing: RoutingMode::default(),
            osrm: RoutingConfig::default(),
            average_speed_kmh: DEFAULT_AVERAGE_SPEED_KMH,
            match_radius_km: DEFAULT_MATCH_RADIUS_KM,
            rules: DispatchRules::default(),
            expiry_sweep_interval: StdDuration::from_secs(DEFAULT_EXPIRY_SWEEP_SECS as u64),
            pricing: PricingConfig::default(),
            payment_webhook: PaymentWebhookConfig { hmac_secret: Secret::default(), hmac_checks: true },
            fcm: FcmConfig::default(),
            sms: SmsConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let mut config = Self::from_vars(|key| env::var(key).ok());
        config.osrm = RoutingConfig::new_from_env_or_default();
        config.fcm = FcmConfig::new_from_env_or_default();
        config.sms = SmsConfig::new_from_env_or_default();
        config
    }

    /// Builds the core configuration from a variable lookup. Invalid values are logged and replaced by defaults.
    pub fn from_vars<F>(get: F) -> Self
    where F: Fn(&str) -> Option<String> {
        let defaults = Self::default();
        let host = get("MDG_HOST").unwrap_or(defaults.host);
        let port = parse_or_default(&get, "MDG_PORT", DEFAULT_MDG_PORT);
        let database_url = get("MDG_DATABASE_URL").unwrap_or_else(|| {
            error!("🪛️ MDG_DATABASE_URL is not set. Please set it to the URL for the gateway database.");
            String::default()
        });
        let routing = parse_or_default(&get, "MDG_ROUTING", RoutingMode::Haversine);
        let average_speed_kmh = positive_or_default(&get, "MDG_AVERAGE_SPEED_KMH", DEFAULT_AVERAGE_SPEED_KMH);
        let match_radius_km = positive_or_default(&get, "MDG_MATCH_RADIUS_KM", DEFAULT_MATCH_RADIUS_KM);
        let rules = configure_rules(&get);
        let sweep_secs =
            seconds_in_range(&get, "MDG_EXPIRY_SWEEP_SECS", DEFAULT_EXPIRY_SWEEP_SECS, 1, MAX_EXPIRY_SWEEP_SECS);
        let pricing = configure_pricing(&get);
        let hmac_secret = get("MDG_PAYMENT_HMAC_SECRET").unwrap_or_default();
        let hmac_checks = parse_boolean_flag(get("MDG_PAYMENT_HMAC_CHECKS"), true);
        if hmac_checks && hmac_secret.is_empty() {
            error!(
                "🪛️ MDG_PAYMENT_HMAC_SECRET is not set but signature checks are on. Every payment webhook will be \
                 rejected."
            );
        }
        if !hmac_checks {
            warn!("🚨️ Payment webhook signature checks are DISABLED. Do not run production like this.");
        }
        Self {
            host,
            port,
            database_url,
            routing,
            average_speed_kmh,
            match_radius_km,
            rules,
            expiry_sweep_interval: StdDuration::from_secs(sweep_secs.unsigned_abs()),
            pricing,
            payment_webhook: PaymentWebhookConfig { hmac_secret: Secret::new(hmac_secret), hmac_checks },
            ..defaults
        }
    }
}

fn configure_rules<F: Fn(&str) -> Option<String>>(get: &F) -> DispatchRules {
    let code_length = parse_or_default(get, "MDG_CODE_LENGTH", DEFAULT_CODE_LENGTH);
    let code_expiry = seconds_in_range(get, "MDG_CODE_EXPIRY_SECS", DEFAULT_CODE_EXPIRY_SECS, 1, MAX_WINDOW_SECS);
    let visibility =
        seconds_in_range(get, "MDG_DELIVERED_VISIBILITY_SECS", DEFAULT_DELIVERED_VISIBILITY_SECS, 0, MAX_WINDOW_SECS);
    let rules = DispatchRules::default()
        .with_code_length(code_length)
        .with_code_expiry(Duration::seconds(code_expiry))
        .with_delivered_visibility(Duration::seconds(visibility));
    if rules.code_length != code_length {
        warn!("🪛️ MDG_CODE_LENGTH of {code_length} is out of range. Using {} digits.", rules.code_length);
    }
    rules
}

fn configure_pricing<F: Fn(&str) -> Option<String>>(get: &F) -> PricingConfig {
    let mut pricing = PricingConfig::default();
    for tier in VehicleTier::ALL {
        let key = format!("MDG_RATES_{}", tier.as_str().to_ascii_uppercase());
        if let Some(value) = get(&key) {
            match parse_rate(&value) {
                Ok(rate) => pricing.set_rate(tier, rate),
                Err(e) => warn!("🪛️ Invalid value for {key}. {e} Using the default rate for {tier}."),
            }
        }
    }
    pricing.fixed_surcharge = match get("MDG_FIXED_SURCHARGE").map(|s| s.trim().parse::<f64>()) {
        Some(Ok(v)) if v.is_finite() && v >= 0.0 => v,
        Some(_) => {
            warn!("🪛️ Invalid value for MDG_FIXED_SURCHARGE. Using the default, {}.", pricing.fixed_surcharge);
            pricing.fixed_surcharge
        },
        None => pricing.fixed_surcharge,
    };
    let min_order = parse_or_default(get, "MDG_MIN_ORDER_AMOUNT", pricing.min_order_amount.value());
    pricing.min_order_amount = Rupees::from(min_order.max(1));
    pricing
}

/// Parses a `per_km,per_minute` rate pair.
pub fn parse_rate(value: &str) -> Result<TierRate, String> {
    let parts = value.split(',').map(|s| s.trim().parse::<f64>()).collect::<Result<Vec<_>, _>>();
    match parts.as_deref() {
        Ok([per_km, per_minute]) if [per_km, per_minute].iter().all(|v| v.is_finite() && **v >= 0.0) => {
            Ok(TierRate::new(*per_km, *per_minute))
        },
        _ => Err(format!("'{value}' is not a 'per_km,per_minute' pair of non-negative numbers.")),
    }
}

fn parse_or_default<F, T>(get: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    match get(key) {
        Some(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            warn!("🪛️ {s} is not a valid value for {key}. {e} Using the default, {default}, instead.");
            default
        }),
        None => {
            debug!("🪛️ {key} is not set. Using the default, {default}.");
            default
        },
    }
}

fn positive_or_default<F: Fn(&str) -> Option<String>>(get: &F, key: &str, default: f64) -> f64 {
    let value = parse_or_default(get, key, default);
    if value.is_finite() && value > 0.0 {
        value
    } else {
        warn!("🪛️ {key} must be a positive number. Using the default, {default}, instead.");
        default
    }
}

fn seconds_in_range<F: Fn(&str) -> Option<String>>(get: &F, key: &str, default: i64, min: i64, max: i64) -> i64 {
    let value = parse_or_default(get, key, default);
    if (min..=max).contains(&value) {
        value
    } else {
        warn!("🪛️ {key} must be between {min} and {max} seconds. Using the default, {default}, instead.");
        default
    }
}

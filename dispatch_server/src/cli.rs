use std::{env, env::VarError};

use crate::config::ServerConfig;

/// There's no real CLI for the server. Any argument prints the help text and the effective configuration.
pub fn handle_command_line_args(config: &ServerConfig) -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        display_readme();
        display_envs();
        display_config(config);
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Be explicit about which envars to print, so as to avoid accidentally exposing secrets
    const DISPLAY_ENVS: [&str; 21] = [
        "RUST_LOG",
        "MDG_HOST",
        "MDG_PORT",
        "MDG_DATABASE_URL",
        "MDG_ROUTING",
        "MDG_OSRM_URL",
        "MDG_ROUTE_TIMEOUT_MS",
        "MDG_AVERAGE_SPEED_KMH",
        "MDG_MATCH_RADIUS_KM",
        "MDG_CODE_LENGTH",
        "MDG_CODE_EXPIRY_SECS",
        "MDG_DELIVERED_VISIBILITY_SECS",
        "MDG_EXPIRY_SWEEP_SECS",
        "MDG_FIXED_SURCHARGE",
        "MDG_MIN_ORDER_AMOUNT",
        "MDG_RATES_TWO_WHEELER",
        "MDG_RATES_THREE_WHEELER",
        "MDG_RATES_FOUR_WHEELER",
        "MDG_PAYMENT_HMAC_CHECKS",
        "MDG_FCM_PROJECT_ID",
        "MDG_SMS_URL",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}

fn display_config(config: &ServerConfig) {
    println!("\nEffective configuration:");
    println!("  {:<35} {}:{}", "listen on", config.host, config.port);
    println!("  {:<35} {}", "routing", config.routing);
    println!("  {:<35} {} km", "match radius", config.match_radius_km);
    println!("  {:<35} {} digits", "delivery code length", config.rules.code_length);
    println!("  {:<35} {} s", "delivery code expiry", config.rules.code_expiry.num_seconds());
    println!("  {:<35} {} s", "delivered orders visible for", config.rules.delivered_visibility.num_seconds());
    println!("  {:<35} {} s", "expiry sweep every", config.expiry_sweep_interval.as_secs());
    println!("  {:<35} {}", "payment signature checks", config.payment_webhook.hmac_checks);
    println!("  {:<35} {}", "push notifications", if config.fcm.is_configured() { "fcm" } else { "log only" });
    println!("  {:<35} {}", "sms", if config.sms.is_configured() { "gateway" } else { "log only" });
}

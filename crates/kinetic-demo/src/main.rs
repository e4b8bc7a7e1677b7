use anyhow::Result;
use kinetic_config::KineticConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod scenarios;
use scenarios::Scenario;

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = KineticConfig::load().sanitized();

    let arg = std::env::args().find_map(|a| a.strip_prefix("--scenario=").map(str::to_string));
    let selected = select(arg.as_deref(), &config);

    for scenario in selected {
        tracing::info!(scenario = scenario.name(), "running");
        scenario.run(&config)?;
    }
    Ok(())
}

/// `--scenario=<name>` wins over the config, which already carries
/// `KINETIC_DEMO_SCENARIO`. "all" or an unknown name runs everything.
fn select(arg: Option<&str>, config: &KineticConfig) -> Vec<Scenario> {
    match arg.or(config.demo.scenario.as_deref()) {
        None | Some("all") => Scenario::ALL.to_vec(),
        Some(name) => match Scenario::parse(name) {
            Some(scenario) => vec![scenario],
            None => {
                tracing::warn!(name, "unknown scenario, running all");
                Scenario::ALL.to_vec()
            }
        },
    }
}

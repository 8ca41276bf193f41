#![cfg_attr(test, allow(clippy::disallowed_methods))]
// Forbid unwrap() in production code to prevent panics from corrupt data.
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
use slotree::config::IndexConfig;
use slotree::storage::{Index, TraversalOrder};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "slotree=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match IndexConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Loaded configuration: capacity={}, data_directory={}",
        config.capacity,
        config.data_directory.display()
    );

    let mut index = match Index::open(&config) {
        Ok(index) => index,
        Err(e) => {
            tracing::error!("Failed to open index: {e}");
            std::process::exit(1);
        }
    };
    tracing::info!("Snapshot: {}", index.restore_outcome());

    for order in TraversalOrder::ALL {
        match index.render(order) {
            Ok(rendered) => print!("{rendered}"),
            Err(e) => {
                tracing::error!("Failed to render {order} traversal: {e}");
                std::process::exit(1);
            }
        }
    }

    if let Err(e) = index.close() {
        tracing::error!("Failed to close index: {e}");
        std::process::exit(1);
    }
}

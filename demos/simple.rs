use std::{sync::Arc, time::SystemTime};

use keyed_injector::*;
use tracing_subscriber::EnvFilter;

// Define regular traits and implementor structs

trait Logger: Send + Sync {
    fn log(&self, content: &str);
}

struct PrefixLogger {
    prefix: Arc<String>,
}

impl Logger for PrefixLogger {
    fn log(&self, content: &str) {
        println!("[{}] {}", self.prefix, content);
    }
}

// Components holding trait objects can be resolved by the container

struct LogService(Arc<dyn Logger>);
impl Component for LogService {}

struct DateLogger {
    logger: Arc<LogService>,
}

impl DateLogger {
    fn new(logger: Arc<LogService>) -> Self {
        Self { logger }
    }

    fn log_date(&self) {
        let secs = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        self.logger.0.log(&format!("{}s since epoch", secs));
    }
}

impl Component for DateLogger {}

/// Logger built from the prefix of the scope resolving it
fn prefix_logger() -> FactoryConfig {
    FactoryConfig::new(FactoryFn::new(|prefix: Arc<String>| {
        let logger: Arc<dyn Logger> = Arc::new(PrefixLogger { prefix });
        Some(instance(LogService(logger)))
    }))
    .using(["prefix"])
}

fn main() -> Result<(), ContainerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let root = Container::new();
    root.map("prefix")
        .to_value(ValueConfig::new(instance("root".to_string())))?
        .map("logger")
        .to_factory(prefix_logger())?
        .map("dates")
        .to_type(
            TypeConfig::new(Constructor::new(DateLogger::new))
                .using(["logger"])
                .singleton(),
        )?;

    // keys missing in a child scope are resolved, with their dependencies, by the parent
    let request = root.child();
    request
        .map("prefix")
        .to_value(ValueConfig::new(instance("request".to_string())))?
        .map("logger")
        .to_factory(prefix_logger())?;

    root.get_as::<DateLogger>("dates")?.log_date();
    request.get_as::<DateLogger>("dates")?.log_date();
    request.get_as::<LogService>("logger")?.0.log("request scope");

    Ok(())
}
